//! Interfaces-file generation for the `net-meta` command.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use eni_core::{render_interfaces, schema, NetworkState};
use log::{debug, info};
use serde_yaml::{Mapping, Value};

use crate::artifacts::{binding_rules_artifact, Artifact, ENI_PATH};
use crate::sysnet::SysClassNet;
use crate::target::{load_file, target_path};

/// Device names standing for a set of devices found at runtime.
pub const DEVNAME_ALIASES: &[&str] = &["connected", "configured", "netboot"];

const CUSTOM_HEADER: &str = "# Autogenerated interfaces from net-meta custom mode\n\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaMode {
    Auto,
    Dhcp,
    Copy,
    Custom,
}

impl MetaMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MetaMode::Auto => "auto",
            MetaMode::Dhcp => "dhcp",
            MetaMode::Copy => "copy",
            MetaMode::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetaRequest {
    pub mode: MetaMode,
    pub devices: Vec<String>,
    pub target: Option<PathBuf>,
    /// Merged command config; a `network` key forces custom mode.
    pub config: Value,
    pub sys: SysClassNet,
}

/// Interfaces text plus any files the mode wants written into the target.
#[derive(Debug, Clone)]
pub struct MetaOutput {
    pub mode: MetaMode,
    pub content: String,
    pub artifacts: Vec<Artifact>,
}

/// Accept a device alias or something that looks like a netdev name.
pub fn network_device(value: &str) -> Result<String, String> {
    if DEVNAME_ALIASES.contains(&value)
        || value.starts_with("eth")
        || (value.starts_with("en") && value.len() == 3)
    {
        Ok(value.to_string())
    } else {
        Err(format!("{value} does not look like a netdev name"))
    }
}

/// Expand a device alias against the running system.
pub fn resolve_alias(alias: &str, sys: &SysClassNet) -> Result<Vec<String>> {
    let mut found = Vec::new();
    match alias {
        "connected" => {
            for dev in sys.devices()? {
                if sys.is_physical(&dev) && sys.is_up(&dev)? {
                    found.push(dev);
                }
            }
        }
        "configured" => {
            for dev in sys.devices()? {
                if sys.is_physical(&dev) && sys.is_up(&dev)? && sys.is_connected(&dev)? {
                    found.push(dev);
                }
            }
        }
        "netboot" => bail!("netboot alias not implemented"),
        other => bail!("'{other}' is not an alias: {}", DEVNAME_ALIASES.join(", ")),
    }
    debug!("alias {alias} resolved to {found:?}");
    Ok(found)
}

/// Replace aliases with the devices they stand for, keeping order.
pub fn resolve_devices(devices: &[String], sys: &SysClassNet) -> Result<Vec<String>> {
    let mut resolved = Vec::new();
    for dev in devices {
        if DEVNAME_ALIASES.contains(&dev.as_str()) {
            resolved.extend(resolve_alias(dev, sys)?);
        } else {
            resolved.push(dev.clone());
        }
    }
    Ok(resolved)
}

/// Loopback plus one DHCP stanza per device.
pub fn interfaces_basic_dhcp(devices: &[String]) -> String {
    let mut content = [
        "# This file describes the network interfaces available on your system",
        "# and how to activate them. For more information see interfaces(5).",
        "",
        "# The loopback network interface",
        "auto lo",
        "iface lo inet loopback",
    ]
    .join("\n");
    for dev in devices {
        content.push_str(&format!("\n\nauto {dev}\niface {dev} inet dhcp"));
    }
    content.push('\n');
    content
}

/// The network document from a config's `network` value. A bare stanza list
/// is taken as version 1.
pub fn custom_network_state(network: &Value) -> Result<NetworkState> {
    let document = match network {
        Value::Sequence(_) => {
            let mut doc = Mapping::new();
            doc.insert("version".into(), Value::from(1));
            doc.insert("config".into(), network.clone());
            Value::Mapping(doc)
        }
        other => other.clone(),
    };
    schema::parse(&document)?.ok_or_else(|| {
        anyhow!("network configuration is required by mode 'custom' but not provided in the config file")
    })
}

/// Pick the effective mode.
fn effective_mode(request: &MetaRequest) -> MetaMode {
    if network_value(&request.config).is_some() {
        return MetaMode::Custom;
    }
    if request.mode != MetaMode::Auto {
        return request.mode;
    }
    match &request.target {
        Some(target) if target_path(target, ENI_PATH).is_file() => MetaMode::Copy,
        _ => MetaMode::Dhcp,
    }
}

fn network_value(config: &Value) -> Option<&Value> {
    config.get("network").filter(|value| !value.is_null())
}

pub fn net_meta(request: &MetaRequest) -> Result<MetaOutput> {
    let mode = effective_mode(request);
    info!("net-meta mode {} (requested {})", mode.as_str(), request.mode.as_str());

    let (content, artifacts) = match mode {
        MetaMode::Copy => {
            let Some(target) = &request.target else {
                bail!("mode 'copy' requires --target");
            };
            (load_file(&target_path(target, ENI_PATH))?, Vec::new())
        }
        MetaMode::Custom => {
            let network = network_value(&request.config).ok_or_else(|| {
                anyhow!("network configuration is required by mode 'custom' but not provided in the config file")
            })?;
            let state = custom_network_state(network).context("invalid network configuration")?;
            let content = format!("{CUSTOM_HEADER}{}", render_interfaces(&state));
            let artifacts = match request.target {
                Some(_) => vec![binding_rules_artifact(&state)],
                None => Vec::new(),
            };
            (content, artifacts)
        }
        MetaMode::Dhcp | MetaMode::Auto => {
            let requested = if request.devices.is_empty() && request.mode == MetaMode::Auto {
                vec!["connected".to_string()]
            } else {
                request.devices.clone()
            };
            let devices = resolve_devices(&requested, &request.sys)?;
            (interfaces_basic_dhcp(&devices), Vec::new())
        }
    };

    Ok(MetaOutput {
        mode,
        content,
        artifacts,
    })
}
