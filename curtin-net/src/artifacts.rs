//! Files produced for the target, rendered in full before anything is written.

use std::path::Path;

use anyhow::{bail, Result};
use eni_core::{render_interfaces, render_persistent_net, NetworkState};
use log::info;
use serde_yaml::Value;

use crate::target::{target_path, write_file};

pub const ENI_PATH: &str = "etc/network/interfaces";
pub const NETRULES_PATH: &str = "etc/udev/rules.d/70-persistent-net.rules";
pub const CLOUDINIT_DISABLE_PATH: &str =
    "etc/cloud/cloud.cfg.d/curtin-disable-cloudinit-networking.cfg";
pub const PASSTHROUGH_PATH: &str = "etc/cloud/cloud.cfg.d/curtin-networking.cfg";

const CLOUDINIT_DISABLE_CONTENT: &str = "network: {config: disabled}\n";

/// One file destined for the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the target root.
    pub path: &'static str,
    pub content: String,
    pub mode: Option<u32>,
}

impl Artifact {
    fn new(path: &'static str, content: String) -> Self {
        Self {
            path,
            content,
            mode: None,
        }
    }
}

/// Interfaces file, naming rules and the marker telling the in-target
/// configurator to leave networking alone.
pub fn network_state_artifacts(state: &NetworkState) -> Vec<Artifact> {
    vec![
        Artifact::new(ENI_PATH, render_interfaces(state)),
        Artifact::new(NETRULES_PATH, render_persistent_net(state)),
        Artifact::new(CLOUDINIT_DISABLE_PATH, CLOUDINIT_DISABLE_CONTENT.to_string()),
    ]
}

/// Naming rules alone, for `net-meta custom`.
pub fn binding_rules_artifact(state: &NetworkState) -> Artifact {
    Artifact::new(NETRULES_PATH, render_persistent_net(state))
}

/// The loaded config, unchanged, for the in-target configurator to render at
/// its own boot.
pub fn passthrough_artifact(config: &Value) -> Result<Artifact> {
    let Some(map) = config.as_mapping() else {
        bail!("network config must be a mapping");
    };
    if !map.contains_key("network") {
        bail!("network config must contain the key 'network'");
    }
    let content = serde_yaml::to_string(config)?;
    Ok(Artifact::new(PASSTHROUGH_PATH, content))
}

/// Write every artifact under `target`.
pub fn write_artifacts(target: &Path, artifacts: &[Artifact]) -> Result<()> {
    for artifact in artifacts {
        let path = target_path(target, artifact.path);
        info!("Writing {}", path.display());
        write_file(&path, &artifact.content, artifact.mode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn passthrough_requires_network_key() {
        let cfg: Value = serde_yaml::from_str("storage: {}\n").expect("yaml");
        let err = passthrough_artifact(&cfg).expect_err("should fail");
        assert!(err.to_string().contains("'network'"));
    }

    #[test]
    fn passthrough_keeps_document() {
        let cfg: Value =
            serde_yaml::from_str("network:\n  version: 1\n  config: []\n").expect("yaml");
        let artifact = passthrough_artifact(&cfg).expect("artifact");
        assert_eq!(artifact.path, PASSTHROUGH_PATH);
        let reparsed: Value = serde_yaml::from_str(&artifact.content).expect("reparse");
        assert_eq!(reparsed, cfg);
    }

    #[test]
    fn state_artifacts_are_written_under_target() {
        let dir = tempdir().expect("tempdir");
        let artifacts = network_state_artifacts(&NetworkState::new());
        write_artifacts(dir.path(), &artifacts).expect("write");

        for rel in [ENI_PATH, NETRULES_PATH, CLOUDINIT_DISABLE_PATH] {
            assert!(dir.path().join(rel).is_file(), "{rel} missing");
        }
        let marker = std::fs::read_to_string(dir.path().join(CLOUDINIT_DISABLE_PATH))
            .expect("marker");
        assert_eq!(marker, "network: {config: disabled}\n");
    }
}
