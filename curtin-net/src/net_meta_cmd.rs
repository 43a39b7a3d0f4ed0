use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use curtin_net::artifacts::write_artifacts;
use curtin_net::config::{cmdarg_to_config, load_config, merge_config};
use curtin_net::net_meta::{net_meta, MetaMode, MetaRequest};
use curtin_net::sysnet::SysClassNet;
use curtin_net::target::write_file;
use serde_yaml::{Mapping, Value};

use crate::cli::{MetaModeArg, NetMetaArgs};

pub fn run_net_meta(args: NetMetaArgs) -> Result<()> {
    let config = command_config(args.config.as_deref(), &args.set)?;
    let request = MetaRequest {
        mode: meta_mode(args.mode),
        devices: args.devices,
        target: args.target,
        config,
        sys: SysClassNet::new(args.sys_class_net),
    };

    let output = net_meta(&request)?;
    if let Some(target) = &request.target {
        write_artifacts(target, &output.artifacts)?;
    }

    if args.output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(output.content.as_bytes())
            .context("failed to write to stdout")?;
    } else {
        write_file(Path::new(&args.output), &output.content, None)?;
    }
    Ok(())
}

/// Config file (if any) with every `--set` override merged over it.
fn command_config(path: Option<&Path>, overrides: &[String]) -> Result<Value> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Value::Mapping(Mapping::new()),
    };
    for arg in overrides {
        merge_config(&mut config, cmdarg_to_config(arg)?);
    }
    Ok(config)
}

fn meta_mode(arg: MetaModeArg) -> MetaMode {
    match arg {
        MetaModeArg::Auto => MetaMode::Auto,
        MetaModeArg::Dhcp => MetaMode::Dhcp,
        MetaModeArg::Copy => MetaMode::Copy,
        MetaModeArg::Custom => MetaMode::Custom,
    }
}
