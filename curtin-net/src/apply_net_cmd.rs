use anyhow::{bail, Result};
use curtin_net::apply_net::{apply_net, ApplyOutcome, NetworkSource};
use curtin_net::passthrough::{DpkgProbe, PassthroughMode};
use log::info;

use crate::cli::{ApplyNetArgs, Passthrough};

pub fn run_apply_net(args: ApplyNetArgs) -> Result<()> {
    let Some(target) = args.target.as_deref() else {
        bail!("Unable to find target. Use --target or set TARGET_MOUNT_POINT");
    };
    let source = match (args.net_state.as_deref(), args.net_config.as_deref()) {
        (Some(state), _) => NetworkSource::State(state),
        (None, Some(config)) => NetworkSource::Config(config),
        (None, None) => bail!("Must provide at least config or state"),
    };

    info!("Applying network configuration");
    let outcome = apply_net(target, source, passthrough_mode(args.passthrough), &DpkgProbe)?;
    match outcome {
        ApplyOutcome::NothingToDo => info!("No network configuration to apply"),
        ApplyOutcome::PassedThrough | ApplyOutcome::Rendered => {
            info!("Applied network configuration successfully")
        }
    }
    Ok(())
}

fn passthrough_mode(arg: Passthrough) -> PassthroughMode {
    match arg {
        Passthrough::Auto => PassthroughMode::Auto,
        Passthrough::Never => PassthroughMode::Never,
        Passthrough::Always => PassthroughMode::Always,
    }
}
