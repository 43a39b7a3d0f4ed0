//! Apply a network document to a target root.

use std::path::Path;

use anyhow::{bail, Context, Result};
use eni_core::schema;
use log::info;
use serde_yaml::Value;

use crate::artifacts::{network_state_artifacts, passthrough_artifact, write_artifacts};
use crate::config::load_config;
use crate::passthrough::{should_passthrough, CapabilityProbe, PassthroughMode};
use crate::patches;

/// What an apply run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document was handed to the in-target configurator.
    PassedThrough,
    /// Interfaces file and binding rules were rendered into the target.
    Rendered,
    /// The document requested no network configuration.
    NothingToDo,
}

/// Where the network description comes from.
#[derive(Debug, Clone, Copy)]
pub enum NetworkSource<'a> {
    /// A pre-built network state file. No converter exists for these.
    State(&'a Path),
    /// A curtin network config file, holding a top-level `network` key.
    Config(&'a Path),
}

pub fn apply_net(
    target: &Path,
    source: NetworkSource<'_>,
    mode: PassthroughMode,
    probe: &dyn CapabilityProbe,
) -> Result<ApplyOutcome> {
    let config_path = match source {
        NetworkSource::State(_) => {
            bail!("Not Supported; curtin-net lacks a network_state to network_config converter.")
        }
        NetworkSource::Config(path) => path,
    };
    let config = load_config(config_path)?;
    apply_network_config(target, &config, mode, probe)
}

/// Apply an already loaded config document.
pub fn apply_network_config(
    target: &Path,
    config: &Value,
    mode: PassthroughMode,
    probe: &dyn CapabilityProbe,
) -> Result<ApplyOutcome> {
    let outcome = if should_passthrough(mode, probe, target) {
        info!("Passing network configuration through to target: {}", target.display());
        write_artifacts(target, &[passthrough_artifact(config)?])?;
        ApplyOutcome::PassedThrough
    } else {
        let network = config.get("network").cloned().unwrap_or(Value::Null);
        let Some(state) = schema::parse(&network).context("invalid network configuration")?
        else {
            info!("No network configuration requested");
            return Ok(ApplyOutcome::NothingToDo);
        };
        info!("Rendering network configuration in target");
        write_artifacts(target, &network_state_artifacts(&state))?;
        ApplyOutcome::Rendered
    };

    patches::apply_all(target)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{CLOUDINIT_DISABLE_PATH, ENI_PATH, NETRULES_PATH, PASSTHROUGH_PATH};
    use crate::passthrough::PackageVersion;
    use crate::patches::MTU_PRE_HOOK_PATH;
    use tempfile::tempdir;

    struct NoProbe;

    impl CapabilityProbe for NoProbe {
        fn configurator_version(&self, _target: &Path) -> Result<PackageVersion> {
            bail!("no chroot in tests")
        }
    }

    fn config(text: &str) -> Value {
        serde_yaml::from_str(text).expect("yaml")
    }

    const BASIC: &str = "network:
  version: 1
  config:
    - type: physical
      name: eth0
      mac_address: 52:54:00:12:34:00
      subnets:
        - type: dhcp
";

    #[test]
    fn renders_when_probe_fails() {
        let dir = tempdir().expect("tempdir");
        let outcome = apply_network_config(dir.path(), &config(BASIC), PassthroughMode::Auto, &NoProbe)
            .expect("apply");
        assert_eq!(outcome, ApplyOutcome::Rendered);
        for rel in [ENI_PATH, NETRULES_PATH, CLOUDINIT_DISABLE_PATH, MTU_PRE_HOOK_PATH] {
            assert!(dir.path().join(rel).is_file(), "{rel} missing");
        }
        assert!(!dir.path().join(PASSTHROUGH_PATH).exists());
    }

    #[test]
    fn always_passes_through() {
        let dir = tempdir().expect("tempdir");
        let outcome =
            apply_network_config(dir.path(), &config(BASIC), PassthroughMode::Always, &NoProbe)
                .expect("apply");
        assert_eq!(outcome, ApplyOutcome::PassedThrough);
        assert!(dir.path().join(PASSTHROUGH_PATH).is_file());
        assert!(!dir.path().join(ENI_PATH).exists());
        assert!(dir.path().join(MTU_PRE_HOOK_PATH).is_file());
    }

    #[test]
    fn missing_network_is_a_noop() {
        let dir = tempdir().expect("tempdir");
        let outcome = apply_network_config(
            dir.path(),
            &config("storage: {}\n"),
            PassthroughMode::Never,
            &NoProbe,
        )
        .expect("apply");
        assert_eq!(outcome, ApplyOutcome::NothingToDo);
        assert!(std::fs::read_dir(dir.path()).expect("list").next().is_none());
    }

    #[test]
    fn network_state_is_unsupported() {
        let dir = tempdir().expect("tempdir");
        let err = apply_net(
            dir.path(),
            NetworkSource::State(Path::new("/nonexistent")),
            PassthroughMode::Never,
            &NoProbe,
        )
        .expect_err("unsupported");
        assert!(err.to_string().starts_with("Not Supported"));
    }
}
