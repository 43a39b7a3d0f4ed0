//! Whether the target's own configurator can take the network document as-is.
//!
//! Passthrough is an optimization: any probe failure means "not available"
//! and the caller renders locally instead.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

/// Oldest cloud-init that accepts a passed-through network config (0.7.6).
pub const MIN_PASSTHROUGH_VERSION: u32 = 706;

/// Package whose version gates passthrough.
pub const CONFIGURATOR_PACKAGE: &str = "cloud-init";

/// Caller override for the passthrough decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PassthroughMode {
    #[default]
    Auto,
    Never,
    Always,
}

/// Probe for passthrough support inside a target root.
pub trait CapabilityProbe {
    /// Installed configurator version, or an error if it could not be
    /// determined.
    fn configurator_version(&self, target: &Path) -> Result<PackageVersion>;

    /// Failures are logged and reported as unsupported.
    fn passthrough_supported(&self, target: &Path) -> bool {
        debug!("Checking in-target {CONFIGURATOR_PACKAGE} version");
        match self.configurator_version(target) {
            Ok(version) => {
                debug!(
                    "{CONFIGURATOR_PACKAGE} version is '{}' (major={} minor={} micro={})",
                    version.raw, version.major, version.minor, version.micro
                );
                version.semantic() >= MIN_PASSTHROUGH_VERSION
            }
            Err(err) => {
                warn!("Failed to determine if passthrough is available: {err:#}");
                false
            }
        }
    }
}

/// Asks dpkg inside `chroot <target>` for the installed version.
#[derive(Debug, Default)]
pub struct DpkgProbe;

impl CapabilityProbe for DpkgProbe {
    fn configurator_version(&self, target: &Path) -> Result<PackageVersion> {
        let output = Command::new("chroot")
            .arg(target)
            .args(["dpkg-query", "--show", "--showformat", "${Version}"])
            .arg(CONFIGURATOR_PACKAGE)
            .output()
            .with_context(|| format!("failed to run dpkg-query in {}", target.display()))?;
        if !output.status.success() {
            bail!(
                "{CONFIGURATOR_PACKAGE} not available in target={} ({})",
                target.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        PackageVersion::parse(raw.trim())
            .with_context(|| format!("unrecognized {CONFIGURATOR_PACKAGE} version '{}'", raw.trim()))
    }
}

/// A Debian package version reduced to its upstream major/minor/micro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub raw: String,
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl PackageVersion {
    /// Parse `[epoch:]upstream[-revision]`, ignoring `~` and `+` suffixes on
    /// the upstream part.
    pub fn parse(raw: &str) -> Option<Self> {
        let without_epoch = raw.split_once(':').map_or(raw, |(_, rest)| rest);
        let upstream = without_epoch.split('-').next()?;
        let upstream = upstream.split(['~', '+']).next()?;

        let mut parts = upstream.split('.').map(leading_number);
        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let micro = parts.next().flatten().unwrap_or(0);
        Some(Self {
            raw: raw.to_string(),
            major,
            minor,
            micro,
        })
    }

    /// `major * 10000 + minor * 100 + micro`
    pub fn semantic(&self) -> u32 {
        self.major * 10000 + self.minor * 100 + self.micro
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Decide whether to pass the document through to the target.
pub fn should_passthrough(
    mode: PassthroughMode,
    probe: &dyn CapabilityProbe,
    target: &Path,
) -> bool {
    match mode {
        PassthroughMode::Never => false,
        PassthroughMode::Always => true,
        PassthroughMode::Auto => {
            info!(
                "Checking {CONFIGURATOR_PACKAGE} in target [{}] for network configuration passthrough support.",
                target.display()
            );
            probe.passthrough_supported(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Option<&'static str>);

    impl CapabilityProbe for FixedProbe {
        fn configurator_version(&self, _target: &Path) -> Result<PackageVersion> {
            match self.0 {
                Some(raw) => PackageVersion::parse(raw).context("bad version"),
                None => bail!("probe failed"),
            }
        }
    }

    #[test]
    fn parses_debian_versions() {
        let v = PackageVersion::parse("0.7.6~bzr976-0ubuntu1").expect("version");
        assert_eq!((v.major, v.minor, v.micro), (0, 7, 6));
        assert_eq!(v.semantic(), 706);

        let v = PackageVersion::parse("17.1-46-g7acc9e68-0ubuntu1~16.04.1").expect("version");
        assert_eq!((v.major, v.minor, v.micro), (17, 1, 0));

        let v = PackageVersion::parse("1:23.4.1+dfsg-1").expect("version");
        assert_eq!(v.semantic(), 230401);

        assert!(PackageVersion::parse("").is_none());
        assert!(PackageVersion::parse("abc").is_none());
    }

    #[test]
    fn probe_thresholds() {
        let target = Path::new("/target");
        assert!(FixedProbe(Some("0.7.6-0ubuntu1")).passthrough_supported(target));
        assert!(FixedProbe(Some("20.1-10-g71af48df-0ubuntu5")).passthrough_supported(target));
        assert!(!FixedProbe(Some("0.7.5-0ubuntu1")).passthrough_supported(target));
        assert!(!FixedProbe(None).passthrough_supported(target));
    }

    #[test]
    fn mode_overrides_probe() {
        let target = Path::new("/target");
        let broken = FixedProbe(None);
        let modern = FixedProbe(Some("23.1"));
        assert!(!should_passthrough(PassthroughMode::Never, &modern, target));
        assert!(should_passthrough(PassthroughMode::Always, &broken, target));
        assert!(should_passthrough(PassthroughMode::Auto, &modern, target));
        assert!(!should_passthrough(PassthroughMode::Auto, &broken, target));
    }
}
