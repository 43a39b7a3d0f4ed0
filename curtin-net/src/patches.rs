//! Idempotent fixes applied to the target after network rendering.

use std::path::Path;

use anyhow::Result;
use log::{debug, info, warn};

use crate::artifacts::{write_artifacts, Artifact};
use crate::target::{del_file, load_file, target_path, write_file};

pub const LEGACY_ETH0_PATH: &str = "etc/network/interfaces.d/eth0.cfg";
pub const IPV6_PRIVACY_PATH: &str = "etc/sysctl.d/10-ipv6-privacy.conf";
pub const MTU_PRE_HOOK_PATH: &str = "etc/network/if-pre-up.d/mtuipv6";
pub const MTU_POST_HOOK_PATH: &str = "etc/network/if-up.d/mtuipv6";

/// Content shipped by older cloud images in `eth0.cfg`.
pub const LEGACY_ETH0_CONTENT: &[&str] = &["auto eth0", "iface eth0 inet dhcp"];

/// Distro default enabling IPv6 temporary addresses.
pub const IPV6_PRIVACY_CONTENT: &[&str] = &[
    "net.ipv6.conf.all.use_tempaddr = 2",
    "net.ipv6.conf.default.use_tempaddr = 2",
];

const IPV6_PRIVACY_DISABLED: &str = "# IPv6 Privacy Extensions (RFC 4941)
# Disabled by curtin-net
# net.ipv6.conf.all.use_tempaddr = 2
# net.ipv6.conf.default.use_tempaddr = 2
";

const MTU_PRE_HOOK: &str = r#"#!/bin/bash -e
# injected by curtin-net

[ "${IFACE}" != "lo" ] || exit 0

# Trigger only if MTU configured
[ -n "${IF_MTU}" ] || exit 0

read CUR_DEV_MTU </sys/class/net/${IFACE}/mtu ||:
read CUR_IPV6_MTU </proc/sys/net/ipv6/conf/${IFACE}/mtu ||:
[ -n "${CUR_DEV_MTU}" ] && echo ${CUR_DEV_MTU} > /run/network/${IFACE}_dev.mtu
[ -n "${CUR_IPV6_MTU}" ] &&
  echo ${CUR_IPV6_MTU} > /run/network/${IFACE}_ipv6.mtu
exit 0
"#;

const MTU_POST_HOOK: &str = r#"#!/bin/bash -e
# injected by curtin-net

[ "${IFACE}" != "lo" ] || exit 0

# Trigger only if MTU configured
[ -n "${IF_MTU}" ] || exit 0

read PRE_DEV_MTU </run/network/${IFACE}_dev.mtu ||:
read CUR_DEV_MTU </sys/class/net/${IFACE}/mtu ||:
read PRE_IPV6_MTU </run/network/${IFACE}_ipv6.mtu ||:
read CUR_IPV6_MTU </proc/sys/net/ipv6/conf/${IFACE}/mtu ||:

if [ "${ADDRFAM}" = "inet6" ]; then
  # raise the device MTU when the IPv6 MTU is larger
  if [ ${CUR_DEV_MTU} -lt ${IF_MTU} ]; then
      ip link set ${IFACE} mtu ${IF_MTU}
  fi
  echo ${IF_MTU} >/proc/sys/net/ipv6/conf/${IFACE}/mtu ||:

elif [ "${ADDRFAM}" = "inet" ]; then
  # setting the inet MTU clobbers the IPv6 MTU; restore the lower value
  if [ ${PRE_IPV6_MTU} -lt ${CUR_IPV6_MTU} ]; then
    echo ${PRE_IPV6_MTU} >/proc/sys/net/ipv6/conf/${IFACE}/mtu ||:
  fi
fi
exit 0
"#;

/// True when `contents`, with comments and blank lines dropped and each line
/// trimmed, is exactly `known`.
pub fn matches_known_content(contents: &str, known: &[&str]) -> bool {
    let lines: Vec<&str> = contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines == known
}

/// Run every post-render patch against `target`.
pub fn apply_all(target: &Path) -> Result<()> {
    maybe_remove_legacy_eth0(target)?;
    disable_ipv6_privacy_extensions(target)?;
    patch_ifupdown_ipv6_mtu_hook(target)
}

/// Remove `eth0.cfg` if it still has the stock content. Returns whether it
/// was removed.
pub fn maybe_remove_legacy_eth0(target: &Path) -> Result<bool> {
    let path = target_path(target, LEGACY_ETH0_PATH);
    if !path.exists() {
        debug!("No legacy network conf file {}", path.display());
        return Ok(false);
    }

    let contents = load_file(&path)?;
    if matches_known_content(&contents, LEGACY_ETH0_CONTENT) {
        del_file(&path)?;
        warn!("removed {} with known contents", path.display());
        Ok(true)
    } else {
        warn!(
            "Dynamic networking config may not apply. '{}' exists with user configured content.",
            path.display()
        );
        Ok(false)
    }
}

/// Replace the distro's IPv6 privacy default with a commented-out copy so a
/// later image setting wins. Returns whether the file was replaced.
pub fn disable_ipv6_privacy_extensions(target: &Path) -> Result<bool> {
    let path = target_path(target, IPV6_PRIVACY_PATH);
    if !path.exists() {
        debug!("No ipv6 privacy conf file {}", path.display());
        return Ok(false);
    }

    let contents = load_file(&path)?;
    if !matches_known_content(&contents, IPV6_PRIVACY_CONTENT) {
        debug!("skipping removal of {}, expected content not found", path.display());
        warn!(
            "Disabling IPv6 privacy extensions config may not apply. '{}' exists with user configured content.",
            path.display()
        );
        return Ok(false);
    }

    info!("Removing ipv6 privacy extension config file: {}", path.display());
    del_file(&path)?;
    write_file(&path, IPV6_PRIVACY_DISABLED, None)?;
    Ok(true)
}

/// Install the ifupdown hooks that keep the IPv6 MTU consistent with the
/// device MTU.
pub fn patch_ifupdown_ipv6_mtu_hook(target: &Path) -> Result<()> {
    info!("Injecting fix for ipv6 mtu settings");
    write_artifacts(target, &mtu_hook_artifacts())
}

fn mtu_hook_artifacts() -> [Artifact; 2] {
    [
        Artifact {
            path: MTU_PRE_HOOK_PATH,
            content: MTU_PRE_HOOK.to_string(),
            mode: Some(0o755),
        },
        Artifact {
            path: MTU_POST_HOOK_PATH,
            content: MTU_POST_HOOK.to_string(),
            mode: Some(0o755),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn seed(target: &Path, rel: &str, content: &str) {
        write_file(&target_path(target, rel), content, None).expect("seed");
    }

    #[test]
    fn known_content_ignores_comments_and_whitespace() {
        let contents = "# shipped by the image\n  auto eth0\n\niface eth0 inet dhcp  \n";
        assert!(matches_known_content(contents, LEGACY_ETH0_CONTENT));
        assert!(!matches_known_content("auto eth0\n", LEGACY_ETH0_CONTENT));
        assert!(!matches_known_content(
            "auto eth0\niface eth0 inet dhcp\n    mtu 9000\n",
            LEGACY_ETH0_CONTENT
        ));
    }

    #[test]
    fn legacy_eth0_removed_only_when_stock() {
        let dir = tempdir().expect("tempdir");
        assert!(!maybe_remove_legacy_eth0(dir.path()).expect("missing is fine"));

        seed(dir.path(), LEGACY_ETH0_PATH, "auto eth0\niface eth0 inet static\n");
        assert!(!maybe_remove_legacy_eth0(dir.path()).expect("patch"));
        assert!(target_path(dir.path(), LEGACY_ETH0_PATH).exists());

        seed(dir.path(), LEGACY_ETH0_PATH, "auto eth0\niface eth0 inet dhcp\n");
        assert!(maybe_remove_legacy_eth0(dir.path()).expect("patch"));
        assert!(!target_path(dir.path(), LEGACY_ETH0_PATH).exists());
    }

    #[test]
    fn ipv6_privacy_replaced_with_commented_copy() {
        let dir = tempdir().expect("tempdir");
        seed(
            dir.path(),
            IPV6_PRIVACY_PATH,
            "# defaults\nnet.ipv6.conf.all.use_tempaddr = 2\nnet.ipv6.conf.default.use_tempaddr = 2\n",
        );
        assert!(disable_ipv6_privacy_extensions(dir.path()).expect("patch"));

        let written = fs::read_to_string(target_path(dir.path(), IPV6_PRIVACY_PATH)).expect("read");
        assert_eq!(written, IPV6_PRIVACY_DISABLED);
        assert!(matches_known_content(&written, &[]));

        // second run sees only comments and leaves the file alone
        assert!(!disable_ipv6_privacy_extensions(dir.path()).expect("patch"));
    }

    #[test]
    fn mtu_hooks_are_executable() {
        let dir = tempdir().expect("tempdir");
        patch_ifupdown_ipv6_mtu_hook(dir.path()).expect("hooks");
        for rel in [MTU_PRE_HOOK_PATH, MTU_POST_HOOK_PATH] {
            let path = target_path(dir.path(), rel);
            let content = fs::read_to_string(&path).expect("read");
            assert!(content.starts_with("#!/bin/bash -e\n"));
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
