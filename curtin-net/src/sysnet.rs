//! Read-only queries against a `/sys/class/net` style tree.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

pub const DEFAULT_SYS_CLASS_NET: &str = "/sys/class/net";

#[derive(Debug, Clone)]
pub struct SysClassNet {
    root: PathBuf,
}

impl Default for SysClassNet {
    fn default() -> Self {
        Self::new(DEFAULT_SYS_CLASS_NET)
    }
}

impl SysClassNet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dev_path(&self, devname: &str, attr: &str) -> PathBuf {
        self.root.join(devname).join(attr)
    }

    /// Trimmed attribute contents, `None` if the attribute does not exist.
    fn read_attr(&self, devname: &str, attr: &str) -> Result<Option<String>> {
        let path = self.dev_path(devname, attr);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            // some attributes (carrier on a down link) refuse reads
            Err(err) if err.kind() == ErrorKind::InvalidInput => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Device names, sorted.
    pub fn devices(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to list {}", self.root.display()))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// The kernel treats operstate `unknown` as up for configuration.
    pub fn is_up(&self, devname: &str) -> Result<bool> {
        let state = self.read_attr(devname, "operstate")?;
        Ok(matches!(state.as_deref(), Some("up") | Some("unknown")))
    }

    pub fn is_physical(&self, devname: &str) -> bool {
        self.dev_path(devname, "device").exists()
    }

    pub fn is_wireless(&self, devname: &str) -> bool {
        self.dev_path(devname, "wireless").exists()
    }

    /// `iflink` 2 means physically connected. Wireless devices always report
    /// 3 there, so their carrier is used instead.
    pub fn is_connected(&self, devname: &str) -> Result<bool> {
        if self.read_attr(devname, "iflink")?.as_deref() == Some("2") {
            return Ok(true);
        }
        if !self.is_wireless(devname) {
            return Ok(false);
        }
        debug!("'{devname}' is wireless, basing 'connected' on carrier");
        Ok(self.read_attr(devname, "carrier")?.as_deref() == Some("1"))
    }

    pub fn get_interface_mac(&self, devname: &str) -> Result<Option<String>> {
        self.read_attr(devname, "address")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;
    use std::path::Path;

    /// Lay out a fake device directory with the given attribute files.
    pub fn fake_device(root: &Path, name: &str, attrs: &[(&str, &str)], physical: bool) {
        let dev = root.join(name);
        fs::create_dir_all(&dev).expect("device dir");
        for (attr, value) in attrs {
            fs::write(dev.join(attr), format!("{value}\n")).expect("attr");
        }
        if physical {
            fs::create_dir_all(dev.join("device")).expect("device link");
        }
    }
}
