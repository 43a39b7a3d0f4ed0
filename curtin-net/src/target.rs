//! File operations rooted at the target filesystem being provisioned.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Join a target-relative path onto the target root. Leading slashes on
/// `rel` are ignored so `/etc/x` and `etc/x` land in the same place.
pub fn target_path(target: &Path, rel: &str) -> PathBuf {
    target.join(rel.trim_start_matches('/'))
}

/// Write `content` to `path`, creating parent directories. `mode` sets the
/// file permissions when given.
pub fn write_file(path: &Path, content: &str, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set mode {mode:o} on {}", path.display()))?;
    }
    Ok(())
}

pub fn load_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn del_file(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("failed to delete {}", path.display()))
}
