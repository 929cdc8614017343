//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked
//! ancestors before anything is created through them.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// OS-appropriate default config path.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(mut base) = config_dir() {
        base.push("lvshift");
        base.push("config.xml");
        return Ok(base);
    }
    std::env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("lvshift")
                .join("config.xml")
        })
        .map_err(|_| anyhow!("neither a config directory nor HOME is available"))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push("lvshift");
        base.push("lvshift.log");
        return Ok(base);
    }
    std::env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("lvshift")
                .join("lvshift.log")
        })
        .map_err(|_| anyhow!("neither a data directory nor HOME is available"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
