//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a commented template with conservative permissions if missing
//!   (unless LVSHIFT_CONFIG points elsewhere).
//!
//! Unknown XML fields are a hard error so a typo in a field name surfaces
//! instead of silently using defaults.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use std::os::unix::fs::PermissionsExt;

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::CONFIG_ENV;
use crate::units::parse_size;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    /// Default safety margin as a size string ("16M"); optional.
    default_margin: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

fn xml_to_config(parsed: XmlConfig, origin: &Path) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(raw) = parsed.default_margin.as_deref() {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let bytes = parse_size(trimmed).map_err(|e| {
                anyhow::anyhow!("bad default_margin in {}: {e}", origin.display())
            })?;
            cfg.default_margin = Some(bytes);
        }
    }
    if let Some(s) = parsed.log_level.as_deref() {
        if let Some(level) = LogLevel::parse(s.trim()) {
            cfg.log_level = level;
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed, path)
}

/// Resolve and load the configuration.
///
/// Order: LVSHIFT_CONFIG (must exist and parse), else the platform default
/// path (template created best-effort when absent), else built-in defaults.
/// A missing config file is not an error; a broken one is.
pub fn load_config() -> Result<Config> {
    if let Some(explicit) = env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(explicit);
        if !path.exists() {
            bail!(
                "{CONFIG_ENV} points at '{}', which does not exist",
                path.display()
            );
        }
        return load_config_from_path(&path);
    }

    let path = match default_config_path() {
        Ok(p) => p,
        Err(_) => return Ok(Config::default()),
    };
    if !path.exists() {
        let _ = create_template_config(&path);
        return Ok(Config::default());
    }
    load_config_from_path(&path)
}

/// Create the default template config file and parent directory with
/// conservative permissions, refusing symlinked ancestors.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/lvshift.log".into());

    let content = format!(
        "<!--\n  lvshift configuration (XML)\n\n  Fields:\n    default_margin  -> extra headroom beyond the filesystem minimum before a\n                       shrink is approved (size string such as 16M). Never\n                       applied below twice the pool extent size.\n    log_level       -> quiet | normal | info | debug\n    log_file        -> path to a log file (optional; stdout is always used)\n\n  Notes:\n    - CLI flags override XML values.\n-->\n<config>\n  <default_margin></default_margin>\n  <log_level>normal</log_level>\n  <log_file>{suggested_log}</log_file>\n</config>\n"
    );

    fs::write(path, content)?;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));

    info!("created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(
            &p,
            "<config>\n  <default_margin>16M</default_margin>\n  <log_level>debug</log_level>\n  <log_file>/var/log/lvshift.log</log_file>\n</config>\n",
        )
        .unwrap();

        let cfg = load_config_from_path(&p).unwrap();
        assert_eq!(cfg.default_margin, Some(16 * 1024 * 1024));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file.as_deref(), Some(Path::new("/var/log/lvshift.log")));
    }

    #[test]
    fn empty_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(&p, "<config>\n  <default_margin></default_margin>\n</config>\n").unwrap();

        let cfg = load_config_from_path(&p).unwrap();
        assert_eq!(cfg.default_margin, None);
        assert_eq!(cfg.log_level, LogLevel::Normal);
    }

    #[test]
    fn unknown_field_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(&p, "<config><margn>16M</margn></config>").unwrap();
        assert!(load_config_from_path(&p).is_err());
    }

    #[test]
    fn bad_margin_string_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.xml");
        fs::write(&p, "<config><default_margin>lots</default_margin></config>").unwrap();
        assert!(load_config_from_path(&p).is_err());
    }

    #[test]
    fn template_round_trips_through_the_parser() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sub").join("config.xml");
        create_template_config(&p).unwrap();
        let cfg = load_config_from_path(&p).unwrap();
        assert_eq!(cfg.default_margin, None);
        assert_eq!(cfg.log_level, LogLevel::Normal);
    }
}
