//! Configuration: types, default paths, XML loading.
//! CLI flags always override config values; the config file itself is
//! optional and a commented template is created on first run.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_path};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LVSHIFT_CONFIG";
