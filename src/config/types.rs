//! Core configuration types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration. Everything here has a working default; the XML
/// file and CLI flags only override.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default safety margin in bytes. `None` means "computed per pool"
    /// (twice the extent size). Raised to that floor if set lower.
    pub default_margin: Option<u64>,
    /// Console verbosity.
    pub log_level: LogLevel,
    /// Optional path to a log file.
    pub log_file: Option<PathBuf>,
    /// If true, print the plan but do not run any mutating command.
    pub dry_run: bool,
    /// If true, skip the interactive confirmation gate.
    pub assume_yes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_margin: None,
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
            dry_run: false,
            assume_yes: false,
        }
    }
}
