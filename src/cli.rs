//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - SOURCE and DEST accept "vg/lv", a bare LV name (when unambiguous), or
//!   a device path; both may be omitted for interactive selection.
//! - --debug is a shorthand for --log-level debug.

use clap::Parser;

use crate::config::{Config, LogLevel};
use crate::units::parse_size;

/// Move capacity between logical volumes of the same pool.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Safely shift capacity between LVM logical volumes",
    long_about = "Shrinks an unmounted ext4 source volume and grows a destination volume \
in the same volume group by the freed amount, refusing any plan that could \
truncate a filesystem. Run with --dry-run first: a dry run prints exactly \
the commands a real run would execute, with the same numbers.\n\n\
Exit codes: 0 success, 1 move rejected, 2 inspection failed, 3 invalid \
plan, 4 step failed, 5 pool busy, 130 interrupted."
)]
pub struct Args {
    /// Source volume: vg/lv, bare LV name, or device path.
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Destination volume: vg/lv, bare LV name, or device path.
    #[arg(value_name = "DEST")]
    pub dest: Option<String>,

    /// Capacity to move, e.g. 20G, 512M, or plain bytes.
    #[arg(long, short = 's', value_name = "SIZE", value_parser = parse_size_arg)]
    pub size: Option<u64>,

    /// Safety margin kept above the filesystem minimum (default: twice the
    /// pool extent size; smaller values are raised to that floor).
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub margin: Option<u64>,

    /// Proceed without the interactive confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the plan and the exact commands, but execute nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the plan summary and results as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// List eligible volumes and exit.
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Restrict listing/selection to one volume group.
    #[arg(long, value_name = "VG")]
    pub pool: Option<String>,

    /// Enable debug logging (shorthand for --log-level debug).
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Set log level: quiet, normal, info, debug.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Print the config file location used by lvshift and exit.
    #[arg(long)]
    pub print_config: bool,
}

fn parse_size_arg(s: &str) -> Result<u64, String> {
    let bytes = parse_size(s)?;
    if bytes == 0 {
        return Err("size must be positive".into());
    }
    Ok(bytes)
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset
    /// flags; CLI always wins over XML.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(margin) = self.margin {
            cfg.default_margin = Some(margin);
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
        if self.yes {
            cfg.assume_yes = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
