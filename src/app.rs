//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers,
//! inspects the pool, validates the request, builds the plan, gates it
//! behind confirmation and the pool lock, and runs the executor.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::cli::Args;
use crate::config::{self, CONFIG_ENV, Config};
use crate::errors::LvShiftError;
use crate::exec::{self, ExecSummary, SystemRunner};
use crate::inspect::{self, FsKind, Inventory, VolumeReport};
use crate::lock;
use crate::logging::init_tracing;
use crate::output as out;
use crate::plan::{self, MovePlan};
use crate::select;
use crate::shutdown;
use crate::units::format_size;
use crate::validate::{self, MoveRequest};

/// Machine-readable output for --json: the plan, and the execution result
/// when one exists.
#[derive(Serialize)]
struct JsonReport<'a> {
    plan: &'a MovePlan,
    result: Option<&'a ExecSummary>,
}

fn print_config_location() {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("using {CONFIG_ENV} (explicit):\n  {explicit}"));
        out::print_info(&format!(
            "to override, unset {CONFIG_ENV} or point it at another file"
        ));
        return;
    }
    match config::default_config_path() {
        Ok(p) => {
            out::print_info(&format!("default lvshift config path:\n  {}", p.display()));
            if p.exists() {
                out::print_info("a config file already exists at that location");
            } else {
                out::print_info("no config file exists there yet; one is created on first run");
            }
        }
        Err(e) => out::print_error(&format!("could not determine a default config path: {e}")),
    }
}

fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Log the failure with its machine tag before handing it to main.
fn log_failure(e: &anyhow::Error) {
    if let Some(le) = e.downcast_ref::<LvShiftError>() {
        error!(code = le.code(), kind = le.kind(), error = %le, "run failed");
    } else {
        error!(error = ?e, "run failed");
    }
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init.
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    // Build config; CLI flags win over XML values.
    let mut cfg = config::load_config()?;
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so the signal handler can
    // drop it to flush the file appender.
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .map_err(|e| {
            out::print_error(&format!("failed to initialize logging: {e}"));
            e
        })?;
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("interrupt received; stopping after the current step");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .expect("failed to install signal handler");
    }

    debug!(?args, "starting lvshift");

    let result = run_inner(&args, &cfg);
    if let Err(e) = &result {
        log_failure(e);
    }

    // Ensure logs are flushed before exit.
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn run_inner(args: &Args, cfg: &Config) -> Result<()> {
    if args.list {
        inspect::require_tools(false)?;
        let inv = inspect::gather()?;
        return list_volumes(&inv, args);
    }

    let Some(delta) = args.size else {
        bail!("--size is required for a move (or use --list to look around)");
    };

    inspect::require_tools(true)?;
    let inv = inspect::gather()?;

    // Resolve both ends, interactively where not named.
    let source = match &args.source {
        Some(spec) => select::resolve_volume(&inv, spec)?,
        None => select::pick_volume(
            &inv,
            "Select the source volume (it will shrink):",
            args.pool.as_deref(),
            None,
        )?,
    };
    let source_name = source.qualified_name();
    let dest = match &args.dest {
        Some(spec) => select::resolve_volume(&inv, spec)?,
        None => select::pick_volume(
            &inv,
            "Select the destination volume (it will grow):",
            args.pool.as_deref(),
            Some(&source_name),
        )?,
    };
    if source.qualified_name() == dest.qualified_name() {
        bail!("source and destination are the same volume");
    }

    // The mutating LVM commands need root anyway; fail early instead of at
    // step three. Dry runs and listings stay unprivileged.
    if !cfg.dry_run && !is_root() {
        bail!("a real run requires root; re-run with sudo, or use --dry-run");
    }

    // Probe the filesystem's own minimum before validating. Only possible
    // for an unmounted ext4 source; the validator rejects everything else
    // with a specific reason first.
    let mut source = source.clone();
    let dest = dest.clone();
    if source.mount.is_none() && source.fs == FsKind::Ext4 {
        source.min_safe_size = Some(inspect::min_safe_size(&source.path)?);
    }

    let pool = inv
        .pool(&source.pool)
        .ok_or_else(|| LvShiftError::InspectionFailed {
            subject: source.pool.clone(),
            property: "pool record",
            detail: "volume group missing from the vgs report".into(),
        })?;

    let req = MoveRequest {
        source: source.qualified_name(),
        dest: dest.qualified_name(),
        delta,
        margin: cfg.default_margin,
    };
    let validated = validate::validate(&req, &source, &dest, pool)?;
    let plan = plan::build(&source, &dest, validated);

    if !args.json {
        out::print_info(&plan::describe(&plan));
        select::print_plan_summary(&plan);
    }

    // Confirmation gate; dry runs have nothing to confirm.
    if !cfg.dry_run && !cfg.assume_yes {
        if !select::confirm(&plan)? {
            out::print_info("aborted; nothing was changed");
            return Ok(());
        }
    }

    // Exclusive access for the mutating phase. Dry runs take no lock: they
    // must leave no trace, not even a lock file.
    let _pool_lock = if cfg.dry_run {
        None
    } else {
        match lock::try_lock_pool(&plan.pool) {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => return Err(LvShiftError::PoolBusy(plan.pool.clone()).into()),
            Err(e) => {
                return Err(e).context(format!("could not acquire the '{}' pool lock", plan.pool));
            }
        }
    };

    let mut runner = SystemRunner;
    let summary = exec::execute(&plan, &mut runner, cfg.dry_run)?;

    if args.json {
        let report = JsonReport {
            plan: &plan,
            result: Some(&summary),
        };
        out::print_user(&serde_json::to_string_pretty(&report)?);
    } else if cfg.dry_run {
        out::print_info("dry run complete; no command was executed");
    } else {
        out::print_success(&format!(
            "moved {} from {} to {}",
            format_size(plan.numbers.granted_delta),
            plan.source,
            plan.dest
        ));
    }
    Ok(())
}

fn list_volumes(inv: &Inventory, args: &Args) -> Result<()> {
    if args.json {
        let volumes: Vec<&VolumeReport> = inv
            .volumes
            .iter()
            .filter(|v| args.pool.as_deref().is_none_or(|p| v.pool == p))
            .collect();
        out::print_user(&serde_json::to_string_pretty(&volumes)?);
    } else {
        select::print_listing(inv, args.pool.as_deref());
    }
    Ok(())
}
