//! Volume selection and the confirmation gate.
//!
//! The thin front-end: resolves what the user named (or interactively
//! picks among eligible volumes) and gates real runs behind an explicit
//! "yes". The core pipeline behaves identically whether a request came
//! from here or was constructed non-interactively.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};

use crate::inspect::{Inventory, VolumeReport};
use crate::output as out;
use crate::plan::MovePlan;
use crate::units::format_size;

/// Match a user-supplied volume spec against the inventory.
/// Accepts "vg/lv", a bare LV name (if unique), or a device path.
pub fn resolve_volume<'a>(inv: &'a Inventory, spec: &str) -> Result<&'a VolumeReport> {
    let spec = spec.trim();
    if spec.is_empty() {
        bail!("empty volume name");
    }

    if spec.starts_with("/dev/") {
        return inv
            .volumes
            .iter()
            .find(|v| {
                crate::inspect::device_aliases(&v.path)
                    .iter()
                    .any(|a| a.as_str() == spec)
            })
            .ok_or_else(|| anyhow::anyhow!("no volume with device path '{spec}' found"));
    }

    if let Some((vg, lv)) = spec.split_once('/') {
        return inv
            .volumes
            .iter()
            .find(|v| v.pool == vg && v.name == lv)
            .ok_or_else(|| anyhow::anyhow!("no volume '{vg}/{lv}' found"));
    }

    let matches: Vec<&VolumeReport> = inv.volumes.iter().filter(|v| v.name == spec).collect();
    match matches.len() {
        0 => bail!("no volume named '{spec}' found"),
        1 => Ok(matches[0]),
        _ => bail!(
            "'{spec}' is ambiguous; qualify it as one of: {}",
            matches
                .iter()
                .map(|v| v.qualified_name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn listing_rows(volumes: &[&VolumeReport]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "VOLUME".into(),
        "SIZE".into(),
        "ROLE".into(),
        "FS".into(),
        "MOUNT".into(),
    ]];
    for v in volumes {
        rows.push(vec![
            v.qualified_name(),
            format_size(v.size),
            v.role.as_str().into(),
            v.fs.describe(),
            v.mount
                .as_ref()
                .map(|m| m.display().to_string())
                .unwrap_or_else(|| "-".into()),
        ]);
    }
    rows
}

/// Print every volume (optionally restricted to one pool), eligible first.
pub fn print_listing(inv: &Inventory, pool: Option<&str>) {
    let mut volumes: Vec<&VolumeReport> = inv
        .volumes
        .iter()
        .filter(|v| pool.is_none_or(|p| v.pool == p))
        .collect();
    volumes.sort_by(|a, b| {
        b.role
            .is_eligible()
            .cmp(&a.role.is_eligible())
            .then_with(|| a.qualified_name().cmp(&b.qualified_name()))
    });
    if volumes.is_empty() {
        out::print_info("no logical volumes discovered");
        return;
    }
    out::print_columns(&listing_rows(&volumes));
}

/// Interactively pick one volume among the eligible ones.
/// `exclude` removes an already-picked volume from the menu.
pub fn pick_volume<'a>(
    inv: &'a Inventory,
    prompt: &str,
    pool: Option<&str>,
    exclude: Option<&str>,
) -> Result<&'a VolumeReport> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("stdin is not a terminal; pass SOURCE and DEST explicitly");
    }

    let candidates: Vec<&VolumeReport> = inv
        .volumes
        .iter()
        .filter(|v| v.role.is_eligible())
        .filter(|v| pool.is_none_or(|p| v.pool == p))
        .filter(|v| exclude.is_none_or(|e| v.qualified_name() != e))
        .collect();
    if candidates.is_empty() {
        bail!("no eligible (plain) volumes to choose from");
    }

    out::print_user(prompt);
    for (i, v) in candidates.iter().enumerate() {
        let mount = v
            .mount
            .as_ref()
            .map(|m| format!(" mounted at {}", m.display()))
            .unwrap_or_default();
        out::print_user(&format!(
            "  [{}] {} ({}, {}{mount})",
            i + 1,
            v.qualified_name(),
            format_size(v.size),
            v.fs.describe(),
        ));
    }

    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let choice: usize = line.trim().parse().map_err(|_| {
        anyhow::anyhow!("expected a number between 1 and {}", candidates.len())
    })?;
    if choice == 0 || choice > candidates.len() {
        bail!("expected a number between 1 and {}", candidates.len());
    }
    Ok(candidates[choice - 1])
}

/// Human-readable plan summary: granularity, rounded delta, before/after
/// sizes, minimum safe size and margin.
pub fn print_plan_summary(plan: &MovePlan) {
    let n = &plan.numbers;
    out::print_user(&format!("pool:            {}", plan.pool));
    out::print_user(&format!(
        "granularity:     {} per extent",
        format_size(n.extent_size)
    ));
    out::print_user(&format!(
        "moving:          {} ({} extents)",
        format_size(n.granted_delta),
        n.delta_extents
    ));
    out::print_user(&format!(
        "source:          {} {} -> {}",
        plan.source,
        format_size(plan.source_size_before),
        format_size(n.new_source_size)
    ));
    out::print_user(&format!(
        "destination:     {} {} -> {}",
        plan.dest,
        format_size(plan.dest_size_before),
        format_size(plan.dest_size_after())
    ));
    out::print_user(&format!(
        "minimum safe:    {} (+ {} margin)",
        format_size(n.min_safe_size),
        format_size(n.margin)
    ));
    out::print_user("steps:");
    let total = plan.steps.len();
    for (i, step) in plan.steps.iter().enumerate() {
        out::print_step(i + 1, total, step.kind.title(), &step.command.render());
    }
}

/// Ask the user to type "yes" before mutating anything.
pub fn confirm(plan: &MovePlan) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("stdin is not a terminal; pass --yes to proceed without confirmation");
    }
    out::print_warn(&format!(
        "about to change sizes of {} and {}; this cannot be fully undone",
        plan.source, plan.dest
    ));
    print!("Proceed? Type 'yes' to continue: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}
