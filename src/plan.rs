//! Move-plan construction.
//!
//! A plan is an ordered list of external-command steps, fixed because each
//! step depends on the previous one's success: the filesystem is shrunk
//! before its volume (with one extent of slack so the filesystem is never
//! larger than its backing device), then regrown to fill, and only then is
//! the freed space handed to the destination. Each step carries an
//! informational note of what undoing it would mean; nothing here performs
//! rollback.

use std::path::Path;

use serde::Serialize;

use crate::inspect::VolumeReport;
use crate::units::format_size;
use crate::validate::ValidatedMove;

/// Which of the six fixed operations a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    CheckSourceFs,
    ShrinkSourceFs,
    ShrinkSourceVolume,
    RegrowSourceFs,
    GrowDestVolume,
    GrowDestFs,
}

impl StepKind {
    pub fn title(self) -> &'static str {
        match self {
            StepKind::CheckSourceFs => "consistency-check source filesystem",
            StepKind::ShrinkSourceFs => "shrink source filesystem",
            StepKind::ShrinkSourceVolume => "shrink source volume",
            StepKind::RegrowSourceFs => "regrow source filesystem to fill",
            StepKind::GrowDestVolume => "grow destination volume",
            StepKind::GrowDestFs => "grow destination filesystem to fill",
        }
    }

    /// Steps after the consistency check change sizes on disk.
    pub fn mutates(self) -> bool {
        !matches!(self, StepKind::CheckSourceFs)
    }
}

/// An external command, rendered identically for dry runs and real runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl ExternalCommand {
    fn new(program: &'static str, args: &[&str]) -> Self {
        ExternalCommand {
            program,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut s = String::from(self.program);
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub kind: StepKind,
    pub command: ExternalCommand,
    /// What undoing this step would mean. Informational only.
    pub undo: String,
}

/// Validated, immutable description of the whole move. Consumed exactly
/// once by the executor and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MovePlan {
    pub pool: String,
    pub source: String,
    pub dest: String,
    pub source_size_before: u64,
    pub dest_size_before: u64,
    pub numbers: ValidatedMove,
    pub steps: Vec<Step>,
}

impl MovePlan {
    pub fn dest_size_after(&self) -> u64 {
        self.dest_size_before + self.numbers.granted_delta
    }
}

/// Render a byte size the way `resize2fs` expects it: whole KiB with a 'K'
/// suffix. Floor division keeps the filesystem at or below the requested
/// size, never above it.
fn resize2fs_size(bytes: u64) -> String {
    format!("{}K", bytes / 1024)
}

/// Render a byte size the way the LVM tools expect an exact size.
fn lvm_size(bytes: u64) -> String {
    format!("{bytes}b")
}

/// Build the ordered step list from validated numbers. Infallible by
/// construction: a `ValidatedMove` can only come out of the validator.
pub fn build(source: &VolumeReport, dest: &VolumeReport, v: ValidatedMove) -> MovePlan {
    let src_dev = device(&source.path);
    let dst_dev = device(&dest.path);

    // The filesystem shrinks one extent below the planned volume size so
    // there is never a moment where it exceeds its backing device.
    let fs_shrink_target = v.new_source_size - v.extent_size;

    let steps = vec![
        Step {
            kind: StepKind::CheckSourceFs,
            command: ExternalCommand::new("e2fsck", &["-f", "-y", &src_dev]),
            undo: "nothing to undo; the check does not change sizes".into(),
        },
        Step {
            kind: StepKind::ShrinkSourceFs,
            command: ExternalCommand::new(
                "resize2fs",
                &[&src_dev, &resize2fs_size(fs_shrink_target)],
            ),
            undo: format!("resize2fs {src_dev} (regrow to fill the volume)"),
        },
        Step {
            kind: StepKind::ShrinkSourceVolume,
            command: ExternalCommand::new(
                "lvreduce",
                &["--force", "--size", &lvm_size(v.new_source_size), &src_dev],
            ),
            undo: format!(
                "lvextend --size +{} {src_dev} (restore the removed extents)",
                lvm_size(v.granted_delta)
            ),
        },
        Step {
            kind: StepKind::RegrowSourceFs,
            command: ExternalCommand::new("resize2fs", &[&src_dev]),
            undo: "nothing to undo; filling the volume strands no space".into(),
        },
        Step {
            kind: StepKind::GrowDestVolume,
            command: ExternalCommand::new(
                "lvextend",
                &[
                    "--size",
                    &format!("+{}", lvm_size(v.granted_delta)),
                    &dst_dev,
                ],
            ),
            undo: format!(
                "lvreduce --size -{} {dst_dev} (only safe before the filesystem grows)",
                lvm_size(v.granted_delta)
            ),
        },
        Step {
            kind: StepKind::GrowDestFs,
            command: ExternalCommand::new("resize2fs", &[&dst_dev]),
            undo: "shrinking back would need the full offline procedure again".into(),
        },
    ];

    MovePlan {
        pool: source.pool.clone(),
        source: source.qualified_name(),
        dest: dest.qualified_name(),
        source_size_before: source.size,
        dest_size_before: dest.size,
        numbers: v,
        steps,
    }
}

fn device(path: &Path) -> String {
    path.display().to_string()
}

/// One-line human summary used above the step list.
pub fn describe(plan: &MovePlan) -> String {
    format!(
        "move {} from {} to {} in pool '{}' (granularity {}, margin {})",
        format_size(plan.numbers.granted_delta),
        plan.source,
        plan.dest,
        plan.pool,
        format_size(plan.numbers.extent_size),
        format_size(plan.numbers.margin),
    )
}
