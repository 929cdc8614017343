//! Plan execution.
//!
//! Steps run strictly in order; a failing step halts the run and later
//! steps are never attempted. Completed steps are not undone — the shrink
//! sequence is not safely reversible once partially applied, so the policy
//! is to fail loud rather than attempt clever recovery on live data.
//!
//! Dry runs walk the identical step list with the identical numbers and
//! only skip the actual invocation, which is what makes the arithmetic
//! testable without a real pool. An interrupt is honored between steps
//! only; a started external command is always waited out.

use std::io;
use std::process::Command;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::LvShiftError;
use crate::inspect::FsckOutcome;
use crate::plan::{ExternalCommand, MovePlan, StepKind};
use crate::shutdown;

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stderr: String,
}

/// Seam between the executor and the outside world. The real runner shells
/// out; tests substitute scripted or recording runners.
pub trait CommandRunner {
    fn run(&mut self, cmd: &ExternalCommand) -> io::Result<CommandOutput>;
}

/// Invokes the command for real, waiting for it to terminate.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &ExternalCommand) -> io::Result<CommandOutput> {
        let output = Command::new(cmd.program)
            .args(&cmd.args)
            .env("LC_ALL", "C")
            .output()?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// What happened to one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub kind: StepKind,
    pub command: String,
    pub invoked: bool,
}

/// Per-run summary returned on success.
#[derive(Debug, Clone, Serialize)]
pub struct ExecSummary {
    pub dry_run: bool,
    pub steps: Vec<StepResult>,
}

fn step_failed(kind: StepKind, command: &ExternalCommand, detail: String) -> LvShiftError {
    LvShiftError::StepFailed {
        step: kind.title(),
        command: command.render(),
        detail,
    }
}

/// Run every step of the plan in order.
pub fn execute(
    plan: &MovePlan,
    runner: &mut dyn CommandRunner,
    dry_run: bool,
) -> Result<ExecSummary, LvShiftError> {
    let mut results = Vec::with_capacity(plan.steps.len());

    for (idx, step) in plan.steps.iter().enumerate() {
        // Cancellation is honored here, between steps, and nowhere else.
        if shutdown::is_requested() {
            warn!(completed = idx, "interrupt received; stopping before the next step");
            return Err(LvShiftError::Interrupted);
        }

        let rendered = step.command.render();
        info!(
            step = idx + 1,
            total = plan.steps.len(),
            kind = step.kind.title(),
            command = %rendered,
            dry_run,
            "step"
        );

        if dry_run {
            results.push(StepResult {
                kind: step.kind,
                command: rendered,
                invoked: false,
            });
            continue;
        }

        let output = runner
            .run(&step.command)
            .map_err(|e| step_failed(step.kind, &step.command, e.to_string()))?;

        match step.kind {
            StepKind::CheckSourceFs => {
                let outcome = FsckOutcome::from_code(output.code);
                if !outcome.is_acceptable() {
                    return Err(step_failed(
                        step.kind,
                        &step.command,
                        format!("filesystem check reported: {}", outcome.describe()),
                    ));
                }
                if outcome.reboot_advised() {
                    warn!("filesystem errors were corrected; a reboot was advised");
                } else if !outcome.is_clean() {
                    info!("filesystem errors were corrected");
                }
            }
            _ => {
                if output.code != 0 {
                    return Err(step_failed(
                        step.kind,
                        &step.command,
                        format!("exit code {}: {}", output.code, output.stderr.trim()),
                    ));
                }
            }
        }

        results.push(StepResult {
            kind: step.kind,
            command: rendered,
            invoked: true,
        });
    }

    Ok(ExecSummary {
        dry_run,
        steps: results,
    })
}
