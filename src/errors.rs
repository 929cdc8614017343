//! Typed error definitions for lvshift.
//! Every fatal condition carries a specific, named reason; nothing is ever
//! downgraded to a warning or replaced with a guessed value.

use thiserror::Error;

use crate::extents::ExtentError;
use crate::validate::RejectReason;

#[derive(Debug, Error)]
pub enum LvShiftError {
    /// A needed property could not be read. There is no fallback: a missing
    /// number must never be treated as zero.
    #[error("inspection failed: could not read {property} for {subject}: {detail}")]
    InspectionFailed {
        subject: String,
        property: &'static str,
        detail: String,
    },

    /// Size arithmetic produced a nonsensical result; the pool or the caller
    /// is reporting inconsistent numbers.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The validator refused the move. Expected and user-facing, not a bug.
    #[error("move rejected ({}): {}", .0.tag(), .0)]
    Rejected(RejectReason),

    /// An external command failed mid-plan. Earlier steps are not undone.
    #[error("step '{step}' failed ({command}): {detail}")]
    StepFailed {
        step: &'static str,
        command: String,
        detail: String,
    },

    /// Another run holds the pool lock; refusing to race it.
    #[error("pool '{0}' is locked by another capacity operation")]
    PoolBusy(String),

    #[error("interrupted between steps; no step was cut short")]
    Interrupted,
}

impl LvShiftError {
    /// Process exit code for this failure class. `0` is reserved for a run
    /// in which every step completed.
    pub fn code(&self) -> i32 {
        match self {
            LvShiftError::Rejected(_) => 1,
            LvShiftError::InspectionFailed { .. } => 2,
            LvShiftError::InvalidPlan(_) => 3,
            LvShiftError::StepFailed { .. } => 4,
            LvShiftError::PoolBusy(_) => 5,
            LvShiftError::Interrupted => 130,
        }
    }

    /// Short machine-friendly tag used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LvShiftError::Rejected(_) => "rejected",
            LvShiftError::InspectionFailed { .. } => "inspection_failed",
            LvShiftError::InvalidPlan(_) => "invalid_plan",
            LvShiftError::StepFailed { .. } => "step_failed",
            LvShiftError::PoolBusy(_) => "pool_busy",
            LvShiftError::Interrupted => "interrupted",
        }
    }
}

impl From<ExtentError> for LvShiftError {
    fn from(e: ExtentError) -> Self {
        LvShiftError::InvalidPlan(e.to_string())
    }
}
