//! ext4 resize-estimation and consistency-check plumbing.
//!
//! The minimum safe size comes from the filesystem's own estimator:
//! `resize2fs -P` reports a minimum block count, `tune2fs -l` the block
//! size; the product is the smallest byte size a shrink may target. The
//! `e2fsck` exit status is a bitmask and is decoded here rather than being
//! treated as a plain zero/non-zero.

use std::path::Path;

use super::run_capture;
use crate::errors::LvShiftError;

/// "Estimated minimum size of the filesystem: 1310720"
fn parse_minimum_blocks(raw: &str) -> Option<u64> {
    raw.lines()
        .find_map(|line| line.trim().strip_prefix("Estimated minimum size of the filesystem:"))
        .and_then(|rest| rest.trim().parse().ok())
}

/// "Block size:               4096"
fn parse_block_size(raw: &str) -> Option<u64> {
    raw.lines()
        .find_map(|line| line.trim().strip_prefix("Block size:"))
        .and_then(|rest| rest.trim().parse().ok())
}

/// Probe the minimum safe size of the ext4 filesystem on `path`, in bytes.
/// Purely observational; the filesystem must be unmounted for the estimate
/// to be trustworthy, which the caller has already established.
pub fn min_safe_size(path: &Path) -> Result<u64, LvShiftError> {
    let device = path.display().to_string();

    let estimate_out = run_capture("resize2fs", &["-P", &device])?;
    let blocks = parse_minimum_blocks(&estimate_out).ok_or_else(|| {
        LvShiftError::InspectionFailed {
            subject: device.clone(),
            property: "minimum block count",
            detail: "resize2fs -P output did not contain an estimate".into(),
        }
    })?;

    let tune_out = run_capture("tune2fs", &["-l", &device])?;
    let block_size = parse_block_size(&tune_out).ok_or_else(|| {
        LvShiftError::InspectionFailed {
            subject: device.clone(),
            property: "block size",
            detail: "tune2fs -l output did not contain a block size".into(),
        }
    })?;

    blocks
        .checked_mul(block_size)
        .ok_or_else(|| LvShiftError::InspectionFailed {
            subject: device,
            property: "minimum safe size",
            detail: format!("{blocks} blocks of {block_size} bytes overflows"),
        })
}

/// Decoded `e2fsck` exit status. The exit code is a bitmask; bits compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsckOutcome(i32);

impl FsckOutcome {
    pub const CORRECTED: i32 = 1;
    pub const CORRECTED_REBOOT: i32 = 2;
    pub const UNCORRECTED: i32 = 4;
    pub const OPERATIONAL_ERROR: i32 = 8;
    pub const USAGE_ERROR: i32 = 16;
    pub const CANCELLED: i32 = 32;
    pub const LIBRARY_ERROR: i32 = 128;

    pub fn from_code(code: i32) -> Self {
        FsckOutcome(code)
    }

    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// A plan may proceed only on a clean or fully corrected filesystem.
    pub fn is_acceptable(self) -> bool {
        self.0 & !(Self::CORRECTED | Self::CORRECTED_REBOOT) == 0
    }

    pub fn reboot_advised(self) -> bool {
        self.0 & Self::CORRECTED_REBOOT != 0
    }

    pub fn describe(self) -> String {
        if self.is_clean() {
            return "clean".into();
        }
        let mut parts = Vec::new();
        for (bit, name) in [
            (Self::CORRECTED, "errors corrected"),
            (Self::CORRECTED_REBOOT, "errors corrected, reboot advised"),
            (Self::UNCORRECTED, "errors left uncorrected"),
            (Self::OPERATIONAL_ERROR, "operational error"),
            (Self::USAGE_ERROR, "usage error"),
            (Self::CANCELLED, "cancelled"),
            (Self::LIBRARY_ERROR, "shared library error"),
        ] {
            if self.0 & bit != 0 {
                parts.push(name);
            }
        }
        if parts.is_empty() {
            format!("unknown status {}", self.0)
        } else {
            parts.join(", ")
        }
    }
}
