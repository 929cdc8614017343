//! Go/no-go decision for a proposed capacity move.
//!
//! The validator is a pure predicate-plus-derived-values function: same
//! inputs, same answer, no side effects. Checks run in a fixed order and
//! the first failure wins, so a mounted source is reported as such before
//! any arithmetic is attempted.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::errors::LvShiftError;
use crate::extents::{self, ExtentError};
use crate::inspect::{PoolInfo, VolumeReport};
use crate::units::format_size;

/// Extra headroom required beyond the filesystem's own minimum, in pool
/// extents. Convention inherited from the shell tooling this replaces;
/// callers may raise the margin but never lower it below this floor.
pub const DEFAULT_MARGIN_EXTENTS: u64 = 2;

/// What the caller asked for, carried explicitly through the pipeline.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub source: String,
    pub dest: String,
    /// Requested delta in bytes, before extent rounding.
    pub delta: u64,
    /// Explicit margin override in bytes, raised to the floor if smaller.
    pub margin: Option<u64>,
}

/// Why a move was refused. Expected, user-facing outcomes, not bugs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("{volume} has role '{role}'; only plain volumes can take part in a move")]
    RoleIneligible { volume: String, role: &'static str },

    #[error("{source_vol} is in pool '{source_pool}' but {dest} is in pool '{dest_pool}'")]
    CrossPool {
        source_vol: String,
        source_pool: String,
        dest: String,
        dest_pool: String,
    },

    #[error("destination {volume} carries '{fs}', which cannot be grown online")]
    DestinationUnsupportedFs { volume: String, fs: String },

    #[error("source {volume} is mounted at {mount}; shrinking is an offline-only operation")]
    SourceMounted { volume: String, mount: String },

    #[error("source {volume} carries '{fs}', which cannot be shrunk safely")]
    SourceNotTargetFs { volume: String, fs: String },

    #[error("removing {granted} would leave {volume} with no capacity at all")]
    RequestedTooLarge { volume: String, granted: String },

    #[error(
        "{volume} would end at {new_size}, below the minimum safe size {min_safe} plus the {margin} margin"
    )]
    BelowMinimumPlusMargin {
        volume: String,
        new_size: String,
        min_safe: String,
        margin: String,
    },
}

impl RejectReason {
    /// Stable kebab-case tag for scripts and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            RejectReason::RoleIneligible { .. } => "role-ineligible",
            RejectReason::CrossPool { .. } => "cross-pool",
            RejectReason::DestinationUnsupportedFs { .. } => "destination-unsupported-fs",
            RejectReason::SourceMounted { .. } => "source-mounted",
            RejectReason::SourceNotTargetFs { .. } => "source-not-target-fs",
            RejectReason::RequestedTooLarge { .. } => "requested-too-large",
            RejectReason::BelowMinimumPlusMargin { .. } => "below-minimum-plus-margin",
        }
    }
}

/// The numbers a plan is built from. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedMove {
    /// Pool allocation granularity in bytes.
    pub extent_size: u64,
    /// Rounded delta in whole extents.
    pub delta_extents: u64,
    /// Bytes actually granted: `delta_extents * extent_size`.
    pub granted_delta: u64,
    /// Source size after the shrink.
    pub new_source_size: u64,
    /// Filesystem's own minimum safe size.
    pub min_safe_size: u64,
    /// Effective safety margin in bytes.
    pub margin: u64,
}

impl fmt::Display for ValidatedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} extents, source ends at {}",
            format_size(self.granted_delta),
            self.delta_extents,
            format_size(self.new_source_size)
        )
    }
}

fn reject(reason: RejectReason) -> LvShiftError {
    LvShiftError::Rejected(reason)
}

/// Validate a move request against the inspector's reports.
///
/// On acceptance returns the derived numbers for the plan builder; on
/// refusal returns `Rejected` with the specific reason, or `InvalidPlan`
/// when the reported sizes themselves are inconsistent.
pub fn validate(
    req: &MoveRequest,
    source: &VolumeReport,
    dest: &VolumeReport,
    pool: &PoolInfo,
) -> Result<ValidatedMove, LvShiftError> {
    // 1. Roles: both ends must be plain volumes.
    for vol in [source, dest] {
        if !vol.role.is_eligible() {
            return Err(reject(RejectReason::RoleIneligible {
                volume: vol.qualified_name(),
                role: vol.role.as_str(),
            }));
        }
    }

    // 2. Same pool.
    if source.pool != dest.pool {
        return Err(reject(RejectReason::CrossPool {
            source_vol: source.qualified_name(),
            source_pool: source.pool.clone(),
            dest: dest.qualified_name(),
            dest_pool: dest.pool.clone(),
        }));
    }

    // 3. Destination must grow online.
    if !dest.fs.supports_online_grow() {
        return Err(reject(RejectReason::DestinationUnsupportedFs {
            volume: dest.qualified_name(),
            fs: dest.fs.describe(),
        }));
    }

    // 4. Source must be offline, before any arithmetic.
    if let Some(mount) = &source.mount {
        return Err(reject(RejectReason::SourceMounted {
            volume: source.qualified_name(),
            mount: mount.display().to_string(),
        }));
    }

    // 5. Source filesystem must be shrinkable.
    if !source.fs.supports_shrink() {
        return Err(reject(RejectReason::SourceNotTargetFs {
            volume: source.qualified_name(),
            fs: source.fs.describe(),
        }));
    }

    // 6. Round the delta and derive the shrunken size.
    let extent_size = pool.extent_size;
    let delta_extents = extents::units_for(req.delta, extent_size)?;
    let granted_delta = extents::granted_bytes(delta_extents, extent_size)?;
    let new_source_size = match extents::shrunken_size(source.size, delta_extents, extent_size) {
        Ok(size) => size,
        Err(ExtentError::ExhaustsVolume { .. }) => {
            return Err(reject(RejectReason::RequestedTooLarge {
                volume: source.qualified_name(),
                granted: format_size(granted_delta),
            }));
        }
        Err(other) => return Err(other.into()),
    };

    // 7. Margin floor: twice the extent size; overrides may only raise it.
    let floor = extent_size
        .checked_mul(DEFAULT_MARGIN_EXTENTS)
        .ok_or_else(|| LvShiftError::InvalidPlan("margin computation overflowed".into()))?;
    let margin = match req.margin {
        Some(m) if m < floor => {
            warn!(
                requested = m,
                floor, "margin override below the floor; raising it"
            );
            floor
        }
        Some(m) => m,
        None => floor,
    };

    // 8. The load-bearing inequality: S' >= M + margin.
    let min_safe_size = source
        .min_safe_size
        .ok_or_else(|| LvShiftError::InspectionFailed {
            subject: source.qualified_name(),
            property: "minimum safe size",
            detail: "no resize estimate was collected for the source filesystem".into(),
        })?;
    let required = min_safe_size
        .checked_add(margin)
        .ok_or_else(|| LvShiftError::InvalidPlan("minimum-plus-margin overflowed".into()))?;
    if new_source_size < required {
        return Err(reject(RejectReason::BelowMinimumPlusMargin {
            volume: source.qualified_name(),
            new_size: format_size(new_source_size),
            min_safe: format_size(min_safe_size),
            margin: format_size(margin),
        }));
    }

    Ok(ValidatedMove {
        extent_size,
        delta_extents,
        granted_delta,
        new_source_size,
        min_safe_size,
        margin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{FsKind, VolumeRole};
    use std::path::PathBuf;

    const G: u64 = 4 * 1024 * 1024;
    const GIB: u64 = 1 << 30;

    fn pool() -> PoolInfo {
        PoolInfo {
            name: "vg0".into(),
            extent_size: G,
            size: 500 * GIB,
            free: 100 * GIB,
        }
    }

    fn volume(name: &str, size: u64) -> VolumeReport {
        VolumeReport {
            name: name.into(),
            pool: "vg0".into(),
            path: PathBuf::from(format!("/dev/vg0/{name}")),
            size,
            role: VolumeRole::Plain,
            fs: FsKind::Ext4,
            mount: None,
            min_safe_size: None,
        }
    }

    fn request(delta: u64) -> MoveRequest {
        MoveRequest {
            source: "vg0/src".into(),
            dest: "vg0/dst".into(),
            delta,
            margin: None,
        }
    }

    #[test]
    fn accepts_the_reference_scenario() {
        // 200 GiB source, 50 GiB minimum, 20 GiB requested, default margin.
        let mut src = volume("src", 200 * GIB);
        src.min_safe_size = Some(50 * GIB);
        let dst = volume("dst", 100 * GIB);

        let v = validate(&request(20 * GIB), &src, &dst, &pool()).unwrap();
        assert_eq!(v.granted_delta, 20 * GIB);
        assert_eq!(v.delta_extents, 5120);
        assert_eq!(v.new_source_size, 180 * GIB);
        assert_eq!(v.margin, 2 * G);
    }

    #[test]
    fn rejects_below_minimum_plus_margin() {
        let mut src = volume("src", 200 * GIB);
        src.min_safe_size = Some(50 * GIB);
        let dst = volume("dst", 100 * GIB);

        let err = validate(&request(151 * GIB), &src, &dst, &pool()).unwrap_err();
        match err {
            LvShiftError::Rejected(r) => assert_eq!(r.tag(), "below-minimum-plus-margin"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn mounted_source_rejected_before_arithmetic() {
        let mut src = volume("src", 200 * GIB);
        src.mount = Some(PathBuf::from("/srv"));
        // No minimum collected: if arithmetic or the margin check ran first,
        // this would surface as InspectionFailed instead.
        let dst = volume("dst", 100 * GIB);

        let err = validate(&request(20 * GIB), &src, &dst, &pool()).unwrap_err();
        match err {
            LvShiftError::Rejected(r) => assert_eq!(r.tag(), "source-mounted"),
            other => panic!("unexpected: {other}"),
        }
    }
}
