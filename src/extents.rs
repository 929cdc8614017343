//! Pool-granularity arithmetic.
//!
//! Every size an LVM volume can take is a whole number of extents. The
//! functions here round a requested byte delta up to extents (never down:
//! under-granting would leave the destination short of the space the caller
//! asked to protect) and derive the shrunken source size, refusing to
//! proceed on any inconsistency instead of coercing it.

use thiserror::Error;

/// Arithmetic failures. All of these indicate either a caller bug or a pool
/// reporting inconsistent numbers; none are recoverable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtentError {
    #[error("extent size must be positive")]
    ZeroGranularity,

    #[error("requested delta must be positive")]
    ZeroDelta,

    #[error("volume size {size} is not a multiple of the extent size {extent_size}")]
    NotAligned { size: u64, extent_size: u64 },

    #[error("removing {remove} bytes from a {size}-byte volume leaves nothing")]
    ExhaustsVolume { size: u64, remove: u64 },

    #[error("extent arithmetic overflowed ({units} units of {extent_size} bytes)")]
    Overflow { units: u64, extent_size: u64 },
}

/// Number of whole extents needed to cover `delta` bytes: ceil(delta / extent_size).
pub fn units_for(delta: u64, extent_size: u64) -> Result<u64, ExtentError> {
    if extent_size == 0 {
        return Err(ExtentError::ZeroGranularity);
    }
    if delta == 0 {
        return Err(ExtentError::ZeroDelta);
    }
    Ok(delta.div_ceil(extent_size))
}

/// Bytes actually granted by `units` extents.
pub fn granted_bytes(units: u64, extent_size: u64) -> Result<u64, ExtentError> {
    units
        .checked_mul(extent_size)
        .ok_or(ExtentError::Overflow { units, extent_size })
}

/// New source size after removing `units` extents.
///
/// Fails if the current size is not extent-aligned (the pool is reporting
/// inconsistent numbers) or if the removal would leave a zero or negative
/// size.
pub fn shrunken_size(current: u64, units: u64, extent_size: u64) -> Result<u64, ExtentError> {
    if extent_size == 0 {
        return Err(ExtentError::ZeroGranularity);
    }
    if !current.is_multiple_of(extent_size) {
        return Err(ExtentError::NotAligned {
            size: current,
            extent_size,
        });
    }
    let remove = granted_bytes(units, extent_size)?;
    if remove >= current {
        return Err(ExtentError::ExhaustsVolume {
            size: current,
            remove,
        });
    }
    Ok(current - remove)
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: u64 = 4 * 1024 * 1024; // 4 MiB, the common LVM default

    #[test]
    fn rounds_up_never_down() {
        assert_eq!(units_for(1, G).unwrap(), 1);
        assert_eq!(units_for(G, G).unwrap(), 1);
        assert_eq!(units_for(G + 1, G).unwrap(), 2);
        assert_eq!(units_for(20 * (1 << 30), G).unwrap(), 5120);
    }

    #[test]
    fn granted_bounds_hold() {
        // ceil(D/G)*G >= D and < D + G for a spread of deltas.
        for delta in [1, G - 1, G, G + 1, 3 * G + 7, 151 * (1u64 << 30)] {
            let n = units_for(delta, G).unwrap();
            let granted = granted_bytes(n, G).unwrap();
            assert!(granted >= delta);
            assert!(granted < delta + G);
        }
    }

    #[test]
    fn shrink_preserves_alignment() {
        let s = 200 * (1u64 << 30);
        let n = units_for(20 * (1 << 30), G).unwrap();
        let after = shrunken_size(s, n, G).unwrap();
        assert_eq!(after, 180 * (1u64 << 30));
        assert!(after.is_multiple_of(G));
    }

    #[test]
    fn refuses_unaligned_current_size() {
        let err = shrunken_size(G + 1, 1, G).unwrap_err();
        assert!(matches!(err, ExtentError::NotAligned { .. }));
    }

    #[test]
    fn refuses_exhausting_the_volume() {
        let err = shrunken_size(4 * G, 4, G).unwrap_err();
        assert!(matches!(err, ExtentError::ExhaustsVolume { .. }));
        let err = shrunken_size(4 * G, 5, G).unwrap_err();
        assert!(matches!(err, ExtentError::ExhaustsVolume { .. }));
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert_eq!(units_for(0, G).unwrap_err(), ExtentError::ZeroDelta);
        assert_eq!(units_for(1, 0).unwrap_err(), ExtentError::ZeroGranularity);
    }
}
