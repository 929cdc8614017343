//! Properties of the pool-granularity arithmetic.

use lvshift::extents::{granted_bytes, shrunken_size, units_for};

const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;

#[test]
fn rounding_never_under_grants_and_never_over_grants_a_full_unit() {
    // ceil(D/G)*G >= D and ceil(D/G)*G < D + G
    for g in [512, 4 * MIB, 32 * MIB, 3 * MIB + 17] {
        for d in [
            1,
            g - 1,
            g,
            g + 1,
            7 * g,
            7 * g + g / 2,
            20 * GIB,
            151 * GIB + 3,
        ] {
            let n = units_for(d, g).unwrap();
            let granted = granted_bytes(n, g).unwrap();
            assert!(granted >= d, "under-grant for D={d} G={g}");
            assert!(granted < d + g, "over-grant for D={d} G={g}");
        }
    }
}

#[test]
fn shrinking_keeps_sizes_on_the_grid() {
    // S - N*G stays a multiple of G for aligned S.
    for g in [4 * MIB, 8 * MIB] {
        let s = 200 * GIB;
        for n in [1, 2, 100, 5120] {
            let after = shrunken_size(s, n, g).unwrap();
            assert_eq!(after % g, 0);
            assert_eq!(after, s - n * g);
        }
    }
}

#[test]
fn exact_multiples_round_to_themselves() {
    let g = 4 * MIB;
    let n = units_for(20 * GIB, g).unwrap();
    assert_eq!(granted_bytes(n, g).unwrap(), 20 * GIB);
}

#[test]
fn misaligned_volume_size_is_an_error_not_a_coercion() {
    let g = 4 * MIB;
    assert!(shrunken_size(200 * GIB + 1, 1, g).is_err());
}

#[test]
fn removing_everything_is_an_error() {
    let g = 4 * MIB;
    let s = 10 * g;
    assert!(shrunken_size(s, 10, g).is_err());
    assert!(shrunken_size(s, 11, g).is_err());
    assert!(shrunken_size(s, 9, g).is_ok());
}
