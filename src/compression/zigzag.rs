//! ZigZag mapping between signed and unsigned 64-bit integers
//!
//! Small magnitudes of either sign map to small unsigned values:
//! 0 → 0, -1 → 1, 1 → 2, -2 → 3, ... which keeps the bit widths of
//! signed deltas low enough for simple8b.

/// Map a signed value onto the unsigned zigzag domain
#[inline]
pub const fn zigzag_encode(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

/// Inverse of [`zigzag_encode`]
#[inline]
pub const fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// ZigZag-encode a slice in place, reinterpreting each word as `i64`
///
/// Returns the largest encoded value.
pub fn zigzag_encode_slice(values: &mut [u64]) -> u64 {
    let mut max = 0;
    for v in values.iter_mut() {
        *v = zigzag_encode(*v as i64);
        max = max.max(*v);
    }
    max
}

/// ZigZag-decode a slice in place, storing each `i64` result as its bit pattern
pub fn zigzag_decode_slice(values: &mut [u64]) {
    for v in values.iter_mut() {
        *v = zigzag_decode(*v) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_small_values() {
        let cases: [(i64, u64); 7] =
            [(0, 0), (-1, 1), (1, 2), (-2, 3), (2, 4), (-64, 127), (64, 128)];
        for (signed, unsigned) in cases {
            assert_eq!(zigzag_encode(signed), unsigned, "encode {}", signed);
            assert_eq!(zigzag_decode(unsigned), signed, "decode {}", unsigned);
        }
    }

    #[test]
    fn test_zigzag_extremes() {
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
        assert_eq!(zigzag_decode(u64::MAX - 1), i64::MAX);
    }

    #[test]
    fn test_zigzag_slice_returns_max() {
        let mut values = vec![0u64, (-3i64) as u64, 2, (-1i64) as u64];
        let max = zigzag_encode_slice(&mut values);
        assert_eq!(values, vec![0, 5, 4, 1]);
        assert_eq!(max, 5);

        zigzag_decode_slice(&mut values);
        assert_eq!(values, vec![0, (-3i64) as u64, 2, (-1i64) as u64]);
    }

    #[test]
    fn test_zigzag_empty_slice() {
        let mut values: Vec<u64> = Vec::new();
        assert_eq!(zigzag_encode_slice(&mut values), 0);
        zigzag_decode_slice(&mut values);
        assert!(values.is_empty());
    }
}
