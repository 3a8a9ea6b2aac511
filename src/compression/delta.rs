//! In-place delta transforms over `u64` words
//!
//! All arithmetic wraps modulo 2^64, so any input round-trips regardless of
//! ordering. Index 0 is kept as-is; every later index becomes the difference
//! to its predecessor.

use super::zigzag::{zigzag_decode, zigzag_encode};

/// Replace each element after the first with its difference to the previous one
///
/// Walks from the end so the original predecessor is still in place when each
/// difference is taken. Returns the largest delta at indices ≥ 1 (0 when the
/// slice has fewer than two elements).
pub fn delta_encode(values: &mut [u64]) -> u64 {
    let mut max = 0;
    for i in (1..values.len()).rev() {
        let d = values[i].wrapping_sub(values[i - 1]);
        values[i] = d;
        max = max.max(d);
    }
    max
}

/// Prefix-sum inverse of [`delta_encode`]
pub fn delta_decode(values: &mut [u64]) {
    for i in 1..values.len() {
        values[i] = values[i].wrapping_add(values[i - 1]);
    }
}

/// Delta-encode then zigzag every element, including the first
///
/// The returned maximum covers indices ≥ 1 only, which are the values the
/// integer codec hands to simple8b.
pub fn zigzag_delta_encode(values: &mut [u64]) -> u64 {
    let mut max = 0;
    for i in (1..values.len()).rev() {
        let d = zigzag_encode(values[i].wrapping_sub(values[i - 1]) as i64);
        values[i] = d;
        max = max.max(d);
    }
    if let Some(first) = values.first_mut() {
        *first = zigzag_encode(*first as i64);
    }
    max
}

/// Inverse of [`zigzag_delta_encode`]
pub fn zigzag_delta_decode(values: &mut [u64]) {
    let mut prev = 0u64;
    for v in values.iter_mut() {
        prev = prev.wrapping_add(zigzag_decode(*v) as u64);
        *v = prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_roundtrip() {
        let original = vec![10u64, 12, 15, 15, 20];
        let mut values = original.clone();
        let max = delta_encode(&mut values);
        assert_eq!(values, vec![10, 2, 3, 0, 5]);
        assert_eq!(max, 5);

        delta_decode(&mut values);
        assert_eq!(values, original);
    }

    #[test]
    fn test_delta_wraps_on_decrease() {
        let mut values = vec![5u64, 3];
        let max = delta_encode(&mut values);
        assert_eq!(values[1], u64::MAX - 1);
        assert_eq!(max, u64::MAX - 1);
        delta_decode(&mut values);
        assert_eq!(values, vec![5, 3]);
    }

    #[test]
    fn test_delta_short_slices() {
        let mut empty: Vec<u64> = vec![];
        assert_eq!(delta_encode(&mut empty), 0);

        let mut single = vec![u64::MAX];
        assert_eq!(delta_encode(&mut single), 0);
        assert_eq!(single, vec![u64::MAX]);
    }

    #[test]
    fn test_zigzag_delta_roundtrip() {
        let original: Vec<u64> = [-5i64, -3, 0, 100, 99, i64::MIN, i64::MAX]
            .iter()
            .map(|&v| v as u64)
            .collect();
        let mut values = original.clone();
        zigzag_delta_encode(&mut values);
        assert_eq!(values[0], 9);
        assert_eq!(values[1], 4);
        zigzag_delta_decode(&mut values);
        assert_eq!(values, original);
    }

    #[test]
    fn test_zigzag_delta_max_skips_first() {
        let mut values = vec![(-1000i64) as u64, (-999i64) as u64, (-998i64) as u64];
        let max = zigzag_delta_encode(&mut values);
        assert_eq!(values, vec![1999, 2, 2]);
        assert_eq!(max, 2);
    }
}
