//! Simple8b bit packing
//!
//! Packs runs of small unsigned integers into 64-bit words. The top 4 bits of
//! every word hold a selector code naming one of 16 `(count, width)` layouts;
//! the low 60 bits hold `count` values of `width` bits each, the first value in
//! the least-significant bits.
//!
//! | code | count | width |   | code | count | width |
//! |------|-------|-------|---|------|-------|-------|
//! | 0    | 240   | 0     |   | 8    | 8     | 7     |
//! | 1    | 120   | 0     |   | 9    | 7     | 8     |
//! | 2    | 60    | 1     |   | 10   | 6     | 10    |
//! | 3    | 30    | 2     |   | 11   | 5     | 12    |
//! | 4    | 20    | 3     |   | 12   | 4     | 15    |
//! | 5    | 15    | 4     |   | 13   | 3     | 20    |
//! | 6    | 12    | 5     |   | 14   | 2     | 30    |
//! | 7    | 10    | 6     |   | 15   | 1     | 60    |
//!
//! Codes 0 and 1 are run-length shortcuts for 240 and 120 zeros. Their payload
//! bits are ignored. Some older simple8b writers used these codes for runs of
//! ones instead; such words decode here as zeros.
//!
//! # Example
//!
//! ```rust
//! use tscodec::compression::simple8b;
//!
//! let values = vec![1u64, 2, 3, 4, 5];
//! let words = simple8b::pack(&values).unwrap();
//! assert_eq!(simple8b::count_values(&words), 5);
//! assert_eq!(simple8b::unpack(&words).unwrap(), values);
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Largest value simple8b can store (60 bits)
pub const MAX_VALUE: u64 = (1 << 60) - 1;

/// Bit offset of the selector nibble inside a word
const SELECTOR_SHIFT: u32 = 60;

/// Word layout selector
///
/// Variants are ordered by their 4-bit code, which is also descending packing
/// density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Selector {
    /// 240 zeros
    Zeros240 = 0,
    /// 120 zeros
    Zeros120 = 1,
    /// 60 values of 1 bit
    N60 = 2,
    /// 30 values of 2 bits
    N30 = 3,
    /// 20 values of 3 bits
    N20 = 4,
    /// 15 values of 4 bits
    N15 = 5,
    /// 12 values of 5 bits
    N12 = 6,
    /// 10 values of 6 bits
    N10 = 7,
    /// 8 values of 7 bits
    N8 = 8,
    /// 7 values of 8 bits
    N7 = 9,
    /// 6 values of 10 bits
    N6 = 10,
    /// 5 values of 12 bits
    N5 = 11,
    /// 4 values of 15 bits
    N4 = 12,
    /// 3 values of 20 bits
    N3 = 13,
    /// 2 values of 30 bits
    N2 = 14,
    /// 1 value of 60 bits
    N1 = 15,
}

impl Selector {
    /// All selectors in code order (densest first)
    pub const ALL: [Selector; 16] = [
        Selector::Zeros240,
        Selector::Zeros120,
        Selector::N60,
        Selector::N30,
        Selector::N20,
        Selector::N15,
        Selector::N12,
        Selector::N10,
        Selector::N8,
        Selector::N7,
        Selector::N6,
        Selector::N5,
        Selector::N4,
        Selector::N3,
        Selector::N2,
        Selector::N1,
    ];

    /// Look up a selector by its 4-bit code
    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(CodecError::InvalidSelector(code))
    }

    /// Selector stored in the top nibble of a packed word
    #[inline]
    pub fn from_word(word: u64) -> Self {
        // A 4-bit nibble always indexes the table.
        Self::ALL[(word >> SELECTOR_SHIFT) as usize]
    }

    /// The 4-bit code
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Number of values one word holds
    #[inline]
    pub const fn count(self) -> usize {
        match self {
            Selector::Zeros240 => 240,
            Selector::Zeros120 => 120,
            Selector::N60 => 60,
            Selector::N30 => 30,
            Selector::N20 => 20,
            Selector::N15 => 15,
            Selector::N12 => 12,
            Selector::N10 => 10,
            Selector::N8 => 8,
            Selector::N7 => 7,
            Selector::N6 => 6,
            Selector::N5 => 5,
            Selector::N4 => 4,
            Selector::N3 => 3,
            Selector::N2 => 2,
            Selector::N1 => 1,
        }
    }

    /// Bit width of each value
    #[inline]
    pub const fn width(self) -> u32 {
        match self {
            Selector::Zeros240 | Selector::Zeros120 => 0,
            Selector::N60 => 1,
            Selector::N30 => 2,
            Selector::N20 => 3,
            Selector::N15 => 4,
            Selector::N12 => 5,
            Selector::N10 => 6,
            Selector::N8 => 7,
            Selector::N7 => 8,
            Selector::N6 => 10,
            Selector::N5 => 12,
            Selector::N4 => 15,
            Selector::N3 => 20,
            Selector::N2 => 30,
            Selector::N1 => 60,
        }
    }

    /// Mask covering one value
    #[inline]
    pub const fn mask(self) -> u64 {
        match self.width() {
            0 => 0,
            w => (1 << w) - 1,
        }
    }

    /// Whether `window` starts with `count()` values that all fit in `width()` bits
    #[inline]
    pub fn fits(self, window: &[u64]) -> bool {
        let n = self.count();
        let w = self.width();
        window.len() >= n && window[..n].iter().all(|&v| v >> w == 0)
    }

    /// Pack exactly `count()` values into one word
    ///
    /// Values must already satisfy [`Selector::fits`]; excess bits are masked
    /// off rather than spilling into neighbours.
    #[inline]
    pub fn pack(self, values: &[u64]) -> u64 {
        debug_assert_eq!(values.len(), self.count());
        let mut word = (self.code() as u64) << SELECTOR_SHIFT;
        let w = self.width();
        if w == 0 {
            return word;
        }
        let mask = self.mask();
        for (i, &v) in values.iter().enumerate() {
            word |= (v & mask) << (i as u32 * w);
        }
        word
    }

    /// Unpack one word into exactly `count()` slots of `dst`
    #[inline]
    pub fn unpack(self, word: u64, dst: &mut [u64]) {
        debug_assert_eq!(dst.len(), self.count());
        let w = self.width();
        if w == 0 {
            dst.fill(0);
            return;
        }
        let mask = self.mask();
        for (i, slot) in dst.iter_mut().enumerate() {
            *slot = (word >> (i as u32 * w)) & mask;
        }
    }
}

/// Pack values into simple8b words
///
/// Greedily picks the densest selector whose next `count()` values all fit.
///
/// # Errors
///
/// [`CodecError::ValueOutOfBounds`] when a value exceeds [`MAX_VALUE`].
pub fn pack(values: &[u64]) -> Result<Vec<u64>, CodecError> {
    pack_with(values, Selector::fits)
}

/// Greedy packer with a pluggable window test
///
/// `fits(selector, window)` is called with a window of exactly
/// `selector.count()` values and must agree with [`Selector::fits`]. Kernels
/// use it to swap in a vectorised bound check without changing the output.
pub fn pack_with<F>(values: &[u64], fits: F) -> Result<Vec<u64>, CodecError>
where
    F: Fn(Selector, &[u64]) -> bool,
{
    let mut words = Vec::with_capacity(values.len() / 4 + 1);
    let mut rest = values;
    while let Some(&head) = rest.first() {
        let selector = Selector::ALL
            .iter()
            .copied()
            .find(|s| rest.len() >= s.count() && fits(*s, &rest[..s.count()]))
            .ok_or(CodecError::ValueOutOfBounds { value: head })?;
        let n = selector.count();
        words.push(selector.pack(&rest[..n]));
        rest = &rest[n..];
    }
    Ok(words)
}

/// Unpack words into a freshly allocated vector
pub fn unpack(words: &[u64]) -> Result<Vec<u64>, CodecError> {
    let mut dst = vec![0u64; count_values(words)];
    let n = unpack_into(words, &mut dst)?;
    dst.truncate(n);
    Ok(dst)
}

/// Unpack words into `dst`, returning the number of values written
///
/// # Errors
///
/// [`CodecError::CountMismatch`] when `dst` is too small for the words.
pub fn unpack_into(words: &[u64], dst: &mut [u64]) -> Result<usize, CodecError> {
    let mut n = 0;
    for &word in words {
        let selector = Selector::from_word(word);
        let end = n + selector.count();
        if end > dst.len() {
            return Err(CodecError::CountMismatch {
                expected: dst.len(),
                actual: end,
            });
        }
        selector.unpack(word, &mut dst[n..end]);
        n = end;
    }
    Ok(n)
}

/// Total number of values held by `words`
pub fn count_values(words: &[u64]) -> usize {
    words.iter().map(|&w| Selector::from_word(w).count()).sum()
}

fn check_word_bytes(src: &[u8]) -> Result<(), CodecError> {
    if src.len() % 8 != 0 {
        return Err(CodecError::InvalidLength { len: src.len() });
    }
    Ok(())
}

/// Count the values in a byte stream of little-endian words
pub fn count_bytes_le(src: &[u8]) -> Result<usize, CodecError> {
    check_word_bytes(src)?;
    // Little-endian words keep the selector nibble in their last byte.
    Ok(src
        .chunks_exact(8)
        .map(|chunk| Selector::ALL[(chunk[7] >> 4) as usize].count())
        .sum())
}

/// Count the values in a byte stream of big-endian words
pub fn count_bytes_be(src: &[u8]) -> Result<usize, CodecError> {
    check_word_bytes(src)?;
    Ok(src
        .chunks_exact(8)
        .map(|chunk| Selector::ALL[(chunk[0] >> 4) as usize].count())
        .sum())
}

/// Count the values in a byte stream of native (little-endian) words
pub fn count_bytes(src: &[u8]) -> Result<usize, CodecError> {
    count_bytes_le(src)
}

/// Read big-endian words out of a byte stream
pub fn words_from_bytes_be(src: &[u8]) -> Result<Vec<u64>, CodecError> {
    check_word_bytes(src)?;
    let mut buf = src;
    let mut words = Vec::with_capacity(src.len() / 8);
    while buf.has_remaining() {
        words.push(buf.get_u64());
    }
    Ok(words)
}

/// Read little-endian words out of a byte stream
pub fn words_from_bytes_le(src: &[u8]) -> Result<Vec<u64>, CodecError> {
    check_word_bytes(src)?;
    let mut buf = src;
    let mut words = Vec::with_capacity(src.len() / 8);
    while buf.has_remaining() {
        words.push(buf.get_u64_le());
    }
    Ok(words)
}

/// Decode little-endian words from `src` into `dst`, returning the value count
pub fn decode_bytes_le(dst: &mut [u64], src: &[u8]) -> Result<usize, CodecError> {
    unpack_into(&words_from_bytes_le(src)?, dst)
}

/// Decode big-endian words from `src` into `dst`, returning the value count
pub fn decode_bytes_be(dst: &mut [u64], src: &[u8]) -> Result<usize, CodecError> {
    unpack_into(&words_from_bytes_be(src)?, dst)
}

/// Pack values and serialise the words little-endian
pub fn encode_to_bytes_le(values: &[u64]) -> Result<Bytes, CodecError> {
    let words = pack(values)?;
    let mut buf = BytesMut::with_capacity(words.len() * 8);
    for word in words {
        buf.put_u64_le(word);
    }
    Ok(buf.freeze())
}

/// Pack values and serialise the words big-endian
pub fn encode_to_bytes_be(values: &[u64]) -> Result<Bytes, CodecError> {
    let words = pack(values)?;
    let mut buf = BytesMut::with_capacity(words.len() * 8);
    for word in words {
        buf.put_u64(word);
    }
    Ok(buf.freeze())
}
