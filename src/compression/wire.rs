//! Byte-level framing shared by the integer and timestamp codecs
//!
//! Every encoded block starts with a one-byte header: the format tag in the
//! high nibble, a codec-specific parameter (the timestamp scale exponent) in
//! the low nibble. Fixed-width fields are big-endian; RLE lengths use unsigned
//! LEB128 varints.

use bytes::{Buf, BufMut, BytesMut};

use super::simple8b;
use crate::error::CodecError;

/// Header byte plus the 8-byte first value
pub(crate) const FIRST_VALUE_END: usize = 9;

/// Longest valid varint for a `u64`
pub(crate) const MAX_VARINT_LEN: usize = 10;

/// Build a header byte
#[inline]
pub(crate) fn header(tag: u8, param: u8) -> u8 {
    (tag << 4) | (param & 0x0f)
}

/// Format tag of a header byte
#[inline]
pub(crate) fn tag(header: u8) -> u8 {
    header >> 4
}

/// Low-nibble parameter of a header byte
#[inline]
pub(crate) fn param(header: u8) -> u8 {
    header & 0x0f
}

/// Append an unsigned LEB128 varint
pub(crate) fn put_uvarint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decode an unsigned LEB128 varint, returning the value and bytes consumed
pub(crate) fn read_uvarint(data: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut result = 0u64;
    let mut shift = 0u32;

    for (pos, &byte) in data.iter().enumerate() {
        if pos == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(CodecError::LengthOverflow("varint overflows 64 bits".to_string()));
        }
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, pos + 1));
        }
        shift += 7;
    }
    Err(CodecError::LengthOverflow("truncated varint".to_string()))
}

/// Big-endian first value that follows the header
pub(crate) fn read_first_value(buf: &[u8]) -> Result<u64, CodecError> {
    if buf.len() < FIRST_VALUE_END {
        return Err(CodecError::ShortBuffer {
            needed: FIRST_VALUE_END,
            actual: buf.len(),
        });
    }
    let mut field = &buf[1..FIRST_VALUE_END];
    Ok(field.get_u64())
}

/// Uncompressed payload after the header, checked to hold whole words
pub(crate) fn uncompressed_payload(buf: &[u8]) -> Result<&[u8], CodecError> {
    let payload = buf.get(1..).unwrap_or_default();
    if payload.len() % 8 != 0 {
        return Err(CodecError::InvalidLength { len: payload.len() });
    }
    Ok(payload)
}

/// Copy big-endian words from `src` into `dst`, which must have matching length
pub(crate) fn read_words_be(src: &[u8], dst: &mut [u64]) {
    let mut buf = src;
    for slot in dst.iter_mut() {
        *slot = buf.get_u64();
    }
}

/// Append big-endian words
pub(crate) fn put_words_be(buf: &mut BytesMut, words: &[u64]) {
    for &word in words {
        buf.put_u64(word);
    }
}

/// Number of values in a packed payload, including the first value
pub(crate) fn packed_count(buf: &[u8]) -> Result<usize, CodecError> {
    if buf.len() < FIRST_VALUE_END {
        return Err(CodecError::ShortBuffer {
            needed: FIRST_VALUE_END,
            actual: buf.len(),
        });
    }
    Ok(simple8b::count_bytes_be(&buf[FIRST_VALUE_END..])? + 1)
}

/// Decoded RLE payload fields, all still in their stored representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RlePayload {
    /// First value as stored
    pub first: u64,
    /// Repeated delta as stored
    pub delta: u64,
    /// Stored length field
    pub length: u64,
}

/// Parse `[header][8-byte first][varint delta][varint length]`
pub(crate) fn read_rle(buf: &[u8]) -> Result<RlePayload, CodecError> {
    let first = read_first_value(buf)?;
    let (delta, n) = read_uvarint(&buf[FIRST_VALUE_END..])?;
    let (length, _) = read_uvarint(&buf[FIRST_VALUE_END + n..])?;
    Ok(RlePayload {
        first,
        delta,
        length,
    })
}

/// Write an RLE payload
pub(crate) fn put_rle(buf: &mut BytesMut, header: u8, first: u64, delta: u64, length: u64) {
    buf.put_u8(header);
    buf.put_u64(first);
    put_uvarint(buf, delta);
    put_uvarint(buf, length);
}

/// Convert a decoded element count into `usize`, enforcing the decode limit
pub(crate) fn checked_count(count: u64, limit: usize) -> Result<usize, CodecError> {
    let count = usize::try_from(count)
        .map_err(|_| CodecError::LengthOverflow(format!("count {} does not fit in usize", count)))?;
    if count > limit {
        return Err(CodecError::LengthOverflow(format!(
            "count {} exceeds decode limit {}",
            count, limit
        )));
    }
    Ok(count)
}
