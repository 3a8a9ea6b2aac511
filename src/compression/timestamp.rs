//! Timestamp array codec
//!
//! A specialisation of the integer codec for time columns. Before delta
//! encoding, every value is divided by the largest power of ten (up to 10^12)
//! that divides all of them; the exponent travels in the low nibble of the
//! header. Sorted input keeps plain deltas, unsorted input zigzags them so
//! that out-of-order points still pack tightly.
//!
//! | tag | format              | first value      | rest                         |
//! |-----|---------------------|------------------|------------------------------|
//! | 0   | Uncompressed        | scaled           | scaled deltas, 8 bytes each  |
//! | 1   | Packed              | unscaled         | simple8b scaled deltas       |
//! | 2   | RLE                 | unscaled         | varint delta, varint length  |
//! | 3   | UncompressedZigZag  | zigzag(scaled)   | zigzag deltas, 8 bytes each  |
//! | 4   | ZigZagPacked        | zigzag(scaled)   | simple8b zigzag deltas       |
//! | 5   | ZigZagRle           | unscaled         | varint zigzag delta, length  |
//!
//! Fixed-width fields and simple8b words are big-endian. All arithmetic wraps,
//! so any `i64` sequence round-trips.
//!
//! A single timestamp is written with exponent 0 (header `0x10`). Older
//! encoders skipped the divisor search for one value and wrote exponent 12
//! (header `0x1C`); the exponent is unused when there are no deltas, so both
//! decode to the same value.
//!
//! # Example
//!
//! ```rust
//! use tscodec::compression::timestamp::{decode_timestamps, encode_timestamps, TimestampFormat};
//!
//! let ts: Vec<i64> = (0..4).map(|i| i * 1_000_000_000).collect();
//! let encoded = encode_timestamps(&mut ts.clone());
//! assert_eq!(TimestampFormat::from_header(encoded[0]).unwrap(), TimestampFormat::Rle);
//!
//! let mut decoded = Vec::new();
//! decode_timestamps(&encoded, &mut decoded).unwrap();
//! assert_eq!(decoded, ts);
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{error, trace, warn};

use super::metrics::{self, CodecKind};
use super::simd::{self, Kernel};
use super::zigzag::{zigzag_decode, zigzag_encode};
use super::{simple8b, wire};
use crate::config;
use crate::error::{CodecError, Result};

/// Largest scale exponent the encoder tries
pub const MAX_SCALE_EXPONENT: u8 = 12;

/// Timestamp wire formats, by header tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimestampFormat {
    /// Scaled deltas as raw big-endian words
    Uncompressed = 0,
    /// Unscaled first value plus simple8b-packed scaled deltas
    Packed = 1,
    /// Constant-stride run
    Rle = 2,
    /// Zigzagged scaled deltas as raw words
    UncompressedZigZag = 3,
    /// Zigzagged scaled deltas packed with simple8b
    ZigZagPacked = 4,
    /// Constant-stride run with a zigzagged (negative) stride
    ZigZagRle = 5,
}

impl TimestampFormat {
    /// The 4-bit format tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Format for a 4-bit tag
    pub fn from_tag(tag: u8) -> std::result::Result<Self, CodecError> {
        match tag {
            0 => Ok(Self::Uncompressed),
            1 => Ok(Self::Packed),
            2 => Ok(Self::Rle),
            3 => Ok(Self::UncompressedZigZag),
            4 => Ok(Self::ZigZagPacked),
            5 => Ok(Self::ZigZagRle),
            tag => Err(CodecError::UnknownEncoding { tag }),
        }
    }

    /// Format named by an encoded block's header byte
    pub fn from_header(header: u8) -> std::result::Result<Self, CodecError> {
        Self::from_tag(wire::tag(header))
    }

    /// Whether deltas are zigzag-encoded (the input was out of order)
    pub const fn is_zigzag(self) -> bool {
        matches!(
            self,
            Self::UncompressedZigZag | Self::ZigZagPacked | Self::ZigZagRle
        )
    }

    fn uncompressed(ordered: bool) -> Self {
        if ordered {
            Self::Uncompressed
        } else {
            Self::UncompressedZigZag
        }
    }

    fn packed(ordered: bool) -> Self {
        if ordered {
            Self::Packed
        } else {
            Self::ZigZagPacked
        }
    }

    fn rle(ordered: bool) -> Self {
        if ordered {
            Self::Rle
        } else {
            Self::ZigZagRle
        }
    }
}

/// Upper bound on the encoded size of `n` timestamps
pub fn timestamp_encoded_size(n: usize) -> usize {
    n * 8 + 1
}

/// Largest power of ten, up to 10^[`MAX_SCALE_EXPONENT`], dividing every value
///
/// Values are treated as unsigned. Returns `(divisor, exponent)`.
pub fn common_divisor(values: &[u64]) -> (u64, u8) {
    let mut exp = MAX_SCALE_EXPONENT;
    let mut div = 10u64.pow(exp as u32);
    for &v in values {
        while exp > 0 && v % div != 0 {
            div /= 10;
            exp -= 1;
        }
        if exp == 0 {
            break;
        }
    }
    (div, exp)
}

/// Multiplier for a header's scale exponent
fn scale_of(header: u8) -> u64 {
    10u64.pow(wire::param(header) as u32)
}

fn scale_up(values: &mut [u64], scale: u64) {
    if scale > 1 {
        for v in values.iter_mut() {
            *v = v.wrapping_mul(scale);
        }
    }
}

/// Timestamp array encoder/decoder bound to one kernel
#[derive(Debug, Clone, Copy)]
pub struct TimestampCodec {
    kernel: &'static dyn Kernel,
    max_decode_values: usize,
}

impl Default for TimestampCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampCodec {
    /// Codec on the process-wide kernel and configuration
    pub fn new() -> Self {
        Self::with_kernel(simd::kernel())
    }

    /// Codec on a specific kernel
    pub fn with_kernel(kernel: &'static dyn Kernel) -> Self {
        Self {
            kernel,
            max_decode_values: config::current().max_decode_values,
        }
    }

    /// Override the largest element count a decode may produce
    pub fn with_max_decode_values(mut self, limit: usize) -> Self {
        self.max_decode_values = limit;
        self
    }

    /// Kernel this codec runs on
    pub fn kernel(&self) -> &'static dyn Kernel {
        self.kernel
    }

    /// Encode timestamps, consuming `src` as scratch space
    pub fn encode(&self, src: &mut [i64]) -> Bytes {
        let values: &mut [u64] = bytemuck::cast_slice_mut(src);
        if values.is_empty() {
            return Bytes::new();
        }

        let (format, encoded) = self.encode_values(values);

        trace!(
            format = ?format,
            values = values.len(),
            bytes = encoded.len(),
            "Encoded timestamp block"
        );
        metrics::with_global(|m| {
            m.record_encode(
                CodecKind::Timestamp,
                format.tag(),
                values.len() as u64,
                encoded.len() as u64,
            )
        });
        encoded
    }

    /// Encode into a writer, returning the number of bytes written
    pub fn encode_to<W: Write>(&self, src: &mut [i64], writer: &mut W) -> Result<usize> {
        let encoded = self.encode(src);
        writer.write_all(&encoded)?;
        Ok(encoded.len())
    }

    fn encode_values(&self, values: &mut [u64]) -> (TimestampFormat, Bytes) {
        let len = values.len();
        let raw_first = values[0];

        let (div, exp) = if len > 1 { common_divisor(values) } else { (1, 0) };
        if div > 1 {
            for v in values.iter_mut() {
                *v /= div;
            }
        }

        let ordered = values.windows(2).all(|w| w[0] <= w[1]);
        let mut max = self.kernel.delta_encode(values);
        if !ordered {
            max = self.kernel.zigzag_encode(&mut values[1..]);
        }

        if len > 1 && values[2..].iter().all(|&d| d == values[1]) {
            let format = TimestampFormat::rle(ordered);
            let mut buf = BytesMut::with_capacity(wire::FIRST_VALUE_END + 2 * wire::MAX_VARINT_LEN);
            wire::put_rle(
                &mut buf,
                wire::header(format.tag(), exp),
                raw_first,
                values[1],
                len as u64,
            );
            return (format, buf.freeze());
        }

        if !ordered {
            values[0] = zigzag_encode(values[0] as i64);
        }

        if max <= simple8b::MAX_VALUE {
            match self.kernel.pack(&values[1..]) {
                Ok(words) => {
                    let format = TimestampFormat::packed(ordered);
                    let first = if ordered { raw_first } else { values[0] };
                    let mut buf = BytesMut::with_capacity(wire::FIRST_VALUE_END + words.len() * 8);
                    buf.put_u8(wire::header(format.tag(), exp));
                    buf.put_u64(first);
                    wire::put_words_be(&mut buf, &words);
                    return (format, buf.freeze());
                },
                Err(e) => {
                    error!(
                        error = %e,
                        kernel = self.kernel.name(),
                        "simple8b rejected in-range deltas, writing uncompressed block"
                    );
                },
            }
        }

        let format = TimestampFormat::uncompressed(ordered);
        let mut buf = BytesMut::with_capacity(timestamp_encoded_size(len));
        buf.put_u8(wire::header(format.tag(), exp));
        wire::put_words_be(&mut buf, values);
        (format, buf.freeze())
    }

    /// Decode timestamps into `dst`, replacing its contents
    ///
    /// On error `dst` is left empty.
    pub fn decode(&self, buf: &[u8], dst: &mut Vec<i64>) -> Result<()> {
        dst.clear();
        if buf.is_empty() {
            return Ok(());
        }

        match self.decode_values(buf, dst) {
            Ok(()) => {
                metrics::with_global(|m| m.record_decode(CodecKind::Timestamp, dst.len() as u64));
                Ok(())
            },
            Err(e) => {
                dst.clear();
                warn!(
                    tag = wire::tag(buf[0]),
                    len = buf.len(),
                    error = %e,
                    "Failed to decode timestamp block"
                );
                metrics::with_global(|m| m.record_decode_error(CodecKind::Timestamp));
                Err(e.into())
            },
        }
    }

    /// Read one block to the end of `reader` and decode it
    ///
    /// Returns the number of bytes consumed.
    pub fn read_from<R: Read>(&self, reader: &mut R, dst: &mut Vec<i64>) -> Result<usize> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.decode(&buf, dst)?;
        Ok(buf.len())
    }

    /// Element count of an encoded block without decoding it
    pub fn count_only(&self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let format = TimestampFormat::from_header(buf[0])?;
        Ok(wire::checked_count(element_count(format, buf)?, usize::MAX)?)
    }

    fn decode_values(
        &self,
        buf: &[u8],
        dst: &mut Vec<i64>,
    ) -> std::result::Result<(), CodecError> {
        let format = TimestampFormat::from_header(buf[0])?;
        let count = wire::checked_count(element_count(format, buf)?, self.max_decode_values)?;
        let scale = scale_of(buf[0]);
        dst.resize(count, 0);
        let out: &mut [u64] = bytemuck::cast_slice_mut(dst.as_mut_slice());

        match format {
            TimestampFormat::Uncompressed => {
                wire::read_words_be(&buf[1..], out);
                self.kernel.delta_decode(out);
                scale_up(out, scale);
            },
            TimestampFormat::UncompressedZigZag => {
                wire::read_words_be(&buf[1..], out);
                self.kernel.zigzag_delta_decode(out);
                scale_up(out, scale);
            },
            TimestampFormat::Packed => {
                self.unpack_packed(buf, out)?;
                // only the deltas are scaled, the first value is stored as-is
                scale_up(&mut out[1..], scale);
                self.kernel.delta_decode(out);
            },
            TimestampFormat::ZigZagPacked => {
                self.unpack_packed(buf, out)?;
                self.kernel.zigzag_delta_decode(out);
                scale_up(out, scale);
            },
            TimestampFormat::Rle | TimestampFormat::ZigZagRle => {
                let rle = wire::read_rle(buf)?;
                let stride = if format.is_zigzag() {
                    zigzag_decode(rle.delta) as u64
                } else {
                    rle.delta
                };
                let delta = stride.wrapping_mul(scale);
                let mut acc = rle.first;
                for v in out.iter_mut() {
                    *v = acc;
                    acc = acc.wrapping_add(delta);
                }
            },
        }
        Ok(())
    }

    /// First value plus unpacked words, exactly filling `out`
    fn unpack_packed(&self, buf: &[u8], out: &mut [u64]) -> std::result::Result<(), CodecError> {
        out[0] = wire::read_first_value(buf)?;
        let words = simple8b::words_from_bytes_be(&buf[wire::FIRST_VALUE_END..])?;
        let n = self.kernel.unpack(&words, &mut out[1..])?;
        if n != out.len() - 1 {
            return Err(CodecError::CountMismatch {
                expected: out.len() - 1,
                actual: n,
            });
        }
        Ok(())
    }
}

fn element_count(format: TimestampFormat, buf: &[u8]) -> std::result::Result<u64, CodecError> {
    match format {
        TimestampFormat::Uncompressed | TimestampFormat::UncompressedZigZag => {
            Ok((wire::uncompressed_payload(buf)?.len() / 8) as u64)
        },
        TimestampFormat::Packed | TimestampFormat::ZigZagPacked => {
            Ok(wire::packed_count(buf)? as u64)
        },
        TimestampFormat::Rle | TimestampFormat::ZigZagRle => Ok(wire::read_rle(buf)?.length),
    }
}

/// Encode timestamps with the process-wide codec, consuming `src`
pub fn encode_timestamps(src: &mut [i64]) -> Bytes {
    TimestampCodec::new().encode(src)
}

/// Encode timestamps taken by value
pub fn encode_timestamps_owned(mut src: Vec<i64>) -> Bytes {
    TimestampCodec::new().encode(&mut src)
}

/// Encode timestamps into a writer, returning the number of bytes written
pub fn encode_timestamps_to<W: Write>(src: &mut [i64], writer: &mut W) -> Result<usize> {
    TimestampCodec::new().encode_to(src, writer)
}

/// Decode timestamps
pub fn decode_timestamps(buf: &[u8], dst: &mut Vec<i64>) -> Result<()> {
    TimestampCodec::new().decode(buf, dst)
}

/// Read and decode one block of timestamps
///
/// Returns `(values decoded, bytes read)`.
pub fn read_timestamps<R: Read>(reader: &mut R, dst: &mut Vec<i64>) -> Result<(usize, usize)> {
    let read = TimestampCodec::new().read_from(reader, dst)?;
    Ok((dst.len(), read))
}

/// Element count of an encoded timestamp block
pub fn count_timestamps(buf: &[u8]) -> Result<usize> {
    TimestampCodec::new().count_only(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SECOND: i64 = 1_000_000_000;

    fn roundtrip(values: &[i64]) -> Bytes {
        let encoded = encode_timestamps(&mut values.to_vec());
        let mut decoded = Vec::new();
        decode_timestamps(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(count_timestamps(&encoded).unwrap(), values.len());
        encoded
    }

    fn format_of(encoded: &[u8]) -> TimestampFormat {
        TimestampFormat::from_header(encoded[0]).unwrap()
    }

    #[test]
    fn test_common_divisor() {
        assert_eq!(common_divisor(&[0, 1_000_000_000, 2_000_000_000]), (1_000_000_000, 9));
        assert_eq!(common_divisor(&[0, 0]), (1_000_000_000_000, 12));
        assert_eq!(common_divisor(&[10, 25]), (1, 0));
        assert_eq!(common_divisor(&[3_000_000_000_000_000, 1_000]), (1_000, 3));
    }

    #[test]
    fn test_seconds_are_rle() {
        let values = [0, SECOND, 2 * SECOND, 3 * SECOND];
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::Rle);
        assert_eq!(wire::param(encoded[0]), 9);
    }

    #[test]
    fn test_single_value_is_packed() {
        let encoded = roundtrip(&[0]);
        assert_eq!(format_of(&encoded), TimestampFormat::Packed);
        assert_eq!(encoded.len(), 9);
        assert_eq!(wire::param(encoded[0]), 0);

        roundtrip(&[1_444_000_000_000_000_000]);
        roundtrip(&[i64::MIN]);
    }

    #[test]
    fn test_single_value_ignores_stored_exponent() {
        let value = 1_444_000_000_123_456_789i64;
        for header in [0x10u8, 0x1C] {
            let mut block = vec![header];
            block.extend_from_slice(&value.to_be_bytes());
            let mut decoded = Vec::new();
            decode_timestamps(&block, &mut decoded).unwrap();
            assert_eq!(decoded, vec![value], "header {:#x}", header);
            assert_eq!(count_timestamps(&block).unwrap(), 1);
        }
        assert_eq!(encode_timestamps(&mut [value])[0], 0x10);
    }

    #[test]
    fn test_two_values_are_rle() {
        let encoded = roundtrip(&[0, 1]);
        assert_eq!(format_of(&encoded), TimestampFormat::Rle);
    }

    #[test]
    fn test_consecutive_integers_fit_in_twelve_bytes() {
        let values: Vec<i64> = (0..500).collect();
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::Rle);
        assert_eq!(encoded.len(), 12);
    }

    #[test]
    fn test_wide_span_is_uncompressed() {
        let values = [0, SECOND, SECOND + (1 << 60)];
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::Uncompressed);
        assert_eq!(encoded.len(), 1 + 3 * 8);
    }

    #[test]
    fn test_scaled_wide_span_is_zigzag_uncompressed() {
        // -6 is the largest multiple of ten when read as unsigned
        let encoded = roundtrip(&[-6, 10, 30]);
        assert_eq!(format_of(&encoded), TimestampFormat::UncompressedZigZag);
        assert_eq!(wire::param(encoded[0]), 1);
    }

    #[test]
    fn test_ordered_uncompressed_stores_scaled_first_value() {
        let encoded = roundtrip(&[10, 20, -6]);
        assert_eq!(format_of(&encoded), TimestampFormat::Uncompressed);
        assert_eq!(wire::param(encoded[0]), 1);
        assert_eq!(wire::read_first_value(&encoded).unwrap(), 1);
    }

    #[test]
    fn test_reversed_is_zigzag() {
        let encoded = roundtrip(&[3, 2, 0]);
        assert_eq!(format_of(&encoded), TimestampFormat::ZigZagPacked);
        assert!(format_of(&encoded).is_zigzag());
    }

    #[test]
    fn test_descending_stride_is_zigzag_rle() {
        let values: Vec<i64> = (0..100).map(|i| 1_000_000 - i * 1_000).collect();
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::ZigZagRle);
        assert_eq!(wire::param(encoded[0]), 3);
    }

    #[test]
    fn test_small_irregular_deltas_are_packed() {
        let encoded = roundtrip(&[0, 1, 3]);
        assert_eq!(format_of(&encoded), TimestampFormat::Packed);
        assert_eq!(count_timestamps(&encoded).unwrap(), 3);
    }

    #[test]
    fn test_real_world_seconds() {
        let values = [1_442_369_134_000_000_000, 1_442_369_135_000_000_000];
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::Rle);
        assert_eq!(wire::param(encoded[0]), 9);
    }

    #[test]
    fn test_jittered_milliseconds_are_scaled_and_packed() {
        let values: Vec<i64> = (0..1000)
            .map(|i| 1_700_000_000_000_000_000 + i * 10_000_000 + (i % 7) * 1_000_000)
            .collect();
        let encoded = roundtrip(&values);
        assert_eq!(format_of(&encoded), TimestampFormat::Packed);
        assert_eq!(wire::param(encoded[0]), 6);
        assert!(encoded.len() < 1000);
    }

    #[test]
    fn test_negative_and_extreme_values() {
        roundtrip(&[i64::MIN, i64::MAX, 0, -1, 1]);
        roundtrip(&[-5 * SECOND, -4 * SECOND, -3 * SECOND]);
        roundtrip(&[i64::MAX, i64::MIN]);
    }

    #[test]
    fn test_corrupt_buffers() {
        let cases: [&[u8]; 5] = [
            b"\x10\x14",
            b"\x20\x00",
            b"\x2012345678\x90",
            b"\x2012345678\x7f",
            b"\x00123",
        ];
        for buf in cases {
            let mut dst = vec![1i64; 3];
            assert!(decode_timestamps(buf, &mut dst).is_err(), "{:?}", buf);
            assert!(dst.is_empty(), "{:?}", buf);
        }
    }

    #[test]
    fn test_invalid_tags() {
        for tag in 6u8..16 {
            let mut dst = Vec::new();
            let err = decode_timestamps(&[tag << 4, 0, 0], &mut dst).unwrap_err();
            assert!(matches!(
                err,
                Error::Codec(CodecError::UnknownEncoding { tag: t }) if t == tag
            ));
        }
    }

    #[test]
    fn test_writer_and_reader_variants() {
        let values: Vec<i64> = (0..32).map(|i| i * i * SECOND).collect();
        let encoded = encode_timestamps_owned(values.clone());

        let mut sink = Vec::new();
        assert_eq!(encode_timestamps_to(&mut values.clone(), &mut sink).unwrap(), encoded.len());
        assert_eq!(sink, encoded.to_vec());

        let mut decoded = Vec::new();
        let (count, read) = read_timestamps(&mut sink.as_slice(), &mut decoded).unwrap();
        assert_eq!((count, read), (32, encoded.len()));
        assert_eq!(decoded, values);
    }
}
