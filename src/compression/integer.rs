//! Integer array codec
//!
//! Encodes `i64` and `u64` columns into one of three wire formats chosen from
//! the shape of the data:
//!
//! | tag | format         | payload                                                  |
//! |-----|----------------|----------------------------------------------------------|
//! | 0   | Uncompressed   | every zigzagged delta as 8 big-endian bytes              |
//! | 1   | Packed         | 8-byte first zigzagged value, then big-endian simple8b words |
//! | 2   | RLE            | 8-byte first value, varint delta, varint repeat count   |
//!
//! The header byte carries the tag in its high nibble; the low nibble is zero.
//! Every delta, and the first value, is zigzag-encoded so that signed and
//! unsigned columns share one layout.
//!
//! Encoding consumes its input: the slice is used as scratch space for the
//! deltas. Copy first, or use [`encode_integers_owned`], when the original
//! values are needed afterwards.
//!
//! # Example
//!
//! ```rust
//! use tscodec::compression::integer::{decode_integers, encode_integers};
//!
//! let values = vec![100i64, 101, 99, -5, i64::MAX];
//! let encoded = encode_integers(&mut values.clone());
//!
//! let mut decoded = Vec::new();
//! decode_integers(&encoded, &mut decoded).unwrap();
//! assert_eq!(decoded, values);
//! ```

use std::io::{Read, Write};

use bytemuck::Pod;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{error, trace, warn};

use super::metrics::{self, CodecKind};
use super::simd::{self, Kernel};
use super::zigzag::zigzag_decode;
use super::{simple8b, wire};
use crate::config;
use crate::error::{CodecError, Result};

/// Integer wire formats, by header tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IntegerFormat {
    /// Zigzagged deltas as raw big-endian words
    Uncompressed = 0,
    /// First value plus simple8b-packed zigzagged deltas
    Packed = 1,
    /// Constant-stride run
    Rle = 2,
}

impl IntegerFormat {
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
            tag => Err(CodecError::UnknownEncoding { tag }),
        }
    }

    /// Format named by an encoded block's header byte
    pub fn from_header(header: u8) -> std::result::Result<Self, CodecError> {
        Self::from_tag(wire::tag(header))
    }
}

/// Upper bound on the encoded size of `n` integers
pub fn integer_encoded_size(n: usize) -> usize {
    n * 8 + 1
}

/// Integer array encoder/decoder bound to one kernel
#[derive(Debug, Clone, Copy)]
pub struct IntegerCodec {
    kernel: &'static dyn Kernel,
    max_decode_values: usize,
}

impl Default for IntegerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegerCodec {
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

    /// Encode signed integers, consuming `src` as scratch space
    pub fn encode(&self, src: &mut [i64]) -> Bytes {
        self.encode_words(bytemuck::cast_slice_mut(src))
    }

    /// Encode unsigned integers, consuming `src` as scratch space
    pub fn encode_unsigned(&self, src: &mut [u64]) -> Bytes {
        self.encode_words(src)
    }

    /// Encode into a writer, returning the number of bytes written
    pub fn encode_to<W: Write>(&self, src: &mut [i64], writer: &mut W) -> Result<usize> {
        let encoded = self.encode(src);
        writer.write_all(&encoded)?;
        Ok(encoded.len())
    }

    fn encode_words(&self, values: &mut [u64]) -> Bytes {
        if values.is_empty() {
            return Bytes::new();
        }

        let max = self.kernel.zigzag_delta_encode(values);
        let (format, encoded) = self.encode_deltas(values, max);

        trace!(
            format = ?format,
            values = values.len(),
            bytes = encoded.len(),
            "Encoded integer block"
        );
        metrics::with_global(|m| {
            m.record_encode(
                CodecKind::Integer,
                format.tag(),
                values.len() as u64,
                encoded.len() as u64,
            )
        });
        encoded
    }

    fn encode_deltas(&self, deltas: &[u64], max: u64) -> (IntegerFormat, Bytes) {
        if deltas.len() > 2 && deltas[2..].iter().all(|&d| d == deltas[1]) {
            let mut buf = BytesMut::with_capacity(wire::FIRST_VALUE_END + 2 * wire::MAX_VARINT_LEN);
            wire::put_rle(
                &mut buf,
                wire::header(IntegerFormat::Rle.tag(), 0),
                deltas[0],
                deltas[1],
                (deltas.len() - 1) as u64,
            );
            return (IntegerFormat::Rle, buf.freeze());
        }

        if max <= simple8b::MAX_VALUE {
            match self.kernel.pack(&deltas[1..]) {
                Ok(words) => {
                    let mut buf = BytesMut::with_capacity(wire::FIRST_VALUE_END + words.len() * 8);
                    buf.put_u8(wire::header(IntegerFormat::Packed.tag(), 0));
                    buf.put_u64(deltas[0]);
                    wire::put_words_be(&mut buf, &words);
                    return (IntegerFormat::Packed, buf.freeze());
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

        let mut buf = BytesMut::with_capacity(integer_encoded_size(deltas.len()));
        buf.put_u8(wire::header(IntegerFormat::Uncompressed.tag(), 0));
        wire::put_words_be(&mut buf, deltas);
        (IntegerFormat::Uncompressed, buf.freeze())
    }

    /// Decode signed integers into `dst`, replacing its contents
    ///
    /// On error `dst` is left empty.
    pub fn decode(&self, buf: &[u8], dst: &mut Vec<i64>) -> Result<()> {
        self.decode_into(buf, dst)
    }

    /// Decode unsigned integers into `dst`, replacing its contents
    ///
    /// On error `dst` is left empty.
    pub fn decode_unsigned(&self, buf: &[u8], dst: &mut Vec<u64>) -> Result<()> {
        self.decode_into(buf, dst)
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
        let format = IntegerFormat::from_header(buf[0])?;
        Ok(wire::checked_count(element_count(format, buf)?, usize::MAX)?)
    }

    fn decode_into<T: Pod>(&self, buf: &[u8], dst: &mut Vec<T>) -> Result<()> {
        dst.clear();
        if buf.is_empty() {
            return Ok(());
        }

        match self.decode_words(buf, dst) {
            Ok(()) => {
                metrics::with_global(|m| m.record_decode(CodecKind::Integer, dst.len() as u64));
                Ok(())
            },
            Err(e) => {
                dst.clear();
                warn!(
                    tag = wire::tag(buf[0]),
                    len = buf.len(),
                    error = %e,
                    "Failed to decode integer block"
                );
                metrics::with_global(|m| m.record_decode_error(CodecKind::Integer));
                Err(e.into())
            },
        }
    }

    fn decode_words<T: Pod>(
        &self,
        buf: &[u8],
        dst: &mut Vec<T>,
    ) -> std::result::Result<(), CodecError> {
        let format = IntegerFormat::from_header(buf[0])?;
        let count = wire::checked_count(element_count(format, buf)?, self.max_decode_values)?;
        dst.resize(count, T::zeroed());
        let out: &mut [u64] = bytemuck::cast_slice_mut(dst.as_mut_slice());

        match format {
            IntegerFormat::Uncompressed => {
                wire::read_words_be(&buf[1..], out);
                self.kernel.zigzag_delta_decode(out);
            },
            IntegerFormat::Packed => {
                out[0] = wire::read_first_value(buf)?;
                let words = simple8b::words_from_bytes_be(&buf[wire::FIRST_VALUE_END..])?;
                let n = self.kernel.unpack(&words, &mut out[1..])?;
                if n != count - 1 {
                    return Err(CodecError::CountMismatch {
                        expected: count - 1,
                        actual: n,
                    });
                }
                self.kernel.zigzag_delta_decode(out);
            },
            IntegerFormat::Rle => {
                let rle = wire::read_rle(buf)?;
                let delta = zigzag_decode(rle.delta) as u64;
                let mut acc = zigzag_decode(rle.first) as u64;
                for v in out.iter_mut() {
                    *v = acc;
                    acc = acc.wrapping_add(delta);
                }
            },
        }
        Ok(())
    }
}

/// Values a block decodes to, read from its framing alone
fn element_count(format: IntegerFormat, buf: &[u8]) -> std::result::Result<u64, CodecError> {
    match format {
        IntegerFormat::Uncompressed => Ok((wire::uncompressed_payload(buf)?.len() / 8) as u64),
        IntegerFormat::Packed => Ok(wire::packed_count(buf)? as u64),
        IntegerFormat::Rle => wire::read_rle(buf)?
            .length
            .checked_add(1)
            .ok_or_else(|| CodecError::LengthOverflow("RLE repeat count overflows".to_string())),
    }
}

/// Encode signed integers with the process-wide codec, consuming `src`
pub fn encode_integers(src: &mut [i64]) -> Bytes {
    IntegerCodec::new().encode(src)
}

/// Encode signed integers taken by value
pub fn encode_integers_owned(mut src: Vec<i64>) -> Bytes {
    IntegerCodec::new().encode(&mut src)
}

/// Encode signed integers into a writer, returning the number of bytes written
pub fn encode_integers_to<W: Write>(src: &mut [i64], writer: &mut W) -> Result<usize> {
    IntegerCodec::new().encode_to(src, writer)
}

/// Decode signed integers
pub fn decode_integers(buf: &[u8], dst: &mut Vec<i64>) -> Result<()> {
    IntegerCodec::new().decode(buf, dst)
}

/// Read and decode one block of signed integers
///
/// Returns `(values decoded, bytes read)`.
pub fn read_integers<R: Read>(reader: &mut R, dst: &mut Vec<i64>) -> Result<(usize, usize)> {
    let read = IntegerCodec::new().read_from(reader, dst)?;
    Ok((dst.len(), read))
}

/// Encode unsigned integers with the process-wide codec, consuming `src`
pub fn encode_unsigned(src: &mut [u64]) -> Bytes {
    IntegerCodec::new().encode_unsigned(src)
}

/// Decode unsigned integers
pub fn decode_unsigned(buf: &[u8], dst: &mut Vec<u64>) -> Result<()> {
    IntegerCodec::new().decode_unsigned(buf, dst)
}

/// Element count of an encoded integer block
pub fn count_integers(buf: &[u8]) -> Result<usize> {
    IntegerCodec::new().count_only(buf)
}
