//! tscodec - integer and timestamp column codecs for time-series storage
//!
//! This library turns `i64`, `u64` and timestamp columns into compact byte
//! blocks and back, bit-exactly:
//! - Delta + zigzag transforms with simple8b bit packing
//! - Constant-stride run-length detection
//! - Power-of-ten timestamp scaling and out-of-order detection
//! - Scalar and AVX2 kernels with byte-identical output, picked once at runtime
//!
//! # Example
//!
//! ```rust
//! let mut ts: Vec<i64> = (0..1000).map(|i| 1_700_000_000_000_000_000 + i * 1_000_000).collect();
//! let original = ts.clone();
//!
//! let block = tscodec::encode_timestamps(&mut ts);
//! assert_eq!(tscodec::count_timestamps(&block).unwrap(), 1000);
//!
//! let mut decoded = Vec::new();
//! tscodec::decode_timestamps(&block, &mut decoded).unwrap();
//! assert_eq!(decoded, original);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod error;

/// Configuration management with TOML support
pub mod config;

pub use compression::integer::{
    count_integers, decode_integers, decode_unsigned, encode_integers, encode_integers_owned,
    encode_integers_to, encode_unsigned, integer_encoded_size, read_integers,
};
pub use compression::timestamp::{
    count_timestamps, decode_timestamps, encode_timestamps, encode_timestamps_owned,
    encode_timestamps_to, read_timestamps, timestamp_encoded_size,
};
pub use config::{init, CodecConfig, KernelPreference};
pub use error::{CodecError, Error, Result};
