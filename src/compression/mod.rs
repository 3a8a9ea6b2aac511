//! Column codecs
//!
//! This module provides the integer and timestamp codecs and the primitives
//! they are built from:
//!
//! - **zigzag** / **delta**: in-place numeric transforms
//! - **simple8b**: 60-bit payload word packing with a 4-bit selector
//! - **simd**: scalar and AVX2 kernels, selected once per process
//! - **integer**: `i64`/`u64` arrays (uncompressed, packed, RLE)
//! - **timestamp**: power-of-ten scaling plus zigzag for unordered input

pub mod delta;
pub mod integer;
pub mod metrics;
pub mod simd;
pub mod simple8b;
pub mod timestamp;
pub(crate) mod wire;
pub mod zigzag;

pub use integer::{IntegerCodec, IntegerFormat};
pub use simd::{available_kernels, kernel, GenericKernel, Kernel};
pub use timestamp::{TimestampCodec, TimestampFormat};
pub use zigzag::{zigzag_decode, zigzag_encode};
