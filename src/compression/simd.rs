//! Transform and packing kernels
//!
//! Every hot loop of the codecs (zigzag, delta, prefix sum, simple8b pack and
//! unpack) goes through a [`Kernel`]. Implementations are functionally
//! identical; they differ only in throughput. The process-wide kernel is
//! chosen once, from the configured [`KernelPreference`] and a runtime CPU
//! probe, and never changes afterwards.
//!
//! # Platform Support
//!
//! - **x86_64**: AVX2 kernel when the CPU reports `avx2`
//! - **Fallback**: portable scalar kernel everywhere else
//!
//! # Example
//!
//! ```rust
//! use tscodec::compression::simd::{available_kernels, kernel};
//!
//! let active = kernel();
//! assert!(available_kernels().iter().any(|k| k.name() == active.name()));
//! ```

use std::fmt::Debug;
use std::sync::OnceLock;

use tracing::{debug, warn};

use super::{delta, simple8b, zigzag};
use crate::config::{self, KernelPreference};
use crate::error::CodecError;

/// Vectorisable operations the codecs are built from
///
/// All slices are transformed in place. Signed values travel as their `u64`
/// bit patterns.
pub trait Kernel: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// ZigZag-encode every element, returning the largest result
    fn zigzag_encode(&self, values: &mut [u64]) -> u64;

    /// ZigZag-decode every element
    fn zigzag_decode(&self, values: &mut [u64]);

    /// Delta-encode, returning the largest delta at indices ≥ 1
    fn delta_encode(&self, values: &mut [u64]) -> u64;

    /// Prefix sum
    fn delta_decode(&self, values: &mut [u64]);

    /// Delta-encode then zigzag every element including the first
    ///
    /// Returns the largest zigzagged delta at indices ≥ 1.
    fn zigzag_delta_encode(&self, values: &mut [u64]) -> u64;

    /// Prefix sum of zigzag-decoded deltas
    fn zigzag_delta_decode(&self, values: &mut [u64]);

    /// Pack values into simple8b words
    fn pack(&self, values: &[u64]) -> Result<Vec<u64>, CodecError>;

    /// Unpack simple8b words into `dst`, returning the number of values written
    fn unpack(&self, words: &[u64], dst: &mut [u64]) -> Result<usize, CodecError>;
}

/// Portable scalar kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericKernel;

impl Kernel for GenericKernel {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn zigzag_encode(&self, values: &mut [u64]) -> u64 {
        zigzag::zigzag_encode_slice(values)
    }

    fn zigzag_decode(&self, values: &mut [u64]) {
        zigzag::zigzag_decode_slice(values)
    }

    fn delta_encode(&self, values: &mut [u64]) -> u64 {
        delta::delta_encode(values)
    }

    fn delta_decode(&self, values: &mut [u64]) {
        delta::delta_decode(values)
    }

    fn zigzag_delta_encode(&self, values: &mut [u64]) -> u64 {
        delta::zigzag_delta_encode(values)
    }

    fn zigzag_delta_decode(&self, values: &mut [u64]) {
        delta::zigzag_delta_decode(values)
    }

    fn pack(&self, values: &[u64]) -> Result<Vec<u64>, CodecError> {
        simple8b::pack(values)
    }

    fn unpack(&self, words: &[u64], dst: &mut [u64]) -> Result<usize, CodecError> {
        simple8b::unpack_into(words, dst)
    }
}

static GENERIC: GenericKernel = GenericKernel;

static KERNEL: OnceLock<&'static dyn Kernel> = OnceLock::new();

/// The process-wide kernel, selected on first use
pub fn kernel() -> &'static dyn Kernel {
    *KERNEL.get_or_init(|| {
        let preference = config::current().kernel;
        let selected = select(preference);
        debug!(
            kernel = selected.name(),
            preference = ?preference,
            "Selected codec kernel"
        );
        selected
    })
}

/// Every kernel the current CPU can run, generic first
pub fn available_kernels() -> Vec<&'static dyn Kernel> {
    let mut kernels: Vec<&'static dyn Kernel> = vec![&GENERIC];
    #[cfg(target_arch = "x86_64")]
    if let Some(k) = x86::Avx2Kernel::detect() {
        kernels.push(k);
    }
    kernels
}

fn select(preference: KernelPreference) -> &'static dyn Kernel {
    match preference {
        KernelPreference::Generic => &GENERIC,
        KernelPreference::Auto | KernelPreference::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            if let Some(k) = x86::Avx2Kernel::detect() {
                return k;
            }
            if preference == KernelPreference::Avx2 {
                warn!("AVX2 kernel requested but not supported by this CPU, using generic kernel");
            }
            &GENERIC
        },
    }
}

#[cfg(target_arch = "x86_64")]
pub use x86::Avx2Kernel;

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::Kernel;
    use crate::compression::simple8b::{self, Selector};
    use crate::error::CodecError;

    /// AVX2 kernel, four 64-bit lanes per instruction
    ///
    /// Only obtainable through [`Avx2Kernel::detect`], so holding one proves the
    /// CPU supports AVX2.
    #[derive(Debug)]
    pub struct Avx2Kernel {
        _probed: (),
    }

    static AVX2: Avx2Kernel = Avx2Kernel { _probed: () };

    impl Avx2Kernel {
        /// The AVX2 kernel if the running CPU supports it
        pub fn detect() -> Option<&'static Avx2Kernel> {
            if is_x86_feature_detected!("avx2") {
                Some(&AVX2)
            } else {
                None
            }
        }
    }

    fn max_from(values: &[u64]) -> u64 {
        values.iter().copied().max().unwrap_or(0)
    }

    // SAFETY (all methods): an `Avx2Kernel` only exists after a successful
    // runtime AVX2 probe.
    impl Kernel for Avx2Kernel {
        fn name(&self) -> &'static str {
            "avx2"
        }

        fn zigzag_encode(&self, values: &mut [u64]) -> u64 {
            unsafe { zigzag_encode_avx2(values) };
            max_from(values)
        }

        fn zigzag_decode(&self, values: &mut [u64]) {
            unsafe { zigzag_decode_avx2(values) }
        }

        fn delta_encode(&self, values: &mut [u64]) -> u64 {
            unsafe { delta_encode_avx2(values) };
            max_from(values.get(1..).unwrap_or_default())
        }

        fn delta_decode(&self, values: &mut [u64]) {
            unsafe { prefix_sum_avx2(values) }
        }

        fn zigzag_delta_encode(&self, values: &mut [u64]) -> u64 {
            unsafe {
                delta_encode_avx2(values);
                zigzag_encode_avx2(values);
            }
            max_from(values.get(1..).unwrap_or_default())
        }

        fn zigzag_delta_decode(&self, values: &mut [u64]) {
            unsafe {
                zigzag_decode_avx2(values);
                prefix_sum_avx2(values);
            }
        }

        fn pack(&self, values: &[u64]) -> Result<Vec<u64>, CodecError> {
            simple8b::pack_with(values, |selector, window| unsafe { fits_avx2(selector, window) })
        }

        fn unpack(&self, words: &[u64], dst: &mut [u64]) -> Result<usize, CodecError> {
            unsafe { unpack_avx2(words, dst) }
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn zigzag_encode_avx2(values: &mut [u64]) {
        let zero = _mm256_setzero_si256();
        let mut chunks = values.chunks_exact_mut(4);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr() as *mut __m256i;
            let x = _mm256_loadu_si256(ptr);
            // all-ones for negative lanes
            let sign = _mm256_cmpgt_epi64(zero, x);
            let z = _mm256_xor_si256(_mm256_slli_epi64(x, 1), sign);
            _mm256_storeu_si256(ptr, z);
        }
        for v in chunks.into_remainder() {
            *v = crate::compression::zigzag::zigzag_encode(*v as i64);
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn zigzag_decode_avx2(values: &mut [u64]) {
        let zero = _mm256_setzero_si256();
        let one = _mm256_set1_epi64x(1);
        let mut chunks = values.chunks_exact_mut(4);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr() as *mut __m256i;
            let v = _mm256_loadu_si256(ptr);
            let neg = _mm256_sub_epi64(zero, _mm256_and_si256(v, one));
            let x = _mm256_xor_si256(_mm256_srli_epi64(v, 1), neg);
            _mm256_storeu_si256(ptr, x);
        }
        for v in chunks.into_remainder() {
            *v = crate::compression::zigzag::zigzag_decode(*v) as u64;
        }
    }

    /// Reverse-order delta: each 4-lane block is loaded together with its
    /// predecessors before anything below it is overwritten.
    #[target_feature(enable = "avx2")]
    unsafe fn delta_encode_avx2(values: &mut [u64]) {
        let base = values.as_mut_ptr();
        let mut i = values.len();
        while i >= 5 {
            i -= 4;
            let cur = _mm256_loadu_si256(base.add(i) as *const __m256i);
            let prev = _mm256_loadu_si256(base.add(i - 1) as *const __m256i);
            _mm256_storeu_si256(base.add(i) as *mut __m256i, _mm256_sub_epi64(cur, prev));
        }
        for j in (1..i).rev() {
            values[j] = values[j].wrapping_sub(values[j - 1]);
        }
    }

    /// In-register prefix sum over 4 lanes, carried across blocks
    #[target_feature(enable = "avx2")]
    unsafe fn prefix_sum_avx2(values: &mut [u64]) {
        let zero = _mm256_setzero_si256();
        let mut carry = 0u64;
        let mut chunks = values.chunks_exact_mut(4);
        for chunk in &mut chunks {
            let ptr = chunk.as_mut_ptr() as *mut __m256i;
            let x = _mm256_loadu_si256(ptr);
            // [a, b, c, d] + [0, a, b, c]
            let shifted =
                _mm256_blend_epi32(_mm256_permute4x64_epi64(x, 0b10_01_00_00), zero, 0b0000_0011);
            let x = _mm256_add_epi64(x, shifted);
            // + [0, 0, a, a+b]
            let shifted =
                _mm256_blend_epi32(_mm256_permute4x64_epi64(x, 0b01_00_00_00), zero, 0b0000_1111);
            let x = _mm256_add_epi64(x, shifted);
            let x = _mm256_add_epi64(x, _mm256_set1_epi64x(carry as i64));
            _mm256_storeu_si256(ptr, x);
            carry = chunk[3];
        }
        for v in chunks.into_remainder() {
            carry = carry.wrapping_add(*v);
            *v = carry;
        }
    }

    /// Vectorised form of [`Selector::fits`] over an exact window
    #[target_feature(enable = "avx2")]
    unsafe fn fits_avx2(selector: Selector, window: &[u64]) -> bool {
        let w = selector.width();
        // Most rejections happen on the first value.
        match window.first() {
            Some(&v) if v >> w != 0 => return false,
            _ => {},
        }
        let mut acc = _mm256_setzero_si256();
        let mut chunks = window.chunks_exact(4);
        for chunk in &mut chunks {
            acc = _mm256_or_si256(acc, _mm256_loadu_si256(chunk.as_ptr() as *const __m256i));
        }
        let mut lanes = [0u64; 4];
        _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc);
        let bits = chunks
            .remainder()
            .iter()
            .fold(lanes[0] | lanes[1] | lanes[2] | lanes[3], |a, &v| a | v);
        bits >> w == 0
    }

    #[target_feature(enable = "avx2")]
    unsafe fn unpack_avx2(words: &[u64], dst: &mut [u64]) -> Result<usize, CodecError> {
        let mut n = 0;
        for &word in words {
            let selector = Selector::from_word(word);
            let count = selector.count();
            let end = n + count;
            if end > dst.len() {
                return Err(CodecError::CountMismatch {
                    expected: dst.len(),
                    actual: end,
                });
            }
            let out = &mut dst[n..end];
            n = end;

            let w = selector.width();
            if w == 0 {
                out.fill(0);
                continue;
            }
            let mask = selector.mask();
            let vmask = _mm256_set1_epi64x(mask as i64);
            let src = _mm256_set1_epi64x(word as i64);
            let w64 = w as i64;
            let mut shifts = _mm256_setr_epi64x(0, w64, 2 * w64, 3 * w64);
            let step = _mm256_set1_epi64x(4 * w64);

            let vector_end = count / 4 * 4;
            for chunk in out[..vector_end].chunks_exact_mut(4) {
                let v = _mm256_and_si256(_mm256_srlv_epi64(src, shifts), vmask);
                _mm256_storeu_si256(chunk.as_mut_ptr() as *mut __m256i, v);
                shifts = _mm256_add_epi64(shifts, step);
            }
            for (i, slot) in out.iter_mut().enumerate().skip(vector_end) {
                *slot = (word >> (i as u32 * w)) & mask;
            }
        }
        Ok(n)
    }
}
