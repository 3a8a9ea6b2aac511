//! Codec Benchmarks
//!
//! Throughput of the integer and timestamp codecs and of the kernels they run
//! on, per available kernel.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tscodec::compression::simd::available_kernels;
use tscodec::compression::{simple8b, IntegerCodec, TimestampCodec};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Regular timestamps (10-second intervals, nanosecond resolution)
fn create_regular_timestamps(count: usize) -> Vec<i64> {
    (0..count)
        .map(|i| 1_600_000_000_000_000_000 + i as i64 * 10_000_000_000)
        .collect()
}

/// Irregular timestamps with microsecond jitter
fn create_irregular_timestamps(count: usize) -> Vec<i64> {
    let mut ts = Vec::with_capacity(count);
    let mut current = 1_600_000_000_000_000_000i64;
    for i in 0..count {
        ts.push(current);
        current += 9_000_000_000 + (i as i64 * 7919 % 2000) * 1_000_000;
    }
    ts
}

/// Slightly out-of-order timestamps (late arrivals)
fn create_unordered_timestamps(count: usize) -> Vec<i64> {
    let mut ts = create_irregular_timestamps(count);
    for i in (0..count.saturating_sub(1)).step_by(17) {
        ts.swap(i, i + 1);
    }
    ts
}

/// Counter-like integers with small random increments
fn create_counter_values(count: usize) -> Vec<i64> {
    let mut acc = 0i64;
    (0..count)
        .map(|i| {
            acc += (i as i64 * 31 % 50) - 10;
            acc
        })
        .collect()
}

/// High-entropy integers (worst case)
fn create_random_values(count: usize) -> Vec<i64> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as i64
        })
        .collect()
}

// =============================================================================
// Timestamp Codec Benchmarks
// =============================================================================

fn bench_timestamp_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp_encode");

    for size in [1000, 10000, 100000] {
        group.throughput(Throughput::Elements(size as u64));

        let inputs = [
            ("regular", create_regular_timestamps(size)),
            ("irregular", create_irregular_timestamps(size)),
            ("unordered", create_unordered_timestamps(size)),
        ];

        for k in available_kernels() {
            let codec = TimestampCodec::with_kernel(k);
            for (name, values) in &inputs {
                group.bench_with_input(
                    BenchmarkId::new(format!("{}/{}", k.name(), name), size),
                    values,
                    |b, values| {
                        b.iter_batched_ref(
                            || values.clone(),
                            |work| black_box(codec.encode(work)),
                            BatchSize::LargeInput,
                        );
                    },
                );
            }
        }
    }

    group.finish();
}

fn bench_timestamp_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp_decode");

    for size in [1000, 10000, 100000] {
        group.throughput(Throughput::Elements(size as u64));

        for k in available_kernels() {
            let codec = TimestampCodec::with_kernel(k);
            let encoded = codec.encode(&mut create_irregular_timestamps(size));
            let mut dst = Vec::with_capacity(size);

            group.bench_with_input(BenchmarkId::new(k.name(), size), &encoded, |b, encoded| {
                b.iter(|| {
                    codec.decode(encoded, &mut dst).unwrap();
                    black_box(dst.len())
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// Integer Codec Benchmarks
// =============================================================================

fn bench_integer_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("integer_roundtrip");

    let size = 10000;
    group.throughput(Throughput::Elements(size as u64));

    let inputs = [
        ("counter", create_counter_values(size)),
        ("random", create_random_values(size)),
    ];

    for k in available_kernels() {
        let codec = IntegerCodec::with_kernel(k);
        for (name, values) in &inputs {
            group.bench_with_input(
                BenchmarkId::new(k.name(), name),
                values,
                |b, values| {
                    let mut dst = Vec::with_capacity(values.len());
                    b.iter_batched_ref(
                        || values.clone(),
                        |work| {
                            let encoded = codec.encode(work);
                            codec.decode(&encoded, &mut dst).unwrap();
                            black_box(encoded.len())
                        },
                        BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

// =============================================================================
// Kernel Benchmarks
// =============================================================================

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");

    let size = 65536;
    group.throughput(Throughput::Elements(size as u64));

    let values: Vec<u64> = create_counter_values(size).into_iter().map(|v| v as u64).collect();
    let packable: Vec<u64> = values.iter().map(|v| v & 0xfff).collect();

    for k in available_kernels() {
        group.bench_with_input(BenchmarkId::new("zigzag_delta_encode", k.name()), &values, |b, v| {
            b.iter_batched_ref(
                || v.clone(),
                |work| black_box(k.zigzag_delta_encode(work)),
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("delta_decode", k.name()), &values, |b, v| {
            b.iter_batched_ref(|| v.clone(), |work| k.delta_decode(work), BatchSize::LargeInput);
        });

        group.bench_with_input(BenchmarkId::new("pack", k.name()), &packable, |b, v| {
            b.iter(|| black_box(k.pack(v).unwrap()));
        });

        let words = simple8b::pack(&packable).unwrap();
        group.bench_with_input(BenchmarkId::new("unpack", k.name()), &words, |b, words| {
            let mut out = vec![0u64; size];
            b.iter(|| black_box(k.unpack(words, &mut out).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_timestamp_encode,
    bench_timestamp_decode,
    bench_integer_roundtrip,
    bench_kernels,
);
criterion_main!(benches);
