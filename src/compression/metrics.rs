//! Codec Metrics
//!
//! Lock-free counters describing what the codecs do in production: how often
//! each wire format is chosen, how many values and bytes flow through, and how
//! many decodes fail.
//!
//! # Example
//!
//! ```rust
//! use tscodec::compression::metrics::{CodecKind, CompressionMetrics};
//!
//! let metrics = CompressionMetrics::new();
//! metrics.record_encode(CodecKind::Timestamp, 2, 500, 12);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.timestamp.formats[2], 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::Serialize;

/// Number of distinct format tags tracked per codec
pub const FORMAT_SLOTS: usize = 6;

/// Codec families for metric tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// Signed and unsigned integer arrays
    Integer,
    /// Timestamp arrays
    Timestamp,
}

impl CodecKind {
    /// Codec name as string
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Integer => "integer",
            CodecKind::Timestamp => "timestamp",
        }
    }
}

/// Atomic counters for a single codec family
#[derive(Debug, Default)]
pub struct CodecMetrics {
    /// Encode calls per format tag
    pub formats: [AtomicU64; FORMAT_SLOTS],
    /// Values consumed by encode
    pub values_encoded: AtomicU64,
    /// Bytes produced by encode
    pub bytes_encoded: AtomicU64,
    /// Successful decode calls
    pub decode_count: AtomicU64,
    /// Values produced by decode
    pub values_decoded: AtomicU64,
    /// Failed decode calls
    pub decode_errors: AtomicU64,
}

impl CodecMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished encode
    pub fn record_encode(&self, format: u8, values: u64, bytes: u64) {
        if let Some(slot) = self.formats.get(format as usize) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        self.values_encoded.fetch_add(values, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a successful decode
    pub fn record_decode(&self, values: u64) {
        self.decode_count.fetch_add(1, Ordering::Relaxed);
        self.values_decoded.fetch_add(values, Ordering::Relaxed);
    }

    /// Record a failed decode
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Create a snapshot of current metrics
    pub fn snapshot(&self) -> CodecMetricsSnapshot {
        let mut formats = [0u64; FORMAT_SLOTS];
        for (dst, src) in formats.iter_mut().zip(self.formats.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        CodecMetricsSnapshot {
            formats,
            values_encoded: self.values_encoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            decode_count: self.decode_count.load(Ordering::Relaxed),
            values_decoded: self.values_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Non-atomic snapshot of codec metrics for serialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecMetricsSnapshot {
    /// Encode calls per format tag
    pub formats: [u64; FORMAT_SLOTS],
    /// Values consumed by encode
    pub values_encoded: u64,
    /// Bytes produced by encode
    pub bytes_encoded: u64,
    /// Successful decode calls
    pub decode_count: u64,
    /// Values produced by decode
    pub values_decoded: u64,
    /// Failed decode calls
    pub decode_errors: u64,
}

impl CodecMetricsSnapshot {
    /// Total encode calls across formats
    pub fn encode_count(&self) -> u64 {
        self.formats.iter().sum()
    }

    /// Average encoded bits per value
    pub fn bits_per_value(&self) -> f64 {
        if self.values_encoded == 0 {
            0.0
        } else {
            (self.bytes_encoded * 8) as f64 / self.values_encoded as f64
        }
    }
}

/// Global codec metrics collector
#[derive(Debug)]
pub struct CompressionMetrics {
    /// Integer codec metrics
    pub integer: CodecMetrics,
    /// Timestamp codec metrics
    pub timestamp: CodecMetrics,
    created_at: Instant,
}

impl Default for CompressionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            integer: CodecMetrics::new(),
            timestamp: CodecMetrics::new(),
            created_at: Instant::now(),
        }
    }

    /// Metrics for one codec family
    pub fn get(&self, kind: CodecKind) -> &CodecMetrics {
        match kind {
            CodecKind::Integer => &self.integer,
            CodecKind::Timestamp => &self.timestamp,
        }
    }

    /// Record a finished encode
    pub fn record_encode(&self, kind: CodecKind, format: u8, values: u64, bytes: u64) {
        self.get(kind).record_encode(format, values, bytes);
    }

    /// Record a successful decode
    pub fn record_decode(&self, kind: CodecKind, values: u64) {
        self.get(kind).record_decode(values);
    }

    /// Record a failed decode
    pub fn record_decode_error(&self, kind: CodecKind) {
        self.get(kind).record_decode_error();
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    /// Create a full snapshot of all metrics
    pub fn snapshot(&self) -> CompressionMetricsSnapshot {
        CompressionMetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            integer: self.integer.snapshot(),
            timestamp: self.timestamp.snapshot(),
        }
    }
}

/// Full metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CompressionMetricsSnapshot {
    /// Seconds since the collector was created
    pub uptime_secs: u64,
    /// Integer codec counters
    pub integer: CodecMetricsSnapshot,
    /// Timestamp codec counters
    pub timestamp: CodecMetricsSnapshot,
}

static GLOBAL_METRICS: OnceLock<Arc<CompressionMetrics>> = OnceLock::new();

/// Get the global metrics instance
pub fn global_metrics() -> Arc<CompressionMetrics> {
    GLOBAL_METRICS
        .get_or_init(|| Arc::new(CompressionMetrics::new()))
        .clone()
}

/// Record into the global collector unless disabled by configuration
pub(crate) fn with_global(f: impl FnOnce(&CompressionMetrics)) {
    if crate::config::current().metrics_enabled {
        f(GLOBAL_METRICS.get_or_init(|| Arc::new(CompressionMetrics::new())));
    }
}
