//! Configuration for the codec layer
//!
//! Supports TOML files, environment variable overrides and sensible defaults.
//! The configuration is installed process-wide once, either explicitly via
//! [`init`] or lazily from the environment on first use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable selecting the kernel (`auto`, `generic`, `avx2`)
pub const ENV_KERNEL: &str = "TSCODEC_KERNEL";

/// Environment variable overriding the decode element limit
pub const ENV_MAX_DECODE_VALUES: &str = "TSCODEC_MAX_DECODE_VALUES";

/// Hard ceiling for `max_decode_values`
const MAX_DECODE_VALUES_CEILING: usize = 1 << 32;

static CONFIG: OnceLock<CodecConfig> = OnceLock::new();

/// Which transform/packing kernel the codecs should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelPreference {
    /// Probe the CPU and use the fastest available kernel
    #[default]
    Auto,
    /// Always use the portable scalar kernel
    Generic,
    /// Use the AVX2 kernel when the CPU supports it, generic otherwise
    Avx2,
}

impl FromStr for KernelPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "generic" | "scalar" => Ok(Self::Generic),
            "avx2" => Ok(Self::Avx2),
            other => Err(Error::Configuration(format!("unknown kernel '{}'", other))),
        }
    }
}

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Kernel selection
    #[serde(default)]
    pub kernel: KernelPreference,

    /// Maximum number of elements a single decode call may materialise
    #[serde(default = "default_max_decode_values")]
    pub max_decode_values: usize,

    /// Record encode/decode counters into the global metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_max_decode_values() -> usize { 10_000_000 }
fn default_true() -> bool { true }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            kernel: KernelPreference::Auto,
            max_decode_values: default_max_decode_values(),
            metrics_enabled: true,
        }
    }
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| {
                Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
            })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(kernel) = std::env::var(ENV_KERNEL) {
            self.kernel = kernel.parse()?;
        }
        if let Ok(limit) = std::env::var(ENV_MAX_DECODE_VALUES) {
            self.max_decode_values = limit.trim().parse().map_err(|e| {
                Error::Configuration(format!("{} must be an integer: {}", ENV_MAX_DECODE_VALUES, e))
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_decode_values == 0 {
            return Err(Error::Configuration("max_decode_values must be > 0".to_string()));
        }
        if self.max_decode_values > MAX_DECODE_VALUES_CEILING {
            return Err(Error::Configuration(format!(
                "max_decode_values cannot exceed {}",
                MAX_DECODE_VALUES_CEILING
            )));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Install the process-wide configuration
///
/// The first installed configuration wins. Fails if the configuration is
/// invalid or if one is already in place (including one loaded lazily by an
/// earlier encode or decode call).
pub fn init(config: CodecConfig) -> Result<()> {
    config.validate()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Configuration("codec configuration already initialised".to_string()))
}

/// The active process-wide configuration
///
/// Falls back to defaults plus environment overrides when [`init`] was never
/// called. An invalid environment is logged and ignored.
pub fn current() -> &'static CodecConfig {
    CONFIG.get_or_init(|| match CodecConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid codec environment, using defaults");
            CodecConfig::default()
        },
    })
}
