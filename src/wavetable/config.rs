//! Wavetable Configuration
//!
//! Capacity limits and the per-slice buffer size are configuration rather
//! than constants so hosts can trade memory for coverage.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WavetableError};

/// Default number of samples per slice
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// Default maximum number of frequency rows
pub const DEFAULT_MAX_FREQS: usize = 10;

/// Default maximum number of semantic entries (seeds or wave parameters)
pub const DEFAULT_MAX_SEMANTICS: usize = 128;

/// How the semantic dimension of a table is addressed
///
/// The mode is carried and reported, but lookup treats every mode the same
/// way: `get` reads semantic slot 0 and `get_semantic` picks the nearest
/// stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WtMode {
    /// (freq) -> samples
    #[default]
    FreqSamples,
    /// (freq, seed) -> samples
    FreqSeedSamples,
    /// (freq, wave param) -> samples
    FreqWaveSamples,
}

impl fmt::Display for WtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WtMode::FreqSamples => write!(f, "freq->samples"),
            WtMode::FreqSeedSamples => write!(f, "freq,seed->samples"),
            WtMode::FreqWaveSamples => write!(f, "freq,wave->samples"),
        }
    }
}

/// Construction parameters of a [`WaveTable`](super::WaveTable)
///
/// # Example
/// ```
/// use wavecache::wavetable::{WaveTableConfig, WtMode};
///
/// let config = WaveTableConfig::default()
///     .with_buffer_size(64)
///     .with_mode(WtMode::FreqSeedSamples);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_freqs, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTableConfig {
    /// Samples per slice, fixed for the table's lifetime
    pub buffer_size: usize,
    /// Maximum number of frequency rows
    pub max_freqs: usize,
    /// Maximum number of semantic entries
    pub max_semantics: usize,
    /// Addressing mode of the semantic dimension
    pub mode: WtMode,
}

impl Default for WaveTableConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_freqs: DEFAULT_MAX_FREQS,
            max_semantics: DEFAULT_MAX_SEMANTICS,
            mode: WtMode::default(),
        }
    }
}

impl WaveTableConfig {
    /// Default limits with the given slice length
    pub fn new(buffer_size: usize) -> Self {
        Self::default().with_buffer_size(buffer_size)
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_freqs(mut self, max_freqs: usize) -> Self {
        self.max_freqs = max_freqs;
        self
    }

    pub fn with_max_semantics(mut self, max_semantics: usize) -> Self {
        self.max_semantics = max_semantics;
        self
    }

    pub fn with_mode(mut self, mode: WtMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check that every limit is usable
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(WavetableError::InvalidConfig {
                reason: "buffer_size must be at least 1".to_string(),
            });
        }
        if self.max_freqs == 0 {
            return Err(WavetableError::InvalidConfig {
                reason: "max_freqs must be at least 1".to_string(),
            });
        }
        if self.max_semantics == 0 {
            return Err(WavetableError::InvalidConfig {
                reason: "max_semantics must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bytes a fully populated table of this configuration holds
    pub fn max_table_bytes(&self) -> usize {
        let samples = self
            .buffer_size
            .saturating_mul(self.max_freqs)
            .saturating_mul(self.max_semantics);
        samples
            .saturating_add(self.max_freqs)
            .saturating_add(self.max_semantics)
            .saturating_mul(std::mem::size_of::<f32>())
    }
}

// ============================================================================
// Tests
// ============================================================================
