//! Model configuration and sound-field selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HmsError, Result};

/// Internal sample rate of the model in Hz.
pub const SAMPLE_RATE: f64 = 48000.0;

/// Default analysis block length in samples.
pub const DEFAULT_BLOCK_LEN: usize = 8192;

/// Default hop between consecutive blocks in samples (75% overlap).
pub const DEFAULT_HOP: usize = 2048;

/// Default duration excluded from long-term averages, in seconds.
pub const DEFAULT_TIME_SKIP: f64 = 0.304;

/// Smallest accepted block length.
pub const MIN_BLOCK_LEN: usize = 512;

/// Largest accepted block length.
pub const MAX_BLOCK_LEN: usize = 65536;

/// Sound field the signal was recorded in.
///
/// Selects the outer/middle-ear transmission filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Frontal free-field incidence.
    #[default]
    Free,
    /// Diffuse (random incidence) field.
    Diffuse,
}

impl FieldType {
    /// Lowercase tag used in configuration files and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Free => "free",
            FieldType::Diffuse => "diffuse",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = HmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(FieldType::Free),
            "diffuse" => Ok(FieldType::Diffuse),
            other => Err(HmsError::InvalidConfig(format!(
                "unknown field type '{other}' (expected 'free' or 'diffuse')"
            ))),
        }
    }
}

/// Parameters of one hearing model run.
///
/// # TOML Format
///
/// ```toml
/// field = "diffuse"
/// time_skip = 0.304
/// block_len = 8192
/// hop = 2048
/// ```
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmsConfig {
    /// Sound field selecting the ear filter.
    pub field: FieldType,
    /// Seconds at the start excluded from averages.
    pub time_skip: f64,
    /// Block length in samples at the internal rate.
    pub block_len: usize,
    /// Hop between block starts in samples.
    pub hop: usize,
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            field: FieldType::Free,
            time_skip: DEFAULT_TIME_SKIP,
            block_len: DEFAULT_BLOCK_LEN,
            hop: DEFAULT_HOP,
        }
    }
}

impl HmsConfig {
    /// Default configuration for the given field type.
    pub fn new(field: FieldType) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }

    /// Set the time skip in seconds.
    pub fn with_time_skip(mut self, seconds: f64) -> Self {
        self.time_skip = seconds;
        self
    }

    /// Set block length and hop in samples.
    pub fn with_blocks(mut self, block_len: usize, hop: usize) -> Self {
        self.block_len = block_len;
        self.hop = hop;
        self
    }

    /// Check every value against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if !self.time_skip.is_finite() || self.time_skip < 0.0 {
            return Err(HmsError::InvalidConfig(format!(
                "time_skip must be finite and non-negative, got {}",
                self.time_skip
            )));
        }
        if !(MIN_BLOCK_LEN..=MAX_BLOCK_LEN).contains(&self.block_len) {
            return Err(HmsError::InvalidConfig(format!(
                "block_len must be in {MIN_BLOCK_LEN}..={MAX_BLOCK_LEN}, got {}",
                self.block_len
            )));
        }
        if self.hop == 0 || self.hop > self.block_len {
            return Err(HmsError::InvalidConfig(format!(
                "hop must be in 1..={}, got {}",
                self.block_len, self.hop
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| HmsError::InvalidConfig(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML document.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| HmsError::InvalidConfig(e.to_string()))
    }
}
