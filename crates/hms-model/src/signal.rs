//! Calibrated mono input signal.

use crate::error::{HmsError, Result};

/// Mono sound pressure signal with its sample rate and calibration factor.
///
/// Samples are multiplied by the calibration factor before any processing,
/// so that the scaled values are in pascal.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedSignal {
    samples: Vec<f64>,
    sample_rate: f64,
    calibration: f64,
}

impl CalibratedSignal {
    /// Wrap mono samples recorded at `sample_rate` Hz.
    ///
    /// Fails with [`HmsError::InvalidInput`] if the signal is empty, holds
    /// non-finite samples, or the rate is not a positive finite number.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Result<Self> {
        if samples.is_empty() {
            return Err(HmsError::InvalidInput("signal is empty".to_string()));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(HmsError::InvalidInput(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if let Some(pos) = samples.iter().position(|x| !x.is_finite()) {
            return Err(HmsError::InvalidInput(format!(
                "non-finite sample at index {pos}"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            calibration: 1.0,
        })
    }

    /// Average interleaved multi-channel frames down to mono.
    pub fn from_interleaved(data: &[f64], channels: usize, sample_rate: f64) -> Result<Self> {
        if channels == 0 {
            return Err(HmsError::InvalidInput("channel count must be at least 1".to_string()));
        }
        if data.len() % channels != 0 {
            return Err(HmsError::InvalidInput(format!(
                "{} samples do not divide into {channels} channels",
                data.len()
            )));
        }
        let scale = 1.0 / channels as f64;
        let mono = data
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() * scale)
            .collect();
        Self::new(mono, sample_rate)
    }

    /// Set the multiplicative calibration factor (positive and finite).
    pub fn with_calibration(mut self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(HmsError::InvalidInput(format!(
                "calibration factor must be positive, got {factor}"
            )));
        }
        self.calibration = factor;
        Ok(self)
    }

    /// Raw samples before calibration.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Calibration factor.
    pub fn calibration(&self) -> f64 {
        self.calibration
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction rejects empty signals.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Samples scaled to pascal.
    pub fn pressure(&self) -> Vec<f64> {
        self.samples.iter().map(|&x| x * self.calibration).collect()
    }
}
