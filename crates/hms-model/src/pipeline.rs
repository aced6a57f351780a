//! Pipeline orchestration.
//!
//! A run moves through fixed stages:
//!
//! ```text
//! Resampled → Preprocessed → EarFiltered → BandFiltered → Segmented
//!           → {LoudnessComputed ∥ TonalityComputed} → Assembled
//! ```
//!
//! Loudness and tonality share the band signals, the block grid and the
//! block RMS matrix read-only and run concurrently on the rayon pool. Any
//! stage error aborts the run; no partial result is returned.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::bands::{band_centers_hz, band_rates};
use crate::config::{FieldType, HmsConfig};
use crate::ear_filter::EarFilter;
use crate::error::{HmsError, Result};
use crate::filterbank::filter_bands;
use crate::loudness::{LoudnessMapping, LoudnessResult, REFERENCE_PRESSURE, compute_loudness};
use crate::preprocess::preprocess;
use crate::resample::to_internal_rate;
use crate::segment::{BlockGrid, block_rms};
use crate::signal::CalibratedSignal;
use crate::tonality::{TonalityResult, compute_tonality};

/// Pipeline stage, reported in debug logs as each one completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Signal converted to the internal rate.
    Resampled,
    /// Fade-in applied and padded onto the block grid.
    Preprocessed,
    /// Outer/middle ear transmission applied.
    EarFiltered,
    /// All band signals computed.
    BandFiltered,
    /// Block RMS computed for every band.
    Segmented,
    /// Specific and total loudness computed.
    LoudnessComputed,
    /// Specific and total tonality computed.
    TonalityComputed,
    /// Result bundle assembled.
    Assembled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resampled => "resampled",
            Stage::Preprocessed => "preprocessed",
            Stage::EarFiltered => "ear-filtered",
            Stage::BandFiltered => "band-filtered",
            Stage::Segmented => "segmented",
            Stage::LoudnessComputed => "loudness",
            Stage::TonalityComputed => "tonality",
            Stage::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// Output of one hearing model run.
///
/// Matrices are indexed `[block][band]`. The time axis covers every block;
/// the first `skipped_blocks` entries are excluded from all averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HmsResult {
    /// Sound field of the ear filter used.
    pub field: FieldType,
    /// Band centre frequencies in Hz.
    pub band_centers_hz: Vec<f64>,
    /// Band critical-band rates.
    pub band_rates: Vec<f64>,
    /// Timestamps in seconds of every block, skipped ones included.
    ///
    /// The matrices and per-block series share this axis so that onset
    /// behaviour stays visible; [`retained_time`](Self::retained_time) gives
    /// the post-skip view that the averages are taken over.
    pub time: Vec<f64>,
    /// Time skip in seconds.
    pub time_skip: f64,
    /// Number of leading blocks excluded from averages.
    pub skipped_blocks: usize,
    /// Loudness results.
    pub loudness: LoudnessResult,
    /// Tonality results.
    pub tonality: TonalityResult,
}

impl HmsResult {
    /// Timestamps of the blocks that enter averages.
    pub fn retained_time(&self) -> &[f64] {
        &self.time[self.skipped_blocks..]
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.time.len()
    }
}

/// Configured hearing model.
///
/// Holds the ear filter and the loudness mapping derived from it, so that
/// many signals can be analysed with one setup.
#[derive(Debug, Clone)]
pub struct HearingModel {
    config: HmsConfig,
    ear: EarFilter,
    mapping: LoudnessMapping,
}

impl HearingModel {
    /// Validate `config` and build the model.
    pub fn new(config: HmsConfig) -> Result<Self> {
        config.validate()?;
        let ear = EarFilter::new(config.field);
        let mapping = LoudnessMapping::new(&ear);
        Ok(Self {
            config,
            ear,
            mapping,
        })
    }

    /// Configuration of this model.
    pub fn config(&self) -> &HmsConfig {
        &self.config
    }

    /// Ear filter of this model.
    pub fn ear_filter(&self) -> &EarFilter {
        &self.ear
    }

    /// Run the full pipeline on `signal`.
    pub fn analyze(&self, signal: &CalibratedSignal) -> Result<HmsResult> {
        let config = &self.config;

        let resampled = to_internal_rate(&signal.pressure(), signal.sample_rate())?;
        debug!(
            stage = %Stage::Resampled,
            samples = resampled.len(),
            level_db = hms_dsp::level_db(&resampled, REFERENCE_PRESSURE)
        );

        let grid = BlockGrid::new(resampled.len(), config.block_len, config.hop);
        let first_retained = grid.first_retained(config.time_skip)?;
        let padded = preprocess(&resampled, &grid);
        drop(resampled);
        debug!(
            stage = %Stage::Preprocessed,
            samples = padded.len(),
            blocks = grid.num_blocks(),
            skipped = first_retained
        );

        let filtered = self.ear.apply(&padded);
        drop(padded);
        debug!(stage = %Stage::EarFiltered, field = %config.field);

        let bands = filter_bands(&filtered);
        drop(filtered);
        debug!(stage = %Stage::BandFiltered, bands = bands.len());

        let rms = block_rms(&bands, &grid);
        debug!(stage = %Stage::Segmented, blocks = rms.len());

        let (loudness, tonality) = rayon::join(
            || {
                let result = compute_loudness(&rms, &self.mapping, first_retained)?;
                debug!(stage = %Stage::LoudnessComputed, average = result.average);
                Ok::<_, HmsError>(result)
            },
            || {
                let result = compute_tonality(&bands, &grid, &rms, &self.mapping, first_retained)?;
                debug!(stage = %Stage::TonalityComputed, average = result.average);
                Ok::<_, HmsError>(result)
            },
        );
        let (loudness, tonality) = (loudness?, tonality?);

        let result = HmsResult {
            field: config.field,
            band_centers_hz: band_centers_hz(),
            band_rates: band_rates(),
            time: grid.times(),
            time_skip: config.time_skip,
            skipped_blocks: first_retained,
            loudness,
            tonality,
        };
        debug!(stage = %Stage::Assembled);

        info!(
            field = %result.field,
            duration_s = signal.duration(),
            blocks = result.num_blocks(),
            loudness_sone = result.loudness.average,
            tonality_tu = result.tonality.average,
            "analysis complete"
        );
        Ok(result)
    }
}

/// Analyse `signal` with `config` in one call.
pub fn analyze(signal: &CalibratedSignal, config: &HmsConfig) -> Result<HmsResult> {
    HearingModel::new(config.clone())?.analyze(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HmsConfig {
        HmsConfig::default().with_blocks(2048, 1024).with_time_skip(0.05)
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::BandFiltered.to_string(), "band-filtered");
        assert_eq!(Stage::Assembled.to_string(), "assembled");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = HmsConfig::default().with_blocks(4096, 0);
        assert!(matches!(HearingModel::new(config), Err(HmsError::InvalidConfig(_))));
    }

    #[test]
    fn short_signal_is_insufficient() {
        let signal = CalibratedSignal::new(vec![0.01; 1000], 48000.0).unwrap();
        let err = analyze(&signal, &HmsConfig::default()).unwrap_err();
        assert!(matches!(err, HmsError::InsufficientData { .. }));
    }

    #[test]
    fn result_shapes() {
        let signal = CalibratedSignal::new(vec![0.0; 9600], 48000.0).unwrap();
        let result = analyze(&signal, &fast_config()).unwrap();

        assert_eq!(result.num_blocks(), 10);
        assert_eq!(result.skipped_blocks, 3);
        assert_eq!(result.retained_time().len(), 7);
        assert_eq!(result.band_centers_hz.len(), 53);
        assert_eq!(result.loudness.specific.len(), 10);
        assert_eq!(result.tonality.specific.len(), 10);
        assert!(result.loudness.specific.iter().all(|row| row.len() == 53));
        assert!(result.tonality.specific.iter().all(|row| row.len() == 53));
    }

    #[test]
    fn time_axis_includes_skipped_blocks() {
        let signal = CalibratedSignal::new(vec![0.0; 9600], 48000.0).unwrap();
        let result = analyze(&signal, &fast_config()).unwrap();

        assert_eq!(result.time[0], 0.0);
        assert_eq!(result.time.len(), result.loudness.total.len());
        assert!(result.time[result.skipped_blocks - 1] < result.time_skip);
        assert_eq!(result.retained_time()[0], result.time[result.skipped_blocks]);
        assert!(result.retained_time()[0] >= result.time_skip);
    }

    #[test]
    fn unreachable_sample_rate_is_invalid_input() {
        let signal = CalibratedSignal::new(vec![0.5; 100], 10.0).unwrap();
        let err = analyze(&signal, &fast_config()).unwrap_err();
        assert!(matches!(err, HmsError::InvalidInput(_)), "{err}");
    }
}
