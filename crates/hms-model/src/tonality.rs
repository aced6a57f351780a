//! Specific tonality from band autocorrelation.
//!
//! For every block and band the unbiased autocorrelation function (ACF) of
//! the band signal is taken. Noise decorrelates within a few periods of the
//! band's bandwidth while a sinusoid keeps a constant-amplitude cosine in the
//! ACF, so the ACF is inspected only from lag `m_s = ceil(2 fs / Δf)` on.
//!
//! A Hann-windowed stretch of half a block of lags is transformed and the
//! strongest spectral peak is taken as the tonal component. The peak may lie
//! outside `f_c ± Δf`: on the skirts of a strong tone the band energy is the
//! tone's. Its amplitude is the tonal power; divided by `φ(0)` it gives the
//! tonal share `q` of the band's energy, which splits the specific loudness:
//!
//! ```text
//! N'_tonal = q · N'        N'_noise = (1 - q) · N'
//! SNR      = N'_tonal / N'_noise
//! T'       = q · SNR² / (SNR² + 1)
//! ```
//!
//! T' lies in [0, 1]; the weight suppresses bands where noise dominates.

use rayon::prelude::*;
use serde::Serialize;

use hms_dsp::{Autocorrelator, Fft, Window};

use crate::bands::{BandDefinition, NUM_BANDS, band_table};
use crate::config::SAMPLE_RATE;
use crate::error::{HmsError, Result};
use crate::loudness::LoudnessMapping;
use crate::segment::{BlockGrid, ensure_retained};

/// Upper bound of specific tonality.
pub const MAX_TONALITY: f64 = 1.0;

/// Tonal analysis of one block in one band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TonalCell {
    /// Specific tonality T', in [0, 1].
    pub tonality: f64,
    /// Loudness carried by the tonal component.
    pub tonal_loudness: f64,
    /// Loudness carried by the noise residual.
    pub noise_loudness: f64,
    /// Frequency of the tonal component in Hz, 0 without tonal content.
    pub frequency: f64,
}

/// Per-block tonal analysis with FFT plans shared across bands.
#[derive(Debug)]
pub struct TonalityAnalyzer {
    block_len: usize,
    lag_window: usize,
    autocorrelator: Autocorrelator,
    fft: Fft,
    window: Vec<f64>,
}

impl TonalityAnalyzer {
    /// Analyzer for blocks of `block_len` samples.
    pub fn new(block_len: usize) -> Self {
        let lag_window = block_len / 2;
        Self {
            block_len,
            lag_window,
            autocorrelator: Autocorrelator::new(block_len),
            fft: Fft::new(2 * lag_window.next_power_of_two()),
            window: Window::Hann.coefficients(lag_window),
        }
    }

    /// First ACF lag inspected for `band`.
    pub fn lag_start(&self, band: &BandDefinition) -> usize {
        let lag = (2.0 * SAMPLE_RATE / band.bandwidth_hz).ceil() as usize;
        lag.min(self.block_len / 4)
    }

    /// Strongest periodic component of `block`, a signal of `band`.
    ///
    /// Returns `(q, frequency)`: the share of the block's mean square carried
    /// by the component, clamped to [0, 1], and its frequency in Hz.
    pub fn tonal_component(&self, band: &BandDefinition, block: &[f64]) -> (f64, f64) {
        let acf = self.autocorrelator.compute(block);
        let energy = acf.first().copied().unwrap_or(0.0);
        if energy <= 0.0 {
            return (0.0, 0.0);
        }

        let start = self.lag_start(band);
        let lags: Vec<f64> = acf[start..start + self.lag_window]
            .iter()
            .zip(&self.window)
            .map(|(r, w)| r * w)
            .collect();
        let spectrum = self.fft.forward(&lags);
        let magnitude: Vec<f64> = spectrum.iter().map(|c| c.norm()).collect();

        let last = magnitude.len() - 2;
        let mut peak = 1;
        for k in 1..=last {
            if magnitude[k] > magnitude[peak] {
                peak = k;
            }
        }

        // Parabolic interpolation on log magnitude.
        let ln = |k: usize| magnitude[k].max(f64::MIN_POSITIVE).ln();
        let (a, b, c) = (ln(peak - 1), ln(peak), ln(peak + 1));
        let denom = a - 2.0 * b + c;
        let delta = if denom < 0.0 {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let amplitude = (b - 0.25 * (a - c) * delta).exp();

        let tonal_power = 2.0 * amplitude / Window::Hann.coherent_sum(self.lag_window);
        let q = (tonal_power / energy).clamp(0.0, 1.0);
        let frequency = self.fft.bin_frequency(peak, SAMPLE_RATE)
            + delta * self.fft.bin_frequency(1, SAMPLE_RATE);
        (q, frequency)
    }

    /// Split the specific loudness `loudness` of one block into tonal and
    /// noise parts and derive its specific tonality.
    pub fn analyze_block(&self, band: &BandDefinition, block: &[f64], loudness: f64) -> TonalCell {
        if loudness <= 0.0 {
            return TonalCell::default();
        }

        let (q, frequency) = self.tonal_component(band, block);
        if q <= 0.0 {
            return TonalCell {
                noise_loudness: loudness,
                ..TonalCell::default()
            };
        }

        let tonal_loudness = q * loudness;
        let noise_loudness = (1.0 - q) * loudness;
        // SNR²/(SNR² + 1) with SNR = q / (1 - q); finite at q = 1.
        let weight = q * q / (q * q + (1.0 - q) * (1.0 - q));

        TonalCell {
            tonality: (weight * q).min(MAX_TONALITY),
            tonal_loudness,
            noise_loudness,
            frequency,
        }
    }
}

/// Tonality of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TonalityResult {
    /// Specific tonality T', indexed `[block][band]`.
    pub specific: Vec<Vec<f64>>,
    /// Tonal part of the specific loudness, `[block][band]`.
    pub tonal_loudness: Vec<Vec<f64>>,
    /// Noise part of the specific loudness, `[block][band]`.
    pub noise_loudness: Vec<Vec<f64>>,
    /// Tonal component frequency in Hz, `[block][band]`.
    pub tonal_frequency: Vec<Vec<f64>>,
    /// Loudness-weighted tonality per block.
    pub total: Vec<f64>,
    /// Mean of `total` over retained blocks.
    pub average: f64,
    /// Mean specific tonality per band over retained blocks.
    pub specific_average: Vec<f64>,
    /// Tonal frequency of the most tonal band per block, 0 if none.
    pub dominant_frequency: Vec<f64>,
}

impl TonalityResult {
    /// Aggregate cells indexed `[block][band]`.
    ///
    /// Blocks before `first_retained` appear in the time series but not in
    /// the averages.
    pub fn from_cells(cells: &[Vec<TonalCell>], first_retained: usize) -> Self {
        let total: Vec<f64> = cells
            .iter()
            .map(|row| {
                let loudness: f64 = row.iter().map(|c| c.tonal_loudness + c.noise_loudness).sum();
                if loudness > 0.0 {
                    row.iter()
                        .map(|c| c.tonality * (c.tonal_loudness + c.noise_loudness))
                        .sum::<f64>()
                        / loudness
                } else {
                    0.0
                }
            })
            .collect();

        let dominant_frequency = cells
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|c| c.tonality > 0.0)
                    .max_by(|a, b| a.tonality.total_cmp(&b.tonality))
                    .map_or(0.0, |c| c.frequency)
            })
            .collect();

        let retained = &cells[first_retained.min(cells.len())..];
        let num_bands = cells.first().map_or(0, Vec::len);
        let specific_average = (0..num_bands)
            .map(|z| mean(retained.iter().map(|row| row[z].tonality)))
            .collect();

        Self {
            specific: matrix(cells, |c| c.tonality),
            tonal_loudness: matrix(cells, |c| c.tonal_loudness),
            noise_loudness: matrix(cells, |c| c.noise_loudness),
            tonal_frequency: matrix(cells, |c| c.frequency),
            average: mean(total[first_retained.min(total.len())..].iter().copied()),
            total,
            specific_average,
            dominant_frequency,
        }
    }
}

fn matrix(cells: &[Vec<TonalCell>], f: impl Fn(&TonalCell) -> f64) -> Vec<Vec<f64>> {
    cells.iter().map(|row| row.iter().map(&f).collect()).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Tonality transform over the band signals of one run.
///
/// `rms` holds the block RMS of every band, `[block][band]`, as produced by
/// segmentation; it fixes the specific loudness that is split into tonal and
/// noise parts. Bands are analysed in parallel.
///
/// Fails with [`HmsError::InsufficientData`] when no block is left after
/// `first_retained`, and with [`HmsError::InvalidInput`] when `bands` or
/// `rms` do not match the band table and the grid.
pub fn compute_tonality(
    bands: &[Vec<f64>],
    grid: &BlockGrid,
    rms: &[Vec<f64>],
    mapping: &LoudnessMapping,
    first_retained: usize,
) -> Result<TonalityResult> {
    if bands.len() != NUM_BANDS || rms.len() != grid.num_blocks() {
        return Err(HmsError::InvalidInput(format!(
            "expected {NUM_BANDS} band signals and {} RMS rows, got {} and {}",
            grid.num_blocks(),
            bands.len(),
            rms.len()
        )));
    }
    if let Some(short) = bands.iter().position(|b| b.len() < grid.padded_len()) {
        return Err(HmsError::InvalidInput(format!(
            "band {short} has {} samples, grid needs {}",
            bands[short].len(),
            grid.padded_len()
        )));
    }
    ensure_retained(grid.num_blocks(), first_retained)?;

    let analyzer = TonalityAnalyzer::new(grid.block_len());

    let columns: Vec<Vec<TonalCell>> = band_table()
        .par_iter()
        .zip(bands.par_iter())
        .map(|(band, signal)| {
            (0..grid.num_blocks())
                .map(|b| {
                    let loudness = mapping.specific_loudness(band.index, rms[b][band.index]);
                    analyzer.analyze_block(band, &signal[grid.block(b)], loudness)
                })
                .collect()
        })
        .collect();

    let cells: Vec<Vec<TonalCell>> = (0..grid.num_blocks())
        .map(|b| columns.iter().map(|column| column[b]).collect())
        .collect();

    Ok(TonalityResult::from_cells(&cells, first_retained))
}
