//! Specific and total loudness.
//!
//! The block RMS `p̃` of a band is compressed by a chain of level-dependent
//! power laws:
//!
//! ```text
//! p̃' = p̃ · Π_{i=1..8} (1 + (p̃ / p_t,i)^α)^((v_i - v_{i-1}) / α)
//! N'  = c_N · p̃' / p0
//! ```
//!
//! Above each threshold `p_t,i` the local slope of `log p̃'` over `log p̃`
//! moves from `v_{i-1}` to `v_i`.
//!
//! Each band has a threshold in quiet `T_j`, taken at the band centre after
//! the ear filter. Band RMS values are referred to the lowest threshold
//! `T_ref` before compression, and the basis loudness of `T_ref` is
//! subtracted:
//!
//! ```text
//! N'_j = max(0, N'(p̃_j · T_ref / T_j) - N'(T_ref))
//! ```
//!
//! The threshold curve rises faster than the band filter skirts fall off at
//! both ends of the scale. Where it does, a tone at one band's centre would
//! reach a neighbour more easily than its own band. Such thresholds are
//! lowered until every neighbour's threshold exceeds its relative response
//! to the band's centre tone by [`THRESHOLD_MARGIN`].

use serde::Serialize;
use tracing::debug;

use crate::bands::{BAND_STEP, NUM_BANDS, band_table};
use crate::ear_filter::EarFilter;
use crate::error::Result;
use crate::segment::ensure_retained;

/// Reference sound pressure in Pa.
pub const REFERENCE_PRESSURE: f64 = 2e-5;

/// Calibration constant c_N in sone per Bark per unit compressed pressure.
pub const LOUDNESS_SCALE: f64 = 0.0217406;

/// Amplitude ratio by which a band's own response to its centre tone,
/// referred to its threshold, must exceed that of any other band (0.5 dB).
pub const THRESHOLD_MARGIN: f64 = 1.06;

/// Transition sharpness between compression segments.
const ALPHA: f64 = 1.5;

/// Levels where the compression exponent changes, in dB SPL.
const BREAKPOINTS_DB: [f64; 8] = [15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0];

/// Compression exponent below the first breakpoint and above each one.
const EXPONENTS: [f64; 9] = [
    1.0, 0.6602, 0.0864, 0.6384, 0.0328, 0.4068, 0.2082, 0.3994, 0.6434,
];

/// Apply the compressive level mapping to an RMS pressure in Pa.
pub fn compress(pressure: f64) -> f64 {
    if pressure <= 0.0 {
        return 0.0;
    }
    BREAKPOINTS_DB
        .iter()
        .zip(EXPONENTS.windows(2))
        .fold(pressure, |acc, (&level, v)| {
            let p_t = REFERENCE_PRESSURE * 10f64.powf(level / 20.0);
            acc * (1.0 + (pressure / p_t).powf(ALPHA)).powf((v[1] - v[0]) / ALPHA)
        })
}

/// Unthresholded specific loudness of an RMS pressure.
pub fn basis_loudness(pressure: f64) -> f64 {
    LOUDNESS_SCALE * compress(pressure) / REFERENCE_PRESSURE
}

/// Threshold in quiet in dB SPL at `frequency` Hz (Terhardt's approximation).
pub fn threshold_in_quiet_db(frequency: f64) -> f64 {
    let khz = (frequency / 1000.0).max(0.02);
    3.64 * khz.powf(-0.8) - 6.5 * (-0.6 * (khz - 3.3).powi(2)).exp() + 1e-3 * khz.powi(4)
}

/// RMS pressure in Pa of a level in dB SPL.
fn level_to_pressure(level_db: f64) -> f64 {
    REFERENCE_PRESSURE * 10f64.powf(level_db / 20.0)
}

/// Per-band loudness mapping for one ear filter.
///
/// The threshold in quiet is referred to the ear-filtered signal by adding
/// the filter's gain at each band centre.
#[derive(Debug, Clone)]
pub struct LoudnessMapping {
    /// Threshold RMS pressure per band in Pa.
    thresholds: Vec<f64>,
    /// Lowest band threshold.
    reference: f64,
    reference_loudness: f64,
}

impl LoudnessMapping {
    /// Build the mapping for `ear`.
    pub fn new(ear: &EarFilter) -> Self {
        let table = band_table();
        let mut thresholds: Vec<f64> = table
            .iter()
            .map(|band| {
                level_to_pressure(
                    threshold_in_quiet_db(band.center_hz) + ear.gain_db(band.center_hz),
                )
            })
            .collect();

        // crosstalk[j][k]: gain of band j at band k's centre, relative to band k.
        let crosstalk: Vec<Vec<f64>> = table
            .iter()
            .map(|band| {
                table
                    .iter()
                    .map(|tone| band.gain(tone.center_hz) / tone.gain(tone.center_hz))
                    .collect()
            })
            .collect();

        // Difference constraints on log thresholds; settles within NUM_BANDS rounds.
        let mut lowered = vec![false; NUM_BANDS];
        for _ in 0..NUM_BANDS {
            let mut changed = false;
            for k in 0..NUM_BANDS {
                for j in (0..NUM_BANDS).filter(|&j| j != k) {
                    let limit = thresholds[j] / (THRESHOLD_MARGIN * crosstalk[j][k]);
                    if thresholds[k] > limit * (1.0 + 1e-12) {
                        thresholds[k] = limit;
                        lowered[k] = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let reference = thresholds.iter().copied().fold(f64::INFINITY, f64::min);
        debug!(
            field = %ear.field(),
            reference_db = 20.0 * (reference / REFERENCE_PRESSURE).log10(),
            lowered = lowered.iter().filter(|&&l| l).count(),
            "loudness thresholds"
        );

        Self {
            thresholds,
            reference,
            reference_loudness: basis_loudness(reference),
        }
    }

    /// Threshold of `band` as an RMS pressure in Pa.
    pub fn threshold(&self, band: usize) -> f64 {
        self.thresholds[band]
    }

    /// Threshold of `band` in dB SPL.
    pub fn threshold_db(&self, band: usize) -> f64 {
        20.0 * (self.thresholds[band] / REFERENCE_PRESSURE).log10()
    }

    /// Lowest band threshold in Pa, which all bands are referred to.
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Specific loudness of `band` for a block RMS pressure.
    pub fn specific_loudness(&self, band: usize, rms: f64) -> f64 {
        let referred = rms * self.reference / self.thresholds[band];
        (basis_loudness(referred) - self.reference_loudness).max(0.0)
    }
}

/// Root of the mean square of `values`; 0 for an empty slice.
pub fn power_average(values: &[f64]) -> f64 {
    hms_dsp::rms(values)
}

/// Value exceeded in `percent` % of `values`, linearly interpolated.
pub fn percentile_exceeded(values: &[f64], percent: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (1.0 - percent / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Loudness of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoudnessResult {
    /// Specific loudness N' in sone/Bark, indexed `[block][band]`.
    pub specific: Vec<Vec<f64>>,
    /// Total loudness N per block in sone.
    pub total: Vec<f64>,
    /// Power-averaged specific loudness per band over retained blocks.
    pub specific_average: Vec<f64>,
    /// Power-averaged total loudness over retained blocks.
    pub average: f64,
    /// Largest total loudness among retained blocks.
    pub max: f64,
    /// Total loudness exceeded in 5 % of retained blocks.
    pub n5: f64,
}

/// Specific loudness matrix from block RMS values `[block][band]`.
pub fn specific_loudness(rms: &[Vec<f64>], mapping: &LoudnessMapping) -> Vec<Vec<f64>> {
    rms.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(z, &p)| mapping.specific_loudness(z, p))
                .collect()
        })
        .collect()
}

/// Loudness transform over block RMS values `[block][band]`.
///
/// Blocks before `first_retained` appear in the time series but not in any
/// average. Fails with [`HmsError::InsufficientData`](crate::HmsError) when
/// no block is left to average.
pub fn compute_loudness(
    rms: &[Vec<f64>],
    mapping: &LoudnessMapping,
    first_retained: usize,
) -> Result<LoudnessResult> {
    ensure_retained(rms.len(), first_retained)?;

    let specific = specific_loudness(rms, mapping);
    let total: Vec<f64> = specific
        .iter()
        .map(|row| row.iter().sum::<f64>() * BAND_STEP)
        .collect();

    let retained = &specific[first_retained..];
    let num_bands = specific.first().map_or(0, Vec::len);
    let specific_average = (0..num_bands)
        .map(|z| {
            let column: Vec<f64> = retained.iter().map(|row| row[z]).collect();
            power_average(&column)
        })
        .collect();

    let retained_total = &total[first_retained..];
    Ok(LoudnessResult {
        average: power_average(retained_total),
        max: retained_total.iter().copied().fold(0.0, f64::max),
        n5: percentile_exceeded(retained_total, 5.0),
        specific,
        total,
        specific_average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use crate::error::HmsError;

    fn spl(level_db: f64) -> f64 {
        level_to_pressure(level_db)
    }

    fn argmax(values: &[f64]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap()
    }

    fn raw_threshold_db(ear: &EarFilter, frequency: f64) -> f64 {
        threshold_in_quiet_db(frequency) + ear.gain_db(frequency)
    }

    #[test]
    fn compress_is_linear_at_low_levels() {
        let p = spl(-20.0);
        assert!((compress(p) / p - 1.0).abs() < 0.01);
        assert_eq!(compress(0.0), 0.0);
    }

    #[test]
    fn compress_high_level_slope() {
        // Far above the last breakpoint the slope settles at v_8.
        let ratio = compress(spl(130.0)) / compress(spl(120.0));
        let slope = 20.0 * ratio.log10() / 10.0;
        assert!((slope - 0.6434).abs() < 0.02, "slope {slope}");
    }

    #[test]
    fn threshold_in_quiet_shape() {
        assert!(threshold_in_quiet_db(1000.0).abs() < 5.0);
        assert!(threshold_in_quiet_db(3500.0) < 0.0);
        assert!(threshold_in_quiet_db(50.0) > 30.0);
        assert!(threshold_in_quiet_db(16000.0) > 50.0);
    }

    #[test]
    fn below_threshold_is_silent() {
        let mapping = LoudnessMapping::new(&EarFilter::new(FieldType::Free));
        for z in 0..53 {
            assert_eq!(mapping.specific_loudness(z, 0.0), 0.0);
            assert!(mapping.threshold(z) >= mapping.reference());
            // Just below the band's own threshold.
            assert_eq!(mapping.specific_loudness(z, 0.99 * mapping.threshold(z)), 0.0);
            assert!(mapping.specific_loudness(z, 1.01 * mapping.threshold(z)) > 0.0);
        }
        // 1 kHz band at 0 dB SPL.
        assert_eq!(mapping.specific_loudness(16, spl(0.0)), 0.0);
    }

    #[test]
    fn thresholds_are_only_lowered_at_the_edges() {
        for field in [FieldType::Free, FieldType::Diffuse] {
            let ear = EarFilter::new(field);
            let mapping = LoudnessMapping::new(&ear);
            for band in band_table() {
                let raw = raw_threshold_db(&ear, band.center_hz);
                let db = mapping.threshold_db(band.index);
                assert!(db <= raw + 1e-9, "{field} band {}: {db} > {raw}", band.index);
                if (6..=40).contains(&band.index) {
                    assert!((db - raw).abs() < 1e-9, "{field} band {} moved", band.index);
                }
            }
            // The steep rise above 15 kHz is flattened.
            let top = band_table()[52].center_hz;
            assert!(mapping.threshold_db(52) < raw_threshold_db(&ear, top) - 20.0);
        }
    }

    #[test]
    fn center_tone_peaks_in_its_own_band() {
        let table = band_table();
        for field in [FieldType::Free, FieldType::Diffuse] {
            let ear = EarFilter::new(field);
            let mapping = LoudnessMapping::new(&ear);
            for tone in table {
                let transmission = 10f64.powf(ear.gain_db(tone.center_hz) / 20.0);
                let mut audible = false;
                for level in (0..=120).step_by(4) {
                    let rms = spl(f64::from(level)) * transmission;
                    let specific: Vec<f64> = table
                        .iter()
                        .map(|band| {
                            mapping.specific_loudness(band.index, rms * band.gain(tone.center_hz))
                        })
                        .collect();
                    let peak = argmax(&specific);
                    if specific[peak] > 0.0 {
                        audible = true;
                        assert_eq!(
                            peak, tone.index,
                            "{field}: {level} dB tone at {:.0} Hz peaks in band {peak}",
                            tone.center_hz
                        );
                    }
                }
                assert!(audible, "{field}: band {} never audible", tone.index);
            }
        }
    }

    #[test]
    fn mid_level_specific_loudness() {
        let mapping = LoudnessMapping::new(&EarFilter::new(FieldType::Free));
        let n40 = mapping.specific_loudness(16, spl(40.0));
        let n60 = mapping.specific_loudness(16, spl(60.0));
        assert!(n40 > 0.1 && n40 < 1.0, "N'(40 dB) = {n40}");
        assert!(n60 > n40);
    }

    #[test]
    fn power_average_constant_is_idempotent() {
        let series = vec![2.5; 40];
        assert!((power_average(&series) - 2.5).abs() < 1e-12);
        assert!((power_average(&[3.0, 4.0]) - 12.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(power_average(&[]), 0.0);
    }

    #[test]
    fn percentile_exceeded_interpolates() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        assert!((percentile_exceeded(&values, 5.0) - 95.0).abs() < 1e-12);
        assert!((percentile_exceeded(&values, 50.0) - 50.0).abs() < 1e-12);
        assert_eq!(percentile_exceeded(&[7.0], 5.0), 7.0);
        assert_eq!(percentile_exceeded(&[], 5.0), 0.0);
    }

    #[test]
    fn totals_and_skip() {
        let mapping = LoudnessMapping::new(&EarFilter::new(FieldType::Free));
        // Four blocks, the first one loud and skipped.
        let mut rms = vec![vec![spl(50.0); 53]; 4];
        rms[0] = vec![spl(90.0); 53];
        let result = compute_loudness(&rms, &mapping, 1).unwrap();

        assert_eq!(result.specific.len(), 4);
        assert_eq!(result.total.len(), 4);
        assert_eq!(result.specific_average.len(), 53);
        let expected_total: f64 = result.specific[2].iter().sum::<f64>() * 0.5;
        assert!((result.total[2] - expected_total).abs() < 1e-12);
        assert!(result.total[0] > result.total[1]);

        // Retained blocks are identical, so averages equal the block value.
        assert!((result.average - result.total[1]).abs() < 1e-9);
        assert!((result.max - result.total[1]).abs() < 1e-12);
        assert!((result.n5 - result.total[1]).abs() < 1e-9);
        assert!((result.specific_average[16] - result.specific[3][16]).abs() < 1e-9);
    }

    #[test]
    fn skipping_every_block_is_insufficient() {
        let mapping = LoudnessMapping::new(&EarFilter::new(FieldType::Free));
        let rms = vec![vec![spl(60.0); 53]; 3];
        assert_eq!(
            compute_loudness(&rms, &mapping, 3),
            Err(HmsError::InsufficientData {
                blocks: 3,
                required: 3
            })
        );
        assert!(compute_loudness(&[], &mapping, 0).is_err());
        assert!(compute_loudness(&rms, &mapping, 2).is_ok());
    }
}
