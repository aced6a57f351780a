//! Auditory filterbank: all 53 bands applied in parallel.
//!
//! # Example
//!
//! ```rust
//! use hms_model::filterbank::filter_bands;
//! use hms_model::bands::NUM_BANDS;
//!
//! let signal = vec![0.0; 4800];
//! let bands = filter_bands(&signal);
//! assert_eq!(bands.len(), NUM_BANDS);
//! assert!(bands.iter().all(|b| b.len() == signal.len()));
//! ```

use rayon::prelude::*;

use crate::bands::band_table;

/// Filter `signal` through every band of the table.
///
/// Bands run on the rayon pool; the result is in band order and every band
/// signal has the input's length.
pub fn filter_bands(signal: &[f64]) -> Vec<Vec<f64>> {
    band_table()
        .par_iter()
        .map(|band| band.filter(signal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::{BAND_STEP, NUM_BANDS};
    use std::f64::consts::PI;

    fn mean_square(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64
    }

    #[test]
    fn band_order_matches_table() {
        let n = 9600;
        let band = &band_table()[30];
        let x: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * band.center_hz * i as f64 / 48000.0).sin())
            .collect();
        let bands = filter_bands(&x);
        assert_eq!(bands.len(), NUM_BANDS);

        let loudest = bands
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| mean_square(&a[4800..]).total_cmp(&mean_square(&b[4800..])))
            .map(|(i, _)| i);
        assert_eq!(loudest, Some(30));
    }

    #[test]
    fn band_energies_sum_to_input_energy() {
        // Bands overlap by one bandwidth at Δz = 0.5, so the Δz-weighted sum
        // of band energies approximates the input energy.
        let x: Vec<f64> = (0..24000)
            .map(|i| (2.0 * PI * 1000.0 * i as f64 / 48000.0).sin())
            .collect();
        let bands = filter_bands(&x);
        let total: f64 = bands.iter().map(|b| mean_square(&b[12000..]) * BAND_STEP).sum();
        let input = mean_square(&x[12000..]);
        assert!((total / input - 1.0).abs() < 0.15, "ratio {}", total / input);
    }

    #[test]
    fn deterministic() {
        let x: Vec<f64> = (0..4096).map(|i| ((i * 7919) % 101) as f64 / 50.0 - 1.0).collect();
        assert_eq!(filter_bands(&x), filter_bands(&x));
    }
}
