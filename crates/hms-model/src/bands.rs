//! The 53-band auditory filter table.
//!
//! Bands sit at critical-band rates z = 0.5, 1.0, … 26.5 (Δz = 0.5) on the
//! hearing model's perceptual scale:
//!
//! ```text
//! f_c(z) = (Δf0 / c) · sinh(c · z)
//! Δf(f)  = sqrt(Δf0² + (c · f)²)
//! ```
//!
//! with Δf0 = 81.9289 Hz and c = 0.1618. Since `df/dz = Δf`, one unit of z
//! spans exactly one bandwidth everywhere on the scale.
//!
//! Each band filter is a cascade of identical complex one-pole sections
//! centred on `f_c`. The time constant is chosen so that the cascade's
//! equivalent noise bandwidth equals `Δf`.

use once_cell::sync::Lazy;
use rustfft::num_complex::Complex64;
use serde::Serialize;
use std::f64::consts::PI;

use crate::config::SAMPLE_RATE;

/// Number of bands.
pub const NUM_BANDS: usize = 53;

/// Band spacing on the critical-band-rate scale.
pub const BAND_STEP: f64 = 0.5;

/// Bandwidth at 0 Hz in Hz.
pub const BANDWIDTH_AT_DC: f64 = 81.9289;

/// Slope of bandwidth growth with frequency.
pub const BANDWIDTH_SLOPE: f64 = 0.1618;

/// Complex one-pole sections per band filter.
pub const FILTER_ORDER: usize = 5;

/// Bandwidth Δf in Hz at `frequency`.
pub fn bandwidth(frequency: f64) -> f64 {
    BANDWIDTH_AT_DC.hypot(BANDWIDTH_SLOPE * frequency)
}

/// Frequency in Hz at critical-band rate `z`.
pub fn frequency_at(z: f64) -> f64 {
    BANDWIDTH_AT_DC / BANDWIDTH_SLOPE * (BANDWIDTH_SLOPE * z).sinh()
}

/// Critical-band rate of `frequency` Hz (inverse of [`frequency_at`]).
pub fn critical_band_rate(frequency: f64) -> f64 {
    (BANDWIDTH_SLOPE * frequency / BANDWIDTH_AT_DC).asinh() / BANDWIDTH_SLOPE
}

/// One entry of the band table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandDefinition {
    /// Position in the table, 0-based.
    pub index: usize,
    /// Critical-band rate of the centre.
    pub z: f64,
    /// Centre frequency in Hz.
    pub center_hz: f64,
    /// Bandwidth in Hz.
    pub bandwidth_hz: f64,
    /// Pole radius of every section.
    #[serde(skip)]
    radius: f64,
    /// Pole angle in radians per sample.
    #[serde(skip)]
    omega: f64,
}

impl BandDefinition {
    fn new(index: usize) -> Self {
        let z = BAND_STEP * (index + 1) as f64;
        let center_hz = frequency_at(z);
        let bandwidth_hz = bandwidth(center_hz);

        // ENBW of k cascaded one-pole sections is binom(2k-2, k-1) / (2^(2k-1) τ).
        let tau = binomial(2 * FILTER_ORDER - 2, FILTER_ORDER - 1)
            / 2f64.powi(2 * FILTER_ORDER as i32 - 1)
            / bandwidth_hz;
        let radius = (-1.0 / (SAMPLE_RATE * tau)).exp();

        Self {
            index,
            z,
            center_hz,
            bandwidth_hz,
            radius,
            omega: 2.0 * PI * center_hz / SAMPLE_RATE,
        }
    }

    /// Filter `signal` through this band.
    ///
    /// Returns twice the real part of the complex cascade output, which
    /// passes a sinusoid at the centre frequency with unity gain.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let pole = Complex64::from_polar(self.radius, self.omega);
        let gain = 1.0 - self.radius;
        let mut state = [Complex64::new(0.0, 0.0); FILTER_ORDER];

        signal
            .iter()
            .map(|&x| {
                let mut u = Complex64::new(x, 0.0);
                for s in &mut state {
                    *s = gain * u + pole * *s;
                    u = *s;
                }
                2.0 * u.re
            })
            .collect()
    }

    /// Complex response of the cascade at `frequency` Hz.
    pub fn response(&self, frequency: f64) -> Complex64 {
        let pole = Complex64::from_polar(self.radius, self.omega);
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * frequency / SAMPLE_RATE);
        let section = (1.0 - self.radius) / (1.0 - pole * z1);
        section.powi(FILTER_ORDER as i32)
    }

    /// Amplitude gain of [`filter`](Self::filter) for a real sinusoid at
    /// `frequency` Hz.
    ///
    /// Includes the image of the complex pole at `-frequency`, which matters
    /// for the lowest bands.
    pub fn gain(&self, frequency: f64) -> f64 {
        (self.response(frequency) + self.response(-frequency).conj()).norm()
    }
}

fn binomial(n: usize, k: usize) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc * (n + 1 - i) as f64 / i as f64)
}

static BANDS: Lazy<Vec<BandDefinition>> =
    Lazy::new(|| (0..NUM_BANDS).map(BandDefinition::new).collect());

/// The process-wide band table.
pub fn band_table() -> &'static [BandDefinition] {
    &BANDS
}

/// Centre frequencies of all bands in Hz.
pub fn band_centers_hz() -> Vec<f64> {
    BANDS.iter().map(|b| b.center_hz).collect()
}

/// Critical-band rates of all bands.
pub fn band_rates() -> Vec<f64> {
    BANDS.iter().map(|b| b.z).collect()
}
