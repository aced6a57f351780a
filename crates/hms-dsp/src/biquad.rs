//! Biquad (bi-quadratic) filter structure.
//!
//! Provides a generic second-order IIR filter, a cascade of such sections,
//! and the RBJ Audio EQ Cookbook coefficient designs the ear filter is
//! assembled from.

use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Generic biquad filter coefficients and state.
///
/// Implements the Direct Form I biquad structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Feedforward coefficients
    b0: f64,
    b1: f64,
    b2: f64,

    /// Feedback coefficients (normalized by a0)
    a1: f64,
    a2: f64,

    /// Input delay line: x[n-1], x[n-2]
    x1: f64,
    x2: f64,

    /// Output delay line: y[n-1], y[n-2]
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Creates a new biquad with passthrough coefficients.
    ///
    /// Initial state: `y[n] = x[n]` (no filtering)
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Creates a biquad from an `(b0, b1, b2, a0, a1, a2)` coefficient tuple.
    pub fn from_coefficients(coeffs: (f64, f64, f64, f64, f64, f64)) -> Self {
        let (b0, b1, b2, a0, a1, a2) = coeffs;
        let mut biquad = Self::new();
        biquad.set_coefficients(b0, b1, b2, a0, a1, a2);
        biquad
    }

    /// Sets the biquad coefficients.
    ///
    /// Note: This function normalizes by a0 internally.
    pub fn set_coefficients(&mut self, b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Processes a single sample through the biquad filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clears the filter state (delay lines).
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Complex frequency response `H(e^{jω})` at `frequency` Hz.
    pub fn response(&self, frequency: f64, sample_rate: f64) -> Complex64 {
        let omega = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    /// True when both poles lie strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// A series connection of biquad sections.
#[derive(Debug, Clone, Default)]
pub struct BiquadCascade {
    sections: Vec<Biquad>,
}

impl BiquadCascade {
    /// Builds a cascade from coefficient tuples, first tuple first in the chain.
    pub fn from_coefficients<I>(coeffs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64, f64, f64, f64)>,
    {
        Self {
            sections: coeffs.into_iter().map(Biquad::from_coefficients).collect(),
        }
    }

    /// Process a single sample through every section.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |sample, section| section.process(sample))
    }

    /// Filter a whole buffer from a cleared state.
    pub fn process_buffer(&mut self, signal: &[f64]) -> Vec<f64> {
        self.clear();
        signal.iter().map(|&x| self.process(x)).collect()
    }

    /// Clear every section's delay lines.
    pub fn clear(&mut self) {
        for section in &mut self.sections {
            section.clear();
        }
    }

    /// Magnitude response in dB at `frequency` Hz.
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        let gain = self
            .sections
            .iter()
            .map(|s| s.response(frequency, sample_rate).norm())
            .product::<f64>();
        20.0 * gain.max(1e-12).log10()
    }

    /// True when every section is stable.
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }
}

/// Calculates low-pass filter coefficients using the RBJ cookbook formula.
///
/// # Returns
///
/// (b0, b1, b2, a0, a1, a2) coefficients
pub fn lowpass_coefficients(frequency: f64, q: f64, sample_rate: f64) -> (f64, f64, f64, f64, f64, f64) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// Calculates high-pass filter coefficients using the RBJ cookbook formula.
///
/// # Returns
///
/// (b0, b1, b2, a0, a1, a2) coefficients
pub fn highpass_coefficients(frequency: f64, q: f64, sample_rate: f64) -> (f64, f64, f64, f64, f64, f64) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// Calculates peaking EQ filter coefficients using the RBJ cookbook formula.
///
/// A peaking EQ boosts or cuts around a center frequency with a specified
/// bandwidth (`frequency / q`).
///
/// # Returns
///
/// (b0, b1, b2, a0, a1, a2) coefficients
pub fn peaking_eq_coefficients(
    frequency: f64,
    q: f64,
    gain_db: f64,
    sample_rate: f64,
) -> (f64, f64, f64, f64, f64, f64) {
    let a = 10f64.powf(gain_db / 40.0); // sqrt(10^(dB/20))
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);

    let b0 = 1.0 + alpha * a;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0 - alpha * a;
    let a0 = 1.0 + alpha / a;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha / a;

    (b0, b1, b2, a0, a1, a2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biquad_passthrough() {
        let mut biquad = Biquad::new();

        for i in 0..10 {
            let input = i as f64 * 0.1;
            let output = biquad.process(input);
            assert!((output - input).abs() < 1e-12);
        }
    }

    #[test]
    fn test_biquad_clear() {
        let mut biquad = Biquad::new();
        for _ in 0..10 {
            biquad.process(1.0);
        }

        biquad.clear();

        assert_eq!(biquad.x1, 0.0);
        assert_eq!(biquad.x2, 0.0);
        assert_eq!(biquad.y1, 0.0);
        assert_eq!(biquad.y2, 0.0);
    }

    #[test]
    fn test_biquad_lowpass_dc_pass() {
        let mut biquad = Biquad::from_coefficients(lowpass_coefficients(1000.0, 0.707, 48000.0));

        let mut output = 0.0;
        for _ in 0..1000 {
            output = biquad.process(1.0);
        }

        assert!((output - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut biquad = Biquad::from_coefficients(highpass_coefficients(100.0, 0.707, 48000.0));

        let mut output = 1.0;
        for _ in 0..48000 {
            output = biquad.process(1.0);
        }

        assert!(output.abs() < 1e-3, "DC leaked through high-pass: {output}");
    }

    #[test]
    fn test_peaking_eq_gain_at_center() {
        let biquad = Biquad::from_coefficients(peaking_eq_coefficients(3000.0, 1.0, 10.0, 48000.0));
        let gain_db = 20.0 * biquad.response(3000.0, 48000.0).norm().log10();
        assert!((gain_db - 10.0).abs() < 0.01, "gain at center was {gain_db}");
    }

    #[test]
    fn test_peaking_eq_unity_at_zero_gain() {
        let biquad = Biquad::from_coefficients(peaking_eq_coefficients(1000.0, 1.0, 0.0, 48000.0));
        for freq in [20.0, 1000.0, 15000.0] {
            assert!((biquad.response(freq, 48000.0).norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cascade_magnitude_adds_in_db() {
        let section = peaking_eq_coefficients(2000.0, 2.0, 6.0, 48000.0);
        let cascade = BiquadCascade::from_coefficients([section, section]);
        assert!((cascade.magnitude_db(2000.0, 48000.0) - 12.0).abs() < 0.01);
        assert!(cascade.is_stable());
    }

    #[test]
    fn test_cascade_process_buffer_resets_state() {
        let mut cascade =
            BiquadCascade::from_coefficients([lowpass_coefficients(500.0, 0.707, 48000.0)]);
        let impulse: Vec<f64> = std::iter::once(1.0).chain(std::iter::repeat_n(0.0, 63)).collect();
        let first = cascade.process_buffer(&impulse);
        let second = cascade.process_buffer(&impulse);
        assert_eq!(first, second);
    }
}
