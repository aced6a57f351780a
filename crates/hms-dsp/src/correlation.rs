//! Autocorrelation via the Wiener–Khinchin theorem.
//!
//! The autocorrelation of a real signal is the inverse transform of its power
//! spectrum:
//!
//! ```text
//! R_xx = IFFT( |FFT(x)|² )
//! ```
//!
//! The signal is zero-padded to at least twice its length so the circular
//! result carries no wrap-around.
//!
//! # References
//!
//! - Oppenheim & Schafer, "Discrete-Time Signal Processing" (3rd ed.), section 2.8.

use crate::fft::Fft;
use rustfft::num_complex::Complex64;

/// Unbiased autocorrelation with a cached FFT plan.
///
/// Use this when many equal-length frames are analysed in a row; the plan is
/// built once for frames of `frame_len` samples.
#[derive(Debug)]
pub struct Autocorrelator {
    fft: Fft,
    frame_len: usize,
}

impl Autocorrelator {
    /// Create an autocorrelator for frames of `frame_len` samples.
    pub fn new(frame_len: usize) -> Self {
        let fft_size = (2 * frame_len).next_power_of_two().max(2);
        Self {
            fft: Fft::new(fft_size),
            frame_len,
        }
    }

    /// Frame length this autocorrelator was planned for.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Unbiased autocorrelation estimate for lags `0..x.len()`.
    ///
    /// ```text
    /// φ[τ] = 1/(N - τ) · Σ_{n=0}^{N-1-τ} x[n] · x[n + τ]
    /// ```
    ///
    /// `φ[0]` is the mean square of `x`. Large lags average few products and
    /// are correspondingly noisy. `x` may be shorter than the planned frame
    /// length but not longer.
    pub fn compute(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        assert!(n <= self.frame_len, "frame of {n} samples exceeds planned {}", self.frame_len);
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        buffer.resize(self.fft.size(), Complex64::new(0.0, 0.0));

        self.fft.forward_complex(&mut buffer);
        for c in &mut buffer {
            *c = Complex64::new(c.norm_sqr(), 0.0);
        }
        self.fft.inverse_complex(&mut buffer);

        buffer
            .iter()
            .take(n)
            .enumerate()
            .map(|(lag, c)| c.re / (n - lag) as f64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn autocorrelation(x: &[f64]) -> Vec<f64> {
        Autocorrelator::new(x.len()).compute(x)
    }

    fn direct(x: &[f64], lag: usize) -> f64 {
        let n = x.len();
        (0..n - lag).map(|i| x[i] * x[i + lag]).sum::<f64>() / (n - lag) as f64
    }

    #[test]
    fn test_empty() {
        assert!(Autocorrelator::new(16).compute(&[]).is_empty());
    }

    #[test]
    fn test_matches_direct_sum() {
        let x: Vec<f64> = (0..300).map(|i| ((i * 37) % 17) as f64 - 8.0).collect();
        let acf = autocorrelation(&x);
        assert_eq!(acf.len(), x.len());
        for lag in [0, 1, 5, 50, 150, 299] {
            let expected = direct(&x, lag);
            assert!(
                (acf[lag] - expected).abs() < 1e-8 * expected.abs().max(1.0),
                "lag {lag}: {} vs {expected}",
                acf[lag]
            );
        }
    }

    #[test]
    fn test_autocorrelator_reuse_and_short_frames() {
        let ac = Autocorrelator::new(64);
        assert_eq!(ac.frame_len(), 64);
        let x: Vec<f64> = (0..64).map(|i| (i as f64 * 0.3).cos()).collect();
        assert_eq!(ac.compute(&x), ac.compute(&x));

        let short = &x[..40];
        let acf = ac.compute(short);
        assert_eq!(acf.len(), 40);
        assert!((acf[3] - direct(short, 3)).abs() < 1e-10);
    }

    #[test]
    fn test_zero_lag_is_mean_square() {
        let x = [0.5, -1.0, 2.0, 0.0];
        let acf = autocorrelation(&x);
        assert!((acf[0] - (0.25 + 1.0 + 4.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sine_is_periodic_and_undamped() {
        // 1 kHz at 48 kHz: period 48 samples. The unbiased estimate keeps
        // the cosine amplitude A²/2 at every full period.
        let x: Vec<f64> = (0..4800)
            .map(|i| (2.0 * PI * 1000.0 * i as f64 / 48000.0).sin())
            .collect();
        let acf = autocorrelation(&x);
        for lag in [48, 480, 960] {
            assert!((acf[lag] - 0.5).abs() < 0.01, "lag {lag}: {}", acf[lag]);
        }
        assert!((acf[24] + 0.5).abs() < 0.01);
    }
}
