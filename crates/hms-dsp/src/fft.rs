//! FFT wrapper with windowing functions

use rustfft::{FftPlanner, num_complex::Complex64};
use std::f64::consts::PI;
use std::sync::Arc;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Hann window (raised cosine)
    Hann,
}

impl Window {
    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f64]) {
        let n = buffer.len();
        match self {
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos());
                    *sample *= w;
                }
            }
        }
    }

    /// Get window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }

    /// Sum of the window coefficients.
    ///
    /// A sinusoid of amplitude `A` windowed by `w` produces a spectral peak of
    /// `A * coherent_sum / 2` on its bin.
    pub fn coherent_sum(&self, size: usize) -> f64 {
        match self {
            Window::Hann => size as f64 / 2.0,
        }
    }
}

/// FFT processor with cached forward and inverse plans
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl std::fmt::Debug for Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Perform forward FFT on real input
    ///
    /// Input is zero-padded or truncated to the FFT size. Returns the
    /// `size/2 + 1` bins from DC to Nyquist.
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.truncate(self.size / 2 + 1);
        buffer
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex64]) {
        self.fft.process(buffer);
    }

    /// Perform normalized inverse FFT on complex input (in-place)
    pub fn inverse_complex(&self, buffer: &mut [Complex64]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }

    /// Frequency in Hz of bin `k` at the given sample rate.
    pub fn bin_frequency(&self, k: usize, sample_rate: f64) -> f64 {
        k as f64 * sample_rate / self.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(256);

        let input: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / 256.0).sin())
            .collect();

        let mut buffer: Vec<Complex64> = input.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        fft.forward_complex(&mut buffer);
        fft.inverse_complex(&mut buffer);

        for (a, b) in input.iter().zip(buffer.iter()) {
            assert!((a - b.re).abs() < 1e-9, "Mismatch: {} vs {}", a, b.re);
        }
    }

    #[test]
    fn test_window_hann() {
        let mut buffer = vec![1.0; 100];
        Window::Hann.apply(&mut buffer);

        assert!(buffer[0] < 0.01);
        assert!((buffer[50] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_coherent_sum_matches_coefficients() {
        let sum: f64 = Window::Hann.coefficients(512).iter().sum();
        assert!((sum - Window::Hann.coherent_sum(512)).abs() < 1e-9);
    }

    #[test]
    fn test_windowed_peak_amplitude() {
        let n = 1024;
        let amplitude = 0.3;
        let bin = 40;
        let mut signal: Vec<f64> = (0..n)
            .map(|i| amplitude * (2.0 * PI * bin as f64 * i as f64 / n as f64).cos())
            .collect();
        Window::Hann.apply(&mut signal);

        let spectrum = Fft::new(n).forward(&signal);
        let estimate = 2.0 * spectrum[bin].norm() / Window::Hann.coherent_sum(n);
        assert!((estimate - amplitude).abs() < 1e-9, "estimate {estimate}");
    }

    #[test]
    fn test_bin_frequency() {
        let fft = Fft::new(4096);
        assert_eq!(fft.bin_frequency(0, 48000.0), 0.0);
        assert!((fft.bin_frequency(1, 48000.0) - 11.71875).abs() < 1e-12);
    }
}
