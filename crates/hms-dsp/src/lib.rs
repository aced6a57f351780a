//! hms-dsp - Signal processing primitives for the hms hearing model
//!
//! This crate holds the building blocks the model crate composes into its
//! pipeline stages:
//!
//! - [`biquad`] - Second-order IIR sections and RBJ cookbook designs
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`resample`] - Windowed-sinc polyphase rational resampling
//! - [`correlation`] - FFT-based autocorrelation
//! - [`dynamics`] - Mean-square, RMS and level helpers
//!
//! Everything works in `f64`: the hearing model accumulates energies over
//! long blocks and cascades high-Q sections, where `f32` drifts visibly.
//!
//! ## Example
//!
//! ```rust
//! use hms_dsp::resample::{MAX_FACTOR, rational_approximation, resample};
//! use hms_dsp::rms;
//!
//! let signal: Vec<f64> = (0..4410)
//!     .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 44100.0).sin())
//!     .collect();
//!
//! let (p, q) = rational_approximation(48000.0 / 44100.0, MAX_FACTOR).unwrap();
//! let converted = resample(&signal, p, q, 0);
//! assert_eq!(converted.len(), 4800);
//! assert!((rms(&converted[200..4600]) - 0.7071).abs() < 0.01);
//! ```

pub mod biquad;
pub mod correlation;
pub mod dynamics;
pub mod fft;
pub mod resample;

pub use biquad::{
    Biquad, BiquadCascade, highpass_coefficients, lowpass_coefficients, peaking_eq_coefficients,
};
pub use correlation::Autocorrelator;
pub use dynamics::{level_db, mean_square, rms};
pub use fft::{Fft, Window};
pub use resample::{design_lowpass, rational_approximation, resample};
