//! hms-model - Sottek Hearing Model loudness and tonality
//!
//! Computes time-dependent specific loudness and specific tonality on 53
//! half-critical bands from a calibrated sound pressure signal, plus their
//! long-term aggregates.
//!
//! ## Pipeline
//!
//! - [`resample`] - Conversion to the internal 48 kHz rate
//! - [`preprocess`] - Fade-in and zero padding onto the block grid
//! - [`ear_filter`] - Outer/middle ear transmission per sound field
//! - [`filterbank`] - 53 parallel auditory band filters ([`bands`])
//! - [`segment`] - Block grid shared by all bands, block RMS
//! - [`loudness`] - Compressive loudness mapping and power averaging
//! - [`tonality`] - Autocorrelation-based tonal/noise split
//! - [`pipeline`] - Stage sequencing and result assembly
//!
//! ## Example
//!
//! ```rust,no_run
//! use hms_model::{CalibratedSignal, FieldType, HmsConfig, HearingModel};
//!
//! // 1 kHz tone at 60 dB SPL, 2 s at 44.1 kHz.
//! let amplitude = 2e-5 * 10f64.powf(60.0 / 20.0) * std::f64::consts::SQRT_2;
//! let samples: Vec<f64> = (0..88200)
//!     .map(|i| amplitude * (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 44100.0).sin())
//!     .collect();
//!
//! let signal = CalibratedSignal::new(samples, 44100.0)?;
//! let model = HearingModel::new(HmsConfig::new(FieldType::Free))?;
//! let result = model.analyze(&signal)?;
//!
//! println!("N = {:.2} sone, T = {:.2} tu", result.loudness.average, result.tonality.average);
//! # Ok::<(), hms_model::HmsError>(())
//! ```

pub mod bands;
pub mod config;
pub mod ear_filter;
pub mod error;
pub mod filterbank;
pub mod loudness;
pub mod pipeline;
pub mod preprocess;
pub mod resample;
pub mod segment;
pub mod signal;
pub mod tonality;

pub use bands::{BandDefinition, NUM_BANDS, band_centers_hz, band_table, critical_band_rate};
pub use config::{FieldType, HmsConfig, SAMPLE_RATE};
pub use ear_filter::EarFilter;
pub use error::{HmsError, Result};
pub use loudness::LoudnessResult;
pub use pipeline::{HearingModel, HmsResult, Stage, analyze};
pub use segment::BlockGrid;
pub use signal::CalibratedSignal;
pub use tonality::{TonalCell, TonalityResult};
