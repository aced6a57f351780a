//! WAV input for the hearing model.
//!
//! This crate provides:
//!
//! - **WAV metadata**: [`read_wav_info`] reads the header only
//! - **WAV samples**: [`read_wav`] and [`write_wav`] for normalized samples
//! - **Model input**: [`load_signal`] mixes a file down to a [`CalibratedSignal`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hms_io::load_signal;
//! use hms_model::{HmsConfig, analyze};
//!
//! // Full scale corresponds to 1 Pa after calibration.
//! let signal = load_signal("recording.wav", 1.0)?;
//! let result = analyze(&signal, &HmsConfig::default())?;
//! ```
//!
//! [`CalibratedSignal`]: hms_model::CalibratedSignal

mod wav;

pub use wav::{WavFormat, WavInfo, WavSpec, load_signal, read_wav, read_wav_info, write_wav};

/// Error types for signal loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The decoded samples do not form a valid model input.
    #[error("Invalid signal: {0}")]
    Signal(#[from] hms_model::HmsError),

    /// The file holds no sample frames.
    #[error("WAV file contains no samples")]
    Empty,
}

/// Convenience result type for signal loading.
pub type Result<T> = std::result::Result<T, Error>;
