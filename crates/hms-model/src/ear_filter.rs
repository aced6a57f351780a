//! Outer and middle ear transmission filter.
//!
//! Each sound field is modelled by a short cascade of RBJ biquads at the
//! internal rate:
//!
//! - middle-ear high-pass below ~30 Hz
//! - ear-canal resonance around 3 kHz
//! - a notch-like dip from head and pinna diffraction
//! - high-frequency roll-off above ~15 kHz
//!
//! The diffuse-field variant has a broader, lower resonance because sound
//! arrives from all directions.
//!
//! These sections are a parametric approximation of the standardised
//! outer/middle ear transfer functions, not their published coefficient
//! sets. Absolute loudness and tonality values therefore deviate from
//! reference implementations by up to a few dB in the affected regions;
//! the filter shape and field dependence are preserved.

use hms_dsp::{
    BiquadCascade, highpass_coefficients, lowpass_coefficients, peaking_eq_coefficients,
};

use crate::config::{FieldType, SAMPLE_RATE};

/// One section of the ear filter design table.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    HighPass { freq: f64, q: f64 },
    Peak { freq: f64, q: f64, gain_db: f64 },
    LowPass { freq: f64, q: f64 },
}

const FREE_FIELD: [Section; 4] = [
    Section::HighPass { freq: 30.0, q: 0.5 },
    Section::Peak { freq: 3000.0, q: 1.2, gain_db: 10.0 },
    Section::Peak { freq: 8500.0, q: 2.0, gain_db: -5.0 },
    Section::LowPass { freq: 15000.0, q: 0.707 },
];

const DIFFUSE_FIELD: [Section; 4] = [
    Section::HighPass { freq: 30.0, q: 0.5 },
    Section::Peak { freq: 2600.0, q: 0.9, gain_db: 8.0 },
    Section::Peak { freq: 5500.0, q: 1.5, gain_db: 2.0 },
    Section::LowPass { freq: 14000.0, q: 0.707 },
];

impl Section {
    fn coefficients(self) -> (f64, f64, f64, f64, f64, f64) {
        match self {
            Section::HighPass { freq, q } => highpass_coefficients(freq, q, SAMPLE_RATE),
            Section::Peak { freq, q, gain_db } => {
                peaking_eq_coefficients(freq, q, gain_db, SAMPLE_RATE)
            }
            Section::LowPass { freq, q } => lowpass_coefficients(freq, q, SAMPLE_RATE),
        }
    }
}

/// Ear transmission filter for one sound field.
#[derive(Debug, Clone)]
pub struct EarFilter {
    field: FieldType,
    cascade: BiquadCascade,
}

impl EarFilter {
    /// Build the filter for `field`.
    pub fn new(field: FieldType) -> Self {
        let table: &[Section] = match field {
            FieldType::Free => &FREE_FIELD,
            FieldType::Diffuse => &DIFFUSE_FIELD,
        };
        Self {
            field,
            cascade: BiquadCascade::from_coefficients(table.iter().map(|s| s.coefficients())),
        }
    }

    /// Field type the filter was built for.
    pub fn field(&self) -> FieldType {
        self.field
    }

    /// Filter `signal` from a cleared state.
    ///
    /// The filter holds no state between calls.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let mut cascade = self.cascade.clone();
        cascade.process_buffer(signal)
    }

    /// Transmission gain in dB at `frequency` Hz.
    pub fn gain_db(&self, frequency: f64) -> f64 {
        self.cascade.magnitude_db(frequency, SAMPLE_RATE)
    }
}
