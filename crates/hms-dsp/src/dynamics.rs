//! Level measurement helpers
//!
//! Mean square, RMS and decibel levels relative to an arbitrary reference.

/// Mean of the squared samples.
///
/// Returns 0.0 for an empty slice.
pub fn mean_square(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = signal.iter().map(|&x| x * x).sum();
    sum_sq / signal.len() as f64
}

/// Compute RMS (Root Mean Square) level of a signal
///
/// Returns RMS value in linear scale (not dB)
pub fn rms(signal: &[f64]) -> f64 {
    mean_square(signal).sqrt()
}

/// RMS level in dB relative to `reference`.
///
/// Silence maps to -200 dB.
pub fn level_db(signal: &[f64], reference: f64) -> f64 {
    let rms_val = rms(signal);
    if rms_val > 1e-15 * reference {
        20.0 * (rms_val / reference).log10()
    } else {
        -200.0
    }
}
