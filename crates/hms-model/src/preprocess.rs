//! Fade-in and block padding.

use std::f64::consts::PI;

use crate::segment::BlockGrid;

/// Fade-in length in samples at the internal rate (5 ms).
pub const FADE_IN_LEN: usize = 240;

/// Apply a raised-cosine fade-in to the first [`FADE_IN_LEN`] samples.
pub fn fade_in(signal: &mut [f64]) {
    for (n, sample) in signal.iter_mut().take(FADE_IN_LEN).enumerate() {
        *sample *= 0.5 - 0.5 * (PI * n as f64 / FADE_IN_LEN as f64).cos();
    }
}

/// Fade in `signal` and zero-pad it onto `grid`.
///
/// The result has `grid.lead_in()` leading zeros, the faded signal, then
/// trailing zeros up to `grid.padded_len()`.
pub fn preprocess(signal: &[f64], grid: &BlockGrid) -> Vec<f64> {
    let lead = grid.lead_in();
    let total = grid.padded_len().max(lead + signal.len());

    let mut padded = vec![0.0; total];
    padded[lead..lead + signal.len()].copy_from_slice(signal);
    fade_in(&mut padded[lead..lead + signal.len()]);
    padded
}
