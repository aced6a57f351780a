//! Rational resampling: arbitrary rate conversion via polyphase FIR.
//!
//! Implements polyphase FIR resampling using windowed-sinc lowpass filters with
//! Blackman windowing. Any pair of positive rates is reduced to a rational
//! factor P/Q (e.g., 44100 → 48000 Hz via P=160, Q=147); ratios whose reduced
//! factors would exceed [`MAX_FACTOR`] are replaced by their closest
//! approximation within that limit, provided it lies within
//! [`RATIO_TOLERANCE`].
//!
//! # Theory
//!
//! Resampling by rational factor P/Q is equivalent to upsampling by P, applying
//! a lowpass filter at `min(1/P, 1/Q)` (normalized frequency), then downsampling
//! by Q. The polyphase decomposition avoids explicit zero-insertion by computing
//! only the output samples actually needed.
//!
//! The anti-aliasing lowpass uses a windowed-sinc design:
//!   `h[n] = sinc(cutoff * (n - M/2)) * w[n]`
//! where `w[n]` is a Blackman window and the result is normalized to unity DC gain.
//!
//! Reference: P. P. Vaidyanathan, *Multirate Systems and Filter Banks*, Prentice Hall,
//! 1993, Chapter 4.

use std::f64::consts::PI;

/// Largest upsampling or downsampling factor used for a single conversion.
pub const MAX_FACTOR: usize = 1024;

/// Largest relative deviation of an approximated ratio from the exact one.
pub const RATIO_TOLERANCE: f64 = 1e-3;

/// Compute windowed-sinc lowpass FIR coefficients.
///
/// Designs a Type I linear-phase FIR lowpass filter using the windowed-sinc
/// method with a Blackman window. The filter is normalized to have unity gain
/// at DC (sum of coefficients = 1.0).
///
/// # Arguments
///
/// * `num_taps` - Number of filter taps. Odd tap counts produce a symmetric
///   Type I filter.
/// * `cutoff` - Normalized cutoff frequency in the range (0.0, 1.0),
///   where 1.0 corresponds to the Nyquist frequency (fs/2).
///
/// Reference: A. V. Oppenheim and R. W. Schafer, *Discrete-Time Signal Processing*,
/// 3rd ed., Prentice Hall, 2009, Section 7.6.
pub fn design_lowpass(num_taps: usize, cutoff: f64) -> Vec<f64> {
    if num_taps == 0 {
        return Vec::new();
    }

    let m = num_taps - 1;
    let mut coeffs = Vec::with_capacity(num_taps);

    for n in 0..num_taps {
        let x = n as f64 - m as f64 / 2.0;

        let sinc = if x.abs() < 1e-12 {
            cutoff
        } else {
            (PI * cutoff * x).sin() / (PI * x)
        };

        // Blackman window: w[n] = 0.42 - 0.5*cos(2πn/M) + 0.08*cos(4πn/M)
        let window = if m == 0 {
            1.0
        } else {
            let phase = 2.0 * PI * n as f64 / m as f64;
            0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
        };

        coeffs.push(sinc * window);
    }

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-15 {
        for c in &mut coeffs {
            *c /= sum;
        }
    }

    coeffs
}

/// Compute the greatest common divisor of two integers.
fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Closest rational approximation `p / q` of `ratio` with `p, q <= max_factor`.
///
/// Exact for ratios of integer sample rates whose reduced form fits
/// (48000/44100 → 160/147); among equally close candidates the smallest `q`
/// wins.
///
/// Returns `None` when no candidate lies within [`RATIO_TOLERANCE`] of
/// `ratio`. With [`MAX_FACTOR`] that rejects conversions to 48 kHz from rates
/// below about 47 Hz.
pub fn rational_approximation(ratio: f64, max_factor: usize) -> Option<(usize, usize)> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }

    let mut best: Option<(usize, usize, f64)> = None;
    for q in 1..=max_factor {
        let p = (ratio * q as f64).round();
        if p < 1.0 || p > max_factor as f64 {
            continue;
        }
        let deviation = (p / q as f64 / ratio - 1.0).abs();
        if best.is_none_or(|(_, _, d)| deviation < d - 1e-12) {
            best = Some((p as usize, q, deviation));
        }
    }

    best.filter(|&(_, _, d)| d <= RATIO_TOLERANCE)
        .map(|(p, q, _)| (p, q))
}

/// Rational resampling by the factor P/Q.
///
/// Converts a signal by the rational ratio P/Q, where P is the upsampling
/// factor and Q the downsampling factor. The FIR group delay is compensated,
/// so output sample `m` is aligned with input time `m * Q / P`.
///
/// The output length is `ceil(input.len() * P / Q)`.
///
/// # Algorithm
///
/// 1. Simplify P and Q by their GCD.
/// 2. Design a single prototype lowpass FIR with cutoff `min(0.9/P, 0.9/Q)`.
/// 3. Decompose into P polyphase sub-filters.
/// 4. For each output sample `m`, locate the delay-compensated position
///    `j = m * Q + (taps - 1) / 2` in the P-upsampled sequence:
///    - Input frame index: `n = floor(j / P)`
///    - Sub-filter phase: `k = j mod P`
/// 5. Apply sub-filter `k` to input samples ending at `n`.
///
/// # Arguments
///
/// * `signal` - Input samples at the source sample rate
/// * `p` - Upsampling factor (must be ≥ 1)
/// * `q` - Downsampling factor (must be ≥ 1)
/// * `filter_order` - Total prototype FIR length. Pass `0` for the automatic
///   default of `4 * max(P, Q) * 10 + 1` taps.
///
/// Reference: P. P. Vaidyanathan, *Multirate Systems and Filter Banks*,
/// Prentice Hall, 1993, Section 4.3 (Polyphase Representation).
pub fn resample(signal: &[f64], p: usize, q: usize, filter_order: usize) -> Vec<f64> {
    assert!(p >= 1, "upsample factor P must be >= 1");
    assert!(q >= 1, "downsample factor Q must be >= 1");

    let g = gcd(p, q);
    let p = p / g;
    let q = q / g;

    if p == 1 && q == 1 {
        return signal.to_vec();
    }

    let num_taps = if filter_order == 0 {
        4 * p.max(q) * 10 + 1
    } else {
        filter_order
    };

    // Prototype lowpass: cutoff at min(1/P, 1/Q) with 10% guard band
    let cutoff = 0.9 / p.max(q) as f64;
    let prototype = design_lowpass(num_taps, cutoff);
    let delay = (num_taps - 1) / 2;

    let out_len = (signal.len() * p).div_ceil(q);
    let taps_per_phase = num_taps.div_ceil(p);

    // Sub-filter k holds prototype taps k, k+P, k+2P, ...
    let mut polyphase = vec![vec![0.0f64; taps_per_phase]; p];
    for (tap_idx, &coeff) in prototype.iter().enumerate() {
        polyphase[tap_idx % p][tap_idx / p] = coeff;
    }

    let mut output = Vec::with_capacity(out_len);

    for m in 0..out_len {
        let full_idx = m * q + delay;
        let n = full_idx / p;
        let k = full_idx % p;

        let mut acc = 0.0f64;
        for (i, &coeff) in polyphase[k].iter().enumerate() {
            if n >= i && (n - i) < signal.len() {
                acc += coeff * signal[n - i];
            }
        }

        // Scale by P so that passband gain is unity
        output.push(acc * p as f64);
    }

    output
}
