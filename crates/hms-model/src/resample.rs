//! Conversion of input signals to the internal 48 kHz rate.

use hms_dsp::resample::{MAX_FACTOR, rational_approximation, resample};
use tracing::{debug, warn};

use crate::config::SAMPLE_RATE;
use crate::error::{HmsError, Result};

/// Resample `samples` recorded at `source_rate` Hz to [`SAMPLE_RATE`].
///
/// Signals already at the internal rate are returned unchanged. Other rates
/// go through the polyphase resampler with the rate ratio reduced to P/Q;
/// when the exact ratio needs factors above the polyphase limit the closest
/// fitting ratio is used and a warning is logged. Rates that no fitting
/// ratio reaches closely enough, in practice those below about 47 Hz, fail
/// with [`HmsError::InvalidInput`].
pub fn to_internal_rate(samples: &[f64], source_rate: f64) -> Result<Vec<f64>> {
    if samples.is_empty() {
        return Err(HmsError::InvalidInput("signal is empty".to_string()));
    }
    if !source_rate.is_finite() || source_rate <= 0.0 {
        return Err(HmsError::InvalidInput(format!(
            "sample rate must be positive, got {source_rate}"
        )));
    }

    if source_rate == SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    let ratio = SAMPLE_RATE / source_rate;
    let (p, q) = rational_approximation(ratio, MAX_FACTOR).ok_or_else(|| {
        HmsError::InvalidInput(format!(
            "cannot convert {source_rate} Hz to {SAMPLE_RATE} Hz with factors up to {MAX_FACTOR}"
        ))
    })?;
    let effective_rate = source_rate * p as f64 / q as f64;
    if (effective_rate - SAMPLE_RATE).abs() > 1e-6 {
        warn!(
            source_rate,
            effective_rate,
            up = p,
            down = q,
            "sample rate ratio approximated"
        );
    }
    debug!(source_rate, up = p, down = q, "resampling to internal rate");

    Ok(resample(samples, p, q, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn internal_rate_passes_through() {
        let x: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.01).sin()).collect();
        assert_eq!(to_internal_rate(&x, 48000.0).unwrap(), x);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(to_internal_rate(&[], 44100.0), Err(HmsError::InvalidInput(_))));
        assert!(matches!(to_internal_rate(&[0.0], 0.0), Err(HmsError::InvalidInput(_))));
        assert!(matches!(to_internal_rate(&[0.0], -1.0), Err(HmsError::InvalidInput(_))));
    }

    #[test]
    fn cd_rate_length_and_level() {
        let x: Vec<f64> = (0..44100)
            .map(|i| (2.0 * PI * 500.0 * i as f64 / 44100.0).sin())
            .collect();
        let y = to_internal_rate(&x, 44100.0).unwrap();
        assert_eq!(y.len(), 48000);
        let ms: f64 = y[4800..43200].iter().map(|v| v * v).sum::<f64>() / 38400.0;
        assert!((ms - 0.5).abs() < 0.01, "mean square {ms}");
    }

    #[test]
    fn non_integer_rate_is_accepted() {
        let x = vec![0.1; 4410];
        let y = to_internal_rate(&x, 44100.5).unwrap();
        let expected = 4410.0 * 48000.0 / 44100.5;
        assert!((y.len() as f64 - expected).abs() < 5.0, "{} vs {expected}", y.len());
    }

    #[test]
    fn unreachable_rate_is_rejected() {
        // 10 Hz would need an upsampling factor of 4800.
        let err = to_internal_rate(&[0.5; 100], 10.0).unwrap_err();
        assert!(matches!(err, HmsError::InvalidInput(ref msg) if msg.contains("10 Hz")), "{err}");
        assert!(matches!(to_internal_rate(&[0.5; 100], 46.0), Err(HmsError::InvalidInput(_))));
    }

    #[test]
    fn low_rate_keeps_duration() {
        let y = to_internal_rate(&[0.5; 100], 100.0).unwrap();
        assert_eq!(y.len(), 48000);
        let y = to_internal_rate(&[0.5; 100], 47.0).unwrap();
        assert!((y.len() as f64 / (100.0 * 48000.0 / 47.0) - 1.0).abs() < 1e-3);
    }
}
