//! Error types for hearing model runs.

use thiserror::Error;

/// Errors that abort a hearing model run.
///
/// Every variant is raised at a stage boundary; a run that fails never
/// returns partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmsError {
    /// Malformed input signal: empty, non-finite samples, bad rate or calibration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unrecognised field type or out-of-range configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signal too short to leave a block after the time skip.
    #[error("insufficient data: {blocks} block(s) available, more than {required} required")]
    InsufficientData {
        /// Number of blocks the padded signal produced.
        blocks: usize,
        /// Number of leading blocks excluded by the time skip.
        required: usize,
    },
}

/// Convenience result type for hearing model operations.
pub type Result<T> = std::result::Result<T, HmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_display() {
        let err = HmsError::InvalidInput("signal is empty".to_string());
        assert_eq!(err.to_string(), "invalid input: signal is empty");
    }

    #[test]
    fn invalid_config_display() {
        let err = HmsError::InvalidConfig("unknown field type 'reverberant'".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: unknown field type 'reverberant'"
        );
    }

    #[test]
    fn insufficient_data_display() {
        let err = HmsError::InsufficientData {
            blocks: 3,
            required: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 block(s)"), "got: {msg}");
        assert!(msg.contains("8"), "got: {msg}");
    }
}
