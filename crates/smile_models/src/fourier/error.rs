//! Error types for Fourier option pricing.

use thiserror::Error;

/// Fourier pricer errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FourierError {
    /// Invalid scalar input.
    #[error("Invalid {name}: {value}")]
    InvalidInput {
        /// Name of the offending argument
        name: &'static str,
        /// The offending value
        value: f64,
    },

    /// The damped characteristic function is not finite for this alpha.
    #[error("Damping factor alpha = {alpha} outside the strip of analyticity")]
    InvalidDamping {
        /// Requested damping factor
        alpha: f64,
    },

    /// Required FFT size exceeds the configured ceiling.
    #[error("FFT grid of {required} points exceeds the limit of {limit}")]
    GridTooLarge {
        /// Points needed to meet the tolerance
        required: usize,
        /// Largest permitted grid
        limit: usize,
    },

    /// Characteristic function did not decay below the tolerance.
    #[error("Characteristic function still above tolerance at frequency {frequency}")]
    NoDecay {
        /// Largest frequency probed
        frequency: f64,
    },
}
