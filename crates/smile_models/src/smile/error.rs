//! Error types for smile formulas.

use thiserror::Error;

use crate::analytical::AnalyticalError;

/// Smile formula errors.
///
/// # Variants
/// - `ParameterCount`: Parameter vector has the wrong length for the model
/// - `InvalidMarket`: Non-positive forward, strike or expiry
/// - `NegativeVariance`: SVI total variance below zero at a strike
/// - `Pricing`: A price could not be converted back to implied volatility
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SmileError {
    /// Wrong number of model parameters.
    #[error("{model} expects {expected} parameters, got {got}")]
    ParameterCount {
        /// Model name
        model: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Invalid forward, strike or expiry.
    #[error("Invalid {name}: {value}")]
    InvalidMarket {
        /// Name of the offending input
        name: &'static str,
        /// The offending value
        value: f64,
    },

    /// Total implied variance is negative.
    #[error("Negative total variance {variance} at strike {strike}")]
    NegativeVariance {
        /// Strike at which the variance was evaluated
        strike: f64,
        /// The negative variance
        variance: f64,
    },

    /// Implied volatility inversion failed.
    #[error("Pricing error: {0}")]
    Pricing(#[from] AnalyticalError),
}

/// Reject non-positive or non-finite market inputs.
pub(crate) fn check_market(forward: f64, strikes: &[f64], expiry: f64) -> Result<(), SmileError> {
    if !(forward > 0.0) || !forward.is_finite() {
        return Err(SmileError::InvalidMarket {
            name: "forward",
            value: forward,
        });
    }
    if !(expiry > 0.0) || !expiry.is_finite() {
        return Err(SmileError::InvalidMarket {
            name: "expiry",
            value: expiry,
        });
    }
    if let Some(&k) = strikes.iter().find(|k| !(**k > 0.0) || !k.is_finite()) {
        return Err(SmileError::InvalidMarket {
            name: "strike",
            value: k,
        });
    }
    Ok(())
}

pub(crate) fn check_len(model: &'static str, params: &[f64], expected: usize) -> Result<(), SmileError> {
    if params.len() != expected {
        return Err(SmileError::ParameterCount {
            model,
            expected,
            got: params.len(),
        });
    }
    Ok(())
}
