//! Error types for closed-form pricing and implied-volatility inversion.

use smile_core::types::SolverError;
use thiserror::Error;

/// Analytical pricing errors.
///
/// # Variants
/// - `InvalidVolatility`: Negative or non-finite volatility
/// - `InvalidInput`: Non-positive forward, strike or expiry
/// - `PriceOutOfBounds`: Price below intrinsic value or above the no-arbitrage cap
/// - `NumericalInstability`: Root finder failed inside the inversion
///
/// # Examples
/// ```
/// use smile_models::analytical::AnalyticalError;
///
/// let err = AnalyticalError::InvalidVolatility { volatility: -0.2 };
/// assert!(format!("{}", err).contains("volatility"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticalError {
    /// Invalid volatility (negative or non-finite).
    #[error("Invalid volatility: σ = {volatility}")]
    InvalidVolatility {
        /// The invalid volatility value
        volatility: f64,
    },

    /// Invalid market input.
    #[error("Invalid {name}: {value}")]
    InvalidInput {
        /// Name of the offending argument
        name: &'static str,
        /// The offending value
        value: f64,
    },

    /// Price outside the range reachable by any volatility.
    #[error("Price {price} outside attainable range [{lower}, {upper}]")]
    PriceOutOfBounds {
        /// The undiscounted option price
        price: f64,
        /// Intrinsic value (zero volatility)
        lower: f64,
        /// Infinite-volatility limit
        upper: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {message}")]
    NumericalInstability {
        /// Description of the numerical issue
        message: String,
    },
}

impl From<SolverError> for AnalyticalError {
    fn from(err: SolverError) -> Self {
        AnalyticalError::NumericalInstability {
            message: err.to_string(),
        }
    }
}
