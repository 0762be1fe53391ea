//! Calibration error types.
//!
//! Every lower-layer failure is folded into [`CalibrationError`] so callers
//! only have to reason about four outcomes:
//!
//! | Variant | Meaning | Policy |
//! |---------|---------|--------|
//! | `Configuration` | malformed inputs, infeasible initial guess, dimension mismatch | fatal, surfaced before solving |
//! | `ConvergenceFailure` | solver stopped without converging | only raised by [`SmileFitResult::require_converged`](crate::fitting::SmileFitResult::require_converged) |
//! | `UnreachableTarget` | nested ATM root has no bracket | fatal |
//! | `NumericalFailure` | non-finite model output, singular system, pricing failure | fatal |

use smile_core::types::{InterpolationError, SolverError, TransformError};
use smile_models::analytical::AnalyticalError;
use smile_models::fourier::FourierError;
use smile_models::smile::SmileError;
use thiserror::Error;

/// Calibration error type.
///
/// # Examples
///
/// ```
/// use smile_optimiser::CalibrationError;
/// use smile_core::types::SolverError;
///
/// let err: CalibrationError = SolverError::InvalidInput("empty".to_string()).into();
/// assert!(err.is_configuration());
/// assert!(!err.is_recoverable());
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Malformed inputs, infeasible initial guess or dimension mismatch.
    #[error("Invalid calibration setup: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// The solver stopped without converging.
    #[error("Calibration did not converge (iterations: {iterations}, chi-square: {chi_square:.6e})")]
    ConvergenceFailure {
        /// Number of iterations performed
        iterations: usize,
        /// Chi-square at the last accepted point
        chi_square: f64,
    },

    /// A nested root solve could not bracket its target.
    #[error("Cannot reach target {target} by varying {parameter}: {reason}")]
    UnreachableTarget {
        /// Name of the parameter being solved for
        parameter: String,
        /// Target value
        target: f64,
        /// Why the search failed
        reason: String,
    },

    /// Non-finite values, singular systems or pricing failures.
    #[error("Numerical failure: {message}")]
    NumericalFailure {
        /// Description of the numerical issue
        message: String,
    },
}

impl CalibrationError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        CalibrationError::Configuration {
            message: message.into(),
        }
    }

    /// Create a convergence failure error.
    pub fn convergence_failure(iterations: usize, chi_square: f64) -> Self {
        CalibrationError::ConvergenceFailure {
            iterations,
            chi_square,
        }
    }

    /// Create an unreachable target error.
    pub fn unreachable_target(
        parameter: impl Into<String>,
        target: f64,
        reason: impl Into<String>,
    ) -> Self {
        CalibrationError::UnreachableTarget {
            parameter: parameter.into(),
            target,
            reason: reason.into(),
        }
    }

    /// Create a numerical failure error.
    pub fn numerical_failure(message: impl Into<String>) -> Self {
        CalibrationError::NumericalFailure {
            message: message.into(),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CalibrationError::Configuration { .. })
    }

    /// Check if this is an unreachable target error.
    pub fn is_unreachable_target(&self) -> bool {
        matches!(self, CalibrationError::UnreachableTarget { .. })
    }

    /// Check if this is a recoverable error.
    ///
    /// Only a convergence failure might succeed with a different starting
    /// point or more iterations.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalibrationError::ConvergenceFailure { .. })
    }
}

impl From<SolverError> for CalibrationError {
    fn from(err: SolverError) -> Self {
        if err.is_input_error() {
            CalibrationError::configuration(err.to_string())
        } else {
            CalibrationError::numerical_failure(err.to_string())
        }
    }
}

impl From<TransformError> for CalibrationError {
    fn from(err: TransformError) -> Self {
        CalibrationError::configuration(err.to_string())
    }
}

impl From<InterpolationError> for CalibrationError {
    fn from(err: InterpolationError) -> Self {
        CalibrationError::configuration(err.to_string())
    }
}

impl From<SmileError> for CalibrationError {
    fn from(err: SmileError) -> Self {
        match err {
            SmileError::ParameterCount { .. } | SmileError::InvalidMarket { .. } => {
                CalibrationError::configuration(err.to_string())
            }
            SmileError::NegativeVariance { .. } | SmileError::Pricing(_) => {
                CalibrationError::numerical_failure(err.to_string())
            }
        }
    }
}

impl From<AnalyticalError> for CalibrationError {
    fn from(err: AnalyticalError) -> Self {
        CalibrationError::numerical_failure(err.to_string())
    }
}

impl From<FourierError> for CalibrationError {
    fn from(err: FourierError) -> Self {
        match err {
            FourierError::InvalidInput { .. } => CalibrationError::configuration(err.to_string()),
            _ => CalibrationError::numerical_failure(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for CalibrationError {
    fn from(err: toml::de::Error) -> Self {
        CalibrationError::configuration(format!("Failed to parse TOML: {}", err))
    }
}
