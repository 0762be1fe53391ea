//! Error types for structured error handling.
//!
//! This module provides:
//! - `InterpolationError`: Errors from interpolation operations
//! - `SolverError`: Errors from root finders and the least-squares solver
//! - `TransformError`: Errors from model-space / fit-space parameter transforms

use thiserror::Error;

/// Interpolation-related errors.
///
/// Provides structured error handling for interpolation operations
/// with descriptive context for each failure mode.
///
/// # Variants
/// - `OutOfBounds`: Query point outside valid interpolation domain
/// - `InsufficientData`: Not enough data points for interpolation
/// - `InvalidInput`: General invalid input error
///
/// # Examples
/// ```
/// use smile_core::types::InterpolationError;
///
/// let err = InterpolationError::OutOfBounds { x: 5.0, min: 0.0, max: 3.0 };
/// assert!(format!("{}", err).contains("outside valid domain"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationError {
    /// Query point outside valid interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// The query point that was out of bounds
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Insufficient data points for interpolation.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Solver errors.
///
/// Shared by the 1-D root finders ([`BrentSolver`], [`BracketRoot`]) and the
/// [`LevenbergMarquardtSolver`].
///
/// # Variants
/// - `MaxIterationsExceeded`: Root finder failed to converge within iteration limit
/// - `NoBracket`: Function values at bracket endpoints have same sign
/// - `InvalidInput`: Malformed solver input (empty vectors, bad errors)
/// - `DimensionMismatch`: Vector lengths disagree
/// - `NumericalInstability`: Non-finite or singular system
///
/// # Examples
/// ```
/// use smile_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
///
/// [`BrentSolver`]: crate::math::solvers::BrentSolver
/// [`BracketRoot`]: crate::math::solvers::BracketRoot
/// [`LevenbergMarquardtSolver`]: crate::math::solvers::LevenbergMarquardtSolver
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Malformed input to the solver.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector lengths disagree.
    #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which quantity had the wrong length
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl SolverError {
    /// Returns `true` for errors caused by the caller's inputs rather than the numerics.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidInput(_) | SolverError::DimensionMismatch { .. }
        )
    }
}

/// Parameter transform errors.
///
/// # Examples
/// ```
/// use smile_core::types::TransformError;
///
/// let err = TransformError::Infeasible {
///     index: 0,
///     value: -1.0,
///     constraint: "x > 0".to_string(),
/// };
/// assert!(format!("{}", err).contains("index 0"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransformError {
    /// A model-space value violates its constraint.
    #[error("Parameter at index {index} = {value} violates constraint {constraint}")]
    Infeasible {
        /// Model-space index
        index: usize,
        /// Offending value
        value: f64,
        /// Human-readable constraint
        constraint: String,
    },

    /// A constraint is itself malformed (e.g. empty range).
    #[error("Invalid constraint at index {index}: {reason}")]
    InvalidConstraint {
        /// Model-space index
        index: usize,
        /// Why the constraint is unusable
        reason: String,
    },

    /// A fixed index lies outside the model vector.
    #[error("Fixed index {index} out of range for {len} parameters")]
    FixedIndexOutOfRange {
        /// The fixed index
        index: usize,
        /// Model-space length
        len: usize,
    },

    /// Vector lengths disagree.
    #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which vector had the wrong length
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },
}

impl TransformError {
    /// Returns `true` for length mismatches, as opposed to infeasible values.
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            TransformError::DimensionMismatch { .. } | TransformError::FixedIndexOutOfRange { .. }
        )
    }
}
