//! Core error types.
//!
//! This module provides:
//! - `error`: Structured error types for interpolation, solver and transform operations
//!
//! # Re-exports
//!
//! [`InterpolationError`], [`SolverError`] and [`TransformError`] are
//! re-exported at this module level.

pub mod error;

pub use error::{InterpolationError, SolverError, TransformError};
