//! Numerical building blocks.
//!
//! - [`solvers`]: Brent root finder, bracket search, Levenberg-Marquardt
//! - [`transforms`]: constrained model space ↔ unconstrained fit space
//! - [`interpolators`]: piecewise linear interpolation

pub mod interpolators;
pub mod solvers;
pub mod transforms;
