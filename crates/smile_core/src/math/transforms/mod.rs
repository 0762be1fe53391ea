//! Parameter transforms between model space and fit space.
//!
//! Smile models carry bounded parameters (volatilities must be positive,
//! correlations lie in `(-1, 1)`). The least-squares solver works on an
//! unconstrained vector instead. This module provides:
//!
//! - [`ParameterConstraint`]: per-parameter bound with its bijection onto ℝ
//! - [`FixedMask`]: immutable set of parameters pinned at their initial value
//! - [`ParameterTransform`]: the composed map for a whole parameter vector
//!
//! Any real fit vector maps to a feasible model vector, so the solver never
//! needs to clip.

mod constraint;
mod fixed_mask;
mod transform;

pub use constraint::ParameterConstraint;
pub use fixed_mask::FixedMask;
pub use transform::ParameterTransform;
