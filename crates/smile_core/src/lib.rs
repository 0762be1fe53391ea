//! # smile_core: Numerical Foundation for Smile Calibration
//!
//! ## Layer 1 (Foundation) Role
//!
//! smile_core is the bottom layer of the calibration workspace, providing:
//! - Weighted Levenberg-Marquardt least squares (`math::solvers`)
//! - Brent root finding and outward bracket search (`math::solvers`)
//! - Constrained ↔ unconstrained parameter transforms (`math::transforms`)
//! - Linear interpolation with flat extrapolation (`math::interpolators`)
//! - Error types: `SolverError`, `TransformError`, `InterpolationError` (`types::error`)
//!
//! ## Dependencies
//!
//! Layer 1 has no dependencies on other smile_* crates:
//! - num-traits: Generic floating-point root finding and interpolation
//! - nalgebra: SVD pseudo-inverse for the normal equations
//! - thiserror: Error enums
//! - tracing: Per-iteration solver diagnostics
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use smile_core::math::transforms::{FixedMask, ParameterConstraint, ParameterTransform};
//!
//! let constraints = [ParameterConstraint::positive(), ParameterConstraint::range(-1.0, 1.0)];
//! let transform =
//!     ParameterTransform::new(&[0.2, -0.5], &constraints, &FixedMask::none()).unwrap();
//!
//! // Any fit-space vector maps back to a feasible model vector
//! let model = transform.to_model_space(&[-40.0, 40.0]).unwrap();
//! assert!(model[0] > 0.0);
//! assert!(model[1] < 1.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for configuration, constraints and errors

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod types;
