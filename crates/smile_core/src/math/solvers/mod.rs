//! Root-finding and least-squares solvers.
//!
//! ## Available Solvers
//!
//! ### Root-Finding
//!
//! - [`BracketRoot`]: Expands an initial interval until the objective changes sign
//! - [`BrentSolver`]: Robust bracketing method without derivative requirement
//!
//! ### Optimization
//!
//! - [`LevenbergMarquardtSolver`]: Weighted nonlinear least-squares for model calibration,
//!   driven through the [`ModelFunction`] trait
//!
//! ## Configuration
//!
//! Root finders use [`SolverConfig`] (`tolerance`, `max_iterations`) and
//! [`BracketConfig`] (`expansion_factor`, `max_steps`). The LM solver uses
//! [`LMConfig`] with additional damping and finite-difference settings.
//!
//! ## Examples
//!
//! ### Root-Finding
//!
//! ```
//! use smile_core::math::solvers::{BracketRoot, BrentSolver, SolverConfig};
//!
//! // Solve x² - 2 = 0 starting from a bracket that misses the root
//! let f = |x: f64| x * x - 2.0;
//! let (lo, hi) = BracketRoot::with_defaults().bracket(f, 0.2, 0.4).unwrap();
//! let root = BrentSolver::new(SolverConfig::default()).find_root(f, lo, hi).unwrap();
//! assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```
//!
//! ### Weighted Nonlinear Least-Squares
//!
//! ```
//! use smile_core::math::solvers::{LevenbergMarquardtSolver, ModelFunction};
//! use smile_core::types::SolverError;
//!
//! struct Line;
//!
//! impl ModelFunction for Line {
//!     type Error = SolverError;
//!     fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
//!         Ok([0.0, 1.0, 2.0].iter().map(|x| p[0] + p[1] * x).collect())
//!     }
//! }
//!
//! let observed = [1.0, 3.0, 5.0];
//! let errors = [0.1, 0.1, 0.1];
//! let result = LevenbergMarquardtSolver::with_defaults()
//!     .solve_weighted(&Line, &observed, &errors, vec![0.0, 0.0])
//!     .unwrap();
//!
//! assert!(result.converged);
//! assert!((result.params[1] - 2.0).abs() < 1e-8);
//! ```

mod bracket;
mod brent;
mod config;
mod levenberg_marquardt;

pub use bracket::BracketRoot;
pub use brent::BrentSolver;
pub use config::{BracketConfig, SolverConfig};
pub use levenberg_marquardt::{
    FiniteDifference, LMConfig, LMResult, LevenbergMarquardtSolver, ModelFunction,
};
