//! # smile_optimiser
//!
//! Volatility smile calibration.
//!
//! This crate sits on top of the solvers in `smile_core` (L1) and the
//! volatility functions in `smile_models` (L2). It solves the inverse
//! problem: given quoted implied volatilities for one expiry, find model
//! parameters that reproduce them.
//!
//! ## Architecture Position
//!
//! Layer 2.5. Depends on `smile_core` (L1) and `smile_models` (L2).
//!
//! ## Modules
//!
//! - `fitting`: generic constrained fitter, SABR / SVI / mixed log-normal /
//!   Heston models, ATM recovery, piecewise SABR
//! - `batch`: independent calibrations over many quote sets
//! - `config`: calibration settings loaded from TOML
//!
//! ## Example
//!
//! ```rust
//! use smile_core::math::transforms::FixedMask;
//! use smile_optimiser::prelude::*;
//!
//! let strikes = vec![0.03, 0.04, 0.05, 0.06, 0.07];
//! let vols = vec![0.35, 0.31, 0.29, 0.285, 0.29];
//! let quotes = SmileQuotes::with_uniform_error(0.05, 2.0, strikes, vols, 1e-4).unwrap();
//!
//! let result = SmileModelFitter::new(&SabrModel, &quotes)
//!     .solve(&[0.1, 0.5, 0.0, 0.3], &FixedMask::from_indices([SabrModel::BETA]))
//!     .unwrap();
//! assert_eq!(result.parameter("beta"), Some(0.5));
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): fit piecewise windows and batch quote sets on
//!   the rayon thread pool

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod fitting;

mod error;
mod market;

pub use error::CalibrationError;
pub use market::SmileQuotes;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{calibrate_batch, calibrate_with_settings};
    pub use crate::config::{CalibrationSettings, SmileModelKind};
    pub use crate::fitting::*;
    pub use crate::{CalibrationError, SmileQuotes};
}
