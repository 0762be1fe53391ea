//! # smile_models (L2: Model Formulas)
//!
//! Closed-form and Fourier pricing collaborators for smile calibration.
//!
//! This crate provides:
//! - Black formula on the forward, vega and implied-volatility inversion
//!   (`analytical`)
//! - Parametric smile formulas: SABR (Hagan), SVI, mixed log-normal, plus
//!   Heston parameters (`smile`)
//! - Heston characteristic exponent and the Carr-Madan FFT pricer (`fourier`)
//!
//! ## Design Principles
//!
//! - **Pure functions**: every formula is reentrant and allocation-light, so
//!   calibrations may run in parallel without synchronisation
//! - **Value-object model data** built from a model-space parameter vector
//!   via `TryFrom<&[f64]>`
//! - **Jacobian columns** are `[forward, strike, expiry, model params...]`
//!
//! ## Example
//!
//! ```
//! use smile_models::analytical::black_implied_vol;
//! use smile_models::fourier::{FftPricer, HestonCharacteristicExponent};
//! use smile_models::smile::HestonData;
//!
//! let heston = HestonCharacteristicExponent::new(HestonData::new(1.5, 0.04, 0.04, 0.3, -0.7));
//! let grid = FftPricer::default()
//!     .price(1.0, 1.0, 1.0, true, &heston, 0.8, 1.2, 10, 0.75, 1e-10)
//!     .unwrap();
//!
//! let (strike, price) = grid[grid.len() / 2];
//! let vol = black_implied_vol(1.0, strike, 1.0, price, true).unwrap();
//! assert!(vol > 0.1 && vol < 0.3);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod fourier;
pub mod smile;
