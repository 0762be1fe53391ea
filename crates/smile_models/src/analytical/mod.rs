//! Closed-form option formulas on the forward.
//!
//! - Black (1976) price, vega and implied-volatility inversion
//! - Standard normal CDF and PDF
//!
//! These are the pricing collaborators of the smile fitters: mixed
//! log-normal prices and Fourier prices are converted back to implied
//! volatility through [`black_implied_vol`].

pub mod black;
pub mod distributions;
pub mod error;

pub use black::{black_implied_vol, black_price, black_vega};
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
