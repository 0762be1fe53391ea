//! Smile calibration.
//!
//! Every smile model implements [`SmileModel`]. [`SmileModelFitter`] maps
//! its constrained parameters to an unconstrained fit space and runs a
//! weighted Levenberg-Marquardt on the quoted volatilities.
//!
//! ## Models
//!
//! - [`SabrModel`]: Hagan lognormal SABR
//! - [`SviModel`]: raw SVI total variance
//! - [`MixedLogNormalModel`]: mixture of Black prices
//! - [`HestonModel`]: Heston repriced by FFT
//!
//! ## Composition
//!
//! - [`AtmRecoveringModel`]: re-solves a level parameter so the ATM
//!   volatility is matched exactly
//! - [`PiecewiseSabrFitter`]: local SABR per three neighbouring strikes

pub mod atm;
pub mod heston;
pub mod mixed_lognormal;
mod model;
pub mod piecewise;
mod result;
pub mod sabr;
mod smile_fitter;
pub mod svi;

pub use atm::AtmRecoveringModel;
pub use heston::{FftVolatilityFunction, HestonFftConfig, HestonModel};
pub use mixed_lognormal::MixedLogNormalModel;
pub use model::SmileModel;
pub use piecewise::{PiecewiseConfig, PiecewiseSabrFitter, PiecewiseSabrSmile, WindowQuality};
pub use result::SmileFitResult;
pub use sabr::SabrModel;
pub use smile_fitter::{FitSpaceFunction, SmileModelFitter};
pub use svi::{SviModel, SviVariant};
