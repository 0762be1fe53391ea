//! Parametric smile formulas.
//!
//! Each model has a data object built from its model-space parameter
//! vector and a [`VolatilityFunction`] that maps the data to implied
//! volatilities at a set of strikes:
//!
//! | Model | Data | Parameters |
//! |-------|------|------------|
//! | SABR (Hagan 2002) | [`SabrData`] | alpha, beta, rho, nu |
//! | SVI | [`SviData`] | a, b, rho, sigma, m |
//! | Mixed log-normal | [`MixedLogNormalData`] | sigma_0, increments, angles |
//! | Heston | [`HestonData`] | kappa, theta, vol0, omega, rho |
//!
//! Heston has no closed-form smile; it is priced through
//! [`crate::fourier`].

mod error;
pub mod heston;
pub mod mixed_lognormal;
pub mod sabr;
pub mod svi;

pub use error::SmileError;
pub use heston::HestonData;
pub use mixed_lognormal::{MixedLogNormalData, MixedLogNormalVolatility};
pub use sabr::{SabrData, SabrHaganVolatility};
pub use svi::{SviData, SviVolatility};

pub(crate) use error::{check_len, check_market};

/// Number of leading market columns in a volatility Jacobian:
/// forward, strike, expiry.
pub const MARKET_COLUMNS: usize = 3;

/// Implied volatility formula for one smile model.
pub trait VolatilityFunction {
    /// Model data the formula is evaluated on.
    type Data;

    /// Implied volatility at a single strike.
    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        data: &Self::Data,
    ) -> Result<f64, SmileError>;

    /// Implied volatilities at every strike.
    fn volatilities(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        data: &Self::Data,
    ) -> Result<Vec<f64>, SmileError> {
        check_market(forward, strikes, expiry)?;
        strikes
            .iter()
            .map(|&k| self.volatility(forward, k, expiry, data))
            .collect()
    }

    /// Sensitivities of each volatility, one row per strike.
    ///
    /// Columns are `[forward, strike, expiry, model parameters...]`.
    /// `None` when the formula offers no Jacobian.
    fn volatility_jacobian(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        data: &Self::Data,
    ) -> Option<Result<Vec<Vec<f64>>, SmileError>> {
        let _ = (forward, strikes, expiry, data);
        None
    }
}
