//! Black (1976) formula on the forward and its inversion.
//!
//! All prices are undiscounted: multiply by the discount factor for the
//! present value.
//!
//! ## Mathematical Formulas
//!
//! **Call**: C = F·N(d₁) - K·N(d₂)
//! **Put**: P = K·N(-d₂) - F·N(-d₁)
//!
//! Where:
//! - d₁ = (ln(F/K) + σ²T/2) / (σ√T)
//! - d₂ = d₁ - σ√T

use smile_core::math::solvers::{BracketRoot, BrentSolver, SolverConfig};

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;

/// Lowest volatility the inversion searches.
const MIN_VOL: f64 = 1e-10;

/// Highest volatility the inversion searches.
const MAX_VOL: f64 = 20.0;

/// Time value below which a price is treated as pure intrinsic.
const TIME_VALUE_FLOOR: f64 = 1e-15;

/// Undiscounted Black price of a European option.
///
/// Zero volatility or zero expiry yields the intrinsic value.
///
/// # Examples
/// ```
/// use smile_models::analytical::black_price;
///
/// let call = black_price(100.0, 100.0, 1.0, 0.2, true);
/// let put = black_price(100.0, 100.0, 1.0, 0.2, false);
///
/// // Put-call parity on the forward: C - P = F - K
/// assert!((call - put).abs() < 1e-12);
/// assert!((call - 7.965_567_455).abs() < 1e-8);
/// ```
pub fn black_price(forward: f64, strike: f64, expiry: f64, vol: f64, is_call: bool) -> f64 {
    let intrinsic = intrinsic(forward, strike, is_call);
    let sigma_root_t = vol * expiry.max(0.0).sqrt();
    if !(sigma_root_t > 0.0) {
        return intrinsic;
    }
    if strike <= 0.0 {
        return if is_call { forward - strike } else { 0.0 };
    }

    let d1 = (forward / strike).ln() / sigma_root_t + 0.5 * sigma_root_t;
    let d2 = d1 - sigma_root_t;
    if is_call {
        forward * norm_cdf(d1) - strike * norm_cdf(d2)
    } else {
        strike * norm_cdf(-d2) - forward * norm_cdf(-d1)
    }
}

/// Sensitivity of the undiscounted Black price to volatility.
///
/// Identical for calls and puts: F·φ(d₁)·√T.
pub fn black_vega(forward: f64, strike: f64, expiry: f64, vol: f64) -> f64 {
    let root_t = expiry.max(0.0).sqrt();
    let sigma_root_t = vol * root_t;
    if !(sigma_root_t > 0.0) || strike <= 0.0 {
        return 0.0;
    }
    let d1 = (forward / strike).ln() / sigma_root_t + 0.5 * sigma_root_t;
    forward * norm_pdf(d1) * root_t
}

/// Black implied volatility of an undiscounted price.
///
/// The price is first mapped to the out-of-the-money side through
/// put-call parity, then the volatility is bracketed and solved with
/// Brent's method.
///
/// # Errors
///
/// - `AnalyticalError::InvalidInput` for non-positive forward, strike or expiry
/// - `AnalyticalError::PriceOutOfBounds` when the price is below intrinsic or
///   at or above the infinite-volatility limit
/// - `AnalyticalError::NumericalInstability` if the root search fails
///
/// A price equal to intrinsic returns `0.0`.
///
/// # Examples
/// ```
/// use smile_models::analytical::{black_implied_vol, black_price};
///
/// let price = black_price(0.05, 0.06, 2.0, 0.3, true);
/// let vol = black_implied_vol(0.05, 0.06, 2.0, price, true).unwrap();
/// assert!((vol - 0.3).abs() < 1e-10);
/// ```
pub fn black_implied_vol(
    forward: f64,
    strike: f64,
    expiry: f64,
    price: f64,
    is_call: bool,
) -> Result<f64, AnalyticalError> {
    for (name, value) in [("forward", forward), ("strike", strike), ("expiry", expiry)] {
        if !(value > 0.0) || !value.is_finite() {
            return Err(AnalyticalError::InvalidInput { name, value });
        }
    }

    let lower = intrinsic(forward, strike, is_call);
    let upper = if is_call { forward } else { strike };
    if !price.is_finite() || price < lower || price >= upper {
        return Err(AnalyticalError::PriceOutOfBounds {
            price,
            lower,
            upper,
        });
    }

    // Out-of-the-money side: calls above the forward, puts below it
    let otm_is_call = strike >= forward;
    let otm_price = if otm_is_call == is_call {
        price
    } else if is_call {
        price - (forward - strike)
    } else {
        price + (forward - strike)
    };
    if otm_price <= TIME_VALUE_FLOOR * forward.max(strike) {
        return Ok(0.0);
    }

    let objective = |vol: f64| black_price(forward, strike, expiry, vol, otm_is_call) - otm_price;
    let guess = initial_guess(forward, expiry, otm_price);
    let (lo, hi) = BracketRoot::with_defaults().bracket_within(
        objective,
        0.5 * guess,
        2.0 * guess,
        MIN_VOL,
        MAX_VOL,
    )?;
    let solver = BrentSolver::new(SolverConfig::new(1e-14, 200));
    Ok(solver.find_root(objective, lo, hi)?)
}

#[inline]
fn intrinsic(forward: f64, strike: f64, is_call: bool) -> f64 {
    if is_call {
        (forward - strike).max(0.0)
    } else {
        (strike - forward).max(0.0)
    }
}

/// Brenner-Subrahmanyam ATM approximation, clamped to the search domain.
fn initial_guess(forward: f64, expiry: f64, otm_price: f64) -> f64 {
    let guess = (2.0 * std::f64::consts::PI / expiry).sqrt() * otm_price / forward;
    guess.clamp(1e-4, 0.5 * MAX_VOL)
}
