//! SABR implied volatility using the Hagan et al. (2002) expansion.
//!
//! ```text
//! σ_B(K) = α / ((FK)^((1-β)/2) · D(ln F/K)) · z/χ(z) · (1 + T·(...))
//! z = (ν/α) · (FK)^((1-β)/2) · ln(F/K)
//! χ(z) = ln[(√(1 - 2ρz + z²) + z - ρ) / (1 - ρ)]
//! ```
//!
//! The normal (`β = 0`) and log-normal (`β = 1`) limits use their exact
//! reduced forms, and `z/χ(z)` is expanded near `z = 0` and `ρ = ±1`.

use super::{check_len, check_market, SmileError, VolatilityFunction, MARKET_COLUMNS};

/// Strikes below `forward * CUTOFF_MONEYNESS` are floored to it.
const CUTOFF_MONEYNESS: f64 = 1e-12;
/// Relative distance from the forward treated as at-the-money.
const ATM_EPS: f64 = 1e-7;
const SMALL_Z: f64 = 1e-6;
const LARGE_NEG_Z: f64 = -1e6;
const LARGE_POS_Z: f64 = 1e8;
const BETA_EPS: f64 = 1e-8;
const RHO_EPS: f64 = 1e-5;
const RHO_EPS_NEGATIVE: f64 = 1e-8;
/// Relative bump for the finite-difference Jacobian.
const BUMP: f64 = 1e-6;

/// SABR model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrData {
    /// Initial volatility level.
    pub alpha: f64,
    /// CEV exponent.
    pub beta: f64,
    /// Forward/volatility correlation.
    pub rho: f64,
    /// Volatility of volatility.
    pub nu: f64,
}

impl SabrData {
    /// Number of model parameters.
    pub const N_PARAMS: usize = 4;
    /// Parameter names in model order.
    pub const NAMES: [&'static str; 4] = ["alpha", "beta", "rho", "nu"];

    /// Create SABR data.
    pub fn new(alpha: f64, beta: f64, rho: f64, nu: f64) -> Self {
        Self {
            alpha,
            beta,
            rho,
            nu,
        }
    }

    /// Model-space parameter vector `[alpha, beta, rho, nu]`.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.alpha, self.beta, self.rho, self.nu]
    }

    /// Copy with a different alpha.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

impl TryFrom<&[f64]> for SabrData {
    type Error = SmileError;

    fn try_from(params: &[f64]) -> Result<Self, SmileError> {
        check_len("SABR", params, Self::N_PARAMS)?;
        Ok(Self::new(params[0], params[1], params[2], params[3]))
    }
}

/// Hagan lognormal volatility formula.
///
/// The Jacobian is computed by central bump-and-revalue with columns
/// `[forward, strike, expiry, alpha, beta, rho, nu]`.
///
/// # Examples
/// ```
/// use smile_models::smile::{SabrData, SabrHaganVolatility, VolatilityFunction};
///
/// let data = SabrData::new(0.3, 0.5, -0.2, 0.4);
/// let vols = SabrHaganVolatility
///     .volatilities(0.05, &[0.03, 0.05, 0.07], 5.0, &data)
///     .unwrap();
///
/// // Negative rho skews the smile downwards
/// assert!(vols[0] > vols[1] && vols[1] > vols[2]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SabrHaganVolatility;

impl VolatilityFunction for SabrHaganVolatility {
    type Data = SabrData;

    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        data: &SabrData,
    ) -> Result<f64, SmileError> {
        check_market(forward, &[strike], expiry)?;
        Ok(hagan_volatility(forward, strike, expiry, data))
    }

    fn volatility_jacobian(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        data: &SabrData,
    ) -> Option<Result<Vec<Vec<f64>>, SmileError>> {
        if let Err(e) = check_market(forward, strikes, expiry) {
            return Some(Err(e));
        }
        Some(Ok(strikes
            .iter()
            .map(|&k| bumped_row(forward, k, expiry, data))
            .collect()))
    }
}

/// Hagan implied volatility. Returns 0 when `alpha == 0`.
pub fn hagan_volatility(forward: f64, strike: f64, expiry: f64, data: &SabrData) -> f64 {
    let SabrData {
        alpha,
        beta,
        rho,
        nu,
    } = *data;
    if alpha == 0.0 {
        return 0.0;
    }

    let k = strike.max(forward * CUTOFF_MONEYNESS);
    let beta1 = 1.0 - beta;

    if (forward - k).abs() <= ATM_EPS * forward {
        let f1 = forward.powf(beta1);
        return alpha
            * (1.0
                + expiry
                    * (beta1 * beta1 * alpha * alpha / 24.0 / f1 / f1
                        + rho * alpha * beta * nu / 4.0 / f1
                        + nu * nu * (2.0 - 3.0 * rho * rho) / 24.0))
            / f1;
    }

    let ln = (forward / k).ln();
    if beta.abs() < BETA_EPS {
        let z = nu * (forward * k).sqrt() * ln / alpha;
        alpha * ln * z_over_chi(rho, z)
            * (1.0 + expiry * (alpha * alpha / forward / k + nu * nu * (2.0 - 3.0 * rho * rho)) / 24.0)
            / (forward - k)
    } else if (beta - 1.0).abs() < BETA_EPS {
        let z = nu * ln / alpha;
        alpha
            * z_over_chi(rho, z)
            * (1.0 + expiry * (rho * alpha * nu / 4.0 + nu * nu * (2.0 - 3.0 * rho * rho) / 24.0))
    } else {
        let f1 = (forward * k).powf(beta1);
        let f1_sqrt = f1.sqrt();
        let ln_beta_sq = (beta1 * ln).powi(2);
        let z = nu * f1_sqrt * ln / alpha;
        let first = alpha / (f1_sqrt * (1.0 + ln_beta_sq / 24.0 + ln_beta_sq * ln_beta_sq / 1920.0));
        let third = 1.0
            + expiry
                * (beta1 * beta1 * alpha * alpha / 24.0 / f1
                    + rho * nu * beta * alpha / 4.0 / f1_sqrt
                    + nu * nu * (2.0 - 3.0 * rho * rho) / 24.0);
        first * z_over_chi(rho, z) * third
    }
}

/// `z / χ(z)` with the `z → 0` and `ρ → ±1` limits handled explicitly.
fn z_over_chi(rho: f64, z: f64) -> f64 {
    if z.abs() < SMALL_Z {
        return 1.0 - rho * z / 2.0;
    }

    let rho_star = 1.0 - rho;
    if rho_star.abs() < RHO_EPS {
        return if z > 1.0 {
            if rho_star == 0.0 {
                0.0
            } else {
                z / ((2.0 * (z - 1.0)).ln() - rho_star.ln())
            }
        } else if z < 1.0 {
            z / (-(1.0 - z).ln() - 0.5 * (z / (z - 1.0)).powi(2) * rho_star)
        } else {
            0.0
        };
    }

    let rho_hat = 1.0 + rho;
    if rho_hat.abs() < RHO_EPS_NEGATIVE {
        return if z > -1.0 {
            z / (1.0 + z).ln()
        } else if z < -1.0 {
            if rho_hat == 0.0 {
                0.0
            } else {
                z / (rho_hat.ln() - (-(1.0 + z) / rho_star).ln())
            }
        } else {
            0.0
        };
    }

    let arg = if z < LARGE_NEG_Z {
        (rho * rho - 1.0) / 2.0 / z
    } else if z > LARGE_POS_Z {
        2.0 * (z - rho)
    } else {
        let arg = (1.0 - 2.0 * rho * z + z * z).sqrt() + z - rho;
        if arg <= 0.0 {
            return 0.0;
        }
        arg
    };
    z / (arg.ln() - rho_star.ln())
}

/// One Jacobian row by central differences; rho is bumped one-sided at its bounds.
fn bumped_row(forward: f64, strike: f64, expiry: f64, data: &SabrData) -> Vec<f64> {
    let vol = |f: f64, k: f64, t: f64, d: &SabrData| hagan_volatility(f, k, t, d);
    let central = |up: f64, down: f64, h: f64| (up - down) / (2.0 * h);

    let mut row = Vec::with_capacity(MARKET_COLUMNS + SabrData::N_PARAMS);

    let hf = BUMP * forward;
    row.push(central(
        vol(forward + hf, strike, expiry, data),
        vol(forward - hf, strike, expiry, data),
        hf,
    ));
    let hk = BUMP * strike;
    row.push(central(
        vol(forward, strike + hk, expiry, data),
        vol(forward, strike - hk, expiry, data),
        hk,
    ));
    let ht = BUMP * expiry;
    row.push(central(
        vol(forward, strike, expiry + ht, data),
        vol(forward, strike, expiry - ht, data),
        ht,
    ));

    let base = data.to_vec();
    for j in 0..SabrData::N_PARAMS {
        let h = BUMP * base[j].abs().max(1e-2);
        let mut up = base.clone();
        let mut down = base.clone();
        up[j] += h;
        down[j] -= h;
        let at = |p: &[f64]| vol(forward, strike, expiry, &SabrData::new(p[0], p[1], p[2], p[3]));

        let derivative = if j == 2 && up[2] >= 1.0 {
            (at(&base) - at(&down)) / h
        } else if j == 2 && down[2] <= -1.0 {
            (at(&up) - at(&base)) / h
        } else {
            central(at(&up), at(&down), h)
        };
        row.push(derivative);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn data() -> SabrData {
        SabrData::new(0.3, 0.5, -0.2, 0.4)
    }

    #[test]
    fn test_try_from_slice() {
        let d = SabrData::try_from([0.3, 0.5, -0.2, 0.4].as_slice()).unwrap();
        assert_eq!(d, data());
        assert_eq!(d.to_vec(), vec![0.3, 0.5, -0.2, 0.4]);
        assert!(matches!(
            SabrData::try_from([0.3, 0.5].as_slice()),
            Err(SmileError::ParameterCount { expected: 4, got: 2, .. })
        ));
    }

    #[test]
    fn test_atm_matches_limit_of_general_formula() {
        let f = 0.05;
        let atm = hagan_volatility(f, f, 5.0, &data());
        let near = hagan_volatility(f, f * (1.0 + 1e-5), 5.0, &data());
        assert_relative_eq!(atm, near, max_relative = 1e-5);
    }

    #[test]
    fn test_lognormal_flat_without_vol_of_vol() {
        // beta = 1, nu = 0: Black volatility equals alpha everywhere
        let d = SabrData::new(0.2, 1.0, 0.0, 0.0);
        for k in [0.5, 1.0, 1.5] {
            assert_relative_eq!(hagan_volatility(1.0, k, 1.0, &d), 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normal_branch_continuous_with_general() {
        let d0 = SabrData::new(0.01, 0.0, 0.1, 0.3);
        let d_eps = SabrData::new(0.01, 1e-6, 0.1, 0.3);
        let a = hagan_volatility(0.03, 0.02, 2.0, &d0);
        let b = hagan_volatility(0.03, 0.02, 2.0, &d_eps);
        assert_relative_eq!(a, b, max_relative = 1e-4);
    }

    #[test]
    fn test_z_over_chi_limits() {
        assert_relative_eq!(z_over_chi(0.3, 0.0), 1.0);
        // Just past the small-z switch the exact form matches the expansion
        assert_relative_eq!(z_over_chi(0.3, 1.1e-6), 1.0 - 0.3 * 1.1e-6 / 2.0, epsilon = 1e-9);
        // rho near +1 and -1 stay finite
        assert!(z_over_chi(1.0 - 1e-9, 0.5).is_finite());
        assert!(z_over_chi(-1.0 + 1e-10, 0.5).is_finite());
    }

    #[test]
    fn test_alpha_zero_gives_zero() {
        assert_eq!(hagan_volatility(0.05, 0.04, 1.0, &data().with_alpha(0.0)), 0.0);
    }

    #[test]
    fn test_jacobian_shape_and_alpha_column() {
        let strikes = [0.03, 0.05, 0.07];
        let jac = SabrHaganVolatility
            .volatility_jacobian(0.05, &strikes, 5.0, &data())
            .unwrap()
            .unwrap();
        assert_eq!(jac.len(), 3);
        assert!(jac.iter().all(|row| row.len() == 7));

        // alpha column against a wide central difference
        let h = 1e-4;
        for (row, &k) in jac.iter().zip(&strikes) {
            let fd = (hagan_volatility(0.05, k, 5.0, &data().with_alpha(0.3 + h))
                - hagan_volatility(0.05, k, 5.0, &data().with_alpha(0.3 - h)))
                / (2.0 * h);
            assert_relative_eq!(row[3], fd, max_relative = 1e-5);
            // Volatility rises with alpha
            assert!(row[3] > 0.0);
        }
    }

    #[test]
    fn test_invalid_market_rejected() {
        assert!(SabrHaganVolatility.volatility(-0.05, 0.04, 1.0, &data()).is_err());
        assert!(SabrHaganVolatility
            .volatilities(0.05, &[0.04, 0.0], 1.0, &data())
            .is_err());
    }
}
