//! Stochastic volatility inspired (SVI) raw parameterisation.
//!
//! Total implied variance in log-moneyness `k = ln(K/F)`:
//!
//! ```text
//! w(k) = a + b·(ρ·(k - m) + √((k - m)² + σ²))
//! σ_B(K) = √(w(k) / T)
//! ```

use super::{check_len, check_market, SmileError, VolatilityFunction, MARKET_COLUMNS};

/// SVI raw parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SviData {
    /// Variance level.
    pub a: f64,
    /// Wing slope.
    pub b: f64,
    /// Skew (rotation).
    pub rho: f64,
    /// ATM curvature.
    pub sigma: f64,
    /// Horizontal shift.
    pub m: f64,
}

impl SviData {
    /// Number of model parameters.
    pub const N_PARAMS: usize = 5;
    /// Parameter names in model order.
    pub const NAMES: [&'static str; 5] = ["a", "b", "rho", "sigma", "m"];

    /// Create SVI data.
    pub fn new(a: f64, b: f64, rho: f64, sigma: f64, m: f64) -> Self {
        Self {
            a,
            b,
            rho,
            sigma,
            m,
        }
    }

    /// Model-space parameter vector `[a, b, rho, sigma, m]`.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.a, self.b, self.rho, self.sigma, self.m]
    }

    /// Total implied variance at log-moneyness `k`.
    #[inline]
    pub fn total_variance(&self, k: f64) -> f64 {
        let x = k - self.m;
        self.a + self.b * (self.rho * x + (x * x + self.sigma * self.sigma).sqrt())
    }
}

impl TryFrom<&[f64]> for SviData {
    type Error = SmileError;

    fn try_from(params: &[f64]) -> Result<Self, SmileError> {
        check_len("SVI", params, Self::N_PARAMS)?;
        Ok(Self::new(params[0], params[1], params[2], params[3], params[4]))
    }
}

/// SVI volatility with an analytic Jacobian.
///
/// # Examples
/// ```
/// use smile_models::smile::{SviData, SviVolatility, VolatilityFunction};
///
/// let data = SviData::new(0.04, 0.1, -0.3, 0.2, 0.0);
/// let vol = SviVolatility.volatility(100.0, 100.0, 1.0, &data).unwrap();
///
/// // ATM with m = 0: w = a + b·σ
/// assert!((vol - (0.04_f64 + 0.1 * 0.2).sqrt()).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SviVolatility;

impl VolatilityFunction for SviVolatility {
    type Data = SviData;

    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        data: &SviData,
    ) -> Result<f64, SmileError> {
        check_market(forward, &[strike], expiry)?;
        let w = data.total_variance((strike / forward).ln());
        if w < 0.0 || !w.is_finite() {
            return Err(SmileError::NegativeVariance {
                strike,
                variance: w,
            });
        }
        Ok((w / expiry).sqrt())
    }

    fn volatility_jacobian(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        data: &SviData,
    ) -> Option<Result<Vec<Vec<f64>>, SmileError>> {
        Some(
            strikes
                .iter()
                .map(|&strike| {
                    let vol = self.volatility(forward, strike, expiry, data)?;
                    Ok(jacobian_row(forward, strike, expiry, vol, data))
                })
                .collect(),
        )
    }
}

fn jacobian_row(forward: f64, strike: f64, expiry: f64, vol: f64, data: &SviData) -> Vec<f64> {
    let x = (strike / forward).ln() - data.m;
    let r = (x * x + data.sigma * data.sigma).sqrt();
    // dσ/dw; infinite at zero variance, which the feasibility check keeps away from
    let scale = 1.0 / (2.0 * vol * expiry);

    let dw_dk = data.b * (data.rho + x / r);
    let mut row = Vec::with_capacity(MARKET_COLUMNS + SviData::N_PARAMS);
    row.push(-dw_dk / forward * scale);
    row.push(dw_dk / strike * scale);
    row.push(-vol / (2.0 * expiry));
    row.push(scale);
    row.push((data.rho * x + r) * scale);
    row.push(data.b * x * scale);
    row.push(data.b * data.sigma / r * scale);
    row.push(-dw_dk * scale);
    row
}
