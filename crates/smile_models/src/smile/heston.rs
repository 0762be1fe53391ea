//! Heston stochastic volatility parameters.
//!
//! ```text
//! dF = √V · F · dW_F
//! dV = κ(θ - V) dt + ω √V dW_V
//! E[dW_F · dW_V] = ρ dt
//! ```
//!
//! `vol0` is the initial value of the variance process `V`, on the same
//! scale as `theta`, so the two may be tied together during calibration.

use super::{check_len, SmileError};

/// Heston model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HestonData {
    /// Mean-reversion speed (κ).
    pub kappa: f64,
    /// Long-run variance (θ).
    pub theta: f64,
    /// Initial variance (V₀).
    pub vol0: f64,
    /// Volatility of variance (ω).
    pub omega: f64,
    /// Spot/variance correlation (ρ).
    pub rho: f64,
}

impl HestonData {
    /// Number of model parameters.
    pub const N_PARAMS: usize = 5;
    /// Parameter names in model order.
    pub const NAMES: [&'static str; 5] = ["kappa", "theta", "vol0", "omega", "rho"];

    /// Create Heston data.
    pub fn new(kappa: f64, theta: f64, vol0: f64, omega: f64, rho: f64) -> Self {
        Self {
            kappa,
            theta,
            vol0,
            omega,
            rho,
        }
    }

    /// Model-space parameter vector `[kappa, theta, vol0, omega, rho]`.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.kappa, self.theta, self.vol0, self.omega, self.rho]
    }

    /// Feller condition `2κθ ≥ ω²`: the variance process stays positive.
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.omega * self.omega
    }
}

impl TryFrom<&[f64]> for HestonData {
    type Error = SmileError;

    fn try_from(params: &[f64]) -> Result<Self, SmileError> {
        check_len("Heston", params, Self::N_PARAMS)?;
        Ok(Self::new(params[0], params[1], params[2], params[3], params[4]))
    }
}
