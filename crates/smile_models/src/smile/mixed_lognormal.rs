//! Mixture of log-normal distributions sharing one forward.
//!
//! The undiscounted price is a weighted sum of Black prices,
//! `P(K) = Σ wᵢ · Black(F, K, T, σᵢ)`, converted back to a single Black
//! implied volatility.
//!
//! ## Parameterisation
//!
//! For `n` components the model vector has `2n - 1` entries:
//!
//! - `σ₀` followed by `n - 1` increments `δᵢ`, giving ordered volatilities
//!   `σᵢ = σᵢ₋₁ + δᵢ`
//! - `n - 1` angles `θⱼ` mapped onto the unit simplex:
//!   `w₀ = cos²θ₀`, `w₁ = sin²θ₀·cos²θ₁`, ..., `wₙ₋₁ = Π sin²θⱼ`
//!
//! The weights sum to one for any angles.

use super::{check_len, check_market, SmileError, VolatilityFunction};
use crate::analytical::{black_implied_vol, black_price};

/// Mixed log-normal model data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixedLogNormalData {
    volatilities: Vec<f64>,
    weights: Vec<f64>,
    params: Vec<f64>,
}

impl MixedLogNormalData {
    /// Build from a model-space vector of `2 * n_normals - 1` entries.
    ///
    /// # Errors
    /// `SmileError::ParameterCount` when the length does not match `n_normals`
    /// (which must be at least 1).
    pub fn from_params(params: &[f64], n_normals: usize) -> Result<Self, SmileError> {
        check_len("mixed log-normal", params, Self::n_params(n_normals.max(1)))?;
        if n_normals == 0 {
            return Err(SmileError::ParameterCount {
                model: "mixed log-normal",
                expected: 1,
                got: 0,
            });
        }

        let mut volatilities = Vec::with_capacity(n_normals);
        let mut sigma = params[0];
        volatilities.push(sigma);
        for delta in &params[1..n_normals] {
            sigma += delta;
            volatilities.push(sigma);
        }

        Ok(Self {
            volatilities,
            weights: weights_from_angles(&params[n_normals..]),
            params: params.to_vec(),
        })
    }

    /// Model vector length for `n_normals` components.
    pub const fn n_params(n_normals: usize) -> usize {
        2 * n_normals - 1
    }

    /// Parameter names for `n_normals` components.
    pub fn names(n_normals: usize) -> Vec<String> {
        let mut names = vec!["sigma_0".to_string()];
        names.extend((1..n_normals).map(|i| format!("delta_{}", i)));
        names.extend((0..n_normals.saturating_sub(1)).map(|i| format!("theta_{}", i)));
        names
    }

    /// Number of mixture components.
    pub fn n_normals(&self) -> usize {
        self.volatilities.len()
    }

    /// Component volatilities, ascending when increments are positive.
    pub fn volatilities(&self) -> &[f64] {
        &self.volatilities
    }

    /// Component weights, summing to one.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The model-space vector this data was built from.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Undiscounted mixture price.
    pub fn price(&self, forward: f64, strike: f64, expiry: f64, is_call: bool) -> f64 {
        self.weights
            .iter()
            .zip(&self.volatilities)
            .map(|(w, &vol)| w * black_price(forward, strike, expiry, vol, is_call))
            .sum()
    }
}

/// Hyperspherical map from `n - 1` angles to `n` non-negative weights.
pub fn weights_from_angles(angles: &[f64]) -> Vec<f64> {
    let mut weights = Vec::with_capacity(angles.len() + 1);
    let mut remaining = 1.0;
    for theta in angles {
        let (s, c) = theta.sin_cos();
        weights.push(remaining * c * c);
        remaining *= s * s;
    }
    weights.push(remaining);
    weights
}

/// Mixed log-normal implied volatility via Black inversion of the
/// out-of-the-money mixture price.
///
/// # Examples
/// ```
/// use smile_models::smile::{MixedLogNormalData, MixedLogNormalVolatility, VolatilityFunction};
///
/// // Two components: 10% and 30% vols, equal weights (θ = π/4)
/// let params = [0.1, 0.2, std::f64::consts::FRAC_PI_4];
/// let data = MixedLogNormalData::from_params(&params, 2).unwrap();
/// let vol = MixedLogNormalVolatility
///     .volatility(1.0, 1.3, 1.0, &data)
///     .unwrap();
///
/// // Wing vol sits between the components
/// assert!(vol > 0.1 && vol < 0.3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixedLogNormalVolatility;

impl VolatilityFunction for MixedLogNormalVolatility {
    type Data = MixedLogNormalData;

    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        data: &MixedLogNormalData,
    ) -> Result<f64, SmileError> {
        check_market(forward, &[strike], expiry)?;
        let is_call = strike >= forward;
        let price = data.price(forward, strike, expiry, is_call);
        Ok(black_implied_vol(forward, strike, expiry, price, is_call)?)
    }
}
