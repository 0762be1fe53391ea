//! SVI smile model.

use smile_core::math::transforms::ParameterConstraint;
use smile_models::smile::{SviData, SviVolatility, VolatilityFunction};

use super::SmileModel;
use crate::CalibrationError;

/// Which SVI parameters carry box constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SviVariant {
    /// `b > 0`, `-1 < rho < 1`, `sigma > 0`.
    #[default]
    Standard,
    /// Only `sigma > 0`; `b` and `rho` are left free.
    Unconstrained,
}

/// Raw SVI total variance `w(k) = a + b (rho (k - m) + sqrt((k - m)² + sigma²))`.
///
/// Parameters `[a, b, rho, sigma, m]`. Trial points with a non-positive
/// variance at any quoted strike are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SviModel {
    variant: SviVariant,
}

impl SviModel {
    /// SVI with the given constraint variant.
    pub fn new(variant: SviVariant) -> Self {
        Self { variant }
    }

    /// `b > 0` and `|rho| < 1`.
    pub fn standard() -> Self {
        Self::new(SviVariant::Standard)
    }

    /// `b` and `rho` free.
    pub fn unconstrained() -> Self {
        Self::new(SviVariant::Unconstrained)
    }

    /// The constraint variant.
    pub fn variant(&self) -> SviVariant {
        self.variant
    }
}

impl SmileModel for SviModel {
    type Data = SviData;

    fn name(&self) -> &'static str {
        "SVI"
    }

    fn n_params(&self) -> usize {
        SviData::N_PARAMS
    }

    fn parameter_names(&self) -> Vec<String> {
        SviData::NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn constraints(&self) -> Vec<ParameterConstraint> {
        match self.variant {
            SviVariant::Standard => vec![
                ParameterConstraint::Unconstrained,
                ParameterConstraint::positive(),
                ParameterConstraint::range(-1.0, 1.0),
                ParameterConstraint::positive(),
                ParameterConstraint::Unconstrained,
            ],
            SviVariant::Unconstrained => vec![
                ParameterConstraint::Unconstrained,
                ParameterConstraint::Unconstrained,
                ParameterConstraint::Unconstrained,
                ParameterConstraint::positive(),
                ParameterConstraint::Unconstrained,
            ],
        }
    }

    fn to_data(&self, params: &[f64]) -> Result<SviData, CalibrationError> {
        Ok(SviData::try_from(params)?)
    }

    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &SviData,
    ) -> Result<Vec<f64>, CalibrationError> {
        Ok(SviVolatility.volatilities(forward, strikes, expiry, data)?)
    }

    fn volatility_jacobian(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &SviData,
    ) -> Option<Result<Vec<Vec<f64>>, CalibrationError>> {
        SviVolatility
            .volatility_jacobian(forward, strikes, expiry, data)
            .map(|rows| rows.map_err(CalibrationError::from))
    }

    fn is_allowed(&self, params: &[f64], forward: f64, _expiry: f64, strikes: &[f64]) -> bool {
        let Ok(data) = SviData::try_from(params) else {
            return false;
        };
        strikes.iter().all(|&k| {
            let w = data.total_variance((k / forward).ln());
            w > 0.0 && w.is_finite()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_constraints() {
        let standard = SviModel::standard().constraints();
        assert_eq!(standard[1], ParameterConstraint::positive());
        assert_eq!(standard[2], ParameterConstraint::range(-1.0, 1.0));

        let free = SviModel::unconstrained().constraints();
        assert_eq!(free[1], ParameterConstraint::Unconstrained);
        assert_eq!(free[2], ParameterConstraint::Unconstrained);
        assert_eq!(free[3], ParameterConstraint::positive());
    }

    #[test]
    fn test_negative_variance_is_not_allowed() {
        let model = SviModel::standard();
        let strikes = [0.8, 1.0, 1.2];
        assert!(model.is_allowed(&[0.04, 0.1, -0.3, 0.2, 0.0], 1.0, 1.0, &strikes));
        // a far below zero drags the ATM variance negative
        assert!(!model.is_allowed(&[-0.5, 0.1, -0.3, 0.2, 0.0], 1.0, 1.0, &strikes));
    }
}
