//! Mixed log-normal smile model.

use smile_core::math::transforms::ParameterConstraint;
use smile_models::smile::mixed_lognormal::weights_from_angles;
use smile_models::smile::{MixedLogNormalData, MixedLogNormalVolatility, VolatilityFunction};

use super::SmileModel;
use crate::CalibrationError;

/// Smallest admissible weight of the first component.
pub const MIN_FIRST_WEIGHT: f64 = 1e-4;

/// Weighted mixture of `n` Black prices, quoted back as a Black volatility.
///
/// Parameters are `sigma_0`, `n - 1` positive volatility increments, then
/// `n - 1` unconstrained angles mapped onto the weight simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixedLogNormalModel {
    n_normals: usize,
}

impl MixedLogNormalModel {
    /// Mixture of `n_normals` log-normals.
    ///
    /// # Errors
    ///
    /// `CalibrationError::Configuration` when `n_normals == 0`.
    pub fn new(n_normals: usize) -> Result<Self, CalibrationError> {
        if n_normals == 0 {
            return Err(CalibrationError::configuration(
                "mixed log-normal needs at least one component",
            ));
        }
        Ok(Self { n_normals })
    }

    /// Number of components.
    pub fn n_normals(&self) -> usize {
        self.n_normals
    }
}

impl SmileModel for MixedLogNormalModel {
    type Data = MixedLogNormalData;

    fn name(&self) -> &'static str {
        "mixed log-normal"
    }

    fn n_params(&self) -> usize {
        MixedLogNormalData::n_params(self.n_normals)
    }

    fn parameter_names(&self) -> Vec<String> {
        MixedLogNormalData::names(self.n_normals)
    }

    fn constraints(&self) -> Vec<ParameterConstraint> {
        let n = self.n_normals;
        let mut constraints = vec![ParameterConstraint::positive(); n];
        constraints.extend(std::iter::repeat(ParameterConstraint::Unconstrained).take(n - 1));
        constraints
    }

    fn to_data(&self, params: &[f64]) -> Result<MixedLogNormalData, CalibrationError> {
        Ok(MixedLogNormalData::from_params(params, self.n_normals)?)
    }

    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &MixedLogNormalData,
    ) -> Result<Vec<f64>, CalibrationError> {
        Ok(MixedLogNormalVolatility.volatilities(forward, strikes, expiry, data)?)
    }

    fn is_allowed(&self, params: &[f64], _forward: f64, _expiry: f64, _strikes: &[f64]) -> bool {
        if params.len() != self.n_params() {
            return false;
        }
        let weights = weights_from_angles(&params[self.n_normals..]);
        weights[0] > MIN_FIRST_WEIGHT && weights[1..].iter().all(|&w| w >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_constraint_layout() {
        let model = MixedLogNormalModel::new(3).unwrap();
        let c = model.constraints();
        assert_eq!(c.len(), 5);
        assert!(c[..3].iter().all(|c| *c == ParameterConstraint::positive()));
        assert!(c[3..].iter().all(|c| *c == ParameterConstraint::Unconstrained));
        assert_eq!(model.parameter_names().len(), 5);
    }

    #[test]
    fn test_first_weight_floor() {
        let model = MixedLogNormalModel::new(2).unwrap();
        assert!(model.is_allowed(&[0.1, 0.1, 0.3], 1.0, 1.0, &[1.0]));
        // theta = pi/2 puts all weight on the second component
        assert!(!model.is_allowed(&[0.1, 0.1, FRAC_PI_2], 1.0, 1.0, &[1.0]));
    }

    #[test]
    fn test_zero_components_rejected() {
        assert!(MixedLogNormalModel::new(0).unwrap_err().is_configuration());
    }
}
