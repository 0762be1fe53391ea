//! SABR (Hagan) smile model.

use smile_core::math::transforms::ParameterConstraint;
use smile_models::smile::{SabrData, SabrHaganVolatility, VolatilityFunction};

use super::SmileModel;
use crate::CalibrationError;

/// SABR with Hagan's lognormal volatility expansion.
///
/// Parameters `[alpha, beta, rho, nu]` with `alpha > 0`, `0 < beta < 2`,
/// `-1 < rho < 1` and `nu > 0`. The Jacobian comes from the formula's
/// bump-and-revalue sensitivities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SabrModel;

impl SabrModel {
    /// Index of alpha, the level parameter solved for by ATM recovery.
    pub const ALPHA: usize = 0;
    /// Index of beta, usually held fixed.
    pub const BETA: usize = 1;
}

impl SmileModel for SabrModel {
    type Data = SabrData;

    fn name(&self) -> &'static str {
        "SABR"
    }

    fn n_params(&self) -> usize {
        SabrData::N_PARAMS
    }

    fn parameter_names(&self) -> Vec<String> {
        SabrData::NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn constraints(&self) -> Vec<ParameterConstraint> {
        vec![
            ParameterConstraint::positive(),
            ParameterConstraint::range(0.0, 2.0),
            ParameterConstraint::range(-1.0, 1.0),
            ParameterConstraint::positive(),
        ]
    }

    fn to_data(&self, params: &[f64]) -> Result<SabrData, CalibrationError> {
        Ok(SabrData::try_from(params)?)
    }

    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &SabrData,
    ) -> Result<Vec<f64>, CalibrationError> {
        Ok(SabrHaganVolatility.volatilities(forward, strikes, expiry, data)?)
    }

    fn volatility_jacobian(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &SabrData,
    ) -> Option<Result<Vec<Vec<f64>>, CalibrationError>> {
        SabrHaganVolatility
            .volatility_jacobian(forward, strikes, expiry, data)
            .map(|rows| rows.map_err(CalibrationError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shapes_agree() {
        let model = SabrModel;
        assert_eq!(model.parameter_names().len(), model.n_params());
        assert_eq!(model.constraints().len(), model.n_params());
        assert_eq!(model.parameter_names()[SabrModel::ALPHA], "alpha");
        assert_eq!(model.parameter_names()[SabrModel::BETA], "beta");
    }

    #[test]
    fn test_jacobian_trailing_columns() {
        let data = SabrData::new(0.3, 0.5, -0.2, 0.4);
        let rows = SabrModel
            .volatility_jacobian(0.05, 5.0, &[0.04, 0.06], &data)
            .unwrap()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() >= SabrData::N_PARAMS));
        // d vol / d alpha is positive
        let alpha_col = rows[0].len() - SabrData::N_PARAMS;
        assert!(rows[0][alpha_col] > 0.0);
    }

    #[test]
    fn test_wrong_length_is_configuration() {
        assert!(SabrModel.to_data(&[0.3, 0.5]).unwrap_err().is_configuration());
    }
}
