//! Calibration result type.

use crate::CalibrationError;

/// Outcome of one smile calibration, in model space.
///
/// Rows of `covariance` and `inverse_jacobian` belonging to fixed or pinned
/// parameters are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SmileFitResult {
    /// Name of the fitted model
    pub model: &'static str,
    /// Parameter names, in model order
    pub parameter_names: Vec<String>,
    /// Fitted model parameters
    pub parameters: Vec<f64>,
    /// Weighted sum of squared residuals at the fitted parameters
    pub chi_square: f64,
    /// Parameter covariance `(JᵀWJ)⁺`, parameters × parameters
    pub covariance: Vec<Vec<f64>>,
    /// Sensitivity of each parameter to each quote, parameters × quotes
    pub inverse_jacobian: Vec<Vec<f64>>,
    /// Solver iterations
    pub iterations: usize,
    /// Whether the solver met its convergence criteria
    pub converged: bool,
}

impl SmileFitResult {
    /// Turn a non-converged result into `CalibrationError::ConvergenceFailure`.
    ///
    /// # Examples
    ///
    /// ```
    /// use smile_optimiser::fitting::SmileFitResult;
    ///
    /// let result = SmileFitResult {
    ///     model: "SABR",
    ///     parameter_names: vec!["alpha".to_string()],
    ///     parameters: vec![0.2],
    ///     chi_square: 3.5,
    ///     covariance: vec![vec![0.0]],
    ///     inverse_jacobian: vec![vec![0.0]],
    ///     iterations: 200,
    ///     converged: false,
    /// };
    /// let err = result.require_converged().unwrap_err();
    /// assert!(err.is_recoverable());
    /// ```
    pub fn require_converged(self) -> Result<Self, CalibrationError> {
        if self.converged {
            Ok(self)
        } else {
            Err(CalibrationError::convergence_failure(
                self.iterations,
                self.chi_square,
            ))
        }
    }

    /// Fitted value of the named parameter.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameter_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.parameters[i])
    }

    /// Standard error of each parameter, `sqrt(covariance_ii)`.
    pub fn standard_errors(&self) -> Vec<f64> {
        self.covariance
            .iter()
            .enumerate()
            .map(|(i, row)| row[i].max(0.0).sqrt())
            .collect()
    }

    /// Root mean square of the weighted residuals.
    pub fn rmse(&self) -> f64 {
        let n = self.inverse_jacobian.first().map_or(0, Vec::len);
        if n == 0 {
            return 0.0;
        }
        (self.chi_square / n as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(converged: bool) -> SmileFitResult {
        SmileFitResult {
            model: "SABR",
            parameter_names: vec!["alpha".to_string(), "beta".to_string()],
            parameters: vec![0.3, 0.5],
            chi_square: 8.0,
            covariance: vec![vec![4e-6, 0.0], vec![0.0, 0.0]],
            inverse_jacobian: vec![vec![0.1, 0.2], vec![0.0, 0.0]],
            iterations: 12,
            converged,
        }
    }

    #[test]
    fn test_require_converged() {
        assert!(result(true).require_converged().is_ok());
        match result(false).require_converged() {
            Err(CalibrationError::ConvergenceFailure {
                iterations,
                chi_square,
            }) => {
                assert_eq!(iterations, 12);
                assert_eq!(chi_square, 8.0);
            }
            other => panic!("Expected ConvergenceFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_named_lookup() {
        let r = result(true);
        assert_eq!(r.parameter("beta"), Some(0.5));
        assert_eq!(r.parameter("gamma"), None);
    }

    #[test]
    fn test_standard_errors_and_rmse() {
        let r = result(true);
        let se = r.standard_errors();
        assert!((se[0] - 2e-3).abs() < 1e-15);
        assert_eq!(se[1], 0.0);
        assert_eq!(r.rmse(), 2.0);
    }
}
