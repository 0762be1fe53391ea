//! The pluggable smile model seen by the generic fitter.

use smile_core::math::transforms::ParameterConstraint;

use crate::CalibrationError;

/// A parametric smile model that can be fitted to [`SmileQuotes`](crate::SmileQuotes).
///
/// Parameter vectors passed to these methods are in model space and have
/// length [`n_params`](Self::n_params).
pub trait SmileModel: Send + Sync {
    /// Model data the volatility formula is evaluated on.
    type Data;

    /// Short model name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Length of the model parameter vector.
    fn n_params(&self) -> usize;

    /// Parameter names, in model order.
    fn parameter_names(&self) -> Vec<String>;

    /// Default constraint for each parameter.
    fn constraints(&self) -> Vec<ParameterConstraint>;

    /// Build model data from a model-space vector.
    fn to_data(&self, params: &[f64]) -> Result<Self::Data, CalibrationError>;

    /// Implied volatilities at `strikes`.
    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &Self::Data,
    ) -> Result<Vec<f64>, CalibrationError>;

    /// Volatility sensitivities, one row per strike.
    ///
    /// Rows may carry leading market columns; only the trailing
    /// [`n_params`](Self::n_params) columns are read. `None` makes the solver
    /// fall back to finite differences.
    fn volatility_jacobian(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &Self::Data,
    ) -> Option<Result<Vec<Vec<f64>>, CalibrationError>> {
        let _ = (forward, expiry, strikes, data);
        None
    }

    /// Admissibility of a trial point beyond its box constraints.
    fn is_allowed(&self, params: &[f64], forward: f64, expiry: f64, strikes: &[f64]) -> bool {
        let _ = (params, forward, expiry, strikes);
        true
    }

    /// Indices this model always removes from fit space, on top of the
    /// caller's fixed mask.
    fn pinned_indices(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Overwrite pinned parameters before evaluation, e.g. tie one
    /// parameter to another or solve for it.
    ///
    /// Models overriding this must not report a Jacobian: the coupling
    /// would be missing from it.
    fn resolve(&self, params: &mut [f64], forward: f64, expiry: f64) -> Result<(), CalibrationError> {
        let _ = (params, forward, expiry);
        Ok(())
    }
}
