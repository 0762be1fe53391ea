//! Calibration that reproduces the at-the-money volatility exactly.
//!
//! One level parameter (SABR alpha) is taken out of fit space. Before every
//! evaluation it is re-solved so that the model volatility at the forward
//! equals the target:
//!
//! 1. bracket the root starting from `[guess/2, 2·guess]`, expanding
//!    outward by 1.6 × width for at most 50 steps, never leaving the
//!    parameter's admissible domain;
//! 2. polish with Brent at high precision, so that root noise does not leak
//!    into the finite-difference Jacobian of the outer problem.
//!
//! Failing to bracket is fatal for the outer calibration
//! (`CalibrationError::UnreachableTarget`).

use smile_core::math::solvers::{BracketConfig, BracketRoot, BrentSolver, SolverConfig};
use smile_core::math::transforms::ParameterConstraint;
use smile_core::types::SolverError;
use tracing::trace;

use super::SmileModel;
use crate::{CalibrationError, SmileQuotes};

/// Wraps a model so that its level parameter always reproduces a target
/// ATM volatility.
///
/// # Example
///
/// ```
/// use smile_core::math::transforms::FixedMask;
/// use smile_optimiser::fitting::{AtmRecoveringModel, SabrModel, SmileModel, SmileModelFitter};
/// use smile_optimiser::SmileQuotes;
///
/// let strikes = vec![0.03, 0.04, 0.05, 0.06, 0.07];
/// let data = SabrModel.to_data(&[0.3, 0.5, -0.2, 0.4]).unwrap();
/// let vols = SabrModel.volatilities(0.05, 5.0, &strikes, &data).unwrap();
/// let quotes = SmileQuotes::with_uniform_error(0.05, 5.0, strikes, vols, 1e-4).unwrap();
///
/// let model = AtmRecoveringModel::from_quotes(SabrModel, SabrModel::ALPHA, &quotes);
/// let result = SmileModelFitter::new(&model, &quotes)
///     .solve(&[0.1, 0.5, 0.0, 0.1], &FixedMask::from_indices([SabrModel::BETA]))
///     .unwrap();
///
/// let atm = SabrModel
///     .volatilities(0.05, 5.0, &[0.05], &SabrModel.to_data(&result.parameters).unwrap())
///     .unwrap();
/// assert!((atm[0] - quotes.atm_volatility()).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct AtmRecoveringModel<M: SmileModel> {
    inner: M,
    level_index: usize,
    target: f64,
    bracket: BracketRoot,
    brent: BrentSolver<f64>,
}

impl<M: SmileModel> AtmRecoveringModel<M> {
    /// Recover `target` by solving for the parameter at `level_index`.
    pub fn new(inner: M, level_index: usize, target: f64) -> Self {
        Self {
            inner,
            level_index,
            target,
            bracket: BracketRoot::new(BracketConfig::default()),
            brent: BrentSolver::new(SolverConfig::high_precision()),
        }
    }

    /// Recover the quoted volatility at the forward, interpolated linearly
    /// in strike.
    pub fn from_quotes(inner: M, level_index: usize, quotes: &SmileQuotes) -> Self {
        Self::new(inner, level_index, quotes.atm_volatility())
    }

    /// The wrapped model.
    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Target ATM volatility.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Index of the solved parameter.
    pub fn level_index(&self) -> usize {
        self.level_index
    }

    /// Level parameter value that reproduces the target, all other
    /// parameters held at `params`.
    ///
    /// # Errors
    ///
    /// * `CalibrationError::UnreachableTarget` - no sign change inside the domain
    /// * `CalibrationError::Configuration` - unusable starting guess
    /// * `CalibrationError::NumericalFailure` - the model fails inside the search
    pub fn solve_level(
        &self,
        params: &[f64],
        forward: f64,
        expiry: f64,
    ) -> Result<f64, CalibrationError> {
        let i = self.level_index;
        let guess = *params.get(i).ok_or_else(|| {
            CalibrationError::configuration(format!(
                "level index {} out of range for {} parameters",
                i,
                params.len()
            ))
        })?;
        if !guess.is_finite() || guess == 0.0 {
            return Err(CalibrationError::configuration(format!(
                "level parameter needs a non-zero starting guess, got {}",
                guess
            )));
        }
        let (min_limit, max_limit) = self
            .inner
            .constraints()
            .get(i)
            .map_or((f64::NEG_INFINITY, f64::INFINITY), domain);

        let objective = |x: f64| {
            let mut trial = params.to_vec();
            trial[i] = x;
            self.atm_volatility(&trial, forward, expiry)
                .map_or(f64::NAN, |vol| vol - self.target)
        };

        let (lo, hi) = self
            .bracket
            .bracket_within(&objective, 0.5 * guess, 2.0 * guess, min_limit, max_limit)
            .map_err(|e| match e {
                SolverError::NoBracket { a, b } => CalibrationError::unreachable_target(
                    self.inner.parameter_names()[i].clone(),
                    self.target,
                    format!("no sign change of the ATM residual on [{}, {}]", a, b),
                ),
                other => other.into(),
            })?;
        let level = self.brent.find_root(&objective, lo, hi)?;
        trace!(level, lo, hi, target = self.target, "ATM level solved");
        Ok(level)
    }

    fn atm_volatility(
        &self,
        params: &[f64],
        forward: f64,
        expiry: f64,
    ) -> Result<f64, CalibrationError> {
        let data = self.inner.to_data(params)?;
        let vols = self.inner.volatilities(forward, expiry, &[forward], &data)?;
        vols.first()
            .copied()
            .ok_or_else(|| CalibrationError::numerical_failure("model returned no ATM volatility"))
    }
}

/// Closed admissible interval of a constraint.
fn domain(constraint: &ParameterConstraint) -> (f64, f64) {
    match *constraint {
        ParameterConstraint::Unconstrained => (f64::NEG_INFINITY, f64::INFINITY),
        ParameterConstraint::GreaterThan(lower) => (lower, f64::INFINITY),
        ParameterConstraint::Range { lower, upper } => (lower, upper),
    }
}

impl<M: SmileModel> SmileModel for AtmRecoveringModel<M> {
    type Data = M::Data;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn n_params(&self) -> usize {
        self.inner.n_params()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.inner.parameter_names()
    }

    fn constraints(&self) -> Vec<ParameterConstraint> {
        self.inner.constraints()
    }

    fn to_data(&self, params: &[f64]) -> Result<M::Data, CalibrationError> {
        self.inner.to_data(params)
    }

    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &M::Data,
    ) -> Result<Vec<f64>, CalibrationError> {
        self.inner.volatilities(forward, expiry, strikes, data)
    }

    // The level depends on every other parameter, so the inner model's
    // partial derivatives are not the ones the solver needs.

    fn is_allowed(&self, params: &[f64], forward: f64, expiry: f64, strikes: &[f64]) -> bool {
        self.inner.is_allowed(params, forward, expiry, strikes)
    }

    fn pinned_indices(&self) -> Vec<usize> {
        let mut pinned = self.inner.pinned_indices();
        pinned.push(self.level_index);
        pinned
    }

    fn resolve(&self, params: &mut [f64], forward: f64, expiry: f64) -> Result<(), CalibrationError> {
        self.inner.resolve(params, forward, expiry)?;
        params[self.level_index] = self.solve_level(params, forward, expiry)?;
        Ok(())
    }
}
