//! Generic weighted least-squares fitter for any [`SmileModel`].
//!
//! The fitter owns no state between calls. Each [`SmileModelFitter::solve`]
//! builds a [`ParameterTransform`] from the initial guess, wraps the model in
//! a [`FitSpaceFunction`] so the solver only sees unconstrained coordinates,
//! and maps the solver output back to model space.

use smile_core::math::solvers::{LMConfig, LMResult, LevenbergMarquardtSolver, ModelFunction};
use smile_core::math::transforms::{FixedMask, ParameterConstraint, ParameterTransform};
use tracing::{debug, info, warn};

use super::{SmileFitResult, SmileModel};
use crate::{CalibrationError, SmileQuotes};

/// Fits a smile model to one quote set.
///
/// # Example
///
/// ```
/// use smile_core::math::transforms::FixedMask;
/// use smile_models::smile::SabrData;
/// use smile_optimiser::fitting::{SabrModel, SmileModel, SmileModelFitter};
/// use smile_optimiser::SmileQuotes;
///
/// let truth = SabrData::new(0.3, 0.5, -0.2, 0.4);
/// let strikes = vec![0.03, 0.04, 0.05, 0.06, 0.07];
/// let data = SabrModel.to_data(&truth.to_vec()).unwrap();
/// let vols = SabrModel.volatilities(0.05, 5.0, &strikes, &data).unwrap();
/// let quotes = SmileQuotes::with_uniform_error(0.05, 5.0, strikes, vols, 1e-4).unwrap();
///
/// let result = SmileModelFitter::new(&SabrModel, &quotes)
///     .solve(&[0.1, 0.5, 0.0, 0.1], &FixedMask::from_indices([1]))
///     .unwrap();
///
/// assert!(result.converged);
/// assert_eq!(result.parameters[1], 0.5);
/// assert!((result.parameters[0] - 0.3).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SmileModelFitter<'a, M: SmileModel> {
    model: &'a M,
    quotes: &'a SmileQuotes,
    constraints: Vec<ParameterConstraint>,
    solver: LevenbergMarquardtSolver,
}

impl<'a, M: SmileModel> SmileModelFitter<'a, M> {
    /// Fitter with the model's default constraints and solver settings.
    pub fn new(model: &'a M, quotes: &'a SmileQuotes) -> Self {
        Self::with_config(model, quotes, LMConfig::default())
    }

    /// Fitter with custom solver settings.
    pub fn with_config(model: &'a M, quotes: &'a SmileQuotes, config: LMConfig) -> Self {
        Self {
            model,
            quotes,
            constraints: model.constraints(),
            solver: LevenbergMarquardtSolver::new(config),
        }
    }

    /// Replace the model's default constraint table.
    #[must_use]
    pub fn with_constraints(mut self, constraints: Vec<ParameterConstraint>) -> Self {
        self.constraints = constraints;
        self
    }

    /// The fitted model.
    pub fn model(&self) -> &M {
        self.model
    }

    /// The quotes being fitted.
    pub fn quotes(&self) -> &SmileQuotes {
        self.quotes
    }

    /// Constraint table in use.
    pub fn constraints(&self) -> &[ParameterConstraint] {
        &self.constraints
    }

    /// Model volatilities at the quote strikes for a model-space vector,
    /// after the model has resolved its pinned parameters.
    pub fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        self.check_len(params)?;
        let mut params = params.to_vec();
        self.model
            .resolve(&mut params, self.quotes.forward(), self.quotes.expiry())?;
        self.volatilities_at(&params)
    }

    /// Fit the model starting from `initial`, holding the indices in `fixed`
    /// (plus any the model pins itself) at their initial values.
    ///
    /// # Errors
    ///
    /// * `CalibrationError::Configuration` - wrong initial length, infeasible
    ///   initial guess, out-of-range fixed index, or rejected initial point
    /// * `CalibrationError::UnreachableTarget` - a pinned parameter could not
    ///   be resolved
    /// * `CalibrationError::NumericalFailure` - the model produced unusable values
    ///
    /// Not converging is not an error; see
    /// [`SmileFitResult::require_converged`]. A solve that ends with a
    /// range-bounded parameter saturated on its bound is reported as not
    /// converged.
    pub fn solve(
        &self,
        initial: &[f64],
        fixed: &FixedMask,
    ) -> Result<SmileFitResult, CalibrationError> {
        self.check_len(initial)?;
        let fixed = self
            .model
            .pinned_indices()
            .into_iter()
            .fold(fixed.clone(), |mask, index| mask.with_fixed(index));
        let transform = ParameterTransform::new(initial, &self.constraints, &fixed)?;
        let function = FitSpaceFunction {
            model: self.model,
            quotes: self.quotes,
            transform: &transform,
        };

        if transform.fit_dim() == 0 {
            debug!(model = self.model.name(), "every parameter fixed; evaluating only");
            return self.fixed_result(&function);
        }

        let lm = self.solver.solve_weighted(
            &function,
            self.quotes.volatilities(),
            self.quotes.errors(),
            transform.initial_fit(),
        )?;
        let result = self.to_model_space(&function, lm)?;

        if result.converged {
            info!(
                model = result.model,
                chi_square = result.chi_square,
                iterations = result.iterations,
                "smile calibration finished"
            );
        } else {
            warn!(
                model = result.model,
                chi_square = result.chi_square,
                iterations = result.iterations,
                "smile calibration did not converge"
            );
        }
        Ok(result)
    }

    fn check_len(&self, params: &[f64]) -> Result<(), CalibrationError> {
        let expected = self.model.n_params();
        if params.len() != expected {
            return Err(CalibrationError::configuration(format!(
                "{} expects {} parameters, got {}",
                self.model.name(),
                expected,
                params.len()
            )));
        }
        Ok(())
    }

    fn volatilities_at(&self, params: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        let data = self.model.to_data(params)?;
        self.model.volatilities(
            self.quotes.forward(),
            self.quotes.expiry(),
            self.quotes.strikes(),
            &data,
        )
    }

    fn fixed_result(
        &self,
        function: &FitSpaceFunction<'_, M>,
    ) -> Result<SmileFitResult, CalibrationError> {
        let params = function.model_params(&[])?;
        let values = self.volatilities_at(&params)?;
        let chi_square = chi_square(self.quotes, &values);
        let n = params.len();

        Ok(SmileFitResult {
            model: self.model.name(),
            parameter_names: self.model.parameter_names(),
            parameters: params,
            chi_square,
            covariance: vec![vec![0.0; n]; n],
            inverse_jacobian: vec![vec![0.0; self.quotes.len()]; n],
            iterations: 0,
            converged: true,
        })
    }

    /// Map fit-space solver output back through the chain-rule factors.
    fn to_model_space(
        &self,
        function: &FitSpaceFunction<'_, M>,
        lm: LMResult,
    ) -> Result<SmileFitResult, CalibrationError> {
        let transform = function.transform;
        let params = function.model_params(&lm.params)?;
        let derivatives = transform.model_derivatives(&lm.params)?;
        let free = transform.free_indices();
        let n = params.len();

        let mut covariance = vec![vec![0.0; n]; n];
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                covariance[i][j] = derivatives[a] * lm.covariance[a][b] * derivatives[b];
            }
        }

        let mut inverse_jacobian = vec![vec![0.0; self.quotes.len()]; n];
        for (a, &i) in free.iter().enumerate() {
            inverse_jacobian[i] = lm.inverse_jacobian[a]
                .iter()
                .map(|s| derivatives[a] * s)
                .collect();
        }

        // A range parameter stuck on its bound has not reached an optimum
        let saturated: Vec<usize> = free
            .iter()
            .zip(&lm.params)
            .filter(|&(&i, &y)| transform.constraints()[i].is_saturated(y))
            .map(|(&i, _)| i)
            .collect();
        if lm.converged && !saturated.is_empty() {
            debug!(?saturated, "solver stopped with parameters on their bounds");
        }

        Ok(SmileFitResult {
            model: self.model.name(),
            parameter_names: self.model.parameter_names(),
            parameters: params,
            chi_square: lm.chi_square,
            covariance,
            inverse_jacobian,
            iterations: lm.iterations,
            converged: lm.converged && saturated.is_empty(),
        })
    }
}

/// A smile model seen through a [`ParameterTransform`]: the function the
/// least-squares solver actually minimises.
///
/// Values are model volatilities at the quote strikes; the Jacobian, when
/// the model supplies one, is chained with `d model / d fit`.
#[derive(Debug)]
pub struct FitSpaceFunction<'a, M: SmileModel> {
    model: &'a M,
    quotes: &'a SmileQuotes,
    transform: &'a ParameterTransform,
}

impl<'a, M: SmileModel> FitSpaceFunction<'a, M> {
    /// Wrap `model` for the given quotes and transform.
    pub fn new(model: &'a M, quotes: &'a SmileQuotes, transform: &'a ParameterTransform) -> Self {
        Self {
            model,
            quotes,
            transform,
        }
    }

    /// Full model-space vector for a fit vector, pinned parameters resolved.
    pub fn model_params(&self, fit: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        let mut params = self.transform.to_model_space(fit)?;
        self.model
            .resolve(&mut params, self.quotes.forward(), self.quotes.expiry())?;
        Ok(params)
    }

    fn chain_rule(
        &self,
        fit: &[f64],
        rows: Vec<Vec<f64>>,
    ) -> Result<Vec<Vec<f64>>, CalibrationError> {
        let n = self.model.n_params();
        let derivatives = self.transform.model_derivatives(fit)?;
        let free = self.transform.free_indices();

        rows.into_iter()
            .map(|row| {
                let offset = row.len().checked_sub(n).ok_or_else(|| {
                    CalibrationError::configuration(format!(
                        "{} Jacobian row has {} columns, need at least {}",
                        self.model.name(),
                        row.len(),
                        n
                    ))
                })?;
                Ok(free
                    .iter()
                    .zip(&derivatives)
                    .map(|(&i, d)| row[offset + i] * d)
                    .collect())
            })
            .collect()
    }
}

impl<M: SmileModel> ModelFunction for FitSpaceFunction<'_, M> {
    type Error = CalibrationError;

    fn evaluate(&self, fit: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        let params = self.model_params(fit)?;
        let data = self.model.to_data(&params)?;
        self.model.volatilities(
            self.quotes.forward(),
            self.quotes.expiry(),
            self.quotes.strikes(),
            &data,
        )
    }

    fn jacobian(&self, fit: &[f64]) -> Option<Result<Vec<Vec<f64>>, CalibrationError>> {
        // Models that resolve pinned parameters report no Jacobian, so the
        // unresolved vector is enough here.
        let data = match self
            .transform
            .to_model_space(fit)
            .map_err(CalibrationError::from)
            .and_then(|params| self.model.to_data(&params))
        {
            Ok(data) => data,
            Err(e) => return Some(Err(e)),
        };
        let rows = self.model.volatility_jacobian(
            self.quotes.forward(),
            self.quotes.expiry(),
            self.quotes.strikes(),
            &data,
        )?;
        Some(rows.and_then(|rows| self.chain_rule(fit, rows)))
    }

    fn is_allowed(&self, fit: &[f64]) -> bool {
        match self.transform.to_model_space(fit) {
            Ok(params) => self.model.is_allowed(
                &params,
                self.quotes.forward(),
                self.quotes.expiry(),
                self.quotes.strikes(),
            ),
            Err(_) => false,
        }
    }
}

fn chi_square(quotes: &SmileQuotes, values: &[f64]) -> f64 {
    quotes
        .volatilities()
        .iter()
        .zip(values)
        .zip(quotes.errors())
        .map(|((y, f), e)| ((y - f) / e).powi(2))
        .sum()
}
