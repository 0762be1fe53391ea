//! Levenberg-Marquardt weighted nonlinear least-squares solver.
//!
//! This module provides the [`LevenbergMarquardtSolver`] used to calibrate
//! smile models to market quotes.
//!
//! # Algorithm
//!
//! Given observations `y`, per-observation errors `σ` and a model `f(p)`:
//!
//! ```text
//! r = y - f(p)                  residuals
//! W = diag(1 / σ²)              weights
//! χ² = rᵀ W r
//! α = Jᵀ W J,  β = Jᵀ W r       J = ∂f/∂p
//! (α + λ·diag(α)) δ = β
//! p_{n+1} = p_n + δ
//! ```
//!
//! The damped system is solved through an SVD pseudo-inverse so that
//! rank-deficient problems still produce a step. A step is accepted only
//! when the trial point is admissible ([`ModelFunction::is_allowed`]),
//! finite, and lowers `χ²`; `λ` shrinks on acceptance and grows on
//! rejection.
//!
//! Because the damping is scaled by `diag(α)` the iterates do not change
//! when every error is multiplied by the same positive constant.
//!
//! # Example
//!
//! ```
//! use smile_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//!
//! // Fit y = a * exp(-b * x) to data
//! let x_data = vec![0.0, 1.0, 2.0, 3.0, 4.0];
//! let y_data = vec![1.0, 0.37, 0.14, 0.05, 0.02];
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//!
//! // Residual function: model(x) - y
//! let residuals = |params: &[f64]| -> Vec<f64> {
//!     let a = params[0];
//!     let b = params[1];
//!     x_data.iter().zip(&y_data).map(|(&x, &y)| {
//!         a * (-b * x).exp() - y
//!     }).collect()
//! };
//!
//! let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();
//! assert!(result.converged);
//! ```

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::types::SolverError;

/// A vector-valued model evaluated by the least-squares solver.
///
/// Implementors capture whatever state they need (quotes, transforms,
/// collaborators) in `self`; the solver only ever sees parameter slices.
pub trait ModelFunction {
    /// Error type surfaced by the model. Solver failures convert into it.
    type Error: From<SolverError>;

    /// Evaluate the model at `params`.
    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, Self::Error>;

    /// Analytic Jacobian `∂f_i/∂p_j` (rows = observations).
    ///
    /// Returning `None` makes the solver fall back to finite differences.
    fn jacobian(&self, params: &[f64]) -> Option<Result<Vec<Vec<f64>>, Self::Error>> {
        let _ = params;
        None
    }

    /// Admissibility of a trial point. Inadmissible trials are rejected
    /// exactly like trials that fail to lower `χ²`.
    fn is_allowed(&self, params: &[f64]) -> bool {
        let _ = params;
        true
    }
}

/// Finite-difference scheme for Jacobians the model does not supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FiniteDifference {
    /// `(f(p + h) - f(p)) / h`
    Forward,
    /// `(f(p + h) - f(p - h)) / 2h`, falling back to one-sided
    /// differences when a bumped point is inadmissible.
    Central,
}

/// Configuration for Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LMConfig {
    /// Convergence tolerance for the relative decrease of `χ²`.
    pub tolerance: f64,
    /// Maximum number of iterations (trial steps).
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor. Reaching it stops the solve unconverged.
    pub max_lambda: f64,
    /// Tolerance for the step norm relative to the parameter norm.
    pub param_tolerance: f64,
    /// Relative singular-value cutoff for the pseudo-inverse.
    pub svd_cutoff: f64,
    /// Relative bump size for finite-difference Jacobians.
    pub fd_step: f64,
    /// Finite-difference scheme.
    pub finite_difference: FiniteDifference,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            param_tolerance: 1e-10,
            svd_cutoff: 1e-14,
            fd_step: 1e-6,
            finite_difference: FiniteDifference::Central,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
            param_tolerance: 1e-8,
            finite_difference: FiniteDifference::Forward,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            param_tolerance: 1e-14,
            ..Default::default()
        }
    }

    /// Check the configuration for unusable values.
    pub fn validate(&self) -> Result<(), SolverError> {
        let positive = [
            ("tolerance", self.tolerance),
            ("initial_lambda", self.initial_lambda),
            ("min_lambda", self.min_lambda),
            ("max_lambda", self.max_lambda),
            ("param_tolerance", self.param_tolerance),
            ("svd_cutoff", self.svd_cutoff),
            ("fd_step", self.fd_step),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SolverError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "max_iterations must be > 0".to_string(),
            ));
        }
        if !(self.lambda_up > 1.0) || !(self.lambda_down > 0.0 && self.lambda_down < 1.0) {
            return Err(SolverError::InvalidInput(
                "lambda_up must exceed 1 and lambda_down must lie in (0, 1)".to_string(),
            ));
        }
        if self.min_lambda > self.max_lambda {
            return Err(SolverError::InvalidInput(
                "min_lambda must not exceed max_lambda".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final optimized parameters.
    pub params: Vec<f64>,
    /// Final weighted sum of squared residuals.
    pub chi_square: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether convergence was achieved.
    pub converged: bool,
    /// Final lambda value.
    pub final_lambda: f64,
    /// `(Jᵀ W J)⁺` at the final point (parameters × parameters).
    pub covariance: Vec<Vec<f64>>,
    /// `(Jᵀ W J)⁺ Jᵀ W` at the final point (parameters × observations):
    /// first-order sensitivity of the fitted parameters to each observation.
    pub inverse_jacobian: Vec<Vec<f64>>,
}

impl LMResult {
    /// Create a new LM result without covariance information.
    pub fn new(
        params: Vec<f64>,
        chi_square: f64,
        iterations: usize,
        converged: bool,
        final_lambda: f64,
    ) -> Self {
        Self {
            params,
            chi_square,
            iterations,
            converged,
            final_lambda,
            covariance: Vec::new(),
            inverse_jacobian: Vec::new(),
        }
    }

    /// Attach covariance and inverse Jacobian.
    pub fn with_covariance(
        mut self,
        covariance: Vec<Vec<f64>>,
        inverse_jacobian: Vec<Vec<f64>>,
    ) -> Self {
        self.covariance = covariance;
        self.inverse_jacobian = inverse_jacobian;
        self
    }

    /// Get the root mean square of the weighted residuals.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.chi_square / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Stateless apart from its configuration; every call to
/// [`solve_weighted`](Self::solve_weighted) owns its iteration state, so one
/// solver may be shared across threads.
///
/// # Example
///
/// ```
/// use smile_core::math::solvers::{LevenbergMarquardtSolver, LMConfig, LMResult};
///
/// let solver = LevenbergMarquardtSolver::new(LMConfig::default());
///
/// // Simple quadratic: minimize (p[0] - 2)^2 + (p[1] - 3)^2
/// let residuals = |params: &[f64]| -> Vec<f64> {
///     vec![params[0] - 2.0, params[1] - 3.0]
/// };
///
/// let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
/// assert!(result.converged);
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// assert!((result.params[1] - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LMConfig::default(),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Minimise `Σ residuals(p)²` with unit weights.
    ///
    /// # Arguments
    ///
    /// * `residuals` - Function that computes residuals given parameters
    /// * `initial_params` - Initial parameter guess
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        if initial_params.is_empty() {
            return Err(SolverError::InvalidInput(
                "Empty parameter vector".to_string(),
            ));
        }
        let n_residuals = residuals(&initial_params).len();
        if n_residuals == 0 {
            return Err(SolverError::InvalidInput(
                "Empty residual vector".to_string(),
            ));
        }
        let observed = vec![0.0; n_residuals];
        let errors = vec![1.0; n_residuals];
        let model = NegatedResiduals(residuals);
        self.solve_weighted(&model, &observed, &errors, initial_params)
    }

    /// Minimise `χ² = Σ ((observed_i - model_i(p)) / error_i)²`.
    ///
    /// # Errors
    ///
    /// * `SolverError::InvalidInput` / `DimensionMismatch` - malformed inputs,
    ///   non-positive errors, or an inadmissible initial point
    /// * `SolverError::NumericalInstability` - non-finite model output at the
    ///   initial point, or a normal matrix that cannot be pseudo-inverted
    /// * any error returned by the model itself
    ///
    /// Hitting `max_iterations` or `max_lambda`, or a step that vanishes
    /// while `χ²` is still moving, is not an error: the best point is
    /// returned with `converged == false`.
    pub fn solve_weighted<M>(
        &self,
        model: &M,
        observed: &[f64],
        errors: &[f64],
        initial_params: Vec<f64>,
    ) -> Result<LMResult, M::Error>
    where
        M: ModelFunction + ?Sized,
    {
        self.config.validate()?;
        let weights = validate_inputs(observed, errors, &initial_params)?;
        if !model.is_allowed(&initial_params) {
            return Err(SolverError::InvalidInput(
                "initial parameters rejected by the model's feasibility predicate".to_string(),
            )
            .into());
        }

        let mut params = initial_params;
        let mut values = model.evaluate(&params)?;
        check_model_output(&values, observed.len())?;
        let mut chi2 = chi_square(observed, &values, &weights);
        if !chi2.is_finite() {
            return Err(SolverError::NumericalInstability(
                "model is not finite at the initial parameters".to_string(),
            )
            .into());
        }

        let mut jacobian = self.jacobian(model, &params, &values)?;
        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;
        let mut converged = false;
        // Relative χ² decrease of the most recent accepted step.
        let mut last_decrease: Option<f64> = None;

        while iterations < self.config.max_iterations {
            if chi2.sqrt() < self.config.tolerance {
                converged = true;
                break;
            }
            iterations += 1;

            let (alpha, beta) = normal_equations(&jacobian, observed, &values, &weights);
            let delta = solve_damped(&alpha, &beta, lambda, self.config.svd_cutoff)?;

            let step_norm = norm(&delta);
            let param_norm = norm(&params).max(1.0);
            if step_norm / param_norm < self.config.param_tolerance {
                // A vanishing step only counts once χ² has settled too.
                converged = last_decrease.is_some_and(|d| d < self.config.tolerance.sqrt());
                if !converged {
                    debug!(
                        iterations,
                        chi_square = chi2,
                        lambda,
                        "LM step vanished before χ² settled"
                    );
                }
                break;
            }

            let trial: Vec<f64> = params.iter().zip(&delta).map(|(p, d)| p + d).collect();
            let outcome = self.try_point(model, &trial, observed, &weights)?;

            match outcome {
                Some((trial_values, trial_chi2)) if trial_chi2 < chi2 => {
                    let relative_decrease = (chi2 - trial_chi2) / chi2;
                    params = trial;
                    values = trial_values;
                    chi2 = trial_chi2;
                    last_decrease = Some(relative_decrease);
                    lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                    debug!(iterations, chi_square = chi2, lambda, "LM step accepted");

                    jacobian = self.jacobian(model, &params, &values)?;
                    if relative_decrease < self.config.tolerance
                        && step_norm / param_norm < self.config.param_tolerance.sqrt()
                    {
                        converged = true;
                        break;
                    }
                }
                _ => {
                    lambda *= self.config.lambda_up;
                    trace!(iterations, lambda, "LM step rejected");
                    if lambda >= self.config.max_lambda {
                        lambda = self.config.max_lambda;
                        debug!(iterations, chi_square = chi2, "LM damping saturated");
                        break;
                    }
                }
            }
        }

        if !converged && iterations >= self.config.max_iterations {
            debug!(
                iterations,
                chi_square = chi2,
                "LM stopped at the iteration limit"
            );
        }

        let (covariance, inverse_jacobian) =
            covariance_and_inverse_jacobian(&jacobian, &weights, self.config.svd_cutoff)?;

        Ok(
            LMResult::new(params, chi2, iterations, converged, lambda)
                .with_covariance(covariance, inverse_jacobian),
        )
    }

    /// Evaluate a trial point. `None` means the point is inadmissible or
    /// produced non-finite output.
    fn try_point<M>(
        &self,
        model: &M,
        trial: &[f64],
        observed: &[f64],
        weights: &[f64],
    ) -> Result<Option<(Vec<f64>, f64)>, M::Error>
    where
        M: ModelFunction + ?Sized,
    {
        if !trial.iter().all(|p| p.is_finite()) || !model.is_allowed(trial) {
            return Ok(None);
        }
        let values = model.evaluate(trial)?;
        check_model_output(&values, observed.len())?;
        let chi2 = chi_square(observed, &values, weights);
        if chi2.is_finite() {
            Ok(Some((values, chi2)))
        } else {
            Ok(None)
        }
    }

    fn jacobian<M>(
        &self,
        model: &M,
        params: &[f64],
        values: &[f64],
    ) -> Result<Vec<Vec<f64>>, M::Error>
    where
        M: ModelFunction + ?Sized,
    {
        if let Some(analytic) = model.jacobian(params) {
            let jacobian = analytic?;
            check_jacobian_shape(&jacobian, values.len(), params.len())?;
            return Ok(jacobian);
        }
        self.finite_difference_jacobian(model, params, values)
    }

    fn finite_difference_jacobian<M>(
        &self,
        model: &M,
        params: &[f64],
        values: &[f64],
    ) -> Result<Vec<Vec<f64>>, M::Error>
    where
        M: ModelFunction + ?Sized,
    {
        let n_params = params.len();
        let n_obs = values.len();
        let mut jacobian = vec![vec![0.0; n_params]; n_obs];

        for j in 0..n_params {
            let h = self.config.fd_step * params[j].abs().max(1.0);

            let mut bumped_up = params.to_vec();
            bumped_up[j] += h;
            let up = self.bumped_values(model, &bumped_up, n_obs)?;

            let down = match self.config.finite_difference {
                FiniteDifference::Central => {
                    let mut bumped_down = params.to_vec();
                    bumped_down[j] -= h;
                    self.bumped_values(model, &bumped_down, n_obs)?
                }
                FiniteDifference::Forward if up.is_none() => {
                    let mut bumped_down = params.to_vec();
                    bumped_down[j] -= h;
                    self.bumped_values(model, &bumped_down, n_obs)?
                }
                FiniteDifference::Forward => None,
            };

            for i in 0..n_obs {
                jacobian[i][j] = match (&up, &down) {
                    (Some(u), Some(d)) => (u[i] - d[i]) / (2.0 * h),
                    (Some(u), None) => (u[i] - values[i]) / h,
                    (None, Some(d)) => (values[i] - d[i]) / h,
                    (None, None) => {
                        return Err(SolverError::NumericalInstability(format!(
                            "cannot differentiate parameter {}: both bumped points are inadmissible",
                            j
                        ))
                        .into())
                    }
                };
            }
        }

        Ok(jacobian)
    }

    fn bumped_values<M>(
        &self,
        model: &M,
        params: &[f64],
        n_obs: usize,
    ) -> Result<Option<Vec<f64>>, M::Error>
    where
        M: ModelFunction + ?Sized,
    {
        if !model.is_allowed(params) {
            return Ok(None);
        }
        let values = model.evaluate(params)?;
        check_model_output(&values, n_obs)?;
        if values.iter().all(|v| v.is_finite()) {
            Ok(Some(values))
        } else {
            Ok(None)
        }
    }
}

/// Adapts a plain residual closure: observed = 0, model = -residual.
struct NegatedResiduals<F>(F);

impl<F> ModelFunction for NegatedResiduals<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    type Error = SolverError;

    fn evaluate(&self, params: &[f64]) -> Result<Vec<f64>, SolverError> {
        Ok((self.0)(params).into_iter().map(|r| -r).collect())
    }
}

fn validate_inputs(
    observed: &[f64],
    errors: &[f64],
    initial_params: &[f64],
) -> Result<Vec<f64>, SolverError> {
    if initial_params.is_empty() {
        return Err(SolverError::InvalidInput(
            "Empty parameter vector".to_string(),
        ));
    }
    if let Some(p) = initial_params.iter().find(|p| !p.is_finite()) {
        return Err(SolverError::InvalidInput(format!(
            "initial parameters must be finite, got {}",
            p
        )));
    }
    if observed.is_empty() {
        return Err(SolverError::InvalidInput(
            "Empty observation vector".to_string(),
        ));
    }
    if errors.len() != observed.len() {
        return Err(SolverError::DimensionMismatch {
            what: "errors".to_string(),
            expected: observed.len(),
            got: errors.len(),
        });
    }
    if let Some(y) = observed.iter().find(|y| !y.is_finite()) {
        return Err(SolverError::InvalidInput(format!(
            "observations must be finite, got {}",
            y
        )));
    }
    errors
        .iter()
        .map(|&e| {
            if e > 0.0 && e.is_finite() {
                Ok(1.0 / (e * e))
            } else {
                Err(SolverError::InvalidInput(format!(
                    "errors must be positive and finite, got {}",
                    e
                )))
            }
        })
        .collect()
}

fn check_model_output(values: &[f64], n_obs: usize) -> Result<(), SolverError> {
    if values.len() != n_obs {
        return Err(SolverError::DimensionMismatch {
            what: "model output".to_string(),
            expected: n_obs,
            got: values.len(),
        });
    }
    Ok(())
}

fn check_jacobian_shape(
    jacobian: &[Vec<f64>],
    n_obs: usize,
    n_params: usize,
) -> Result<(), SolverError> {
    if jacobian.len() != n_obs {
        return Err(SolverError::DimensionMismatch {
            what: "jacobian rows".to_string(),
            expected: n_obs,
            got: jacobian.len(),
        });
    }
    if let Some(row) = jacobian.iter().find(|row| row.len() != n_params) {
        return Err(SolverError::DimensionMismatch {
            what: "jacobian columns".to_string(),
            expected: n_params,
            got: row.len(),
        });
    }
    Ok(())
}

#[inline]
fn chi_square(observed: &[f64], values: &[f64], weights: &[f64]) -> f64 {
    observed
        .iter()
        .zip(values)
        .zip(weights)
        .map(|((y, f), w)| w * (y - f) * (y - f))
        .sum()
}

#[inline]
fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Build `α = Jᵀ W J` and `β = Jᵀ W r`.
fn normal_equations(
    jacobian: &[Vec<f64>],
    observed: &[f64],
    values: &[f64],
    weights: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n_obs = observed.len();
    let n_params = jacobian.first().map_or(0, Vec::len);
    let j = DMatrix::from_fn(n_obs, n_params, |i, k| jacobian[i][k]);
    let w = DVector::from_fn(n_obs, |i, _| weights[i]);
    let r = DVector::from_fn(n_obs, |i, _| observed[i] - values[i]);

    let wj = DMatrix::from_fn(n_obs, n_params, |i, k| w[i] * j[(i, k)]);
    let alpha = j.transpose() * &wj;
    let beta = wj.transpose() * r;
    (alpha, beta)
}

/// Solve `(α + λ·diag(α)) δ = β` through an SVD pseudo-inverse.
fn solve_damped(
    alpha: &DMatrix<f64>,
    beta: &DVector<f64>,
    lambda: f64,
    cutoff: f64,
) -> Result<Vec<f64>, SolverError> {
    let mut damped = alpha.clone();
    for i in 0..damped.nrows() {
        damped[(i, i)] += lambda * alpha[(i, i)];
    }
    if damped.iter().any(|v| !v.is_finite()) || beta.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::NumericalInstability(
            "normal equations contain non-finite entries".to_string(),
        ));
    }

    let svd = damped.svd(true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    if !(max_sv > 0.0) {
        return Err(SolverError::NumericalInstability(
            "normal matrix is identically zero: model does not depend on its parameters"
                .to_string(),
        ));
    }
    let delta = svd
        .solve(beta, cutoff * max_sv)
        .map_err(|e| SolverError::NumericalInstability(e.to_string()))?;
    Ok(delta.iter().copied().collect())
}

fn covariance_and_inverse_jacobian(
    jacobian: &[Vec<f64>],
    weights: &[f64],
    cutoff: f64,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), SolverError> {
    let n_obs = weights.len();
    let n_params = jacobian.first().map_or(0, Vec::len);
    let wj = DMatrix::from_fn(n_obs, n_params, |i, k| weights[i] * jacobian[i][k]);
    let j = DMatrix::from_fn(n_obs, n_params, |i, k| jacobian[i][k]);
    let alpha = j.transpose() * &wj;
    if alpha.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::NumericalInstability(
            "covariance matrix contains non-finite entries".to_string(),
        ));
    }

    let svd = alpha.svd(true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let covariance = if max_sv > 0.0 {
        svd.pseudo_inverse(cutoff * max_sv)
            .map_err(|e| SolverError::NumericalInstability(e.to_string()))?
    } else {
        DMatrix::zeros(n_params, n_params)
    };
    let inverse_jacobian = &covariance * wj.transpose();

    Ok((to_rows(&covariance), to_rows(&inverse_jacobian)))
}

fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|k| m[(i, k)]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// y = a·exp(-b·x) sampled on fixed abscissae.
    struct Exponential {
        xs: Vec<f64>,
    }

    impl ModelFunction for Exponential {
        type Error = SolverError;

        fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
            Ok(self.xs.iter().map(|x| p[0] * (-p[1] * x).exp()).collect())
        }
    }

    /// Same model with an analytic Jacobian.
    struct ExponentialWithJacobian {
        xs: Vec<f64>,
    }

    impl ModelFunction for ExponentialWithJacobian {
        type Error = SolverError;

        fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
            Ok(self.xs.iter().map(|x| p[0] * (-p[1] * x).exp()).collect())
        }

        fn jacobian(&self, p: &[f64]) -> Option<Result<Vec<Vec<f64>>, SolverError>> {
            Some(Ok(self
                .xs
                .iter()
                .map(|x| {
                    let e = (-p[1] * x).exp();
                    vec![e, -p[0] * x * e]
                })
                .collect()))
        }
    }

    /// Linear model restricted to p[0] <= 1.
    struct Capped;

    impl ModelFunction for Capped {
        type Error = SolverError;

        fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
            Ok(vec![p[0], p[0]])
        }

        fn is_allowed(&self, p: &[f64]) -> bool {
            p[0] <= 1.0
        }
    }

    fn exp_data() -> (Vec<f64>, Vec<f64>) {
        let xs = vec![0.0, 0.5, 1.0, 1.5, 2.0, 3.0];
        let ys = xs.iter().map(|x: &f64| 2.0 * (-0.7 * x).exp()).collect();
        (xs, ys)
    }

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_config_default() {
        let config = LMConfig::default();
        assert!((config.tolerance - 1e-10).abs() < 1e-15);
        assert_eq!(config.max_iterations, 200);
        assert_eq!(config.finite_difference, FiniteDifference::Central);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_presets() {
        assert!(LMConfig::fast().tolerance > 1e-8);
        assert!(LMConfig::high_precision().tolerance < 1e-12);
        assert!(LMConfig::fast().validate().is_ok());
        assert!(LMConfig::high_precision().validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_bad_lambda_factors() {
        let config = LMConfig {
            lambda_up: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LMConfig {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    // ========================================
    // LMResult Tests
    // ========================================

    #[test]
    fn test_result_rmse() {
        let result = LMResult::new(vec![1.0], 4.0, 10, true, 1e-5);
        assert!((result.rmse(4) - 1.0).abs() < 1e-10);
        assert_eq!(result.rmse(0), 0.0);
        assert!(result.covariance.is_empty());
    }

    // ========================================
    // Unweighted solve (residual closure)
    // ========================================

    #[test]
    fn test_solve_simple_linear() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 2.0, p[1] - 3.0] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![0.0, 0.0])
            .unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_solve_rosenbrock() {
        let residuals =
            |p: &[f64]| -> Vec<f64> { vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![-1.2, 1.0])
            .unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_already_optimal() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 5.0] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![5.0])
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solve_empty_params() {
        let residuals = |_p: &[f64]| -> Vec<f64> { vec![1.0] };
        let result = LevenbergMarquardtSolver::with_defaults().solve(residuals, vec![]);
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }

    // ========================================
    // Weighted solve
    // ========================================

    #[test]
    fn test_weighted_recovers_exponential() {
        let (xs, ys) = exp_data();
        let errors = vec![0.01; ys.len()];
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve_weighted(&Exponential { xs }, &ys, &errors, vec![1.0, 1.0])
            .unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(result.params[1], 0.7, epsilon = 1e-8);
        assert!(result.chi_square < 1e-12);
    }

    #[test]
    fn test_analytic_jacobian_matches_finite_difference() {
        let (xs, ys) = exp_data();
        let errors = vec![0.01; ys.len()];
        let solver = LevenbergMarquardtSolver::with_defaults();
        let fd = solver
            .solve_weighted(&Exponential { xs: xs.clone() }, &ys, &errors, vec![1.0, 1.0])
            .unwrap();
        let analytic = solver
            .solve_weighted(&ExponentialWithJacobian { xs }, &ys, &errors, vec![1.0, 1.0])
            .unwrap();

        assert_relative_eq!(fd.params[0], analytic.params[0], epsilon = 1e-8);
        assert_relative_eq!(fd.params[1], analytic.params[1], epsilon = 1e-8);
    }

    #[test]
    fn test_forward_difference_scheme() {
        let (xs, ys) = exp_data();
        let errors = vec![0.01; ys.len()];
        let solver = LevenbergMarquardtSolver::new(LMConfig {
            finite_difference: FiniteDifference::Forward,
            ..Default::default()
        });
        let result = solver
            .solve_weighted(&Exponential { xs }, &ys, &errors, vec![1.0, 1.0])
            .unwrap();
        assert_relative_eq!(result.params[1], 0.7, epsilon = 1e-7);
    }

    #[test]
    fn test_error_rescaling_invariance() {
        // Data that cannot be fitted exactly
        let xs = vec![0.0, 0.5, 1.0, 1.5, 2.0, 3.0];
        let ys = vec![2.02, 1.39, 0.98, 0.71, 0.49, 0.24];
        let errors = vec![0.01, 0.02, 0.01, 0.03, 0.02, 0.01];
        let scaled: Vec<f64> = errors.iter().map(|e| e * 37.0).collect();

        let solver = LevenbergMarquardtSolver::with_defaults();
        let model = Exponential { xs };
        let a = solver.solve_weighted(&model, &ys, &errors, vec![1.0, 1.0]).unwrap();
        let b = solver.solve_weighted(&model, &ys, &scaled, vec![1.0, 1.0]).unwrap();

        assert_relative_eq!(a.params[0], b.params[0], epsilon = 1e-7);
        assert_relative_eq!(a.params[1], b.params[1], epsilon = 1e-7);
        assert_relative_eq!(a.chi_square, b.chi_square * 37.0 * 37.0, max_relative = 1e-6);
    }

    #[test]
    fn test_feasibility_predicate_blocks_steps() {
        // Unconstrained optimum is p = 3, but the model only admits p <= 1
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve_weighted(&Capped, &[3.0, 3.0], &[1.0, 1.0], vec![0.0])
            .unwrap();
        assert!(result.params[0] <= 1.0);
        assert!(result.params[0] > 0.9);
    }

    #[test]
    fn test_stalled_solve_is_not_converged() {
        // Every trial point is inadmissible, so no step is ever accepted
        struct Pinned;
        impl ModelFunction for Pinned {
            type Error = SolverError;
            fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
                Ok(vec![p[0], p[0]])
            }
            fn is_allowed(&self, p: &[f64]) -> bool {
                p[0] == 0.0
            }
        }

        let result = LevenbergMarquardtSolver::with_defaults()
            .solve_weighted(&Pinned, &[1.0, 1.0], &[1.0, 1.0], vec![0.0])
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.params[0], 0.0);
        assert_relative_eq!(result.chi_square, 2.0);
    }

    #[test]
    fn test_damping_saturation_is_not_converged() {
        let config = LMConfig {
            max_lambda: 1.0,
            param_tolerance: 1e-300,
            ..Default::default()
        };
        let result = LevenbergMarquardtSolver::new(config)
            .solve_weighted(&Capped, &[3.0, 3.0], &[1.0, 1.0], vec![1.0])
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.final_lambda, 1.0);
    }

    #[test]
    fn test_inexact_fit_converges_at_minimum() {
        let xs = vec![0.0, 0.5, 1.0, 1.5, 2.0, 3.0];
        let ys = vec![2.02, 1.39, 0.98, 0.71, 0.49, 0.24];
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve_weighted(&Exponential { xs }, &ys, &[0.01; 6], vec![1.0, 1.0])
            .unwrap();
        assert!(result.converged);
        assert!(result.chi_square > 1.0);
    }

    #[test]
    fn test_inadmissible_initial_point() {
        let result = LevenbergMarquardtSolver::with_defaults().solve_weighted(
            &Capped,
            &[3.0, 3.0],
            &[1.0, 1.0],
            vec![2.0],
        );
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_bad_errors() {
        let (xs, ys) = exp_data();
        let model = Exponential { xs };
        let solver = LevenbergMarquardtSolver::with_defaults();

        let mut errors = vec![0.01; ys.len()];
        errors[2] = 0.0;
        assert!(solver
            .solve_weighted(&model, &ys, &errors, vec![1.0, 1.0])
            .is_err());

        let short = vec![0.01; ys.len() - 1];
        assert!(matches!(
            solver.solve_weighted(&model, &ys, &short, vec![1.0, 1.0]),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_model_output_length_mismatch() {
        let model = Exponential { xs: vec![0.0, 1.0] };
        let result = LevenbergMarquardtSolver::with_defaults().solve_weighted(
            &model,
            &[1.0, 2.0, 3.0],
            &[1.0, 1.0, 1.0],
            vec![1.0, 1.0],
        );
        assert!(matches!(result, Err(SolverError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_constant_model_is_numerical_failure() {
        let residuals = |_p: &[f64]| -> Vec<f64> { vec![1.0, 2.0] };
        let result = LevenbergMarquardtSolver::with_defaults().solve(residuals, vec![0.5]);
        assert!(matches!(result, Err(SolverError::NumericalInstability(_))));
    }

    #[test]
    fn test_max_iterations_reported_not_fatal() {
        let residuals =
            |p: &[f64]| -> Vec<f64> { vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]] };
        let solver = LevenbergMarquardtSolver::new(LMConfig {
            max_iterations: 2,
            ..Default::default()
        });
        let result = solver.solve(residuals, vec![-1.2, 1.0]).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn test_rank_deficient_problem_still_solves() {
        // Only p[0] + p[1] is identified
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] + p[1] - 1.0, 2.0 * (p[0] + p[1]) - 2.0] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![0.0, 0.0])
            .unwrap();
        assert_relative_eq!(result.params[0] + result.params[1], 1.0, epsilon = 1e-8);
    }

    // ========================================
    // Covariance Tests
    // ========================================

    #[test]
    fn test_linear_covariance_matches_closed_form() {
        // f(p) = p for two observations of one parameter with errors 1 and 2:
        // JᵀWJ = 1 + 1/4, so the variance is 0.8
        struct Constant;
        impl ModelFunction for Constant {
            type Error = SolverError;
            fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
                Ok(vec![p[0], p[0]])
            }
        }

        let result = LevenbergMarquardtSolver::with_defaults()
            .solve_weighted(&Constant, &[1.0, 2.0], &[1.0, 2.0], vec![0.0])
            .unwrap();

        // Weighted mean: (1·1 + 2·0.25) / 1.25 = 1.2
        assert_relative_eq!(result.params[0], 1.2, epsilon = 1e-8);
        assert_relative_eq!(result.covariance[0][0], 0.8, epsilon = 1e-6);
        // dp/dy_i = w_i / Σw
        assert_relative_eq!(result.inverse_jacobian[0][0], 0.8, epsilon = 1e-6);
        assert_relative_eq!(result.inverse_jacobian[0][1], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_solver_clone_debug() {
        let solver = LevenbergMarquardtSolver::with_defaults();
        let cloned = solver.clone();
        assert_eq!(solver.config(), cloned.config());
        assert!(format!("{:?}", solver).contains("LevenbergMarquardtSolver"));
    }
}
