//! Bijection between bounded model space and unconstrained fit space.

use super::{FixedMask, ParameterConstraint};
use crate::types::TransformError;

/// Maps a model parameter vector to the unconstrained vector seen by the
/// optimiser, and back.
///
/// Fixed indices are absent from fit space: the fit vector has length
/// `model_dim - fixed.len()` and [`to_model_space`](Self::to_model_space)
/// always returns the construction-time value at fixed positions.
///
/// Only free parameters are checked against their constraints; a fixed
/// parameter may sit on a bound (e.g. SABR `beta = 0`).
///
/// # Example
///
/// ```
/// use smile_core::math::transforms::{FixedMask, ParameterConstraint, ParameterTransform};
///
/// let constraints = [
///     ParameterConstraint::positive(),         // alpha
///     ParameterConstraint::range(0.0, 2.0),    // beta
///     ParameterConstraint::range(-1.0, 1.0),   // rho
///     ParameterConstraint::positive(),         // nu
/// ];
/// let initial = [0.2, 0.5, -0.1, 0.4];
/// let transform =
///     ParameterTransform::new(&initial, &constraints, &FixedMask::from_indices([1])).unwrap();
///
/// assert_eq!(transform.fit_dim(), 3);
/// let fit = transform.to_fit_space(&initial).unwrap();
/// let back = transform.to_model_space(&fit).unwrap();
/// for (a, b) in back.iter().zip(&initial) {
///     assert!((a - b).abs() < 1e-14);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTransform {
    constraints: Vec<ParameterConstraint>,
    fixed: FixedMask,
    initial: Vec<f64>,
    free: Vec<usize>,
}

impl ParameterTransform {
    /// Build a transform from the initial model vector.
    ///
    /// # Errors
    ///
    /// * `TransformError::DimensionMismatch` - constraint table length differs
    ///   from the initial vector
    /// * `TransformError::FixedIndexOutOfRange` - a fixed index is too large
    /// * `TransformError::InvalidConstraint` - a free parameter's constraint is malformed
    /// * `TransformError::Infeasible` - a free initial value violates its constraint
    pub fn new(
        initial: &[f64],
        constraints: &[ParameterConstraint],
        fixed: &FixedMask,
    ) -> Result<Self, TransformError> {
        if constraints.len() != initial.len() {
            return Err(TransformError::DimensionMismatch {
                what: "constraint table".to_string(),
                expected: initial.len(),
                got: constraints.len(),
            });
        }
        if let Some(index) = fixed.max_index().filter(|&i| i >= initial.len()) {
            return Err(TransformError::FixedIndexOutOfRange {
                index,
                len: initial.len(),
            });
        }

        let free: Vec<usize> = (0..initial.len()).filter(|&i| !fixed.contains(i)).collect();
        for &i in &free {
            constraints[i].validate(i)?;
            check_feasible(i, initial[i], &constraints[i])?;
        }
        if let Some(i) = fixed.iter().find(|&i| !initial[i].is_finite()) {
            return Err(TransformError::Infeasible {
                index: i,
                value: initial[i],
                constraint: "finite".to_string(),
            });
        }

        Ok(Self {
            constraints: constraints.to_vec(),
            fixed: fixed.clone(),
            initial: initial.to_vec(),
            free,
        })
    }

    /// Length of the model vector.
    #[inline]
    pub fn model_dim(&self) -> usize {
        self.initial.len()
    }

    /// Length of the fit vector.
    #[inline]
    pub fn fit_dim(&self) -> usize {
        self.free.len()
    }

    /// Model indices present in fit space, in order.
    #[inline]
    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    /// The fixed mask the transform was built with.
    #[inline]
    pub fn fixed(&self) -> &FixedMask {
        &self.fixed
    }

    /// Per-parameter constraints.
    #[inline]
    pub fn constraints(&self) -> &[ParameterConstraint] {
        &self.constraints
    }

    /// Model vector captured at construction.
    #[inline]
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Fit-space image of the construction-time model vector.
    pub fn initial_fit(&self) -> Vec<f64> {
        self.free
            .iter()
            .map(|&i| self.constraints[i].to_fit(self.initial[i]))
            .collect()
    }

    /// Map a model vector into fit space, dropping fixed indices.
    ///
    /// Values at fixed indices are ignored.
    pub fn to_fit_space(&self, model: &[f64]) -> Result<Vec<f64>, TransformError> {
        if model.len() != self.model_dim() {
            return Err(TransformError::DimensionMismatch {
                what: "model vector".to_string(),
                expected: self.model_dim(),
                got: model.len(),
            });
        }
        self.free
            .iter()
            .map(|&i| {
                check_feasible(i, model[i], &self.constraints[i])?;
                Ok(self.constraints[i].to_fit(model[i]))
            })
            .collect()
    }

    /// Map a fit vector to a full model vector; fixed positions take their
    /// construction-time values.
    pub fn to_model_space(&self, fit: &[f64]) -> Result<Vec<f64>, TransformError> {
        self.check_fit_len(fit)?;
        let mut model = self.initial.clone();
        for (&i, &y) in self.free.iter().zip(fit) {
            model[i] = self.constraints[i].to_model(y);
        }
        Ok(model)
    }

    /// `d model_i / d fit_i` for every free index, in fit order.
    pub fn model_derivatives(&self, fit: &[f64]) -> Result<Vec<f64>, TransformError> {
        self.check_fit_len(fit)?;
        Ok(self
            .free
            .iter()
            .zip(fit)
            .map(|(&i, &y)| self.constraints[i].model_derivative(y))
            .collect())
    }

    fn check_fit_len(&self, fit: &[f64]) -> Result<(), TransformError> {
        if fit.len() != self.fit_dim() {
            return Err(TransformError::DimensionMismatch {
                what: "fit vector".to_string(),
                expected: self.fit_dim(),
                got: fit.len(),
            });
        }
        Ok(())
    }
}

fn check_feasible(
    index: usize,
    value: f64,
    constraint: &ParameterConstraint,
) -> Result<(), TransformError> {
    if constraint.is_feasible(value) {
        Ok(())
    } else {
        Err(TransformError::Infeasible {
            index,
            value,
            constraint: constraint.to_string(),
        })
    }
}
