//! Per-parameter constraints and their fit-space maps.

use std::fmt;

use crate::types::TransformError;

/// Constraint on a single model parameter.
///
/// Each variant carries a bijection between the admissible model-space
/// interval and the whole real line:
///
/// | Constraint       | fit from model                 | model from fit                 |
/// |------------------|--------------------------------|--------------------------------|
/// | `Unconstrained`  | `m`                            | `y`                            |
/// | `GreaterThan(L)` | `ln(m - L)`                    | `L + exp(y)`                   |
/// | `Range(L, U)`    | `ln((m - L) / (U - m))`        | `L + (U - L) / (1 + exp(-y))`  |
///
/// Bounds are exclusive: the maps never reach `L` or `U`.
///
/// # Example
///
/// ```
/// use smile_core::math::transforms::ParameterConstraint;
///
/// let rho = ParameterConstraint::range(-1.0, 1.0);
/// let y = rho.to_fit(-0.3);
/// assert!((rho.to_model(y) + 0.3).abs() < 1e-14);
/// assert!(!rho.is_feasible(1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterConstraint {
    /// Any real value.
    Unconstrained,
    /// Strictly greater than the bound.
    GreaterThan(f64),
    /// Strictly inside `(lower, upper)`.
    Range {
        /// Lower bound (exclusive)
        lower: f64,
        /// Upper bound (exclusive)
        upper: f64,
    },
}

impl ParameterConstraint {
    /// `x > lower`.
    pub fn greater_than(lower: f64) -> Self {
        ParameterConstraint::GreaterThan(lower)
    }

    /// `x > 0`.
    pub fn positive() -> Self {
        ParameterConstraint::GreaterThan(0.0)
    }

    /// `lower < x < upper`.
    pub fn range(lower: f64, upper: f64) -> Self {
        ParameterConstraint::Range { lower, upper }
    }

    /// Whether `value` lies strictly inside the admissible set.
    pub fn is_feasible(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            ParameterConstraint::Unconstrained => true,
            ParameterConstraint::GreaterThan(lower) => value > lower,
            ParameterConstraint::Range { lower, upper } => value > lower && value < upper,
        }
    }

    /// Check the bounds themselves.
    pub fn validate(&self, index: usize) -> Result<(), TransformError> {
        match *self {
            ParameterConstraint::Unconstrained => Ok(()),
            ParameterConstraint::GreaterThan(lower) if lower.is_finite() => Ok(()),
            ParameterConstraint::GreaterThan(lower) => Err(TransformError::InvalidConstraint {
                index,
                reason: format!("lower bound must be finite, got {}", lower),
            }),
            ParameterConstraint::Range { lower, upper }
                if lower.is_finite() && upper.is_finite() && lower < upper =>
            {
                Ok(())
            }
            ParameterConstraint::Range { lower, upper } => Err(TransformError::InvalidConstraint {
                index,
                reason: format!("range ({}, {}) is empty or unbounded", lower, upper),
            }),
        }
    }

    /// Map a feasible model-space value to fit space.
    ///
    /// Infeasible input yields a non-finite result; callers check
    /// [`is_feasible`](Self::is_feasible) first.
    #[inline]
    pub fn to_fit(&self, model: f64) -> f64 {
        match *self {
            ParameterConstraint::Unconstrained => model,
            ParameterConstraint::GreaterThan(lower) => (model - lower).ln(),
            ParameterConstraint::Range { lower, upper } => {
                ((model - lower) / (upper - model)).ln()
            }
        }
    }

    /// Map any fit-space value into the admissible set.
    ///
    /// Far in the tails the exact map rounds onto a bound; the result is
    /// then clamped to the nearest representable value strictly inside.
    #[inline]
    pub fn to_model(&self, fit: f64) -> f64 {
        match *self {
            ParameterConstraint::Unconstrained => fit,
            ParameterConstraint::GreaterThan(lower) => {
                (lower + fit.exp()).clamp(next_up(lower), f64::MAX)
            }
            ParameterConstraint::Range { lower, upper } => {
                let m = lower + (upper - lower) / (1.0 + (-fit).exp());
                m.clamp(next_up(lower), next_down(upper))
            }
        }
    }

    /// Whether `fit` lies so far out that the map is flat there.
    ///
    /// Only a `Range` saturates: its slope falls below `1e-13` of the
    /// interval width once `|fit| > 30`, and the solver cannot come back.
    #[inline]
    pub fn is_saturated(&self, fit: f64) -> bool {
        match *self {
            ParameterConstraint::Range { .. } => fit.abs() > RANGE_SATURATION,
            _ => false,
        }
    }

    /// `d model / d fit` evaluated at fit-space value `fit`.
    #[inline]
    pub fn model_derivative(&self, fit: f64) -> f64 {
        match *self {
            ParameterConstraint::Unconstrained => 1.0,
            ParameterConstraint::GreaterThan(_) => fit.exp(),
            ParameterConstraint::Range { lower, upper } => {
                let m = self.to_model(fit);
                (m - lower) * (upper - m) / (upper - lower)
            }
        }
    }
}

/// Fit-space magnitude beyond which a `Range` map is flat.
const RANGE_SATURATION: f64 = 30.0;

/// Smallest `f64` greater than `x` (finite `x`).
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Largest `f64` smaller than `x` (finite `x`).
fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

impl fmt::Display for ParameterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterConstraint::Unconstrained => write!(f, "unconstrained"),
            ParameterConstraint::GreaterThan(lower) => write!(f, "x > {}", lower),
            ParameterConstraint::Range { lower, upper } => write!(f, "{} < x < {}", lower, upper),
        }
    }
}
