//! Outward bracket search for 1-D root finding.

use super::BracketConfig;
use crate::types::SolverError;

/// Expands an initial interval until the objective changes sign.
///
/// At each step the endpoint whose `|f|` is smaller moves outward by
/// `expansion_factor × width`, clamped to the optional domain limits.
/// Once an endpoint sits on its limit only the other endpoint moves.
///
/// # Example
///
/// ```
/// use smile_core::math::solvers::{BracketRoot, BrentSolver, SolverConfig};
///
/// let f = |x: f64| x - 10.0;
/// let (lo, hi) = BracketRoot::with_defaults().bracket(f, 0.5, 2.0).unwrap();
/// assert!(f(lo) * f(hi) <= 0.0);
///
/// let root = BrentSolver::new(SolverConfig::default()).find_root(f, lo, hi).unwrap();
/// assert!((root - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BracketRoot {
    config: BracketConfig,
}

impl BracketRoot {
    /// Create a bracket search with the given configuration.
    pub fn new(config: BracketConfig) -> Self {
        Self { config }
    }

    /// Create a bracket search with factor 1.6 and 50 steps.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    /// Bracket a root of `f` starting from `[lower, upper]` with no domain limits.
    pub fn bracket<F>(&self, f: F, lower: f64, upper: f64) -> Result<(f64, f64), SolverError>
    where
        F: Fn(f64) -> f64,
    {
        self.bracket_within(f, lower, upper, f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Bracket a root of `f` starting from `[lower, upper]`, never leaving
    /// `[min_limit, max_limit]`.
    ///
    /// # Returns
    ///
    /// * `Ok((a, b))` - `a < b` and `f(a)`, `f(b)` differ in sign (or one is zero)
    /// * `Err(SolverError::NoBracket)` - No sign change found; carries the last interval
    /// * `Err(SolverError::InvalidInput)` - Degenerate interval or configuration
    /// * `Err(SolverError::NumericalInstability)` - `f` returned NaN
    pub fn bracket_within<F>(
        &self,
        f: F,
        lower: f64,
        upper: f64,
        min_limit: f64,
        max_limit: f64,
    ) -> Result<(f64, f64), SolverError>
    where
        F: Fn(f64) -> f64,
    {
        self.config.validate()?;
        if !lower.is_finite() || !upper.is_finite() {
            return Err(SolverError::InvalidInput(format!(
                "bracket endpoints must be finite: [{}, {}]",
                lower, upper
            )));
        }
        if !(min_limit < max_limit) {
            return Err(SolverError::InvalidInput(format!(
                "empty bracket domain [{}, {}]",
                min_limit, max_limit
            )));
        }

        let (lower, upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        let mut x1 = lower.max(min_limit);
        let mut x2 = upper.min(max_limit);
        if !(x1 < x2) {
            return Err(SolverError::InvalidInput(format!(
                "initial interval [{}, {}] is empty inside domain [{}, {}]",
                lower, upper, min_limit, max_limit
            )));
        }

        let mut f1 = checked(&f, x1)?;
        let mut f2 = checked(&f, x2)?;

        for _ in 0..self.config.max_steps {
            if changes_sign(f1, f2) {
                return Ok((x1, x2));
            }
            let width = x2 - x1;
            let can_lower = x1 > min_limit;
            let can_raise = x2 < max_limit;
            if !can_lower && !can_raise {
                break;
            }
            if (f1.abs() < f2.abs() && can_lower) || !can_raise {
                x1 = (x1 - self.config.expansion_factor * width).max(min_limit);
                f1 = checked(&f, x1)?;
            } else {
                x2 = (x2 + self.config.expansion_factor * width).min(max_limit);
                f2 = checked(&f, x2)?;
            }
        }

        if changes_sign(f1, f2) {
            return Ok((x1, x2));
        }
        Err(SolverError::NoBracket { a: x1, b: x2 })
    }
}

#[inline]
fn changes_sign(f1: f64, f2: f64) -> bool {
    f1 == 0.0 || f2 == 0.0 || (f1 > 0.0) != (f2 > 0.0)
}

#[inline]
fn checked<F: Fn(f64) -> f64>(f: &F, x: f64) -> Result<f64, SolverError> {
    let value = f(x);
    if value.is_nan() {
        return Err(SolverError::NumericalInstability(format!(
            "objective returned NaN at x = {}",
            x
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_bracketed() {
        let (a, b) = BracketRoot::with_defaults()
            .bracket(|x| x - 1.0, 0.0, 2.0)
            .unwrap();
        assert_eq!((a, b), (0.0, 2.0));
    }

    #[test]
    fn test_expands_upward() {
        let f = |x: f64| x - 100.0;
        let (a, b) = BracketRoot::with_defaults().bracket(f, 1.0, 2.0).unwrap();
        assert!(f(a) < 0.0 && f(b) > 0.0);
    }

    #[test]
    fn test_expands_downward() {
        let f = |x: f64| x + 50.0;
        let (a, b) = BracketRoot::with_defaults().bracket(f, 1.0, 2.0).unwrap();
        assert!(a < -50.0 && b > -50.0);
    }

    #[test]
    fn test_swapped_input() {
        let (a, b) = BracketRoot::with_defaults()
            .bracket(|x| x - 1.5, 2.0, 1.0)
            .unwrap();
        assert!(a < b);
        assert!(a <= 1.5 && b >= 1.5);
    }

    #[test]
    fn test_respects_lower_limit() {
        // Root of 1/x - 10 is 0.1; the domain forbids x <= 0
        let f = |x: f64| 1.0 / x - 10.0;
        let (a, b) = BracketRoot::with_defaults()
            .bracket_within(f, 0.5, 2.0, 1e-8, f64::INFINITY)
            .unwrap();
        assert!(a >= 1e-8);
        assert!(f(a) > 0.0 && f(b) < 0.0);
    }

    #[test]
    fn test_no_root() {
        let result = BracketRoot::with_defaults().bracket(|x| x * x + 1.0, -1.0, 1.0);
        assert!(matches!(result, Err(SolverError::NoBracket { .. })));
    }

    #[test]
    fn test_no_root_inside_limits() {
        // Root at x = 5 lies outside [0, 3]
        let result =
            BracketRoot::with_defaults().bracket_within(|x| x - 5.0, 1.0, 2.0, 0.0, 3.0);
        match result {
            Err(SolverError::NoBracket { a, b }) => {
                assert!(a >= 0.0);
                assert!(b <= 3.0);
            }
            other => panic!("Expected NoBracket, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let search = BracketRoot::with_defaults();
        assert!(search.bracket(|x| x, f64::NAN, 1.0).is_err());
        assert!(search.bracket_within(|x| x, 5.0, 6.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_nan_objective() {
        let result = BracketRoot::with_defaults().bracket(|_| f64::NAN, 0.0, 1.0);
        assert!(matches!(result, Err(SolverError::NumericalInstability(_))));
    }
}
