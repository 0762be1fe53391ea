//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;
use num_traits::Float;

/// Brent's method root finder.
///
/// Combines bisection, secant and inverse quadratic interpolation.
/// Requires a bracket `[lower, upper]` across which `f` changes sign;
/// convergence is then guaranteed for continuous `f`.
///
/// The iteration stops when the bracket half-width is below
/// `2·ε·|b| + tolerance/2` or when `f(b)` is exactly zero.
///
/// # Example
///
/// ```
/// use smile_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
///
/// // Solve x³ - x - 2 = 0 in bracket [1, 2]
/// let f = |x: f64| x * x * x - x - 2.0;
///
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!((f(root)).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver<T: Float> {
    config: SolverConfig<T>,
}

impl<T: Float> BrentSolver<T> {
    /// Create a new Brent solver with the given configuration.
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    /// Returns a reference to the solver configuration.
    pub fn config(&self) -> &SolverConfig<T> {
        &self.config
    }

    /// Find a root of `f` in the bracket `[lower, upper]`.
    ///
    /// # Returns
    ///
    /// * `Ok(x)` - Root located to within the configured tolerance
    /// * `Err(SolverError::NoBracket)` - `f(lower)` and `f(upper)` have the same sign
    /// * `Err(SolverError::NumericalInstability)` - `f` returned NaN
    /// * `Err(SolverError::MaxIterationsExceeded)` - Failed to converge
    ///
    /// # Example
    ///
    /// ```
    /// use smile_core::math::solvers::{BrentSolver, SolverConfig};
    ///
    /// let solver = BrentSolver::new(SolverConfig::default());
    /// let root = solver.find_root(|x: f64| x * x - 2.0, 0.0, 2.0).unwrap();
    /// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
    /// ```
    pub fn find_root<F>(&self, f: F, lower: T, upper: T) -> Result<T, SolverError>
    where
        F: Fn(T) -> T,
    {
        let one = T::one();
        let two = one + one;
        let three = two + one;
        let half = one / two;
        let eps = T::epsilon();

        let mut a = lower;
        let mut b = upper;
        let mut fa = f(a);
        let mut fb = f(b);

        if fa.is_nan() || fb.is_nan() {
            return Err(nan_error(if fa.is_nan() { a } else { b }));
        }
        if fa == T::zero() {
            return Ok(a);
        }
        if fb == T::zero() {
            return Ok(b);
        }
        if (fa > T::zero()) == (fb > T::zero()) {
            return Err(SolverError::NoBracket {
                a: a.to_f64().unwrap_or(f64::NAN),
                b: b.to_f64().unwrap_or(f64::NAN),
            });
        }

        let mut c = b;
        let mut fc = fb;
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.config.max_iterations {
            // Keep the root between b and c.
            if (fb > T::zero()) == (fc > T::zero()) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            // b is always the best estimate.
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol1 = two * eps * b.abs() + half * self.config.tolerance;
            let xm = half * (c - b);
            if xm.abs() <= tol1 || fb == T::zero() {
                return Ok(b);
            }

            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    // Secant step
                    (two * xm * s, one - s)
                } else {
                    // Inverse quadratic interpolation
                    let qa = fa / fc;
                    let r = fb / fc;
                    (
                        s * (two * xm * qa * (qa - r) - (b - a) * (r - one)),
                        (qa - one) * (r - one) * (s - one),
                    )
                };
                if p > T::zero() {
                    q = -q;
                }
                p = p.abs();

                let min1 = three * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if two * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            b = if d.abs() > tol1 {
                b + d
            } else if xm >= T::zero() {
                b + tol1
            } else {
                b - tol1
            };
            fb = f(b);
            if fb.is_nan() {
                return Err(nan_error(b));
            }
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }
}

fn nan_error<T: Float>(x: T) -> SolverError {
    SolverError::NumericalInstability(format!(
        "objective returned NaN at x = {}",
        x.to_f64().unwrap_or(f64::NAN)
    ))
}
