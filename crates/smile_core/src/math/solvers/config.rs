//! Solver configuration types.

use crate::types::SolverError;
use num_traits::Float;

/// Configuration for 1-D root finders.
///
/// # Type Parameters
///
/// * `T` - Floating-point type for tolerance (e.g., `f64`)
///
/// # Example
///
/// ```
/// use smile_core::math::solvers::SolverConfig;
///
/// let config: SolverConfig<f64> = SolverConfig::default();
/// assert!(config.tolerance < 1e-8);
///
/// let custom = SolverConfig {
///     tolerance: 1e-12,
///     max_iterations: 200,
/// };
/// assert_eq!(custom.max_iterations, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig<T: Float> {
    /// Absolute tolerance on the root location.
    ///
    /// Brent stops once the bracket half-width falls below this value
    /// (plus a machine-precision term relative to the current iterate).
    pub tolerance: T,

    /// Maximum number of iterations before giving up with
    /// `SolverError::MaxIterationsExceeded`.
    pub max_iterations: usize,
}

impl<T: Float> Default for SolverConfig<T> {
    /// Default values: `tolerance` 1e-10, `max_iterations` 100.
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-10).unwrap_or_else(T::epsilon),
            max_iterations: 100,
        }
    }
}

impl<T: Float> SolverConfig<T> {
    /// Create a new configuration with specified values.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance <= 0` or `max_iterations == 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use smile_core::math::solvers::SolverConfig;
    ///
    /// let config = SolverConfig::new(1e-12, 200);
    /// assert_eq!(config.max_iterations, 200);
    /// ```
    pub fn new(tolerance: T, max_iterations: usize) -> Self {
        assert!(tolerance > T::zero(), "tolerance must be positive");
        assert!(max_iterations > 0, "max_iterations must be > 0");
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Tight tolerance (1e-14) and 500 iterations.
    ///
    /// Used by nested solves whose noise would otherwise leak into
    /// finite-difference Jacobians of the outer problem.
    pub fn high_precision() -> Self {
        Self {
            tolerance: T::from(1e-14).unwrap_or_else(T::epsilon),
            max_iterations: 500,
        }
    }

    /// Relaxed tolerance (1e-6) and 50 iterations.
    pub fn fast() -> Self {
        Self {
            tolerance: T::from(1e-6).unwrap_or_else(T::epsilon),
            max_iterations: 50,
        }
    }

    /// Check the configuration without panicking.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.tolerance > T::zero()) {
            return Err(SolverError::InvalidInput(
                "tolerance must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for outward bracket search.
///
/// Starting from an initial interval the endpoint with the smaller
/// `|f|` is pushed outward by `expansion_factor` times the interval width
/// until `f` changes sign or `max_steps` is exhausted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BracketConfig {
    /// Growth factor applied to the interval width per step.
    pub expansion_factor: f64,
    /// Maximum number of expansion steps.
    pub max_steps: usize,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            expansion_factor: 1.6,
            max_steps: 50,
        }
    }
}

impl BracketConfig {
    /// Check the configuration without panicking.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.expansion_factor > 0.0) || !self.expansion_factor.is_finite() {
            return Err(SolverError::InvalidInput(
                "expansion_factor must be positive and finite".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(SolverError::InvalidInput(
                "max_steps must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config: SolverConfig<f64> = SolverConfig::default();
        assert!((config.tolerance - 1e-10).abs() < 1e-15);
        assert_eq!(config.max_iterations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "tolerance must be positive")]
    fn test_new_config_zero_tolerance_panics() {
        let _: SolverConfig<f64> = SolverConfig::new(0.0, 100);
    }

    #[test]
    #[should_panic(expected = "max_iterations must be > 0")]
    fn test_new_config_zero_iterations_panics() {
        let _: SolverConfig<f64> = SolverConfig::new(1e-10, 0);
    }

    #[test]
    fn test_validate_rejects_nan_tolerance() {
        let config = SolverConfig {
            tolerance: f64::NAN,
            max_iterations: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let hp: SolverConfig<f64> = SolverConfig::high_precision();
        let fast: SolverConfig<f64> = SolverConfig::fast();
        assert!(hp.tolerance < fast.tolerance);
        assert!(hp.max_iterations > fast.max_iterations);
    }

    #[test]
    fn test_bracket_config_default() {
        let config = BracketConfig::default();
        assert!((config.expansion_factor - 1.6).abs() < 1e-15);
        assert_eq!(config.max_steps, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bracket_config_invalid() {
        let config = BracketConfig {
            expansion_factor: -1.0,
            max_steps: 10,
        };
        assert!(config.validate().is_err());

        let config = BracketConfig {
            expansion_factor: 1.6,
            max_steps: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_with_f32() {
        let config: SolverConfig<f32> = SolverConfig::default();
        assert!(config.tolerance > 0.0);
    }
}
