//! Integration tests for module exports.
//!
//! Verify that all public modules and types are reachable via absolute paths.

use approx::assert_relative_eq;

/// Solvers are accessible via absolute path.
#[test]
fn test_solver_module_exports() {
    use smile_core::math::solvers::{
        BracketConfig, BracketRoot, BrentSolver, FiniteDifference, LMConfig, LMResult,
        LevenbergMarquardtSolver, SolverConfig,
    };

    let _ = BracketRoot::new(BracketConfig::default());
    let _: BrentSolver<f64> = BrentSolver::new(SolverConfig::default());
    let solver = LevenbergMarquardtSolver::new(LMConfig {
        finite_difference: FiniteDifference::Forward,
        ..LMConfig::default()
    });
    let result: LMResult = solver.solve(|p| vec![p[0] - 1.0], vec![0.0]).unwrap();
    assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-8);
}

/// Transforms are accessible via absolute path.
#[test]
fn test_transform_module_exports() {
    use smile_core::math::transforms::{FixedMask, ParameterConstraint, ParameterTransform};

    let t = ParameterTransform::new(
        &[1.0, 2.0],
        &[ParameterConstraint::Unconstrained, ParameterConstraint::positive()],
        &FixedMask::from_indices([0]),
    )
    .unwrap();
    assert_eq!(t.fit_dim(), 1);
}

/// Interpolators and error types are accessible via absolute path.
#[test]
fn test_interpolator_and_error_exports() {
    use smile_core::math::interpolators::{Interpolator, LinearInterpolator};
    use smile_core::types::{InterpolationError, SolverError, TransformError};

    let interp = LinearInterpolator::new(&[0.0, 1.0], &[1.0, 3.0]).unwrap();
    assert_relative_eq!(interp.interpolate(0.5).unwrap(), 2.0);

    let _: InterpolationError = interp.interpolate(2.0).unwrap_err();
    let _ = SolverError::InvalidInput("x".to_string());
    let _ = TransformError::FixedIndexOutOfRange { index: 1, len: 0 };
}
