//! Interpolator trait.

use crate::types::InterpolationError;
use num_traits::Float;

/// A one-dimensional interpolator over a closed domain.
pub trait Interpolator<T: Float> {
    /// Interpolated value at `x`.
    ///
    /// Returns `InterpolationError::OutOfBounds` when `x` lies outside
    /// [`domain`](Self::domain).
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;

    /// The `(min, max)` range of valid query points.
    fn domain(&self) -> (T, T);
}
