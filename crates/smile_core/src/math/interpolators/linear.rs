//! Linear interpolation implementation.

use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

/// Piecewise linear interpolator.
///
/// Nodes are sorted by x on construction; duplicate or non-finite abscissae
/// are rejected. At least 2 nodes are required.
///
/// # Example
///
/// ```
/// use smile_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// // Implied vols on an unsorted strike grid
/// let strikes: [f64; 3] = [1.2, 0.8, 1.0];
/// let vols = [0.22, 0.30, 0.25];
///
/// let interp = LinearInterpolator::new(&strikes, &vols).unwrap();
/// assert_eq!(interp.domain(), (0.8, 1.2));
/// assert!((interp.interpolate(0.9).unwrap() - 0.275).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
}

impl<T: Float> LinearInterpolator<T> {
    /// Construct a linear interpolator from x and y data points.
    ///
    /// # Returns
    ///
    /// * `Err(InterpolationError::InsufficientData)` - Fewer than 2 data points
    /// * `Err(InterpolationError::InvalidInput)` - Mismatched lengths, non-finite
    ///   values or repeated x
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        if xs.len() != ys.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "xs and ys must have same length: got {} and {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(InterpolationError::InsufficientData {
                got: xs.len(),
                need: 2,
            });
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(InterpolationError::InvalidInput(
                "interpolation nodes must be finite".to_string(),
            ));
        }

        let mut pairs: Vec<(T, T)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(window) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(InterpolationError::InvalidInput(format!(
                "duplicate abscissa {}",
                window[0].0.to_f64().unwrap_or(f64::NAN)
            )));
        }

        let (xs, ys): (Vec<T>, Vec<T>) = pairs.into_iter().unzip();
        Ok(Self { xs, ys })
    }

    /// Sorted x-coordinates.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// y-values in sorted x order.
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always `false` for a constructed interpolator.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Interpolate inside the domain and hold the end values flat outside it.
    pub fn interpolate_flat(&self, x: T) -> T {
        let last = self.xs.len() - 1;
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[last] {
            return self.ys[last];
        }
        self.interpolate_segment(x)
    }

    /// Index `i` with `xs[i] <= x < xs[i+1]`, clamped to `[0, n-2]`.
    #[inline]
    fn find_segment(&self, x: T) -> usize {
        let pos = self.xs.partition_point(|&xi| xi <= x);
        pos.saturating_sub(1).min(self.xs.len() - 2)
    }

    #[inline]
    fn interpolate_segment(&self, x: T) -> T {
        let i = self.find_segment(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

impl<T: Float> Interpolator<T> for LinearInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (x_min, x_max) = self.domain();
        if !(x >= x_min && x <= x_max) {
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: x_min.to_f64().unwrap_or(f64::NAN),
                max: x_max.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(self.interpolate_segment(x))
    }

    #[inline]
    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_new_sorts_nodes() {
        let interp = LinearInterpolator::new(&[3.0, 1.0, 2.0, 0.0], &[9.0, 1.0, 4.0, 0.0]).unwrap();
        assert_eq!(interp.xs(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(interp.ys(), &[0.0, 1.0, 4.0, 9.0]);
        assert_eq!(interp.len(), 4);
        assert!(!interp.is_empty());
    }

    #[test]
    fn test_new_insufficient_data() {
        match LinearInterpolator::new(&[1.0], &[2.0]).unwrap_err() {
            InterpolationError::InsufficientData { got, need } => {
                assert_eq!(got, 1);
                assert_eq!(need, 2);
            }
            other => panic!("Expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_new_mismatched_lengths() {
        match LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0]).unwrap_err() {
            InterpolationError::InvalidInput(msg) => assert!(msg.contains("same length")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_duplicates_and_nan() {
        assert!(LinearInterpolator::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(LinearInterpolator::new(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
        assert!(LinearInterpolator::new(&[0.0, 1.0], &[0.0, f64::INFINITY]).is_err());
    }

    // ========================================
    // Interpolation Tests
    // ========================================

    #[test]
    fn test_interpolate_at_knots_and_midpoints() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 2.0, 4.0, 6.0]).unwrap();
        for (x, y) in [(0.0, 0.0), (0.5, 1.0), (1.0, 2.0), (2.5, 5.0), (3.0, 6.0)] {
            assert_relative_eq!(interp.interpolate(x).unwrap(), y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_interpolate_non_uniform_spacing() {
        let interp = LinearInterpolator::new(&[0.0, 0.1, 1.0, 10.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(interp.interpolate(0.05).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(interp.interpolate(0.55).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_out_of_bounds() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
        match interp.interpolate(2.1).unwrap_err() {
            InterpolationError::OutOfBounds { x, min, max } => {
                assert_relative_eq!(x, 2.1);
                assert_eq!(min, 0.0);
                assert_eq!(max, 2.0);
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
        assert!(interp.interpolate(-0.1).is_err());
        assert!(interp.interpolate(f64::NAN).is_err());
    }

    #[test]
    fn test_interpolate_flat() {
        let interp = LinearInterpolator::new(&[1.0, 2.0, 4.0], &[0.3, 0.2, 0.25]).unwrap();
        assert_eq!(interp.interpolate_flat(0.5), 0.3);
        assert_eq!(interp.interpolate_flat(9.0), 0.25);
        assert_relative_eq!(interp.interpolate_flat(3.0), 0.225, epsilon = 1e-12);
        assert_relative_eq!(interp.interpolate_flat(2.0), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_f32() {
        let interp = LinearInterpolator::new(&[0.0_f32, 1.0, 2.0], &[0.0, 2.0, 4.0]).unwrap();
        assert!((interp.interpolate(0.5_f32).unwrap() - 1.0).abs() < 1e-6);
    }
}
