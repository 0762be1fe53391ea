//! Market quotes for a single smile.

use smile_core::math::interpolators::LinearInterpolator;

use crate::CalibrationError;

/// Implied volatility quotes for one expiry.
///
/// Strikes, volatilities and errors are parallel sequences. The error of a
/// quote is the standard deviation used to weight its residual, so quotes
/// with smaller errors are fitted more tightly.
///
/// # Examples
///
/// ```
/// use smile_optimiser::SmileQuotes;
///
/// let quotes = SmileQuotes::new(
///     0.05,
///     5.0,
///     vec![0.03, 0.05, 0.07],
///     vec![0.32, 0.28, 0.26],
///     vec![1e-4; 3],
/// )
/// .unwrap();
///
/// assert_eq!(quotes.len(), 3);
/// assert!((quotes.atm_volatility() - 0.28).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SmileQuotes {
    forward: f64,
    expiry: f64,
    strikes: Vec<f64>,
    volatilities: Vec<f64>,
    errors: Vec<f64>,
}

impl SmileQuotes {
    /// Validate and build a quote set.
    ///
    /// # Errors
    ///
    /// `CalibrationError::Configuration` when the sequences are empty or of
    /// different lengths, when forward, expiry or a strike is not positive,
    /// when a volatility is not finite, or when an error is not positive and
    /// finite.
    pub fn new(
        forward: f64,
        expiry: f64,
        strikes: Vec<f64>,
        volatilities: Vec<f64>,
        errors: Vec<f64>,
    ) -> Result<Self, CalibrationError> {
        if strikes.is_empty() {
            return Err(CalibrationError::configuration("no quotes"));
        }
        if volatilities.len() != strikes.len() || errors.len() != strikes.len() {
            return Err(CalibrationError::configuration(format!(
                "quote sequences differ in length: {} strikes, {} volatilities, {} errors",
                strikes.len(),
                volatilities.len(),
                errors.len()
            )));
        }
        for (name, value) in [("forward", forward), ("expiry", expiry)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(CalibrationError::configuration(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if let Some(k) = strikes.iter().find(|k| !(**k > 0.0) || !k.is_finite()) {
            return Err(CalibrationError::configuration(format!(
                "strikes must be positive and finite, got {}",
                k
            )));
        }
        if let Some(v) = volatilities.iter().find(|v| !v.is_finite()) {
            return Err(CalibrationError::configuration(format!(
                "volatilities must be finite, got {}",
                v
            )));
        }
        if let Some(e) = errors.iter().find(|e| !(**e > 0.0) || !e.is_finite()) {
            return Err(CalibrationError::configuration(format!(
                "errors must be positive and finite, got {}",
                e
            )));
        }

        Ok(Self {
            forward,
            expiry,
            strikes,
            volatilities,
            errors,
        })
    }

    /// Quotes sharing one error for every strike.
    pub fn with_uniform_error(
        forward: f64,
        expiry: f64,
        strikes: Vec<f64>,
        volatilities: Vec<f64>,
        error: f64,
    ) -> Result<Self, CalibrationError> {
        let errors = vec![error; strikes.len()];
        Self::new(forward, expiry, strikes, volatilities, errors)
    }

    /// Forward of the underlying.
    #[inline]
    pub fn forward(&self) -> f64 {
        self.forward
    }

    /// Time to expiry in years.
    #[inline]
    pub fn expiry(&self) -> f64 {
        self.expiry
    }

    /// Quoted strikes, in input order.
    #[inline]
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// Quoted implied volatilities.
    #[inline]
    pub fn volatilities(&self) -> &[f64] {
        &self.volatilities
    }

    /// Per-quote standard errors.
    #[inline]
    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Number of quotes.
    #[inline]
    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    /// Always `false` for a validated quote set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Whether strikes are strictly ascending, hence also unique.
    pub fn is_strictly_ascending(&self) -> bool {
        self.strikes.windows(2).all(|w| w[0] < w[1])
    }

    /// Quotes restricted to `range`, e.g. a window of adjacent strikes.
    ///
    /// # Errors
    ///
    /// `CalibrationError::Configuration` when the range is empty or out of bounds.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Result<Self, CalibrationError> {
        if range.is_empty() || range.end > self.len() {
            return Err(CalibrationError::configuration(format!(
                "quote range {:?} invalid for {} quotes",
                range,
                self.len()
            )));
        }
        Ok(Self {
            forward: self.forward,
            expiry: self.expiry,
            strikes: self.strikes[range.clone()].to_vec(),
            volatilities: self.volatilities[range.clone()].to_vec(),
            errors: self.errors[range].to_vec(),
        })
    }

    /// Quoted volatility at the forward, interpolated linearly in strike
    /// and held flat beyond the outermost quotes.
    pub fn atm_volatility(&self) -> f64 {
        match LinearInterpolator::new(&self.strikes, &self.volatilities) {
            Ok(interp) => interp.interpolate_flat(self.forward),
            // Single quote, or duplicate strikes: fall back to the nearest quote
            Err(_) => self.nearest_volatility(self.forward),
        }
    }

    fn nearest_volatility(&self, strike: f64) -> f64 {
        self.strikes
            .iter()
            .zip(&self.volatilities)
            .min_by(|a, b| {
                (a.0 - strike)
                    .abs()
                    .partial_cmp(&(b.0 - strike).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map_or(f64::NAN, |(_, &v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quotes() -> SmileQuotes {
        SmileQuotes::with_uniform_error(
            100.0,
            1.0,
            vec![80.0, 90.0, 110.0, 120.0],
            vec![0.30, 0.25, 0.21, 0.20],
            1e-4,
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let q = quotes();
        assert_eq!(q.len(), 4);
        assert!(!q.is_empty());
        assert_eq!(q.errors(), &[1e-4; 4]);
        assert!(q.is_strictly_ascending());
    }

    #[test]
    fn test_atm_volatility_interpolates_between_neighbours() {
        assert_relative_eq!(quotes().atm_volatility(), 0.23, epsilon = 1e-14);
    }

    #[test]
    fn test_atm_volatility_flat_outside_quotes() {
        let q = SmileQuotes::with_uniform_error(1.0, 1.0, vec![1.1, 1.2], vec![0.2, 0.3], 1e-3)
            .unwrap();
        assert_eq!(q.atm_volatility(), 0.2);

        let single =
            SmileQuotes::with_uniform_error(1.0, 1.0, vec![1.1], vec![0.25], 1e-3).unwrap();
        assert_eq!(single.atm_volatility(), 0.25);
    }

    #[test]
    fn test_validation() {
        assert!(SmileQuotes::new(1.0, 1.0, vec![], vec![], vec![]).is_err());
        assert!(SmileQuotes::new(1.0, 1.0, vec![1.0], vec![0.2, 0.3], vec![1e-4]).is_err());
        assert!(SmileQuotes::new(-1.0, 1.0, vec![1.0], vec![0.2], vec![1e-4]).is_err());
        assert!(SmileQuotes::new(1.0, 0.0, vec![1.0], vec![0.2], vec![1e-4]).is_err());
        assert!(SmileQuotes::new(1.0, 1.0, vec![0.0], vec![0.2], vec![1e-4]).is_err());
        assert!(SmileQuotes::new(1.0, 1.0, vec![1.0], vec![f64::NAN], vec![1e-4]).is_err());

        let err = SmileQuotes::new(1.0, 1.0, vec![1.0], vec![0.2], vec![0.0]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_slice() {
        let window = quotes().slice(1..4).unwrap();
        assert_eq!(window.strikes(), &[90.0, 110.0, 120.0]);
        assert_eq!(window.forward(), 100.0);
        assert!(quotes().slice(2..6).is_err());
        assert!(quotes().slice(2..2).is_err());
    }

    #[test]
    fn test_unordered_strikes_not_ascending() {
        let q = SmileQuotes::with_uniform_error(1.0, 1.0, vec![1.2, 0.8], vec![0.2, 0.3], 1e-3)
            .unwrap();
        assert!(!q.is_strictly_ascending());
        // Interpolation sorts its nodes
        assert_relative_eq!(q.atm_volatility(), 0.25, epsilon = 1e-14);
    }
}
