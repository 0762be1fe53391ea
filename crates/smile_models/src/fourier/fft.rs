//! Carr-Madan FFT pricing of European options on a log-strike grid.
//!
//! The damped call price `e^(αk)·C(k)` is square-integrable, so its
//! Fourier transform is available in closed form from the characteristic
//! exponent:
//!
//! ```text
//! C(k) = e^(-αk)/π ∫₀^∞ Re[e^(-ivk) ψ̂(v)] dv
//! ψ̂(v) = exp(ψ(v - (α+1)i)) / (α² + α - v² + i(2α+1)v)
//! ```
//!
//! The integral is discretised with the trapezoidal rule, which converges
//! geometrically here because the integrand is analytic in a strip of
//! width `α` around the real axis, and evaluated for all grid strikes at
//! once with one FFT (`rustfft`). Grid size is derived from the requested
//! tolerance and strike range.

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;
use tracing::trace;

use super::{CharacteristicExponent, FourierError};

/// Largest frequency probed when looking for decay.
const MAX_FREQUENCY: f64 = 1e6;
/// Largest damped exponent accepted before `exp` overflows.
const MAX_DAMPED_EXPONENT: f64 = 700.0;
const MIN_POINTS: usize = 16;

/// Carr-Madan FFT option pricer.
///
/// # Example
///
/// ```
/// use smile_models::analytical::black_price;
/// use smile_models::fourier::{BlackCharacteristicExponent, FftPricer};
///
/// let pricer = FftPricer::default();
/// let exponent = BlackCharacteristicExponent::new(0.2);
/// let grid = pricer
///     .price(100.0, 1.0, 1.0, true, &exponent, 80.0, 120.0, 20, 0.75, 1e-10)
///     .unwrap();
///
/// for (strike, price) in grid {
///     assert!((price - black_price(100.0, strike, 1.0, 0.2, true)).abs() < 1e-6);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FftPricer {
    max_eta: f64,
    max_points: usize,
}

impl Default for FftPricer {
    fn default() -> Self {
        Self {
            max_eta: 0.25,
            max_points: 1 << 20,
        }
    }
}

impl FftPricer {
    /// Pricer with a custom frequency spacing ceiling and grid size limit.
    pub fn new(max_eta: f64, max_points: usize) -> Self {
        Self {
            max_eta,
            max_points,
        }
    }

    /// Whether `E[(F_T/F)^(α+1)]` is finite and representable, i.e. the
    /// damped call transform exists.
    pub fn supports_damping<E>(exponent: &E, expiry: f64, alpha: f64) -> bool
    where
        E: CharacteristicExponent + ?Sized,
    {
        let damped = exponent.exponent(Complex64::new(0.0, -(alpha + 1.0)), expiry);
        damped.re.is_finite() && damped.re <= MAX_DAMPED_EXPONENT
    }

    /// Price calls (or puts) on the log-strike grid spanning
    /// `[strike_low, strike_high]`.
    ///
    /// Returns `(strike, price)` pairs in ascending strike order, including
    /// one grid point beyond each end of the range. Prices are multiplied by
    /// `discount`; puts come from put-call parity.
    ///
    /// # Arguments
    ///
    /// * `n_strikes` - Minimum number of grid points inside the range
    /// * `alpha` - Carr-Madan damping factor, `> 0`
    /// * `tolerance` - Truncation level of the damped transform
    ///
    /// # Errors
    ///
    /// * `FourierError::InvalidInput` - non-positive market inputs or settings
    /// * `FourierError::InvalidDamping` - `E[(F_T/F)^(α+1)]` is not finite
    /// * `FourierError::NoDecay` / `GridTooLarge` - tolerance cannot be met
    #[allow(clippy::too_many_arguments)]
    pub fn price<E>(
        &self,
        forward: f64,
        discount: f64,
        expiry: f64,
        is_call: bool,
        exponent: &E,
        strike_low: f64,
        strike_high: f64,
        n_strikes: usize,
        alpha: f64,
        tolerance: f64,
    ) -> Result<Vec<(f64, f64)>, FourierError>
    where
        E: CharacteristicExponent + ?Sized,
    {
        for (name, value) in [
            ("forward", forward),
            ("discount", discount),
            ("expiry", expiry),
            ("strike_low", strike_low),
            ("alpha", alpha),
            ("tolerance", tolerance),
            ("max_eta", self.max_eta),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(FourierError::InvalidInput { name, value });
            }
        }
        if !(strike_high >= strike_low) || !strike_high.is_finite() {
            return Err(FourierError::InvalidInput {
                name: "strike_high",
                value: strike_high,
            });
        }
        if n_strikes == 0 {
            return Err(FourierError::InvalidInput {
                name: "n_strikes",
                value: 0.0,
            });
        }

        if !Self::supports_damping(exponent, expiry, alpha) {
            return Err(FourierError::InvalidDamping { alpha });
        }

        let transform = |v: f64| -> Complex64 {
            let u = Complex64::new(v, -(alpha + 1.0));
            let denominator = Complex64::new(alpha * alpha + alpha - v * v, (2.0 * alpha + 1.0) * v);
            exponent.exponent(u, expiry).exp() / denominator
        };

        let v_max = decay_frequency(&transform, tolerance)?;

        let k_low = (strike_low / forward).ln();
        let k_high = (strike_high / forward).ln();
        let target_spacing = if n_strikes > 1 && k_high > k_low {
            (k_high - k_low) / (n_strikes - 1) as f64
        } else {
            f64::INFINITY
        };
        let delta = target_spacing.min(2.0 * PI / v_max);
        let k_abs = k_low.abs().max(k_high.abs());
        let eta_bound = self.max_eta.min(PI / (k_abs + 2.0 * delta));

        let required = (2.0 * PI / (eta_bound * delta)).ceil() as usize;
        let n = required.max(MIN_POINTS).next_power_of_two();
        if n > self.max_points {
            return Err(FourierError::GridTooLarge {
                required: n,
                limit: self.max_points,
            });
        }
        let eta = 2.0 * PI / (n as f64 * delta);
        let k0 = -0.5 * n as f64 * delta;
        trace!(n, eta, delta, v_max, "Carr-Madan grid");

        let mut buffer: Vec<Complex64> = (0..n)
            .map(|j| {
                let v = j as f64 * eta;
                let phase = Complex64::new(0.0, -v * k0).exp();
                phase * transform(v) * quadrature_weight(j, eta)
            })
            .collect();
        FftPlanner::<f64>::new()
            .plan_fft_forward(n)
            .process(&mut buffer);

        let m_low = ((k_low - k0) / delta).floor().max(0.0) as usize;
        let m_high = (((k_high - k0) / delta).ceil() as usize).min(n - 1);

        Ok((m_low..=m_high)
            .map(|m| {
                let k = k0 + m as f64 * delta;
                let strike = forward * k.exp();
                let call = discount * forward * ((-alpha * k).exp() * buffer[m].re / PI).max(0.0);
                let price = if is_call {
                    call
                } else {
                    (call - discount * (forward - strike)).max(0.0)
                };
                (strike, price)
            })
            .collect())
    }
}

/// Smallest power-of-two frequency at which `|ψ̂(v)| < tolerance·π`.
fn decay_frequency<F>(transform: &F, tolerance: f64) -> Result<f64, FourierError>
where
    F: Fn(f64) -> Complex64,
{
    let mut v = 1.0;
    while !(transform(v).norm() < tolerance * PI) {
        v *= 2.0;
        if v > MAX_FREQUENCY {
            return Err(FourierError::NoDecay { frequency: v });
        }
    }
    Ok(v)
}

#[inline]
fn quadrature_weight(j: usize, eta: f64) -> f64 {
    if j == 0 {
        0.5 * eta
    } else {
        eta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytical::black_price;
    use crate::fourier::{BlackCharacteristicExponent, HestonCharacteristicExponent};
    use crate::smile::HestonData;
    use approx::assert_relative_eq;

    #[test]
    fn test_black_exponent_reproduces_black_prices() {
        let pricer = FftPricer::default();
        let exponent = BlackCharacteristicExponent::new(0.25);
        let grid = pricer
            .price(0.05, 0.9, 2.0, true, &exponent, 0.02, 0.08, 30, 0.75, 1e-12)
            .unwrap();

        assert!(grid.len() >= 30);
        assert!(grid.first().unwrap().0 <= 0.02);
        assert!(grid.last().unwrap().0 >= 0.08);
        for (strike, price) in grid {
            let expected = 0.9 * black_price(0.05, strike, 2.0, 0.25, true);
            assert_relative_eq!(price, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_puts_follow_parity() {
        let pricer = FftPricer::default();
        let exponent = BlackCharacteristicExponent::new(0.3);
        let calls = pricer
            .price(100.0, 1.0, 1.0, true, &exponent, 70.0, 130.0, 10, 1.0, 1e-10)
            .unwrap();
        let puts = pricer
            .price(100.0, 1.0, 1.0, false, &exponent, 70.0, 130.0, 10, 1.0, 1e-10)
            .unwrap();
        assert_eq!(calls.len(), puts.len());
        for ((k, c), (k2, p)) in calls.iter().zip(&puts) {
            assert_eq!(k, k2);
            assert_relative_eq!(c - p, 100.0 - k, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_heston_prices_are_arbitrage_free() {
        let pricer = FftPricer::default();
        let exponent =
            HestonCharacteristicExponent::new(HestonData::new(1.2, 0.04, 0.03, 0.5, -0.6));
        let grid = pricer
            .price(1.0, 1.0, 1.5, true, &exponent, 0.6, 1.6, 25, 0.75, 1e-10)
            .unwrap();
        for w in grid.windows(2) {
            // Calls decrease in strike
            assert!(w[1].1 < w[0].1);
        }
        for &(k, c) in &grid {
            assert!(c >= (1.0 - k).max(0.0) - 1e-9);
            assert!(c <= 1.0);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let pricer = FftPricer::default();
        let e = BlackCharacteristicExponent::new(0.2);
        assert!(matches!(
            pricer.price(-1.0, 1.0, 1.0, true, &e, 80.0, 120.0, 10, 0.75, 1e-8),
            Err(FourierError::InvalidInput { name: "forward", .. })
        ));
        assert!(matches!(
            pricer.price(100.0, 1.0, 1.0, true, &e, 120.0, 80.0, 10, 0.75, 1e-8),
            Err(FourierError::InvalidInput { name: "strike_high", .. })
        ));
        assert!(matches!(
            pricer.price(100.0, 1.0, 1.0, true, &e, 80.0, 120.0, 0, 0.75, 1e-8),
            Err(FourierError::InvalidInput { name: "n_strikes", .. })
        ));
    }

    #[test]
    fn test_damping_outside_moment_range() {
        // ψ(-(α+1)i) = σ²Tα(α+1)/2 = 3000 for σ = 10, T = 10, α = 2
        let e = BlackCharacteristicExponent::new(10.0);
        assert!(!FftPricer::supports_damping(&e, 10.0, 2.0));
        assert!(FftPricer::supports_damping(&e, 1.0, 0.75));
        assert!(matches!(
            FftPricer::default().price(100.0, 1.0, 10.0, true, &e, 80.0, 120.0, 10, 2.0, 1e-8),
            Err(FourierError::InvalidDamping { .. })
        ));
    }

    #[test]
    fn test_grid_limit() {
        let pricer = FftPricer::new(0.25, 64);
        let e = BlackCharacteristicExponent::new(0.2);
        assert!(matches!(
            pricer.price(100.0, 1.0, 1.0, true, &e, 80.0, 120.0, 200, 0.75, 1e-12),
            Err(FourierError::GridTooLarge { limit: 64, .. })
        ));
    }

    #[test]
    fn test_finer_tolerance_does_not_move_prices() {
        let pricer = FftPricer::default();
        let exponent =
            HestonCharacteristicExponent::new(HestonData::new(2.0, 0.05, 0.04, 0.3, -0.3));
        let coarse = pricer
            .price(1.0, 1.0, 1.0, true, &exponent, 0.8, 1.2, 8, 0.75, 1e-8)
            .unwrap();
        let fine = pricer
            .price(1.0, 1.0, 1.0, true, &exponent, 0.8, 1.2, 8, 0.75, 1e-12)
            .unwrap();
        // Strike spacing is set by the range, so both grids coincide
        assert_eq!(coarse.len(), fine.len());
        for ((k1, c1), (k2, c2)) in coarse.iter().zip(&fine) {
            assert_relative_eq!(*k1, *k2, epsilon = 1e-14);
            assert_relative_eq!(*c1, *c2, epsilon = 1e-7);
        }
    }
}
