//! Heston smile through FFT repricing.
//!
//! Heston has no closed-form implied volatility. For each trial parameter
//! vector the Carr-Madan pricer produces call prices on a log-strike grid
//! spanning the quotes; every grid price is inverted to a Black volatility
//! and the volatilities are interpolated linearly onto the quote strikes.
//!
//! A grid price that cannot be inverted contributes a volatility of `0.0`
//! instead of failing the whole evaluation. The count of such points is
//! logged at debug level.

use smile_core::math::interpolators::LinearInterpolator;
use smile_core::math::transforms::ParameterConstraint;
use smile_models::analytical::black_implied_vol;
use smile_models::fourier::{FftPricer, HestonCharacteristicExponent};
use smile_models::smile::HestonData;
use tracing::debug;

use super::SmileModel;
use crate::CalibrationError;

/// FFT settings used to reprice a Heston smile.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HestonFftConfig {
    /// Minimum number of grid points between the lowest and highest strike
    pub n_strikes: usize,
    /// Carr-Madan damping factor
    pub alpha: f64,
    /// Truncation tolerance of the damped transform
    pub tolerance: f64,
    /// Upper bound on the frequency spacing
    pub max_eta: f64,
    /// Largest FFT size allowed
    pub max_points: usize,
}

impl Default for HestonFftConfig {
    fn default() -> Self {
        Self {
            n_strikes: 64,
            alpha: 0.75,
            tolerance: 1e-10,
            max_eta: 0.25,
            max_points: 1 << 20,
        }
    }
}

impl HestonFftConfig {
    /// Coarser grid and looser truncation.
    pub fn fast() -> Self {
        Self {
            n_strikes: 32,
            tolerance: 1e-8,
            ..Default::default()
        }
    }

    /// Denser grid and tighter truncation.
    pub fn high_precision() -> Self {
        Self {
            n_strikes: 128,
            tolerance: 1e-12,
            ..Default::default()
        }
    }

    /// Reject settings the pricer cannot use.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("tolerance", self.tolerance),
            ("max_eta", self.max_eta),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(CalibrationError::configuration(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.n_strikes == 0 || self.max_points == 0 {
            return Err(CalibrationError::configuration(
                "n_strikes and max_points must be > 0",
            ));
        }
        Ok(())
    }
}

/// Heston implied volatilities at arbitrary strikes via FFT repricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FftVolatilityFunction {
    pricer: FftPricer,
    config: HestonFftConfig,
}

impl FftVolatilityFunction {
    /// Volatility function with the given settings.
    pub fn new(config: HestonFftConfig) -> Self {
        Self {
            pricer: FftPricer::new(config.max_eta, config.max_points),
            config,
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &HestonFftConfig {
        &self.config
    }

    /// Implied volatilities at `strikes`.
    ///
    /// # Errors
    ///
    /// * `CalibrationError::Configuration` - empty strikes or invalid market inputs
    /// * `CalibrationError::NumericalFailure` - the pricer cannot meet its tolerance
    pub fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &HestonData,
    ) -> Result<Vec<f64>, CalibrationError> {
        let (low, high) = strike_range(strikes)?;
        let exponent = HestonCharacteristicExponent::new(*data);
        let grid = self.pricer.price(
            forward,
            1.0,
            expiry,
            true,
            &exponent,
            low,
            high,
            self.config.n_strikes,
            self.config.alpha,
            self.config.tolerance,
        )?;

        let (grid_strikes, grid_vols) = implied_volatilities(forward, expiry, &grid);
        if grid_vols.len() < 2 {
            let vol = grid_vols.first().copied().unwrap_or(0.0);
            return Ok(vec![vol; strikes.len()]);
        }
        let interp = LinearInterpolator::new(&grid_strikes, &grid_vols)?;
        Ok(strikes.iter().map(|&k| interp.interpolate_flat(k)).collect())
    }

    /// Whether the damped transform exists for these parameters.
    pub fn supports(&self, data: &HestonData, expiry: f64) -> bool {
        let exponent = HestonCharacteristicExponent::new(*data);
        FftPricer::supports_damping(&exponent, expiry, self.config.alpha)
    }
}

/// Invert each grid call price. Failed inversions become `0.0`.
pub(crate) fn implied_volatilities(
    forward: f64,
    expiry: f64,
    grid: &[(f64, f64)],
) -> (Vec<f64>, Vec<f64>) {
    let mut failures = 0usize;
    let (strikes, vols) = grid
        .iter()
        .map(|&(strike, price)| {
            let vol = match black_implied_vol(forward, strike, expiry, price, true) {
                Ok(vol) => vol,
                Err(e) => {
                    failures += 1;
                    debug!(strike, price, error = %e, "no implied volatility for grid price");
                    0.0
                }
            };
            (strike, vol)
        })
        .unzip();
    if failures > 0 {
        debug!(failures, points = grid.len(), "grid prices replaced by zero volatility");
    }
    (strikes, vols)
}

fn strike_range(strikes: &[f64]) -> Result<(f64, f64), CalibrationError> {
    if strikes.is_empty() {
        return Err(CalibrationError::configuration("no strikes to price"));
    }
    Ok(strikes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &k| {
            (lo.min(k), hi.max(k))
        }))
}

/// Heston stochastic volatility priced by FFT.
///
/// Parameters `[kappa, theta, vol0, omega, rho]`, `vol0` being the initial
/// variance. With [`tie_vol0_to_theta`](Self::tie_vol0_to_theta) the
/// initial variance is removed from fit space and always equals `theta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonModel {
    fft: FftVolatilityFunction,
    vol0_is_theta: bool,
}

impl HestonModel {
    /// Index of the initial variance.
    pub const VOL0: usize = 2;
    /// Index of the long-run variance.
    pub const THETA: usize = 1;

    /// Heston with the given FFT settings.
    pub fn new(config: HestonFftConfig) -> Result<Self, CalibrationError> {
        config.validate()?;
        Ok(Self {
            fft: FftVolatilityFunction::new(config),
            vol0_is_theta: false,
        })
    }

    /// Start the variance process at its long-run level.
    #[must_use]
    pub fn tie_vol0_to_theta(mut self) -> Self {
        self.vol0_is_theta = true;
        self
    }

    /// The repricing function.
    pub fn volatility_function(&self) -> &FftVolatilityFunction {
        &self.fft
    }
}

impl SmileModel for HestonModel {
    type Data = HestonData;

    fn name(&self) -> &'static str {
        "Heston"
    }

    fn n_params(&self) -> usize {
        HestonData::N_PARAMS
    }

    fn parameter_names(&self) -> Vec<String> {
        HestonData::NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn constraints(&self) -> Vec<ParameterConstraint> {
        vec![
            ParameterConstraint::positive(),
            ParameterConstraint::positive(),
            ParameterConstraint::positive(),
            ParameterConstraint::positive(),
            ParameterConstraint::range(-1.0, 1.0),
        ]
    }

    fn to_data(&self, params: &[f64]) -> Result<HestonData, CalibrationError> {
        Ok(HestonData::try_from(params)?)
    }

    fn volatilities(
        &self,
        forward: f64,
        expiry: f64,
        strikes: &[f64],
        data: &HestonData,
    ) -> Result<Vec<f64>, CalibrationError> {
        self.fft.volatilities(forward, expiry, strikes, data)
    }

    fn is_allowed(&self, params: &[f64], _forward: f64, expiry: f64, _strikes: &[f64]) -> bool {
        let Ok(mut data) = HestonData::try_from(params) else {
            return false;
        };
        if self.vol0_is_theta {
            data.vol0 = data.theta;
        }
        self.fft.supports(&data, expiry)
    }

    fn pinned_indices(&self) -> Vec<usize> {
        if self.vol0_is_theta {
            vec![Self::VOL0]
        } else {
            Vec::new()
        }
    }

    fn resolve(&self, params: &mut [f64], _forward: f64, _expiry: f64) -> Result<(), CalibrationError> {
        if self.vol0_is_theta && params.len() == HestonData::N_PARAMS {
            params[Self::VOL0] = params[Self::THETA];
        }
        Ok(())
    }
}
