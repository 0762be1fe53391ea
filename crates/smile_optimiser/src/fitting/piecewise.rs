//! Piecewise SABR: one local SABR per three adjacent strikes.
//!
//! A global fit fixes the backbone `beta`; every window of three
//! neighbouring quotes is then re-fitted with `beta` held at that value.
//! Between two nodes the neighbouring windows are blended linearly, so the
//! smile passes through each node with the weight-one window only.
//!
//! Starting points keep `|rho| <= 0.95`. Near `rho = ±1` the SABR smile is
//! flat in `rho` and the solver cannot walk back out.

use smile_core::math::solvers::LMConfig;
use smile_core::math::transforms::FixedMask;
use smile_models::smile::{SabrData, SabrHaganVolatility, VolatilityFunction};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{SabrModel, SmileFitResult, SmileModelFitter};
use crate::{CalibrationError, SmileQuotes};

/// Strikes per local window.
const WINDOW: usize = 3;

/// Largest `|rho|` of a starting point.
const MAX_SEED_RHO: f64 = 0.95;

/// Settings for [`PiecewiseSabrFitter`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PiecewiseConfig {
    /// Solver settings for the global fit and every window
    pub lm: LMConfig,
    /// Window chi-square above which a window counts as poorly fitted
    pub max_window_chi_square: f64,
}

impl Default for PiecewiseConfig {
    fn default() -> Self {
        Self {
            lm: LMConfig::default(),
            max_window_chi_square: 1e-3,
        }
    }
}

impl PiecewiseConfig {
    /// Reject unusable settings.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.lm.validate()?;
        if !(self.max_window_chi_square > 0.0) {
            return Err(CalibrationError::configuration(format!(
                "max_window_chi_square must be positive, got {}",
                self.max_window_chi_square
            )));
        }
        Ok(())
    }
}

/// Fit diagnostics of one local window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowQuality {
    /// Chi-square of the window against its three quotes
    pub chi_square: f64,
    /// Whether the window's solve converged
    pub converged: bool,
}

/// Calibrates a [`PiecewiseSabrSmile`] to a quote set.
#[derive(Debug, Clone, Default)]
pub struct PiecewiseSabrFitter {
    config: PiecewiseConfig,
}

impl PiecewiseSabrFitter {
    /// Fitter with the given settings.
    pub fn new(config: PiecewiseConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &PiecewiseConfig {
        &self.config
    }

    /// Fit the local windows.
    ///
    /// With exactly three quotes there is one window and `beta` stays at
    /// `initial.beta`; a free `beta` would leave four parameters for three
    /// points. Otherwise `beta` comes from a global fit that first holds
    /// `beta` at `initial.beta` and then frees it.
    ///
    /// Each window starts from the global parameters and, if that fit
    /// misses `max_window_chi_square`, is restarted from `initial` with the
    /// global `beta`. The better of the two is kept and its quality is
    /// reported through [`PiecewiseSabrSmile::window_quality`].
    ///
    /// # Errors
    ///
    /// * `CalibrationError::Configuration` - fewer than three quotes, strikes
    ///   not strictly ascending, or invalid settings
    /// * any error raised by the global or a window fit
    pub fn fit(
        &self,
        quotes: &SmileQuotes,
        initial: SabrData,
    ) -> Result<PiecewiseSabrSmile, CalibrationError> {
        self.config.validate()?;
        let n = quotes.len();
        if n < WINDOW {
            return Err(CalibrationError::configuration(format!(
                "piecewise SABR needs at least {} quotes, got {}",
                WINDOW, n
            )));
        }
        if !quotes.is_strictly_ascending() {
            return Err(CalibrationError::configuration(
                "piecewise SABR needs strictly ascending strikes",
            ));
        }

        let initial = interior(initial);
        let fits = if n == WINDOW {
            info!(
                beta = initial.beta,
                "three quotes: single window fitted with beta held at its initial value"
            );
            vec![self.fit_window(quotes, &[initial], 0)?]
        } else {
            let global = self.fit_global(quotes, initial)?;
            let fallback = SabrData {
                beta: global.beta,
                ..initial
            };
            self.fit_windows(quotes, &[global, fallback])?
        };
        let (windows, quality) = fits.into_iter().unzip();

        Ok(PiecewiseSabrSmile {
            forward: quotes.forward(),
            expiry: quotes.expiry(),
            strikes: quotes.strikes().to_vec(),
            windows,
            quality,
            max_window_chi_square: self.config.max_window_chi_square,
        })
    }

    /// Global fit with `beta` held, then with `beta` free from that point.
    fn fit_global(
        &self,
        quotes: &SmileQuotes,
        initial: SabrData,
    ) -> Result<SabrData, CalibrationError> {
        let fitter = SmileModelFitter::with_config(&SabrModel, quotes, self.config.lm);
        let held = fitter.solve(
            &initial.to_vec(),
            &FixedMask::from_indices([SabrModel::BETA]),
        )?;
        let start = interior(SabrData::try_from(held.parameters.as_slice())?);
        let free = fitter.solve(&start.to_vec(), &FixedMask::none())?;
        debug!(
            beta = free.parameters[SabrModel::BETA],
            chi_square = free.chi_square,
            converged = free.converged,
            "global SABR fit"
        );
        Ok(interior(SabrData::try_from(free.parameters.as_slice())?))
    }

    #[cfg(feature = "parallel")]
    fn fit_windows(
        &self,
        quotes: &SmileQuotes,
        seeds: &[SabrData],
    ) -> Result<Vec<(SabrData, WindowQuality)>, CalibrationError> {
        (0..=quotes.len() - WINDOW)
            .into_par_iter()
            .map(|i| self.fit_window(&quotes.slice(i..i + WINDOW)?, seeds, i))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn fit_windows(
        &self,
        quotes: &SmileQuotes,
        seeds: &[SabrData],
    ) -> Result<Vec<(SabrData, WindowQuality)>, CalibrationError> {
        (0..=quotes.len() - WINDOW)
            .map(|i| self.fit_window(&quotes.slice(i..i + WINDOW)?, seeds, i))
            .collect()
    }

    /// Fit one window with `beta` held, trying `seeds` in order until one
    /// fits within the threshold.
    fn fit_window(
        &self,
        window: &SmileQuotes,
        seeds: &[SabrData],
        index: usize,
    ) -> Result<(SabrData, WindowQuality), CalibrationError> {
        let fixed = FixedMask::from_indices([SabrModel::BETA]);
        let fitter = SmileModelFitter::with_config(&SabrModel, window, self.config.lm);
        let mut best: Option<SmileFitResult> = None;

        for (attempt, seed) in seeds.iter().enumerate() {
            let result = fitter.solve(&seed.to_vec(), &fixed)?;
            if attempt > 0 {
                debug!(
                    window = index,
                    attempt,
                    chi_square = result.chi_square,
                    "window restarted"
                );
            }
            if best
                .as_ref()
                .map_or(true, |b| result.chi_square < b.chi_square)
            {
                best = Some(result);
            }
            if best.as_ref().is_some_and(|b| self.fits_well(b)) {
                break;
            }
        }

        let best = best.ok_or_else(|| {
            CalibrationError::configuration("piecewise SABR window has no starting point")
        })?;
        if !self.fits_well(&best) {
            warn!(
                window = index,
                chi_square = best.chi_square,
                converged = best.converged,
                threshold = self.config.max_window_chi_square,
                "local SABR window fits poorly"
            );
        }
        let quality = WindowQuality {
            chi_square: best.chi_square,
            converged: best.converged,
        };
        Ok((SabrData::try_from(best.parameters.as_slice())?, quality))
    }

    fn fits_well(&self, result: &SmileFitResult) -> bool {
        result.converged && result.chi_square <= self.config.max_window_chi_square
    }
}

/// `rho` pulled into `[-0.95, 0.95]`.
fn interior(data: SabrData) -> SabrData {
    SabrData {
        rho: data.rho.clamp(-MAX_SEED_RHO, MAX_SEED_RHO),
        ..data
    }
}

/// Calibrated piecewise SABR smile.
///
/// Holds `N - 2` windows for `N` node strikes; window `i` was fitted to
/// strikes `i..i + 3`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseSabrSmile {
    forward: f64,
    expiry: f64,
    strikes: Vec<f64>,
    windows: Vec<SabrData>,
    quality: Vec<WindowQuality>,
    max_window_chi_square: f64,
}

impl PiecewiseSabrSmile {
    /// Forward of the calibrated smile.
    pub fn forward(&self) -> f64 {
        self.forward
    }

    /// Expiry of the calibrated smile.
    pub fn expiry(&self) -> f64 {
        self.expiry
    }

    /// Node strikes.
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// Local SABR parameters, one per window.
    pub fn windows(&self) -> &[SabrData] {
        &self.windows
    }

    /// Fit diagnostics, one per window.
    pub fn window_quality(&self) -> &[WindowQuality] {
        &self.quality
    }

    /// Indices of windows that did not converge or whose chi-square
    /// exceeds the configured threshold.
    pub fn poorly_fitted_windows(&self) -> Vec<usize> {
        self.quality
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.converged || q.chi_square > self.max_window_chi_square)
            .map(|(i, _)| i)
            .collect()
    }

    /// `true` when every window converged within the threshold.
    pub fn is_well_fitted(&self) -> bool {
        self.poorly_fitted_windows().is_empty()
    }

    /// Implied volatility at `strike`.
    ///
    /// Below the second node the first window is used and above the
    /// second-to-last node the last one. In between, on
    /// `strikes[i] <= k < strikes[i + 1]`, windows `i - 1` and `i` are
    /// blended with weight `(strikes[i + 1] - k) / (strikes[i + 1] - strikes[i])`
    /// on window `i - 1`.
    pub fn volatility(&self, strike: f64) -> Result<f64, CalibrationError> {
        let s = &self.strikes;
        let n = s.len();
        let vol = |window: &SabrData| {
            SabrHaganVolatility.volatility(self.forward, strike, self.expiry, window)
        };

        if !strike.is_finite() {
            return Err(CalibrationError::configuration(format!(
                "strike must be finite, got {}",
                strike
            )));
        }
        if strike <= s[1] {
            return Ok(vol(&self.windows[0])?);
        }
        if strike >= s[n - 2] {
            return Ok(vol(&self.windows[n - WINDOW])?);
        }
        // s[1] < strike < s[n - 2], so 1 <= i <= n - 3
        let i = s.partition_point(|&x| x <= strike) - 1;
        let w = (s[i + 1] - strike) / (s[i + 1] - s[i]);
        let left = vol(&self.windows[i - 1])?;
        let right = vol(&self.windows[i])?;
        Ok(w * left + (1.0 - w) * right)
    }

    /// Implied volatilities at several strikes.
    pub fn volatilities(&self, strikes: &[f64]) -> Result<Vec<f64>, CalibrationError> {
        strikes.iter().map(|&k| self.volatility(k)).collect()
    }
}
