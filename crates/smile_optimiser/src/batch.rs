//! Independent calibrations over many quote sets.
//!
//! Each quote set is calibrated on its own; one failure never stops the
//! others. With the `parallel` feature the sets are spread over the rayon
//! thread pool.

use smile_core::math::solvers::LMConfig;
use smile_core::math::transforms::FixedMask;
use smile_models::smile::SabrData;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{CalibrationSettings, SmileModelKind};
use crate::fitting::{
    AtmRecoveringModel, HestonModel, MixedLogNormalModel, PiecewiseSabrFitter, PiecewiseSabrSmile,
    SabrModel, SmileFitResult, SmileModel, SmileModelFitter, SviModel,
};
use crate::{CalibrationError, SmileQuotes};

/// Outcome of one calibration in a batch.
pub type BatchResult = Result<SmileFitResult, CalibrationError>;

/// Calibrate `model` to every quote set from the same starting point.
///
/// Returns one result per quote set, in input order.
pub fn calibrate_batch<M: SmileModel>(
    model: &M,
    quote_sets: &[SmileQuotes],
    initial: &[f64],
    fixed: &FixedMask,
    config: &LMConfig,
) -> Vec<BatchResult> {
    let results = map_quotes(quote_sets, |quotes| {
        SmileModelFitter::with_config(model, quotes, *config).solve(initial, fixed)
    });
    log_summary(model.name(), &results);
    results
}

/// Calibrate the model described by `settings` to every quote set.
///
/// With `recover_atm` each quote set gets its own ATM target, interpolated
/// from its quotes at the forward.
///
/// # Errors
///
/// `CalibrationError::Configuration` when the settings do not validate.
/// Failures of individual calibrations are reported per quote set.
pub fn calibrate_with_settings(
    settings: &CalibrationSettings,
    quote_sets: &[SmileQuotes],
    initial: &[f64],
) -> Result<Vec<BatchResult>, CalibrationError> {
    settings.validate()?;
    let results = match settings.model {
        SmileModelKind::Sabr => dispatch(SabrModel, settings, quote_sets, initial),
        SmileModelKind::Svi { variant } => {
            dispatch(SviModel::new(variant), settings, quote_sets, initial)
        }
        SmileModelKind::MixedLogNormal { n_normals } => dispatch(
            MixedLogNormalModel::new(n_normals)?,
            settings,
            quote_sets,
            initial,
        ),
        SmileModelKind::Heston { tie_vol0 } => {
            let model = HestonModel::new(settings.heston)?;
            let model = if tie_vol0 {
                model.tie_vol0_to_theta()
            } else {
                model
            };
            dispatch(model, settings, quote_sets, initial)
        }
    };
    Ok(results)
}

/// Piecewise SABR for every quote set.
///
/// # Errors
///
/// `CalibrationError::Configuration` when the piecewise settings do not
/// validate.
pub fn calibrate_piecewise_batch(
    settings: &CalibrationSettings,
    quote_sets: &[SmileQuotes],
    initial: SabrData,
) -> Result<Vec<Result<PiecewiseSabrSmile, CalibrationError>>, CalibrationError> {
    settings.piecewise.validate()?;
    let fitter = PiecewiseSabrFitter::new(settings.piecewise);
    Ok(map_quotes(quote_sets, |quotes| fitter.fit(quotes, initial)))
}

fn dispatch<M: SmileModel + Clone>(
    model: M,
    settings: &CalibrationSettings,
    quote_sets: &[SmileQuotes],
    initial: &[f64],
) -> Vec<BatchResult> {
    let fixed = settings.fixed_mask();
    let level = match (settings.recover_atm, settings.model.level_index()) {
        (true, Some(level)) => level,
        _ => return calibrate_batch(&model, quote_sets, initial, &fixed, &settings.solver),
    };

    let results = map_quotes(quote_sets, |quotes| {
        let atm = AtmRecoveringModel::from_quotes(model.clone(), level, quotes);
        SmileModelFitter::with_config(&atm, quotes, settings.solver).solve(initial, &fixed)
    });
    log_summary(model.name(), &results);
    results
}

#[cfg(feature = "parallel")]
fn map_quotes<T, F>(quote_sets: &[SmileQuotes], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&SmileQuotes) -> T + Sync + Send,
{
    quote_sets.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_quotes<T, F>(quote_sets: &[SmileQuotes], f: F) -> Vec<T>
where
    F: Fn(&SmileQuotes) -> T,
{
    quote_sets.iter().map(f).collect()
}

fn log_summary(model: &str, results: &[BatchResult]) {
    let converged = results
        .iter()
        .filter(|r| matches!(r, Ok(fit) if fit.converged))
        .count();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        model,
        total = results.len(),
        converged,
        failed,
        "batch calibration finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use smile_models::smile::{SabrHaganVolatility, VolatilityFunction};

    fn sabr_quotes(forward: f64, truth: SabrData) -> SmileQuotes {
        let strikes: Vec<f64> = [0.6, 0.8, 1.0, 1.2, 1.4]
            .iter()
            .map(|m| m * forward)
            .collect();
        let vols = SabrHaganVolatility
            .volatilities(forward, &strikes, 2.0, &truth)
            .unwrap();
        SmileQuotes::with_uniform_error(forward, 2.0, strikes, vols, 1e-4).unwrap()
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let truths = [
            SabrData::new(0.2, 0.5, -0.3, 0.3),
            SabrData::new(0.3, 0.5, 0.1, 0.5),
            SabrData::new(0.25, 0.5, -0.5, 0.2),
        ];
        let quote_sets: Vec<_> = truths.iter().map(|t| sabr_quotes(0.04, *t)).collect();
        let results = calibrate_batch(
            &SabrModel,
            &quote_sets,
            &[0.1, 0.5, 0.0, 0.1],
            &FixedMask::from_indices([SabrModel::BETA]),
            &LMConfig::default(),
        );

        assert_eq!(results.len(), 3);
        for (result, truth) in results.iter().zip(&truths) {
            let fit = result.as_ref().unwrap();
            assert!(fit.converged);
            assert_relative_eq!(fit.parameters[2], truth.rho, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_one_failure_does_not_stop_the_batch() {
        let good = sabr_quotes(0.04, SabrData::new(0.2, 0.5, -0.3, 0.3));
        let quote_sets = vec![good.clone(), good];
        // beta = 2 lies outside (0, 2), so every set fails the same way
        let results = calibrate_batch(
            &SabrModel,
            &quote_sets,
            &[0.1, 2.0, 0.0, 0.1],
            &FixedMask::none(),
            &LMConfig::default(),
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.as_ref().unwrap_err().is_configuration()));
    }

    #[test]
    fn test_settings_with_atm_recovery() {
        let quote_sets = vec![sabr_quotes(0.04, SabrData::new(0.2, 0.5, -0.3, 0.3))];
        let settings = CalibrationSettings {
            fixed: vec![SabrModel::BETA],
            recover_atm: true,
            ..Default::default()
        };
        let results =
            calibrate_with_settings(&settings, &quote_sets, &[0.1, 0.5, 0.0, 0.1]).unwrap();
        let fit = results[0].as_ref().unwrap();
        let data = SabrData::try_from(fit.parameters.as_slice()).unwrap();
        let atm = SabrHaganVolatility
            .volatility(0.04, 0.04, 2.0, &data)
            .unwrap();
        assert_relative_eq!(atm, quote_sets[0].atm_volatility(), epsilon = 1e-10);
    }

    #[test]
    fn test_piecewise_batch() {
        let quote_sets = vec![
            sabr_quotes(0.04, SabrData::new(0.2, 0.5, -0.3, 0.3)),
            sabr_quotes(0.05, SabrData::new(0.3, 0.5, 0.1, 0.5)),
        ];
        let smiles = calibrate_piecewise_batch(
            &CalibrationSettings::default(),
            &quote_sets,
            SabrData::new(0.1, 0.5, 0.0, 0.1),
        )
        .unwrap();
        assert_eq!(smiles.len(), 2);
        assert!(smiles.iter().all(|s| s.as_ref().unwrap().windows().len() == 3));
    }
}
