//! Calibration settings loaded from TOML.
//!
//! ```toml
//! fixed = [1]
//! recover_atm = true
//!
//! [model]
//! kind = "sabr"
//!
//! [solver]
//! tolerance = 1e-12
//! max_iterations = 500
//! ```
//!
//! Every table and field is optional; missing values take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smile_core::math::solvers::LMConfig;
use smile_core::math::transforms::FixedMask;

use crate::fitting::{HestonFftConfig, PiecewiseConfig, SabrModel, SviVariant};
use crate::CalibrationError;

/// Which smile model a batch job calibrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmileModelKind {
    /// Hagan SABR
    #[default]
    Sabr,
    /// Raw SVI
    Svi {
        /// Constraint variant
        #[serde(default)]
        variant: SviVariant,
    },
    /// Mixture of log-normals
    MixedLogNormal {
        /// Number of components
        n_normals: usize,
    },
    /// Heston repriced by FFT
    Heston {
        /// Hold the initial variance at theta
        #[serde(default)]
        tie_vol0: bool,
    },
}

impl SmileModelKind {
    /// Parameter solved for when the ATM volatility must be recovered, if
    /// the model has a level parameter.
    pub fn level_index(&self) -> Option<usize> {
        match self {
            SmileModelKind::Sabr => Some(SabrModel::ALPHA),
            // sigma_0 scales every component
            SmileModelKind::MixedLogNormal { .. } => Some(0),
            SmileModelKind::Svi { .. } | SmileModelKind::Heston { .. } => None,
        }
    }
}

/// Everything a batch calibration needs besides the quotes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Model to calibrate
    pub model: SmileModelKind,
    /// Levenberg-Marquardt settings
    pub solver: LMConfig,
    /// Parameter indices held at their initial value
    pub fixed: Vec<usize>,
    /// Re-solve the level parameter so the ATM quote is matched exactly
    pub recover_atm: bool,
    /// FFT settings, used by Heston only
    pub heston: HestonFftConfig,
    /// Piecewise SABR settings
    pub piecewise: PiecewiseConfig,
}

impl CalibrationSettings {
    /// Parse and validate settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, CalibrationError> {
        let settings: CalibrationSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalibrationError::configuration(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject settings no calibration can run with.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.solver.validate()?;
        self.heston.validate()?;
        self.piecewise.validate()?;
        if let SmileModelKind::MixedLogNormal { n_normals: 0 } = self.model {
            return Err(CalibrationError::configuration(
                "mixed log-normal needs at least one component",
            ));
        }
        if self.recover_atm && self.model.level_index().is_none() {
            return Err(CalibrationError::configuration(format!(
                "ATM recovery is not available for {:?}",
                self.model
            )));
        }
        Ok(())
    }

    /// Fixed indices as a mask.
    pub fn fixed_mask(&self) -> FixedMask {
        FixedMask::from_indices(self.fixed.iter().copied())
    }
}
