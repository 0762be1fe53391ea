//! Characteristic exponents of `ln(F_T / F_0)` under the forward measure.

use num_complex::Complex64;

use crate::smile::HestonData;

/// Log of the characteristic function of the log forward return.
///
/// Implementations must satisfy the martingale condition `ψ(-i) = 0`.
pub trait CharacteristicExponent {
    /// `ψ(u) = ln E[exp(i·u·ln(F_T/F_0))]` at expiry `t`.
    fn exponent(&self, u: Complex64, expiry: f64) -> Complex64;
}

/// Heston characteristic exponent in the Albrecher/Gatheral form, which
/// avoids the branch-cut discontinuity of the complex logarithm.
///
/// ```text
/// β = κ - ρωiu
/// d = √(β² + ω²(u² + iu)),  Re d ≥ 0
/// g = (β - d) / (β + d)
/// C = κθ/ω² · [(β - d)T - 2 ln((1 - g e^(-dT)) / (1 - g))]
/// D = (β - d)/ω² · (1 - e^(-dT)) / (1 - g e^(-dT))
/// ψ(u) = C + D·V₀
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonCharacteristicExponent {
    data: HestonData,
}

impl HestonCharacteristicExponent {
    /// Wrap Heston parameters.
    pub fn new(data: HestonData) -> Self {
        Self { data }
    }

    /// The wrapped parameters.
    pub fn data(&self) -> &HestonData {
        &self.data
    }
}

impl CharacteristicExponent for HestonCharacteristicExponent {
    fn exponent(&self, u: Complex64, expiry: f64) -> Complex64 {
        let HestonData {
            kappa,
            theta,
            vol0,
            omega,
            rho,
        } = self.data;
        let one = Complex64::new(1.0, 0.0);
        let iu = Complex64::i() * u;
        let omega2 = omega * omega;

        let beta = kappa - rho * omega * iu;
        let mut d = (beta * beta + omega2 * (u * u + iu)).sqrt();
        if d.re < 0.0 {
            d = -d;
        }
        let g = (beta - d) / (beta + d);
        let exp_dt = (-d * expiry).exp();

        let c = kappa * theta / omega2
            * ((beta - d) * expiry - 2.0 * ((one - g * exp_dt) / (one - g)).ln());
        let d_term = (beta - d) / omega2 * (one - exp_dt) / (one - g * exp_dt);
        c + d_term * vol0
    }
}

/// Log-normal forward with constant volatility: `ψ(u) = -σ²T(u² + iu)/2`.
///
/// Mainly a reference for validating Fourier pricers against Black prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackCharacteristicExponent {
    vol: f64,
}

impl BlackCharacteristicExponent {
    /// Constant volatility `vol`.
    pub fn new(vol: f64) -> Self {
        Self { vol }
    }
}

impl CharacteristicExponent for BlackCharacteristicExponent {
    fn exponent(&self, u: Complex64, expiry: f64) -> Complex64 {
        -0.5 * self.vol * self.vol * expiry * (u * u + Complex64::i() * u)
    }
}
