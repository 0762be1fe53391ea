//! Fourier option pricing.
//!
//! - [`CharacteristicExponent`]: log characteristic function of the
//!   forward return, with Heston and Black implementations
//! - [`FftPricer`]: Carr-Madan FFT pricer returning prices on a strike grid

mod characteristic;
mod error;
mod fft;

pub use characteristic::{
    BlackCharacteristicExponent, CharacteristicExponent, HestonCharacteristicExponent,
};
pub use error::FourierError;
pub use fft::FftPricer;
