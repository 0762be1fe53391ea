//! Property tests for the pricing formulas.

use proptest::prelude::*;
use smile_models::analytical::{black_implied_vol, black_price};
use smile_models::smile::mixed_lognormal::weights_from_angles;
use smile_models::smile::{SabrData, SabrHaganVolatility, VolatilityFunction};

proptest! {
    /// vol -> price -> vol recovers the volatility whenever there is time value.
    #[test]
    fn prop_implied_vol_inverts_black(
        vol in 0.02..1.5f64,
        log_moneyness in -0.8..0.8f64,
        expiry in 0.1..10.0f64,
        is_call in any::<bool>(),
    ) {
        let forward = 0.05;
        let strike = forward * f64::exp(log_moneyness);
        let price = black_price(forward, strike, expiry, vol, is_call);
        let otm = black_price(forward, strike, expiry, vol, strike >= forward);
        prop_assume!(otm > 1e-10 * forward);

        let implied = black_implied_vol(forward, strike, expiry, price, is_call).unwrap();
        prop_assert!((implied - vol).abs() < 1e-6 * vol.max(1.0));
    }

    /// Hyperspherical weights are a probability vector for any angles.
    #[test]
    fn prop_weights_on_simplex(angles in proptest::collection::vec(-10.0..10.0f64, 0..6)) {
        let w = weights_from_angles(&angles);
        prop_assert_eq!(w.len(), angles.len() + 1);
        prop_assert!(w.iter().all(|&x| x >= 0.0));
        prop_assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    /// Hagan volatility is positive and finite over a realistic domain.
    #[test]
    fn prop_hagan_positive(
        alpha in 0.01..1.0f64,
        beta in 0.0..1.0f64,
        rho in -0.9..0.9f64,
        nu in 0.01..1.0f64,
        log_moneyness in -0.5..0.5f64,
    ) {
        let data = SabrData::new(alpha, beta, rho, nu);
        let forward = 0.05;
        let vol = SabrHaganVolatility
            .volatility(forward, forward * f64::exp(log_moneyness), 1.0, &data)
            .unwrap();
        prop_assert!(vol.is_finite() && vol > 0.0);
    }
}
