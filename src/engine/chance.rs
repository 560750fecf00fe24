//! Random draws used by the engines. Every resolver takes `&mut dyn RngCore`
//! so callers decide the source: a seeded `SmallRng` in play, a fixed-output
//! double in tests.

use rand::{Rng, RngCore};

/// Roll against a percentage chance in `0..=100`.
pub fn roll(rng: &mut dyn RngCore, chance_pct: f64) -> bool {
    if chance_pct <= 0.0 {
        return false;
    }
    if chance_pct >= 100.0 {
        return true;
    }
    rng.random_range(0.0..100.0) < chance_pct
}

/// Uniform draw from the closed interval `[low, high]`.
pub fn uniform(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    if high <= low {
        return low;
    }
    rng.random_range(low..=high)
}

/// `fraction` of `amount`, rounded down and never more than `amount`.
pub fn portion(amount: u64, fraction: f64) -> u64 {
    let fraction = fraction.clamp(0.0, 1.0);
    ((amount as f64 * fraction).floor() as u64).min(amount)
}
