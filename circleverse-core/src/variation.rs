//! Sources of month-to-month cash-flow noise.
//!
//! All randomness in the engine goes through [`Variation`], so a simulation
//! built from the same seed replays the same trajectory, and tests can pin the
//! noise to an exact factor.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DEFAULT_VARIATION_BAND;

/// Produces multiplicative factors applied to a household's monthly income
/// and expenses. Each call yields one independent factor.
pub trait Variation {
    fn factor(&mut self) -> f64;
}

/// Uniform factors in `[1 - band, 1 + band]`.
#[derive(Debug, Clone)]
pub struct UniformVariation<R = StdRng> {
    rng: R,
    band: f64,
}

impl UniformVariation<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), DEFAULT_VARIATION_BAND)
    }
}

impl<R: Rng> UniformVariation<R> {
    pub fn new(rng: R, band: f64) -> Self {
        Self { rng, band }
    }

    pub fn with_band(mut self, band: f64) -> Self {
        self.band = band;
        self
    }
}

impl<R: Rng> Variation for UniformVariation<R> {
    fn factor(&mut self) -> f64 {
        if self.band == 0.0 {
            return 1.0;
        }
        self.rng.random_range((1.0 - self.band)..=(1.0 + self.band))
    }
}

/// Always returns the same factor. `FixedVariation(1.0)` disables noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVariation(pub f64);

impl Default for FixedVariation {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Variation for FixedVariation {
    fn factor(&mut self) -> f64 {
        self.0
    }
}
