//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Random sources used to perturb nominal circuit values."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::f64::consts::PI;

use am2_common::NoiseModel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Smallest value the first uniform draw may take, keeping `ln(u1)` finite.
pub const MIN_UNIFORM: f64 = 1e-10;

/// Strategy producing approximately normal deviates around a mean.
///
/// The engine never reaches for a global generator; every call site passes
/// its own source so tests can pin the sequence with a seed.
pub trait Variation {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64;
}

impl<V: Variation + ?Sized> Variation for &mut V {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64 {
        (**self).generate(mean, std_dev)
    }
}

impl<V: Variation + ?Sized> Variation for Box<V> {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64 {
        (**self).generate(mean, std_dev)
    }
}

/// Seeded generator when `seed` is set, OS entropy otherwise.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn degenerate(std_dev: f64) -> bool {
    !std_dev.is_finite() || std_dev <= 0.0
}

/// Box–Muller transform over two independent uniform draws.
#[derive(Debug, Clone)]
pub struct BoxMuller<R> {
    rng: R,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl BoxMuller<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_seed_or_entropy(seed: Option<u64>) -> Self {
        Self::new(rng_for(seed))
    }
}

impl<R: Rng> Variation for BoxMuller<R> {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64 {
        if degenerate(std_dev) {
            return mean;
        }
        let u1 = self.rng.gen::<f64>().max(MIN_UNIFORM);
        let u2 = self.rng.gen::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + z * std_dev
    }
}

/// Samples through `rand_distr::Normal`.
#[derive(Debug, Clone)]
pub struct NormalNoise<R> {
    rng: R,
}

impl<R: Rng> NormalNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl NormalNoise<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Variation for NormalNoise<R> {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64 {
        if degenerate(std_dev) || !mean.is_finite() {
            return mean;
        }
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
    }
}

/// Configuration-selected random source.
#[derive(Debug, Clone)]
pub enum NoiseSource {
    BoxMuller(BoxMuller<StdRng>),
    Normal(NormalNoise<StdRng>),
}

impl NoiseSource {
    /// Build the source named by `model`, seeded for reproducibility when `seed` is set.
    pub fn new(model: NoiseModel, seed: Option<u64>) -> Self {
        let rng = rng_for(seed);
        match model {
            NoiseModel::BoxMuller => NoiseSource::BoxMuller(BoxMuller::new(rng)),
            NoiseModel::Normal => NoiseSource::Normal(NormalNoise::new(rng)),
        }
    }
}

impl Variation for NoiseSource {
    fn generate(&mut self, mean: f64, std_dev: f64) -> f64 {
        match self {
            NoiseSource::BoxMuller(source) => source.generate(mean, std_dev),
            NoiseSource::Normal(source) => source.generate(mean, std_dev),
        }
    }
}
