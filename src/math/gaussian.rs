//! Discrete Gaussian sampling for encryption noise.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Default noise standard deviation.
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Discrete Gaussian sampler over Z using rejection sampling.
///
/// Samples are cut off at 6σ; the acceptance test against
/// exp(-x²/(2σ²)) gives the discrete Gaussian shape within the tailcut.
#[derive(Clone)]
pub struct GaussianSampler {
    sigma: f64,
    tailcut: i64,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Sampler seeded from OS entropy.
    pub fn new(sigma: f64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::from_entropy())
    }

    /// Deterministic sampler for a fixed seed.
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(sigma: f64, rng: ChaCha20Rng) -> Self {
        let tailcut = (sigma * 6.0).ceil() as i64;
        Self { sigma, tailcut, rng }
    }

    /// Standard deviation σ.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// One sample from D_σ in signed representation.
    pub fn sample(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        loop {
            let x = self.rng.gen_range(-self.tailcut..=self.tailcut);
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// A vector of signed samples.
    pub fn sample_vec(&mut self, len: usize) -> Vec<i64> {
        (0..len).map(|_| self.sample()).collect()
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}
