//! Seeded random number generation for procedural scenes.
//!
//! Wraps a ChaCha20 PRNG so the same seed always lays out the same scene.

use glam::Vec3A;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Deterministic random source for scene generation.
pub struct SceneRng {
    rng: ChaCha20Rng,
}

impl SceneRng {
    /// Create a generator from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Generate a random f32 in [0.0, 1.0)
    pub fn f32(&mut self) -> f32 {
        self.rng.random()
    }

    /// Generate a random f32 in [min, max)
    pub fn f32_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.f32()
    }

    /// Generate random RGB color with components in [min, max).
    pub fn color_range(&mut self, min: f32, max: f32) -> Vec3A {
        Vec3A::new(
            self.f32_range(min, max),
            self.f32_range(min, max),
            self.f32_range(min, max),
        )
    }
}
