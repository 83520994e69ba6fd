//! Seeded fractal noise layers

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Parameters for a single fractal noise layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayerParams {
    pub seed_offset: u32, // Added to the world seed so layers stay independent
    pub frequency: f32,   // Base frequency in 1/meters
    pub octaves: u32,     // FBM octaves (detail levels)
    pub persistence: f32, // FBM persistence (0.5 typical)
    pub lacunarity: f32,  // FBM lacunarity (2.0 typical)
    pub amplitude: f32,   // Scale applied to the raw [-1, 1] output
}

impl Default for NoiseLayerParams {
    fn default() -> Self {
        Self {
            seed_offset: 0,
            frequency: 0.02,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
            amplitude: 1.0,
        }
    }
}

/// A fractal Brownian motion layer over Perlin noise.
///
/// Deterministic for a given seed and parameter set, and safe to share
/// between generation workers.
#[derive(Clone)]
pub struct NoiseLayer {
    fbm: Fbm<Perlin>,
    amplitude: f32,
}

impl NoiseLayer {
    /// Build a layer seeded from the world seed plus the layer's offset
    pub fn new(world_seed: u32, params: &NoiseLayerParams) -> Self {
        let fbm = Fbm::<Perlin>::new(world_seed.wrapping_add(params.seed_offset))
            .set_octaves(params.octaves.max(1) as usize)
            .set_frequency(params.frequency as f64)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self {
            fbm,
            amplitude: params.amplitude,
        }
    }

    /// Raw noise value, roughly in [-1, 1]
    #[inline]
    pub fn raw(&self, p: Vec3) -> f32 {
        self.fbm.get([p.x as f64, p.y as f64, p.z as f64]) as f32
    }

    /// Noise value scaled by the layer amplitude
    #[inline]
    pub fn sample(&self, p: Vec3) -> f32 {
        self.raw(p) * self.amplitude
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}
