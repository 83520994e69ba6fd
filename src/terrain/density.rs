//! Layered noise density field
//!
//! The field follows the crate-wide SDF sign convention: positive inside
//! solid, negative in air, zero on the surface. It is composed of:
//! - a 3D fractal terrain layer (overhangs allowed)
//! - a low-frequency undulation layer plus a vertical falloff, so density
//!   trends towards air with altitude without being monotonic
//! - soft cave carving where a second layer exceeds a threshold
//! - an altitude band that reintroduces density for floating islands
//! - a high-frequency detail layer
//!
//! The sum is multiplied by `slope_scale`, which sets how steeply the field
//! crosses zero near the surface.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::layer::{NoiseLayer, NoiseLayerParams};
use crate::voxel::sampler::ScalarField;

/// Parameters controlling density generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityParams {
    pub seed: u32,
    pub terrain: NoiseLayerParams,
    pub undulation: NoiseLayerParams,
    pub caves: NoiseLayerParams,
    pub islands: NoiseLayerParams,
    pub detail: NoiseLayerParams,
    /// Height where the vertical falloff crosses zero
    pub ground_level: f32,
    /// Density lost per meter of altitude above `ground_level`
    pub height_falloff: f32,
    /// Cave layer values above this carve air
    pub cave_threshold: f32,
    /// Lower edge of the floating island band
    pub island_min_y: f32,
    /// Upper edge of the floating island band
    pub island_max_y: f32,
    /// Island layer values above this become solid inside the band
    pub island_threshold: f32,
    /// Final multiplier on the summed density (surface steepness)
    pub slope_scale: f32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            terrain: NoiseLayerParams {
                seed_offset: 0,
                frequency: 0.02,
                octaves: 4,
                amplitude: 10.0,
                ..Default::default()
            },
            undulation: NoiseLayerParams {
                seed_offset: 1,
                frequency: 0.003,
                octaves: 2,
                amplitude: 30.0,
                ..Default::default()
            },
            caves: NoiseLayerParams {
                seed_offset: 2,
                frequency: 0.025,
                octaves: 2,
                amplitude: 60.0, // Carve strength per unit past threshold
                ..Default::default()
            },
            islands: NoiseLayerParams {
                seed_offset: 3,
                frequency: 0.015,
                octaves: 3,
                amplitude: 40.0,
                ..Default::default()
            },
            detail: NoiseLayerParams {
                seed_offset: 4,
                frequency: 0.2,
                octaves: 2,
                amplitude: 0.75,
                ..Default::default()
            },
            ground_level: 0.0,
            height_falloff: 1.0,
            cave_threshold: 0.3,
            island_min_y: 60.0,
            island_max_y: 110.0,
            island_threshold: 0.15,
            slope_scale: 0.5,
        }
    }
}

/// Procedural SDF generator.
///
/// Pure and immutable after construction, so any number of chunk workers
/// may sample it concurrently.
#[derive(Clone)]
pub struct DensityField {
    params: DensityParams,
    terrain: NoiseLayer,
    undulation: NoiseLayer,
    caves: NoiseLayer,
    islands: NoiseLayer,
    detail: NoiseLayer,
}

impl DensityField {
    /// Create a new density field with the given parameters
    pub fn new(params: DensityParams) -> Self {
        let seed = params.seed;
        Self {
            terrain: NoiseLayer::new(seed, &params.terrain),
            undulation: NoiseLayer::new(seed, &params.undulation),
            caves: NoiseLayer::new(seed, &params.caves),
            islands: NoiseLayer::new(seed, &params.islands),
            detail: NoiseLayer::new(seed, &params.detail),
            params,
        }
    }

    /// Get density parameters
    pub fn params(&self) -> &DensityParams {
        &self.params
    }

    /// SDF value at a world position
    pub fn sample(&self, p: Vec3) -> f32 {
        let params = &self.params;
        let altitude = p.y - params.ground_level;

        let mut density = self.terrain.sample(p)
            + self.undulation.sample(p)
            - altitude * params.height_falloff;

        // Soft carving: deeper past the threshold removes more
        let cave = self.caves.raw(p);
        if cave > params.cave_threshold {
            density -= (cave - params.cave_threshold) * self.caves.amplitude();
        }

        let band = self.island_weight(p.y);
        if band > 0.0 {
            let island = self.islands.raw(p) - params.island_threshold;
            // Cancel the falloff inside the band, then let the island layer decide
            density += band * (altitude * params.height_falloff + island * self.islands.amplitude());
        }

        density += self.detail.sample(p);

        density * params.slope_scale
    }

    /// Tent weight of the island band: 1 at its center, 0 at and beyond its edges
    pub fn island_weight(&self, y: f32) -> f32 {
        let min = self.params.island_min_y;
        let max = self.params.island_max_y;
        if max <= min || y <= min || y >= max {
            return 0.0;
        }
        let center = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        1.0 - (y - center).abs() / half
    }
}

impl ScalarField for DensityField {
    #[inline]
    fn sample(&self, p: Vec3) -> f32 {
        DensityField::sample(self, p)
    }
}
