//! Continuous SDF sampling over chunk grids
//!
//! One trilinear routine serves both consumers: the mesher samples its own
//! chunk with clamped local coordinates, physics samples the whole store
//! through [`FieldSampler`] and sees missing data as deep air.

use glam::Vec3;

use super::chunk::{ChunkCoord, SdfGrid, CHUNK_CUBES, VOXEL_SIZE};
use super::store::ChunkStore;

/// Value returned where no generated chunk covers a position
pub const AIR_SENTINEL: f32 = -10.0;

/// Below this length a gradient is treated as degenerate
const MIN_GRADIENT_LENGTH: f32 = 1e-5;

/// Upper clamp for local sample coordinates so the +1 neighbour stays in range
const CLAMP_MAX: f32 = CHUNK_CUBES as f32 - 0.001;

/// A scalar field over world space. Positive is solid, negative is air.
pub trait ScalarField: Send + Sync {
    fn sample(&self, p: Vec3) -> f32;
}

impl<F> ScalarField for F
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    #[inline]
    fn sample(&self, p: Vec3) -> f32 {
        self(p)
    }
}

/// Trilinear interpolation at a grid-space position. Caller guarantees
/// every component lies in `[0, CHUNK_CUBES)`.
#[inline]
fn trilinear(grid: &SdfGrid, v: Vec3) -> f32 {
    let base = v.floor();
    let t = v - base;
    let (x0, y0, z0) = (base.x as usize, base.y as usize, base.z as usize);
    debug_assert!(x0 < CHUNK_CUBES && y0 < CHUNK_CUBES && z0 < CHUNK_CUBES);
    let (x1, y1, z1) = (x0 + 1, y0 + 1, z0 + 1);

    let c00 = lerp(grid.get(x0, y0, z0), grid.get(x1, y0, z0), t.x);
    let c10 = lerp(grid.get(x0, y1, z0), grid.get(x1, y1, z0), t.x);
    let c01 = lerp(grid.get(x0, y0, z1), grid.get(x1, y0, z1), t.x);
    let c11 = lerp(grid.get(x0, y1, z1), grid.get(x1, y1, z1), t.x);

    let c0 = lerp(c00, c10, t.y);
    let c1 = lerp(c01, c11, t.y);
    lerp(c0, c1, t.z)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sample at a grid-space position, `None` outside `[0, CHUNK_CUBES)`
pub fn sample_grid_exact(grid: &SdfGrid, v: Vec3) -> Option<f32> {
    let limit = CHUNK_CUBES as f32;
    let inside = v.cmpge(Vec3::ZERO).all() && v.cmplt(Vec3::splat(limit)).all();
    inside.then(|| trilinear(grid, v))
}

/// Sample at a grid-space position, clamping into the grid first
pub fn sample_grid_clamped(grid: &SdfGrid, v: Vec3) -> f32 {
    trilinear(grid, v.clamp(Vec3::ZERO, Vec3::splat(CLAMP_MAX)))
}

/// Central-difference gradient, not normalized
pub fn raw_gradient<F: ScalarField + ?Sized>(field: &F, p: Vec3, step: f32) -> Vec3 {
    let dx = Vec3::X * step;
    let dy = Vec3::Y * step;
    let dz = Vec3::Z * step;
    Vec3::new(
        field.sample(p + dx) - field.sample(p - dx),
        field.sample(p + dy) - field.sample(p - dy),
        field.sample(p + dz) - field.sample(p - dz),
    )
}

/// Normalized gradient (points into solid). Falls back to `Vec3::Y`.
pub fn gradient<F: ScalarField + ?Sized>(field: &F, p: Vec3, step: f32) -> Vec3 {
    let g = raw_gradient(field, p, step);
    let len = g.length();
    if len < MIN_GRADIENT_LENGTH { Vec3::Y } else { g / len }
}

/// Outward surface normal, pointing from solid towards air. Falls back to
/// `Vec3::Y` where the field is flat.
pub fn surface_normal<F: ScalarField + ?Sized>(field: &F, p: Vec3, step: f32) -> Vec3 {
    let g = raw_gradient(field, p, step);
    let len = g.length();
    if len < MIN_GRADIENT_LENGTH { Vec3::Y } else { -g / len }
}

/// A single chunk grid exposed as a field over chunk-local world offsets.
/// Positions outside the chunk are clamped to its border.
pub struct LocalGridField<'a> {
    grid: &'a SdfGrid,
}

impl<'a> LocalGridField<'a> {
    pub fn new(grid: &'a SdfGrid) -> Self {
        Self { grid }
    }
}

impl ScalarField for LocalGridField<'_> {
    #[inline]
    fn sample(&self, local: Vec3) -> f32 {
        sample_grid_clamped(self.grid, local / VOXEL_SIZE)
    }
}

/// World-space SDF queries across every generated chunk in a store
pub struct FieldSampler<'a> {
    store: &'a ChunkStore,
}

impl<'a> FieldSampler<'a> {
    pub fn new(store: &'a ChunkStore) -> Self {
        Self { store }
    }

    /// SDF at a world position. Missing or not yet generated chunks read as
    /// [`AIR_SENTINEL`].
    pub fn sample(&self, p: Vec3) -> f32 {
        let coord = ChunkCoord::from_world_pos(p);
        let Some(chunk) = self.store.get(coord) else {
            return AIR_SENTINEL;
        };
        if !chunk.lifecycle().state().has_samples() {
            return AIR_SENTINEL;
        }
        let local = (p - coord.world_origin()) / VOXEL_SIZE;
        sample_grid_exact(&chunk.sdf(), local).unwrap_or(AIR_SENTINEL)
    }

    /// Normalized gradient at a world position
    pub fn gradient(&self, p: Vec3, step: f32) -> Vec3 {
        gradient(self, p, step)
    }
}

impl ScalarField for FieldSampler<'_> {
    #[inline]
    fn sample(&self, p: Vec3) -> f32 {
        FieldSampler::sample(self, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::CHUNK_SAMPLES;

    fn ramp_grid() -> SdfGrid {
        let mut grid = SdfGrid::default();
        grid.fill_with(|x, y, z| x as f32 * 0.25 - y as f32 + z as f32 * 2.0);
        grid
    }

    fn loaded_store(field: impl ScalarField, radius: i32) -> ChunkStore {
        let mut store = ChunkStore::new();
        for chunk in store.update(Vec3::ZERO, radius, radius + 1) {
            assert!(chunk.run_generation(&field));
        }
        store
    }

    #[test]
    fn test_grid_points_round_trip() {
        let grid = ramp_grid();
        for x in 0..CHUNK_CUBES {
            for y in (0..CHUNK_CUBES).step_by(3) {
                for z in (0..CHUNK_CUBES).step_by(5) {
                    let v = Vec3::new(x as f32, y as f32, z as f32);
                    assert_eq!(sample_grid_exact(&grid, v), Some(grid.get(x, y, z)));
                }
            }
        }
    }

    #[test]
    fn test_linear_field_interpolates_exactly() {
        let grid = ramp_grid();
        let v = Vec3::new(3.5, 10.25, 7.75);
        let expected = v.x * 0.25 - v.y + v.z * 2.0;
        let got = sample_grid_exact(&grid, v).unwrap();
        assert!((got - expected).abs() < 1e-4);
    }

    #[test]
    fn test_exact_rejects_out_of_range() {
        let grid = ramp_grid();
        let limit = CHUNK_CUBES as f32;
        assert!(sample_grid_exact(&grid, Vec3::new(-0.01, 1.0, 1.0)).is_none());
        assert!(sample_grid_exact(&grid, Vec3::new(1.0, limit, 1.0)).is_none());
        assert!(sample_grid_exact(&grid, Vec3::new(1.0, 1.0, limit + 3.0)).is_none());
        assert!(sample_grid_exact(&grid, Vec3::splat(limit - 0.01)).is_some());
    }

    #[test]
    fn test_clamped_stays_in_grid() {
        let grid = ramp_grid();
        let far = sample_grid_clamped(&grid, Vec3::new(100.0, -50.0, 100.0));
        let corner = grid.get(CHUNK_SAMPLES - 1, 0, CHUNK_SAMPLES - 1);
        assert!((far - corner).abs() < 0.01);
    }

    #[test]
    fn test_gradient_of_plane() {
        let field = |p: Vec3| -p.y;
        assert_eq!(gradient(&field, Vec3::new(1.0, 2.0, 3.0), 0.1), -Vec3::Y);
        assert_eq!(surface_normal(&field, Vec3::new(1.0, 2.0, 3.0), 0.1), Vec3::Y);
    }

    #[test]
    fn test_flat_field_falls_back_to_up() {
        let field = |_: Vec3| 3.0;
        assert_eq!(gradient(&field, Vec3::ZERO, 0.1), Vec3::Y);
        assert_eq!(surface_normal(&field, Vec3::ZERO, 0.1), Vec3::Y);
    }

    #[test]
    fn test_missing_chunk_reads_as_air() {
        let store = ChunkStore::new();
        let sampler = FieldSampler::new(&store);
        assert_eq!(sampler.sample(Vec3::new(4.0, -100.0, 4.0)), AIR_SENTINEL);
    }

    #[test]
    fn test_ungenerated_chunk_reads_as_air() {
        let mut store = ChunkStore::new();
        store.get_or_create(ChunkCoord::new(0, 0, 0));
        let sampler = FieldSampler::new(&store);
        assert_eq!(sampler.sample(Vec3::new(4.0, 4.0, 4.0)), AIR_SENTINEL);
    }

    #[test]
    fn test_sampler_matches_field_across_chunks() {
        let field = |p: Vec3| -p.y + 0.1 * p.x;
        let store = loaded_store(field, 1);
        let sampler = FieldSampler::new(&store);
        for p in [
            Vec3::new(3.1, 0.2, -4.2),
            Vec3::new(-7.3, -15.9, 12.0),
            Vec3::new(15.99, 1.0, 0.0),
            Vec3::new(-0.01, 8.0, -0.01),
        ] {
            assert!((sampler.sample(p) - field(p)).abs() < 1e-3, "mismatch at {:?}", p);
        }
    }

    #[test]
    fn test_sampler_gradient_on_ground_plane() {
        let store = loaded_store(|p: Vec3| -p.y, 1);
        let sampler = FieldSampler::new(&store);
        let n = surface_normal(&sampler, Vec3::new(3.1, 0.0, -4.2), 0.1);
        assert!((n - Vec3::Y).length() < 1e-4, "normal was {:?}", n);
    }
}
