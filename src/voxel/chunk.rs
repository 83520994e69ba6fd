//! Chunk system for managing cubic regions of SDF samples

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glam::Vec3;

use super::lifecycle::ChunkLifecycle;
use super::sampler::ScalarField;
use crate::math::Aabb;

/// Marching cubes per chunk side
pub const CHUNK_CUBES: usize = 32;

/// Samples per chunk side. One more than the cube count so cube corners on
/// the high faces are shared with the neighbouring chunk.
pub const CHUNK_SAMPLES: usize = CHUNK_CUBES + 1;

/// Size of a chunk in world units (meters)
pub const CHUNK_WORLD_SIZE: f32 = 16.0;

/// Edge length of a single cube in meters
pub const VOXEL_SIZE: f32 = CHUNK_WORLD_SIZE / CHUNK_CUBES as f32;

/// Value fresh chunks are filled with (air)
pub const INITIAL_SDF: f32 = -1.0;

/// Integer coordinate identifying a chunk in the world grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert world position to chunk coordinate
    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: (pos.x / CHUNK_WORLD_SIZE).floor() as i32,
            y: (pos.y / CHUNK_WORLD_SIZE).floor() as i32,
            z: (pos.z / CHUNK_WORLD_SIZE).floor() as i32,
        }
    }

    /// Get the world-space origin (minimum corner) of this chunk
    pub fn world_origin(&self) -> Vec3 {
        Vec3::new(
            self.x as f32 * CHUNK_WORLD_SIZE,
            self.y as f32 * CHUNK_WORLD_SIZE,
            self.z as f32 * CHUNK_WORLD_SIZE,
        )
    }

    /// Coordinate displaced by the given chunk offsets
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// Dense grid of SDF samples, `CHUNK_SAMPLES` per side, stored contiguously
/// with x outermost and z innermost.
#[derive(Clone, Debug, PartialEq)]
pub struct SdfGrid {
    samples: Box<[f32]>,
}

impl SdfGrid {
    /// Total number of samples in a grid
    pub const LEN: usize = CHUNK_SAMPLES * CHUNK_SAMPLES * CHUNK_SAMPLES;

    /// Create a grid with every sample set to `value`
    pub fn filled(value: f32) -> Self {
        Self {
            samples: vec![value; Self::LEN].into_boxed_slice(),
        }
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < CHUNK_SAMPLES && y < CHUNK_SAMPLES && z < CHUNK_SAMPLES);
        (x * CHUNK_SAMPLES + y) * CHUNK_SAMPLES + z
    }

    /// Sample at integer grid position
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.samples[Self::index(x, y, z)]
    }

    /// Overwrite the sample at integer grid position
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        self.samples[Self::index(x, y, z)] = value;
    }

    /// Fill every sample from a function of the grid position
    pub fn fill_with(&mut self, mut f: impl FnMut(usize, usize, usize) -> f32) {
        for x in 0..CHUNK_SAMPLES {
            for y in 0..CHUNK_SAMPLES {
                for z in 0..CHUNK_SAMPLES {
                    self.samples[Self::index(x, y, z)] = f(x, y, z);
                }
            }
        }
    }

    /// Raw sample storage
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

impl Default for SdfGrid {
    fn default() -> Self {
        Self::filled(INITIAL_SDF)
    }
}

/// A single chunk: a 16m cube of SDF samples plus lifecycle state.
///
/// Chunks are shared as `Arc<Chunk>` between the store and generation
/// workers. The store alone inserts and removes them; a worker only writes
/// the sample grid of the chunk it was handed.
pub struct Chunk {
    coord: ChunkCoord,
    bounds: Aabb,
    lifecycle: ChunkLifecycle,
    sdf: RwLock<SdfGrid>,
}

impl Chunk {
    /// Create a new air-filled chunk at the given coordinate
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            bounds: Aabb::from_origin_size(coord.world_origin(), CHUNK_WORLD_SIZE),
            lifecycle: ChunkLifecycle::new(),
            sdf: RwLock::new(SdfGrid::default()),
        }
    }

    /// Coordinate of this chunk in the world grid
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-space bounding box
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Lifecycle state and in-flight flags
    pub fn lifecycle(&self) -> &ChunkLifecycle {
        &self.lifecycle
    }

    /// Read access to the sample grid
    pub fn sdf(&self) -> RwLockReadGuard<'_, SdfGrid> {
        self.sdf.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the sample grid
    pub fn sdf_mut(&self) -> RwLockWriteGuard<'_, SdfGrid> {
        self.sdf.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// World position of grid sample (x, y, z)
    #[inline]
    pub fn sample_position(&self, x: usize, y: usize, z: usize) -> Vec3 {
        self.bounds.min + Vec3::new(x as f32, y as f32, z as f32) * VOXEL_SIZE
    }

    /// Fill every sample from `field`. Does not touch the lifecycle.
    pub fn fill<F: ScalarField + ?Sized>(&self, field: &F) {
        let origin = self.bounds.min;
        let mut grid = self.sdf_mut();
        grid.fill_with(|x, y, z| {
            field.sample(origin + Vec3::new(x as f32, y as f32, z as f32) * VOXEL_SIZE)
        });
    }

    /// Claim a queued chunk, fill it and mark it ready for upload.
    ///
    /// Returns `false` without touching the samples if the chunk was not
    /// queued (already generated, or claimed by another worker).
    pub fn run_generation<F: ScalarField + ?Sized>(&self, field: &F) -> bool {
        if !self.lifecycle.begin_generation() {
            return false;
        }
        self.fill(field);
        self.lifecycle.finish_generation()
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
