//! Chunk store - owns every live chunk and keeps a window of them loaded
//! around an observer.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::chunk::{Chunk, ChunkCoord};

/// Load and unload radii in chunks. Distances are Chebyshev per axis group:
/// the horizontal radii bound |dx| and |dz|, the vertical radii bound |dy|.
///
/// Unload radii may not be smaller than the matching load radii. Keeping them
/// larger leaves a hysteresis band that stops boundary chunks from thrashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRadii {
    pub horizontal_load: i32,
    pub horizontal_unload: i32,
    pub vertical_load: i32,
    pub vertical_unload: i32,
}

impl StreamRadii {
    /// Same radii on every axis
    pub fn cubic(load: i32, unload: i32) -> Self {
        Self::cylindrical(load, unload, load, unload)
    }

    /// Separate horizontal and vertical radii
    pub fn cylindrical(horizontal_load: i32, horizontal_unload: i32, vertical_load: i32, vertical_unload: i32) -> Self {
        Self {
            horizontal_load,
            horizontal_unload,
            vertical_load,
            vertical_unload,
        }
    }

    /// True when vertical radii match the horizontal ones
    pub fn is_cubic(&self) -> bool {
        self.horizontal_load == self.vertical_load && self.horizontal_unload == self.vertical_unload
    }

    /// Non-negative radii with unload at least load. A cylindrical window
    /// needs a vertical unload radius strictly past the vertical load radius,
    /// otherwise chunks thrash at the top and bottom of the window.
    pub fn is_valid(&self) -> bool {
        let vertical_ok = if self.is_cubic() {
            self.vertical_unload >= self.vertical_load
        } else {
            self.vertical_unload > self.vertical_load
        };
        self.horizontal_load >= 0
            && self.vertical_load >= 0
            && self.horizontal_unload >= self.horizontal_load
            && vertical_ok
    }

    /// Whether `coord` stays loaded for an observer in chunk `center`
    pub fn keeps(&self, center: ChunkCoord, coord: ChunkCoord) -> bool {
        (coord.x - center.x).abs() <= self.horizontal_unload
            && (coord.z - center.z).abs() <= self.horizontal_unload
            && (coord.y - center.y).abs() <= self.vertical_unload
    }

    /// Number of chunks in the load window
    pub fn load_volume(&self) -> usize {
        let h = (2 * self.horizontal_load + 1) as usize;
        let v = (2 * self.vertical_load + 1) as usize;
        h * h * v
    }
}

impl Default for StreamRadii {
    fn default() -> Self {
        Self::cylindrical(4, 6, 2, 3)
    }
}

/// Counters from the most recent [`ChunkStore::update`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Chunks created this update
    pub loaded: usize,
    /// Chunks removed this update
    pub unloaded: usize,
    /// Chunks outside the unload radius kept because work is in flight
    pub deferred: usize,
    /// Chunks in the store after the update
    pub total: usize,
}

/// Owns all chunks, keyed by coordinate.
///
/// Only the thread driving `update` inserts or removes entries. Generation
/// workers hold `Arc<Chunk>` clones and touch nothing but the chunk they
/// were given.
#[derive(Default)]
pub struct ChunkStore {
    chunks: HashMap<ChunkCoord, Arc<Chunk>>,
    /// Chunks created since the last drain, in creation order
    queued: Vec<Arc<Chunk>>,
    /// Coordinates removed by the most recent update
    evicted: Vec<ChunkCoord>,
    last_update: UpdateStats,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the chunk at `coord`, creating and queueing it if absent.
    /// Repeated calls return the same chunk.
    pub fn get_or_create(&mut self, coord: ChunkCoord) -> Arc<Chunk> {
        if let Some(chunk) = self.chunks.get(&coord) {
            return Arc::clone(chunk);
        }

        let chunk = Arc::new(Chunk::new(coord));
        let queued = chunk.lifecycle().mark_queued();
        debug_assert!(queued, "fresh chunk must start empty");
        let previous = self.chunks.insert(coord, Arc::clone(&chunk));
        debug_assert!(previous.is_none(), "duplicate chunk at {:?}", coord);
        self.queued.push(Arc::clone(&chunk));
        chunk
    }

    /// Chunk at `coord` if present
    pub fn get(&self, coord: ChunkCoord) -> Option<&Arc<Chunk>> {
        self.chunks.get(&coord)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over all chunks
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Chunk>> {
        self.chunks.values()
    }

    /// Iterate over all chunk coordinates
    pub fn coords(&self) -> impl Iterator<Item = &ChunkCoord> {
        self.chunks.keys()
    }

    /// Stats from the most recent update
    pub fn last_update(&self) -> UpdateStats {
        self.last_update
    }

    /// Keep a cube of chunks around `observer`: load within `load_radius`,
    /// unload beyond `unload_radius`. Returns the chunks created since the
    /// previous update, ready for generation.
    ///
    /// Removed coordinates are held for [`ChunkStore::drain_evicted`] until
    /// the next update, which discards any the caller did not drain.
    pub fn update(&mut self, observer: Vec3, load_radius: i32, unload_radius: i32) -> Vec<Arc<Chunk>> {
        self.update_with(observer, StreamRadii::cubic(load_radius, unload_radius))
    }

    /// Like [`ChunkStore::update`] with separate horizontal and vertical radii
    pub fn update_with(&mut self, observer: Vec3, radii: StreamRadii) -> Vec<Arc<Chunk>> {
        debug_assert!(radii.is_valid(), "unload radius smaller than load radius: {:?}", radii);

        let center = ChunkCoord::from_world_pos(observer);
        let h = radii.horizontal_load;
        let v = radii.vertical_load;

        for dx in -h..=h {
            for dy in -v..=v {
                for dz in -h..=h {
                    self.get_or_create(center.offset(dx, dy, dz));
                }
            }
        }

        let created = std::mem::take(&mut self.queued);
        self.evicted.clear();

        let mut unloaded = 0;
        let mut deferred = 0;
        let mut removed = Vec::new();
        for (coord, chunk) in &self.chunks {
            if radii.keeps(center, *coord) {
                continue;
            }
            // Claiming is atomic, so a busy chunk can never be removed here
            if chunk.lifecycle().mark_evictable() {
                removed.push(*coord);
            } else {
                deferred += 1;
                log::debug!("Deferring eviction of {:?} ({:?})", coord, chunk.lifecycle().state());
            }
        }
        for coord in removed {
            if self.chunks.remove(&coord).is_some() {
                self.evicted.push(coord);
                unloaded += 1;
            }
        }

        self.last_update = UpdateStats {
            loaded: created.len(),
            unloaded,
            deferred,
            total: self.chunks.len(),
        };

        if !created.is_empty() || unloaded > 0 {
            log::info!(
                "Chunk update: +{} loaded, -{} unloaded, {} deferred (total: {})",
                created.len(),
                unloaded,
                deferred,
                self.chunks.len()
            );
        }

        created
    }

    /// Take the coordinates removed by the most recent update, so their
    /// meshes can be released.
    pub fn drain_evicted(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.evicted)
    }
}
