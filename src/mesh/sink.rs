//! Mesh sinks - where finished chunk meshes go
//!
//! The streamer never touches a graphics API. It hands each mesh to a
//! [`MeshSink`], which may upload it to a GPU, write it to disk or just
//! keep it in memory like [`MeshCache`].

use std::collections::HashMap;

use super::vertex::MeshVertex;
use crate::voxel::chunk::ChunkCoord;

/// Receiver for chunk meshes. Called only from the thread driving the
/// streamer.
pub trait MeshSink {
    /// Replace the mesh for `coord`. An empty slice means the chunk has no
    /// surface.
    fn upload(&mut self, coord: ChunkCoord, vertices: &[MeshVertex]);

    /// Drop whatever is held for `coord`
    fn release(&mut self, coord: ChunkCoord);
}

/// In-memory sink keeping one vertex buffer per chunk
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<ChunkCoord, Vec<MeshVertex>>,
    uploads: usize,
    releases: usize,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh stored for `coord`
    pub fn get(&self, coord: ChunkCoord) -> Option<&[MeshVertex]> {
        self.meshes.get(&coord).map(Vec::as_slice)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.meshes.contains_key(&coord)
    }

    /// Number of chunks holding a mesh
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Triangles across every stored mesh
    pub fn triangle_count(&self) -> usize {
        self.meshes.values().map(|m| m.len() / 3).sum()
    }

    /// Total uploads received
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Total releases received
    pub fn release_count(&self) -> usize {
        self.releases
    }
}

impl MeshSink for MeshCache {
    fn upload(&mut self, coord: ChunkCoord, vertices: &[MeshVertex]) {
        self.uploads += 1;
        if vertices.is_empty() {
            self.meshes.remove(&coord);
        } else {
            self.meshes.insert(coord, vertices.to_vec());
        }
    }

    fn release(&mut self, coord: ChunkCoord) {
        self.releases += 1;
        self.meshes.remove(&coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_upload_and_release() {
        let mut cache = MeshCache::new();
        let coord = ChunkCoord::new(1, 2, 3);
        let tri = [MeshVertex::new(Vec3::ZERO, Vec3::Y); 3];

        cache.upload(coord, &tri);
        assert_eq!(cache.get(coord).map(<[MeshVertex]>::len), Some(3));
        assert_eq!(cache.triangle_count(), 1);

        cache.release(coord);
        assert!(!cache.contains(coord));
        assert_eq!(cache.upload_count(), 1);
        assert_eq!(cache.release_count(), 1);
    }

    #[test]
    fn test_empty_upload_holds_nothing() {
        let mut cache = MeshCache::new();
        cache.upload(ChunkCoord::new(0, 0, 0), &[]);
        assert!(cache.is_empty());
        assert_eq!(cache.upload_count(), 1);
    }
}
