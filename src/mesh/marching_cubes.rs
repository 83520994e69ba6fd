//! Marching cubes isosurface extraction over a single chunk

use glam::Vec3;

use super::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use super::vertex::MeshVertex;
use crate::voxel::chunk::{Chunk, SdfGrid, CHUNK_CUBES, VOXEL_SIZE};
use crate::voxel::sampler::{surface_normal, LocalGridField};

/// Snap distance for edge interpolation
const INTERP_EPSILON: f32 = 1e-5;

/// Central-difference step for vertex normals, in meters
const NORMAL_STEP: f32 = VOXEL_SIZE * 0.5;

/// Stateless marching cubes mesher
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchingCubes {
    iso_level: f32,
}

impl MarchingCubes {
    pub fn new(iso_level: f32) -> Self {
        Self { iso_level }
    }

    pub fn iso_level(&self) -> f32 {
        self.iso_level
    }

    /// Extract a triangle list for one chunk in world space. Every three
    /// consecutive vertices form a triangle.
    pub fn extract(&self, chunk: &Chunk) -> Vec<MeshVertex> {
        let grid = chunk.sdf();
        let vertices = self.extract_grid(&grid, chunk.bounds().min);
        log::debug!(
            "Meshed chunk {:?}: {} triangles",
            chunk.coord(),
            vertices.len() / 3
        );
        vertices
    }

    /// Extract from a bare sample grid whose minimum corner sits at `origin`
    pub fn extract_grid(&self, grid: &SdfGrid, origin: Vec3) -> Vec<MeshVertex> {
        let iso = self.iso_level;
        let local_field = LocalGridField::new(grid);
        let mut vertices = Vec::new();

        for x in 0..CHUNK_CUBES {
            for y in 0..CHUNK_CUBES {
                for z in 0..CHUNK_CUBES {
                    let mut values = [0.0f32; 8];
                    let mut corners = [Vec3::ZERO; 8];
                    let mut config = 0usize;
                    for (i, [ox, oy, oz]) in CORNER_OFFSETS.iter().enumerate() {
                        let (cx, cy, cz) = (x + ox, y + oy, z + oz);
                        values[i] = grid.get(cx, cy, cz);
                        corners[i] = Vec3::new(cx as f32, cy as f32, cz as f32) * VOXEL_SIZE;
                        if values[i] < iso {
                            config |= 1 << i;
                        }
                    }

                    let edges = EDGE_TABLE[config];
                    if edges == 0 {
                        continue;
                    }

                    let mut edge_points = [Vec3::ZERO; 12];
                    for (e, [a, b]) in EDGE_CORNERS.iter().enumerate() {
                        if edges & (1 << e) != 0 {
                            edge_points[e] =
                                interpolate_edge(iso, corners[*a], corners[*b], values[*a], values[*b]);
                        }
                    }

                    for tri in TRI_TABLE[config].chunks_exact(3).take_while(|t| t[0] != -1) {
                        for &edge in tri {
                            let local = edge_points[edge as usize];
                            let normal = surface_normal(&local_field, local, NORMAL_STEP);
                            vertices.push(MeshVertex::new(origin + local, normal));
                        }
                    }
                }
            }
        }

        vertices
    }
}

impl Default for MarchingCubes {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Point where the iso level crosses the edge p1-p2
fn interpolate_edge(iso: f32, p1: Vec3, p2: Vec3, v1: f32, v2: f32) -> Vec3 {
    if (iso - v1).abs() < INTERP_EPSILON {
        return p1;
    }
    if (iso - v2).abs() < INTERP_EPSILON {
        return p2;
    }
    if (v1 - v2).abs() < INTERP_EPSILON {
        return p1;
    }
    let t = (iso - v1) / (v2 - v1);
    p1 + (p2 - p1) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::{ChunkCoord, CHUNK_WORLD_SIZE};

    fn chunk_from(coord: ChunkCoord, field: impl Fn(Vec3) -> f32 + Send + Sync) -> Chunk {
        let chunk = Chunk::new(coord);
        chunk.fill(&field);
        chunk
    }

    fn triangle_area(tri: &[MeshVertex]) -> f32 {
        let (a, b, c) = (tri[0].position(), tri[1].position(), tri[2].position());
        (b - a).cross(c - a).length() * 0.5
    }

    #[test]
    fn test_interpolate_edge() {
        let p1 = Vec3::ZERO;
        let p2 = Vec3::X;
        assert_eq!(interpolate_edge(0.0, p1, p2, 1.0, -1.0), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(interpolate_edge(0.0, p1, p2, 0.0, -1.0), p1);
        assert_eq!(interpolate_edge(0.0, p1, p2, 1.0, 0.0), p2);
        // Degenerate edge snaps instead of dividing by zero
        assert_eq!(interpolate_edge(0.5, p1, p2, 1.0, 1.0), p1);
    }

    #[test]
    fn test_uniform_chunks_empty() {
        let mc = MarchingCubes::default();
        let solid = chunk_from(ChunkCoord::new(0, 0, 0), |_| 3.0);
        assert!(mc.extract(&solid).is_empty());
        let air = chunk_from(ChunkCoord::new(0, 0, 0), |_| -3.0);
        assert!(mc.extract(&air).is_empty());
        // Fresh chunks hold the initial air value
        assert!(mc.extract(&Chunk::new(ChunkCoord::new(4, 4, 4))).is_empty());
    }

    #[test]
    fn test_horizontal_plane() {
        let mc = MarchingCubes::default();
        let chunk = chunk_from(ChunkCoord::new(0, 0, 0), |p| 5.25 - p.y);
        let vertices = mc.extract(&chunk);

        assert_eq!(vertices.len() % 3, 0);
        assert_eq!(vertices.len() / 3, CHUNK_CUBES * CHUNK_CUBES * 2);
        for v in &vertices {
            assert!((v.position().y - 5.25).abs() < 1e-4);
            assert!((v.normal() - Vec3::Y).length() < 1e-3, "normal {:?}", v.normal());
        }

        let area: f32 = vertices.chunks_exact(3).map(triangle_area).sum();
        let expected = CHUNK_WORLD_SIZE * CHUNK_WORLD_SIZE;
        assert!((area - expected).abs() < 0.01, "area {}", area);
    }

    #[test]
    fn test_world_offset() {
        let mc = MarchingCubes::default();
        let coord = ChunkCoord::new(-2, 1, 3);
        let origin = coord.world_origin();
        let chunk = chunk_from(coord, move |p| origin.y + 4.1 - p.y);
        let vertices = mc.extract(&chunk);
        assert!(!vertices.is_empty());
        for v in &vertices {
            assert!(chunk.bounds().contains_point(v.position()));
            assert!((v.position().y - (origin.y + 4.1)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_sphere_normals_point_outward() {
        let mc = MarchingCubes::default();
        let center = Vec3::splat(8.0);
        let chunk = chunk_from(ChunkCoord::new(0, 0, 0), move |p| 5.0 - (p - center).length());
        let vertices = mc.extract(&chunk);
        assert!(!vertices.is_empty());
        for v in &vertices {
            let radial = (v.position() - center).normalize();
            assert!(v.normal().dot(radial) > 0.9);
            assert!(((v.position() - center).length() - 5.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_iso_level_shifts_surface() {
        let mc = MarchingCubes::new(1.0);
        let chunk = chunk_from(ChunkCoord::new(0, 0, 0), |p| 8.0 - p.y);
        let vertices = mc.extract(&chunk);
        assert!(!vertices.is_empty());
        assert!(vertices.iter().all(|v| (v.position().y - 7.0).abs() < 1e-4));
    }

    #[test]
    fn test_deterministic() {
        let mc = MarchingCubes::default();
        let center = Vec3::new(3.0, 9.0, 12.0);
        let chunk = chunk_from(ChunkCoord::new(0, 0, 0), move |p| 6.0 - (p - center).length());
        assert_eq!(mc.extract(&chunk), mc.extract(&chunk));
    }
}
