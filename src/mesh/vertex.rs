//! Mesh vertex layout

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex for extracted terrain meshes. GPU-compatible layout: 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    /// World-space position
    pub position: [f32; 3],
    /// Unit outward normal
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    /// Debug color: normal remapped into [0, 1]
    pub fn color(&self) -> Vec3 {
        self.normal() * 0.5 + Vec3::splat(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        let vertices = [MeshVertex::new(Vec3::ONE, Vec3::Y); 4];
        assert_eq!(bytemuck::cast_slice::<MeshVertex, u8>(&vertices).len(), 96);
    }

    #[test]
    fn test_color_from_normal() {
        let v = MeshVertex::new(Vec3::ZERO, Vec3::Y);
        assert_eq!(v.color(), Vec3::new(0.5, 1.0, 0.5));
        let v = MeshVertex::new(Vec3::ZERO, -Vec3::X);
        assert_eq!(v.color(), Vec3::new(0.0, 0.5, 0.5));
    }
}
