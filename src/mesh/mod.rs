//! Isosurface extraction and mesh hand-off

pub mod tables;
pub mod vertex;
pub mod marching_cubes;
pub mod sink;

pub use marching_cubes::MarchingCubes;
pub use sink::{MeshCache, MeshSink};
pub use vertex::MeshVertex;
