//! terrasdf - streamed signed-distance-field terrain
//!
//! Chunks of SDF samples are generated from layered noise around a moving
//! observer, meshed with marching cubes and collided against by a
//! first-person character controller.

pub mod core;
pub mod math;
pub mod terrain;
pub mod voxel;
pub mod mesh;
pub mod streaming;
pub mod physics;
pub mod scene;
