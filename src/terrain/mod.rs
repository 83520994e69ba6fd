//! Procedural density generation

pub mod layer;
pub mod density;

pub use density::{DensityField, DensityParams};
pub use layer::{NoiseLayer, NoiseLayerParams};
