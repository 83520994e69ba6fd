//! Chunked SDF storage and sampling

pub mod chunk;
pub mod lifecycle;
pub mod sampler;
pub mod store;

pub use chunk::{Chunk, ChunkCoord, SdfGrid, CHUNK_CUBES, CHUNK_SAMPLES, CHUNK_WORLD_SIZE, VOXEL_SIZE};
pub use lifecycle::{ChunkLifecycle, ChunkState};
pub use sampler::{FieldSampler, ScalarField, AIR_SENTINEL};
pub use store::{ChunkStore, StreamRadii, UpdateStats};
