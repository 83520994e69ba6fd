//! Chunk streaming around a moving observer

pub mod streamer;

pub use streamer::{ChunkStreamer, StreamStats};
