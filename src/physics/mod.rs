//! SDF character physics

pub mod params;
pub mod controller;

pub use controller::{CharacterController, CharacterState, MoveMode, DEFAULT_SPAWN};
pub use params::ControllerParams;
