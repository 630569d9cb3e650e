//! World grid: terrain and resource cells consumed read-only by the engine

pub mod cell;
pub mod generation;
pub mod grid;

pub use cell::{ResourceAmounts, ResourceKind, Terrain, WorldCell};
pub use generation::{found_civilizations, generate_world};
pub use grid::WorldGrid;
