//! Civ Chronicle - a deterministic civilization tick engine
//!
//! Civilizations grow, research, expand, trade and fight on a fixed grid. One
//! call to `SimulationState::advance` runs a whole tick and returns the events
//! it produced.

pub mod civilization;
pub mod core;
pub mod engine;
pub mod narrative;
pub mod world;
