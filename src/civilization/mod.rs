//! Civilizations, their traits and belief systems

pub mod belief;
pub mod civ;
pub mod traits;

pub use belief::{Belief, ForeignStance};
pub use civ::{City, Civilization, Stockpile};
pub use traits::{Trait, TraitModifiers, TraitOverride, TraitTable};
