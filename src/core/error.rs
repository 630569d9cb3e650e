use thiserror::Error;

use crate::core::types::{CellCoord, CivId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown civilization: {0}")]
    UnknownCivilization(CivId),

    #[error("Cell out of bounds: {0}")]
    OutOfBounds(CellCoord),

    #[error("Invalid intervention: {0}")]
    InvalidIntervention(String),

    #[error("Narrative error: {0}")]
    Narrative(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
