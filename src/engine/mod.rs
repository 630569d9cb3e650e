//! Tick engine: state, systems, clock, interventions and output

pub mod clock;
pub mod events;
pub mod intervention;
pub mod output;
pub mod state;
pub mod systems;

pub use clock::{fingerprint, TickReport};
pub use events::{Event, EventKind, HistoryLog, WarEndReason};
pub use intervention::{Intervention, RejectedIntervention};
pub use output::{CivSnapshot, SimulationOutput, WorldSnapshot};
pub use state::{SimulationState, War};
