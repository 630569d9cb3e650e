//! Simulation output and serialization

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::civilization::belief::Belief;
use crate::civilization::civ::{City, Civilization, Stockpile};
use crate::civilization::traits::Trait;
use crate::core::types::{CivId, Tick};
use crate::engine::events::{EventKind, HistoryLog};
use crate::engine::state::{SimulationState, War};

/// Complete simulation output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub final_world: WorldSnapshot,
    pub history: HistoryLog,
    pub statistics: SimulationStats,
}

/// Read-only view of one civilization between ticks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CivSnapshot {
    pub id: CivId,
    pub name: String,
    pub alive: bool,
    pub population: u64,
    pub technology: f64,
    pub stockpile: Stockpile,
    pub traits: BTreeSet<Trait>,
    pub belief: Belief,
    pub territory_size: usize,
    pub cities: Vec<City>,
    pub at_war_with: BTreeSet<CivId>,
    pub relations: BTreeMap<CivId, f64>,
    pub founded: Tick,
}

impl From<&Civilization> for CivSnapshot {
    fn from(civ: &Civilization) -> Self {
        Self {
            id: civ.id,
            name: civ.name.clone(),
            alive: civ.is_alive(),
            population: civ.population,
            technology: civ.technology,
            stockpile: civ.stockpile,
            traits: civ.traits.clone(),
            belief: civ.belief,
            territory_size: civ.territory.len(),
            cities: civ.cities.clone(),
            at_war_with: civ.at_war_with.clone(),
            relations: civ.relations.clone(),
            founded: civ.founded,
        }
    }
}

/// Serializable snapshot of world state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub width: u32,
    pub height: u32,
    pub civilizations: Vec<CivSnapshot>,
    pub wars: Vec<War>,
    pub owned_cells: usize,
}

impl WorldSnapshot {
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            tick: state.tick,
            width: state.grid.width(),
            height: state.grid.height(),
            civilizations: state.civs.values().map(CivSnapshot::from).collect(),
            wars: state.wars.values().cloned().collect(),
            owned_cells: state.grid.iter().filter(|(_, c)| c.owner.is_some()).count(),
        }
    }

    pub fn civ(&self, id: CivId) -> Option<&CivSnapshot> {
        self.civilizations.iter().find(|c| c.id == id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationStats {
    pub ticks_simulated: Tick,
    pub simulation_time_ms: u64,
    pub total_events: u32,
    pub wars_fought: u32,
    pub civs_at_start: u32,
    pub civs_at_end: u32,
    pub extinctions: u32,
    pub cities_founded: u32,
    pub cells_claimed: u32,
    pub total_population: u64,
}

impl SimulationOutput {
    pub fn new(state: &SimulationState, elapsed: Duration) -> Self {
        let history = state.history.clone();
        let count = |pred: fn(&EventKind) -> bool| history.count(pred) as u32;

        let statistics = SimulationStats {
            ticks_simulated: state.tick,
            simulation_time_ms: elapsed.as_millis() as u64,
            total_events: history.len() as u32,
            wars_fought: count(|k| matches!(k, EventKind::WarDeclared { .. })),
            civs_at_start: state.civs_at_start as u32,
            civs_at_end: state.alive_count() as u32,
            extinctions: count(|k| matches!(k, EventKind::Extinction { .. })),
            cities_founded: count(|k| matches!(k, EventKind::CityFounded { .. })),
            cells_claimed: count(|k| matches!(k, EventKind::TerritoryClaimed { .. })),
            total_population: state.alive().map(|c| c.population).sum(),
        };

        Self { final_world: WorldSnapshot::capture(state), history, statistics }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let s = &self.statistics;
        format!(
            "Simulated {} ticks in {}ms\n{} events, {} wars, {} cities founded, {} cells claimed\n{} of {} civilizations remain ({} people)",
            s.ticks_simulated,
            s.simulation_time_ms,
            s.total_events,
            s.wars_fought,
            s.cities_founded,
            s.cells_claimed,
            s.civs_at_end,
            s.civs_at_start,
            s.total_population,
        )
    }
}
