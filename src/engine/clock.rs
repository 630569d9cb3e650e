//! Simulation clock - drives one discrete tick across every civilization
//!
//! Tick order:
//! 1. Scripted and queued interventions are applied, then the natural
//!    disaster roll
//! 2. Per-civilization pass (resources, growth, technology, expansion
//!    proposal), in parallel once enough civilizations are alive
//! 3. Ordered commit: extinctions, territory claims, city founding
//! 4. Diplomacy over all pairs
//! 5. Combat for every active war
//! 6. Invariant check

use std::collections::BTreeMap;

use ahash::AHashMap;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::Result;
use crate::core::types::{CellCoord, CivId, Tick};
use crate::engine::events::{Event, EventKind};
use crate::engine::intervention::RejectedIntervention;
use crate::engine::state::SimulationState;
use crate::engine::systems::{self, combat, diplomacy, expansion, CivContext, CivOutcome};

/// Everything one tick produced
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    pub events: Vec<Event>,
    pub rejected: Vec<RejectedIntervention>,
}

impl SimulationState {
    /// Advance the simulation by one tick
    ///
    /// An `InvariantViolation` error means the state is corrupt; the caller
    /// must stop advancing it.
    pub fn advance(&mut self) -> Result<TickReport> {
        let tick = self.tick + 1;
        let first_event = self.history.len();

        self.queue_scripted(tick);
        let rejected = self.apply_interventions()?;
        self.roll_natural_disaster(tick)?;
        let technology_before = self.technology_snapshot();

        let outcomes = self.run_civ_passes(tick);
        self.commit(tick, outcomes)?;

        let adjacency = self.adjacency();
        diplomacy::run(self, &adjacency)?;
        combat::run(self)?;

        self.verify_invariants(&technology_before)?;
        self.tick = tick;

        let events = self.history.since(first_event).to_vec();
        debug!(
            tick,
            alive = self.alive_count(),
            wars = self.wars.len(),
            events = events.len(),
            "Tick complete"
        );
        Ok(TickReport { tick, events, rejected })
    }

    /// Advance `ticks` times, stopping early once every civilization is gone
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickReport>> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            if self.alive_count() == 0 {
                info!(tick = self.tick, "No civilizations left");
                break;
            }
            reports.push(self.advance()?);
        }
        Ok(reports)
    }

    /// Sub-seeds are drawn serially in ascending id order so the result is
    /// the same whether the passes run on one thread or many.
    fn run_civ_passes(&mut self, tick: Tick) -> Vec<(CivId, CivOutcome)> {
        let ids = self.alive_ids();
        let seeds: Vec<u64> = ids.iter().map(|_| self.rng.gen()).collect();
        let parallel = ids.len() >= self.config.parallel_threshold;

        let ctx = CivContext { grid: &self.grid, config: &self.config, traits: &self.traits, tick };
        let mut civs: Vec<_> = self.civs.values_mut().filter(|c| c.is_alive()).zip(seeds).collect();

        let mut outcomes: Vec<(CivId, CivOutcome)> = if parallel {
            civs.par_iter_mut()
                .map(|(civ, seed)| (civ.id, systems::run_civ_pass(civ, &ctx, *seed)))
                .collect()
        } else {
            civs.iter_mut()
                .map(|(civ, seed)| (civ.id, systems::run_civ_pass(civ, &ctx, *seed)))
                .collect()
        };
        outcomes.sort_by_key(|(id, _)| *id);
        outcomes
    }

    /// Apply proposals in ascending id order. A claim succeeds only while its
    /// cell is still free; a losing proposer keeps its pressure.
    fn commit(&mut self, tick: Tick, outcomes: Vec<(CivId, CivOutcome)>) -> Result<()> {
        let mut granted: AHashMap<CellCoord, CivId> = AHashMap::new();

        for (id, outcome) in outcomes {
            if outcome.starved {
                self.collapse(id)?;
                continue;
            }

            let mut claimed = None;
            if let Some(cell) = outcome.claim {
                if self.grid.is_unclaimed_land(cell) {
                    self.grid.claim(cell, id)?;
                    granted.insert(cell, id);
                    if let Some(civ) = self.civ_mut(id) {
                        civ.territory.insert(cell);
                        civ.expansion_pressure = 0.0;
                        civ.last_claim = Some(tick);
                    }
                    self.emit(EventKind::TerritoryClaimed { civ: id, cell }, Some(cell));
                    claimed = Some(cell);
                } else {
                    debug!(civ = %id, %cell, winner = ?granted.get(&cell), "Claim lost to an earlier proposer");
                }
            }

            self.try_found_city(id, claimed, tick)?;
        }
        Ok(())
    }

    fn try_found_city(&mut self, id: CivId, claimed: Option<CellCoord>, tick: Tick) -> Result<()> {
        let config = self.config.expansion.clone();
        let Some(civ) = self.civs.get(&id) else {
            return Ok(());
        };
        let Some(site) = expansion::founding_site(civ, &self.grid, claimed, &config) else {
            return Ok(());
        };
        let Some(civ) = self.civs.get_mut(&id) else {
            return Ok(());
        };
        let name = expansion::found_city(civ, site, tick, &config, &mut self.rng);
        info!(civ = %id, city = %name, cell = %site, "City founded");
        self.emit(EventKind::CityFounded { civ: id, city: name, cell: site }, Some(site));
        Ok(())
    }
}

/// Per-civilization population and technology, for replay comparisons
pub fn fingerprint(state: &SimulationState) -> BTreeMap<CivId, (u64, u64, usize)> {
    state
        .civs
        .iter()
        .map(|(id, c)| (*id, (c.population, c.technology.to_bits(), c.territory.len())))
        .collect()
}
