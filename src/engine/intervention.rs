//! God-Mode interventions
//!
//! Requests are validated when submitted and queued. The queue is drained at
//! the next tick boundary, before any engine runs; each request is checked
//! again there because the world may have changed since it was submitted.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::civilization::belief::Belief;
use crate::civilization::traits::random_traits;
use crate::core::error::{Result, SimError};
use crate::core::types::{CellCoord, CivId};
use crate::engine::events::{DisasterLoss, EventKind};
use crate::engine::state::SimulationState;
use crate::world::cell::ResourceKind;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intervention {
    /// Reduce population and stockpiles of civilizations owning cells in
    /// the area
    Disaster { center: CellCoord, radius: i32, magnitude: f64 },
    /// Add `delta` to a civilization's technology (floored at zero)
    AdjustTechnology { civ: CivId, delta: f64 },
    /// Add `delta` to the relation between two civilizations
    AdjustRelation { a: CivId, b: CivId, delta: f64 },
    /// Add `delta` to one stockpile (floored at zero)
    AdjustResources {
        civ: CivId,
        #[serde(rename = "resource")]
        kind: ResourceKind,
        delta: f64,
    },
    /// Replace a civilization's belief and traits, and redraw its relations
    /// near neutral
    ShiftIdeology { civ: CivId },
    /// Make a civilization hostile toward everyone for good
    WarInfluence { civ: CivId },
}

/// An intervention rejected at the tick boundary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectedIntervention {
    pub intervention: Intervention,
    pub reason: String,
}

fn require_alive(state: &SimulationState, civ: CivId) -> Result<()> {
    if state.is_alive(civ) {
        Ok(())
    } else {
        Err(SimError::UnknownCivilization(civ))
    }
}

fn require_finite(value: f64, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidIntervention(format!("{} must be finite", what)))
    }
}

impl Intervention {
    /// Check the request against the current state without changing it
    pub fn validate(&self, state: &SimulationState) -> Result<()> {
        match self {
            Intervention::Disaster { center, radius, magnitude } => {
                if !state.grid.in_bounds(*center) {
                    return Err(SimError::OutOfBounds(*center));
                }
                let limits = &state.config.disaster;
                if *radius < 0 || *radius > limits.max_radius {
                    return Err(SimError::InvalidIntervention(format!(
                        "radius {} outside 0..={}",
                        radius, limits.max_radius
                    )));
                }
                if !magnitude.is_finite() || *magnitude <= 0.0 || *magnitude > limits.max_magnitude {
                    return Err(SimError::InvalidIntervention(format!(
                        "magnitude {} outside (0, {}]",
                        magnitude, limits.max_magnitude
                    )));
                }
                Ok(())
            }
            Intervention::AdjustTechnology { civ, delta } => {
                require_alive(state, *civ)?;
                require_finite(*delta, "technology delta")
            }
            Intervention::AdjustRelation { a, b, delta } => {
                require_alive(state, *a)?;
                require_alive(state, *b)?;
                if a == b {
                    return Err(SimError::InvalidIntervention(format!(
                        "{} cannot have a relation with itself",
                        a
                    )));
                }
                require_finite(*delta, "relation delta")
            }
            Intervention::AdjustResources { civ, delta, .. } => {
                require_alive(state, *civ)?;
                require_finite(*delta, "resource delta")
            }
            Intervention::ShiftIdeology { civ } | Intervention::WarInfluence { civ } => require_alive(state, *civ),
        }
    }
}

impl SimulationState {
    /// Queue an intervention for the next tick boundary
    pub fn submit(&mut self, intervention: Intervention) -> Result<()> {
        intervention.validate(self)?;
        self.pending.push_back(intervention);
        Ok(())
    }

    pub fn pending_interventions(&self) -> usize {
        self.pending.len()
    }

    /// Move scripted interventions due at `tick` into the queue. They skip
    /// submit-time validation and are checked when applied.
    pub(crate) fn queue_scripted(&mut self, tick: u64) {
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scripted)
            .into_iter()
            .partition(|s| s.tick == tick);
        self.scripted = rest;
        self.pending.extend(due.into_iter().map(|s| s.intervention));
    }

    /// Drain the queue, applying each request in submission order
    pub(crate) fn apply_interventions(&mut self) -> Result<Vec<RejectedIntervention>> {
        let mut rejected = Vec::new();
        while let Some(intervention) = self.pending.pop_front() {
            if let Err(e) = intervention.validate(self) {
                warn!(?intervention, error = %e, "Intervention rejected");
                rejected.push(RejectedIntervention { intervention, reason: e.to_string() });
                continue;
            }
            self.apply_intervention(&intervention)?;
        }
        Ok(rejected)
    }

    fn apply_intervention(&mut self, intervention: &Intervention) -> Result<()> {
        info!(?intervention, "Applying intervention");
        match intervention {
            Intervention::Disaster { center, radius, magnitude } => {
                self.apply_disaster(*center, *radius, *magnitude)
            }
            Intervention::AdjustTechnology { civ, delta } => {
                let c = self.civ_mut(*civ).ok_or(SimError::UnknownCivilization(*civ))?;
                c.technology = (c.technology + delta).max(0.0);
                self.emit(EventKind::TechnologyAdjusted { civ: *civ, delta: *delta }, None);
                Ok(())
            }
            Intervention::AdjustRelation { a, b, delta } => {
                let current = self.civ(*a).map(|c| c.relation(*b)).unwrap_or(0.0);
                self.set_relation(*a, *b, current + delta);
                self.emit(EventKind::RelationAdjusted { a: *a, b: *b, delta: *delta }, None);
                Ok(())
            }
            Intervention::AdjustResources { civ, kind, delta } => {
                let c = self.civ_mut(*civ).ok_or(SimError::UnknownCivilization(*civ))?;
                let stock = c.stockpile.get_mut(*kind);
                *stock = (*stock + delta).max(0.0);
                self.emit(EventKind::ResourcesAdjusted { civ: *civ, kind: *kind, delta: *delta }, None);
                Ok(())
            }
            Intervention::ShiftIdeology { civ } => self.shift_ideology(*civ),
            Intervention::WarInfluence { civ } => self.war_influence(*civ),
        }
    }

    /// Roll for a natural disaster at the start of `tick`
    pub(crate) fn roll_natural_disaster(&mut self, tick: u64) -> Result<()> {
        let config = self.config.disaster.clone();
        if config.natural_interval == 0 || tick % config.natural_interval != 0 {
            return Ok(());
        }
        let empty = self.grid.width() == 0 || self.grid.height() == 0;
        if self.rng.gen::<f64>() >= config.natural_chance || empty {
            return Ok(());
        }
        let center = CellCoord::new(
            self.rng.gen_range(0..self.grid.width() as i32),
            self.rng.gen_range(0..self.grid.height() as i32),
        );
        let radius = self.rng.gen_range(config.natural_radius_min..=config.natural_radius_max);
        let magnitude = config.natural_magnitude.sample(&mut self.rng);
        debug!(tick, %center, radius, magnitude, "Natural disaster");
        self.apply_disaster(center, radius, magnitude)
    }

    fn shift_ideology(&mut self, id: CivId) -> Result<()> {
        let config = self.config.intervention.clone();
        let from = self.civ(id).ok_or(SimError::UnknownCivilization(id))?.belief;
        let options: Vec<Belief> = Belief::ALL.iter().copied().filter(|b| *b != from).collect();
        let to = options.choose(&mut self.rng).copied().unwrap_or(from);
        let count = self.rng.gen_range(1..=config.ideology_max_traits);
        let traits = random_traits(&mut self.rng, count);

        let c = self.civ_mut(id).ok_or(SimError::UnknownCivilization(id))?;
        c.belief = to;
        c.traits = traits.clone();
        let met: Vec<CivId> = c.relations.keys().copied().collect();
        for other in met {
            let value = config.ideology_relation_noise.sample(&mut self.rng);
            self.set_relation(id, other, value);
        }
        self.emit(EventKind::IdeologyShifted { civ: id, from, to, traits }, None);
        Ok(())
    }

    fn war_influence(&mut self, id: CivId) -> Result<()> {
        let hostility = self.config.intervention.war_influence_relation;
        let c = self.civ_mut(id).ok_or(SimError::UnknownCivilization(id))?;
        c.belligerent = true;
        let met: Vec<CivId> = c.relations.keys().copied().collect();
        for other in met {
            self.set_relation(id, other, hostility);
        }
        self.emit(EventKind::WarInfluenced { civ: id }, None);
        Ok(())
    }

    fn apply_disaster(&mut self, center: CellCoord, radius: i32, magnitude: f64) -> Result<()> {
        let config = self.config.disaster.clone();
        let area = self.grid.cells_within_radius(center, radius);
        let mut losses = Vec::new();
        let mut collapsed = Vec::new();

        let ids = self.alive_ids();
        for id in ids {
            let Some(civ) = self.civs.get_mut(&id) else {
                continue;
            };
            let affected = area.iter().filter(|c| civ.territory.contains(c)).count();
            if affected == 0 {
                continue;
            }
            let share = affected as f64 / civ.territory.len() as f64;
            let damage_rate = (config.damage.sample(&mut self.rng) * magnitude * share).min(config.damage_cap);

            let lost = ((civ.population as f64) * damage_rate).floor() as u64;
            civ.population = civ.population.saturating_sub(lost);
            for kind in ResourceKind::ALL {
                let fraction = damage_rate * config.resource_damage.sample(&mut self.rng);
                let stock = civ.stockpile.get_mut(kind);
                *stock = (*stock * (1.0 - fraction)).max(0.0);
            }
            if civ.population == 0 {
                collapsed.push(id);
            }
            losses.push(DisasterLoss { civ: id, population_lost: lost, damage_rate });
        }

        self.emit(EventKind::DisasterApplied { center, radius, magnitude, losses }, Some(center));
        for id in collapsed {
            self.collapse(id)?;
        }
        Ok(())
    }
}
