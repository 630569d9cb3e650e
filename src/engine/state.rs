//! SimulationState - the single owned aggregate every engine works on

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::civilization::civ::Civilization;
use crate::civilization::traits::TraitTable;
use crate::core::config::{EngineConfig, ScenarioConfig, ScriptedIntervention};
use crate::core::error::{Result, SimError};
use crate::core::types::{CellCoord, CivId, Tick, WarId};
use crate::engine::events::{EventKind, HistoryLog, WarEndReason};
use crate::engine::intervention::Intervention;
use crate::world::generation::{found_civilizations, generate_world};
use crate::world::grid::WorldGrid;

/// Active war between two civilizations
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct War {
    pub id: WarId,
    pub aggressor: CivId,
    pub defender: CivId,
    pub started: Tick,
}

impl War {
    pub fn involves(&self, civ: CivId) -> bool {
        self.aggressor == civ || self.defender == civ
    }

    pub fn other(&self, civ: CivId) -> CivId {
        if self.aggressor == civ {
            self.defender
        } else {
            self.aggressor
        }
    }
}

/// Full simulation state
///
/// Only the engine mutates this, and only inside `advance`. Collaborators read
/// it between ticks and edit it through the intervention queue.
pub struct SimulationState {
    pub grid: WorldGrid,
    pub civs: BTreeMap<CivId, Civilization>,
    pub wars: BTreeMap<WarId, War>,
    /// Number of completed ticks
    pub tick: Tick,
    pub config: EngineConfig,
    pub traits: TraitTable,
    pub history: HistoryLog,
    pub civs_at_start: usize,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) pending: VecDeque<Intervention>,
    pub(crate) scripted: Vec<ScriptedIntervention>,
    next_war_id: u32,
}

impl SimulationState {
    /// Build a state from a grid and founded civilizations
    ///
    /// Each civilization's territory is claimed on the grid; overlapping or
    /// unclaimable territory is a configuration error.
    pub fn new(
        mut grid: WorldGrid,
        civs: Vec<Civilization>,
        config: EngineConfig,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let traits = TraitTable::with_overrides(&config.traits)?;

        let mut table = BTreeMap::new();
        for civ in civs {
            if table.contains_key(&civ.id) {
                return Err(SimError::InvalidConfig(format!("duplicate civilization id {}", civ.id)));
            }
            for cell in &civ.territory {
                grid.claim(*cell, civ.id).map_err(|e| {
                    SimError::InvalidConfig(format!("starting territory of {}: {}", civ.name, e))
                })?;
            }
            table.insert(civ.id, civ);
        }

        let ids: Vec<CivId> = table.keys().copied().collect();
        for civ in table.values_mut() {
            for other in &ids {
                if *other != civ.id {
                    civ.relations.entry(*other).or_insert(0.0);
                }
            }
        }

        let civs_at_start = table.len();
        Ok(Self {
            grid,
            civs: table,
            wars: BTreeMap::new(),
            tick: 0,
            config,
            traits,
            history: HistoryLog::new(),
            civs_at_start,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending: VecDeque::new(),
            scripted: Vec::new(),
            next_war_id: 1,
        })
    }

    /// Generate the scenario's world and civilizations
    pub fn from_scenario(scenario: &ScenarioConfig, config: EngineConfig) -> Result<Self> {
        scenario.validate()?;
        let seed = scenario.world.seed;
        let grid = generate_world(&scenario.world)?;
        let mut founding_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        let civs = found_civilizations(&grid, scenario, &mut founding_rng)?;

        let mut state = Self::new(grid, civs, config, seed)?;
        state.scripted = scenario.interventions.clone();
        state.scripted.sort_by_key(|s| s.tick);
        info!(
            width = state.grid.width(),
            height = state.grid.height(),
            civilizations = state.civs.len(),
            "World ready"
        );
        Ok(state)
    }

    pub fn civ(&self, id: CivId) -> Option<&Civilization> {
        self.civs.get(&id)
    }

    pub fn civ_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civs.get_mut(&id)
    }

    /// Alive civilizations in ascending id order
    pub fn alive(&self) -> impl Iterator<Item = &Civilization> {
        self.civs.values().filter(|c| c.is_alive())
    }

    pub fn alive_ids(&self) -> Vec<CivId> {
        self.alive().map(|c| c.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn is_alive(&self, id: CivId) -> bool {
        self.civs.get(&id).map(|c| c.is_alive()).unwrap_or(false)
    }

    pub fn war_between(&self, a: CivId, b: CivId) -> Option<&War> {
        self.wars.values().find(|w| w.involves(a) && w.involves(b))
    }

    /// Write both sides of a relation, clamped
    pub fn set_relation(&mut self, a: CivId, b: CivId, value: f64) {
        let value = value.clamp(-1.0, 1.0);
        if let Some(civ) = self.civs.get_mut(&a) {
            civ.relations.insert(b, value);
        }
        if let Some(civ) = self.civs.get_mut(&b) {
            civ.relations.insert(a, value);
        }
    }

    /// For each alive civilization, the alive civilizations owning a cell
    /// adjacent to its territory
    pub fn adjacency(&self) -> BTreeMap<CivId, BTreeSet<CivId>> {
        let mut map = BTreeMap::new();
        for civ in self.alive() {
            let mut touching = BTreeSet::new();
            for cell in &civ.territory {
                for n in self.grid.neighbors(*cell) {
                    if let Some(owner) = self.grid.owner(n) {
                        if owner != civ.id {
                            touching.insert(owner);
                        }
                    }
                }
            }
            map.insert(civ.id, touching);
        }
        map
    }

    pub fn technology_snapshot(&self) -> BTreeMap<CivId, f64> {
        self.civs.iter().map(|(id, c)| (*id, c.technology)).collect()
    }

    pub(crate) fn emit(&mut self, kind: EventKind, location: Option<CellCoord>) {
        self.history.record(self.tick + 1, kind, location);
    }

    pub(crate) fn declare_war(&mut self, aggressor: CivId, defender: CivId) -> WarId {
        let id = WarId(self.next_war_id);
        self.next_war_id += 1;
        let started = self.tick + 1;
        self.wars.insert(id, War { id, aggressor, defender, started });
        if let Some(c) = self.civs.get_mut(&aggressor) {
            c.at_war_with.insert(defender);
        }
        if let Some(c) = self.civs.get_mut(&defender) {
            c.at_war_with.insert(aggressor);
        }
        self.set_relation(aggressor, defender, -1.0);
        info!(war = %id, %aggressor, %defender, "War declared");
        self.emit(EventKind::WarDeclared { war: id, aggressor, defender }, None);
        id
    }

    pub(crate) fn end_war(&mut self, id: WarId, victor: Option<CivId>, reason: WarEndReason) {
        let Some(war) = self.wars.remove(&id) else {
            return;
        };
        let (a, b) = (war.aggressor, war.defender);
        if let Some(c) = self.civs.get_mut(&a) {
            c.at_war_with.remove(&b);
        }
        if let Some(c) = self.civs.get_mut(&b) {
            c.at_war_with.remove(&a);
        }
        if self.is_alive(a) && self.is_alive(b) {
            let peace = self.config.combat.peace_relation;
            self.set_relation(a, b, peace);
        }
        info!(war = %id, ?victor, ?reason, "War resolved");
        self.emit(EventKind::WarResolved { war: id, sides: (a, b), victor, reason }, None);
    }

    /// Extinction bookkeeping: release every cell, drop cities, conclude wars
    pub(crate) fn collapse(&mut self, id: CivId) -> Result<()> {
        let civ = self.civs.get_mut(&id).ok_or(SimError::UnknownCivilization(id))?;
        if civ.extinct {
            return Ok(());
        }
        let name = civ.name.clone();
        let cells = civ.collapse();
        for cell in cells {
            self.grid.release(cell, id)?;
        }
        info!(civ = %id, %name, "Civilization collapsed");
        self.emit(EventKind::Extinction { civ: id }, None);

        let wars: Vec<(WarId, CivId)> = self
            .wars
            .values()
            .filter(|w| w.involves(id))
            .map(|w| (w.id, w.other(id)))
            .collect();
        for (war, survivor) in wars {
            self.end_war(war, Some(survivor), WarEndReason::Annihilation);
        }

        for other in self.civs.values_mut() {
            other.relations.remove(&id);
            other.at_war_with.remove(&id);
        }
        Ok(())
    }

    /// Check every state invariant. `technology_before` is the snapshot taken
    /// after interventions were applied.
    pub fn verify_invariants(&self, technology_before: &BTreeMap<CivId, f64>) -> Result<()> {
        let violation = |msg: String| -> Result<()> { Err(SimError::InvariantViolation(msg)) };
        let mut owned_in_territories = 0usize;

        for civ in self.civs.values() {
            if civ.is_alive() {
                if civ.population == 0 {
                    return violation(format!("{} is alive with zero population", civ.id));
                }
            } else if civ.population != 0
                || !civ.territory.is_empty()
                || !civ.at_war_with.is_empty()
                || !civ.cities.is_empty()
            {
                return violation(format!("extinct {} still holds state", civ.id));
            }

            for cell in &civ.territory {
                if self.grid.owner(*cell) != Some(civ.id) {
                    return violation(format!(
                        "{} lists {} but the grid owner is {:?}",
                        civ.id,
                        cell,
                        self.grid.owner(*cell)
                    ));
                }
            }
            owned_in_territories += civ.territory.len();

            for city in &civ.cities {
                if !civ.territory.contains(&city.coord) {
                    return violation(format!("{} has city {} outside its territory", civ.id, city.name));
                }
            }

            if !civ.stockpile.all_non_negative() {
                return violation(format!("{} has a negative stockpile", civ.id));
            }

            if let Some(before) = technology_before.get(&civ.id) {
                if civ.technology + 1e-9 < *before {
                    return violation(format!(
                        "{} technology fell from {} to {}",
                        civ.id, before, civ.technology
                    ));
                }
            }

            for enemy in &civ.at_war_with {
                if self.war_between(civ.id, *enemy).is_none() {
                    return violation(format!("{} at war with {} without a war record", civ.id, enemy));
                }
            }
        }

        let owned_on_grid = self.grid.iter().filter(|(_, c)| c.owner.is_some()).count();
        if owned_on_grid != owned_in_territories {
            return violation(format!(
                "grid has {} owned cells but territories list {}",
                owned_on_grid, owned_in_territories
            ));
        }

        let alive: Vec<&Civilization> = self.alive().collect();
        for (i, a) in alive.iter().enumerate() {
            for b in &alive[i + 1..] {
                let ab = a.relation(b.id);
                let ba = b.relation(a.id);
                if !(-1.0..=1.0).contains(&ab) || ab != ba {
                    return violation(format!(
                        "relation {}<->{} is {} / {}",
                        a.id, b.id, ab, ba
                    ));
                }
            }
        }

        for war in self.wars.values() {
            if !self.is_alive(war.aggressor) || !self.is_alive(war.defender) {
                return violation(format!("{} involves an extinct civilization", war.id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::civilization::belief::Belief;
    use crate::world::cell::{ResourceAmounts, Terrain};

    /// Two civilizations side by side on an open plain
    pub(crate) fn two_civ_state() -> SimulationState {
        let grid = WorldGrid::filled(12, 6, Terrain::Land, ResourceAmounts::new(0.7, 0.3, 0.2, 0.2));
        let mut a = Civilization::new(CivId(1), "Westmark", 120, Belief::EternalLight, BTreeSet::new(), 0);
        let mut b = Civilization::new(CivId(2), "Eastreach", 120, Belief::GoldenSun, BTreeSet::new(), 0);
        for y in 1..4 {
            for x in 2..5 {
                a.territory.insert(CellCoord::new(x, y));
            }
            for x in 5..8 {
                b.territory.insert(CellCoord::new(x, y));
            }
        }
        a.stockpile = ResourceAmounts::new(240.0, 10.0, 5.0, 5.0);
        b.stockpile = ResourceAmounts::new(240.0, 10.0, 5.0, 5.0);
        SimulationState::new(grid, vec![a, b], EngineConfig::default(), 7).unwrap()
    }

    #[test]
    fn test_new_claims_territory() {
        let state = two_civ_state();
        assert_eq!(state.grid.owner(CellCoord::new(2, 1)), Some(CivId(1)));
        assert_eq!(state.grid.owner(CellCoord::new(7, 3)), Some(CivId(2)));
        assert_eq!(state.civ(CivId(1)).unwrap().relation(CivId(2)), 0.0);
        assert!(state.verify_invariants(&state.technology_snapshot()).is_ok());
    }

    #[test]
    fn test_overlapping_territory_rejected() {
        let grid = WorldGrid::filled(4, 4, Terrain::Land, ResourceAmounts::new(0.5, 0.1, 0.1, 0.1));
        let mut a = Civilization::new(CivId(1), "A", 10, Belief::SilverMoon, BTreeSet::new(), 0);
        let mut b = Civilization::new(CivId(2), "B", 10, Belief::SilverMoon, BTreeSet::new(), 0);
        a.territory.insert(CellCoord::new(1, 1));
        b.territory.insert(CellCoord::new(1, 1));
        let result = SimulationState::new(grid, vec![a, b], EngineConfig::default(), 1);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_adjacency_is_mutual() {
        let state = two_civ_state();
        let adj = state.adjacency();
        assert!(adj[&CivId(1)].contains(&CivId(2)));
        assert!(adj[&CivId(2)].contains(&CivId(1)));
    }

    #[test]
    fn test_collapse_releases_cells_and_ends_wars() {
        let mut state = two_civ_state();
        state.declare_war(CivId(1), CivId(2));
        state.collapse(CivId(2)).unwrap();

        assert!(state.wars.is_empty());
        assert_eq!(state.grid.owner(CellCoord::new(6, 2)), None);
        assert!(!state.civ(CivId(1)).unwrap().is_at_war());
        assert!(state
            .history
            .events
            .iter()
            .any(|e| matches!(e.kind, EventKind::Extinction { civ } if civ == CivId(2))));
        assert!(state.verify_invariants(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_verify_catches_owner_mismatch() {
        let mut state = two_civ_state();
        state.civs.get_mut(&CivId(1)).unwrap().territory.insert(CellCoord::new(10, 5));
        assert!(matches!(
            state.verify_invariants(&BTreeMap::new()),
            Err(SimError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_verify_catches_asymmetric_relation() {
        let mut state = two_civ_state();
        state.civs.get_mut(&CivId(1)).unwrap().relations.insert(CivId(2), 0.4);
        assert!(state.verify_invariants(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_verify_catches_technology_decrease() {
        let mut state = two_civ_state();
        state.civs.get_mut(&CivId(1)).unwrap().technology = 5.0;
        let before = state.technology_snapshot();
        state.civs.get_mut(&CivId(1)).unwrap().technology = 4.0;
        assert!(state.verify_invariants(&before).is_err());
    }
}
