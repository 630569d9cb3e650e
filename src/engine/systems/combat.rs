//! Combat resolver
//!
//! Each tick every active war whose sides share a border fights one battle.
//! Casualties and the border cell transfer are applied together, and a side
//! that reaches zero population becomes extinct in the same tick.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::civilization::civ::Civilization;
use crate::civilization::traits::TraitTable;
use crate::core::config::{CombatConfig, Range};
use crate::core::error::{Result, SimError};
use crate::core::types::{CellCoord, CivId, WarId};
use crate::engine::events::{EventKind, WarEndReason};
use crate::engine::state::SimulationState;
use crate::world::grid::WorldGrid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BattleOutcome {
    pub winner: CivId,
    pub loser: CivId,
    pub winner_casualties: u64,
    pub loser_casualties: u64,
}

/// Mean defensibility of the civilization's cells
pub fn terrain_modifier(civ: &Civilization, grid: &WorldGrid, config: &CombatConfig) -> f64 {
    if civ.territory.is_empty() {
        return 1.0;
    }
    let total: f64 = civ
        .territory
        .iter()
        .filter_map(|c| grid.get(*c))
        .map(|cell| cell.terrain.defensibility())
        .sum();
    1.0 + config.terrain_weight * total / civ.territory.len() as f64
}

pub fn strength<R: Rng + ?Sized>(
    civ: &Civilization,
    grid: &WorldGrid,
    config: &CombatConfig,
    traits: &TraitTable,
    rng: &mut R,
) -> f64 {
    civ.population as f64
        * (1.0 + civ.technology / config.tech_divisor)
        * terrain_modifier(civ, grid, config)
        * traits.combat_factor(&civ.traits)
        * config.strength_noise.sample(rng)
}

/// Fraction of `population` drawn from `range`, never more than everyone
pub fn casualties<R: Rng + ?Sized>(population: u64, range: Range, rng: &mut R) -> u64 {
    let lost = (population as f64 * range.sample(rng)).round() as u64;
    lost.min(population)
}

/// Decide a battle from the two sides' strengths. Equal strength favours `a`.
pub fn resolve_battle<R: Rng + ?Sized>(
    a: (CivId, f64, u64),
    b: (CivId, f64, u64),
    config: &CombatConfig,
    rng: &mut R,
) -> BattleOutcome {
    let (winner, loser) = if b.1 > a.1 { (b, a) } else { (a, b) };
    BattleOutcome {
        winner: winner.0,
        loser: loser.0,
        winner_casualties: casualties(winner.2, config.winner_casualties, rng),
        loser_casualties: casualties(loser.2, config.loser_casualties, rng),
    }
}

/// The loser's cells touching the winner, in coordinate order
pub fn contested_cells(grid: &WorldGrid, loser: &Civilization, winner: CivId) -> Vec<CellCoord> {
    loser
        .territory
        .iter()
        .filter(|c| grid.neighbors(**c).any(|n| grid.owner(n) == Some(winner)))
        .copied()
        .collect()
}

fn share_border(state: &SimulationState, a: CivId, b: CivId) -> bool {
    state
        .civ(a)
        .map(|civ| !contested_cells(&state.grid, civ, b).is_empty())
        .unwrap_or(false)
}

/// Run every active war for this tick
pub fn run(state: &mut SimulationState) -> Result<()> {
    let tick = state.tick + 1;
    let war_ids: Vec<WarId> = state.wars.keys().copied().collect();

    for id in war_ids {
        let Some(war) = state.wars.get(&id).cloned() else {
            continue;
        };
        let (a, b) = (war.aggressor, war.defender);
        if !state.is_alive(a) || !state.is_alive(b) {
            continue;
        }

        if war.started < tick && share_border(state, a, b) {
            fight(state, id, a, b)?;
            if !state.wars.contains_key(&id) {
                continue;
            }
        }

        check_war_end(state, id, a, b, war.started, tick);
    }
    Ok(())
}

fn fight(state: &mut SimulationState, war: WarId, a: CivId, b: CivId) -> Result<()> {
    let config = state.config.combat.clone();
    let civ_a = state.civs.get(&a).ok_or(SimError::UnknownCivilization(a))?;
    let civ_b = state.civs.get(&b).ok_or(SimError::UnknownCivilization(b))?;
    let (pop_a, pop_b) = (civ_a.population, civ_b.population);

    let sa = strength(civ_a, &state.grid, &config, &state.traits, &mut state.rng);
    let sb = strength(civ_b, &state.grid, &config, &state.traits, &mut state.rng);
    let outcome = resolve_battle((a, sa, pop_a), (b, sb, pop_b), &config, &mut state.rng);
    let (winner, loser) = (outcome.winner, outcome.loser);

    for (id, lost) in [(winner, outcome.winner_casualties), (loser, outcome.loser_casualties)] {
        if let Some(c) = state.civ_mut(id) {
            c.population = c.population.saturating_sub(lost);
        }
    }
    debug!(%war, %winner, %loser, ?outcome, "Battle");
    state.emit(
        EventKind::Battle {
            war,
            winner,
            loser,
            winner_casualties: outcome.winner_casualties,
            loser_casualties: outcome.loser_casualties,
        },
        None,
    );

    let both_alive = state.civ(winner).map(|c| c.population > 0).unwrap_or(false)
        && state.civ(loser).map(|c| c.population > 0).unwrap_or(false);
    if both_alive {
        let loser_before = if loser == a { pop_a } else { pop_b };
        let budget = capture_budget(loser_before, outcome.loser_casualties, &config);
        transfer_border_cell(state, winner, loser, budget, &config)?;
    }

    for id in [winner, loser] {
        if state.civ(id).map(|c| c.population == 0 && c.is_alive()).unwrap_or(false) {
            state.collapse(id)?;
        }
    }
    Ok(())
}

/// People a captured city may still take from the loser. One battle never
/// costs the loser more than `loser_casualties.max` of its pre-battle
/// population, counting the inhabitants of a captured city.
pub fn capture_budget(loser_before: u64, casualties: u64, config: &CombatConfig) -> u64 {
    let ceiling = (loser_before as f64 * config.loser_casualties.max).floor() as u64;
    ceiling.saturating_sub(casualties)
}

fn transfer_border_cell(
    state: &mut SimulationState,
    winner: CivId,
    loser: CivId,
    budget: u64,
    config: &CombatConfig,
) -> Result<()> {
    let tick = state.tick + 1;
    let loser_civ = state.civ(loser).ok_or(SimError::UnknownCivilization(loser))?;
    let contested = contested_cells(&state.grid, loser_civ, winner);
    let Some(cell) = contested.choose(&mut state.rng).copied() else {
        return Ok(());
    };

    state.grid.transfer(cell, loser, winner)?;
    let captured = {
        let l = state.civ_mut(loser).ok_or(SimError::UnknownCivilization(loser))?;
        l.territory.remove(&cell);
        let city_pop = l.city_at(cell).map(|city| l.city_population(city).min(budget));
        match (l.remove_city_at(cell), city_pop) {
            (Some(city), Some(city_pop)) => {
                l.population = l.population.saturating_sub(city_pop);
                Some((city, city_pop))
            }
            _ => None,
        }
    };

    let w = state.civ_mut(winner).ok_or(SimError::UnknownCivilization(winner))?;
    w.territory.insert(cell);
    state.emit(EventKind::TerritoryLost { loser, winner, cell }, Some(cell));

    if let Some((city, city_pop)) = captured {
        let lost = ((city_pop as f64) * config.city_capture_loss).round() as u64;
        let moved = city_pop.saturating_sub(lost);
        let w = state.civ_mut(winner).ok_or(SimError::UnknownCivilization(winner))?;
        w.population = w.population.saturating_add(moved);
        let share = if w.population > 0 { moved as f64 / w.population as f64 } else { 0.0 };
        w.add_city(city.name.clone(), cell, tick, share);
        state.emit(
            EventKind::CityCaptured {
                from: loser,
                to: winner,
                city: city.name,
                cell,
                inhabitants: city_pop,
                casualties: lost,
            },
            Some(cell),
        );
    }
    Ok(())
}

fn check_war_end(state: &mut SimulationState, id: WarId, a: CivId, b: CivId, started: u64, tick: u64) {
    let config = &state.config.combat;
    let min = config.min_viable_population;
    let pop = |c: CivId| state.civ(c).map(|x| x.population).unwrap_or(0);
    let (weak_a, weak_b) = (pop(a) < min, pop(b) < min);

    let decision = if weak_a || weak_b {
        let victor = match (weak_a, weak_b) {
            (true, false) => Some(b),
            (false, true) => Some(a),
            _ => None,
        };
        Some((victor, WarEndReason::Exhaustion))
    } else if tick.saturating_sub(started) >= config.max_war_ticks {
        Some((None, WarEndReason::Stalemate))
    } else {
        let peace = config.peace_chance;
        if state.rng.gen::<f64>() < peace {
            Some((None, WarEndReason::Peace))
        } else {
            None
        }
    };

    if let Some((victor, reason)) = decision {
        state.end_war(id, victor, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::tests::two_civ_state;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_battle_casualty_ranges() {
        let config = CombatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let out = resolve_battle((CivId(1), 1000.0, 10_000), (CivId(2), 600.0, 10_000), &config, &mut rng);
            assert_eq!(out.winner, CivId(1));
            assert!((300..=700).contains(&out.winner_casualties));
            assert!((800..=1500).contains(&out.loser_casualties));
        }
    }

    #[test]
    fn test_casualties_never_exceed_population() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(casualties(3, Range::new(1.0, 1.0), &mut rng), 3);
        assert_eq!(casualties(0, Range::new(0.5, 0.9), &mut rng), 0);
    }

    #[test]
    fn test_battle_transfers_one_cell() {
        let mut state = two_civ_state();
        state.config.combat.peace_chance = 0.0;
        state.declare_war(CivId(1), CivId(2));
        state.tick = 1;
        let before_a = state.civ(CivId(1)).unwrap().territory.len();
        let before_b = state.civ(CivId(2)).unwrap().territory.len();

        run(&mut state).unwrap();

        let after_a = state.civ(CivId(1)).unwrap().territory.len();
        let after_b = state.civ(CivId(2)).unwrap().territory.len();
        assert_eq!(after_a + after_b, before_a + before_b);
        assert_eq!((after_a as i64 - before_a as i64).abs(), 1);
        assert_eq!(state.history.count(|k| matches!(k, EventKind::TerritoryLost { .. })), 1);
        assert!(state.verify_invariants(&state.technology_snapshot()).is_ok());
    }

    #[test]
    fn test_no_battle_on_declaration_tick() {
        let mut state = two_civ_state();
        state.config.combat.peace_chance = 0.0;
        state.declare_war(CivId(1), CivId(2));
        run(&mut state).unwrap();
        assert_eq!(state.history.count(|k| matches!(k, EventKind::Battle { .. })), 0);
    }

    #[test]
    fn test_city_changes_hands() {
        let mut state = two_civ_state();
        state.config.combat.peace_chance = 0.0;
        // make civ 1 overwhelming so civ 2 loses a border cell
        state.civ_mut(CivId(1)).unwrap().population = 100_000;
        state.civ_mut(CivId(2)).unwrap().population = 1_000;
        for y in 1..4 {
            state.civ_mut(CivId(2)).unwrap().territory.remove(&CellCoord::new(5, y));
            state.grid.release(CellCoord::new(5, y), CivId(2)).unwrap();
        }
        state.grid.claim(CellCoord::new(5, 2), CivId(2)).unwrap();
        state.civ_mut(CivId(2)).unwrap().territory.insert(CellCoord::new(5, 2));
        let share = state.config.expansion.city_founding_share;
        state.civ_mut(CivId(2)).unwrap().add_city("Borderton".into(), CellCoord::new(5, 2), 0, share);
        state.declare_war(CivId(1), CivId(2));
        state.tick = 1;

        run(&mut state).unwrap();

        let winner = state.civ(CivId(1)).unwrap();
        assert!(winner.city_at(CellCoord::new(5, 2)).is_some());
        assert!(state.civ(CivId(2)).unwrap().cities.is_empty());
        assert_eq!(state.history.count(|k| matches!(k, EventKind::CityCaptured { .. })), 1);
    }

    #[test]
    fn test_capital_capture_keeps_losses_in_range() {
        let mut state = two_civ_state();
        state.config.combat.peace_chance = 0.0;
        state.civ_mut(CivId(1)).unwrap().population = 100_000;
        state.civ_mut(CivId(2)).unwrap().population = 2_000;
        for y in 1..4 {
            state.civ_mut(CivId(2)).unwrap().territory.remove(&CellCoord::new(5, y));
            state.grid.release(CellCoord::new(5, y), CivId(2)).unwrap();
        }
        state.grid.claim(CellCoord::new(5, 2), CivId(2)).unwrap();
        let loser = state.civ_mut(CivId(2)).unwrap();
        loser.territory.insert(CellCoord::new(5, 2));
        // the capital holds everyone
        loser.add_city("Capital".into(), CellCoord::new(5, 2), 0, 1.0);
        loser.add_city("Outpost".into(), CellCoord::new(7, 2), 0, 0.0);
        state.declare_war(CivId(1), CivId(2));
        state.tick = 1;

        run(&mut state).unwrap();

        assert!(state.civ(CivId(1)).unwrap().city_at(CellCoord::new(5, 2)).is_some());
        let loser = state.civ(CivId(2)).unwrap();
        assert!(loser.is_alive());
        let max = state.config.combat.loser_casualties.max;
        let lost = 2_000 - loser.population;
        assert!(lost as f64 <= 2_000.0 * max + 1.0, "lost {lost}");
        assert!(loser.city_at(CellCoord::new(7, 2)).is_some());
    }

    #[test]
    fn test_capture_budget_is_what_casualties_leave() {
        let config = CombatConfig::default();
        assert_eq!(capture_budget(2_000, 200, &config), 100);
        assert_eq!(capture_budget(2_000, 400, &config), 0);
        assert_eq!(capture_budget(0, 0, &config), 0);
    }

    #[test]
    fn test_exhausted_side_ends_war() {
        let mut state = two_civ_state();
        state.declare_war(CivId(1), CivId(2));
        state.civ_mut(CivId(2)).unwrap().population = 10;
        state.tick = 1;
        run(&mut state).unwrap();
        assert!(state.wars.is_empty());
        assert!(state.history.events.iter().any(|e| matches!(
            e.kind,
            EventKind::WarResolved { reason: WarEndReason::Exhaustion, victor: Some(CivId(1)), .. }
        )));
        assert_eq!(
            state.civ(CivId(1)).unwrap().relation(CivId(2)),
            state.config.combat.peace_relation
        );
    }

    #[test]
    fn test_war_times_out() {
        let mut state = two_civ_state();
        state.config.combat.peace_chance = 0.0;
        state.config.combat.max_war_ticks = 3;
        state.declare_war(CivId(1), CivId(2));
        // sides no longer touch: no battles, only the timer runs
        for y in 1..4 {
            state.civ_mut(CivId(2)).unwrap().territory.remove(&CellCoord::new(5, y));
            state.grid.release(CellCoord::new(5, y), CivId(2)).unwrap();
        }
        for t in 1..=3 {
            state.tick = t;
            run(&mut state).unwrap();
        }
        assert!(state.wars.is_empty());
    }
}
