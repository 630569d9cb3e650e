//! Diplomacy engine: relation drift, first contact, war declarations, trade
//!
//! Runs once per tick over every unordered pair of alive civilizations in
//! ascending id order. Both relation entries of a pair are always written
//! together.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::debug;

use crate::civilization::civ::Civilization;
use crate::civilization::traits::{trait_compatibility, Trait, TraitTable};
use crate::core::config::DiplomacyConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::CivId;
use crate::engine::events::EventKind;
use crate::engine::state::SimulationState;
use crate::world::cell::ResourceKind;

/// Probability that a hostile pair goes to war on a single draw
pub fn war_chance(
    belief_compatibility: f64,
    a: &BTreeSet<Trait>,
    b: &BTreeSet<Trait>,
    config: &DiplomacyConfig,
    traits: &TraitTable,
) -> f64 {
    let belief = if belief_compatibility < config.belief_war_threshold {
        config.belief_war_bonus
    } else {
        0.0
    };
    (config.base_war_chance + belief + traits.war_modifier(a) + traits.war_modifier(b)).clamp(0.0, 1.0)
}

/// Opening relation of two civilizations meeting for the first time
pub fn first_contact_relation<R: Rng + ?Sized>(
    a: &Civilization,
    b: &Civilization,
    config: &DiplomacyConfig,
    rng: &mut R,
) -> f64 {
    let belief = a.belief.compatibility(&b.belief);
    let traits = trait_compatibility(&a.traits, &b.traits);
    (config.first_contact_belief_weight * belief
        + config.first_contact_trait_weight * traits
        + config.first_contact_noise.sample(rng))
    .clamp(-1.0, 1.0)
}

/// Border friction and size threat; zero for non-adjacent pairs
pub fn territory_pressure(a: &Civilization, b: &Civilization, adjacent: bool, config: &DiplomacyConfig) -> f64 {
    if !adjacent {
        return 0.0;
    }
    let (small, large) = {
        let x = a.territory.len().max(1) as f64;
        let y = b.territory.len().max(1) as f64;
        (x.min(y), x.max(y))
    };
    let threat = if large / small > config.size_threat_ratio { config.size_threat } else { 0.0 };
    config.border_friction + threat
}

/// Resentment once the technology gap passes the threshold
pub fn tech_factor(a: &Civilization, b: &Civilization, config: &DiplomacyConfig) -> f64 {
    let gap = (a.technology - b.technology).abs();
    if gap <= config.tech_gap_threshold {
        return 0.0;
    }
    config.tech_gap_resentment * (gap / config.tech_gap_threshold).min(1.0)
}

/// One tick's relation update for a pair that has already met
pub fn updated_relation<R: Rng + ?Sized>(
    a: &Civilization,
    b: &Civilization,
    adjacent: bool,
    config: &DiplomacyConfig,
    rng: &mut R,
) -> f64 {
    let current = a.relation(b.id);
    let belief = config.belief_weight * a.belief.compatibility(&b.belief);
    (current
        + config.drift.sample(rng)
        + territory_pressure(a, b, adjacent, config)
        + tech_factor(a, b, config)
        + belief)
        .clamp(-1.0, 1.0)
}

/// A pair with a belligerent side never rises above `ceiling`
pub fn belligerent_ceiling(a: &Civilization, b: &Civilization, relation: f64, ceiling: f64) -> f64 {
    if a.belligerent || b.belligerent {
        relation.min(ceiling)
    } else {
        relation
    }
}

/// What each side hands over in a trade: the kind it holds most of relative
/// to its partner
fn trade_offer(giver: &Civilization, taker: &Civilization, config: &DiplomacyConfig) -> Option<(ResourceKind, f64)> {
    let (kind, advantage) = ResourceKind::ALL
        .iter()
        .map(|k| (*k, giver.stockpile.get(*k) - taker.stockpile.get(*k)))
        .fold((ResourceKind::Food, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
    if advantage <= 0.0 {
        return None;
    }
    let amount = (giver.stockpile.get(kind) * config.trade_fraction).min(config.trade_cap);
    (amount > 0.0).then_some((kind, amount))
}

/// Run the diplomacy phase
pub fn run(state: &mut SimulationState, adjacency: &BTreeMap<CivId, BTreeSet<CivId>>) -> Result<()> {
    let ids = state.alive_ids();
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            if !state.is_alive(a) || !state.is_alive(b) {
                continue;
            }
            let adjacent = adjacency.get(&a).map(|s| s.contains(&b)).unwrap_or(false);
            update_pair(state, a, b, adjacent)?;
        }
    }
    Ok(())
}

fn update_pair(state: &mut SimulationState, a: CivId, b: CivId, adjacent: bool) -> Result<()> {
    let config = state.config.diplomacy.clone();
    let ceiling = state.config.intervention.war_influence_relation;
    let civ_a = state.civ(a).ok_or(SimError::UnknownCivilization(a))?.clone();
    let civ_b = state.civ(b).ok_or(SimError::UnknownCivilization(b))?.clone();
    let at_war = civ_a.at_war_with.contains(&b);
    let met = civ_a.contacts.contains(&b);

    let mut check_war = false;
    if adjacent && !met {
        let relation = first_contact_relation(&civ_a, &civ_b, &config, &mut state.rng);
        let relation = belligerent_ceiling(&civ_a, &civ_b, relation, ceiling);
        state.set_relation(a, b, relation);
        for (x, y) in [(a, b), (b, a)] {
            if let Some(c) = state.civ_mut(x) {
                c.contacts.insert(y);
            }
        }
        debug!(%a, %b, relation, "First contact");
        state.emit(EventKind::FirstContact { a, b, relation }, None);
        check_war = !at_war;
    } else {
        let relation = updated_relation(&civ_a, &civ_b, adjacent, &config, &mut state.rng);
        let relation = belligerent_ceiling(&civ_a, &civ_b, relation, ceiling);
        state.set_relation(a, b, relation);
        if adjacent && !at_war && relation < config.hostility_threshold {
            check_war = true;
        }
    }

    if check_war {
        let compat = civ_a.belief.compatibility(&civ_b.belief);
        let chance = war_chance(compat, &civ_a.traits, &civ_b.traits, &config, &state.traits);
        if state.rng.gen::<f64>() < chance {
            let (aggressor, defender) =
                if state.traits.war_modifier(&civ_b.traits) > state.traits.war_modifier(&civ_a.traits) {
                    (b, a)
                } else {
                    (a, b)
                };
            state.declare_war(aggressor, defender);
            return Ok(());
        }
    }

    if adjacent && !at_war {
        try_trade(state, a, b, &config)?;
    }
    Ok(())
}

fn try_trade(state: &mut SimulationState, a: CivId, b: CivId, config: &DiplomacyConfig) -> Result<()> {
    let civ_a = state.civs.get(&a).ok_or(SimError::UnknownCivilization(a))?;
    let civ_b = state.civs.get(&b).ok_or(SimError::UnknownCivilization(b))?;
    let relation = civ_a.relation(b);
    if relation < config.trade_min_relation || relation > config.trade_max_relation {
        return Ok(());
    }
    let chance = (config.trade_chance
        + state.traits.trade_modifier(&civ_a.traits)
        + state.traits.trade_modifier(&civ_b.traits))
    .clamp(0.0, 1.0);
    let offer_a = trade_offer(civ_a, civ_b, config);
    let offer_b = trade_offer(civ_b, civ_a, config);
    if state.rng.gen::<f64>() >= chance {
        return Ok(());
    }
    if offer_a.is_none() && offer_b.is_none() {
        return Ok(());
    }

    for (giver, taker, offer) in [(a, b, offer_a), (b, a, offer_b)] {
        if let Some((kind, amount)) = offer {
            if let Some(c) = state.civ_mut(giver) {
                let stock = c.stockpile.get_mut(kind);
                *stock = (*stock - amount).max(0.0);
            }
            if let Some(c) = state.civ_mut(taker) {
                *c.stockpile.get_mut(kind) += amount;
            }
        }
    }
    state.set_relation(a, b, relation + config.trade_relation_bonus);

    let none = (ResourceKind::Food, 0.0);
    state.emit(
        EventKind::Trade { a, b, a_gave: offer_a.unwrap_or(none), b_gave: offer_b.unwrap_or(none) },
        None,
    );
    Ok(())
}
