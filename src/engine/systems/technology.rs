//! Technology engine: research points accumulate into a level that never falls

use rand::Rng;

use crate::civilization::civ::Civilization;
use crate::engine::systems::CivContext;

/// Saturating bonus from existing knowledge
pub fn knowledge_bonus(technology: f64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.technology;
    let t = technology.max(0.0);
    cfg.knowledge_max * t / (t + cfg.knowledge_scale)
}

/// Saturating bonus from population
pub fn population_factor(population: u64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.technology;
    let p = population as f64;
    cfg.population_max * p / (p + cfg.population_half)
}

/// Reduced by active wars and by the share of hostile relations
pub fn stability_modifier(civ: &Civilization, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.technology;
    let mut stability = 1.0;
    if civ.is_at_war() {
        stability -= cfg.war_stability_penalty;
    }
    if !civ.relations.is_empty() {
        let hostile = civ.relations.values().filter(|r| **r < cfg.hostile_relation).count();
        stability -= cfg.hostility_penalty * hostile as f64 / civ.relations.len() as f64;
    }
    stability.max(cfg.stability_floor)
}

pub fn tech_growth<R: Rng + ?Sized>(civ: &Civilization, ctx: &CivContext<'_>, rng: &mut R) -> f64 {
    let base = ctx.config.technology.base_rate.sample(rng) * ctx.traits.research_multiplier(&civ.traits);
    let growth = base
        * (1.0 + knowledge_bonus(civ.technology, ctx))
        * (1.0 + population_factor(civ.population, ctx))
        * stability_modifier(civ, ctx);
    growth.max(0.0)
}

pub fn apply<R: Rng + ?Sized>(civ: &mut Civilization, ctx: &CivContext<'_>, rng: &mut R) {
    let growth = tech_growth(civ, ctx, rng);
    let cap = ctx.config.technology.max_level;
    // The cap only stops growth; a level already above it is kept
    let next = (civ.technology + growth).min(cap.max(civ.technology));
    civ.technology = next.max(civ.technology);
}
