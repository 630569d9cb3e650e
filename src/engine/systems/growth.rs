//! Growth engine: population change from food adequacy and demography

use rand::Rng;

use crate::civilization::civ::Civilization;
use crate::engine::systems::CivContext;

/// Base rate drawn from the food-adequacy bracket
pub fn base_rate<R: Rng + ?Sized>(food_per_person: f64, ctx: &CivContext<'_>, rng: &mut R) -> f64 {
    let cfg = &ctx.config.growth;
    // brackets are validated to be in descending order of threshold
    match cfg.brackets.iter().find(|b| food_per_person >= b.min_food_per_person) {
        Some(bracket) => bracket.rate.sample(rng),
        None => cfg.starvation_rate.sample(rng),
    }
}

/// Demographic transition step function
pub fn size_factor(population: u64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.growth;
    cfg.size_steps
        .iter()
        .find(|s| population < s.below)
        .map(|s| s.factor)
        .unwrap_or(cfg.size_factor_floor)
}

pub fn tech_factor(technology: f64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.growth;
    (1.0 + (technology + 1.0).ln() / cfg.tech_factor_divisor).min(cfg.tech_factor_max)
}

/// Young-civilization bonus, replaced by the war penalty while fighting
pub fn protection_factor(civ: &Civilization, base: f64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.growth;
    if civ.is_at_war() && base > 0.0 {
        cfg.war_growth_factor
    } else if civ.age(ctx.tick) < cfg.protection_ticks {
        cfg.protection_factor
    } else {
        1.0
    }
}

pub fn expansion_factor(civ: &Civilization, ctx: &CivContext<'_>) -> f64 {
    match civ.last_claim {
        Some(t) if t + 1 >= ctx.tick => ctx.config.growth.recent_claim_factor,
        _ => 1.0,
    }
}

/// Saturating bonus from non-food materials per person
pub fn resource_factor(civ: &Civilization, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.growth;
    if civ.population == 0 {
        return cfg.resource_factor_min;
    }
    let per_person = civ.stockpile.materials() / civ.population as f64;
    cfg.resource_factor_min
        + (cfg.resource_factor_max - cfg.resource_factor_min) * per_person
            / (per_person + cfg.resource_half_saturation)
}

/// Final growth rate for this tick
pub fn compute_growth_rate<R: Rng + ?Sized>(civ: &Civilization, ctx: &CivContext<'_>, rng: &mut R) -> f64 {
    let base = base_rate(civ.food_per_person(), ctx, rng);
    base * size_factor(civ.population, ctx)
        * tech_factor(civ.technology, ctx)
        * ctx.traits.growth_factor(&civ.traits, civ.territory.len())
        * protection_factor(civ, base, ctx)
        * expansion_factor(civ, ctx)
        * resource_factor(civ, ctx)
}

/// Population after applying `rate`. A negative rate always removes at least
/// one person so starving civilizations reach zero.
pub fn next_population(population: u64, rate: f64) -> u64 {
    let projected = (population as f64 * (1.0 + rate)).round().max(0.0) as u64;
    if rate < 0.0 {
        projected.min(population.saturating_sub(1))
    } else {
        projected
    }
}

pub fn apply<R: Rng + ?Sized>(civ: &mut Civilization, ctx: &CivContext<'_>, rng: &mut R) {
    if civ.population == 0 {
        return;
    }
    let rate = compute_growth_rate(civ, ctx, rng);
    civ.population = next_population(civ.population, rate);
}
