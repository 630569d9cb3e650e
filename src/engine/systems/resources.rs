//! Resource engine: production from territory, consumption by population

use rand::Rng;

use crate::civilization::civ::Civilization;
use crate::engine::systems::CivContext;
use crate::world::cell::{ResourceAmounts, ResourceKind};

/// One tick's production and demand
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResourceFlow {
    pub production: ResourceAmounts,
    pub consumption: ResourceAmounts,
}

impl ResourceFlow {
    pub fn net(&self, kind: ResourceKind) -> f64 {
        self.production.get(kind) - self.consumption.get(kind)
    }
}

/// Bonus for small civilizations, falling linearly to zero at the threshold
pub fn young_bonus(population: u64, ctx: &CivContext<'_>) -> f64 {
    let cfg = &ctx.config.resources;
    if population >= cfg.young_population_threshold || cfg.young_population_threshold == 0 {
        return 0.0;
    }
    cfg.young_bonus_max * (1.0 - population as f64 / cfg.young_population_threshold as f64)
}

/// Efficiency multiplier for one resource kind
pub fn efficiency(civ: &Civilization, ctx: &CivContext<'_>, kind: ResourceKind) -> f64 {
    let tech = 1.0 + (civ.technology + 1.0).ln() / ctx.config.resources.tech_efficiency_divisor;
    let young = 1.0 + young_bonus(civ.population, ctx);
    let traits = (1.0 + ctx.traits.resource_modifier(&civ.traits, kind)).max(0.0);
    tech * young * traits
}

/// Gross production over every owned cell. One variance draw per productive
/// cell, in coordinate order.
pub fn production<R: Rng + ?Sized>(civ: &Civilization, ctx: &CivContext<'_>, rng: &mut R) -> ResourceAmounts {
    let cfg = &ctx.config.resources;
    let mut raw = ResourceAmounts::default();

    for coord in &civ.territory {
        let Some(cell) = ctx.grid.get(*coord) else {
            continue;
        };
        if !cell.is_productive() {
            continue;
        }
        let variance = cfg.yield_variance.sample(rng);
        for kind in ResourceKind::ALL {
            *raw.get_mut(kind) += cell.yields.get(kind) * cfg.cell_output.get(kind) * variance;
        }
    }

    let mut out = ResourceAmounts::default();
    for kind in ResourceKind::ALL {
        *out.get_mut(kind) = raw.get(kind) * efficiency(civ, ctx, kind);
    }
    out
}

pub fn consumption(civ: &Civilization, ctx: &CivContext<'_>) -> ResourceAmounts {
    let per_capita = &ctx.config.resources.consumption_per_capita;
    let pop = civ.population as f64;
    ResourceAmounts::new(
        per_capita.food * pop,
        per_capita.wood * pop,
        per_capita.metal * pop,
        per_capita.stone * pop,
    )
}

/// Apply production and consumption; stockpiles are floored at zero
pub fn apply<R: Rng + ?Sized>(civ: &mut Civilization, ctx: &CivContext<'_>, rng: &mut R) -> ResourceFlow {
    let flow = ResourceFlow {
        production: production(civ, ctx, rng),
        consumption: consumption(civ, ctx),
    };
    for kind in ResourceKind::ALL {
        let stock = civ.stockpile.get_mut(kind);
        *stock = (*stock + flow.net(kind)).max(0.0);
    }
    civ.last_production = flow.production;
    civ.last_consumption = flow.consumption;
    flow
}
