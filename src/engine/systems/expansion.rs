//! Expansion engine: pressure-driven territory claims and city founding
//!
//! Claims are only proposed here. The clock's commit phase grants them in
//! ascending civilization id, so two civilizations can never take the same
//! cell in one tick.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use rand::Rng;

use crate::civilization::civ::{city_name, Civilization};
use crate::core::config::ExpansionConfig;
use crate::core::types::{CellCoord, Tick};
use crate::engine::systems::resources::ResourceFlow;
use crate::engine::systems::CivContext;
use crate::world::cell::ResourceKind;
use crate::world::grid::WorldGrid;

/// Neighbour count at or below which a cell counts as a chokepoint
const CHOKEPOINT_NEIGHBORS: usize = 3;

pub fn expansion_threshold(civ: &Civilization, ctx: &CivContext<'_>) -> f64 {
    let size = civ.territory.len() as f64;
    ctx.config.expansion.base_threshold * size.sqrt() / 2.0 * ctx.traits.expansion_multiplier(&civ.traits)
}

/// Pressure added this tick from crowding and food surplus
pub fn pressure_gain(civ: &Civilization, flow: &ResourceFlow, config: &ExpansionConfig) -> f64 {
    let density = civ.population as f64 / civ.territory.len().max(1) as f64;
    density * config.density_weight + flow.net(ResourceKind::Food).max(0.0) * config.surplus_weight
}

/// Coastline access plus a chokepoint bonus
pub fn strategic_value(grid: &WorldGrid, coord: CellCoord) -> f64 {
    let neighbors = grid.neighbors(coord).count().max(1);
    let water = grid.water_neighbors(coord) as f64 / neighbors as f64;
    let choke = if grid.passable_neighbors(coord) <= CHOKEPOINT_NEIGHBORS { 0.5 } else { 0.0 };
    water + choke
}

pub fn claim_score(grid: &WorldGrid, coord: CellCoord, config: &ExpansionConfig) -> f64 {
    let Some(cell) = grid.get(coord) else {
        return f64::NEG_INFINITY;
    };
    config.resource_weight * cell.resource_value()
        + config.defensibility_weight * cell.terrain.defensibility()
        + config.strategic_weight * strategic_value(grid, coord)
}

/// Unclaimed claimable cells touching the territory, best first. Equal scores
/// fall back to the lowest coordinate.
pub fn candidates(civ: &Civilization, grid: &WorldGrid, config: &ExpansionConfig) -> Vec<(CellCoord, f64)> {
    let mut frontier: Vec<CellCoord> = civ
        .territory
        .iter()
        .flat_map(|c| grid.neighbors(*c))
        .filter(|c| grid.is_unclaimed_land(*c))
        .collect();
    frontier.sort();
    frontier.dedup();

    let mut scored: Vec<(CellCoord, f64)> = frontier
        .into_iter()
        .map(|c| (c, claim_score(grid, c, config)))
        .collect();
    scored.sort_by_key(|(c, s)| (Reverse(OrderedFloat(*s)), *c));
    scored
}

/// Accumulate pressure and propose the best frontier cell once it exceeds
/// the threshold
pub fn propose(civ: &mut Civilization, ctx: &CivContext<'_>, flow: &ResourceFlow) -> Option<CellCoord> {
    let config = &ctx.config.expansion;
    civ.expansion_pressure += pressure_gain(civ, flow, config);
    if civ.expansion_pressure <= expansion_threshold(civ, ctx) {
        return None;
    }
    candidates(civ, ctx.grid, config).first().map(|(c, _)| *c)
}

/// Water access + terrain value + resource value + strategic value
pub fn city_viability(grid: &WorldGrid, coord: CellCoord, config: &ExpansionConfig) -> f64 {
    let Some(cell) = grid.get(coord) else {
        return f64::NEG_INFINITY;
    };
    let water = if grid.water_neighbors(coord) > 0 || cell.terrain.is_water_access() {
        config.water_access_bonus
    } else {
        0.0
    };
    water + cell.terrain.settlement_value() + cell.resource_value() + strategic_value(grid, coord)
}

pub fn city_cap(civ: &Civilization, config: &ExpansionConfig) -> usize {
    ((civ.territory.len() as f64).sqrt() as usize).max(config.city_cap_min)
}

/// Whether `coord` may become a city of `civ` right now
pub fn can_found_city(civ: &Civilization, grid: &WorldGrid, coord: CellCoord, config: &ExpansionConfig) -> bool {
    civ.territory.contains(&coord)
        && civ.city_at(coord).is_none()
        && civ.cities.len() < city_cap(civ, config)
        && civ.population > civ.cities.len() as u64 * config.population_per_city
        && civ
            .cities
            .iter()
            .all(|c| c.coord.chebyshev_distance(&coord) >= config.city_min_distance)
        && city_viability(grid, coord, config) > config.city_viability_threshold
}

/// Cells worth checking for a new city: the freshly claimed one, or else the
/// most viable cell of the territory
pub fn founding_site(
    civ: &Civilization,
    grid: &WorldGrid,
    claimed: Option<CellCoord>,
    config: &ExpansionConfig,
) -> Option<CellCoord> {
    if let Some(cell) = claimed {
        if can_found_city(civ, grid, cell, config) {
            return Some(cell);
        }
    }
    let mut sites: Vec<(CellCoord, f64)> = civ
        .territory
        .iter()
        .map(|c| (*c, city_viability(grid, *c, config)))
        .collect();
    sites.sort_by_key(|(c, v)| (Reverse(OrderedFloat(*v)), *c));
    sites
        .into_iter()
        .map(|(c, _)| c)
        .find(|c| can_found_city(civ, grid, *c, config))
}

/// Found a city on `coord`, naming it from `rng`
pub fn found_city<R: Rng + ?Sized>(
    civ: &mut Civilization,
    coord: CellCoord,
    tick: Tick,
    config: &ExpansionConfig,
    rng: &mut R,
) -> String {
    let name = city_name(rng);
    civ.add_city(name.clone(), coord, tick, config.city_founding_share);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::belief::Belief;
    use crate::civilization::traits::{Trait, TraitTable};
    use crate::core::config::EngineConfig;
    use crate::core::types::CivId;
    use crate::world::cell::{ResourceAmounts, Terrain};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    fn plain() -> WorldGrid {
        WorldGrid::filled(10, 10, Terrain::Land, ResourceAmounts::new(0.5, 0.2, 0.1, 0.1))
    }

    fn civ_at(cells: &[(i32, i32)], traits: &[Trait]) -> Civilization {
        let mut c = Civilization::new(
            CivId(1),
            "Settlers",
            400,
            Belief::FlowingWater,
            traits.iter().copied().collect::<BTreeSet<_>>(),
            0,
        );
        for (x, y) in cells {
            c.territory.insert(CellCoord::new(*x, *y));
        }
        c
    }

    #[test]
    fn test_threshold_trait_multipliers() {
        let grid = plain();
        let config = EngineConfig::default();
        let traits = TraitTable::default();
        let ctx = CivContext { grid: &grid, config: &config, traits: &traits, tick: 1 };
        let cells = [(0, 0), (1, 0), (0, 1), (1, 1)];
        assert_eq!(expansion_threshold(&civ_at(&cells, &[]), &ctx), 80.0);
        assert_eq!(expansion_threshold(&civ_at(&cells, &[Trait::Expansionist]), &ctx), 30.0);
        assert_eq!(expansion_threshold(&civ_at(&cells, &[Trait::Isolationist]), &ctx), 150.0);
    }

    #[test]
    fn test_ties_break_on_lowest_coordinate() {
        let grid = plain();
        let config = EngineConfig::default();
        let civ = civ_at(&[(5, 5)], &[]);
        let ranked = candidates(&civ, &grid, &config.expansion);
        assert_eq!(ranked.len(), 8);
        assert_eq!(ranked[0].0, CellCoord::new(4, 4));
    }

    #[test]
    fn test_prefers_rich_defensible_cell() {
        let mut grid = plain();
        grid.set_cell(CellCoord::new(6, 5), Terrain::Mountain, ResourceAmounts::new(0.1, 0.1, 1.0, 1.0)).unwrap();
        let config = EngineConfig::default();
        let civ = civ_at(&[(5, 5)], &[]);
        let ranked = candidates(&civ, &grid, &config.expansion);
        assert_eq!(ranked[0].0, CellCoord::new(6, 5));
    }

    #[test]
    fn test_water_is_never_a_candidate() {
        let mut grid = plain();
        for x in 0..10 {
            grid.set_cell(CellCoord::new(x, 1), Terrain::Water, ResourceAmounts::default()).unwrap();
        }
        let config = EngineConfig::default();
        let civ = civ_at(&[(3, 0)], &[]);
        let ranked = candidates(&civ, &grid, &config.expansion);
        assert_eq!(ranked.iter().map(|(c, _)| *c).collect::<Vec<_>>(), vec![CellCoord::new(2, 0), CellCoord::new(4, 0)]);
    }

    #[test]
    fn test_propose_waits_for_threshold() {
        let grid = plain();
        let config = EngineConfig::default();
        let traits = TraitTable::default();
        let ctx = CivContext { grid: &grid, config: &config, traits: &traits, tick: 1 };
        let mut civ = civ_at(&[(5, 5), (5, 6), (6, 5), (6, 6)], &[]);
        civ.population = 40;
        let flow = ResourceFlow::default();

        // density 10 per tick against a threshold of 80
        for _ in 0..8 {
            assert!(propose(&mut civ, &ctx, &flow).is_none());
        }
        assert!(propose(&mut civ, &ctx, &flow).is_some());
    }

    #[test]
    fn test_city_needs_water_and_spacing() {
        let mut grid = plain();
        grid.set_cell(CellCoord::new(0, 0), Terrain::Water, ResourceAmounts::default()).unwrap();
        let config = EngineConfig::default();
        let mut civ = civ_at(&[(1, 1), (2, 1), (5, 5)], &[]);

        assert!(city_viability(&grid, CellCoord::new(1, 1), &config.expansion) > 2.5);
        assert!(can_found_city(&civ, &grid, CellCoord::new(1, 1), &config.expansion));
        assert!(!can_found_city(&civ, &grid, CellCoord::new(5, 5), &config.expansion));

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        found_city(&mut civ, CellCoord::new(1, 1), 3, &config.expansion, &mut rng);
        assert_eq!(civ.cities.len(), 1);
        assert!(!can_found_city(&civ, &grid, CellCoord::new(2, 1), &config.expansion));
    }

    #[test]
    fn test_founding_site_picks_best_cell_for_first_city() {
        let mut grid = plain();
        grid.set_cell(CellCoord::new(9, 9), Terrain::Water, ResourceAmounts::default()).unwrap();
        let config = EngineConfig::default();
        let civ = civ_at(&[(2, 2), (8, 8)], &[]);
        assert_eq!(founding_site(&civ, &grid, None, &config.expansion), Some(CellCoord::new(8, 8)));
    }

    #[test]
    fn test_second_city_on_held_land_without_a_claim() {
        let mut grid = plain();
        grid.set_cell(CellCoord::new(0, 0), Terrain::Water, ResourceAmounts::default()).unwrap();
        grid.set_cell(CellCoord::new(9, 9), Terrain::Water, ResourceAmounts::default()).unwrap();
        let config = EngineConfig::default();
        let mut civ = civ_at(&[(1, 1), (2, 1), (8, 8)], &[]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        found_city(&mut civ, CellCoord::new(1, 1), 1, &config.expansion, &mut rng);

        // the claimed cell sits too close to the capital
        let site = founding_site(&civ, &grid, Some(CellCoord::new(2, 1)), &config.expansion);
        assert_eq!(site, Some(CellCoord::new(8, 8)));
        assert_eq!(founding_site(&civ, &grid, None, &config.expansion), Some(CellCoord::new(8, 8)));
    }
}
