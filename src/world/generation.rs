//! Stand-in world and civilization generation
//!
//! The engine only needs a static grid and a set of founded civilizations.
//! This generator produces both from a seed so the CLI and tests have
//! something to run on.

use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::civilization::belief::Belief;
use crate::civilization::civ::{civilization_name, Civilization};
use crate::civilization::traits::{parse_traits, random_traits};
use crate::core::config::{ScenarioConfig, WorldGenConfig};
use crate::core::error::{Result, SimError};
use crate::core::types::{CellCoord, CivId};
use crate::world::cell::{ResourceAmounts, Terrain, WorldCell};
use crate::world::grid::WorldGrid;

/// Starting population when a scenario does not name one
pub const DEFAULT_START_POPULATION: u64 = 100;

/// Minimum Chebyshev distance between two randomly placed capitals
const CAPITAL_SPACING: i32 = 6;

const PLACEMENT_ATTEMPTS: usize = 500;

/// Generate the terrain grid
pub fn generate_world(config: &WorldGenConfig) -> Result<WorldGrid> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (width, height) = (config.width, config.height);
    let mut terrain = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            terrain.push(generate_terrain(x, y, config, &mut rng));
        }
    }

    // Land touching water becomes coast
    let mut coastal = terrain.clone();
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let idx = (y as u32 * width + x as u32) as usize;
            if terrain[idx] == Terrain::Water {
                continue;
            }
            let touches_water = CellCoord::new(x, y).neighbors().any(|n| {
                n.x >= 0
                    && n.y >= 0
                    && (n.x as u32) < width
                    && (n.y as u32) < height
                    && terrain[(n.y as u32 * width + n.x as u32) as usize] == Terrain::Water
            });
            if touches_water && matches!(terrain[idx], Terrain::Land | Terrain::Desert) {
                coastal[idx] = Terrain::Coastal;
            }
        }
    }

    let cells = coastal
        .into_iter()
        .map(|t| WorldCell::new(t, generate_yields(t, &mut rng)))
        .collect();
    WorldGrid::new(width, height, cells)
}

fn generate_terrain(x: u32, y: u32, config: &WorldGenConfig, rng: &mut ChaCha8Rng) -> Terrain {
    let noise = simple_noise(x, y, config.seed);

    // Map edges tend toward water
    let edge_dist = x.min(config.width - 1 - x).min(y).min(config.height - 1 - y) as f64;
    let edge_factor = (edge_dist / 4.0).min(1.0);

    if noise < config.water_frequency * (2.0 - edge_factor) * 0.5
        || (edge_factor < 0.3 && rng.gen::<f64>() < config.water_frequency)
    {
        return Terrain::Water;
    }
    if noise > 1.0 - config.mountain_frequency {
        return Terrain::Mountain;
    }
    if rng.gen::<f64>() < config.forest_frequency {
        return Terrain::Forest;
    }
    if rng.gen::<f64>() < config.desert_frequency {
        return Terrain::Desert;
    }
    Terrain::Land
}

fn simple_noise(x: u32, y: u32, seed: u64) -> f64 {
    let n = (x as u64)
        .wrapping_mul(374761393)
        .wrapping_add((y as u64).wrapping_mul(668265263))
        .wrapping_add(seed);
    let n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    let n = n ^ (n >> 16);
    (n % 1_000_000) as f64 / 1_000_000.0
}

fn generate_yields(terrain: Terrain, rng: &mut ChaCha8Rng) -> ResourceAmounts {
    let mut sample = |(min, max): (f64, f64)| {
        if min >= max {
            min
        } else {
            rng.gen_range(min..max)
        }
    };
    let [food, wood, metal, stone] = terrain.yield_ranges();
    ResourceAmounts::new(sample(food), sample(wood), sample(metal), sample(stone))
}

/// Create the scenario's civilizations with their starting territory
///
/// Each civilization is placed on a capital cell and owns it plus its
/// claimable unowned neighbours. Territory is recorded on the civilization
/// only; `SimulationState::new` claims it on the grid.
pub fn found_civilizations(
    grid: &WorldGrid,
    scenario: &ScenarioConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Civilization>> {
    let mut taken: BTreeSet<CellCoord> = grid
        .iter()
        .filter(|(_, cell)| cell.owner.is_some())
        .map(|(c, _)| c)
        .collect();
    let mut capitals: Vec<CellCoord> = Vec::new();
    let mut civs = Vec::new();
    let mut next_id = 1;

    for spec in &scenario.civilizations {
        let traits = parse_traits(&spec.traits)?;
        let belief = match &spec.belief {
            Some(name) => name.parse::<Belief>()?,
            None => Belief::random(rng),
        };
        let capital = match spec.position {
            Some((x, y)) => {
                let coord = CellCoord::new(x, y);
                if !grid.in_bounds(coord) {
                    return Err(SimError::OutOfBounds(coord));
                }
                if !grid.is_unclaimed_land(coord) || taken.contains(&coord) {
                    return Err(SimError::InvalidConfig(format!(
                        "{} cannot be founded on {}",
                        spec.name, coord
                    )));
                }
                coord
            }
            None => pick_capital(grid, &taken, &capitals, rng)?,
        };
        let population = spec.population.unwrap_or(DEFAULT_START_POPULATION);
        let civ = settle(CivId(next_id), spec.name.clone(), population, belief, traits, capital, grid, &mut taken);
        capitals.push(capital);
        civs.push(civ);
        next_id += 1;
    }

    for _ in 0..scenario.random_civilizations {
        let capital = pick_capital(grid, &taken, &capitals, rng)?;
        let count = rng.gen_range(1..=3);
        let traits = random_traits(rng, count);
        let belief = Belief::random(rng);
        let name = civilization_name(rng);
        let civ = settle(CivId(next_id), name, DEFAULT_START_POPULATION, belief, traits, capital, grid, &mut taken);
        capitals.push(capital);
        civs.push(civ);
        next_id += 1;
    }

    Ok(civs)
}

#[allow(clippy::too_many_arguments)]
fn settle(
    id: CivId,
    name: String,
    population: u64,
    belief: Belief,
    traits: BTreeSet<crate::civilization::traits::Trait>,
    capital: CellCoord,
    grid: &WorldGrid,
    taken: &mut BTreeSet<CellCoord>,
) -> Civilization {
    let mut civ = Civilization::new(id, name, population, belief, traits, 0);
    civ.territory.insert(capital);
    taken.insert(capital);
    for n in grid.neighbors(capital) {
        if grid.is_unclaimed_land(n) && !taken.contains(&n) {
            civ.territory.insert(n);
            taken.insert(n);
        }
    }
    // Two ticks of food and a little of everything else
    let pop = population as f64;
    civ.stockpile = ResourceAmounts::new(pop * 2.0, pop * 0.1, pop * 0.05, pop * 0.05);
    civ
}

fn pick_capital(
    grid: &WorldGrid,
    taken: &BTreeSet<CellCoord>,
    capitals: &[CellCoord],
    rng: &mut ChaCha8Rng,
) -> Result<CellCoord> {
    let free = |c: CellCoord| grid.is_unclaimed_land(c) && !taken.contains(&c);

    for _ in 0..PLACEMENT_ATTEMPTS {
        let coord = CellCoord::new(
            rng.gen_range(0..grid.width() as i32),
            rng.gen_range(0..grid.height() as i32),
        );
        let spaced = capitals
            .iter()
            .all(|c| c.chebyshev_distance(&coord) >= CAPITAL_SPACING);
        if free(coord) && spaced {
            return Ok(coord);
        }
    }

    // Crowded map: take the first free cell
    grid.iter()
        .map(|(c, _)| c)
        .find(|c| free(*c))
        .ok_or_else(|| SimError::InvalidConfig("no free land left to found a civilization".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CivilizationSpec;

    #[test]
    fn test_generation_is_deterministic() {
        let config = WorldGenConfig::default();
        let a = generate_world(&config).unwrap();
        let b = generate_world(&config).unwrap();
        let ta: Vec<Terrain> = a.iter().map(|(_, c)| c.terrain).collect();
        let tb: Vec<Terrain> = b.iter().map(|(_, c)| c.terrain).collect();
        assert_eq!(ta, tb);
        assert_eq!(a.width(), 60);
    }

    #[test]
    fn test_yields_are_fractions() {
        let grid = generate_world(&WorldGenConfig::default()).unwrap();
        for (_, cell) in grid.iter() {
            for (_, v) in cell.yields.iter() {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_founded_territories_do_not_overlap() {
        let grid = generate_world(&WorldGenConfig::default()).unwrap();
        let scenario = ScenarioConfig { random_civilizations: 8, ..Default::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let civs = found_civilizations(&grid, &scenario, &mut rng).unwrap();
        assert_eq!(civs.len(), 8);

        let mut seen = BTreeSet::new();
        for civ in &civs {
            assert!(!civ.territory.is_empty());
            for cell in &civ.territory {
                assert!(seen.insert(*cell), "cell {} owned twice", cell);
                assert!(grid.is_unclaimed_land(*cell));
            }
        }
    }

    #[test]
    fn test_explicit_position_on_water_rejected() {
        let mut grid = WorldGrid::filled(10, 10, Terrain::Land, ResourceAmounts::new(0.5, 0.2, 0.1, 0.1));
        grid.set_cell(CellCoord::new(2, 2), Terrain::Water, ResourceAmounts::default()).unwrap();
        let scenario = ScenarioConfig {
            civilizations: vec![CivilizationSpec {
                name: "Sunken".into(),
                traits: vec![],
                belief: None,
                position: Some((2, 2)),
                population: None,
            }],
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(found_civilizations(&grid, &scenario, &mut rng).is_err());
    }
}
