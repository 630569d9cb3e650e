//! Civilization - the unit of simulation

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::civilization::belief::Belief;
use crate::civilization::traits::Trait;
use crate::core::types::{CellCoord, CivId, Tick};
use crate::world::cell::ResourceAmounts;

/// Resource stock per kind, never negative
pub type Stockpile = ResourceAmounts;

/// An urban centre on one of the civilization's cells
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub coord: CellCoord,
    pub founded: Tick,
    /// Fraction of the civilization's population living here
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    /// Source of truth for "alive"
    pub population: u64,
    pub stockpile: Stockpile,
    /// Never decreases except through an explicit God-Mode edit
    pub technology: f64,
    pub traits: BTreeSet<Trait>,
    pub belief: Belief,
    /// Every cell here has this civilization as its grid owner
    pub territory: BTreeSet<CellCoord>,
    /// In founding order
    pub cities: Vec<City>,
    /// Relation score in [-1, 1] per other civilization
    pub relations: BTreeMap<CivId, f64>,
    pub at_war_with: BTreeSet<CivId>,
    /// Civilizations whose territory has touched ours
    pub contacts: BTreeSet<CivId>,
    pub expansion_pressure: f64,
    pub founded: Tick,
    /// Tick of the most recent territory claim
    pub last_claim: Option<Tick>,
    pub extinct: bool,
    /// Production and demand of the most recent tick
    pub last_production: ResourceAmounts,
    pub last_consumption: ResourceAmounts,
    /// Set by a war-influence intervention; relations never rise above the
    /// configured hostility afterwards
    #[serde(default)]
    pub belligerent: bool,
}

impl Civilization {
    pub fn new(
        id: CivId,
        name: impl Into<String>,
        population: u64,
        belief: Belief,
        traits: BTreeSet<Trait>,
        founded: Tick,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            population,
            stockpile: Stockpile::default(),
            technology: 0.0,
            traits,
            belief,
            territory: BTreeSet::new(),
            cities: Vec::new(),
            relations: BTreeMap::new(),
            at_war_with: BTreeSet::new(),
            contacts: BTreeSet::new(),
            expansion_pressure: 0.0,
            founded,
            last_claim: None,
            extinct: population == 0,
            last_production: ResourceAmounts::default(),
            last_consumption: ResourceAmounts::default(),
            belligerent: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.extinct
    }

    pub fn is_at_war(&self) -> bool {
        !self.at_war_with.is_empty()
    }

    pub fn age(&self, tick: Tick) -> Tick {
        tick.saturating_sub(self.founded)
    }

    /// Relation toward `other`; 0.0 when never met
    pub fn relation(&self, other: CivId) -> f64 {
        self.relations.get(&other).copied().unwrap_or(0.0)
    }

    pub fn food_per_person(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.stockpile.food / self.population as f64
        }
    }

    pub fn city_at(&self, coord: CellCoord) -> Option<&City> {
        self.cities.iter().find(|c| c.coord == coord)
    }

    pub fn city_population(&self, city: &City) -> u64 {
        (self.population as f64 * city.share).round() as u64
    }

    /// Fraction of the population living in cities; the rest is rural
    pub fn urban_share(&self) -> f64 {
        self.cities.iter().map(|c| c.share).sum()
    }

    /// Found a city holding `share` of the population, limited to what the
    /// countryside still has
    pub fn add_city(&mut self, name: String, coord: CellCoord, tick: Tick, share: f64) {
        let room = (1.0 - self.urban_share()).max(0.0);
        let share = share.clamp(0.0, room);
        self.cities.push(City { name, coord, founded: tick, share });
    }

    /// Remove the city on `coord`, returning it with its share
    pub fn remove_city_at(&mut self, coord: CellCoord) -> Option<City> {
        let idx = self.cities.iter().position(|c| c.coord == coord)?;
        Some(self.cities.remove(idx))
    }

    /// Mark extinct and drop everything an extinct civilization cannot hold.
    /// The caller releases the grid cells.
    pub fn collapse(&mut self) -> BTreeSet<CellCoord> {
        self.population = 0;
        self.extinct = true;
        self.cities.clear();
        self.at_war_with.clear();
        self.expansion_pressure = 0.0;
        std::mem::take(&mut self.territory)
    }
}

const CIV_PREFIXES: &[&str] = &[
    "Ar", "Bel", "Cor", "Dra", "El", "Fen", "Gal", "Hal", "Ith", "Kar", "Lor", "Mor", "Nar", "Or",
    "Pel", "Quel", "Ros", "Sel", "Tor", "Val", "Xen", "Yr", "Zan",
];
const CIV_SUFFIXES: &[&str] = &[
    "ia", "on", "ar", "eth", "is", "or", "ium", "an", "os", "ea", "und", "heim",
];
const CITY_PREFIXES: &[&str] = &[
    "North", "South", "East", "West", "High", "Low", "Old", "New", "Red", "Stone", "River", "Iron",
    "Silver", "Green",
];
const CITY_SUFFIXES: &[&str] = &[
    "ford", "haven", "port", "burg", "ton", "wick", "gate", "hold", "field", "crest", "watch",
];

fn pick<R: Rng + ?Sized>(rng: &mut R, words: &[&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or("")
}

pub fn civilization_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}{}", pick(rng, CIV_PREFIXES), pick(rng, CIV_SUFFIXES))
}

pub fn city_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}{}", pick(rng, CITY_PREFIXES), pick(rng, CITY_SUFFIXES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn civ() -> Civilization {
        Civilization::new(CivId(1), "Testia", 200, Belief::SilverMoon, BTreeSet::new(), 0)
    }

    #[test]
    fn test_zero_population_starts_extinct() {
        let c = Civilization::new(CivId(2), "Empty", 0, Belief::GoldenSun, BTreeSet::new(), 0);
        assert!(!c.is_alive());
    }

    #[test]
    fn test_capital_leaves_a_rural_population() {
        let mut c = civ();
        c.add_city("A".into(), CellCoord::new(0, 0), 0, 0.2);
        assert!((c.urban_share() - 0.2).abs() < 1e-9);
        assert_eq!(c.city_population(&c.cities[0]), 40);

        c.add_city("B".into(), CellCoord::new(5, 0), 1, 0.2);
        let removed = c.remove_city_at(CellCoord::new(0, 0)).unwrap();
        assert_eq!(removed.name, "A");
        assert!((c.urban_share() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_city_shares_never_exceed_the_population() {
        let mut c = civ();
        for i in 0..4 {
            c.add_city(format!("C{}", i), CellCoord::new(i * 5, 0), i as u64, 0.4);
        }
        assert!(c.urban_share() <= 1.0 + 1e-9);
        assert!(c.cities[3].share < 1e-9);
    }

    #[test]
    fn test_food_per_person() {
        let mut c = civ();
        c.stockpile.food = 400.0;
        assert_eq!(c.food_per_person(), 2.0);
        c.population = 0;
        assert_eq!(c.food_per_person(), 0.0);
    }

    #[test]
    fn test_collapse_returns_territory() {
        let mut c = civ();
        c.territory.insert(CellCoord::new(1, 1));
        c.at_war_with.insert(CivId(3));
        let released = c.collapse();
        assert_eq!(released.len(), 1);
        assert!(c.territory.is_empty());
        assert!(c.extinct);
        assert!(!c.is_at_war());
    }

    #[test]
    fn test_names_are_deterministic() {
        let a = civilization_name(&mut ChaCha8Rng::seed_from_u64(5));
        let b = civilization_name(&mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);
        assert!(!city_name(&mut ChaCha8Rng::seed_from_u64(5)).is_empty());
    }
}
