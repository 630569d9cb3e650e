//! WorldCell - terrain, resource yields and ownership of one grid square

use serde::{Deserialize, Serialize};

use crate::core::types::CivId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Food,
    Wood,
    Metal,
    Stone,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Wood,
        ResourceKind::Metal,
        ResourceKind::Stone,
    ];
}

/// One quantity per resource kind
///
/// Used for cell yields (each in [0, 1]), stockpiles, production and demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmounts {
    pub food: f64,
    pub wood: f64,
    pub metal: f64,
    pub stone: f64,
}

impl ResourceAmounts {
    pub const fn new(food: f64, wood: f64, metal: f64, stone: f64) -> Self {
        Self { food, wood, metal, stone }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Metal => self.metal,
            ResourceKind::Stone => self.stone,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Metal => &mut self.metal,
            ResourceKind::Stone => &mut self.stone,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        ResourceKind::ALL.iter().map(move |&k| (k, self.get(k)))
    }

    pub fn total(&self) -> f64 {
        self.food + self.wood + self.metal + self.stone
    }

    /// Sum of everything except food
    pub fn materials(&self) -> f64 {
        self.wood + self.metal + self.stone
    }

    pub fn all_non_negative(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite() && v >= 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Land,
    Mountain,
    Forest,
    Desert,
    Coastal,
    Water,
}

impl Terrain {
    /// Water can never be owned or crossed
    pub fn is_claimable(&self) -> bool {
        !matches!(self, Terrain::Water)
    }

    /// Whether the cell counts as water access for a neighbouring city
    pub fn is_water_access(&self) -> bool {
        matches!(self, Terrain::Water | Terrain::Coastal)
    }

    /// Ruggedness in [0, 1]; used by expansion scoring and combat
    pub fn defensibility(&self) -> f64 {
        match self {
            Terrain::Mountain => 1.0,
            Terrain::Forest => 0.5,
            Terrain::Coastal => 0.3,
            Terrain::Land => 0.2,
            Terrain::Desert => 0.1,
            Terrain::Water => 0.0,
        }
    }

    /// Settlement suitability term of the city viability score
    pub fn settlement_value(&self) -> f64 {
        match self {
            Terrain::Land => 1.0,
            Terrain::Coastal => 1.0,
            Terrain::Forest => 0.5,
            Terrain::Desert => -0.5,
            Terrain::Mountain => -1.0,
            Terrain::Water => -10.0,
        }
    }

    /// Yield ranges per kind used by the stand-in generator: (min, max)
    pub fn yield_ranges(&self) -> [(f64, f64); 4] {
        match self {
            // food, wood, metal, stone
            Terrain::Land => [(0.5, 0.9), (0.1, 0.3), (0.0, 0.2), (0.1, 0.3)],
            Terrain::Mountain => [(0.0, 0.2), (0.0, 0.2), (0.5, 1.0), (0.5, 1.0)],
            Terrain::Forest => [(0.4, 0.7), (0.7, 1.0), (0.0, 0.2), (0.1, 0.3)],
            Terrain::Desert => [(0.0, 0.1), (0.0, 0.1), (0.2, 0.5), (0.3, 0.6)],
            Terrain::Coastal => [(0.6, 1.0), (0.1, 0.3), (0.0, 0.1), (0.1, 0.3)],
            Terrain::Water => [(0.0, 0.0); 4],
        }
    }
}

/// One grid square
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldCell {
    pub terrain: Terrain,
    /// Each yield is a fraction in [0, 1]
    pub yields: ResourceAmounts,
    /// At most one owner at any tick
    pub owner: Option<CivId>,
}

impl WorldCell {
    pub fn new(terrain: Terrain, yields: ResourceAmounts) -> Self {
        Self { terrain, yields, owner: None }
    }

    /// Combined yield normalised to [0, 1]
    pub fn resource_value(&self) -> f64 {
        self.yields.total() / ResourceKind::ALL.len() as f64
    }

    pub fn is_productive(&self) -> bool {
        self.terrain.is_claimable() && self.yields.total() > 0.0
    }
}
