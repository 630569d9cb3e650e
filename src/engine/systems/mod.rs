//! Simulation systems
//!
//! The four per-civilization engines (resources, growth, technology,
//! expansion) read the grid and mutate a single civilization, so they can run
//! on the rayon pool. Diplomacy and combat touch pairs of civilizations and
//! run serially afterwards.

pub mod combat;
pub mod diplomacy;
pub mod expansion;
pub mod growth;
pub mod resources;
pub mod technology;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::civilization::civ::Civilization;
use crate::civilization::traits::TraitTable;
use crate::core::config::EngineConfig;
use crate::core::types::{CellCoord, Tick};
use crate::world::grid::WorldGrid;

pub use combat::{resolve_battle, BattleOutcome};
pub use diplomacy::war_chance;
pub use expansion::{expansion_threshold, strategic_value};
pub use growth::compute_growth_rate;

/// Read-only context for one civilization's pass
pub struct CivContext<'a> {
    pub grid: &'a WorldGrid,
    pub config: &'a EngineConfig,
    pub traits: &'a TraitTable,
    /// The tick being computed
    pub tick: Tick,
}

/// What a civilization's pass asks the commit phase to do
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CivOutcome {
    /// Proposed territory claim, applied only if the cell is still free
    pub claim: Option<CellCoord>,
    /// Population reached zero during growth
    pub starved: bool,
}

/// Resource, growth, technology and expansion for one civilization
///
/// All randomness comes from `seed`, so the result does not depend on which
/// thread runs the pass or in what order.
pub fn run_civ_pass(civ: &mut Civilization, ctx: &CivContext<'_>, seed: u64) -> CivOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let flow = resources::apply(civ, ctx, &mut rng);
    growth::apply(civ, ctx, &mut rng);
    if civ.population == 0 {
        return CivOutcome { claim: None, starved: true };
    }
    technology::apply(civ, ctx, &mut rng);
    let claim = expansion::propose(civ, ctx, &flow);

    CivOutcome { claim, starved: false }
}
