//! Engine configuration with documented constants
//!
//! Every tunable number the engines use lives here, grouped by the engine
//! that reads it. Sections deserialize with `#[serde(default)]` so a TOML file
//! only needs to name the values it overrides.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::civilization::traits::TraitOverride;
use crate::core::error::{Result, SimError};
use crate::engine::intervention::Intervention;
use crate::core::types::Tick;
use crate::world::cell::ResourceAmounts;

/// Closed interval sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(SimError::InvalidConfig(format!("{} must be finite", name)));
        }
        if self.min > self.max {
            return Err(SimError::InvalidConfig(format!(
                "{} has min ({}) > max ({})",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Configuration for the whole engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resources: ResourceConfig,
    pub growth: GrowthConfig,
    pub technology: TechnologyConfig,
    pub expansion: ExpansionConfig,
    pub diplomacy: DiplomacyConfig,
    pub combat: CombatConfig,
    pub disaster: DisasterConfig,
    pub intervention: InterventionConfig,

    /// Per-trait modifier overrides, applied on top of the built-in table
    pub traits: Vec<TraitOverride>,

    /// Minimum alive civilization count before the per-civilization phase
    /// runs on the rayon pool. Results are identical either way.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resources: ResourceConfig::default(),
            growth: GrowthConfig::default(),
            technology: TechnologyConfig::default(),
            expansion: ExpansionConfig::default(),
            diplomacy: DiplomacyConfig::default(),
            combat: CombatConfig::default(),
            disaster: DisasterConfig::default(),
            intervention: InterventionConfig::default(),
            traits: Vec::new(),
            parallel_threshold: 64,
        }
    }
}

// === RESOURCE ENGINE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Output of one cell whose yield for a kind is 1.0
    pub cell_output: ResourceAmounts,

    /// Demand per person per tick. Food dominates.
    pub consumption_per_capita: ResourceAmounts,

    /// Divisor of `ln(technology + 1)` in the efficiency formula
    pub tech_efficiency_divisor: f64,

    /// Population below which the young-civilization bonus applies
    pub young_population_threshold: u64,

    /// Bonus at population 1; falls linearly to 0 at the threshold
    pub young_bonus_max: f64,

    /// Per-cell random multiplier (one draw per owned productive cell)
    pub yield_variance: Range,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cell_output: ResourceAmounts::new(12.0, 4.0, 2.0, 3.0),
            consumption_per_capita: ResourceAmounts::new(0.5, 0.02, 0.005, 0.01),
            tech_efficiency_divisor: 20.0,
            young_population_threshold: 500,
            young_bonus_max: 0.5,
            yield_variance: Range::new(0.9, 1.1),
        }
    }
}

// === GROWTH ENGINE ===

/// One food-adequacy bracket: applies when food per person >= `min_food_per_person`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthBracket {
    pub min_food_per_person: f64,
    pub rate: Range,
}

/// Demographic step: applies while population < `below`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeStep {
    pub below: u64,
    pub factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Brackets in descending `min_food_per_person` order
    pub brackets: Vec<GrowthBracket>,

    /// Rate drawn when no bracket matches (starvation)
    pub starvation_rate: Range,

    /// Demographic transition steps in ascending `below` order
    pub size_steps: Vec<SizeStep>,

    /// Factor once population exceeds every step
    pub size_factor_floor: f64,

    /// `tech_factor = 1 + ln(technology + 1) / divisor`, capped at `tech_factor_max`
    pub tech_factor_divisor: f64,
    pub tech_factor_max: f64,

    /// Ticks after founding during which `protection_factor` applies
    pub protection_ticks: Tick,
    pub protection_factor: f64,

    /// Replaces `protection_factor` for positive growth while at war
    pub war_growth_factor: f64,

    /// Applied the tick after a civilization claimed a cell
    pub recent_claim_factor: f64,

    /// `resource_factor` runs from min (no materials) to max (saturated)
    pub resource_factor_min: f64,
    pub resource_factor_max: f64,

    /// Materials per person at which `resource_factor` is halfway
    pub resource_half_saturation: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            brackets: vec![
                GrowthBracket { min_food_per_person: 1.5, rate: Range::new(0.01, 0.02) },
                GrowthBracket { min_food_per_person: 1.0, rate: Range::new(0.005, 0.015) },
                GrowthBracket { min_food_per_person: 0.75, rate: Range::new(0.003, 0.008) },
                GrowthBracket { min_food_per_person: 0.5, rate: Range::new(-0.001, 0.003) },
            ],
            starvation_rate: Range::new(-0.015, -0.005),
            size_steps: vec![
                SizeStep { below: 100, factor: 1.3 },
                SizeStep { below: 10_000, factor: 1.0 },
                SizeStep { below: 50_000, factor: 0.8 },
                SizeStep { below: 100_000, factor: 0.6 },
                SizeStep { below: 500_000, factor: 0.4 },
            ],
            size_factor_floor: 0.2,
            tech_factor_divisor: 20.0,
            tech_factor_max: 1.5,
            protection_ticks: 20,
            protection_factor: 1.2,
            war_growth_factor: 0.85,
            recent_claim_factor: 1.05,
            resource_factor_min: 1.0,
            resource_factor_max: 1.1,
            resource_half_saturation: 1.0,
        }
    }
}

// === TECHNOLOGY ENGINE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyConfig {
    /// Research points drawn per tick before modifiers
    pub base_rate: Range,

    /// `knowledge_bonus = knowledge_max * technology / (technology + knowledge_scale)`
    pub knowledge_max: f64,
    pub knowledge_scale: f64,

    /// `population_factor = population_max * pop / (pop + population_half)`
    pub population_max: f64,
    pub population_half: f64,

    /// Stability lost while fighting any war
    pub war_stability_penalty: f64,

    /// Relations below this count as hostile
    pub hostile_relation: f64,

    /// Stability lost at 100% hostile relations (scaled by the hostile fraction)
    pub hostility_penalty: f64,

    pub stability_floor: f64,

    /// Upper bound on technology level
    pub max_level: f64,
}

impl Default for TechnologyConfig {
    fn default() -> Self {
        Self {
            base_rate: Range::new(0.01, 0.05),
            knowledge_max: 1.0,
            knowledge_scale: 200.0,
            population_max: 1.0,
            population_half: 5_000.0,
            war_stability_penalty: 0.3,
            hostile_relation: -0.5,
            hostility_penalty: 0.2,
            stability_floor: 0.1,
            max_level: 50_000.0,
        }
    }
}

// === EXPANSION ENGINE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// `threshold = base_threshold * sqrt(territory) / 2 * trait multiplier`
    pub base_threshold: f64,

    /// Pressure gained per person-per-cell of density
    pub density_weight: f64,

    /// Pressure gained per unit of net food surplus
    pub surplus_weight: f64,

    /// Cell score weights
    pub resource_weight: f64,
    pub defensibility_weight: f64,
    pub strategic_weight: f64,

    /// Viability score a cell must exceed to become a city
    pub city_viability_threshold: f64,

    /// No two cities of one civilization closer than this (Chebyshev)
    pub city_min_distance: i32,

    /// Viability bonus for a cell next to water
    pub water_access_bonus: f64,

    /// Population share a new city takes from the others
    pub city_founding_share: f64,

    /// People required per existing city before another may be founded
    pub population_per_city: u64,

    /// City cap is `max(city_cap_min, sqrt(territory))`
    pub city_cap_min: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            base_threshold: 80.0,
            density_weight: 1.0,
            surplus_weight: 0.1,
            resource_weight: 1.0,
            defensibility_weight: 0.5,
            strategic_weight: 0.5,
            city_viability_threshold: 2.5,
            city_min_distance: 4,
            water_access_bonus: 2.0,
            city_founding_share: 0.2,
            population_per_city: 100,
            city_cap_min: 3,
        }
    }
}

// === DIPLOMACY ENGINE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// Random relation drift per tick
    pub drift: Range,

    /// Added while the pair's territories touch
    pub border_friction: f64,

    /// Extra friction when one side's territory exceeds the other's by this ratio
    pub size_threat_ratio: f64,
    pub size_threat: f64,

    /// Technology gap that starts to breed resentment, and the full resentment
    pub tech_gap_threshold: f64,
    pub tech_gap_resentment: f64,

    /// Weight of belief compatibility in the per-tick update. The relation
    /// moves by `belief_weight * belief_compatibility` each tick, so the
    /// default 0.02 gives at most +/-0.02 per tick.
    pub belief_weight: f64,

    /// Base chance of war when a war check happens
    pub base_war_chance: f64,

    /// Compatibility below this adds `belief_war_bonus`
    pub belief_war_threshold: f64,
    pub belief_war_bonus: f64,

    /// Established pairs only roll for war below this relation
    pub hostility_threshold: f64,

    /// Initial relation on first contact
    pub first_contact_noise: Range,
    pub first_contact_belief_weight: f64,
    pub first_contact_trait_weight: f64,

    /// Relation band in which trade happens
    pub trade_min_relation: f64,
    pub trade_max_relation: f64,
    pub trade_chance: f64,

    /// Fraction of the giving stock traded, capped at `trade_cap`
    pub trade_fraction: f64,
    pub trade_cap: f64,
    pub trade_relation_bonus: f64,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            drift: Range::new(-0.05, 0.05),
            border_friction: -0.02,
            size_threat_ratio: 2.0,
            size_threat: -0.01,
            tech_gap_threshold: 100.0,
            tech_gap_resentment: -0.02,
            belief_weight: 0.02,
            base_war_chance: 0.1,
            belief_war_threshold: -0.5,
            belief_war_bonus: 0.4,
            hostility_threshold: -0.7,
            first_contact_noise: Range::new(-0.2, 0.2),
            first_contact_belief_weight: 0.7,
            first_contact_trait_weight: 0.3,
            trade_min_relation: 0.3,
            trade_max_relation: 1.0,
            trade_chance: 0.3,
            trade_fraction: 0.1,
            trade_cap: 10.0,
            trade_relation_bonus: 0.05,
        }
    }
}

// === COMBAT RESOLVER ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// `strength = pop * (1 + technology / tech_divisor) * ...`
    pub tech_divisor: f64,

    /// Weight of average territory defensibility in `terrain_modifier`
    pub terrain_weight: f64,

    pub strength_noise: Range,
    pub winner_casualties: Range,
    pub loser_casualties: Range,

    /// War ends once either side drops below this
    pub min_viable_population: u64,

    /// Per-tick chance a war ends in a negotiated peace
    pub peace_chance: f64,

    /// Hard limit on war duration
    pub max_war_ticks: Tick,

    /// Relation both sides return to at peace
    pub peace_relation: f64,

    /// Fraction of a captured city's people lost in the capture
    pub city_capture_loss: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            tech_divisor: 500.0,
            terrain_weight: 0.3,
            strength_noise: Range::new(0.8, 1.2),
            winner_casualties: Range::new(0.03, 0.07),
            loser_casualties: Range::new(0.08, 0.15),
            min_viable_population: 50,
            peace_chance: 0.05,
            max_war_ticks: 200,
            peace_relation: 0.0,
            city_capture_loss: 0.4,
        }
    }
}

// === DISASTERS ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasterConfig {
    /// Base damage rate, scaled by magnitude and the affected territory share
    pub damage: Range,

    /// Fraction of `damage_rate` applied to every stockpile
    pub resource_damage: Range,

    pub damage_cap: f64,
    pub max_magnitude: f64,
    pub max_radius: i32,

    /// A natural disaster may strike every `natural_interval` ticks, with
    /// probability `natural_chance`. Zero disables natural disasters.
    pub natural_interval: u64,
    pub natural_chance: f64,
    pub natural_radius_min: i32,
    pub natural_radius_max: i32,
    pub natural_magnitude: Range,
}

impl Default for DisasterConfig {
    fn default() -> Self {
        Self {
            damage: Range::new(0.1, 0.3),
            resource_damage: Range::new(0.3, 0.7),
            damage_cap: 0.9,
            max_magnitude: 10.0,
            max_radius: 32,
            natural_interval: 10,
            natural_chance: 0.1,
            natural_radius_min: 3,
            natural_radius_max: 8,
            natural_magnitude: Range::new(0.5, 1.5),
        }
    }
}

// === INTERVENTIONS ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    /// Relation a civilization keeps toward everyone after `war_influence`
    pub war_influence_relation: f64,

    /// Relations after `shift_ideology` are redrawn from this range
    pub ideology_relation_noise: Range,

    /// How many traits `shift_ideology` draws, at most
    pub ideology_max_traits: usize,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            war_influence_relation: -0.9,
            ideology_relation_noise: Range::new(-0.1, 0.1),
            ideology_max_traits: 3,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let r = &self.resources;
        r.yield_variance.check("resources.yield_variance")?;
        if r.yield_variance.min < 0.0 {
            return Err(invalid("resources.yield_variance must be non-negative"));
        }
        if !r.cell_output.all_non_negative() || !r.consumption_per_capita.all_non_negative() {
            return Err(invalid("resource outputs and demands must be non-negative"));
        }
        positive(r.tech_efficiency_divisor, "resources.tech_efficiency_divisor")?;

        let g = &self.growth;
        if g.brackets.is_empty() {
            return Err(invalid("growth.brackets must not be empty"));
        }
        for (i, bracket) in g.brackets.iter().enumerate() {
            bracket.rate.check(&format!("growth.brackets[{}].rate", i))?;
            if i > 0 && bracket.min_food_per_person >= g.brackets[i - 1].min_food_per_person {
                return Err(invalid("growth.brackets must be in descending food order"));
            }
        }
        g.starvation_rate.check("growth.starvation_rate")?;
        for (i, step) in g.size_steps.iter().enumerate() {
            positive(step.factor, "growth.size_steps factor")?;
            if i > 0 && step.below <= g.size_steps[i - 1].below {
                return Err(invalid("growth.size_steps must be in ascending population order"));
            }
        }
        positive(g.size_factor_floor, "growth.size_factor_floor")?;
        positive(g.tech_factor_divisor, "growth.tech_factor_divisor")?;
        if g.tech_factor_max < 1.0 {
            return Err(invalid("growth.tech_factor_max must be >= 1"));
        }
        positive(g.protection_factor, "growth.protection_factor")?;
        positive(g.war_growth_factor, "growth.war_growth_factor")?;
        positive(g.recent_claim_factor, "growth.recent_claim_factor")?;
        Range::new(g.resource_factor_min, g.resource_factor_max).check("growth.resource_factor")?;
        positive(g.resource_factor_min, "growth.resource_factor_min")?;
        positive(g.resource_half_saturation, "growth.resource_half_saturation")?;

        let t = &self.technology;
        t.base_rate.check("technology.base_rate")?;
        if t.base_rate.min < 0.0 {
            return Err(invalid("technology.base_rate must be non-negative"));
        }
        positive(t.knowledge_scale, "technology.knowledge_scale")?;
        positive(t.population_half, "technology.population_half")?;
        unit(t.stability_floor, "technology.stability_floor")?;
        positive(t.max_level, "technology.max_level")?;

        let e = &self.expansion;
        positive(e.base_threshold, "expansion.base_threshold")?;
        unit(e.city_founding_share, "expansion.city_founding_share")?;
        if e.city_min_distance < 1 {
            return Err(invalid("expansion.city_min_distance must be >= 1"));
        }

        let d = &self.diplomacy;
        d.drift.check("diplomacy.drift")?;
        d.first_contact_noise.check("diplomacy.first_contact_noise")?;
        signed_unit(d.hostility_threshold, "diplomacy.hostility_threshold")?;
        signed_unit(d.belief_war_threshold, "diplomacy.belief_war_threshold")?;
        unit(d.base_war_chance, "diplomacy.base_war_chance")?;
        unit(d.trade_chance, "diplomacy.trade_chance")?;
        unit(d.trade_fraction, "diplomacy.trade_fraction")?;
        Range::new(d.trade_min_relation, d.trade_max_relation).check("diplomacy.trade relation band")?;

        let c = &self.combat;
        positive(c.tech_divisor, "combat.tech_divisor")?;
        c.strength_noise.check("combat.strength_noise")?;
        c.winner_casualties.check("combat.winner_casualties")?;
        c.loser_casualties.check("combat.loser_casualties")?;
        for (range, name) in [
            (c.winner_casualties, "combat.winner_casualties"),
            (c.loser_casualties, "combat.loser_casualties"),
        ] {
            if !UNIT.contains(range.min) || !UNIT.contains(range.max) {
                return Err(invalid(&format!("{} must lie within [0, 1]", name)));
            }
        }
        if c.strength_noise.min <= 0.0 {
            return Err(invalid("combat.strength_noise must be positive"));
        }
        unit(c.peace_chance, "combat.peace_chance")?;
        signed_unit(c.peace_relation, "combat.peace_relation")?;
        unit(c.city_capture_loss, "combat.city_capture_loss")?;

        let x = &self.disaster;
        x.damage.check("disaster.damage")?;
        x.resource_damage.check("disaster.resource_damage")?;
        unit(x.damage_cap, "disaster.damage_cap")?;
        positive(x.max_magnitude, "disaster.max_magnitude")?;
        if x.max_radius < 0 {
            return Err(invalid("disaster.max_radius must be non-negative"));
        }
        unit(x.natural_chance, "disaster.natural_chance")?;
        if x.natural_radius_min < 0
            || x.natural_radius_min > x.natural_radius_max
            || x.natural_radius_max > x.max_radius
        {
            return Err(invalid("disaster.natural_radius must satisfy 0 <= min <= max <= max_radius"));
        }
        x.natural_magnitude.check("disaster.natural_magnitude")?;
        if x.natural_magnitude.min <= 0.0 || x.natural_magnitude.max > x.max_magnitude {
            return Err(invalid("disaster.natural_magnitude must lie within (0, max_magnitude]"));
        }

        let i = &self.intervention;
        signed_unit(i.war_influence_relation, "intervention.war_influence_relation")?;
        i.ideology_relation_noise.check("intervention.ideology_relation_noise")?;
        let noise = i.ideology_relation_noise;
        if !SIGNED_UNIT.contains(noise.min) || !SIGNED_UNIT.contains(noise.max) {
            return Err(invalid("intervention.ideology_relation_noise must lie within [-1, 1]"));
        }
        if i.ideology_max_traits == 0 {
            return Err(invalid("intervention.ideology_max_traits must be >= 1"));
        }

        // trait names are checked when the table is compiled
        crate::civilization::traits::TraitTable::with_overrides(&self.traits)?;

        Ok(())
    }
}

fn invalid(message: &str) -> SimError {
    SimError::InvalidConfig(message.to_string())
}

fn positive(value: f64, name: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{} must be positive (got {})", name, value)))
    }
}

const UNIT: Range = Range::new(0.0, 1.0);
const SIGNED_UNIT: Range = Range::new(-1.0, 1.0);

fn unit(value: f64, name: &str) -> Result<()> {
    if UNIT.contains(value) {
        Ok(())
    } else {
        Err(invalid(&format!("{} must lie within [0, 1] (got {})", name, value)))
    }
}

fn signed_unit(value: f64, name: &str) -> Result<()> {
    if SIGNED_UNIT.contains(value) {
        Ok(())
    } else {
        Err(invalid(&format!("{} must lie within [-1, 1] (got {})", name, value)))
    }
}

/// Stand-in world generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub water_frequency: f64,
    pub mountain_frequency: f64,
    pub forest_frequency: f64,
    pub desert_frequency: f64,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 40,
            seed: 12345,
            water_frequency: 0.15,
            mountain_frequency: 0.1,
            forest_frequency: 0.2,
            desert_frequency: 0.08,
        }
    }
}

/// An explicitly placed civilization in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivilizationSpec {
    pub name: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub belief: Option<String>,
    #[serde(default)]
    pub position: Option<(i32, i32)>,
    #[serde(default)]
    pub population: Option<u64>,
}

/// An intervention scheduled for the boundary before a given tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedIntervention {
    pub tick: Tick,
    #[serde(flatten)]
    pub intervention: Intervention,
}

/// World, starting civilizations and scripted God-Mode actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub world: WorldGenConfig,

    /// Randomly founded civilizations, in addition to `civilizations`
    pub random_civilizations: u32,
    pub civilizations: Vec<CivilizationSpec>,
    pub interventions: Vec<ScriptedIntervention>,
}

impl ScenarioConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: ScenarioConfig = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.width == 0 || self.world.height == 0 {
            return Err(invalid("world dimensions must be non-zero"));
        }
        for freq in [
            self.world.water_frequency,
            self.world.mountain_frequency,
            self.world.forest_frequency,
            self.world.desert_frequency,
        ] {
            unit(freq, "world terrain frequency")?;
        }
        for spec in &self.civilizations {
            crate::civilization::traits::parse_traits(&spec.traits)?;
            if let Some(belief) = &spec.belief {
                belief.parse::<crate::civilization::belief::Belief>()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = EngineConfig::default();
        config.combat.loser_casualties = Range::new(0.2, 0.1);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_unordered_brackets_rejected() {
        let mut config = EngineConfig::default();
        config.growth.brackets.reverse();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            parallel_threshold = 8

            [combat]
            peace_chance = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.parallel_threshold, 8);
        assert_eq!(config.combat.peace_chance, 0.2);
        // untouched sections keep their defaults
        assert_eq!(config.combat.tech_divisor, 500.0);
        assert_eq!(config.expansion.base_threshold, 80.0);
    }

    #[test]
    fn test_out_of_range_toml_rejected() {
        let result = EngineConfig::from_toml_str("[combat]\npeace_chance = 1.5\n");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_trait_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [[traits]]
            name = "GLUTTONOUS"
            growth_factor = 1.2
            "#,
        );
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_scenario_rejects_unknown_trait() {
        let result = ScenarioConfig::from_toml_str(
            r#"
            [[civilizations]]
            name = "Lyra"
            traits = ["PEACEFUL", "SLEEPY"]
            "#,
        );
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_range_sample_degenerate() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        assert_eq!(Range::new(0.3, 0.3).sample(&mut rng), 0.3);
        let v = Range::new(0.1, 0.2).sample(&mut rng);
        assert!(Range::new(0.1, 0.2).contains(v));
        assert!(!Range::new(0.1, 0.2).contains(f64::NAN));
    }

    #[test]
    fn test_casualty_range_outside_unit_rejected() {
        let mut config = EngineConfig::default();
        config.combat.winner_casualties = Range::new(0.5, 1.2);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_natural_disaster_radius_checked() {
        let mut config = EngineConfig::default();
        config.disaster.natural_radius_min = 9;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.disaster.natural_radius_max = config.disaster.max_radius + 1;
        assert!(config.validate().is_err());

        let config = EngineConfig::from_toml_str("[disaster]\nnatural_interval = 0\n").unwrap();
        assert_eq!(config.disaster.natural_interval, 0);
    }

    #[test]
    fn test_war_influence_relation_must_be_a_relation() {
        let result = EngineConfig::from_toml_str("[intervention]\nwar_influence_relation = -1.5\n");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }
}
