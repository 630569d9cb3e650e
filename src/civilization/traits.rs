//! Civilization traits and the modifier table each formula reads
//!
//! Formulas never branch on individual traits. They ask the `TraitTable` for
//! the combined modifier at their site (growth, resources, expansion,
//! research, war, combat, trade).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::world::cell::{ResourceAmounts, ResourceKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trait {
    Aggressive,
    Peaceful,
    Expansionist,
    Isolationist,
    TechSavvy,
    Religious,
    Trading,
    Weird,
}

impl Trait {
    pub const ALL: [Trait; 8] = [
        Trait::Aggressive,
        Trait::Peaceful,
        Trait::Expansionist,
        Trait::Isolationist,
        Trait::TechSavvy,
        Trait::Religious,
        Trait::Trading,
        Trait::Weird,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Trait::Aggressive => "AGGRESSIVE",
            Trait::Peaceful => "PEACEFUL",
            Trait::Expansionist => "EXPANSIONIST",
            Trait::Isolationist => "ISOLATIONIST",
            Trait::TechSavvy => "TECH_SAVVY",
            Trait::Religious => "RELIGIOUS",
            Trait::Trading => "TRADING",
            Trait::Weird => "WEIRD",
        }
    }

    /// The trait this one can never coexist with
    pub fn opposite(&self) -> Option<Trait> {
        match self {
            Trait::Aggressive => Some(Trait::Peaceful),
            Trait::Peaceful => Some(Trait::Aggressive),
            Trait::Expansionist => Some(Trait::Isolationist),
            Trait::Isolationist => Some(Trait::Expansionist),
            _ => None,
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trait {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Trait::ALL
            .iter()
            .copied()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| SimError::InvalidConfig(format!("unknown trait '{}'", s)))
    }
}

/// Parse trait names, rejecting unknown names and opposing pairs
pub fn parse_traits(names: &[String]) -> Result<BTreeSet<Trait>> {
    let mut traits = BTreeSet::new();
    for name in names {
        let t: Trait = name.parse()?;
        if let Some(opposite) = t.opposite() {
            if traits.contains(&opposite) {
                return Err(SimError::InvalidConfig(format!(
                    "traits {} and {} cannot coexist",
                    t, opposite
                )));
            }
        }
        traits.insert(t);
    }
    Ok(traits)
}

/// Draw up to `count` distinct traits with no opposing pair
pub fn random_traits<R: Rng + ?Sized>(rng: &mut R, count: usize) -> BTreeSet<Trait> {
    let mut selected = BTreeSet::new();
    for _ in 0..count {
        let options: Vec<Trait> = Trait::ALL
            .iter()
            .copied()
            .filter(|t| !selected.contains(t))
            .filter(|t| t.opposite().map_or(true, |o| !selected.contains(&o)))
            .collect();
        match options.choose(rng) {
            Some(t) => {
                selected.insert(*t);
            }
            None => break,
        }
    }
    selected
}

/// How much two trait sets get along, in [-1, 1]
pub fn trait_compatibility(a: &BTreeSet<Trait>, b: &BTreeSet<Trait>) -> f64 {
    let mut score: f64 = 0.0;
    for t in a {
        if b.contains(t) {
            score += 0.15;
        }
        if let Some(o) = t.opposite() {
            if b.contains(&o) {
                score -= 0.3;
            }
        }
    }
    if a.contains(&Trait::Peaceful) && b.contains(&Trait::Peaceful) {
        score += 0.3;
    }
    if a.contains(&Trait::Aggressive) && b.contains(&Trait::Aggressive) {
        score -= 0.2;
    }
    if a.contains(&Trait::Trading) && b.contains(&Trait::Trading) {
        score += 0.2;
    }
    score.clamp(-1.0, 1.0)
}

/// Modifiers one trait contributes at each formula site
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitModifiers {
    /// Multiplies the growth rate
    pub growth_factor: f64,
    /// Multiplies the growth rate once territory exceeds the table's `large_territory`
    pub large_territory_growth_factor: f64,
    /// Added to the resource efficiency trait modifier, per kind
    pub resource_bonus: ResourceAmounts,
    /// Multiplies the expansion threshold
    pub expansion_multiplier: f64,
    /// Multiplies research points
    pub research_multiplier: f64,
    /// Added to the war chance
    pub war_chance: f64,
    /// Multiplies combat strength
    pub combat_factor: f64,
    /// Added to the trade chance
    pub trade_chance: f64,
}

impl Default for TraitModifiers {
    fn default() -> Self {
        Self {
            growth_factor: 1.0,
            large_territory_growth_factor: 1.0,
            resource_bonus: ResourceAmounts::default(),
            expansion_multiplier: 1.0,
            research_multiplier: 1.0,
            war_chance: 0.0,
            combat_factor: 1.0,
            trade_chance: 0.0,
        }
    }
}

/// Partial override of one trait's modifiers, as written in TOML
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitOverride {
    pub name: String,
    pub growth_factor: Option<f64>,
    pub large_territory_growth_factor: Option<f64>,
    pub resource_bonus: Option<ResourceAmounts>,
    pub expansion_multiplier: Option<f64>,
    pub research_multiplier: Option<f64>,
    pub war_chance: Option<f64>,
    pub combat_factor: Option<f64>,
    pub trade_chance: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraitTable {
    entries: BTreeMap<Trait, TraitModifiers>,
    /// Territory size above which `large_territory_growth_factor` applies
    pub large_territory: usize,
}

impl Default for TraitTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        let base = TraitModifiers::default();

        entries.insert(
            Trait::Aggressive,
            TraitModifiers {
                growth_factor: 0.8,
                resource_bonus: ResourceAmounts::new(0.0, 0.0, 0.1, 0.0),
                war_chance: 0.15,
                combat_factor: 1.3,
                ..base
            },
        );
        entries.insert(
            Trait::Peaceful,
            TraitModifiers {
                growth_factor: 1.1,
                resource_bonus: ResourceAmounts::new(0.1, 0.0, 0.0, 0.0),
                war_chance: -0.15,
                combat_factor: 0.7,
                ..base
            },
        );
        entries.insert(
            Trait::Expansionist,
            TraitModifiers {
                large_territory_growth_factor: 1.05,
                expansion_multiplier: 0.375,
                ..base
            },
        );
        entries.insert(
            Trait::Isolationist,
            TraitModifiers {
                expansion_multiplier: 1.875,
                trade_chance: -0.2,
                ..base
            },
        );
        entries.insert(
            Trait::TechSavvy,
            TraitModifiers {
                resource_bonus: ResourceAmounts::new(0.0, 0.0, 0.2, 0.2),
                research_multiplier: 3.0,
                ..base
            },
        );
        entries.insert(
            Trait::Religious,
            TraitModifiers {
                resource_bonus: ResourceAmounts::new(0.0, 0.0, 0.0, 0.05),
                ..base
            },
        );
        entries.insert(
            Trait::Trading,
            TraitModifiers {
                resource_bonus: ResourceAmounts::new(0.05, 0.05, 0.0, 0.0),
                trade_chance: 0.3,
                ..base
            },
        );
        entries.insert(
            Trait::Weird,
            TraitModifiers {
                research_multiplier: 1.1,
                war_chance: 0.05,
                ..base
            },
        );

        Self { entries, large_territory: 50 }
    }
}

impl TraitTable {
    /// Built-in table with TOML overrides applied
    pub fn with_overrides(overrides: &[TraitOverride]) -> Result<Self> {
        let mut table = Self::default();
        for o in overrides {
            let t: Trait = o.name.parse()?;
            let entry = table.entries.entry(t).or_default();
            if let Some(v) = o.growth_factor {
                entry.growth_factor = non_negative(v, &o.name)?;
            }
            if let Some(v) = o.large_territory_growth_factor {
                entry.large_territory_growth_factor = non_negative(v, &o.name)?;
            }
            if let Some(v) = o.resource_bonus {
                entry.resource_bonus = v;
            }
            if let Some(v) = o.expansion_multiplier {
                entry.expansion_multiplier = non_negative(v, &o.name)?;
            }
            if let Some(v) = o.research_multiplier {
                entry.research_multiplier = non_negative(v, &o.name)?;
            }
            if let Some(v) = o.war_chance {
                entry.war_chance = v;
            }
            if let Some(v) = o.combat_factor {
                entry.combat_factor = non_negative(v, &o.name)?;
            }
            if let Some(v) = o.trade_chance {
                entry.trade_chance = v;
            }
        }
        Ok(table)
    }

    pub fn modifiers(&self, t: Trait) -> TraitModifiers {
        self.entries.get(&t).copied().unwrap_or_default()
    }

    fn each<'a>(&'a self, traits: &'a BTreeSet<Trait>) -> impl Iterator<Item = TraitModifiers> + 'a {
        traits.iter().map(move |t| self.modifiers(*t))
    }

    pub fn growth_factor(&self, traits: &BTreeSet<Trait>, territory_size: usize) -> f64 {
        let large = territory_size > self.large_territory;
        self.each(traits)
            .map(|m| {
                if large {
                    m.growth_factor * m.large_territory_growth_factor
                } else {
                    m.growth_factor
                }
            })
            .product()
    }

    pub fn resource_modifier(&self, traits: &BTreeSet<Trait>, kind: ResourceKind) -> f64 {
        self.each(traits).map(|m| m.resource_bonus.get(kind)).sum()
    }

    pub fn expansion_multiplier(&self, traits: &BTreeSet<Trait>) -> f64 {
        self.each(traits).map(|m| m.expansion_multiplier).product()
    }

    pub fn research_multiplier(&self, traits: &BTreeSet<Trait>) -> f64 {
        self.each(traits).map(|m| m.research_multiplier).product()
    }

    pub fn war_modifier(&self, traits: &BTreeSet<Trait>) -> f64 {
        self.each(traits).map(|m| m.war_chance).sum()
    }

    pub fn combat_factor(&self, traits: &BTreeSet<Trait>) -> f64 {
        self.each(traits).map(|m| m.combat_factor).product()
    }

    pub fn trade_modifier(&self, traits: &BTreeSet<Trait>) -> f64 {
        self.each(traits).map(|m| m.trade_chance).sum()
    }
}

fn non_negative(value: f64, name: &str) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimError::InvalidConfig(format!(
            "trait {} modifier must be non-negative (got {})",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn set(traits: &[Trait]) -> BTreeSet<Trait> {
        traits.iter().copied().collect()
    }

    #[test]
    fn test_parse_accepts_variants_of_spelling() {
        assert_eq!("tech_savvy".parse::<Trait>().unwrap(), Trait::TechSavvy);
        assert_eq!("Tech-Savvy".parse::<Trait>().unwrap(), Trait::TechSavvy);
        assert_eq!("PEACEFUL".parse::<Trait>().unwrap(), Trait::Peaceful);
        assert!("BRAVE".parse::<Trait>().is_err());
    }

    #[test]
    fn test_parse_traits_rejects_opposites() {
        let names = vec!["AGGRESSIVE".to_string(), "PEACEFUL".to_string()];
        assert!(matches!(parse_traits(&names), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_random_traits_never_opposed() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..200 {
            let traits = random_traits(&mut rng, 3);
            assert_eq!(traits.len(), 3);
            for t in &traits {
                if let Some(o) = t.opposite() {
                    assert!(!traits.contains(&o));
                }
            }
        }
    }

    #[test]
    fn test_expansion_multipliers() {
        let table = TraitTable::default();
        assert_eq!(table.expansion_multiplier(&set(&[Trait::Expansionist])), 0.375);
        assert_eq!(table.expansion_multiplier(&set(&[Trait::Isolationist])), 1.875);
        assert_eq!(table.expansion_multiplier(&set(&[Trait::Weird, Trait::Religious])), 1.0);
    }

    #[test]
    fn test_war_modifier_sums() {
        let table = TraitTable::default();
        let both = set(&[Trait::Aggressive, Trait::Weird]);
        assert!((table.war_modifier(&both) - 0.2).abs() < 1e-12);
        assert!(table.war_modifier(&set(&[Trait::Peaceful])) < 0.0);
    }

    #[test]
    fn test_large_territory_growth() {
        let table = TraitTable::default();
        let t = set(&[Trait::Expansionist]);
        assert_eq!(table.growth_factor(&t, 10), 1.0);
        assert_eq!(table.growth_factor(&t, 51), 1.05);
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = vec![TraitOverride {
            name: "expansionist".into(),
            expansion_multiplier: Some(0.5),
            ..Default::default()
        }];
        let table = TraitTable::with_overrides(&overrides).unwrap();
        assert_eq!(table.modifiers(Trait::Expansionist).expansion_multiplier, 0.5);
        // Other fields untouched
        assert_eq!(table.modifiers(Trait::Expansionist).large_territory_growth_factor, 1.05);
    }

    #[test]
    fn test_trait_compatibility_bounds() {
        let peaceful = set(&[Trait::Peaceful, Trait::Trading]);
        let aggressive = set(&[Trait::Aggressive]);
        assert!(trait_compatibility(&peaceful, &peaceful) > 0.0);
        assert!(trait_compatibility(&peaceful, &aggressive) < 0.0);
    }
}
