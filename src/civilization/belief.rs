//! Belief systems and the compatibility score between them

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Attitude a belief takes toward outsiders
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignStance {
    Open,
    Neutral,
    Hostile,
    Convert,
}

/// Intensity of each value a belief holds, each in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueProfile {
    pub peace: f64,
    pub war: f64,
    pub knowledge: f64,
    pub tradition: f64,
    pub wealth: f64,
    pub spirituality: f64,
}

impl ValueProfile {
    const fn new(peace: f64, war: f64, knowledge: f64, tradition: f64, wealth: f64, spirituality: f64) -> Self {
        Self { peace, war, knowledge, tradition, wealth, spirituality }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Belief {
    EternalLight,
    CosmicBalance,
    DivineWisdom,
    BlessedHarmony,
    SacredKnowledge,
    MightyMountains,
    FlowingWater,
    GoldenSun,
    SilverMoon,
    WhisperedSecrets,
    EndlessCycles,
    UnboundedNature,
}

impl Belief {
    pub const ALL: [Belief; 12] = [
        Belief::EternalLight,
        Belief::CosmicBalance,
        Belief::DivineWisdom,
        Belief::BlessedHarmony,
        Belief::SacredKnowledge,
        Belief::MightyMountains,
        Belief::FlowingWater,
        Belief::GoldenSun,
        Belief::SilverMoon,
        Belief::WhisperedSecrets,
        Belief::EndlessCycles,
        Belief::UnboundedNature,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Belief::EternalLight => "Eternal Light",
            Belief::CosmicBalance => "Cosmic Balance",
            Belief::DivineWisdom => "Divine Wisdom",
            Belief::BlessedHarmony => "Blessed Harmony",
            Belief::SacredKnowledge => "Sacred Knowledge",
            Belief::MightyMountains => "Mighty Mountains",
            Belief::FlowingWater => "Flowing Water",
            Belief::GoldenSun => "Golden Sun",
            Belief::SilverMoon => "Silver Moon",
            Belief::WhisperedSecrets => "Whispered Secrets",
            Belief::EndlessCycles => "Endless Cycles",
            Belief::UnboundedNature => "Unbounded Nature",
        }
    }

    pub fn stance(&self) -> ForeignStance {
        match self {
            Belief::EternalLight | Belief::CosmicBalance | Belief::BlessedHarmony => ForeignStance::Open,
            Belief::MightyMountains | Belief::WhisperedSecrets | Belief::UnboundedNature => {
                ForeignStance::Hostile
            }
            Belief::GoldenSun => ForeignStance::Convert,
            _ => ForeignStance::Neutral,
        }
    }

    pub fn values(&self) -> ValueProfile {
        match self {
            Belief::EternalLight => ValueProfile::new(0.8, 0.1, 0.6, 0.5, 0.3, 0.9),
            Belief::CosmicBalance => ValueProfile::new(0.7, 0.3, 0.7, 0.4, 0.4, 0.7),
            Belief::DivineWisdom => ValueProfile::new(0.5, 0.3, 0.9, 0.6, 0.3, 0.8),
            Belief::BlessedHarmony => ValueProfile::new(0.9, 0.1, 0.5, 0.6, 0.4, 0.7),
            Belief::SacredKnowledge => ValueProfile::new(0.6, 0.2, 1.0, 0.3, 0.5, 0.4),
            Belief::MightyMountains => ValueProfile::new(0.2, 0.8, 0.3, 0.9, 0.5, 0.6),
            Belief::FlowingWater => ValueProfile::new(0.7, 0.2, 0.5, 0.4, 0.6, 0.6),
            Belief::GoldenSun => ValueProfile::new(0.3, 0.7, 0.4, 0.8, 0.7, 0.9),
            Belief::SilverMoon => ValueProfile::new(0.5, 0.4, 0.6, 0.7, 0.3, 0.8),
            Belief::WhisperedSecrets => ValueProfile::new(0.3, 0.6, 0.8, 0.2, 0.6, 0.5),
            Belief::EndlessCycles => ValueProfile::new(0.6, 0.3, 0.5, 0.9, 0.2, 0.7),
            Belief::UnboundedNature => ValueProfile::new(0.4, 0.9, 0.2, 0.5, 0.3, 0.8),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Belief {
        *Belief::ALL.choose(rng).unwrap_or(&Belief::CosmicBalance)
    }

    /// Compatibility with another belief in [-1, 1]. Symmetric, and 1.0 for
    /// the same belief.
    pub fn compatibility(&self, other: &Belief) -> f64 {
        if self == other {
            return 1.0;
        }

        let mut score = 0.0;
        let stances = (self.stance(), other.stance());
        score += match stances {
            (ForeignStance::Hostile, ForeignStance::Hostile) => -0.6,
            (ForeignStance::Hostile, _) | (_, ForeignStance::Hostile) => -0.4,
            (ForeignStance::Open, ForeignStance::Open) => 0.6,
            (ForeignStance::Open, _) | (_, ForeignStance::Open) => 0.3,
            (ForeignStance::Convert, _) | (_, ForeignStance::Convert) => -0.2,
            _ => 0.0,
        };

        let a = self.values();
        let b = other.values();
        let opposed = |x: f64, y: f64| (x > 0.7 && y < 0.3) || (y > 0.7 && x < 0.3);
        if opposed(a.peace, b.peace) || opposed(a.war, b.war) {
            score -= 0.4;
        } else {
            score -= 0.2 * ((a.peace - b.peace).abs() + (a.war - b.war).abs());
        }
        score -= 0.1
            * ((a.knowledge - b.knowledge).abs()
                + (a.tradition - b.tradition).abs()
                + (a.wealth - b.wealth).abs()
                + (a.spirituality - b.spirituality).abs());

        score.clamp(-1.0, 1.0)
    }
}

impl fmt::Display for Belief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Belief {
    type Err = SimError;

    /// Accepts "Golden Sun", "golden_sun" or "GoldenSun"
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Belief::ALL
            .iter()
            .copied()
            .find(|b| b.name().replace(' ', "").to_ascii_lowercase() == key)
            .ok_or_else(|| SimError::InvalidConfig(format!("unknown belief '{}'", s)))
    }
}
