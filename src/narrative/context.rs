//! Narrative requests and the plain-text context built from them
//!
//! Both the LLM prompt and the template fallback read from these, so the two
//! paths describe the same facts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::CivId;
use crate::engine::events::{Event, EventKind, WarEndReason};
use crate::engine::output::CivSnapshot;
use crate::engine::state::SimulationState;

/// Most recent events included in a history request
pub const HISTORY_EVENT_LIMIT: usize = 12;

pub const SYSTEM_PROMPT: &str = "You are the chronicler of a simulated world. \
Write short, vivid prose in the voice of a historian. Use only the facts given. \
Reply with plain text, no headings or lists.";

/// Civilization names, so events can be told without the whole state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NameBook(BTreeMap<CivId, String>);

impl NameBook {
    pub fn from_state(state: &SimulationState) -> Self {
        Self(state.civs.values().map(|c| (c.id, c.name.clone())).collect())
    }

    pub fn insert(&mut self, id: CivId, name: impl Into<String>) {
        self.0.insert(id, name.into());
    }

    pub fn name(&self, id: CivId) -> String {
        self.0.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NarrativeRequest {
    CivilizationHistory { civ: CivSnapshot, events: Vec<Event>, names: NameBook },
    EventNarrative { event: Event, names: NameBook },
    CulturalDescription { civ: CivSnapshot },
}

impl NarrativeRequest {
    pub fn history(state: &SimulationState, id: CivId) -> Result<Self> {
        let civ = state.civ(id).ok_or(SimError::UnknownCivilization(id))?;
        let mut events: Vec<Event> = state
            .history
            .events_for_civ(id)
            .filter(|e| e.kind.is_notable())
            .cloned()
            .collect();
        let excess = events.len().saturating_sub(HISTORY_EVENT_LIMIT);
        events.drain(..excess);
        Ok(Self::CivilizationHistory { civ: civ.into(), events, names: NameBook::from_state(state) })
    }

    pub fn event(state: &SimulationState, event: &Event) -> Self {
        Self::EventNarrative { event: event.clone(), names: NameBook::from_state(state) }
    }

    pub fn culture(state: &SimulationState, id: CivId) -> Result<Self> {
        let civ = state.civ(id).ok_or(SimError::UnknownCivilization(id))?;
        Ok(Self::CulturalDescription { civ: civ.into() })
    }

    /// Text that identifies the request's subject, used to pick templates
    pub fn subject_key(&self) -> String {
        match self {
            Self::CivilizationHistory { civ, .. } => format!("history:{}:{}", civ.id, civ.name),
            Self::EventNarrative { event, .. } => format!("event:{}:{}", event.id, event.tick),
            Self::CulturalDescription { civ } => format!("culture:{}:{}", civ.id, civ.name),
        }
    }
}

/// One-line factual description of an event
pub fn describe_event(kind: &EventKind, names: &NameBook) -> String {
    match kind {
        EventKind::TerritoryClaimed { civ, cell } => format!("{} claimed the land at {}", names.name(*civ), cell),
        EventKind::CityFounded { civ, city, cell } => {
            format!("{} founded the city of {} at {}", names.name(*civ), city, cell)
        }
        EventKind::TerritoryLost { loser, winner, cell } => {
            format!("{} lost the land at {} to {}", names.name(*loser), cell, names.name(*winner))
        }
        EventKind::CityCaptured { from, to, city, casualties, .. } => format!(
            "{} captured {} from {}, and {} died in the fall",
            names.name(*to),
            city,
            names.name(*from),
            casualties
        ),
        EventKind::FirstContact { a, b, .. } => {
            format!("{} and {} met for the first time", names.name(*a), names.name(*b))
        }
        EventKind::Trade { a, b, .. } => format!("{} and {} traded goods", names.name(*a), names.name(*b)),
        EventKind::WarDeclared { aggressor, defender, .. } => {
            format!("{} declared war on {}", names.name(*aggressor), names.name(*defender))
        }
        EventKind::Battle { winner, loser, winner_casualties, loser_casualties, .. } => format!(
            "{} defeated {} in battle ({} and {} fallen)",
            names.name(*winner),
            names.name(*loser),
            winner_casualties,
            loser_casualties
        ),
        EventKind::WarResolved { sides, victor, reason, .. } => {
            let how = match reason {
                WarEndReason::Exhaustion => "exhaustion",
                WarEndReason::Peace => "a negotiated peace",
                WarEndReason::Stalemate => "long stalemate",
                WarEndReason::Annihilation => "annihilation",
            };
            match victor {
                Some(v) => format!(
                    "the war between {} and {} ended in {}, with {} victorious",
                    names.name(sides.0),
                    names.name(sides.1),
                    how,
                    names.name(*v)
                ),
                None => format!(
                    "the war between {} and {} ended in {}",
                    names.name(sides.0),
                    names.name(sides.1),
                    how
                ),
            }
        }
        EventKind::DisasterApplied { center, magnitude, losses, .. } => {
            let dead: u64 = losses.iter().map(|l| l.population_lost).sum();
            format!("a disaster of magnitude {:.1} struck near {}, killing {}", magnitude, center, dead)
        }
        EventKind::TechnologyAdjusted { civ, .. } => format!("the gods touched the minds of {}", names.name(*civ)),
        EventKind::RelationAdjusted { a, b, .. } => {
            format!("the gods stirred the hearts of {} and {}", names.name(*a), names.name(*b))
        }
        EventKind::ResourcesAdjusted { civ, kind, .. } => {
            let kind = format!("{:?}", kind).to_lowercase();
            format!("the gods changed the {} stores of {}", kind, names.name(*civ))
        }
        EventKind::IdeologyShifted { civ, to, .. } => {
            format!("{} abandoned its old ways and embraced {}", names.name(*civ), to.name())
        }
        EventKind::WarInfluenced { civ } => format!("the gods filled {} with a thirst for war", names.name(*civ)),
        EventKind::Extinction { civ } => format!("{} vanished from the world", names.name(*civ)),
    }
}

/// Factual summary of a civilization for prompts
pub fn civilization_summary(civ: &CivSnapshot) -> String {
    let mut s = String::new();
    s.push_str(&format!("Name: {}\n", civ.name));
    s.push_str(&format!("Status: {}\n", if civ.alive { "thriving" } else { "extinct" }));
    s.push_str(&format!("Population: {}\n", civ.population));
    s.push_str(&format!("Technology: {:.1}\n", civ.technology));
    s.push_str(&format!("Territory: {} cells\n", civ.territory_size));
    s.push_str(&format!("Belief: {}\n", civ.belief));
    if !civ.traits.is_empty() {
        let traits: Vec<String> = civ.traits.iter().map(|t| t.to_string()).collect();
        s.push_str(&format!("Traits: {}\n", traits.join(", ")));
    }
    if !civ.cities.is_empty() {
        let cities: Vec<&str> = civ.cities.iter().map(|c| c.name.as_str()).collect();
        s.push_str(&format!("Cities: {}\n", cities.join(", ")));
    }
    if !civ.at_war_with.is_empty() {
        s.push_str(&format!("At war with {} rivals\n", civ.at_war_with.len()));
    }
    s
}

/// User prompt for the LLM
pub fn prompt(request: &NarrativeRequest) -> String {
    match request {
        NarrativeRequest::CivilizationHistory { civ, events, names } => {
            let mut s = format!("Write a short history of this civilization.\n\n{}", civilization_summary(civ));
            if !events.is_empty() {
                s.push_str("\nNotable events:\n");
                for e in events {
                    s.push_str(&format!("- Tick {}: {}\n", e.tick, describe_event(&e.kind, names)));
                }
            }
            s
        }
        NarrativeRequest::EventNarrative { event, names } => format!(
            "Narrate this event in two or three sentences.\n\nTick {}: {}\n",
            event.tick,
            describe_event(&event.kind, names)
        ),
        NarrativeRequest::CulturalDescription { civ } => format!(
            "Describe the culture, customs and faith of this civilization.\n\n{}",
            civilization_summary(civ)
        ),
    }
}
