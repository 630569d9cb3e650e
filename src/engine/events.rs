//! Events and history logging
//!
//! Events are immutable once recorded. Each tick's events are appended to the
//! `HistoryLog` in emission order and handed to the caller in a `TickReport`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::civilization::belief::Belief;
use crate::civilization::traits::Trait;
use crate::core::types::{CellCoord, CivId, Tick, WarId};
use crate::world::cell::ResourceKind;

/// A recorded tick outcome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub tick: Tick,
    pub kind: EventKind,
    pub participants: Vec<CivId>,
    pub location: Option<CellCoord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarEndReason {
    /// A side fell below the minimum viable population
    Exhaustion,
    /// The per-tick peace draw succeeded
    Peace,
    /// The war ran for the maximum duration
    Stalemate,
    /// A side went extinct
    Annihilation,
}

/// What a disaster took from one civilization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisasterLoss {
    pub civ: CivId,
    pub population_lost: u64,
    pub damage_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    // Territory
    TerritoryClaimed { civ: CivId, cell: CellCoord },
    CityFounded { civ: CivId, city: String, cell: CellCoord },
    TerritoryLost { loser: CivId, winner: CivId, cell: CellCoord },
    /// `inhabitants` left the loser; `casualties` of them died in the sack
    CityCaptured {
        from: CivId,
        to: CivId,
        city: String,
        cell: CellCoord,
        inhabitants: u64,
        casualties: u64,
    },

    // Diplomacy
    FirstContact { a: CivId, b: CivId, relation: f64 },
    Trade { a: CivId, b: CivId, a_gave: (ResourceKind, f64), b_gave: (ResourceKind, f64) },

    // Wars
    WarDeclared { war: WarId, aggressor: CivId, defender: CivId },
    Battle {
        war: WarId,
        winner: CivId,
        loser: CivId,
        winner_casualties: u64,
        loser_casualties: u64,
    },
    WarResolved { war: WarId, sides: (CivId, CivId), victor: Option<CivId>, reason: WarEndReason },

    // God Mode
    DisasterApplied { center: CellCoord, radius: i32, magnitude: f64, losses: Vec<DisasterLoss> },
    TechnologyAdjusted { civ: CivId, delta: f64 },
    RelationAdjusted { a: CivId, b: CivId, delta: f64 },
    ResourcesAdjusted { civ: CivId, kind: ResourceKind, delta: f64 },
    IdeologyShifted { civ: CivId, from: Belief, to: Belief, traits: BTreeSet<Trait> },
    WarInfluenced { civ: CivId },

    Extinction { civ: CivId },
}

impl EventKind {
    /// Civilizations the event is about
    pub fn participants(&self) -> Vec<CivId> {
        match self {
            EventKind::TerritoryClaimed { civ, .. }
            | EventKind::CityFounded { civ, .. }
            | EventKind::TechnologyAdjusted { civ, .. }
            | EventKind::ResourcesAdjusted { civ, .. }
            | EventKind::IdeologyShifted { civ, .. }
            | EventKind::WarInfluenced { civ }
            | EventKind::Extinction { civ } => vec![*civ],
            EventKind::TerritoryLost { loser, winner, .. } => vec![*loser, *winner],
            EventKind::CityCaptured { from, to, .. } => vec![*from, *to],
            EventKind::FirstContact { a, b, .. }
            | EventKind::Trade { a, b, .. }
            | EventKind::RelationAdjusted { a, b, .. } => vec![*a, *b],
            EventKind::WarDeclared { aggressor, defender, .. } => vec![*aggressor, *defender],
            EventKind::Battle { winner, loser, .. } => vec![*winner, *loser],
            EventKind::WarResolved { sides, .. } => vec![sides.0, sides.1],
            EventKind::DisasterApplied { losses, .. } => losses.iter().map(|l| l.civ).collect(),
        }
    }

    /// Whether a narrator would find this worth a paragraph
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            EventKind::CityFounded { .. }
                | EventKind::CityCaptured { .. }
                | EventKind::WarDeclared { .. }
                | EventKind::WarResolved { .. }
                | EventKind::DisasterApplied { .. }
                | EventKind::IdeologyShifted { .. }
                | EventKind::WarInfluenced { .. }
                | EventKind::Extinction { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::TerritoryClaimed { .. } => "territory claimed",
            EventKind::CityFounded { .. } => "city founded",
            EventKind::TerritoryLost { .. } => "territory lost",
            EventKind::CityCaptured { .. } => "city captured",
            EventKind::FirstContact { .. } => "first contact",
            EventKind::Trade { .. } => "trade",
            EventKind::WarDeclared { .. } => "war declared",
            EventKind::Battle { .. } => "battle",
            EventKind::WarResolved { .. } => "war resolved",
            EventKind::DisasterApplied { .. } => "disaster",
            EventKind::TechnologyAdjusted { .. } => "technology adjusted",
            EventKind::RelationAdjusted { .. } => "relation adjusted",
            EventKind::ResourcesAdjusted { .. } => "resources adjusted",
            EventKind::IdeologyShifted { .. } => "ideology shifted",
            EventKind::WarInfluenced { .. } => "war influence",
            EventKind::Extinction { .. } => "extinction",
        }
    }
}

/// The complete history log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    pub events: Vec<Event>,
    next_event_id: u64,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: Tick, kind: EventKind, location: Option<CellCoord>) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        let participants = kind.participants();
        self.events.push(Event { id, tick, kind, participants, location });
        id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded at or after position `start`
    pub fn since(&self, start: usize) -> &[Event] {
        self.events.get(start..).unwrap_or(&[])
    }

    pub fn events_for_tick(&self, tick: Tick) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.tick == tick)
    }

    pub fn events_for_civ(&self, civ: CivId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.participants.contains(&civ))
    }

    pub fn count(&self, mut pred: impl FnMut(&EventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_sequential_ids() {
        let mut log = HistoryLog::new();
        let a = log.record(1, EventKind::Extinction { civ: CivId(1) }, None);
        let b = log.record(
            2,
            EventKind::TerritoryClaimed { civ: CivId(2), cell: CellCoord::new(1, 1) },
            Some(CellCoord::new(1, 1)),
        );
        assert_eq!((a, b), (0, 1));
        assert_eq!(log.events_for_tick(2).count(), 1);
        assert_eq!(log.events_for_civ(CivId(1)).count(), 1);
        assert_eq!(log.since(1).len(), 1);
    }

    #[test]
    fn test_participants_of_war_events() {
        let kind = EventKind::WarDeclared { war: WarId(1), aggressor: CivId(3), defender: CivId(4) };
        assert_eq!(kind.participants(), vec![CivId(3), CivId(4)]);
        assert!(kind.is_notable());
        let battle = EventKind::Battle {
            war: WarId(1),
            winner: CivId(3),
            loser: CivId(4),
            winner_casualties: 1,
            loser_casualties: 2,
        };
        assert!(!battle.is_notable());
    }
}
