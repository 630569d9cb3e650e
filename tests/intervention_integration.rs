//! God-Mode interventions through the public API

use std::collections::BTreeSet;

use civ_chronicle::civilization::{Belief, Civilization};
use civ_chronicle::core::config::{EngineConfig, ScenarioConfig};
use civ_chronicle::core::error::SimError;
use civ_chronicle::core::types::{CellCoord, CivId};
use civ_chronicle::engine::{EventKind, Intervention, SimulationState};
use civ_chronicle::world::{ResourceAmounts, ResourceKind, Terrain, WorldGrid};

fn two_neighbours() -> SimulationState {
    let grid = WorldGrid::filled(16, 8, Terrain::Land, ResourceAmounts::new(0.7, 0.3, 0.2, 0.2));
    let mut west = Civilization::new(CivId(1), "Westmark", 200, Belief::DivineWisdom, BTreeSet::new(), 0);
    let mut east = Civilization::new(CivId(2), "Eastreach", 200, Belief::DivineWisdom, BTreeSet::new(), 0);
    for y in 2..5 {
        for x in 1..4 {
            west.territory.insert(CellCoord::new(x, y));
        }
        for x in 11..14 {
            east.territory.insert(CellCoord::new(x, y));
        }
    }
    west.stockpile = ResourceAmounts::new(400.0, 20.0, 10.0, 10.0);
    east.stockpile = ResourceAmounts::new(400.0, 20.0, 10.0, 10.0);
    SimulationState::new(grid, vec![west, east], EngineConfig::default(), 5).unwrap()
}

#[test]
fn test_invalid_requests_are_rejected_without_change() {
    let mut state = two_neighbours();

    let out_of_bounds = Intervention::Disaster { center: CellCoord::new(40, 40), radius: 2, magnitude: 1.0 };
    assert!(matches!(state.submit(out_of_bounds), Err(SimError::OutOfBounds(_))));

    let unknown = Intervention::AdjustTechnology { civ: CivId(9), delta: 3.0 };
    assert!(matches!(state.submit(unknown), Err(SimError::UnknownCivilization(CivId(9)))));

    let self_relation = Intervention::AdjustRelation { a: CivId(1), b: CivId(1), delta: 0.5 };
    assert!(matches!(state.submit(self_relation), Err(SimError::InvalidIntervention(_))));

    let too_strong = Intervention::Disaster { center: CellCoord::new(2, 3), radius: 1, magnitude: 1000.0 };
    assert!(state.submit(too_strong).is_err());

    assert_eq!(state.pending_interventions(), 0);
    assert_eq!(state.tick, 0);
    assert!(state.history.is_empty());
}

#[test]
fn test_disaster_only_hits_civilizations_in_range() {
    let mut state = two_neighbours();
    state
        .submit(Intervention::Disaster { center: CellCoord::new(2, 3), radius: 2, magnitude: 3.0 })
        .unwrap();
    assert_eq!(state.pending_interventions(), 1);

    let report = state.advance().unwrap();
    assert_eq!(state.pending_interventions(), 0);

    let losses = report
        .events
        .iter()
        .find_map(|e| match &e.kind {
            EventKind::DisasterApplied { losses, .. } => Some(losses.clone()),
            _ => None,
        })
        .expect("disaster event");
    assert_eq!(losses.len(), 1);
    assert_eq!(losses[0].civ, CivId(1));
    assert!(losses[0].population_lost > 0);
    assert!(losses[0].damage_rate > 0.0 && losses[0].damage_rate <= state.config.disaster.damage_cap);

    // the disaster is the first thing that happens in the tick
    assert!(matches!(report.events[0].kind, EventKind::DisasterApplied { .. }));
}

#[test]
fn test_technology_and_resource_adjustments() {
    let mut state = two_neighbours();
    let before = state.civ(CivId(2)).unwrap().technology;

    state.submit(Intervention::AdjustTechnology { civ: CivId(2), delta: 5.0 }).unwrap();
    state
        .submit(Intervention::AdjustResources { civ: CivId(1), kind: ResourceKind::Metal, delta: 100.0 })
        .unwrap();
    let report = state.advance().unwrap();

    assert!(state.civ(CivId(2)).unwrap().technology >= before + 5.0);
    assert!(state.civ(CivId(1)).unwrap().stockpile.metal > 100.0);
    assert!(report
        .events
        .iter()
        .any(|e| e.kind == EventKind::TechnologyAdjusted { civ: CivId(2), delta: 5.0 }));
    assert!(report.events.iter().any(|e| matches!(
        e.kind,
        EventKind::ResourcesAdjusted { civ: CivId(1), kind: ResourceKind::Metal, .. }
    )));
}

#[test]
fn test_relation_adjustment_stays_clamped() {
    let mut state = two_neighbours();
    state.submit(Intervention::AdjustRelation { a: CivId(1), b: CivId(2), delta: 5.0 }).unwrap();
    state.advance().unwrap();

    let west = state.civ(CivId(1)).unwrap().relation(CivId(2));
    let east = state.civ(CivId(2)).unwrap().relation(CivId(1));
    assert_eq!(west, east);
    assert!(west <= 1.0);
    assert!(west > 0.5);
}

#[test]
fn test_scripted_interventions_run_on_their_tick() {
    let toml = r#"
        random_civilizations = 2

        [world]
        width = 30
        height = 20
        seed = 4

        [[interventions]]
        tick = 3
        kind = "adjust_technology"
        civ = 1
        delta = 2.5

        [[interventions]]
        tick = 2
        kind = "adjust_technology"
        civ = 42
        delta = 1.0
    "#;
    let scenario = ScenarioConfig::from_toml_str(toml).unwrap();
    let mut state = SimulationState::from_scenario(&scenario, EngineConfig::default()).unwrap();

    let reports = state.run(4).unwrap();

    // an unknown civilization is reported, not fatal
    assert!(reports[0].rejected.is_empty());
    assert_eq!(reports[1].rejected.len(), 1);
    assert!(reports[2].rejected.is_empty());
    assert!(reports[2]
        .events
        .iter()
        .any(|e| e.kind == EventKind::TechnologyAdjusted { civ: CivId(1), delta: 2.5 }));
    assert!(!reports[0].events.iter().any(|e| matches!(e.kind, EventKind::TechnologyAdjusted { .. })));
}

#[test]
fn test_scripted_resource_grant_parses() {
    let toml = r#"
        random_civilizations = 1

        [world]
        width = 20
        height = 16
        seed = 9

        [[interventions]]
        tick = 1
        kind = "adjust_resources"
        civ = 1
        resource = "Stone"
        delta = 40.0
    "#;
    let scenario = ScenarioConfig::from_toml_str(toml).unwrap();
    assert_eq!(
        scenario.interventions[0].intervention,
        Intervention::AdjustResources { civ: CivId(1), kind: ResourceKind::Stone, delta: 40.0 }
    );

    let mut state = SimulationState::from_scenario(&scenario, EngineConfig::default()).unwrap();
    let report = state.advance().unwrap();
    assert!(report.rejected.is_empty());
    assert!(state.civ(CivId(1)).unwrap().stockpile.stone >= 40.0);
}

#[test]
fn test_natural_disasters_strike_on_their_interval() {
    let mut config = EngineConfig::default();
    config.disaster.natural_interval = 2;
    config.disaster.natural_chance = 1.0;
    let grid = WorldGrid::filled(16, 8, Terrain::Land, ResourceAmounts::new(0.7, 0.3, 0.2, 0.2));
    let mut civ = Civilization::new(CivId(1), "Lonely", 400, Belief::SilverMoon, BTreeSet::new(), 0);
    civ.territory.insert(CellCoord::new(8, 4));
    civ.stockpile = ResourceAmounts::new(400.0, 20.0, 10.0, 10.0);
    let mut state = SimulationState::new(grid, vec![civ], config, 13).unwrap();

    let reports = state.run(6).unwrap();
    for report in &reports {
        let disasters = report.events.iter().filter(|e| matches!(e.kind, EventKind::DisasterApplied { .. })).count();
        let expected = if report.tick % 2 == 0 { 1 } else { 0 };
        assert_eq!(disasters, expected, "tick {}", report.tick);
    }
}

#[test]
fn test_scripted_war_influence_sours_relations() {
    let toml = r#"
        [[interventions]]
        tick = 1
        kind = "war_influence"
        civ = 1
    "#;
    let scenario = ScenarioConfig::from_toml_str(toml).unwrap();
    let mut state = two_neighbours();
    for scripted in scenario.interventions {
        state.submit(scripted.intervention).unwrap();
    }
    state.set_relation(CivId(1), CivId(2), 0.8);

    let report = state.advance().unwrap();
    assert!(report.events.iter().any(|e| e.kind == EventKind::WarInfluenced { civ: CivId(1) }));
    assert!(state.civ(CivId(1)).unwrap().belligerent);
    assert!(state.civ(CivId(1)).unwrap().relation(CivId(2)) <= -0.9);
}

#[test]
fn test_shift_ideology_through_the_clock() {
    let mut state = two_neighbours();
    let before = state.civ(CivId(2)).unwrap().belief;
    state.submit(Intervention::ShiftIdeology { civ: CivId(2) }).unwrap();
    let report = state.advance().unwrap();

    let shifted = report
        .events
        .iter()
        .find_map(|e| match &e.kind {
            EventKind::IdeologyShifted { civ, from, to, .. } => Some((*civ, *from, *to)),
            _ => None,
        })
        .expect("ideology event");
    assert_eq!(shifted, (CivId(2), before, state.civ(CivId(2)).unwrap().belief));
    assert_ne!(shifted.1, shifted.2);
}
