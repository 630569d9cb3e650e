//! Narrative fallback and template rendering over a real run

use civ_chronicle::core::config::{EngineConfig, ScenarioConfig};
use civ_chronicle::core::error::{Result, SimError};
use civ_chronicle::engine::SimulationState;
use civ_chronicle::narrative::{Chronicler, NarrativeRequest, NarrativeSource, TemplateNarrator};

struct Unreachable;

impl NarrativeSource for Unreachable {
    async fn generate(&self, _request: &NarrativeRequest) -> Result<String> {
        Err(SimError::Narrative("connection refused".into()))
    }
}

fn simulated() -> SimulationState {
    let mut scenario = ScenarioConfig { random_civilizations: 4, ..ScenarioConfig::default() };
    scenario.world.width = 36;
    scenario.world.height = 24;
    scenario.world.seed = 31;
    let mut state = SimulationState::from_scenario(&scenario, EngineConfig::default()).unwrap();
    state.run(40).unwrap();
    state
}

#[tokio::test]
async fn test_unreachable_service_matches_templates() {
    let state = simulated();
    let chronicler = Chronicler::new(Unreachable);
    let templates = TemplateNarrator::new();

    for id in state.civs.keys() {
        let history = NarrativeRequest::history(&state, *id).unwrap();
        let culture = NarrativeRequest::culture(&state, *id).unwrap();
        assert_eq!(chronicler.narrate(&history).await, templates.render(&history));
        assert_eq!(chronicler.narrate(&culture).await, templates.render(&culture));
    }
    for event in state.history.events.iter().take(20) {
        let request = NarrativeRequest::event(&state, event);
        let text = chronicler.narrate(&request).await;
        assert!(!text.is_empty());
        assert_eq!(text, templates.render(&request));
    }
}

#[tokio::test]
async fn test_templates_only_chronicler() {
    let state = simulated();
    let chronicler = Chronicler::templates_only();
    assert!(!chronicler.has_source());

    let id = *state.civs.keys().next().unwrap();
    let request = NarrativeRequest::history(&state, id).unwrap();
    let text = chronicler.narrate(&request).await;
    assert!(text.contains(&state.civ(id).unwrap().name));
}

#[test]
fn test_unknown_civilization_request_fails() {
    let state = simulated();
    let missing = civ_chronicle::core::types::CivId(999);
    assert!(NarrativeRequest::history(&state, missing).is_err());
    assert!(NarrativeRequest::culture(&state, missing).is_err());
}

#[test]
fn test_templates_are_stable_across_runs() {
    let first = simulated();
    let second = simulated();
    let templates = TemplateNarrator::new();
    for id in first.civs.keys() {
        let a = templates.render(&NarrativeRequest::history(&first, *id).unwrap());
        let b = templates.render(&NarrativeRequest::history(&second, *id).unwrap());
        assert_eq!(a, b);
    }
}
