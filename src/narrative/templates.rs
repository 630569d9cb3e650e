//! Deterministic local narrator
//!
//! The same request always renders the same text. The template variant is
//! picked by an FNV-1a hash of the request's subject, which is stable across
//! runs and platforms.

use crate::core::error::Result;
use crate::engine::output::CivSnapshot;
use crate::narrative::context::{describe_event, NarrativeRequest};
use crate::narrative::NarrativeSource;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub fn stable_hash(text: &str) -> u64 {
    text.bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(FNV_PRIME))
}

fn pick<'a>(options: &[&'a str], key: &str) -> &'a str {
    options[(stable_hash(key) % options.len() as u64) as usize]
}

const HISTORY_OPENINGS: [&str; 3] = [
    "The chronicles of {name} begin in tick {founded}, when a small people settled the land.",
    "Of all the peoples of the world, {name} have a tale worth telling. It starts in tick {founded}.",
    "In tick {founded} the first fires of {name} were lit.",
];

const HISTORY_CLOSINGS_ALIVE: [&str; 3] = [
    "Today {population} souls hold {territory} lands under their banner.",
    "They endure, {population} strong across {territory} lands.",
    "Their story is not yet finished: {population} people, {territory} lands, and ambitions still.",
];

const HISTORY_CLOSINGS_EXTINCT: [&str; 2] = [
    "Nothing of them remains but this account.",
    "Their lands have passed to others and their name to legend.",
];

const EVENT_FRAMES: [&str; 3] = [
    "In tick {tick}, {what}.",
    "The record of tick {tick} tells that {what}.",
    "It was in tick {tick} that {what}.",
];

const CULTURE_FRAMES: [&str; 3] = [
    "The people of {name} follow the {belief}. {traits}",
    "Faith in the {belief} shapes every custom of {name}. {traits}",
    "Among {name}, the {belief} is honoured above all. {traits}",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, request: &NarrativeRequest) -> String {
        let key = request.subject_key();
        match request {
            NarrativeRequest::CivilizationHistory { civ, events, names } => {
                let mut text = fill(pick(&HISTORY_OPENINGS, &key), civ);
                for event in events {
                    text.push(' ');
                    text.push_str(&sentence(&format!(
                        "In tick {}, {}",
                        event.tick,
                        describe_event(&event.kind, names)
                    )));
                }
                text.push(' ');
                let closing = if civ.alive {
                    pick(&HISTORY_CLOSINGS_ALIVE, &key)
                } else {
                    pick(&HISTORY_CLOSINGS_EXTINCT, &key)
                };
                text.push_str(&fill(closing, civ));
                text
            }
            NarrativeRequest::EventNarrative { event, names } => sentence(
                &pick(&EVENT_FRAMES, &key)
                    .replace("{tick}", &event.tick.to_string())
                    .replace("{what}", &describe_event(&event.kind, names)),
            ),
            NarrativeRequest::CulturalDescription { civ } => {
                fill(pick(&CULTURE_FRAMES, &key), civ).trim_end().to_string()
            }
        }
    }
}

impl NarrativeSource for TemplateNarrator {
    async fn generate(&self, request: &NarrativeRequest) -> Result<String> {
        Ok(self.render(request))
    }
}

fn fill(template: &str, civ: &CivSnapshot) -> String {
    template
        .replace("{name}", &civ.name)
        .replace("{founded}", &civ.founded.to_string())
        .replace("{population}", &civ.population.to_string())
        .replace("{territory}", &civ.territory_size.to_string())
        .replace("{belief}", &civ.belief.to_string())
        .replace("{traits}", &trait_sentence(civ))
}

fn trait_sentence(civ: &CivSnapshot) -> String {
    if civ.traits.is_empty() {
        return String::new();
    }
    let names: Vec<String> = civ.traits.iter().map(|t| t.to_string().to_lowercase()).collect();
    format!("Others know them as {}.", names.join(" and "))
}

/// Capitalize the first letter and end with a full stop
fn sentence(text: &str) -> String {
    let mut chars = text.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}
