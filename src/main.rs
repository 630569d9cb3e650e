//! Civ Chronicle - command line runner
//!
//! Builds a world from a scenario (or from flags), runs the requested number
//! of ticks, prints a summary and optionally writes the full output as JSON
//! and narrates the notable events.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use civ_chronicle::core::config::{EngineConfig, ScenarioConfig};
use civ_chronicle::core::error::Result;
use civ_chronicle::engine::{SimulationOutput, SimulationState};
use civ_chronicle::narrative::{Chronicler, LlmClient, NarrativeRequest};

#[derive(Parser, Debug)]
#[command(name = "civ-chronicle")]
#[command(about = "Run a civilization simulation and chronicle its history")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Random seed (overrides the scenario's world seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Randomly founded civilizations (overrides the scenario)
    #[arg(long)]
    civs: Option<u32>,

    /// World width in cells
    #[arg(long)]
    width: Option<u32>,

    /// World height in cells
    #[arg(long)]
    height: Option<u32>,

    /// Engine tuning file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario file (TOML)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write the final snapshot, history and statistics here as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    /// Narrate notable events and surviving civilizations
    #[arg(long)]
    narrate: bool,

    /// Maximum number of events to narrate
    #[arg(long, default_value_t = 10)]
    narrate_limit: usize,
}

const DEFAULT_CIVS: u32 = 6;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civ_chronicle=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let mut scenario = match &args.scenario {
        Some(path) => ScenarioConfig::from_path(path)?,
        None => ScenarioConfig { random_civilizations: DEFAULT_CIVS, ..ScenarioConfig::default() },
    };
    if let Some(seed) = args.seed {
        scenario.world.seed = seed;
    }
    if let Some(civs) = args.civs {
        scenario.random_civilizations = civs;
    }
    if let Some(width) = args.width {
        scenario.world.width = width;
    }
    if let Some(height) = args.height {
        scenario.world.height = height;
    }

    tracing::info!(
        seed = scenario.world.seed,
        width = scenario.world.width,
        height = scenario.world.height,
        ticks = args.ticks,
        "Civ Chronicle starting..."
    );

    let mut state = SimulationState::from_scenario(&scenario, config)?;
    let start = Instant::now();
    let reports = state.run(args.ticks)?;
    let output = SimulationOutput::new(&state, start.elapsed());

    let rejected: usize = reports.iter().map(|r| r.rejected.len()).sum();
    if rejected > 0 {
        tracing::warn!(rejected, "some scripted interventions were rejected");
    }

    println!("\n=== CIV CHRONICLE ===");
    println!("{}", output.summary());

    if let Some(path) = &args.output {
        std::fs::write(path, output.to_json())?;
        tracing::info!(path = %path.display(), "output written");
    }

    if args.narrate {
        let rt = Runtime::new()?;
        let client = LlmClient::from_env().ok();
        if client.is_none() {
            tracing::warn!("LLM_API_KEY not set - narrating from templates");
        }
        let chronicler = Chronicler::with_optional(client);

        rt.block_on(async {
            println!("\n=== CHRONICLE ===");
            for event in state.history.events.iter().filter(|e| e.kind.is_notable()).take(args.narrate_limit) {
                let request = NarrativeRequest::event(&state, event);
                println!("{}", chronicler.narrate(&request).await);
            }
            for id in state.alive_ids() {
                if let Ok(request) = NarrativeRequest::history(&state, id) {
                    println!("\n{}", chronicler.narrate(&request).await);
                }
            }
        });
    }

    Ok(())
}
