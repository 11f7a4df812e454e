//! Headless Strata runner
//!
//! Loads a world (TOML or the built-in demo), runs the controller for a
//! number of ticks and prints a summary.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use strata::controller::{NullEntityEngine, SimulationController, SimulationOutput};
use strata::core::{EngineConfig, Result};
use strata::core::types::TierId;
use strata::simulation::EventCatalogue;
use strata::tier::definition::{demo_world, WorldDefinition};
use strata::tier::TierArena;

/// Headless Strata runner - statistical hierarchy simulation
#[derive(Parser, Debug)]
#[command(name = "strata-sim")]
#[command(about = "Run the hierarchical abstraction engine without a front end")]
struct Args {
    /// World definition (TOML); the demo world is used when absent
    #[arg(long)]
    world: Option<PathBuf>,

    /// Engine configuration (TOML); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event catalogue override (TOML)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Controller ticks to run
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Tier ids handed to the stand-in entity engine before the run
    #[arg(long = "zoom")]
    zoom: Vec<u32>,

    /// Write the full output as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the tier hierarchy after the run
    #[arg(long)]
    tree: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strata=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(|| rand::random());

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let arena = match &args.world {
        Some(path) => TierArena::from_definition(&WorldDefinition::load(path)?, &config.stability)?,
        None => demo_world(&config.stability)?,
    };
    tracing::info!(tiers = arena.len(), seed, ticks = args.ticks, "starting run");

    let mut controller = SimulationController::new(arena, config, Box::new(NullEntityEngine::new()), seed)?;
    if let Some(path) = &args.events {
        let catalogue = EventCatalogue::from_toml_str(&std::fs::read_to_string(path)?)?;
        controller = controller.with_event_catalogue(catalogue)?;
    }
    for id in &args.zoom {
        if let Err(e) = controller.zoom_in(TierId(*id)) {
            eprintln!("Zoom-in of tier {} failed: {}", id, e);
        }
    }

    let start = Instant::now();
    let reports = controller.run(args.ticks);
    let output = SimulationOutput::new(&controller, &reports, start.elapsed())?;

    println!("{}", output.summary());

    if args.tree {
        println!("\n--- Hierarchy ---");
        for (depth, id) in controller.hierarchy() {
            if let Some(tier) = controller.get_tier_by_id(id) {
                println!(
                    "{}{} [{} {:?}] pop {:.0} stability {:.1} tech {}",
                    "  ".repeat(depth),
                    tier.name,
                    tier.rank.name(),
                    tier.mode(),
                    controller.arena().total_population(id),
                    tier.stability.overall(),
                    tier.tech.level,
                );
            }
        }
    }

    if let Some(path) = &args.output {
        std::fs::write(path, output.to_json()?)?;
        println!("\nFull output written to {}", path.display());
    }
    Ok(())
}
