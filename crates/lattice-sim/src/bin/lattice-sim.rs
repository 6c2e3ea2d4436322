//! Lattice Network Simulator
//!
//! Run a seeded simulation and print the final state as JSON.
//!
//! Usage: `lattice-sim [steps] [seed] [preset | config.json]`
//!
//! Presets are `default`, `small` and `stress`.

use std::env;

use lattice_sim::{Simulation, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lattice_sim=info,lattice_net=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args
    let args: Vec<String> = env::args().collect();

    let mut config = match args.get(3) {
        Some(name) => match SimulationConfig::preset(name) {
            Some(preset) => preset,
            None => serde_json::from_str(&std::fs::read_to_string(name)?)?,
        },
        None => SimulationConfig::default(),
    };
    if let Some(steps) = args.get(1).and_then(|s| s.parse().ok()) {
        config = config.with_steps(steps);
    }
    if let Some(seed) = args.get(2).and_then(|s| s.parse().ok()) {
        config = config.with_seed(seed);
    }

    tracing::info!(seed = config.seed, steps = config.steps, "starting simulation");

    let mut sim = Simulation::new(config)?;
    sim.run()?;

    println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    Ok(())
}
