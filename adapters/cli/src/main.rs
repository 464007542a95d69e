#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless stealth-maze simulation.

mod config;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use stealth_maze_core::WELCOME_BANNER;

use crate::{config::SimulationConfig, simulation::Level};

#[derive(Parser, Debug)]
#[command(
    name = "stealth-maze",
    version,
    about = "Generate a maze and run the agent against a scripted player"
)]
struct Cli {
    /// TOML file with `maze`, `agent`, `sensing`, `pathfinder` and `run` sections.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed overriding both the maze and the agent seeds.
    #[arg(long)]
    seed: Option<u64>,
    /// Upper bound on simulated ticks.
    #[arg(long)]
    ticks: Option<u32>,
    /// Print the generated maze before running.
    #[arg(long)]
    print_maze: bool,
}

impl Cli {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.maze.seed = seed;
            config.agent.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            config.run.ticks = ticks;
        }
    }
}

/// Entry point for the stealth-maze command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    cli.apply(&mut config);

    println!("{WELCOME_BANNER}");
    let level = Level::build(&config)?;
    if cli.print_maze {
        println!("{}", level.render());
    }

    let summary = simulation::run(level, &config)?;
    println!("{summary}");
    Ok(())
}
