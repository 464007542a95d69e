use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use stealth_maze_system_agent::AgentConfig;
use stealth_maze_system_sensing::SensorConfig;
use stealth_maze_world::{navigation::PathfinderConfig, MazeConfig};

/// Patrol policy selected for the agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PatrolKind {
    /// Never leave the spawn cell unprompted.
    Idle,
    /// Wander between random passages.
    #[default]
    Wander,
    /// Chase revealed rewards, exploring otherwise.
    Explore,
}

/// Parameters of the scripted run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    /// Upper bound on simulated ticks.
    pub(crate) ticks: u32,
    /// Simulated milliseconds per tick.
    pub(crate) tick_ms: u64,
    /// Number of keys placed on dead ends.
    pub(crate) keys: usize,
    /// Player walking speed in world units per second.
    pub(crate) player_speed: f32,
    /// The player makes a sound every this many cells entered; zero is silent.
    pub(crate) noise_every_cells: u32,
    /// Patrol policy of the agent.
    pub(crate) patrol: PatrolKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 2_000,
            tick_ms: 50,
            keys: 3,
            player_speed: 2.5,
            noise_every_cells: 4,
            patrol: PatrolKind::Wander,
        }
    }
}

/// Every tunable of a simulation run, loaded from TOML.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SimulationConfig {
    pub(crate) maze: MazeConfig,
    pub(crate) agent: AgentConfig,
    pub(crate) sensing: SensorConfig,
    pub(crate) pathfinder: PathfinderConfig,
    pub(crate) run: RunConfig,
}

impl SimulationConfig {
    /// Reads and parses the configuration file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read simulation config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid simulation config at {}", path.display()))
    }

    /// Parses configuration from TOML text; missing fields keep defaults.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse simulation config toml contents")
    }
}
