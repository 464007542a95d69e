use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use glam::Vec3;
use log::{debug, info};
use stealth_maze_core::{CellCoord, Event, Route, SoundEvent};
use stealth_maze_system_agent::{
    Agent, Idle, PatrolStrategy, PlayerPose, RandomWander, RewardSeekingExplore, TickInput,
};
use stealth_maze_system_perception::{cell_center, GridOcclusion};
use stealth_maze_system_sensing::{Scoreboard, Sensor, SensorConfig};
use stealth_maze_world::{
    generate,
    navigation::Pathfinder,
    query::{place_keys, spawn_far_from},
    Grid,
};

use crate::config::{PatrolKind, SimulationConfig};

const ARRIVAL_EPSILON: f32 = 1e-3;

/// Generated maze together with the level setup derived from it.
#[derive(Debug)]
pub(crate) struct Level {
    grid: Grid,
    keys: Vec<CellCoord>,
    spawn: CellCoord,
}

impl Level {
    /// Generates the maze, places keys and picks the agent spawn.
    pub(crate) fn build(config: &SimulationConfig) -> Result<Self> {
        let grid = generate(&config.maze).context("failed to generate maze")?;
        let spawn = spawn_far_from(&grid, grid.start())
            .context("maze start is not a passage cell")?;
        let reserved = [grid.start(), grid.end(), spawn];
        let keys = place_keys(&grid, config.run.keys, &reserved, config.maze.seed);
        info!(
            "level ready: {} keys, agent spawns at {spawn:?}",
            keys.len()
        );
        Ok(Self { grid, keys, spawn })
    }

    /// ASCII rendering with keys drawn as `K` and the agent spawn as `A`.
    pub(crate) fn render(&self) -> String {
        let mut canvas: Vec<Vec<char>> = self
            .grid
            .render_ascii()
            .lines()
            .map(|line| line.chars().collect())
            .collect();
        let marks = self
            .keys
            .iter()
            .map(|cell| (*cell, 'K'))
            .chain(std::iter::once((self.spawn, 'A')));
        for (cell, mark) in marks {
            if let Some(slot) = canvas
                .get_mut(cell.row() as usize)
                .and_then(|row| row.get_mut(cell.column() as usize))
            {
                *slot = mark;
            }
        }
        canvas
            .into_iter()
            .map(String::from_iter)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The player walked all the way to the exit.
    Escaped,
    /// The agent caught the player.
    Caught,
    /// The tick budget ran out first.
    TimedOut,
}

/// Totals reported once a run ends.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) outcome: RunOutcome,
    pub(crate) ticks: u32,
    pub(crate) score: f32,
    pub(crate) agent_score: f32,
    pub(crate) keys_collected: usize,
    pub(crate) keys_total: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            RunOutcome::Escaped => "player escaped",
            RunOutcome::Caught => "player caught",
            RunOutcome::TimedOut => "time ran out",
        };
        write!(
            f,
            "{outcome} after {} ticks: score {:.1}, agent score {:.1}, keys {}/{}",
            self.ticks, self.score, self.agent_score, self.keys_collected, self.keys_total
        )
    }
}

/// Reward sensor and scoreboard carried by one actor.
#[derive(Debug)]
struct Senses {
    sensor: Sensor,
    scoreboard: Scoreboard,
}

impl Senses {
    fn new(config: SensorConfig) -> Self {
        Self {
            sensor: Sensor::new(config),
            scoreboard: Scoreboard::new(),
        }
    }

    /// Pulses the sensor around `cell` and collects the reward standing there.
    fn update(&mut self, dt: Duration, grid: &mut Grid, cell: CellCoord, out: &mut Vec<Event>) {
        let _ = self.sensor.tick(dt, grid, cell, out);
        let _ = self.scoreboard.collect(grid, cell, out);
    }

    fn score(&self) -> f32 {
        self.scoreboard.score()
    }
}

/// Player walking a precomputed route at constant speed.
#[derive(Debug)]
struct ScriptedPlayer {
    route: Route,
    index: usize,
    cell: CellCoord,
    position: Vec3,
    forward: Vec3,
    cells_entered: u32,
}

impl ScriptedPlayer {
    fn new(route: Route, cell_size: f32) -> Option<Self> {
        let start = route.start()?;
        Some(Self {
            route,
            index: 0,
            cell: start,
            position: cell_center(start, cell_size, 0.0),
            forward: Vec3::X,
            cells_entered: 0,
        })
    }

    fn pose(&self) -> PlayerPose {
        PlayerPose::new(self.position, self.forward)
    }

    fn finished(&self) -> bool {
        self.index >= self.route.len()
    }

    /// Walks `distance` world units and reports the last cell entered.
    fn advance(&mut self, distance: f32, cell_size: f32) -> Option<CellCoord> {
        let mut budget = distance;
        let mut entered = None;
        while let Some(next) = self.route.get(self.index) {
            let target = cell_center(next, cell_size, 0.0);
            let offset = target - self.position;
            let remaining = offset.length();
            if remaining <= ARRIVAL_EPSILON {
                self.position = target;
                if next != self.cell {
                    self.cell = next;
                    self.cells_entered += 1;
                    entered = Some(next);
                }
                self.index += 1;
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            let direction = offset / remaining;
            let travel = budget.min(remaining);
            self.forward = direction;
            self.position += direction * travel;
            budget -= travel;
        }
        entered
    }
}

/// Runs the agent against a player walking from the maze start to its end.
pub(crate) fn run(level: Level, config: &SimulationConfig) -> Result<Summary> {
    let Level {
        mut grid,
        mut keys,
        spawn,
    } = level;
    let keys_total = keys.len();
    let script = &config.run;
    let cell_size = config.agent.cell_size;
    let dt = Duration::from_millis(script.tick_ms);

    let route = Pathfinder::new(config.pathfinder)
        .try_find_route(&grid, grid.start(), grid.end())
        .context("player has no route from start to end")?;
    let mut player =
        ScriptedPlayer::new(route, cell_size).context("player route has no cells")?;

    let strategy: Box<dyn PatrolStrategy> = match script.patrol {
        PatrolKind::Idle => Box::new(Idle),
        PatrolKind::Wander => Box::new(RandomWander::new(config.agent.seed)),
        PatrolKind::Explore => Box::new(RewardSeekingExplore),
    };
    let mut agent = Agent::new(config.agent, spawn, strategy, config.pathfinder);
    let mut player_senses = Senses::new(config.sensing);
    let mut agent_senses = Senses::new(config.sensing);
    let mut events = Vec::new();
    let mut keys_collected = 0;

    let mut outcome = RunOutcome::TimedOut;
    let mut ticks = 0;
    while ticks < script.ticks {
        ticks += 1;

        let entered = player.advance(script.player_speed * dt.as_secs_f32(), cell_size);
        let sound = entered
            .filter(|_| script.noise_every_cells > 0)
            .filter(|_| player.cells_entered % script.noise_every_cells.max(1) == 0)
            .map(SoundEvent::at);

        player_senses.update(dt, &mut grid, player.cell, &mut events);
        agent_senses.update(dt, &mut grid, agent.cell(), &mut events);
        if let Some(found) = keys.iter().position(|key| *key == player.cell) {
            let key = keys.swap_remove(found);
            keys_collected += 1;
            info!("player picked up the key at {key:?}");
        }

        let occlusion = GridOcclusion::new(&grid, cell_size);
        let mut input = TickInput::new(dt, &grid).with_player(player.pose(), &occlusion);
        input.sound = sound;
        let tick = agent.tick(input, &mut events);

        for event in events.drain(..) {
            debug!("tick {ticks}: {event:?}");
        }

        if tick.captured {
            outcome = RunOutcome::Caught;
            break;
        }
        if player.finished() {
            outcome = RunOutcome::Escaped;
            break;
        }
    }

    Ok(Summary {
        outcome,
        ticks,
        score: player_senses.score(),
        agent_score: agent_senses.score(),
        keys_collected,
        keys_total,
    })
}
