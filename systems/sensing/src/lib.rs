#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reward sensing and score keeping.
//!
//! A [`Sensor`] periodically uncovers the hidden rewards around a position
//! and a [`Scoreboard`] tallies the rewards collected from revealed cells.

use std::{collections::HashSet, time::Duration};

use log::debug;
use serde::Deserialize;
use stealth_maze_core::{CellCoord, Event};
use stealth_maze_world::Grid;

/// Tunables for the reward sensor.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Euclidean radius, in cells, uncovered by each pulse.
    pub radius: f32,
    /// Milliseconds between automatic pulses; zero pulses every tick.
    pub interval_ms: u64,
}

impl SensorConfig {
    /// Time between automatic pulses.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            interval_ms: 500,
        }
    }
}

/// Periodic reward sensor carried by an actor.
#[derive(Debug)]
pub struct Sensor {
    radius: f32,
    interval: Duration,
    accumulator: Duration,
}

impl Sensor {
    /// Creates a sensor from the provided configuration.
    #[must_use]
    pub fn new(config: SensorConfig) -> Self {
        Self {
            radius: config.radius.max(0.0),
            interval: config.interval(),
            accumulator: Duration::ZERO,
        }
    }

    /// Radius uncovered by each pulse.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Advances the pulse timer and reveals the neighborhood once it elapses.
    ///
    /// Returns the cells revealed by this call along with their rewards.
    pub fn tick(
        &mut self,
        dt: Duration,
        grid: &mut Grid,
        center: CellCoord,
        out: &mut Vec<Event>,
    ) -> Vec<(CellCoord, f32)> {
        if !self.interval.is_zero() {
            self.accumulator = self.accumulator.saturating_add(dt);
            if self.accumulator < self.interval {
                return Vec::new();
            }
            while self.accumulator >= self.interval {
                self.accumulator -= self.interval;
            }
        }

        self.sense_now(grid, center, out)
    }

    /// Reveals the neighborhood immediately, independent of the timer.
    pub fn sense_now(
        &self,
        grid: &mut Grid,
        center: CellCoord,
        out: &mut Vec<Event>,
    ) -> Vec<(CellCoord, f32)> {
        let span = i64::from(grid.width().max(grid.height()));
        let reach = i64::from(self.radius.ceil() as u32).min(span);
        let mut revealed = Vec::new();

        for rows in -reach..=reach {
            for columns in -reach..=reach {
                let Some(cell) = center.offset(columns, rows) else {
                    continue;
                };
                if !grid.contains(cell) || cell.euclidean_distance(center) > self.radius {
                    continue;
                }
                if grid.cell(cell).map_or(true, |state| state.revealed()) {
                    continue;
                }
                if let Some(reward) = grid.reveal(cell) {
                    out.push(Event::CellRevealed { cell, reward });
                    revealed.push((cell, reward));
                }
            }
        }

        if !revealed.is_empty() {
            debug!("sensor at {center:?} revealed {} cells", revealed.len());
        }
        revealed
    }
}

/// Running total of collected rewards.
#[derive(Debug, Default)]
pub struct Scoreboard {
    score: f32,
    collected: HashSet<CellCoord>,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the reward of a revealed passage cell.
    ///
    /// Each cell pays out at most once; unrevealed cells, walls and cells
    /// outside the grid yield `None`.
    pub fn collect(&mut self, grid: &Grid, cell: CellCoord, out: &mut Vec<Event>) -> Option<f32> {
        let reward = grid.cell(cell)?.visible_reward()?;
        if !self.collected.insert(cell) {
            return None;
        }

        self.score += reward;
        out.push(Event::RewardCollected {
            cell,
            reward,
            score: self.score,
        });
        Some(reward)
    }

    /// Score accumulated so far.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    /// Reports whether the cell already paid out.
    #[must_use]
    pub fn has_collected(&self, cell: CellCoord) -> bool {
        self.collected.contains(&cell)
    }
}
