#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative maze state for the stealth maze simulation.
//!
//! The [`Grid`] is produced once per level by [`generate`] and is treated as
//! read-only afterwards, with the single exception of the `revealed` flag
//! that the sensing system flips through [`Grid::reveal`]. Route planning
//! lives in [`navigation`], level-setup helpers in [`query`].

use serde::{Deserialize, Serialize};
use stealth_maze_core::CellCoord;
use thiserror::Error;

mod generation;
pub mod navigation;
pub mod query;

pub use generation::generate;

/// Smallest permitted maze edge length.
pub const MIN_DIMENSION: u32 = 3;

/// Errors raised while constructing a maze.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MazeError {
    /// Maze edges must be odd and at least [`MIN_DIMENSION`] cells long.
    #[error("maze dimensions {width}x{height} must be odd and at least {MIN_DIMENSION}")]
    InvalidDimensions {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// Start and end cells must sit on odd interior coordinates.
    #[error("{endpoint:?} cell {cell:?} is not an odd interior coordinate")]
    InvalidEndpoint {
        /// Which endpoint was rejected.
        endpoint: Endpoint,
        /// Offending coordinate.
        cell: CellCoord,
    },
    /// Reward probabilities must lie in `[0, 1]` and sum to at most one.
    #[error("reward probabilities bad={bad} good={good} must lie in [0, 1] and sum to at most 1")]
    InvalidRewardProbabilities {
        /// Probability of a negative reward.
        bad: f32,
        /// Probability of a positive reward.
        good: f32,
    },
    /// ASCII layouts need at least one non-empty row.
    #[error("maze layout is empty")]
    EmptyLayout,
    /// Every ASCII layout row must have the same length.
    #[error("maze layout row {row} has {found} cells, expected {expected}")]
    RaggedLayout {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
}

/// Designated maze endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Cell the player starts from.
    Start,
    /// Cell guaranteed to be reachable from the start.
    End,
}

/// Probabilities and magnitudes of the hidden cell rewards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Chance that a passage cell hides a penalty.
    pub bad_probability: f32,
    /// Chance that a passage cell hides a reward.
    pub good_probability: f32,
    /// Value hidden in rewarding cells.
    pub good_reward: f32,
    /// Value hidden in penalising cells.
    pub bad_penalty: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            bad_probability: 0.2,
            good_probability: 0.2,
            good_reward: 10.0,
            bad_penalty: -5.0,
        }
    }
}

/// Parameters consumed by [`generate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    /// Number of columns, odd and at least [`MIN_DIMENSION`].
    pub width: u32,
    /// Number of rows, odd and at least [`MIN_DIMENSION`].
    pub height: u32,
    /// Cell the carve starts from and the player spawns on.
    pub start: CellCoord,
    /// Cell guaranteed to be reachable from `start`.
    pub end: CellCoord,
    /// Seed for every random draw made during generation.
    pub seed: u64,
    /// Hidden reward distribution.
    pub rewards: RewardConfig,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: 21,
            height: 21,
            start: CellCoord::new(1, 1),
            end: CellCoord::new(19, 19),
            seed: 0,
            rewards: RewardConfig::default(),
        }
    }
}

impl MazeConfig {
    /// Checks every constraint [`generate`] relies on.
    pub fn validate(&self) -> Result<(), MazeError> {
        let dimensions_valid = self.width >= MIN_DIMENSION
            && self.height >= MIN_DIMENSION
            && self.width % 2 == 1
            && self.height % 2 == 1;
        if !dimensions_valid {
            return Err(MazeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        for (endpoint, cell) in [(Endpoint::Start, self.start), (Endpoint::End, self.end)] {
            let interior = cell.column() > 0
                && cell.row() > 0
                && cell.column() < self.width - 1
                && cell.row() < self.height - 1;
            if !interior || cell.column() % 2 == 0 || cell.row() % 2 == 0 {
                return Err(MazeError::InvalidEndpoint { endpoint, cell });
            }
        }

        let bad = self.rewards.bad_probability;
        let good = self.rewards.good_probability;
        let in_range = |value: f32| (0.0..=1.0).contains(&value);
        if !in_range(bad) || !in_range(good) || bad + good > 1.0 {
            return Err(MazeError::InvalidRewardProbabilities { bad, good });
        }

        Ok(())
    }
}

/// State tracked for a single maze cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    is_wall: bool,
    visited: bool,
    revealed: bool,
    hidden_reward: f32,
}

impl Cell {
    const WALL: Cell = Cell {
        is_wall: true,
        visited: false,
        revealed: false,
        hidden_reward: 0.0,
    };

    /// Reports whether the cell blocks movement.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        self.is_wall
    }

    /// Generation-time marker left behind by the carve.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.visited
    }

    /// Reports whether any observer has uncovered the hidden reward.
    #[must_use]
    pub const fn revealed(&self) -> bool {
        self.revealed
    }

    /// Reward assigned at generation time, regardless of visibility.
    #[must_use]
    pub const fn hidden_reward(&self) -> f32 {
        self.hidden_reward
    }

    /// Reward visible to observers, available once revealed.
    #[must_use]
    pub fn visible_reward(&self) -> Option<f32> {
        (self.revealed && !self.is_wall).then_some(self.hidden_reward)
    }
}

/// Dense rectangular lattice of maze cells stored in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    start: CellCoord,
    end: CellCoord,
    cells: Vec<Cell>,
}

impl Grid {
    pub(crate) fn walled(width: u32, height: u32, start: CellCoord, end: CellCoord) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            start,
            end,
            cells: vec![Cell::WALL; capacity],
        }
    }

    /// Builds a grid from an ASCII picture, one string per row.
    ///
    /// `#` marks walls, `S` and `E` mark the start and end passages, and any
    /// other character is a plain passage. Without markers the start is the
    /// first passage and the end the last one in row-major order.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MazeError> {
        let expected = rows.first().map_or(0, |row| row.chars().count());
        if expected == 0 {
            return Err(MazeError::EmptyLayout);
        }

        let mut cells = Vec::with_capacity(expected * rows.len());
        let mut start = None;
        let mut end = None;
        for (row_index, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(MazeError::RaggedLayout {
                    row: row_index,
                    expected,
                    found,
                });
            }

            for (column_index, symbol) in row.chars().enumerate() {
                let coord = CellCoord::new(column_index as u32, row_index as u32);
                match symbol {
                    'S' => start = Some(coord),
                    'E' => end = Some(coord),
                    _ => {}
                }
                cells.push(Cell {
                    is_wall: symbol == '#',
                    visited: false,
                    revealed: false,
                    hidden_reward: 0.0,
                });
            }
        }

        let width = expected as u32;
        let mut grid = Self {
            width,
            height: rows.len() as u32,
            start: CellCoord::new(0, 0),
            end: CellCoord::new(0, 0),
            cells,
        };
        let first = grid.passages().next();
        let last = grid.passages().last();
        grid.start = start.or(first).unwrap_or(grid.start);
        grid.end = end.or(last).unwrap_or(grid.end);
        Ok(grid)
    }

    /// Places a hidden reward on a passage cell while assembling a scenario.
    #[must_use]
    pub fn with_reward(mut self, cell: CellCoord, reward: f32) -> Self {
        debug_assert!(self.is_walkable(cell), "rewards belong on passage cells");
        if let Some(slot) = self.cell_mut(cell) {
            if !slot.is_wall {
                slot.hidden_reward = reward;
            }
        }
        self
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell the player starts from.
    #[must_use]
    pub const fn start(&self) -> CellCoord {
        self.start
    }

    /// Cell guaranteed to be reachable from the start.
    #[must_use]
    pub const fn end(&self) -> CellCoord {
        self.end
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Cell data stored at the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Reports whether the cell can be walked on.
    ///
    /// Out-of-bounds coordinates are a caller bug; they trip a debug
    /// assertion and read as walls in release builds.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        debug_assert!(
            self.contains(cell),
            "cell {cell:?} outside {}x{} grid",
            self.width,
            self.height
        );
        self.cell(cell).map_or(false, |state| !state.is_wall)
    }

    /// Marks the cell revealed and returns its reward.
    ///
    /// Walls carry no reward and yield `None`.
    pub fn reveal(&mut self, cell: CellCoord) -> Option<f32> {
        debug_assert!(
            self.contains(cell),
            "cell {cell:?} outside {}x{} grid",
            self.width,
            self.height
        );
        let state = self.cell_mut(cell)?;
        if state.is_wall {
            return None;
        }
        state.revealed = true;
        Some(state.hidden_reward)
    }

    /// Iterator over every passage cell in row-major order.
    pub fn passages(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_wall)
            .map(move |(index, _)| {
                let index = index as u32;
                CellCoord::new(index % width, index / width)
            })
    }

    /// Renders the grid as ASCII art, one line per row.
    ///
    /// Walls are `#`, the endpoints `S` and `E`, revealed rewards `+` or
    /// `-`, and every other passage `.`.
    #[must_use]
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.height as usize);
        for row in 0..self.height {
            for column in 0..self.width {
                let coord = CellCoord::new(column, row);
                let symbol = match self.cell(coord) {
                    None => '?',
                    Some(cell) if cell.is_wall => '#',
                    Some(_) if coord == self.start => 'S',
                    Some(_) if coord == self.end => 'E',
                    Some(cell) => match cell.visible_reward() {
                        Some(reward) if reward > 0.0 => '+',
                        Some(reward) if reward < 0.0 => '-',
                        _ => '.',
                    },
                };
                out.push(symbol);
            }
            if row + 1 < self.height {
                out.push('\n');
            }
        }
        out
    }

    pub(crate) fn is_interior(&self, cell: CellCoord) -> bool {
        cell.column() > 0
            && cell.row() > 0
            && cell.column() < self.width.saturating_sub(1)
            && cell.row() < self.height.saturating_sub(1)
    }

    pub(crate) fn carve(&mut self, cell: CellCoord) {
        if let Some(state) = self.cell_mut(cell) {
            state.is_wall = false;
            state.visited = true;
        }
    }

    pub(crate) fn is_visited(&self, cell: CellCoord) -> bool {
        self.cell(cell).map_or(true, |state| state.visited)
    }

    pub(crate) fn set_hidden_reward(&mut self, cell: CellCoord, reward: f32) {
        if let Some(state) = self.cell_mut(cell) {
            if !state.is_wall {
                state.hidden_reward = reward;
            }
        }
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        let index = self.index(cell)?;
        self.cells.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(MazeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn even_or_tiny_dimensions_are_rejected() {
        for (width, height) in [(20, 21), (21, 20), (1, 1), (2, 5)] {
            let config = MazeConfig {
                width,
                height,
                start: CellCoord::new(1, 1),
                end: CellCoord::new(1, 1),
                ..MazeConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(MazeError::InvalidDimensions { width, height })
            );
        }
    }

    #[test]
    fn even_or_border_endpoints_are_rejected() {
        let config = MazeConfig {
            end: CellCoord::new(18, 19),
            ..MazeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(MazeError::InvalidEndpoint {
                endpoint: Endpoint::End,
                cell: CellCoord::new(18, 19),
            })
        );

        let config = MazeConfig {
            start: CellCoord::new(0, 1),
            ..MazeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MazeError::InvalidEndpoint {
                endpoint: Endpoint::Start,
                ..
            })
        ));
    }

    #[test]
    fn reward_probabilities_must_fit_the_unit_interval() {
        let config = MazeConfig {
            rewards: RewardConfig {
                bad_probability: 0.7,
                good_probability: 0.6,
                ..RewardConfig::default()
            },
            ..MazeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MazeError::InvalidRewardProbabilities { .. })
        ));
    }

    #[test]
    fn from_rows_parses_walls_and_markers() {
        let grid = Grid::from_rows(&["#####", "#S.E#", "#####"]).expect("valid layout");
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.start(), CellCoord::new(1, 1));
        assert_eq!(grid.end(), CellCoord::new(3, 1));
        assert!(grid.is_walkable(CellCoord::new(2, 1)));
        assert!(!grid.is_walkable(CellCoord::new(2, 0)));
        assert_eq!(grid.passages().count(), 3);
    }

    #[test]
    fn from_rows_rejects_ragged_layouts() {
        assert_eq!(
            Grid::from_rows(&["###", "#.", "###"]),
            Err(MazeError::RaggedLayout {
                row: 1,
                expected: 3,
                found: 2,
            })
        );
        assert_eq!(Grid::from_rows(&[]), Err(MazeError::EmptyLayout));
    }

    #[test]
    fn reveal_exposes_rewards_on_passages_only() {
        let mut grid = Grid::from_rows(&["###", "#.#", "###"])
            .expect("valid layout")
            .with_reward(CellCoord::new(1, 1), 10.0);
        let cell = CellCoord::new(1, 1);

        assert_eq!(grid.cell(cell).and_then(Cell::visible_reward), None);
        assert_eq!(grid.reveal(cell), Some(10.0));
        assert_eq!(grid.cell(cell).and_then(Cell::visible_reward), Some(10.0));
        assert_eq!(grid.reveal(CellCoord::new(0, 0)), None);
        assert!(!grid.cell(CellCoord::new(0, 0)).expect("in bounds").revealed());
    }

    #[test]
    fn render_ascii_marks_revealed_rewards() {
        let mut grid = Grid::from_rows(&["######", "#S..E#", "######"])
            .expect("valid layout")
            .with_reward(CellCoord::new(2, 1), 4.0)
            .with_reward(CellCoord::new(3, 1), -2.0);
        let _ = grid.reveal(CellCoord::new(2, 1));
        let _ = grid.reveal(CellCoord::new(3, 1));

        assert_eq!(grid.render_ascii(), "######\n#S+-E#\n######");
    }

    #[test]
    #[should_panic(expected = "outside")]
    #[cfg(debug_assertions)]
    fn out_of_bounds_queries_fail_loudly_in_debug_builds() {
        let grid = Grid::from_rows(&["..."]).expect("valid layout");
        let _ = grid.is_walkable(CellCoord::new(5, 0));
    }
}
