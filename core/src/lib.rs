#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the stealth maze simulation.
//!
//! This crate defines the value types that connect the maze world, the pure
//! systems, and adapters. The world owns the authoritative [`CellCoord`]
//! lattice, the pathfinder answers with [`Route`] values, and the agent
//! system reports what happened during a tick by pushing [`Event`] values
//! into a caller-provided buffer so adapters can react deterministically.

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the maze. Do not look away.";

/// Cardinal movement directions available on the maze lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in the fixed order used for deterministic expansion.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row delta produced by a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the straight-line distance between two cell coordinates.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let columns = self.column().abs_diff(other.column()) as f32;
        let rows = self.row().abs_diff(other.row()) as f32;
        (columns * columns + rows * rows).sqrt()
    }

    /// Offsets the coordinate by signed column and row deltas.
    ///
    /// Returns `None` when the result would leave the non-negative quadrant
    /// or overflow. Upper bounds are the caller's concern.
    #[must_use]
    pub fn offset(self, columns: i64, rows: i64) -> Option<CellCoord> {
        let column = i64::from(self.column).checked_add(columns)?;
        let row = i64::from(self.row).checked_add(rows)?;
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }

    /// Moves `distance` cells in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction, distance: u32) -> Option<CellCoord> {
        let (columns, rows) = direction.delta();
        let distance = i64::from(distance);
        self.offset(columns * distance, rows * distance)
    }
}

/// Ordered list of cells produced by a pathfinding query.
///
/// Routes include both the start and the goal cell. An empty route is the
/// canonical "unreachable" answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    cells: Vec<CellCoord>,
}

impl Route {
    /// Creates a route from cells already ordered from start to goal.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Self {
        Self { cells }
    }

    /// Route that signals an unreachable goal.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self { cells: Vec::new() }
    }

    /// Reports whether the route is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells on the route, both endpoints included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Number of orthogonal moves needed to walk the route.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Cell at the provided index, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CellCoord> {
        self.cells.get(index).copied()
    }

    /// First cell of the route.
    #[must_use]
    pub fn start(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Final cell of the route.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Cells composing the route in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Iterator over the route cells in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &CellCoord> {
        self.cells.iter()
    }
}

/// Behavior states driven by the agent's finite state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Default wandering behavior following the patrol strategy.
    #[default]
    Patrolling,
    /// Walking toward a target derived from a heard sound.
    Investigating,
    /// Steering straight at a player in sight.
    Chasing,
    /// Watched by the player; all motion is suspended.
    Frozen,
}

/// Noise emitted by the player at a grid location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundEvent {
    location: CellCoord,
}

impl SoundEvent {
    /// Creates a sound event originating at the provided cell.
    #[must_use]
    pub const fn at(location: CellCoord) -> Self {
        Self { location }
    }

    /// Cell where the sound originated.
    #[must_use]
    pub const fn location(&self) -> CellCoord {
        self.location
    }
}

/// Events broadcast by systems while advancing the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The agent's behavior state changed.
    StateChanged {
        /// State active before the transition.
        from: AgentState,
        /// State active after the transition.
        to: AgentState,
    },
    /// A route was planned for the agent.
    RoutePlanned {
        /// Cell the route starts from.
        from: CellCoord,
        /// Cell the route leads to.
        to: CellCoord,
        /// Number of cells on the route, both endpoints included.
        length: usize,
    },
    /// A route was requested but the goal could not be reached.
    RouteUnavailable {
        /// Cell the search started from.
        from: CellCoord,
        /// Cell the search attempted to reach.
        to: CellCoord,
    },
    /// The agent snapped onto a waypoint of its current route.
    WaypointReached {
        /// Cell that was reached.
        cell: CellCoord,
        /// Index of the waypoint within the route.
        index: usize,
    },
    /// The agent closed in on the player while chasing.
    PlayerCaught {
        /// Cell the agent occupied when the capture triggered.
        cell: CellCoord,
    },
    /// A sensor revealed the hidden reward of a cell.
    CellRevealed {
        /// Cell that became revealed.
        cell: CellCoord,
        /// Reward hidden in the cell.
        reward: f32,
    },
    /// A revealed reward was collected.
    RewardCollected {
        /// Cell the reward was collected from.
        cell: CellCoord,
        /// Reward added to the score.
        reward: f32,
        /// Running score after the collection.
        score: f32,
    },
}
