//! Route planning over the maze lattice.
//!
//! [`Pathfinder`] answers point-to-point queries with an A* search whose
//! per-cell bookkeeping lives in a reusable [`SearchGraph`] arena.
//! [`DistanceField`] floods breadth-first distances from a set of sources
//! and backs the level-setup queries.

use std::{cmp::Reverse, collections::BinaryHeap, collections::VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};
use stealth_maze_core::{CellCoord, Route};
use thiserror::Error;

use crate::Grid;

/// Sentinel cost recorded for cells the search has not reached.
pub const UNREACHED: u32 = u32::MAX;

/// Dense breadth-first distance grid seeded from one or more source cells.
///
/// Distances default to `u32::MAX` for unreachable cells so callers can
/// distinguish walls and sealed pockets from traversable cells.
#[derive(Clone, Debug, Default)]
pub struct DistanceField {
    width: u32,
    height: u32,
    distances: Vec<u32>,
}

impl DistanceField {
    /// Rebuilds the distances using a breadth-first flood from `sources`.
    pub fn rebuild_with<F>(
        &mut self,
        width: u32,
        height: u32,
        sources: &[CellCoord],
        mut is_blocked: F,
    ) where
        F: FnMut(CellCoord) -> bool,
    {
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let cell_count = width_usize.checked_mul(height_usize).unwrap_or(0);

        self.width = width;
        self.height = height;
        if cell_count == 0 {
            self.distances.clear();
            return;
        }

        if self.distances.len() != cell_count {
            self.distances = vec![u32::MAX; cell_count];
        } else {
            self.distances.fill(u32::MAX);
        }

        let mut queue = VecDeque::new();
        for &source in sources {
            if source.column() >= width || source.row() >= height || is_blocked(source) {
                continue;
            }

            if let Some(index) = index(width_usize, source) {
                if self.distances[index] == 0 {
                    continue;
                }
                self.distances[index] = 0;
                queue.push_back(source);
            }
        }

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = index(width_usize, cell) else {
                continue;
            };
            let current_distance = self.distances[current_index];
            if current_distance >= u32::MAX.saturating_sub(1) {
                continue;
            }

            let next_distance = current_distance + 1;
            for neighbor in neighbors(cell, width, height) {
                if is_blocked(neighbor) {
                    continue;
                }

                let Some(neighbor_index) = index(width_usize, neighbor) else {
                    continue;
                };
                if self.distances[neighbor_index] <= next_distance {
                    continue;
                }

                self.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }

    /// Width of the field in cells.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the field in cells.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Distance captured for the provided cell, if it lies within the field.
    #[must_use]
    pub fn distance(&self, cell: CellCoord) -> Option<u32> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        index(width, cell).and_then(|offset| self.distances.get(offset).copied())
    }
}

/// Per-cell bookkeeping for a single A* query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchNode {
    walkable: bool,
    g_cost: u32,
    h_cost: u32,
    parent: Option<usize>,
    closed: bool,
}

impl SearchNode {
    const RESET: SearchNode = SearchNode {
        walkable: false,
        g_cost: UNREACHED,
        h_cost: 0,
        parent: None,
        closed: false,
    };

    /// Mirrors the walkability of the underlying grid cell.
    #[must_use]
    pub const fn walkable(&self) -> bool {
        self.walkable
    }

    /// Cost of the best known route from the start, [`UNREACHED`] if none.
    #[must_use]
    pub const fn g_cost(&self) -> u32 {
        self.g_cost
    }

    /// Manhattan estimate of the remaining distance to the goal.
    #[must_use]
    pub const fn h_cost(&self) -> u32 {
        self.h_cost
    }

    /// Total estimated route cost through this node.
    #[must_use]
    pub const fn f_cost(&self) -> u32 {
        self.g_cost.saturating_add(self.h_cost)
    }

    /// Arena index of the node this one was reached from.
    #[must_use]
    pub const fn parent(&self) -> Option<usize> {
        self.parent
    }
}

/// Arena of [`SearchNode`]s overlaying the grid, reused across queries.
#[derive(Clone, Debug, Default)]
pub struct SearchGraph {
    width: u32,
    height: u32,
    nodes: Vec<SearchNode>,
}

impl SearchGraph {
    /// Resets every node and mirrors the grid's walkability.
    ///
    /// The arena is reallocated only when the grid dimensions change.
    pub fn prepare(&mut self, grid: &Grid) {
        let cell_count =
            usize::try_from(u64::from(grid.width()) * u64::from(grid.height())).unwrap_or(0);
        let resized = self.width != grid.width() || self.height != grid.height();
        if resized || self.nodes.len() != cell_count {
            self.width = grid.width();
            self.height = grid.height();
            self.nodes = vec![SearchNode::RESET; cell_count];
        }

        let width = usize::try_from(self.width).unwrap_or(0).max(1);
        for (offset, node) in self.nodes.iter_mut().enumerate() {
            let cell = CellCoord::new((offset % width) as u32, (offset / width) as u32);
            *node = SearchNode {
                walkable: grid.cell(cell).map_or(false, |state| !state.is_wall()),
                ..SearchNode::RESET
            };
        }
    }

    /// Node stored for the cell, if it lies inside the arena.
    #[must_use]
    pub fn node(&self, cell: CellCoord) -> Option<&SearchNode> {
        self.index_of(cell).and_then(|offset| self.nodes.get(offset))
    }

    fn index_of(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        index(usize::try_from(self.width).ok()?, cell)
    }

    fn cell_at(&self, offset: usize) -> CellCoord {
        let width = usize::try_from(self.width).unwrap_or(0).max(1);
        CellCoord::new((offset % width) as u32, (offset / width) as u32)
    }
}

/// Reasons a route query produced no route.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// An endpoint lies outside the grid.
    #[error("cell {cell:?} lies outside the grid")]
    OutOfBounds {
        /// Offending endpoint.
        cell: CellCoord,
    },
    /// The start cell is a wall.
    #[error("start cell {cell:?} is not walkable")]
    StartBlocked {
        /// Offending start cell.
        cell: CellCoord,
    },
    /// The goal cell is a wall.
    #[error("goal cell {cell:?} is not walkable")]
    GoalBlocked {
        /// Offending goal cell.
        cell: CellCoord,
    },
    /// The search exhausted every reachable cell without meeting the goal.
    #[error("goal is unreachable from the start")]
    Unreachable,
    /// The search hit its expansion budget before meeting the goal.
    #[error("search budget exhausted after {expansions} expansions")]
    BudgetExhausted {
        /// Number of nodes expanded before giving up.
        expansions: usize,
    },
}

/// Tuning knobs for the pathfinder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Upper bound on node expansions per query; `None` searches exhaustively.
    pub max_expansions: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f_cost: u32,
    h_cost: u32,
    sequence: u64,
    offset: usize,
}

/// A* route planner over the maze lattice.
///
/// Four-directional moves cost one step each and the heuristic is the
/// Manhattan distance, so returned routes are shortest routes. Ties on total
/// cost prefer nodes closer to the goal, then earlier insertions, which keeps
/// answers identical across runs.
#[derive(Debug, Default)]
pub struct Pathfinder {
    config: PathfinderConfig,
    graph: SearchGraph,
    open: BinaryHeap<Reverse<OpenEntry>>,
}

impl Pathfinder {
    /// Creates a pathfinder using the provided configuration.
    #[must_use]
    pub fn new(config: PathfinderConfig) -> Self {
        Self {
            config,
            graph: SearchGraph::default(),
            open: BinaryHeap::new(),
        }
    }

    /// Search bookkeeping left behind by the most recent query.
    #[must_use]
    pub fn graph(&self) -> &SearchGraph {
        &self.graph
    }

    /// Plans a route, answering with the empty route when none exists.
    pub fn find_route(&mut self, grid: &Grid, start: CellCoord, goal: CellCoord) -> Route {
        match self.try_find_route(grid, start, goal) {
            Ok(route) => route,
            Err(error) => {
                debug!("no route from {start:?} to {goal:?}: {error}");
                Route::unreachable()
            }
        }
    }

    /// Plans a route from `start` to `goal`, both included.
    pub fn try_find_route(
        &mut self,
        grid: &Grid,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Route, PathError> {
        for cell in [start, goal] {
            if !grid.contains(cell) {
                return Err(PathError::OutOfBounds { cell });
            }
        }
        if !grid.is_walkable(start) {
            return Err(PathError::StartBlocked { cell: start });
        }
        if !grid.is_walkable(goal) {
            return Err(PathError::GoalBlocked { cell: goal });
        }

        self.graph.prepare(grid);
        self.open.clear();

        let (Some(start_offset), Some(goal_offset)) =
            (self.graph.index_of(start), self.graph.index_of(goal))
        else {
            return Err(PathError::Unreachable);
        };

        let mut sequence = 0_u64;
        let start_h = start.manhattan_distance(goal);
        {
            let node = &mut self.graph.nodes[start_offset];
            node.g_cost = 0;
            node.h_cost = start_h;
        }
        self.open.push(Reverse(OpenEntry {
            f_cost: start_h,
            h_cost: start_h,
            sequence,
            offset: start_offset,
        }));

        let mut expansions = 0_usize;
        while let Some(Reverse(entry)) = self.open.pop() {
            if self.graph.nodes[entry.offset].closed {
                continue;
            }

            if entry.offset == goal_offset {
                return Ok(self.reconstruct(goal_offset));
            }

            if let Some(limit) = self.config.max_expansions {
                if expansions >= limit {
                    return Err(PathError::BudgetExhausted { expansions });
                }
            }
            expansions += 1;

            self.graph.nodes[entry.offset].closed = true;
            let current_g = self.graph.nodes[entry.offset].g_cost;
            let current = self.graph.cell_at(entry.offset);

            for neighbor in neighbors(current, self.graph.width, self.graph.height) {
                let Some(neighbor_offset) = self.graph.index_of(neighbor) else {
                    continue;
                };
                let node = &mut self.graph.nodes[neighbor_offset];
                if !node.walkable || node.closed {
                    continue;
                }

                let tentative = current_g.saturating_add(1);
                if tentative >= node.g_cost {
                    continue;
                }

                node.g_cost = tentative;
                node.h_cost = neighbor.manhattan_distance(goal);
                node.parent = Some(entry.offset);
                sequence += 1;
                self.open.push(Reverse(OpenEntry {
                    f_cost: node.f_cost(),
                    h_cost: node.h_cost,
                    sequence,
                    offset: neighbor_offset,
                }));
            }
        }

        Err(PathError::Unreachable)
    }

    fn reconstruct(&self, goal_offset: usize) -> Route {
        let mut cells = Vec::new();
        let mut cursor = Some(goal_offset);
        while let Some(offset) = cursor {
            cells.push(self.graph.cell_at(offset));
            cursor = self.graph.nodes[offset].parent;
        }
        cells.reverse();
        Route::new(cells)
    }
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_grow_from_every_source() {
        let mut field = DistanceField::default();
        let sources = [CellCoord::new(0, 0), CellCoord::new(4, 0)];

        field.rebuild_with(5, 2, &sources, |_| false);

        assert_eq!(field.distance(CellCoord::new(0, 0)), Some(0));
        assert_eq!(field.distance(CellCoord::new(4, 0)), Some(0));
        assert_eq!(field.distance(CellCoord::new(2, 0)), Some(2));
        assert_eq!(field.distance(CellCoord::new(3, 1)), Some(2));
        assert_eq!(field.distance(CellCoord::new(5, 0)), None);
        assert_eq!((field.width(), field.height()), (5, 2));
    }

    #[test]
    fn maze_walls_force_detours() {
        let grid = Grid::from_rows(&[
            "#####", //
            "#S#E#", //
            "#...#", //
            "#####", //
        ])
        .expect("valid layout");
        let mut field = DistanceField::default();

        field.rebuild_with(grid.width(), grid.height(), &[grid.start()], |cell| {
            !grid.is_walkable(cell)
        });

        assert_eq!(field.distance(grid.end()), Some(4));
        assert_eq!(field.distance(CellCoord::new(2, 1)), Some(u32::MAX));
        assert_eq!(field.distance(CellCoord::new(0, 0)), Some(u32::MAX));
    }

    #[test]
    fn prepare_resets_costs_between_queries() {
        let grid = Grid::from_rows(&[".....", ".....", "....."]).expect("valid layout");
        let mut pathfinder = Pathfinder::default();
        let route = pathfinder.find_route(&grid, CellCoord::new(0, 0), CellCoord::new(4, 2));
        assert_eq!(route.steps(), 6);
        assert_eq!(
            pathfinder.graph().node(CellCoord::new(0, 0)).map(SearchNode::g_cost),
            Some(0)
        );

        pathfinder.graph.prepare(&grid);
        for row in 0..grid.height() {
            for column in 0..grid.width() {
                let node = pathfinder
                    .graph()
                    .node(CellCoord::new(column, row))
                    .expect("in bounds");
                assert_eq!(node.g_cost(), UNREACHED);
                assert_eq!(node.parent(), None);
                assert!(node.walkable());
            }
        }
    }

    #[test]
    fn f_cost_is_derived_from_its_parts() {
        let grid = Grid::from_rows(&["...", "...", "..."]).expect("valid layout");
        let mut pathfinder = Pathfinder::default();
        let _ = pathfinder.find_route(&grid, CellCoord::new(0, 0), CellCoord::new(2, 2));
        let node = pathfinder
            .graph()
            .node(CellCoord::new(1, 0))
            .expect("in bounds");
        assert_eq!(node.g_cost(), 1);
        assert_eq!(node.h_cost(), 3);
        assert_eq!(node.f_cost(), 4);
        assert_eq!(SearchNode::RESET.f_cost(), UNREACHED);
    }

    #[test]
    fn blocked_endpoints_are_reported() {
        let grid = Grid::from_rows(&["#..", "...", "..#"]).expect("valid layout");
        let mut pathfinder = Pathfinder::default();
        assert_eq!(
            pathfinder.try_find_route(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1)),
            Err(PathError::StartBlocked {
                cell: CellCoord::new(0, 0)
            })
        );
        assert_eq!(
            pathfinder.try_find_route(&grid, CellCoord::new(1, 1), CellCoord::new(2, 2)),
            Err(PathError::GoalBlocked {
                cell: CellCoord::new(2, 2)
            })
        );
        assert_eq!(
            pathfinder.try_find_route(&grid, CellCoord::new(1, 1), CellCoord::new(9, 9)),
            Err(PathError::OutOfBounds {
                cell: CellCoord::new(9, 9)
            })
        );
    }

    #[test]
    fn route_to_self_contains_a_single_cell() {
        let grid = Grid::from_rows(&["..."]).expect("valid layout");
        let mut pathfinder = Pathfinder::default();
        let route = pathfinder.find_route(&grid, CellCoord::new(1, 0), CellCoord::new(1, 0));
        assert_eq!(route.cells(), &[CellCoord::new(1, 0)]);
    }
}
