//! Policies that choose where a patrolling agent heads next.

use std::{collections::HashSet, fmt::Debug};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stealth_maze_core::CellCoord;
use stealth_maze_world::Grid;

const WANDER_ATTEMPTS: usize = 50;

/// Read-only view handed to a strategy when the agent needs a new target.
#[derive(Clone, Copy, Debug)]
pub struct PatrolContext<'a> {
    /// Maze the agent patrols.
    pub grid: &'a Grid,
    /// Cell the agent currently occupies.
    pub cell: CellCoord,
    /// Cells the agent has stood on so far.
    pub visited: &'a HashSet<CellCoord>,
}

/// Chooses the next patrol target once the current route runs out.
pub trait PatrolStrategy: Debug {
    /// Returns the next cell to walk to, or `None` to stay put.
    fn next_target(&mut self, context: &PatrolContext<'_>) -> Option<CellCoord>;
}

/// Strategy that never moves the agent.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

impl PatrolStrategy for Idle {
    fn next_target(&mut self, _context: &PatrolContext<'_>) -> Option<CellCoord> {
        None
    }
}

/// Strategy that cycles through a fixed list of waypoints.
#[derive(Clone, Debug)]
pub struct FixedRoutePatrol {
    waypoints: Vec<CellCoord>,
    next: usize,
}

impl FixedRoutePatrol {
    /// Creates a patrol visiting the waypoints in order, wrapping around.
    #[must_use]
    pub fn new(waypoints: Vec<CellCoord>) -> Self {
        Self { waypoints, next: 0 }
    }
}

impl PatrolStrategy for FixedRoutePatrol {
    fn next_target(&mut self, _context: &PatrolContext<'_>) -> Option<CellCoord> {
        let target = *self.waypoints.get(self.next)?;
        self.next = (self.next + 1) % self.waypoints.len();
        Some(target)
    }
}

/// Strategy heading for the most valuable revealed reward not yet visited.
///
/// Ties prefer the nearest cell by Manhattan distance, then row-major order.
/// Without a known reward the nearest unvisited passage is explored.
#[derive(Clone, Copy, Debug, Default)]
pub struct RewardSeekingExplore;

impl PatrolStrategy for RewardSeekingExplore {
    fn next_target(&mut self, context: &PatrolContext<'_>) -> Option<CellCoord> {
        let grid = context.grid;
        let origin = context.cell;

        let mut best: Option<(f32, u32, CellCoord)> = None;
        for cell in unvisited(context) {
            let Some(reward) = grid.cell(cell).and_then(|state| state.visible_reward()) else {
                continue;
            };
            if reward <= 0.0 {
                continue;
            }
            let distance = cell.manhattan_distance(origin);
            let better = best.map_or(true, |(top, nearest, _)| {
                reward > top || (reward == top && distance < nearest)
            });
            if better {
                best = Some((reward, distance, cell));
            }
        }
        if let Some((_, _, cell)) = best {
            return Some(cell);
        }

        unvisited(context).min_by_key(|cell| cell.manhattan_distance(origin))
    }
}

fn unvisited<'a>(context: &PatrolContext<'a>) -> impl Iterator<Item = CellCoord> + 'a {
    let origin = context.cell;
    let visited = context.visited;
    context
        .grid
        .passages()
        .filter(move |cell| *cell != origin && !visited.contains(cell))
}

/// Strategy wandering to random passages.
#[derive(Clone, Debug)]
pub struct RandomWander {
    rng: ChaCha8Rng,
}

impl RandomWander {
    /// Creates a wanderer drawing from a stream seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PatrolStrategy for RandomWander {
    fn next_target(&mut self, context: &PatrolContext<'_>) -> Option<CellCoord> {
        let grid = context.grid;
        if grid.width() == 0 || grid.height() == 0 {
            return None;
        }
        for _ in 0..WANDER_ATTEMPTS {
            let cell = CellCoord::new(
                self.rng.gen_range(0..grid.width()),
                self.rng.gen_range(0..grid.height()),
            );
            if cell != context.cell && grid.is_walkable(cell) {
                return Some(cell);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Grid {
        Grid::from_rows(&[
            "#######", //
            "#S....#", //
            "#.###.#", //
            "#....E#", //
            "#######", //
        ])
        .expect("valid layout")
    }

    #[test]
    fn idle_never_moves() {
        let grid = room();
        let visited = HashSet::new();
        let context = PatrolContext {
            grid: &grid,
            cell: CellCoord::new(1, 1),
            visited: &visited,
        };
        assert_eq!(Idle.next_target(&context), None);
    }

    #[test]
    fn fixed_route_wraps_around() {
        let grid = room();
        let visited = HashSet::new();
        let context = PatrolContext {
            grid: &grid,
            cell: CellCoord::new(1, 1),
            visited: &visited,
        };
        let mut patrol = FixedRoutePatrol::new(vec![CellCoord::new(5, 1), CellCoord::new(5, 3)]);
        assert_eq!(patrol.next_target(&context), Some(CellCoord::new(5, 1)));
        assert_eq!(patrol.next_target(&context), Some(CellCoord::new(5, 3)));
        assert_eq!(patrol.next_target(&context), Some(CellCoord::new(5, 1)));

        let mut empty = FixedRoutePatrol::new(Vec::new());
        assert_eq!(empty.next_target(&context), None);
    }

    #[test]
    fn explorer_prefers_the_best_revealed_reward() {
        let mut grid = room()
            .with_reward(CellCoord::new(5, 1), 10.0)
            .with_reward(CellCoord::new(1, 3), 10.0)
            .with_reward(CellCoord::new(3, 3), 20.0);
        let visited = HashSet::from([CellCoord::new(1, 1)]);
        let cell = CellCoord::new(1, 1);
        let mut explorer = RewardSeekingExplore;

        let context = PatrolContext {
            grid: &grid,
            cell,
            visited: &visited,
        };
        assert_eq!(explorer.next_target(&context), Some(CellCoord::new(2, 1)));

        for reward_cell in [CellCoord::new(5, 1), CellCoord::new(1, 3)] {
            let _ = grid.reveal(reward_cell);
        }
        let context = PatrolContext {
            grid: &grid,
            cell,
            visited: &visited,
        };
        assert_eq!(explorer.next_target(&context), Some(CellCoord::new(1, 3)));

        let _ = grid.reveal(CellCoord::new(3, 3));
        let context = PatrolContext {
            grid: &grid,
            cell,
            visited: &visited,
        };
        assert_eq!(explorer.next_target(&context), Some(CellCoord::new(3, 3)));
    }

    #[test]
    fn explorer_skips_visited_and_negative_rewards() {
        let mut grid = room()
            .with_reward(CellCoord::new(2, 1), -5.0)
            .with_reward(CellCoord::new(3, 1), 10.0);
        let _ = grid.reveal(CellCoord::new(2, 1));
        let _ = grid.reveal(CellCoord::new(3, 1));
        let visited = HashSet::from([CellCoord::new(1, 1), CellCoord::new(3, 1)]);
        let context = PatrolContext {
            grid: &grid,
            cell: CellCoord::new(1, 1),
            visited: &visited,
        };
        assert_eq!(RewardSeekingExplore.next_target(&context), Some(CellCoord::new(2, 1)));

        let everything: HashSet<_> = grid.passages().collect();
        let context = PatrolContext {
            grid: &grid,
            cell: CellCoord::new(1, 1),
            visited: &everything,
        };
        assert_eq!(RewardSeekingExplore.next_target(&context), None);
    }

    #[test]
    fn wander_picks_other_passages_deterministically() {
        let grid = room();
        let visited = HashSet::new();
        let context = PatrolContext {
            grid: &grid,
            cell: CellCoord::new(1, 1),
            visited: &visited,
        };
        let mut first = RandomWander::new(9);
        let mut second = RandomWander::new(9);
        for _ in 0..20 {
            let target = first.next_target(&context);
            assert_eq!(target, second.next_target(&context));
            let cell = target.expect("room has passages");
            assert!(grid.is_walkable(cell));
            assert_ne!(cell, CellCoord::new(1, 1));
        }
    }
}
