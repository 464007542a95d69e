//! Level-setup queries answered from an immutable [`Grid`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stealth_maze_core::{CellCoord, Direction};

use crate::{navigation::DistanceField, Grid};

/// Passage cells enclosed by exactly three walls, in row-major order.
///
/// Cells beyond the grid edge count as walls.
#[must_use]
pub fn dead_ends(grid: &Grid) -> Vec<CellCoord> {
    grid.passages()
        .filter(|&cell| {
            let walls = Direction::ALL
                .into_iter()
                .filter(|&direction| {
                    cell.step(direction, 1)
                        .filter(|neighbor| grid.contains(*neighbor))
                        .map_or(true, |neighbor| !grid.is_walkable(neighbor))
                })
                .count();
            walls == 3
        })
        .collect()
}

/// Picks up to `count` distinct dead ends to hold keys.
///
/// Cells listed in `excluded` never receive a key.
#[must_use]
pub fn place_keys(
    grid: &Grid,
    count: usize,
    excluded: &[CellCoord],
    seed: u64,
) -> Vec<CellCoord> {
    let mut candidates = dead_ends(grid);
    candidates.retain(|cell| !excluded.contains(cell));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut keys = Vec::with_capacity(count.min(candidates.len()));
    while keys.len() < count && !candidates.is_empty() {
        let chosen = rng.gen_range(0..candidates.len());
        keys.push(candidates.remove(chosen));
    }
    keys
}

/// Reachable passage cell farthest from `origin` by walking distance.
///
/// Ties resolve to the lowest row, then the lowest column. Returns `None`
/// when `origin` is not a passage.
#[must_use]
pub fn spawn_far_from(grid: &Grid, origin: CellCoord) -> Option<CellCoord> {
    if !grid.contains(origin) || !grid.is_walkable(origin) {
        return None;
    }

    let mut field = DistanceField::default();
    field.rebuild_with(grid.width(), grid.height(), &[origin], |cell| {
        !grid.is_walkable(cell)
    });

    let mut best: Option<(u32, CellCoord)> = None;
    for cell in grid.passages() {
        let Some(distance) = field.distance(cell) else {
            continue;
        };
        if distance == u32::MAX {
            continue;
        }
        if best.map_or(true, |(farthest, _)| distance > farthest) {
            best = Some((distance, cell));
        }
    }
    best.map(|(_, cell)| cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor_with_branch() -> Grid {
        Grid::from_rows(&[
            "#######", //
            "#S....#", //
            "#.###.#", //
            "#.#...#", //
            "#######", //
        ])
        .expect("valid layout")
    }

    #[test]
    fn dead_ends_have_three_walls() {
        let grid = corridor_with_branch();
        assert_eq!(
            dead_ends(&grid),
            vec![CellCoord::new(1, 3), CellCoord::new(3, 3)]
        );
    }

    #[test]
    fn place_keys_never_repeats_cells() {
        let grid = corridor_with_branch();
        let keys = place_keys(&grid, 3, &[], 42);
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert_eq!(place_keys(&grid, 3, &[], 42), keys);
    }

    #[test]
    fn excluded_cells_never_hold_keys() {
        let grid = corridor_with_branch();
        let spawn = CellCoord::new(3, 3);
        for seed in 0..16 {
            assert_eq!(
                place_keys(&grid, 3, &[spawn], seed),
                vec![CellCoord::new(1, 3)]
            );
        }
    }

    #[test]
    fn spawn_prefers_the_farthest_reachable_cell() {
        let grid = corridor_with_branch();
        assert_eq!(
            spawn_far_from(&grid, CellCoord::new(1, 1)),
            Some(CellCoord::new(3, 3))
        );
        assert_eq!(spawn_far_from(&grid, CellCoord::new(0, 0)), None);
    }
}
