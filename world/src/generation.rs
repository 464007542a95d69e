//! Randomized depth-first maze carving.

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stealth_maze_core::{CellCoord, Direction};

use crate::{Grid, MazeConfig, MazeError, RewardConfig};

/// Generates a fully connected maze described by the configuration.
///
/// Every random draw comes from a ChaCha stream seeded with
/// [`MazeConfig::seed`], so identical configurations produce identical
/// grids.
pub fn generate(config: &MazeConfig) -> Result<Grid, MazeError> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut grid = Grid::walled(config.width, config.height, config.start, config.end);

    carve_passages(&mut grid, &mut rng);
    ensure_path(&mut grid, &mut rng);
    assign_rewards(&mut grid, &config.rewards, &mut rng);

    debug!(
        "generated {}x{} maze with {} passages (seed {:#x})",
        grid.width(),
        grid.height(),
        grid.passages().count(),
        config.seed
    );
    Ok(grid)
}

fn carve_passages(grid: &mut Grid, rng: &mut ChaCha8Rng) {
    let mut stack = vec![grid.start()];
    grid.carve(grid.start());

    while let Some(&current) = stack.last() {
        let mut candidates = [None; 4];
        let mut count = 0;
        for direction in Direction::ALL {
            let Some(next) = current.step(direction, 2) else {
                continue;
            };
            if grid.is_interior(next) && !grid.is_visited(next) {
                candidates[count] = Some(direction);
                count += 1;
            }
        }

        if count == 0 {
            let _ = stack.pop();
            continue;
        }

        let Some(direction) = candidates[rng.gen_range(0..count)] else {
            continue;
        };
        let (Some(wall), Some(next)) = (current.step(direction, 1), current.step(direction, 2))
        else {
            continue;
        };
        grid.carve(wall);
        grid.carve(next);
        stack.push(next);
    }
}

fn ensure_path(grid: &mut Grid, rng: &mut ChaCha8Rng) {
    let end = grid.end();
    let mut cursor = grid.start();

    while cursor != end {
        let columns_left = cursor.column() != end.column();
        let rows_left = cursor.row() != end.row();
        let along_columns = match (columns_left, rows_left) {
            (true, true) => rng.gen_bool(0.5),
            (true, false) => true,
            _ => false,
        };

        let direction = if along_columns {
            if end.column() > cursor.column() {
                Direction::East
            } else {
                Direction::West
            }
        } else if end.row() > cursor.row() {
            Direction::South
        } else {
            Direction::North
        };

        let (Some(wall), Some(next)) = (cursor.step(direction, 1), cursor.step(direction, 2))
        else {
            break;
        };
        grid.carve(wall);
        grid.carve(next);
        cursor = next;
    }
}

fn assign_rewards(grid: &mut Grid, rewards: &RewardConfig, rng: &mut ChaCha8Rng) {
    let passages: Vec<CellCoord> = grid.passages().collect();
    for cell in passages {
        let roll: f32 = rng.gen();
        let reward = if roll < rewards.bad_probability {
            rewards.bad_penalty
        } else if roll < rewards.bad_probability + rewards.good_probability {
            rewards.good_reward
        } else {
            0.0
        };
        grid.set_hidden_reward(cell, reward);
    }
}
