use rand::Rng;
use stealth_maze_core::CellCoord;
use stealth_maze_world::Grid;

/// Picks the cell an agent walks to after hearing a sound.
///
/// Sounds next to the agent are investigated exactly. Farther sounds are
/// investigated somewhere within a search radius around the source, scaled
/// by `max_sound_radius`, chosen uniformly among walkable cells. When no
/// walkable cell qualifies the sound source itself is returned.
pub fn investigation_target<R: Rng + ?Sized>(
    grid: &Grid,
    agent: CellCoord,
    sound: CellCoord,
    max_sound_radius: f32,
    rng: &mut R,
) -> CellCoord {
    let distance = agent.manhattan_distance(sound) as f32;
    if distance <= 1.0 {
        return sound;
    }

    let radius = if max_sound_radius > 0.0 {
        (distance / max_sound_radius) * max_sound_radius
    } else {
        distance
    };
    let span = i64::from(grid.width().max(grid.height()));
    let reach = (radius.round() as i64).min(span);

    let mut candidates = Vec::new();
    for rows in -reach..=reach {
        for columns in -reach..=reach {
            let Some(cell) = sound.offset(columns, rows) else {
                continue;
            };
            if grid.contains(cell)
                && grid.is_walkable(cell)
                && cell.euclidean_distance(sound) <= radius
            {
                candidates.push(cell);
            }
        }
    }

    if candidates.is_empty() {
        return sound;
    }
    candidates[rng.gen_range(0..candidates.len())]
}
