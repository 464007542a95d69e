use stealth_maze_core::CellCoord;
use stealth_maze_world::{generate, navigation::Pathfinder, query, MazeConfig, MazeError};

fn config(width: u32, height: u32, seed: u64) -> MazeConfig {
    MazeConfig {
        width,
        height,
        start: CellCoord::new(1, 1),
        end: CellCoord::new(width - 2, height - 2),
        seed,
        ..MazeConfig::default()
    }
}

#[test]
fn start_and_end_are_connected_for_every_seed() {
    let mut pathfinder = Pathfinder::default();
    for (width, height) in [(5, 5), (7, 5), (9, 13), (21, 21), (31, 15)] {
        for seed in 0..24 {
            let grid = generate(&config(width, height, seed)).expect("valid config");
            let route = pathfinder.find_route(&grid, grid.start(), grid.end());
            assert!(
                !route.is_empty(),
                "{width}x{height} seed {seed} left the end isolated:\n{}",
                grid.render_ascii()
            );
            assert_eq!(route.start(), Some(grid.start()));
            assert_eq!(route.goal(), Some(grid.end()));
        }
    }
}

#[test]
fn endpoints_away_from_the_corners_are_connected() {
    let mut pathfinder = Pathfinder::default();
    for seed in 0..12 {
        let maze = MazeConfig {
            width: 15,
            height: 15,
            start: CellCoord::new(11, 3),
            end: CellCoord::new(3, 9),
            seed,
            ..MazeConfig::default()
        };
        let grid = generate(&maze).expect("valid config");
        assert!(!pathfinder.find_route(&grid, grid.start(), grid.end()).is_empty());
    }
}

#[test]
fn routes_only_cross_passages_in_unit_steps() {
    let grid = generate(&config(21, 21, 5)).expect("valid config");
    let mut pathfinder = Pathfinder::default();
    let route = pathfinder.find_route(&grid, grid.start(), grid.end());

    for cell in route.iter() {
        assert!(grid.is_walkable(*cell));
    }
    for pair in route.cells().windows(2) {
        assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
    }
}

#[test]
fn invalid_configurations_fail_fast() {
    assert!(matches!(
        generate(&config(8, 9, 0)),
        Err(MazeError::InvalidDimensions { width: 8, height: 9 })
    ));
    let maze = MazeConfig {
        start: CellCoord::new(2, 1),
        ..MazeConfig::default()
    };
    assert!(matches!(
        generate(&maze),
        Err(MazeError::InvalidEndpoint { .. })
    ));
}

#[test]
fn spawn_lands_far_from_the_player_start() {
    let grid = generate(&MazeConfig::default()).expect("valid config");
    let spawn = query::spawn_far_from(&grid, grid.start()).expect("start is a passage");
    let mut pathfinder = Pathfinder::default();
    let spawn_route = pathfinder.find_route(&grid, grid.start(), spawn);

    for cell in grid.passages() {
        let route = pathfinder.find_route(&grid, grid.start(), cell);
        assert!(route.steps() <= spawn_route.steps());
    }
}

#[test]
fn keys_land_on_dead_ends() {
    let grid = generate(&config(21, 21, 8)).expect("valid config");
    let dead_ends = query::dead_ends(&grid);
    let reserved = [grid.start(), grid.end()];
    let keys = query::place_keys(&grid, 3, &reserved, 8);
    let available = dead_ends
        .iter()
        .filter(|cell| !reserved.contains(*cell))
        .count();
    assert_eq!(keys.len(), 3_usize.min(available));
    for key in keys {
        assert!(dead_ends.contains(&key));
        assert!(!reserved.contains(&key));
    }
}
