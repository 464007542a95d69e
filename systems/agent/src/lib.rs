#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behavior state machine driving the maze agent.
//!
//! Each [`Agent::tick`] first re-evaluates perception when the perception
//! interval elapses, applying state transitions, and then performs the
//! per-state action: standing still while frozen, steering at a visible
//! player, or walking the current route.

mod investigation;
pub mod patrol;

use std::{collections::HashSet, time::Duration};

use glam::Vec3;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use stealth_maze_core::{AgentState, CellCoord, Event, Route, SoundEvent};
use stealth_maze_system_perception::{
    cell_at, cell_center, is_visible, OcclusionQuery, Pose, Viewpoint,
};
use stealth_maze_world::{
    navigation::{Pathfinder, PathfinderConfig},
    Grid,
};

pub use investigation::investigation_target;
pub use patrol::{
    FixedRoutePatrol, Idle, PatrolContext, PatrolStrategy, RandomWander, RewardSeekingExplore,
};
pub use stealth_maze_system_perception::Pose as PlayerPose;

/// Tunables for the agent.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Walking speed along routes, in world units per second.
    pub speed: f32,
    /// Steering speed while chasing a visible player.
    pub chase_speed: f32,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_tolerance: f32,
    /// World-space edge length of a grid cell.
    pub cell_size: f32,
    /// Height of the agent's feet above the ground plane.
    pub height: f32,
    /// Eye offset applied to both viewpoints before occlusion tests.
    pub eye_height: f32,
    /// Agent field of view, in degrees from its facing direction.
    pub view_angle_deg: f32,
    /// Player field of view used to decide whether the agent is watched.
    pub observer_view_angle_deg: f32,
    /// Optional range limit of the agent's sight.
    pub view_radius: Option<f32>,
    /// Sound distance mapped onto the widest investigation radius.
    pub max_sound_radius: f32,
    /// Milliseconds between perception evaluations; zero evaluates every tick.
    pub perception_interval_ms: u64,
    /// Horizontal distance at which a chased player is caught.
    pub capture_distance: f32,
    /// Seed of the stream used for investigation targets.
    pub seed: u64,
}

impl AgentConfig {
    /// Time between perception evaluations.
    #[must_use]
    pub const fn perception_interval(&self) -> Duration {
        Duration::from_millis(self.perception_interval_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            chase_speed: 3.0,
            waypoint_tolerance: 0.1,
            cell_size: 2.0,
            height: 0.0,
            eye_height: 1.0,
            view_angle_deg: 60.0,
            observer_view_angle_deg: 60.0,
            view_radius: None,
            max_sound_radius: 7.0,
            perception_interval_ms: 100,
            capture_distance: 1.0,
            seed: 0,
        }
    }
}

/// Inputs sampled by the host for a single agent tick.
#[derive(Clone, Copy)]
pub struct TickInput<'a> {
    /// Time elapsed since the previous tick.
    pub dt: Duration,
    /// Maze the agent moves through.
    pub grid: &'a Grid,
    /// Player pose, when a player is present.
    pub player: Option<PlayerPose>,
    /// Line-of-sight collaborator; visibility is skipped without one.
    pub occlusion: Option<&'a dyn OcclusionQuery>,
    /// Sound emitted since the previous tick.
    pub sound: Option<SoundEvent>,
}

impl<'a> TickInput<'a> {
    /// Creates an input with no player, occlusion or sound.
    #[must_use]
    pub const fn new(dt: Duration, grid: &'a Grid) -> Self {
        Self {
            dt,
            grid,
            player: None,
            occlusion: None,
            sound: None,
        }
    }

    /// Attaches the player pose and the occlusion query used to see it.
    #[must_use]
    pub fn with_player(
        mut self,
        player: PlayerPose,
        occlusion: &'a dyn OcclusionQuery,
    ) -> Self {
        self.player = Some(player);
        self.occlusion = Some(occlusion);
        self
    }

    /// Attaches a sound heard during this tick.
    #[must_use]
    pub fn with_sound(mut self, sound: SoundEvent) -> Self {
        self.sound = Some(sound);
        self
    }
}

/// Result of a single agent tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutcome {
    /// Cell the agent is currently heading for.
    pub waypoint: Option<CellCoord>,
    /// State after the tick.
    pub state: AgentState,
    /// Continuous world position after the tick.
    pub position: Vec3,
    /// Whether the agent caught the player this tick.
    pub captured: bool,
}

/// Autonomous maze agent that patrols, investigates, chases and freezes.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    state: AgentState,
    previous_state: AgentState,
    cell: CellCoord,
    position: Vec3,
    forward: Vec3,
    route: Route,
    path_index: usize,
    investigation_target: Option<CellCoord>,
    last_sound: Option<CellCoord>,
    pending_sound: Option<SoundEvent>,
    last_seen_player: Option<CellCoord>,
    sees_player: bool,
    search_planned: bool,
    perception_primed: bool,
    perception_accumulator: Duration,
    visited: HashSet<CellCoord>,
    pathfinder: Pathfinder,
    strategy: Box<dyn PatrolStrategy>,
    rng: ChaCha8Rng,
}

impl Agent {
    /// Creates an agent standing on `spawn`, patrolling with `strategy`.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        spawn: CellCoord,
        strategy: Box<dyn PatrolStrategy>,
        pathfinder: PathfinderConfig,
    ) -> Self {
        Self {
            config,
            state: AgentState::Patrolling,
            previous_state: AgentState::Patrolling,
            cell: spawn,
            position: cell_center(spawn, config.cell_size, config.height),
            forward: Vec3::X,
            route: Route::unreachable(),
            path_index: 0,
            investigation_target: None,
            last_sound: None,
            pending_sound: None,
            last_seen_player: None,
            sees_player: false,
            search_planned: false,
            perception_primed: false,
            perception_accumulator: Duration::ZERO,
            visited: HashSet::from([spawn]),
            pathfinder: Pathfinder::new(pathfinder),
            strategy,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Overrides the facing direction.
    #[must_use]
    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward;
        self
    }

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// State restored once the agent stops being watched.
    #[must_use]
    pub const fn previous_state(&self) -> AgentState {
        self.previous_state
    }

    /// Index of the waypoint the agent is walking toward.
    #[must_use]
    pub const fn path_index(&self) -> usize {
        self.path_index
    }

    /// Route currently being followed.
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// Target chosen for the latest investigated sound.
    #[must_use]
    pub const fn investigation_target(&self) -> Option<CellCoord> {
        self.investigation_target
    }

    /// Grid cell the agent occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Continuous world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Facing direction.
    #[must_use]
    pub const fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Cell where the player was last seen.
    #[must_use]
    pub const fn last_seen_player(&self) -> Option<CellCoord> {
        self.last_seen_player
    }

    /// Cells the agent has stood on.
    #[must_use]
    pub fn visited(&self) -> &HashSet<CellCoord> {
        &self.visited
    }

    /// Advances the agent by one tick.
    pub fn tick(&mut self, input: TickInput<'_>, out: &mut Vec<Event>) -> TickOutcome {
        if let Some(sound) = input.sound {
            self.pending_sound = Some(sound);
        }

        if self.perception_due(input.dt) {
            self.evaluate(&input, out);
        }

        let captured = match self.state {
            AgentState::Frozen => false,
            AgentState::Chasing if self.sees_player => {
                if let Some(player) = input.player {
                    self.steer_toward(input.grid, player.position, input.dt);
                }
                self.check_capture(&input, out)
            }
            AgentState::Chasing => {
                self.follow_route(input.dt, out);
                self.check_capture(&input, out)
            }
            AgentState::Investigating => {
                self.follow_route(input.dt, out);
                false
            }
            AgentState::Patrolling => {
                if self.route_exhausted() {
                    self.next_patrol_leg(input.grid, out);
                }
                self.follow_route(input.dt, out);
                false
            }
        };

        TickOutcome {
            waypoint: self.current_waypoint(),
            state: self.state,
            position: self.position,
            captured,
        }
    }

    fn perception_due(&mut self, dt: Duration) -> bool {
        if !self.perception_primed {
            self.perception_primed = true;
            self.perception_accumulator = Duration::ZERO;
            return true;
        }

        let interval = self.config.perception_interval();
        if interval.is_zero() {
            return true;
        }

        self.perception_accumulator = self.perception_accumulator.saturating_add(dt);
        if self.perception_accumulator < interval {
            return false;
        }
        while self.perception_accumulator >= interval {
            self.perception_accumulator -= interval;
        }
        true
    }

    fn evaluate(&mut self, input: &TickInput<'_>, out: &mut Vec<Event>) {
        let (Some(player), Some(occlusion)) = (input.player, input.occlusion) else {
            // Nothing observable this tick: frozen and chasing agents hold.
            if !matches!(self.state, AgentState::Frozen | AgentState::Chasing) {
                self.evaluate_unseen(input.grid, out);
            }
            return;
        };

        let watched = self.watched_by(player, occlusion);
        let sees_player = self.can_see(player, occlusion);
        self.sees_player = sees_player;

        if watched {
            if self.state != AgentState::Frozen {
                self.previous_state = self.state;
                self.transition(AgentState::Frozen, out);
            }
            return;
        }

        if self.state == AgentState::Frozen {
            self.transition(self.previous_state, out);
        }

        if sees_player {
            self.last_seen_player = cell_at(player.position, self.config.cell_size)
                .filter(|cell| input.grid.contains(*cell));
            self.discard_route();
            self.search_planned = false;
            if let Some(sound) = self.pending_sound.take() {
                self.last_sound = Some(sound.location());
            }
            if self.state != AgentState::Chasing {
                self.investigation_target = None;
                self.transition(AgentState::Chasing, out);
            }
            return;
        }

        self.evaluate_unseen(input.grid, out);
    }

    /// Transitions that apply while the player is out of sight.
    fn evaluate_unseen(&mut self, grid: &Grid, out: &mut Vec<Event>) {
        if let Some(sound) = self.pending_sound.take() {
            let location = sound.location();
            if self.last_sound != Some(location) {
                self.last_sound = Some(location);
                self.investigate(grid, location, out);
            }
        }

        if self.state == AgentState::Chasing && !self.search_planned {
            self.search_planned = true;
            match self.last_seen_player {
                Some(last_seen) => self.plan_route(grid, last_seen, out),
                None => self.discard_route(),
            }
        }

        let finished = match self.state {
            AgentState::Chasing => self.route_exhausted(),
            AgentState::Investigating => !self.route.is_empty() && self.route_exhausted(),
            _ => false,
        };
        if finished {
            self.investigation_target = None;
            self.transition(AgentState::Patrolling, out);
        }
    }

    fn watched_by(&self, player: PlayerPose, occlusion: &dyn OcclusionQuery) -> bool {
        let observer = Viewpoint::from_pose(player, self.config.observer_view_angle_deg)
            .with_eye_height(self.config.eye_height);
        is_visible(&observer, self.position, occlusion)
    }

    fn can_see(&self, player: PlayerPose, occlusion: &dyn OcclusionQuery) -> bool {
        let viewer = Viewpoint::from_pose(
            Pose::new(self.position, self.forward),
            self.config.view_angle_deg,
        )
        .with_eye_height(self.config.eye_height)
        .with_view_radius(self.config.view_radius);
        is_visible(&viewer, player.position, occlusion)
    }

    fn investigate(&mut self, grid: &Grid, sound: CellCoord, out: &mut Vec<Event>) {
        let target = investigation_target(
            grid,
            self.cell,
            sound,
            self.config.max_sound_radius,
            &mut self.rng,
        );
        debug!("sound at {sound:?}, investigating {target:?}");
        self.investigation_target = Some(target);
        self.plan_route(grid, target, out);
        self.transition(AgentState::Investigating, out);
    }

    fn next_patrol_leg(&mut self, grid: &Grid, out: &mut Vec<Event>) {
        let context = PatrolContext {
            grid,
            cell: self.cell,
            visited: &self.visited,
        };
        let Some(target) = self.strategy.next_target(&context) else {
            self.discard_route();
            return;
        };
        self.plan_route(grid, target, out);
    }

    fn plan_route(&mut self, grid: &Grid, goal: CellCoord, out: &mut Vec<Event>) {
        let from = self.cell;
        self.route = self.pathfinder.find_route(grid, from, goal);
        self.path_index = 0;
        if self.route.is_empty() {
            warn!("agent at {from:?} has no route to {goal:?}");
            out.push(Event::RouteUnavailable { from, to: goal });
        } else {
            out.push(Event::RoutePlanned {
                from,
                to: goal,
                length: self.route.len(),
            });
        }
    }

    fn discard_route(&mut self) {
        self.route = Route::unreachable();
        self.path_index = 0;
    }

    fn route_exhausted(&self) -> bool {
        self.path_index >= self.route.len()
    }

    fn current_waypoint(&self) -> Option<CellCoord> {
        if self.state == AgentState::Chasing && self.sees_player {
            return self.last_seen_player;
        }
        self.route.get(self.path_index)
    }

    fn follow_route(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let mut budget = self.config.speed * dt.as_secs_f32();
        while let Some(waypoint) = self.route.get(self.path_index) {
            let target = cell_center(waypoint, self.config.cell_size, self.config.height);
            let offset = target - self.position;
            let distance = offset.length();
            if distance <= self.config.waypoint_tolerance {
                self.position = target;
                self.arrive(waypoint, out);
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            let direction = offset / distance;
            let travel = budget.min(distance);
            self.forward = direction;
            self.position += direction * travel;
            budget -= travel;
        }
    }

    fn arrive(&mut self, cell: CellCoord, out: &mut Vec<Event>) {
        self.cell = cell;
        let _ = self.visited.insert(cell);
        out.push(Event::WaypointReached {
            cell,
            index: self.path_index,
        });
        self.path_index += 1;
    }

    fn steer_toward(&mut self, grid: &Grid, target: Vec3, dt: Duration) {
        let offset = Vec3::new(target.x - self.position.x, 0.0, target.z - self.position.z);
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }

        let direction = offset / distance;
        let travel = (self.config.chase_speed * dt.as_secs_f32()).min(distance);
        self.forward = direction;
        self.position += direction * travel;

        if let Some(cell) = cell_at(self.position, self.config.cell_size) {
            if grid.contains(cell) && grid.is_walkable(cell) && cell != self.cell {
                self.cell = cell;
                let _ = self.visited.insert(cell);
            }
        }
    }

    fn check_capture(&self, input: &TickInput<'_>, out: &mut Vec<Event>) -> bool {
        let Some(player) = input.player else {
            return false;
        };
        let dx = player.position.x - self.position.x;
        let dz = player.position.z - self.position.z;
        if (dx * dx + dz * dz).sqrt() > self.config.capture_distance {
            return false;
        }
        info!("agent caught the player at {:?}", self.cell);
        out.push(Event::PlayerCaught { cell: self.cell });
        true
    }

    fn transition(&mut self, to: AgentState, out: &mut Vec<Event>) {
        let from = self.state;
        if from == to {
            return;
        }
        info!("agent {from:?} -> {to:?} at {:?}", self.cell);
        self.state = to;
        out.push(Event::StateChanged { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_maze_system_perception::RayHit;

    fn corridor() -> Grid {
        Grid::from_rows(&["#########", "#S.....E#", "#########"]).expect("valid layout")
    }

    fn config() -> AgentConfig {
        AgentConfig {
            perception_interval_ms: 0,
            ..AgentConfig::default()
        }
    }

    fn clear(_: Vec3, _: Vec3) -> RayHit {
        RayHit::Target
    }

    #[test]
    fn perception_runs_on_first_tick_then_on_interval() {
        let grid = corridor();
        let mut agent = Agent::new(
            AgentConfig::default(),
            CellCoord::new(1, 1),
            Box::new(Idle),
            PathfinderConfig::default(),
        );
        assert!(agent.perception_due(Duration::from_millis(10)));
        assert!(!agent.perception_due(Duration::from_millis(60)));
        assert!(agent.perception_due(Duration::from_millis(60)));
        assert!(!agent.perception_due(Duration::from_millis(10)));

        let mut events = Vec::new();
        let outcome = agent.tick(TickInput::new(Duration::from_millis(10), &grid), &mut events);
        assert_eq!(outcome.state, AgentState::Patrolling);
        assert!(events.is_empty());
    }

    #[test]
    fn idle_patrol_stays_put() {
        let grid = corridor();
        let mut agent = Agent::new(
            config(),
            CellCoord::new(2, 1),
            Box::new(Idle),
            PathfinderConfig::default(),
        );
        let mut events = Vec::new();
        let start = agent.position();
        for _ in 0..10 {
            let outcome = agent.tick(TickInput::new(Duration::from_millis(50), &grid), &mut events);
            assert_eq!(outcome.position, start);
            assert_eq!(outcome.waypoint, None);
        }
    }

    #[test]
    fn walking_snaps_onto_waypoints() {
        let grid = corridor();
        let mut agent = Agent::new(
            config(),
            CellCoord::new(1, 1),
            Box::new(FixedRoutePatrol::new(vec![CellCoord::new(3, 1)])),
            PathfinderConfig::default(),
        );
        let mut events = Vec::new();
        for _ in 0..30 {
            let _ = agent.tick(TickInput::new(Duration::from_millis(100), &grid), &mut events);
            if agent.cell() == CellCoord::new(3, 1) {
                break;
            }
        }
        assert_eq!(agent.cell(), CellCoord::new(3, 1));
        assert_eq!(agent.position(), Vec3::new(6.0, 0.0, 2.0));
        assert!(agent.visited().contains(&CellCoord::new(2, 1)));
        assert!(events.contains(&Event::WaypointReached {
            cell: CellCoord::new(3, 1),
            index: 2,
        }));
    }

    #[test]
    fn repeated_sounds_are_processed_once() {
        let grid = corridor();
        let mut agent = Agent::new(
            config(),
            CellCoord::new(1, 1),
            Box::new(Idle),
            PathfinderConfig::default(),
        );
        let mut events = Vec::new();
        let sound = SoundEvent::at(CellCoord::new(2, 1));
        let dt = Duration::from_millis(1);
        let _ = agent.tick(TickInput::new(dt, &grid).with_sound(sound), &mut events);
        let planned = events
            .iter()
            .filter(|event| matches!(event, Event::RoutePlanned { .. }))
            .count();
        let _ = agent.tick(TickInput::new(dt, &grid).with_sound(sound), &mut events);
        let replanned = events
            .iter()
            .filter(|event| matches!(event, Event::RoutePlanned { .. }))
            .count();
        assert_eq!(planned, 1);
        assert_eq!(replanned, 1);
        assert_eq!(agent.state(), AgentState::Investigating);
    }

    #[test]
    fn sounds_are_ignored_while_the_player_is_in_sight() {
        let grid = corridor();
        let occlusion = clear;
        let mut agent = Agent::new(
            config(),
            CellCoord::new(1, 1),
            Box::new(Idle),
            PathfinderConfig::default(),
        );
        let player = PlayerPose::new(cell_center(CellCoord::new(6, 1), 2.0, 0.0), Vec3::X);
        let mut events = Vec::new();
        let input = TickInput::new(Duration::from_millis(1), &grid)
            .with_player(player, &occlusion)
            .with_sound(SoundEvent::at(CellCoord::new(4, 1)));
        let outcome = agent.tick(input, &mut events);
        assert_eq!(outcome.state, AgentState::Chasing);
        assert_eq!(agent.investigation_target(), None);
        assert_eq!(agent.last_seen_player(), Some(CellCoord::new(6, 1)));
        assert_eq!(outcome.waypoint, Some(CellCoord::new(6, 1)));
    }
}
