#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Field-of-view and line-of-sight checks shared by the agent and the player.
//!
//! The same [`is_visible`] contract answers both "is the agent watched by the
//! player" and "can the agent see the player"; only the viewpoint and the
//! target swap places. Occlusion is delegated to an [`OcclusionQuery`] so a
//! physics engine, or the maze itself through [`GridOcclusion`], can answer
//! the ray test.

use glam::Vec3;
use stealth_maze_core::CellCoord;
use stealth_maze_world::Grid;

/// Outcome of a nearest-hit ray test between an observer and a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayHit {
    /// The first thing the ray met was the target itself.
    Target,
    /// Something else blocks the line before the target.
    Obstacle,
    /// The ray met nothing at all.
    Nothing,
}

/// Line-of-sight collaborator answering a single nearest-hit ray test.
pub trait OcclusionQuery {
    /// Casts a ray from `from` toward `to` and reports what it hits first.
    fn nearest_hit(&self, from: Vec3, to: Vec3) -> RayHit;
}

impl<F> OcclusionQuery for F
where
    F: Fn(Vec3, Vec3) -> RayHit,
{
    fn nearest_hit(&self, from: Vec3, to: Vec3) -> RayHit {
        self(from, to)
    }
}

/// World-space position and facing of an actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Position in world units; `y` points up.
    pub position: Vec3,
    /// Facing direction; only its horizontal part matters.
    pub forward: Vec3,
}

impl Pose {
    /// Creates a pose from a position and a facing direction.
    #[must_use]
    pub const fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }
}

/// Everything an observer contributes to a visibility test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewpoint {
    /// Observer position before the eye-height offset.
    pub position: Vec3,
    /// Facing direction of the observer.
    pub forward: Vec3,
    /// Targets must sit strictly inside this angle from `forward`, in degrees.
    pub view_angle_deg: f32,
    /// Vertical offset applied to `position` before the occlusion test.
    pub eye_height: f32,
    /// Optional horizontal range limit.
    pub view_radius: Option<f32>,
}

impl Viewpoint {
    /// Creates a viewpoint looking along the pose's facing direction.
    #[must_use]
    pub const fn from_pose(pose: Pose, view_angle_deg: f32) -> Self {
        Self {
            position: pose.position,
            forward: pose.forward,
            view_angle_deg,
            eye_height: 0.0,
            view_radius: None,
        }
    }

    /// Overrides the eye-height offset.
    #[must_use]
    pub fn with_eye_height(mut self, eye_height: f32) -> Self {
        self.eye_height = eye_height;
        self
    }

    /// Limits visibility to the provided horizontal range.
    #[must_use]
    pub fn with_view_radius(mut self, view_radius: Option<f32>) -> Self {
        self.view_radius = view_radius;
        self
    }

    /// Position the occlusion ray starts from.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * self.eye_height
    }
}

/// Angle in degrees between two directions projected onto the ground plane.
///
/// Degenerate directions with no horizontal extent report `0.0`.
#[must_use]
pub fn horizontal_angle_deg(forward: Vec3, direction: Vec3) -> f32 {
    let forward = flatten(forward);
    let direction = flatten(direction);
    let denominator = (forward.length_squared() * direction.length_squared()).sqrt();
    if denominator <= f32::EPSILON {
        return 0.0;
    }

    let cosine = (forward.dot(direction) / denominator).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Reports whether `target` is visible from the viewpoint.
///
/// The target must lie strictly inside the view angle, within the optional
/// view radius, and the occlusion ray from the eye must hit the target
/// before anything else.
#[must_use]
pub fn is_visible(viewer: &Viewpoint, target: Vec3, occlusion: &dyn OcclusionQuery) -> bool {
    let offset = target - viewer.position;
    if let Some(radius) = viewer.view_radius {
        if flatten(offset).length() > radius {
            return false;
        }
    }

    if horizontal_angle_deg(viewer.forward, offset) >= viewer.view_angle_deg {
        return false;
    }

    occlusion.nearest_hit(viewer.eye(), target) == RayHit::Target
}

/// Grid cell containing the world position, if it is not left of or above
/// the origin.
#[must_use]
pub fn cell_at(position: Vec3, cell_size: f32) -> Option<CellCoord> {
    if cell_size <= 0.0 {
        return None;
    }
    let column = (position.x / cell_size).round();
    let row = (position.z / cell_size).round();
    if column < 0.0 || row < 0.0 || !column.is_finite() || !row.is_finite() {
        return None;
    }
    Some(CellCoord::new(column as u32, row as u32))
}

/// World position of the centre of a cell at the given height.
#[must_use]
pub fn cell_center(cell: CellCoord, cell_size: f32, height: f32) -> Vec3 {
    Vec3::new(
        cell.column() as f32 * cell_size,
        height,
        cell.row() as f32 * cell_size,
    )
}

/// Occlusion backed by the maze walls.
///
/// The ray is sampled along the ground plane; the first sample landing in a
/// wall cell, or outside the grid, reports [`RayHit::Obstacle`].
#[derive(Clone, Copy, Debug)]
pub struct GridOcclusion<'a> {
    grid: &'a Grid,
    cell_size: f32,
    samples_per_cell: u32,
}

impl<'a> GridOcclusion<'a> {
    /// Creates an occlusion query over the grid with the given cell size.
    #[must_use]
    pub fn new(grid: &'a Grid, cell_size: f32) -> Self {
        Self {
            grid,
            cell_size,
            samples_per_cell: 4,
        }
    }

    fn blocked(&self, point: Vec3) -> bool {
        match cell_at(point, self.cell_size) {
            Some(cell) if self.grid.contains(cell) => !self.grid.is_walkable(cell),
            _ => true,
        }
    }
}

impl OcclusionQuery for GridOcclusion<'_> {
    fn nearest_hit(&self, from: Vec3, to: Vec3) -> RayHit {
        let span = flatten(to - from);
        let length = span.length();
        if self.cell_size <= 0.0 {
            return RayHit::Nothing;
        }

        let step = self.cell_size / self.samples_per_cell as f32;
        let samples = (length / step).ceil() as u32;
        for sample in 0..=samples {
            let t = if samples == 0 {
                1.0
            } else {
                sample as f32 / samples as f32
            };
            if self.blocked(from + span * t) {
                return RayHit::Obstacle;
            }
        }
        RayHit::Target
    }
}

fn flatten(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, 0.0, vector.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_ignores_vertical_displacement() {
        let angle = horizontal_angle_deg(Vec3::X, Vec3::new(3.0, 50.0, 0.0));
        assert!(angle.abs() < 1e-4);
    }

    #[test]
    fn angle_reports_perpendicular_and_opposite_directions() {
        assert!((horizontal_angle_deg(Vec3::X, Vec3::Z) - 90.0).abs() < 1e-3);
        assert!((horizontal_angle_deg(Vec3::X, -Vec3::X) - 180.0).abs() < 1e-3);
        assert_eq!(horizontal_angle_deg(Vec3::X, Vec3::Y), 0.0);
    }

    #[test]
    fn cell_at_rounds_to_the_nearest_centre() {
        assert_eq!(cell_at(Vec3::new(2.9, 0.0, 5.1), 2.0), Some(CellCoord::new(1, 3)));
        assert_eq!(cell_at(Vec3::new(-1.5, 0.0, 0.0), 2.0), None);
        assert_eq!(cell_at(Vec3::ZERO, 0.0), None);
    }

    #[test]
    fn cell_center_scales_by_cell_size() {
        assert_eq!(
            cell_center(CellCoord::new(3, 2), 2.0, 1.0),
            Vec3::new(6.0, 1.0, 4.0)
        );
    }

    #[test]
    fn closures_act_as_occlusion_queries() {
        let viewer = Viewpoint::from_pose(Pose::new(Vec3::ZERO, Vec3::X), 60.0)
            .with_eye_height(1.5);
        let seen_from = std::cell::Cell::new(Vec3::ZERO);
        let query = |from: Vec3, _to: Vec3| {
            seen_from.set(from);
            RayHit::Nothing
        };
        assert!(!is_visible(&viewer, Vec3::new(4.0, 0.0, 0.0), &query));
        assert_eq!(seen_from.get(), Vec3::new(0.0, 1.5, 0.0));
    }
}
