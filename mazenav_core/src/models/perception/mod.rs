// mazenav_core/src/models/perception/mod.rs

pub mod proximity;

use nalgebra::Point2;

use crate::types::Pose;
use crate::world::{Maze, WallRect};

pub use proximity::{SensorFrame, SensorModel};

/// What a ray is looking for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayTarget {
    /// The first wall cell along the ray.
    Wall,
    /// A known landmark; the ray walks straight towards it.
    Landmark(Point2<f64>),
}

/// Represents a single ray of a sensor's scan pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRay {
    /// Index of the ray within its scan pattern.
    pub id: u32,
    /// Angle relative to the robot heading, in radians.
    pub offset: f64,
}

/// Grid raycaster. Casts from the edge of the robot, never from its centre.
///
/// Every cast is a pure function of the maze and the origin pose. Rays that
/// find nothing report `max_range`, which callers must read as "nothing
/// detected" rather than as a measured distance.
#[derive(Debug, Clone, Copy)]
pub struct Raycaster {
    pub robot_radius: f64,
    pub max_range: f64,
}

impl Raycaster {
    pub fn new(robot_radius: f64, max_range: f64) -> Self {
        Self {
            robot_radius,
            max_range,
        }
    }

    /// Casts one ray at the absolute `angle` from `origin`.
    pub fn cast(&self, maze: &Maze, origin: &Pose, angle: f64, target: RayTarget) -> f64 {
        match target {
            RayTarget::Wall => self.cast_wall(maze, origin, angle),
            RayTarget::Landmark(landmark) => self.cast_landmark(maze, origin, &landmark),
        }
    }

    fn edge_point(&self, origin: &Pose, angle: f64) -> Point2<f64> {
        Point2::new(
            origin.x + self.robot_radius * angle.cos(),
            origin.y + self.robot_radius * angle.sin(),
        )
    }

    /// Steps one unit at a time until a wall cell (or the grid edge) is reached.
    fn cast_wall(&self, maze: &Maze, origin: &Pose, angle: f64) -> f64 {
        let start = self.edge_point(origin, angle);
        let (dx, dy) = (angle.cos(), angle.sin());
        let (mut x, mut y) = (start.x, start.y);
        let mut distance = 0.0;

        while distance < self.max_range {
            x += dx;
            y += dy;
            distance += 1.0;
            if maze.is_blocked_at(x, y) {
                return distance;
            }
        }
        self.max_range
    }

    /// Euclidean centre-to-landmark distance, or `max_range` when the landmark
    /// is out of range or a wall cell lies between the robot edge and it.
    fn cast_landmark(&self, maze: &Maze, origin: &Pose, landmark: &Point2<f64>) -> f64 {
        let distance = nalgebra::distance(&origin.position(), landmark);
        if distance >= self.max_range {
            return self.max_range;
        }

        let bearing = (landmark.y - origin.y).atan2(landmark.x - origin.x);
        let start = self.edge_point(origin, bearing);
        let to_go = nalgebra::distance(&start, landmark);
        if to_go == 0.0 {
            return distance;
        }
        let (dx, dy) = ((landmark.x - start.x) / to_go, (landmark.y - start.y) / to_go);

        let (mut x, mut y) = (start.x, start.y);
        for _ in 0..(to_go as usize) {
            x += dx;
            y += dy;
            if maze.is_blocked_at(x, y) {
                return self.max_range;
            }
        }
        distance
    }
}

/// Whether the straight segment `from -> to` misses every wall rectangle.
pub fn line_of_sight(from: &Point2<f64>, to: &Point2<f64>, walls: &[WallRect]) -> bool {
    !walls.iter().any(|wall| wall.intersects_segment(*from, *to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    // 10 x 5 cells of 40 px with a wall at column 4 in rows 1 and 2.
    const LAYOUT: &str = "\
##########
#...#....#
#.L.#..L.#
#........#
##########
";

    fn maze() -> Maze {
        Maze::from_ascii(LAYOUT, 40.0).unwrap()
    }

    #[test]
    fn wall_ray_stops_at_the_first_wall_cell() {
        let maze = maze();
        let caster = Raycaster::new(13.0, 1000.0);
        let origin = Pose::new(60.0, 60.0, 0.0);
        // Edge at x = 73, the wall cell at col 4 starts at x = 160.
        let east = caster.cast(&maze, &origin, 0.0, RayTarget::Wall);
        assert_abs_diff_eq!(east, 87.0);
        // Looking north, the outer wall ends at y = 40; edge at y = 47.
        let north = caster.cast(&maze, &origin, -FRAC_PI_2, RayTarget::Wall);
        assert_abs_diff_eq!(north, 8.0);
    }

    #[test]
    fn wall_ray_reports_max_range_when_nothing_is_hit() {
        let maze = maze();
        let caster = Raycaster::new(13.0, 20.0);
        let origin = Pose::new(100.0, 120.0, 0.0);
        assert_eq!(caster.cast(&maze, &origin, 0.0, RayTarget::Wall), 20.0);
    }

    #[test]
    fn raycast_is_idempotent() {
        let maze = maze();
        let caster = Raycaster::new(13.0, 1000.0);
        let origin = Pose::new(210.0, 130.0, 0.7);
        for i in 0..12 {
            let angle = origin.theta + i as f64 * PI / 6.0;
            let first = caster.cast(&maze, &origin, angle, RayTarget::Wall);
            let second = caster.cast(&maze, &origin, angle, RayTarget::Wall);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn visible_landmark_reports_centre_distance() {
        let maze = maze();
        let caster = Raycaster::new(13.0, 1000.0);
        let origin = Pose::new(60.0, 100.0, 0.0);
        let landmark = maze.landmarks()[0];
        let range = caster.cast(&maze, &origin, 0.0, RayTarget::Landmark(landmark));
        assert_abs_diff_eq!(range, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn occluded_landmark_reports_max_range() {
        let maze = maze();
        let caster = Raycaster::new(13.0, 1000.0);
        // Same row as the far landmark, with the wall column in between.
        let origin = Pose::new(140.0, 60.0, 0.0);
        let far = Point2::new(300.0, 60.0);
        assert_eq!(caster.cast(&maze, &origin, 0.0, RayTarget::Landmark(far)), 1000.0);
        assert!(!line_of_sight(&origin.position(), &far, maze.walls()));
    }

    #[test]
    fn line_of_sight_through_open_floor() {
        let maze = maze();
        let a = Point2::new(60.0, 140.0);
        let b = Point2::new(300.0, 140.0);
        assert!(line_of_sight(&a, &b, maze.walls()));
    }
}
