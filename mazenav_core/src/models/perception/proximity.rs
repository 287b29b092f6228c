// mazenav_core/src/models/perception/proximity.rs

use rand::Rng;
use std::f64::consts::TAU;

use crate::models::perception::{line_of_sight, RayTarget, Raycaster, SensorRay};
use crate::types::Pose;
use crate::utils::noise;
use crate::world::Maze;

/// One step's worth of sensor readings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorFrame {
    /// Wall distances, one per sensor, starting at the robot heading.
    pub wall_distances: Vec<f64>,
    /// Range to every landmark, `max_range` for occluded or distant ones.
    pub landmark_ranges: Vec<f64>,
}

/// A ring of evenly spaced proximity sensors plus landmark range sensors.
#[derive(Debug, Clone)]
pub struct SensorModel {
    raycaster: Raycaster,
    sensor_count: usize,
}

impl SensorModel {
    pub fn new(raycaster: Raycaster, sensor_count: usize) -> Self {
        Self {
            raycaster,
            sensor_count,
        }
    }

    pub fn raycaster(&self) -> &Raycaster {
        &self.raycaster
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    /// The ring's scan pattern, relative to the robot heading.
    pub fn generate_rays(&self) -> Vec<SensorRay> {
        let increment = TAU / self.sensor_count as f64;
        (0..self.sensor_count)
            .map(|i| SensorRay {
                id: i as u32,
                offset: i as f64 * increment,
            })
            .collect()
    }

    /// Noise-free wall distances, one per sensor.
    pub fn cast_ring(&self, maze: &Maze, pose: &Pose) -> Vec<f64> {
        self.generate_rays()
            .iter()
            .map(|ray| {
                self.raycaster
                    .cast(maze, pose, pose.theta + ray.offset, RayTarget::Wall)
            })
            .collect()
    }

    /// Casts every wall sensor from `pose`, each reading independently noised.
    ///
    /// A ray that found nothing keeps its `max_range` sentinel untouched.
    pub fn wall_distances<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        pose: &Pose,
        sensor_noise: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        let max_range = self.raycaster.max_range;
        self.cast_ring(maze, pose)
            .into_iter()
            .map(|reading| {
                if reading >= max_range {
                    max_range
                } else {
                    noise::multiplicative(reading, sensor_noise, rng).clamp(0.0, max_range)
                }
            })
            .collect()
    }

    /// Noise-free range to every landmark, `max_range` when occluded or too far.
    pub fn cast_landmarks(&self, maze: &Maze, pose: &Pose) -> Vec<f64> {
        maze.landmarks()
            .iter()
            .map(|landmark| {
                self.raycaster
                    .cast(maze, pose, pose.theta, RayTarget::Landmark(*landmark))
            })
            .collect()
    }

    /// Range to every landmark, noised unless the landmark is occluded.
    pub fn landmark_ranges<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        pose: &Pose,
        sensor_noise: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        let max_range = self.raycaster.max_range;
        self.cast_landmarks(maze, pose)
            .into_iter()
            .map(|reading| {
                if reading >= max_range {
                    max_range
                } else {
                    noise::multiplicative(reading, sensor_noise, rng).max(0.0)
                }
            })
            .collect()
    }

    /// Line of sight from the robot centre to every landmark, against the wall set.
    pub fn landmark_visibility(&self, maze: &Maze, pose: &Pose) -> Vec<bool> {
        let centre = pose.position();
        maze.landmarks()
            .iter()
            .map(|landmark| line_of_sight(&centre, landmark, maze.walls()))
            .collect()
    }

    /// Reads the whole ring and every landmark.
    pub fn read<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        pose: &Pose,
        sensor_noise: f64,
        rng: &mut R,
    ) -> SensorFrame {
        SensorFrame {
            wall_distances: self.wall_distances(maze, pose, sensor_noise, rng),
            landmark_ranges: self.landmark_ranges(maze, pose, sensor_noise, rng),
        }
    }

    /// A noise-free frame, used before the first step.
    pub fn read_exact(&self, maze: &Maze, pose: &Pose) -> SensorFrame {
        SensorFrame {
            wall_distances: self.cast_ring(maze, pose),
            landmark_ranges: self.cast_landmarks(maze, pose),
        }
    }
}
