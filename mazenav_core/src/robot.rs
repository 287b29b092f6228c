// mazenav_core/src/robot.rs

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Point2};
use rand::Rng;
use tracing::{debug, info, trace};

use crate::config::RobotConfig;
use crate::error::RobotError;
use crate::estimation::ExtendedKalmanFilter;
use crate::models::collision::{Arena, ContactSet, Footprint};
use crate::models::dynamics::{diff_drive_step, DiffDriveKinematics};
use crate::models::measurement::{LandmarkBearingRange, MeasurementModel};
use crate::models::perception::{Raycaster, SensorFrame, SensorModel};
use crate::types::{wrap_to_pi, Pose, WheelCommand};
use crate::utils::noise;
use crate::world::Maze;

/// Everything a caller sees after one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Wall and landmark readings taken after the move.
    pub sensors: SensorFrame,
    /// Ground-truth pose after collision resolution.
    pub pose: Pose,
    /// The filter's pose estimate after this step.
    pub estimate: Pose,
    /// True when walls or the arena edge altered the motion.
    pub collided: bool,
    pub contacts: ContactSet,
    /// Whether predict/correct ran on this step.
    pub filter_ran: bool,
    /// Landmarks in line of sight, counted on filter steps only.
    pub visible_landmarks: usize,
}

/// The robot: ground truth, sensors, and the filter tracking it.
///
/// One [`Robot::step`] injects wheel noise, moves the robot, resolves
/// collisions, reads the wall sensors and, every `kalman_call_interval`
/// steps, runs the filter's predict and correct.
#[derive(Debug, Clone)]
pub struct Robot {
    maze: Arc<Maze>,
    config: RobotConfig,

    pose: Pose,
    footprint: Footprint,
    arena: Arena,
    sensors: SensorModel,
    measurement: LandmarkBearingRange,
    filter: ExtendedKalmanFilter,

    // --- Runtime tuning ---
    wheel_noise: f64,
    sensor_noise: f64,
    kalman_call_interval: u32,

    step_count: u64,
    /// Commands issued since the filter last ran, oldest first.
    pending_commands: Vec<WheelCommand>,
    sensor_frame: SensorFrame,

    // --- History ---
    past_positions: Vec<Point2<f64>>,
    estimated_positions: Vec<Point2<f64>>,
    beacon_counts: Vec<usize>,
}

impl Robot {
    /// Places a robot at `start` inside `maze`.
    pub fn new(maze: Arc<Maze>, start: Pose, config: RobotConfig) -> Result<Self, RobotError> {
        config.validate()?;

        let start = Pose::new(start.x, start.y, start.theta);
        let r = config.radius;
        let arena = Arena {
            width: maze.width(),
            height: maze.height(),
        };
        if start.x < r || start.x > arena.width - r || start.y < r || start.y > arena.height - r {
            return Err(RobotError::StartOutsideArena {
                x: start.x,
                y: start.y,
            });
        }

        let footprint = Footprint::new(r);
        if footprint.overlaps_any(&start, maze.walls()) {
            return Err(RobotError::StartInsideWall {
                x: start.x,
                y: start.y,
            });
        }
        let sensors = SensorModel::new(
            Raycaster::new(r, config.sensor_max_range),
            config.sensor_count,
        );
        let measurement = LandmarkBearingRange::new(maze.landmarks().to_vec());
        let filter = Self::build_filter(&config, &start, measurement.landmark_count())?;
        let sensor_frame = sensors.read_exact(&maze, &start);

        info!(
            x = start.x,
            y = start.y,
            landmarks = measurement.landmark_count(),
            "robot placed"
        );

        Ok(Self {
            wheel_noise: config.wheel_noise,
            sensor_noise: config.sensor_noise,
            kalman_call_interval: config.kalman_call_interval,
            maze,
            config,
            pose: start,
            footprint,
            arena,
            sensors,
            measurement,
            filter,
            step_count: 0,
            pending_commands: Vec::new(),
            sensor_frame,
            past_positions: vec![start.position()],
            estimated_positions: vec![start.position()],
            beacon_counts: vec![0],
        })
    }

    fn build_filter(
        config: &RobotConfig,
        start: &Pose,
        landmark_count: usize,
    ) -> Result<ExtendedKalmanFilter, RobotError> {
        let filter_config = &config.filter;
        let filter = ExtendedKalmanFilter::new(
            start.to_state(),
            diagonal(filter_config.initial_covariance),
            diagonal(filter_config.process_noise),
            DVector::from_element(
                2 * landmark_count,
                filter_config.initial_measurement_variance,
            ),
            Box::new(DiffDriveKinematics {
                wheel_base: config.wheel_base(),
            }),
        )?;
        Ok(filter)
    }

    // --- Simulation ---

    /// Advances the simulation by one step under `command`.
    ///
    /// The command is expected in `[-1, 1]` per wheel. Noise is drawn from `rng`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        command: WheelCommand,
        rng: &mut R,
    ) -> Result<StepOutcome, RobotError> {
        // 1. Inject wheel noise.
        let noisy = WheelCommand::new(
            noise::multiplicative(command.v_left, self.wheel_noise, rng),
            noise::multiplicative(command.v_right, self.wheel_noise, rng),
        );

        // 2. Kinematics, then collision resolution and the arena clamp.
        let candidate = diff_drive_step(&self.pose, &noisy, self.config.dt, self.config.wheel_base());
        let resolution = self
            .footprint
            .resolve(&self.pose, &candidate, self.maze.walls(), &self.arena);
        if resolution.collided {
            debug!(step = self.step_count, contacts = ?resolution.contacts, "motion clamped");
        }
        self.pose = resolution.pose;

        // 3. Sensors.
        self.sensor_frame = self
            .sensors
            .read(&self.maze, &self.pose, self.sensor_noise, rng);

        // 4. Filter, on every `kalman_call_interval`-th step.
        self.pending_commands.push(command);
        let filter_ran = self.step_count % u64::from(self.kalman_call_interval) == 0;
        let visible_landmarks = if filter_ran {
            let visible = self.run_filter(rng)?;
            self.beacon_counts.push(visible);
            visible
        } else {
            0
        };

        // 5. History.
        let estimate = self.filter.pose();
        self.past_positions.push(self.pose.position());
        self.estimated_positions.push(estimate.position());
        self.step_count += 1;

        trace!(
            step = self.step_count,
            x = self.pose.x,
            y = self.pose.y,
            est_x = estimate.x,
            est_y = estimate.y,
            "step"
        );

        Ok(StepOutcome {
            sensors: self.sensor_frame.clone(),
            pose: self.pose,
            estimate,
            collided: resolution.collided,
            contacts: resolution.contacts,
            filter_ran,
            visible_landmarks,
        })
    }

    /// Predicts once per command issued since the last run, then corrects
    /// against the gated landmark observations.
    fn run_filter<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, RobotError> {
        for command in self.pending_commands.drain(..) {
            self.filter.predict(&command.to_control(), self.config.dt)?;
        }

        if self.measurement.landmark_count() == 0 {
            debug!("no landmarks, skipping correction");
            return Ok(0);
        }

        let visibility = self.sensors.landmark_visibility(&self.maze, &self.pose);
        let filter_config = &self.config.filter;
        for (index, visible) in visibility.iter().enumerate() {
            let variance = if *visible {
                filter_config.visible_variance
            } else {
                filter_config.occluded_variance
            };
            self.filter.set_measurement_noise_for(index, variance)?;
        }

        let z = self.observe_landmarks(rng);
        self.filter.correct(&z, &self.measurement)?;

        Ok(visibility.iter().filter(|v| **v).count())
    }

    /// Noisy `[bearing, range]` of every landmark from the true pose.
    ///
    /// Occluded landmarks are observed too; the filter down-weights them
    /// through `R` instead of shrinking the measurement vector.
    fn observe_landmarks<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let mut z = self.measurement.predict_measurement(&self.pose.to_state());
        for (i, value) in z.iter_mut().enumerate() {
            let noisy = noise::multiplicative(*value, self.sensor_noise, rng);
            *value = if self.measurement.is_angular(i) {
                wrap_to_pi(noisy)
            } else {
                noisy
            };
        }
        z
    }

    // --- Runtime tuning ---

    pub fn set_wheel_noise(&mut self, level: f64) -> Result<(), RobotError> {
        self.wheel_noise = non_negative("wheel_noise", level)?;
        Ok(())
    }

    pub fn set_sensor_noise(&mut self, level: f64) -> Result<(), RobotError> {
        self.sensor_noise = non_negative("sensor_noise", level)?;
        Ok(())
    }

    pub fn set_kalman_call_interval(&mut self, interval: u32) -> Result<(), RobotError> {
        if interval == 0 {
            return Err(RobotError::InvalidConfig(
                "kalman_call_interval must be at least 1".to_string(),
            ));
        }
        self.kalman_call_interval = interval;
        Ok(())
    }

    /// Puts noise levels, the filter interval and the filter noise back to
    /// the configured values. Pose, estimate and history are kept.
    pub fn restore_defaults(&mut self) -> Result<(), RobotError> {
        self.wheel_noise = self.config.wheel_noise;
        self.sensor_noise = self.config.sensor_noise;
        self.kalman_call_interval = self.config.kalman_call_interval;

        let filter_config = &self.config.filter;
        self.filter
            .set_process_noise(diagonal(filter_config.process_noise))?;
        self.filter.set_measurement_noise(DVector::from_element(
            2 * self.measurement.landmark_count(),
            filter_config.initial_measurement_variance,
        ))?;
        Ok(())
    }

    pub fn filter(&self) -> &ExtendedKalmanFilter {
        &self.filter
    }

    /// Direct access for `set_process_noise` / `set_measurement_noise_for`.
    pub fn filter_mut(&mut self) -> &mut ExtendedKalmanFilter {
        &mut self.filter
    }

    // --- Accessors ---

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn estimate(&self) -> Pose {
        self.filter.pose()
    }

    pub fn wall_distances(&self) -> &[f64] {
        &self.sensor_frame.wall_distances
    }

    pub fn sensor_frame(&self) -> &SensorFrame {
        &self.sensor_frame
    }

    pub fn landmark_visibility(&self) -> Vec<bool> {
        self.sensors.landmark_visibility(&self.maze, &self.pose)
    }

    pub fn maze(&self) -> &Arc<Maze> {
        &self.maze
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn sensors(&self) -> &SensorModel {
        &self.sensors
    }

    pub fn wheel_noise(&self) -> f64 {
        self.wheel_noise
    }

    pub fn sensor_noise(&self) -> f64 {
        self.sensor_noise
    }

    pub fn kalman_call_interval(&self) -> u32 {
        self.kalman_call_interval
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn past_positions(&self) -> &[Point2<f64>] {
        &self.past_positions
    }

    pub fn estimated_positions(&self) -> &[Point2<f64>] {
        &self.estimated_positions
    }

    pub fn beacon_counts(&self) -> &[usize] {
        &self.beacon_counts
    }
}

fn diagonal(values: [f64; 3]) -> DMatrix<f64> {
    DMatrix::from_diagonal(&DVector::from_column_slice(&values))
}

fn non_negative(name: &str, value: f64) -> Result<f64, RobotError> {
    if !(value >= 0.0 && value.is_finite()) {
        return Err(RobotError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    const LAYOUT: &str = "\
##########
#........#
#..L.....#
#........#
#.....L..#
#........#
##########
";

    fn maze() -> Arc<Maze> {
        Arc::new(Maze::from_ascii(LAYOUT, 40.0).unwrap())
    }

    fn quiet_config() -> RobotConfig {
        RobotConfig {
            wheel_noise: 0.0,
            sensor_noise: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn histories_start_with_the_initial_entry() {
        let robot = Robot::new(maze(), Pose::new(200.0, 140.0, 0.0), RobotConfig::default()).unwrap();
        assert_eq!(robot.past_positions(), &[Point2::new(200.0, 140.0)]);
        assert_eq!(robot.estimated_positions().len(), 1);
        assert_eq!(robot.beacon_counts(), &[0]);
        assert_eq!(robot.wall_distances().len(), 12);
        assert_eq!(robot.sensor_frame().landmark_ranges.len(), 2);
    }

    #[test]
    fn filter_runs_on_the_configured_interval() {
        let mut robot = Robot::new(maze(), Pose::new(200.0, 140.0, 0.0), RobotConfig {
            kalman_call_interval: 4,
            ..RobotConfig::default()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let ran: Vec<bool> = (0..10)
            .map(|_| {
                robot
                    .step(WheelCommand::new(0.3, 0.35), &mut rng)
                    .unwrap()
                    .filter_ran
            })
            .collect();

        assert_eq!(
            ran,
            vec![true, false, false, false, true, false, false, false, true, false]
        );
        assert_eq!(robot.past_positions().len(), 11);
        assert_eq!(robot.estimated_positions().len(), 11);
        assert_eq!(robot.beacon_counts().len(), 4);
    }

    #[test]
    fn noiseless_estimate_tracks_the_truth() {
        let mut robot = Robot::new(maze(), Pose::new(120.0, 140.0, 0.0), RobotConfig {
            kalman_call_interval: 1,
            ..quiet_config()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        for _ in 0..20 {
            let outcome = robot.step(WheelCommand::new(1.0, 1.0), &mut rng).unwrap();
            assert!(!outcome.collided);
            assert_eq!(outcome.visible_landmarks, 2);
        }
        let truth = robot.pose();
        let estimate = robot.estimate();
        assert_abs_diff_eq!(truth.x, 140.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.x, truth.x, epsilon = 1e-4);
        assert_abs_diff_eq!(estimate.y, truth.y, epsilon = 1e-4);
    }

    #[test]
    fn driving_into_a_wall_is_clamped() {
        let mut robot = Robot::new(maze(), Pose::new(100.0, 60.0, PI), quiet_config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut collided = false;
        for _ in 0..100 {
            let outcome = robot.step(WheelCommand::new(1.0, 1.0), &mut rng).unwrap();
            collided |= outcome.collided;
            // The outer wall ends at x = 40.
            assert!(outcome.pose.x >= 40.0 + 13.0 - 1.5, "x = {}", outcome.pose.x);
        }
        assert!(collided);
        assert!(!robot
            .footprint()
            .overlaps_any(&robot.pose(), robot.maze().walls()));
    }

    #[test]
    fn idle_robot_stays_put() {
        let start = Pose::new(200.0, 140.0, 1.0);
        let mut robot = Robot::new(maze(), start, RobotConfig::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..5 {
            robot.step(WheelCommand::default(), &mut rng).unwrap();
        }
        assert_eq!(robot.pose(), start);
        assert_eq!(robot.step_count(), 5);
    }

    #[test]
    fn start_outside_the_arena_is_rejected() {
        let result = Robot::new(maze(), Pose::new(5.0, 140.0, 0.0), RobotConfig::default());
        assert!(matches!(result, Err(RobotError::StartOutsideArena { .. })));
    }

    #[test]
    fn maze_without_landmarks_only_predicts() {
        let mut robot = Robot::new(open_maze(), Pose::new(100.0, 80.0, 0.0), quiet_config()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let outcome = robot.step(WheelCommand::new(0.5, 0.5), &mut rng).unwrap();
        assert!(outcome.filter_ran);
        assert_eq!(outcome.visible_landmarks, 0);
        assert_abs_diff_eq!(robot.estimate().x, 100.5, epsilon = 1e-12);
    }

    fn open_maze() -> Arc<Maze> {
        Arc::new(Maze::from_ascii("#####\n#...#\n#...#\n#####\n", 40.0).unwrap())
    }

    #[test]
    fn estimate_keeps_every_command_between_filter_runs() {
        let mut robot = Robot::new(open_maze(), Pose::new(100.0, 80.0, 0.0), RobotConfig {
            kalman_call_interval: 10,
            ..quiet_config()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        for _ in 0..10 {
            robot.step(WheelCommand::new(1.0, 1.0), &mut rng).unwrap();
        }
        let outcome = robot.step(WheelCommand::default(), &mut rng).unwrap();
        assert!(outcome.filter_ran);
        assert_abs_diff_eq!(robot.pose().x, 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(robot.estimate().x, 110.0, epsilon = 1e-9);
    }

    #[test]
    fn dead_reckoning_follows_changing_commands() {
        let mut robot = Robot::new(open_maze(), Pose::new(100.0, 80.0, 0.0), RobotConfig {
            kalman_call_interval: 10,
            ..quiet_config()
        })
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let commands = [
            (3, WheelCommand::new(0.5, -0.5)),
            (4, WheelCommand::new(1.0, 1.0)),
            (3, WheelCommand::new(0.2, 0.6)),
            (1, WheelCommand::default()),
        ];
        let mut last = None;
        for (repeat, command) in commands {
            for _ in 0..repeat {
                last = Some(robot.step(command, &mut rng).unwrap());
            }
        }
        let outcome = last.unwrap();
        assert!(outcome.filter_ran);
        assert!(!outcome.collided);

        let (truth, estimate) = (robot.pose(), robot.estimate());
        assert_abs_diff_eq!(estimate.x, truth.x, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.y, truth.y, epsilon = 1e-9);
        assert_abs_diff_eq!(wrap_to_pi(estimate.theta - truth.theta), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn start_overlapping_a_wall_is_rejected() {
        // Inside the arena, but the footprint reaches into the west wall.
        let result = Robot::new(maze(), Pose::new(45.0, 100.0, 0.0), RobotConfig::default());
        assert!(matches!(result, Err(RobotError::StartInsideWall { .. })));
    }

    #[test]
    fn tuning_setters_validate_and_restore() {
        let mut robot = Robot::new(maze(), Pose::new(200.0, 140.0, 0.0), RobotConfig::default()).unwrap();

        assert!(robot.set_wheel_noise(-0.1).is_err());
        assert!(robot.set_kalman_call_interval(0).is_err());

        robot.set_wheel_noise(0.5).unwrap();
        robot.set_sensor_noise(0.2).unwrap();
        robot.set_kalman_call_interval(3).unwrap();
        robot.filter_mut().set_measurement_noise_for(1, 0.7).unwrap();

        robot.restore_defaults().unwrap();
        assert_eq!(robot.wheel_noise(), 0.1);
        assert_eq!(robot.sensor_noise(), 0.05);
        assert_eq!(robot.kalman_call_interval(), 30);
        assert!(robot
            .filter()
            .measurement_noise()
            .iter()
            .all(|v| *v == 0.1));
    }
}
