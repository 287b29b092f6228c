// mazenav_sim/src/runner.rs

use std::sync::Arc;

use mazenav_core::analysis::{estimation_errors, TrajectorySummary};
use mazenav_core::robot::{Robot, StepOutcome};
use mazenav_core::types::Pose;
use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::controller::{self, Controller};
use crate::error::SimError;
use crate::prng::SimulationRng;

/// What a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: TrajectorySummary,
    pub final_pose: Pose,
    pub final_estimate: Pose,
    /// Per-step `ln(1 + e²)` over the whole history, initial entry included.
    pub error_log: Vec<f64>,
}

/// One headless simulation: a robot, its controller and the shared RNG.
#[derive(Debug)]
pub struct Simulation {
    robot: Robot,
    controller: Box<dyn Controller>,
    rng: SimulationRng,
    outcomes: Vec<StepOutcome>,
    progress_every: usize,
}

impl Simulation {
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, SimError> {
        let maze = Arc::new(config.build_maze()?);
        info!(
            width = maze.width(),
            height = maze.height(),
            walls = maze.walls().len(),
            landmarks = maze.landmarks().len(),
            "maze built"
        );
        let robot = Robot::new(maze, config.maze.start, config.robot.clone())?;
        Ok(Self {
            robot,
            controller: controller::from_config(&config.controller),
            rng: SimulationRng::new(config.simulation.seed),
            outcomes: Vec::new(),
            progress_every: config.simulation.progress_every,
        })
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Advances one step: the controller reads the latest walls, the robot moves.
    pub fn step(&mut self) -> Result<&StepOutcome, SimError> {
        let command = self.controller.next_command(self.robot.wall_distances());
        let outcome = self.robot.step(command, &mut self.rng.0)?;
        self.outcomes.push(outcome);
        let step = self.outcomes.len();
        let outcome = &self.outcomes[step - 1];

        if self.progress_every > 0 && step % self.progress_every == 0 {
            let error = nalgebra::distance(&outcome.pose.position(), &outcome.estimate.position());
            info!(
                step,
                x = outcome.pose.x,
                y = outcome.pose.y,
                error,
                "progress"
            );
        }
        Ok(outcome)
    }

    /// Runs `steps` steps and summarises the run.
    pub fn run(&mut self, steps: usize) -> Result<RunReport, SimError> {
        info!(steps, "simulation started");
        for _ in 0..steps {
            self.step()?;
        }

        let summary = TrajectorySummary::from_outcomes(&self.outcomes);
        if summary.filter_runs > 0 && summary.mean_visible_landmarks == 0.0 {
            warn!("no landmark was ever in line of sight; the estimate is dead reckoning only");
        }
        let error_log = estimation_errors(
            self.robot.past_positions(),
            self.robot.estimated_positions(),
        )?;

        info!(
            steps = summary.steps,
            collisions = summary.collisions,
            filter_runs = summary.filter_runs,
            rms_error = summary.rms_error,
            final_error = summary.final_error,
            "simulation finished"
        );

        Ok(RunReport {
            summary,
            final_pose: self.robot.pose(),
            final_estimate: self.robot.estimate(),
            error_log,
        })
    }
}
