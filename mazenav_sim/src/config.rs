// mazenav_sim/src/config.rs

//! Loading and validating scenario files.

use figment::{
    providers::{Format, Toml},
    Figment,
};
use mazenav_core::config::RobotConfig;
use mazenav_core::types::{Pose, WheelCommand};
use mazenav_core::world::Maze;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::SimError;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: SimulationSection,

    pub maze: MazeSection,

    #[serde(default)]
    pub robot: RobotConfig,

    pub controller: ControllerConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Number of steps to run.
    pub steps: usize,
    /// Log a progress line every this many steps; `0` disables it.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_progress_every() -> usize {
    100
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            steps: 1000,
            progress_every: default_progress_every(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MazeSection {
    /// Side length of one grid cell, in pixels.
    pub cell_size: f64,
    /// Text layout: `#` wall, `.` or space free, `L` landmark.
    pub layout: String,
    /// Where the robot starts.
    pub start: Pose,
}

/// One leg of a scripted drive: hold `command` for `steps` steps.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Segment {
    pub v_left: f64,
    pub v_right: f64,
    pub steps: usize,
}

impl Segment {
    pub fn command(&self) -> WheelCommand {
        WheelCommand::new(self.v_left, self.v_right)
    }
}

/// Which controller produces the wheel commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerConfig {
    /// Replays `segments` in order, cycling forever.
    Scripted { segments: Vec<Segment> },
    /// Cruises ahead and turns away from the nearest wall when too close.
    Reactive {
        cruise_speed: f64,
        turn_speed: f64,
        safe_distance: f64,
    },
}

impl ScenarioConfig {
    /// Reads a scenario file through figment.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        info!("Loading scenario from: {}", path.display());
        let config: ScenarioConfig = Figment::new().merge(Toml::file(path)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a scenario held in memory.
    pub fn from_toml_str(source: &str) -> Result<Self, SimError> {
        let config: ScenarioConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.robot.validate()?;
        match &self.controller {
            ControllerConfig::Scripted { segments } => {
                if segments.iter().all(|s| s.steps == 0) {
                    return Err(SimError::InvalidScenario(
                        "a scripted controller needs at least one non-empty segment".to_string(),
                    ));
                }
            }
            ControllerConfig::Reactive { safe_distance, .. } => {
                if !(*safe_distance > 0.0) {
                    return Err(SimError::InvalidScenario(format!(
                        "safe_distance must be positive, got {safe_distance}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn build_maze(&self) -> Result<Maze, SimError> {
        Ok(Maze::from_ascii(&self.maze.layout, self.maze.cell_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
[simulation]
seed = 7
steps = 50

[maze]
cell_size = 40.0
layout = """
#####
#.L.#
#...#
#####
"""
start = { x = 60.0, y = 100.0 }

[robot]
radius = 10.0
kalman_call_interval = 5

[robot.filter]
occluded_variance = 2.0

[controller]
kind = "scripted"
segments = [
    { v_left = 1.0, v_right = 1.0, steps = 10 },
    { v_left = 0.5, v_right = -0.5, steps = 3 },
]
"#;

    #[test]
    fn parses_a_full_scenario() {
        let config = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.steps, 50);
        assert_eq!(config.simulation.progress_every, 100);
        assert_eq!(config.maze.start.theta, 0.0);
        assert_eq!(config.robot.radius, 10.0);
        assert_eq!(config.robot.kalman_call_interval, 5);
        // Unset fields fall back to their defaults.
        assert_eq!(config.robot.sensor_count, 12);
        assert_eq!(config.robot.filter.occluded_variance, 2.0);
        assert_eq!(config.robot.filter.visible_variance, 1e-10);
        match &config.controller {
            ControllerConfig::Scripted { segments } => assert_eq!(segments.len(), 2),
            other => panic!("unexpected controller {other:?}"),
        }

        let maze = config.build_maze().unwrap();
        assert_eq!(maze.landmarks().len(), 1);
    }

    #[test]
    fn bundled_default_scenario_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../assets/scenarios/default.toml");
        let config = ScenarioConfig::load(&path).unwrap();
        let maze = config.build_maze().unwrap();
        assert_eq!(maze.landmarks().len(), 4);
        assert!(matches!(config.controller, ControllerConfig::Reactive { .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let broken = SCENARIO.replace("radius = 10.0", "radius = 10.0\nwheels = 3");
        assert!(ScenarioConfig::from_toml_str(&broken).is_err());
    }

    #[test]
    fn invalid_robot_config_is_rejected() {
        let broken = SCENARIO.replace("kalman_call_interval = 5", "kalman_call_interval = 0");
        assert!(matches!(
            ScenarioConfig::from_toml_str(&broken),
            Err(SimError::Robot(_))
        ));
    }

    #[test]
    fn reactive_controller_is_parsed() {
        let reactive = SCENARIO.replace(
            "kind = \"scripted\"\nsegments = [\n    { v_left = 1.0, v_right = 1.0, steps = 10 },\n    { v_left = 0.5, v_right = -0.5, steps = 3 },\n]",
            "kind = \"reactive\"\ncruise_speed = 0.8\nturn_speed = 0.4\nsafe_distance = 20.0",
        );
        let config = ScenarioConfig::from_toml_str(&reactive).unwrap();
        assert!(matches!(
            config.controller,
            ControllerConfig::Reactive { safe_distance, .. } if safe_distance == 20.0
        ));
    }
}
