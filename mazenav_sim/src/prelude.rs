// mazenav_sim/src/prelude.rs

// Re-export the entire mazenav_core prelude so you can easily access
// pure types like `Pose`, `Robot`, `ExtendedKalmanFilter`, etc.
pub use mazenav_core::prelude::*;

// Re-export common simulation-specific types for easy access.
pub use crate::cli::Cli;
pub use crate::config::{ControllerConfig, MazeSection, ScenarioConfig, Segment, SimulationSection};
pub use crate::controller::{Controller, ReactiveController, ScriptedController};
pub use crate::error::SimError;
pub use crate::prng::SimulationRng;
pub use crate::runner::{RunReport, Simulation};
