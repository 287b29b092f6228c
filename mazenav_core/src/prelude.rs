// mazenav_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::models::dynamics::ProcessModel;
pub use crate::models::measurement::MeasurementModel;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{FilterConfig, RobotConfig};
pub use crate::error::{AnalysisError, EstimationError, RobotError, WorldError};
pub use crate::types::{Control, Pose, State, WheelCommand};
pub use crate::world::{Cell, Maze, OccupancyGrid, WallRect};

// --- Estimation Algorithms ---
pub use crate::estimation::ExtendedKalmanFilter;

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::collision::{Arena, ContactSet, Direction, Footprint, Resolution};
pub use crate::models::dynamics::{diff_drive_step, DiffDriveKinematics, LinearControl, MotionRegime};
pub use crate::models::measurement::LandmarkBearingRange;
pub use crate::models::perception::{line_of_sight, RayTarget, Raycaster, SensorFrame, SensorModel};

// --- Orchestration & Analysis ---
pub use crate::analysis::{estimation_errors, wall_angle, TrajectorySummary, WallAngle};
pub use crate::robot::{Robot, StepOutcome};
