// mazenav_core/src/error.rs

use thiserror::Error;

/// Problems building a maze from a grid or a text layout.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    #[error("The maze layout is empty.")]
    EmptyLayout,
    #[error("Row {row} has {found} cells, expected {expected}.")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown cell symbol '{symbol}' at row {row}, column {col}.")]
    UnknownSymbol { symbol: char, row: usize, col: usize },
    #[error("Cell size must be positive, got {0}.")]
    InvalidCellSize(f64),
}

/// Failures of the Extended Kalman Filter.
#[derive(Debug, Error, PartialEq)]
pub enum EstimationError {
    #[error("No landmarks available, the correction step is undefined.")]
    NoLandmarks,
    #[error("The innovation covariance H P H^T + R is singular.")]
    SingularInnovation,
    #[error("Dimension mismatch for {what}: expected {expected}, got {found}.")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Landmark index {index} is out of range for {count} landmarks.")]
    LandmarkOutOfRange { index: usize, count: usize },
    #[error("Invalid noise parameter: {0}")]
    InvalidNoise(String),
    #[error("The filter produced a non-finite state estimate.")]
    NonFinite,
}

/// Failures of the offline analysis helpers.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("At least {required} sensor readings are needed, got {found}.")]
    TooFewSensors { required: usize, found: usize },
    #[error("Trajectory lengths differ: {truth} true vs {estimate} estimated positions.")]
    LengthMismatch { truth: usize, estimate: usize },
}

/// Top-level error of the robot orchestrator.
#[derive(Debug, Error, PartialEq)]
pub enum RobotError {
    #[error("Invalid robot configuration: {0}")]
    InvalidConfig(String),
    #[error("Start position ({x:.1}, {y:.1}) lies outside the arena.")]
    StartOutsideArena { x: f64, y: f64 },
    #[error("Start position ({x:.1}, {y:.1}) overlaps a wall.")]
    StartInsideWall { x: f64, y: f64 },
    #[error(transparent)]
    Estimation(#[from] EstimationError),
    #[error(transparent)]
    World(#[from] WorldError),
}
