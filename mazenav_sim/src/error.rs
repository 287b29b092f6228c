// mazenav_sim/src/error.rs

use mazenav_core::error::{AnalysisError, RobotError, WorldError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Failed to load scenario: {0}")]
    Config(#[from] Box<figment::Error>),
    #[error("Failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Robot(#[from] RobotError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl From<figment::Error> for SimError {
    fn from(err: figment::Error) -> Self {
        SimError::Config(Box::new(err))
    }
}
