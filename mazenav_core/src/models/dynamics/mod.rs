// mazenav_core/src/models/dynamics/mod.rs

use crate::types::{Control, State};
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for process models used within state estimators.
///
/// The filter keeps `A = I` and asks the model for the control term `B(x) u`:
/// how far the state moves over `dt` when the control `u` is applied at `x`.
pub trait ProcessModel: DynClone + Debug + Send + Sync {
    /// Returns the number of dimensions in the state vector `x`.
    fn get_state_dim(&self) -> usize;

    /// Returns the number of dimensions in the control input vector `u`.
    fn get_control_dim(&self) -> usize;

    /// Computes the state increment `B(x) u` produced by applying `u` for `dt`.
    ///
    /// # Arguments
    /// * `x`: Current state vector.
    /// * `u`: Control input, assumed constant over `dt`.
    /// * `dt`: Duration the control is applied for. Must be non-negative.
    fn control_effect(&self, x: &State, u: &Control, dt: f64) -> State;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn ProcessModel>`.
dyn_clone::clone_trait_object!(ProcessModel);

pub mod diff_drive;
pub mod linear;

pub use diff_drive::{diff_drive_step, DiffDriveKinematics, MotionRegime};
pub use linear::LinearControl;
