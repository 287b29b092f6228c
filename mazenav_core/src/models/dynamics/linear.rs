// mazenav_core/src/models/dynamics/linear.rs

use nalgebra::DMatrix;

use crate::models::dynamics::ProcessModel;
use crate::types::{Control, State};

/// A constant control-input matrix: `B(x) u = B u dt`.
#[derive(Debug, Clone)]
pub struct LinearControl {
    pub b: DMatrix<f64>,
}

impl LinearControl {
    pub fn new(b: DMatrix<f64>) -> Self {
        Self { b }
    }
}

impl ProcessModel for LinearControl {
    fn get_state_dim(&self) -> usize {
        self.b.nrows()
    }

    fn get_control_dim(&self) -> usize {
        self.b.ncols()
    }

    fn control_effect(&self, _x: &State, u: &Control, dt: f64) -> State {
        &self.b * u * dt
    }
}
