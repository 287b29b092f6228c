// mazenav_core/src/models/measurement/mod.rs

use crate::types::{wrap_to_pi, State};
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

/// Step used by the finite-difference Jacobian, per state dimension.
pub const JACOBIAN_EPSILON: f64 = 1e-5;

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a sensor. `z = h(x) + v`
pub trait MeasurementModel: DynClone + Debug + Send + Sync {
    /// Length of the measurement vector `z`.
    fn measurement_dim(&self) -> usize;

    /// Predicts the ideal measurement `z_pred = h(x)` from the filter's state.
    fn predict_measurement(&self, x: &State) -> DVector<f64>;

    /// Whether entry `index` of `z` is an angle, so differences must be wrapped.
    fn is_angular(&self, _index: usize) -> bool {
        false
    }

    /// Calculates the measurement Jacobian `H = ∂h/∂x`.
    ///
    /// Defaults to forward finite differences, which keeps any `h` swappable.
    fn calculate_jacobian(&self, x: &State) -> DMatrix<f64> {
        numerical_jacobian(self, x)
    }

    /// The innovation `z - z_pred`, with angular entries wrapped into `(-π, π]`.
    fn innovation(&self, z: &DVector<f64>, z_pred: &DVector<f64>) -> DVector<f64> {
        let mut y = z - z_pred;
        for (i, value) in y.iter_mut().enumerate() {
            if self.is_angular(i) {
                *value = wrap_to_pi(*value);
            }
        }
        y
    }
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn MeasurementModel>`.
dyn_clone::clone_trait_object!(MeasurementModel);

/// Forward-difference Jacobian of `model` at `x`, one column per state dimension.
pub fn numerical_jacobian<M: MeasurementModel + ?Sized>(model: &M, x: &State) -> DMatrix<f64> {
    let state_dim = x.len();
    let mut h_jac = DMatrix::zeros(model.measurement_dim(), state_dim);
    let z_base = model.predict_measurement(x);

    for j in 0..state_dim {
        let mut perturbed_state = x.clone();
        perturbed_state[j] += JACOBIAN_EPSILON;

        let z_perturbed = model.predict_measurement(&perturbed_state);
        // Through `innovation` so a bearing crossing ±π is not read as a 2π jump.
        let derivative_column = model.innovation(&z_perturbed, &z_base) / JACOBIAN_EPSILON;
        h_jac.column_mut(j).copy_from(&derivative_column);
    }

    h_jac
}

pub mod landmark;

pub use landmark::LandmarkBearingRange;
