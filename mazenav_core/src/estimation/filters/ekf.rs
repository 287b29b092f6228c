// mazenav_core/src/estimation/filters/ekf.rs

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::error::EstimationError;
use crate::models::dynamics::ProcessModel;
use crate::models::measurement::MeasurementModel;
use crate::types::{Control, Pose, State};

/// Largest asymmetry tolerated in a user-supplied process noise matrix.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A concrete implementation of an Extended Kalman Filter.
///
/// The state transition is the identity (`A = I`); motion enters only through
/// the process model's control term `B(x) u`. The measurement noise `R` is kept
/// diagonal and stored as a vector, one entry per measurement component.
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter {
    /// The current state estimate `x̂`.
    state: State,
    /// The error covariance `P`.
    covariance: DMatrix<f64>,
    /// The process noise covariance matrix (Q), modeling uncertainty in the dynamics.
    process_noise_q: DMatrix<f64>,
    /// Diagonal of the measurement noise covariance `R`.
    measurement_noise_r: DVector<f64>,

    process_model: Box<dyn ProcessModel>,
}

impl ExtendedKalmanFilter {
    /// Creates a new EKF instance.
    ///
    /// # Arguments
    /// * `initial_state`: Starting estimate, sized to the process model.
    /// * `initial_covariance`: Starting `P`, square and matching the state.
    /// * `process_noise_q`: `Q`, square, symmetric and matching the state.
    /// * `measurement_noise_r`: Diagonal of `R`.
    /// * `process_model`: Supplies the `B(x) u` term of the prediction.
    pub fn new(
        initial_state: State,
        initial_covariance: DMatrix<f64>,
        process_noise_q: DMatrix<f64>,
        measurement_noise_r: DVector<f64>,
        process_model: Box<dyn ProcessModel>,
    ) -> Result<Self, EstimationError> {
        let dim = process_model.get_state_dim();
        check_dim("initial state", dim, initial_state.len())?;
        check_square("initial covariance", dim, &initial_covariance)?;

        let mut filter = Self {
            state: initial_state,
            covariance: initial_covariance,
            process_noise_q: DMatrix::zeros(dim, dim),
            measurement_noise_r: DVector::zeros(0),
            process_model,
        };
        filter.set_process_noise(process_noise_q)?;
        filter.set_measurement_noise(measurement_noise_r)?;
        Ok(filter)
    }

    // --- Accessors ---

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The estimate read back as a pose, heading wrapped into `[0, 2π)`.
    pub fn pose(&self) -> Pose {
        Pose::from_state(&self.state)
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.process_noise_q
    }

    pub fn measurement_noise(&self) -> &DVector<f64> {
        &self.measurement_noise_r
    }

    /// Number of `[bearing, range]` pairs the current `R` is sized for.
    pub fn landmark_count(&self) -> usize {
        self.measurement_noise_r.len() / 2
    }

    // --- Setters ---

    /// Replaces `Q`. It must be square, match the state and be symmetric
    /// with a non-negative diagonal.
    pub fn set_process_noise(&mut self, q: DMatrix<f64>) -> Result<(), EstimationError> {
        check_square("process noise", self.state.len(), &q)?;
        if (&q - q.transpose()).amax() > SYMMETRY_TOLERANCE {
            return Err(EstimationError::InvalidNoise(
                "process noise must be symmetric".to_string(),
            ));
        }
        if q.diagonal().iter().any(|v| !(*v >= 0.0)) {
            return Err(EstimationError::InvalidNoise(
                "process noise variances must be non-negative".to_string(),
            ));
        }
        self.process_noise_q = q;
        Ok(())
    }

    /// Replaces the whole diagonal of `R`.
    pub fn set_measurement_noise(&mut self, r: DVector<f64>) -> Result<(), EstimationError> {
        if r.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(EstimationError::InvalidNoise(
                "measurement variances must be finite and non-negative".to_string(),
            ));
        }
        self.measurement_noise_r = r;
        Ok(())
    }

    /// Sets the bearing and range variance of landmark `index`, i.e. entries
    /// `2 * index` and `2 * index + 1` of `R`.
    pub fn set_measurement_noise_for(
        &mut self,
        index: usize,
        variance: f64,
    ) -> Result<(), EstimationError> {
        let count = self.landmark_count();
        if index >= count {
            return Err(EstimationError::LandmarkOutOfRange { index, count });
        }
        if !(variance.is_finite() && variance >= 0.0) {
            return Err(EstimationError::InvalidNoise(format!(
                "landmark variance must be finite and non-negative, got {variance}"
            )));
        }
        self.measurement_noise_r[2 * index] = variance;
        self.measurement_noise_r[2 * index + 1] = variance;
        Ok(())
    }

    /// Overwrites the estimate and its covariance.
    pub fn reset(&mut self, state: State, covariance: DMatrix<f64>) -> Result<(), EstimationError> {
        let dim = self.process_model.get_state_dim();
        check_dim("state", dim, state.len())?;
        check_square("covariance", dim, &covariance)?;
        self.state = state;
        self.covariance = covariance;
        Ok(())
    }

    // --- The EKF Algorithm ---

    /// Advances the estimate by applying `u` for `dt`.
    ///
    /// `x̂ ← A x̂ + B(x̂) u` and `P ← A P Aᵀ + Q` with `A = I`. A non-positive
    /// `dt` leaves the filter untouched.
    pub fn predict(&mut self, u: &Control, dt: f64) -> Result<(), EstimationError> {
        check_dim("control", self.process_model.get_control_dim(), u.len())?;
        if dt <= 0.0 {
            return Ok(());
        }

        let delta = self.process_model.control_effect(&self.state, u, dt);
        let x_pred = &self.state + delta;
        // A = I, so A P Aᵀ reduces to P.
        let p_pred = &self.covariance + &self.process_noise_q;

        if !x_pred.iter().all(|v| v.is_finite()) {
            return Err(EstimationError::NonFinite);
        }
        self.state = x_pred;
        self.covariance = p_pred;
        Ok(())
    }

    /// Fuses the measurement `z` observed through `model`.
    ///
    /// On error the filter is left exactly as it was.
    pub fn correct(
        &mut self,
        z: &DVector<f64>,
        model: &dyn MeasurementModel,
    ) -> Result<(), EstimationError> {
        let m = model.measurement_dim();
        if m == 0 {
            return Err(EstimationError::NoLandmarks);
        }
        check_dim("measurement", m, z.len())?;
        check_dim("measurement noise", m, self.measurement_noise_r.len())?;

        // 1. Predict the measurement from our current state: z_hat = h(x)
        let z_pred = model.predict_measurement(&self.state);

        // 2. Calculate the measurement Jacobian H.
        let h_jac = model.calculate_jacobian(&self.state);
        let r_mat = DMatrix::from_diagonal(&self.measurement_noise_r);

        // 3. Innovation (y), innovation covariance (S) and Kalman gain (K).
        let y = model.innovation(z, &z_pred);
        let p = &self.covariance;
        let s = &h_jac * p * h_jac.transpose() + &r_mat;
        let s_inv = s
            .try_inverse()
            .ok_or(EstimationError::SingularInnovation)?;
        let k_gain = p * h_jac.transpose() * s_inv;

        trace!(innovation_norm = y.norm(), "ekf correction");

        // 4. Update the state vector and covariance matrix (Joseph form).
        let x_new = &self.state + &k_gain * &y;
        let n = self.state.len();
        let i_kh = DMatrix::<f64>::identity(n, n) - &k_gain * &h_jac;
        let p_joseph = &i_kh * p * i_kh.transpose() + &k_gain * &r_mat * k_gain.transpose();
        let p_new = (&p_joseph + p_joseph.transpose()) * 0.5;

        if !x_new.iter().chain(p_new.iter()).all(|v| v.is_finite()) {
            return Err(EstimationError::NonFinite);
        }
        self.state = x_new;
        self.covariance = p_new;
        Ok(())
    }
}

fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<(), EstimationError> {
    if expected != found {
        return Err(EstimationError::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_square(what: &'static str, dim: usize, m: &DMatrix<f64>) -> Result<(), EstimationError> {
    check_dim(what, dim, m.nrows())?;
    check_dim(what, dim, m.ncols())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dynamics::{DiffDriveKinematics, LinearControl};
    use crate::models::measurement::LandmarkBearingRange;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn linear_filter(p: f64, q: f64, r: f64, landmarks: usize) -> ExtendedKalmanFilter {
        ExtendedKalmanFilter::new(
            State::zeros(3),
            DMatrix::identity(3, 3) * p,
            DMatrix::identity(3, 3) * q,
            DVector::from_element(2 * landmarks, r),
            Box::new(LinearControl::new(DMatrix::identity(3, 3))),
        )
        .unwrap()
    }

    fn assert_symmetric_psd(p: &DMatrix<f64>) {
        assert_relative_eq!(p, &p.transpose(), epsilon = 1e-12);
        for eigenvalue in p.clone().symmetric_eigenvalues().iter() {
            assert!(*eigenvalue >= -1e-9, "negative eigenvalue {eigenvalue}");
        }
    }

    #[test]
    fn predict_then_exact_measurement_settles_on_control() {
        let model = LandmarkBearingRange::new(vec![Point2::new(10.0, 10.0), Point2::new(1.0, 1.0)]);
        let mut ekf = linear_filter(0.1, 0.0, 0.02, 2);
        let u = Control::from_column_slice(&[1.0, 0.1, 0.05]);

        ekf.predict(&u, 1.0).unwrap();
        let z = model.predict_measurement(&u);
        ekf.correct(&z, &model).unwrap();

        assert_relative_eq!(ekf.state(), &u, epsilon = 1e-9);
    }

    #[test]
    fn zero_innovation_leaves_the_estimate_unchanged() {
        let model = LandmarkBearingRange::new(vec![Point2::new(30.0, -20.0)]);
        let mut ekf = linear_filter(1.0, 0.0, 0.0, 1);
        ekf.predict(&Control::from_column_slice(&[4.0, 2.0, 0.3]), 1.0)
            .unwrap();
        let prior = ekf.state().clone();

        let z = model.predict_measurement(&prior);
        ekf.correct(&z, &model).unwrap();

        assert_relative_eq!(ekf.state(), &prior, epsilon = 1e-12);
    }

    #[test]
    fn occluded_landmark_has_less_influence() {
        let landmarks = vec![
            Point2::new(50.0, 0.0),
            Point2::new(0.0, 60.0),
            Point2::new(-40.0, -30.0),
        ];
        let model = LandmarkBearingRange::new(landmarks);
        let truth = State::from_column_slice(&[0.0, 0.0, 0.0]);
        let mut z = model.predict_measurement(&truth);
        // Landmark 0 disagrees with the rest.
        z[1] += 5.0;

        let shift_with = |variance: f64| {
            let mut ekf = linear_filter(1.0, 0.0, 1e-10, 3);
            ekf.set_measurement_noise_for(0, variance).unwrap();
            ekf.correct(&z, &model).unwrap();
            ekf.state().norm()
        };

        let visible = shift_with(1e-10);
        let occluded = shift_with(1.0);
        assert!(occluded < visible, "occluded {occluded} vs visible {visible}");
    }

    #[test]
    fn covariance_stays_symmetric_psd() {
        let model = LandmarkBearingRange::new(vec![Point2::new(100.0, 40.0), Point2::new(20.0, 200.0)]);
        let mut ekf = ExtendedKalmanFilter::new(
            State::from_column_slice(&[50.0, 50.0, 0.0]),
            DMatrix::identity(3, 3),
            DMatrix::identity(3, 3) * 0.01,
            DVector::from_element(4, 0.1),
            Box::new(DiffDriveKinematics { wheel_base: 26.0 }),
        )
        .unwrap();

        let mut truth = State::from_column_slice(&[50.0, 50.0, 0.0]);
        for k in 0..20 {
            let u = Control::from_column_slice(&[0.8, 0.6 + 0.01 * k as f64]);
            ekf.predict(&u, 5.0).unwrap();
            truth += DiffDriveKinematics { wheel_base: 26.0 }.control_effect(&truth, &u, 5.0);
            let mut z = model.predict_measurement(&truth);
            z[1] += 0.3;
            ekf.correct(&z, &model).unwrap();
            assert_symmetric_psd(ekf.covariance());
        }
    }

    #[test]
    fn empty_landmark_set_is_reported() {
        let model = LandmarkBearingRange::new(Vec::new());
        let mut ekf = linear_filter(1.0, 0.0, 0.1, 0);
        let result = ekf.correct(&DVector::zeros(0), &model);
        assert_eq!(result, Err(EstimationError::NoLandmarks));
    }

    #[test]
    fn singular_innovation_is_reported_and_state_kept() {
        // Zero P and zero R make S the zero matrix.
        let model = LandmarkBearingRange::new(vec![Point2::new(5.0, 5.0)]);
        let mut ekf = linear_filter(0.0, 0.0, 0.0, 1);
        let z = DVector::from_column_slice(&[0.2, 9.0]);
        assert_eq!(ekf.correct(&z, &model), Err(EstimationError::SingularInnovation));
        assert_eq!(ekf.state(), &State::zeros(3));
    }

    #[test]
    fn dimension_mismatches_are_rejected() {
        let model = LandmarkBearingRange::new(vec![Point2::new(5.0, 5.0)]);
        let mut ekf = linear_filter(1.0, 0.0, 0.1, 1);
        assert!(matches!(
            ekf.correct(&DVector::zeros(3), &model),
            Err(EstimationError::DimensionMismatch { what: "measurement", .. })
        ));
        assert!(matches!(
            ekf.predict(&Control::zeros(2), 1.0),
            Err(EstimationError::DimensionMismatch { what: "control", .. })
        ));
    }

    #[test]
    fn noise_setters_validate_their_input() {
        let mut ekf = linear_filter(1.0, 0.0, 0.1, 2);

        ekf.set_measurement_noise_for(1, 1.0).unwrap();
        assert_eq!(ekf.measurement_noise().as_slice(), &[0.1, 0.1, 1.0, 1.0]);
        assert_eq!(
            ekf.set_measurement_noise_for(2, 1.0),
            Err(EstimationError::LandmarkOutOfRange { index: 2, count: 2 })
        );

        let mut asymmetric = DMatrix::identity(3, 3);
        asymmetric[(0, 1)] = 0.5;
        assert!(matches!(
            ekf.set_process_noise(asymmetric),
            Err(EstimationError::InvalidNoise(_))
        ));
        assert!(matches!(
            ekf.set_process_noise(DMatrix::identity(2, 2)),
            Err(EstimationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn non_positive_dt_skips_prediction() {
        let mut ekf = linear_filter(1.0, 0.5, 0.1, 1);
        ekf.predict(&Control::from_column_slice(&[1.0, 1.0, 1.0]), 0.0)
            .unwrap();
        assert_eq!(ekf.state(), &State::zeros(3));
        assert_eq!(ekf.covariance(), &DMatrix::identity(3, 3));
    }
}
