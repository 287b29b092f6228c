// mazenav_core/src/config.rs

use serde::Deserialize;

use crate::error::RobotError;

// =========================================================================
// == Robot Configuration ==
// =========================================================================

/// # RobotConfig
/// Every tunable of the robot and its sensors. Passed explicitly into each
/// component's constructor; nothing reads process-wide globals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotConfig {
    /// Radius of the circular collision footprint, in pixels.
    pub radius: f64,
    /// Distance between the two wheels. Defaults to the footprint diameter.
    pub wheel_base: Option<f64>,
    /// Number of evenly spaced wall sensors.
    pub sensor_count: usize,
    /// Maximum range of every raycast. Longer rays report this value.
    pub sensor_max_range: f64,
    /// Duration of one simulation step.
    pub dt: f64,
    /// Multiplicative noise applied to each wheel every step.
    pub wheel_noise: f64,
    /// Multiplicative noise applied to every sensor reading.
    pub sensor_noise: f64,
    /// The filter runs on every n-th step.
    pub kalman_call_interval: u32,
    pub filter: FilterConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            radius: 13.0,
            wheel_base: None,
            sensor_count: 12,
            sensor_max_range: 1000.0,
            dt: 1.0,
            wheel_noise: 0.1,
            sensor_noise: 0.05,
            kalman_call_interval: 30,
            filter: FilterConfig::default(),
        }
    }
}

impl RobotConfig {
    pub fn wheel_base(&self) -> f64 {
        self.wheel_base.unwrap_or(2.0 * self.radius)
    }

    /// Checks ranges the components rely on.
    pub fn validate(&self) -> Result<(), RobotError> {
        if !(self.radius > 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.wheel_base() > 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "wheel_base must be positive, got {}",
                self.wheel_base()
            )));
        }
        if self.sensor_count == 0 {
            return Err(RobotError::InvalidConfig(
                "sensor_count must be at least 1".to_string(),
            ));
        }
        if !(self.sensor_max_range > 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "sensor_max_range must be positive, got {}",
                self.sensor_max_range
            )));
        }
        if !(self.dt > 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if self.wheel_noise < 0.0 || self.sensor_noise < 0.0 {
            return Err(RobotError::InvalidConfig(
                "noise levels cannot be negative".to_string(),
            ));
        }
        if self.kalman_call_interval == 0 {
            return Err(RobotError::InvalidConfig(
                "kalman_call_interval must be at least 1".to_string(),
            ));
        }
        self.filter.validate()
    }
}

/// Noise parameters of the localization filter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Diagonal of the process noise `Q` for `[x, y, theta]`.
    pub process_noise: [f64; 3],
    /// Initial diagonal of the error covariance `P`.
    pub initial_covariance: [f64; 3],
    /// Variance every landmark starts with before any gating.
    pub initial_measurement_variance: f64,
    /// Variance given to a landmark that is in line of sight.
    pub visible_variance: f64,
    /// Variance given to an occluded landmark.
    pub occluded_variance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: [0.01, 0.01, 0.01],
            initial_covariance: [1.0, 1.0, 1.0],
            initial_measurement_variance: 0.1,
            visible_variance: 1e-10,
            occluded_variance: 1.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), RobotError> {
        let all_non_negative = self
            .process_noise
            .iter()
            .chain(self.initial_covariance.iter())
            .all(|v| *v >= 0.0);
        if !all_non_negative {
            return Err(RobotError::InvalidConfig(
                "filter covariances cannot be negative".to_string(),
            ));
        }
        let variances = [
            self.initial_measurement_variance,
            self.visible_variance,
            self.occluded_variance,
        ];
        if variances.iter().any(|v| !(*v > 0.0)) {
            return Err(RobotError::InvalidConfig(
                "measurement variances must be positive".to_string(),
            ));
        }
        if self.visible_variance > self.occluded_variance {
            return Err(RobotError::InvalidConfig(
                "visible_variance must not exceed occluded_variance".to_string(),
            ));
        }
        Ok(())
    }
}
