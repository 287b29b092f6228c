// mazenav_core/src/types.rs

use nalgebra::{DVector, Point2};
use serde::Deserialize;
use std::f64::consts::TAU;

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Control = DVector<f64>;

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_to_tau(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_to_pi(angle: f64) -> f64 {
    let wrapped = wrap_to_tau(angle);
    if wrapped > std::f64::consts::PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Planar robot pose in screen coordinates (`+y` points SOUTH).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, kept in `[0, 2π)`.
    #[serde(default)]
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: wrap_to_tau(theta),
        }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// The pose as the filter's `[x, y, theta]` state vector.
    pub fn to_state(&self) -> State {
        State::from_column_slice(&[self.x, self.y, self.theta])
    }

    /// Reads a pose back out of a 3-element state vector.
    pub fn from_state(state: &State) -> Self {
        Self::new(state[0], state[1], state[2])
    }
}

/// Commanded wheel velocities `(v_left, v_right)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct WheelCommand {
    pub v_left: f64,
    pub v_right: f64,
}

impl WheelCommand {
    pub fn new(v_left: f64, v_right: f64) -> Self {
        Self { v_left, v_right }
    }

    /// Clamps both wheels into `[-1, 1]`, the range the engine expects.
    pub fn clamped(self) -> Self {
        Self {
            v_left: self.v_left.clamp(-1.0, 1.0),
            v_right: self.v_right.clamp(-1.0, 1.0),
        }
    }

    /// The command as a 2-element control vector `[v_left, v_right]`.
    pub fn to_control(&self) -> Control {
        Control::from_column_slice(&[self.v_left, self.v_right])
    }
}
