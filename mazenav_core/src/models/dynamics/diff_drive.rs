// mazenav_core/src/models/dynamics/diff_drive.rs

use crate::models::dynamics::ProcessModel;
use crate::types::{wrap_to_pi, Control, Pose, State, WheelCommand};

/// The three mutually exclusive motion regimes of a differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionRegime {
    /// Both wheels at the same speed.
    Straight,
    /// Wheels at opposite speeds, turning on the spot.
    Rotation,
    /// Any other combination, moving along a circle around the ICC.
    Arc,
}

impl MotionRegime {
    pub fn classify(wheels: &WheelCommand) -> Self {
        if wheels.v_left == wheels.v_right {
            MotionRegime::Straight
        } else if wheels.v_left == -wheels.v_right {
            MotionRegime::Rotation
        } else {
            MotionRegime::Arc
        }
    }
}

/// Advances `pose` by one differential-drive step, ignoring walls.
///
/// Exact for constant wheel speeds over `dt`; `theta` is wrapped into `[0, 2π)`.
pub fn diff_drive_step(pose: &Pose, wheels: &WheelCommand, dt: f64, wheel_base: f64) -> Pose {
    let (v_l, v_r) = (wheels.v_left, wheels.v_right);
    let omega = (v_r - v_l) / wheel_base;

    match MotionRegime::classify(wheels) {
        MotionRegime::Straight => Pose::new(
            pose.x + v_l * pose.theta.cos() * dt,
            pose.y + v_l * pose.theta.sin() * dt,
            pose.theta,
        ),
        MotionRegime::Rotation => Pose::new(pose.x, pose.y, pose.theta + omega * dt),
        MotionRegime::Arc => {
            let radius = wheel_base / 2.0 * (v_l + v_r) / (v_r - v_l);
            let icc_x = pose.x - radius * pose.theta.sin();
            let icc_y = pose.y + radius * pose.theta.cos();

            let (sin, cos) = (omega * dt).sin_cos();
            let (rel_x, rel_y) = (pose.x - icc_x, pose.y - icc_y);
            Pose::new(
                rel_x * cos - rel_y * sin + icc_x,
                rel_x * sin + rel_y * cos + icc_y,
                pose.theta + omega * dt,
            )
        }
    }
}

/// The kinematic model seen as a filter process model with `u = [v_left, v_right]`.
#[derive(Debug, Clone)]
pub struct DiffDriveKinematics {
    pub wheel_base: f64,
}

impl ProcessModel for DiffDriveKinematics {
    fn get_state_dim(&self) -> usize {
        3 // [x, y, theta]
    }

    fn get_control_dim(&self) -> usize {
        2 // [v_left, v_right]
    }

    fn control_effect(&self, x: &State, u: &Control, dt: f64) -> State {
        let start = Pose {
            x: x[0],
            y: x[1],
            theta: x[2],
        };
        let end = diff_drive_step(&start, &WheelCommand::new(u[0], u[1]), dt, self.wheel_base);

        // The heading delta is taken the short way round so `x + delta` stays
        // continuous for an estimate that has not been wrapped.
        State::from_column_slice(&[
            end.x - start.x,
            end.y - start.y,
            wrap_to_pi(end.theta - start.theta),
        ])
    }
}
