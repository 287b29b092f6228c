// mazenav_sim/src/controller.rs

use mazenav_core::analysis::wall_angle;
use mazenav_core::types::WheelCommand;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::config::{ControllerConfig, Segment};

/// Produces one wheel command per step from the latest wall readings.
pub trait Controller: Send + std::fmt::Debug {
    fn next_command(&mut self, wall_distances: &[f64]) -> WheelCommand;
}

/// Builds the controller a scenario asks for.
pub fn from_config(config: &ControllerConfig) -> Box<dyn Controller> {
    match config {
        ControllerConfig::Scripted { segments } => Box::new(ScriptedController::new(segments.clone())),
        ControllerConfig::Reactive {
            cruise_speed,
            turn_speed,
            safe_distance,
        } => Box::new(ReactiveController {
            cruise_speed: *cruise_speed,
            turn_speed: *turn_speed,
            safe_distance: *safe_distance,
        }),
    }
}

/// Replays fixed segments in order and starts over after the last one.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    segments: Vec<Segment>,
    index: usize,
    elapsed: usize,
}

impl ScriptedController {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            index: 0,
            elapsed: 0,
        }
    }
}

impl Controller for ScriptedController {
    fn next_command(&mut self, _wall_distances: &[f64]) -> WheelCommand {
        if self.segments.iter().all(|s| s.steps == 0) {
            return WheelCommand::default();
        }
        while self.elapsed >= self.segments[self.index].steps {
            self.index = (self.index + 1) % self.segments.len();
            self.elapsed = 0;
        }
        self.elapsed += 1;
        self.segments[self.index].command().clamped()
    }
}

/// Drives ahead and spins away from a wall that comes within `safe_distance`
/// of the front half of the sensor ring.
#[derive(Debug, Clone)]
pub struct ReactiveController {
    pub cruise_speed: f64,
    pub turn_speed: f64,
    pub safe_distance: f64,
}

impl Controller for ReactiveController {
    fn next_command(&mut self, wall_distances: &[f64]) -> WheelCommand {
        let cruise = WheelCommand::new(self.cruise_speed, self.cruise_speed).clamped();
        let Ok(wall) = wall_angle(wall_distances) else {
            return cruise;
        };
        if wall_distances[wall.nearest] >= self.safe_distance {
            return cruise;
        }

        // Offset of the nearest sensor from the heading, in (-π, π].
        let mut offset = wall.nearest as f64 * TAU / wall_distances.len() as f64;
        if offset > PI {
            offset -= TAU;
        }
        if offset.abs() > FRAC_PI_2 {
            // The wall is behind us.
            return cruise;
        }

        // Positive offsets turn by lowering the heading, so the right wheel slows.
        let turn = if offset >= 0.0 {
            WheelCommand::new(self.turn_speed, -self.turn_speed)
        } else {
            WheelCommand::new(-self.turn_speed, self.turn_speed)
        };
        turn.clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(v_left: f64, v_right: f64, steps: usize) -> Segment {
        Segment {
            v_left,
            v_right,
            steps,
        }
    }

    #[test]
    fn scripted_controller_cycles_through_segments() {
        let mut controller =
            ScriptedController::new(vec![segment(1.0, 1.0, 2), segment(0.0, 0.0, 0), segment(0.5, -0.5, 1)]);
        let commands: Vec<WheelCommand> = (0..5).map(|_| controller.next_command(&[])).collect();
        assert_eq!(
            commands,
            vec![
                WheelCommand::new(1.0, 1.0),
                WheelCommand::new(1.0, 1.0),
                WheelCommand::new(0.5, -0.5),
                WheelCommand::new(1.0, 1.0),
                WheelCommand::new(1.0, 1.0),
            ]
        );
    }

    #[test]
    fn scripted_commands_are_clamped() {
        let mut controller = ScriptedController::new(vec![segment(3.0, -2.0, 1)]);
        assert_eq!(controller.next_command(&[]), WheelCommand::new(1.0, -1.0));
    }

    #[test]
    fn reactive_controller_turns_away_from_close_walls() {
        let mut controller = ReactiveController {
            cruise_speed: 0.8,
            turn_speed: 0.4,
            safe_distance: 10.0,
        };
        // Open space: cruise.
        let open = [50.0, 60.0, 70.0, 80.0, 70.0, 60.0];
        assert_eq!(controller.next_command(&open), WheelCommand::new(0.8, 0.8));

        // Wall just ahead on the positive side.
        let ahead = [8.0, 5.0, 70.0, 80.0, 70.0, 60.0];
        assert_eq!(controller.next_command(&ahead), WheelCommand::new(0.4, -0.4));

        // Wall close behind: keep going.
        let behind = [50.0, 60.0, 70.0, 3.0, 70.0, 60.0];
        assert_eq!(controller.next_command(&behind), WheelCommand::new(0.8, 0.8));
    }
}
