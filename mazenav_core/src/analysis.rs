// mazenav_core/src/analysis.rs

//! Offline helpers over sensor readings and recorded trajectories.

use nalgebra::Point2;
use std::f64::consts::TAU;

use crate::error::AnalysisError;
use crate::robot::StepOutcome;

/// Orientation of the nearest wall relative to the shortest sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallAngle {
    /// Index of the shortest reading.
    pub nearest: usize,
    /// The shorter of its two neighbours in the ring.
    pub adjacent: usize,
    /// Angle between the wall and the nearest sensor's ray, in degrees.
    pub degrees: f64,
}

/// Estimates the angle of the closest wall from a ring of wall distances.
///
/// The shortest reading `a` and its shorter neighbour `b` span the ring
/// increment `C = 2π / n`. The wall is the third side `c` of that triangle
/// (cosine rule), and the returned angle is `B = asin(b sin C / c)` (sine rule).
/// Ties pick the lowest index, and the previous neighbour before the next.
pub fn wall_angle(sensors: &[f64]) -> Result<WallAngle, AnalysisError> {
    let n = sensors.len();
    if n < 3 {
        return Err(AnalysisError::TooFewSensors {
            required: 3,
            found: n,
        });
    }

    let mut nearest = 0;
    for (i, reading) in sensors.iter().enumerate() {
        if *reading < sensors[nearest] {
            nearest = i;
        }
    }

    let previous = (nearest as isize - 1).rem_euclid(n as isize) as usize;
    let next = (nearest + 1) % n;
    let adjacent = if sensors[next] < sensors[previous] {
        next
    } else {
        previous
    };

    let (a, b) = (sensors[nearest], sensors[adjacent]);
    let angle_c = TAU / n as f64;
    let c = (a * a + b * b - 2.0 * a * b * angle_c.cos()).sqrt();
    let angle_b = if c > 0.0 {
        (b * angle_c.sin() / c).clamp(-1.0, 1.0).asin()
    } else {
        0.0
    };

    Ok(WallAngle {
        nearest,
        adjacent,
        degrees: angle_b.to_degrees(),
    })
}

/// Per-step `ln(1 + e²)`, where `e` is the distance between the true and
/// the estimated position.
pub fn estimation_errors(
    truth: &[Point2<f64>],
    estimate: &[Point2<f64>],
) -> Result<Vec<f64>, AnalysisError> {
    if truth.len() != estimate.len() {
        return Err(AnalysisError::LengthMismatch {
            truth: truth.len(),
            estimate: estimate.len(),
        });
    }
    Ok(truth
        .iter()
        .zip(estimate)
        .map(|(t, e)| nalgebra::distance_squared(t, e).ln_1p())
        .collect())
}

/// Aggregate figures of one run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrajectorySummary {
    pub steps: usize,
    pub collisions: usize,
    pub filter_runs: usize,
    /// Mean landmarks in line of sight over the filter steps.
    pub mean_visible_landmarks: f64,
    /// Root-mean-square distance between truth and estimate over all steps.
    pub rms_error: f64,
    pub final_error: f64,
}

impl TrajectorySummary {
    pub fn from_outcomes(outcomes: &[StepOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }

        let errors: Vec<f64> = outcomes
            .iter()
            .map(|o| nalgebra::distance(&o.pose.position(), &o.estimate.position()))
            .collect();
        let filter_steps: Vec<&StepOutcome> = outcomes.iter().filter(|o| o.filter_ran).collect();
        let visible_total: usize = filter_steps.iter().map(|o| o.visible_landmarks).sum();

        Self {
            steps: outcomes.len(),
            collisions: outcomes.iter().filter(|o| o.collided).count(),
            filter_runs: filter_steps.len(),
            mean_visible_landmarks: if filter_steps.is_empty() {
                0.0
            } else {
                visible_total as f64 / filter_steps.len() as f64
            },
            rms_error: (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt(),
            final_error: errors.last().copied().unwrap_or_default(),
        }
    }
}
