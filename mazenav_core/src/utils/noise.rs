// mazenav_core/src/utils/noise.rs

//! Noise injection shared by the wheels and the sensors.

use rand::Rng;

/// Perturbs `value` by `uniform(-value, value) * level`.
///
/// The sample is drawn as `value * uniform(-1, 1)` so a zero value (an idle
/// wheel, a zero bearing) stays exactly zero instead of forming an empty range.
pub fn multiplicative<R: Rng + ?Sized>(value: f64, level: f64, rng: &mut R) -> f64 {
    if level == 0.0 || value == 0.0 {
        return value;
    }
    let u: f64 = rng.gen_range(-1.0..=1.0);
    value + value * u * level
}
