//! Decaying-velocity motion model
//!
//! Scroll-style inertial deceleration: velocity is multiplied by a
//! retention rate once per nominal millisecond, and position follows the
//! closed-form integral of that exponential. The rate stays a
//! per-millisecond constant (the original platform convention) rather
//! than a per-second one, so the published presets keep their meaning.

use crate::spring::{VALUE_EPSILON, VELOCITY_EPSILON};
use crate::values::AnimVector;

/// Nominal rate applications per second (the rate is per millisecond)
const UNITS_PER_SECOND: f64 = 1000.0;

/// Parameters for a decay animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayConfig {
    /// Per-millisecond velocity retention factor, in `(0, 1)`
    pub rate: f64,
}

impl DecayConfig {
    /// Standard scroll deceleration
    pub const NORMAL: DecayConfig = DecayConfig { rate: 0.998 };
    /// Faster stop, for short flicks
    pub const FAST: DecayConfig = DecayConfig { rate: 0.99 };

    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// `1000 * ln(rate)`: the continuous-time decay coefficient.
    ///
    /// Negative for any valid rate. `None` when the rate is degenerate
    /// (`<= 0` or `>= 1`), in which case the motion completes immediately
    /// instead of dividing by zero.
    fn coefficient(&self) -> Option<f64> {
        if self.rate <= 0.0 || self.rate >= 1.0 {
            None
        } else {
            Some(UNITS_PER_SECOND * self.rate.ln())
        }
    }

    /// The asymptotic resting position for a starting value and velocity:
    /// `value - velocity / (1000 * ln(rate))`.
    pub fn target_for(&self, value: &AnimVector, velocity: &AnimVector) -> AnimVector {
        match self.coefficient() {
            Some(coeff) => value.sub(&velocity.scale(1.0 / coeff)),
            None => value.clone(),
        }
    }

    /// The initial velocity that makes the trajectory come to rest at
    /// `target`. Exact inverse of [`target_for`](Self::target_for).
    pub fn velocity_for(&self, value: &AnimVector, target: &AnimVector) -> AnimVector {
        match self.coefficient() {
            Some(coeff) => target.sub(value).scale(-coeff),
            None => AnimVector::zeros(value.len()),
        }
    }

    /// Seconds until `|velocity|` has decayed below the rest epsilon
    pub fn duration_for(&self, velocity: &AnimVector) -> f64 {
        let speed = velocity.max_abs_component();
        match self.coefficient() {
            Some(coeff) if speed > VELOCITY_EPSILON => (VELOCITY_EPSILON / speed).ln() / coeff,
            _ => 0.0,
        }
    }

    /// Advance `(value, velocity)` by `dt` seconds using the closed-form
    /// integral of the decay. Non-positive `dt` is a no-op.
    pub fn step(&self, value: &mut AnimVector, velocity: &mut AnimVector, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let Some(coeff) = self.coefficient() else {
            // Degenerate rate: nothing meaningful to integrate
            *velocity = AnimVector::zeros(velocity.len());
            return;
        };

        let q = self.rate.powf(UNITS_PER_SECOND * dt);
        let travelled = velocity.scale((q - 1.0) / coeff);
        *value = value.add(&travelled);
        *velocity = velocity.scale(q);
    }

    /// At rest: velocity and the remaining distance to `target` are both
    /// below the epsilons.
    pub fn is_converged(
        &self,
        value: &AnimVector,
        velocity: &AnimVector,
        target: &AnimVector,
    ) -> bool {
        velocity.max_abs_component() < VELOCITY_EPSILON
            && value.sub(target).max_abs_component() < VALUE_EPSILON
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self::NORMAL
    }
}
