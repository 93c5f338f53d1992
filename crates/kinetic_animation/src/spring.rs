//! Spring physics motion model
//!
//! A damped harmonic oscillator with unit mass, advanced per component by
//! the analytic solution of the motion equation rather than numeric
//! integration. The closed form is exact for any step size, so the spring
//! stays stable under irregular frame deltas, and retargeting mid-flight
//! keeps the current velocity as the next step's initial condition.

use crate::values::AnimVector;

/// Displacement below which a component counts as at-target
pub(crate) const VALUE_EPSILON: f64 = 1e-3;
/// Velocity magnitude below which a component counts as at-rest
pub(crate) const VELOCITY_EPSILON: f64 = 1e-3;
/// Envelope ratio used for the analytic settling-time estimate
const SETTLING_RATIO: f64 = 1e-3;

/// Configuration for a spring animation (mass fixed at 1)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f64,
    pub damping: f64,
}

impl SpringConfig {
    pub fn new(stiffness: f64, damping: f64) -> Self {
        Self { stiffness, damping }
    }

    /// Express the spring as a response duration (seconds per undamped
    /// period) and a bounce factor in `(-1, 1]`, where 0 is critically
    /// damped and larger values overshoot more.
    pub fn with_response(response: f64, bounce: f64) -> Self {
        assert!(response > 0.0, "spring response must be positive");
        let omega = std::f64::consts::TAU / response;
        let zeta = 1.0 - bounce;
        Self {
            stiffness: omega * omega,
            damping: 2.0 * zeta * omega,
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0)
    }

    /// A very stiff spring with minimal oscillation
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0)
    }

    /// Damping that settles fastest without oscillating
    pub fn critical_damping(&self) -> f64 {
        2.0 * self.stiffness.max(0.0).sqrt()
    }

    pub fn damping_ratio(&self) -> f64 {
        let critical = self.critical_damping();
        if critical > 0.0 {
            self.damping / critical
        } else {
            0.0
        }
    }

    /// Will the spring oscillate around the target?
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 1e-9
    }

    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping() && !self.is_critically_damped()
    }

    /// Analytic estimate of the time for the oscillation envelope to decay
    /// below a negligible fraction of its initial amplitude.
    ///
    /// Convergence gates on this in addition to the displacement/velocity
    /// epsilons, so a single lucky near-zero sample early in the motion is
    /// never mistaken for having settled.
    pub fn settling_time(&self) -> f64 {
        if self.stiffness <= 0.0 {
            return 0.0;
        }
        let omega = self.stiffness.sqrt();
        let ln_ratio = -SETTLING_RATIO.ln();
        let disc = self.damping * self.damping - 4.0 * self.stiffness;
        if disc > 0.0 {
            // Overdamped: the envelope is governed by the slowest root
            let slow_root = (self.damping - disc.sqrt()) / 2.0;
            ln_ratio / slow_root.max(f64::MIN_POSITIVE)
        } else {
            let sigma = (self.damping_ratio() * omega).max(f64::MIN_POSITIVE);
            ln_ratio / sigma
        }
    }

    /// Advance `(value, velocity)` toward `target` by `dt` seconds.
    ///
    /// Each component is displaced from the target and run through the
    /// closed-form solution of `x'' + c x' + k x = 0`, branch selected by
    /// the sign of the discriminant `c^2 - 4k`. Non-positive `dt` is a
    /// no-op; a degenerate (non-positive) stiffness snaps to the target.
    pub fn step(
        &self,
        value: &mut AnimVector,
        velocity: &mut AnimVector,
        target: &AnimVector,
        dt: f64,
    ) {
        if dt <= 0.0 {
            return;
        }
        if self.stiffness <= 0.0 {
            // No restoring force to integrate; treat as complete
            *value = target.clone();
            *velocity = AnimVector::zeros(target.len());
            return;
        }

        let k = self.stiffness;
        let c = self.damping;
        let disc = c * c - 4.0 * k;

        let n = value.len().min(velocity.len()).min(target.len());
        for i in 0..n {
            let x0 = value[i] - target[i];
            let v0 = velocity[i];
            let (x, v) = if disc.abs() < 1e-9 {
                step_critical(k.sqrt(), x0, v0, dt)
            } else if disc < 0.0 {
                step_underdamped(k, c, x0, v0, dt)
            } else {
                step_overdamped(c, disc, x0, v0, dt)
            };
            value[i] = target[i] + x;
            velocity[i] = v;
        }
    }

    /// Has the motion settled at `target`?
    ///
    /// Requires displacement and velocity under the epsilons *and* the
    /// elapsed running time to exceed the analytic settling estimate.
    pub fn is_converged(
        &self,
        value: &AnimVector,
        velocity: &AnimVector,
        target: &AnimVector,
        elapsed: f64,
    ) -> bool {
        if self.stiffness <= 0.0 {
            return true;
        }
        elapsed >= self.settling_time()
            && value.sub(target).max_abs_component() < VALUE_EPSILON
            && velocity.max_abs_component() < VELOCITY_EPSILON
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// Underdamped branch: decaying sinusoid around the target
fn step_underdamped(k: f64, c: f64, x0: f64, v0: f64, dt: f64) -> (f64, f64) {
    let sigma = c / 2.0;
    let omega_d = (k - sigma * sigma).sqrt();
    debug_assert!(omega_d > 0.0);

    let envelope = (-sigma * dt).exp();
    let (sin, cos) = (omega_d * dt).sin_cos();
    let a = x0;
    let b = (v0 + sigma * x0) / omega_d;

    let x = envelope * (a * cos + b * sin);
    let v = envelope * ((b * omega_d - sigma * a) * cos - (a * omega_d + sigma * b) * sin);
    (x, v)
}

/// Critically damped branch: `(A + B t) e^{-w t}`
fn step_critical(omega: f64, x0: f64, v0: f64, dt: f64) -> (f64, f64) {
    let envelope = (-omega * dt).exp();
    let a = x0;
    let b = v0 + omega * x0;

    let x = envelope * (a + b * dt);
    let v = envelope * (b - omega * (a + b * dt));
    (x, v)
}

/// Overdamped branch: sum of two real exponentials
fn step_overdamped(c: f64, disc: f64, x0: f64, v0: f64, dt: f64) -> (f64, f64) {
    let root = disc.sqrt();
    let r1 = (-c + root) / 2.0;
    let r2 = (-c - root) / 2.0;

    let c2 = (v0 - r1 * x0) / (r2 - r1);
    let c1 = x0 - c2;
    let e1 = (r1 * dt).exp();
    let e2 = (r2 * dt).exp();

    let x = c1 * e1 + c2 * e2;
    let v = c1 * r1 * e1 + c2 * r2 * e2;
    (x, v)
}
