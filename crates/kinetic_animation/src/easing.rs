//! Fixed-duration easing model
//!
//! A timing curve maps the linear time fraction `t = elapsed / duration`
//! to an eased fraction in `[0, 1]`, which interpolates componentwise
//! between the start and target vectors. Velocity is derived from the
//! curve for reporting and retarget hand-off only; it never drives the
//! motion.

use crate::values::AnimVector;

/// Timing curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    /// Four control-point cubic Bézier, CSS `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Apply the curve to a time fraction in `[0, 1]`
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }

    /// Slope of the curve at `t`, via central finite difference.
    fn slope(&self, t: f64) -> f64 {
        const H: f64 = 1e-5;
        let lo = (t - H).max(0.0);
        let hi = (t + H).min(1.0);
        if hi <= lo {
            return 0.0;
        }
        (self.apply(hi) - self.apply(lo)) / (hi - lo)
    }
}

/// Cubic bezier easing calculation (matches CSS spec / browser behavior).
///
/// Solves for the curve parameter with Newton-Raphson, falling back to
/// binary search when the slope is too flat to make progress.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    // Solve bezier_x(p) == t for the parameter p
    let mut p = t; // initial guess
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - t;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = t;
    for _ in 0..24 {
        let val = bezier_sample(p, x1, x2);
        if (val - t).abs() < 1e-7 {
            break;
        }
        if val < t {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate one bezier axis at parameter t, Horner form
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of one bezier axis at parameter t
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

/// Parameters for a fixed-duration easing animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EasingConfig {
    pub curve: Easing,
    /// Duration in seconds
    pub duration: f64,
}

impl EasingConfig {
    pub fn new(curve: Easing, duration: f64) -> Self {
        Self { curve, duration }
    }

    /// A linear ramp over `duration` seconds
    pub fn linear(duration: f64) -> Self {
        Self::new(Easing::Linear, duration)
    }

    /// Sample the trajectory at `elapsed` seconds of running time.
    ///
    /// Returns `(value, velocity, converged)`. At or past the duration the
    /// value is the target *exactly*, which guarantees a deterministic
    /// terminal sample. A non-positive duration converges immediately.
    pub fn sample(
        &self,
        start: &AnimVector,
        target: &AnimVector,
        elapsed: f64,
    ) -> (AnimVector, AnimVector, bool) {
        if self.duration <= 0.0 || elapsed >= self.duration {
            return (target.clone(), AnimVector::zeros(target.len()), true);
        }

        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        let value = start.lerp(target, self.curve.apply(t));
        let velocity = target.sub(start).scale(self.curve.slope(t) / self.duration);
        (value, velocity, false)
    }
}
