//! Kinetic Animation Engine
//!
//! Drives continuous interpolation of typed properties (numbers, points,
//! sizes, rectangles, colors, transforms, and composites) toward target
//! values, without the consumer stepping a timer by hand.
//!
//! # Features
//!
//! - **Spring Physics**: closed-form damped-oscillator stepping, stable
//!   at any frame delta, with velocity-preserving retargets
//! - **Easing Curves**: fixed-duration motion over named curves or
//!   four-point cubic Béziers, with exact terminal samples
//! - **Decay Motion**: scroll-style inertial deceleration with
//!   closed-form target and duration
//! - **Vector Abstraction**: any property type animates once it maps to a
//!   flat list of components via [`Animatable`]
//! - **Frame Scheduler**: one external clock advances every animation in
//!   lockstep; the registry reports when it wants to go idle
//! - **Declarative Blocks**: animate many property writes with shared
//!   parameters and one aggregate completion
//!
//! The engine computes trajectories and reports value changes; applying
//! each value to a real object (view, layer, window) is the consumer's
//! job.

pub mod animation;
pub mod decay;
pub mod easing;
pub mod geometry;
pub mod scheduler;
pub mod spring;
pub mod transaction;
pub mod values;

pub use animation::{
    Animation, AnimationOptions, AnimationState, CompletionEvent, MotionModel, StopPosition,
};
pub use decay::DecayConfig;
pub use easing::{Easing, EasingConfig};
pub use geometry::{Color, Point, Rect, Size, Transform};
pub use scheduler::{AnimatedProperty, AnimationId, AnimationScheduler, SchedulerHandle};
pub use spring::SpringConfig;
pub use transaction::{update_velocity, AnimationGroup, AnimationTransaction, VelocityTransaction};
pub use values::{AnimVector, Animatable};
