//! Declarative animation blocks
//!
//! The entry point for "animate these property writes with these
//! settings". A transaction records explicit `animate_to` calls against
//! [`AnimatedProperty`] proxies, turning each one into a new animation or
//! a retarget of the property's existing animation. Everything touched in
//! one transaction shares the motion model, delay, options, and one
//! completion group. The observable contract per property is *last write
//! wins* within a block, not accumulation.

use crate::animation::{
    Animation, AnimationOptions, CompletionCallback, CompletionEvent, MotionModel,
};
use crate::scheduler::{AnimatedProperty, SchedulerHandle};
use crate::values::{AnimVector, Animatable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Aggregate completion for the animations started by one transaction.
///
/// Holds a countdown of member animations plus one sentinel for the
/// recording body itself; each member completion (finished, or retargeted
/// away by a later transaction) decrements it, and the group callback
/// fires exactly once when the count reaches zero, on the same call
/// context as the last member's own completion.
pub struct AnimationGroup {
    remaining: AtomicUsize,
    on_complete: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl AnimationGroup {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            // The sentinel keeps the group from firing while the body is
            // still staging members
            remaining: AtomicUsize::new(1),
            on_complete: Mutex::new(None),
        })
    }

    fn set_completion(&self, callback: Box<dyn FnOnce() + Send>) {
        *self.on_complete.lock().unwrap() = Some(callback);
    }

    fn add_member(&self) {
        self.remaining.fetch_add(1, Ordering::SeqCst);
    }

    fn complete_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Some(callback) = self.on_complete.lock().unwrap().take() {
                tracing::trace!("animation group complete");
                callback();
            }
        }
    }

    /// A per-member completion callback: decrements the countdown once,
    /// no matter how many events the animation goes on to emit.
    fn member_callback(self: &Arc<Self>) -> CompletionCallback {
        let group = Arc::clone(self);
        let mut done = false;
        Box::new(move |_event| {
            if !done {
                done = true;
                group.complete_one();
            }
        })
    }
}

/// Builder and recording context for one declarative animation block
///
/// # Example
///
/// ```ignore
/// AnimationTransaction::new(scheduler.handle(), MotionModel::Spring(SpringConfig::stiff()))
///     .delay(0.1)
///     .on_complete(|| println!("all done"))
///     .run(|tx| {
///         tx.animate_to(&mut position, Point::new(100.0, 50.0));
///         tx.animate_to(&mut opacity, 0.0);
///     });
/// ```
pub struct AnimationTransaction {
    handle: SchedulerHandle,
    model: MotionModel,
    delay: f64,
    options: AnimationOptions,
    priority: i32,
    display_scale: f64,
    group: Arc<AnimationGroup>,
}

impl AnimationTransaction {
    pub fn new(handle: SchedulerHandle, model: MotionModel) -> Self {
        Self {
            handle,
            model,
            delay: 0.0,
            options: AnimationOptions::default(),
            priority: 0,
            display_scale: 1.0,
            group: AnimationGroup::new(),
        }
    }

    /// Delay every animation in this block by `delay` seconds.
    /// Panics on a negative delay.
    pub fn delay(mut self, delay: f64) -> Self {
        assert!(delay >= 0.0, "animation delay must be non-negative");
        self.delay = delay;
        self
    }

    pub fn options(mut self, options: AnimationOptions) -> Self {
        self.options = options;
        self
    }

    /// Ordering hint recorded on every animation in this block
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Display scale used when the integralize option snaps emitted values
    pub fn display_scale(mut self, scale: f64) -> Self {
        assert!(scale > 0.0, "display scale must be positive");
        self.display_scale = scale;
        self
    }

    /// Fire `callback` once every animation in this block has finished or
    /// been retargeted away
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.group.set_completion(Box::new(callback));
        self
    }

    /// Run the recording body and commit the block.
    ///
    /// If the body stages nothing (or every staged animation has already
    /// completed), the group completion fires before `run` returns.
    pub fn run<F>(mut self, body: F)
    where
        F: FnOnce(&mut Self),
    {
        body(&mut self);
        // Release the body's sentinel; the group can now fire
        self.group.complete_one();
    }

    /// Animate `property` toward `target` with this block's settings.
    ///
    /// Creates the property's animation on first use, or retargets the
    /// existing one: the previous owner's completion fires as
    /// `Retargeted`, velocity carries over, and the animation adopts this
    /// block's model, delay, options, and group.
    pub fn animate_to<T: Animatable>(&mut self, property: &mut AnimatedProperty<T>, target: T) {
        self.animate_property(property, target, None);
    }

    /// Like [`animate_to`](Self::animate_to), seeding the animation with
    /// an initial velocity (inertial hand-off from a gesture)
    pub fn animate_to_with_velocity<T: Animatable>(
        &mut self,
        property: &mut AnimatedProperty<T>,
        target: T,
        velocity: T,
    ) {
        self.animate_property(property, target, Some(velocity));
    }

    fn animate_property<T: Animatable>(
        &mut self,
        property: &mut AnimatedProperty<T>,
        target: T,
        velocity: Option<T>,
    ) {
        let (current, target) = property.begin_retarget(target);
        let handle = property.handle().clone();
        let completion = self.member_completion(property.settled_cell());

        if let Some(id) = property.live_animation() {
            self.group.add_member();
            handle.retarget_animation(id, target, Some(self.model), Some(completion));
            let delay = self.delay;
            let options = self.options;
            let priority = self.priority;
            let scale = self.display_scale;
            let settled = handle.with_animation(id, |animation| {
                animation.set_options(options);
                animation.set_delay(delay);
                animation.set_priority(priority);
                animation.set_display_scale(scale);
                if let Some(v) = &velocity {
                    animation.set_velocity(v.to_vector());
                }
                // start_after is a no-op while running; the block's delay
                // defers the retargeted motion instead
                if !animation.start_after(delay) {
                    animation.defer(delay);
                }
                animation.target().clone()
            });
            // Decay re-derives its resting point from the velocity; keep
            // the property's notion of the target in sync with it
            if let Some(settled) = settled {
                property.store_target_vector(&settled);
            }
        } else {
            let mut animation = Animation::new(self.model, current, target);
            animation.set_options(self.options);
            animation.set_delay(self.delay);
            animation.set_priority(self.priority);
            animation.set_display_scale(self.display_scale);
            if let Some(v) = &velocity {
                animation.set_velocity(v.to_vector());
            }
            animation.start_after(self.delay);
            property.store_target_vector(animation.target());
            // Register before counting the member, so a dead scheduler
            // cannot strand the group countdown
            if let Some(id) = self.handle.register(animation) {
                self.group.add_member();
                self.handle
                    .with_animation(id, move |a| a.on_completion(completion));
                property.adopt_animation(id);
            }
        }
    }

    /// Per-member completion: records the animation's final value in the
    /// property's settled cell, then feeds the group countdown. The final
    /// value can differ from the block's target (hard stop, decay
    /// velocity update), and the proxy reports it after deregistration.
    fn member_completion(
        &self,
        cell: Arc<Mutex<Option<AnimVector>>>,
    ) -> CompletionCallback {
        let mut member = self.group.member_callback();
        Box::new(move |event| {
            if let CompletionEvent::Finished { value } = event {
                *cell.lock().unwrap() = Some(value.clone());
            }
            member(event);
        })
    }
}

/// Adjust the velocity of running animations without touching their
/// targets.
///
/// The body receives a context whose `set_velocity` only affects
/// properties with a *running* spring or decay animation; easing
/// animations derive velocity from their curve and are left alone, as are
/// properties with no animation at all.
pub fn update_velocity<F>(handle: &SchedulerHandle, body: F)
where
    F: FnOnce(&mut VelocityTransaction),
{
    let mut tx = VelocityTransaction {
        _handle: handle.clone(),
    };
    body(&mut tx);
}

/// Recording context for [`update_velocity`]
pub struct VelocityTransaction {
    _handle: SchedulerHandle,
}

impl VelocityTransaction {
    pub fn set_velocity<T: Animatable>(&mut self, property: &mut AnimatedProperty<T>, velocity: T) {
        let Some(id) = property.live_animation() else {
            return;
        };
        let settled = property.handle().with_animation(id, |animation| {
            if animation.is_running() {
                animation.set_velocity(velocity.to_vector());
            }
            animation.target().clone()
        });
        // A decay animation moves its resting point with the velocity;
        // the proxy's target follows it
        if let Some(settled) = settled {
            property.store_target_vector(&settled);
        }
    }
}
