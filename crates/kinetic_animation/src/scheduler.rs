//! Animation scheduler
//!
//! Process-wide registry of running animations, advanced in lockstep by
//! one shared frame clock. The clock itself is external: the embedder
//! calls [`AnimationScheduler::tick`] with a monotonic timestamp at
//! display cadence, and the return value says whether any animation still
//! wants frames, so the embedder can let its frame source go idle.
//!
//! All stepping is expected on one designated thread. Registered ids are
//! snapshotted before each pass and callbacks run with the registry
//! released, so a value-changed or completion callback may start, stop,
//! or retarget animations (including itself) reentrantly without skipped
//! or double-processed entries.

use crate::animation::{
    Animation, AnimationState, CompletionCallback, CompletionEvent, MotionModel, StopPosition,
    TickEvents,
};
use crate::values::{AnimVector, Animatable};
use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Upper bound on one frame's delta-time, in seconds.
///
/// After the frame source was suspended (window hidden, app backgrounded)
/// the first delta can span seconds; animations resume from where they
/// paused instead of teleporting.
const MAX_FRAME_DELTA: f64 = 0.1;

new_key_type! {
    /// Handle to a registered animation
    pub struct AnimationId;
}

/// Internal state of the animation scheduler
struct SchedulerInner {
    animations: SlotMap<AnimationId, Animation>,
    last_tick: Option<Instant>,
}

/// Invoke an animation's callbacks for the given tick events.
///
/// Callbacks are taken out of the animation and run with the registry
/// lock released, then restored (or the animation removed, if it
/// finished). This is what makes reentrant registry mutation from inside
/// a callback safe.
fn dispatch_events(inner: &Mutex<SchedulerInner>, id: AnimationId, events: TickEvents) {
    let TickEvents {
        value_changed,
        completion,
    } = events;
    if !value_changed && completion.is_none() {
        return;
    }

    let taken = {
        let mut guard = inner.lock().unwrap();
        guard.animations.get_mut(id).map(|animation| {
            let emitted = value_changed.then(|| animation.emitted_value());
            let (value_cb, completion_cb) = animation.take_callbacks();
            (emitted, value_cb, completion_cb)
        })
    };
    let Some((emitted, mut value_cb, mut completion_cb)) = taken else {
        return;
    };

    if let (Some(value), Some(cb)) = (emitted.as_ref(), value_cb.as_mut()) {
        cb(value);
    }
    let finished = matches!(completion, Some(CompletionEvent::Finished { .. }));
    if let (Some(event), Some(cb)) = (completion.as_ref(), completion_cb.as_mut()) {
        cb(event);
    }

    let mut guard = inner.lock().unwrap();
    if finished {
        // Removal happens after the completion has fired
        guard.animations.remove(id);
        tracing::trace!(?id, "animation finished and deregistered");
    } else if let Some(animation) = guard.animations.get_mut(id) {
        animation.restore_callbacks(value_cb, completion_cb);
    }
}

/// The animation scheduler that ticks all registered animations
///
/// Typically owned by the application context and shared with proxies and
/// transactions via [`SchedulerHandle`]. Injectable rather than a hidden
/// global, so tests can run their own clock.
pub struct AnimationScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                animations: SlotMap::with_key(),
                last_tick: None,
            })),
        }
    }

    /// Get a weak handle for passing to proxies and transactions
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Advance all running animations to `now`.
    ///
    /// The delta since the previous tick is clamped to [`MAX_FRAME_DELTA`].
    /// Returns `true` while any animation still wants frames; on `false`
    /// the frame source may go idle until something registers or starts.
    pub fn tick(&self, now: Instant) -> bool {
        let dt = {
            let mut guard = self.inner.lock().unwrap();
            let dt = match guard.last_tick {
                Some(previous) => (now - previous).as_secs_f64().min(MAX_FRAME_DELTA),
                None => 0.0,
            };
            guard.last_tick = Some(now);
            dt
        };
        self.step_all(dt)
    }

    /// Advance all running animations by an explicit delta, in seconds.
    ///
    /// Zero or negative deltas are no-ops. This is the same pass `tick`
    /// performs, with the clock arithmetic left to the caller. The
    /// wall-clock cursor moves forward by `dt` too, so interleaving
    /// `advance` with `tick` does not double-count the manual delta.
    pub fn advance(&self, dt: f64) -> bool {
        if dt.is_finite() && dt > 0.0 {
            let mut guard = self.inner.lock().unwrap();
            if let Some(previous) = guard.last_tick {
                guard.last_tick = Some(previous + Duration::from_secs_f64(dt));
            }
        }
        self.step_all(dt)
    }

    fn step_all(&self, dt: f64) -> bool {
        // Snapshot the ids first: callbacks may insert or remove
        // animations while we iterate
        let ids: Vec<AnimationId> = {
            let guard = self.inner.lock().unwrap();
            guard.animations.keys().collect()
        };

        for id in ids {
            let events = {
                let mut guard = self.inner.lock().unwrap();
                guard.animations.get_mut(id).map(|a| a.tick(dt))
            };
            // Gone: removed by a reentrant callback earlier in this pass
            let Some(events) = events else { continue };
            dispatch_events(&self.inner, id, events);
        }

        let still_active = self.has_active_animations();
        if !still_active {
            tracing::trace!("scheduler idle: no running animations");
        }
        still_active
    }

    /// Check if any animation is currently running
    pub fn has_active_animations(&self) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.animations.values().any(|a| a.is_running())
    }

    /// Number of registered animations (running or not)
    pub fn animation_count(&self) -> usize {
        self.inner.lock().unwrap().animations.len()
    }

    /// Register an animation without starting it
    pub fn add_animation(&self, animation: Animation) -> AnimationId {
        self.inner.lock().unwrap().animations.insert(animation)
    }

    pub fn remove_animation(&self, id: AnimationId) -> Option<Animation> {
        self.inner.lock().unwrap().animations.remove(id)
    }

    /// Stop every registered animation at its current position.
    ///
    /// With `immediately`, every animation snaps and completes this call;
    /// otherwise each one glides to a stop under its own motion model.
    pub fn stop_all_animations(&self, immediately: bool) {
        let ids: Vec<AnimationId> = {
            let guard = self.inner.lock().unwrap();
            guard.animations.keys().collect()
        };
        tracing::debug!(count = ids.len(), immediately, "stopping all animations");
        for id in ids {
            let events = {
                let mut guard = self.inner.lock().unwrap();
                guard
                    .animations
                    .get_mut(id)
                    .map(|a| a.stop(StopPosition::Current, immediately))
            };
            let Some(events) = events else { continue };
            dispatch_events(&self.inner, id, events);
        }
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to the animation scheduler
///
/// Passed to proxies and transactions that need to register or drive
/// animations. It won't keep the scheduler alive; once the scheduler is
/// dropped every operation becomes a safe no-op.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Register an animation and return its id
    pub fn register(&self, animation: Animation) -> Option<AnimationId> {
        self.inner.upgrade().map(|inner| {
            let id = inner.lock().unwrap().animations.insert(animation);
            tracing::trace!(?id, "animation registered");
            id
        })
    }

    /// Remove an animation
    pub fn remove(&self, id: AnimationId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().unwrap().animations.remove(id);
        }
    }

    /// Remove an animation, firing one final `Finished` completion at its
    /// current value.
    ///
    /// Cancellation still counts as a completion for whoever is waiting
    /// on it; an aggregate group holding a countdown for this animation
    /// would otherwise never release.
    pub fn cancel_animation(&self, id: AnimationId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed = {
            let mut guard = inner.lock().unwrap();
            guard.animations.remove(id)
        };
        if let Some(mut animation) = removed {
            tracing::trace!(?id, "animation cancelled");
            let (_, completion) = animation.take_callbacks();
            if let Some(mut callback) = completion {
                callback(&CompletionEvent::Finished {
                    value: animation.emitted_value(),
                });
            }
        }
    }

    /// Apply a function to an animation if it exists
    pub fn with_animation<F, R>(&self, id: AnimationId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Animation) -> R,
    {
        self.inner
            .upgrade()
            .and_then(|inner| inner.lock().unwrap().animations.get_mut(id).map(f))
    }

    pub fn animation_value(&self, id: AnimationId) -> Option<AnimVector> {
        self.with_animation(id, |a| a.value().clone())
    }

    pub fn animation_velocity(&self, id: AnimationId) -> Option<AnimVector> {
        self.with_animation(id, |a| a.velocity().clone())
    }

    pub fn animation_state(&self, id: AnimationId) -> Option<AnimationState> {
        self.with_animation(id, |a| a.state())
    }

    /// Is the animation present and running?
    pub fn is_animating(&self, id: AnimationId) -> bool {
        self.with_animation(id, |a| a.is_running()).unwrap_or(false)
    }

    /// Start an animation after `delay` seconds
    pub fn start_animation(&self, id: AnimationId, delay: f64) {
        self.with_animation(id, |a| a.start_after(delay));
    }

    /// Pause an animation, preserving its trajectory state
    pub fn pause_animation(&self, id: AnimationId) {
        self.with_animation(id, |a| a.pause());
    }

    /// Stop an animation at the requested position, firing its completion
    pub fn stop_animation(&self, id: AnimationId, at: StopPosition, immediately: bool) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let events = {
            let mut guard = inner.lock().unwrap();
            guard.animations.get_mut(id).map(|a| a.stop(at, immediately))
        };
        if let Some(events) = events {
            dispatch_events(&inner, id, events);
        }
    }

    /// Replace an animation's target, firing the retarget completion.
    ///
    /// Velocity is preserved into the next tick. Optionally swaps in a
    /// new motion model and completion callback at the same time (the
    /// transaction path: a later declarative block takes over an
    /// animation with its own parameters and group).
    pub fn retarget_animation(
        &self,
        id: AnimationId,
        target: AnimVector,
        model: Option<MotionModel>,
        completion: Option<CompletionCallback>,
    ) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let effect = {
            let mut guard = inner.lock().unwrap();
            guard.animations.get_mut(id).map(|animation| {
                if let Some(model) = model {
                    animation.set_model(model);
                }
                animation.set_target(target)
            })
        };
        let Some(effect) = effect else { return };

        // The retarget completion fires against the *old* callback (it
        // belongs to whoever started the animation), then the new owner's
        // callback is installed
        dispatch_events(
            &inner,
            id,
            TickEvents {
                value_changed: false,
                completion: effect.completion,
            },
        );
        if let Some(completion) = completion {
            let mut guard = inner.lock().unwrap();
            if let Some(animation) = guard.animations.get_mut(id) {
                animation.on_completion(completion);
            }
        }
    }

    pub fn stop_all_animations(&self, immediately: bool) {
        if let Some(inner) = self.inner.upgrade() {
            AnimationScheduler { inner }.stop_all_animations(immediately);
        }
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

// ============================================================================
// Animated Property (typed proxy)
// ============================================================================

/// A typed property that animates toward its target.
///
/// The proxy owns at most one registered [`Animation`] at a time; it is
/// created lazily on the first retarget and deregistered when the proxy
/// drops. Reads fall back to the last known target once the animation has
/// finished and left the registry.
///
/// # Example
///
/// ```ignore
/// let mut x = AnimatedProperty::new(scheduler.handle(), 0.0_f64);
/// AnimationTransaction::new(scheduler.handle(), MotionModel::Spring(SpringConfig::stiff()))
///     .run(|tx| tx.animate_to(&mut x, 100.0));
/// scheduler.tick(Instant::now());
/// let current = x.get();
/// ```
pub struct AnimatedProperty<T: Animatable> {
    handle: SchedulerHandle,
    animation_id: Option<AnimationId>,
    current: T,
    target: T,
    /// Final value of the last finished animation, written from its
    /// completion. An animation may legitimately rest away from the
    /// recorded target (hard stop, decay velocity update), so the target
    /// is only the fallback of last resort.
    settled: Arc<Mutex<Option<AnimVector>>>,
}

impl<T: Animatable> AnimatedProperty<T> {
    /// Create a proxy at `initial`, with no animation registered yet
    pub fn new(handle: SchedulerHandle, initial: T) -> Self {
        Self {
            handle,
            animation_id: None,
            current: initial.clone(),
            target: initial,
            settled: Arc::new(Mutex::new(None)),
        }
    }

    /// Current animated value
    pub fn get(&self) -> T {
        if let Some(id) = self.animation_id {
            if let Some(v) = self.handle.animation_value(id) {
                return T::from_vector(&v);
            }
            // Animation finished and was deregistered: read the value its
            // completion reported
            if let Some(v) = self.settled.lock().unwrap().as_ref() {
                return T::from_vector(v);
            }
            return self.target.clone();
        }
        self.current.clone()
    }

    /// The value this property is animating toward
    pub fn target(&self) -> T {
        self.target.clone()
    }

    /// Current velocity, in value units per second
    pub fn velocity(&self) -> T {
        self.animation_id
            .and_then(|id| self.handle.animation_velocity(id))
            .map(|v| T::from_vector(&v))
            .unwrap_or_else(T::zero)
    }

    pub fn is_animating(&self) -> bool {
        self.animation_id
            .map(|id| self.handle.is_animating(id))
            .unwrap_or(false)
    }

    /// The registered animation driving this property, if any
    pub fn current_animation(&self) -> Option<AnimationId> {
        self.animation_id
    }

    /// Set the value immediately, cancelling any active animation.
    ///
    /// The cancelled animation's completion fires once at the value it
    /// had, so completion groups waiting on it still resolve.
    pub fn set_immediate(&mut self, value: T) {
        if let Some(id) = self.animation_id.take() {
            self.handle.cancel_animation(id);
        }
        *self.settled.lock().unwrap() = None;
        self.current = value.clone();
        self.target = value;
    }

    /// Jump to the target, cancelling any active animation
    pub fn snap_to_target(&mut self) {
        let target = self.target.clone();
        self.set_immediate(target);
    }

    /// Record the new target and return the vectors the transaction needs
    pub(crate) fn begin_retarget(&mut self, target: T) -> (AnimVector, AnimVector) {
        let current = self.get();
        self.target = target.clone();
        *self.settled.lock().unwrap() = None;
        (current.to_vector(), target.to_vector())
    }

    /// Overwrite the stored target with the one the animation actually
    /// settled on. Decay derives its own resting point from velocity.
    pub(crate) fn store_target_vector(&mut self, target: &AnimVector) {
        self.target = T::from_vector(target);
    }

    /// Shared cell the transaction's completion callback writes the
    /// animation's final value into
    pub(crate) fn settled_cell(&self) -> Arc<Mutex<Option<AnimVector>>> {
        Arc::clone(&self.settled)
    }

    pub(crate) fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    pub(crate) fn live_animation(&self) -> Option<AnimationId> {
        self.animation_id
            .filter(|id| self.handle.animation_state(*id).is_some())
    }

    pub(crate) fn adopt_animation(&mut self, id: AnimationId) {
        self.animation_id = Some(id);
    }
}

impl<T: Animatable> Drop for AnimatedProperty<T> {
    fn drop(&mut self) {
        if let Some(id) = self.animation_id {
            self.handle.cancel_animation(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn spring_animation(from: f64, to: f64) -> Animation {
        Animation::new(
            MotionModel::Spring(SpringConfig::stiff()),
            AnimVector::from_slice(&[from]),
            AnimVector::from_slice(&[to]),
        )
    }

    #[test]
    fn test_tick_advances_running_animations() {
        let scheduler = AnimationScheduler::new();
        let id = scheduler.add_animation(spring_animation(0.0, 100.0));
        let handle = scheduler.handle();
        handle.start_animation(id, 0.0);

        assert!(scheduler.advance(1.0 / 60.0));
        let value = handle.animation_value(id).unwrap();
        assert!(value[0] > 0.0);
    }

    #[test]
    fn test_clock_delta_is_clamped() {
        let scheduler = AnimationScheduler::new();
        let id = scheduler.add_animation(spring_animation(0.0, 100.0));
        let handle = scheduler.handle();
        handle.start_animation(id, 0.0);

        let t0 = Instant::now();
        scheduler.tick(t0);
        // A five-second gap (suspended frame source) must advance by at
        // most the clamp, not teleport to the target
        scheduler.tick(t0 + Duration::from_secs(5));
        let value = handle.animation_value(id).unwrap();
        let expected = {
            let mut probe = spring_animation(0.0, 100.0);
            probe.start();
            probe.tick(MAX_FRAME_DELTA);
            probe.value()[0]
        };
        assert!((value[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_advance_moves_the_wall_clock_cursor() {
        use crate::easing::EasingConfig;

        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();
        // Linear unit easing: value equals elapsed seconds
        let id = scheduler.add_animation(Animation::new(
            MotionModel::Easing(EasingConfig::linear(1.0)),
            AnimVector::from_slice(&[0.0]),
            AnimVector::from_slice(&[1.0]),
        ));
        handle.start_animation(id, 0.0);

        let t0 = Instant::now();
        scheduler.tick(t0);
        scheduler.advance(0.05);
        // The manual delta moved the cursor too, so this tick contributes
        // only the remaining 30ms instead of re-counting all 80
        scheduler.tick(t0 + Duration::from_millis(80));

        let value = handle.animation_value(id).unwrap();
        assert!((value[0] - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_finished_animation_is_removed_after_completion() {
        let scheduler = AnimationScheduler::new();
        let completions = Arc::new(AtomicUsize::new(0));

        let mut animation = spring_animation(1.0, 1.0);
        let seen = Arc::clone(&completions);
        animation.on_completion(Box::new(move |event| {
            assert!(matches!(event, CompletionEvent::Finished { .. }));
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        animation.start();
        scheduler.add_animation(animation);

        assert_eq!(scheduler.animation_count(), 1);
        let active = scheduler.advance(1.0 / 60.0);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.animation_count(), 0);
        assert!(!active, "scheduler reports idle once the registry drains");
    }

    #[test]
    fn test_reentrant_callback_can_register_animations() {
        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();

        let mut animation = spring_animation(2.0, 2.0);
        let reentrant = handle.clone();
        animation.on_completion(Box::new(move |_| {
            // Starting another animation from inside a completion must
            // not deadlock or get skipped
            let mut next = Animation::new(
                MotionModel::Spring(SpringConfig::stiff()),
                AnimVector::from_slice(&[0.0]),
                AnimVector::from_slice(&[10.0]),
            );
            next.start();
            reentrant.register(next);
        }));
        animation.start();
        scheduler.add_animation(animation);

        scheduler.advance(1.0 / 60.0);
        assert_eq!(scheduler.animation_count(), 1);
        assert!(scheduler.has_active_animations());
    }

    #[test]
    fn test_stop_all_immediately_completes_everything() {
        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();
        for i in 0..3 {
            let id = scheduler.add_animation(spring_animation(0.0, 100.0 + i as f64));
            handle.start_animation(id, 0.0);
        }
        scheduler.advance(1.0 / 60.0);

        scheduler.stop_all_animations(true);
        assert!(!scheduler.has_active_animations());
        assert_eq!(scheduler.animation_count(), 0);
    }

    #[test]
    fn test_stop_all_softly_keeps_animations_gliding() {
        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();
        let id = scheduler.add_animation(spring_animation(0.0, 100.0));
        handle.start_animation(id, 0.0);
        for _ in 0..10 {
            scheduler.advance(1.0 / 60.0);
        }

        scheduler.stop_all_animations(false);
        // Still running, but now aimed at its current position
        assert!(scheduler.has_active_animations());
        let target = handle.with_animation(id, |a| a.target().clone()).unwrap();
        let value = handle.animation_value(id).unwrap();
        assert_eq!(target, value);
    }

    #[test]
    fn test_handle_outlives_scheduler_safely() {
        let handle = {
            let scheduler = AnimationScheduler::new();
            scheduler.handle()
        };
        assert!(!handle.is_alive());
        assert!(handle.register(spring_animation(0.0, 1.0)).is_none());
        handle.stop_all_animations(true); // no-op, no panic
    }

    #[test]
    fn test_animated_property_lifecycle() {
        let scheduler = AnimationScheduler::new();
        let mut property = AnimatedProperty::new(scheduler.handle(), 0.0_f64);

        assert_eq!(property.get(), 0.0);
        assert!(!property.is_animating());

        property.set_immediate(42.0);
        assert_eq!(property.get(), 42.0);
        assert_eq!(property.target(), 42.0);
        assert_eq!(property.velocity(), 0.0);
    }

    #[test]
    fn test_animated_property_drop_deregisters() {
        let scheduler = AnimationScheduler::new();
        {
            let mut property = AnimatedProperty::new(scheduler.handle(), 0.0_f64);
            let mut animation = spring_animation(0.0, 100.0);
            animation.start();
            let id = scheduler.handle().register(animation).unwrap();
            property.adopt_animation(id);
            assert_eq!(scheduler.animation_count(), 1);
        }
        assert_eq!(scheduler.animation_count(), 0);
    }
}
