//! Animation object and lifecycle state machine
//!
//! An [`Animation`] couples one motion model with one vector-valued
//! trajectory: current, start, and target values plus velocity, all kept
//! as flat component vectors. The scheduler advances it every frame while
//! it is `Running`; callers interact with it through its target, value,
//! and velocity setters and through the lifecycle operations
//! `start`/`pause`/`stop`.

use crate::decay::DecayConfig;
use crate::easing::EasingConfig;
use crate::spring::SpringConfig;
use crate::values::AnimVector;

/// The motion model driving one animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionModel {
    Spring(SpringConfig),
    Easing(EasingConfig),
    Decay(DecayConfig),
}

/// Lifecycle state
///
/// `Ended` is transient: it is observable only inside the tick that
/// reached convergence and is normalized back to `Inactive` once the
/// completion callback has fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationState {
    #[default]
    Inactive,
    Running,
    Ended,
}

/// Where a stopped animation should come to rest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopPosition {
    Start,
    Current,
    End,
}

/// Why a completion callback fired
#[derive(Clone, Debug, PartialEq)]
pub enum CompletionEvent {
    /// The animation reached its target (or was stopped hard)
    Finished { value: AnimVector },
    /// The target was replaced mid-flight; the animation keeps running
    Retargeted { from: AnimVector, to: AnimVector },
}

/// Behavior toggles for one animation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimationOptions {
    /// Jump back to the start value on convergence and keep running
    pub repeats: bool,
    /// Swap start and target on convergence and keep running
    pub autoreverses: bool,
    /// Round emitted values to the pixel grid (stored trajectory stays
    /// continuous)
    pub integralizes: bool,
    /// Retargeting an inactive animation starts it immediately
    pub auto_start: bool,
}

pub type ValueCallback = Box<dyn FnMut(&AnimVector) + Send>;
pub type CompletionCallback = Box<dyn FnMut(&CompletionEvent) + Send>;

/// What one tick did; the scheduler turns this into callback invocations
#[derive(Default)]
pub(crate) struct TickEvents {
    pub value_changed: bool,
    pub completion: Option<CompletionEvent>,
}

/// Effect of a target write; tells the scheduler whether to wake
pub(crate) struct RetargetEffect {
    pub completion: Option<CompletionEvent>,
    pub started: bool,
}

/// A single animated trajectory
pub struct Animation {
    model: MotionModel,
    value: AnimVector,
    start_value: AnimVector,
    target: AnimVector,
    velocity: AnimVector,
    state: AnimationState,
    /// Delay applied by `start()`, seconds
    delay: f64,
    /// Remaining delay consumed from tick delta-time
    pending_delay: f64,
    /// Running time since motion began (delay excluded)
    elapsed: f64,
    /// Resolves ordering ambiguity between overlapping animations;
    /// informational, not enforced by the engine
    priority: i32,
    options: AnimationOptions,
    /// Display scale for pixel snapping of emitted values
    display_scale: f64,
    on_value_changed: Option<ValueCallback>,
    on_completion: Option<CompletionCallback>,
}

impl Animation {
    /// Create an animation at `value`, aimed at `target`.
    ///
    /// Both vectors must have the same length and finite components.
    pub fn new(model: MotionModel, value: AnimVector, target: AnimVector) -> Self {
        assert_eq!(
            value.len(),
            target.len(),
            "value and target must decompose into the same number of components"
        );
        value.assert_finite("animation value");
        target.assert_finite("animation target");

        let velocity = AnimVector::zeros(value.len());
        let mut animation = Self {
            model,
            start_value: value.clone(),
            value,
            target,
            velocity,
            state: AnimationState::Inactive,
            delay: 0.0,
            pending_delay: 0.0,
            elapsed: 0.0,
            priority: 0,
            options: AnimationOptions::default(),
            display_scale: 1.0,
            on_value_changed: None,
            on_completion: None,
        };
        animation.reconcile_decay_target();
        animation
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AnimationState::Running
    }

    pub fn model(&self) -> &MotionModel {
        &self.model
    }

    pub fn value(&self) -> &AnimVector {
        &self.value
    }

    pub fn start_value(&self) -> &AnimVector {
        &self.start_value
    }

    pub fn target(&self) -> &AnimVector {
        &self.target
    }

    pub fn velocity(&self) -> &AnimVector {
        &self.velocity
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn options(&self) -> AnimationOptions {
        self.options
    }

    /// Set the default delay used by `start()`. Panics on negative delay.
    pub fn set_delay(&mut self, delay: f64) {
        assert!(delay >= 0.0, "animation delay must be non-negative");
        self.delay = delay;
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn set_options(&mut self, options: AnimationOptions) {
        self.options = options;
    }

    pub fn set_display_scale(&mut self, scale: f64) {
        assert!(scale > 0.0, "display scale must be positive");
        self.display_scale = scale;
    }

    pub fn on_value_changed(&mut self, callback: ValueCallback) {
        self.on_value_changed = Some(callback);
    }

    pub fn on_completion(&mut self, callback: CompletionCallback) {
        self.on_completion = Some(callback);
    }

    /// The value as observed by the value-changed callback: snapped to the
    /// pixel grid when the integralize option is set.
    pub fn emitted_value(&self) -> AnimVector {
        if self.options.integralizes {
            self.value.round_to_scale(self.display_scale)
        } else {
            self.value.clone()
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Transition to `Running` after the animation's own delay
    pub fn start(&mut self) -> bool {
        let delay = self.delay;
        self.start_after(delay)
    }

    /// Transition to `Running` after `delay` seconds.
    ///
    /// No-op while already running. Panics on negative delay (caller
    /// error, not recoverable). Returns whether the animation newly
    /// transitioned to `Running`, which tells the scheduler to wake.
    pub fn start_after(&mut self, delay: f64) -> bool {
        assert!(delay >= 0.0, "animation delay must be non-negative");
        if self.state == AnimationState::Running {
            return false;
        }
        // A fresh start records the motion origin; a resume after pause
        // (elapsed > 0) keeps the original one
        if self.elapsed == 0.0 {
            self.start_value = self.value.clone();
        }
        self.pending_delay = delay;
        self.state = AnimationState::Running;
        tracing::trace!(delay, "animation started");
        true
    }

    /// Hold the next `delay` seconds of frame time without leaving
    /// `Running`. `start_after` is a no-op while running, so a block that
    /// retargets a live animation applies its delay this way.
    pub(crate) fn defer(&mut self, delay: f64) {
        assert!(delay >= 0.0, "animation delay must be non-negative");
        self.pending_delay = delay;
    }

    /// `Running -> Inactive`, preserving value, velocity, and target.
    ///
    /// Cancels a pending delayed start. Idempotent: pausing an inactive
    /// animation does nothing and fires nothing.
    pub fn pause(&mut self) {
        if self.state != AnimationState::Running {
            return;
        }
        self.pending_delay = 0.0;
        self.state = AnimationState::Inactive;
        tracing::trace!("animation paused");
    }

    /// Stop the animation at the requested position.
    ///
    /// With `immediately`, the value snaps, one `Finished` completion
    /// fires, and the animation goes inactive. Without it, the *target*
    /// moves to the requested position so the motion model brings the
    /// value to rest on its own ("soft stop"). Stopping an inactive
    /// animation is a no-op and fires no duplicate completion.
    pub(crate) fn stop(&mut self, at: StopPosition, immediately: bool) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state != AnimationState::Running {
            return events;
        }

        if immediately {
            let snapped = match at {
                StopPosition::Start => self.start_value.clone(),
                StopPosition::Current => self.value.clone(),
                StopPosition::End => self.target.clone(),
            };
            events.value_changed = snapped != self.value;
            self.value = snapped;
            self.velocity = AnimVector::zeros(self.value.len());
            self.finish_into(&mut events);
        } else {
            let rest = match at {
                StopPosition::Start => self.start_value.clone(),
                StopPosition::Current => self.value.clone(),
                StopPosition::End => self.target.clone(),
            };
            if rest != self.target {
                events.completion = self.replace_target(rest);
            }
        }
        events
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replace the target.
    ///
    /// While running this is a retarget: one `Retargeted` completion
    /// fires, and velocity carries into the next tick untouched, which is
    /// what keeps springs fluid across target changes. While inactive,
    /// the auto-start option (and a genuinely different target) starts
    /// the animation with zero delay.
    pub(crate) fn set_target(&mut self, target: AnimVector) -> RetargetEffect {
        target.assert_finite("animation target");
        assert_eq!(target.len(), self.value.len(), "target length mismatch");

        let mut effect = RetargetEffect {
            completion: None,
            started: false,
        };
        if self.state == AnimationState::Running {
            effect.completion = self.replace_target(target);
        } else {
            let differs = target != self.value;
            self.target = target;
            self.reconcile_decay_target();
            if self.options.auto_start && differs {
                effect.started = self.start_after(0.0);
            }
        }
        effect
    }

    /// Snap the raw value. Legal only while inactive; the scheduler owns
    /// the value while the animation runs.
    pub fn set_value(&mut self, value: AnimVector) {
        debug_assert!(
            self.state != AnimationState::Running,
            "set_value while running is undefined"
        );
        value.assert_finite("animation value");
        assert_eq!(value.len(), self.target.len(), "value length mismatch");
        self.value = value.clone();
        self.start_value = value;
        self.elapsed = 0.0;
    }

    /// Seed velocity, e.g. from a gesture hand-off.
    ///
    /// For a decay animation the implied resting target is re-derived
    /// from the new velocity. Easing animations derive their velocity
    /// from the curve, so the write is ignored for them.
    pub fn set_velocity(&mut self, velocity: AnimVector) {
        velocity.assert_finite("animation velocity");
        assert_eq!(velocity.len(), self.value.len(), "velocity length mismatch");
        match self.model {
            MotionModel::Spring(_) => self.velocity = velocity,
            MotionModel::Decay(config) => {
                self.velocity = velocity;
                self.target = config.target_for(&self.value, &self.velocity);
            }
            MotionModel::Easing(_) => {}
        }
    }

    /// Swap the motion model, e.g. when a later declarative block takes
    /// over this animation with different parameters. The trajectory
    /// state (value, velocity) carries over unchanged.
    pub(crate) fn set_model(&mut self, model: MotionModel) {
        self.model = model;
        self.reconcile_decay_target();
    }

    fn replace_target(&mut self, target: AnimVector) -> Option<CompletionEvent> {
        let from = std::mem::replace(&mut self.target, target);
        // Easing restarts its interpolation from the current value;
        // spring and decay just see a new equilibrium
        if matches!(self.model, MotionModel::Easing(_)) {
            self.start_value = self.value.clone();
            self.elapsed = 0.0;
        }
        self.reconcile_decay_target();
        Some(CompletionEvent::Retargeted {
            from,
            to: self.target.clone(),
        })
    }

    /// A decay target implies a specific initial velocity; keep the two
    /// consistent whenever the target is written directly.
    fn reconcile_decay_target(&mut self) {
        if let MotionModel::Decay(config) = self.model {
            if self.target != self.value {
                self.velocity = config.velocity_for(&self.value, &self.target);
            }
        }
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance by `dt` seconds of frame time.
    ///
    /// Consumes any pending delay first; zero or negative deltas are
    /// no-ops. On convergence the repeat/autoreverse options re-enter
    /// `Running`; otherwise the animation ends, firing `Finished`.
    pub(crate) fn tick(&mut self, dt: f64) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state != AnimationState::Running || dt <= 0.0 {
            return events;
        }

        let mut dt = dt;
        if self.pending_delay > 0.0 {
            if dt < self.pending_delay {
                self.pending_delay -= dt;
                return events;
            }
            dt -= self.pending_delay;
            self.pending_delay = 0.0;
            if dt == 0.0 {
                return events;
            }
        }

        // Already at rest at the target: complete without a spurious
        // value-changed emission
        if self.value == self.target && self.velocity.magnitude_squared() == 0.0 {
            self.finish_into(&mut events);
            return events;
        }

        self.elapsed += dt;
        let converged = match self.model {
            MotionModel::Spring(config) => {
                config.step(&mut self.value, &mut self.velocity, &self.target, dt);
                config.is_converged(&self.value, &self.velocity, &self.target, self.elapsed)
            }
            MotionModel::Easing(config) => {
                let (value, velocity, done) =
                    config.sample(&self.start_value, &self.target, self.elapsed);
                self.value = value;
                self.velocity = velocity;
                done
            }
            MotionModel::Decay(config) => {
                config.step(&mut self.value, &mut self.velocity, dt);
                config.is_converged(&self.value, &self.velocity, &self.target)
            }
        };
        events.value_changed = true;

        if converged {
            if self.options.autoreverses {
                std::mem::swap(&mut self.start_value, &mut self.target);
                self.value = self.start_value.clone();
                self.velocity = AnimVector::zeros(self.value.len());
                self.elapsed = 0.0;
            } else if self.options.repeats {
                self.value = self.start_value.clone();
                self.velocity = AnimVector::zeros(self.value.len());
                self.elapsed = 0.0;
            } else {
                self.value = self.target.clone();
                self.finish_into(&mut events);
            }
        }
        events
    }

    /// `Running -> Ended -> Inactive`, recording the `Finished` event
    fn finish_into(&mut self, events: &mut TickEvents) {
        self.state = AnimationState::Ended;
        self.velocity = AnimVector::zeros(self.value.len());
        self.elapsed = 0.0;
        self.pending_delay = 0.0;
        events.completion = Some(CompletionEvent::Finished {
            value: self.emitted_value(),
        });
        // Ended is transient; the state machine normalizes back to
        // Inactive once the completion has been recorded
        self.state = AnimationState::Inactive;
    }

    // Callback plumbing for the scheduler: callbacks are taken out before
    // invocation so they run without the registry borrowed, letting them
    // start, stop, or retarget animations reentrantly.

    pub(crate) fn take_callbacks(&mut self) -> (Option<ValueCallback>, Option<CompletionCallback>) {
        (self.on_value_changed.take(), self.on_completion.take())
    }

    pub(crate) fn restore_callbacks(
        &mut self,
        value: Option<ValueCallback>,
        completion: Option<CompletionCallback>,
    ) {
        // A callback installed reentrantly while these were out wins
        if self.on_value_changed.is_none() {
            self.on_value_changed = value;
        }
        if self.on_completion.is_none() {
            self.on_completion = completion;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_animation(from: f64, to: f64) -> Animation {
        Animation::new(
            MotionModel::Spring(SpringConfig::stiff()),
            AnimVector::from_slice(&[from]),
            AnimVector::from_slice(&[to]),
        )
    }

    #[test]
    fn test_equal_start_and_target_completes_immediately() {
        let mut animation = spring_animation(5.0, 5.0);
        animation.start();

        let events = animation.tick(1.0 / 60.0);
        assert!(!events.value_changed, "no spurious value-changed");
        assert!(matches!(
            events.completion,
            Some(CompletionEvent::Finished { .. })
        ));
        assert_eq!(animation.state(), AnimationState::Inactive);
    }

    #[test]
    fn test_retarget_preserves_velocity() {
        let mut animation = spring_animation(0.0, 100.0);
        animation.start();
        for _ in 0..10 {
            animation.tick(1.0 / 60.0);
        }
        let before = animation.velocity().clone();
        assert!(before.magnitude_squared() > 0.0);

        let effect = animation.set_target(AnimVector::from_slice(&[50.0]));
        assert!(matches!(
            effect.completion,
            Some(CompletionEvent::Retargeted { .. })
        ));
        assert_eq!(animation.velocity(), &before);
        assert!(animation.is_running());
    }

    #[test]
    fn test_delay_consumed_from_tick_time() {
        let mut animation = spring_animation(0.0, 100.0);
        animation.start_after(0.05);

        // Two 1/30s ticks: the first is swallowed whole by the delay, the
        // second spends half of itself finishing it
        let events = animation.tick(1.0 / 30.0);
        assert!(!events.value_changed);
        assert_eq!(animation.value()[0], 0.0);

        let events = animation.tick(1.0 / 30.0);
        assert!(events.value_changed);
        assert!(animation.value()[0] > 0.0);
    }

    #[test]
    fn test_pause_preserves_state_and_is_idempotent() {
        let mut animation = spring_animation(0.0, 100.0);
        animation.start();
        for _ in 0..10 {
            animation.tick(1.0 / 60.0);
        }
        let value = animation.value().clone();
        let velocity = animation.velocity().clone();

        animation.pause();
        assert_eq!(animation.state(), AnimationState::Inactive);
        animation.pause(); // second pause is a no-op
        assert_eq!(animation.value(), &value);
        assert_eq!(animation.velocity(), &velocity);

        // Paused animations ignore ticks
        let events = animation.tick(1.0 / 60.0);
        assert!(!events.value_changed);

        // Resume and keep going from where it stopped
        animation.start_after(0.0);
        animation.tick(1.0 / 60.0);
        assert!(animation.value()[0] > value[0]);
    }

    #[test]
    fn test_stop_on_inactive_is_no_op() {
        let mut animation = spring_animation(0.0, 100.0);
        let events = animation.stop(StopPosition::Current, true);
        assert!(events.completion.is_none());
        assert!(!events.value_changed);
    }

    #[test]
    fn test_hard_stop_at_end_snaps_and_finishes() {
        let mut animation = spring_animation(0.0, 100.0);
        animation.start();
        animation.tick(1.0 / 60.0);

        let events = animation.stop(StopPosition::End, true);
        assert!(events.value_changed);
        assert_eq!(animation.value()[0], 100.0);
        assert!(matches!(
            events.completion,
            Some(CompletionEvent::Finished { .. })
        ));
        assert_eq!(animation.state(), AnimationState::Inactive);
    }

    #[test]
    fn test_soft_stop_retargets_to_current() {
        let mut animation = spring_animation(0.0, 100.0);
        animation.start();
        for _ in 0..10 {
            animation.tick(1.0 / 60.0);
        }
        let at = animation.value().clone();

        let events = animation.stop(StopPosition::Current, false);
        assert!(animation.is_running(), "soft stop keeps the animation alive");
        assert_eq!(animation.target(), &at);
        assert!(matches!(
            events.completion,
            Some(CompletionEvent::Retargeted { .. })
        ));
    }

    #[test]
    fn test_auto_start_on_retarget() {
        let mut animation = spring_animation(0.0, 0.0);
        animation.set_options(AnimationOptions {
            auto_start: true,
            ..Default::default()
        });
        assert_eq!(animation.state(), AnimationState::Inactive);

        let effect = animation.set_target(AnimVector::from_slice(&[10.0]));
        assert!(effect.started);
        assert!(animation.is_running());

        // Retargeting to the value it already has must not start anything
        animation.pause();
        animation.set_value(AnimVector::from_slice(&[10.0]));
        let effect = animation.set_target(AnimVector::from_slice(&[10.0]));
        assert!(!effect.started);
    }

    #[test]
    fn test_autoreverse_swaps_and_keeps_running() {
        let mut animation = Animation::new(
            MotionModel::Easing(EasingConfig::linear(0.1)),
            AnimVector::from_slice(&[0.0]),
            AnimVector::from_slice(&[10.0]),
        );
        animation.set_options(AnimationOptions {
            autoreverses: true,
            ..Default::default()
        });
        animation.start();

        // Run past the duration: instead of finishing, direction flips
        let events = animation.tick(0.2);
        assert!(events.completion.is_none());
        assert!(animation.is_running());
        assert_eq!(animation.target()[0], 0.0);
        assert_eq!(animation.value()[0], 10.0);
    }

    #[test]
    fn test_repeat_restarts_from_start_value() {
        let mut animation = Animation::new(
            MotionModel::Easing(EasingConfig::linear(0.1)),
            AnimVector::from_slice(&[2.0]),
            AnimVector::from_slice(&[10.0]),
        );
        animation.set_options(AnimationOptions {
            repeats: true,
            ..Default::default()
        });
        animation.start();

        let events = animation.tick(0.2);
        assert!(events.completion.is_none());
        assert!(animation.is_running());
        assert_eq!(animation.value()[0], 2.0);
        assert_eq!(animation.target()[0], 10.0);
    }

    #[test]
    fn test_emitted_value_is_snapped_but_stored_value_is_not() {
        let mut animation = Animation::new(
            MotionModel::Easing(EasingConfig::linear(1.0)),
            AnimVector::from_slice(&[0.0]),
            AnimVector::from_slice(&[10.0]),
        );
        animation.set_options(AnimationOptions {
            integralizes: true,
            ..Default::default()
        });
        animation.set_display_scale(1.0);
        animation.start();
        animation.tick(0.33);

        assert!((animation.value()[0] - 3.3).abs() < 1e-9);
        assert_eq!(animation.emitted_value()[0], 3.0);
    }

    #[test]
    fn test_decay_target_and_velocity_stay_consistent() {
        let config = DecayConfig::NORMAL;
        let mut animation = Animation::new(
            MotionModel::Decay(config),
            AnimVector::from_slice(&[0.0]),
            AnimVector::from_slice(&[0.0]),
        );
        animation.set_velocity(AnimVector::from_slice(&[1000.0]));

        let expected = config.target_for(
            &AnimVector::from_slice(&[0.0]),
            &AnimVector::from_slice(&[1000.0]),
        );
        assert_eq!(animation.target(), &expected);

        // Writing a target re-derives the velocity that reaches it
        animation.set_target(AnimVector::from_slice(&[250.0]));
        let implied = config.velocity_for(animation.value(), animation.target());
        assert_eq!(animation.velocity(), &implied);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn test_negative_delay_is_rejected() {
        let mut animation = spring_animation(0.0, 1.0);
        animation.start_after(-0.5);
    }

    #[test]
    #[should_panic(expected = "non-finite")]
    fn test_nan_target_is_rejected() {
        let mut animation = spring_animation(0.0, 1.0);
        animation.set_target(AnimVector::from_slice(&[f64::NAN]));
    }
}
