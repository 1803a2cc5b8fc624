//! Temporal hold filter — fires once a predicate has held for a duration.
//!
//! The filter arms a timer when the predicate becomes true and cancels it as
//! soon as the predicate stops holding. An uncancelled timer fires without
//! re-checking the current state: cancellation happens in the same dispatch
//! step as the invalidating change, so a timer that reaches expiry is by
//! construction still valid.
//!
//! After firing, the filter stays latched until the predicate stops holding,
//! so one unbroken interval never yields more than one emission.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ConfigurationError;
use lumen_domain::event::StateChange;
use lumen_domain::policy::validate_hold;

use crate::delayed_action::DelayedAction;
use crate::ports::{Ports, Scheduler};
use crate::subscription::Subscription;

type Predicate = Rc<dyn Fn(&EntityState) -> bool>;

enum Phase {
    Idle,
    Pending { _timer: DelayedAction },
    Latched,
}

/// Description of a hold: which entity, which predicate, for how long.
///
/// A filter is a reusable description; every call to
/// [`subscribe`](Self::subscribe) creates an independent watcher.
#[derive(Clone)]
pub struct HoldFilter {
    entity_id: EntityId,
    duration: Duration,
    predicate: Predicate,
    arm_on_start: bool,
}

impl HoldFilter {
    /// Watch `entity_id` for `predicate` holding during `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroHoldDuration`] if `duration` is zero.
    pub fn new(
        entity_id: EntityId,
        duration: Duration,
        predicate: impl Fn(&EntityState) -> bool + 'static,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            entity_id,
            duration: validate_hold(duration)?,
            predicate: Rc::new(predicate),
            arm_on_start: false,
        })
    }

    /// Watch `entity_id` staying in exactly `state` during `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroHoldDuration`] if `duration` is zero.
    pub fn state_for(
        entity_id: EntityId,
        state: EntityState,
        duration: Duration,
    ) -> Result<Self, ConfigurationError> {
        Self::new(entity_id, duration, move |current| *current == state)
    }

    /// Also evaluate the predicate against the current state when
    /// subscribing, counting the hold from that moment.
    #[must_use]
    pub fn arm_on_start(mut self, arm: bool) -> Self {
        self.arm_on_start = arm;
        self
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start watching. `on_hold` runs once per unbroken hold interval.
    ///
    /// Releasing the returned subscription also cancels a pending timer.
    pub fn subscribe(&self, ports: &Ports, on_hold: impl FnMut() + 'static) -> Subscription {
        let watcher = Rc::new(Watcher {
            entity_id: self.entity_id.clone(),
            duration: self.duration,
            predicate: Rc::clone(&self.predicate),
            scheduler: Rc::clone(&ports.scheduler),
            phase: RefCell::new(Phase::Idle),
            on_hold: RefCell::new(on_hold),
        });

        let observer = Rc::clone(&watcher);
        let subscription = ports.states.subscribe(
            &self.entity_id,
            Box::new(move |change: &StateChange| observer.observe(&change.current)),
        );

        if self.arm_on_start {
            if let Some(current) = ports.states.current_state(&self.entity_id) {
                watcher.observe(&current);
            }
        }

        subscription.on_release(move || watcher.reset())
    }
}

struct Watcher<F> {
    entity_id: EntityId,
    duration: Duration,
    predicate: Predicate,
    scheduler: Rc<dyn Scheduler>,
    phase: RefCell<Phase>,
    on_hold: RefCell<F>,
}

impl<F: FnMut() + 'static> Watcher<F> {
    fn observe(self: &Rc<Self>, state: &EntityState) {
        if (self.predicate)(state) {
            let idle = matches!(*self.phase.borrow(), Phase::Idle);
            if idle {
                let timer = self.arm();
                *self.phase.borrow_mut() = Phase::Pending { _timer: timer };
                tracing::debug!(entity = %self.entity_id, duration = ?self.duration, "hold armed");
            }
        } else {
            let previous = self.phase.replace(Phase::Idle);
            if matches!(previous, Phase::Pending { .. }) {
                tracing::debug!(entity = %self.entity_id, %state, "hold broken");
            }
            drop(previous);
        }
    }

    fn arm(self: &Rc<Self>) -> DelayedAction {
        let weak = Rc::downgrade(self);
        DelayedAction::schedule(&*self.scheduler, self.duration, move || {
            let Some(watcher) = weak.upgrade() else {
                return;
            };
            let fired = watcher.phase.replace(Phase::Latched);
            drop(fired);
            tracing::debug!(entity = %watcher.entity_id, "hold elapsed");
            let mut on_hold = watcher.on_hold.borrow_mut();
            (*on_hold)();
        })
    }

    fn reset(&self) {
        let previous = self.phase.replace(Phase::Idle);
        drop(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::testing::{harness, motion, toggle};

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn should_reject_zero_duration() {
        let result = HoldFilter::state_for(motion("hall"), EntityState::On, Duration::ZERO);
        assert!(matches!(result, Err(ConfigurationError::ZeroHoldDuration)));
    }

    #[test]
    fn should_not_emit_when_predicate_breaks_before_duration() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(10))
            .unwrap()
            .subscribe(&ports, on_hold);

        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(9));
        dispatcher.set_state(&sensor, EntityState::Off);
        dispatcher.advance_by(Duration::from_secs(60));

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn should_emit_exactly_once_at_duration() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(10))
            .unwrap()
            .subscribe(&ports, on_hold);

        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_millis(9_999));
        assert_eq!(count.get(), 0);
        dispatcher.advance_by(Duration::from_millis(1));
        assert_eq!(count.get(), 1);
        dispatcher.advance_by(Duration::from_secs(100));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_keep_timer_when_predicate_keeps_holding() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(10))
            .unwrap()
            .subscribe(&ports, on_hold);

        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(6));
        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(4));

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_stay_latched_while_predicate_keeps_holding_after_emission() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = EntityId::new(lumen_domain::entity::EntityDomain::Sensor, "lux");
        dispatcher.register(sensor.clone(), EntityState::Numeric(0.0));
        let (count, on_hold) = counter();
        let _sub = HoldFilter::new(sensor.clone(), Duration::from_secs(5), |state| {
            state.as_number().is_some_and(|lux| lux > 100.0)
        })
        .unwrap()
        .subscribe(&ports, on_hold);

        for reading in [150.0, 160.0, 170.0, 180.0] {
            dispatcher.set_state(&sensor, EntityState::Numeric(reading));
            dispatcher.advance_by(Duration::from_secs(5));
        }
        assert_eq!(count.get(), 1);

        dispatcher.set_state(&sensor, EntityState::Numeric(10.0));
        dispatcher.set_state(&sensor, EntityState::Numeric(200.0));
        dispatcher.advance_by(Duration::from_secs(5));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn should_never_emit_when_oscillating_faster_than_duration() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(10))
            .unwrap()
            .subscribe(&ports, on_hold);

        for _ in 0..20 {
            dispatcher.set_state(&sensor, EntityState::On);
            dispatcher.advance_by(Duration::from_secs(4));
            dispatcher.set_state(&sensor, EntityState::Off);
            dispatcher.advance_by(Duration::from_secs(4));
        }
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn should_not_interact_with_other_filters_on_same_source() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (short_count, short) = counter();
        let (long_count, long) = counter();
        let _a = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(5))
            .unwrap()
            .subscribe(&ports, short);
        let _b = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(20))
            .unwrap()
            .subscribe(&ports, long);

        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(10));
        dispatcher.set_state(&sensor, EntityState::Off);
        dispatcher.advance_by(Duration::from_secs(30));

        assert_eq!(short_count.get(), 1);
        assert_eq!(long_count.get(), 0);
    }

    #[test]
    fn should_cancel_pending_timer_when_released() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let subscription =
            HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(10))
                .unwrap()
                .subscribe(&ports, on_hold);

        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(5));
        subscription.release();
        dispatcher.advance_by(Duration::from_secs(10));

        assert_eq!(count.get(), 0);
        assert_eq!(dispatcher.pending_timers(), 0);
    }

    #[test]
    fn should_ignore_current_state_unless_armed_on_start() {
        let (dispatcher, _spy, ports) = harness();
        let master = toggle("kitchen_auto");
        dispatcher.register(master.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(master.clone(), EntityState::Off, Duration::from_secs(10))
            .unwrap()
            .subscribe(&ports, on_hold);

        dispatcher.advance_by(Duration::from_secs(20));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn should_count_from_subscription_when_armed_on_start() {
        let (dispatcher, _spy, ports) = harness();
        let master = toggle("kitchen_auto");
        dispatcher.register(master.clone(), EntityState::Off);
        let (count, on_hold) = counter();
        let _sub = HoldFilter::state_for(master.clone(), EntityState::Off, Duration::from_secs(10))
            .unwrap()
            .arm_on_start(true)
            .subscribe(&ports, on_hold);

        dispatcher.advance_by(Duration::from_secs(10));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_follow_end_to_end_on_then_off_scenario() {
        let (dispatcher, _spy, ports) = harness();
        let sensor = motion("hall");
        dispatcher.register(sensor.clone(), EntityState::Off);
        let (on_count, on_hold) = counter();
        let (off_count, off_hold) = counter();
        let _on = HoldFilter::state_for(sensor.clone(), EntityState::On, Duration::from_secs(15))
            .unwrap()
            .subscribe(&ports, on_hold);
        let _off = HoldFilter::state_for(sensor.clone(), EntityState::Off, Duration::from_secs(15))
            .unwrap()
            .subscribe(&ports, off_hold);

        // t=0: on
        dispatcher.set_state(&sensor, EntityState::On);
        dispatcher.advance_by(Duration::from_secs(14));
        assert_eq!(on_count.get(), 0);
        // t=15
        dispatcher.advance_by(Duration::from_secs(1));
        assert_eq!(on_count.get(), 1);
        // t=16: off starts a fresh off-hold
        dispatcher.advance_by(Duration::from_secs(1));
        dispatcher.set_state(&sensor, EntityState::Off);
        dispatcher.run_until_idle();
        assert_eq!(dispatcher.pending_timers(), 1);
        dispatcher.advance_by(Duration::from_secs(14));
        assert_eq!(off_count.get(), 0);
        dispatcher.advance_by(Duration::from_secs(1));
        assert_eq!(off_count.get(), 1);
        assert_eq!(on_count.get(), 1);
    }
}
