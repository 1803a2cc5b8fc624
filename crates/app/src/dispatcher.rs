//! In-process single-threaded dispatcher with a virtual clock.
//!
//! [`LocalDispatcher`] implements both [`StateSource`] and [`Scheduler`].
//! State changes and timer expiries are processed one at a time; a handler
//! runs to completion before the next item is picked up, and no internal
//! borrow is held while a handler runs, so handlers may subscribe, release,
//! schedule and cancel freely.
//!
//! Time only moves when the host calls [`advance_to`](LocalDispatcher::advance_to)
//! or [`advance_by`](LocalDispatcher::advance_by). Tests drive it with
//! simulated time; the daemon drives it with the wall clock.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::time::Duration;

use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::event::StateChange;
use lumen_domain::id::SubscriptionId;
use lumen_domain::time::{self, Timestamp};

use crate::ports::{Scheduler, StateCallback, StateSource, TimerCallback, TimerHandle, TimerSlot};
use crate::subscription::Subscription;

type SharedCallback = Rc<RefCell<StateCallback>>;

struct PendingTimer {
    slot: TimerSlot,
    callback: TimerCallback,
}

struct Inner {
    now: Timestamp,
    states: HashMap<EntityId, EntityState>,
    subscribers: HashMap<EntityId, Vec<(SubscriptionId, SharedCallback)>>,
    queue: VecDeque<StateChange>,
    timers: BTreeMap<(Timestamp, u64), PendingTimer>,
    next_seq: u64,
}

impl Inner {
    fn is_subscribed(&self, entity_id: &EntityId, id: SubscriptionId) -> bool {
        self.subscribers
            .get(entity_id)
            .is_some_and(|subs| subs.iter().any(|(sid, _)| *sid == id))
    }

    fn unsubscribe(&mut self, entity_id: &EntityId, id: SubscriptionId) -> Option<SharedCallback> {
        let subs = self.subscribers.get_mut(entity_id)?;
        let index = subs.iter().position(|(sid, _)| *sid == id)?;
        let (_, callback) = subs.remove(index);
        if subs.is_empty() {
            self.subscribers.remove(entity_id);
        }
        Some(callback)
    }

    /// Drop cancelled timers sitting at the head of the queue.
    fn prune_cancelled(&mut self) -> Vec<PendingTimer> {
        let mut pruned = Vec::new();
        while self
            .timers
            .first_key_value()
            .is_some_and(|(_, timer)| timer.slot.is_cancelled())
        {
            if let Some((_, timer)) = self.timers.pop_first() {
                pruned.push(timer);
            }
        }
        pruned
    }
}

/// Single-threaded cooperative dispatcher and virtual clock.
///
/// Cloning yields another handle to the same dispatcher.
#[derive(Clone)]
pub struct LocalDispatcher {
    inner: Rc<RefCell<Inner>>,
}

impl Default for LocalDispatcher {
    fn default() -> Self {
        Self::starting_at(time::now())
    }
}

impl LocalDispatcher {
    /// Create a dispatcher whose clock starts at `now`.
    #[must_use]
    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now,
                states: HashMap::new(),
                subscribers: HashMap::new(),
                queue: VecDeque::new(),
                timers: BTreeMap::new(),
                next_seq: 0,
            })),
        }
    }

    /// Make an entity known with an initial state, without emitting a change.
    pub fn register(&self, entity_id: EntityId, state: EntityState) {
        self.inner.borrow_mut().states.insert(entity_id, state);
    }

    /// Record a new state for an entity and queue the resulting change.
    pub fn set_state(&self, entity_id: &EntityId, state: EntityState) {
        self.set_state_by(entity_id, state, None);
    }

    /// Like [`set_state`](Self::set_state), attributing the change to `actor`.
    pub fn set_state_by(&self, entity_id: &EntityId, state: EntityState, actor: Option<&str>) {
        let (previous, now) = {
            let inner = self.inner.borrow();
            (inner.states.get(entity_id).copied(), inner.now)
        };
        let mut change = StateChange::new(entity_id.clone(), previous, state, now);
        if let Some(actor) = actor {
            change = change.with_actor(actor);
        }
        self.publish(change);
    }

    /// Queue an externally produced change. The entity's current state is
    /// updated immediately; subscribers see the change when it is dispatched.
    pub fn publish(&self, change: StateChange) {
        tracing::trace!(entity = %change.entity_id, state = %change.current, "state change queued");
        let mut inner = self.inner.borrow_mut();
        inner
            .states
            .insert(change.entity_id.clone(), change.current);
        inner.queue.push_back(change);
    }

    /// Dispatch every queued change and every timer due at the current time.
    pub fn run_until_idle(&self) {
        let now = self.inner.borrow().now;
        self.advance_to(now);
    }

    /// Move the clock forward by `delay`, dispatching everything due on the way.
    pub fn advance_by(&self, delay: Duration) {
        let target = time::add(self.inner.borrow().now, delay);
        self.advance_to(target);
    }

    /// Move the clock forward to `target`, dispatching queued changes and
    /// firing timers in deadline order. Changes produced by a timer are
    /// dispatched before the next timer fires.
    pub fn advance_to(&self, target: Timestamp) {
        loop {
            while self.dispatch_next_change() {}
            if !self.fire_next_timer(target) {
                break;
            }
        }
        let mut inner = self.inner.borrow_mut();
        if target > inner.now {
            inner.now = target;
        }
    }

    /// Deadline of the earliest live timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        let pruned = self.inner.borrow_mut().prune_cancelled();
        drop(pruned);
        self.inner
            .borrow()
            .timers
            .first_key_value()
            .map(|((due, _), _)| *due)
    }

    /// Number of timers that are neither fired nor cancelled.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner
            .borrow()
            .timers
            .values()
            .filter(|timer| !timer.slot.is_cancelled())
            .count()
    }

    #[must_use]
    pub fn queued_changes(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Number of live subscriptions on `entity_id`.
    #[must_use]
    pub fn subscriber_count(&self, entity_id: &EntityId) -> usize {
        self.inner
            .borrow()
            .subscribers
            .get(entity_id)
            .map_or(0, Vec::len)
    }

    fn dispatch_next_change(&self) -> bool {
        let (change, targets) = {
            let mut inner = self.inner.borrow_mut();
            let Some(change) = inner.queue.pop_front() else {
                return false;
            };
            let targets: Vec<(SubscriptionId, SharedCallback)> = inner
                .subscribers
                .get(&change.entity_id)
                .map(|subs| {
                    subs.iter()
                        .map(|(id, callback)| (*id, Rc::clone(callback)))
                        .collect()
                })
                .unwrap_or_default();
            (change, targets)
        };

        for (id, callback) in targets {
            // an earlier handler of this same change may have released it
            if !self.inner.borrow().is_subscribed(&change.entity_id, id) {
                continue;
            }
            let Ok(mut callback) = callback.try_borrow_mut() else {
                tracing::warn!(subscription = %id, "subscriber re-entered, skipping delivery");
                continue;
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| (*callback)(&change)));
            if outcome.is_err() {
                tracing::warn!(
                    subscription = %id,
                    entity = %change.entity_id,
                    "subscriber panicked, continuing dispatch"
                );
            }
        }
        true
    }

    fn fire_next_timer(&self, limit: Timestamp) -> bool {
        let (timer, pruned) = {
            let mut inner = self.inner.borrow_mut();
            let pruned = inner.prune_cancelled();
            let due = match inner.timers.first_key_value() {
                Some(((due, _), _)) if *due <= limit => *due,
                _ => return false,
            };
            let Some((_, timer)) = inner.timers.pop_first() else {
                return false;
            };
            if due > inner.now {
                inner.now = due;
            }
            (timer, pruned)
        };
        drop(pruned);

        if timer.slot.try_fire() {
            let outcome = catch_unwind(AssertUnwindSafe(timer.callback));
            if outcome.is_err() {
                tracing::warn!("timer callback panicked, continuing dispatch");
            }
        }
        true
    }
}

impl StateSource for LocalDispatcher {
    fn current_state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.inner.borrow().states.get(entity_id).copied()
    }

    fn subscribe(&self, entity_id: &EntityId, callback: StateCallback) -> Subscription {
        let id = SubscriptionId::new();
        self.inner
            .borrow_mut()
            .subscribers
            .entry(entity_id.clone())
            .or_default()
            .push((id, Rc::new(RefCell::new(callback))));

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        let entity_id = entity_id.clone();
        Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.borrow_mut().unsubscribe(&entity_id, id);
                drop(removed);
            }
        })
    }
}

impl Scheduler for LocalDispatcher {
    fn now(&self) -> Timestamp {
        self.inner.borrow().now
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let (handle, slot) = TimerHandle::pair();
        let mut inner = self.inner.borrow_mut();
        let due = time::add(inner.now, delay);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .timers
            .insert((due, seq), PendingTimer { slot, callback });
        handle
    }
}
