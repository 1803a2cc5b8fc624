//! Dimming controller — "dim now, turn off later unless interrupted".
//!
//! The controller keeps at most one pending delayed-off per light. Every
//! operation that touches a light first drops the token stored for it, which
//! cancels it, so a detection always supersedes an earlier pending off
//! within the same dispatch step.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use lumen_domain::command::Command;
use lumen_domain::entity::EntityId;
use lumen_domain::error::ConfigurationError;
use lumen_domain::policy::DimmingPolicy;

use crate::delayed_action::DelayedAction;
use crate::ports::Ports;

struct Inner {
    name: String,
    ports: Ports,
    policy: Cell<DimmingPolicy>,
    active_delay_source: RefCell<Option<EntityId>>,
    pending: RefCell<HashMap<EntityId, DelayedAction>>,
}

/// Controls the motion-stopped behaviour of one or more lights.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct DimmingController {
    inner: Rc<Inner>,
}

impl DimmingController {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `policy` is invalid.
    pub fn new(
        name: impl Into<String>,
        ports: &Ports,
        policy: DimmingPolicy,
    ) -> Result<Self, ConfigurationError> {
        policy.validate()?;
        Ok(Self {
            inner: Rc::new(Inner {
                name: name.into(),
                ports: ports.clone(),
                policy: Cell::new(policy),
                active_delay_source: RefCell::new(None),
                pending: RefCell::new(HashMap::new()),
            }),
        })
    }

    /// Read the sensor's configured active delay from `entity_id` when
    /// deciding whether to dim.
    pub fn set_active_delay_source(&self, entity_id: Option<EntityId>) {
        *self.inner.active_delay_source.borrow_mut() = entity_id;
    }

    #[must_use]
    pub fn policy(&self) -> DimmingPolicy {
        self.inner.policy.get()
    }

    /// Change dim brightness and delay. Takes effect on the next motion stop.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidBrightness`] for a zero brightness;
    /// the current policy is kept.
    pub fn set_dim_parameters(
        &self,
        brightness: u8,
        delay: Duration,
    ) -> Result<(), ConfigurationError> {
        let policy = DimmingPolicy {
            brightness,
            delay,
            ..self.inner.policy.get()
        };
        policy.validate()?;
        self.inner.policy.set(policy);
        Ok(())
    }

    pub fn set_active_delay_threshold(&self, threshold: Option<f64>) {
        let policy = DimmingPolicy {
            active_delay_threshold: threshold,
            ..self.inner.policy.get()
        };
        self.inner.policy.set(policy);
    }

    /// Motion detected: cancel a pending off and go to full brightness.
    pub fn on_motion_detected(&self, light: &EntityId) {
        if self.cancel(light) {
            tracing::debug!(controller = %self.inner.name, %light, "pending off superseded by motion");
        }
        self.inner
            .ports
            .actuators
            .fire(light, Command::full_brightness());
    }

    /// Motion stopped: turn off now, or dim and schedule the off.
    pub fn on_motion_stopped(&self, light: &EntityId) {
        if !self.dimming_enabled() {
            self.force_off(light);
            return;
        }

        let policy = self.inner.policy.get();
        self.cancel(light);
        self.inner
            .ports
            .actuators
            .fire(light, Command::turn_on_at(policy.brightness));

        let weak = Rc::downgrade(&self.inner);
        let target = light.clone();
        let token = DelayedAction::schedule(&*self.inner.ports.scheduler, policy.delay, move || {
            expire(&weak, &target);
        });
        tracing::debug!(
            controller = %self.inner.name,
            %light,
            delay = ?policy.delay,
            "light dimmed, off scheduled"
        );
        let replaced = self
            .inner
            .pending
            .borrow_mut()
            .insert(light.clone(), token);
        drop(replaced);
    }

    /// Cancel any pending off and turn the light off right away.
    pub fn force_off(&self, light: &EntityId) {
        self.cancel(light);
        self.inner.ports.actuators.fire(light, Command::TurnOff);
    }

    /// Cancel the pending off of `light`. Returns whether one was pending.
    pub fn cancel(&self, light: &EntityId) -> bool {
        let removed = self.inner.pending.borrow_mut().remove(light);
        removed.is_some_and(|token| token.is_pending())
    }

    /// Cancel every pending off.
    pub fn cancel_all(&self) {
        let pending: Vec<DelayedAction> = self
            .inner
            .pending
            .borrow_mut()
            .drain()
            .map(|(_, token)| token)
            .collect();
        if !pending.is_empty() {
            tracing::debug!(controller = %self.inner.name, count = pending.len(), "pending offs cancelled");
        }
    }

    #[must_use]
    pub fn has_pending(&self, light: &EntityId) -> bool {
        self.inner
            .pending
            .borrow()
            .get(light)
            .is_some_and(DelayedAction::is_pending)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .borrow()
            .values()
            .filter(|token| token.is_pending())
            .count()
    }

    /// Whether motion stopping should dim rather than turn off.
    #[must_use]
    pub fn dimming_enabled(&self) -> bool {
        let policy = self.inner.policy.get();
        if !policy.dims() {
            return false;
        }
        let active_delay = self
            .inner
            .active_delay_source
            .borrow()
            .as_ref()
            .and_then(|source| self.inner.ports.states.current_state(source))
            .and_then(|state| state.as_number());
        policy.allows_active_delay(active_delay)
    }
}

fn expire(inner: &Weak<Inner>, light: &EntityId) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let fired = inner.pending.borrow_mut().remove(light);
    drop(fired);
    tracing::debug!(controller = %inner.name, %light, "dim delay elapsed, turning off");
    inner.ports.actuators.fire(light, Command::TurnOff);
}
