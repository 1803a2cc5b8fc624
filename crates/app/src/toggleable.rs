//! Toggleable automation — a rule group gated by a master toggle.
//!
//! A rule group has two kinds of rules:
//! - **persistent** rules, registered once by [`start`](ToggleableAutomation::start)
//!   and kept until [`stop`](ToggleableAutomation::stop);
//! - **toggleable** rules, registered into a fresh [`SubscriptionSet`] each
//!   time the master toggle turns on and disposed when it turns off.
//!
//! The group is described with closures (rule producers and hooks) rather
//! than by subclassing, so every area reuses the same lifecycle.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ConfigurationError;
use lumen_domain::event::StateChange;

use crate::dimming::DimmingController;
use crate::ports::Ports;
use crate::rules;
use crate::subscription::SubscriptionSet;

/// Registers rules into the given set.
pub type RuleProducer = Box<dyn Fn(&Ports, &mut SubscriptionSet)>;

/// Runs on lifecycle transitions.
pub type Hook = Box<dyn Fn(&Ports)>;

/// Whether the toggleable rules are currently registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationState {
    Disabled,
    Enabled,
}

impl std::fmt::Display for AutomationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Enabled => f.write_str("enabled"),
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    started: bool,
    persistent: Option<SubscriptionSet>,
    active: Option<SubscriptionSet>,
}

struct Inner {
    name: String,
    ports: Ports,
    master_toggle: EntityId,
    persistent: Vec<RuleProducer>,
    toggleable: Vec<RuleProducer>,
    on_enable: Vec<Hook>,
    on_disable: Vec<Hook>,
    on_stop: Vec<Hook>,
    lifecycle: RefCell<Lifecycle>,
}

/// A rule group whose toggleable rules follow a master toggle.
///
/// Cloning yields another handle to the same automation.
#[derive(Clone)]
pub struct ToggleableAutomation {
    inner: Rc<Inner>,
}

impl ToggleableAutomation {
    /// Create a builder for a rule group called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToggleableAutomationBuilder {
        ToggleableAutomationBuilder {
            name: name.into(),
            ..ToggleableAutomationBuilder::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn master_toggle(&self) -> &EntityId {
        &self.inner.master_toggle
    }

    /// Register persistent rules, then enable or disable according to the
    /// toggle's current state. Idempotent.
    pub fn start(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.borrow_mut();
            if lifecycle.started {
                return;
            }
            lifecycle.started = true;
        }

        let ports = &self.inner.ports;
        let mut set = SubscriptionSet::new();
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        set.add(ports.states.subscribe(
            &self.inner.master_toggle,
            Box::new(move |change: &StateChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.apply_toggle(change.current);
                }
            }),
        ));
        for producer in &self.inner.persistent {
            producer(ports, &mut set);
        }
        self.inner.lifecycle.borrow_mut().persistent = Some(set);
        tracing::info!(automation = %self.inner.name, "automation started");

        let current = ports
            .states
            .current_state(&self.inner.master_toggle)
            .unwrap_or_default();
        self.inner.apply_toggle(current);
    }

    /// Release every subscription and cancel every pending delayed action.
    /// No callback of this automation runs after this returns. Idempotent.
    ///
    /// Only delayed actions of controllers known to the builder are
    /// cancelled: those passed to
    /// [`motion_light`](ToggleableAutomationBuilder::motion_light) or
    /// [`dimming`](ToggleableAutomationBuilder::dimming).
    pub fn stop(&self) {
        let (persistent, active) = {
            let mut lifecycle = self.inner.lifecycle.borrow_mut();
            if !lifecycle.started {
                return;
            }
            lifecycle.started = false;
            (lifecycle.persistent.take(), lifecycle.active.take())
        };
        if let Some(mut set) = active {
            set.dispose();
        }
        if let Some(mut set) = persistent {
            set.dispose();
        }
        for hook in &self.inner.on_stop {
            hook(&self.inner.ports);
        }
        tracing::info!(automation = %self.inner.name, "automation stopped");
    }

    /// Enable the toggleable rules. No-op when already enabled or not started.
    pub fn enable(&self) {
        self.inner.enable();
    }

    /// Dispose the toggleable rules. No-op when already disabled.
    pub fn disable(&self) {
        self.inner.disable();
    }

    #[must_use]
    pub fn state(&self) -> AutomationState {
        if self.inner.lifecycle.borrow().active.is_some() {
            AutomationState::Enabled
        } else {
            AutomationState::Disabled
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state() == AutomationState::Enabled
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.lifecycle.borrow().started
    }

    /// Number of live toggleable subscriptions (zero while disabled).
    #[must_use]
    pub fn toggleable_subscription_count(&self) -> usize {
        self.inner
            .lifecycle
            .borrow()
            .active
            .as_ref()
            .map_or(0, SubscriptionSet::len)
    }

    /// Number of live persistent subscriptions, the toggle watcher included.
    #[must_use]
    pub fn persistent_subscription_count(&self) -> usize {
        self.inner
            .lifecycle
            .borrow()
            .persistent
            .as_ref()
            .map_or(0, SubscriptionSet::len)
    }
}

impl Inner {
    fn apply_toggle(&self, state: EntityState) {
        if state.is_on() {
            self.enable();
        } else {
            self.disable();
        }
    }

    fn enable(&self) {
        {
            let lifecycle = self.lifecycle.borrow();
            if !lifecycle.started || lifecycle.active.is_some() {
                return;
            }
        }

        let mut set = SubscriptionSet::new();
        for producer in &self.toggleable {
            producer(&self.ports, &mut set);
        }
        let count = set.len();
        self.lifecycle.borrow_mut().active = Some(set);
        tracing::info!(automation = %self.name, subscriptions = count, "automation enabled");

        for hook in &self.on_enable {
            hook(&self.ports);
        }
    }

    fn disable(&self) {
        let active = self.lifecycle.borrow_mut().active.take();
        let Some(mut set) = active else {
            return;
        };
        set.dispose();
        for hook in &self.on_disable {
            hook(&self.ports);
        }
        tracing::info!(automation = %self.name, "automation disabled");
    }
}

/// Step-by-step builder for [`ToggleableAutomation`].
#[derive(Default)]
pub struct ToggleableAutomationBuilder {
    name: String,
    master_toggle: Option<EntityId>,
    persistent: Vec<RuleProducer>,
    toggleable: Vec<RuleProducer>,
    on_enable: Vec<Hook>,
    on_disable: Vec<Hook>,
    on_stop: Vec<Hook>,
    requires: Vec<EntityId>,
}

impl ToggleableAutomationBuilder {
    #[must_use]
    pub fn master_toggle(mut self, entity_id: EntityId) -> Self {
        self.master_toggle = Some(entity_id);
        self
    }

    /// Add a rule that stays registered from `start` to `stop`.
    #[must_use]
    pub fn persistent(mut self, producer: impl Fn(&Ports, &mut SubscriptionSet) + 'static) -> Self {
        self.persistent.push(Box::new(producer));
        self
    }

    /// Add a rule that is only registered while the toggle is on.
    #[must_use]
    pub fn toggleable(mut self, producer: impl Fn(&Ports, &mut SubscriptionSet) + 'static) -> Self {
        self.toggleable.push(Box::new(producer));
        self
    }

    /// Run after every transition into enabled, including the initial one.
    /// Used to bring actuators in line with the current sensor state.
    #[must_use]
    pub fn on_enable(mut self, hook: impl Fn(&Ports) + 'static) -> Self {
        self.on_enable.push(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_disable(mut self, hook: impl Fn(&Ports) + 'static) -> Self {
        self.on_disable.push(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_stop(mut self, hook: impl Fn(&Ports) + 'static) -> Self {
        self.on_stop.push(Box::new(hook));
        self
    }

    /// Cancel the controller's pending offs when the group is disabled or stopped.
    ///
    /// Required for every controller used by a hand-written rule; otherwise
    /// its timers outlive [`stop`](ToggleableAutomation::stop).
    #[must_use]
    pub fn dimming(self, controller: &DimmingController) -> Self {
        let on_disable = controller.clone();
        let on_stop = controller.clone();
        self.on_disable(move |_| on_disable.cancel_all())
            .on_stop(move |_| on_stop.cancel_all())
    }

    /// Drive `lights` from `sensor` through `controller` while enabled,
    /// reconcile them on every enable, and register the controller with
    /// [`dimming`](Self::dimming).
    #[must_use]
    pub fn motion_light(
        self,
        sensor: EntityId,
        lights: Vec<EntityId>,
        controller: &DimmingController,
    ) -> Self {
        let rule_sensor = sensor.clone();
        let rule_lights = lights.clone();
        let rule_controller = controller.clone();
        let reconcile_controller = controller.clone();
        self.toggleable(move |ports, set| {
            set.add(rules::motion_light(
                ports,
                &rule_sensor,
                rule_lights.clone(),
                rule_controller.clone(),
            ));
        })
        .on_enable(move |ports| {
            rules::reconcile_motion_light(ports, &sensor, &lights, &reconcile_controller);
        })
        .dimming(controller)
    }

    /// Declare an entity the group depends on; checked by [`build`](Self::build).
    #[must_use]
    pub fn requires(mut self, entity_id: EntityId) -> Self {
        self.requires.push(entity_id);
        self
    }

    /// Validate references and build the automation (not started yet).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingMasterToggle`] without a toggle,
    /// or [`ConfigurationError::UnknownEntity`] when the toggle or a required
    /// entity is unknown to the state source.
    pub fn build(self, ports: &Ports) -> Result<ToggleableAutomation, ConfigurationError> {
        let master_toggle = self
            .master_toggle
            .ok_or(ConfigurationError::MissingMasterToggle)?;
        for entity_id in std::iter::once(&master_toggle).chain(&self.requires) {
            if ports.states.current_state(entity_id).is_none() {
                return Err(ConfigurationError::UnknownEntity(entity_id.clone()));
            }
        }

        Ok(ToggleableAutomation {
            inner: Rc::new(Inner {
                name: self.name,
                ports: ports.clone(),
                master_toggle,
                persistent: self.persistent,
                toggleable: self.toggleable,
                on_enable: self.on_enable,
                on_disable: self.on_disable,
                on_stop: self.on_stop,
                lifecycle: RefCell::new(Lifecycle::default()),
            }),
        })
    }
}
