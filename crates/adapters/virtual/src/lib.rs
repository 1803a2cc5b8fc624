//! # lumen-adapter-virtual
//!
//! Virtual device integration backed by the in-process dispatcher, for
//! demonstration and end-to-end testing.
//!
//! ## Provided devices
//!
//! | Domain | Device | Accepts |
//! |--------|--------|---------|
//! | `light` | [`VirtualLight`](devices::VirtualLight) | `turn_on` (brightness) / `turn_off` |
//! | `switch`, `input_boolean` | [`VirtualSwitch`](devices::VirtualSwitch) | `turn_on` / `turn_off` |
//! | `binary_sensor`, `sensor` | [`VirtualSensor`](devices::VirtualSensor) | nothing (reports only) |
//! | `button` | [`VirtualButton`](devices::VirtualButton) | `press` |
//! | `number` | [`VirtualNumber`](devices::VirtualNumber) | `set_value` |
//!
//! Commands accepted by a device are published back to the dispatcher as
//! state changes attributed to [`ACTOR`], so rules can tell automated
//! changes from manual ones.
//!
//! ## Dependency rule
//!
//! Depends on `lumen-app` (port traits, dispatcher) and `lumen-domain` only.

pub mod devices;
pub mod simulator;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use lumen_app::dispatcher::LocalDispatcher;
use lumen_app::ports::{ActuatorSink, Scheduler, StateSource};
use lumen_domain::command::Command;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ActuatorError;
use lumen_domain::time::Timestamp;

use devices::VirtualDevice;

pub use simulator::{MotionSimulator, Report};

/// Actor id attached to state changes caused by lumen's own commands.
pub const ACTOR: &str = "lumen";

/// One command received by the integration.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub entity_id: EntityId,
    pub command: Command,
    pub at: Timestamp,
    pub accepted: bool,
}

/// Registry of virtual devices publishing into a [`LocalDispatcher`].
pub struct VirtualDevices {
    dispatcher: LocalDispatcher,
    devices: RefCell<HashMap<EntityId, VirtualDevice>>,
    unreachable: RefCell<HashSet<EntityId>>,
    log: RefCell<Vec<CommandRecord>>,
}

impl VirtualDevices {
    #[must_use]
    pub fn new(dispatcher: &LocalDispatcher) -> Self {
        Self {
            dispatcher: dispatcher.clone(),
            devices: RefCell::new(HashMap::new()),
            unreachable: RefCell::new(HashSet::new()),
            log: RefCell::new(Vec::new()),
        }
    }

    /// Create a device for `entity_id` in its default state and make it
    /// known to the dispatcher. Returns `false` if it already existed.
    pub fn provision(&self, entity_id: EntityId) -> bool {
        let device = VirtualDevice::for_entity(entity_id);
        let state = device.state();
        self.insert(device, state)
    }

    /// Like [`provision`](Self::provision), starting from `state`.
    pub fn provision_with_state(&self, entity_id: EntityId, state: EntityState) -> bool {
        let mut device = VirtualDevice::for_entity(entity_id);
        device.observe(state);
        self.insert(device, state)
    }

    fn insert(&self, device: VirtualDevice, state: EntityState) -> bool {
        let entity_id = device.entity_id().clone();
        let mut devices = self.devices.borrow_mut();
        if devices.contains_key(&entity_id) {
            return false;
        }
        tracing::debug!(entity = %entity_id, %state, "virtual device provisioned");
        self.dispatcher.register(entity_id.clone(), state);
        devices.insert(entity_id, device);
        true
    }

    /// A state reached outside of lumen: a sensor reading, a wall switch.
    /// Published without an actor.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::Unavailable`] when the device is unknown or
    /// unreachable.
    pub fn report(&self, entity_id: &EntityId, state: EntityState) -> Result<(), ActuatorError> {
        if self.unreachable.borrow().contains(entity_id) {
            return Err(ActuatorError::Unavailable(entity_id.clone()));
        }
        self.devices
            .borrow_mut()
            .get_mut(entity_id)
            .ok_or_else(|| ActuatorError::Unavailable(entity_id.clone()))?
            .observe(state);
        self.dispatcher.set_state(entity_id, state);
        Ok(())
    }

    /// Take a device off the network (it reports `unavailable` and rejects
    /// commands) or bring it back with its last known state.
    pub fn set_reachable(&self, entity_id: &EntityId, reachable: bool) {
        let Some(state) = self.devices.borrow().get(entity_id).map(VirtualDevice::state) else {
            return;
        };
        let changed = if reachable {
            self.unreachable.borrow_mut().remove(entity_id)
        } else {
            self.unreachable.borrow_mut().insert(entity_id.clone())
        };
        if !changed {
            return;
        }
        tracing::info!(entity = %entity_id, reachable, "virtual device reachability changed");
        let published = if reachable {
            state
        } else {
            EntityState::Unavailable
        };
        self.dispatcher.set_state(entity_id, published);
    }

    #[must_use]
    pub fn is_reachable(&self, entity_id: &EntityId) -> bool {
        !self.unreachable.borrow().contains(entity_id)
    }

    /// The device's own state, regardless of reachability.
    #[must_use]
    pub fn state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.devices.borrow().get(entity_id).map(VirtualDevice::state)
    }

    /// Brightness of a light the last time it was on.
    #[must_use]
    pub fn brightness(&self, entity_id: &EntityId) -> Option<u8> {
        match self.devices.borrow().get(entity_id)? {
            VirtualDevice::Light(light) => Some(light.brightness()),
            _ => None,
        }
    }

    #[must_use]
    pub fn presses(&self, entity_id: &EntityId) -> Option<u32> {
        match self.devices.borrow().get(entity_id)? {
            VirtualDevice::Button(button) => Some(button.presses()),
            _ => None,
        }
    }

    #[must_use]
    pub fn command_log(&self) -> Vec<CommandRecord> {
        self.log.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.borrow().is_empty()
    }

    fn apply(&self, entity_id: &EntityId, command: Command) -> Result<EntityState, ActuatorError> {
        if self.unreachable.borrow().contains(entity_id) {
            return Err(ActuatorError::Unavailable(entity_id.clone()));
        }
        self.devices
            .borrow_mut()
            .get_mut(entity_id)
            .ok_or_else(|| ActuatorError::Unavailable(entity_id.clone()))?
            .handle(command)
    }
}

impl ActuatorSink for VirtualDevices {
    fn send(&self, entity_id: &EntityId, command: Command) -> Result<(), ActuatorError> {
        let outcome = self.apply(entity_id, command);
        self.log.borrow_mut().push(CommandRecord {
            entity_id: entity_id.clone(),
            command,
            at: self.dispatcher.now(),
            accepted: outcome.is_ok(),
        });
        let state = outcome?;
        tracing::debug!(entity = %entity_id, %command, %state, "virtual device handled command");
        if self.dispatcher.current_state(entity_id) != Some(state) {
            self.dispatcher.set_state_by(entity_id, state, Some(ACTOR));
        }
        Ok(())
    }
}
