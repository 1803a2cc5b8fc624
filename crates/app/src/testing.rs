//! Shared test fixtures: a recording actuator wired to a [`LocalDispatcher`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityDomain, EntityId, EntityState};
use lumen_domain::error::ActuatorError;

use crate::dispatcher::LocalDispatcher;
use crate::ports::{ActuatorSink, Ports};

/// Records every command and mirrors on/off commands into the dispatcher,
/// the way a real device would report its new state back.
pub struct SpyActuator {
    dispatcher: LocalDispatcher,
    commands: RefCell<Vec<(EntityId, Command)>>,
    failing: RefCell<HashSet<EntityId>>,
}

impl SpyActuator {
    pub fn new(dispatcher: &LocalDispatcher) -> Self {
        Self {
            dispatcher: dispatcher.clone(),
            commands: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
        }
    }

    pub fn fail(&self, entity_id: &EntityId) {
        self.failing.borrow_mut().insert(entity_id.clone());
    }

    pub fn commands(&self) -> Vec<(EntityId, Command)> {
        self.commands.borrow().clone()
    }

    pub fn commands_for(&self, entity_id: &EntityId) -> Vec<Command> {
        self.commands
            .borrow()
            .iter()
            .filter(|(id, _)| id == entity_id)
            .map(|(_, command)| *command)
            .collect()
    }

    pub fn count(&self, entity_id: &EntityId, command: Command) -> usize {
        self.commands_for(entity_id)
            .into_iter()
            .filter(|c| *c == command)
            .count()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }
}

impl ActuatorSink for SpyActuator {
    fn send(&self, entity_id: &EntityId, command: Command) -> Result<(), ActuatorError> {
        self.commands
            .borrow_mut()
            .push((entity_id.clone(), command));
        if self.failing.borrow().contains(entity_id) {
            return Err(ActuatorError::Unavailable(entity_id.clone()));
        }
        match command {
            Command::TurnOn { .. } => self.dispatcher.set_state(entity_id, EntityState::On),
            Command::TurnOff => self.dispatcher.set_state(entity_id, EntityState::Off),
            Command::SetValue { value } => {
                self.dispatcher
                    .set_state(entity_id, EntityState::Numeric(value));
            }
            Command::Press => {}
        }
        Ok(())
    }
}

pub fn light(name: &str) -> EntityId {
    EntityId::new(EntityDomain::Light, name)
}

pub fn motion(name: &str) -> EntityId {
    EntityId::new(EntityDomain::BinarySensor, name)
}

pub fn toggle(name: &str) -> EntityId {
    EntityId::new(EntityDomain::InputBoolean, name)
}

/// A dispatcher, a spy actuator, and the ports bundle over both.
pub fn harness() -> (LocalDispatcher, Rc<SpyActuator>, Ports) {
    let dispatcher = LocalDispatcher::default();
    let spy = Rc::new(SpyActuator::new(&dispatcher));
    let ports = Ports::new(
        Rc::new(dispatcher.clone()),
        Rc::new(dispatcher.clone()),
        Rc::clone(&spy) as Rc<dyn ActuatorSink>,
    );
    (dispatcher, spy, ports)
}
