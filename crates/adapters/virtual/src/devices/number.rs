//! Virtual number — a settable numeric value, e.g. a sensor's configured timeout.

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// A simulated numeric setting.
pub struct VirtualNumber {
    entity_id: EntityId,
    state: EntityState,
}

impl VirtualNumber {
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            state: EntityState::Numeric(0.0),
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// # Errors
    ///
    /// Returns [`ActuatorError::Unsupported`] for anything but `set_value`.
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        match command {
            Command::SetValue { value } => {
                self.state = EntityState::Numeric(value);
                Ok(self.state)
            }
            other => Err(super::unsupported(&self.entity_id, other)),
        }
    }

    pub fn observe(&mut self, state: EntityState) {
        self.state = state;
    }
}
