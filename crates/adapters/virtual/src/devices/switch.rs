//! Virtual switch — responds to `turn_on` and `turn_off`.
//!
//! Also backs `input_boolean` helpers such as master toggles.

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// A simulated on/off switch.
pub struct VirtualSwitch {
    entity_id: EntityId,
    state: EntityState,
}

impl VirtualSwitch {
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            state: EntityState::Off,
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

    /// Handle a command, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::Unsupported`] for anything but on/off.
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        self.state = match command {
            Command::TurnOn { .. } => EntityState::On,
            Command::TurnOff => EntityState::Off,
            other => return Err(super::unsupported(&self.entity_id, other)),
        };
        Ok(self.state)
    }

    pub fn observe(&mut self, state: EntityState) {
        self.state = state;
    }
}
