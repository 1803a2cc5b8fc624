//! Virtual button — counts `press` commands.

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// A simulated stateless button.
pub struct VirtualButton {
    entity_id: EntityId,
    state: EntityState,
    presses: u32,
}

impl VirtualButton {
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            state: EntityState::Unknown,
            presses: 0,
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

    #[must_use]
    pub fn presses(&self) -> u32 {
        self.presses
    }

    /// # Errors
    ///
    /// Returns [`ActuatorError::Unsupported`] for anything but `press`.
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        match command {
            Command::Press => {
                self.presses = self.presses.saturating_add(1);
                Ok(self.state)
            }
            other => Err(super::unsupported(&self.entity_id, other)),
        }
    }

    pub fn observe(&mut self, state: EntityState) {
        self.state = state;
    }
}
