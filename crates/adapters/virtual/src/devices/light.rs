//! Virtual light — responds to `turn_on` (with optional brightness) and `turn_off`.

use lumen_domain::command::{Command, FULL_BRIGHTNESS};
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// A simulated dimmable light.
pub struct VirtualLight {
    entity_id: EntityId,
    state: EntityState,
    brightness: u8,
}

impl VirtualLight {
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            state: EntityState::Off,
            brightness: FULL_BRIGHTNESS,
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

    /// Brightness used the last time the light was on.
    #[must_use]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Handle a command, returning the new state.
    ///
    /// `turn_on` without brightness keeps the previous brightness.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::Unsupported`] for `press` and `set_value`.
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        match command {
            Command::TurnOn { brightness } => {
                if let Some(brightness) = brightness {
                    self.brightness = brightness;
                }
                self.state = EntityState::On;
            }
            Command::TurnOff => self.state = EntityState::Off,
            other => return Err(super::unsupported(&self.entity_id, other)),
        }
        Ok(self.state)
    }

    pub fn observe(&mut self, state: EntityState) {
        self.state = state;
    }
}
