//! Virtual sensor — a read-only binary or numeric reading.

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityDomain, EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// A simulated sensor.
///
/// Sensors do not accept commands; their state only changes through
/// [`observe`](Self::observe).
pub struct VirtualSensor {
    entity_id: EntityId,
    state: EntityState,
}

impl VirtualSensor {
    /// Binary sensors start off, numeric sensors start unknown.
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        let state = match entity_id.domain() {
            EntityDomain::BinarySensor => EntityState::Off,
            _ => EntityState::Unknown,
        };
        Self { entity_id, state }
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
    /// Always returns [`ActuatorError::Unsupported`].
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        Err(super::unsupported(&self.entity_id, command))
    }

    pub fn observe(&mut self, state: EntityState) {
        self.state = state;
    }
}
