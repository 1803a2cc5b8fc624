//! Virtual device implementations — light, switch, sensor, button, number.
//!
//! Devices are plain state holders: they validate a [`Command`] against
//! what the hardware kind supports and return the resulting state. Publishing
//! that state is the registry's job.

mod button;
mod light;
mod number;
mod sensor;
mod switch;

pub use button::VirtualButton;
pub use light::VirtualLight;
pub use number::VirtualNumber;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use lumen_domain::command::Command;
use lumen_domain::entity::{EntityDomain, EntityId, EntityState};
use lumen_domain::error::ActuatorError;

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Switch(VirtualSwitch),
    Sensor(VirtualSensor),
    Button(VirtualButton),
    Number(VirtualNumber),
}

impl VirtualDevice {
    /// Pick the device kind matching the entity's domain.
    #[must_use]
    pub fn for_entity(entity_id: EntityId) -> Self {
        match entity_id.domain() {
            EntityDomain::Light => Self::Light(VirtualLight::new(entity_id)),
            EntityDomain::Switch | EntityDomain::InputBoolean => {
                Self::Switch(VirtualSwitch::new(entity_id))
            }
            EntityDomain::BinarySensor | EntityDomain::Sensor => {
                Self::Sensor(VirtualSensor::new(entity_id))
            }
            EntityDomain::Button => Self::Button(VirtualButton::new(entity_id)),
            EntityDomain::Number => Self::Number(VirtualNumber::new(entity_id)),
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::Light(d) => d.entity_id(),
            Self::Switch(d) => d.entity_id(),
            Self::Sensor(d) => d.entity_id(),
            Self::Button(d) => d.entity_id(),
            Self::Number(d) => d.entity_id(),
        }
    }

    #[must_use]
    pub fn state(&self) -> EntityState {
        match self {
            Self::Light(d) => d.state(),
            Self::Switch(d) => d.state(),
            Self::Sensor(d) => d.state(),
            Self::Button(d) => d.state(),
            Self::Number(d) => d.state(),
        }
    }

    /// Apply a command, returning the state the device reports afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::Unsupported`] when the device kind does not
    /// accept the command.
    pub fn handle(&mut self, command: Command) -> Result<EntityState, ActuatorError> {
        match self {
            Self::Light(d) => d.handle(command),
            Self::Switch(d) => d.handle(command),
            Self::Sensor(d) => d.handle(command),
            Self::Button(d) => d.handle(command),
            Self::Number(d) => d.handle(command),
        }
    }

    /// Record a state the device reached on its own (physical switch,
    /// sensor reading).
    pub fn observe(&mut self, state: EntityState) {
        match self {
            Self::Light(d) => d.observe(state),
            Self::Switch(d) => d.observe(state),
            Self::Sensor(d) => d.observe(state),
            Self::Button(d) => d.observe(state),
            Self::Number(d) => d.observe(state),
        }
    }
}

fn unsupported(entity_id: &EntityId, command: Command) -> ActuatorError {
    ActuatorError::Unsupported {
        entity: entity_id.clone(),
        command: command.service(),
    }
}
