//! Actuator port — commands sent to lights, switches, buttons and numbers.

use lumen_domain::command::Command;
use lumen_domain::entity::EntityId;
use lumen_domain::error::ActuatorError;

/// Sink for actuator commands.
///
/// The core treats every command as fire-and-forget: it goes through
/// [`fire`](Self::fire), which logs failures and never retries.
pub trait ActuatorSink {
    /// Hand a command to the device layer.
    ///
    /// # Errors
    ///
    /// Returns an [`ActuatorError`] when the device layer rejects the command.
    fn send(&self, entity_id: &EntityId, command: Command) -> Result<(), ActuatorError>;

    /// Send a command and log, rather than propagate, any failure.
    fn fire(&self, entity_id: &EntityId, command: Command) {
        tracing::trace!(entity = %entity_id, %command, "sending actuator command");
        if let Err(err) = self.send(entity_id, command) {
            tracing::warn!(%err, entity = %entity_id, %command, "actuator command failed");
        }
    }

    fn turn_on(&self, entity_id: &EntityId, brightness: Option<u8>) {
        self.fire(entity_id, Command::TurnOn { brightness });
    }

    fn turn_off(&self, entity_id: &EntityId) {
        self.fire(entity_id, Command::TurnOff);
    }

    fn press(&self, entity_id: &EntityId) {
        self.fire(entity_id, Command::Press);
    }

    fn set_value(&self, entity_id: &EntityId, value: f64) {
        self.fire(entity_id, Command::SetValue { value });
    }
}
