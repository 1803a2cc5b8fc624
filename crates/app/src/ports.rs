//! Port definitions — traits that the surrounding layers implement.
//!
//! Ports are the boundaries between the automation core and the outside
//! world. They are defined here (in `app`) so that both the core and the
//! adapters can depend on them without creating circular dependencies.

pub mod actuator;
pub mod scheduler;
pub mod state_source;

pub use actuator::ActuatorSink;
pub use scheduler::{Scheduler, TimerCallback, TimerHandle, TimerSlot};
pub use state_source::{StateCallback, StateSource};

use std::rc::Rc;

/// The collaborators every rule needs, bundled so they can be cloned into
/// callbacks.
#[derive(Clone)]
pub struct Ports {
    pub states: Rc<dyn StateSource>,
    pub scheduler: Rc<dyn Scheduler>,
    pub actuators: Rc<dyn ActuatorSink>,
}

impl Ports {
    pub fn new(
        states: Rc<dyn StateSource>,
        scheduler: Rc<dyn Scheduler>,
        actuators: Rc<dyn ActuatorSink>,
    ) -> Self {
        Self {
            states,
            scheduler,
            actuators,
        }
    }
}
