//! Common error types used across the workspace.
//!
//! Each failure family has its own typed error; [`LumenError`] aggregates them
//! through `#[from]` conversions.

use crate::entity::EntityId;

/// Top-level error for the lumen workspace.
#[derive(Debug, thiserror::Error)]
pub enum LumenError {
    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    #[error("actuator error")]
    Actuator(#[from] ActuatorError),
}

/// A rule group or policy was built with missing or invalid references.
///
/// Raised synchronously at construction and never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no master toggle configured")]
    MissingMasterToggle,

    #[error("entity {0} is not known to the state source")]
    UnknownEntity(EntityId),

    #[error("hold duration must be greater than zero")]
    ZeroHoldDuration,

    #[error("dim brightness must be between 1 and 255, got {0}")]
    InvalidBrightness(u8),

    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),
}

/// An actuator command failed at the device boundary.
///
/// The core never retries these; it logs them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuatorError {
    #[error("entity {0} is unavailable")]
    Unavailable(EntityId),

    #[error("entity {entity} does not support {command}")]
    Unsupported {
        entity: EntityId,
        command: &'static str,
    },
}
