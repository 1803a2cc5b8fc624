//! Entity — a single observable or controllable aspect of a device.
//!
//! Entities are addressed by `<domain>.<object_id>` strings such as
//! `light.kitchen_ceiling` or `binary_sensor.hall_motion`. The domain
//! category is a closed set, and each category declares its own id prefix,
//! so ids are validated when configuration is loaded rather than derived
//! from type names at runtime.

mod state;

pub use state::EntityState;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Domain category of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityDomain {
    Light,
    Switch,
    BinarySensor,
    Sensor,
    InputBoolean,
    Button,
    Number,
}

impl EntityDomain {
    pub const ALL: [Self; 7] = [
        Self::Light,
        Self::Switch,
        Self::BinarySensor,
        Self::Sensor,
        Self::InputBoolean,
        Self::Button,
        Self::Number,
    ];

    /// The id prefix for this category.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Switch => "switch",
            Self::BinarySensor => "binary_sensor",
            Self::Sensor => "sensor",
            Self::InputBoolean => "input_boolean",
            Self::Button => "button",
            Self::Number => "number",
        }
    }

    /// Whether entities of this category accept on/off commands.
    #[must_use]
    pub fn is_switchable(self) -> bool {
        matches!(self, Self::Light | Self::Switch | Self::InputBoolean)
    }
}

impl fmt::Display for EntityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifier of an entity, e.g. `light.kitchen_ceiling`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: EntityDomain,
    full: String,
}

impl EntityId {
    /// Build an id from its category and object id.
    #[must_use]
    pub fn new(domain: EntityDomain, object_id: &str) -> Self {
        Self {
            domain,
            full: format!("{}.{object_id}", domain.prefix()),
        }
    }

    #[must_use]
    pub fn domain(&self) -> EntityDomain {
        self.domain
    }

    /// The part after the `<domain>.` prefix.
    #[must_use]
    pub fn object_id(&self) -> &str {
        &self.full[self.domain.prefix().len() + 1..]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for EntityId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidEntityId(s.to_string());
        let (prefix, object_id) = s.split_once('.').ok_or_else(invalid)?;
        let domain = EntityDomain::ALL
            .into_iter()
            .find(|d| d.prefix() == prefix)
            .ok_or_else(invalid)?;
        let valid_object = !object_id.is_empty()
            && object_id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_object {
            return Err(invalid());
        }
        Ok(Self::new(domain, object_id))
    }
}

impl TryFrom<String> for EntityId {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_id_with_domain_prefix() {
        let id = EntityId::new(EntityDomain::BinarySensor, "hall_motion");
        assert_eq!(id.as_str(), "binary_sensor.hall_motion");
        assert_eq!(id.object_id(), "hall_motion");
        assert_eq!(id.domain(), EntityDomain::BinarySensor);
    }

    #[test]
    fn should_parse_every_known_domain() {
        for domain in EntityDomain::ALL {
            let text = format!("{}.thing_1", domain.prefix());
            let id: EntityId = text.parse().unwrap();
            assert_eq!(id.domain(), domain);
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn should_reject_unknown_domain() {
        let result = EntityId::from_str("climate.living_room");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidEntityId(_))
        ));
    }

    #[test]
    fn should_reject_missing_object_id() {
        assert!(EntityId::from_str("light.").is_err());
        assert!(EntityId::from_str("light").is_err());
    }

    #[test]
    fn should_reject_uppercase_object_id() {
        assert!(EntityId::from_str("light.Kitchen").is_err());
    }

    #[test]
    fn should_roundtrip_through_serde_json_as_plain_string() {
        let id = EntityId::new(EntityDomain::Light, "office");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"light.office\"");
        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_fail_deserializing_invalid_id() {
        let result: Result<EntityId, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_only_switch_lights_switches_and_booleans() {
        assert!(EntityDomain::Light.is_switchable());
        assert!(EntityDomain::InputBoolean.is_switchable());
        assert!(!EntityDomain::BinarySensor.is_switchable());
        assert!(!EntityDomain::Button.is_switchable());
    }
}
