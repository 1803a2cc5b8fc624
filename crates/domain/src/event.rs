//! State change — an immutable record of one observed transition.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityState};
use crate::time::Timestamp;

/// One observed transition of an entity's state.
///
/// Produced exactly once per transition by the state source and delivered
/// to every live subscriber of that entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: EntityId,
    pub previous: Option<EntityState>,
    pub current: EntityState,
    pub timestamp: Timestamp,
    /// Who caused the change (a user, an automation), when known.
    pub actor_id: Option<String>,
}

impl StateChange {
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        previous: Option<EntityState>,
        current: EntityState,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            entity_id,
            previous,
            current,
            timestamp,
            actor_id: None,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Whether the value actually changed (first observations count as changes).
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.previous != Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityDomain;
    use crate::time::now;

    fn motion() -> EntityId {
        EntityId::new(EntityDomain::BinarySensor, "hall_motion")
    }

    #[test]
    fn should_build_change_without_actor() {
        let change = StateChange::new(motion(), Some(EntityState::Off), EntityState::On, now());
        assert!(change.actor_id.is_none());
        assert!(change.is_transition());
    }

    #[test]
    fn should_attach_actor() {
        let change = StateChange::new(motion(), None, EntityState::On, now()).with_actor("alice");
        assert_eq!(change.actor_id.as_deref(), Some("alice"));
    }

    #[test]
    fn should_not_be_a_transition_when_value_repeats() {
        let change = StateChange::new(motion(), Some(EntityState::On), EntityState::On, now());
        assert!(!change.is_transition());
    }

    #[test]
    fn should_treat_first_observation_as_transition() {
        let change = StateChange::new(motion(), None, EntityState::Off, now());
        assert!(change.is_transition());
    }
}
