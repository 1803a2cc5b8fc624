//! State source port — current state and change stream of entities.

use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::event::StateChange;

use crate::subscription::Subscription;

/// Callback invoked for every [`StateChange`] of a subscribed entity.
pub type StateCallback = Box<dyn FnMut(&StateChange)>;

/// Read-only view over device states.
///
/// Implementations deliver changes of one entity in the order they occurred,
/// one at a time, through the shared dispatcher. A callback is never invoked
/// after its [`Subscription`] has been released.
pub trait StateSource {
    /// Current state of an entity, or `None` when the entity is unknown.
    fn current_state(&self, entity_id: &EntityId) -> Option<EntityState>;

    /// Register `callback` for every future change of `entity_id`.
    fn subscribe(&self, entity_id: &EntityId, callback: StateCallback) -> Subscription;
}
