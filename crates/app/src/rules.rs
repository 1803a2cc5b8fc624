//! Reusable rule producers.
//!
//! Each function registers one rule on the state source and returns its
//! [`Subscription`]; rule groups collect them in a
//! [`SubscriptionSet`](crate::subscription::SubscriptionSet).

use std::rc::Rc;
use std::time::Duration;

use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ConfigurationError;
use lumen_domain::event::StateChange;

use crate::dimming::DimmingController;
use crate::hold::HoldFilter;
use crate::ports::Ports;
use crate::subscription::Subscription;

/// Drive `lights` from a motion sensor through `controller`.
///
/// Sensor on → full brightness; sensor off → dim then off. Repeated reports
/// of the same state and unavailable readings are ignored.
pub fn motion_light(
    ports: &Ports,
    sensor: &EntityId,
    lights: Vec<EntityId>,
    controller: DimmingController,
) -> Subscription {
    ports.states.subscribe(
        sensor,
        Box::new(move |change: &StateChange| {
            if !change.is_transition() {
                return;
            }
            match change.current {
                EntityState::On => {
                    for light in &lights {
                        controller.on_motion_detected(light);
                    }
                }
                EntityState::Off => {
                    for light in &lights {
                        controller.on_motion_stopped(light);
                    }
                }
                other => {
                    tracing::debug!(sensor = %change.entity_id, state = %other, "motion reading ignored");
                }
            }
        }),
    )
}

/// Bring `lights` in line with the sensor's current reading: full brightness
/// while motion is reported, off otherwise.
pub fn reconcile_motion_light(
    ports: &Ports,
    sensor: &EntityId,
    lights: &[EntityId],
    controller: &DimmingController,
) {
    let motion = ports
        .states
        .current_state(sensor)
        .is_some_and(|state| state.is_on());
    tracing::debug!(%sensor, motion, "reconciling lights");
    for light in lights {
        if motion {
            controller.on_motion_detected(light);
        } else {
            controller.force_off(light);
        }
    }
}

/// Turn `toggle` back on once it has been off without interruption for `hold`.
///
/// The hold also counts from registration when the toggle is already off.
///
/// # Errors
///
/// Returns [`ConfigurationError::ZeroHoldDuration`] if `hold` is zero.
pub fn reactivate_after(
    ports: &Ports,
    toggle: &EntityId,
    hold: Duration,
) -> Result<Subscription, ConfigurationError> {
    let filter = HoldFilter::state_for(toggle.clone(), EntityState::Off, hold)?.arm_on_start(true);
    let actuators = Rc::clone(&ports.actuators);
    let target = toggle.clone();
    Ok(filter.subscribe(ports, move || {
        tracing::info!(toggle = %target, ?hold, "reactivating automation");
        actuators.turn_on(&target, None);
    }))
}

/// Mirror `source` onto `target` in one direction.
///
/// Nothing is sent when `target` already reports the wanted state, so two
/// opposite `follow` rules settle instead of echoing each other. Changes
/// superseded by a newer state of `source` are skipped; only the latest
/// state is mirrored.
pub fn follow(ports: &Ports, source: &EntityId, target: &EntityId) -> Subscription {
    let states = Rc::clone(&ports.states);
    let actuators = Rc::clone(&ports.actuators);
    let target = target.clone();
    ports.states.subscribe(
        source,
        Box::new(move |change: &StateChange| {
            if states.current_state(&change.entity_id) != Some(change.current) {
                tracing::trace!(source = %change.entity_id, state = %change.current, "stale change, not following");
                return;
            }
            let wanted = match change.current {
                EntityState::On | EntityState::Off => change.current,
                _ => return,
            };
            if states.current_state(&target) == Some(wanted) {
                return;
            }
            tracing::debug!(source = %change.entity_id, target = %target, state = %wanted, "following");
            if wanted.is_on() {
                actuators.turn_on(&target, None);
            } else {
                actuators.turn_off(&target);
            }
        }),
    )
}

/// Run `action` for every change of `entity_id` whose new state matches
/// `predicate`.
pub fn on_state(
    ports: &Ports,
    entity_id: &EntityId,
    predicate: impl Fn(&EntityState) -> bool + 'static,
    mut action: impl FnMut(&StateChange) + 'static,
) -> Subscription {
    ports.states.subscribe(
        entity_id,
        Box::new(move |change: &StateChange| {
            if predicate(&change.current) {
                action(change);
            }
        }),
    )
}
