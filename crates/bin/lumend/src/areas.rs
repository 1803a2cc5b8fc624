//! Area wiring — turns a resolved area into a toggleable rule group.
//!
//! Per area:
//! - toggleable: motion sensor drives the lights through a dimming controller,
//!   and enabling reconciles the lights with the sensor;
//! - persistent: the master toggle is turned back on after a long off period,
//!   an optional wall switch is coupled to the toggle both ways, and toggle
//!   changes are logged with who made them.

use std::rc::Rc;
use std::time::Duration;

use lumen_app::dimming::DimmingController;
use lumen_app::ports::Ports;
use lumen_app::rules;
use lumen_app::toggleable::ToggleableAutomation;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::error::ConfigurationError;
use lumen_domain::event::StateChange;
use lumen_domain::policy::DimmingPolicy;

/// An area with every reference resolved to a typed id.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPlan {
    pub name: String,
    pub master_toggle: EntityId,
    pub motion_sensor: Option<EntityId>,
    pub lights: Vec<EntityId>,
    pub policy: DimmingPolicy,
    pub active_delay_entity: Option<EntityId>,
    pub reactivate_after: Option<Duration>,
    pub follow_switch: Option<EntityId>,
}

impl AreaPlan {
    /// Every entity the area refers to.
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        std::iter::once(&self.master_toggle)
            .chain(&self.motion_sensor)
            .chain(&self.lights)
            .chain(&self.active_delay_entity)
            .chain(&self.follow_switch)
    }
}

/// Who caused a state change, as far as the configuration can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Manual,
    Automated,
    Unknown,
}

impl Origin {
    /// Classify an actor id against the configured automation actors.
    /// Changes without an actor come from the device itself.
    #[must_use]
    pub fn classify(known_actors: &[String], actor: Option<&str>) -> Self {
        match actor {
            None => Self::Manual,
            Some(actor) if known_actors.iter().any(|known| known == actor) => Self::Automated,
            Some(_) => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automated => "automated",
            Self::Unknown => "unknown",
        }
    }
}

/// Build the rule group of one area (not started yet).
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if an entity of the area is unknown to
/// the state source or a parameter is invalid.
pub fn build_area(
    plan: &AreaPlan,
    ports: &Ports,
    known_actors: Rc<[String]>,
) -> Result<ToggleableAutomation, ConfigurationError> {
    let controller = DimmingController::new(plan.name.clone(), ports, plan.policy)?;
    controller.set_active_delay_source(plan.active_delay_entity.clone());

    let mut builder = ToggleableAutomation::builder(plan.name.clone())
        .master_toggle(plan.master_toggle.clone());
    for entity_id in plan.entities() {
        builder = builder.requires(entity_id.clone());
    }

    if let Some(sensor) = plan.motion_sensor.clone() {
        builder = builder.motion_light(sensor, plan.lights.clone(), &controller);
    }

    if let Some(hold) = plan.reactivate_after {
        let toggle = plan.master_toggle.clone();
        let name = plan.name.clone();
        builder = builder.persistent(move |ports, set| {
            match rules::reactivate_after(ports, &toggle, hold) {
                Ok(subscription) => set.add(subscription),
                Err(err) => tracing::error!(%err, area = %name, "reactivation rule rejected"),
            }
        });
    }

    if let Some(switch) = plan.follow_switch.clone() {
        let toggle = plan.master_toggle.clone();
        builder = builder.persistent(move |ports, set| {
            set.add(rules::follow(ports, &switch, &toggle));
            set.add(rules::follow(ports, &toggle, &switch));
        });
    }

    let toggle = plan.master_toggle.clone();
    let name = plan.name.clone();
    builder = builder.persistent(move |ports, set| {
        let known_actors = Rc::clone(&known_actors);
        let area = name.clone();
        set.add(rules::on_state(
            ports,
            &toggle,
            |state: &EntityState| matches!(state, EntityState::On | EntityState::Off),
            move |change: &StateChange| {
                if !change.is_transition() {
                    return;
                }
                let origin = Origin::classify(&known_actors, change.actor_id.as_deref());
                tracing::info!(
                    %area,
                    state = %change.current,
                    origin = origin.as_str(),
                    actor = change.actor_id.as_deref().unwrap_or("-"),
                    "master toggle changed"
                );
            },
        ));
    });

    builder.build(ports)
}
