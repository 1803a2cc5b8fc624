//! Daemon runtime — owns the dispatcher, the virtual devices and every area
//! automation, and drives them from the tokio event loop.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use lumen_adapter_virtual::{Report, VirtualDevices};
use lumen_app::dispatcher::LocalDispatcher;
use lumen_app::ports::{ActuatorSink, Ports, StateSource};
use lumen_app::toggleable::ToggleableAutomation;
use lumen_domain::entity::{EntityId, EntityState};
use lumen_domain::time;
use tokio::sync::mpsc;

use crate::areas::{self, AreaPlan};
use crate::config::{Config, ConfigError};

/// Everything the daemon runs.
pub struct Daemon {
    dispatcher: LocalDispatcher,
    devices: Rc<VirtualDevices>,
    automations: Vec<ToggleableAutomation>,
    plans: Vec<AreaPlan>,
    tick: Duration,
}

impl Daemon {
    /// Wire every configured area on a dispatcher running on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when an area cannot be resolved or built.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_dispatcher(config, LocalDispatcher::default())
    }

    /// Wire every configured area on the given dispatcher.
    ///
    /// Master toggles and follow switches start on; every other device
    /// starts in its default state.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when an area cannot be resolved or built.
    pub fn with_dispatcher(config: &Config, dispatcher: LocalDispatcher) -> Result<Self, ConfigError> {
        let plans = config.area_plans()?;
        let devices = Rc::new(VirtualDevices::new(&dispatcher));
        for plan in &plans {
            devices.provision_with_state(plan.master_toggle.clone(), EntityState::On);
            if let Some(switch) = &plan.follow_switch {
                devices.provision_with_state(switch.clone(), EntityState::On);
            }
            for entity_id in plan.entities() {
                devices.provision(entity_id.clone());
            }
        }

        let ports = Ports::new(
            Rc::new(dispatcher.clone()),
            Rc::new(dispatcher.clone()),
            Rc::clone(&devices) as Rc<dyn ActuatorSink>,
        );
        let known_actors: Rc<[String]> = config.known_actors.iter().cloned().collect();
        let automations = plans
            .iter()
            .map(|plan| areas::build_area(plan, &ports, Rc::clone(&known_actors)))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(areas = automations.len(), devices = devices.len(), "areas wired");

        Ok(Self {
            dispatcher,
            devices,
            automations,
            plans,
            tick: config.tick(),
        })
    }

    /// Start every automation and settle the resulting changes.
    pub fn start(&self) {
        for automation in &self.automations {
            automation.start();
        }
        self.dispatcher.run_until_idle();
    }

    /// Stop every automation. No command is issued afterwards.
    pub fn stop(&self) {
        for automation in &self.automations {
            automation.stop();
        }
    }

    /// Feed one externally reported state into the dispatcher.
    pub fn handle_report(&self, report: &Report) {
        if let Err(err) = self.devices.report(&report.entity_id, report.state) {
            tracing::warn!(%err, entity = %report.entity_id, "report dropped");
        }
    }

    /// Catch the clock up with the wall clock, then apply `report` and
    /// dispatch it, so timers it starts count from the moment it arrived.
    pub fn apply_report(&self, report: &Report) {
        self.tick();
        self.handle_report(report);
        self.dispatcher.run_until_idle();
    }

    /// Bring the dispatcher up to the wall clock.
    pub fn tick(&self) {
        self.dispatcher.advance_to(time::now());
    }

    /// How long the loop may sleep before the next timer is due.
    #[must_use]
    pub fn next_wait(&self) -> Duration {
        self.dispatcher
            .next_deadline()
            .map_or(self.tick, |deadline| {
                time::elapsed(time::now(), deadline).min(self.tick)
            })
    }

    /// Run until `shutdown` resolves, then stop every automation.
    ///
    /// Reports are applied as they arrive; timers fire when their deadline
    /// passes on the wall clock.
    pub async fn run(&self, mut reports: mpsc::Receiver<Report>, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut reports_open = true;
        loop {
            let wait = self.next_wait();
            tokio::select! {
                () = &mut shutdown => break,
                report = reports.recv(), if reports_open => match report {
                    Some(report) => self.apply_report(&report),
                    None => {
                        tracing::debug!("report channel closed");
                        reports_open = false;
                    }
                },
                () = tokio::time::sleep(wait) => {}
            }
            self.tick();
        }
        self.stop();
        tracing::info!("dispatch loop stopped");
    }

    /// Motion sensors of every area, for the simulator.
    #[must_use]
    pub fn motion_sensors(&self) -> Vec<EntityId> {
        self.plans
            .iter()
            .filter_map(|plan| plan.motion_sensor.clone())
            .collect()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &LocalDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn devices(&self) -> &VirtualDevices {
        &self.devices
    }

    #[must_use]
    pub fn automations(&self) -> &[ToggleableAutomation] {
        &self.automations
    }

    /// Current state of an entity as seen by the rules.
    #[must_use]
    pub fn state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.dispatcher.current_state(entity_id)
    }
}
