//! Motion simulator — pulses virtual motion sensors on a timer.
//!
//! Runs as a tokio task and talks to the dispatcher thread through a channel
//! of [`Report`]s, the same way a real device binding would.

use std::time::Duration;

use lumen_domain::entity::{EntityId, EntityState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A state reported by the outside world for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub entity_id: EntityId,
    pub state: EntityState,
}

impl Report {
    #[must_use]
    pub fn new(entity_id: EntityId, state: EntityState) -> Self {
        Self { entity_id, state }
    }
}

/// Cycles through motion sensors: every `interval`, the next sensor reports
/// motion for `on_for`, then clears.
pub struct MotionSimulator {
    sensors: Vec<EntityId>,
    interval: Duration,
    on_for: Duration,
    reports: mpsc::Sender<Report>,
}

impl MotionSimulator {
    /// Spawn the simulator. It stops when the receiving side is dropped.
    #[must_use]
    pub fn start(
        sensors: Vec<EntityId>,
        interval: Duration,
        on_for: Duration,
        reports: mpsc::Sender<Report>,
    ) -> JoinHandle<()> {
        let simulator = Self {
            sensors,
            interval,
            on_for,
            reports,
        };
        tokio::spawn(simulator.run())
    }

    async fn run(self) {
        if self.sensors.is_empty() {
            tracing::warn!("motion simulator started without sensors");
            return;
        }
        tracing::info!(
            sensors = self.sensors.len(),
            interval = ?self.interval,
            on_for = ?self.on_for,
            "motion simulator started"
        );
        for sensor in self.sensors.iter().cycle() {
            tokio::time::sleep(self.interval).await;
            if !self.pulse(sensor).await {
                tracing::debug!("report channel closed, motion simulator stopping");
                return;
            }
        }
    }

    async fn pulse(&self, sensor: &EntityId) -> bool {
        tracing::debug!(%sensor, "simulated motion");
        if self
            .reports
            .send(Report::new(sensor.clone(), EntityState::On))
            .await
            .is_err()
        {
            return false;
        }
        tokio::time::sleep(self.on_for).await;
        self.reports
            .send(Report::new(sensor.clone(), EntityState::Off))
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_domain::entity::EntityDomain;
    use tokio::time::Instant;

    fn sensor(name: &str) -> EntityId {
        EntityId::new(EntityDomain::BinarySensor, name)
    }

    #[tokio::test(start_paused = true)]
    async fn should_pulse_sensors_in_turn() {
        let (tx, mut rx) = mpsc::channel(4);
        let started = Instant::now();
        let _handle = MotionSimulator::start(
            vec![sensor("hall"), sensor("kitchen")],
            Duration::from_secs(60),
            Duration::from_secs(10),
            tx,
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first, Report::new(sensor("hall"), EntityState::On));
        assert!(started.elapsed() >= Duration::from_secs(60));

        let cleared = rx.recv().await.unwrap();
        assert_eq!(cleared, Report::new(sensor("hall"), EntityState::Off));
        assert!(started.elapsed() >= Duration::from_secs(70));

        let second = rx.recv().await.unwrap();
        assert_eq!(second, Report::new(sensor("kitchen"), EntityState::On));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let handle = MotionSimulator::start(
            vec![sensor("hall")],
            Duration::from_secs(1),
            Duration::from_secs(1),
            tx,
        );
        drop(rx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn should_return_immediately_without_sensors() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = MotionSimulator::start(Vec::new(), Duration::from_secs(1), Duration::from_secs(1), tx);
        handle.await.unwrap();
    }
}
