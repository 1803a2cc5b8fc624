//! Policies — tunable parameters of the automation core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Parameters of the "dim, then turn off later" behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimmingPolicy {
    /// Brightness commanded when motion stops.
    pub brightness: u8,
    /// How long the light stays dimmed before being turned off.
    /// A zero delay disables dimming: motion stopping turns the light off.
    pub delay: Duration,
    /// Dimming only applies while the sensor's active delay is at or below
    /// this value.
    pub active_delay_threshold: Option<f64>,
}

impl Default for DimmingPolicy {
    fn default() -> Self {
        Self {
            brightness: 60,
            delay: Duration::from_secs(30),
            active_delay_threshold: None,
        }
    }
}

impl DimmingPolicy {
    /// Policy that turns lights off as soon as motion stops.
    #[must_use]
    pub fn immediate_off() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidBrightness`] when the dim
    /// brightness is zero.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.brightness == 0 {
            return Err(ConfigurationError::InvalidBrightness(self.brightness));
        }
        Ok(())
    }

    #[must_use]
    pub fn dims(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Whether a sensor reporting `active_delay` allows dimming.
    ///
    /// No threshold, or no reading, means dimming is allowed.
    #[must_use]
    pub fn allows_active_delay(&self, active_delay: Option<f64>) -> bool {
        match (self.active_delay_threshold, active_delay) {
            (Some(threshold), Some(value)) => value <= threshold,
            _ => true,
        }
    }
}

/// Validate a hold duration.
///
/// # Errors
///
/// Returns [`ConfigurationError::ZeroHoldDuration`] for a zero duration.
pub fn validate_hold(duration: Duration) -> Result<Duration, ConfigurationError> {
    if duration.is_zero() {
        Err(ConfigurationError::ZeroHoldDuration)
    } else {
        Ok(duration)
    }
}
