//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lumen.toml` in the working directory, or at the path given by
//! `LUMEN_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashSet;
use std::time::Duration;

use lumen_domain::entity::{EntityDomain, EntityId};
use lumen_domain::error::ConfigurationError;
use lumen_domain::policy::{DimmingPolicy, validate_hold};
use serde::Deserialize;

use crate::areas::AreaPlan;

/// Default configuration file name.
pub const DEFAULT_PATH: &str = "lumen.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Dispatch loop settings.
    pub runtime: RuntimeConfig,
    /// Actor ids whose changes count as automated rather than manual.
    pub known_actors: Vec<String>,
    /// One rule group per area.
    pub areas: Vec<AreaConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Dispatch loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Longest the loop sleeps without checking the clock, in milliseconds.
    pub tick_ms: u64,
    /// Pulse every area's motion sensor from a background simulator.
    pub simulate_motion: bool,
    /// Seconds between two simulated motions.
    pub motion_interval_secs: u64,
    /// Seconds a simulated motion lasts.
    pub motion_on_secs: u64,
}

/// A lighting area: one master toggle, one motion sensor, some lights.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub name: String,
    /// `input_boolean` or `switch` enabling the area's motion rules.
    pub master_toggle: String,
    pub motion_sensor: Option<String>,
    pub lights: Vec<String>,
    pub dim_brightness: u8,
    /// Zero turns lights off as soon as motion stops.
    pub dim_delay_secs: u64,
    /// `number` holding the sensor's own active delay.
    pub active_delay_entity: Option<String>,
    pub active_delay_threshold: Option<f64>,
    /// Turn the master toggle back on after it stayed off this long.
    pub reactivate_after_secs: Option<u64>,
    /// Wall switch kept in step with the master toggle, both ways.
    pub follow_switch: Option<String>,
}

impl Config {
    /// Load configuration from `LUMEN_CONFIG` or `lumen.toml` (if present),
    /// then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LUMEN_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration document, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or does not validate.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LUMEN_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("LUMEN_TICK_MS") {
            if let Ok(tick_ms) = val.parse() {
                self.runtime.tick_ms = tick_ms;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.tick_ms == 0 {
            return Err(ConfigError::Validation("tick_ms must be non-zero".to_string()));
        }
        if self.runtime.simulate_motion && self.runtime.motion_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "motion_interval_secs must be non-zero".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for area in &self.areas {
            if !names.insert(area.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate area name {:?}",
                    area.name
                )));
            }
            area.resolve()?;
        }
        Ok(())
    }

    /// Resolve every area into typed entity ids and policies.
    ///
    /// # Errors
    ///
    /// Returns the first area that fails to resolve.
    pub fn area_plans(&self) -> Result<Vec<AreaPlan>, ConfigError> {
        self.areas.iter().map(AreaConfig::resolve).collect()
    }

    /// Maximum sleep of the dispatch loop.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.runtime.tick_ms)
    }
}

impl AreaConfig {
    /// Validate entity ids and parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a missing name or an entity of
    /// the wrong kind, and [`ConfigError::Entity`] for malformed ids or
    /// invalid parameters.
    pub fn resolve(&self) -> Result<AreaPlan, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("area name must not be empty".to_string()));
        }
        if self.master_toggle.is_empty() {
            return Err(ConfigError::Entity(ConfigurationError::MissingMasterToggle));
        }
        let master_toggle = self.entity(&self.master_toggle, &[
            EntityDomain::InputBoolean,
            EntityDomain::Switch,
        ])?;
        let motion_sensor = self
            .motion_sensor
            .as_deref()
            .map(|raw| self.entity(raw, &[EntityDomain::BinarySensor]))
            .transpose()?;
        let lights = self
            .lights
            .iter()
            .map(|raw| self.entity(raw, &[EntityDomain::Light, EntityDomain::Switch]))
            .collect::<Result<Vec<_>, _>>()?;
        let active_delay_entity = self
            .active_delay_entity
            .as_deref()
            .map(|raw| self.entity(raw, &[EntityDomain::Number, EntityDomain::Sensor]))
            .transpose()?;
        let follow_switch = self
            .follow_switch
            .as_deref()
            .map(|raw| self.entity(raw, &[EntityDomain::Switch, EntityDomain::Light]))
            .transpose()?;

        let policy = DimmingPolicy {
            brightness: self.dim_brightness,
            delay: Duration::from_secs(self.dim_delay_secs),
            active_delay_threshold: self.active_delay_threshold,
        };
        policy.validate()?;
        let reactivate_after = self
            .reactivate_after_secs
            .map(|secs| validate_hold(Duration::from_secs(secs)))
            .transpose()?;

        Ok(AreaPlan {
            name: self.name.clone(),
            master_toggle,
            motion_sensor,
            lights,
            policy,
            active_delay_entity,
            reactivate_after,
            follow_switch,
        })
    }

    fn entity(&self, raw: &str, allowed: &[EntityDomain]) -> Result<EntityId, ConfigError> {
        let entity_id: EntityId = raw.parse()?;
        if !allowed.contains(&entity_id.domain()) {
            return Err(ConfigError::Validation(format!(
                "area {:?}: {entity_id} must be one of {}",
                self.name,
                allowed
                    .iter()
                    .map(|domain| domain.prefix())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(entity_id)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lumend=info,lumen_app=info".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            simulate_motion: false,
            motion_interval_secs: 120,
            motion_on_secs: 20,
        }
    }
}

impl Default for AreaConfig {
    fn default() -> Self {
        let policy = DimmingPolicy::default();
        Self {
            name: String::new(),
            master_toggle: String::new(),
            motion_sensor: None,
            lights: Vec::new(),
            dim_brightness: policy.brightness,
            dim_delay_secs: policy.delay.as_secs(),
            active_delay_entity: None,
            active_delay_threshold: None,
            reactivate_after_secs: None,
            follow_switch: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// An entity reference or automation parameter was rejected.
    #[error("invalid automation configuration")]
    Entity(#[from] ConfigurationError),
}
