//! Command — an instruction sent to an actuator.

use serde::{Deserialize, Serialize};

/// Brightness used for "full on".
pub const FULL_BRIGHTNESS: u8 = 255;

/// An actuator command. Commands are fire-and-forget: nothing in the core
/// waits on, or branches on, their outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum Command {
    TurnOn { brightness: Option<u8> },
    TurnOff,
    Press,
    SetValue { value: f64 },
}

impl Command {
    /// `turn_on` without parameters.
    #[must_use]
    pub fn turn_on() -> Self {
        Self::TurnOn { brightness: None }
    }

    #[must_use]
    pub fn turn_on_at(brightness: u8) -> Self {
        Self::TurnOn {
            brightness: Some(brightness),
        }
    }

    #[must_use]
    pub fn full_brightness() -> Self {
        Self::turn_on_at(FULL_BRIGHTNESS)
    }

    /// Service name, as exposed by device integrations.
    #[must_use]
    pub fn service(&self) -> &'static str {
        match self {
            Self::TurnOn { .. } => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Press => "press",
            Self::SetValue { .. } => "set_value",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TurnOn {
                brightness: Some(b),
            } => write!(f, "turn_on(brightness={b})"),
            Self::SetValue { value } => write!(f, "set_value({value})"),
            other => f.write_str(other.service()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_services() {
        assert_eq!(Command::turn_on().service(), "turn_on");
        assert_eq!(Command::TurnOff.service(), "turn_off");
        assert_eq!(Command::Press.service(), "press");
        assert_eq!(Command::SetValue { value: 1.0 }.service(), "set_value");
    }

    #[test]
    fn should_use_max_brightness_for_full_brightness() {
        assert_eq!(
            Command::full_brightness(),
            Command::TurnOn {
                brightness: Some(255)
            }
        );
    }

    #[test]
    fn should_display_parameters() {
        assert_eq!(Command::turn_on_at(40).to_string(), "turn_on(brightness=40)");
        assert_eq!(Command::turn_on().to_string(), "turn_on");
        assert_eq!(Command::SetValue { value: 2.5 }.to_string(), "set_value(2.5)");
    }

    #[test]
    fn should_serialize_with_service_tag() {
        let json = serde_json::to_value(Command::turn_on_at(10)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"service": "turn_on", "brightness": 10})
        );
    }
}
