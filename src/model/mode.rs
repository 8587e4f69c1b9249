use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Which producer feeds the relay: the upstream market feed or the
/// synthetic generator. Exactly one mode is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Live,
    Manual,
}

impl Mode {
    /// Map the control API's numeric flag to a mode (0 = manual, 1 = live).
    pub fn from_flag(flag: i64) -> Result<Self, RelayError> {
        match flag {
            0 => Ok(Mode::Manual),
            1 => Ok(Mode::Live),
            other => Err(RelayError::InvalidArgument(format!(
                "unknown mode flag {}, expected 0 (manual) or 1 (live)",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => write!(f, "LIVE"),
            Mode::Manual => write!(f, "MANUAL"),
        }
    }
}

impl FromStr for Mode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "manual" => Ok(Mode::Manual),
            other => Err(RelayError::InvalidArgument(format!(
                "unknown mode '{}', expected 'live' or 'manual'",
                other
            ))),
        }
    }
}

/// Steering input for the synthetic generator. Stored in every mode but
/// only read while manual mode is active; reset to `None` on each mode
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::None => write!(f, "none"),
        }
    }
}

impl FromStr for Direction {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "none" => Ok(Direction::None),
            other => Err(RelayError::InvalidArgument(format!(
                "unknown direction '{}', expected 'up', 'down' or 'none'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_flag_maps_zero_and_one() {
        assert_eq!(Mode::from_flag(0).unwrap(), Mode::Manual);
        assert_eq!(Mode::from_flag(1).unwrap(), Mode::Live);
    }

    #[test]
    fn mode_from_flag_rejects_other_values() {
        assert!(Mode::from_flag(2).is_err());
        assert!(Mode::from_flag(-1).is_err());
    }

    #[test]
    fn mode_parses_case_insensitive() {
        assert_eq!("LIVE".parse::<Mode>().unwrap(), Mode::Live);
        assert_eq!("manual".parse::<Mode>().unwrap(), Mode::Manual);
        assert!("paper".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Mode::Live).unwrap(), "\"LIVE\"");
        assert_eq!(serde_json::to_string(&Mode::Manual).unwrap(), "\"MANUAL\"");
    }

    #[test]
    fn direction_parses_and_rejects() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("Down".parse::<Direction>().unwrap(), Direction::Down);
        assert_eq!("none".parse::<Direction>().unwrap(), Direction::None);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Direction::None).unwrap(), "\"none\"");
    }

    #[test]
    fn direction_defaults_to_none() {
        assert_eq!(Direction::default(), Direction::None);
    }
}
