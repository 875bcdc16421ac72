//! Shared types for the focusd API

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TimerState;

/// An edit to the timer configuration, only accepted while idle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ConfigChange {
    WorkDuration(u32),
    BreakDuration(u32),
    Goal(String),
}

/// Raw user input that could not become a [`ConfigChange`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigChangeError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("'{0}' is not a positive whole number of minutes")]
    InvalidMinutes(String),
}

impl ConfigChange {
    /// Build a change from a field name and raw text, as typed into a view.
    ///
    /// Durations must parse as a whole number of at least one minute.
    pub fn parse(field: &str, raw: &str) -> Result<Self, ConfigChangeError> {
        match field {
            "work" | "work_duration" | "workDuration" => {
                parse_minutes(raw).map(ConfigChange::WorkDuration)
            }
            "break" | "break_duration" | "breakDuration" => {
                parse_minutes(raw).map(ConfigChange::BreakDuration)
            }
            "goal" => Ok(ConfigChange::Goal(raw.to_string())),
            other => Err(ConfigChangeError::UnknownField(other.to_string())),
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            ConfigChange::WorkDuration(_) => "work_duration",
            ConfigChange::BreakDuration(_) => "break_duration",
            ConfigChange::Goal(_) => "goal",
        }
    }
}

fn parse_minutes(raw: &str) -> Result<u32, ConfigChangeError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigChangeError::InvalidMinutes(raw.to_string())),
    }
}

/// Why a timer transition was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Start while an interval is running
    AlreadyRunning,
    /// Start from completed; use advance instead
    AwaitingAdvance,
    /// Pause or complete while nothing is running
    NotRunning,
    /// Advance outside the completed state
    NotCompleted,
    /// Configuration edits are only accepted while idle
    NotIdle,
    /// A duration below one minute
    InvalidValue,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::AlreadyRunning => "timer is already running",
            RejectReason::AwaitingAdvance => "interval completed; advance to continue",
            RejectReason::NotRunning => "timer is not running",
            RejectReason::NotCompleted => "no completed interval to advance from",
            RejectReason::NotIdle => "settings can only change while idle",
            RejectReason::InvalidValue => "durations must be at least one minute",
        }
    }
}

/// Toolbar-style indicator content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    /// Background color, `#RRGGBB`
    pub color: String,
}

/// Keyword blocking settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockingSettings {
    pub enabled: bool,
    pub sites: Vec<String>,
}

/// Result of checking a URL against the keyword list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlVerdict {
    pub url: String,
    pub blocked: bool,
    /// The first keyword that matched, as stored
    pub keyword: Option<String>,
}

/// Everything a freshly mounted view needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusStateSnapshot {
    pub api_version: u32,
    pub timer: TimerState,
    pub badge: Option<Badge>,
    pub blocking: BlockingSettings,
    pub audio_playing: bool,
}

/// Outcome of a timer command as seen by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimerReply {
    Applied { state: TimerState },
    Rejected { state: TimerState, reason: RejectReason },
}

impl TimerReply {
    pub fn state(&self) -> &TimerState {
        match self {
            TimerReply::Applied { state } | TimerReply::Rejected { state, .. } => state,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TimerReply::Applied { .. })
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub host_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_change_parses_minutes() {
        assert_eq!(
            ConfigChange::parse("workDuration", "20"),
            Ok(ConfigChange::WorkDuration(20))
        );
        assert_eq!(
            ConfigChange::parse("break", " 10 "),
            Ok(ConfigChange::BreakDuration(10))
        );
        assert_eq!(
            ConfigChange::parse("goal", "write report"),
            Ok(ConfigChange::Goal("write report".into()))
        );
    }

    #[test]
    fn config_change_rejects_bad_minutes() {
        assert!(matches!(
            ConfigChange::parse("work", "0"),
            Err(ConfigChangeError::InvalidMinutes(_))
        ));
        assert!(matches!(
            ConfigChange::parse("work", "abc"),
            Err(ConfigChangeError::InvalidMinutes(_))
        ));
        assert!(matches!(
            ConfigChange::parse("work", "-3"),
            Err(ConfigChangeError::InvalidMinutes(_))
        ));
        assert!(matches!(
            ConfigChange::parse("volume", "3"),
            Err(ConfigChangeError::UnknownField(_))
        ));
    }

    #[test]
    fn config_change_wire_shape() {
        let json = serde_json::to_value(ConfigChange::WorkDuration(20)).unwrap();
        assert_eq!(json["field"], "work_duration");
        assert_eq!(json["value"], 20);
    }
}
