//! Stored keys and their defaults

use focus_api::TimerState;
use serde_json::Value;

/// Every key the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    BlockingEnabled,
    BlockedSites,
    TimerState,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [
        StoreKey::BlockingEnabled,
        StoreKey::BlockedSites,
        StoreKey::TimerState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::BlockingEnabled => "isBlockingEnabled",
            StoreKey::BlockedSites => "blockedSites",
            StoreKey::TimerState => "timerState",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// Value read back when the key has never been written
    pub fn default_value(self) -> Value {
        match self {
            StoreKey::BlockingEnabled => Value::Bool(true),
            StoreKey::BlockedSites => Value::Array(Vec::new()),
            StoreKey::TimerState => {
                serde_json::to_value(TimerState::default()).unwrap_or(Value::Null)
            }
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification sent after a key is written
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: StoreKey,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in StoreKey::ALL {
            assert_eq!(StoreKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(StoreKey::from_name("unknown"), None);
    }

    #[test]
    fn defaults() {
        assert_eq!(StoreKey::BlockingEnabled.default_value(), Value::Bool(true));
        assert_eq!(
            StoreKey::BlockedSites.default_value(),
            Value::Array(Vec::new())
        );
        let timer: TimerState =
            serde_json::from_value(StoreKey::TimerState.default_value()).unwrap();
        assert_eq!(timer, TimerState::default());
    }
}
