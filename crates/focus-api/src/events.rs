//! Event types for focusd -> view streaming

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Badge, Interval, TimerState, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: focus_util::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// The stored timer record was replaced
    TimerStateChanged(TimerState),

    BlockingChanged {
        enabled: bool,
    },

    BlockedSitesChanged {
        sites: Vec<String>,
    },

    /// `None` when the badge was cleared
    BadgeChanged {
        badge: Option<Badge>,
    },

    /// An interval ran to its end
    IntervalCompleted {
        interval: Interval,
        goal: String,
    },

    AudioStatusChanged {
        playing: bool,
    },

    /// Daemon is shutting down
    Shutdown,
}
