//! History records kept by the daemon and served to views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Interval, RejectReason};

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEventType {
    DaemonStarted,

    DaemonStopped,

    IntervalStarted {
        interval: Interval,
        duration_min: u32,
        goal: String,
    },

    IntervalPaused {
        interval: Interval,
        remaining_secs: u64,
    },

    IntervalCompleted {
        interval: Interval,
        duration_min: u32,
        goal: String,
    },

    TimerReset,

    TimerConfigured {
        field: String,
        value: String,
    },

    /// A timer command that changed nothing
    CommandRejected {
        command: String,
        reason: RejectReason,
    },

    /// Wake-timers could not be installed; the start was not persisted
    ScheduleFailed {
        message: String,
    },

    BlockingToggled {
        enabled: bool,
    },

    BlockedSiteAdded {
        site: String,
    },

    BlockedSiteRemoved {
        site: String,
    },

    ClientConnected {
        client_id: String,
        uid: Option<u32>,
    },

    ClientDisconnected {
        client_id: String,
    },
}

/// A history record with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row id, assigned by the store
    pub id: i64,

    pub timestamp: DateTime<Utc>,

    pub event: HistoryEventType,
}

impl HistoryEntry {
    pub fn new(event: HistoryEventType) -> Self {
        Self {
            id: 0,
            timestamp: focus_util::now(),
            event,
        }
    }
}
