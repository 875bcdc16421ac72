//! Timer data model shared by the daemon and its views
//!
//! The phase is a tagged enum so a running interval always carries its start
//! time and a stopped one never does. The flat accessors on [`TimerState`]
//! give the status/start/remaining view that displays work with.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default focus interval length in minutes
pub const DEFAULT_WORK_MINUTES: u32 = 35;

/// Default break interval length in minutes
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// The two kinds of timed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Work,
    Break,
}

impl Interval {
    /// The interval that normally follows this one
    pub fn next(self) -> Self {
        match self {
            Interval::Work => Interval::Break,
            Interval::Break => Interval::Work,
        }
    }

    pub fn status(self) -> TimerStatus {
        match self {
            Interval::Work => TimerStatus::Work,
            Interval::Break => TimerStatus::Break,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Work => "work",
            Interval::Break => "break",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "focus" => Ok(Interval::Work),
            "break" => Ok(Interval::Break),
            other => Err(format!("unknown interval '{}'", other)),
        }
    }
}

/// Flat status as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Work,
    Break,
    Paused,
    Completed,
}

impl TimerStatus {
    pub fn is_running(self) -> bool {
        matches!(self, TimerStatus::Work | TimerStatus::Break)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Work => "work",
            TimerStatus::Break => "break",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the timer is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimerPhase {
    Idle {
        remaining_secs: u64,
    },
    Running {
        interval: Interval,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        start_time: DateTime<Utc>,
    },
    Paused {
        interval: Interval,
        remaining_secs: u64,
    },
    Completed {
        previous: Interval,
    },
}

/// The single persisted timer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: TimerPhase,
    /// Minutes of the currently active interval
    pub duration_min: u32,
    #[serde(default)]
    pub goal: String,
    pub work_duration_min: u32,
    pub break_duration_min: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(DEFAULT_WORK_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

impl TimerState {
    /// A fresh idle timer with the given interval lengths
    pub fn idle(work_duration_min: u32, break_duration_min: u32) -> Self {
        Self {
            phase: TimerPhase::Idle {
                remaining_secs: u64::from(work_duration_min) * 60,
            },
            duration_min: work_duration_min,
            goal: String::new(),
            work_duration_min,
            break_duration_min,
        }
    }

    pub fn status(&self) -> TimerStatus {
        match &self.phase {
            TimerPhase::Idle { .. } => TimerStatus::Idle,
            TimerPhase::Running { interval, .. } => interval.status(),
            TimerPhase::Paused { .. } => TimerStatus::Paused,
            TimerPhase::Completed { .. } => TimerStatus::Completed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    /// Start of the running interval; `None` unless running
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            TimerPhase::Running { start_time, .. } => Some(*start_time),
            _ => None,
        }
    }

    /// Stored remaining seconds; `None` while running, where the value is
    /// derived from the start time instead
    pub fn remaining_time(&self) -> Option<u64> {
        match &self.phase {
            TimerPhase::Idle { remaining_secs } | TimerPhase::Paused { remaining_secs, .. } => {
                Some(*remaining_secs)
            }
            TimerPhase::Completed { .. } => Some(0),
            TimerPhase::Running { .. } => None,
        }
    }

    /// The interval that just finished; only set when completed
    pub fn previous_status(&self) -> Option<Interval> {
        match &self.phase {
            TimerPhase::Completed { previous } => Some(*previous),
            _ => None,
        }
    }

    /// The interval in progress, running or paused
    pub fn active_interval(&self) -> Option<Interval> {
        match &self.phase {
            TimerPhase::Running { interval, .. } | TimerPhase::Paused { interval, .. } => {
                Some(*interval)
            }
            _ => None,
        }
    }

    /// What `Advance` starts when no target is given
    pub fn suggested_next(&self) -> Option<Interval> {
        self.previous_status().map(Interval::next)
    }

    /// Configured length of an interval in minutes
    pub fn minutes_for(&self, interval: Interval) -> u32 {
        match interval {
            Interval::Work => self.work_duration_min,
            Interval::Break => self.break_duration_min,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_min) * 60
    }

    /// When the running interval is due to end
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.start_time()
            .map(|start| start + Duration::minutes(i64::from(self.duration_min)))
    }

    /// Milliseconds left at `now`. Negative once a running interval overruns.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        match &self.phase {
            TimerPhase::Running { start_time, .. } => {
                let total_ms = i64::from(self.duration_min) * 60 * 1000;
                total_ms - (now - *start_time).num_milliseconds()
            }
            TimerPhase::Idle { remaining_secs } | TimerPhase::Paused { remaining_secs, .. } => {
                (*remaining_secs as i64).saturating_mul(1000)
            }
            TimerPhase::Completed { .. } => 0,
        }
    }

    /// Whole seconds to display at `now`
    pub fn display_remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        focus_util::floor_secs(self.remaining_ms(now))
    }

    /// Running and past its end
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && self.remaining_ms(now) <= 0
    }
}
