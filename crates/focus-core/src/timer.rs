//! Timer engine
//!
//! [`transition`] is the only way a [`TimerState`] changes. It does no I/O
//! and reads no clock; callers pass `now` and persist the result.

use chrono::{DateTime, Duration, Utc};
use focus_api::{ConfigChange, Interval, RejectReason, TimerPhase, TimerState};

/// Everything that can happen to the timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Start a focus interval from idle, or resume a paused interval
    Start,
    Pause,
    Reset,
    /// The running interval reached its end
    Complete,
    /// Start the next interval after a completed one; `None` picks the
    /// suggested continuation
    Advance(Option<Interval>),
    Configure(ConfigChange),
}

impl TimerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Start => "start",
            TimerEvent::Pause => "pause",
            TimerEvent::Reset => "reset",
            TimerEvent::Complete => "complete",
            TimerEvent::Advance(_) => "advance",
            TimerEvent::Configure(_) => "configure",
        }
    }

    /// Whether applying this event begins a timed interval
    pub fn starts_interval(&self) -> bool {
        matches!(self, TimerEvent::Start | TimerEvent::Advance(_))
    }
}

/// Result of a transition. A rejection leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(TimerState),
    Rejected { reason: RejectReason },
}

impl TransitionOutcome {
    pub fn applied(self) -> Option<TimerState> {
        match self {
            TransitionOutcome::Applied(state) => Some(state),
            TransitionOutcome::Rejected { .. } => None,
        }
    }
}

fn rejected(reason: RejectReason) -> TransitionOutcome {
    TransitionOutcome::Rejected { reason }
}

/// Apply one event to a state at time `now`
pub fn transition(state: &TimerState, event: &TimerEvent, now: DateTime<Utc>) -> TransitionOutcome {
    match event {
        TimerEvent::Start => start(state, now),
        TimerEvent::Pause => pause(state, now),
        TimerEvent::Reset => TransitionOutcome::Applied(reset(state)),
        TimerEvent::Complete => complete(state),
        TimerEvent::Advance(target) => advance(state, *target, now),
        TimerEvent::Configure(change) => configure(state, change),
    }
}

fn start(state: &TimerState, now: DateTime<Utc>) -> TransitionOutcome {
    match &state.phase {
        TimerPhase::Idle { .. } => TransitionOutcome::Applied(TimerState {
            phase: TimerPhase::Running {
                interval: Interval::Work,
                start_time: now,
            },
            duration_min: state.work_duration_min,
            ..state.clone()
        }),
        TimerPhase::Paused {
            interval,
            remaining_secs,
        } => {
            // Back-date the start so the derived countdown resumes exactly
            // where it was frozen.
            let elapsed_secs = state.duration_secs().saturating_sub(*remaining_secs) as i64;
            TransitionOutcome::Applied(TimerState {
                phase: TimerPhase::Running {
                    interval: *interval,
                    start_time: now - Duration::seconds(elapsed_secs),
                },
                ..state.clone()
            })
        }
        TimerPhase::Running { .. } => rejected(RejectReason::AlreadyRunning),
        TimerPhase::Completed { .. } => rejected(RejectReason::AwaitingAdvance),
    }
}

fn pause(state: &TimerState, now: DateTime<Utc>) -> TransitionOutcome {
    match &state.phase {
        TimerPhase::Running { interval, .. } => TransitionOutcome::Applied(TimerState {
            phase: TimerPhase::Paused {
                interval: *interval,
                remaining_secs: state.display_remaining_secs(now),
            },
            ..state.clone()
        }),
        _ => rejected(RejectReason::NotRunning),
    }
}

fn reset(state: &TimerState) -> TimerState {
    TimerState {
        phase: TimerPhase::Idle {
            remaining_secs: u64::from(state.work_duration_min) * 60,
        },
        duration_min: state.work_duration_min,
        ..state.clone()
    }
}

fn complete(state: &TimerState) -> TransitionOutcome {
    match &state.phase {
        TimerPhase::Running { interval, .. } => TransitionOutcome::Applied(TimerState {
            phase: TimerPhase::Completed {
                previous: *interval,
            },
            ..state.clone()
        }),
        _ => rejected(RejectReason::NotRunning),
    }
}

fn advance(state: &TimerState, target: Option<Interval>, now: DateTime<Utc>) -> TransitionOutcome {
    let TimerPhase::Completed { previous } = &state.phase else {
        return rejected(RejectReason::NotCompleted);
    };

    let next = target.unwrap_or_else(|| previous.next());
    TransitionOutcome::Applied(TimerState {
        phase: TimerPhase::Running {
            interval: next,
            start_time: now,
        },
        duration_min: state.minutes_for(next),
        ..state.clone()
    })
}

fn configure(state: &TimerState, change: &ConfigChange) -> TransitionOutcome {
    if !matches!(state.phase, TimerPhase::Idle { .. }) {
        return rejected(RejectReason::NotIdle);
    }

    let mut next = state.clone();
    match change {
        ConfigChange::WorkDuration(minutes) => {
            if *minutes < 1 {
                return rejected(RejectReason::InvalidValue);
            }
            next.work_duration_min = *minutes;
            next.duration_min = *minutes;
            next.phase = TimerPhase::Idle {
                remaining_secs: u64::from(*minutes) * 60,
            };
        }
        ConfigChange::BreakDuration(minutes) => {
            if *minutes < 1 {
                return rejected(RejectReason::InvalidValue);
            }
            next.break_duration_min = *minutes;
        }
        ConfigChange::Goal(goal) => {
            next.goal = goal.clone();
        }
    }
    TransitionOutcome::Applied(next)
}
