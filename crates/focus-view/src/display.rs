//! What a view shows for a timer state at a given instant

use chrono::{DateTime, Utc};
use focus_api::{Command, Interval, TimerState, TimerStatus};

pub const WORK_COLOR: &str = "#ef4444";
pub const BREAK_COLOR: &str = "#3b82f6";
pub const DONE_COLOR: &str = "#10b981";

/// Which view is rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Full controls, `MM:SS`
    Popup,
    /// Floating on-page countdown, `M:SS`, hidden while idle
    Overlay,
}

/// A button a view may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartFocus,
    Resume,
    Pause,
    Reset,
    /// Start the break that follows a finished focus interval
    StartBreak { minutes: u32 },
    /// Start focusing again after a finished break
    StartNextFocus { minutes: u32 },
    /// Close the overlay, resetting the timer
    Dismiss,
}

impl Action {
    pub fn label(&self, kind: ViewKind) -> String {
        match (self, kind) {
            (Action::StartFocus, _) => "Start Focus".into(),
            (Action::Resume, _) => "Resume".into(),
            (Action::Pause, _) => "Pause".into(),
            (Action::Reset, _) => "Reset".into(),
            (Action::StartBreak { minutes }, ViewKind::Popup) => {
                format!("Start Break ({}m)", minutes)
            }
            (Action::StartNextFocus { minutes }, ViewKind::Popup) => {
                format!("Start Focus ({}m)", minutes)
            }
            (Action::StartBreak { .. }, ViewKind::Overlay) => "Break".into(),
            (Action::StartNextFocus { .. }, ViewKind::Overlay) => "Focus".into(),
            (Action::Dismiss, _) => "Dismiss".into(),
        }
    }

    /// The daemon command behind the button
    pub fn command(&self) -> Command {
        match self {
            Action::StartFocus | Action::Resume => Command::StartTimer,
            Action::Pause => Command::PauseTimer,
            Action::Reset | Action::Dismiss => Command::ResetTimer,
            Action::StartBreak { .. } => Command::AdvanceTimer {
                next: Some(Interval::Break),
            },
            Action::StartNextFocus { .. } => Command::AdvanceTimer {
                next: Some(Interval::Work),
            },
        }
    }
}

/// Everything a view draws
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownDisplay {
    pub visible: bool,
    pub time_text: String,
    /// Upper-case status, e.g. `WORK`
    pub status_label: String,
    pub goal: Option<String>,
    pub actions: Vec<Action>,
    /// Goal and durations may be edited (idle only)
    pub editable: bool,
    /// Fraction of the interval left, 1.0 when completed
    pub progress: f64,
    pub color: &'static str,
}

fn color_for(status: TimerStatus) -> &'static str {
    match status {
        TimerStatus::Work => WORK_COLOR,
        TimerStatus::Completed => DONE_COLOR,
        _ => BREAK_COLOR,
    }
}

fn progress(state: &TimerState, remaining_secs: u64) -> f64 {
    if state.status() == TimerStatus::Completed {
        return 1.0;
    }
    let total = state.duration_secs();
    if total == 0 {
        return 0.0;
    }
    (remaining_secs as f64 / total as f64).clamp(0.0, 1.0)
}

fn actions(state: &TimerState, kind: ViewKind) -> Vec<Action> {
    let mut actions = Vec::new();
    match state.status() {
        TimerStatus::Work | TimerStatus::Break => actions.push(Action::Pause),
        TimerStatus::Completed => match state.previous_status() {
            Some(Interval::Work) => actions.push(Action::StartBreak {
                minutes: state.break_duration_min,
            }),
            _ => actions.push(Action::StartNextFocus {
                minutes: state.work_duration_min,
            }),
        },
        TimerStatus::Paused => actions.push(Action::Resume),
        TimerStatus::Idle => actions.push(Action::StartFocus),
    }

    match kind {
        ViewKind::Popup if state.status() != TimerStatus::Completed => actions.push(Action::Reset),
        ViewKind::Overlay if state.status() == TimerStatus::Completed => {
            actions.push(Action::Dismiss)
        }
        _ => {}
    }
    actions
}

/// Derive the display for `state` at `now`
pub fn render(kind: ViewKind, state: &TimerState, now: DateTime<Utc>) -> CountdownDisplay {
    let status = state.status();
    let remaining = state.display_remaining_secs(now);

    let time_text = match kind {
        ViewKind::Popup => focus_util::format_countdown(remaining, true),
        ViewKind::Overlay if status == TimerStatus::Completed => "Done".to_string(),
        ViewKind::Overlay => focus_util::format_countdown(remaining, false),
    };

    CountdownDisplay {
        visible: kind == ViewKind::Popup || status != TimerStatus::Idle,
        time_text,
        status_label: status.as_str().to_uppercase(),
        goal: (!state.goal.is_empty()).then(|| state.goal.clone()),
        actions: actions(state, kind),
        editable: status == TimerStatus::Idle,
        progress: progress(state, remaining),
        color: color_for(status),
    }
}
