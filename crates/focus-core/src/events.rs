//! Events emitted by the scheduling driver

use focus_api::Interval;

/// Driver events for the daemon to forward to views
///
/// Timer and blocking changes are not listed here; they reach views through
/// the store's change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// An interval ran to its end and was marked completed
    IntervalCompleted { interval: Interval, goal: String },

    /// The audio player window appeared or went away
    AudioStatusChanged { playing: bool },
}
