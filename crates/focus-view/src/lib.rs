//! Views for focusd
//!
//! A view (the popup or an on-page overlay) never owns timer state. It reads
//! the daemon's `TimerState` once on mount, follows `timer_state_changed`
//! events, polls as a fallback and re-derives its countdown every second
//! from the start time. Every trigger funnels into one idempotent refresh.

mod display;
mod state;
mod sync;

pub use display::*;
pub use state::*;
pub use sync::*;
