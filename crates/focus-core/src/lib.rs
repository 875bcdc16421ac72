//! Timer state machine and scheduling driver for focusd
//!
//! This crate is the heart of focusd, containing:
//! - The timer engine (Idle -> Running -> Paused/Completed), pure and clock-injected
//! - The scheduling driver that owns wake-timers, badge, notifications and the
//!   audio window
//! - The keyword predicate used to block page loads

mod blocking;
mod driver;
mod events;
mod timer;

pub use blocking::*;
pub use driver::*;
pub use events::*;
pub use timer::*;
