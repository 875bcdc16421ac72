//! Linux host for focusd
//!
//! Provides:
//! - Named wake-timers on the tokio runtime
//! - Desktop notifications through `notify-send`
//! - The audio player as a child process in its own session, with exit
//!   observation

mod notify;
mod player;
mod process;
mod scheduler;

pub use notify::*;
pub use player::*;
pub use process::*;
pub use scheduler::*;
