//! Protocol types for focusd IPC
//!
//! This crate defines the stable API between focusd and its views:
//! - The persisted timer state and its derived values
//! - Commands (requests from views) and responses
//! - Events (daemon -> views)
//! - History records
//! - Versioning

mod commands;
mod events;
mod history;
mod timer;
mod types;

pub use commands::*;
pub use events::*;
pub use history::*;
pub use timer::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
