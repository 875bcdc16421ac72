//! Shared utilities for focusd
//!
//! This crate provides:
//! - Client identifiers for IPC connections
//! - The wall clock (with mock time in debug builds) and countdown formatting
//! - Default paths for socket, data, and config files

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
