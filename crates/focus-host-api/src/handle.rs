//! Audio window handle abstraction

use serde::{Deserialize, Serialize};

/// Opaque handle to an audio player window
///
/// A handle may go stale at any time when the user closes the window, so
/// holders must treat operations on it as fallible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowHandle {
    payload: WindowPayload,
}

impl WindowHandle {
    pub fn new(payload: WindowPayload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &WindowPayload {
        &self.payload
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            WindowPayload::Process { pid } => write!(f, "pid:{}", pid),
            WindowPayload::Mock { id } => write!(f, "mock:{}", id),
        }
    }
}

/// Platform-specific handle payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum WindowPayload {
    /// A player process
    Process { pid: u32 },

    /// Mock for testing
    Mock { id: u64 },
}

impl WindowPayload {
    /// Get the process ID if applicable
    pub fn pid(&self) -> Option<u32> {
        match self {
            WindowPayload::Process { pid } => Some(*pid),
            WindowPayload::Mock { .. } => None,
        }
    }
}
