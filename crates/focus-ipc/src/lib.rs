//! IPC layer for focusd
//!
//! Views talk to the daemon over a Unix domain socket using newline-delimited
//! JSON. Each line from a view is a [`focus_api::Request`]; the daemon answers
//! with one [`focus_api::Response`] per request and, once a view subscribes,
//! interleaves [`focus_api::Event`] lines.

mod client;
mod codec;
mod server;

pub use client::*;
pub use server::*;

use focus_api::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("server was not started")]
    NotStarted,

    #[error("reply for request {got} while waiting for {expected}")]
    RequestMismatch { expected: u64, got: u64 },

    #[error("focusd refused the command ({code:?}): {message}")]
    Daemon { code: ErrorCode, message: String },
}

pub type IpcResult<T> = Result<T, IpcError>;
