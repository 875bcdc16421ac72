//! Host side-effect traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use focus_api::Badge;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::WindowHandle;

/// Wake fired when the running interval is due to end
pub const INTERVAL_END_WAKE: &str = "interval-end";

/// Periodic wake that refreshes the badge minutes
pub const BADGE_REFRESH_WAKE: &str = "badge-refresh";

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Schedule failed: {0}")]
    ScheduleFailed(String),

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Badge update failed: {0}")]
    BadgeFailed(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    /// The window behind a handle no longer exists
    #[error("Window not found")]
    WindowNotFound,

    #[error("Events already subscribed")]
    AlreadySubscribed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// When a named wake-timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSchedule {
    /// Once at the given instant; an instant in the past fires immediately
    At(DateTime<Utc>),

    /// Repeatedly with the given period, first firing one period from now
    Every(Duration),
}

/// A wake-timer fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeEvent {
    pub name: String,
    pub fired_at: DateTime<Utc>,
}

/// Named wake-timers that survive the driver being idle
#[async_trait]
pub trait WakeScheduler: Send + Sync {
    /// Install a wake-timer, replacing any existing one with the same name
    async fn schedule(&self, name: &str, schedule: WakeSchedule) -> HostResult<()>;

    /// Remove a wake-timer; clearing an unknown name is not an error
    async fn clear(&self, name: &str) -> HostResult<()>;

    /// Take the receiving end of fired wakes (once)
    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WakeEvent>>;

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Toolbar-style badge
#[async_trait]
pub trait Indicator: Send + Sync {
    async fn set_badge(&self, badge: &Badge) -> HostResult<()>;

    async fn clear_badge(&self) -> HostResult<()>;
}

/// A desktop notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// 0 (lowest) to 2 (highest)
    pub priority: u8,
}

/// Desktop notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> HostResult<()>;
}

/// Events about audio player windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window went away without the driver closing it
    Closed { handle: WindowHandle },
}

/// Audio player windows
#[async_trait]
pub trait AudioHost: Send + Sync {
    /// Open a new player window
    async fn open(&self) -> HostResult<WindowHandle>;

    /// Bring a window to the front; [`HostError::WindowNotFound`] if stale
    async fn focus(&self, handle: &WindowHandle) -> HostResult<()>;

    /// Close a window; [`HostError::WindowNotFound`] if already gone
    async fn close(&self, handle: &WindowHandle) -> HostResult<()>;

    /// Whether the window behind `handle` still exists
    async fn exists(&self, handle: &WindowHandle) -> bool;

    /// Take the receiving end of window events (once)
    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WindowEvent>>;
}
