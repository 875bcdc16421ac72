//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    #[serde(default)]
    pub timer: RawTimerConfig,

    #[serde(default)]
    pub badge: RawBadgeConfig,

    #[serde(default)]
    pub notifications: RawNotifications,

    #[serde(default)]
    pub audio: RawAudioConfig,

    /// Blocking settings seeded into the store on first start
    #[serde(default)]
    pub blocking: RawBlockingConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for store
    pub data_dir: Option<PathBuf>,
}

/// Interval lengths and wake cadence
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTimerConfig {
    /// Focus interval length used on first start
    pub work_minutes: Option<u32>,

    /// Break interval length used on first start
    pub break_minutes: Option<u32>,

    /// Period of the badge refresh wake
    pub badge_refresh_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBadgeConfig {
    pub work_color: Option<String>,
    pub break_color: Option<String>,
    pub done_color: Option<String>,
    pub done_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotifications {
    /// Raised when a focus interval finishes
    pub work: Option<RawNotification>,

    /// Raised when a break finishes
    #[serde(rename = "break")]
    pub break_: Option<RawNotification>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotification {
    pub title: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAudioConfig {
    /// Player command line; `{url}` is replaced by the player URL
    pub player: Option<Vec<String>>,

    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBlockingConfig {
    pub enabled: Option<bool>,

    #[serde(default)]
    pub sites: Vec<String>,
}
