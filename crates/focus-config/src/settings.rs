//! Validated settings structures

use crate::schema::{
    RawAudioConfig, RawBadgeConfig, RawBlockingConfig, RawConfig, RawDaemonConfig,
    RawNotification, RawNotifications, RawTimerConfig,
};
use focus_api::{Badge, Interval, DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES};
use std::path::PathBuf;
use std::time::Duration;

/// Priority used for every completion notification.
///
/// Hosts map 0 to low, 1 to normal and 2 or more to critical urgency.
pub const NOTIFICATION_PRIORITY: u8 = 2;

/// Placeholder in the player command line replaced by the player URL
pub const URL_PLACEHOLDER: &str = "{url}";

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub daemon: DaemonConfig,
    pub timer: TimerSettings,
    pub badge: BadgeSettings,
    pub notifications: NotificationSettings,
    pub audio: AudioSettings,
    pub blocking: BlockingDefaults,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            timer: TimerSettings::from_raw(raw.timer),
            badge: BadgeSettings::from_raw(raw.badge),
            notifications: NotificationSettings::from_raw(raw.notifications),
            audio: AudioSettings::from_raw(raw.audio),
            blocking: BlockingDefaults::from_raw(raw.blocking),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(focus_util::socket_path_without_env),
            data_dir: raw
                .data_dir
                .unwrap_or_else(focus_util::data_dir_without_env),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

/// Interval lengths used on first start, and the badge refresh period
#[derive(Debug, Clone)]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub badge_refresh: Duration,
}

impl TimerSettings {
    fn from_raw(raw: RawTimerConfig) -> Self {
        Self {
            work_minutes: raw.work_minutes.unwrap_or(DEFAULT_WORK_MINUTES),
            break_minutes: raw.break_minutes.unwrap_or(DEFAULT_BREAK_MINUTES),
            badge_refresh: Duration::from_secs(raw.badge_refresh_seconds.unwrap_or(60)),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from_raw(RawTimerConfig::default())
    }
}

/// Badge colors and the completed-interval text
#[derive(Debug, Clone)]
pub struct BadgeSettings {
    pub work_color: String,
    pub break_color: String,
    pub done_color: String,
    pub done_text: String,
}

impl BadgeSettings {
    fn from_raw(raw: RawBadgeConfig) -> Self {
        Self {
            work_color: raw.work_color.unwrap_or_else(|| "#EF4444".into()),
            break_color: raw.break_color.unwrap_or_else(|| "#3B82F6".into()),
            done_color: raw.done_color.unwrap_or_else(|| "#10B981".into()),
            done_text: raw.done_text.unwrap_or_else(|| "DONE".into()),
        }
    }

    pub fn color_for(&self, interval: Interval) -> &str {
        match interval {
            Interval::Work => &self.work_color,
            Interval::Break => &self.break_color,
        }
    }

    /// Badge for a running interval with `text` minutes left
    pub fn running(&self, interval: Interval, text: impl Into<String>) -> Badge {
        Badge {
            text: text.into(),
            color: self.color_for(interval).to_string(),
        }
    }

    pub fn done(&self) -> Badge {
        Badge {
            text: self.done_text.clone(),
            color: self.done_color.clone(),
        }
    }
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self::from_raw(RawBadgeConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationText {
    pub title: String,
    pub message: String,
}

/// Notification text keyed by the interval that just finished
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub work: NotificationText,
    pub break_: NotificationText,
}

impl NotificationSettings {
    fn from_raw(raw: RawNotifications) -> Self {
        Self {
            work: convert_notification(raw.work, "Focus session complete", "Time for a break!"),
            break_: convert_notification(raw.break_, "Break is over", "Ready to focus?"),
        }
    }

    pub fn for_finished(&self, interval: Interval) -> &NotificationText {
        match interval {
            Interval::Work => &self.work,
            Interval::Break => &self.break_,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self::from_raw(RawNotifications::default())
    }
}

fn convert_notification(
    raw: Option<RawNotification>,
    default_title: &str,
    default_message: &str,
) -> NotificationText {
    let raw = raw.unwrap_or_default();
    NotificationText {
        title: raw.title.unwrap_or_else(|| default_title.into()),
        message: raw.message.unwrap_or_else(|| default_message.into()),
    }
}

/// How to open the background audio player
#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub player: Vec<String>,
    pub url: String,
}

impl AudioSettings {
    fn from_raw(raw: RawAudioConfig) -> Self {
        Self {
            player: raw.player.unwrap_or_else(|| {
                vec![
                    "chromium".into(),
                    "--new-window".into(),
                    "--window-size=400,600".into(),
                    format!("--app={}", URL_PLACEHOLDER),
                ]
            }),
            url: raw.url.unwrap_or_else(|| "https://www.lofi.cafe/".into()),
        }
    }

    /// Player argv with the URL filled in; appended if there is no placeholder
    pub fn command_line(&self) -> Vec<String> {
        let mut argv: Vec<String> = self
            .player
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, &self.url))
            .collect();
        if !self.player.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            argv.push(self.url.clone());
        }
        argv
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from_raw(RawAudioConfig::default())
    }
}

/// Blocking settings written to the store on first start
#[derive(Debug, Clone)]
pub struct BlockingDefaults {
    pub enabled: bool,
    pub sites: Vec<String>,
}

impl BlockingDefaults {
    fn from_raw(raw: RawBlockingConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            sites: raw
                .sites
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }
}

impl Default for BlockingDefaults {
    fn default() -> Self {
        Self::from_raw(RawBlockingConfig::default())
    }
}
