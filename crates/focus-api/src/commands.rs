//! Requests and responses on the focusd socket

use focus_util::ClientId;
use serde::{Deserialize, Serialize};

use crate::{
    BlockingSettings, ConfigChange, FocusStateSnapshot, HealthStatus, HistoryEntry,
    Interval, TimerReply, UrlVerdict, API_VERSION,
};

/// One line sent by a view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Chosen by the client and echoed back in the matching [`Response`]
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// The daemon's answer to one [`Request`]
///
/// `request_id` is 0 when the line could not be parsed as a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    fn with_result(request_id: u64, result: ResponseResult) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result,
        }
    }

    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self::with_result(request_id, ResponseResult::Ok(payload))
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self::with_result(request_id, ResponseResult::Err(error))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// A failed command. Rejected timer transitions are not errors; they come
/// back as [`TimerReply::Rejected`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The line was not a valid request
    InvalidRequest,
    /// Wake-timers could not be installed; the timer was left unchanged
    ScheduleFailed,
    StoreError,
    HostError,
    InternalError,
}

/// All possible commands from views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get the full state snapshot
    GetState,

    /// Start a focus interval, or resume a paused one
    StartTimer,

    PauseTimer,

    ResetTimer,

    /// Start the next interval after a completed one
    AdvanceTimer {
        /// Defaults to the suggested continuation
        #[serde(default)]
        next: Option<Interval>,
    },

    /// Change a duration or the goal (idle only)
    ConfigureTimer { change: ConfigChange },

    /// Start receiving events on this connection
    SubscribeEvents,

    UnsubscribeEvents,

    SetBlockingEnabled { enabled: bool },

    AddBlockedSite { site: String },

    RemoveBlockedSite { site: String },

    /// Evaluate a URL against the keyword list
    CheckUrl { url: String },

    /// Open or focus the audio player window
    PlayAudio,

    StopAudio,

    GetAudioStatus,

    /// Most recent history entries, newest first
    GetHistory {
        #[serde(default = "default_history_limit")]
        limit: usize,
    },

    /// Liveness and readiness of the daemon and its host services
    GetHealth,

    Ping,
}

fn default_history_limit() -> usize {
    50
}

impl Command {
    /// Short name used in logs and history
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetState => "get_state",
            Command::StartTimer => "start_timer",
            Command::PauseTimer => "pause_timer",
            Command::ResetTimer => "reset_timer",
            Command::AdvanceTimer { .. } => "advance_timer",
            Command::ConfigureTimer { .. } => "configure_timer",
            Command::SubscribeEvents => "subscribe_events",
            Command::UnsubscribeEvents => "unsubscribe_events",
            Command::SetBlockingEnabled { .. } => "set_blocking_enabled",
            Command::AddBlockedSite { .. } => "add_blocked_site",
            Command::RemoveBlockedSite { .. } => "remove_blocked_site",
            Command::CheckUrl { .. } => "check_url",
            Command::PlayAudio => "play_audio",
            Command::StopAudio => "stop_audio",
            Command::GetAudioStatus => "get_audio_status",
            Command::GetHistory { .. } => "get_history",
            Command::GetHealth => "get_health",
            Command::Ping => "ping",
        }
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(FocusStateSnapshot),
    Timer(TimerReply),
    Blocking(BlockingSettings),
    UrlVerdict(UrlVerdict),
    AudioStatus { playing: bool },
    History { entries: Vec<HistoryEntry> },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// A connected view, as recorded by the socket server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    /// Peer credentials, when the socket exposes them
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new() -> Self {
        Self {
            client_id: ClientId::new(),
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimerState;

    #[test]
    fn commands_are_tagged_by_type() {
        let json = serde_json::to_value(Request::new(4, Command::CheckUrl {
            url: "https://news.example".into(),
        }))
        .unwrap();

        assert_eq!(json["request_id"], 4);
        assert_eq!(json["command"]["type"], "check_url");
        assert_eq!(json["command"]["url"], "https://news.example");
    }

    #[test]
    fn advance_target_is_optional_on_the_wire() {
        let json = r#"{"request_id":7,"api_version":1,"command":{"type":"advance_timer"}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed.command,
            Command::AdvanceTimer { next: None }
        ));

        let json = r#"{"request_id":8,"api_version":1,"command":{"type":"advance_timer","next":"work"}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed.command,
            Command::AdvanceTimer {
                next: Some(Interval::Work)
            }
        ));
    }

    #[test]
    fn history_limit_defaults() {
        let json = r#"{"type":"get_history"}"#;
        let parsed: Command = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed, Command::GetHistory { limit: 50 }));
    }

    #[test]
    fn timer_reply_survives_the_wire() {
        let line = serde_json::to_string(&Response::success(
            9,
            ResponsePayload::Timer(TimerReply::Applied {
                state: TimerState::default(),
            }),
        ))
        .unwrap();
        let parsed: Response = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed.request_id, 9);
        match parsed.result {
            ResponseResult::Ok(ResponsePayload::Timer(reply)) => assert!(reply.is_applied()),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
