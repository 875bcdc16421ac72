//! View-side copy of the daemon's state

use focus_api::{Badge, BlockingSettings, Event, EventPayload, FocusStateSnapshot, TimerState};
use tokio::sync::watch;

/// Connection to focusd as the view sees it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connection {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Last known daemon state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub connection: Connection,
    /// `None` until the first snapshot arrives
    pub timer: Option<TimerState>,
    pub badge: Option<Badge>,
    pub blocking: BlockingSettings,
    pub audio_playing: bool,
}

/// Shared state container
#[derive(Clone)]
pub struct SharedState {
    sender: watch::Sender<ViewState>,
    receiver: watch::Receiver<ViewState>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(ViewState::default());
        Self { sender, receiver }
    }

    pub fn get(&self) -> ViewState {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.receiver.clone()
    }

    fn update(&self, f: impl FnOnce(&mut ViewState)) {
        self.sender.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    pub fn set_connection(&self, connection: Connection) {
        self.update(|state| state.connection = connection);
    }

    pub fn apply_snapshot(&self, snapshot: FocusStateSnapshot) {
        self.update(|state| {
            state.connection = Connection::Connected;
            state.timer = Some(snapshot.timer);
            state.badge = snapshot.badge;
            state.blocking = snapshot.blocking;
            state.audio_playing = snapshot.audio_playing;
        });
    }

    pub fn set_timer(&self, timer: TimerState) {
        self.update(|state| state.timer = Some(timer));
    }

    /// Update state from a focusd event
    pub fn handle_event(&self, event: Event) {
        tracing::debug!(event = ?event.payload, "Received event from focusd");
        match event.payload {
            EventPayload::TimerStateChanged(timer) => self.set_timer(timer),
            EventPayload::BlockingChanged { enabled } => {
                self.update(|state| state.blocking.enabled = enabled)
            }
            EventPayload::BlockedSitesChanged { sites } => {
                self.update(|state| state.blocking.sites = sites)
            }
            EventPayload::BadgeChanged { badge } => self.update(|state| state.badge = badge),
            EventPayload::AudioStatusChanged { playing } => {
                self.update(|state| state.audio_playing = playing)
            }
            EventPayload::IntervalCompleted { .. } => {
                // Followed by timer_state_changed
            }
            EventPayload::Shutdown => self.set_connection(Connection::Disconnected),
        }
    }
}
