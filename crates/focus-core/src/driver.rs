//! Scheduling driver
//!
//! The driver is the only component that installs wake-timers, touches the
//! badge, raises notifications or tracks the audio window. Every timer write
//! goes through it as a full replacement derived from a fresh read.

use chrono::{DateTime, Utc};
use focus_api::{
    Badge, BlockingSettings, ConfigChange, HistoryEntry, HistoryEventType, TimerPhase,
    TimerReply, TimerState, UrlVerdict,
};
use focus_config::{
    BadgeSettings, BlockingDefaults, NotificationSettings, Settings, TimerSettings,
    NOTIFICATION_PRIORITY,
};
use focus_host_api::{
    AudioHost, HostError, Indicator, Notification, Notifier, WakeSchedule, WakeScheduler,
    WindowHandle, BADGE_REFRESH_WAKE, INTERVAL_END_WAKE,
};
use focus_store::{Store, StoreError, StoreKey};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{blocking, transition, CoreEvent, TimerEvent, TransitionOutcome};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Driver errors
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Wake-timers could not be installed; the stored state was not changed
    #[error("Wake scheduling failed: {0}")]
    ScheduleFailed(HostError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// The host side-effects the driver may use
#[derive(Clone)]
pub struct HostServices {
    pub wakes: Arc<dyn WakeScheduler>,
    pub indicator: Arc<dyn Indicator>,
    pub notifier: Arc<dyn Notifier>,
    pub audio: Arc<dyn AudioHost>,
}

impl HostServices {
    /// Use one host for every service
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: WakeScheduler + Indicator + Notifier + AudioHost + 'static,
    {
        Self {
            wakes: host.clone(),
            indicator: host.clone(),
            notifier: host.clone(),
            audio: host,
        }
    }
}

/// The parts of [`Settings`] the driver uses
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub badge: BadgeSettings,
    pub notifications: NotificationSettings,
    pub badge_refresh: Duration,
}

impl DriverSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            badge: settings.badge.clone(),
            notifications: settings.notifications.clone(),
            badge_refresh: settings.timer.badge_refresh,
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Badge text for a running interval: whole minutes rounded up, `<1` for a
/// sub-second residue
pub fn running_badge_text(remaining_ms: i64) -> String {
    let secs = focus_util::floor_secs(remaining_ms);
    if secs == 0 && remaining_ms > 0 {
        "<1".to_string()
    } else {
        focus_util::ceil_minutes(secs).to_string()
    }
}

/// Owns the timer's side effects
pub struct SchedulingDriver {
    store: Arc<dyn Store>,
    host: HostServices,
    settings: DriverSettings,
    /// Player window opened by `play_audio`, if any
    audio_window: Option<WindowHandle>,
    /// Badge as last set, `None` when cleared
    badge: Option<Badge>,
    events: broadcast::Sender<CoreEvent>,
}

impl SchedulingDriver {
    pub fn new(store: Arc<dyn Store>, host: HostServices, settings: DriverSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            host,
            settings,
            audio_window: None,
            badge: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn timer_state(&self) -> DriverResult<TimerState> {
        Ok(self.store.timer_state()?)
    }

    pub fn badge(&self) -> Option<Badge> {
        self.badge.clone()
    }

    pub fn is_host_healthy(&self) -> bool {
        self.host.wakes.is_healthy()
    }

    /// Write configured defaults for keys that have never been stored.
    ///
    /// Returns whether this was a first start.
    pub fn seed_defaults(
        &self,
        timer: &TimerSettings,
        blocking: &BlockingDefaults,
    ) -> DriverResult<bool> {
        let first_start = self.store.get(StoreKey::TimerState)?.is_none();
        if first_start {
            let state = TimerState::idle(timer.work_minutes, timer.break_minutes);
            self.store.set_timer_state(&state)?;
            info!(
                work_minutes = timer.work_minutes,
                break_minutes = timer.break_minutes,
                "Seeded initial timer state"
            );
        }
        if self.store.get(StoreKey::BlockingEnabled)?.is_none() {
            self.store.set_blocking_enabled(blocking.enabled)?;
        }
        if self.store.get(StoreKey::BlockedSites)?.is_none() {
            self.store.set_blocked_sites(&blocking.sites)?;
        }
        Ok(first_start)
    }

    /// Bring wakes and badge in line with the stored state after a restart.
    ///
    /// An interval that ended while the daemon was down completes now. A
    /// running interval whose wakes cannot be reinstalled is paused with its
    /// remaining time, since nothing would ever complete it.
    pub async fn recover(&mut self, now: DateTime<Utc>) -> DriverResult<()> {
        let state = self.store.timer_state()?;
        if state.is_running()
            && !state.is_due(now)
            && let Err(e) = self.install_wakes(&state).await
        {
            warn!(error = %e, "Failed to reinstall wake-timers; pausing running interval");
            self.clear_wakes().await;
            self.record(HistoryEventType::ScheduleFailed {
                message: e.to_string(),
            });
            if let Some(paused) = transition(&state, &TimerEvent::Pause, now).applied() {
                self.store.set_timer_state(&paused)?;
                if let TimerPhase::Paused {
                    interval,
                    remaining_secs,
                } = &paused.phase
                {
                    self.record(HistoryEventType::IntervalPaused {
                        interval: *interval,
                        remaining_secs: *remaining_secs,
                    });
                }
            }
            self.hide_badge().await;
            return Err(DriverError::ScheduleFailed(e));
        }
        self.on_wake(now).await
    }

    /// Handle a fired wake-timer (or any moment the badge should be fresh)
    pub async fn on_wake(&mut self, now: DateTime<Utc>) -> DriverResult<()> {
        let state = self.store.timer_state()?;
        match &state.phase {
            TimerPhase::Running { interval, .. } => {
                if state.is_due(now) {
                    self.finish_interval(&state, now).await?;
                } else {
                    let text = running_badge_text(state.remaining_ms(now));
                    let badge = self.settings.badge.running(*interval, text);
                    self.show_badge(badge).await;
                }
            }
            TimerPhase::Completed { .. } => {
                let badge = self.settings.badge.done();
                self.show_badge(badge).await;
            }
            TimerPhase::Idle { .. } | TimerPhase::Paused { .. } => self.hide_badge().await,
        }
        Ok(())
    }

    /// Apply a timer command
    pub async fn on_command(
        &mut self,
        event: TimerEvent,
        now: DateTime<Utc>,
    ) -> DriverResult<TimerReply> {
        let mut state = self.store.timer_state()?;
        if state.is_due(now) {
            // The interval-end wake has not been handled yet
            self.finish_interval(&state, now).await?;
            state = self.store.timer_state()?;
        }

        let next = match transition(&state, &event, now) {
            TransitionOutcome::Applied(next) => next,
            TransitionOutcome::Rejected { reason } => {
                debug!(event = event.name(), reason = ?reason, "Timer command rejected");
                self.record(HistoryEventType::CommandRejected {
                    command: event.name().to_string(),
                    reason,
                });
                return Ok(TimerReply::Rejected { state, reason });
            }
        };

        match &event {
            TimerEvent::Start | TimerEvent::Advance(_) => {
                if let Err(e) = self.install_wakes(&next).await {
                    warn!(error = %e, "Failed to install wake-timers; timer left unchanged");
                    self.clear_wakes().await;
                    self.record(HistoryEventType::ScheduleFailed {
                        message: e.to_string(),
                    });
                    return Err(DriverError::ScheduleFailed(e));
                }
                if let Err(e) = self.store.set_timer_state(&next) {
                    self.clear_wakes().await;
                    return Err(e.into());
                }

                if let Some(interval) = next.active_interval() {
                    info!(
                        interval = %interval,
                        duration_min = next.duration_min,
                        resumed = matches!(state.phase, TimerPhase::Paused { .. }),
                        "Interval started"
                    );
                    self.record(HistoryEventType::IntervalStarted {
                        interval,
                        duration_min: next.duration_min,
                        goal: next.goal.clone(),
                    });
                }
                self.on_wake(now).await?;
            }
            TimerEvent::Pause => {
                self.store.set_timer_state(&next)?;
                self.clear_wakes().await;
                self.hide_badge().await;
                if let TimerPhase::Paused {
                    interval,
                    remaining_secs,
                } = &next.phase
                {
                    info!(interval = %interval, remaining_secs, "Interval paused");
                    self.record(HistoryEventType::IntervalPaused {
                        interval: *interval,
                        remaining_secs: *remaining_secs,
                    });
                }
            }
            TimerEvent::Reset => {
                self.store.set_timer_state(&next)?;
                self.clear_wakes().await;
                self.hide_badge().await;
                info!("Timer reset");
                self.record(HistoryEventType::TimerReset);
            }
            TimerEvent::Complete => {
                self.finish_interval(&state, now).await?;
            }
            TimerEvent::Configure(change) => {
                self.store.set_timer_state(&next)?;
                let value = match change {
                    ConfigChange::WorkDuration(n) | ConfigChange::BreakDuration(n) => n.to_string(),
                    ConfigChange::Goal(goal) => goal.clone(),
                };
                info!(field = change.field_name(), value = %value, "Timer configured");
                self.record(HistoryEventType::TimerConfigured {
                    field: change.field_name().to_string(),
                    value,
                });
            }
        }

        Ok(TimerReply::Applied { state: next })
    }

    async fn finish_interval(&mut self, state: &TimerState, now: DateTime<Utc>) -> DriverResult<()> {
        let Some(completed) = transition(state, &TimerEvent::Complete, now).applied() else {
            return Ok(());
        };
        let Some(interval) = completed.previous_status() else {
            return Ok(());
        };

        self.store.set_timer_state(&completed)?;
        self.clear_wakes().await;

        info!(
            interval = %interval,
            duration_min = completed.duration_min,
            "Interval completed"
        );

        let text = self.settings.notifications.for_finished(interval);
        let notification = Notification {
            title: text.title.clone(),
            message: text.message.clone(),
            priority: NOTIFICATION_PRIORITY,
        };
        if let Err(e) = self.host.notifier.notify(&notification).await {
            warn!(error = %e, "Failed to raise completion notification");
        }

        let badge = self.settings.badge.done();
        self.show_badge(badge).await;

        self.record(HistoryEventType::IntervalCompleted {
            interval,
            duration_min: completed.duration_min,
            goal: completed.goal.clone(),
        });
        let _ = self.events.send(CoreEvent::IntervalCompleted {
            interval,
            goal: completed.goal,
        });
        Ok(())
    }

    async fn install_wakes(&self, state: &TimerState) -> Result<(), HostError> {
        let Some(end) = state.end_time() else {
            return Ok(());
        };

        self.host
            .wakes
            .schedule(INTERVAL_END_WAKE, WakeSchedule::At(end))
            .await?;
        self.host
            .wakes
            .schedule(
                BADGE_REFRESH_WAKE,
                WakeSchedule::Every(self.settings.badge_refresh),
            )
            .await?;

        debug!(end = %end, "Wake-timers installed");
        Ok(())
    }

    async fn clear_wakes(&self) {
        for name in [INTERVAL_END_WAKE, BADGE_REFRESH_WAKE] {
            if let Err(e) = self.host.wakes.clear(name).await {
                warn!(wake = name, error = %e, "Failed to clear wake-timer");
            }
        }
    }

    async fn show_badge(&mut self, badge: Badge) {
        if let Err(e) = self.host.indicator.set_badge(&badge).await {
            warn!(error = %e, "Failed to set badge");
        }
        self.badge = Some(badge);
    }

    async fn hide_badge(&mut self) {
        if let Err(e) = self.host.indicator.clear_badge().await {
            warn!(error = %e, "Failed to clear badge");
        }
        self.badge = None;
    }

    fn record(&self, event: HistoryEventType) {
        if let Err(e) = self.store.append_history(HistoryEntry::new(event)) {
            warn!(error = %e, "Failed to append history entry");
        }
    }

    // Blocking settings

    pub fn blocking(&self) -> DriverResult<BlockingSettings> {
        Ok(BlockingSettings {
            enabled: self.store.blocking_enabled()?,
            sites: self.store.blocked_sites()?,
        })
    }

    pub fn set_blocking_enabled(&self, enabled: bool) -> DriverResult<BlockingSettings> {
        self.store.set_blocking_enabled(enabled)?;
        info!(enabled, "Blocking toggled");
        self.record(HistoryEventType::BlockingToggled { enabled });
        self.blocking()
    }

    /// Add a keyword; blank and duplicate keywords are ignored
    pub fn add_blocked_site(&self, site: &str) -> DriverResult<BlockingSettings> {
        let sites = self.store.blocked_sites()?;
        match blocking::with_keyword(&sites, site) {
            Some(next) => {
                self.store.set_blocked_sites(&next)?;
                let site = site.trim().to_string();
                info!(site = %site, "Blocked site added");
                self.record(HistoryEventType::BlockedSiteAdded { site });
            }
            None => debug!(site = %site, "Ignoring blank or duplicate keyword"),
        }
        self.blocking()
    }

    pub fn remove_blocked_site(&self, site: &str) -> DriverResult<BlockingSettings> {
        let sites = self.store.blocked_sites()?;
        if let Some(next) = blocking::without_keyword(&sites, site) {
            self.store.set_blocked_sites(&next)?;
            info!(site = %site, "Blocked site removed");
            self.record(HistoryEventType::BlockedSiteRemoved {
                site: site.to_string(),
            });
        }
        self.blocking()
    }

    pub fn check_url(&self, url: &str) -> DriverResult<UrlVerdict> {
        let settings = self.blocking()?;
        Ok(blocking::check_url(url, &settings.sites, settings.enabled))
    }

    // Audio window

    /// Whether a player window is believed to be open
    pub fn audio_playing(&self) -> bool {
        self.audio_window.is_some()
    }

    /// Focus the player window, opening a new one if there is none or the
    /// old handle went stale
    pub async fn play_audio(&mut self) -> DriverResult<bool> {
        if let Some(handle) = &self.audio_window {
            match self.host.audio.focus(handle).await {
                Ok(()) => {
                    debug!(window = %handle, "Audio window focused");
                    return Ok(true);
                }
                Err(e) => {
                    debug!(window = %handle, error = %e, "Audio window gone, reopening");
                    self.audio_window = None;
                }
            }
        }

        let handle = self.host.audio.open().await?;
        info!(window = %handle, "Audio window opened");
        self.audio_window = Some(handle);
        let _ = self
            .events
            .send(CoreEvent::AudioStatusChanged { playing: true });
        Ok(true)
    }

    /// Close the player window; a window that is already gone is fine
    pub async fn stop_audio(&mut self) -> DriverResult<bool> {
        if let Some(handle) = self.audio_window.take() {
            match self.host.audio.close(&handle).await {
                Ok(()) => info!(window = %handle, "Audio window closed"),
                Err(e) => debug!(window = %handle, error = %e, "Audio window already closed"),
            }
            let _ = self
                .events
                .send(CoreEvent::AudioStatusChanged { playing: false });
        }
        Ok(false)
    }

    /// Probe the player window, forgetting a stale handle
    pub async fn audio_status(&mut self) -> bool {
        let Some(handle) = &self.audio_window else {
            return false;
        };

        if self.host.audio.exists(handle).await {
            true
        } else {
            debug!(window = %handle, "Forgetting stale audio window");
            self.audio_window = None;
            false
        }
    }

    /// The host reported a window closing. Returns whether it was ours.
    pub fn on_window_closed(&mut self, handle: &WindowHandle) -> bool {
        if self.audio_window.as_ref() != Some(handle) {
            return false;
        }

        info!(window = %handle, "Audio window closed by user");
        self.audio_window = None;
        let _ = self
            .events
            .send(CoreEvent::AudioStatusChanged { playing: false });
        true
    }
}
