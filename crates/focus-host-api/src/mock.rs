//! Mock host for testing

use async_trait::async_trait;
use focus_api::Badge;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{
    AudioHost, HostError, HostResult, Indicator, Notification, Notifier, WakeEvent,
    WakeSchedule, WakeScheduler, WindowEvent, WindowHandle, WindowPayload,
};

/// Mock host implementing every host trait, recording calls for assertions
pub struct MockHost {
    wakes: Arc<Mutex<HashMap<String, WakeSchedule>>>,
    wake_tx: mpsc::UnboundedSender<WakeEvent>,
    wake_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<WakeEvent>>>>,

    badge: Arc<Mutex<Option<Badge>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,

    next_window_id: AtomicU64,
    open_windows: Arc<Mutex<HashSet<u64>>>,
    windows_opened: AtomicU64,
    window_tx: mpsc::UnboundedSender<WindowEvent>,
    window_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<WindowEvent>>>>,

    /// Configure wake scheduling to fail
    pub fail_schedule: Arc<Mutex<bool>>,

    /// Configure notifications to fail
    pub fail_notify: Arc<Mutex<bool>>,

    /// Configure badge updates to fail
    pub fail_badge: Arc<Mutex<bool>>,

    /// Configure opening a player window to fail
    pub fail_open: Arc<Mutex<bool>>,
}

impl MockHost {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let (window_tx, window_rx) = mpsc::unbounded_channel();

        Self {
            wakes: Arc::new(Mutex::new(HashMap::new())),
            wake_tx,
            wake_rx: Arc::new(Mutex::new(Some(wake_rx))),
            badge: Arc::new(Mutex::new(None)),
            notifications: Arc::new(Mutex::new(Vec::new())),
            next_window_id: AtomicU64::new(1),
            open_windows: Arc::new(Mutex::new(HashSet::new())),
            windows_opened: AtomicU64::new(0),
            window_tx,
            window_rx: Arc::new(Mutex::new(Some(window_rx))),
            fail_schedule: Arc::new(Mutex::new(false)),
            fail_notify: Arc::new(Mutex::new(false)),
            fail_badge: Arc::new(Mutex::new(false)),
            fail_open: Arc::new(Mutex::new(false)),
        }
    }

    /// Currently installed wake-timers by name
    pub fn active_wakes(&self) -> HashMap<String, WakeSchedule> {
        self.wakes.lock().unwrap().clone()
    }

    pub fn wake(&self, name: &str) -> Option<WakeSchedule> {
        self.wakes.lock().unwrap().get(name).copied()
    }

    /// Simulate a wake-timer firing
    pub fn fire_wake(&self, name: &str) {
        let _ = self.wake_tx.send(WakeEvent {
            name: name.to_string(),
            fired_at: focus_util::now(),
        });
    }

    /// The badge as last set, `None` if cleared
    pub fn badge(&self) -> Option<Badge> {
        self.badge.lock().unwrap().clone()
    }

    /// Every notification raised so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Number of player windows ever opened
    pub fn windows_opened(&self) -> u64 {
        self.windows_opened.load(Ordering::SeqCst)
    }

    pub fn is_window_open(&self, handle: &WindowHandle) -> bool {
        match handle.payload() {
            WindowPayload::Mock { id } => self.open_windows.lock().unwrap().contains(id),
            _ => false,
        }
    }

    /// Simulate the user closing a window, reporting it like a real host would
    pub fn simulate_window_closed(&self, handle: &WindowHandle) {
        self.forget_window(handle);
        let _ = self.window_tx.send(WindowEvent::Closed {
            handle: handle.clone(),
        });
    }

    /// Make a handle stale without any event, as when a close notification is lost
    pub fn forget_window(&self, handle: &WindowHandle) {
        if let WindowPayload::Mock { id } = handle.payload() {
            self.open_windows.lock().unwrap().remove(id);
        }
    }

    fn mock_id(handle: &WindowHandle) -> HostResult<u64> {
        match handle.payload() {
            WindowPayload::Mock { id } => Ok(*id),
            _ => Err(HostError::WindowNotFound),
        }
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeScheduler for MockHost {
    async fn schedule(&self, name: &str, schedule: WakeSchedule) -> HostResult<()> {
        if *self.fail_schedule.lock().unwrap() {
            return Err(HostError::ScheduleFailed("Mock schedule failure".into()));
        }

        self.wakes
            .lock()
            .unwrap()
            .insert(name.to_string(), schedule);
        Ok(())
    }

    async fn clear(&self, name: &str) -> HostResult<()> {
        self.wakes.lock().unwrap().remove(name);
        Ok(())
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WakeEvent>> {
        self.wake_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

#[async_trait]
impl Indicator for MockHost {
    async fn set_badge(&self, badge: &Badge) -> HostResult<()> {
        if *self.fail_badge.lock().unwrap() {
            return Err(HostError::BadgeFailed("Mock badge failure".into()));
        }

        *self.badge.lock().unwrap() = Some(badge.clone());
        Ok(())
    }

    async fn clear_badge(&self) -> HostResult<()> {
        if *self.fail_badge.lock().unwrap() {
            return Err(HostError::BadgeFailed("Mock badge failure".into()));
        }

        *self.badge.lock().unwrap() = None;
        Ok(())
    }
}

#[async_trait]
impl Notifier for MockHost {
    async fn notify(&self, notification: &Notification) -> HostResult<()> {
        if *self.fail_notify.lock().unwrap() {
            return Err(HostError::NotifyFailed("Mock notify failure".into()));
        }

        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[async_trait]
impl AudioHost for MockHost {
    async fn open(&self) -> HostResult<WindowHandle> {
        if *self.fail_open.lock().unwrap() {
            return Err(HostError::SpawnFailed("Mock open failure".into()));
        }

        let id = self.next_window_id.fetch_add(1, Ordering::SeqCst);
        self.open_windows.lock().unwrap().insert(id);
        self.windows_opened.fetch_add(1, Ordering::SeqCst);

        Ok(WindowHandle::new(WindowPayload::Mock { id }))
    }

    async fn focus(&self, handle: &WindowHandle) -> HostResult<()> {
        let id = Self::mock_id(handle)?;
        if self.open_windows.lock().unwrap().contains(&id) {
            Ok(())
        } else {
            Err(HostError::WindowNotFound)
        }
    }

    async fn close(&self, handle: &WindowHandle) -> HostResult<()> {
        let id = Self::mock_id(handle)?;
        if self.open_windows.lock().unwrap().remove(&id) {
            Ok(())
        } else {
            Err(HostError::WindowNotFound)
        }
    }

    async fn exists(&self, handle: &WindowHandle) -> bool {
        self.is_window_open(handle)
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WindowEvent>> {
        self.window_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn mock_wakes_replace_and_clear() {
        let host = MockHost::new();
        let every = WakeSchedule::Every(Duration::from_secs(60));

        host.schedule("badge-refresh", every).await.unwrap();
        host.schedule("badge-refresh", every).await.unwrap();
        assert_eq!(host.active_wakes().len(), 1);

        host.clear("badge-refresh").await.unwrap();
        host.clear("badge-refresh").await.unwrap();
        assert!(host.active_wakes().is_empty());
    }

    #[tokio::test]
    async fn mock_schedule_failure() {
        let host = MockHost::new();
        *host.fail_schedule.lock().unwrap() = true;

        let result = host
            .schedule("interval-end", WakeSchedule::At(focus_util::now()))
            .await;
        assert!(matches!(result, Err(HostError::ScheduleFailed(_))));
        assert!(host.active_wakes().is_empty());
    }

    #[tokio::test]
    async fn mock_window_lifecycle() {
        let host = MockHost::new();
        let mut events = AudioHost::subscribe(&host).unwrap();

        let handle = host.open().await.unwrap();
        assert!(host.exists(&handle).await);
        host.focus(&handle).await.unwrap();

        host.simulate_window_closed(&handle);
        assert!(!host.exists(&handle).await);
        assert!(matches!(
            host.focus(&handle).await,
            Err(HostError::WindowNotFound)
        ));
        assert_eq!(
            events.recv().await,
            Some(WindowEvent::Closed { handle })
        );
    }

    #[test]
    fn subscribe_only_once() {
        let host = MockHost::new();
        assert!(WakeScheduler::subscribe(&host).is_ok());
        assert!(matches!(
            WakeScheduler::subscribe(&host),
            Err(HostError::AlreadySubscribed)
        ));
    }
}
