//! Named wake-timers on the tokio runtime

use async_trait::async_trait;
use focus_host_api::{HostError, HostResult, WakeEvent, WakeScheduler, WakeSchedule};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Wake-timers backed by tokio tasks, one per name
pub struct TokioWakeScheduler {
    timers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    event_tx: mpsc::UnboundedSender<WakeEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<WakeEvent>>>>,
}

impl TokioWakeScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Names of timers that are still pending or repeating
    pub fn active(&self) -> Vec<String> {
        match self.timers.lock() {
            Ok(timers) => timers
                .iter()
                .filter(|(_, task)| !task.is_finished())
                .map(|(name, _)| name.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn fire(tx: &mpsc::UnboundedSender<WakeEvent>, name: &str) -> bool {
        debug!(name = %name, "Wake fired");
        tx.send(WakeEvent {
            name: name.to_string(),
            fired_at: focus_util::now(),
        })
        .is_ok()
    }
}

impl Default for TokioWakeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TokioWakeScheduler {
    fn drop(&mut self) {
        if let Ok(timers) = self.timers.lock() {
            for task in timers.values() {
                task.abort();
            }
        }
    }
}

#[async_trait]
impl WakeScheduler for TokioWakeScheduler {
    async fn schedule(&self, name: &str, schedule: WakeSchedule) -> HostResult<()> {
        let tx = self.event_tx.clone();
        let task_name = name.to_string();

        let task = match schedule {
            WakeSchedule::At(at) => {
                // Past instants fire immediately
                let delay = (at - focus_util::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    Self::fire(&tx, &task_name);
                })
            }
            WakeSchedule::Every(period) => {
                if period.is_zero() {
                    return Err(HostError::ScheduleFailed(format!(
                        "{}: period must be positive",
                        name
                    )));
                }
                tokio::spawn(async move {
                    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticks.tick().await;
                        if !Self::fire(&tx, &task_name) {
                            break;
                        }
                    }
                })
            }
        };

        let mut timers = match self.timers.lock() {
            Ok(timers) => timers,
            Err(_) => {
                task.abort();
                return Err(HostError::Internal("wake-timer table poisoned".into()));
            }
        };
        if let Some(previous) = timers.insert(name.to_string(), task) {
            previous.abort();
        }

        info!(name = %name, schedule = ?schedule, "Wake-timer installed");
        Ok(())
    }

    async fn clear(&self, name: &str) -> HostResult<()> {
        let mut timers = self
            .timers
            .lock()
            .map_err(|_| HostError::Internal("wake-timer table poisoned".into()))?;
        if let Some(task) = timers.remove(name) {
            task.abort();
            debug!(name = %name, "Wake-timer cleared");
        }
        Ok(())
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WakeEvent>> {
        self.event_rx
            .lock()
            .map_err(|_| HostError::Internal("wake receiver poisoned".into()))?
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }

    fn is_healthy(&self) -> bool {
        !self.event_tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use focus_host_api::{BADGE_REFRESH_WAKE, INTERVAL_END_WAKE};

    #[tokio::test(start_paused = true)]
    async fn at_fires_once_at_the_instant() {
        let scheduler = TokioWakeScheduler::new();
        let mut rx = scheduler.subscribe().unwrap();

        let at = focus_util::now() + ChronoDuration::milliseconds(50);
        scheduler
            .schedule(INTERVAL_END_WAKE, WakeSchedule::At(at))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, INTERVAL_END_WAKE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn poisoned_table_does_not_leave_a_running_timer() {
        let scheduler = TokioWakeScheduler::new();
        let mut rx = scheduler.subscribe().unwrap();

        let timers = scheduler.timers.clone();
        let _ = std::thread::spawn(move || {
            let _guard = timers.lock().unwrap();
            panic!("poison the wake-timer table");
        })
        .join();

        let result = scheduler
            .schedule(
                BADGE_REFRESH_WAKE,
                WakeSchedule::Every(Duration::from_millis(10)),
            )
            .await;
        assert!(matches!(result, Err(HostError::Internal(_))));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn past_instant_fires_immediately() {
        let scheduler = TokioWakeScheduler::new();
        let mut rx = scheduler.subscribe().unwrap();

        let at = focus_util::now() - ChronoDuration::minutes(5);
        scheduler
            .schedule(INTERVAL_END_WAKE, WakeSchedule::At(at))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name, INTERVAL_END_WAKE);
    }

    #[tokio::test(start_paused = true)]
    async fn every_repeats_until_cleared() {
        let scheduler = TokioWakeScheduler::new();
        let mut rx = scheduler.subscribe().unwrap();

        scheduler
            .schedule(BADGE_REFRESH_WAKE, WakeSchedule::Every(Duration::from_secs(60)))
            .await
            .unwrap();

        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.name, BADGE_REFRESH_WAKE);
        }

        scheduler.clear(BADGE_REFRESH_WAKE).await.unwrap();
        assert!(scheduler.active().is_empty());
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_timer() {
        let scheduler = TokioWakeScheduler::new();
        let mut rx = scheduler.subscribe().unwrap();

        let soon = focus_util::now() + ChronoDuration::seconds(10);
        let later = focus_util::now() + ChronoDuration::seconds(20);
        scheduler
            .schedule(INTERVAL_END_WAKE, WakeSchedule::At(soon))
            .await
            .unwrap();
        scheduler
            .schedule(INTERVAL_END_WAKE, WakeSchedule::At(later))
            .await
            .unwrap();
        assert_eq!(scheduler.active(), vec![INTERVAL_END_WAKE.to_string()]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn zero_period_is_rejected() {
        let scheduler = TokioWakeScheduler::new();
        let result = scheduler
            .schedule(BADGE_REFRESH_WAKE, WakeSchedule::Every(Duration::ZERO))
            .await;
        assert!(matches!(result, Err(HostError::ScheduleFailed(_))));
        assert!(scheduler.active().is_empty());
    }

    #[tokio::test]
    async fn clearing_unknown_name_is_ok() {
        let scheduler = TokioWakeScheduler::new();
        scheduler.clear("nothing").await.unwrap();
    }

    #[test]
    fn subscribe_only_once() {
        let scheduler = TokioWakeScheduler::new();
        assert!(scheduler.subscribe().is_ok());
        assert!(matches!(
            scheduler.subscribe(),
            Err(HostError::AlreadySubscribed)
        ));
    }
}
