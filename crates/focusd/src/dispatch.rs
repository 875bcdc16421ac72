//! Command handling

use chrono::{DateTime, Utc};
use focus_api::{
    Command, ErrorCode, ErrorInfo, FocusStateSnapshot, HealthStatus, Response, ResponsePayload,
    API_VERSION,
};
use focus_core::{DriverError, DriverResult, SchedulingDriver, TimerEvent};
use focus_store::Store;
use focus_util::ClientId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Largest history page served in one response
const MAX_HISTORY_LIMIT: usize = 500;

async fn apply_timer(
    driver: &Mutex<SchedulingDriver>,
    event: TimerEvent,
    now: DateTime<Utc>,
) -> DriverResult<ResponsePayload> {
    let mut driver = driver.lock().await;
    driver.on_command(event, now).await.map(ResponsePayload::Timer)
}

fn driver_error(request_id: u64, command: &str, e: DriverError) -> Response {
    let code = match &e {
        DriverError::Store(_) => ErrorCode::StoreError,
        DriverError::ScheduleFailed(_) => ErrorCode::ScheduleFailed,
        DriverError::Host(_) => ErrorCode::HostError,
    };
    warn!(command, error = %e, "Command failed");
    Response::error(request_id, ErrorInfo::new(code, e.to_string()))
}

pub fn snapshot(driver: &SchedulingDriver) -> DriverResult<FocusStateSnapshot> {
    Ok(FocusStateSnapshot {
        api_version: API_VERSION,
        timer: driver.timer_state()?,
        badge: driver.badge(),
        blocking: driver.blocking()?,
        audio_playing: driver.audio_playing(),
    })
}

pub async fn handle_command(
    driver: &Arc<Mutex<SchedulingDriver>>,
    store: &Arc<dyn Store>,
    client_id: &ClientId,
    request_id: u64,
    command: Command,
) -> Response {
    let now = focus_util::now();
    let name = command.name();
    debug!(client_id = %client_id, command = name, "Handling command");

    let result = match command {
        Command::GetState => {
            let driver = driver.lock().await;
            snapshot(&driver).map(ResponsePayload::State)
        }

        Command::StartTimer => apply_timer(driver, TimerEvent::Start, now).await,
        Command::PauseTimer => apply_timer(driver, TimerEvent::Pause, now).await,
        Command::ResetTimer => apply_timer(driver, TimerEvent::Reset, now).await,
        Command::AdvanceTimer { next } => {
            apply_timer(driver, TimerEvent::Advance(next), now).await
        }
        Command::ConfigureTimer { change } => {
            apply_timer(driver, TimerEvent::Configure(change), now).await
        }

        Command::SubscribeEvents => Ok(ResponsePayload::Subscribed {
            client_id: client_id.clone(),
        }),

        Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

        Command::SetBlockingEnabled { enabled } => driver
            .lock()
            .await
            .set_blocking_enabled(enabled)
            .map(ResponsePayload::Blocking),

        Command::AddBlockedSite { site } => driver
            .lock()
            .await
            .add_blocked_site(&site)
            .map(ResponsePayload::Blocking),

        Command::RemoveBlockedSite { site } => driver
            .lock()
            .await
            .remove_blocked_site(&site)
            .map(ResponsePayload::Blocking),

        Command::CheckUrl { url } => driver
            .lock()
            .await
            .check_url(&url)
            .map(ResponsePayload::UrlVerdict),

        Command::PlayAudio => driver
            .lock()
            .await
            .play_audio()
            .await
            .map(|playing| ResponsePayload::AudioStatus { playing }),

        Command::StopAudio => driver
            .lock()
            .await
            .stop_audio()
            .await
            .map(|playing| ResponsePayload::AudioStatus { playing }),

        Command::GetAudioStatus => {
            let playing = driver.lock().await.audio_status().await;
            Ok(ResponsePayload::AudioStatus { playing })
        }

        Command::GetHistory { limit } => store
            .recent_history(limit.min(MAX_HISTORY_LIMIT))
            .map(|entries| ResponsePayload::History { entries })
            .map_err(DriverError::from),

        Command::GetHealth => {
            let driver = driver.lock().await;
            Ok(ResponsePayload::Health(HealthStatus {
                live: true,
                ready: true,
                store_ok: store.is_healthy(),
                host_ok: driver.is_host_healthy(),
            }))
        }

        Command::Ping => Ok(ResponsePayload::Pong),
    };

    match result {
        Ok(payload) => Response::success(request_id, payload),
        Err(e) => driver_error(request_id, name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::{ConfigChange, RejectReason, ResponseResult, TimerReply, TimerStatus};
    use focus_core::{DriverSettings, HostServices};
    use focus_host_api::MockHost;
    use focus_store::SqliteStore;

    fn setup() -> (Arc<Mutex<SchedulingDriver>>, Arc<dyn Store>, Arc<MockHost>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let host = Arc::new(MockHost::new());
        let driver = SchedulingDriver::new(
            store.clone(),
            HostServices::from_host(host.clone()),
            DriverSettings::default(),
        );
        (Arc::new(Mutex::new(driver)), store, host)
    }

    async fn call(
        driver: &Arc<Mutex<SchedulingDriver>>,
        store: &Arc<dyn Store>,
        command: Command,
    ) -> ResponseResult {
        handle_command(driver, store, &ClientId::new(), 7, command)
            .await
            .result
    }

    #[tokio::test]
    async fn start_then_state_reports_running_work() {
        let (driver, store, host) = setup();

        match call(&driver, &store, Command::StartTimer).await {
            ResponseResult::Ok(ResponsePayload::Timer(TimerReply::Applied { state })) => {
                assert_eq!(state.status(), TimerStatus::Work);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(host.active_wakes().len(), 2);

        match call(&driver, &store, Command::GetState).await {
            ResponseResult::Ok(ResponsePayload::State(snapshot)) => {
                assert_eq!(snapshot.api_version, API_VERSION);
                assert!(snapshot.timer.is_running());
                assert_eq!(snapshot.badge.map(|b| b.text), Some("35".to_string()));
                assert!(snapshot.blocking.enabled);
                assert!(!snapshot.audio_playing);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_commands_are_successful_replies() {
        let (driver, store, _host) = setup();

        match call(&driver, &store, Command::PauseTimer).await {
            ResponseResult::Ok(ResponsePayload::Timer(TimerReply::Rejected { reason, .. })) => {
                assert_eq!(reason, RejectReason::NotRunning);
            }
            other => panic!("unexpected: {:?}", other),
        }

        call(&driver, &store, Command::StartTimer).await;
        let change = ConfigChange::WorkDuration(20);
        match call(&driver, &store, Command::ConfigureTimer { change }).await {
            ResponseResult::Ok(ResponsePayload::Timer(TimerReply::Rejected { reason, .. })) => {
                assert_eq!(reason, RejectReason::NotIdle);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn schedule_failure_is_an_error_response() {
        let (driver, store, host) = setup();
        *host.fail_schedule.lock().unwrap() = true;

        match call(&driver, &store, Command::StartTimer).await {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::ScheduleFailed),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(store.timer_state().unwrap().status(), TimerStatus::Idle);
    }

    #[tokio::test]
    async fn blocking_commands() {
        let (driver, store, _host) = setup();

        call(
            &driver,
            &store,
            Command::AddBlockedSite {
                site: " Instagram ".into(),
            },
        )
        .await;

        match call(
            &driver,
            &store,
            Command::CheckUrl {
                url: "https://m.instagram.com/x".into(),
            },
        )
        .await
        {
            ResponseResult::Ok(ResponsePayload::UrlVerdict(verdict)) => {
                assert!(verdict.blocked);
                assert_eq!(verdict.keyword.as_deref(), Some("Instagram"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        match call(&driver, &store, Command::SetBlockingEnabled { enabled: false }).await {
            ResponseResult::Ok(ResponsePayload::Blocking(settings)) => {
                assert!(!settings.enabled);
                assert_eq!(settings.sites, vec!["Instagram"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn audio_and_history() {
        let (driver, store, host) = setup();

        assert!(matches!(
            call(&driver, &store, Command::PlayAudio).await,
            ResponseResult::Ok(ResponsePayload::AudioStatus { playing: true })
        ));
        assert_eq!(host.windows_opened(), 1);
        assert!(matches!(
            call(&driver, &store, Command::StopAudio).await,
            ResponseResult::Ok(ResponsePayload::AudioStatus { playing: false })
        ));

        call(&driver, &store, Command::StartTimer).await;
        match call(&driver, &store, Command::GetHistory { limit: 10 }).await {
            ResponseResult::Ok(ResponsePayload::History { entries }) => {
                assert!(!entries.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn health_and_ping() {
        let (driver, store, _host) = setup();

        match call(&driver, &store, Command::GetHealth).await {
            ResponseResult::Ok(ResponsePayload::Health(health)) => {
                assert!(health.live && health.store_ok && health.host_ok);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            call(&driver, &store, Command::Ping).await,
            ResponseResult::Ok(ResponsePayload::Pong)
        ));
    }
}
