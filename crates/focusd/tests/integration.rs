//! Integration tests for focusd
//!
//! These tests run the driver against a real store, the mock host and the
//! IPC layer the way the daemon wires them.

use chrono::{DateTime, Duration, TimeZone, Utc};
use focus_api::{
    Command, ConfigChange, Event, EventPayload, HistoryEventType, Interval, Response,
    ResponsePayload, ResponseResult, TimerState, TimerStatus,
};
use focus_config::parse_config;
use focus_core::{DriverSettings, HostServices, SchedulingDriver, TimerEvent};
use focus_host_api::{MockHost, WakeScheduler, INTERVAL_END_WAKE};
use focus_ipc::{IpcClient, IpcServer, ServerMessage};
use focus_store::{SqliteStore, Store, StoreKey};
use std::sync::Arc;
use tokio::sync::Mutex;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

fn driver_for(store: Arc<dyn Store>, host: Arc<MockHost>, config: &str) -> SchedulingDriver {
    let settings = parse_config(config).unwrap();
    let driver = SchedulingDriver::new(
        store,
        HostServices::from_host(host),
        DriverSettings::from_settings(&settings),
    );
    driver
        .seed_defaults(&settings.timer, &settings.blocking)
        .unwrap();
    driver
}

const CONFIG: &str = r##"
config_version = 1

[timer]
work_minutes = 25
break_minutes = 5

[badge]
work_color = "#FF0000"

[notifications.work]
title = "Pomodoro done"
message = "Stretch your legs"

[blocking]
sites = ["reddit", "news"]
"##;

#[test]
fn test_config_seeds_first_start() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let _driver = driver_for(store.clone(), Arc::new(MockHost::new()), CONFIG);

    let state = store.timer_state().unwrap();
    assert_eq!(state.work_duration_min, 25);
    assert_eq!(state.break_duration_min, 5);
    assert_eq!(state.remaining_time(), Some(25 * 60));
    assert!(store.blocking_enabled().unwrap());
    assert_eq!(store.blocked_sites().unwrap(), vec!["reddit", "news"]);
}

#[tokio::test]
async fn test_full_pomodoro_cycle() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let host = Arc::new(MockHost::new());
    let mut driver = driver_for(store.clone(), host.clone(), CONFIG);
    let mut wakes = WakeScheduler::subscribe(host.as_ref()).unwrap();

    driver
        .on_command(
            TimerEvent::Configure(ConfigChange::Goal("write report".into())),
            t0(),
        )
        .await
        .unwrap();
    driver.on_command(TimerEvent::Start, t0()).await.unwrap();
    assert_eq!(host.badge().unwrap().color, "#FF0000");

    // The daemon handles a fired wake by calling on_wake
    let end = t0() + Duration::minutes(25);
    host.fire_wake(INTERVAL_END_WAKE);
    let wake = wakes.recv().await.unwrap();
    assert_eq!(wake.name, INTERVAL_END_WAKE);
    driver.on_wake(end).await.unwrap();

    let state = store.timer_state().unwrap();
    assert_eq!(state.status(), TimerStatus::Completed);
    assert_eq!(state.suggested_next(), Some(Interval::Break));
    assert_eq!(host.notifications()[0].title, "Pomodoro done");
    assert_eq!(host.badge().unwrap().text, "DONE");

    driver
        .on_command(TimerEvent::Advance(None), end)
        .await
        .unwrap();
    let state = store.timer_state().unwrap();
    assert_eq!(state.status(), TimerStatus::Break);
    assert_eq!(state.duration_min, 5);
    assert_eq!(state.goal, "write report");

    driver.on_command(TimerEvent::Reset, end).await.unwrap();
    let state = store.timer_state().unwrap();
    assert_eq!(state.status(), TimerStatus::Idle);
    assert_eq!(state.remaining_time(), Some(25 * 60));
    assert!(host.badge().is_none());
    assert!(host.active_wakes().is_empty());

    let history = store.recent_history(20).unwrap();
    assert!(history
        .iter()
        .any(|e| matches!(e.event, HistoryEventType::IntervalCompleted { interval: Interval::Work, .. })));
}

#[tokio::test]
async fn test_pause_and_resume_keep_remaining_time() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let host = Arc::new(MockHost::new());
    let mut driver = driver_for(store.clone(), host.clone(), CONFIG);

    driver.on_command(TimerEvent::Start, t0()).await.unwrap();
    let paused_at = t0() + Duration::seconds(10 * 60 + 30);
    driver.on_command(TimerEvent::Pause, paused_at).await.unwrap();
    let paused = store.timer_state().unwrap();
    assert_eq!(paused.remaining_time(), Some(14 * 60 + 30));

    let resumed_at = paused_at + Duration::hours(2);
    driver.on_command(TimerEvent::Start, resumed_at).await.unwrap();
    let resumed = store.timer_state().unwrap();
    assert_eq!(resumed.status(), TimerStatus::Work);
    assert_eq!(resumed.display_remaining_secs(resumed_at), 14 * 60 + 30);
    assert_eq!(host.badge().unwrap().text, "15");
}

#[tokio::test]
async fn test_restart_recovers_missed_completion() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("focusd.db");

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut driver = driver_for(store, Arc::new(MockHost::new()), CONFIG);
        driver.on_command(TimerEvent::Start, t0()).await.unwrap();
    }

    // The daemon was down across the interval end
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let host = Arc::new(MockHost::new());
    let mut driver = driver_for(store.clone(), host.clone(), CONFIG);
    driver.recover(t0() + Duration::hours(1)).await.unwrap();

    let state = store.timer_state().unwrap();
    assert_eq!(state.status(), TimerStatus::Completed);
    assert_eq!(state.previous_status(), Some(Interval::Work));
    assert_eq!(host.notifications().len(), 1);
    assert!(host.active_wakes().is_empty());
}

#[tokio::test]
async fn test_store_changes_follow_every_write() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let host = Arc::new(MockHost::new());
    let mut driver = driver_for(store.clone(), host, CONFIG);
    let mut changes = store.subscribe();

    driver.on_command(TimerEvent::Start, t0()).await.unwrap();
    driver.add_blocked_site("youtube").unwrap();

    let change = changes.recv().await.unwrap();
    assert_eq!(change.key, StoreKey::TimerState);
    let state: TimerState = serde_json::from_value(change.value).unwrap();
    assert_eq!(state.start_time(), Some(t0()));

    let change = changes.recv().await.unwrap();
    assert_eq!(change.key, StoreKey::BlockedSites);
}

#[tokio::test]
async fn test_ipc_command_and_event_stream() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("focusd.sock");

    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let host = Arc::new(MockHost::new());
    let driver = Arc::new(Mutex::new(driver_for(store.clone(), host.clone(), CONFIG)));

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);
    let mut messages = server.take_message_receiver().await.unwrap();
    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    // A reduced daemon loop: timer commands go to the driver and every
    // timer write is published
    let responder = server.clone();
    let loop_driver = driver.clone();
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = messages.recv() => {
                    let ServerMessage::Request { client_id, request } = msg else {
                        continue;
                    };
                    let payload = match request.command {
                        Command::StartTimer => {
                            let reply = loop_driver
                                .lock()
                                .await
                                .on_command(TimerEvent::Start, focus_util::now())
                                .await
                                .unwrap();
                            ResponsePayload::Timer(reply)
                        }
                        Command::SubscribeEvents => ResponsePayload::Subscribed {
                            client_id: client_id.clone(),
                        },
                        _ => ResponsePayload::Pong,
                    };
                    let _ = responder
                        .send_response(&client_id, Response::success(request.request_id, payload))
                        .await;
                }
                Ok(change) = changes.recv() => {
                    if change.key == StoreKey::TimerState {
                        let state: TimerState = serde_json::from_value(change.value).unwrap();
                        responder.broadcast_event(Event::new(EventPayload::TimerStateChanged(state)));
                    }
                }
            }
        }
    });

    let view = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = view.subscribe().await.unwrap();

    let mut popup = IpcClient::connect(&socket_path).await.unwrap();
    let response = popup.send(Command::StartTimer).await.unwrap();
    match response.result {
        ResponseResult::Ok(ResponsePayload::Timer(reply)) => assert!(reply.is_applied()),
        other => panic!("unexpected: {:?}", other),
    }

    let event = tokio::time::timeout(std::time::Duration::from_secs(2), events.next())
        .await
        .unwrap()
        .unwrap();
    match event.payload {
        EventPayload::TimerStateChanged(state) => {
            assert_eq!(state.status(), TimerStatus::Work);
            assert_eq!(state.duration_min, 25);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(host.active_wakes().len(), 2);
}
