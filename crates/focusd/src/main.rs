//! focusd - The focus timer background service
//!
//! Wires together configuration, the store, the scheduling driver, the Linux
//! host services and the IPC server, then runs the event loop.

mod dispatch;
mod events;
mod indicator;

use anyhow::{Context, Result};
use clap::Parser;
use focus_api::{Event, EventPayload, HistoryEntry, HistoryEventType};
use focus_config::{load_or_default, Settings};
use focus_core::{CoreEvent, DriverSettings, HostServices, SchedulingDriver};
use focus_host_api::{AudioHost, WakeEvent, WakeScheduler, WindowEvent};
use focus_host_linux::{DesktopNotifier, PlayerHost, TokioWakeScheduler};
use focus_ipc::{IpcServer, ServerMessage};
use focus_store::{SqliteStore, Store, StoreChange};
use focus_util::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::indicator::BroadcastIndicator;

/// focusd - Focus timer and site blocking service
#[derive(Parser, Debug)]
#[command(name = "focusd")]
#[command(about = "Focus timer and site blocking service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FOCUS_SOCKET env var)
    #[arg(short, long, env = "FOCUS_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set FOCUS_DATA_DIR env var)
    #[arg(short, long, env = "FOCUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// SIGTERM, SIGINT and SIGHUP all stop the daemon
struct ShutdownSignals {
    term: Signal,
    int: Signal,
    hup: Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        let install = |kind: SignalKind, name: &str| {
            signal(kind).with_context(|| format!("Failed to install {} handler", name))
        };
        Ok(Self {
            term: install(SignalKind::terminate(), "SIGTERM")?,
            int: install(SignalKind::interrupt(), "SIGINT")?,
            hup: install(SignalKind::hangup(), "SIGHUP")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.term.recv() => "SIGTERM",
            _ = self.int.recv() => "SIGINT",
            _ = self.hup.recv() => "SIGHUP",
        }
    }
}

struct Service {
    driver: SchedulingDriver,
    store: Arc<dyn Store>,
    ipc: Arc<IpcServer>,
    wakes: Arc<TokioWakeScheduler>,
    player: Arc<PlayerHost>,
    badge_rx: mpsc::UnboundedReceiver<EventPayload>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings: Settings = load_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            work_minutes = settings.timer.work_minutes,
            break_minutes = settings.timer.break_minutes,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.daemon.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.daemon.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("focusd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let wakes = Arc::new(TokioWakeScheduler::new());
        let player = Arc::new(PlayerHost::new(settings.audio.command_line()));
        let (badge_tx, badge_rx) = mpsc::unbounded_channel();

        let host = HostServices {
            wakes: wakes.clone(),
            indicator: Arc::new(BroadcastIndicator::new(badge_tx)),
            notifier: Arc::new(DesktopNotifier::new()),
            audio: player.clone(),
        };

        let driver = SchedulingDriver::new(
            store.clone(),
            host,
            DriverSettings::from_settings(&settings),
        );

        let first_start = driver
            .seed_defaults(&settings.timer, &settings.blocking)
            .context("Failed to seed initial state")?;
        if first_start {
            info!("First start, seeded defaults from configuration");
        }

        store.append_history(HistoryEntry::new(HistoryEventType::DaemonStarted))?;

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to listen on {:?}", socket_path))?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            driver,
            store,
            ipc: Arc::new(ipc),
            wakes,
            player,
            badge_rx,
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            mut driver,
            store,
            ipc,
            wakes,
            player,
            mut badge_rx,
        } = self;

        let mut wake_events = wakes.subscribe()?;
        let mut window_events = player.subscribe()?;
        let _monitor_handle = player.start_monitor();
        let mut core_events = driver.subscribe();
        let mut store_changes = store.subscribe();

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // An interval that ended while we were down completes now
        if let Err(e) = driver.recover(focus_util::now()).await {
            error!(error = %e, "Failed to recover timer state");
        }

        let driver = Arc::new(Mutex::new(driver));

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut signals = ShutdownSignals::install()?;

        info!("Service running");

        loop {
            tokio::select! {
                name = signals.recv() => {
                    info!(signal = name, "Shutting down on signal");
                    break;
                }

                Some(wake) = wake_events.recv() => {
                    Self::handle_wake(&driver, wake).await;
                }

                Some(WindowEvent::Closed { handle }) = window_events.recv() => {
                    driver.lock().await.on_window_closed(&handle);
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&driver, &ipc, &store, msg).await;
                }

                change = store_changes.recv() => {
                    if !Self::handle_store_change(&ipc, change) {
                        break;
                    }
                }

                Ok(event) = core_events.recv() => {
                    Self::handle_core_event(&ipc, event);
                }

                Some(payload) = badge_rx.recv() => {
                    ipc.broadcast_event(Event::new(payload));
                }
            }
        }

        info!("Shutting down focusd");

        ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        {
            let mut driver = driver.lock().await;
            if driver.audio_playing()
                && let Err(e) = driver.stop_audio().await
            {
                warn!(error = %e, "Failed to close audio window");
            }
        }

        if let Err(e) = store.append_history(HistoryEntry::new(HistoryEventType::DaemonStopped)) {
            warn!(error = %e, "Failed to record daemon stop");
        }

        ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_wake(driver: &Arc<Mutex<SchedulingDriver>>, wake: WakeEvent) {
        debug!(name = %wake.name, fired_at = %wake.fired_at, "Wake received");

        // Both wakes recompute from the stored start time
        let now = focus_util::now();
        if let Err(e) = driver.lock().await.on_wake(now).await {
            warn!(name = %wake.name, error = %e, "Wake handling failed");
        }
    }

    /// Returns false once the store stops publishing changes
    fn handle_store_change(
        ipc: &Arc<IpcServer>,
        change: Result<StoreChange, broadcast::error::RecvError>,
    ) -> bool {
        match change {
            Ok(change) => {
                if let Some(payload) = events::store_change_event(&change) {
                    ipc.broadcast_event(Event::new(payload));
                }
                true
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Store change stream lagged");
                true
            }
            Err(broadcast::error::RecvError::Closed) => {
                error!("Store change stream closed, shutting down");
                false
            }
        }
    }

    fn handle_core_event(ipc: &Arc<IpcServer>, event: CoreEvent) {
        if let CoreEvent::IntervalCompleted { interval, .. } = &event {
            info!(interval = %interval, "Broadcasting IntervalCompleted");
        }
        ipc.broadcast_event(Event::new(events::core_event(event)));
    }

    async fn handle_ipc_message(
        driver: &Arc<Mutex<SchedulingDriver>>,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let response = dispatch::handle_command(
                    driver,
                    store,
                    &client_id,
                    request.request_id,
                    request.command,
                )
                .await;

                let _ = ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(client_id = %client_id, uid = ?info.uid, "Client connected");

                let _ = store.append_history(HistoryEntry::new(HistoryEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_history(HistoryEntry::new(
                    HistoryEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    },
                ));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "focusd starting");

    if focus_util::is_mock_time_active() {
        warn!("Mock time is active; the clock is offset from the system time");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
