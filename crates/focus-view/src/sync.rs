//! Keeping a view in step with focusd
//!
//! Four triggers feed [`ViewSynchronizer::refresh`]: the initial read on
//! mount, pushed events, a one-second countdown tick and a one-second
//! fallback poll. Refresh recomputes the display from the latest state and
//! only draws when something visible changed, so triggers may overlap freely.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use focus_api::{Command, EventPayload, ResponsePayload, ResponseResult};
use focus_ipc::IpcClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::display::{render, CountdownDisplay, ViewKind};
use crate::state::{Connection, SharedState, ViewState};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Something that can draw a countdown
pub trait ViewRenderer: Send {
    fn render(&mut self, display: &CountdownDisplay);

    /// Lost the daemon; the next refresh redraws
    fn disconnected(&mut self) {}
}

/// Tracks what was last drawn
pub struct ViewSynchronizer<R> {
    kind: ViewKind,
    renderer: R,
    last: Option<CountdownDisplay>,
}

impl<R: ViewRenderer> ViewSynchronizer<R> {
    pub fn new(kind: ViewKind, renderer: R) -> Self {
        Self {
            kind,
            renderer,
            last: None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Redraw if the display for `state` at `now` differs from the last one.
    /// Returns whether the renderer was called.
    pub fn refresh(&mut self, state: &ViewState, now: DateTime<Utc>) -> bool {
        let Some(timer) = &state.timer else {
            return false;
        };

        let display = render(self.kind, timer, now);
        if self.last.as_ref() == Some(&display) {
            return false;
        }

        self.renderer.render(&display);
        self.last = Some(display);
        true
    }

    pub fn disconnected(&mut self) {
        self.last = None;
        self.renderer.disconnected();
    }
}

/// Connection manager for a mounted view
pub struct ViewClient<R> {
    socket_path: PathBuf,
    state: SharedState,
    sync: ViewSynchronizer<R>,
    command_rx: mpsc::UnboundedReceiver<Command>,
}

impl<R: ViewRenderer> ViewClient<R> {
    /// `command_rx` carries button presses from the view
    pub fn new(
        socket_path: impl AsRef<Path>,
        state: SharedState,
        sync: ViewSynchronizer<R>,
        command_rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            state,
            sync,
            command_rx,
        }
    }

    /// Run until the command channel closes, reconnecting on errors
    pub async fn run(mut self) {
        loop {
            match self.connect_and_run().await {
                Ok(()) => {
                    info!("View client exited");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Connection error");
                    self.state.set_connection(Connection::Disconnected);
                    self.sync.disconnected();
                    sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn connect_and_run(&mut self) -> Result<()> {
        self.state.set_connection(Connection::Connecting);
        info!(path = %self.socket_path.display(), "Connecting to daemon");

        let mut client = IpcClient::connect(&self.socket_path)
            .await
            .context("Failed to connect to daemon")?;
        self.poll(&mut client).await?;
        self.refresh();

        // Events need their own connection; the command one stays usable
        let mut events = IpcClient::connect(&self.socket_path)
            .await
            .context("Failed to connect event stream")?
            .subscribe()
            .await
            .context("Failed to subscribe to events")?;
        info!("Connected to daemon");

        let mut tick = interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        return Ok(());
                    };
                    self.send(&mut client, command).await?;
                }

                event = events.next() => {
                    let event = event.context("Event stream error")?;
                    let shutdown = matches!(event.payload, EventPayload::Shutdown);
                    self.state.handle_event(event);
                    if shutdown {
                        anyhow::bail!("Daemon shut down");
                    }
                }

                _ = tick.tick() => {}

                _ = poll.tick() => {
                    self.poll(&mut client).await?;
                }
            }

            self.refresh();
        }
    }

    async fn poll(&self, client: &mut IpcClient) -> Result<()> {
        match client.call(Command::GetState).await? {
            ResponsePayload::State(snapshot) => self.state.apply_snapshot(snapshot),
            other => warn!(payload = ?other, "Unexpected reply to get_state"),
        }
        Ok(())
    }

    async fn send(&self, client: &mut IpcClient, command: Command) -> Result<()> {
        let name = command.name();
        let response = client.send(command).await?;
        match response.result {
            ResponseResult::Ok(ResponsePayload::Timer(reply)) => {
                if !reply.is_applied() {
                    debug!(command = name, "Command rejected by daemon");
                }
                self.state.set_timer(reply.state().clone());
            }
            ResponseResult::Ok(_) => {}
            ResponseResult::Err(e) => {
                warn!(command = name, error = %e.message, "Command failed");
            }
        }
        Ok(())
    }

    fn refresh(&mut self) {
        let state = self.state.get();
        self.sync.refresh(&state, focus_util::now());
    }
}
