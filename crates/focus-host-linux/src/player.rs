//! Audio player windows as child processes

use async_trait::async_trait;
use focus_host_api::{
    AudioHost, HostError, HostResult, WindowEvent, WindowHandle, WindowPayload,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::process::ManagedProcess;

struct PlayerProcess {
    process: ManagedProcess,
    /// Set once we asked it to exit; its exit is then not reported
    closing: bool,
}

/// Each player window is a process running the configured command line
pub struct PlayerHost {
    argv: Vec<String>,
    processes: Arc<Mutex<HashMap<u32, PlayerProcess>>>,
    event_tx: mpsc::UnboundedSender<WindowEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<WindowEvent>>>>,
}

impl PlayerHost {
    pub fn new(argv: Vec<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            argv,
            processes: Arc::new(Mutex::new(HashMap::new())),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    fn lock(&self) -> HostResult<MutexGuard<'_, HashMap<u32, PlayerProcess>>> {
        self.processes
            .lock()
            .map_err(|_| HostError::Internal("player table poisoned".into()))
    }

    /// Reap exited players; those that exited on their own are reported as
    /// closed
    pub fn start_monitor(&self) -> tokio::task::JoinHandle<()> {
        let processes = self.processes.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(200)).await;

                let mut closed = Vec::new();
                {
                    let Ok(mut procs) = processes.lock() else {
                        warn!("Player table poisoned, stopping monitor");
                        break;
                    };

                    let mut exited = Vec::new();
                    for (pid, player) in procs.iter_mut() {
                        match player.process.try_wait() {
                            Ok(Some(status)) => exited.push((*pid, player.closing, status)),
                            Ok(None) => {}
                            Err(e) => {
                                warn!(pid = pid, error = %e, "Error checking player status");
                            }
                        }
                    }

                    for (pid, closing, status) in exited {
                        procs.remove(&pid);
                        debug!(pid = pid, status = %status, "Player exited");
                        if !closing {
                            closed.push(pid);
                        }
                    }
                }

                for pid in closed {
                    info!(pid = pid, "Player window closed by user");
                    let handle = WindowHandle::new(WindowPayload::Process { pid });
                    let _ = event_tx.send(WindowEvent::Closed { handle });
                }
            }
        })
    }
}

fn pid_of(handle: &WindowHandle) -> HostResult<u32> {
    handle.payload().pid().ok_or(HostError::WindowNotFound)
}

#[async_trait]
impl AudioHost for PlayerHost {
    async fn open(&self) -> HostResult<WindowHandle> {
        let process = ManagedProcess::spawn(&self.argv)?;
        let pid = process.pid;

        self.lock()?.insert(
            pid,
            PlayerProcess {
                process,
                closing: false,
            },
        );

        info!(pid = pid, "Player window opened");
        Ok(WindowHandle::new(WindowPayload::Process { pid }))
    }

    async fn focus(&self, handle: &WindowHandle) -> HostResult<()> {
        let pid = pid_of(handle)?;
        if !self.exists(handle).await {
            return Err(HostError::WindowNotFound);
        }

        // Window stacking belongs to the compositor; a live player counts as
        // focused
        debug!(pid = pid, "Player window already open");
        Ok(())
    }

    async fn close(&self, handle: &WindowHandle) -> HostResult<()> {
        let pid = pid_of(handle)?;
        let mut procs = self.lock()?;

        let Some(player) = procs.get_mut(&pid) else {
            return Err(HostError::WindowNotFound);
        };
        if player.closing {
            return Err(HostError::WindowNotFound);
        }

        player.closing = true;
        player.process.terminate()?;
        info!(pid = pid, "Player window closed");
        Ok(())
    }

    async fn exists(&self, handle: &WindowHandle) -> bool {
        let Ok(pid) = pid_of(handle) else {
            return false;
        };
        let Ok(mut procs) = self.lock() else {
            return false;
        };

        match procs.get_mut(&pid) {
            Some(player) if !player.closing => {
                matches!(player.process.try_wait(), Ok(None))
            }
            _ => false,
        }
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<WindowEvent>> {
        self.event_rx
            .lock()
            .map_err(|_| HostError::Internal("window receiver poisoned".into()))?
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper() -> PlayerHost {
        PlayerHost::new(vec!["sleep".into(), "60".into()])
    }

    #[tokio::test]
    async fn open_focus_close() {
        let host = sleeper();
        let _monitor = host.start_monitor();
        let mut rx = host.subscribe().unwrap();

        let handle = host.open().await.unwrap();
        assert!(host.exists(&handle).await);
        host.focus(&handle).await.unwrap();

        host.close(&handle).await.unwrap();
        assert!(!host.exists(&handle).await);
        assert!(matches!(
            host.focus(&handle).await,
            Err(HostError::WindowNotFound)
        ));
        assert!(matches!(
            host.close(&handle).await,
            Err(HostError::WindowNotFound)
        ));

        // Closing ourselves is not reported as a user close
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn player_exiting_on_its_own_is_reported() {
        let host = PlayerHost::new(vec!["true".into()]);
        let _monitor = host.start_monitor();
        let mut rx = host.subscribe().unwrap();

        let handle = host.open().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, WindowEvent::Closed { handle: handle.clone() });
        assert!(!host.exists(&handle).await);
    }

    #[tokio::test]
    async fn unknown_handles_are_not_found() {
        let host = sleeper();
        let stale = WindowHandle::new(WindowPayload::Process { pid: u32::MAX });
        let mock = WindowHandle::new(WindowPayload::Mock { id: 1 });

        assert!(!host.exists(&stale).await);
        assert!(!host.exists(&mock).await);
        assert!(matches!(host.focus(&stale).await, Err(HostError::WindowNotFound)));
        assert!(matches!(host.close(&mock).await, Err(HostError::WindowNotFound)));
    }

    #[tokio::test]
    async fn bad_player_command_fails_to_open() {
        let host = PlayerHost::new(vec!["/nonexistent/player".into()]);
        assert!(matches!(host.open().await, Err(HostError::SpawnFailed(_))));
    }
}
