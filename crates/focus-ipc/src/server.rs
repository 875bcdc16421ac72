//! Daemon side of the focusd socket

use focus_api::{ClientInfo, Command, ErrorCode, ErrorInfo, Event, Request, Response};
use focus_util::ClientId;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::codec::{encode_line, next_line};
use crate::{IpcError, IpcResult};

const EVENT_BUFFER: usize = 100;

/// What the daemon hears from connected views
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        info: ClientInfo,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

struct ClientHandle {
    info: ClientInfo,
    /// Encoded lines, terminator included
    outbox: mpsc::UnboundedSender<String>,
    subscribed: bool,
}

type Clients = Arc<RwLock<HashMap<ClientId, ClientHandle>>>;

/// Listens on the socket and routes lines between views and the daemon
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    clients: Clients,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>,
}

impl IpcServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            clients: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            message_tx,
            message_rx: Mutex::new(Some(message_rx)),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket, replacing a stale one left by a previous run
    pub async fn start(&mut self) -> IpcResult<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        // Owner and group only
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %self.socket_path.display(), "IPC server listening");
        self.listener = Some(listener);
        Ok(())
    }

    /// The daemon's end of the message channel; `None` after the first call
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections until the listener fails
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self.listener.as_ref().ok_or(IpcError::NotStarted)?;

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let client_id = ClientId::new();
            let uid = peer_uid(&stream);
            info!(client_id = %client_id, uid = ?uid, "Client connected");

            let info = match uid {
                Some(uid) => ClientInfo::new().with_uid(uid),
                None => ClientInfo::new(),
            };
            self.attach(stream, client_id, info).await;
        }
    }

    async fn attach(&self, stream: UnixStream, client_id: ClientId, info: ClientInfo) {
        let (read_half, write_half) = stream.into_split();
        let (outbox, outbox_rx) = mpsc::unbounded_channel();

        self.clients.write().await.insert(
            client_id.clone(),
            ClientHandle {
                info: info.clone(),
                outbox: outbox.clone(),
                subscribed: false,
            },
        );
        let _ = self.message_tx.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            info,
        });

        tokio::spawn(read_requests(
            read_half,
            client_id.clone(),
            self.clients.clone(),
            self.message_tx.clone(),
            outbox,
        ));
        tokio::spawn(write_lines(
            write_half,
            client_id,
            self.clients.clone(),
            self.message_tx.clone(),
            outbox_rx,
            self.event_tx.subscribe(),
        ));
    }

    /// Queue a response for one client. Unknown clients are ignored.
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let line = encode_line(&response)?;
        if let Some(handle) = self.clients.read().await.get(client_id) {
            handle
                .outbox
                .send(line)
                .map_err(|_| IpcError::ConnectionClosed)?;
        }
        Ok(())
    }

    /// Push an event to every subscribed client
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub async fn get_client_info(&self, client_id: &ClientId) -> Option<ClientInfo> {
        self.clients.read().await.get(client_id).map(|h| h.info.clone())
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One request per line. Returning drops the last outbox sender held here,
/// which lets the writer finish once the client handle is gone too.
async fn read_requests(
    read_half: OwnedReadHalf,
    client_id: ClientId,
    clients: Clients,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    outbox: mpsc::UnboundedSender<String>,
) {
    let mut reader = BufReader::new(read_half);
    let mut buf = String::new();

    loop {
        match next_line(&mut reader, &mut buf).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(client_id = %client_id, "Client disconnected (EOF)");
                break;
            }
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "Read error");
                break;
            }
        }

        let request = match serde_json::from_str::<Request>(buf.trim()) {
            Ok(request) => request,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Invalid request");
                let reply = Response::error(
                    0,
                    ErrorInfo::new(ErrorCode::InvalidRequest, format!("Invalid request: {}", e)),
                );
                if let Ok(line) = encode_line(&reply) {
                    let _ = outbox.send(line);
                }
                continue;
            }
        };

        let subscribed = match request.command {
            Command::SubscribeEvents => Some(true),
            Command::UnsubscribeEvents => Some(false),
            _ => None,
        };
        if let Some(subscribed) = subscribed
            && let Some(handle) = clients.write().await.get_mut(&client_id)
        {
            handle.subscribed = subscribed;
        }

        let _ = message_tx.send(ServerMessage::Request {
            client_id: client_id.clone(),
            request,
        });
    }

    clients.write().await.remove(&client_id);
}

/// Responses and, for subscribers, events. Ends when every outbox sender is
/// gone or the socket stops accepting writes.
async fn write_lines(
    mut writer: OwnedWriteHalf,
    client_id: ClientId,
    clients: Clients,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    mut outbox: mpsc::UnboundedReceiver<String>,
    mut events: broadcast::Receiver<Event>,
) {
    loop {
        let line = tokio::select! {
            line = outbox.recv() => match line {
                Some(line) => line,
                None => break,
            },

            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client_id = %client_id, skipped, "Event stream lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let subscribed = clients
                    .read()
                    .await
                    .get(&client_id)
                    .is_some_and(|h| h.subscribed);
                if !subscribed {
                    continue;
                }
                match encode_line(&event) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode event");
                        continue;
                    }
                }
            }
        };

        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!(client_id = %client_id, error = %e, "Write error");
            break;
        }
    }

    let _ = message_tx.send(ServerMessage::ClientDisconnected {
        client_id: client_id.clone(),
    });
    clients.write().await.remove(&client_id);
}

fn peer_uid(stream: &UnixStream) -> Option<u32> {
    use std::os::unix::io::AsFd;

    nix::sys::socket::getsockopt(&stream.as_fd(), nix::sys::socket::sockopt::PeerCredentials)
        .ok()
        .map(|cred| cred.uid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IpcClient;
    use focus_api::{EventPayload, ResponsePayload, ResponseResult};
    use std::time::Duration;
    use tempfile::tempdir;

    /// Start a server that answers every request the way focusd would for
    /// subscription and ping
    async fn serve(socket_path: &Path) -> (Arc<IpcServer>, mpsc::UnboundedReceiver<ClientId>) {
        let mut server = IpcServer::new(socket_path);
        server.start().await.unwrap();
        let server = Arc::new(server);
        let mut messages = server.take_message_receiver().await.unwrap();

        let accept = server.clone();
        tokio::spawn(async move {
            let _ = accept.run().await;
        });

        let (connected_tx, connected_rx) = mpsc::unbounded_channel();
        let responder = server.clone();
        tokio::spawn(async move {
            while let Some(msg) = messages.recv().await {
                match msg {
                    ServerMessage::ClientConnected { client_id, .. } => {
                        let _ = connected_tx.send(client_id);
                    }
                    ServerMessage::Request { client_id, request } => {
                        let payload = match request.command {
                            Command::SubscribeEvents => ResponsePayload::Subscribed {
                                client_id: client_id.clone(),
                            },
                            Command::UnsubscribeEvents => ResponsePayload::Unsubscribed,
                            _ => ResponsePayload::Pong,
                        };
                        let _ = responder
                            .send_response(&client_id, Response::success(request.request_id, payload))
                            .await;
                    }
                    ServerMessage::ClientDisconnected { .. } => {}
                }
            }
        });

        (server, connected_rx)
    }

    #[tokio::test]
    async fn test_server_start() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");

        let mut server = IpcServer::new(&socket_path);
        server.start().await.unwrap();

        assert!(socket_path.exists());
        let mode = std::fs::metadata(&socket_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o660);
    }

    #[tokio::test]
    async fn test_start_replaces_stale_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("nested").join("focusd.sock");
        std::fs::create_dir_all(socket_path.parent().unwrap()).unwrap();
        std::fs::write(&socket_path, b"stale").unwrap();

        let mut server = IpcServer::new(&socket_path);
        server.start().await.unwrap();
        assert!(socket_path.exists());

        drop(server);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, mut connected) = serve(&socket_path).await;

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let client_id = connected.recv().await.unwrap();

        let info = server.get_client_info(&client_id).await.unwrap();
        assert_eq!(info.uid, Some(nix::unistd::getuid().as_raw()));

        let response = client.send(Command::Ping).await.unwrap();
        assert_eq!(response.request_id, 1);
        assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));

        let response = client.send(Command::GetState).await.unwrap();
        assert_eq!(response.request_id, 2);
    }

    #[tokio::test]
    async fn test_events_reach_only_subscribers() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, mut connected) = serve(&socket_path).await;

        let mut plain = IpcClient::connect(&socket_path).await.unwrap();
        connected.recv().await.unwrap();
        let subscriber = IpcClient::connect(&socket_path).await.unwrap();
        connected.recv().await.unwrap();
        let mut events = subscriber.subscribe().await.unwrap();

        server.broadcast_event(Event::new(EventPayload::BlockingChanged { enabled: false }));

        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event.payload,
            EventPayload::BlockingChanged { enabled: false }
        ));

        // The unsubscribed client's next line is its own response, not the event
        let response = plain.send(Command::Ping).await.unwrap();
        assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));
    }

    #[tokio::test]
    async fn test_disconnect_removes_client() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, mut connected) = serve(&socket_path).await;

        let client = IpcClient::connect(&socket_path).await.unwrap();
        connected.recv().await.unwrap();
        assert_eq!(server.client_count().await, 1);

        drop(client);

        let mut remaining = 1;
        for _ in 0..50 {
            remaining = server.client_count().await;
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(remaining, 0);
    }
}
