//! Client side of the focusd socket

use focus_api::{Command, Event, Request, Response, ResponsePayload, ResponseResult};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::codec::{encode_line, read_message};
use crate::{IpcError, IpcResult};

/// Command connection to focusd
///
/// Requests are answered in order, so one request is in flight at a time.
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let (read_half, write_half) = UnixStream::connect(socket_path).await?.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for its response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let expected = self.next_request_id;
        self.next_request_id += 1;

        let line = encode_line(&Request::new(expected, command))?;
        self.writer.write_all(line.as_bytes()).await?;

        let response: Response = read_message(&mut self.reader)
            .await?
            .ok_or(IpcError::ConnectionClosed)?;
        if response.request_id != expected {
            return Err(IpcError::RequestMismatch {
                expected,
                got: response.request_id,
            });
        }
        Ok(response)
    }

    /// Like [`send`](Self::send), with a daemon-side error as [`IpcError::Daemon`]
    pub async fn call(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(e) => Err(IpcError::Daemon {
                code: e.code,
                message: e.message,
            }),
        }
    }

    /// Turn this connection into an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        self.call(Command::SubscribeEvents).await?;
        Ok(EventStream {
            reader: self.reader,
            _writer: self.writer,
        })
    }
}

/// Events pushed by focusd after `subscribe_events`
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
    // Held open; the server treats EOF on its read side as a disconnect
    _writer: OwnedWriteHalf,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        read_message(&mut self.reader)
            .await?
            .ok_or(IpcError::ConnectionClosed)
    }
}
