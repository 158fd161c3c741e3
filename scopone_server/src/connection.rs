// Socket plumbing. Every accepted TCP connection gets one task that turns
// incoming lines into events for the table and writes whatever the table
// pushes into its outbox. The table never touches a socket directly.

use std::io;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use scopone_core::{ClientMessage, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Longest accepted line, in bytes.
pub const MAX_LINE_LEN: usize = 8 * 1024;

pub type ConnId = Uuid;

/// Channel the table uses to send messages to one connection.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;

/// What connection tasks report to the table.
#[derive(Debug)]
pub enum ConnectionEvent {
    Connected {
        id: ConnId,
        addr: SocketAddr,
        outbox: Outbox,
    },
    Message {
        id: ConnId,
        msg: ClientMessage,
    },
    /// A line that is not a known client message.
    Malformed {
        id: ConnId,
        reason: String,
    },
    Disconnected {
        id: ConnId,
    },
}

/// One inbound line, or the reason it could not be read.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Line(String),
    Unreadable(&'static str),
}

/// `LinesCodec` that reports oversize and non-UTF-8 lines as items instead
/// of errors, so the stream keeps going after them. Only socket failures
/// surface as `Err`.
#[derive(Debug)]
pub struct ClientLines {
    inner: LinesCodec,
}

impl ClientLines {
    pub fn new() -> ClientLines {
        ClientLines { inner: LinesCodec::new_with_max_length(MAX_LINE_LEN) }
    }

    fn recover(result: Result<Option<String>, LinesCodecError>) -> Result<Option<Inbound>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(Inbound::Line)),
            // The codec discards up to the next newline on its own.
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Inbound::Unreadable("line too long"))),
            // The offending line has already been consumed.
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                Ok(Some(Inbound::Unreadable("line is not valid UTF-8")))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for ClientLines {
    fn default() -> Self {
        ClientLines::new()
    }
}

impl Decoder for ClientLines {
    type Item = Inbound;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, LinesCodecError> {
        Self::recover(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, LinesCodecError> {
        Self::recover(self.inner.decode_eof(buf))
    }
}

impl Encoder<String> for ClientLines {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), LinesCodecError> {
        self.inner.encode(line, buf)
    }
}

/// Accepts connections forever, spawning one tracked task per socket.
pub async fn accept_loop(listener: TcpListener, events: EventSender, tracker: TaskTracker) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept failed: {}", e);
                continue;
            }
        };
        tracker.spawn(handle_connection(stream, addr, events.clone()));
    }
}

/// Why a connection task stopped.
enum Exit {
    /// The peer went away or the socket failed.
    Peer,
    /// The table dropped our outbox: the session is over.
    Table,
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, events: EventSender) {
    let id = Uuid::new_v4();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();
    if events.send(ConnectionEvent::Connected { id, addr, outbox }).is_err() {
        debug!("[{}] table already closed, dropping {}", id, addr);
        return;
    }
    info!("[{}] connected from {}", id, addr);

    let mut framed = Framed::new(stream, ClientLines::new());

    let exit = loop {
        tokio::select! {
            line = framed.next() => match line {
                Some(Ok(Inbound::Unreadable(reason))) => {
                    if events.send(ConnectionEvent::Malformed { id, reason: reason.to_string() }).is_err() {
                        break Exit::Table;
                    }
                }
                Some(Ok(Inbound::Line(line))) => {
                    let line = line.trim();
                    // Blank keep-alive lines are ignored.
                    if line.is_empty() {
                        continue;
                    }
                    let event = match serde_json::from_str::<ClientMessage>(line) {
                        Ok(msg) => ConnectionEvent::Message { id, msg },
                        Err(e) => ConnectionEvent::Malformed { id, reason: e.to_string() },
                    };
                    if events.send(event).is_err() {
                        break Exit::Table;
                    }
                }
                Some(Err(e)) => {
                    warn!("[{}] read error: {}", id, e);
                    break Exit::Peer;
                }
                None => break Exit::Peer,
            },
            msg = inbox.recv() => match msg {
                Some(msg) => {
                    let line = match serde_json::to_string(&msg) {
                        Ok(line) => line,
                        Err(e) => {
                            error!("[{}] failed to encode {:?}: {}", id, msg, e);
                            continue;
                        }
                    };
                    if let Err(e) = framed.send(line).await {
                        warn!("[{}] write error: {}", id, e);
                        break Exit::Peer;
                    }
                }
                None => break Exit::Table,
            },
        }
    };

    match exit {
        Exit::Peer => {
            info!("[{}] disconnected", id);
            let _ = events.send(ConnectionEvent::Disconnected { id });
        }
        Exit::Table => {
            debug!("[{}] closing, session over", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Inbound> {
        let mut codec = ClientLines::new();
        let mut buf = BytesMut::from(bytes);
        let mut out = Vec::new();
        while let Some(item) = codec.decode_eof(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_oversize_line_is_skipped_and_reading_continues() {
        let mut input = vec![b'x'; MAX_LINE_LEN + 100];
        input.extend_from_slice(b"\n{\"action\":\"join\"}\n");
        assert_eq!(
            decode_all(&input),
            vec![Inbound::Unreadable("line too long"), Inbound::Line("{\"action\":\"join\"}".into())]
        );
    }

    #[test]
    fn test_invalid_utf8_is_reported_per_line() {
        assert_eq!(
            decode_all(b"\xff\xfe\nhello\n"),
            vec![Inbound::Unreadable("line is not valid UTF-8"), Inbound::Line("hello".into())]
        );
    }
}
