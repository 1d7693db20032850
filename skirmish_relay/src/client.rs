// TCP client for connecting to the relay.
//
// Gives the owning thread a non-blocking view of the relay:
// - `connect()` does TCP connect + `Hello`/`Welcome` handshake on the calling
//   thread, then spawns a background reader thread.
// - The reader thread decodes `ServerMessage`s and pushes them into an
//   `mpsc` channel.
// - `poll()` drains the channel without blocking.
// - Sending goes through `MessageRelay`, so a `MatchNode` can own a
//   `NetClient` directly as its relay.
//
// The main thread never blocks on network reads. Writes are small and
// flushed synchronously.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use skirmish_protocol::framing::{FrameError, recv_json, send_json};
use skirmish_protocol::message::{ClientMessage, MemberInfo, PROTOCOL_VERSION, ServerMessage};
use skirmish_protocol::relay::{MessageRelay, RelayError};
use skirmish_protocol::types::{ParticipantId, Recipients, is_reserved_tag};
use thiserror::Error;
use tracing::debug;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[from] FrameError),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unexpected handshake response: {0}")]
    UnexpectedResponse(String),
}

/// What the relay told us when it accepted the handshake.
#[derive(Clone, Debug)]
pub struct WelcomeInfo {
    pub participant_id: ParticipantId,
    pub session_name: String,
    pub authority_id: ParticipantId,
    pub members: Vec<MemberInfo>,
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: Option<BufWriter<TcpStream>>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    participant_id: ParticipantId,
    connected: bool,
}

impl NetClient {
    /// Connect, perform the handshake, and spawn the reader thread.
    pub fn connect(
        addr: &str,
        player_name: &str,
        password: Option<String>,
    ) -> Result<(Self, WelcomeInfo), ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let reader_stream = stream.try_clone()?;
        let mut writer = BufWriter::new(stream);

        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: player_name.into(),
            session_password: password,
        };
        send_json(&mut writer, &hello)?;

        let mut reader = BufReader::new(reader_stream);
        let welcome = match recv_json::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Welcome {
                participant_id,
                session_name,
                authority_id,
                members,
            } => WelcomeInfo {
                participant_id,
                session_name,
                authority_id,
                members,
            },
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedResponse(format!("{other:?}"))),
        };

        reader.get_ref().set_read_timeout(None)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok((
            Self {
                writer: Some(writer),
                inbox: rx,
                _reader_thread: Some(reader_thread),
                participant_id: welcome.participant_id,
                connected: true,
            },
            welcome,
        ))
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// False once the relay connection has dropped or `disconnect` was called.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        messages
    }
}

impl MessageRelay for NetClient {
    fn send(
        &mut self,
        tag: u8,
        payload: Option<Vec<u8>>,
        recipients: Recipients,
        guaranteed: bool,
    ) -> Result<(), RelayError> {
        if is_reserved_tag(tag) {
            return Err(RelayError::ReservedTag(tag));
        }
        let writer = self.writer.as_mut().ok_or(RelayError::Disconnected)?;
        let msg = ClientMessage::Event {
            tag,
            payload,
            recipients,
            guaranteed,
        };
        send_json(writer, &msg)?;
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = send_json(&mut writer, &ClientMessage::Goodbye);
        }
        self.connected = false;
    }
}

/// Reader thread: decode frames in a loop and push them to the channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match recv_json::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                if !e.is_eof() {
                    debug!(error = %e, "relay read failed");
                }
                break;
            }
        }
    }
}
