// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread**: non-blocking `accept()` loop that forwards each new
//   socket to the main thread as `InternalEvent::NewConnection`.
// - **Reader threads** (one per member): read frames in a loop, decode
//   `ClientMessage`, and forward `InternalEvent::MessageFrom`. On EOF, error,
//   malformed input or `Goodbye` they send `InternalEvent::Disconnected` and
//   exit.
// - **Main thread**: owns the `Session` and applies events one at a time.
//   `recv_timeout` wakes it periodically so it can notice shutdown.
//
// Only the main thread writes to member sockets (via `Session`). Reader
// threads only read. The relay never decodes match events; it routes the
// opaque `(tag, payload)` pair by recipient group.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use skirmish_protocol::framing::{recv_json, send_json};
use skirmish_protocol::message::{ClientMessage, ServerMessage};
use skirmish_protocol::types::ParticipantId;
use tracing::{debug, info, warn};

use crate::session::Session;

/// How often the main loop wakes up with no traffic to check for shutdown.
const IDLE_WAKE: Duration = Duration::from_millis(100);

/// Sleep between non-blocking `accept` attempts.
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// How long a new connection has to send its `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        participant_id: ParticipantId,
        message: ClientMessage,
    },
    Disconnected {
        participant_id: ParticipantId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Interface to listen on. Loopback by default; `0.0.0.0` accepts
    /// remote players.
    pub bind_addr: IpAddr,
    pub port: u16,
    pub session_name: String,
    pub password: Option<String>,
    pub max_players: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7878,
            session_name: "skirmish-arena".into(),
            password: None,
            max_players: 8,
        }
    }
}

/// Start the relay on a background thread. Returns a handle for stopping it
/// and the bound address (useful with port 0).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind_addr, config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    info!(%addr, session = %config.session_name, "relay listening");
    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Channel and shutdown flag shared by the main loop and every thread it
/// spawns.
#[derive(Clone)]
struct Wiring {
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
}

impl Wiring {
    fn running(&self) -> bool {
        self.keep_running.load(Ordering::SeqCst)
    }

    /// False once the main loop is gone.
    fn notify(&self, event: InternalEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Main relay loop. Runs until `keep_running` is cleared.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new(config.session_name, config.password, config.max_players);
    let (tx, rx) = mpsc::channel::<InternalEvent>();
    let wiring = Wiring { tx, keep_running };

    // Non-blocking so the accept thread can notice shutdown.
    if let Err(e) = listener.set_nonblocking(true) {
        warn!(error = %e, "listener could not be made non-blocking");
    }
    let accept_wiring = wiring.clone();
    thread::spawn(move || accept_loop(listener, accept_wiring));

    while wiring.running() {
        let first = match rx.recv_timeout(IDLE_WAKE) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        // Apply everything already queued before sleeping again.
        for event in std::iter::once(first).chain(rx.try_iter()) {
            handle_event(&mut session, event, &wiring);
        }
    }
    info!(session = %session.name, "relay stopped");
}

fn accept_loop(listener: TcpListener, wiring: Wiring) {
    while wiring.running() {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "could not make connection blocking");
                    continue;
                }
                if !wiring.notify(InternalEvent::NewConnection { stream }) {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!(error = %e, "accept failed, listener stopping");
                return;
            }
        }
    }
}

fn handle_event(session: &mut Session, event: InternalEvent, wiring: &Wiring) {
    match event {
        InternalEvent::NewConnection { stream } => admit(session, stream, wiring),
        InternalEvent::MessageFrom {
            participant_id,
            message,
        } => handle_message(session, participant_id, message),
        InternalEvent::Disconnected { participant_id } => {
            session.remove_member(participant_id);
        }
    }
}

/// The fields of a client's opening `Hello`.
struct Hello {
    protocol_version: u32,
    player_name: String,
    session_password: Option<String>,
}

/// Read the opening `Hello` within the handshake timeout.
fn read_hello(reader: &mut BufReader<TcpStream>) -> Option<Hello> {
    match recv_json::<_, ClientMessage>(reader) {
        Ok(ClientMessage::Hello {
            protocol_version,
            player_name,
            session_password,
        }) => Some(Hello {
            protocol_version,
            player_name,
            session_password,
        }),
        Ok(other) => {
            debug!(?other, "first message was not Hello, dropping connection");
            None
        }
        Err(e) => {
            debug!(error = %e, "handshake read failed");
            None
        }
    }
}

/// Run the handshake for a new socket, then either admit the member and
/// start its reader thread or answer `Rejected` and drop the socket.
fn admit(session: &mut Session, stream: TcpStream, wiring: &Wiring) {
    if let Err(e) = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)) {
        warn!(error = %e, "could not set handshake timeout");
        return;
    }
    let (read_half, write_half) = match (stream.try_clone(), stream.try_clone()) {
        (Ok(r), Ok(w)) => (r, w),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "could not clone connection");
            return;
        }
    };
    let mut reader = BufReader::new(read_half);
    let Some(hello) = read_hello(&mut reader) else {
        return;
    };

    let admitted = session.add_member(
        hello.protocol_version,
        hello.player_name,
        hello.session_password,
        write_half,
    );
    let participant_id = match admitted {
        Ok(id) => id,
        Err(rejection) => {
            info!(reason = %rejection, "rejected connection");
            let rejected = ServerMessage::Rejected {
                reason: rejection.to_string(),
            };
            let _ = send_json(&mut BufWriter::new(stream), &rejected);
            return;
        }
    };

    // Members may idle indefinitely once admitted.
    if let Err(e) = stream.set_read_timeout(None) {
        warn!(participant = %participant_id, error = %e, "could not clear read timeout");
    }
    let reader_wiring = wiring.clone();
    thread::spawn(move || reader_loop(reader, participant_id, reader_wiring));
}

/// Reader loop for one member. Runs in its own thread until the member says
/// Goodbye, the socket closes, or the relay shuts down.
fn reader_loop(mut reader: BufReader<TcpStream>, participant_id: ParticipantId, wiring: Wiring) {
    while wiring.running() {
        let message = match recv_json::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => message,
            Err(e) => {
                if !e.is_eof() {
                    debug!(participant = %participant_id, error = %e, "read failed");
                }
                break;
            }
        };
        let forwarded = wiring.notify(InternalEvent::MessageFrom {
            participant_id,
            message,
        });
        if !forwarded {
            return;
        }
    }
    wiring.notify(InternalEvent::Disconnected { participant_id });
}

fn handle_message(session: &mut Session, participant_id: ParticipantId, message: ClientMessage) {
    match message {
        ClientMessage::Event {
            tag,
            payload,
            recipients,
            guaranteed,
        } => {
            session.route_event(participant_id, tag, payload, recipients, guaranteed);
        }
        ClientMessage::Hello { .. } => {
            debug!(participant = %participant_id, "ignoring repeated Hello");
        }
        // Goodbye ends the reader loop before it gets here.
        ClientMessage::Goodbye => {}
    }
}
