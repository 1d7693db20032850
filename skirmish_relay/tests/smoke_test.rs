// Integration smoke test for the relay server.
//
// Starts a relay on localhost, connects plain TCP clients that speak the
// protocol crate's framing and message types, and exercises the lifecycle:
// handshake, event routing by recipient group, authority hand-off and
// graceful disconnect. No match logic is involved.

use std::io::{BufReader, BufWriter};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use skirmish_protocol::framing::{recv_json, send_json};
use skirmish_protocol::message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
use skirmish_protocol::relay::MessageRelay;
use skirmish_protocol::types::{ParticipantId, Recipients};
use skirmish_relay::client::NetClient;
use skirmish_relay::server::{RelayConfig, start_relay};
use skirmish_relay::{ClientError, RelayHandle};

fn start(name: &str, password: Option<&str>) -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        port: 0,
        session_name: name.into(),
        password: password.map(String::from),
        max_players: 4,
        ..RelayConfig::default()
    };
    let (handle, addr) = start_relay(config).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    (handle, addr)
}

fn send(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) {
    send_json(writer, msg).unwrap();
}

fn recv(reader: &mut BufReader<TcpStream>) -> ServerMessage {
    recv_json(reader).unwrap()
}

/// Connect and perform the handshake. Returns the reader/writer pair and the
/// assigned ID.
fn connect_and_hello(
    addr: SocketAddr,
    name: &str,
) -> (BufReader<TcpStream>, BufWriter<TcpStream>, ParticipantId) {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let reader_stream = stream.try_clone().unwrap();
    let mut writer = BufWriter::new(stream);
    let mut reader = BufReader::new(reader_stream);

    send(
        &mut writer,
        &ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: name.into(),
            session_password: None,
        },
    );

    let participant_id = match recv(&mut reader) {
        ServerMessage::Welcome { participant_id, .. } => participant_id,
        other => panic!("expected Welcome, got {other:?}"),
    };
    (reader, writer, participant_id)
}

/// Drain buffered messages using a short read timeout.
fn drain_messages(reader: &mut BufReader<TcpStream>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    reader
        .get_ref()
        .set_read_timeout(Some(Duration::from_millis(20)))
        .ok();
    while let Ok(msg) = recv_json::<_, ServerMessage>(reader) {
        messages.push(msg);
    }
    reader
        .get_ref()
        .set_read_timeout(Some(Duration::from_secs(5)))
        .ok();
    messages
}

#[test]
fn full_session_lifecycle() {
    let (handle, addr) = start("smoke-test", None);

    // Two members connect; the first is the authority.
    let (mut reader_a, mut writer_a, id_a) = connect_and_hello(addr, "Alice");
    assert_eq!(id_a, ParticipantId(1));
    let (mut reader_b, mut writer_b, id_b) = connect_and_hello(addr, "Bob");
    assert_eq!(id_b, ParticipantId(2));

    match recv(&mut reader_a) {
        ServerMessage::MemberJoined { member } => {
            assert_eq!(member.id, id_b);
            assert_eq!(member.name, "Bob");
        }
        other => panic!("expected MemberJoined, got {other:?}"),
    }

    // Bob sends to the authority only: Alice gets it, Bob does not.
    send(
        &mut writer_b,
        &ClientMessage::Event {
            tag: 0,
            payload: Some(b"join".to_vec()),
            recipients: Recipients::AuthorityOnly,
            guaranteed: true,
        },
    );
    match recv(&mut reader_a) {
        ServerMessage::Event {
            tag,
            payload,
            sender,
        } => {
            assert_eq!(tag, 0);
            assert_eq!(payload.as_deref(), Some(&b"join"[..]));
            assert_eq!(sender, id_b);
        }
        other => panic!("expected Event, got {other:?}"),
    }

    // Alice broadcasts to All: both receive it, sender included.
    send(
        &mut writer_a,
        &ClientMessage::Event {
            tag: 1,
            payload: Some(b"roster".to_vec()),
            recipients: Recipients::All,
            guaranteed: true,
        },
    );
    assert!(matches!(
        recv(&mut reader_a),
        ServerMessage::Event { tag: 1, .. }
    ));
    assert!(matches!(
        recv(&mut reader_b),
        ServerMessage::Event { tag: 1, .. }
    ));

    // Reserved tags are never routed.
    send(
        &mut writer_b,
        &ClientMessage::Event {
            tag: 250,
            payload: None,
            recipients: Recipients::All,
            guaranteed: false,
        },
    );
    std::thread::sleep(Duration::from_millis(100));
    assert!(drain_messages(&mut reader_a).is_empty());

    // The authority leaves: Bob is told, and inherits the role.
    send(&mut writer_a, &ClientMessage::Goodbye);
    std::thread::sleep(Duration::from_millis(150));
    let messages_b = drain_messages(&mut reader_b);
    assert!(
        messages_b.iter().any(|m| matches!(
            m,
            ServerMessage::MemberLeft { participant_id, .. } if *participant_id == id_a
        )),
        "should get MemberLeft for Alice, got: {messages_b:?}"
    );
    assert!(
        messages_b.iter().any(|m| matches!(
            m,
            ServerMessage::AuthorityChanged { authority_id } if *authority_id == id_b
        )),
        "Bob should become authority, got: {messages_b:?}"
    );

    drop(writer_b);
    drop(reader_b);
    handle.stop();
}

#[test]
fn rejected_wrong_password() {
    let (handle, addr) = start("password-test", Some("secret"));

    let result = NetClient::connect(&addr.to_string(), "Intruder", Some("wrong".into()));
    match result {
        Err(ClientError::Rejected(reason)) => assert_eq!(reason, "incorrect password"),
        Err(other) => panic!("expected Rejected, got {other}"),
        Ok(_) => panic!("expected Rejected, got Welcome"),
    }

    handle.stop();
}

#[test]
fn net_client_round_trip() {
    let (handle, addr) = start("client-test", None);

    let (mut host, host_info) = NetClient::connect(&addr.to_string(), "Host", None).unwrap();
    let (mut guest, guest_info) = NetClient::connect(&addr.to_string(), "Guest", None).unwrap();
    assert_eq!(host_info.authority_id, host_info.participant_id);
    assert_eq!(guest_info.authority_id, host_info.participant_id);
    assert_eq!(guest_info.members.len(), 2);

    guest
        .send(2, Some(vec![1, 2, 3]), Recipients::All, true)
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut host_got = None;
    while host_got.is_none() && std::time::Instant::now() < deadline {
        host_got = host.poll().into_iter().find_map(|m| match m {
            ServerMessage::Event { tag, sender, .. } => Some((tag, sender)),
            _ => None,
        });
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(host_got, Some((2, guest_info.participant_id)));

    // Reserved tags are refused client-side.
    assert!(guest.send(200, None, Recipients::All, true).is_err());

    guest.disconnect();
    assert!(!guest.is_connected());
    assert!(guest.send(2, None, Recipients::All, true).is_err());

    host.disconnect();
    handle.stop();
}

#[test]
fn wildcard_bind_accepts_loopback_clients() {
    let config = RelayConfig {
        bind_addr: Ipv4Addr::UNSPECIFIED.into(),
        port: 0,
        ..RelayConfig::default()
    };
    let (handle, addr) = start_relay(config).unwrap();
    assert!(addr.ip().is_unspecified());

    let loopback = SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()));
    let (_reader, _writer, id) = connect_and_hello(loopback, "Remote");
    assert_eq!(id, ParticipantId(1));

    handle.stop();
}
