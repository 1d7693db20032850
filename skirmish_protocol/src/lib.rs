// skirmish_protocol: wire protocol for match-state replication.
//
// Shared by the relay (`skirmish_relay`), the match core (`skirmish_match`)
// and the test harness. Has no dependency on either side.
//
// Module overview:
// - `types.rs`:    `ParticipantId`, `MatchPhase`, `StatKind`, `Recipients`,
//                  `EventCode` and the reserved tag range.
// - `event.rs`:    The match event payloads and their tag/bytes codec.
// - `message.rs`:  Client-to-relay and relay-to-client wire enums.
// - `framing.rs`:  Length-prefixed frames and JSON send/recv helpers.
// - `relay.rs`:    `MessageRelay`, the outbound relay contract.
//
// Design decisions:
// - **JSON everywhere.** Event payloads and wire messages both use
//   serde_json. Payloads are tiny (a roster of at most a room's worth of
//   players), so readability wins over compactness.
// - **Events as opaque bytes.** The relay routes `(tag, payload)` by
//   recipient group and never decodes it, so relay and match core evolve
//   independently.
// - **No async runtime.** Framing works on `std::io::Read`/`Write`.

pub mod event;
pub mod framing;
pub mod message;
pub mod relay;
pub mod types;

pub use event::{
    CodecError, EncodedEvent, JoinPayload, MatchEvent, ParticipantSnapshot, RosterSyncPayload,
    StatUpdatePayload, TimerSyncPayload,
};
pub use framing::{FrameError, MAX_FRAME_SIZE, read_frame, recv_json, send_json, write_frame};
pub use message::{ClientMessage, MemberInfo, PROTOCOL_VERSION, ServerMessage};
pub use relay::{MessageRelay, RelayError};
pub use types::{
    EventCode, MatchPhase, ParticipantId, RESERVED_TAG_START, Recipients, SenderSequence,
    StatKind, is_reserved_tag,
};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn client_through_frame(msg: &ClientMessage) -> ClientMessage {
        let mut wire = Vec::new();
        send_json(&mut wire, msg).unwrap();
        recv_json(&mut Cursor::new(&wire)).unwrap()
    }

    fn server_through_frame(msg: &ServerMessage) -> ServerMessage {
        let mut wire = Vec::new();
        send_json(&mut wire, msg).unwrap();
        recv_json(&mut Cursor::new(&wire)).unwrap()
    }

    #[test]
    fn hello_survives_framing() {
        let msg = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: "Rook".into(),
            session_password: Some("hunter2".into()),
        };
        assert_eq!(client_through_frame(&msg), msg);
    }

    #[test]
    fn encoded_match_event_rides_inside_client_event() {
        let encoded = MatchEvent::StatUpdate(StatUpdatePayload {
            target_id: ParticipantId(2),
            stat: StatKind::Death,
            delta: 1,
            sequence: SenderSequence(0),
        })
        .encode()
        .unwrap();
        let msg = ClientMessage::Event {
            tag: encoded.tag,
            payload: encoded.payload.clone(),
            recipients: Recipients::All,
            guaranteed: true,
        };
        let ClientMessage::Event { tag, payload, .. } = client_through_frame(&msg) else {
            panic!("expected Event");
        };
        let decoded = MatchEvent::decode(tag, payload.as_deref()).unwrap();
        assert!(matches!(decoded, MatchEvent::StatUpdate(p) if p.stat == StatKind::Death));
    }

    #[test]
    fn welcome_survives_framing() {
        let msg = ServerMessage::Welcome {
            participant_id: ParticipantId(2),
            session_name: "arena".into(),
            authority_id: ParticipantId(1),
            members: vec![
                MemberInfo {
                    id: ParticipantId(1),
                    name: "Host".into(),
                },
                MemberInfo {
                    id: ParticipantId(2),
                    name: "Guest".into(),
                },
            ],
        };
        assert_eq!(server_through_frame(&msg), msg);
    }

    #[test]
    fn membership_messages_survive_framing() {
        for msg in [
            ServerMessage::MemberJoined {
                member: MemberInfo {
                    id: ParticipantId(5),
                    name: "Late".into(),
                },
            },
            ServerMessage::MemberLeft {
                participant_id: ParticipantId(1),
                name: "Host".into(),
            },
            ServerMessage::AuthorityChanged {
                authority_id: ParticipantId(2),
            },
        ] {
            assert_eq!(server_through_frame(&msg), msg);
        }
    }

    #[test]
    fn zero_payload_event_survives_framing() {
        let msg = ServerMessage::Event {
            tag: EventCode::StartNextMatch.tag(),
            payload: None,
            sender: ParticipantId(1),
        };
        assert_eq!(server_through_frame(&msg), msg);
    }
}
