// Match events carried as opaque relay payloads.
//
// The relay moves `(tag, Option<Vec<u8>>)` pairs and never looks inside. This
// module gives those pairs meaning for the match core: one payload struct per
// event kind, a `MatchEvent` enum that unifies them, and the encode/decode
// pair that maps between the enum and the tagged bytes.
//
// Tags come from `EventCode` (`types.rs`). Payload bodies are JSON, the same
// encoding the relay wire messages use. `StartNextMatch` carries no payload at
// all; a payload attached to it by a peer is ignored.
//
// Decoding never panics. Short or garbled payloads, unknown tags and tags in
// the relay-reserved range all come back as `CodecError`, and the receiver
// drops the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    EventCode, MatchPhase, ParticipantId, SenderSequence, StatKind, is_reserved_tag,
};

/// Wire form of one roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
}

/// A client announcing itself to the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub display_name: String,
    pub sender_id: ParticipantId,
}

/// The authority's full roster and phase. Receivers replace, never merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSyncPayload {
    pub phase: MatchPhase,
    pub participants: Vec<ParticipantSnapshot>,
}

/// A kill or death observed by some client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatUpdatePayload {
    pub target_id: ParticipantId,
    pub stat: StatKind,
    pub delta: i32,
    pub sequence: SenderSequence,
}

/// Periodic clock broadcast from the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSyncPayload {
    pub remaining_seconds: u32,
    pub phase: MatchPhase,
}

/// A decoded match event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    Join(JoinPayload),
    RosterSync(RosterSyncPayload),
    StatUpdate(StatUpdatePayload),
    TimerSync(TimerSyncPayload),
    StartNextMatch,
}

/// Tag plus payload bytes, ready for `MessageRelay::send`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedEvent {
    pub tag: u8,
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("tag {0} is reserved for the relay")]
    ReservedTag(u8),

    #[error("unknown event tag {0}")]
    UnknownTag(u8),

    #[error("{0:?} event arrived without a payload")]
    MissingPayload(EventCode),

    #[error("malformed {code:?} payload: {source}")]
    Malformed {
        code: EventCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {code:?} payload: {source}")]
    Encode {
        code: EventCode,
        #[source]
        source: serde_json::Error,
    },
}

impl MatchEvent {
    pub fn code(&self) -> EventCode {
        match self {
            MatchEvent::Join(_) => EventCode::Join,
            MatchEvent::RosterSync(_) => EventCode::RosterSync,
            MatchEvent::StatUpdate(_) => EventCode::StatUpdate,
            MatchEvent::TimerSync(_) => EventCode::TimerSync,
            MatchEvent::StartNextMatch => EventCode::StartNextMatch,
        }
    }

    /// Serialize into a tag and optional payload.
    pub fn encode(&self) -> Result<EncodedEvent, CodecError> {
        let code = self.code();
        let body = match self {
            MatchEvent::Join(p) => Some(serde_json::to_vec(p)),
            MatchEvent::RosterSync(p) => Some(serde_json::to_vec(p)),
            MatchEvent::StatUpdate(p) => Some(serde_json::to_vec(p)),
            MatchEvent::TimerSync(p) => Some(serde_json::to_vec(p)),
            MatchEvent::StartNextMatch => None,
        };
        let payload = body
            .transpose()
            .map_err(|source| CodecError::Encode { code, source })?;
        Ok(EncodedEvent {
            tag: code.tag(),
            payload,
        })
    }

    /// Parse a tagged payload received from the relay.
    pub fn decode(tag: u8, payload: Option<&[u8]>) -> Result<Self, CodecError> {
        if is_reserved_tag(tag) {
            return Err(CodecError::ReservedTag(tag));
        }
        let code = EventCode::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;

        if code == EventCode::StartNextMatch {
            return Ok(MatchEvent::StartNextMatch);
        }

        let bytes = payload.ok_or(CodecError::MissingPayload(code))?;
        let malformed = |source| CodecError::Malformed { code, source };
        let event = match code {
            EventCode::Join => MatchEvent::Join(serde_json::from_slice(bytes).map_err(malformed)?),
            EventCode::RosterSync => {
                MatchEvent::RosterSync(serde_json::from_slice(bytes).map_err(malformed)?)
            }
            EventCode::StatUpdate => {
                MatchEvent::StatUpdate(serde_json::from_slice(bytes).map_err(malformed)?)
            }
            EventCode::TimerSync => {
                MatchEvent::TimerSync(serde_json::from_slice(bytes).map_err(malformed)?)
            }
            EventCode::StartNextMatch => MatchEvent::StartNextMatch,
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_encoded(event: &MatchEvent) -> MatchEvent {
        let encoded = event.encode().unwrap();
        MatchEvent::decode(encoded.tag, encoded.payload.as_deref()).unwrap()
    }

    #[test]
    fn roster_sync_keeps_participant_order() {
        let event = MatchEvent::RosterSync(RosterSyncPayload {
            phase: MatchPhase::Playing,
            participants: vec![
                ParticipantSnapshot {
                    id: ParticipantId(7),
                    name: "Zed".into(),
                    kills: 2,
                    deaths: 1,
                },
                ParticipantSnapshot {
                    id: ParticipantId(3),
                    name: "Amy".into(),
                    kills: 0,
                    deaths: 4,
                },
            ],
        });
        assert_eq!(decode_encoded(&event), event);
    }

    #[test]
    fn stat_update_carries_negative_delta() {
        let event = MatchEvent::StatUpdate(StatUpdatePayload {
            target_id: ParticipantId(1),
            stat: StatKind::Kill,
            delta: -1,
            sequence: SenderSequence(9),
        });
        assert_eq!(decode_encoded(&event), event);
    }

    #[test]
    fn start_next_match_has_no_payload() {
        let encoded = MatchEvent::StartNextMatch.encode().unwrap();
        assert_eq!(encoded.tag, EventCode::StartNextMatch.tag());
        assert!(encoded.payload.is_none());
    }

    #[test]
    fn start_next_match_ignores_stray_payload() {
        let event = MatchEvent::decode(EventCode::StartNextMatch.tag(), Some(b"junk".as_slice())).unwrap();
        assert_eq!(event, MatchEvent::StartNextMatch);
    }

    #[test]
    fn reserved_tag_is_rejected() {
        let err = MatchEvent::decode(200, Some(b"{}".as_slice())).unwrap_err();
        assert!(matches!(err, CodecError::ReservedTag(200)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = MatchEvent::decode(42, Some(b"{}".as_slice())).unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(42)));
    }

    #[test]
    fn missing_payload_is_rejected() {
        let err = MatchEvent::decode(EventCode::TimerSync.tag(), None).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MissingPayload(EventCode::TimerSync)
        ));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let encoded = MatchEvent::Join(JoinPayload {
            display_name: "Kit".into(),
            sender_id: ParticipantId(4),
        })
        .encode()
        .unwrap();
        let bytes = encoded.payload.unwrap();
        let short = &bytes[..bytes.len() / 2];
        let err = MatchEvent::decode(encoded.tag, Some(short)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                code: EventCode::Join,
                ..
            }
        ));
    }

    #[test]
    fn empty_payload_is_malformed() {
        let err = MatchEvent::decode(EventCode::StatUpdate.tag(), Some(&[])).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }
}
