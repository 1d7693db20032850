// Relay wire messages.
//
// Two enums define everything that crosses a relay socket:
// - `ClientMessage`: sent by a game client to the relay.
// - `ServerMessage`: sent by the relay to a game client.
//
// Match traffic travels inside `Event` variants as an opaque tag plus bytes;
// the relay routes it by `Recipients` and never decodes it (see `event.rs`
// for what the bytes mean). Everything else here is session plumbing:
// handshake, membership changes and authority hand-off.

use serde::{Deserialize, Serialize};

use crate::types::{ParticipantId, Recipients};

/// Protocol version checked during the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the session (handshake).
    Hello {
        protocol_version: u32,
        player_name: String,
        session_password: Option<String>,
    },
    /// A tagged event to route to `recipients`.
    Event {
        tag: u8,
        payload: Option<Vec<u8>>,
        recipients: Recipients,
        guaranteed: bool,
    },
    /// Leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome {
        participant_id: ParticipantId,
        session_name: String,
        authority_id: ParticipantId,
        members: Vec<MemberInfo>,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// A routed event from another member (or from ourselves, for `All`).
    Event {
        tag: u8,
        payload: Option<Vec<u8>>,
        sender: ParticipantId,
    },
    /// A member connected.
    MemberJoined { member: MemberInfo },
    /// A member disconnected.
    MemberLeft {
        participant_id: ParticipantId,
        name: String,
    },
    /// The authority role moved to another member.
    AuthorityChanged { authority_id: ParticipantId },
}

/// Public identity of a connected member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: ParticipantId,
    pub name: String,
}
