// Core ID and enum types for the match protocol.
//
// These are shared by the event codec (`event.rs`), the relay wire messages
// (`message.rs`), and the match core in `skirmish_match`. `ParticipantId` is
// relay-scoped: the relay hands out compact integers per connection, and they
// carry no meaning about a participant's position in the roster.

use serde::{Deserialize, Serialize};

/// First tag value owned by the relay. Match events use tags below this.
pub const RESERVED_TAG_START: u8 = 200;

/// Relay-assigned participant ID (unique per connection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-sender monotonic counter attached to stat updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SenderSequence(pub u64);

/// Lifecycle stage of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Not started yet (a fresh non-authority node before its first sync).
    #[default]
    Waiting,
    Playing,
    /// Match is over; end screen is up and the restart/leave delay runs.
    Ending,
}

/// Which counter a stat update targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Kill,
    Death,
}

/// Recipient group for an outgoing event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipients {
    /// Every member, including the sender.
    All,
    /// Only the current authority.
    AuthorityOnly,
    /// A single member.
    One(ParticipantId),
}

/// Tag values for the match event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventCode {
    Join = 0,
    RosterSync = 1,
    StatUpdate = 2,
    TimerSync = 3,
    StartNextMatch = 4,
}

impl EventCode {
    /// The raw tag byte for this event kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Map a raw tag back to an event kind. Returns `None` for unknown tags
    /// and for anything in the relay-reserved range.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Join),
            1 => Some(Self::RosterSync),
            2 => Some(Self::StatUpdate),
            3 => Some(Self::TimerSync),
            4 => Some(Self::StartNextMatch),
            _ => None,
        }
    }
}

/// Whether `tag` falls in the relay-reserved range.
pub fn is_reserved_tag(tag: u8) -> bool {
    tag >= RESERVED_TAG_START
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_codes_map_back_from_tags() {
        for code in [
            EventCode::Join,
            EventCode::RosterSync,
            EventCode::StatUpdate,
            EventCode::TimerSync,
            EventCode::StartNextMatch,
        ] {
            assert_eq!(EventCode::from_tag(code.tag()), Some(code));
        }
    }

    #[test]
    fn unknown_and_reserved_tags_have_no_code() {
        assert_eq!(EventCode::from_tag(5), None);
        assert_eq!(EventCode::from_tag(199), None);
        assert_eq!(EventCode::from_tag(200), None);
        assert!(!is_reserved_tag(199));
        assert!(is_reserved_tag(200));
        assert!(is_reserved_tag(255));
    }

    #[test]
    fn default_phase_is_waiting() {
        assert_eq!(MatchPhase::default(), MatchPhase::Waiting);
    }
}
