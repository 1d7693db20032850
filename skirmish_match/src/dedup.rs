// Optional StatUpdate de-duplication.
//
// StatUpdate is additive, so a duplicated delivery double-counts. The relay's
// guaranteed channel is expected to be duplicate-free and by default nothing
// here runs. With `MatchConfig::dedup_stat_updates` set, each receiver keeps
// the highest `SenderSequence` seen from each sender and drops anything at or
// below it.
//
// This relies on per-sender send order being preserved, which the relay
// contract promises for guaranteed messages.

use std::collections::HashMap;

use skirmish_protocol::types::{ParticipantId, SenderSequence};

#[derive(Clone, Debug, Default)]
pub struct StatDedup {
    highest_seen: HashMap<ParticipantId, SenderSequence>,
}

impl StatDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sequence` from `sender`. Returns false if it was already seen.
    pub fn accept(&mut self, sender: ParticipantId, sequence: SenderSequence) -> bool {
        match self.highest_seen.get(&sender) {
            Some(&highest) if sequence <= highest => false,
            _ => {
                self.highest_seen.insert(sender, sequence);
                true
            }
        }
    }

    /// Drop the history of a sender that left the room.
    pub fn forget(&mut self, sender: ParticipantId) {
        self.highest_seen.remove(&sender);
    }
}
