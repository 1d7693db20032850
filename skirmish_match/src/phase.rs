// Match state machine and win-condition evaluator.
//
// Phases run Waiting -> Playing -> Ending, and only go backwards through the
// explicit `restart` (StartNextMatch). The authority moves the phase on its
// own; every other node only `adopt`s values it receives. `adopt` accepts
// any value, including a step back, because the authority's broadcast is
// ground truth even when a replica got ahead of it.
//
// The win check is a pure function over the roster so both the authority
// and the replicas can run it; only the authority acts on the answer.

use skirmish_protocol::types::MatchPhase;

use crate::roster::{ParticipantRecord, Roster};

/// What a phase change did, so callers can run entry actions exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: MatchPhase,
    pub to: MatchPhase,
}

#[derive(Clone, Debug, Default)]
pub struct MatchStateMachine {
    phase: MatchPhase,
}

impl MatchStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == MatchPhase::Playing
    }

    pub fn is_ending(&self) -> bool {
        self.phase == MatchPhase::Ending
    }

    /// Waiting -> Playing. No-op from any other phase.
    pub fn begin(&mut self) -> Option<PhaseChange> {
        match self.phase {
            MatchPhase::Waiting => self.set(MatchPhase::Playing),
            _ => None,
        }
    }

    /// Move to Ending unless already there.
    pub fn end(&mut self) -> Option<PhaseChange> {
        match self.phase {
            MatchPhase::Ending => None,
            _ => self.set(MatchPhase::Ending),
        }
    }

    /// Reset to Playing for a new match.
    pub fn restart(&mut self) -> Option<PhaseChange> {
        self.set(MatchPhase::Playing)
    }

    /// Take a phase received from the authority.
    pub fn adopt(&mut self, phase: MatchPhase) -> Option<PhaseChange> {
        self.set(phase)
    }

    fn set(&mut self, to: MatchPhase) -> Option<PhaseChange> {
        if self.phase == to {
            return None;
        }
        let change = PhaseChange {
            from: self.phase,
            to,
        };
        self.phase = to;
        Some(change)
    }
}

/// True when win-by-kills is enabled (`threshold > 0`) and some record has
/// reached it.
pub fn winner_found(roster: &Roster, threshold: i32) -> bool {
    first_winner(roster, threshold).is_some()
}

/// The first record in roster order at or above the kill threshold.
pub fn first_winner(roster: &Roster, threshold: i32) -> Option<&ParticipantRecord> {
    let threshold = u32::try_from(threshold).ok().filter(|t| *t > 0)?;
    roster.records().iter().find(|r| r.kills() >= threshold)
}
