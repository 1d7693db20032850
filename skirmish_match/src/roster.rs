// Roster store: who is in the match and their kill/death counts.
//
// The roster is an ordered `Vec` of `ParticipantRecord`s. Order is the join
// order as the authority saw it; it only matters for the cached local index
// and for breaking leaderboard ties, never for game rules.
//
// On the authority this is ground truth. On every other node it is a replica
// that `replace_all` overwrites wholesale on each RosterSync and `apply_stat`
// patches in between. Mutators are crate-private: only the replication
// handlers in `node.rs` change the roster.
//
// The node remembers its own position (`local_index`) so stat updates that
// target it do not rescan. The cache is checked against the record's ID on
// every use and rebuilt if stale.

use skirmish_protocol::event::ParticipantSnapshot;
use skirmish_protocol::types::{ParticipantId, StatKind};

/// One participant's identity and stats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantRecord {
    id: ParticipantId,
    name: String,
    kills: u32,
    deaths: u32,
}

impl ParticipantRecord {
    pub(crate) fn new(id: ParticipantId, name: String) -> Self {
        Self {
            id,
            name,
            kills: 0,
            deaths: 0,
        }
    }

    pub(crate) fn from_snapshot(snapshot: ParticipantSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name,
            kills: snapshot.kills,
            deaths: snapshot.deaths,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id,
            name: self.name.clone(),
            kills: self.kills,
            deaths: self.deaths,
        }
    }

    /// Add `delta` to one counter, clamping to the `u32` range.
    fn apply(&mut self, kind: StatKind, delta: i32) {
        let counter = match kind {
            StatKind::Kill => &mut self.kills,
            StatKind::Death => &mut self.deaths,
        };
        *counter = counter.saturating_add_signed(delta);
    }
}

/// What `Roster::append` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Added,
    /// The ID was already present; only the name was refreshed.
    AlreadyPresent,
}

/// Result of a stat update that found its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatChange {
    /// The target was this node's own record.
    pub is_local: bool,
}

/// Ordered participant records plus this node's cached position.
#[derive(Clone, Debug)]
pub struct Roster {
    records: Vec<ParticipantRecord>,
    local_id: ParticipantId,
    local_index: Option<usize>,
}

impl Roster {
    pub fn new(local_id: ParticipantId) -> Self {
        Self {
            records: Vec::new(),
            local_id,
            local_index: None,
        }
    }

    pub fn records(&self) -> &[ParticipantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ParticipantId) -> Option<&ParticipantRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    /// This node's position in the roster, if it is listed.
    pub fn local_index(&self) -> Option<usize> {
        self.local_index
            .filter(|&i| self.records.get(i).is_some_and(|r| r.id == self.local_id))
    }

    pub fn local_record(&self) -> Option<&ParticipantRecord> {
        self.local_index().map(|i| &self.records[i])
    }

    /// Wire form of the whole roster, in order.
    pub fn snapshots(&self) -> Vec<ParticipantSnapshot> {
        self.records.iter().map(ParticipantRecord::snapshot).collect()
    }

    /// Append a fresh record (zero stats). A repeated ID keeps its record and
    /// stats; only the display name is updated.
    pub(crate) fn append(&mut self, id: ParticipantId, name: String) -> AppendOutcome {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == id) {
            existing.name = name;
            return AppendOutcome::AlreadyPresent;
        }
        self.records.push(ParticipantRecord::new(id, name));
        if id == self.local_id {
            self.local_index = Some(self.records.len() - 1);
        }
        AppendOutcome::Added
    }

    /// Discard everything and rebuild from a RosterSync. Later entries that
    /// repeat an earlier ID are skipped so IDs stay unique.
    pub(crate) fn replace_all(&mut self, snapshots: Vec<ParticipantSnapshot>) {
        self.records.clear();
        self.local_index = None;
        for snapshot in snapshots {
            if self.records.iter().any(|r| r.id == snapshot.id) {
                continue;
            }
            if snapshot.id == self.local_id {
                self.local_index = Some(self.records.len());
            }
            self.records.push(ParticipantRecord::from_snapshot(snapshot));
        }
    }

    /// Apply `stat += delta` to the record with `id`. Returns `None` when the
    /// ID is not in the roster.
    pub(crate) fn apply_stat(
        &mut self,
        id: ParticipantId,
        kind: StatKind,
        delta: i32,
    ) -> Option<StatChange> {
        let index = if id == self.local_id {
            self.refresh_local_index()?
        } else {
            self.records.iter().position(|r| r.id == id)?
        };
        self.records[index].apply(kind, delta);
        Some(StatChange {
            is_local: id == self.local_id,
        })
    }

    pub(crate) fn remove(&mut self, id: ParticipantId) -> Option<ParticipantRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let removed = self.records.remove(index);
        self.refresh_local_index();
        Some(removed)
    }

    /// Zero every record's kills and deaths.
    pub(crate) fn reset_stats(&mut self) {
        for record in &mut self.records {
            record.kills = 0;
            record.deaths = 0;
        }
    }

    fn refresh_local_index(&mut self) -> Option<usize> {
        if let Some(i) = self.local_index() {
            return Some(i);
        }
        self.local_index = self.records.iter().position(|r| r.id == self.local_id);
        self.local_index
    }
}
