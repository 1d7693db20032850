// Leaderboard ranking.
//
// Selection-based ordering: repeatedly take the remaining record with the
// most kills, and among equals the one earliest in roster order. That gives
// a descending-kills order where ties keep roster order. O(n^2), which is
// fine for a room capped at a handful of players.
//
// The ranker holds no state; call it again whenever the roster changes.

use crate::roster::ParticipantRecord;

/// Rank records by descending kills, ties in the order given.
pub fn rank(records: &[ParticipantRecord]) -> Vec<&ParticipantRecord> {
    let mut remaining: Vec<&ParticipantRecord> = records.iter().collect();
    let mut ranked = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best = 0;
        for (i, record) in remaining.iter().enumerate().skip(1) {
            if record.kills() > remaining[best].kills() {
                best = i;
            }
        }
        ranked.push(remaining.remove(best));
    }
    ranked
}

/// A display row for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
}

/// `rank`, flattened into rows.
pub fn rows(records: &[ParticipantRecord]) -> Vec<LeaderboardRow> {
    rank(records)
        .into_iter()
        .map(|r| LeaderboardRow {
            name: r.name().to_owned(),
            kills: r.kills(),
            deaths: r.deaths(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::event::ParticipantSnapshot;
    use skirmish_protocol::types::ParticipantId;

    use super::*;
    use crate::roster::Roster;

    fn roster(entries: &[(&str, u32)]) -> Roster {
        let mut roster = Roster::new(ParticipantId(0));
        roster.replace_all(
            entries
                .iter()
                .enumerate()
                .map(|(i, (name, kills))| ParticipantSnapshot {
                    id: ParticipantId(i as u32 + 1),
                    name: (*name).into(),
                    kills: *kills,
                    deaths: 0,
                })
                .collect(),
        );
        roster
    }

    fn names(ranked: &[&ParticipantRecord]) -> Vec<String> {
        ranked.iter().map(|r| r.name().to_owned()).collect()
    }

    #[test]
    fn ties_keep_roster_order() {
        let roster = roster(&[("A", 3), ("B", 1), ("C", 3)]);
        assert_eq!(names(&rank(roster.records())), vec!["A", "C", "B"]);
    }

    #[test]
    fn ranking_twice_is_identical() {
        let roster = roster(&[("A", 0), ("B", 4), ("C", 4), ("D", 2), ("E", 0)]);
        let first = names(&rank(roster.records()));
        let second = names(&rank(roster.records()));
        assert_eq!(first, second);
        assert_eq!(first, vec!["B", "C", "D", "A", "E"]);
    }

    #[test]
    fn all_zero_keeps_roster_order() {
        let roster = roster(&[("X", 0), ("Y", 0), ("Z", 0)]);
        assert_eq!(names(&rank(roster.records())), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn empty_roster_ranks_empty() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn rows_carry_stats() {
        let roster = roster(&[("A", 1), ("B", 2)]);
        let rows = rows(roster.records());
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].kills, 2);
        assert_eq!(rows[1].name, "A");
    }
}
