// skirmish_match: match-state replication core.
//
// Keeps the roster, kill/death counts, match phase and countdown consistent
// across every client in a room, using only a `MessageRelay` (see
// `skirmish_protocol::relay`) as transport. One node, the authority, owns the
// clock and decides when a match ends; everyone else holds a replica that
// the authority's full-roster broadcasts overwrite.
//
// Module overview:
// - `config.rs`:      `MatchConfig`, the JSON-loadable tunables.
// - `roster.rs`:      `Roster` and `ParticipantRecord`, the replicated store.
// - `phase.rs`:       `MatchStateMachine` and the kill-threshold win check.
// - `timer.rs`:       `AuthoritativeTimer`, countdown plus sync cadence.
// - `leaderboard.rs`: Ranking by kills, ties in roster order.
// - `transition.rs`:  End-screen countdown and next-scenario choice.
// - `dedup.rs`:       Optional per-sender StatUpdate de-duplication.
// - `node.rs`:        `MatchNode`, which wires all of the above to the relay.
// - `boundary.rs`:    `MatchDisplay` and `ActorSpawner`, the outward traits.
// - `loopback.rs`:    `LoopbackRelay`, an in-process relay.
// - `testing.rs`:     Recording display/spawner doubles (`testing` feature).
//
// Design decisions:
// - **No globals.** A node owns its relay, display and spawner and is built
//   once per session; two nodes can live in one process.
// - **Single-threaded.** All state changes go through `&mut self` on the
//   node, driven from one loop. No locks.
// - **Full-replace sync.** RosterSync overwrites the replica, so a lost or
//   reordered StatUpdate heals on the next sync.
// - **Explicit frame tick.** `MatchNode::tick(dt)` advances the clock and
//   the end-screen delay; nothing sleeps.

pub mod boundary;
pub mod config;
pub mod dedup;
pub mod leaderboard;
pub mod loopback;
pub mod node;
pub mod phase;
pub mod roster;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timer;
pub mod transition;

pub use boundary::{ActorSpawner, MatchDisplay};
pub use config::{ConfigError, MatchConfig};
pub use leaderboard::LeaderboardRow;
pub use loopback::{LoopbackRelay, OutboundEvent};
pub use node::{MatchNode, SendError};
pub use roster::{ParticipantRecord, Roster};
pub use timer::{AuthoritativeTimer, format_clock};
