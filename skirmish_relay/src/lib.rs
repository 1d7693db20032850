// skirmish_relay: the message relay for Skirmish matches.
//
// The relay is a thin broker: it accepts TCP connections, admits members,
// decides which member holds the authority role, and forwards opaque tagged
// events to recipient groups. It never runs match logic; roster, phase and
// clock all live in `skirmish_match` on the clients.
//
// Module overview:
// - `session.rs`:  Membership, authority assignment/hand-off, event routing.
// - `server.rs`:   TCP listener, per-member reader threads, and the main
//                  event loop that funnels everything into `Session`.
// - `client.rs`:   `NetClient`, the game-side connection. Implements
//                  `MessageRelay` so a `MatchNode` can own it.
//
// The relay runs standalone (`main.rs`) or embedded via `start_relay`.

pub mod client;
pub mod server;
pub mod session;

pub use client::{ClientError, NetClient, WelcomeInfo};
pub use server::{RelayConfig, RelayHandle, start_relay};
pub use session::{JoinRejection, Session};
