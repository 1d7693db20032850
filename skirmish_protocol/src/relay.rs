// The send half of the relay contract, as seen by the match core.
//
// `skirmish_match::MatchNode` only ever talks to the network through this
// trait. The TCP `NetClient` in `skirmish_relay` implements it, and so does
// the in-process `LoopbackRelay` used for offline play and tests. The receive
// half is push-based: whoever owns the node drains inbound traffic and calls
// `MatchNode::handle_event(tag, payload, sender)`.
//
// Delivery contract for `guaranteed = true`: delivered at most once per
// message, in send order per sender. Nothing is promised for
// `guaranteed = false`.

use thiserror::Error;

use crate::framing::FrameError;
use crate::types::Recipients;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("not connected to the relay")]
    Disconnected,

    #[error("tag {0} is reserved for the relay")]
    ReservedTag(u8),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Outbound side of the relay.
pub trait MessageRelay {
    /// Queue a tagged payload for the given recipient group. Never blocks on
    /// the recipients.
    fn send(
        &mut self,
        tag: u8,
        payload: Option<Vec<u8>>,
        recipients: Recipients,
        guaranteed: bool,
    ) -> Result<(), RelayError>;

    /// Leave the shared session. Further sends fail with `Disconnected`.
    fn disconnect(&mut self);
}
