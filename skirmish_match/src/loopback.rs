// In-process relay that queues outbound events instead of sending them.
//
// Used for offline play (a single node that is its own authority) and by
// tests that route events between several nodes by hand. The owner drains
// `take_outbox()` and delivers each event to the right nodes' `handle_event`,
// the sender included for `Recipients::All`.

use skirmish_protocol::relay::{MessageRelay, RelayError};
use skirmish_protocol::types::{Recipients, is_reserved_tag};

/// One queued send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEvent {
    pub tag: u8,
    pub payload: Option<Vec<u8>>,
    pub recipients: Recipients,
    pub guaranteed: bool,
}

#[derive(Debug)]
pub struct LoopbackRelay {
    outbox: Vec<OutboundEvent>,
    connected: bool,
}

impl Default for LoopbackRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackRelay {
    pub fn new() -> Self {
        Self {
            outbox: Vec::new(),
            connected: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Events sent since the last drain, oldest first.
    pub fn outbox(&self) -> &[OutboundEvent] {
        &self.outbox
    }

    pub fn take_outbox(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }
}

impl MessageRelay for LoopbackRelay {
    fn send(
        &mut self,
        tag: u8,
        payload: Option<Vec<u8>>,
        recipients: Recipients,
        guaranteed: bool,
    ) -> Result<(), RelayError> {
        if is_reserved_tag(tag) {
            return Err(RelayError::ReservedTag(tag));
        }
        if !self.connected {
            return Err(RelayError::Disconnected);
        }
        self.outbox.push(OutboundEvent {
            tag,
            payload,
            recipients,
            guaranteed,
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.outbox.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_in_send_order() {
        let mut relay = LoopbackRelay::new();
        relay.send(1, Some(vec![1]), Recipients::All, true).unwrap();
        relay
            .send(0, None, Recipients::AuthorityOnly, true)
            .unwrap();
        let out = relay.take_outbox();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].tag, 1);
        assert_eq!(out[1].recipients, Recipients::AuthorityOnly);
        assert!(relay.outbox().is_empty());
    }

    #[test]
    fn reserved_tag_is_refused() {
        let mut relay = LoopbackRelay::new();
        let err = relay.send(250, None, Recipients::All, true).unwrap_err();
        assert!(matches!(err, RelayError::ReservedTag(250)));
    }

    #[test]
    fn send_after_disconnect_fails() {
        let mut relay = LoopbackRelay::new();
        relay.disconnect();
        assert!(!relay.is_connected());
        let err = relay.send(2, None, Recipients::All, true).unwrap_err();
        assert!(matches!(err, RelayError::Disconnected));
    }
}
