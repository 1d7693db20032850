// Test harness for multi-node match scenarios.
//
// Two ways to put several `MatchNode`s in one room:
// - `LoopbackHub` keeps N nodes in process, each with a `LoopbackRelay`, and
//   routes their outboxes by recipient group the way the relay does. It can
//   drop or duplicate deliveries to exercise the sync rules.
// - `TestMatchClient` wraps a real `NetClient` (from `skirmish_relay`) in a
//   `MatchNode` and talks to a real relay over TCP.
//
// The only test-specific code is routing and the synchronous polling
// wrappers. Match logic runs through the same `MatchNode` code as a game
// client.
//
// See also: `tests/convergence.rs` (hub scenarios) and
// `tests/full_pipeline.rs` (real relay).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use skirmish_match::loopback::OutboundEvent;
use skirmish_match::testing::{RecordingDisplay, RecordingSpawner};
use skirmish_match::{LoopbackRelay, MatchConfig, MatchNode};
use skirmish_protocol::event::ParticipantSnapshot;
use skirmish_protocol::relay::MessageRelay;
use skirmish_protocol::types::{MatchPhase, ParticipantId, Recipients};
use skirmish_relay::client::NetClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Routing rounds before `pump` assumes the nodes are ping-ponging forever.
const MAX_PUMP_ROUNDS: usize = 64;

pub type HubNode = MatchNode<LoopbackRelay, RecordingDisplay, RecordingSpawner>;
pub type NetNode = MatchNode<NetClient, RecordingDisplay, RecordingSpawner>;

/// In-process room: assigns IDs, picks the authority and routes events.
pub struct LoopbackHub {
    config: MatchConfig,
    nodes: BTreeMap<ParticipantId, HubNode>,
    next_id: u32,
    authority_id: Option<ParticipantId>,
    duplicate_deliveries: bool,
    /// `(recipient, tag)` pairs whose next delivery is silently dropped.
    lost: Vec<(ParticipantId, u8)>,
}

impl LoopbackHub {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            next_id: 1,
            authority_id: None,
            duplicate_deliveries: false,
            lost: Vec::new(),
        }
    }

    /// Add a node, start it and deliver everything that follows. The first
    /// node to join is the authority.
    pub fn join(&mut self, name: &str) -> ParticipantId {
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        let authority_id = *self.authority_id.get_or_insert(id);

        let mut node = MatchNode::new(
            self.config.clone(),
            id,
            name,
            authority_id,
            LoopbackRelay::new(),
            RecordingDisplay::default(),
            RecordingSpawner::default(),
        );
        node.start();
        self.nodes.insert(id, node);
        self.pump();
        id
    }

    /// Remove a node the way the relay does: `MemberLeft` to everyone left,
    /// then `AuthorityChanged` if the authority was the one leaving.
    pub fn leave(&mut self, id: ParticipantId) {
        self.nodes.remove(&id);
        for node in self.nodes.values_mut() {
            node.handle_member_left(id);
        }
        if self.authority_id == Some(id) {
            self.authority_id = self.nodes.keys().next().copied();
            if let Some(authority_id) = self.authority_id {
                for node in self.nodes.values_mut() {
                    node.handle_authority_changed(authority_id);
                }
            }
        }
        self.pump();
    }

    /// Tick every node by `dt`, then deliver what they sent.
    pub fn tick_all(&mut self, dt: f32) {
        for node in self.nodes.values_mut() {
            node.tick(dt);
        }
        self.pump();
    }

    /// Deliver every event twice from now on.
    pub fn set_duplicate_deliveries(&mut self, on: bool) {
        self.duplicate_deliveries = on;
    }

    /// Drop the next event with `tag` addressed to `to`.
    pub fn lose_next_delivery(&mut self, to: ParticipantId, tag: u8) {
        self.lost.push((to, tag));
    }

    /// Route queued events until no node has anything left to send.
    pub fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let mut queue: Vec<(ParticipantId, OutboundEvent)> = Vec::new();
            for (id, node) in self.nodes.iter_mut() {
                queue.extend(node.relay_mut().take_outbox().into_iter().map(|out| (*id, out)));
            }
            if queue.is_empty() {
                return;
            }
            for (sender, out) in queue {
                self.deliver(sender, &out);
            }
        }
        panic!("hub did not settle after {MAX_PUMP_ROUNDS} rounds");
    }

    fn deliver(&mut self, sender: ParticipantId, out: &OutboundEvent) {
        let targets: Vec<ParticipantId> = match out.recipients {
            Recipients::All => self.nodes.keys().copied().collect(),
            Recipients::AuthorityOnly => self.authority_id.into_iter().collect(),
            Recipients::One(id) => vec![id],
        };
        let copies = if self.duplicate_deliveries { 2 } else { 1 };

        for to in targets {
            if let Some(pos) = self
                .lost
                .iter()
                .position(|&(id, tag)| id == to && tag == out.tag)
            {
                self.lost.remove(pos);
                continue;
            }
            let Some(node) = self.nodes.get_mut(&to) else {
                continue;
            };
            for _ in 0..copies {
                node.handle_event(out.tag, out.payload.as_deref(), sender)
                    .expect("hub delivered an undecodable event");
            }
        }
    }

    pub fn authority_id(&self) -> Option<ParticipantId> {
        self.authority_id
    }

    pub fn node(&self, id: ParticipantId) -> &HubNode {
        self.nodes.get(&id).expect("no such node")
    }

    pub fn node_mut(&mut self, id: ParticipantId) -> &mut HubNode {
        self.nodes.get_mut(&id).expect("no such node")
    }

    pub fn nodes(&self) -> impl Iterator<Item = &HubNode> {
        self.nodes.values()
    }

    /// True when every node holds the same roster and phase.
    pub fn converged(&self) -> bool {
        let mut views = self
            .nodes
            .values()
            .map(|n| (n.phase(), n.roster().snapshots()));
        let Some(first) = views.next() else {
            return true;
        };
        views.all(|view| view == first)
    }

    /// The authority's roster, which every converged node matches.
    pub fn authority_roster(&self) -> Vec<ParticipantSnapshot> {
        self.authority_id
            .map(|id| self.node(id).roster().snapshots())
            .unwrap_or_default()
    }

    pub fn phases(&self) -> Vec<MatchPhase> {
        self.nodes.values().map(|n| n.phase()).collect()
    }
}

/// A match client on a real relay connection.
pub struct TestMatchClient {
    node: NetNode,
    disconnect_handled: bool,
}

impl TestMatchClient {
    /// Connect, handshake and start the match node.
    pub fn connect(addr: SocketAddr, name: &str, config: &MatchConfig) -> Self {
        let (client, welcome) = NetClient::connect(&addr.to_string(), name, None)
            .expect("TestMatchClient::connect failed");
        let mut node = MatchNode::new(
            config.clone(),
            welcome.participant_id,
            name,
            welcome.authority_id,
            client,
            RecordingDisplay::default(),
            RecordingSpawner::default(),
        );
        node.start();
        Self {
            node,
            disconnect_handled: false,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.node.local_id()
    }

    pub fn node(&self) -> &NetNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut NetNode {
        &mut self.node
    }

    /// Non-blocking: hand every pending relay message to the node. Returns
    /// how many were processed.
    pub fn pump(&mut self) -> usize {
        let messages = self.node.relay_mut().poll();
        let count = messages.len();
        for msg in messages {
            self.node.handle_server_message(msg);
        }
        if !self.disconnect_handled && !self.node.relay().is_connected() {
            self.disconnect_handled = true;
            self.node.handle_disconnected();
        }
        count
    }

    /// Blocking pump until `done` holds for the node.
    pub fn poll_until(&mut self, what: &str, done: impl Fn(&NetNode) -> bool) {
        let start = Instant::now();
        loop {
            self.pump();
            if done(&self.node) {
                return;
            }
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.node.tick(dt);
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        self.disconnect_handled = true;
        self.node.relay_mut().disconnect();
    }
}
