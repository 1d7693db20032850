// Session state for the relay.
//
// `Session` is the data structure that `server.rs` drives. It tracks
// connected members, which of them holds the authority role, and routes
// tagged events to recipient groups. All mutation happens through methods
// called from the server's single-threaded main loop, so there is no
// internal locking.
//
// Key responsibilities:
// - Membership: admit members (password, capacity and version checks),
//   assign IDs, broadcast `MemberJoined` / `MemberLeft`.
// - Authority: the first member is the authority. When it leaves, the
//   oldest remaining member takes over and `AuthorityChanged` goes out.
//   IDs are handed out in increasing order, so `BTreeMap` order is join
//   order and "oldest" is simply the first key.
// - Routing: `route_event` forwards an opaque `(tag, payload)` to `All`
//   (sender included), `AuthorityOnly`, or `One(id)`. Events with
//   relay-reserved tags are dropped.
//
// Writing to member streams: each member has a cloned `TcpStream` write half
// in a `BufWriter`. Write errors are logged and otherwise ignored; the
// reader thread for that member sees the broken pipe and reports the
// disconnect.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use skirmish_protocol::framing::send_json;
use skirmish_protocol::message::{MemberInfo, PROTOCOL_VERSION, ServerMessage};
use skirmish_protocol::types::{ParticipantId, Recipients, is_reserved_tag};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a member was refused at the handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinRejection {
    #[error("incorrect password")]
    IncorrectPassword,

    #[error("session is full ({max} members)")]
    SessionFull { max: u32 },

    #[error("protocol version mismatch (relay {expected}, client {actual})")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("display name must not be empty")]
    EmptyName,
}

/// Relay session for a single match room.
pub struct Session {
    pub name: String,
    password: Option<String>,
    authority_id: Option<ParticipantId>,
    members: BTreeMap<ParticipantId, Member>,
    next_participant_id: u32,
    max_members: u32,
}

struct Member {
    name: String,
    writer: BufWriter<TcpStream>,
}

impl Session {
    pub fn new(name: String, password: Option<String>, max_members: u32) -> Self {
        Self {
            name,
            password,
            authority_id: None,
            members: BTreeMap::new(),
            next_participant_id: 1,
            max_members,
        }
    }

    /// Admit a member. Returns the assigned ID, or why the member was
    /// refused.
    ///
    /// Existing members get `MemberJoined` before the newcomer is added; the
    /// newcomer gets `Welcome` with the full member list (itself included).
    pub fn add_member(
        &mut self,
        protocol_version: u32,
        player_name: String,
        session_password: Option<String>,
        stream: TcpStream,
    ) -> Result<ParticipantId, JoinRejection> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(JoinRejection::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: protocol_version,
            });
        }
        if self.password.is_some() && session_password != self.password {
            return Err(JoinRejection::IncorrectPassword);
        }
        if self.members.len() as u32 >= self.max_members {
            return Err(JoinRejection::SessionFull {
                max: self.max_members,
            });
        }
        if player_name.trim().is_empty() {
            return Err(JoinRejection::EmptyName);
        }

        let id = ParticipantId(self.next_participant_id);
        self.next_participant_id += 1;

        let authority_id = *self.authority_id.get_or_insert(id);

        let member = MemberInfo {
            id,
            name: player_name.clone(),
        };
        self.broadcast(&ServerMessage::MemberJoined {
            member: member.clone(),
        });

        self.members.insert(
            id,
            Member {
                name: player_name,
                writer: BufWriter::new(stream),
            },
        );
        info!(session = %self.name, participant = %id, name = %member.name, "member joined");

        let welcome = ServerMessage::Welcome {
            participant_id: id,
            session_name: self.name.clone(),
            authority_id,
            members: self.member_list(),
        };
        self.send_to(id, &welcome);

        Ok(id)
    }

    /// Remove a member, broadcast `MemberLeft`, and hand the authority role
    /// to the oldest remaining member if the leaver held it.
    pub fn remove_member(&mut self, participant_id: ParticipantId) {
        let Some(member) = self.members.remove(&participant_id) else {
            return;
        };
        info!(session = %self.name, participant = %participant_id, "member left");
        self.broadcast(&ServerMessage::MemberLeft {
            participant_id,
            name: member.name,
        });

        if self.authority_id == Some(participant_id) {
            self.authority_id = self.members.keys().next().copied();
            if let Some(authority_id) = self.authority_id {
                info!(session = %self.name, authority = %authority_id, "authority reassigned");
                self.broadcast(&ServerMessage::AuthorityChanged { authority_id });
            }
        }
    }

    /// Forward an event to a recipient group. Returns how many members it
    /// was written to.
    pub fn route_event(
        &mut self,
        sender: ParticipantId,
        tag: u8,
        payload: Option<Vec<u8>>,
        recipients: Recipients,
        guaranteed: bool,
    ) -> usize {
        if is_reserved_tag(tag) {
            warn!(participant = %sender, tag, "dropping event with reserved tag");
            return 0;
        }
        if !self.members.contains_key(&sender) {
            return 0;
        }

        let targets: Vec<ParticipantId> = match recipients {
            Recipients::All => self.members.keys().copied().collect(),
            Recipients::AuthorityOnly => self.authority_id.into_iter().collect(),
            Recipients::One(id) => self
                .members
                .contains_key(&id)
                .then_some(id)
                .into_iter()
                .collect(),
        };
        debug!(
            participant = %sender,
            tag,
            ?recipients,
            guaranteed,
            targets = targets.len(),
            "routing event"
        );

        let msg = ServerMessage::Event {
            tag,
            payload,
            sender,
        };
        for id in &targets {
            self.send_to(*id, &msg);
        }
        targets.len()
    }

    pub fn authority_id(&self) -> Option<ParticipantId> {
        self.authority_id
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Connected members in join order.
    pub fn member_list(&self) -> Vec<MemberInfo> {
        self.members
            .iter()
            .map(|(id, m)| MemberInfo {
                id: *id,
                name: m.name.clone(),
            })
            .collect()
    }

    fn send_to(&mut self, participant_id: ParticipantId, msg: &ServerMessage) {
        if let Some(member) = self.members.get_mut(&participant_id) {
            if let Err(e) = send_json(&mut member.writer, msg) {
                warn!(participant = %participant_id, error = %e, "write to member failed");
            }
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<ParticipantId> = self.members.keys().copied().collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }
}
