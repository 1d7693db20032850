// MatchNode: one participant's replicated view of the match.
//
// Every connected client owns exactly one `MatchNode`. It holds the roster
// replica, the phase machine, the clock (ticking on the authority, a passive
// shadow elsewhere), the end-of-match countdown and the injected relay,
// display and spawner. Whoever owns the node drives it from one thread:
// inbound relay traffic goes to `handle_event` / `handle_server_message`,
// and the frame loop calls `tick(dt)`. Nothing here blocks or locks.
//
// Message flow:
// - Join goes to the authority, which appends a record and answers with a
//   full RosterSync to everyone.
// - StatUpdate is broadcast by whoever observed the kill or death and is
//   applied on receipt by every node, the sender included. Nobody applies a
//   stat change locally before the relay echoes it back.
// - RosterSync and TimerSync are the authority's ground truth. Other nodes
//   overwrite their replica with them; the authority ignores echoes of its
//   own broadcasts.
// - StartNextMatch resets stats and phase on every node, the authority
//   included, when it arrives.
//
// The authority ends the match when the clock runs out or someone reaches
// `kills_to_win`. It flips to Ending and broadcasts RosterSync; every node
// runs its end transition when it first sees Ending.
//
// See also: `roster.rs`, `phase.rs`, `timer.rs`, `transition.rs` for the
// pieces this module wires together, and `boundary.rs` for the traits the
// node notifies.

use skirmish_protocol::event::{
    CodecError, JoinPayload, MatchEvent, RosterSyncPayload, StatUpdatePayload, TimerSyncPayload,
};
use skirmish_protocol::message::ServerMessage;
use skirmish_protocol::relay::{MessageRelay, RelayError};
use skirmish_protocol::types::{MatchPhase, ParticipantId, Recipients, SenderSequence, StatKind};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boundary::{ActorSpawner, MatchDisplay};
use crate::config::MatchConfig;
use crate::dedup::StatDedup;
use crate::leaderboard;
use crate::phase::{self, MatchStateMachine, PhaseChange};
use crate::roster::{AppendOutcome, ParticipantRecord, Roster};
use crate::timer::AuthoritativeTimer;
use crate::transition::{EndCountdown, ScenarioRotation};

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

pub struct MatchNode<R: MessageRelay, D: MatchDisplay, S: ActorSpawner> {
    config: MatchConfig,
    local_id: ParticipantId,
    local_name: String,
    authority_id: ParticipantId,
    roster: Roster,
    phase: MatchStateMachine,
    clock: AuthoritativeTimer,
    end_countdown: EndCountdown,
    scenarios: ScenarioRotation,
    /// Present only when `dedup_stat_updates` is on.
    dedup: Option<StatDedup>,
    next_sequence: SenderSequence,
    /// Set once the end-of-match delay sent us back to the menu.
    left_match: bool,
    relay: R,
    display: D,
    spawner: S,
}

impl<R: MessageRelay, D: MatchDisplay, S: ActorSpawner> MatchNode<R, D, S> {
    pub fn new(
        config: MatchConfig,
        local_id: ParticipantId,
        local_name: impl Into<String>,
        authority_id: ParticipantId,
        relay: R,
        display: D,
        spawner: S,
    ) -> Self {
        let clock = AuthoritativeTimer::new(config.match_length_secs, config.timer_sync_interval_secs);
        let scenarios = ScenarioRotation::new(config.scenario_rotation.clone());
        let dedup = config.dedup_stat_updates.then(StatDedup::new);
        Self {
            local_id,
            local_name: local_name.into(),
            authority_id,
            roster: Roster::new(local_id),
            phase: MatchStateMachine::new(),
            clock,
            end_countdown: EndCountdown::new(),
            scenarios,
            dedup,
            next_sequence: SenderSequence(0),
            left_match: false,
            relay,
            display,
            spawner,
            config,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    pub fn authority_id(&self) -> ParticipantId {
        self.authority_id
    }

    pub fn is_authority(&self) -> bool {
        self.local_id == self.authority_id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase.phase()
    }

    /// Remaining match time: the live clock on the authority, the last
    /// synced value elsewhere.
    pub fn clock(&self) -> &AuthoritativeTimer {
        &self.clock
    }

    /// True after the node left on its own at the end of a match.
    pub fn has_left(&self) -> bool {
        self.left_match
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Records ranked best first.
    pub fn leaderboard(&self) -> Vec<&ParticipantRecord> {
        leaderboard::rank(self.roster.records())
    }

    /// Push the ranked roster into the display's leaderboard table.
    pub fn show_leaderboard(&mut self) {
        self.display.clear_roster();
        for row in leaderboard::rows(self.roster.records()) {
            self.display.set_roster_row(&row.name, row.kills, row.deaths);
        }
    }

    /// Enter the match: spawn the local actor and announce ourselves to the
    /// authority. The authority starts the clock right away.
    pub fn start(&mut self) {
        info!(
            participant = %self.local_id,
            name = %self.local_name,
            authority = self.is_authority(),
            "joining match"
        );
        self.spawner.spawn_local_actor();

        if self.is_authority() {
            self.clock.reset(self.config.match_length_secs);
            if let Some(change) = self.phase.begin() {
                self.apply_phase_change(change);
            }
            self.display.set_timer_visible(true);
            self.display.set_timer_text(&self.clock.display_text());
        } else {
            self.display.set_timer_visible(false);
        }

        let join = MatchEvent::Join(JoinPayload {
            display_name: self.local_name.clone(),
            sender_id: self.local_id,
        });
        self.send_logged(&join, Recipients::AuthorityOnly);
    }

    /// Per-frame update. Runs the end-of-match countdown everywhere and the
    /// clock on the authority.
    pub fn tick(&mut self, dt: f32) {
        if self.end_countdown.tick(dt) {
            self.on_end_delay_elapsed();
        }

        if !(self.is_authority() && self.phase.is_playing()) {
            return;
        }
        let tick = self.clock.tick(dt);
        self.display.set_timer_text(&self.clock.display_text());
        if tick.expired {
            info!("match clock ran out");
            self.end_match();
        }
        if tick.sync_due {
            self.broadcast_timer();
        }
    }

    /// Apply one inbound match event from the relay. Undecodable input is
    /// logged, dropped and returned as the error.
    pub fn handle_event(
        &mut self,
        tag: u8,
        payload: Option<&[u8]>,
        sender: ParticipantId,
    ) -> Result<(), CodecError> {
        let event = match MatchEvent::decode(tag, payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(participant = %sender, tag, error = %e, "dropping match event");
                return Err(e);
            }
        };

        match event {
            MatchEvent::Join(join) => self.on_join(join),
            MatchEvent::RosterSync(sync) => self.on_roster_sync(sync, sender),
            MatchEvent::StatUpdate(update) => self.on_stat_update(update, sender),
            MatchEvent::TimerSync(sync) => self.on_timer_sync(sync),
            MatchEvent::StartNextMatch => self.on_start_next_match(),
        }
        Ok(())
    }

    /// Dispatch any relay message that concerns the match. Handshake
    /// messages and join notices are ignored.
    pub fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Event {
                tag,
                payload,
                sender,
            } => {
                // Already logged inside.
                let _ = self.handle_event(tag, payload.as_deref(), sender);
            }
            ServerMessage::MemberLeft { participant_id, .. } => {
                self.handle_member_left(participant_id);
            }
            ServerMessage::AuthorityChanged { authority_id } => {
                self.handle_authority_changed(authority_id);
            }
            ServerMessage::MemberJoined { member } => {
                debug!(participant = %member.id, name = %member.name, "member joined relay");
            }
            ServerMessage::Welcome { .. } | ServerMessage::Rejected { .. } => {}
        }
    }

    /// The relay reports a participant gone. Every node drops the record;
    /// the authority also broadcasts the corrected roster.
    pub fn handle_member_left(&mut self, id: ParticipantId) {
        if let Some(dedup) = self.dedup.as_mut() {
            dedup.forget(id);
        }
        let Some(removed) = self.roster.remove(id) else {
            return;
        };
        info!(participant = %id, name = %removed.name(), "participant left match");
        if self.is_authority() {
            self.broadcast_roster();
        }
        self.refresh_local_stats();
    }

    /// The relay picked a new authority. If it is us, take over the clock
    /// from the shadow and publish our roster as the new ground truth.
    pub fn handle_authority_changed(&mut self, authority_id: ParticipantId) {
        let was_authority = self.is_authority();
        self.authority_id = authority_id;
        if was_authority || !self.is_authority() {
            return;
        }

        info!(
            remaining = self.clock.remaining_whole_seconds(),
            "taking over as match authority"
        );
        if let Some(change) = self.phase.begin() {
            self.apply_phase_change(change);
        }
        self.display.set_timer_visible(true);
        self.display.set_timer_text(&self.clock.display_text());
        self.broadcast_roster();

        if self.phase.is_ending()
            && self.end_countdown.has_elapsed()
            && self.config.continue_after_match
        {
            self.start_next_match();
        }
    }

    /// The relay connection is gone. Back to the menu, unless we already
    /// went there by leaving.
    pub fn handle_disconnected(&mut self) {
        if self.left_match {
            return;
        }
        warn!(participant = %self.local_id, "lost connection to relay");
        self.end_countdown.cancel();
        self.display.return_to_menu();
    }

    /// Report that `killer` eliminated `victim`: one Kill and one Death.
    pub fn report_elimination(
        &mut self,
        killer: ParticipantId,
        victim: ParticipantId,
    ) -> Result<(), SendError> {
        self.report_kill(killer)?;
        self.report_death(victim)
    }

    pub fn report_kill(&mut self, target: ParticipantId) -> Result<(), SendError> {
        self.send_stat_update(target, StatKind::Kill, 1)
    }

    pub fn report_death(&mut self, target: ParticipantId) -> Result<(), SendError> {
        self.send_stat_update(target, StatKind::Death, 1)
    }

    /// Broadcast a stat change. It takes effect here only when the relay
    /// delivers it back.
    pub fn send_stat_update(
        &mut self,
        target: ParticipantId,
        stat: StatKind,
        delta: i32,
    ) -> Result<(), SendError> {
        let sequence = self.next_sequence;
        self.next_sequence = SenderSequence(sequence.0 + 1);
        let update = MatchEvent::StatUpdate(StatUpdatePayload {
            target_id: target,
            stat,
            delta,
            sequence,
        });
        self.send(&update, Recipients::All)
    }

    fn on_join(&mut self, join: JoinPayload) {
        if !self.is_authority() {
            debug!(participant = %join.sender_id, "ignoring join, not the authority");
            return;
        }
        let outcome = self.roster.append(join.sender_id, join.display_name);
        match outcome {
            AppendOutcome::Added => {
                info!(participant = %join.sender_id, "participant joined match")
            }
            AppendOutcome::AlreadyPresent => {
                debug!(participant = %join.sender_id, "repeated join")
            }
        }
        self.refresh_local_stats();
        self.broadcast_roster();
    }

    fn on_roster_sync(&mut self, sync: RosterSyncPayload, sender: ParticipantId) {
        if self.is_authority() {
            debug!(participant = %sender, "authority ignores roster sync");
            return;
        }
        self.roster.replace_all(sync.participants);
        self.refresh_local_stats();
        if let Some(change) = self.phase.adopt(sync.phase) {
            self.apply_phase_change(change);
        }
        self.check_win_condition();
    }

    fn on_stat_update(&mut self, update: StatUpdatePayload, sender: ParticipantId) {
        if let Some(dedup) = self.dedup.as_mut() {
            if !dedup.accept(sender, update.sequence) {
                debug!(
                    participant = %sender,
                    sequence = update.sequence.0,
                    "dropping duplicate stat update"
                );
                return;
            }
        }

        let Some(change) = self
            .roster
            .apply_stat(update.target_id, update.stat, update.delta)
        else {
            debug!(participant = %update.target_id, "stat update for unknown participant");
            return;
        };
        if change.is_local {
            self.refresh_local_stats();
        }
        self.check_win_condition();
    }

    fn on_timer_sync(&mut self, sync: TimerSyncPayload) {
        if self.is_authority() {
            return;
        }
        self.clock.adopt(sync.remaining_seconds);
        self.display.set_timer_visible(true);
        self.display.set_timer_text(&self.clock.display_text());
        if let Some(change) = self.phase.adopt(sync.phase) {
            self.apply_phase_change(change);
        }
    }

    fn on_start_next_match(&mut self) {
        info!("starting next match");
        self.phase.restart();
        self.roster.reset_stats();
        self.end_countdown.cancel();
        self.display.hide_end_screen();
        self.display.set_input_frozen(false);
        self.spawner.despawn_and_respawn();
        self.refresh_local_stats();

        if self.is_authority() {
            self.clock.reset(self.config.match_length_secs);
            self.display.set_timer_text(&self.clock.display_text());
        }
    }

    /// Detect a winner. Only the authority acts on it.
    fn check_win_condition(&mut self) {
        let Some(winner) = phase::first_winner(&self.roster, self.config.kills_to_win) else {
            return;
        };
        if !self.is_authority() || self.phase.is_ending() {
            return;
        }
        info!(winner = %winner.id(), kills = winner.kills(), "kill threshold reached");
        self.end_match();
    }

    /// Authority only: move to Ending and tell everyone.
    fn end_match(&mut self) {
        if let Some(change) = self.phase.end() {
            self.broadcast_roster();
            self.apply_phase_change(change);
        }
    }

    /// Entry actions for a phase change, run once per change.
    fn apply_phase_change(&mut self, change: PhaseChange) {
        debug!(from = ?change.from, to = ?change.to, "phase changed");
        match (change.from, change.to) {
            (_, MatchPhase::Ending) => self.enter_end_screen(),
            (MatchPhase::Ending, MatchPhase::Playing) => self.leave_end_screen(),
            _ => {}
        }
    }

    fn enter_end_screen(&mut self) {
        self.display.set_input_frozen(true);
        self.display.release_pointer();
        let standings = leaderboard::rows(self.roster.records());
        self.display.show_end_screen(&standings);
        self.display.move_to_overview();
        self.end_countdown.start(self.config.end_screen_delay_secs);
    }

    fn leave_end_screen(&mut self) {
        self.end_countdown.cancel();
        self.display.hide_end_screen();
        self.display.set_input_frozen(false);
    }

    fn on_end_delay_elapsed(&mut self) {
        if !self.config.continue_after_match {
            info!("match over, leaving");
            self.left_match = true;
            self.relay.disconnect();
            self.display.return_to_menu();
            return;
        }
        if self.is_authority() {
            self.start_next_match();
        }
    }

    /// Authority only: load the next scenario and restart everyone.
    fn start_next_match(&mut self) {
        let scenario = self.scenarios.choose_next(self.config.rotate_scenarios);
        info!(scenario = scenario.unwrap_or("<current>"), "loading next scenario");
        self.display.load_scenario(scenario);
        self.send_logged(&MatchEvent::StartNextMatch, Recipients::All);
    }

    fn refresh_local_stats(&mut self) {
        if let Some(record) = self.roster.local_record() {
            self.display.set_local_stats(record.kills(), record.deaths());
        }
    }

    fn broadcast_roster(&mut self) {
        let sync = MatchEvent::RosterSync(RosterSyncPayload {
            phase: self.phase.phase(),
            participants: self.roster.snapshots(),
        });
        self.send_logged(&sync, Recipients::All);
    }

    fn broadcast_timer(&mut self) {
        let sync = MatchEvent::TimerSync(TimerSyncPayload {
            remaining_seconds: self.clock.remaining_whole_seconds(),
            phase: self.phase.phase(),
        });
        self.send_logged(&sync, Recipients::All);
    }

    fn send(&mut self, event: &MatchEvent, recipients: Recipients) -> Result<(), SendError> {
        let encoded = event.encode()?;
        self.relay
            .send(encoded.tag, encoded.payload, recipients, true)?;
        Ok(())
    }

    fn send_logged(&mut self, event: &MatchEvent, recipients: Recipients) {
        if let Err(e) = self.send(event, recipients) {
            warn!(event = ?event.code(), error = %e, "failed to send match event");
        }
    }
}
