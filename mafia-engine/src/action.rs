//! Action router (spec.md §4.4): validates every inbound event against
//! `(phase, role, alive, per-round quota)` and records it.

use std::time::Instant;

use mafia_protocol::ActionRejection;
use mafia_protocol::ChatMessage;
use mafia_protocol::ChatScope;
use mafia_protocol::Event;
use mafia_protocol::GameSettings;
use mafia_protocol::JoinRejection;
use mafia_protocol::Phase;
use mafia_protocol::PlayerId;
use mafia_protocol::PlayerSummary;
use mafia_protocol::Role;
use mafia_protocol::SettingsRejection;
use rand::Rng;

use crate::consts;
use crate::emit::ChatArchive;
use crate::emit::EmitTarget;
use crate::emit::RoomEmit;
use crate::phase::now_unix_ms;
use crate::room::Player;
use crate::room::RoomState;

fn blocked(target: EmitTarget, reason: ActionRejection) -> Vec<RoomEmit> {
    vec![RoomEmit::new(target, Event::ActionBlocked(reason))]
}

impl RoomState {
    pub(crate) fn in_game(&self) -> bool {
        self.phase != Phase::Waiting
    }

    pub(crate) fn room_state_event(&self) -> Event {
        let players = self
            .players
            .iter()
            .map(|p| PlayerSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                alive: self.is_alive(&p.id),
            })
            .collect();

        let alive_role_members = self.in_game().then(|| {
            let mut by_role: std::collections::HashMap<Role, Vec<PlayerId>> =
                std::collections::HashMap::new();
            for id in self.active_players() {
                if let Some(role) = self.role_of(id) {
                    by_role.entry(role).or_default().push(id.clone());
                }
            }
            by_role
        });

        Event::RoomState {
            players,
            host_id: self.host_id.clone(),
            eliminated: self.eliminated.iter().cloned().collect(),
            alive_role_members,
        }
    }

    /// `join_room` (spec.md §4.4). `name` collisions are rejected
    /// case-insensitively (SPEC_FULL §10.5, from the Python
    /// `GameManager.join_game` duplicate-name check).
    pub(crate) fn join_room(
        &mut self,
        connection_id: mafia_protocol::ConnectionId,
        player_id: PlayerId,
        name: &str,
    ) -> Vec<RoomEmit> {
        if self.in_game() && !self.has_player(&player_id) {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::JoinRejected(JoinRejection::GameInProgress),
            )];
        }

        let name_taken = self
            .players
            .iter()
            .any(|p| p.id != player_id && p.name.eq_ignore_ascii_case(name));
        if name_taken {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::JoinRejected(JoinRejection::NameTaken),
            )];
        }

        self.connections.attach(connection_id, player_id.clone());
        self.left.remove(&player_id);

        let mut emits = Vec::new();
        if !self.has_player(&player_id) {
            let player = Player {
                id: player_id.clone(),
                name: name.into(),
            };
            self.players.push(player);
            emits.push(RoomEmit::new(
                EmitTarget::Room,
                Event::PlayerJoined(PlayerSummary {
                    id: player_id.clone(),
                    name: name.into(),
                    alive: true,
                }),
            ));
        }
        self.ensure_host();
        emits.push(RoomEmit::new(EmitTarget::Room, self.room_state_event()));
        emits
    }

    /// `leave_room` (spec.md §4.4, reconciled with invariant 3 — see
    /// DESIGN.md). Outside a game, the player is dropped from the roster
    /// outright; mid-game, they're marked `left` instead so the roster and
    /// win/vote math stay faithful to who's still an actor.
    pub(crate) fn leave_room(&mut self, player_id: &PlayerId) -> Vec<RoomEmit> {
        if !self.has_player(player_id) {
            return vec![];
        }

        self.connections.drop_player(player_id);

        let mut emits = vec![RoomEmit::new(
            EmitTarget::Room,
            Event::PlayerLeft(player_id.clone()),
        )];

        if self.in_game() {
            self.left.insert(player_id.clone());
        } else {
            self.players.retain(|p| p.id != *player_id);
        }
        self.ensure_host();
        emits.push(RoomEmit::new(EmitTarget::Room, self.room_state_event()));
        emits
    }

    /// `player_ready` (spec.md §4.4).
    pub(crate) fn player_ready<R: Rng>(
        &mut self,
        player_id: &PlayerId,
        now: Instant,
        rng: &mut R,
    ) -> Vec<RoomEmit> {
        if self.phase != Phase::Waiting || !self.has_player(player_id) {
            return vec![];
        }

        self.ready.insert(player_id.clone());
        let mut emits = vec![RoomEmit::new(
            EmitTarget::Room,
            Event::ReadyState {
                ready: self.ready.iter().cloned().collect(),
            },
        )];

        let all_ready = !self.players.is_empty()
            && self.players.iter().all(|p| self.ready.contains(&p.id));
        if all_ready {
            emits.extend(self.try_begin_pre_night(now, rng));
        }

        emits
    }

    /// `set_settings` (spec.md §4.4).
    pub(crate) fn set_settings(
        &mut self,
        actor: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        mut new_settings: GameSettings,
    ) -> Vec<RoomEmit> {
        if self.host_id.as_ref() != Some(actor) {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::SettingsRejected(SettingsRejection::NotHost),
            )];
        }
        if self.phase != Phase::Waiting {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::SettingsRejected(SettingsRejection::GameInProgress),
            )];
        }

        new_settings.killer_duration_s = consts::clamp_duration(new_settings.killer_duration_s);
        new_settings.doctor_duration_s = consts::clamp_duration(new_settings.doctor_duration_s);
        new_settings.voting_duration_s = consts::clamp_duration(new_settings.voting_duration_s);
        new_settings.discussion_duration_s =
            consts::clamp_duration(new_settings.discussion_duration_s);

        if new_settings.killer_duration_s < self.settings.killer_duration_s
            || new_settings.doctor_duration_s < self.settings.doctor_duration_s
            || new_settings.voting_duration_s < self.settings.voting_duration_s
            || new_settings.discussion_duration_s < self.settings.discussion_duration_s
        {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::SettingsRejected(SettingsRejection::DurationDecreased),
            )];
        }

        self.settings = new_settings;
        vec![RoomEmit::new(
            EmitTarget::Room,
            Event::SettingsUpdated(new_settings),
        )]
    }

    fn actor_check(
        &self,
        actor: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        expected_phase: Phase,
        expected_role: Role,
    ) -> Result<(), Vec<RoomEmit>> {
        if self.phase != expected_phase {
            return Err(blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::WrongPhase,
            ));
        }
        if self.role_of(actor) != Some(expected_role) {
            return Err(blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::WrongRole,
            ));
        }
        if !self.is_active(actor) {
            return Err(blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::NotAlive,
            ));
        }
        Ok(())
    }

    /// `killer_action` (spec.md §4.4).
    pub(crate) fn killer_action(
        &mut self,
        actor: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        target: Option<PlayerId>,
        now: Instant,
    ) -> Vec<RoomEmit> {
        if let Err(emits) = self.actor_check(actor, connection_id, Phase::Killer, Role::Killer) {
            return emits;
        }
        if self.night_kill.is_some() {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::AlreadyActed,
            );
        }
        if let Some(target) = &target {
            if !self.has_player(target) {
                return blocked(
                    EmitTarget::Connection(connection_id),
                    ActionRejection::InvalidTarget,
                );
            }
            if self.role_of(target) == Some(Role::Killer) {
                return blocked(
                    EmitTarget::Connection(connection_id),
                    ActionRejection::KillerCannotTargetKiller,
                );
            }
        }

        self.night_kill = Some(crate::room::NightAction {
            actor: actor.clone(),
            target,
        });

        let mut emits = vec![RoomEmit::new(
            EmitTarget::Connection(connection_id),
            Event::ActionAccepted,
        )];
        emits.extend(self.end_killer_phase(now));
        emits
    }

    /// `doctor_action` (spec.md §4.4).
    pub(crate) fn doctor_action(
        &mut self,
        actor: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        target: Option<PlayerId>,
        now: Instant,
    ) -> Vec<RoomEmit> {
        if let Err(emits) = self.actor_check(actor, connection_id, Phase::Doctor, Role::Doctor) {
            return emits;
        }
        if self.doctor_save.is_some() {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::AlreadyActed,
            );
        }
        if let Some(target) = &target
            && !self.has_player(target)
        {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::InvalidTarget,
            );
        }

        self.doctor_save = Some(crate::room::NightAction {
            actor: actor.clone(),
            target,
        });

        let mut emits = vec![RoomEmit::new(
            EmitTarget::Connection(connection_id),
            Event::ActionAccepted,
        )];
        emits.extend(self.end_doctor_phase(now));
        emits
    }

    /// `detective_action` (spec.md §4.4).
    pub(crate) fn detective_action(
        &mut self,
        actor: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        target: PlayerId,
    ) -> Vec<RoomEmit> {
        let in_night_phase = matches!(
            self.phase,
            Phase::PreNight | Phase::NightStart | Phase::Killer | Phase::Doctor
        );
        if !in_night_phase {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::WrongPhase,
            );
        }
        if self.role_of(actor) != Some(Role::Detective) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::WrongRole,
            );
        }
        if !self.is_active(actor) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::NotAlive,
            );
        }
        if self.detective_used.contains(actor) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::DetectiveAlreadyUsed,
            );
        }
        if !self.has_player(&target) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::InvalidTarget,
            );
        }

        self.detective_used.insert(actor.clone());
        let is_killer = self.role_of(&target) == Some(Role::Killer);

        vec![RoomEmit::new(
            EmitTarget::Connection(connection_id),
            Event::DetectiveResult { target, is_killer },
        )]
    }

    /// `cast_vote` (spec.md §4.4).
    pub(crate) fn cast_vote(
        &mut self,
        voter: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        target: Option<PlayerId>,
        now: Instant,
    ) -> Vec<RoomEmit> {
        if self.phase != Phase::Voting {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::WrongPhase,
            );
        }
        if !self.has_player(voter) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::InvalidTarget,
            );
        }
        if !self.is_active(voter) {
            return blocked(
                EmitTarget::Connection(connection_id),
                ActionRejection::NotAlive,
            );
        }
        if let Some(target) = &target {
            if target == voter {
                return blocked(
                    EmitTarget::Connection(connection_id),
                    ActionRejection::VoterCannotTargetSelf,
                );
            }
            if !self.has_player(target) {
                return blocked(
                    EmitTarget::Connection(connection_id),
                    ActionRejection::InvalidTarget,
                );
            }
            if self.role_of(voter) == Some(Role::Killer) && self.role_of(target) == Some(Role::Killer) {
                return blocked(
                    EmitTarget::Connection(connection_id),
                    ActionRejection::KillerCannotTargetKiller,
                );
            }
        }

        self.votes.insert(voter.clone(), target.clone());

        let mut emits = vec![RoomEmit::new(
            EmitTarget::Room,
            Event::VoteCast {
                voter: voter.clone(),
                target,
            },
        )];

        let all_voted = self.active_players().all(|id| self.votes.contains_key(id));
        if all_voted {
            emits.extend(self.end_voting_phase(now));
        }

        emits
    }

    /// `send_message` / chat gate dispatch (spec.md §4.8).
    pub(crate) fn send_message(
        &mut self,
        sender: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
        scope: ChatScope,
        text: &str,
        archive: &dyn ChatArchive,
    ) -> Vec<RoomEmit> {
        let Ok(scope) = self.gate_chat(sender, scope) else {
            return vec![RoomEmit::new(
                EmitTarget::Connection(connection_id),
                Event::ChatBlocked,
            )];
        };

        let sender_name = self.player_name(sender).unwrap_or_else(|| sender.as_str().into());
        let message = ChatMessage {
            scope,
            sender: sender.clone(),
            sender_name,
            text: text.into(),
            ts_unix_ms: now_unix_ms(),
        };

        let (archive_room, emit_target) = match scope {
            ChatScope::Public => (self.code.clone(), EmitTarget::Room),
            ChatScope::Killers => (self.killers_subroom(), EmitTarget::SubRoom(self.killers_subroom())),
            ChatScope::Doctors => (self.doctors_subroom(), EmitTarget::SubRoom(self.doctors_subroom())),
        };
        archive.append(&archive_room, &message);

        vec![RoomEmit::new(emit_target, Event::NewMessage(message))]
    }

    /// `time_sync` (spec.md §4.4).
    pub(crate) fn time_sync(&self, connection_id: mafia_protocol::ConnectionId) -> Vec<RoomEmit> {
        vec![RoomEmit::new(
            EmitTarget::Connection(connection_id),
            Event::TimeSyncResponse {
                server_now_unix_ms: now_unix_ms(),
            },
        )]
    }

    /// `get_game_state`, listed among inbound events in spec.md §6.
    pub(crate) fn get_game_state(
        &self,
        requester: &PlayerId,
        connection_id: mafia_protocol::ConnectionId,
    ) -> Vec<RoomEmit> {
        vec![RoomEmit::new(
            EmitTarget::Connection(connection_id),
            Event::GameStateUpdate {
                phase: self.phase,
                your_role: self.role_of(requester),
            },
        )]
    }

    /// Applies the connection registry's expired pending removals: the
    /// grace window lapsed, so the player is finally dropped (spec.md §4.1).
    pub(crate) fn expire_disconnects(&mut self, now: Instant) -> Vec<RoomEmit> {
        let expired = self.connections.expire_pending_removals(now);
        let mut emits = Vec::new();
        for player_id in expired {
            if !self.has_player(&player_id) {
                continue;
            }
            emits.push(RoomEmit::new(
                EmitTarget::Room,
                Event::PlayerLeft(player_id.clone()),
            ));
            if self.in_game() {
                self.left.insert(player_id);
            } else {
                self.players.retain(|p| p.id != player_id);
            }
        }
        if !emits.is_empty() {
            self.ensure_host();
            emits.push(RoomEmit::new(EmitTarget::Room, self.room_state_event()));
        }
        emits
    }
}

#[cfg(test)]
mod tests {
    use mafia_protocol::ConnectionId;
    use mafia_protocol::RoomCode;

    use super::*;
    use crate::emit::InMemoryChatArchive;

    fn state_with_killer_doctor() -> RoomState {
        let mut state = RoomState::new(RoomCode::new("ABCDEF"));
        for name in ["a", "b", "c"] {
            state.players.push(Player {
                id: PlayerId::new(name),
                name: name.into(),
            });
        }
        state.assigned_roles.insert(PlayerId::new("a"), Role::Killer);
        state.assigned_roles.insert(PlayerId::new("b"), Role::Doctor);
        state.assigned_roles.insert(PlayerId::new("c"), Role::Civilian);
        state.phase = Phase::Killer;
        state
    }

    #[test]
    fn killer_action_blocks_targeting_another_killer() {
        let mut state = state_with_killer_doctor();
        state.assigned_roles.insert(PlayerId::new("c"), Role::Killer);
        let emits = state.killer_action(
            &PlayerId::new("a"),
            ConnectionId(1),
            Some(PlayerId::new("c")),
            Instant::now(),
        );
        assert!(matches!(
            emits[0].event,
            Event::ActionBlocked(ActionRejection::KillerCannotTargetKiller)
        ));
        assert!(state.night_kill.is_none());
    }

    #[test]
    fn killer_action_advances_to_doctor_when_doctor_alive() {
        let mut state = state_with_killer_doctor();
        let emits = state.killer_action(
            &PlayerId::new("a"),
            ConnectionId(1),
            Some(PlayerId::new("c")),
            Instant::now(),
        );
        assert_eq!(state.phase, Phase::Doctor);
        assert!(emits.iter().any(|e| matches!(e.event, Event::ActionAccepted)));
    }

    #[test]
    fn killer_action_rejects_resubmission_without_overwriting_first() {
        let mut state = state_with_killer_doctor();
        let now = Instant::now();
        state.killer_action(&PlayerId::new("a"), ConnectionId(1), Some(PlayerId::new("c")), now);
        let recorded = state.night_kill.clone();

        // By the time a second submission could be processed, the phase
        // has already advanced past Killer — rejected as WrongPhase
        // rather than overwriting `night_kill`.
        let emits = state.killer_action(&PlayerId::new("a"), ConnectionId(1), None, now);
        assert!(matches!(
            emits[0].event,
            Event::ActionBlocked(ActionRejection::WrongPhase)
        ));
        assert_eq!(state.night_kill, recorded);
    }

    #[test]
    fn killer_action_blocks_resubmission_within_same_phase() {
        // Guards the precondition literally: if `night_kill` is already
        // set while still in `Killer` (defensive; unreachable through the
        // router alone since acceptance always exits the phase), the
        // action is blocked rather than overwriting the first.
        let mut state = state_with_killer_doctor();
        state.night_kill = Some(crate::room::NightAction {
            actor: PlayerId::new("a"),
            target: Some(PlayerId::new("c")),
        });
        let emits = state.killer_action(&PlayerId::new("a"), ConnectionId(1), None, Instant::now());
        assert!(matches!(
            emits[0].event,
            Event::ActionBlocked(ActionRejection::AlreadyActed)
        ));
    }

    #[test]
    fn leave_mid_game_marks_left_not_removed() {
        let mut state = state_with_killer_doctor();
        state.leave_room(&PlayerId::new("c"));
        assert!(state.has_player(&PlayerId::new("c")));
        assert!(state.left.contains(&PlayerId::new("c")));
        assert!(!state.is_active(&PlayerId::new("c")));
    }

    #[test]
    fn leave_lobby_removes_from_roster() {
        let mut state = state_with_killer_doctor();
        state.phase = Phase::Waiting;
        state.leave_room(&PlayerId::new("c"));
        assert!(!state.has_player(&PlayerId::new("c")));
    }

    #[test]
    fn chat_blocked_routed_privately() {
        let mut state = state_with_killer_doctor();
        state.phase = Phase::Killer;
        let archive = InMemoryChatArchive::new();
        let emits = state.send_message(
            &PlayerId::new("c"),
            ConnectionId(1),
            ChatScope::Public,
            "hi",
            &archive,
        );
        assert!(matches!(emits[0].event, Event::ChatBlocked));
    }

    #[test]
    fn public_chat_persists_under_room_code() {
        let mut state = state_with_killer_doctor();
        state.phase = Phase::Day;
        let archive = InMemoryChatArchive::new();
        state.send_message(&PlayerId::new("c"), ConnectionId(1), ChatScope::Public, "hi", &archive);
        assert_eq!(archive.recent(&RoomCode::new("ABCDEF"), 10).len(), 1);
    }

    #[test]
    fn cast_vote_rejects_unregistered_voter() {
        let mut state = state_with_killer_doctor();
        state.phase = Phase::Voting;
        let emits = state.cast_vote(
            &PlayerId::new("ghost"),
            ConnectionId(9),
            Some(PlayerId::new("a")),
            Instant::now(),
        );
        assert!(matches!(
            emits[0].event,
            Event::ActionBlocked(ActionRejection::InvalidTarget)
        ));
        assert!(!state.votes.contains_key(&PlayerId::new("ghost")));
    }

    #[test]
    fn cast_vote_rejects_unregistered_target() {
        let mut state = state_with_killer_doctor();
        state.phase = Phase::Voting;
        let emits = state.cast_vote(
            &PlayerId::new("a"),
            ConnectionId(1),
            Some(PlayerId::new("ghost")),
            Instant::now(),
        );
        assert!(matches!(
            emits[0].event,
            Event::ActionBlocked(ActionRejection::InvalidTarget)
        ));
        assert!(!state.votes.contains_key(&PlayerId::new("a")));
    }

    #[test]
    fn reset_for_new_game_clears_all_three_chat_keys() {
        let mut state = state_with_killer_doctor();
        let archive = InMemoryChatArchive::new();
        state.send_message(&PlayerId::new("c"), ConnectionId(1), ChatScope::Public, "hi", &archive);
        archive.append(
            &state.killers_subroom(),
            &ChatMessage {
                scope: ChatScope::Killers,
                sender: PlayerId::new("a"),
                sender_name: "a".into(),
                text: "kill c".into(),
                ts_unix_ms: 0,
            },
        );
        archive.append(
            &state.doctors_subroom(),
            &ChatMessage {
                scope: ChatScope::Doctors,
                sender: PlayerId::new("b"),
                sender_name: "b".into(),
                text: "save c".into(),
                ts_unix_ms: 0,
            },
        );

        state.reset_for_new_game(&archive);

        assert!(archive.recent(&state.code, 10).is_empty());
        assert!(archive.recent(&state.killers_subroom(), 10).is_empty());
        assert!(archive.recent(&state.doctors_subroom(), 10).is_empty());
    }
}
