//! Phase controller (spec.md §4.3): the per-room state machine, its
//! deadline timers, and the early-completion / timer-expiry paths that
//! must produce identical downstream behavior.

use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use mafia_protocol::Event;
use mafia_protocol::NightOutcome;
use mafia_protocol::Phase;
use mafia_protocol::PhaseAnnouncement;
use mafia_protocol::PlayerId;
use mafia_protocol::Role;
use rand::Rng;

use crate::consts;
use crate::emit::ChatArchive;
use crate::emit::EmitTarget;
use crate::emit::RoomEmit;
use crate::role_assign::assign_roles;
use crate::room::RoomState;

pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("now is after epoch")
        .as_millis() as u64
}

impl RoomState {
    fn announce(&mut self, phase: Phase, message: &str, duration_s: u64) -> RoomEmit {
        self.phase = phase;
        self.phase_started_at_unix_ms = now_unix_ms();
        RoomEmit::new(
            EmitTarget::Room,
            Event::Phase(PhaseAnnouncement {
                phase,
                message: message.into(),
                start_ts_unix_ms: self.phase_started_at_unix_ms,
                duration_s,
            }),
        )
    }

    /// Called from `player_ready` once every roster member is ready.
    /// No-op if the room isn't in `Waiting` (idempotent against
    /// double-triggering from concurrent ready events under the lock).
    pub(crate) fn try_begin_pre_night<R: Rng>(
        &mut self,
        now: Instant,
        rng: &mut R,
    ) -> Vec<RoomEmit> {
        if self.phase != Phase::Waiting || self.players.is_empty() {
            return vec![];
        }

        let roles = assign_roles(
            &self.player_ids(),
            self.settings.killer_count,
            self.settings.doctor_count,
            self.settings.detective_count,
            rng,
        );
        self.assigned_roles = roles;
        self.eliminated.clear();
        self.left.clear();
        self.ready.clear();
        self.detective_used.clear();
        self.votes.clear();
        self.winner = None;
        self.round = 0;

        let mut emits = vec![RoomEmit::new(EmitTarget::Room, Event::RolesAssigned)];

        for player in &self.players {
            let Some(role) = self.assigned_roles.get(&player.id).copied() else {
                continue;
            };
            emits.push(RoomEmit::new(
                EmitTarget::AllConnectionsOf(player.id.clone()),
                Event::YourRole(role),
            ));
        }

        self.phase_deadline = Some(now + Duration::from_secs(consts::PRENIGHT_S));
        emits.push(RoomEmit::new(
            EmitTarget::Room,
            Event::Prestart {
                start_ts_unix_ms: now_unix_ms(),
                duration_s: consts::PRENIGHT_S,
            },
        ));

        emits
    }

    fn enter_night_start(&mut self, now: Instant) -> RoomEmit {
        self.phase_deadline = Some(now + Duration::from_secs(consts::NIGHT_START_S));
        self.announce(Phase::NightStart, "close your eyes", consts::NIGHT_START_S)
    }

    fn enter_killer_phase(&mut self, now: Instant) -> RoomEmit {
        self.night_kill = None;
        let duration = self.settings.killer_duration_s;
        self.phase_deadline = Some(now + Duration::from_secs(duration));
        self.announce(Phase::Killer, "killers, choose your target", duration)
    }

    fn enter_doctor_phase(&mut self, now: Instant) -> RoomEmit {
        self.doctor_save = None;
        let duration = self.settings.doctor_duration_s;
        self.phase_deadline = Some(now + Duration::from_secs(duration));
        self.announce(Phase::Doctor, "doctor, choose who to save", duration)
    }

    fn any_alive_doctor(&self) -> bool {
        self.active_players()
            .any(|id| self.role_of(id) == Some(Role::Doctor))
    }

    /// Ends the Killer phase via either early completion or timer expiry.
    pub(crate) fn end_killer_phase(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::Killer {
            return vec![];
        }
        if self.any_alive_doctor() {
            vec![self.enter_doctor_phase(now)]
        } else {
            self.begin_night_resolve(now)
        }
    }

    /// Ends the Doctor phase via either early completion or timer expiry.
    pub(crate) fn end_doctor_phase(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::Doctor {
            return vec![];
        }
        self.begin_night_resolve(now)
    }

    fn begin_night_resolve(&mut self, now: Instant) -> Vec<RoomEmit> {
        let outcome = self.resolve_night();

        let mut emits = vec![RoomEmit::new(
            EmitTarget::Room,
            Event::NightResult(outcome.clone()),
        )];

        if let NightOutcome::Killed { target, .. } = &outcome {
            self.left.remove(target);
        }

        self.pending_night_outcome = Some(outcome);
        self.day_start_summary_emitted = false;
        self.phase_deadline = Some(now + Duration::from_secs(consts::DAY_START_S));
        emits.push(self.announce(Phase::DayStart, "open your eyes", consts::DAY_START_S));
        emits
    }

    /// Called by the tick when `DayStart`'s deadline has elapsed; chains
    /// two sequential waits under the same visible phase (announce, then
    /// the post-summary pause) so the win check never fires before the
    /// client has seen who died (spec.md §9, the historical ordering bug).
    pub(crate) fn advance_day_start(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::DayStart {
            return vec![];
        }

        if !self.day_start_summary_emitted {
            self.day_start_summary_emitted = true;
            self.phase_deadline = Some(now + Duration::from_secs(consts::NIGHT_SUMMARY_PAUSE_S));
            let outcome = self
                .pending_night_outcome
                .clone()
                .unwrap_or(NightOutcome::None);
            return vec![RoomEmit::new(
                EmitTarget::Room,
                Event::NightSummary { outcome },
            )];
        }

        self.day_start_summary_emitted = false;
        self.pending_night_outcome = None;

        if let Some((winner, killers)) = self.check_win() {
            return self.enter_ended(now, winner, killers);
        }

        let duration = self.settings.discussion_duration_s;
        self.phase_deadline = Some(now + Duration::from_secs(duration));
        vec![self.announce(Phase::Day, "discuss", duration)]
    }

    fn enter_voting(&mut self, now: Instant) -> RoomEmit {
        self.votes.clear();
        let duration = self.settings.voting_duration_s;
        self.phase_deadline = Some(now + Duration::from_secs(duration));
        self.announce(Phase::Voting, "cast your votes", duration)
    }

    /// Called by the tick when `Day`'s discussion timer has elapsed.
    pub(crate) fn end_day_phase(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::Day {
            return vec![];
        }
        vec![self.enter_voting(now)]
    }

    /// Ends the Voting phase via either early completion or timer expiry.
    pub(crate) fn end_voting_phase(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::Voting {
            return vec![];
        }

        let outcome = self.resolve_votes();
        self.phase = Phase::PostVote;
        self.phase_started_at_unix_ms = now_unix_ms();
        self.phase_deadline = Some(now + Duration::from_secs(consts::POSTVOTE_PAUSE_S));

        vec![RoomEmit::new(EmitTarget::Room, Event::VoteResult(outcome))]
    }

    /// Called by the tick when `PostVote`'s display pause has elapsed.
    pub(crate) fn advance_post_vote(&mut self, now: Instant) -> Vec<RoomEmit> {
        if self.phase != Phase::PostVote {
            return vec![];
        }

        if let Some((winner, killers)) = self.check_win() {
            return self.enter_ended(now, winner, killers);
        }

        self.round += 1;
        vec![self.enter_night_start(now)]
    }

    fn enter_ended(
        &mut self,
        now: Instant,
        winner: mafia_protocol::Allegiance,
        living_killers: Vec<PlayerId>,
    ) -> Vec<RoomEmit> {
        self.phase = Phase::Ended;
        self.phase_started_at_unix_ms = now_unix_ms();
        self.reset_deadline = Some(now + Duration::from_secs(consts::ENDED_DISPLAY_S));
        self.phase_deadline = None;

        vec![RoomEmit::new(
            EmitTarget::Room,
            Event::GameOver {
                winner,
                living_killers,
            },
        )]
    }

    /// Resets the room to a fresh `Waiting` state, keeping the roster
    /// (players stay connected across games) but clearing all in-game
    /// state (spec.md §4.7), including the public and team chat history so
    /// a reused room code never leaks the previous game's messages.
    pub(crate) fn reset_for_new_game(&mut self, archive: &dyn ChatArchive) -> Vec<RoomEmit> {
        self.phase = Phase::Waiting;
        self.phase_started_at_unix_ms = now_unix_ms();
        self.phase_deadline = None;
        self.reset_deadline = None;
        self.assigned_roles.clear();
        self.eliminated.clear();
        self.left.clear();
        self.ready.clear();
        self.night_kill = None;
        self.doctor_save = None;
        self.detective_used.clear();
        self.votes.clear();
        self.winner = None;
        self.round = 0;
        self.pending_night_outcome = None;
        self.day_start_summary_emitted = false;

        archive.reset(&self.code);
        archive.reset(&self.killers_subroom());
        archive.reset(&self.doctors_subroom());

        vec![RoomEmit::new(EmitTarget::Room, Event::RoomReset)]
    }

    /// The tick's entry point: advances the phase if its deadline has
    /// elapsed. No-ops otherwise. Timer-expiry and early-completion paths
    /// share the same transition functions, so both produce identical
    /// downstream events (spec.md §4.3's early-completion contract).
    pub(crate) fn tick(&mut self, now: Instant, archive: &dyn ChatArchive) -> Vec<RoomEmit> {
        if self.phase == Phase::Ended {
            if self.reset_deadline.is_some_and(|d| now >= d) {
                return self.reset_for_new_game(archive);
            }
            return vec![];
        }

        let Some(deadline) = self.phase_deadline else {
            return vec![];
        };
        if now < deadline {
            return vec![];
        }

        match self.phase {
            Phase::Waiting => vec![],
            Phase::PreNight => vec![self.enter_night_start(now)],
            Phase::NightStart => vec![self.enter_killer_phase(now)],
            Phase::Killer => self.end_killer_phase(now),
            Phase::Doctor => self.end_doctor_phase(now),
            Phase::DayStart => self.advance_day_start(now),
            Phase::Day => self.end_day_phase(now),
            Phase::Voting => self.end_voting_phase(now),
            Phase::PostVote => self.advance_post_vote(now),
            Phase::Ended => vec![],
        }
    }
}
