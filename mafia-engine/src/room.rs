//! Room data model (spec.md §3) and the per-room serializer (spec.md §5).

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use mafia_protocol::Allegiance;
use mafia_protocol::GameSettings;
use mafia_protocol::NightOutcome;
use mafia_protocol::Phase;
use mafia_protocol::PlayerId;
use mafia_protocol::PlayerStatus;
use mafia_protocol::Role;
use mafia_protocol::RoomCode;

use crate::connection::ConnectionRegistry;

/// A single night action: a killer's target or a doctor's save. A skip is
/// represented by `target: None`, matching the wire-level
/// `killer_action(target | skip)` / `doctor_action(target | skip)` actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NightAction {
    pub(crate) actor: PlayerId,
    pub(crate) target: Option<PlayerId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: std::sync::Arc<str>,
}

/// Everything that lives behind the room's single-writer lock (spec.md §5:
/// "gate every Room mutation behind a single serializer").
pub(crate) struct RoomState {
    pub(crate) code: RoomCode,
    pub(crate) players: Vec<Player>,
    pub(crate) host_id: Option<PlayerId>,
    pub(crate) phase: Phase,
    pub(crate) settings: GameSettings,
    pub(crate) eliminated: HashSet<PlayerId>,
    /// Players who explicitly left mid-game. Kept distinct from
    /// `eliminated` (see DESIGN.md "leave during an active game"): they
    /// are not revealed as a role-bearing death, just removed from future
    /// participation while remaining visible in the roster for UI parity
    /// with invariant 3.
    pub(crate) left: HashSet<PlayerId>,
    pub(crate) assigned_roles: HashMap<PlayerId, Role>,
    pub(crate) ready: HashSet<PlayerId>,
    pub(crate) night_kill: Option<NightAction>,
    pub(crate) doctor_save: Option<NightAction>,
    pub(crate) detective_used: HashSet<PlayerId>,
    pub(crate) votes: HashMap<PlayerId, Option<PlayerId>>,
    pub(crate) winner: Option<Allegiance>,
    pub(crate) round: usize,
    /// Deadline for the current phase's timer, if it has one. Cleared on
    /// early completion; a later tick observing a cleared/replaced
    /// deadline is the "cancellation" the spec calls for (spec.md §4.3,
    /// §5: no separate task handle to abort, just state the tick rechecks).
    pub(crate) phase_deadline: Option<Instant>,
    pub(crate) phase_started_at_unix_ms: u64,
    pub(crate) connections: ConnectionRegistry,
    /// Deadline the `Ended` phase resets at.
    pub(crate) reset_deadline: Option<Instant>,
    /// Night outcome awaiting display once `DayStart`'s announce window
    /// elapses (spec.md §9: summary must be shown before the win check).
    pub(crate) pending_night_outcome: Option<NightOutcome>,
    /// Whether `DayStart`'s night-summary sub-step has already fired,
    /// distinguishing it from the initial "open your eyes" announce.
    pub(crate) day_start_summary_emitted: bool,
}

impl RoomState {
    pub(crate) fn new(code: RoomCode) -> Self {
        Self {
            code,
            players: Vec::new(),
            host_id: None,
            phase: Phase::Waiting,
            settings: GameSettings::default(),
            eliminated: HashSet::new(),
            left: HashSet::new(),
            assigned_roles: HashMap::new(),
            ready: HashSet::new(),
            night_kill: None,
            doctor_save: None,
            detective_used: HashSet::new(),
            votes: HashMap::new(),
            winner: None,
            round: 0,
            phase_deadline: None,
            phase_started_at_unix_ms: 0,
            connections: ConnectionRegistry::new(),
            reset_deadline: None,
            pending_night_outcome: None,
            day_start_summary_emitted: false,
        }
    }

    pub(crate) fn killers_subroom(&self) -> RoomCode {
        RoomCode::new(format!("{}__killers", self.code.as_str()))
    }

    pub(crate) fn doctors_subroom(&self) -> RoomCode {
        RoomCode::new(format!("{}__doctors", self.code.as_str()))
    }

    pub(crate) fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub(crate) fn has_player(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| p.id == *id)
    }

    pub(crate) fn player_name(&self, id: &PlayerId) -> Option<std::sync::Arc<str>> {
        self.players.iter().find(|p| p.id == *id).map(|p| p.name.clone())
    }

    pub(crate) fn status_of(&self, id: &PlayerId) -> PlayerStatus {
        if self.eliminated.contains(id) {
            PlayerStatus::Eliminated
        } else {
            PlayerStatus::Alive
        }
    }

    pub(crate) fn is_alive(&self, id: &PlayerId) -> bool {
        self.status_of(id) == PlayerStatus::Alive
    }

    /// A player who can still act: alive, present in the roster, and
    /// hasn't explicitly left mid-game.
    pub(crate) fn is_active(&self, id: &PlayerId) -> bool {
        self.is_alive(id) && !self.left.contains(id)
    }

    pub(crate) fn active_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players
            .iter()
            .map(|p| &p.id)
            .filter(|id| self.is_active(id))
    }

    pub(crate) fn role_of(&self, id: &PlayerId) -> Option<Role> {
        self.assigned_roles.get(id).copied()
    }

    pub(crate) fn allegiance_of(&self, id: &PlayerId) -> Allegiance {
        self.role_of(id)
            .map(|r| r.allegiance())
            .unwrap_or(Allegiance::Civilians)
    }

    /// Promotes the first remaining player to host if the current host is
    /// gone (left the roster, or was never set).
    pub(crate) fn ensure_host(&mut self) {
        if let Some(host) = &self.host_id
            && self.has_player(host)
        {
            return;
        }
        self.host_id = self.players.first().map(|p| p.id.clone());
    }

    pub(crate) fn living_by_allegiance(&self, allegiance: Allegiance) -> Vec<PlayerId> {
        self.active_players()
            .filter(|id| self.allegiance_of(id) == allegiance)
            .cloned()
            .collect()
    }
}

/// A room, identified by its code, guarding its [`RoomState`] behind a
/// single mutex: "the contract is that no two operations on the same Room
/// interleave" (spec.md §5).
pub struct Room {
    pub(crate) state: Mutex<RoomState>,
}

impl Room {
    pub(crate) fn new(code: RoomCode) -> Self {
        Self {
            state: Mutex::new(RoomState::new(code)),
        }
    }
}
