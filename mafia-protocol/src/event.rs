//! Outbound events and the chat/broadcast scopes they travel through.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::ids::PlayerId;
use crate::phase::Phase;
use crate::role::Allegiance;
use crate::role::Role;
use crate::settings::GameSettings;

/// Scope a chat message (or a team-only phase announcement) is restricted to.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ChatScope {
    Public,
    Killers,
    Doctors,
}

/// A single chat message.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub scope: ChatScope,
    pub sender: PlayerId,
    pub sender_name: Arc<str>,
    pub text: Arc<str>,
    pub ts_unix_ms: u64,
}

/// Public roster entry, as seen in a `room_state` payload.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: Arc<str>,
    pub alive: bool,
}

/// A phase announcement, always carrying the server's authoritative clock.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PhaseAnnouncement {
    pub phase: Phase,
    pub message: Arc<str>,
    pub start_ts_unix_ms: u64,
    pub duration_s: u64,
}

/// Outcome of the night resolver (spec.md §4.5).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NightOutcome {
    /// No kill was attempted, or it targeted nobody.
    None,
    /// The target was saved; `saved_by` is revealed, the target's role is not.
    Saved {
        target: PlayerId,
        saved_by: PlayerId,
    },
    /// The target died; their role is revealed, along with a flavor death
    /// message for the announcement.
    Killed {
        target: PlayerId,
        role: Role,
        death_message: Arc<str>,
    },
}

/// Reason a day vote produced no elimination.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NoEliminationReason {
    NoVotes,
    SkipsMajority,
    Tie,
}

/// Outcome of the vote aggregator (spec.md §4.6). Both variants carry the
/// full tally breakdown ("emit counts, skip count, and top set in all
/// outcomes") so clients can render the vote without a separate query.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VoteOutcome {
    Eliminated {
        target: PlayerId,
        role: Role,
        death_message: Arc<str>,
        counts: Vec<(PlayerId, usize)>,
        skip_count: usize,
        top: Vec<PlayerId>,
    },
    NoElimination {
        reason: NoEliminationReason,
        counts: Vec<(PlayerId, usize)>,
        skip_count: usize,
        top: Vec<PlayerId>,
    },
}

/// Why an inbound action was rejected. Never alters room state.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ActionRejection {
    WrongPhase,
    WrongRole,
    NotAlive,
    AlreadyActed,
    InvalidTarget,
    TargetNotAlive,
    KillerCannotTargetKiller,
    DetectiveAlreadyUsed,
    VoterCannotTargetSelf,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SettingsRejection {
    NotHost,
    GameInProgress,
    DurationDecreased,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum JoinRejection {
    GameInProgress,
    NameTaken,
    RoomNotFound,
}

/// Events emitted by the engine. See `mafia_engine::emit::Emitter` for the
/// broadcast/sub-room/private routing each variant is dispatched through.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Event {
    Phase(PhaseAnnouncement),
    PlayerJoined(PlayerSummary),
    PlayerLeft(PlayerId),
    RoomState {
        players: Vec<PlayerSummary>,
        host_id: Option<PlayerId>,
        eliminated: Vec<PlayerId>,
        alive_role_members: Option<HashMap<Role, Vec<PlayerId>>>,
    },
    NewMessage(ChatMessage),
    NightResult(NightOutcome),
    NightSummary {
        outcome: NightOutcome,
    },
    VoteCast {
        voter: PlayerId,
        target: Option<PlayerId>,
    },
    VoteResult(VoteOutcome),
    GameOver {
        winner: Allegiance,
        living_killers: Vec<PlayerId>,
    },
    RoomReset,
    Prestart {
        start_ts_unix_ms: u64,
        duration_s: u64,
    },
    ReadyState {
        ready: Vec<PlayerId>,
    },
    RolesAssigned,
    SettingsUpdated(GameSettings),

    // Private-to-connection events.
    YourRole(Role),
    DetectiveResult {
        target: PlayerId,
        is_killer: bool,
    },
    ActionAccepted,
    ActionBlocked(ActionRejection),
    ChatBlocked,
    SettingsRejected(SettingsRejection),
    JoinRejected(JoinRejection),
    TimeSyncResponse {
        server_now_unix_ms: u64,
    },
    GameStateUpdate {
        phase: Phase,
        your_role: Option<Role>,
    },
}
