//! The per-room phase state machine.

use serde::Deserialize;
use serde::Serialize;

/// A named state of the room's phase machine.
///
/// `NightResolve` from the design (night-outcome computation) is
/// deliberately absent here: it is never observed by clients, so it is
/// not part of the wire-level phase enum. See
/// `mafia_engine::phase::PhaseController` for where it happens.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Phase {
    Waiting,
    PreNight,
    NightStart,
    Killer,
    Doctor,
    DayStart,
    Day,
    Voting,
    PostVote,
    Ended,
}

impl Phase {
    /// `true` for the phases in which the room has an active game (role
    /// assignment has happened and the room has not yet reset to `Waiting`).
    pub fn is_in_game(&self) -> bool {
        !matches!(self, Phase::Waiting)
    }

    /// `true` for the night sub-phases during which eyes are "closed":
    /// team chat is allowed and public chat is blocked.
    pub fn is_night(&self) -> bool {
        matches!(
            self,
            Phase::PreNight | Phase::NightStart | Phase::Killer | Phase::Doctor
        )
    }
}
