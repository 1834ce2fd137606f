//! Roles and allegiances.

use serde::Deserialize;
use serde::Serialize;

/// Which side a player is on.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Allegiance {
    Civilians,
    Killers,
}

/// A player's assigned role for the game in progress.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Role {
    Civilian,
    Killer,
    /// Protects one player from a Killer's target each night.
    Doctor,
    /// Investigates one player's allegiance, once per game.
    Detective,
}

impl Role {
    pub fn allegiance(&self) -> Allegiance {
        match self {
            Role::Killer => Allegiance::Killers,
            Role::Civilian | Role::Doctor | Role::Detective => Allegiance::Civilians,
        }
    }
}

/// A player's life status, derived from the room's eliminated set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum PlayerStatus {
    Alive,
    Eliminated,
}
