//! Per-room configurable settings.

use serde::Deserialize;
use serde::Serialize;

/// Host-configurable settings for a room. Durations are clamped to
/// `[120, 300]` seconds by the engine before being stored; see
/// `mafia_engine::consts`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GameSettings {
    pub killer_count: usize,
    pub doctor_count: usize,
    pub detective_count: usize,
    pub killer_duration_s: u64,
    pub doctor_duration_s: u64,
    pub voting_duration_s: u64,
    pub discussion_duration_s: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            killer_count: 1,
            doctor_count: 1,
            detective_count: 0,
            killer_duration_s: 120,
            doctor_duration_s: 120,
            voting_duration_s: 120,
            discussion_duration_s: 120,
        }
    }
}
