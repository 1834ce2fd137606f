//! Constants for the Mafia game engine.

/// Clamp range for all host-configurable phase durations.
pub const DURATION_MIN_S: u64 = 120;
pub const DURATION_MAX_S: u64 = 300;

/// Seconds a disconnected player's seat is held open before removal.
pub const RECONNECT_GRACE_S: u64 = 8;

/// Seconds the `Ended` phase is displayed before the room resets.
pub const ENDED_DISPLAY_S: u64 = 10;

/// Seconds the lobby's all-ready countdown runs before `NightStart`.
pub const PRENIGHT_S: u64 = 3;

/// Seconds each of the "close eyes" / "open eyes" announcements last.
pub const NIGHT_START_S: u64 = 5;
pub const DAY_START_S: u64 = 5;

/// Seconds the night summary is displayed before the win check runs.
pub const NIGHT_SUMMARY_PAUSE_S: u64 = 5;

/// Seconds the vote result is displayed before the win check runs.
pub const POSTVOTE_PAUSE_S: u64 = 3;

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 6;
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Upper bound on collision retries when generating a room code; at this
/// length collisions are negligible, so exhausting this is an
/// internal-error condition, not a capacity limit.
pub const ROOM_CODE_MAX_RETRIES: usize = 20;

/// Night death message used in the form of:
/// <PLAYER> <DEATH_MESSAGE> the next morning.
pub const NIGHT_DEATH_MESSAGES: &[&str] = &[
    "was found strangled by an untyped python",
    "was found brutally beat with a mechanical keyboard",
    "was found poisoned from eating expired ketchup",
    "never made it home because of 101 traffic",
    "was found pummelled by what appears to have been a gorilla",
    "was found unresponsive next to a beer tower",
];

/// Day death message used in the form of:
/// <PLAYER> <DEATH_MESSAGE> that day.
pub const DAY_DEATH_MESSAGES: &[&str] = &["was hung for their unforgivable sins"];

pub fn clamp_duration(secs: u64) -> u64 {
    secs.clamp(DURATION_MIN_S, DURATION_MAX_S)
}
