use thiserror::Error;

use mafia_protocol::PlayerId;
use mafia_protocol::RoomCode;

/// Errors the engine surfaces to its caller (transport layer).
///
/// These are distinct from the in-band rejection events (`action_blocked`,
/// `chat_blocked`, `settings_rejected`, `join_rejected`) defined in
/// `mafia_protocol::Event`: those are normal outcomes routed back to the
/// originating connection as events, while `EngineError` covers requests
/// that can't be resolved to a room/connection/player at all.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("room '{0}' does not exist")]
    RoomNotFound(RoomCode),
    #[error("connection is not registered to any room")]
    NotInRoom,
    #[error("player '{0}' is not in this room")]
    PlayerNotFound(PlayerId),
    #[error("room code generation exhausted {0} retries")]
    RoomCodeExhausted(usize),
    #[error("room '{0}' already has an active game")]
    GameInProgress(RoomCode),
}
