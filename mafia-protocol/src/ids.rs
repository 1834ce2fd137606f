//! Identifiers shared across the engine and any future transport layer.

use std::fmt::Display;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

/// Identifier for a player, stable across reconnects.
///
/// Client-chosen or server-assigned; opaque to the engine.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PlayerId(pub Arc<str>);

impl PlayerId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one transport connection.
///
/// A single [`PlayerId`] may have several live `ConnectionId`s (multiple
/// tabs); see the connection registry in `mafia-engine`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

/// A 6-character uppercase alphanumeric room code.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RoomCode(pub Arc<str>);

impl RoomCode {
    pub fn new(code: impl Into<Arc<str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
