//! Authoritative per-room engine for a real-time, multi-room Mafia game:
//! the phase state machine, role/action rules, night resolution, vote
//! aggregation, and win-condition evaluation (see `mafia_protocol` for the
//! wire types this operates on).

mod action;
mod chat;
mod connection;
mod consts;
mod emit;
mod error;
mod night;
mod phase;
mod registry;
mod role_assign;
mod room;
mod server;
mod vote;
mod win;

pub use emit::ChatArchive;
pub use emit::Emitter;
pub use emit::InMemoryChatArchive;
pub use emit::InMemoryEmitter;
pub use error::EngineError;
pub use registry::RoomRegistry;
pub use room::Room;
pub use server::MafiaEngine;
pub use server::TickerShutdown;
