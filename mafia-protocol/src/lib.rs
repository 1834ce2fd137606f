//! Data shared by the Mafia engine and any transport built on top of it.

mod event;
mod ids;
mod phase;
mod role;
mod settings;

pub use event::ActionRejection;
pub use event::ChatMessage;
pub use event::ChatScope;
pub use event::Event;
pub use event::JoinRejection;
pub use event::NightOutcome;
pub use event::NoEliminationReason;
pub use event::PhaseAnnouncement;
pub use event::PlayerSummary;
pub use event::SettingsRejection;
pub use event::VoteOutcome;
pub use ids::ConnectionId;
pub use ids::PlayerId;
pub use ids::RoomCode;
pub use phase::Phase;
pub use role::Allegiance;
pub use role::PlayerStatus;
pub use role::Role;
pub use settings::GameSettings;
