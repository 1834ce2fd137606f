//! Chat gate (spec.md §4.8).

use mafia_protocol::ChatScope;
use mafia_protocol::PlayerId;
use mafia_protocol::Role;

use crate::room::RoomState;

impl RoomState {
    /// Validates a chat send and returns the scope it actually travels
    /// through. Never mutates state; persistence and broadcast happen at
    /// the call site once the scope is known.
    pub(crate) fn gate_chat(
        &self,
        sender: &PlayerId,
        requested: ChatScope,
    ) -> Result<ChatScope, ()> {
        if !self.is_active(sender) {
            return Err(());
        }

        match requested {
            ChatScope::Public => {
                if self.phase.is_night() {
                    return Err(());
                }
                Ok(ChatScope::Public)
            }
            ChatScope::Killers => {
                if !self.phase.is_night() || self.role_of(sender) != Some(Role::Killer) {
                    return Err(());
                }
                Ok(ChatScope::Killers)
            }
            ChatScope::Doctors => {
                if !self.phase.is_night() || self.role_of(sender) != Some(Role::Doctor) {
                    return Err(());
                }
                Ok(ChatScope::Doctors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mafia_protocol::Phase;

    use super::*;
    use crate::room::Player;

    fn state(phase: Phase, role: Option<Role>) -> RoomState {
        let mut state = RoomState::new(mafia_protocol::RoomCode::new("ABCDEF"));
        state.phase = phase;
        state.players.push(Player {
            id: PlayerId::new("p0"),
            name: "p0".into(),
        });
        if let Some(role) = role {
            state.assigned_roles.insert(PlayerId::new("p0"), role);
        }
        state
    }

    #[test]
    fn dead_sender_always_blocked() {
        let mut state = state(Phase::Day, None);
        state.eliminated.insert(PlayerId::new("p0"));
        assert!(state.gate_chat(&PlayerId::new("p0"), ChatScope::Public).is_err());
    }

    #[test]
    fn public_blocked_at_night() {
        let state = state(Phase::Killer, None);
        assert!(state.gate_chat(&PlayerId::new("p0"), ChatScope::Public).is_err());
    }

    #[test]
    fn killer_chat_requires_night_and_role() {
        let killer_at_night = state(Phase::Killer, Some(Role::Killer));
        assert_eq!(
            killer_at_night.gate_chat(&PlayerId::new("p0"), ChatScope::Killers),
            Ok(ChatScope::Killers)
        );

        let doctor_at_night = state(Phase::Killer, Some(Role::Doctor));
        assert!(doctor_at_night.gate_chat(&PlayerId::new("p0"), ChatScope::Killers).is_err());

        let killer_by_day = state(Phase::Day, Some(Role::Killer));
        assert!(killer_by_day.gate_chat(&PlayerId::new("p0"), ChatScope::Killers).is_err());
    }

    #[test]
    fn public_allowed_during_day_and_voting() {
        let day = state(Phase::Day, None);
        assert!(day.gate_chat(&PlayerId::new("p0"), ChatScope::Public).is_ok());

        let voting = state(Phase::Voting, None);
        assert!(voting.gate_chat(&PlayerId::new("p0"), ChatScope::Public).is_ok());
    }
}
