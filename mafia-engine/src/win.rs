//! Win evaluator (spec.md §4.7).

use mafia_protocol::Allegiance;
use mafia_protocol::PlayerId;

use crate::room::RoomState;

impl RoomState {
    /// Checks victory conditions against the current living roster. Sets
    /// `self.winner` and returns the living killers when killers win (so
    /// the caller can name them in the announcement), or `None` if the
    /// game continues.
    pub(crate) fn check_win(&mut self) -> Option<(Allegiance, Vec<PlayerId>)> {
        let living_killers = self.living_by_allegiance(Allegiance::Killers);
        let living_civilians = self.living_by_allegiance(Allegiance::Civilians);

        let winner = if living_killers.is_empty() {
            Allegiance::Civilians
        } else if living_killers.len() >= living_civilians.len() {
            Allegiance::Killers
        } else {
            return None;
        };

        self.winner = Some(winner);
        Some((winner, living_killers))
    }
}

#[cfg(test)]
mod tests {
    use mafia_protocol::Role;

    use super::*;
    use crate::room::Player;

    fn state_with_roles(roles: &[(&str, Role)]) -> RoomState {
        let mut state = RoomState::new(mafia_protocol::RoomCode::new("ABCDEF"));
        for (name, role) in roles {
            let id = PlayerId::new(*name);
            state.players.push(Player {
                id: id.clone(),
                name: (*name).into(),
            });
            state.assigned_roles.insert(id, *role);
        }
        state
    }

    #[test]
    fn no_killers_left_civilians_win() {
        let mut state = state_with_roles(&[("a", Role::Civilian), ("b", Role::Doctor)]);
        assert_eq!(state.check_win(), Some((Allegiance::Civilians, vec![])));
    }

    #[test]
    fn killers_win_by_parity() {
        let mut state = state_with_roles(&[
            ("a", Role::Killer),
            ("b", Role::Killer),
            ("c", Role::Doctor),
            ("d", Role::Civilian),
        ]);
        let (winner, killers) = state.check_win().expect("game should end");
        assert_eq!(winner, Allegiance::Killers);
        assert_eq!(killers.len(), 2);
    }

    #[test]
    fn game_continues_when_civilians_outnumber_killers() {
        let mut state = state_with_roles(&[
            ("a", Role::Killer),
            ("b", Role::Civilian),
            ("c", Role::Civilian),
        ]);
        assert_eq!(state.check_win(), None);
    }
}
