//! Vote aggregator (spec.md §4.6).

use std::collections::HashMap;

use mafia_protocol::NoEliminationReason;
use mafia_protocol::Role;
use mafia_protocol::VoteOutcome;
use rand::seq::IndexedRandom;

use crate::consts::DAY_DEATH_MESSAGES;
use crate::room::RoomState;

impl RoomState {
    /// Tallies `self.votes` and produces the day's elimination outcome,
    /// marking an elimination in `self.eliminated` if one occurs.
    pub(crate) fn resolve_votes(&mut self) -> VoteOutcome {
        let mut skip_count = 0usize;
        let mut tallies: HashMap<mafia_protocol::PlayerId, usize> = HashMap::new();

        for target in self.votes.values() {
            match target {
                None => skip_count += 1,
                Some(target) => *tallies.entry(target.clone()).or_insert(0) += 1,
            }
        }

        let mut counts: Vec<_> = tallies.iter().map(|(id, n)| (id.clone(), *n)).collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0));

        if tallies.is_empty() {
            return VoteOutcome::NoElimination {
                reason: NoEliminationReason::NoVotes,
                counts,
                skip_count,
                top: Vec::new(),
            };
        }

        let max_votes = *tallies.values().max().expect("non-empty");
        let mut top: Vec<_> = tallies
            .iter()
            .filter(|(_, count)| **count == max_votes)
            .map(|(id, _)| id.clone())
            .collect();
        top.sort();

        if skip_count >= max_votes {
            return VoteOutcome::NoElimination {
                reason: NoEliminationReason::SkipsMajority,
                counts,
                skip_count,
                top,
            };
        }

        if top.len() == 1 {
            let target = top[0].clone();
            let role = self.role_of(&target).unwrap_or(Role::Civilian);
            self.eliminated.insert(target.clone());
            let death_message = (*DAY_DEATH_MESSAGES
                .choose(&mut rand::rng())
                .expect("at least one day death message"))
            .into();
            return VoteOutcome::Eliminated {
                target,
                role,
                death_message,
                counts,
                skip_count,
                top,
            };
        }

        VoteOutcome::NoElimination {
            reason: NoEliminationReason::Tie,
            counts,
            skip_count,
            top,
        }
    }
}

#[cfg(test)]
mod tests {
    use mafia_protocol::PlayerId;

    use super::*;
    use crate::room::Player;

    fn state_with_players(n: usize) -> RoomState {
        let mut state = RoomState::new(mafia_protocol::RoomCode::new("ABCDEF"));
        for i in 0..n {
            state.players.push(Player {
                id: PlayerId::new(format!("p{i}")),
                name: format!("p{i}").into(),
            });
        }
        state
    }

    #[test]
    fn no_votes_when_all_abstain() {
        let mut state = state_with_players(3);
        state.votes.insert(PlayerId::new("p0"), None);
        state.votes.insert(PlayerId::new("p1"), None);

        assert!(matches!(
            state.resolve_votes(),
            VoteOutcome::NoElimination {
                reason: NoEliminationReason::NoVotes,
                ..
            }
        ));
    }

    #[test]
    fn tie_with_no_skip_majority_is_no_elimination() {
        let mut state = state_with_players(4);
        state
            .votes
            .insert(PlayerId::new("p0"), Some(PlayerId::new("p2")));
        state
            .votes
            .insert(PlayerId::new("p1"), Some(PlayerId::new("p3")));

        let outcome = state.resolve_votes();
        assert!(matches!(
            outcome,
            VoteOutcome::NoElimination {
                reason: NoEliminationReason::Tie,
                ..
            }
        ));
        if let VoteOutcome::NoElimination { top, .. } = outcome {
            assert_eq!(top, vec![PlayerId::new("p2"), PlayerId::new("p3")]);
        }
    }

    #[test]
    fn skip_majority_blocks_elimination() {
        let mut state = state_with_players(5);
        state
            .votes
            .insert(PlayerId::new("p0"), Some(PlayerId::new("p4")));
        state
            .votes
            .insert(PlayerId::new("p1"), Some(PlayerId::new("p4")));
        state.votes.insert(PlayerId::new("p2"), None);
        state.votes.insert(PlayerId::new("p3"), None);
        state.votes.insert(PlayerId::new("p4"), None);

        let outcome = state.resolve_votes();
        assert!(matches!(
            outcome,
            VoteOutcome::NoElimination {
                reason: NoEliminationReason::SkipsMajority,
                skip_count: 3,
                ..
            }
        ));
    }

    #[test]
    fn clear_majority_eliminates() {
        let mut state = state_with_players(3);
        state
            .votes
            .insert(PlayerId::new("p0"), Some(PlayerId::new("p2")));
        state
            .votes
            .insert(PlayerId::new("p1"), Some(PlayerId::new("p2")));

        let outcome = state.resolve_votes();
        assert!(matches!(
            outcome,
            VoteOutcome::Eliminated {
                target,
                role: Role::Civilian,
                ..
            } if target == PlayerId::new("p2")
        ));
        assert!(state.eliminated.contains(&PlayerId::new("p2")));
    }
}
