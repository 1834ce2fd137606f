//! Role assigner (spec.md §4.2).
//!
//! Builds a role multiset, shuffles it with a supplied RNG, then zips it
//! against the roster, driven by an explicit `GameSettings` multiset of
//! role counts.

use std::collections::HashMap;

use mafia_protocol::PlayerId;
use mafia_protocol::Role;
use rand::Rng;
use rand::seq::SliceRandom;

/// Assigns roles to `players` (in insertion order) per `settings`,
/// shuffling with `rng`. Deterministic for a given RNG seed.
///
/// Never assigns more special roles than there are players: counts are
/// capped to available capacity in the order killer, doctor, detective,
/// with every remaining player defaulting to civilian.
pub(crate) fn assign_roles<R: Rng>(
    players: &[PlayerId],
    killer_count: usize,
    doctor_count: usize,
    detective_count: usize,
    rng: &mut R,
) -> HashMap<PlayerId, Role> {
    let mut roles = Vec::with_capacity(players.len());

    let killers = killer_count.min(players.len());
    roles.extend(std::iter::repeat_n(Role::Killer, killers));

    let doctors = doctor_count.min(players.len() - roles.len());
    roles.extend(std::iter::repeat_n(Role::Doctor, doctors));

    let detectives = detective_count.min(players.len() - roles.len());
    roles.extend(std::iter::repeat_n(Role::Detective, detectives));

    roles.resize(players.len(), Role::Civilian);
    roles.shuffle(rng);

    players.iter().cloned().zip(roles).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn players(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| PlayerId::new(format!("p{i}"))).collect()
    }

    #[test]
    fn never_over_assigns_special_roles() {
        let ps = players(3);
        let mut rng = StdRng::seed_from_u64(1);
        let roles = assign_roles(&ps, 5, 5, 5, &mut rng);

        assert_eq!(roles.len(), 3);
        assert!(roles.values().filter(|r| **r == Role::Killer).count() <= 3);
    }

    #[test]
    fn fills_remainder_with_civilians() {
        let ps = players(6);
        let mut rng = StdRng::seed_from_u64(7);
        let roles = assign_roles(&ps, 1, 1, 1, &mut rng);

        assert_eq!(roles.len(), 6);
        assert_eq!(roles.values().filter(|r| **r == Role::Killer).count(), 1);
        assert_eq!(roles.values().filter(|r| **r == Role::Doctor).count(), 1);
        assert_eq!(roles.values().filter(|r| **r == Role::Detective).count(), 1);
        assert_eq!(roles.values().filter(|r| **r == Role::Civilian).count(), 3);
    }

    #[test]
    fn deterministic_under_seed() {
        let ps = players(6);
        let a = assign_roles(&ps, 1, 1, 1, &mut StdRng::seed_from_u64(42));
        let b = assign_roles(&ps, 1, 1, 1, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
