//! Per-room connection registry (spec.md §4.1).
//!
//! Handles the multi-tab, room-scoped case: one [`PlayerId`] may have
//! several live [`ConnectionId`]s, and a player whose last connection
//! drops gets a grace window before being treated as gone.

use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;
use std::time::Instant;

use mafia_protocol::ConnectionId;
use mafia_protocol::PlayerId;

#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    connections_of: HashMap<PlayerId, HashSet<ConnectionId>>,
    player_of: HashMap<ConnectionId, PlayerId>,
    /// Deadline a pending player removal fires at. Cleared (cancelled) by
    /// any `attach` for the same player before the deadline passes.
    pending_removals: HashMap<PlayerId, Instant>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `connection_id` under `player_id`, cancelling any pending
    /// removal for that player.
    pub(crate) fn attach(&mut self, connection_id: ConnectionId, player_id: PlayerId) {
        self.pending_removals.remove(&player_id);
        self.player_of.insert(connection_id, player_id.clone());
        self.connections_of
            .entry(player_id)
            .or_default()
            .insert(connection_id);
    }

    /// Removes `connection_id`. If it was the player's last connection,
    /// schedules a pending removal `grace` from now and returns the
    /// player id so the caller can arm its own deadline bookkeeping.
    pub(crate) fn detach(&mut self, connection_id: ConnectionId, grace: Duration) -> Option<PlayerId> {
        let player_id = self.player_of.remove(&connection_id)?;

        let conns = self.connections_of.get_mut(&player_id)?;
        conns.remove(&connection_id);

        if conns.is_empty() {
            self.connections_of.remove(&player_id);
            self.pending_removals
                .insert(player_id.clone(), Instant::now() + grace);
            Some(player_id)
        } else {
            None
        }
    }

    pub(crate) fn lookup_player(&self, connection_id: ConnectionId) -> Option<&PlayerId> {
        self.player_of.get(&connection_id)
    }

    pub(crate) fn connections_of(&self, player_id: &PlayerId) -> Vec<ConnectionId> {
        self.connections_of
            .get(player_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_pending_removals(&self) -> bool {
        !self.pending_removals.is_empty()
    }

    pub(crate) fn is_connected(&self, player_id: &PlayerId) -> bool {
        self.connections_of
            .get(player_id)
            .is_some_and(|s| !s.is_empty())
    }

    /// Removes every connection id still registered to a player, e.g. on
    /// an explicit `leave_room` which bypasses the grace window entirely.
    pub(crate) fn drop_player(&mut self, player_id: &PlayerId) {
        if let Some(conns) = self.connections_of.remove(player_id) {
            for conn in conns {
                self.player_of.remove(&conn);
            }
        }
        self.pending_removals.remove(player_id);
    }

    /// Returns players whose grace window has expired as of `now`, clearing
    /// their pending-removal entries.
    pub(crate) fn expire_pending_removals(&mut self, now: Instant) -> Vec<PlayerId> {
        let expired: Vec<PlayerId> = self
            .pending_removals
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.pending_removals.remove(id);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    #[test]
    fn multi_tab_attach_detach() {
        let mut reg = ConnectionRegistry::new();
        reg.attach(ConnectionId(1), pid("alice"));
        reg.attach(ConnectionId(2), pid("alice"));

        assert!(reg.is_connected(&pid("alice")));
        assert_eq!(reg.detach(ConnectionId(1), Duration::from_secs(8)), None);
        assert!(reg.is_connected(&pid("alice")));

        let pending = reg.detach(ConnectionId(2), Duration::from_secs(8));
        assert_eq!(pending, Some(pid("alice")));
        assert!(!reg.is_connected(&pid("alice")));
    }

    #[test]
    fn reattach_cancels_pending_removal() {
        let mut reg = ConnectionRegistry::new();
        reg.attach(ConnectionId(1), pid("alice"));
        reg.detach(ConnectionId(1), Duration::from_secs(8));

        reg.attach(ConnectionId(2), pid("alice"));

        assert!(reg.expire_pending_removals(Instant::now() + Duration::from_secs(9)).is_empty());
    }
}
