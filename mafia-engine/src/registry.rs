//! Room registry (spec.md §2, §4.10's room lifecycle, §9 "room-code
//! collisions"): maps `room_code → Room`, creates rooms with a
//! collision-retried code, and garbage-collects empty ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use mafia_protocol::RoomCode;
use rand::Rng;

use crate::consts;
use crate::error::EngineError;
use crate::room::Room;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_code<R: Rng>(rng: &mut R) -> RoomCode {
        let code: String = (0..consts::ROOM_CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..consts::ROOM_CODE_ALPHABET.len());
                consts::ROOM_CODE_ALPHABET[idx] as char
            })
            .collect();
        RoomCode::new(code)
    }

    /// Creates a room under a freshly generated, collision-free code.
    pub fn create_room<R: Rng>(&self, rng: &mut R) -> Result<Arc<Room>, EngineError> {
        let mut rooms = self.rooms.write().unwrap();

        for _ in 0..consts::ROOM_CODE_MAX_RETRIES {
            let code = Self::generate_code(rng);
            if let std::collections::hash_map::Entry::Vacant(entry) = rooms.entry(code) {
                let room = Arc::new(Room::new(entry.key().clone()));
                entry.insert(Arc::clone(&room));
                return Ok(room);
            }
        }

        Err(EngineError::RoomCodeExhausted(consts::ROOM_CODE_MAX_RETRIES))
    }

    pub fn get(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.read().unwrap().get(code).cloned()
    }

    /// Drops rooms with no roster and nobody in the reconnection grace
    /// window (spec.md §3 "Lifecycle"). Intended to be called periodically
    /// alongside the phase tick.
    pub fn collect_garbage(&self) {
        let mut rooms = self.rooms.write().unwrap();
        rooms.retain(|_, room| {
            let state = room.state.lock().unwrap();
            !state.players.is_empty() || state.connections.has_pending_removals()
        });
    }

    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.read().unwrap().keys().cloned().collect()
    }
}
