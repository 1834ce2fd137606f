//! Emission targets and the `Emitter`/`ChatArchive` external collaborators
//! the engine depends on (spec.md §1, §4.9).

use std::sync::Arc;
use std::sync::Mutex;

use mafia_protocol::ConnectionId;
use mafia_protocol::Event;
use mafia_protocol::PlayerId;
use mafia_protocol::RoomCode;

/// Where a single [`Event`] should be routed.
#[derive(Clone, Debug)]
pub enum EmitTarget {
    /// Every connection currently in the room.
    Room,
    /// Every connection registered to the given team sub-room.
    SubRoom(RoomCode),
    /// A single connection.
    Connection(ConnectionId),
    /// Every connection belonging to a player (multi-tab role delivery).
    AllConnectionsOf(PlayerId),
}

/// One event paired with its routing decision, produced while the room's
/// serializer lock is held and dispatched only after it's released (spec.md
/// §5: "implementations must not hold the serializer across a slow I/O
/// call").
pub struct RoomEmit {
    pub target: EmitTarget,
    pub event: Event,
}

impl RoomEmit {
    pub fn new(target: EmitTarget, event: Event) -> Self {
        Self { target, event }
    }
}

/// Transport collaborator: can address a single connection, a room, or a
/// sub-room. The engine never calls into a transport directly; it only
/// ever produces [`RoomEmit`]s and hands them to an `Emitter`.
pub trait Emitter: Send + Sync {
    fn emit_to_connection(&self, connection_id: ConnectionId, event: &Event);
    fn emit_to_room(&self, room: &RoomCode, event: &Event);
    fn emit_to_subroom(&self, subroom: &RoomCode, event: &Event);
    fn emit_to_player(&self, connections: &[ConnectionId], event: &Event) {
        for conn in connections {
            self.emit_to_connection(*conn, event);
        }
    }
}

/// Chat persistence collaborator (spec.md §6's persisted state layout).
/// Out of scope as a storage backend; the engine only needs this seam.
pub trait ChatArchive: Send + Sync {
    fn append(&self, room: &RoomCode, message: &mafia_protocol::ChatMessage);
    fn reset(&self, room: &RoomCode);
}

/// In-memory `Emitter` using a per-connection inbox: each connection owns
/// a queue, callers drain it. Useful for tests and as a default when no
/// real transport is wired in.
#[derive(Default)]
pub struct InMemoryEmitter {
    inboxes: Mutex<std::collections::HashMap<ConnectionId, std::collections::VecDeque<Arc<Event>>>>,
    room_members: Mutex<std::collections::HashMap<RoomCode, std::collections::HashSet<ConnectionId>>>,
}

impl InMemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection_id` as a member of `room` for broadcast
    /// purposes (both the public room and any sub-room use this).
    pub fn register(&self, room: RoomCode, connection_id: ConnectionId) {
        self.room_members
            .lock()
            .unwrap()
            .entry(room)
            .or_default()
            .insert(connection_id);
        self.inboxes.lock().unwrap().entry(connection_id).or_default();
    }

    pub fn unregister(&self, room: &RoomCode, connection_id: ConnectionId) {
        if let Some(members) = self.room_members.lock().unwrap().get_mut(room) {
            members.remove(&connection_id);
        }
    }

    pub fn drain(&self, connection_id: ConnectionId) -> Vec<Arc<Event>> {
        self.inboxes
            .lock()
            .unwrap()
            .get_mut(&connection_id)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Emitter for InMemoryEmitter {
    fn emit_to_connection(&self, connection_id: ConnectionId, event: &Event) {
        let event = Arc::new(event.clone());
        if let Some(q) = self.inboxes.lock().unwrap().get_mut(&connection_id) {
            q.push_back(event);
        }
    }

    fn emit_to_room(&self, room: &RoomCode, event: &Event) {
        let event = Arc::new(event.clone());
        let members = self.room_members.lock().unwrap();
        if let Some(members) = members.get(room) {
            let mut inboxes = self.inboxes.lock().unwrap();
            for conn in members {
                if let Some(q) = inboxes.get_mut(conn) {
                    q.push_back(Arc::clone(&event));
                }
            }
        }
    }

    fn emit_to_subroom(&self, subroom: &RoomCode, event: &Event) {
        self.emit_to_room(subroom, event);
    }
}

/// In-memory `ChatArchive`, grounded on the persisted state layout in
/// spec.md §6 (`(id, room, sender_id, sender_name, text, ts)`), kept as a
/// flat append-only vector per room key instead of a real table.
#[derive(Default)]
pub struct InMemoryChatArchive {
    rooms: Mutex<std::collections::HashMap<RoomCode, Vec<mafia_protocol::ChatMessage>>>,
}

impl InMemoryChatArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self, room: &RoomCode, limit: usize) -> Vec<mafia_protocol::ChatMessage> {
        self.rooms
            .lock()
            .unwrap()
            .get(room)
            .map(|msgs| {
                let start = msgs.len().saturating_sub(limit);
                msgs[start..].to_vec()
            })
            .unwrap_or_default()
    }
}

impl ChatArchive for InMemoryChatArchive {
    fn append(&self, room: &RoomCode, message: &mafia_protocol::ChatMessage) {
        self.rooms
            .lock()
            .unwrap()
            .entry(room.clone())
            .or_default()
            .push(message.clone());
    }

    fn reset(&self, room: &RoomCode) {
        self.rooms.lock().unwrap().remove(room);
    }
}
