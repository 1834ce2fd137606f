//! `MafiaEngine`: the facade wiring the room registry to an [`Emitter`]
//! and a [`ChatArchive`], exposing one method per inbound event named in
//! spec.md §6.

use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use mafia_protocol::ChatScope;
use mafia_protocol::ConnectionId;
use mafia_protocol::GameSettings;
use mafia_protocol::PlayerId;
use mafia_protocol::RoomCode;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::consts;
use crate::emit::ChatArchive;
use crate::emit::Emitter;
use crate::emit::EmitTarget;
use crate::emit::RoomEmit;
use crate::error::EngineError;
use crate::registry::RoomRegistry;
use crate::room::Room;

fn dispatch(emitter: &dyn Emitter, room: &Room, code: &RoomCode, emits: Vec<RoomEmit>) {
    for emit in emits {
        match emit.target {
            EmitTarget::Room => emitter.emit_to_room(code, &emit.event),
            EmitTarget::SubRoom(sub) => emitter.emit_to_subroom(&sub, &emit.event),
            EmitTarget::Connection(id) => emitter.emit_to_connection(id, &emit.event),
            EmitTarget::AllConnectionsOf(player) => {
                let conns = room.state.lock().unwrap().connections.connections_of(&player);
                emitter.emit_to_player(&conns, &emit.event);
            }
        }
    }
}

/// Manages the room registry and fans transport-delivered events into the
/// per-room serializer (spec.md §5).
pub struct MafiaEngine<E: Emitter, A: ChatArchive> {
    registry: RoomRegistry,
    emitter: E,
    archive: A,
    rng: Mutex<StdRng>,
}

impl<E: Emitter, A: ChatArchive> MafiaEngine<E, A> {
    pub fn new(emitter: E, archive: A) -> Self {
        Self {
            registry: RoomRegistry::new(),
            emitter,
            archive,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic constructor for tests (SPEC_FULL §10.4).
    pub fn new_seeded(emitter: E, archive: A, seed: u64) -> Self {
        Self {
            registry: RoomRegistry::new(),
            emitter,
            archive,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn room(&self, code: &RoomCode) -> Result<std::sync::Arc<Room>, EngineError> {
        self.registry.get(code).ok_or_else(|| EngineError::RoomNotFound(code.clone()))
    }

    pub fn create_room(&self) -> Result<RoomCode, EngineError> {
        let mut rng = self.rng.lock().unwrap();
        let room = self.registry.create_room(&mut *rng)?;
        Ok(room.state.lock().unwrap().code.clone())
    }

    pub fn join_room(
        &self,
        code: &RoomCode,
        connection_id: ConnectionId,
        player_id: PlayerId,
        name: &str,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .join_room(connection_id, player_id, name);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn leave_room(&self, code: &RoomCode, player_id: &PlayerId) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room.state.lock().unwrap().leave_room(player_id);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    /// Detaches a connection; if it was the player's last, arms the
    /// reconnection grace window (spec.md §4.1). Does not itself remove the
    /// player — the tick sweeps expired grace windows.
    pub fn disconnect(
        &self,
        code: &RoomCode,
        connection_id: ConnectionId,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        room.state
            .lock()
            .unwrap()
            .connections
            .detach(connection_id, Duration::from_secs(consts::RECONNECT_GRACE_S));
        Ok(())
    }

    /// Resolves which player a connection belongs to, for transports that
    /// need to route an inbound event to the right actor (spec.md §4.1).
    pub fn lookup_player(
        &self,
        code: &RoomCode,
        connection_id: ConnectionId,
    ) -> Result<Option<PlayerId>, EngineError> {
        let room = self.room(code)?;
        Ok(room
            .state
            .lock()
            .unwrap()
            .connections
            .lookup_player(connection_id)
            .cloned())
    }

    /// Whether a player currently has at least one live connection (as
    /// opposed to sitting in the reconnection grace window).
    pub fn is_connected(&self, code: &RoomCode, player_id: &PlayerId) -> Result<bool, EngineError> {
        let room = self.room(code)?;
        Ok(room.state.lock().unwrap().connections.is_connected(player_id))
    }

    pub fn player_ready(&self, code: &RoomCode, player_id: &PlayerId) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let mut rng = self.rng.lock().unwrap();
        let emits = room
            .state
            .lock()
            .unwrap()
            .player_ready(player_id, Instant::now(), &mut *rng);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn set_settings(
        &self,
        code: &RoomCode,
        actor: &PlayerId,
        connection_id: ConnectionId,
        settings: GameSettings,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .set_settings(actor, connection_id, settings);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn killer_action(
        &self,
        code: &RoomCode,
        actor: &PlayerId,
        connection_id: ConnectionId,
        target: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .killer_action(actor, connection_id, target, Instant::now());
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn doctor_action(
        &self,
        code: &RoomCode,
        actor: &PlayerId,
        connection_id: ConnectionId,
        target: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .doctor_action(actor, connection_id, target, Instant::now());
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn detective_action(
        &self,
        code: &RoomCode,
        actor: &PlayerId,
        connection_id: ConnectionId,
        target: PlayerId,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .detective_action(actor, connection_id, target);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn cast_vote(
        &self,
        code: &RoomCode,
        voter: &PlayerId,
        connection_id: ConnectionId,
        target: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .cast_vote(voter, connection_id, target, Instant::now());
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn send_message(
        &self,
        code: &RoomCode,
        sender: &PlayerId,
        connection_id: ConnectionId,
        scope: ChatScope,
        text: &str,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room
            .state
            .lock()
            .unwrap()
            .send_message(sender, connection_id, scope, text, &self.archive);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn time_sync(&self, code: &RoomCode, connection_id: ConnectionId) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room.state.lock().unwrap().time_sync(connection_id);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    pub fn get_game_state(
        &self,
        code: &RoomCode,
        requester: &PlayerId,
        connection_id: ConnectionId,
    ) -> Result<(), EngineError> {
        let room = self.room(code)?;
        let emits = room.state.lock().unwrap().get_game_state(requester, connection_id);
        dispatch(&self.emitter, &room, code, emits);
        Ok(())
    }

    /// Sweeps every room's phase deadline and pending-disconnect timers,
    /// then garbage-collects empty rooms. Intended to be called on a fixed
    /// tick rate (spec.md §5's suspension points).
    pub fn do_tick(&self) {
        let now = Instant::now();
        for code in self.registry.room_codes() {
            let Some(room) = self.registry.get(&code) else {
                continue;
            };
            let mut emits = room.state.lock().unwrap().tick(now, &self.archive);
            emits.extend(room.state.lock().unwrap().expire_disconnects(now));
            dispatch(&self.emitter, &room, &code, emits);
        }
        self.registry.collect_garbage();
    }
}

impl<E: Emitter + Send + Sync + 'static, A: ChatArchive + Send + Sync + 'static> MafiaEngine<E, A> {
    /// Starts a background thread ticking every room at `tick_rate`,
    /// a plain background thread, no async runtime involved.
    pub fn start_ticker(
        self: std::sync::Arc<Self>,
        tick_rate: Duration,
    ) -> (TickerShutdown, JoinHandle<()>) {
        let shutdown = TickerShutdown::new();
        let handle = thread::spawn({
            let shutdown = shutdown.clone();
            let engine = self;
            move || {
                loop {
                    if shutdown.is_shutdown() {
                        return;
                    }
                    engine.do_tick();
                    thread::sleep(tick_rate);
                }
            }
        });
        (shutdown, handle)
    }
}

#[derive(Clone)]
pub struct TickerShutdown(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl TickerShutdown {
    fn new() -> Self {
        Self(std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)))
    }

    fn is_shutdown(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn do_shutdown(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}
