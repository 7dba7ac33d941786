//! Socket Manager (C5): the bidirectional map between live sockets and the
//! room they're bound to, and the fan-out point for server events.
//!
//! The teacher's `web_socket_interface.rs` pushed every outgoing frame
//! through one `tokio::sync::broadcast::Sender` per room. That works when
//! every subscriber gets an identical payload, but masked projections mean
//! two players in the same room can legitimately receive different bytes
//! for the same event (Poker hole cards, Memory face-down tiles). A
//! `broadcast` channel can't do that, so each socket gets its own
//! `mpsc::UnboundedSender<ServerEvent>` instead, and emitting "to a room"
//! means looking up the room's sockets and sending to each one individually.

use protocol::ServerEvent;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub type SocketId = u64;

struct SocketHandle {
    sender: mpsc::UnboundedSender<ServerEvent>,
    room_code: Option<String>,
    player_id: Option<String>,
}

#[derive(Default)]
pub struct SocketManager {
    sockets: Mutex<HashMap<SocketId, SocketHandle>>,
    rooms: Mutex<HashMap<String, HashSet<SocketId>>>,
}

impl SocketManager {
    pub fn new() -> Self {
        SocketManager {
            sockets: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a freshly-accepted connection and returns the receiver the
    /// caller's write task should drain.
    pub fn register(&self, socket_id: SocketId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.lock().unwrap().insert(
            socket_id,
            SocketHandle {
                sender: tx,
                room_code: None,
                player_id: None,
            },
        );
        rx
    }

    /// Binds a socket to a room and player identity. A socket may only be
    /// bound to one room at a time; joining a new room implicitly leaves
    /// the old one.
    pub fn join_room(&self, socket_id: SocketId, room_code: &str, player_id: &str) {
        self.leave_room(socket_id);

        let mut sockets = self.sockets.lock().unwrap();
        if let Some(handle) = sockets.get_mut(&socket_id) {
            handle.room_code = Some(room_code.to_string());
            handle.player_id = Some(player_id.to_string());
        }
        drop(sockets);

        self.rooms
            .lock()
            .unwrap()
            .entry(room_code.to_string())
            .or_default()
            .insert(socket_id);
    }

    pub fn leave_room(&self, socket_id: SocketId) {
        let previous_room = {
            let mut sockets = self.sockets.lock().unwrap();
            sockets
                .get_mut(&socket_id)
                .and_then(|h| h.room_code.take())
        };
        if let Some(room_code) = previous_room {
            let mut rooms = self.rooms.lock().unwrap();
            if let Some(members) = rooms.get_mut(&room_code) {
                members.remove(&socket_id);
                if members.is_empty() {
                    rooms.remove(&room_code);
                }
            }
        }
    }

    pub fn unregister(&self, socket_id: SocketId) {
        self.leave_room(socket_id);
        self.sockets.lock().unwrap().remove(&socket_id);
    }

    pub fn room_of(&self, socket_id: SocketId) -> Option<String> {
        self.sockets.lock().unwrap().get(&socket_id)?.room_code.clone()
    }

    pub fn player_of(&self, socket_id: SocketId) -> Option<String> {
        self.sockets.lock().unwrap().get(&socket_id)?.player_id.clone()
    }

    /// Finds the socket currently bound to a given player in a room, if any
    /// (used by reconnection to locate a stale prior socket to evict).
    pub fn socket_for_player(&self, room_code: &str, player_id: &str) -> Option<SocketId> {
        let sockets = self.sockets.lock().unwrap();
        let rooms = self.rooms.lock().unwrap();
        rooms.get(room_code)?.iter().copied().find(|id| {
            sockets
                .get(id)
                .map(|h| h.player_id.as_deref() == Some(player_id))
                .unwrap_or(false)
        })
    }

    pub fn emit_to_socket(&self, socket_id: SocketId, event: ServerEvent) {
        let sockets = self.sockets.lock().unwrap();
        if let Some(handle) = sockets.get(&socket_id) {
            let _ = handle.sender.send(event);
        }
    }

    /// Emits a uniform event to every socket in a room. For masked
    /// per-viewer events, callers should use `sockets_in_room` and build one
    /// projection per recipient instead.
    pub fn emit_to_room(&self, room_code: &str, event: ServerEvent) {
        let member_ids: Vec<SocketId> = {
            let rooms = self.rooms.lock().unwrap();
            rooms.get(room_code).map(|s| s.iter().copied().collect()).unwrap_or_default()
        };
        let sockets = self.sockets.lock().unwrap();
        for id in member_ids {
            if let Some(handle) = sockets.get(&id) {
                let _ = handle.sender.send(event.clone());
            }
        }
    }

    pub fn sockets_in_room(&self, room_code: &str) -> Vec<SocketId> {
        self.rooms
            .lock()
            .unwrap()
            .get(room_code)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}
