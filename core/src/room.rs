//! Room and seat bookkeeping (spec §3). A `Room` is metadata only — it
//! never holds engine state, that lives in the Game Store (C3) keyed by the
//! same room code.

use crate::engine::{GameKind, PlayerId, SeatIndex};
use protocol::{RoomStatus, SeatView};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub seat_index: SeatIndex,
    pub is_host: bool,
    pub is_connected: bool,
}

/// A room's lobby-level state: who's seated, what game is selected, and
/// whether it's still accepting joins.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub kind: Option<GameKind>,
    pub seats: Vec<Seat>,
    pub status: RoomStatus,
    pub theme_id: Option<String>,
    pub last_activity_ms: u64,
}

impl Room {
    pub fn new(code: impl Into<String>, now_ms: u64) -> Self {
        Room {
            code: code.into(),
            kind: None,
            seats: Vec::new(),
            status: RoomStatus::Waiting,
            theme_id: None,
            last_activity_ms: now_ms,
        }
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.seats.iter().any(|s| s.player_id == player_id && s.is_host)
    }

    pub fn find_seat(&self, player_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player_id == player_id)
    }

    pub fn find_seat_mut(&mut self, player_id: &str) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.player_id == player_id)
    }

    /// Adds a new player as a non-host seat at the next free index. The very
    /// first seat taken in a fresh room becomes host (spec §3 "the first
    /// player to join a room is its host").
    pub fn join(&mut self, player_id: PlayerId, display_name: String) -> SeatIndex {
        let seat_index = self.seats.len() as SeatIndex;
        let is_host = self.seats.is_empty();
        self.seats.push(Seat {
            player_id,
            display_name,
            seat_index,
            is_host,
            is_connected: true,
        });
        seat_index
    }

    /// Marks a player disconnected without freeing their seat (spec §3:
    /// reconnection keeps the same seat index).
    pub fn mark_disconnected(&mut self, player_id: &str) {
        if let Some(seat) = self.find_seat_mut(player_id) {
            seat.is_connected = false;
        }
    }

    pub fn mark_reconnected(&mut self, player_id: &str) {
        if let Some(seat) = self.find_seat_mut(player_id) {
            seat.is_connected = true;
        }
    }

    pub fn to_seat_views(&self) -> Vec<SeatView> {
        self.seats
            .iter()
            .map(|s| SeatView {
                player_id: s.player_id.clone(),
                display_name: s.display_name.clone(),
                seat_index: s.seat_index,
                is_host: s.is_host,
                is_connected: s.is_connected,
            })
            .collect()
    }
}

/// Stands in for the out-of-scope external persistence layer (spec §3
/// Non-goals: "durable storage of rooms"). `findRoom`/`saveRoom` become an
/// in-memory `RoomRepository`; a durable implementation only needs to
/// satisfy this trait.
pub trait RoomRepository: Send + Sync {
    fn find(&self, code: &str) -> Option<Room>;
    fn save(&self, room: Room);
    fn delete(&self, code: &str);
}

#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: std::sync::Mutex<HashMap<String, Room>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        InMemoryRoomRepository {
            rooms: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl RoomRepository for InMemoryRoomRepository {
    fn find(&self, code: &str) -> Option<Room> {
        self.rooms.lock().unwrap().get(code).cloned()
    }

    fn save(&self, room: Room) {
        self.rooms.lock().unwrap().insert(room.code.clone(), room);
    }

    fn delete(&self, code: &str) {
        self.rooms.lock().unwrap().remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_joiner_becomes_host() {
        let mut room = Room::new("ABCDEF", 0);
        let seat = room.join("p1".into(), "Alice".into());
        assert_eq!(seat, 0);
        assert!(room.is_host("p1"));

        room.join("p2".into(), "Bob".into());
        assert!(!room.is_host("p2"));
    }

    #[test]
    fn disconnect_keeps_seat_index() {
        let mut room = Room::new("ABCDEF", 0);
        room.join("p1".into(), "Alice".into());
        room.mark_disconnected("p1");
        assert_eq!(room.find_seat("p1").unwrap().seat_index, 0);
        assert!(!room.find_seat("p1").unwrap().is_connected);
        room.mark_reconnected("p1");
        assert!(room.find_seat("p1").unwrap().is_connected);
    }

    #[test]
    fn repository_round_trips() {
        let repo = InMemoryRoomRepository::new();
        let mut room = Room::new("ZZZZZZ", 0);
        room.join("p1".into(), "Alice".into());
        repo.save(room);
        assert!(repo.find("ZZZZZZ").is_some());
        repo.delete("ZZZZZZ");
        assert!(repo.find("ZZZZZZ").is_none());
    }
}
