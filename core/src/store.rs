//! Game Store (C3): owns the live `Box<dyn GameEngine>` for every room with
//! an active game, plus bookkeeping for staleness sweeps. A coarse
//! `Mutex<HashMap<..>>` guards the table itself (matching the teacher's own
//! `Mutex<HashMap<SocketAddr, ..>>` pattern in `lobby.rs`); per-room
//! serialization is handled one level up by [`crate::lock::RoomLocks`], not
//! by this store.

use crate::engine::GameKind;
use crate::error::EngineError;
use crate::GameEngine;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct GameStoreEntry {
    pub kind: GameKind,
    pub engine: Box<dyn GameEngine>,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
}

#[derive(Default)]
pub struct GameStore {
    entries: Mutex<HashMap<String, GameStoreEntry>>,
}

impl GameStore {
    pub fn new() -> Self {
        GameStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, room_code: &str, kind: GameKind, engine: Box<dyn GameEngine>, now_ms: u64) {
        let entry = GameStoreEntry {
            kind,
            engine,
            created_at_ms: now_ms,
            last_activity_ms: now_ms,
        };
        self.entries.lock().unwrap().insert(room_code.to_string(), entry);
    }

    pub fn exists(&self, room_code: &str) -> bool {
        self.entries.lock().unwrap().contains_key(room_code)
    }

    pub fn delete(&self, room_code: &str) {
        self.entries.lock().unwrap().remove(room_code);
    }

    pub fn touch(&self, room_code: &str, now_ms: u64) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(room_code) {
            entry.last_activity_ms = now_ms;
        }
    }

    /// Runs `f` with exclusive mutable access to one room's engine. Returns
    /// `None` if the room has no live game.
    pub fn with_engine_mut<R>(
        &self,
        room_code: &str,
        f: impl FnOnce(&mut Box<dyn GameEngine>) -> R,
    ) -> Option<R> {
        let mut guard = self.entries.lock().unwrap();
        guard.get_mut(room_code).map(|entry| f(&mut entry.engine))
    }

    pub fn with_engine<R>(&self, room_code: &str, f: impl FnOnce(&dyn GameEngine) -> R) -> Option<R> {
        let guard = self.entries.lock().unwrap();
        guard.get(room_code).map(|entry| f(entry.engine.as_ref()))
    }

    pub fn kind_of(&self, room_code: &str) -> Option<GameKind> {
        self.entries.lock().unwrap().get(room_code).map(|e| e.kind)
    }

    /// Returns room codes whose last activity is older than `max_idle_ms`
    /// relative to `now_ms` (spec §9 "Stale game sweep").
    pub fn sweep_stale(&self, now_ms: u64, max_idle_ms: u64) -> Vec<String> {
        let guard = self.entries.lock().unwrap();
        guard
            .iter()
            .filter(|(_, entry)| now_ms.saturating_sub(entry.last_activity_ms) > max_idle_ms)
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn serialize(&self, room_code: &str) -> Option<Vec<u8>> {
        self.with_engine(room_code, |e| e.serialize())
    }

    pub fn restore(&self, room_code: &str, bytes: &[u8]) -> Option<Result<(), EngineError>> {
        self.with_engine_mut(room_code, |e| e.restore(bytes))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ActionOutcome, PlayerId, Projection, SeatIndex};
    use crate::rng::EngineRng;
    use serde_json::Value;

    struct StubEngine;

    impl GameEngine for StubEngine {
        fn kind(&self) -> GameKind {
            GameKind::TicTacToe
        }
        fn min_seats(&self) -> u8 {
            2
        }
        fn max_seats(&self) -> u8 {
            2
        }
        fn add_player(&mut self, _seat: SeatIndex, _player: PlayerId) -> bool {
            true
        }
        fn remove_player(&mut self, _player: &PlayerId) -> bool {
            true
        }
        fn current_player_index(&self) -> Option<SeatIndex> {
            Some(0)
        }
        fn handle_action(
            &mut self,
            _actor: &PlayerId,
            _action: &str,
            _payload: &Value,
            _rng: &mut dyn EngineRng,
        ) -> Result<ActionOutcome, EngineError> {
            Ok(ActionOutcome::new("noop"))
        }
        fn is_terminal(&self) -> bool {
            false
        }
        fn winner_index(&self) -> Option<SeatIndex> {
            None
        }
        fn auto_play(&mut self, _seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
            ActionOutcome::new("auto")
        }
        fn eliminate(&mut self, _seat: SeatIndex) {}
        fn project_for(&self, _viewer: &PlayerId) -> Projection {
            Projection {
                state: Value::Null,
                available_actions: vec![],
            }
        }
        fn serialize(&self) -> Vec<u8> {
            vec![]
        }
        fn restore(&mut self, _bytes: &[u8]) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn create_get_delete_round_trip() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(StubEngine), 0);
        assert!(store.exists("ABCDEF"));
        assert_eq!(store.kind_of("ABCDEF"), Some(GameKind::TicTacToe));
        store.delete("ABCDEF");
        assert!(!store.exists("ABCDEF"));
    }

    #[test]
    fn sweep_stale_finds_idle_rooms() {
        let store = GameStore::new();
        store.create("OLD001", GameKind::TicTacToe, Box::new(StubEngine), 0);
        store.create("NEW001", GameKind::TicTacToe, Box::new(StubEngine), 590_000);

        let stale = store.sweep_stale(600_001, 600_000);
        assert_eq!(stale, vec!["OLD001".to_string()]);
    }

    #[test]
    fn touch_updates_activity() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(StubEngine), 0);
        store.touch("ABCDEF", 500);
        assert!(store.sweep_stale(600_501, 600_000).contains(&"ABCDEF".to_string()));
        assert!(store.sweep_stale(600_500, 600_000).is_empty());
    }
}
