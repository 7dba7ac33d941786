//! Application state (spec §9: "constructor injection, not module-level
//! mutable globals"). Every long-lived component the websocket handler
//! touches is built once in `main` and handed to `AppState::new`; nothing
//! in this crate reaches for a `static` or `lazy_static`.

use lobby_core::clock::now_ms;
use lobby_core::config::ServerConfig;
use lobby_core::lifecycle::LifecycleCoordinator;
use lobby_core::lock::RoomLocks;
use lobby_core::room::{InMemoryRoomRepository, RoomRepository};
use lobby_core::socket::{SocketId, SocketManager};
use lobby_core::store::GameStore;
use lobby_core::timer::TurnTimerScheduler;
use protocol::ChatEntry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct AppState {
    pub repo: Arc<dyn RoomRepository>,
    pub store: Arc<GameStore>,
    pub sockets: Arc<SocketManager>,
    pub locks: Arc<RoomLocks>,
    pub lifecycle: Arc<LifecycleCoordinator>,
    pub timers: Arc<TurnTimerScheduler>,
    pub config: ServerConfig,
    chat: Mutex<HashMap<String, VecDeque<ChatEntry>>>,
    next_socket_id: AtomicU64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let repo: Arc<dyn RoomRepository> = Arc::new(InMemoryRoomRepository::new());
        let store = Arc::new(GameStore::new());
        let sockets = Arc::new(SocketManager::new());
        let locks = Arc::new(RoomLocks::new());

        let lifecycle = Arc::new(LifecycleCoordinator::new(
            repo.clone(),
            store.clone(),
            sockets.clone(),
            locks.clone(),
            config.clone(),
        ));
        let timers = Arc::new(TurnTimerScheduler::new(lifecycle.clone(), config.turn_timeout));
        lifecycle.set_timers(timers.clone());

        Arc::new(AppState {
            repo,
            store,
            sockets,
            locks,
            lifecycle,
            timers,
            config,
            chat: Mutex::new(HashMap::new()),
            next_socket_id: AtomicU64::new(1),
        })
    }

    pub fn next_socket_id(&self) -> SocketId {
        self.next_socket_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Appends to a room's bounded chat history and returns the entry to
    /// broadcast.
    pub fn push_chat(&self, room_code: &str, entry: ChatEntry) -> ChatEntry {
        let mut chat = self.chat.lock().unwrap();
        let history = chat.entry(room_code.to_string()).or_default();
        history.push_back(entry.clone());
        while history.len() > self.config.max_chat_history {
            history.pop_front();
        }
        entry
    }

    pub fn chat_history(&self, room_code: &str) -> Vec<ChatEntry> {
        self.chat
            .lock()
            .unwrap()
            .get(room_code)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn forget_chat(&self, room_code: &str) {
        self.chat.lock().unwrap().remove(room_code);
    }

    pub fn now_ms(&self) -> u64 {
        now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_history_is_bounded() {
        let mut config = ServerConfig::default();
        config.max_chat_history = 2;
        let state = AppState::new(config);

        for i in 0..5 {
            state.push_chat(
                "ABCDEF",
                ChatEntry {
                    player_id: "p1".into(),
                    display_name: "Alice".into(),
                    message: format!("msg {i}"),
                    sent_at_ms: i,
                },
            );
        }
        let history = state.chat_history("ABCDEF");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "msg 3");
        assert_eq!(history[1].message, "msg 4");
    }
}
