//! Lifecycle Coordinator (C9): the only component allowed to start a game,
//! end a game, or decide a player has exhausted their auto-plays. It wires
//! the Game Store, Socket Manager, Turn Timer, and Room Repository
//! together and is the [`TimerCallbacks`] implementation the scheduler
//! fires into, so timeout handling lives in one place instead of being
//! spread across the socket handler.

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::engine::{GameEngine, GameKind, SeatIndex};
use crate::error::RouterError;
use crate::lock::RoomLocks;
use crate::room::{Room, RoomRepository};
use crate::rng::{EngineRng, StdEngineRng};
use crate::socket::SocketManager;
use crate::store::GameStore;
use crate::timer::{TimerCallbacks, TurnTimerScheduler};
use async_trait::async_trait;
use protocol::{LeaderboardEntry, RoomStatus, ServerEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

pub struct LifecycleCoordinator {
    pub repo: Arc<dyn RoomRepository>,
    pub store: Arc<GameStore>,
    pub sockets: Arc<SocketManager>,
    pub locks: Arc<RoomLocks>,
    pub config: ServerConfig,
    auto_play_counts: Mutex<HashMap<(String, SeatIndex), u8>>,
    /// Set once, right after the scheduler is constructed, to break the
    /// circular `Arc` dependency (the scheduler needs an
    /// `Arc<dyn TimerCallbacks>` pointing back at this coordinator). Lets
    /// [`Self::on_fired`] rearm or close out the game itself instead of
    /// pushing that responsibility onto whatever called the scheduler.
    timers: OnceLock<Arc<TurnTimerScheduler>>,
}

impl LifecycleCoordinator {
    pub fn new(
        repo: Arc<dyn RoomRepository>,
        store: Arc<GameStore>,
        sockets: Arc<SocketManager>,
        locks: Arc<RoomLocks>,
        config: ServerConfig,
    ) -> Self {
        LifecycleCoordinator {
            repo,
            store,
            sockets,
            locks,
            config,
            auto_play_counts: Mutex::new(HashMap::new()),
            timers: OnceLock::new(),
        }
    }

    /// Wires the scheduler in after construction. Must be called once,
    /// before any timer can fire, or a timed-out turn will notify clients
    /// but never rearm or close out the game.
    pub fn set_timers(&self, timers: Arc<TurnTimerScheduler>) {
        let _ = self.timers.set(timers);
    }

    /// Gates and performs a game start (spec §4.3): the room must be
    /// waiting and have enough (but not too many) seated players for the
    /// chosen game.
    pub fn start_game(
        &self,
        timers: &TurnTimerScheduler,
        room_code: &str,
        kind: GameKind,
        engine: Box<dyn GameEngine>,
        now_ms: u64,
    ) -> Result<(), RouterError> {
        let mut room = self.repo.find(room_code).ok_or(RouterError::RoomNotFound)?;
        if room.status != RoomStatus::Waiting {
            return Err(RouterError::AlreadyStarted);
        }
        let seated = room.seats.len() as u8;
        if seated < engine.min_seats() {
            return Err(RouterError::TooFewSeats);
        }
        if seated > engine.max_seats() {
            return Err(RouterError::TooManySeats);
        }

        let players = room.to_seat_views();
        room.kind = Some(kind);
        room.status = RoomStatus::Playing;
        room.last_activity_ms = now_ms;

        let starting_seat = engine.current_player_index();
        let timer_excluded = engine.is_timer_excluded();
        self.store.create(room_code, kind, engine, now_ms);
        self.repo.save(room.clone());

        let broadcaster = Broadcaster::new(&self.sockets);
        self.store.with_engine(room_code, |e| {
            self.sockets.emit_to_room(
                room_code,
                ServerEvent::GameStart {
                    state: serde_json::Value::Null,
                    players: players.clone(),
                    hints: serde_json::Value::Null,
                },
            );
            broadcaster.broadcast_state(&room, e, None);
        });

        if !timer_excluded {
            if let Some(seat) = starting_seat {
                timers.arm(room_code, seat);
            }
        }
        Ok(())
    }

    /// Applies a successfully-dispatched action's side effects: broadcast
    /// the new state, rearm or clear the timer, and end the game if the
    /// engine reports terminal.
    pub fn after_action(
        &self,
        timers: &TurnTimerScheduler,
        room_code: &str,
        last_action: Option<String>,
        now_ms: u64,
    ) {
        let Some(mut room) = self.repo.find(room_code) else {
            return;
        };
        room.last_activity_ms = now_ms;
        self.store.touch(room_code, now_ms);

        let broadcaster = Broadcaster::new(&self.sockets);
        let terminal = self
            .store
            .with_engine(room_code, |e| {
                broadcaster.broadcast_state(&room, e, last_action.clone());
                e.is_terminal()
            })
            .unwrap_or(false);

        if terminal {
            self.finish_game(timers, &mut room);
        } else {
            let next_seat = self.store.with_engine(room_code, |e| e.current_player_index()).flatten();
            if let Some(seat) = next_seat {
                timers.arm(room_code, seat);
            } else {
                timers.cancel(room_code);
            }
        }
    }

    fn finish_game(&self, timers: &TurnTimerScheduler, room: &mut Room) {
        timers.cancel(&room.code);
        room.status = RoomStatus::Finished;

        let winner = self.store.with_engine(&room.code, |e| e.winner_index()).flatten();
        let leaderboard: Vec<LeaderboardEntry> = room
            .seats
            .iter()
            .map(|s| LeaderboardEntry {
                player_id: s.player_id.clone(),
                seat_index: s.seat_index,
                rank: if Some(s.seat_index) == winner { 1 } else { 2 },
            })
            .collect();

        self.sockets.emit_to_room(
            &room.code,
            ServerEvent::GameWinner {
                winner,
                leaderboard,
                is_draw: winner.is_none(),
                game_result: None,
            },
        );
        self.repo.save(room.clone());
    }

    /// Resets a seat's auto-play count back to zero. Spec §4.8 requires a
    /// manual action from the seat to restore its full elimination budget;
    /// without this, one early timeout would permanently lower the seat's
    /// threshold for the rest of the game.
    pub fn clear_auto_play_count(&self, room_code: &str, seat: SeatIndex) {
        self.auto_play_counts.lock().unwrap().remove(&(room_code.to_string(), seat));
    }

    /// Removes stale games past `stale_game_max_idle` (spec §9 sweep).
    pub fn sweep_stale(&self, timers: &TurnTimerScheduler, now_ms: u64) {
        for room_code in self.store.sweep_stale(now_ms, self.config.stale_game_max_idle.as_millis() as u64) {
            timers.remove_room(&room_code);
            self.store.delete(&room_code);
            self.locks.remove(&room_code);
        }
    }
}

#[async_trait]
impl TimerCallbacks for LifecycleCoordinator {
    async fn on_warning(&self, room_code: &str, seat: SeatIndex, seconds_remaining: u32) {
        let is_disconnected = self
            .repo
            .find(room_code)
            .and_then(|r| r.seats.into_iter().find(|s| s.seat_index == seat))
            .map(|s| !s.is_connected)
            .unwrap_or(false);

        self.sockets.emit_to_room(
            room_code,
            ServerEvent::TurnTimeoutWarning {
                player_index: seat,
                seconds_remaining,
                is_disconnected,
            },
        );
    }

    async fn on_fired(&self, room_code: &str, seat: SeatIndex) {
        let _guard = self.locks.lock(room_code).await;

        let Some(room) = self.repo.find(room_code) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }

        let count = {
            let mut counts = self.auto_play_counts.lock().unwrap();
            let key = (room_code.to_string(), seat);
            let c = counts.entry(key).or_insert(0);
            *c += 1;
            *c
        };

        let eliminated = count >= self.config.max_auto_plays;
        let mut rng = StdEngineRng::from_entropy();
        self.store.with_engine_mut(room_code, |e| {
            if eliminated {
                e.eliminate(seat);
            } else {
                let _outcome = e.auto_play(seat, &mut rng as &mut dyn EngineRng);
            }
        });

        self.sockets.emit_to_room(
            room_code,
            ServerEvent::TurnAutoPlayed {
                player_index: seat,
                reason: if eliminated {
                    protocol::AutoPlayReason::Eliminated
                } else {
                    protocol::AutoPlayReason::Timeout
                },
                auto_play_count: count,
                max_auto_plays: self.config.max_auto_plays,
            },
        );

        if let Some(timers) = self.timers.get() {
            self.after_action(
                timers,
                room_code,
                Some(format!("seat {seat} auto-played on timeout")),
                crate::clock::now_ms(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::InMemoryRoomRepository;
    use std::time::Duration;

    fn coordinator() -> LifecycleCoordinator {
        LifecycleCoordinator::new(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(GameStore::new()),
            Arc::new(SocketManager::new()),
            Arc::new(RoomLocks::new()),
            ServerConfig::default(),
        )
    }

    #[test]
    fn start_game_rejects_too_few_seats() {
        use crate::engine::{ActionOutcome, PlayerId, Projection};
        use crate::error::EngineError;
        use serde_json::Value;

        struct TwoSeatEngine;
        impl GameEngine for TwoSeatEngine {
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

        let coord = coordinator();
        let mut room = Room::new("ABCDEF", 0);
        room.join("p1".into(), "Alice".into());
        coord.repo.save(room);

        let timers = TurnTimerScheduler::new(Arc::new(coordinator()), Duration::from_millis(1000));
        let result = coord.start_game(&timers, "ABCDEF", GameKind::TicTacToe, Box::new(TwoSeatEngine), 0);
        assert_eq!(result.unwrap_err(), RouterError::TooFewSeats);
    }

    #[tokio::test]
    async fn on_fired_eliminates_only_past_the_threshold_and_resets_on_manual_action() {
        use crate::engine::{ActionOutcome, PlayerId, Projection};
        use crate::error::EngineError;
        use serde_json::Value;
        use std::sync::atomic::{AtomicU32, AtomicBool};

        struct CountingEngine {
            auto_plays: Arc<AtomicU32>,
            eliminated: Arc<AtomicBool>,
        }
        impl GameEngine for CountingEngine {
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
                self.auto_plays.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                ActionOutcome::new("auto")
            }
            fn eliminate(&mut self, _seat: SeatIndex) {
                self.eliminated.store(true, std::sync::atomic::Ordering::SeqCst);
            }
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

        let mut config = ServerConfig::default();
        config.max_auto_plays = 3;
        let coord = Arc::new(LifecycleCoordinator::new(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(GameStore::new()),
            Arc::new(SocketManager::new()),
            Arc::new(RoomLocks::new()),
            config,
        ));
        let timers = TurnTimerScheduler::new(coord.clone(), Duration::from_millis(1000));
        coord.set_timers(Arc::new(timers));

        let mut room = Room::new("ABCDEF", 0);
        room.join("p1".into(), "Alice".into());
        room.join("p2".into(), "Bob".into());
        room.status = protocol::RoomStatus::Playing;
        coord.repo.save(room);

        let auto_plays = Arc::new(AtomicU32::new(0));
        let eliminated = Arc::new(AtomicBool::new(false));
        coord.store.create(
            "ABCDEF",
            GameKind::TicTacToe,
            Box::new(CountingEngine { auto_plays: auto_plays.clone(), eliminated: eliminated.clone() }),
            0,
        );

        coord.on_fired("ABCDEF", 0).await;
        coord.on_fired("ABCDEF", 0).await;
        assert_eq!(auto_plays.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(!eliminated.load(std::sync::atomic::Ordering::SeqCst));

        // A manual action resets the seat's budget before the third timeout.
        coord.clear_auto_play_count("ABCDEF", 0);
        coord.on_fired("ABCDEF", 0).await;
        coord.on_fired("ABCDEF", 0).await;
        assert_eq!(auto_plays.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert!(!eliminated.load(std::sync::atomic::Ordering::SeqCst));

        coord.on_fired("ABCDEF", 0).await;
        assert!(eliminated.load(std::sync::atomic::Ordering::SeqCst));
    }
}
