//! Turn Timer Scheduler (C8): arms a countdown per room whenever the active
//! seat changes, and fires a callback into the lifecycle layer when a
//! player doesn't act in time. Mirrors the state machine the teacher's
//! `backbone-lib/src/timer.rs` used for connection keepalives (Idle ->
//! Armed -> Fired), generalized to per-room turns and to the 1-second
//! warning ticks required by spec §4.8.
//!
//! # Cancellation safety
//!
//! A room's timer can be rearmed (new turn) or cancelled (game over, all
//! players disconnected) while a countdown is in flight. Rather than reach
//! for `tokio_util::sync::CancellationToken`, each arm bumps a per-room
//! `generation` counter; the sleeping task captures the generation it was
//! armed with and checks, after waking, that the room's generation hasn't
//! moved on. A cancelled or superseded timer that wakes late is a no-op,
//! never a late `FIRED` (spec §4.8 ordering guarantee).

use crate::engine::SeatIndex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callbacks invoked by a fired or ticking timer. Implemented by the
/// lifecycle layer so this module stays ignorant of rooms, sockets, and
/// engines.
#[async_trait]
pub trait TimerCallbacks: Send + Sync {
    async fn on_warning(&self, room_code: &str, seat: SeatIndex, seconds_remaining: u32);
    async fn on_fired(&self, room_code: &str, seat: SeatIndex);
}

struct RoomTimerState {
    generation: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

pub struct TurnTimerScheduler {
    callbacks: Arc<dyn TimerCallbacks>,
    timeout: Duration,
    rooms: Mutex<HashMap<String, RoomTimerState>>,
}

impl TurnTimerScheduler {
    pub fn new(callbacks: Arc<dyn TimerCallbacks>, timeout: Duration) -> Self {
        TurnTimerScheduler {
            callbacks,
            timeout,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Arms (or rearms, superseding any prior countdown) the timer for one
    /// room/seat pair.
    pub fn arm(&self, room_code: &str, seat: SeatIndex) {
        let (generation_cell, my_gen) = {
            let mut guard = self.rooms.lock().unwrap();
            let entry = guard
                .entry(room_code.to_string())
                .or_insert_with(|| RoomTimerState {
                    generation: Arc::new(AtomicU64::new(0)),
                    handle: None,
                });
            let my_gen = entry.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(old) = entry.handle.take() {
                old.abort();
            }
            (entry.generation.clone(), my_gen)
        };

        let callbacks = self.callbacks.clone();
        let timeout = self.timeout;
        let room_code = room_code.to_string();

        let handle = tokio::spawn(async move {
            let warning_at = timeout.saturating_sub(Duration::from_secs(1));
            if !warning_at.is_zero() {
                tokio::time::sleep(warning_at).await;
                if generation_cell.load(Ordering::SeqCst) != my_gen {
                    return;
                }
                callbacks.on_warning(&room_code, seat, 1).await;
                tokio::time::sleep(Duration::from_secs(1)).await;
            } else {
                tokio::time::sleep(timeout).await;
            }

            if generation_cell.load(Ordering::SeqCst) != my_gen {
                return;
            }
            callbacks.on_fired(&room_code, seat).await;
        });

        let mut guard = self.rooms.lock().unwrap();
        if let Some(entry) = guard.get_mut(&room_code) {
            entry.handle = Some(handle);
        }
    }

    /// Cancels any in-flight countdown for a room (spec §4.8: clearing a
    /// timer without arming a new one, e.g. on game-over).
    pub fn cancel(&self, room_code: &str) {
        let mut guard = self.rooms.lock().unwrap();
        if let Some(entry) = guard.get_mut(room_code) {
            entry.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = entry.handle.take() {
                handle.abort();
            }
        }
    }

    pub fn remove_room(&self, room_code: &str) {
        self.cancel(room_code);
        self.rooms.lock().unwrap().remove(room_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct CountingCallbacks {
        fired: AtomicUsize,
        warned: AtomicUsize,
        notify: Notify,
    }

    #[async_trait]
    impl TimerCallbacks for CountingCallbacks {
        async fn on_warning(&self, _room_code: &str, _seat: SeatIndex, _seconds_remaining: u32) {
            self.warned.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_fired(&self, _room_code: &str, _seat: SeatIndex) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_timeout_elapses() {
        let callbacks = Arc::new(CountingCallbacks {
            fired: AtomicUsize::new(0),
            warned: AtomicUsize::new(0),
            notify: Notify::new(),
        });
        let scheduler = TurnTimerScheduler::new(callbacks.clone(), Duration::from_millis(2000));
        scheduler.arm("ABCDEF", 0);

        tokio::time::advance(Duration::from_millis(2100)).await;
        callbacks.notify.notified().await;

        assert_eq!(callbacks.fired.load(Ordering::SeqCst), 1);
        assert_eq!(callbacks.warned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_suppresses_a_late_fire() {
        let callbacks = Arc::new(CountingCallbacks {
            fired: AtomicUsize::new(0),
            warned: AtomicUsize::new(0),
            notify: Notify::new(),
        });
        let scheduler = TurnTimerScheduler::new(callbacks.clone(), Duration::from_millis(2000));
        scheduler.arm("ABCDEF", 0);
        scheduler.cancel("ABCDEF");

        tokio::time::advance(Duration::from_millis(3000)).await;
        tokio::task::yield_now().await;

        assert_eq!(callbacks.fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_supersedes_the_prior_countdown() {
        let callbacks = Arc::new(CountingCallbacks {
            fired: AtomicUsize::new(0),
            warned: AtomicUsize::new(0),
            notify: Notify::new(),
        });
        let scheduler = TurnTimerScheduler::new(callbacks.clone(), Duration::from_millis(2000));
        scheduler.arm("ABCDEF", 0);
        tokio::time::advance(Duration::from_millis(500)).await;
        scheduler.arm("ABCDEF", 1);

        tokio::time::advance(Duration::from_millis(2100)).await;
        callbacks.notify.notified().await;

        assert_eq!(callbacks.fired.load(Ordering::SeqCst), 1);
    }
}
