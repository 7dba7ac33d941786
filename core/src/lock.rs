//! The single synchronizing primitive shared by action handling, timer
//! fire, and reconnection rearm (spec §5: "do not nest room locks"). The
//! Game Store, Socket Manager, and Turn Timer each own their own data
//! structures; `RoomLocks` only serializes *access*, one `Mutex<()>` per
//! room code, so two concurrent operations on the same room never
//! interleave regardless of which component they touch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        RoomLocks {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_create(&self, room_code: &str) -> Arc<AsyncMutex<()>> {
        let mut guard = self.locks.lock().unwrap();
        guard
            .entry(room_code.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquires the lock for a room, returning an owned guard the caller can
    /// hold across `.await` points.
    pub async fn lock(&self, room_code: &str) -> OwnedMutexGuard<()> {
        let mutex = self.get_or_create(room_code);
        mutex.lock_owned().await
    }

    /// Drops the entry for a room once it's torn down, so the map doesn't
    /// grow unboundedly across the server's lifetime.
    pub fn remove(&self, room_code: &str) {
        self.locks.lock().unwrap().remove(room_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_room_serializes_concurrent_lockers() {
        let locks = Arc::new(RoomLocks::new());
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let l1 = locks.clone();
        let o1 = order.clone();
        let l2 = locks.clone();
        let o2 = order.clone();

        let h1 = tokio::spawn(async move {
            let _g = l1.lock("ROOM01").await;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            o1.lock().await.push(1);
        });
        let h2 = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let _g = l2.lock("ROOM01").await;
            o2.lock().await.push(2);
        });

        let _ = tokio::join!(h1, h2);
        assert_eq!(*order.lock().await, vec![1, 2]);
    }

    #[test]
    fn remove_drops_entry() {
        let locks = RoomLocks::new();
        let _ = locks.get_or_create("ABCDEF");
        assert!(locks.locks.lock().unwrap().contains_key("ABCDEF"));
        locks.remove("ABCDEF");
        assert!(!locks.locks.lock().unwrap().contains_key("ABCDEF"));
    }
}
