//! Wall-clock time as milliseconds since epoch, isolated in one place so
//! call sites that need "now" (game-store staleness, lifecycle timestamps)
//! don't each reach for `SystemTime` directly.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
