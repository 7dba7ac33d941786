//! Environment-driven configuration, loaded once at startup (spec §6).
//! All defaults are safe to run with no environment set at all, the same
//! way the teacher's `GameConfig.json` hot-reload degrades gracefully.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub turn_timeout: Duration,
    pub max_auto_plays: u8,
    pub max_chat_history: usize,
    pub stale_game_max_idle: Duration,
    pub stale_sweep_interval: Duration,
    pub enable_poker: bool,
    pub debug_events: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            turn_timeout: Duration::from_millis(15_000),
            max_auto_plays: 3,
            max_chat_history: 50,
            stale_game_max_idle: Duration::from_millis(600_000),
            stale_sweep_interval: Duration::from_millis(300_000),
            enable_poker: true,
            debug_events: false,
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the environment, falling back to the safe
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            turn_timeout: env_millis("TURN_TIMEOUT_MS").unwrap_or(defaults.turn_timeout),
            max_auto_plays: env_u8("MAX_AUTO_PLAYS").unwrap_or(defaults.max_auto_plays),
            max_chat_history: env_usize("MAX_CHAT_HISTORY").unwrap_or(defaults.max_chat_history),
            stale_game_max_idle: env_millis("STALE_GAME_MAX_IDLE_MS")
                .unwrap_or(defaults.stale_game_max_idle),
            stale_sweep_interval: env_millis("STALE_SWEEP_INTERVAL_MS")
                .unwrap_or(defaults.stale_sweep_interval),
            enable_poker: env_bool("ENABLE_POKER").unwrap_or(defaults.enable_poker),
            debug_events: env_bool("DEBUG_EVENTS").unwrap_or(defaults.debug_events),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key).ok()?.parse::<u64>().ok().map(Duration::from_millis)
}

fn env_u8(key: &str) -> Option<u8> {
    env::var(key).ok()?.parse().ok()
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok()?.parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.turn_timeout, Duration::from_millis(15_000));
        assert_eq!(cfg.max_auto_plays, 3);
        assert_eq!(cfg.max_chat_history, 50);
        assert_eq!(cfg.stale_game_max_idle, Duration::from_millis(600_000));
        assert_eq!(cfg.stale_sweep_interval, Duration::from_millis(300_000));
    }
}
