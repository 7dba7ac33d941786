//! Wire protocol for the lobby game-session server.
//!
//! The transport is a persistent, bidirectional, name-addressed message
//! channel carrying JSON payloads. This crate contains only the envelope
//! shapes shared between the server and any client; it knows nothing about
//! game rules.

use serde::{Deserialize, Serialize};

/// Alphabet used to generate room codes: uppercase, confusion-free
/// (excludes `I O 0 1`).
pub const ROOM_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Room codes are always exactly this many characters.
pub const ROOM_CODE_LEN: usize = 6;

/// Bound on the chat history buffer kept per room.
pub const DEFAULT_MAX_CHAT_HISTORY: usize = 50;

/// Events a client may send to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "ROOM_JOIN")]
    RoomJoin {
        room_code: String,
        player_id: String,
        display_name: String,
    },
    #[serde(rename = "ROOM_LEAVE")]
    RoomLeave,
    #[serde(rename = "ROOM_THEME")]
    RoomTheme { theme_id: String },
    #[serde(rename = "GAME_START")]
    GameStart {
        room_code: String,
        #[serde(default)]
        options: serde_json::Value,
    },
    #[serde(rename = "GAME_ACTION")]
    GameAction {
        room_code: String,
        action: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(rename = "chat:join")]
    ChatJoin,
    #[serde(rename = "chat:send")]
    ChatSend { room_code: String, message: String },
}

/// Events the server may emit to one or more clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "ROOM_UPDATE")]
    RoomUpdate {
        seats: Vec<SeatView>,
        status: RoomStatus,
    },
    #[serde(rename = "GAME_START")]
    GameStart {
        state: serde_json::Value,
        players: Vec<SeatView>,
        #[serde(default)]
        hints: serde_json::Value,
    },
    #[serde(rename = "GAME_STATE")]
    GameState {
        state: serde_json::Value,
        available_actions: Vec<String>,
        last_action: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        valid_moves: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_reconnection: bool,
    },
    #[serde(rename = "GAME_TOKEN_MOVE")]
    GameTokenMove {
        steps: Vec<serde_json::Value>,
        final_state: serde_json::Value,
    },
    #[serde(rename = "GAME_WINNER")]
    GameWinner {
        winner: Option<u8>,
        leaderboard: Vec<LeaderboardEntry>,
        #[serde(default)]
        is_draw: bool,
        #[serde(default)]
        game_result: Option<String>,
    },
    #[serde(rename = "TURN_TIMEOUT_WARNING")]
    TurnTimeoutWarning {
        player_index: u8,
        seconds_remaining: u32,
        is_disconnected: bool,
    },
    #[serde(rename = "TURN_TIMEOUT_CLEARED")]
    TurnTimeoutCleared { player_index: u8 },
    #[serde(rename = "TURN_AUTO_PLAYED")]
    TurnAutoPlayed {
        player_index: u8,
        reason: AutoPlayReason,
        auto_play_count: u8,
        max_auto_plays: u8,
    },
    #[serde(rename = "ERROR")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    #[serde(rename = "chat:message")]
    ChatMessage(ChatEntry),
    #[serde(rename = "chat:history")]
    ChatHistory { entries: Vec<ChatEntry> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoPlayReason {
    Timeout,
    Eliminated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub player_id: String,
    pub display_name: String,
    pub seat_index: u8,
    pub is_host: bool,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub seat_index: u8,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub player_id: String,
    pub display_name: String,
    pub message: String,
    pub sent_at_ms: u64,
}
