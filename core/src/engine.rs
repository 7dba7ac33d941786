//! Core abstractions for the server-authoritative game architecture.
//!
//! This module defines the contract every game variant satisfies. Unlike the
//! teacher's client-hosted [`BackEndArchitecture`] (which ran on a player's
//! machine and pushed deltas out over a relay), a [`GameEngine`] here lives
//! inside the server process and is the sole source of truth: every action
//! is validated and applied in place, and the only thing that ever leaves
//! the engine is a masked [`Projection`] built specifically for one viewer.
//!
//! # Object safety
//!
//! The distilled spec describes the contract with a generic `State`
//! associated type. That shape is not object-safe, and the Game Store (C3)
//! needs to hold a single `HashMap` of heterogeneous engines behind one
//! vtable, so `State` is erased to `serde_json::Value` at the trait
//! boundary: every engine still keeps its real, strongly-typed state
//! privately, it just hands out `Value` snapshots at the contract's edges.

use crate::error::EngineError;
use crate::rng::EngineRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type PlayerId = String;
pub type SeatIndex = u8;

/// The closed set of game kinds the server knows how to host (spec §9:
/// "enumerate kinds explicitly" rather than a duck-typed factory map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Chess,
    Poker,
    Ludo,
    SnakeLadder,
    Monopoly,
    TicTacToe,
    Sudoku,
    TwentyFortyEight,
    Memory,
    Candy,
}

impl GameKind {
    pub const ALL: [GameKind; 10] = [
        GameKind::Chess,
        GameKind::Poker,
        GameKind::Ludo,
        GameKind::SnakeLadder,
        GameKind::Monopoly,
        GameKind::TicTacToe,
        GameKind::Sudoku,
        GameKind::TwentyFortyEight,
        GameKind::Memory,
        GameKind::Candy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Chess => "chess",
            GameKind::Poker => "poker",
            GameKind::Ludo => "ludo",
            GameKind::SnakeLadder => "snake_ladder",
            GameKind::Monopoly => "monopoly",
            GameKind::TicTacToe => "tic_tac_toe",
            GameKind::Sudoku => "sudoku",
            GameKind::TwentyFortyEight => "2048",
            GameKind::Memory => "memory",
            GameKind::Candy => "candy",
        }
    }

    pub fn from_str(s: &str) -> Option<GameKind> {
        GameKind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// A viewer-specific rendering of engine state with secrets masked.
///
/// Engines own masking: the broadcaster never clones and edits state itself,
/// it only ever asks for a `Projection` (spec §9 "Hidden-information
/// masking").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub state: Value,
    pub available_actions: Vec<String>,
}

/// An optional animation hint describing how a move should be played out on
/// screen, independent of the authoritative state change itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMoveHint {
    pub steps: Vec<Value>,
    pub final_state: Value,
}

/// What happened as the result of one accepted action (or auto-play).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Short machine-readable description, echoed back as `lastAction`.
    pub description: String,
    /// Present only for engines that support move animation (spec §4.6).
    pub token_move: Option<TokenMoveHint>,
}

impl ActionOutcome {
    pub fn new(description: impl Into<String>) -> Self {
        ActionOutcome {
            description: description.into(),
            token_move: None,
        }
    }

    pub fn with_token_move(mut self, hint: TokenMoveHint) -> Self {
        self.token_move = Some(hint);
        self
    }
}

/// The polymorphic contract every game variant satisfies (spec §4.1, C1).
pub trait GameEngine: Send {
    fn kind(&self) -> GameKind;
    fn min_seats(&self) -> u8;
    fn max_seats(&self) -> u8;

    /// Adds a player to a free seat. Returns `false` if the room is full or
    /// the player is already seated.
    fn add_player(&mut self, seat: SeatIndex, player: PlayerId) -> bool;
    fn remove_player(&mut self, player: &PlayerId) -> bool;

    /// `None` for single-player puzzle engines with no turn model; those
    /// engines are also timer-excluded (see [`GameEngine::is_timer_excluded`]).
    fn current_player_index(&self) -> Option<SeatIndex>;

    /// Only the acting player's allowed actions mutate state. On error the
    /// engine state must be left byte-identical to before the call (spec
    /// §8 universal invariant).
    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError>;

    fn is_terminal(&self) -> bool;
    fn winner_index(&self) -> Option<SeatIndex>;

    /// The engine's fallback move for a disconnected player.
    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome;

    /// Marks a seat eliminated. The engine decides whether others inherit
    /// the turn/pot or the game ends outright.
    fn eliminate(&mut self, seat: SeatIndex);

    fn project_for(&self, viewer: &PlayerId) -> Projection;

    fn serialize(&self) -> Vec<u8>;
    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    /// Single-player puzzle engines (and Chess, which runs its own clock)
    /// bypass the Turn Timer scheduler entirely (spec §4.8).
    fn is_timer_excluded(&self) -> bool {
        false
    }
}
