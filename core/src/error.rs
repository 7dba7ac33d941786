//! The error taxonomy from spec §7. These are kinds, not exception types:
//! envelope/lifecycle errors are caught by the Action Router before the
//! engine is ever touched, turn/rules errors come back out of
//! [`crate::engine::GameEngine::handle_action`] itself.

use thiserror::Error;

/// Errors an engine can raise while validating or applying an action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("invalid phase for action")]
    InvalidPhase,
    #[error("illegal move")]
    IllegalMove,
    #[error("invalid promotion piece")]
    InvalidPromotion,
    #[error("insufficient chips")]
    InsufficientChips,
    #[error("cannot check, must call")]
    CannotCheck,
    #[error("unknown action {0}")]
    UnknownAction(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("seat is full or player already seated")]
    SeatUnavailable,
    #[error("corrupt snapshot")]
    CorruptSnapshot,
}

/// Errors the Action Router / Lifecycle Coordinator raise before an engine
/// is ever consulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("malformed payload")]
    MalformedEnvelope,
    #[error("room not found")]
    RoomNotFound,
    #[error("not in a room")]
    NotInRoom,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("game already started")]
    AlreadyStarted,
    #[error("game already over")]
    AlreadyOver,
    #[error("too few seats")]
    TooFewSeats,
    #[error("too many seats")]
    TooManySeats,
    #[error("not host")]
    NotHost,
    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl RouterError {
    /// A stable short code for clients that want to branch on error kind
    /// instead of parsing the human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::MalformedEnvelope => "malformed_envelope",
            RouterError::RoomNotFound => "room_not_found",
            RouterError::NotInRoom => "not_in_room",
            RouterError::NotAuthenticated => "not_authenticated",
            RouterError::AlreadyStarted => "already_started",
            RouterError::AlreadyOver => "already_over",
            RouterError::TooFewSeats => "too_few_seats",
            RouterError::TooManySeats => "too_many_seats",
            RouterError::NotHost => "not_host",
            RouterError::Engine(EngineError::NotYourTurn) => "not_your_turn",
            RouterError::Engine(EngineError::InvalidPhase) => "invalid_phase",
            RouterError::Engine(EngineError::IllegalMove) => "illegal_move",
            RouterError::Engine(EngineError::InvalidPromotion) => "invalid_promotion",
            RouterError::Engine(EngineError::InsufficientChips) => "insufficient_chips",
            RouterError::Engine(EngineError::CannotCheck) => "cannot_check",
            RouterError::Engine(EngineError::UnknownAction(_)) => "unknown_action",
            RouterError::Engine(EngineError::MalformedPayload(_)) => "malformed_payload",
            RouterError::Engine(EngineError::SeatUnavailable) => "seat_unavailable",
            RouterError::Engine(EngineError::CorruptSnapshot) => "corrupt_snapshot",
        }
    }
}
