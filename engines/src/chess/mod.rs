//! Chess: full legal move generation with self-check filtering, castling,
//! en passant, promotion, the 50-move rule, and insufficient-material
//! draws. Chess runs its own clock instead of the per-room Turn Timer
//! (C8) — `is_timer_excluded` returns `true` and the board carries its
//! own `(kind, initialMs, incrementMs, whiteRemainingMs,
//! blackRemainingMs, lastMoveEpochMs)` that is debited on every move and
//! checked for expiry on every touch.

mod board;
mod moves;

use board::{Board, ClockKind, Color, Outcome, PieceType, Square};
use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::EngineRng;
use serde::Deserialize;
use serde_json::Value;

/// Default time control: 10 minutes per side, no increment.
const DEFAULT_INITIAL_MS: u64 = 10 * 60 * 1000;
const DEFAULT_INCREMENT_MS: u64 = 0;

#[derive(Deserialize)]
struct MovePayload {
    from: String,
    to: String,
    #[serde(default)]
    promotion: Option<String>,
}

pub struct ChessEngine {
    white: Option<PlayerId>,
    black: Option<PlayerId>,
    board: Board,
}

impl ChessEngine {
    pub fn new() -> Self {
        let mut board = Board::initial();
        board.start_clock(ClockKind::Fischer, DEFAULT_INITIAL_MS, DEFAULT_INCREMENT_MS, lobby_core::clock::now_ms());
        ChessEngine {
            white: None,
            black: None,
            board,
        }
    }

    fn seat_color(&self, seat: SeatIndex) -> Color {
        if seat == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    fn seat_of(&self, player: &str) -> Option<SeatIndex> {
        if self.white.as_deref() == Some(player) {
            Some(0)
        } else if self.black.as_deref() == Some(player) {
            Some(1)
        } else {
            None
        }
    }

    fn handle_move(&mut self, actor: &PlayerId, payload: &Value) -> Result<ActionOutcome, EngineError> {
        if self.board.is_game_over() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if self.seat_color(seat) != self.board.side_to_move {
            return Err(EngineError::NotYourTurn);
        }

        let mv: MovePayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        let from = Square::parse(&mv.from).ok_or(EngineError::IllegalMove)?;
        let to = Square::parse(&mv.to).ok_or(EngineError::IllegalMove)?;
        let promotion = match mv.promotion.as_deref() {
            None => None,
            Some("queen") => Some(PieceType::Queen),
            Some("rook") => Some(PieceType::Rook),
            Some("bishop") => Some(PieceType::Bishop),
            Some("knight") => Some(PieceType::Knight),
            Some(_) => return Err(EngineError::InvalidPromotion),
        };

        let legal_moves = self.board.legal_moves_from(from);
        let chosen = legal_moves
            .into_iter()
            .find(|m| m.to == to && m.promotion == promotion)
            .ok_or(EngineError::IllegalMove)?;

        self.board.apply(&chosen, lobby_core::clock::now_ms());
        Ok(ActionOutcome::new(format!("{actor} played {}{}", mv.from, mv.to)))
    }

    fn handle_resign(&mut self, actor: &PlayerId) -> Result<ActionOutcome, EngineError> {
        if self.board.is_game_over() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        let color = self.seat_color(seat);
        self.board.force_result(Outcome::Resignation(color.opposite()));
        Ok(ActionOutcome::new(format!("{actor} resigned")))
    }

    fn handle_offer_draw(&mut self, actor: &PlayerId) -> Result<ActionOutcome, EngineError> {
        if self.board.is_game_over() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        self.board.set_draw_offer(self.seat_color(seat));
        Ok(ActionOutcome::new(format!("{actor} offered a draw")))
    }

    fn handle_accept_draw(&mut self, actor: &PlayerId) -> Result<ActionOutcome, EngineError> {
        if self.board.is_game_over() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        let color = self.seat_color(seat);
        if self.board.draw_offer() != Some(color.opposite()) {
            return Err(EngineError::InvalidPhase);
        }
        self.board.force_result(Outcome::DrawAgreed);
        Ok(ActionOutcome::new(format!("{actor} accepted the draw")))
    }

    fn handle_decline_draw(&mut self, actor: &PlayerId) -> Result<ActionOutcome, EngineError> {
        if self.board.is_game_over() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        let color = self.seat_color(seat);
        if self.board.draw_offer() != Some(color.opposite()) {
            return Err(EngineError::InvalidPhase);
        }
        self.board.clear_draw_offer();
        Ok(ActionOutcome::new(format!("{actor} declined the draw")))
    }
}

impl Default for ChessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for ChessEngine {
    fn kind(&self) -> GameKind {
        GameKind::Chess
    }
    fn min_seats(&self) -> u8 {
        2
    }
    fn max_seats(&self) -> u8 {
        2
    }

    fn add_player(&mut self, seat: SeatIndex, player: PlayerId) -> bool {
        match seat {
            0 if self.white.is_none() => {
                self.white = Some(player);
                true
            }
            1 if self.black.is_none() => {
                self.black = Some(player);
                true
            }
            _ => false,
        }
    }

    fn remove_player(&mut self, player: &PlayerId) -> bool {
        if self.white.as_ref() == Some(player) {
            self.white = None;
            true
        } else if self.black.as_ref() == Some(player) {
            self.black = None;
            true
        } else {
            false
        }
    }

    fn current_player_index(&self) -> Option<SeatIndex> {
        if self.board.is_game_over() {
            None
        } else {
            Some(match self.board.side_to_move {
                Color::White => 0,
                Color::Black => 1,
            })
        }
    }

    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        _rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        self.board.check_clock_timeout(lobby_core::clock::now_ms());

        match action {
            "move" => self.handle_move(actor, payload),
            "resign" => self.handle_resign(actor),
            "offer_draw" => self.handle_offer_draw(actor),
            "accept_draw" => self.handle_accept_draw(actor),
            "decline_draw" => self.handle_decline_draw(actor),
            _ => Err(EngineError::UnknownAction(action.to_string())),
        }
    }

    fn is_terminal(&self) -> bool {
        self.board.is_game_over()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        let winner = match self.board.outcome() {
            Some(Outcome::Checkmate(winner)) => Some(winner),
            Some(Outcome::Resignation(winner)) => Some(winner),
            Some(Outcome::Timeout(winner)) => Some(winner),
            _ => None,
        };
        winner.map(|color| match color {
            Color::White => 0,
            Color::Black => 1,
        })
    }

    fn auto_play(&mut self, seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
        self.board.check_clock_timeout(lobby_core::clock::now_ms());
        let color = self.seat_color(seat);
        if color != self.board.side_to_move || self.board.is_game_over() {
            return ActionOutcome::new("no legal auto-play available");
        }
        let Some(mv) = self.board.any_legal_move() else {
            return ActionOutcome::new("no legal moves, stalemate or checkmate");
        };
        self.board.apply(&mv, lobby_core::clock::now_ms());
        ActionOutcome::new(format!("auto-played {}{}", mv.from.to_algebraic(), mv.to.to_algebraic()))
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        let winner = if seat == 0 { Color::Black } else { Color::White };
        self.board.force_result(Outcome::Checkmate(winner));
    }

    fn project_for(&self, viewer: &PlayerId) -> Projection {
        let seat = self.seat_of(viewer);
        let available_actions = match (seat, self.board.is_game_over()) {
            (Some(s), false) if self.board.draw_offer() == Some(self.seat_color(s).opposite()) => {
                vec!["resign".to_string(), "accept_draw".to_string(), "decline_draw".to_string()]
            }
            (Some(s), false) if self.seat_color(s) == self.board.side_to_move => {
                vec!["move".to_string(), "resign".to_string(), "offer_draw".to_string()]
            }
            (Some(_), false) => vec!["resign".to_string()],
            _ => vec![],
        };
        Projection {
            state: self.board.to_fen_like_json(),
            available_actions,
        }
    }

    fn is_timer_excluded(&self) -> bool {
        true
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&self.board).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.board = serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        Ok(())
    }
}
