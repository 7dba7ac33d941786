use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Square {
    pub file: i8,
    pub rank: i8,
}

impl Square {
    pub fn new(file: i8, rank: i8) -> Self {
        Square { file, rank }
    }

    pub fn on_board(&self) -> bool {
        (0..8).contains(&self.file) && (0..8).contains(&self.rank)
    }

    pub fn parse(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = (bytes[0] as char).to_ascii_lowercase() as i8 - b'a' as i8;
        let rank = (bytes[1] as char) as i8 - b'1' as i8;
        let sq = Square { file, rank };
        sq.on_board().then_some(sq)
    }

    pub fn to_algebraic(self) -> String {
        format!("{}{}", (b'a' + self.file as u8) as char, self.rank + 1)
    }

    fn index(self) -> usize {
        (self.rank * 8 + self.file) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

#[derive(Debug, Clone)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
    pub is_en_passant: bool,
    pub castle: Option<CastleSide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Checkmate(Color),
    Stalemate,
    DrawFiftyMove,
    DrawInsufficientMaterial,
    Resignation(Color),
    DrawAgreed,
    Timeout(Color),
}

/// How a game's clock is drawn down between moves. `Unlimited` keeps the
/// fields present but never expires a side on time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    Fischer,
    Delay,
    Unlimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChessClock {
    pub kind: ClockKind,
    pub initial_ms: u64,
    pub increment_ms: u64,
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub last_move_epoch_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    squares: [Option<Piece>; 64],
    pub side_to_move: Color,
    castling: CastlingRights,
    en_passant_target: Option<Square>,
    halfmove_clock: u32,
    outcome: Option<Outcome>,
    clock: Option<ChessClock>,
    draw_offer: Option<Color>,
}

impl Board {
    pub fn initial() -> Self {
        let mut squares = [None; 64];
        let back_rank = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for file in 0..8i8 {
            squares[Square::new(file, 0).index()] = Some(Piece {
                color: Color::White,
                kind: back_rank[file as usize],
            });
            squares[Square::new(file, 1).index()] = Some(Piece {
                color: Color::White,
                kind: PieceType::Pawn,
            });
            squares[Square::new(file, 6).index()] = Some(Piece {
                color: Color::Black,
                kind: PieceType::Pawn,
            });
            squares[Square::new(file, 7).index()] = Some(Piece {
                color: Color::Black,
                kind: back_rank[file as usize],
            });
        }
        Board {
            squares,
            side_to_move: Color::White,
            castling: CastlingRights {
                white_king_side: true,
                white_queen_side: true,
                black_king_side: true,
                black_queen_side: true,
            },
            en_passant_target: None,
            halfmove_clock: 0,
            outcome: None,
            clock: None,
            draw_offer: None,
        }
    }

    /// Arms the chess clock. `Unlimited` keeps the fields populated (so a
    /// client can still render a clock widget) without ever expiring a side.
    pub fn start_clock(&mut self, kind: ClockKind, initial_ms: u64, increment_ms: u64, now_ms: u64) {
        self.clock = Some(ChessClock {
            kind,
            initial_ms,
            increment_ms,
            white_remaining_ms: initial_ms,
            black_remaining_ms: initial_ms,
            last_move_epoch_ms: now_ms,
        });
    }

    pub fn clock(&self) -> Option<&ChessClock> {
        self.clock.as_ref()
    }

    pub fn draw_offer(&self) -> Option<Color> {
        self.draw_offer
    }

    pub fn set_draw_offer(&mut self, color: Color) {
        self.draw_offer = Some(color);
    }

    pub fn clear_draw_offer(&mut self) {
        self.draw_offer = None;
    }

    /// Derives elapsed time since the last move for the side to move and
    /// declares a timeout loss if their remaining time has run out. Called
    /// at the top of every action and auto-play so an expired clock is
    /// caught the next time the game is touched, even if the timed-out
    /// side never moves again.
    pub fn check_clock_timeout(&mut self, now_ms: u64) {
        if self.is_game_over() {
            return;
        }
        let Some(clock) = &self.clock else {
            return;
        };
        if clock.kind == ClockKind::Unlimited {
            return;
        }
        let elapsed = now_ms.saturating_sub(clock.last_move_epoch_ms);
        let remaining = match self.side_to_move {
            Color::White => clock.white_remaining_ms,
            Color::Black => clock.black_remaining_ms,
        };
        if elapsed >= remaining {
            let expired = self.side_to_move;
            self.outcome = Some(Outcome::Timeout(expired.opposite()));
        }
    }

    /// Debits the elapsed time from the mover's bank and credits the
    /// increment, called from [`Self::apply`] before the side to move flips.
    fn apply_clock_increment(&mut self, mover: Color, now_ms: u64) {
        let Some(clock) = &mut self.clock else {
            return;
        };
        if clock.kind == ClockKind::Unlimited {
            return;
        }
        let elapsed = now_ms.saturating_sub(clock.last_move_epoch_ms);
        let remaining = match mover {
            Color::White => &mut clock.white_remaining_ms,
            Color::Black => &mut clock.black_remaining_ms,
        };
        *remaining = remaining.saturating_sub(elapsed) + clock.increment_ms;
        clock.last_move_epoch_ms = now_ms;
    }

    pub fn at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn force_result(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    /// Pseudo-legal moves for the piece at `from` filtered to exclude any
    /// that would leave the mover's own king in check.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        let Some(piece) = self.at(from) else {
            return vec![];
        };
        if piece.color != self.side_to_move {
            return vec![];
        }
        super::moves::pseudo_legal_moves(self, from, piece)
            .into_iter()
            .filter(|mv| {
                let mut probe = self.clone();
                probe.apply_raw(mv);
                !probe.king_in_check(piece.color)
            })
            .collect()
    }

    pub fn any_legal_move(&self) -> Option<Move> {
        for rank in 0..8 {
            for file in 0..8 {
                let sq = Square::new(file, rank);
                if let Some(piece) = self.at(sq) {
                    if piece.color == self.side_to_move {
                        if let Some(mv) = self.legal_moves_from(sq).into_iter().next() {
                            return Some(mv);
                        }
                    }
                }
            }
        }
        None
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        for rank in 0..8 {
            for file in 0..8 {
                let sq = Square::new(file, rank);
                if let Some(p) = self.at(sq) {
                    if p.color == color && p.kind == PieceType::King {
                        return Some(sq);
                    }
                }
            }
        }
        None
    }

    pub fn king_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(sq) => super::moves::is_square_attacked(self, sq, color.opposite()),
            None => false,
        }
    }

    fn has_insufficient_material(&self) -> bool {
        let mut minor_pieces = 0;
        let mut has_major_or_pawn = false;
        for sq_idx in 0..64 {
            if let Some(piece) = self.squares[sq_idx] {
                match piece.kind {
                    PieceType::King => {}
                    PieceType::Knight | PieceType::Bishop => minor_pieces += 1,
                    _ => has_major_or_pawn = true,
                }
            }
        }
        !has_major_or_pawn && minor_pieces <= 1
    }

    /// Applies raw board mutation only (used internally for check-probing
    /// and by `apply`), without touching clocks or outcome.
    fn apply_raw(&mut self, mv: &Move) {
        let piece = self.at(mv.from).expect("legal move always has a mover");
        self.set(mv.from, None);

        if mv.is_en_passant {
            let captured_sq = Square::new(mv.to.file, mv.from.rank);
            self.set(captured_sq, None);
        }

        let final_piece = match mv.promotion {
            Some(kind) => Piece { color: piece.color, kind },
            None => piece,
        };
        self.set(mv.to, Some(final_piece));

        if let Some(side) = mv.castle {
            let rank = mv.from.rank;
            let (rook_from, rook_to) = match side {
                CastleSide::KingSide => (Square::new(7, rank), Square::new(5, rank)),
                CastleSide::QueenSide => (Square::new(0, rank), Square::new(3, rank)),
            };
            let rook = self.at(rook_from);
            self.set(rook_from, None);
            self.set(rook_to, rook);
        }
    }

    /// Applies a fully-validated move: mutates the board, updates castling
    /// rights / en passant target / halfmove clock, debits the mover's
    /// chess clock, flips the side to move, and recomputes the outcome.
    pub fn apply(&mut self, mv: &Move, now_ms: u64) {
        let piece = self.at(mv.from).expect("legal move always has a mover");
        let is_capture = self.at(mv.to).is_some() || mv.is_en_passant;
        let is_pawn_move = piece.kind == PieceType::Pawn;

        self.apply_raw(mv);
        self.apply_clock_increment(piece.color, now_ms);
        if self.draw_offer == Some(piece.color) {
            self.draw_offer = None;
        }

        if is_capture || is_pawn_move {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if piece.kind == PieceType::King {
            match piece.color {
                Color::White => {
                    self.castling.white_king_side = false;
                    self.castling.white_queen_side = false;
                }
                Color::Black => {
                    self.castling.black_king_side = false;
                    self.castling.black_queen_side = false;
                }
            }
        }
        for sq in [mv.from, mv.to] {
            match (sq.file, sq.rank) {
                (0, 0) => self.castling.white_queen_side = false,
                (7, 0) => self.castling.white_king_side = false,
                (0, 7) => self.castling.black_queen_side = false,
                (7, 7) => self.castling.black_king_side = false,
                _ => {}
            }
        }

        self.en_passant_target = if piece.kind == PieceType::Pawn && (mv.to.rank - mv.from.rank).abs() == 2 {
            Some(Square::new(mv.from.file, (mv.from.rank + mv.to.rank) / 2))
        } else {
            None
        };

        self.side_to_move = self.side_to_move.opposite();
        self.recompute_outcome();
    }

    fn recompute_outcome(&mut self) {
        let in_check = self.king_in_check(self.side_to_move);
        let has_move = self.any_legal_move().is_some();
        self.outcome = if !has_move && in_check {
            Some(Outcome::Checkmate(self.side_to_move.opposite()))
        } else if !has_move {
            Some(Outcome::Stalemate)
        } else if self.halfmove_clock >= 100 {
            Some(Outcome::DrawFiftyMove)
        } else if self.has_insufficient_material() {
            Some(Outcome::DrawInsufficientMaterial)
        } else {
            None
        };
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    pub fn castling(&self) -> &CastlingRights {
        &self.castling
    }

    pub fn to_fen_like_json(&self) -> serde_json::Value {
        let mut rows = Vec::with_capacity(8);
        for rank in (0..8).rev() {
            let mut row = Vec::with_capacity(8);
            for file in 0..8 {
                row.push(self.at(Square::new(file, rank)).map(|p| {
                    let letter = match p.kind {
                        PieceType::Pawn => 'p',
                        PieceType::Knight => 'n',
                        PieceType::Bishop => 'b',
                        PieceType::Rook => 'r',
                        PieceType::Queen => 'q',
                        PieceType::King => 'k',
                    };
                    let letter = if p.color == Color::White {
                        letter.to_ascii_uppercase()
                    } else {
                        letter
                    };
                    letter.to_string()
                }));
            }
            rows.push(row);
        }
        serde_json::json!({
            "board": rows,
            "sideToMove": self.side_to_move,
            "inCheck": self.king_in_check(self.side_to_move),
            "outcome": self.outcome,
            "clock": self.clock,
            "drawOffer": self.draw_offer,
        })
    }
}
