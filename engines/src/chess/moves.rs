use super::board::{Board, CastleSide, Color, Move, Piece, PieceType, Square};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1),
];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn slide(board: &Board, from: Square, dirs: &[(i8, i8)], color: Color, moves: &mut Vec<Move>) {
    for (df, dr) in dirs {
        let mut sq = from;
        loop {
            let next = Square::new(sq.file + df, sq.rank + dr);
            if !next.on_board() {
                break;
            }
            match board.at(next) {
                None => {
                    moves.push(plain(from, next));
                    sq = next;
                }
                Some(piece) if piece.color != color => {
                    moves.push(plain(from, next));
                    break;
                }
                Some(_) => break,
            }
        }
    }
}

fn plain(from: Square, to: Square) -> Move {
    Move {
        from,
        to,
        promotion: None,
        is_en_passant: false,
        castle: None,
    }
}

/// Piece attack patterns only — no castling. Keeping castling out of this
/// function is what breaks the mutual recursion with king-move generation:
/// castling legality asks "is this square attacked?", and this function
/// never itself needs to ask "can the king castle?".
pub fn is_square_attacked(board: &Board, target: Square, by_color: Color) -> bool {
    for (df, dr) in KNIGHT_OFFSETS {
        let sq = Square::new(target.file + df, target.rank + dr);
        if sq.on_board() {
            if let Some(p) = board.at(sq) {
                if p.color == by_color && p.kind == PieceType::Knight {
                    return true;
                }
            }
        }
    }
    for (df, dr) in KING_OFFSETS {
        let sq = Square::new(target.file + df, target.rank + dr);
        if sq.on_board() {
            if let Some(p) = board.at(sq) {
                if p.color == by_color && p.kind == PieceType::King {
                    return true;
                }
            }
        }
    }
    let pawn_rank_dir: i8 = if by_color == Color::White { -1 } else { 1 };
    for df in [-1, 1] {
        let sq = Square::new(target.file + df, target.rank + pawn_rank_dir);
        if sq.on_board() {
            if let Some(p) = board.at(sq) {
                if p.color == by_color && p.kind == PieceType::Pawn {
                    return true;
                }
            }
        }
    }
    if slides_into_attacker(board, target, &BISHOP_DIRS, by_color, &[PieceType::Bishop, PieceType::Queen]) {
        return true;
    }
    if slides_into_attacker(board, target, &ROOK_DIRS, by_color, &[PieceType::Rook, PieceType::Queen]) {
        return true;
    }
    false
}

fn slides_into_attacker(
    board: &Board,
    from: Square,
    dirs: &[(i8, i8)],
    by_color: Color,
    attacker_kinds: &[PieceType],
) -> bool {
    for (df, dr) in dirs {
        let mut sq = from;
        loop {
            let next = Square::new(sq.file + df, sq.rank + dr);
            if !next.on_board() {
                break;
            }
            match board.at(next) {
                None => sq = next,
                Some(p) if p.color == by_color && attacker_kinds.contains(&p.kind) => return true,
                Some(_) => break,
            }
        }
    }
    false
}

pub fn pseudo_legal_moves(board: &Board, from: Square, piece: Piece) -> Vec<Move> {
    let mut moves = Vec::new();
    match piece.kind {
        PieceType::Pawn => pawn_moves(board, from, piece.color, &mut moves),
        PieceType::Knight => {
            for (df, dr) in KNIGHT_OFFSETS {
                let to = Square::new(from.file + df, from.rank + dr);
                if to.on_board() && board.at(to).map(|p| p.color) != Some(piece.color) {
                    moves.push(plain(from, to));
                }
            }
        }
        PieceType::Bishop => slide(board, from, &BISHOP_DIRS, piece.color, &mut moves),
        PieceType::Rook => slide(board, from, &ROOK_DIRS, piece.color, &mut moves),
        PieceType::Queen => {
            slide(board, from, &BISHOP_DIRS, piece.color, &mut moves);
            slide(board, from, &ROOK_DIRS, piece.color, &mut moves);
        }
        PieceType::King => {
            for (df, dr) in KING_OFFSETS {
                let to = Square::new(from.file + df, from.rank + dr);
                if to.on_board() && board.at(to).map(|p| p.color) != Some(piece.color) {
                    moves.push(plain(from, to));
                }
            }
            castling_moves(board, from, piece.color, &mut moves);
        }
    }
    moves
}

fn pawn_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let (dir, start_rank, promo_rank) = match color {
        Color::White => (1, 1, 7),
        Color::Black => (-1, 6, 0),
    };
    let one_step = Square::new(from.file, from.rank + dir);
    if one_step.on_board() && board.at(one_step).is_none() {
        push_pawn_move(from, one_step, promo_rank, moves);
        if from.rank == start_rank {
            let two_step = Square::new(from.file, from.rank + 2 * dir);
            if board.at(two_step).is_none() {
                moves.push(plain(from, two_step));
            }
        }
    }
    for df in [-1, 1] {
        let to = Square::new(from.file + df, from.rank + dir);
        if !to.on_board() {
            continue;
        }
        if let Some(p) = board.at(to) {
            if p.color != color {
                push_pawn_move(from, to, promo_rank, moves);
            }
        } else if board.en_passant_target() == Some(to) {
            moves.push(Move {
                from,
                to,
                promotion: None,
                is_en_passant: true,
                castle: None,
            });
        }
    }
}

fn push_pawn_move(from: Square, to: Square, promo_rank: i8, moves: &mut Vec<Move>) {
    if to.rank == promo_rank {
        for kind in [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight] {
            moves.push(Move {
                from,
                to,
                promotion: Some(kind),
                is_en_passant: false,
                castle: None,
            });
        }
    } else {
        moves.push(plain(from, to));
    }
}

fn castling_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    if is_square_attacked(board, from, color.opposite()) {
        return; // cannot castle out of check
    }
    let rank = from.rank;
    let rights = board.castling();
    let (king_side, queen_side) = match color {
        Color::White => (rights.white_king_side, rights.white_queen_side),
        Color::Black => (rights.black_king_side, rights.black_queen_side),
    };

    if king_side {
        let f = Square::new(5, rank);
        let g = Square::new(6, rank);
        if board.at(f).is_none()
            && board.at(g).is_none()
            && !is_square_attacked(board, f, color.opposite())
            && !is_square_attacked(board, g, color.opposite())
        {
            moves.push(Move {
                from,
                to: g,
                promotion: None,
                is_en_passant: false,
                castle: Some(CastleSide::KingSide),
            });
        }
    }
    if queen_side {
        let d = Square::new(3, rank);
        let c = Square::new(2, rank);
        let b = Square::new(1, rank);
        if board.at(d).is_none()
            && board.at(c).is_none()
            && board.at(b).is_none()
            && !is_square_attacked(board, d, color.opposite())
            && !is_square_attacked(board, c, color.opposite())
        {
            moves.push(Move {
                from,
                to: c,
                promotion: None,
                is_en_passant: false,
                castle: Some(CastleSide::QueenSide),
            });
        }
    }
}
