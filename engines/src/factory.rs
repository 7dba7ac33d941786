//! `GameKind` -> `Box<dyn GameEngine>` construction (spec §9: "enumerate
//! kinds explicitly, never a duck-typed registry"). This is the one place
//! that needs to know every concrete engine type; everything downstream of
//! the Game Store only ever touches the trait object.

use crate::candy::CandyEngine;
use crate::chess::ChessEngine;
use crate::ludo::LudoEngine;
use crate::memory::MemoryEngine;
use crate::monopoly::MonopolyEngine;
use crate::poker::PokerEngine;
use crate::snake_ladder::SnakeLadderEngine;
use crate::sudoku::SudokuEngine;
use crate::tic_tac_toe::TicTacToeEngine;
use crate::twenty48::TwentyFortyEightEngine;
use lobby_core::engine::{GameEngine, GameKind};
use lobby_core::rng::EngineRng;

/// Builds a fresh engine for `kind` seated for `player_count` players.
/// Engines that deal or shuffle at construction draw from `rng`; engines
/// with a fixed seat count (Chess, Tic-Tac-Toe, the single-player puzzles)
/// ignore `player_count` entirely.
pub fn create_engine(kind: GameKind, player_count: u8, rng: &mut dyn EngineRng) -> Box<dyn GameEngine> {
    match kind {
        GameKind::Chess => Box::new(ChessEngine::new()),
        GameKind::Poker => Box::new(PokerEngine::new(player_count, rng)),
        GameKind::Ludo => Box::new(LudoEngine::new(player_count)),
        GameKind::SnakeLadder => Box::new(SnakeLadderEngine::new(player_count)),
        GameKind::Monopoly => Box::new(MonopolyEngine::new(player_count)),
        GameKind::TicTacToe => Box::new(TicTacToeEngine::new()),
        GameKind::Sudoku => Box::new(SudokuEngine::new()),
        GameKind::TwentyFortyEight => Box::new(TwentyFortyEightEngine::new(rng)),
        GameKind::Memory => Box::new(MemoryEngine::new(rng)),
        GameKind::Candy => Box::new(CandyEngine::new(rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_core::rng::DeterministicRng;

    #[test]
    fn every_kind_constructs_without_panicking() {
        let mut rng = DeterministicRng::new(99);
        for kind in GameKind::ALL {
            let engine = create_engine(kind, 2, &mut rng);
            assert_eq!(engine.kind(), kind);
        }
    }
}
