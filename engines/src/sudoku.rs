//! Sudoku: a single-player puzzle engine. No turn model, no timer (spec
//! §4.8 exempts puzzle engines from the Turn Timer entirely), and the
//! "winner" is just whoever's board reaches a full legal solution.

use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::EngineRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SIZE: usize = 9;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    /// 0 marks a blank cell.
    givens: [[u8; SIZE]; SIZE],
    filled: [[u8; SIZE]; SIZE],
    solved: bool,
}

impl Board {
    /// A single canonical easy puzzle (spec leaves generation unspecified;
    /// a fixed, well-formed puzzle keeps behavior deterministic).
    fn canonical() -> Self {
        let givens: [[u8; SIZE]; SIZE] = [
            [5, 3, 0, 0, 7, 0, 0, 0, 0],
            [6, 0, 0, 1, 9, 5, 0, 0, 0],
            [0, 9, 8, 0, 0, 0, 0, 6, 0],
            [8, 0, 0, 0, 6, 0, 0, 0, 3],
            [4, 0, 0, 8, 0, 3, 0, 0, 1],
            [7, 0, 0, 0, 2, 0, 0, 0, 6],
            [0, 6, 0, 0, 0, 0, 2, 8, 0],
            [0, 0, 0, 4, 1, 9, 0, 0, 5],
            [0, 0, 0, 0, 8, 0, 0, 7, 9],
        ];
        Board {
            givens,
            filled: givens,
            solved: false,
        }
    }

    fn is_given(&self, row: usize, col: usize) -> bool {
        self.givens[row][col] != 0
    }

    fn row_ok(&self, row: usize) -> bool {
        let mut seen = [false; SIZE + 1];
        for v in self.filled[row] {
            if v == 0 {
                continue;
            }
            if seen[v as usize] {
                return false;
            }
            seen[v as usize] = true;
        }
        true
    }

    fn col_ok(&self, col: usize) -> bool {
        let mut seen = [false; SIZE + 1];
        for row in 0..SIZE {
            let v = self.filled[row][col];
            if v == 0 {
                continue;
            }
            if seen[v as usize] {
                return false;
            }
            seen[v as usize] = true;
        }
        true
    }

    fn box_ok(&self, row: usize, col: usize) -> bool {
        let box_row = (row / 3) * 3;
        let box_col = (col / 3) * 3;
        let mut seen = [false; SIZE + 1];
        for r in box_row..box_row + 3 {
            for c in box_col..box_col + 3 {
                let v = self.filled[r][c];
                if v == 0 {
                    continue;
                }
                if seen[v as usize] {
                    return false;
                }
                seen[v as usize] = true;
            }
        }
        true
    }

    fn recompute_solved(&mut self) {
        let full = self.filled.iter().flatten().all(|v| *v != 0);
        let valid = (0..SIZE).all(|i| self.row_ok(i) && self.col_ok(i))
            && (0..SIZE).step_by(3).all(|r| (0..SIZE).step_by(3).all(|c| self.box_ok(r, c)));
        self.solved = full && valid;
    }
}

#[derive(Deserialize)]
struct FillPayload {
    row: usize,
    col: usize,
    value: u8,
}

pub struct SudokuEngine {
    player: Option<PlayerId>,
    board: Board,
}

impl SudokuEngine {
    pub fn new() -> Self {
        SudokuEngine {
            player: None,
            board: Board::canonical(),
        }
    }
}

impl Default for SudokuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for SudokuEngine {
    fn kind(&self) -> GameKind {
        GameKind::Sudoku
    }
    fn min_seats(&self) -> u8 {
        1
    }
    fn max_seats(&self) -> u8 {
        1
    }

    fn add_player(&mut self, _seat: SeatIndex, player: PlayerId) -> bool {
        if self.player.is_some() {
            return false;
        }
        self.player = Some(player);
        true
    }

    fn remove_player(&mut self, player: &PlayerId) -> bool {
        if self.player.as_ref() == Some(player) {
            self.player = None;
            true
        } else {
            false
        }
    }

    fn current_player_index(&self) -> Option<SeatIndex> {
        None
    }

    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        _rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if self.player.as_ref() != Some(actor) {
            return Err(EngineError::SeatUnavailable);
        }
        if action != "fill" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.board.solved {
            return Err(EngineError::InvalidPhase);
        }
        let mv: FillPayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        if mv.row >= SIZE || mv.col >= SIZE || mv.value > 9 {
            return Err(EngineError::IllegalMove);
        }
        if self.board.is_given(mv.row, mv.col) {
            return Err(EngineError::IllegalMove);
        }

        self.board.filled[mv.row][mv.col] = mv.value;
        self.board.recompute_solved();
        Ok(ActionOutcome::new(format!(
            "filled ({}, {}) with {}",
            mv.row, mv.col, mv.value
        )))
    }

    fn is_terminal(&self) -> bool {
        self.board.solved
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.board.solved.then_some(0)
    }

    fn auto_play(&mut self, _seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
        ActionOutcome::new("sudoku has no turn-based auto-play")
    }

    fn eliminate(&mut self, _seat: SeatIndex) {}

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        Projection {
            state: serde_json::json!({
                "givens": self.board.givens,
                "filled": self.board.filled,
                "solved": self.board.solved,
            }),
            available_actions: if self.board.solved {
                vec![]
            } else {
                vec!["fill".to_string()]
            },
        }
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&self.board).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.board = serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        Ok(())
    }

    fn is_timer_excluded(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_core::rng::DeterministicRng;

    #[test]
    fn rejects_overwriting_a_given_cell() {
        let mut engine = SudokuEngine::new();
        engine.add_player(0, "p1".into());
        let mut rng = DeterministicRng::new(1);
        let result = engine.handle_action(
            &"p1".to_string(),
            "fill",
            &serde_json::json!({"row": 0, "col": 0, "value": 9}),
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn fills_a_blank_cell() {
        let mut engine = SudokuEngine::new();
        engine.add_player(0, "p1".into());
        let mut rng = DeterministicRng::new(1);
        let result = engine.handle_action(
            &"p1".to_string(),
            "fill",
            &serde_json::json!({"row": 0, "col": 2, "value": 4}),
            &mut rng,
        );
        assert!(result.is_ok());
        assert_eq!(engine.board.filled[0][2], 4);
    }

    #[test]
    fn is_timer_excluded_and_has_no_turn_model() {
        let engine = SudokuEngine::new();
        assert!(engine.is_timer_excluded());
        assert_eq!(engine.current_player_index(), None);
    }
}
