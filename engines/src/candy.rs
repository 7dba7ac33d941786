//! Candy: a match-3 puzzle. Swapping two adjacent cells is legal only if it
//! creates at least one run of three or more identical candies; matched
//! runs clear, candies above fall to fill the gap, and new candies spawn
//! at the top — cascades resolve immediately within the same action so the
//! caller always gets back a fully-settled board.

use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::{gen_range, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SIZE: usize = 8;
const COLORS: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    cells: [[u8; SIZE]; SIZE],
    score: u32,
}

impl Board {
    fn new(rng: &mut dyn EngineRng) -> Self {
        let mut cells = [[0u8; SIZE]; SIZE];
        for row in &mut cells {
            for cell in row.iter_mut() {
                *cell = (gen_range(rng, COLORS as u32) + 1) as u8;
            }
        }
        let mut board = Board { cells, score: 0 };
        // Regenerate any accidental starting match so the board begins settled.
        while board.find_matches().iter().any(|r| *r) {
            for row in 0..SIZE {
                for col in 0..SIZE {
                    if board.find_matches()[row * SIZE + col] {
                        board.cells[row][col] = (gen_range(rng, COLORS as u32) + 1) as u8;
                    }
                }
            }
        }
        board
    }

    fn find_matches(&self) -> Vec<bool> {
        let mut matched = vec![false; SIZE * SIZE];
        for row in 0..SIZE {
            let mut run_start = 0;
            for col in 1..=SIZE {
                let broke = col == SIZE || self.cells[row][col] != self.cells[row][run_start];
                if broke {
                    if col - run_start >= 3 {
                        for c in run_start..col {
                            matched[row * SIZE + c] = true;
                        }
                    }
                    run_start = col;
                }
            }
        }
        for col in 0..SIZE {
            let mut run_start = 0;
            for row in 1..=SIZE {
                let broke = row == SIZE || self.cells[row][col] != self.cells[run_start][col];
                if broke {
                    if row - run_start >= 3 {
                        for r in run_start..row {
                            matched[r * SIZE + col] = true;
                        }
                    }
                    run_start = row;
                }
            }
        }
        matched
    }

    fn clear_and_cascade(&mut self, rng: &mut dyn EngineRng) -> u32 {
        let mut cleared_total = 0;
        loop {
            let matched = self.find_matches();
            let cleared = matched.iter().filter(|m| **m).count();
            if cleared == 0 {
                break;
            }
            cleared_total += cleared as u32;
            for row in 0..SIZE {
                for col in 0..SIZE {
                    if matched[row * SIZE + col] {
                        self.cells[row][col] = 0;
                    }
                }
            }
            for col in 0..SIZE {
                let mut write = SIZE;
                for row in (0..SIZE).rev() {
                    if self.cells[row][col] != 0 {
                        write -= 1;
                        self.cells[write][col] = self.cells[row][col];
                    }
                }
                for row in (0..write).rev() {
                    self.cells[row][col] = (gen_range(rng, COLORS as u32) + 1) as u8;
                }
            }
        }
        self.score += cleared_total;
        cleared_total
    }

    fn would_match_after_swap(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        let mut probe = self.clone();
        probe.cells[a.0][a.1] = self.cells[b.0][b.1];
        probe.cells[b.0][b.1] = self.cells[a.0][a.1];
        probe.find_matches().iter().any(|m| *m)
    }
}

#[derive(Deserialize)]
struct SwapPayload {
    row: usize,
    col: usize,
    direction: SwapDirection,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum SwapDirection {
    Up,
    Down,
    Left,
    Right,
}

pub struct CandyEngine {
    player: Option<PlayerId>,
    board: Board,
    moves_remaining: u32,
}

impl CandyEngine {
    pub fn new(rng: &mut dyn EngineRng) -> Self {
        CandyEngine {
            player: None,
            board: Board::new(rng),
            moves_remaining: 20,
        }
    }
}

impl GameEngine for CandyEngine {
    fn kind(&self) -> GameKind {
        GameKind::Candy
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
        rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if self.player.as_ref() != Some(actor) {
            return Err(EngineError::SeatUnavailable);
        }
        if action != "swap" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.moves_remaining == 0 {
            return Err(EngineError::InvalidPhase);
        }
        let mv: SwapPayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        if mv.row >= SIZE || mv.col >= SIZE {
            return Err(EngineError::IllegalMove);
        }
        let (dr, dc): (i32, i32) = match mv.direction {
            SwapDirection::Up => (-1, 0),
            SwapDirection::Down => (1, 0),
            SwapDirection::Left => (0, -1),
            SwapDirection::Right => (0, 1),
        };
        let other_row = mv.row as i32 + dr;
        let other_col = mv.col as i32 + dc;
        if other_row < 0 || other_col < 0 || other_row as usize >= SIZE || other_col as usize >= SIZE {
            return Err(EngineError::IllegalMove);
        }
        let other = (other_row as usize, other_col as usize);

        if !self.board.would_match_after_swap((mv.row, mv.col), other) {
            return Err(EngineError::IllegalMove);
        }

        let tmp = self.board.cells[mv.row][mv.col];
        self.board.cells[mv.row][mv.col] = self.board.cells[other.0][other.1];
        self.board.cells[other.0][other.1] = tmp;

        let cleared = self.board.clear_and_cascade(rng);
        self.moves_remaining -= 1;
        Ok(ActionOutcome::new(format!("cleared {cleared} candies")))
    }

    fn is_terminal(&self) -> bool {
        self.moves_remaining == 0
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.is_terminal().then_some(0)
    }

    fn auto_play(&mut self, _seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
        ActionOutcome::new("candy has no turn-based auto-play")
    }

    fn eliminate(&mut self, _seat: SeatIndex) {}

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        Projection {
            state: serde_json::json!({
                "cells": self.board.cells,
                "score": self.board.score,
                "movesRemaining": self.moves_remaining,
            }),
            available_actions: if self.is_terminal() {
                vec![]
            } else {
                vec!["swap".to_string()]
            },
        }
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&(&self.board, self.moves_remaining)).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let (board, moves_remaining) =
            serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        self.board = board;
        self.moves_remaining = moves_remaining;
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
    fn swap_with_no_resulting_match_is_illegal() {
        let mut rng = DeterministicRng::new(3);
        let mut engine = CandyEngine::new(&mut rng);
        engine.add_player(0, "p1".into());
        // Force a deterministic non-matching configuration.
        engine.board.cells = [[1, 2, 1, 2, 1, 2, 1, 2]; SIZE];
        let result = engine.handle_action(
            &"p1".to_string(),
            "swap",
            &serde_json::json!({"row": 0, "col": 0, "direction": "right"}),
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn find_matches_detects_horizontal_run() {
        let mut rng = DeterministicRng::new(3);
        let mut board = Board::new(&mut rng);
        board.cells[0] = [1, 1, 1, 2, 3, 4, 5, 1];
        let matched = board.find_matches();
        assert!(matched[0] && matched[1] && matched[2]);
        assert!(!matched[3]);
    }
}
