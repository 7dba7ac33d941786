//! 2048: single-player sliding-tile puzzle. Every accepted move slides and
//! merges tiles in one direction, then spawns a new tile through the
//! entropy seam; the game ends when no move changes the board.

use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::{gen_range, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SIZE: usize = 4;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    cells: [[u32; SIZE]; SIZE],
    score: u32,
    won: bool,
}

impl Board {
    fn empty() -> Self {
        Board {
            cells: [[0; SIZE]; SIZE],
            score: 0,
            won: false,
        }
    }

    fn empty_cells(&self) -> Vec<(usize, usize)> {
        (0..SIZE)
            .flat_map(|r| (0..SIZE).map(move |c| (r, c)))
            .filter(|(r, c)| self.cells[*r][*c] == 0)
            .collect()
    }

    fn spawn_tile(&mut self, rng: &mut dyn EngineRng) {
        let empties = self.empty_cells();
        if empties.is_empty() {
            return;
        }
        let idx = gen_range(rng, empties.len() as u32) as usize;
        let (row, col) = empties[idx];
        // 90% a 2-tile, 10% a 4-tile, the conventional 2048 spawn odds.
        self.cells[row][col] = if gen_range(rng, 10) == 0 { 4 } else { 2 };
    }

    /// Slides and merges one row toward index 0 (left). Callers transpose
    /// / reverse the board to reuse this for all four directions.
    fn slide_row_left(row: &mut [u32; SIZE], score: &mut u32) -> bool {
        let mut values: Vec<u32> = row.iter().copied().filter(|v| *v != 0).collect();
        let mut merged = Vec::with_capacity(SIZE);
        let mut i = 0;
        while i < values.len() {
            if i + 1 < values.len() && values[i] == values[i + 1] {
                let sum = values[i] * 2;
                merged.push(sum);
                *score += sum;
                i += 2;
            } else {
                merged.push(values[i]);
                i += 1;
            }
        }
        merged.resize(SIZE, 0);
        let changed = *row != merged.as_slice();
        row.copy_from_slice(&merged);
        changed
    }

    fn apply(&mut self, dir: Direction) -> bool {
        let mut changed = false;
        match dir {
            Direction::Left => {
                for row in &mut self.cells {
                    changed |= Board::slide_row_left(row, &mut self.score);
                }
            }
            Direction::Right => {
                for row in &mut self.cells {
                    row.reverse();
                    changed |= Board::slide_row_left(row, &mut self.score);
                    row.reverse();
                }
            }
            Direction::Up => {
                for col in 0..SIZE {
                    let mut column = [0u32; SIZE];
                    for row in 0..SIZE {
                        column[row] = self.cells[row][col];
                    }
                    changed |= Board::slide_row_left(&mut column, &mut self.score);
                    for row in 0..SIZE {
                        self.cells[row][col] = column[row];
                    }
                }
            }
            Direction::Down => {
                for col in 0..SIZE {
                    let mut column = [0u32; SIZE];
                    for row in 0..SIZE {
                        column[row] = self.cells[SIZE - 1 - row][col];
                    }
                    changed |= Board::slide_row_left(&mut column, &mut self.score);
                    for row in 0..SIZE {
                        self.cells[SIZE - 1 - row][col] = column[row];
                    }
                }
            }
        }
        if !self.won && self.cells.iter().flatten().any(|v| *v >= 2048) {
            self.won = true;
        }
        changed
    }

    fn has_any_move(&self) -> bool {
        if !self.empty_cells().is_empty() {
            return true;
        }
        for r in 0..SIZE {
            for c in 0..SIZE {
                let v = self.cells[r][c];
                if (c + 1 < SIZE && self.cells[r][c + 1] == v)
                    || (r + 1 < SIZE && self.cells[r + 1][c] == v)
                {
                    return true;
                }
            }
        }
        false
    }
}

pub struct TwentyFortyEightEngine {
    player: Option<PlayerId>,
    board: Board,
}

impl TwentyFortyEightEngine {
    pub fn new(rng: &mut dyn EngineRng) -> Self {
        let mut board = Board::empty();
        board.spawn_tile(rng);
        board.spawn_tile(rng);
        TwentyFortyEightEngine { player: None, board }
    }
}

#[derive(Deserialize)]
struct SwipePayload {
    direction: Direction,
}

impl GameEngine for TwentyFortyEightEngine {
    fn kind(&self) -> GameKind {
        GameKind::TwentyFortyEight
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
        if action != "swipe" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if !self.board.has_any_move() {
            return Err(EngineError::InvalidPhase);
        }
        let mv: SwipePayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;

        if !self.board.apply(mv.direction) {
            return Err(EngineError::IllegalMove);
        }
        self.board.spawn_tile(rng);
        Ok(ActionOutcome::new(format!("swiped {:?}", mv.direction)))
    }

    fn is_terminal(&self) -> bool {
        !self.board.has_any_move()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.board.won.then_some(0)
    }

    fn auto_play(&mut self, _seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
        ActionOutcome::new("2048 has no turn-based auto-play")
    }

    fn eliminate(&mut self, _seat: SeatIndex) {}

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        Projection {
            state: serde_json::json!({
                "cells": self.board.cells,
                "score": self.board.score,
                "won": self.board.won,
            }),
            available_actions: if self.board.has_any_move() {
                vec!["swipe".to_string()]
            } else {
                vec![]
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
    fn slide_left_merges_equal_neighbors() {
        let mut row = [2, 2, 4, 0];
        let mut score = 0;
        let changed = Board::slide_row_left(&mut row, &mut score);
        assert!(changed);
        assert_eq!(row, [4, 4, 0, 0]);
        assert_eq!(score, 4);
    }

    #[test]
    fn swipe_with_no_change_is_illegal() {
        let mut rng = DeterministicRng::new(1);
        let mut engine = TwentyFortyEightEngine::new(&mut rng);
        engine.add_player(0, "p1".into());
        engine.board.cells = [[0; SIZE]; SIZE];
        engine.board.cells[0] = [2, 4, 8, 16];

        let result = engine.handle_action(
            &"p1".to_string(),
            "swipe",
            &serde_json::json!({"direction": "left"}),
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn reaching_2048_sets_won() {
        let mut rng = DeterministicRng::new(1);
        let mut engine = TwentyFortyEightEngine::new(&mut rng);
        engine.board.cells = [[0; SIZE]; SIZE];
        engine.board.cells[0][0] = 1024;
        engine.board.cells[0][1] = 1024;
        engine.board.apply(Direction::Left);
        assert!(engine.board.won);
        assert_eq!(engine.winner_index(), Some(0));
    }
}
