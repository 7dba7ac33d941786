//! Tic-Tac-Toe, grounded directly on the teacher's own
//! `tic_tac_toe_logic` module: a 3x3 board, `0`/`1`/`2` cell codes, and the
//! same row/column/diagonal sweep for a winner. The client-hosted
//! `ViewState`/`check_legality`/`check_winning` shape becomes a
//! server-authoritative [`GameEngine`] impl instead of a `BackEndArchitecture`.

use crate::common::SeatTable;
use lobby_core::engine::{
    ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex,
};
use lobby_core::error::EngineError;
use lobby_core::rng::EngineRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
enum GameState {
    Pending,
    CrossWins,
    CircleWins,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    cells: [[u8; 3]; 3],
    next_move_is_host: bool,
    state: GameState,
}

impl Board {
    fn new() -> Self {
        Board {
            cells: [[0; 3]; 3],
            next_move_is_host: true,
            state: GameState::Pending,
        }
    }

    fn check_for(&self, probe: u8) -> bool {
        (0..3).any(|row| (0..3).all(|col| self.cells[row][col] == probe))
            || (0..3).any(|col| (0..3).all(|row| self.cells[row][col] == probe))
            || (0..3).all(|i| self.cells[i][i] == probe)
            || (0..3).all(|i| self.cells[i][2 - i] == probe)
    }

    fn check_winning(&self) -> GameState {
        if self.check_for(1) {
            return GameState::CrossWins;
        }
        if self.check_for(2) {
            return GameState::CircleWins;
        }
        if self.cells.iter().flatten().all(|c| *c != 0) {
            return GameState::Draw;
        }
        GameState::Pending
    }
}

#[derive(Deserialize)]
struct MovePayload {
    row: usize,
    column: usize,
}

pub struct TicTacToeEngine {
    seats: SeatTable,
    board: Board,
}

impl TicTacToeEngine {
    pub fn new() -> Self {
        TicTacToeEngine {
            seats: SeatTable::with_capacity(2),
            board: Board::new(),
        }
    }
}

impl Default for TicTacToeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for TicTacToeEngine {
    fn kind(&self) -> GameKind {
        GameKind::TicTacToe
    }
    fn min_seats(&self) -> u8 {
        2
    }
    fn max_seats(&self) -> u8 {
        2
    }

    fn add_player(&mut self, seat: SeatIndex, player: PlayerId) -> bool {
        self.seats.add(seat, player)
    }

    fn remove_player(&mut self, player: &PlayerId) -> bool {
        self.seats.remove(player)
    }

    fn current_player_index(&self) -> Option<SeatIndex> {
        if self.board.state != GameState::Pending {
            return None;
        }
        Some(if self.board.next_move_is_host { 0 } else { 1 })
    }

    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        _rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if action != "place" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.board.state != GameState::Pending {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        let expected_seat = if self.board.next_move_is_host { 0 } else { 1 };
        if seat != expected_seat {
            return Err(EngineError::NotYourTurn);
        }

        let mv: MovePayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        if mv.row >= 3 || mv.column >= 3 {
            return Err(EngineError::IllegalMove);
        }
        if self.board.cells[mv.row][mv.column] != 0 {
            return Err(EngineError::IllegalMove);
        }

        let mark = if seat == 0 { 1 } else { 2 };
        self.board.cells[mv.row][mv.column] = mark;
        self.board.next_move_is_host = !self.board.next_move_is_host;
        self.board.state = self.board.check_winning();

        Ok(ActionOutcome::new(format!(
            "{actor} placed at ({}, {})",
            mv.row, mv.column
        )))
    }

    fn is_terminal(&self) -> bool {
        self.board.state != GameState::Pending
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        match self.board.state {
            GameState::CrossWins => Some(0),
            GameState::CircleWins => Some(1),
            _ => None,
        }
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        let empties: Vec<(usize, usize)> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .filter(|(r, c)| self.board.cells[*r][*c] == 0)
            .collect();
        if empties.is_empty() {
            self.board.state = GameState::Draw;
            return ActionOutcome::new("no legal auto-play available");
        }
        let idx = lobby_core::rng::gen_range(rng, empties.len() as u32) as usize;
        let (row, col) = empties[idx];
        let mark = if seat == 0 { 1 } else { 2 };
        self.board.cells[row][col] = mark;
        self.board.next_move_is_host = !self.board.next_move_is_host;
        self.board.state = self.board.check_winning();
        ActionOutcome::new(format!("auto-placed at ({row}, {col})"))
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        self.board.state = if seat == 0 {
            GameState::CircleWins
        } else {
            GameState::CrossWins
        };
    }

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        let available_actions = if self.board.state == GameState::Pending {
            vec!["place".to_string()]
        } else {
            vec![]
        };
        Projection {
            state: serde_json::json!({
                "board": self.board.cells,
                "nextMoveIsHost": self.board.next_move_is_host,
                "state": self.board.state,
            }),
            available_actions,
        }
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&self.board).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.board = serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_core::rng::DeterministicRng;

    fn placed(engine: &mut TicTacToeEngine, player: &str, row: usize, column: usize) -> Result<ActionOutcome, EngineError> {
        let mut rng = DeterministicRng::new(1);
        engine.handle_action(&player.to_string(), "place", &serde_json::json!({"row": row, "column": column}), &mut rng)
    }

    #[test]
    fn host_goes_first_and_turns_alternate() {
        let mut engine = TicTacToeEngine::new();
        engine.add_player(0, "host".into());
        engine.add_player(1, "guest".into());

        assert!(placed(&mut engine, "guest", 0, 0).is_err());
        assert!(placed(&mut engine, "host", 0, 0).is_ok());
        assert!(placed(&mut engine, "host", 0, 1).is_err());
    }

    #[test]
    fn detects_row_win() {
        let mut engine = TicTacToeEngine::new();
        engine.add_player(0, "host".into());
        engine.add_player(1, "guest".into());

        placed(&mut engine, "host", 0, 0).unwrap();
        placed(&mut engine, "guest", 1, 0).unwrap();
        placed(&mut engine, "host", 0, 1).unwrap();
        placed(&mut engine, "guest", 1, 1).unwrap();
        placed(&mut engine, "host", 0, 2).unwrap();

        assert!(engine.is_terminal());
        assert_eq!(engine.winner_index(), Some(0));
    }

    #[test]
    fn occupied_cell_is_rejected_and_state_unchanged() {
        let mut engine = TicTacToeEngine::new();
        engine.add_player(0, "host".into());
        engine.add_player(1, "guest".into());
        placed(&mut engine, "host", 0, 0).unwrap();
        let before = engine.board.cells;
        assert!(placed(&mut engine, "guest", 0, 0).is_err());
        assert_eq!(engine.board.cells, before);
    }
}
