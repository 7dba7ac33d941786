//! Snake & Ladder on the standard 100-square production board. Rolling a
//! third consecutive six on one turn forfeits the whole turn (spec §8
//! scenario 5); landing exactly on square 100 wins, overshooting it is
//! simply not taken (the token stays put and the die is wasted).

use crate::common::SeatTable;
use lobby_core::engine::{
    ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex, TokenMoveHint,
};
use lobby_core::error::EngineError;
use lobby_core::rng::{roll_die, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const BOARD_SIZE: u8 = 100;
const MAX_PLAYERS: u8 = 4;

fn production_board() -> HashMap<u8, u8> {
    // Snakes (head -> tail) and ladders (bottom -> top) of the canonical
    // 100-square layout.
    let mut board = HashMap::new();
    for (from, to) in [
        (16, 6),
        (47, 26),
        (49, 11),
        (56, 53),
        (62, 19),
        (64, 60),
        (87, 24),
        (93, 73),
        (95, 75),
        (98, 78),
    ] {
        board.insert(from, to);
    }
    for (from, to) in [
        (1, 38),
        (4, 14),
        (9, 31),
        (21, 42),
        (28, 84),
        (36, 44),
        (51, 67),
        (71, 91),
        (80, 100),
    ] {
        board.insert(from, to);
    }
    board
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardState {
    positions: [u8; MAX_PLAYERS as usize],
    active_count: u8,
    current_turn: SeatIndex,
    consecutive_sixes: u8,
    winner: Option<SeatIndex>,
}

impl BoardState {
    fn new(active_count: u8) -> Self {
        BoardState {
            positions: [0; MAX_PLAYERS as usize],
            active_count,
            current_turn: 0,
            consecutive_sixes: 0,
            winner: None,
        }
    }

    fn advance_turn(&mut self) {
        self.current_turn = (self.current_turn + 1) % self.active_count;
        self.consecutive_sixes = 0;
    }
}

pub struct SnakeLadderEngine {
    seats: SeatTable,
    board: BoardState,
    snakes_and_ladders: HashMap<u8, u8>,
}

impl SnakeLadderEngine {
    pub fn new(player_count: u8) -> Self {
        let player_count = player_count.clamp(2, MAX_PLAYERS);
        SnakeLadderEngine {
            seats: SeatTable::with_capacity(player_count),
            board: BoardState::new(player_count),
            snakes_and_ladders: production_board(),
        }
    }

    fn apply_roll(&mut self, seat: SeatIndex, roll: u32) -> ActionOutcome {
        if roll == 6 {
            self.board.consecutive_sixes += 1;
            if self.board.consecutive_sixes == 3 {
                self.board.advance_turn();
                return ActionOutcome::new("rolled a third consecutive six, turn forfeited");
            }
        } else {
            self.board.consecutive_sixes = 0;
        }

        let pos = self.board.positions[seat as usize];
        let target = pos as u32 + roll;
        if target > BOARD_SIZE as u32 {
            self.board.advance_turn();
            return ActionOutcome::new(format!("rolled {roll}, overshoots 100, stays at {pos}"));
        }
        let mut landed = target as u8;
        let mut steps = vec![serde_json::json!({ "square": landed })];
        if let Some(&dest) = self.snakes_and_ladders.get(&landed) {
            landed = dest;
            steps.push(serde_json::json!({ "square": landed }));
        }
        self.board.positions[seat as usize] = landed;

        if landed == BOARD_SIZE {
            self.board.winner = Some(seat);
            return ActionOutcome::new(format!("rolled {roll}, reached 100, wins"))
                .with_token_move(TokenMoveHint {
                    steps,
                    final_state: serde_json::json!({ "positions": self.board.positions }),
                });
        }

        if roll != 6 {
            self.board.advance_turn();
        }
        ActionOutcome::new(format!("rolled {roll}, moved to {landed}")).with_token_move(TokenMoveHint {
            steps,
            final_state: serde_json::json!({ "positions": self.board.positions }),
        })
    }
}

impl GameEngine for SnakeLadderEngine {
    fn kind(&self) -> GameKind {
        GameKind::SnakeLadder
    }
    fn min_seats(&self) -> u8 {
        2
    }
    fn max_seats(&self) -> u8 {
        MAX_PLAYERS
    }

    fn add_player(&mut self, seat: SeatIndex, player: PlayerId) -> bool {
        self.seats.add(seat, player)
    }

    fn remove_player(&mut self, player: &PlayerId) -> bool {
        self.seats.remove(player)
    }

    fn current_player_index(&self) -> Option<SeatIndex> {
        if self.board.winner.is_some() {
            None
        } else {
            Some(self.board.current_turn)
        }
    }

    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        _payload: &Value,
        rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if action != "roll" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.board.winner.is_some() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if seat != self.board.current_turn {
            return Err(EngineError::NotYourTurn);
        }
        let roll = roll_die(rng, 6);
        Ok(self.apply_roll(seat, roll))
    }

    fn is_terminal(&self) -> bool {
        self.board.winner.is_some()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.board.winner
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        let roll = roll_die(rng, 6);
        self.apply_roll(seat, roll)
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        if self.board.current_turn == seat {
            self.board.advance_turn();
        }
    }

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        Projection {
            state: serde_json::json!({
                "positions": self.board.positions,
                "currentTurn": self.board.current_turn,
                "consecutiveSixes": self.board.consecutive_sixes,
                "winner": self.board.winner,
            }),
            available_actions: if self.is_terminal() {
                vec![]
            } else {
                vec!["roll".to_string()]
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overshooting_100_does_not_move_the_token() {
        let mut engine = SnakeLadderEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.positions[0] = 99;
        let outcome = engine.apply_roll(0, 6);
        assert_eq!(engine.board.positions[0], 99);
        assert!(outcome.description.contains("overshoots"));
    }

    #[test]
    fn landing_exactly_on_100_wins() {
        let mut engine = SnakeLadderEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.positions[0] = 94;
        engine.apply_roll(0, 6);
        assert_eq!(engine.board.positions[0], 100);
        assert_eq!(engine.winner_index(), Some(0));
    }

    #[test]
    fn third_consecutive_six_forfeits_turn() {
        let mut engine = SnakeLadderEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.consecutive_sixes = 2;
        let before = engine.board.positions[0];
        let outcome = engine.apply_roll(0, 6);
        assert_eq!(engine.board.positions[0], before);
        assert_eq!(engine.board.current_turn, 1);
        assert!(outcome.description.contains("forfeited"));
    }

    #[test]
    fn landing_on_a_snake_head_slides_down() {
        let mut engine = SnakeLadderEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.positions[0] = 10;
        engine.apply_roll(0, 6); // lands on 16, a snake head to 6
        assert_eq!(engine.board.positions[0], 6);
    }
}
