//! Ludo for up to 4 players. Tokens sit in base until a 6 is rolled, travel
//! a shared 52-square ring from each player's own start square, then climb
//! a private 6-square home stretch. Landing exactly on a square occupied by
//! an opponent off a safe square sends that token back to base (spec §8
//! scenario 2); a roll that would overshoot home is simply not applied —
//! the token stays put and the die is wasted, it is never a rejected
//! action.

use crate::common::SeatTable;
use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::{roll_die, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const RING_LEN: u8 = 52;
const HOME: u8 = 57;
const TOKENS_PER_PLAYER: usize = 4;
const MAX_PLAYERS: u8 = 4;

/// Safe squares: each player's start square plus one star square per
/// quadrant, on the classic board.
const SAFE_SQUARES: [u8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

fn start_offset(seat: SeatIndex) -> u8 {
    seat * 13
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Token {
    /// `None` while in base. `Some(steps)` where `steps` in `0..=57`;
    /// `57` means the token has reached home.
    steps: Option<u8>,
}

impl Token {
    fn ring_position(&self, seat: SeatIndex) -> Option<u8> {
        match self.steps {
            Some(steps) if steps < 51 => Some((start_offset(seat) as u16 + steps as u16) as u8 % RING_LEN),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardState {
    tokens: [[Token; TOKENS_PER_PLAYER]; MAX_PLAYERS as usize],
    player_count: u8,
    current_turn: SeatIndex,
    consecutive_sixes: u8,
    winner: Option<SeatIndex>,
}

impl BoardState {
    fn new(player_count: u8) -> Self {
        BoardState {
            tokens: [[Token { steps: None }; TOKENS_PER_PLAYER]; MAX_PLAYERS as usize],
            player_count,
            current_turn: 0,
            consecutive_sixes: 0,
            winner: None,
        }
    }

    fn all_home(&self, seat: SeatIndex) -> bool {
        self.tokens[seat as usize].iter().all(|t| t.steps == Some(HOME))
    }

    fn advance_turn(&mut self) {
        self.current_turn = (self.current_turn + 1) % self.player_count;
        self.consecutive_sixes = 0;
    }
}

#[derive(Deserialize)]
struct MoveTokenPayload {
    token: usize,
    roll: u8,
}

pub struct LudoEngine {
    seats: SeatTable,
    board: BoardState,
}

impl LudoEngine {
    pub fn new(player_count: u8) -> Self {
        let player_count = player_count.clamp(2, MAX_PLAYERS);
        LudoEngine {
            seats: SeatTable::with_capacity(player_count),
            board: BoardState::new(player_count),
        }
    }

    fn apply_move(&mut self, seat: SeatIndex, token_idx: usize, roll: u8) -> Result<ActionOutcome, EngineError> {
        if token_idx >= TOKENS_PER_PLAYER {
            return Err(EngineError::IllegalMove);
        }
        let token = self.board.tokens[seat as usize][token_idx];

        let new_steps = match token.steps {
            None => {
                if roll != 6 {
                    return Err(EngineError::IllegalMove);
                }
                0
            }
            Some(steps) => {
                let candidate = steps as u16 + roll as u16;
                if candidate > HOME as u16 {
                    // Overshoot: die is wasted, nothing moves, turn still
                    // advances below as a normal (non-capturing) move would.
                    self.finish_turn(roll);
                    return Ok(ActionOutcome::new(format!(
                        "roll of {roll} overshoots home, token {token_idx} stays put"
                    )));
                }
                candidate as u8
            }
        };

        self.board.tokens[seat as usize][token_idx].steps = Some(new_steps);

        let mut captured = false;
        if new_steps < 51 {
            let landed_ring = self.board.tokens[seat as usize][token_idx]
                .ring_position(seat)
                .unwrap();
            if !SAFE_SQUARES.contains(&landed_ring) {
                for other_seat in 0..self.board.player_count {
                    if other_seat == seat {
                        continue;
                    }
                    for other_token in self.board.tokens[other_seat as usize].iter_mut() {
                        if other_token.ring_position(other_seat) == Some(landed_ring) {
                            other_token.steps = None;
                            captured = true;
                        }
                    }
                }
            }
        }

        let reached_home = new_steps == HOME;
        if reached_home && self.board.all_home(seat) {
            self.board.winner = Some(seat);
        }

        let extra_turn = roll == 6 || captured || reached_home;
        self.finish_turn_with_extra(roll, extra_turn);

        let verb = if captured {
            "captured an opponent token"
        } else if reached_home {
            "brought a token home"
        } else {
            "moved"
        };
        Ok(ActionOutcome::new(format!("rolled {roll}, {verb}")))
    }

    fn finish_turn(&mut self, roll: u8) {
        self.finish_turn_with_extra(roll, roll == 6);
    }

    fn finish_turn_with_extra(&mut self, roll: u8, extra_turn: bool) {
        if roll == 6 {
            self.board.consecutive_sixes += 1;
            if self.board.consecutive_sixes == 3 {
                self.board.advance_turn();
                return;
            }
        } else {
            self.board.consecutive_sixes = 0;
        }
        if !extra_turn {
            self.board.advance_turn();
        }
    }
}

impl GameEngine for LudoEngine {
    fn kind(&self) -> GameKind {
        GameKind::Ludo
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
        payload: &Value,
        rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if action != "move_token" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.board.winner.is_some() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if seat != self.board.current_turn {
            return Err(EngineError::NotYourTurn);
        }
        let mv: MoveTokenPayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        let roll = if mv.roll == 0 { roll_die(rng, 6) as u8 } else { mv.roll };
        self.apply_move(seat, mv.token, roll)
    }

    fn is_terminal(&self) -> bool {
        self.board.winner.is_some()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.board.winner
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        let roll = roll_die(rng, 6) as u8;
        let movable = (0..TOKENS_PER_PLAYER)
            .find(|i| self.board.tokens[seat as usize][*i].steps.is_some() || roll == 6);
        match movable {
            Some(idx) => self.apply_move(seat, idx, roll).unwrap_or_else(|e| {
                self.finish_turn(roll);
                ActionOutcome::new(format!("auto-play could not move: {e}"))
            }),
            None => {
                self.finish_turn(roll);
                ActionOutcome::new(format!("rolled {roll}, no token can move"))
            }
        }
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        if self.board.current_turn == seat {
            self.board.advance_turn();
        }
    }

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        Projection {
            state: serde_json::json!({
                "tokens": self.board.tokens,
                "currentTurn": self.board.current_turn,
                "winner": self.board.winner,
            }),
            available_actions: if self.is_terminal() {
                vec![]
            } else {
                vec!["move_token".to_string()]
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
    fn a_non_six_roll_cannot_exit_base() {
        let mut engine = LudoEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        assert!(engine.apply_move(0, 0, 4).is_err());
    }

    #[test]
    fn overshoot_past_home_is_wasted_not_rejected() {
        let mut engine = LudoEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.tokens[0][0].steps = Some(55);
        let outcome = engine.apply_move(0, 0, 6).unwrap();
        assert_eq!(engine.board.tokens[0][0].steps, Some(55));
        assert!(outcome.description.contains("overshoots"));
    }

    #[test]
    fn landing_on_opponent_off_safe_square_sends_it_to_base() {
        let mut engine = LudoEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        // Seat 1 starts at ring offset 13; steps=49 puts it at ring square 10.
        engine.board.tokens[1][0].steps = Some(49);
        // Seat 0 starts at ring offset 0; 10 steps lands exactly on ring 10.
        engine.board.tokens[0][0].steps = Some(0);
        engine.apply_move(0, 0, 10).unwrap();
        assert_eq!(engine.board.tokens[1][0].steps, None);
    }

    #[test]
    fn rolling_six_grants_another_turn() {
        let mut engine = LudoEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.apply_move(0, 0, 6).unwrap();
        assert_eq!(engine.board.current_turn, 0);
    }
}
