//! Monopoly, trimmed to the core loop the spec's scenario exercises: dice
//! movement around a 40-square board, property purchase/rent on the
//! squares that are ownable, and jail. Rolling doubles three times in a
//! row sends the roller straight to jail instead of moving (spec §8
//! scenario 6) — the third double is never applied to the board.

use crate::common::SeatTable;
use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::{roll_die, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BOARD_SIZE: u8 = 40;
const JAIL_SQUARE: u8 = 10;
const GO_SALARY: i64 = 200;
const STARTING_CASH: i64 = 1500;
const MAX_PLAYERS: u8 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Property {
    price: i64,
    rent: i64,
    owner: Option<SeatIndex>,
}

fn property_board() -> Vec<Option<Property>> {
    // Only a subset of the 40 squares are ownable property; the rest (Go,
    // Chance, Tax, Jail, Free Parking, Go To Jail) carry no property data.
    let mut board = vec![None; BOARD_SIZE as usize];
    let ownable: [(u8, i64, i64); 22] = [
        (1, 60, 2), (3, 60, 4), (5, 200, 25), (6, 100, 6), (8, 100, 6),
        (9, 120, 8), (11, 140, 10), (13, 140, 10), (14, 160, 12), (15, 200, 25),
        (16, 180, 14), (18, 180, 14), (19, 200, 16), (21, 220, 18), (23, 220, 18),
        (24, 240, 20), (25, 200, 25), (26, 260, 22), (27, 260, 22), (28, 150, 12),
        (29, 280, 24), (31, 300, 26),
    ];
    for (square, price, rent) in ownable {
        board[square as usize] = Some(Property { price, rent, owner: None });
    }
    board
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlayerState {
    cash: i64,
    position: u8,
    in_jail: bool,
    consecutive_doubles: u8,
    bankrupt: bool,
}

impl PlayerState {
    fn new() -> Self {
        PlayerState {
            cash: STARTING_CASH,
            position: 0,
            in_jail: false,
            consecutive_doubles: 0,
            bankrupt: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardState {
    players: Vec<PlayerState>,
    properties: Vec<Option<Property>>,
    current_turn: SeatIndex,
}

impl BoardState {
    fn new(player_count: u8) -> Self {
        BoardState {
            players: (0..player_count).map(|_| PlayerState::new()).collect(),
            properties: property_board(),
            current_turn: 0,
        }
    }

    fn active_players(&self) -> Vec<SeatIndex> {
        (0..self.players.len() as SeatIndex)
            .filter(|i| !self.players[*i as usize].bankrupt)
            .collect()
    }

    fn advance_turn(&mut self) {
        let active = self.active_players();
        if active.is_empty() {
            return;
        }
        let mut next = (self.current_turn + 1) % self.players.len() as SeatIndex;
        while self.players[next as usize].bankrupt {
            next = (next + 1) % self.players.len() as SeatIndex;
        }
        self.current_turn = next;
        self.players[self.current_turn as usize].consecutive_doubles = 0;
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
enum MonopolyAction {
    #[serde(rename = "roll")]
    Roll,
    #[serde(rename = "buy")]
    Buy,
    #[serde(rename = "end_turn")]
    EndTurn,
}

pub struct MonopolyEngine {
    seats: SeatTable,
    board: BoardState,
    awaiting_purchase_decision: bool,
}

impl MonopolyEngine {
    pub fn new(player_count: u8) -> Self {
        let player_count = player_count.clamp(2, MAX_PLAYERS);
        MonopolyEngine {
            seats: SeatTable::with_capacity(player_count),
            board: BoardState::new(player_count),
            awaiting_purchase_decision: false,
        }
    }

    fn winner(&self) -> Option<SeatIndex> {
        let active = self.board.active_players();
        if active.len() == 1 && self.board.players.len() > 1 {
            Some(active[0])
        } else {
            None
        }
    }

    fn roll(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> Result<ActionOutcome, EngineError> {
        if self.awaiting_purchase_decision {
            return Err(EngineError::InvalidPhase);
        }
        let die1 = roll_die(rng, 6);
        let die2 = roll_die(rng, 6);
        let is_double = die1 == die2;
        let player = &mut self.board.players[seat as usize];

        if player.in_jail {
            if is_double {
                player.in_jail = false;
            } else {
                self.board.advance_turn();
                return Ok(ActionOutcome::new(format!(
                    "rolled {die1}+{die2} in jail, no double, turn passes"
                )));
            }
        }

        if is_double {
            player.consecutive_doubles += 1;
            if player.consecutive_doubles == 3 {
                player.position = JAIL_SQUARE;
                player.in_jail = true;
                self.board.advance_turn();
                return Ok(ActionOutcome::new("rolled a third consecutive double, sent to jail"));
            }
        } else {
            player.consecutive_doubles = 0;
        }

        let steps = die1 + die2;
        let new_position = (player.position as u32 + steps) % BOARD_SIZE as u32;
        let passed_go = player.position as u32 + steps >= BOARD_SIZE as u32;
        player.position = new_position as u8;
        if passed_go {
            player.cash += GO_SALARY;
        }

        let mut description = format!("rolled {die1}+{die2}, moved to square {new_position}");
        if let Some(prop) = self.board.properties[new_position as usize] {
            match prop.owner {
                None => {
                    self.awaiting_purchase_decision = true;
                    description.push_str(", may buy this property");
                }
                Some(owner) if owner != seat => {
                    let rent = prop.rent;
                    self.board.players[seat as usize].cash -= rent;
                    self.board.players[owner as usize].cash += rent;
                    if self.board.players[seat as usize].cash < 0 {
                        self.board.players[seat as usize].bankrupt = true;
                    }
                    description.push_str(&format!(", paid {rent} rent to seat {owner}"));
                }
                _ => {}
            }
        }

        if !self.awaiting_purchase_decision && !is_double {
            self.board.advance_turn();
        }
        Ok(ActionOutcome::new(description))
    }

    fn buy(&mut self, seat: SeatIndex) -> Result<ActionOutcome, EngineError> {
        if !self.awaiting_purchase_decision {
            return Err(EngineError::InvalidPhase);
        }
        let position = self.board.players[seat as usize].position as usize;
        let Some(prop) = self.board.properties[position].as_mut() else {
            return Err(EngineError::IllegalMove);
        };
        if prop.owner.is_some() {
            return Err(EngineError::IllegalMove);
        }
        if self.board.players[seat as usize].cash < prop.price {
            return Err(EngineError::InsufficientChips);
        }
        prop.owner = Some(seat);
        self.board.players[seat as usize].cash -= prop.price;
        self.awaiting_purchase_decision = false;
        let is_double = false; // purchase never grants the extra roll itself
        if !is_double {
            self.board.advance_turn();
        }
        Ok(ActionOutcome::new(format!("bought property at square {position}")))
    }

    fn end_turn(&mut self, seat: SeatIndex) -> Result<ActionOutcome, EngineError> {
        if self.awaiting_purchase_decision {
            self.awaiting_purchase_decision = false;
        }
        let _ = seat;
        self.board.advance_turn();
        Ok(ActionOutcome::new("declined to buy, turn passes"))
    }
}

impl GameEngine for MonopolyEngine {
    fn kind(&self) -> GameKind {
        GameKind::Monopoly
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
        if self.winner().is_some() {
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
        if self.winner().is_some() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if seat != self.board.current_turn {
            return Err(EngineError::NotYourTurn);
        }
        let parsed: MonopolyAction = match action {
            "roll" => MonopolyAction::Roll,
            "buy" => MonopolyAction::Buy,
            "end_turn" => MonopolyAction::EndTurn,
            other => return Err(EngineError::UnknownAction(other.to_string())),
        };
        match parsed {
            MonopolyAction::Roll => self.roll(seat, rng),
            MonopolyAction::Buy => self.buy(seat),
            MonopolyAction::EndTurn => self.end_turn(seat),
        }
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        self.winner()
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        if self.awaiting_purchase_decision {
            self.end_turn(seat).unwrap_or_else(|e| ActionOutcome::new(format!("{e}")))
        } else {
            self.roll(seat, rng).unwrap_or_else(|e| ActionOutcome::new(format!("{e}")))
        }
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        self.board.players[seat as usize].bankrupt = true;
        if self.board.current_turn == seat {
            self.board.advance_turn();
        }
    }

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        let mut actions = vec![];
        if !self.is_terminal() {
            if self.awaiting_purchase_decision {
                actions.push("buy".to_string());
                actions.push("end_turn".to_string());
            } else {
                actions.push("roll".to_string());
            }
        }
        Projection {
            state: serde_json::json!({
                "players": self.board.players,
                "properties": self.board.properties,
                "currentTurn": self.board.current_turn,
                "awaitingPurchaseDecision": self.awaiting_purchase_decision,
            }),
            available_actions: actions,
        }
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&(&self.board, self.awaiting_purchase_decision)).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let (board, awaiting) =
            serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        self.board = board;
        self.awaiting_purchase_decision = awaiting;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_core::rng::DeterministicRng;

    #[test]
    fn third_consecutive_double_sends_to_jail_without_moving_normally() {
        // Search for a seed whose first two dice come up equal, then drive
        // the real roll() path through handle_action and check its actual
        // output, rather than re-deriving the third-double transition here.
        for seed in 0..1000u64 {
            let mut engine = MonopolyEngine::new(2);
            engine.add_player(0, "p1".into());
            engine.add_player(1, "p2".into());
            engine.board.players[0].consecutive_doubles = 2;
            engine.board.players[0].position = 5;

            let mut rng = DeterministicRng::new(seed);
            let outcome = engine
                .handle_action(&"p1".to_string(), "roll", &serde_json::json!({}), &mut rng)
                .unwrap();

            if engine.board.players[0].in_jail {
                assert_eq!(engine.board.players[0].position, JAIL_SQUARE);
                assert_eq!(engine.board.players[0].consecutive_doubles, 3);
                assert!(outcome.description.contains("third consecutive double"));
                return;
            }
        }
        panic!("no seed in the search range rolled a double; widen the range");
    }

    #[test]
    fn buying_deducts_cash_and_assigns_owner() {
        let mut engine = MonopolyEngine::new(2);
        engine.add_player(0, "p1".into());
        engine.add_player(1, "p2".into());
        engine.board.players[0].position = 1;
        engine.awaiting_purchase_decision = true;

        let result = engine.buy(0);
        assert!(result.is_ok());
        assert_eq!(engine.board.properties[1].unwrap().owner, Some(0));
        assert_eq!(engine.board.players[0].cash, STARTING_CASH - 60);
    }

    #[test]
    fn landing_on_owned_property_charges_rent() {
        // Square 3 is only reachable from Go by a dice sum of 3, which can
        // never be a double, so the search below can't collide with the
        // third-double jail branch. Search for a seed that rolls it, then
        // drive the real roll() path and check the rent it actually moved.
        for seed in 0..1000u64 {
            let mut engine = MonopolyEngine::new(2);
            engine.add_player(0, "p1".into());
            engine.add_player(1, "p2".into());
            engine.board.properties[3].as_mut().unwrap().owner = Some(1);
            let rent = engine.board.properties[3].unwrap().rent;
            let payer_cash_before = engine.board.players[0].cash;
            let owner_cash_before = engine.board.players[1].cash;

            let mut rng = DeterministicRng::new(seed);
            let outcome = engine
                .handle_action(&"p1".to_string(), "roll", &serde_json::json!({}), &mut rng)
                .unwrap();

            if engine.board.players[0].position == 3 {
                assert_eq!(engine.board.players[0].cash, payer_cash_before - rent);
                assert_eq!(engine.board.players[1].cash, owner_cash_before + rent);
                assert!(!engine.awaiting_purchase_decision);
                assert!(outcome.description.contains("paid"));
                return;
            }
        }
        panic!("no seed in the search range landed on square 3; widen the range");
    }
}
