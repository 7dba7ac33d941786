//! Memory: a turn-based card-matching game. Face-down cards are the
//! masking test case called out in spec §9 — every viewer sees the same
//! face-up cards, but face-down card identities are withheld from
//! everyone, including the players, until flipped.

use crate::common::SeatTable;
use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::{shuffle, EngineRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PAIR_COUNT: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Card {
    symbol: u8,
    face_up: bool,
    matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    cards: Vec<Card>,
    current_turn: SeatIndex,
    pending_flip: Option<usize>,
    scores: [u32; 2],
}

impl Board {
    fn new(rng: &mut dyn EngineRng) -> Self {
        let mut symbols: Vec<u8> = (0..PAIR_COUNT as u8).flat_map(|s| [s, s]).collect();
        shuffle(rng, &mut symbols);
        let cards = symbols
            .into_iter()
            .map(|symbol| Card {
                symbol,
                face_up: false,
                matched: false,
            })
            .collect();
        Board {
            cards,
            current_turn: 0,
            pending_flip: None,
            scores: [0, 0],
        }
    }

    fn all_matched(&self) -> bool {
        self.cards.iter().all(|c| c.matched)
    }
}

#[derive(Deserialize)]
struct FlipPayload {
    index: usize,
}

pub struct MemoryEngine {
    seats: SeatTable,
    board: Board,
}

impl MemoryEngine {
    pub fn new(rng: &mut dyn EngineRng) -> Self {
        MemoryEngine {
            seats: SeatTable::with_capacity(2),
            board: Board::new(rng),
        }
    }
}

impl GameEngine for MemoryEngine {
    fn kind(&self) -> GameKind {
        GameKind::Memory
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
        if self.board.all_matched() {
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
        _rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if action != "flip" {
            return Err(EngineError::UnknownAction(action.to_string()));
        }
        if self.board.all_matched() {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if seat != self.board.current_turn {
            return Err(EngineError::NotYourTurn);
        }

        let mv: FlipPayload = serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedPayload(e.to_string()))?;
        let Some(card) = self.board.cards.get(mv.index) else {
            return Err(EngineError::IllegalMove);
        };
        if card.face_up || card.matched {
            return Err(EngineError::IllegalMove);
        }

        match self.board.pending_flip {
            None => {
                self.board.cards[mv.index].face_up = true;
                self.board.pending_flip = Some(mv.index);
                Ok(ActionOutcome::new(format!("{actor} flipped card {}", mv.index)))
            }
            Some(first) => {
                if first == mv.index {
                    return Err(EngineError::IllegalMove);
                }
                self.board.cards[mv.index].face_up = true;
                let is_match = self.board.cards[first].symbol == self.board.cards[mv.index].symbol;
                self.board.pending_flip = None;

                if is_match {
                    self.board.cards[first].matched = true;
                    self.board.cards[mv.index].matched = true;
                    self.board.scores[seat as usize] += 1;
                    // A match grants another turn; no flip on the turn.
                } else {
                    self.board.cards[first].face_up = false;
                    self.board.cards[mv.index].face_up = false;
                    self.board.current_turn = 1 - self.board.current_turn;
                }
                Ok(ActionOutcome::new(format!(
                    "{actor} flipped card {}, {}",
                    mv.index,
                    if is_match { "matched" } else { "no match" }
                )))
            }
        }
    }

    fn is_terminal(&self) -> bool {
        self.board.all_matched()
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        if !self.is_terminal() {
            return None;
        }
        match self.board.scores[0].cmp(&self.board.scores[1]) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        let face_down: Vec<usize> = self
            .board
            .cards
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.face_up && !c.matched)
            .map(|(i, _)| i)
            .collect();
        if face_down.is_empty() {
            return ActionOutcome::new("no cards left to auto-flip");
        }
        let idx = face_down[lobby_core::rng::gen_range(rng, face_down.len() as u32) as usize];
        let player = self.seats.player_at(seat).cloned().unwrap_or_default();
        let payload = serde_json::json!({ "index": idx });
        self.handle_action(&player, "flip", &payload, rng)
            .unwrap_or_else(ActionOutcome::new_from_error)
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        self.board.current_turn = 1 - seat;
    }

    fn project_for(&self, _viewer: &PlayerId) -> Projection {
        let cells: Vec<Value> = self
            .board
            .cards
            .iter()
            .map(|c| {
                if c.face_up || c.matched {
                    serde_json::json!({ "symbol": c.symbol, "matched": c.matched })
                } else {
                    serde_json::json!({ "symbol": null, "matched": false })
                }
            })
            .collect();
        Projection {
            state: serde_json::json!({
                "cards": cells,
                "currentTurn": self.board.current_turn,
                "scores": self.board.scores,
            }),
            available_actions: if self.is_terminal() {
                vec![]
            } else {
                vec!["flip".to_string()]
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

trait OutcomeFromError {
    fn new_from_error(err: EngineError) -> ActionOutcome;
}

impl OutcomeFromError for ActionOutcome {
    fn new_from_error(err: EngineError) -> ActionOutcome {
        ActionOutcome::new(format!("auto-play failed: {err}"))
    }
}
