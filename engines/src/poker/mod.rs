//! Texas Hold'em. One engine instance plays exactly one hand to showdown
//! (or to an uncontested fold-win) — blinds post at construction, betting
//! closes a street once every active player has matched the current bet
//! *and* acted at least once (which is what gives the big blind its
//! preflop option without any special-cased logic: the BB simply starts
//! in the "still needs to act" set like everyone else), side pots form
//! from the distinct `committed_total` thresholds at showdown, and hole
//! cards stay masked to everyone but their owner until the reveal.

mod cards;
mod hand;

use crate::common::SeatTable;
use cards::{fresh_deck, Card};
use lobby_core::engine::{ActionOutcome, GameEngine, GameKind, PlayerId, Projection, SeatIndex};
use lobby_core::error::EngineError;
use lobby_core::rng::EngineRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

const STARTING_STACK: i64 = 1000;
const SMALL_BLIND: i64 = 10;
const BIG_BLIND: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Phase {
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlayerState {
    stack: i64,
    hole: Option<[Card; 2]>,
    folded: bool,
    all_in: bool,
    committed_round: i64,
    committed_total: i64,
}

impl PlayerState {
    fn new() -> Self {
        PlayerState {
            stack: STARTING_STACK,
            hole: None,
            folded: false,
            all_in: false,
            committed_round: 0,
            committed_total: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableState {
    players: Vec<PlayerState>,
    deck: Vec<Card>,
    community: Vec<Card>,
    phase: Phase,
    button: SeatIndex,
    current_bet: i64,
    /// Smallest legal increment above `current_bet` for the next raise —
    /// the size of the last raise this street, reset to the big blind at
    /// the start of each new betting round (spec §4.3 "`raise{a}` requires
    /// `a >= minRaise`").
    min_raise: i64,
    current_actor: Option<SeatIndex>,
    to_act: BTreeSet<SeatIndex>,
    winners: Option<Vec<SeatIndex>>,
}

impl TableState {
    fn active_seats(&self) -> Vec<SeatIndex> {
        (0..self.players.len() as SeatIndex)
            .filter(|s| !self.players[*s as usize].folded)
            .collect()
    }

    fn contestable_seats(&self) -> Vec<SeatIndex> {
        (0..self.players.len() as SeatIndex)
            .filter(|s| !self.players[*s as usize].folded && !self.players[*s as usize].all_in)
            .collect()
    }

    /// First contestable seat strictly after `pivot`, walking the table in
    /// order — used both to seat the big blind and to open each new street
    /// from the first active player left of the button.
    fn first_contestable_after(&self, pivot: SeatIndex) -> Option<SeatIndex> {
        let n = self.players.len() as SeatIndex;
        (1..=n)
            .map(|offset| (pivot + offset) % n)
            .find(|seat| self.contestable_seats().contains(seat))
    }
}

pub struct PokerEngine {
    seats: SeatTable,
    table: TableState,
}

impl PokerEngine {
    pub fn new(player_count: u8, rng: &mut dyn EngineRng) -> Self {
        let player_count = player_count.max(2);
        let mut deck = fresh_deck(rng);
        let mut players: Vec<PlayerState> = (0..player_count).map(|_| PlayerState::new()).collect();
        for p in &mut players {
            p.hole = Some([deck.pop().unwrap(), deck.pop().unwrap()]);
        }

        let (sb_seat, bb_seat) = if player_count == 2 {
            (0, 1)
        } else {
            (1 % player_count, 2 % player_count)
        };
        players[sb_seat as usize].stack -= SMALL_BLIND;
        players[sb_seat as usize].committed_round = SMALL_BLIND;
        players[sb_seat as usize].committed_total = SMALL_BLIND;
        players[bb_seat as usize].stack -= BIG_BLIND;
        players[bb_seat as usize].committed_round = BIG_BLIND;
        players[bb_seat as usize].committed_total = BIG_BLIND;

        let first_to_act = if player_count == 2 {
            sb_seat
        } else {
            (bb_seat + 1) % player_count
        };
        let to_act: BTreeSet<SeatIndex> = (0..player_count).collect();
        let button = if player_count == 2 { sb_seat } else { 0 };

        PokerEngine {
            seats: SeatTable::with_capacity(player_count),
            table: TableState {
                players,
                deck,
                community: Vec::new(),
                phase: Phase::PreFlop,
                button,
                current_bet: BIG_BLIND,
                min_raise: BIG_BLIND,
                current_actor: Some(first_to_act),
                to_act,
                winners: None,
            },
        }
    }

    fn advance_actor(&mut self) {
        self.table.to_act.remove(&self.table.current_actor.unwrap_or(0));
        if self.round_closed() {
            self.close_betting_round();
            return;
        }
        let n = self.table.players.len() as SeatIndex;
        let mut next = (self.table.current_actor.unwrap_or(0) + 1) % n;
        while self.table.players[next as usize].folded || self.table.players[next as usize].all_in {
            next = (next + 1) % n;
        }
        self.table.current_actor = Some(next);
    }

    fn round_closed(&self) -> bool {
        if self.table.active_seats().len() <= 1 {
            return true;
        }
        if self.table.contestable_seats().len() <= 1 {
            return true;
        }
        self.table.to_act.is_empty()
    }

    fn close_betting_round(&mut self) {
        if self.table.active_seats().len() <= 1 {
            self.go_to_showdown();
            return;
        }
        for p in &mut self.table.players {
            p.committed_round = 0;
        }
        self.table.current_bet = 0;
        self.table.min_raise = BIG_BLIND;

        let all_in_or_done = self.table.contestable_seats().len() <= 1;

        self.table.phase = match self.table.phase {
            Phase::PreFlop => {
                for _ in 0..3 {
                    if let Some(c) = self.table.deck.pop() {
                        self.table.community.push(c);
                    }
                }
                Phase::Flop
            }
            Phase::Flop => {
                if let Some(c) = self.table.deck.pop() {
                    self.table.community.push(c);
                }
                Phase::Turn
            }
            Phase::Turn => {
                if let Some(c) = self.table.deck.pop() {
                    self.table.community.push(c);
                }
                Phase::River
            }
            Phase::River | Phase::Showdown => Phase::Showdown,
        };

        if self.table.phase == Phase::Showdown || all_in_or_done {
            while self.table.community.len() < 5 {
                if let Some(c) = self.table.deck.pop() {
                    self.table.community.push(c);
                } else {
                    break;
                }
            }
            self.go_to_showdown();
            return;
        }

        self.table.to_act = self.table.contestable_seats().into_iter().collect();
        self.table.current_actor = self.table.first_contestable_after(self.table.button);
    }

    fn go_to_showdown(&mut self) {
        self.table.phase = Phase::Showdown;
        self.table.current_actor = None;

        let active = self.table.active_seats();
        if active.len() == 1 {
            let winner = active[0];
            self.table.players[winner as usize].stack +=
                self.table.players.iter().map(|p| p.committed_total).sum::<i64>();
            self.table.winners = Some(vec![winner]);
            return;
        }

        let pots = self.resolve_side_pots();
        let mut winners_overall = BTreeSet::new();
        for (amount, eligible) in pots {
            let scores: Vec<(SeatIndex, u32)> = eligible
                .iter()
                .filter_map(|seat| {
                    let p = &self.table.players[*seat as usize];
                    p.hole.map(|hole| (*seat, hand::best_seven_card_score(hole, &self.table.community)))
                })
                .collect();
            let Some(&best) = scores.iter().map(|(_, s)| s).max().as_ref() else {
                continue;
            };
            let pot_winners: Vec<SeatIndex> = scores.iter().filter(|(_, s)| *s == best).map(|(seat, _)| *seat).collect();
            let share = amount / pot_winners.len() as i64;
            let remainder = amount % pot_winners.len() as i64;
            // The indivisible remainder goes to the first tied seat clockwise
            // from the dealer (spec §4.3), not whichever seat happened first
            // in score order.
            let n = self.table.players.len() as SeatIndex;
            let first_clockwise_from_dealer = (1..=n)
                .map(|offset| (self.table.button + offset) % n)
                .find(|seat| pot_winners.contains(seat));
            for w in &pot_winners {
                self.table.players[*w as usize].stack += share;
                winners_overall.insert(*w);
            }
            if remainder > 0 {
                if let Some(seat) = first_clockwise_from_dealer {
                    self.table.players[seat as usize].stack += remainder;
                }
            }
        }
        self.table.winners = Some(winners_overall.into_iter().collect());
    }

    fn resolve_side_pots(&self) -> Vec<(i64, Vec<SeatIndex>)> {
        let mut thresholds: Vec<i64> = self.table.players.iter().map(|p| p.committed_total).filter(|c| *c > 0).collect();
        thresholds.sort_unstable();
        thresholds.dedup();

        let mut pots = Vec::new();
        let mut prev = 0;
        for t in thresholds {
            let layer_amount: i64 = self
                .table
                .players
                .iter()
                .map(|p| (p.committed_total.min(t) - p.committed_total.min(prev)).max(0))
                .sum();
            let eligible: Vec<SeatIndex> = (0..self.table.players.len() as SeatIndex)
                .filter(|s| {
                    let p = &self.table.players[*s as usize];
                    p.committed_total >= t && !p.folded
                })
                .collect();
            if layer_amount > 0 && !eligible.is_empty() {
                pots.push((layer_amount, eligible));
            }
            prev = t;
        }
        pots
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PokerAction {
    Fold,
    Check,
    Call,
    Bet { amount: i64 },
    Raise { amount: i64 },
    AllIn,
}

impl GameEngine for PokerEngine {
    fn kind(&self) -> GameKind {
        GameKind::Poker
    }
    fn min_seats(&self) -> u8 {
        2
    }
    fn max_seats(&self) -> u8 {
        9
    }

    fn add_player(&mut self, seat: SeatIndex, player: PlayerId) -> bool {
        self.seats.add(seat, player)
    }

    fn remove_player(&mut self, player: &PlayerId) -> bool {
        self.seats.remove(player)
    }

    fn current_player_index(&self) -> Option<SeatIndex> {
        self.table.current_actor
    }

    fn handle_action(
        &mut self,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        _rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, EngineError> {
        if self.table.phase == Phase::Showdown {
            return Err(EngineError::InvalidPhase);
        }
        let seat = self.seats.seat_of(actor).ok_or(EngineError::SeatUnavailable)?;
        if self.table.current_actor != Some(seat) {
            return Err(EngineError::NotYourTurn);
        }

        let mut parsed = serde_json::Map::new();
        parsed.insert("kind".to_string(), Value::String(action.to_string()));
        if let Value::Object(extra) = payload {
            for (k, v) in extra {
                parsed.insert(k.clone(), v.clone());
            }
        }
        let parsed: PokerAction = serde_json::from_value(Value::Object(parsed))
            .map_err(|e| EngineError::UnknownAction(format!("{action}: {e}")))?;

        let to_call = self.table.current_bet - self.table.players[seat as usize].committed_round;
        let description;
        match parsed {
            PokerAction::Fold => {
                self.table.players[seat as usize].folded = true;
                description = format!("{actor} folds");
            }
            PokerAction::Check => {
                if to_call != 0 {
                    return Err(EngineError::CannotCheck);
                }
                description = format!("{actor} checks");
            }
            PokerAction::Call => {
                let stack = self.table.players[seat as usize].stack;
                let pay = to_call.min(stack);
                self.table.players[seat as usize].stack -= pay;
                self.table.players[seat as usize].committed_round += pay;
                self.table.players[seat as usize].committed_total += pay;
                if pay == stack && pay < to_call {
                    self.table.players[seat as usize].all_in = true;
                }
                description = format!("{actor} calls {pay}");
            }
            PokerAction::Bet { amount } | PokerAction::Raise { amount } => {
                let increment = amount - self.table.current_bet;
                if increment <= 0 {
                    return Err(EngineError::IllegalMove);
                }
                let stack = self.table.players[seat as usize].stack;
                let already = self.table.players[seat as usize].committed_round;
                let needed = amount - already;
                if needed > stack {
                    return Err(EngineError::InsufficientChips);
                }
                if increment < self.table.min_raise {
                    return Err(EngineError::IllegalMove);
                }
                self.table.players[seat as usize].stack -= needed;
                self.table.players[seat as usize].committed_round = amount;
                self.table.players[seat as usize].committed_total += needed;
                self.table.current_bet = amount;
                self.table.min_raise = increment;
                // A bet/raise reopens the action to every other live player.
                self.table.to_act = self
                    .table
                    .contestable_seats()
                    .into_iter()
                    .filter(|s| *s != seat)
                    .collect();
                description = format!("{actor} bets to {amount}");
            }
            PokerAction::AllIn => {
                let stack = self.table.players[seat as usize].stack;
                self.table.players[seat as usize].stack = 0;
                self.table.players[seat as usize].committed_round += stack;
                self.table.players[seat as usize].committed_total += stack;
                self.table.players[seat as usize].all_in = true;
                if self.table.players[seat as usize].committed_round > self.table.current_bet {
                    let increment = self.table.players[seat as usize].committed_round - self.table.current_bet;
                    self.table.current_bet = self.table.players[seat as usize].committed_round;
                    self.table.min_raise = self.table.min_raise.max(increment);
                    self.table.to_act = self
                        .table
                        .contestable_seats()
                        .into_iter()
                        .filter(|s| *s != seat)
                        .collect();
                }
                description = format!("{actor} goes all-in for {stack}");
            }
        }

        self.advance_actor();
        Ok(ActionOutcome::new(description))
    }

    fn is_terminal(&self) -> bool {
        self.table.phase == Phase::Showdown
    }

    fn winner_index(&self) -> Option<SeatIndex> {
        match &self.table.winners {
            Some(w) if w.len() == 1 => Some(w[0]),
            _ => None,
        }
    }

    fn auto_play(&mut self, seat: SeatIndex, rng: &mut dyn EngineRng) -> ActionOutcome {
        let player = self.seats.player_at(seat).cloned().unwrap_or_default();
        let to_call = self.table.current_bet - self.table.players[seat as usize].committed_round;
        let action = if to_call == 0 { "check" } else { "fold" };
        self.handle_action(&player, action, &Value::Null, rng)
            .unwrap_or_else(|e| ActionOutcome::new(format!("auto-play failed: {e}")))
    }

    fn eliminate(&mut self, seat: SeatIndex) {
        self.table.players[seat as usize].folded = true;
        if self.table.current_actor == Some(seat) {
            self.advance_actor();
        }
    }

    fn project_for(&self, viewer: &PlayerId) -> Projection {
        let viewer_seat = self.seats.seat_of(viewer);
        let reveal_all = self.table.phase == Phase::Showdown;
        let players: Vec<Value> = self
            .table
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let show_hole = reveal_all && !p.folded || Some(i as SeatIndex) == viewer_seat;
                serde_json::json!({
                    "stack": p.stack,
                    "folded": p.folded,
                    "allIn": p.all_in,
                    "committedRound": p.committed_round,
                    "committedTotal": p.committed_total,
                    "holeCards": if show_hole { p.hole } else { None },
                })
            })
            .collect();

        let actions = if viewer_seat == self.table.current_actor && !self.is_terminal() {
            vec!["fold".into(), "check".into(), "call".into(), "bet".into(), "raise".into(), "all_in".into()]
        } else {
            vec![]
        };

        Projection {
            state: serde_json::json!({
                "players": players,
                "community": self.table.community,
                "phase": self.table.phase,
                "currentBet": self.table.current_bet,
                "currentActor": self.table.current_actor,
                "winners": self.table.winners,
            }),
            available_actions: actions,
        }
    }

    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(&self.table).unwrap_or_default()
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.table = serde_json::from_slice(bytes).map_err(|_| EngineError::CorruptSnapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cards::{Rank, Suit};
    use lobby_core::rng::DeterministicRng;

    fn heads_up() -> PokerEngine {
        let mut rng = DeterministicRng::new(11);
        let mut engine = PokerEngine::new(2, &mut rng);
        engine.add_player(0, "sb".into());
        engine.add_player(1, "bb".into());
        engine
    }

    #[test]
    fn blinds_are_posted_at_construction() {
        let engine = heads_up();
        assert_eq!(engine.table.players[0].committed_total, SMALL_BLIND);
        assert_eq!(engine.table.players[1].committed_total, BIG_BLIND);
    }

    #[test]
    fn checking_when_a_bet_is_outstanding_is_rejected() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        // Heads-up preflop: seat 0 (SB/button) acts first.
        let result = engine.handle_action(&"sb".to_string(), "check", &Value::Null, &mut rng);
        assert_eq!(result.unwrap_err(), EngineError::CannotCheck);
    }

    #[test]
    fn folding_ends_the_hand_uncontested() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        engine.handle_action(&"sb".to_string(), "fold", &Value::Null, &mut rng).unwrap();
        assert!(engine.is_terminal());
        assert_eq!(engine.winner_index(), Some(1));
    }

    #[test]
    fn calling_then_checking_advances_to_the_flop() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        engine.handle_action(&"sb".to_string(), "call", &Value::Null, &mut rng).unwrap();
        assert_eq!(engine.table.phase, Phase::PreFlop);
        engine.handle_action(&"bb".to_string(), "check", &Value::Null, &mut rng).unwrap();
        assert_eq!(engine.table.phase, Phase::Flop);
        assert_eq!(engine.table.community.len(), 3);
    }

    #[test]
    fn a_raise_reopens_action_to_the_caller() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        engine
            .handle_action(&"sb".to_string(), "raise", &serde_json::json!({"amount": 60}), &mut rng)
            .unwrap();
        assert_eq!(engine.table.current_actor, Some(1));
        assert!(engine.table.to_act.contains(&1));
    }

    #[test]
    fn a_raise_smaller_than_the_minimum_increment_is_rejected() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        // Preflop current bet is the big blind (20); the minimum legal
        // raise increment is also 20, so raising to 30 (a 10-chip increment)
        // is below the minimum and must be rejected.
        let result = engine.handle_action(&"sb".to_string(), "raise", &serde_json::json!({"amount": 30}), &mut rng);
        assert_eq!(result.unwrap_err(), EngineError::IllegalMove);
    }

    #[test]
    fn a_legal_raise_raises_the_minimum_increment_for_the_next_raise() {
        let mut engine = heads_up();
        let mut rng = DeterministicRng::new(1);
        engine
            .handle_action(&"sb".to_string(), "raise", &serde_json::json!({"amount": 100}), &mut rng)
            .unwrap();
        assert_eq!(engine.table.min_raise, 80);
        // A re-raise smaller than the new 80-chip increment is illegal.
        let result = engine.handle_action(&"bb".to_string(), "raise", &serde_json::json!({"amount": 150}), &mut rng);
        assert_eq!(result.unwrap_err(), EngineError::IllegalMove);
    }

    #[test]
    fn an_indivisible_split_pot_remainder_goes_to_the_first_seat_clockwise_from_the_dealer() {
        let mut rng = DeterministicRng::new(3);
        let mut engine = PokerEngine::new(3, &mut rng);
        engine.add_player(0, "a".into());
        engine.add_player(1, "b".into());
        engine.add_player(2, "c".into());

        // No board pair, so pocket aces make the nut pair of aces. Seats 0
        // and 2 hold pocket aces (identical kickers off the shared board) and
        // tie for best hand; seat 1 only pairs the board's deuce and loses.
        engine.table.community = vec![
            Card { rank: Rank(2), suit: Suit::Clubs },
            Card { rank: Rank(5), suit: Suit::Diamonds },
            Card { rank: Rank(9), suit: Suit::Hearts },
            Card { rank: Rank(12), suit: Suit::Spades },
            Card { rank: Rank(3), suit: Suit::Hearts },
        ];
        engine.table.players[0].hole = Some([Card { rank: Rank(14), suit: Suit::Diamonds }, Card { rank: Rank(14), suit: Suit::Hearts }]);
        engine.table.players[1].hole = Some([Card { rank: Rank(2), suit: Suit::Diamonds }, Card { rank: Rank(7), suit: Suit::Clubs }]);
        engine.table.players[2].hole = Some([Card { rank: Rank(14), suit: Suit::Spades }, Card { rank: Rank(14), suit: Suit::Clubs }]);
        for p in engine.table.players.iter_mut() {
            p.stack = 0;
            p.committed_total = 101;
        }
        engine.table.button = 0;

        engine.go_to_showdown();
        assert_eq!(engine.table.winners.as_ref().unwrap(), &vec![0, 2]);
        // 303 chips split between two tied winners leaves a one-chip
        // remainder that must land on seat 2, the first tied seat clockwise
        // from the button (seat 1, the other candidate, isn't tied).
        assert_eq!(engine.table.players[0].stack, 151);
        assert_eq!(engine.table.players[1].stack, 0);
        assert_eq!(engine.table.players[2].stack, 152);
    }
}
