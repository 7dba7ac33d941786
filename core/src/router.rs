//! Action Router (C6): validates the envelope (room exists, player is
//! seated, game is in the right lifecycle phase) before ever calling into
//! an engine, and translates engine errors into the router's own error
//! taxonomy so callers have one type to match on.

use crate::engine::PlayerId;
use crate::error::RouterError;
use crate::rng::EngineRng;
use crate::room::Room;
use crate::store::GameStore;
use protocol::RoomStatus;
use serde_json::Value;

use crate::engine::ActionOutcome;

pub struct ActionRouter<'a> {
    pub store: &'a GameStore,
}

impl<'a> ActionRouter<'a> {
    pub fn new(store: &'a GameStore) -> Self {
        ActionRouter { store }
    }

    /// Validates lifecycle/membership and, if the action is admissible,
    /// dispatches to the engine. `room` is passed in because lifecycle
    /// checks (status, seating) live on the Room, not the engine.
    pub fn dispatch(
        &self,
        room: &Room,
        actor: &PlayerId,
        action: &str,
        payload: &Value,
        rng: &mut dyn EngineRng,
    ) -> Result<ActionOutcome, RouterError> {
        if room.status != RoomStatus::Playing {
            return Err(RouterError::AlreadyOver);
        }
        if room.find_seat(actor).is_none() {
            return Err(RouterError::NotInRoom);
        }

        self.store
            .with_engine_mut(&room.code, |engine| engine.handle_action(actor, action, payload, rng))
            .ok_or(RouterError::RoomNotFound)?
            .map_err(RouterError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GameKind, Projection, SeatIndex};
    use crate::error::EngineError;
    use crate::rng::DeterministicRng;

    struct AcceptAllEngine;

    impl crate::GameEngine for AcceptAllEngine {
        fn kind(&self) -> GameKind {
            GameKind::TicTacToe
        }
        fn min_seats(&self) -> u8 {
            2
        }
        fn max_seats(&self) -> u8 {
            2
        }
        fn add_player(&mut self, _seat: SeatIndex, _player: PlayerId) -> bool {
            true
        }
        fn remove_player(&mut self, _player: &PlayerId) -> bool {
            true
        }
        fn current_player_index(&self) -> Option<SeatIndex> {
            Some(0)
        }
        fn handle_action(
            &mut self,
            actor: &PlayerId,
            action: &str,
            _payload: &Value,
            _rng: &mut dyn EngineRng,
        ) -> Result<ActionOutcome, EngineError> {
            if action == "boom" {
                return Err(EngineError::IllegalMove);
            }
            Ok(ActionOutcome::new(format!("{actor} did {action}")))
        }
        fn is_terminal(&self) -> bool {
            false
        }
        fn winner_index(&self) -> Option<SeatIndex> {
            None
        }
        fn auto_play(&mut self, _seat: SeatIndex, _rng: &mut dyn EngineRng) -> ActionOutcome {
            ActionOutcome::new("auto")
        }
        fn eliminate(&mut self, _seat: SeatIndex) {}
        fn project_for(&self, _viewer: &PlayerId) -> Projection {
            Projection {
                state: Value::Null,
                available_actions: vec![],
            }
        }
        fn serialize(&self) -> Vec<u8> {
            vec![]
        }
        fn restore(&mut self, _bytes: &[u8]) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn playing_room() -> Room {
        let mut room = Room::new("ABCDEF", 0);
        room.join("p1".into(), "Alice".into());
        room.status = RoomStatus::Playing;
        room
    }

    #[test]
    fn rejects_action_from_unseated_player() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(AcceptAllEngine), 0);
        let router = ActionRouter::new(&store);
        let room = playing_room();
        let mut rng = DeterministicRng::new(1);

        let result = router.dispatch(&room, &"ghost".to_string(), "move", &Value::Null, &mut rng);
        assert_eq!(result.unwrap_err(), RouterError::NotInRoom);
    }

    #[test]
    fn rejects_action_when_room_not_playing() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(AcceptAllEngine), 0);
        let router = ActionRouter::new(&store);
        let mut room = playing_room();
        room.status = RoomStatus::Waiting;
        let mut rng = DeterministicRng::new(1);

        let result = router.dispatch(&room, &"p1".to_string(), "move", &Value::Null, &mut rng);
        assert_eq!(result.unwrap_err(), RouterError::AlreadyOver);
    }

    #[test]
    fn translates_engine_errors() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(AcceptAllEngine), 0);
        let router = ActionRouter::new(&store);
        let room = playing_room();
        let mut rng = DeterministicRng::new(1);

        let result = router.dispatch(&room, &"p1".to_string(), "boom", &Value::Null, &mut rng);
        assert_eq!(result.unwrap_err(), RouterError::Engine(EngineError::IllegalMove));
    }

    #[test]
    fn accepts_valid_action() {
        let store = GameStore::new();
        store.create("ABCDEF", GameKind::TicTacToe, Box::new(AcceptAllEngine), 0);
        let router = ActionRouter::new(&store);
        let room = playing_room();
        let mut rng = DeterministicRng::new(1);

        let outcome = router
            .dispatch(&room, &"p1".to_string(), "move", &Value::Null, &mut rng)
            .unwrap();
        assert_eq!(outcome.description, "p1 did move");
    }
}
