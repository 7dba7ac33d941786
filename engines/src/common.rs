//! Small helpers shared by the simpler single-board engines, so each of
//! them doesn't reimplement seat bookkeeping from scratch.

use lobby_core::engine::{PlayerId, SeatIndex};

/// Fixed-size seat table: `seats[i]` is the player occupying seat `i`, if
/// any. Shared by engines whose seat assignment is just "first N joiners,
/// in order."
#[derive(Debug, Clone, Default)]
pub struct SeatTable {
    seats: Vec<Option<PlayerId>>,
}

impl SeatTable {
    pub fn with_capacity(max_seats: u8) -> Self {
        SeatTable {
            seats: vec![None; max_seats as usize],
        }
    }

    pub fn add(&mut self, seat: SeatIndex, player: PlayerId) -> bool {
        match self.seats.get_mut(seat as usize) {
            Some(slot) if slot.is_none() => {
                *slot = Some(player);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, player: &str) -> bool {
        for slot in &mut self.seats {
            if slot.as_deref() == Some(player) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn seat_of(&self, player: &str) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|s| s.as_deref() == Some(player))
            .map(|i| i as SeatIndex)
    }

    pub fn player_at(&self, seat: SeatIndex) -> Option<&PlayerId> {
        self.seats.get(seat as usize).and_then(|s| s.as_ref())
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_round_trip() {
        let mut seats = SeatTable::with_capacity(2);
        assert!(seats.add(0, "p1".to_string()));
        assert!(!seats.add(0, "p2".to_string()));
        assert_eq!(seats.seat_of("p1"), Some(0));
        assert!(seats.remove("p1"));
        assert_eq!(seats.seat_of("p1"), None);
    }
}
