//! Seven-card hand evaluation: every 5-card subset of the 2 hole cards plus
//! the 5 community cards is scored, and the best score wins. Scores are
//! packed into one `u32` (4-bit category, then up to 5 ranks at 4 bits
//! each) so comparing two hands is a single integer comparison.

use super::cards::Card;

fn pack(category: u8, ranks: &[u8]) -> u32 {
    let mut score = (category as u32) << 20;
    for (i, r) in ranks.iter().take(5).enumerate() {
        score |= (*r as u32) << (16 - i * 4);
    }
    score
}

fn evaluate_5(cards: &[Card; 5]) -> u32 {
    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank.0).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let flush = cards.iter().all(|c| c.suit == cards[0].suit);

    let mut unique_desc = ranks.clone();
    unique_desc.dedup();
    let straight_high = straight_high_card(&unique_desc);

    let mut counts: Vec<(u8, u8)> = vec![]; // (rank, count)
    for &r in &ranks {
        if let Some(entry) = counts.iter_mut().find(|(rank, _)| *rank == r) {
            entry.1 += 1;
        } else {
            counts.push((r, 1));
        }
    }
    counts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let ordered_ranks: Vec<u8> = counts.iter().map(|(r, _)| *r).collect();

    if flush {
        if let Some(high) = straight_high {
            return pack(8, &[high]);
        }
    }
    if counts[0].1 == 4 {
        return pack(7, &ordered_ranks);
    }
    if counts[0].1 == 3 && counts.len() > 1 && counts[1].1 >= 2 {
        return pack(6, &ordered_ranks);
    }
    if flush {
        return pack(5, &ranks);
    }
    if let Some(high) = straight_high {
        return pack(4, &[high]);
    }
    if counts[0].1 == 3 {
        return pack(3, &ordered_ranks);
    }
    if counts[0].1 == 2 && counts.len() > 1 && counts[1].1 == 2 {
        return pack(2, &ordered_ranks);
    }
    if counts[0].1 == 2 {
        return pack(1, &ordered_ranks);
    }
    pack(0, &ranks)
}

/// Returns the high card of a straight among these descending, deduped
/// ranks, treating ace (14) as able to play low in a wheel (A-2-3-4-5).
fn straight_high_card(unique_desc: &[u8]) -> Option<u8> {
    if unique_desc.len() < 5 {
        // Special-case the wheel: A,5,4,3,2.
        if unique_desc == [14, 5, 4, 3, 2] {
            return Some(5);
        }
        return None;
    }
    for window in unique_desc.windows(5) {
        if window[0] - window[4] == 4 {
            return Some(window[0]);
        }
    }
    if unique_desc[0] == 14 {
        let mut with_low_ace = unique_desc.to_vec();
        with_low_ace.push(1);
        for window in with_low_ace.windows(5) {
            if window[0] >= window[4] && window[0] - window[4] == 4 {
                return Some(window[0].min(5));
            }
        }
    }
    None
}

fn combinations_5_of_7(cards: &[Card; 7]) -> Vec<[Card; 5]> {
    let mut out = Vec::with_capacity(21);
    for skip_a in 0..7 {
        for skip_b in (skip_a + 1)..7 {
            let mut five = Vec::with_capacity(5);
            for (i, c) in cards.iter().enumerate() {
                if i != skip_a && i != skip_b {
                    five.push(*c);
                }
            }
            out.push([five[0], five[1], five[2], five[3], five[4]]);
        }
    }
    out
}

/// Best 5-card score obtainable from 2 hole cards + 5 community cards.
pub fn best_seven_card_score(hole: [Card; 2], community: &[Card]) -> u32 {
    let mut seven = [hole[0], hole[1], community[0], community[0], community[0], community[0], community[0]];
    for (i, c) in community.iter().take(5).enumerate() {
        seven[2 + i] = *c;
    }
    combinations_5_of_7(&seven)
        .into_iter()
        .map(|five| evaluate_5(&five))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::cards::{Rank, Suit};

    fn card(rank: u8, suit: Suit) -> Card {
        Card { rank: Rank(rank), suit }
    }

    #[test]
    fn flush_beats_straight() {
        let flush_hand = [
            card(2, Suit::Clubs),
            card(5, Suit::Clubs),
            card(9, Suit::Clubs),
            card(11, Suit::Clubs),
            card(13, Suit::Clubs),
        ];
        let straight_hand = [
            card(4, Suit::Clubs),
            card(5, Suit::Diamonds),
            card(6, Suit::Hearts),
            card(7, Suit::Spades),
            card(8, Suit::Clubs),
        ];
        assert!(evaluate_5(&flush_hand) > evaluate_5(&straight_hand));
    }

    #[test]
    fn full_house_beats_flush() {
        let full_house = [
            card(9, Suit::Clubs),
            card(9, Suit::Diamonds),
            card(9, Suit::Hearts),
            card(4, Suit::Spades),
            card(4, Suit::Clubs),
        ];
        let flush_hand = [
            card(2, Suit::Clubs),
            card(5, Suit::Clubs),
            card(9, Suit::Clubs),
            card(11, Suit::Clubs),
            card(13, Suit::Clubs),
        ];
        assert!(evaluate_5(&full_house) > evaluate_5(&flush_hand));
    }

    #[test]
    fn wheel_straight_is_recognized() {
        let wheel = [
            card(14, Suit::Clubs),
            card(2, Suit::Diamonds),
            card(3, Suit::Hearts),
            card(4, Suit::Spades),
            card(5, Suit::Clubs),
        ];
        assert_eq!(straight_high_card(&[14, 5, 4, 3, 2]), Some(5));
        // Category 4 = straight.
        assert_eq!(evaluate_5(&wheel) >> 20, 4);
    }
}
