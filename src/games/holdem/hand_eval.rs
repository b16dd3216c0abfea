//! Poker hand evaluation.
//!
//! Ranks the best five-card hand out of 5-7 cards directly from rank and suit
//! counts, without enumerating the 21 five-card subsets.

use super::card::{Board, Card, HoleCards};
use std::cmp::Ordering;
use std::fmt;

/// Hand rank categories, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandCategory {
    /// Get the category name.
    pub fn name(&self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

/// A comparable hand rank. Higher values are better hands.
///
/// Format: category (4 bits) | kicker1 (4 bits) | ... | kicker5 (4 bits),
/// kickers being ranks 2-14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandRank(u32);

impl HandRank {
    fn new(category: HandCategory, kickers: &[u8]) -> Self {
        let mut value = (category as u32) << 20;
        for (i, &k) in kickers.iter().take(5).enumerate() {
            value |= (k as u32) << (16 - i * 4);
        }
        Self(value)
    }

    /// Raw rank value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Rank of the first kicker: the pair, trips or quads rank, or the top
    /// card of a straight or high-card hand.
    pub fn primary_rank(&self) -> u8 {
        ((self.0 >> 16) & 0xF) as u8
    }

    pub fn category(&self) -> HandCategory {
        match self.0 >> 20 {
            1 => HandCategory::OnePair,
            2 => HandCategory::TwoPair,
            3 => HandCategory::ThreeOfAKind,
            4 => HandCategory::Straight,
            5 => HandCategory::Flush,
            6 => HandCategory::FullHouse,
            7 => HandCategory::FourOfAKind,
            8 => HandCategory::StraightFlush,
            _ => HandCategory::HighCard,
        }
    }
}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.category().name(),
            Card::rank_to_char(self.primary_rank())
        )
    }
}

/// Bitmask with bit `rank` set for each rank present (bits 2-14).
pub fn rank_mask(cards: &[Card]) -> u16 {
    cards.iter().fold(0u16, |bits, c| bits | (1 << c.rank()))
}

/// Highest straight in a rank mask, as the rank of its top card.
///
/// The ace also plays low, so A-2-3-4-5 returns 5.
pub fn find_straight(rank_bits: u16) -> Option<u8> {
    let bits = rank_bits | ((rank_bits >> 14) & 1) << 1;
    (5..=14u8)
        .rev()
        .find(|&high| {
            let mask = 0b11111u16 << (high - 4);
            bits & mask == mask
        })
}

/// Evaluate the best five-card hand among 5-7 cards.
///
/// Fewer than five cards still produce a rank (pairs, trips and high cards),
/// which is what the board-texture logic compares against.
pub fn evaluate(cards: &[Card]) -> HandRank {
    debug_assert!(cards.len() <= 7);

    let mut rank_counts = [0u8; 15];
    let mut suit_counts = [0u8; 4];
    let mut suit_bits = [0u16; 4];
    for card in cards {
        rank_counts[card.rank() as usize] += 1;
        suit_counts[card.suit() as usize] += 1;
        suit_bits[card.suit() as usize] |= 1 << card.rank();
    }

    let flush_suit = suit_counts.iter().position(|&c| c >= 5);

    if let Some(suit) = flush_suit {
        if let Some(high) = find_straight(suit_bits[suit]) {
            return HandRank::new(HandCategory::StraightFlush, &[high]);
        }
    }

    // Ranks grouped by multiplicity, highest first
    let mut quads = [0u8; 1];
    let mut trips = [0u8; 2];
    let mut pairs = [0u8; 3];
    let mut singles = [0u8; 7];
    let (mut nq, mut nt, mut np, mut ns) = (0, 0, 0, 0);
    for rank in (2..=14u8).rev() {
        match rank_counts[rank as usize] {
            4 if nq < 1 => {
                quads[nq] = rank;
                nq += 1;
            }
            3 if nt < 2 => {
                trips[nt] = rank;
                nt += 1;
            }
            2 if np < 3 => {
                pairs[np] = rank;
                np += 1;
            }
            1 => {
                singles[ns] = rank;
                ns += 1;
            }
            _ => {}
        }
    }

    if nq > 0 {
        let kicker = (2..=14u8)
            .rev()
            .find(|&r| r != quads[0] && rank_counts[r as usize] > 0)
            .unwrap_or(0);
        return HandRank::new(HandCategory::FourOfAKind, &[quads[0], kicker]);
    }

    if nt > 0 && (np > 0 || nt > 1) {
        let pair_rank = if nt > 1 { trips[1].max(pairs[0]) } else { pairs[0] };
        return HandRank::new(HandCategory::FullHouse, &[trips[0], pair_rank]);
    }

    if let Some(suit) = flush_suit {
        let mut flush_ranks = [0u8; 5];
        let mut n = 0;
        for rank in (2..=14u8).rev() {
            if n < 5 && suit_bits[suit] & (1 << rank) != 0 {
                flush_ranks[n] = rank;
                n += 1;
            }
        }
        return HandRank::new(HandCategory::Flush, &flush_ranks);
    }

    if let Some(high) = find_straight(rank_mask(cards)) {
        return HandRank::new(HandCategory::Straight, &[high]);
    }

    if nt > 0 {
        let mut kickers = [0u8; 2];
        let mut k = 0;
        for rank in (2..=14u8).rev() {
            if k < 2 && rank != trips[0] && rank_counts[rank as usize] > 0 {
                kickers[k] = rank;
                k += 1;
            }
        }
        return HandRank::new(HandCategory::ThreeOfAKind, &[trips[0], kickers[0], kickers[1]]);
    }

    if np >= 2 {
        let kicker = (2..=14u8)
            .rev()
            .find(|&r| r != pairs[0] && r != pairs[1] && rank_counts[r as usize] > 0)
            .unwrap_or(0);
        return HandRank::new(HandCategory::TwoPair, &[pairs[0], pairs[1], kicker]);
    }

    if np == 1 {
        return HandRank::new(
            HandCategory::OnePair,
            &[pairs[0], singles[0], singles[1], singles[2]],
        );
    }

    HandRank::new(HandCategory::HighCard, &singles[..ns.min(5)])
}

/// Evaluate hole cards together with the board.
pub fn evaluate_hand(hole: &HoleCards, board: &Board) -> HandRank {
    let mut cards = [hole.card1; 7];
    cards[1] = hole.card2;
    let n = 2 + board.len();
    cards[2..n].copy_from_slice(board.cards());
    evaluate(&cards[..n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::holdem::card::parse_cards;

    fn rank_of(s: &str) -> HandRank {
        evaluate(&parse_cards(s).unwrap())
    }

    #[test]
    fn test_categories() {
        assert_eq!(rank_of("As Kd Qh Jc 9s").category(), HandCategory::HighCard);
        assert_eq!(rank_of("As Ad Kh Qc Js").category(), HandCategory::OnePair);
        assert_eq!(rank_of("As Ad Kh Kc Js").category(), HandCategory::TwoPair);
        assert_eq!(rank_of("As Ad Ah Kc Js").category(), HandCategory::ThreeOfAKind);
        assert_eq!(rank_of("Ts 9d 8h 7c 6s").category(), HandCategory::Straight);
        assert_eq!(rank_of("As Ks 9s 7s 2s").category(), HandCategory::Flush);
        assert_eq!(rank_of("As Ad Ah Kc Kd").category(), HandCategory::FullHouse);
        assert_eq!(rank_of("As Ad Ah Ac Ks").category(), HandCategory::FourOfAKind);
        assert_eq!(rank_of("9s 8s 7s 6s 5s").category(), HandCategory::StraightFlush);
    }

    #[test]
    fn test_wheel_is_lowest_straight() {
        let wheel = rank_of("5s 4d 3h 2c As");
        let six_high = rank_of("6s 5d 4h 3c 2s");
        assert_eq!(wheel.category(), HandCategory::Straight);
        assert!(six_high > wheel);
        assert_eq!(find_straight(rank_mask(&parse_cards("5s4d3h2cAs").unwrap())), Some(5));
    }

    #[test]
    fn test_seven_card_best_hand() {
        assert_eq!(rank_of("Ah As Ad Ac Kh Qs Jd").category(), HandCategory::FourOfAKind);
        // Flush beats the straight that is also present
        assert_eq!(rank_of("2h 3h 4h 5d 6c 9h Kh").category(), HandCategory::Flush);
        // Straight flush hidden among seven cards
        assert_eq!(rank_of("2h 3h 4h 5h 6h Ad Ac").category(), HandCategory::StraightFlush);
        // Two trips make a full house with the higher trips on top
        let boat = rank_of("Kh Kd Kc 7s 7d 7h 2c");
        assert_eq!(boat.category(), HandCategory::FullHouse);
        assert!(boat > rank_of("Qh Qd Qc As Ad 7h 2c"));
    }

    #[test]
    fn test_kickers_break_ties() {
        let ak = rank_of("As Kd 9h 7c 2s 3d 4c");
        let aq = rank_of("Ah Qd 9s 7d 2h 3c 4s");
        assert!(ak > aq);
        // Third pair never plays as a kicker above a higher single
        let two_pair = rank_of("As Ad Ks Kd 3c 3h Qs");
        assert_eq!(two_pair, rank_of("Ac Ah Kc Kh Qd 5s 4s"));
    }

    #[test]
    fn test_hand_comparison() {
        let aa: HoleCards = "AhAd".parse().unwrap();
        let kk: HoleCards = "KhKd".parse().unwrap();
        let board: Board = "Qs Jc 7d 3s 2h".parse().unwrap();
        assert!(evaluate_hand(&aa, &board) > evaluate_hand(&kk, &board));
    }

    #[test]
    fn test_partial_boards() {
        let hole: HoleCards = "AhKh".parse().unwrap();
        let flop: Board = "Ad 7c 2s".parse().unwrap();
        assert_eq!(evaluate_hand(&hole, &flop).category(), HandCategory::OnePair);
        assert_eq!(evaluate(&parse_cards("7c 7s").unwrap()).category(), HandCategory::OnePair);
        assert_eq!(evaluate(&[]).category(), HandCategory::HighCard);
    }
}
