//! Card and sizing abstraction for information sets.
//!
//! - 169 canonical starting hands on a 13x13 grid (pairs on the diagonal,
//!   suited above it, offsuit below it, rows and columns ordered A to 2)
//! - 18 board textures: suit texture x paired x high-card class
//! - quasi-log buckets for pot size, to-call ratio and stack-to-pot ratio
//! - 12 hero-versus-board classes separating air, draws, pairs and made hands

use super::card::{Board, Card, HoleCards};
use super::hand_eval::{evaluate, evaluate_hand, find_straight, rank_mask, HandCategory};

/// Number of canonical starting hands.
pub const NUM_HANDS: usize = 169;

/// Number of board texture buckets.
pub const NUM_TEXTURES: usize = 18;

/// Pot edges in big blinds.
pub const POT_EDGES: [f64; 25] = [
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 16.0, 20.0, 24.0, 32.0, 40.0, 48.0, 64.0,
    80.0, 96.0, 128.0, 160.0, 192.0, 256.0, 320.0, f64::INFINITY,
];

/// To-call / pot edges.
pub const RATIO_EDGES: [f64; 8] = [0.0, 0.05, 0.125, 0.25, 0.5, 1.0, 2.0, f64::INFINITY];

/// Effective stack / pot edges.
pub const SPR_EDGES: [f64; 8] = [0.0, 0.75, 1.25, 2.0, 3.5, 6.0, 10.0, f64::INFINITY];

/// Grid position of a rank: ace is 0, deuce is 12.
#[inline]
fn grid_pos(rank: u8) -> usize {
    (14 - rank) as usize
}

/// Rank on a grid position.
#[inline]
fn grid_rank(pos: usize) -> u8 {
    14 - pos as u8
}

/// Index of the hole cards in the 169-hand grid.
pub fn hand_index(hole: &HoleCards) -> u8 {
    let i = grid_pos(hole.card1.rank());
    let j = grid_pos(hole.card2.rank());
    let (hi, lo) = (i.min(j), i.max(j));
    let idx = if hi == lo {
        hi * 13 + hi
    } else if hole.is_suited() {
        hi * 13 + lo
    } else {
        lo * 13 + hi
    };
    idx as u8
}

/// Label such as "AA", "AKs" or "T9o" for a grid index.
pub fn hand_label(index: u8) -> String {
    let idx = index as usize % NUM_HANDS;
    let (row, col) = (idx / 13, idx % 13);
    let (r1, r2) = (grid_rank(row.min(col)), grid_rank(row.max(col)));
    let (c1, c2) = (Card::rank_to_char(r1), Card::rank_to_char(r2));
    match row.cmp(&col) {
        std::cmp::Ordering::Equal => format!("{}{}", c1, c2),
        std::cmp::Ordering::Less => format!("{}{}s", c1, c2),
        std::cmp::Ordering::Greater => format!("{}{}o", c1, c2),
    }
}

/// Grid index for a label, the inverse of [`hand_label`].
pub fn label_index(label: &str) -> Option<u8> {
    (0..NUM_HANDS as u8).find(|&i| hand_label(i) == label)
}

/// Board texture bucket (0-17), 0 preflop.
///
/// `suit_texture * 6 + paired * 3 + high_class` where suit texture is
/// rainbow / two-tone / monotone and the high class is 9-or-lower / T-J / Q+.
pub fn board_texture(board: &Board) -> u8 {
    let cards = board.cards();
    let n = cards.len();
    if n == 0 {
        return 0;
    }

    let mut suit_counts = [0u8; 4];
    let mut rank_counts = [0u8; 15];
    for card in cards {
        suit_counts[card.suit() as usize] += 1;
        rank_counts[card.rank() as usize] += 1;
    }
    let max_suit = suit_counts.iter().copied().max().unwrap_or(0) as usize;

    let monotone = match n {
        3 => max_suit == 3,
        4 => max_suit >= 4,
        _ => max_suit >= 5,
    };
    let suit_texture = if monotone {
        2
    } else if n >= 3 && max_suit == n - 1 {
        1
    } else {
        0
    };
    let paired = u8::from(rank_counts.iter().any(|&c| c >= 2));
    let high = cards.iter().map(|c| c.rank()).max().unwrap_or(0);
    let high_class = if high >= 12 {
        2
    } else if high >= 10 {
        1
    } else {
        0
    };

    suit_texture * 6 + paired * 3 + high_class
}

/// Short name like "TT_PR_HI" for a texture bucket.
pub fn texture_name(texture: u8) -> String {
    let suit = ["RB", "TT", "MONO"][(texture as usize / 6).min(2)];
    let paired = if (texture / 3) % 2 == 1 { "PR" } else { "NP" };
    let high = ["LO", "MID", "HI"][texture as usize % 3];
    format!("{}_{}_{}", suit, paired, high)
}

/// Largest `i` with `x > edges[i]`, clamped to the last bucket.
pub fn bucket(x: f64, edges: &[f64]) -> u8 {
    let above = edges.partition_point(|&e| x > e);
    above.saturating_sub(1).min(edges.len() - 2) as u8
}

/// Pot bucket (0-23).
pub fn pot_bucket(pot_bb: f64) -> u8 {
    bucket(pot_bb.max(0.0), &POT_EDGES)
}

/// To-call over pot bucket (0-6).
pub fn ratio_bucket(to_call_bb: f64, pot_bb: f64) -> u8 {
    bucket(to_call_bb.max(0.0) / pot_bb.max(1.0), &RATIO_EDGES)
}

/// Effective stack over pot bucket (0-6).
pub fn spr_bucket(effective_stack_bb: f64, pot_bb: f64) -> u8 {
    bucket(effective_stack_bb.max(0.0) / pot_bb.max(1.0), &SPR_EDGES)
}

/// How the hero's hand relates to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeroBoardClass {
    Air = 0,
    Gutshot = 1,
    FlushDraw = 2,
    OpenEnded = 3,
    ComboDraw = 4,
    /// Pair below the second board card, including underpairs.
    WeakPair = 5,
    MiddlePair = 6,
    TopPair = 7,
    Overpair = 8,
    PairPlusDraw = 9,
    /// Two pair or trips.
    TwoPairPlus = 10,
    /// Straight or better.
    Monster = 11,
}

impl HeroBoardClass {
    /// All classes in id order.
    pub const ALL: [HeroBoardClass; 12] = [
        HeroBoardClass::Air,
        HeroBoardClass::Gutshot,
        HeroBoardClass::FlushDraw,
        HeroBoardClass::OpenEnded,
        HeroBoardClass::ComboDraw,
        HeroBoardClass::WeakPair,
        HeroBoardClass::MiddlePair,
        HeroBoardClass::TopPair,
        HeroBoardClass::Overpair,
        HeroBoardClass::PairPlusDraw,
        HeroBoardClass::TwoPairPlus,
        HeroBoardClass::Monster,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            HeroBoardClass::Air => "air",
            HeroBoardClass::Gutshot => "gutshot",
            HeroBoardClass::FlushDraw => "flush-draw",
            HeroBoardClass::OpenEnded => "open-ended",
            HeroBoardClass::ComboDraw => "combo-draw",
            HeroBoardClass::WeakPair => "weak-pair",
            HeroBoardClass::MiddlePair => "middle-pair",
            HeroBoardClass::TopPair => "top-pair",
            HeroBoardClass::Overpair => "overpair",
            HeroBoardClass::PairPlusDraw => "pair+draw",
            HeroBoardClass::TwoPairPlus => "two-pair+",
            HeroBoardClass::Monster => "monster",
        }
    }

    /// Pair or better that uses the hero's cards.
    pub fn is_made(self) -> bool {
        self >= HeroBoardClass::WeakPair
    }
}

/// Ranks that would complete a straight which is not already made.
fn straight_outs(mask: u16) -> u32 {
    if find_straight(mask).is_some() {
        return 0;
    }
    (2..=14u8)
        .filter(|&r| mask & (1 << r) == 0)
        .filter(|&r| find_straight(mask | (1 << r)).is_some())
        .count() as u32
}

/// Suit with four cards among `cards`, if any.
fn four_flush_suit(cards: &[Card]) -> Option<u8> {
    let mut counts = [0u8; 4];
    for card in cards {
        counts[card.suit() as usize] += 1;
    }
    counts.iter().position(|&c| c == 4).map(|s| s as u8)
}

/// Classify the hero's holding against the board.
///
/// Made hands count only when they beat what the board shows by itself, and
/// draws only count before the river and when a hole card takes part.
pub fn hero_board_class(hole: &HoleCards, board: &Board) -> HeroBoardClass {
    if board.is_empty() {
        return HeroBoardClass::Air;
    }

    let hero = evaluate_hand(hole, board);
    let board_only = evaluate(board.cards());
    let improved = hero.category() > board_only.category();

    let mut all = board.cards().to_vec();
    all.extend_from_slice(&hole.cards());

    let (flush_draw, straight_draw) = if board.len() < 5 && hero.category() < HandCategory::Straight
    {
        let flush_draw = match four_flush_suit(&all) {
            Some(suit) => {
                hole.cards().iter().any(|c| c.suit() == suit)
                    && four_flush_suit(board.cards()).is_none()
            }
            None => false,
        };
        let outs = straight_outs(rank_mask(&all));
        let board_outs = straight_outs(rank_mask(board.cards()));
        let straight_draw = if outs > board_outs { outs } else { 0 };
        (flush_draw, straight_draw)
    } else {
        (false, 0)
    };
    let has_draw = flush_draw || straight_draw > 0;

    if improved {
        return match hero.category() {
            HandCategory::OnePair if has_draw => HeroBoardClass::PairPlusDraw,
            HandCategory::OnePair => pair_class(hole, board, hero.primary_rank()),
            HandCategory::TwoPair | HandCategory::ThreeOfAKind => HeroBoardClass::TwoPairPlus,
            HandCategory::HighCard => HeroBoardClass::Air,
            _ => HeroBoardClass::Monster,
        };
    }

    match (flush_draw, straight_draw) {
        (true, s) if s > 0 => HeroBoardClass::ComboDraw,
        (true, _) => HeroBoardClass::FlushDraw,
        (false, s) if s >= 2 => HeroBoardClass::OpenEnded,
        (false, 1) => HeroBoardClass::Gutshot,
        _ => HeroBoardClass::Air,
    }
}

fn pair_class(hole: &HoleCards, board: &Board, pair_rank: u8) -> HeroBoardClass {
    let mut board_ranks: Vec<u8> = board.cards().iter().map(|c| c.rank()).collect();
    board_ranks.sort_unstable_by(|a, b| b.cmp(a));
    board_ranks.dedup();
    let top = board_ranks.first().copied().unwrap_or(0);
    let second = board_ranks.get(1).copied().unwrap_or(0);

    if hole.is_pair() && pair_rank > top {
        HeroBoardClass::Overpair
    } else if pair_rank == top {
        HeroBoardClass::TopPair
    } else if pair_rank >= second {
        HeroBoardClass::MiddlePair
    } else {
        HeroBoardClass::WeakPair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole(s: &str) -> HoleCards {
        s.parse().unwrap()
    }

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn test_hand_index_layout() {
        assert_eq!(hand_index(&hole("AsAh")), 0);
        assert_eq!(hand_index(&hole("2s2h")), 168);
        // Suited above the diagonal, offsuit below
        assert_eq!(hand_index(&hole("AsKs")), 1);
        assert_eq!(hand_index(&hole("AsKh")), 13);
        assert_eq!(hand_index(&hole("Ks2s")), 13 + 12);
        assert_eq!(hand_label(1), "AKs");
        assert_eq!(hand_label(13), "AKo");
        assert_eq!(hand_label(14), "KK");
    }

    #[test]
    fn test_all_169_labels_distinct() {
        let mut labels: Vec<String> = (0..169u8).map(hand_label).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 169);
        for i in 0..169u8 {
            assert_eq!(label_index(&hand_label(i)), Some(i));
        }
    }

    #[test]
    fn test_every_combo_maps_to_its_label() {
        for a in 0..52u8 {
            for b in (a + 1)..52u8 {
                let h = HoleCards::new(Card::from_id(a), Card::from_id(b));
                let label = hand_label(hand_index(&h));
                let hi = Card::rank_to_char(h.card1.rank());
                let lo = Card::rank_to_char(h.card2.rank());
                assert!(label.starts_with(&format!("{}{}", hi, lo)), "{} -> {}", h, label);
                if !h.is_pair() {
                    assert_eq!(label.ends_with('s'), h.is_suited());
                }
            }
        }
    }

    #[test]
    fn test_board_texture() {
        assert_eq!(board_texture(&Board::new()), 0);
        // Rainbow, unpaired, 9 high
        assert_eq!(board_texture(&board("9c 5d 2h")), 0);
        // Two-tone, paired, ace high: 1*6 + 1*3 + 2
        assert_eq!(board_texture(&board("As Ah 7s")), 11);
        // Monotone flop, T high
        assert_eq!(board_texture(&board("Th 6h 2h")), 13);
        // Four of a suit on the turn is monotone
        assert_eq!(board_texture(&board("Kh 9h 5h 2h")), 14);
        // Four of a suit on the river is only two-tone
        assert_eq!(board_texture(&board("Kh 9h 5h 2h 3c")), 8);
        assert_eq!(texture_name(11), "TT_PR_HI");
    }

    #[test]
    fn test_buckets() {
        assert_eq!(pot_bucket(0.0), 0);
        assert_eq!(pot_bucket(1.0), 0);
        assert_eq!(pot_bucket(1.5), 1);
        assert_eq!(pot_bucket(7.0), 6);
        assert_eq!(pot_bucket(10_000.0), 23);
        // Ratio and SPR use max(1, pot) as denominator
        assert_eq!(ratio_bucket(0.5, 0.5), 3);
        assert_eq!(ratio_bucket(3.0, 1.5), 5);
        assert_eq!(spr_bucket(99.0, 1.5), 6);
        assert_eq!(spr_bucket(1.0, 1.0), 1);
    }

    #[test]
    fn test_hero_board_classes() {
        use HeroBoardClass::*;
        let cases = [
            ("AhKd", "", Air),
            ("AhKd", "7c 4s 2d", Air),
            ("Ah4d", "7c 5s 6d", OpenEnded),
            ("9h8d", "Jc 7s 2d", Gutshot),
            ("AhKh", "9h 5h 2c", FlushDraw),
            ("9h8h", "Th 7c 2h", ComboDraw),
            ("AhKd", "Ac 7s 2d", TopPair),
            ("8h9d", "Kc 9s 2d", MiddlePair),
            ("Ah2d", "Kc 9s 2c", WeakPair),
            ("QhQd", "Jc 7s 2d", Overpair),
            ("AhTh", "Ac 7h 2h", PairPlusDraw),
            ("AhKd", "Ac Ks 2d", TwoPairPlus),
            ("7h7d", "7c Ks 2d", TwoPairPlus),
            ("9h8d", "Tc 7s 6d", Monster),
        ];
        for (h, b, expected) in cases {
            assert_eq!(hero_board_class(&hole(h), &board(b)), expected, "{} on {}", h, b);
        }
    }

    #[test]
    fn test_board_only_hands_do_not_count() {
        // The pair is on the board, hero plays nothing
        assert_eq!(hero_board_class(&hole("3h4d"), &board("Kc Ks 9d")), HeroBoardClass::Air);
        // Board straight on the river, no draws counted
        assert_eq!(
            hero_board_class(&hole("2h3d"), &board("9c Ts Jd Qh Kc")),
            HeroBoardClass::Air
        );
        // A four-flush on the board is nobody's draw
        assert_eq!(
            hero_board_class(&hole("2c3d"), &board("9h Th 4h Kh")),
            HeroBoardClass::Air
        );
    }
}
