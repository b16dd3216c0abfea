//! Card representation.
//!
//! - `Card`: a single playing card, rank 2-14 and suit 0-3
//! - `HoleCards`: a player's two private cards
//! - `Board`: up to five community cards, stored inline so hand states stay `Copy`
//! - `Deck`: a shuffled 52-card deck with a dealing cursor

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rank of a card (2-14: deuce to ace).
pub const RANK_2: u8 = 2;
pub const RANK_3: u8 = 3;
pub const RANK_4: u8 = 4;
pub const RANK_5: u8 = 5;
pub const RANK_6: u8 = 6;
pub const RANK_7: u8 = 7;
pub const RANK_8: u8 = 8;
pub const RANK_9: u8 = 9;
pub const RANK_T: u8 = 10;
pub const RANK_J: u8 = 11;
pub const RANK_Q: u8 = 12;
pub const RANK_K: u8 = 13;
pub const RANK_A: u8 = 14;

/// Suit of a card (0-3).
pub const SUIT_CLUBS: u8 = 0;
pub const SUIT_DIAMONDS: u8 = 1;
pub const SUIT_HEARTS: u8 = 2;
pub const SUIT_SPADES: u8 = 3;

/// Rank characters for display, indexed by `rank - 2`.
const RANK_CHARS: [char; 13] = ['2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A'];

/// Suit characters for display.
const SUIT_CHARS: [char; 4] = ['c', 'd', 'h', 's'];

/// A single playing card.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    /// Card id 0-51: (rank - 2) * 4 + suit
    id: u8,
}

impl Card {
    /// Create a card from rank (2-14) and suit (0-3).
    #[inline]
    pub fn new(rank: u8, suit: u8) -> Self {
        debug_assert!((RANK_2..=RANK_A).contains(&rank), "rank must be 2-14");
        debug_assert!(suit < 4, "suit must be 0-3");
        Self { id: (rank - RANK_2) * 4 + suit }
    }

    /// Create a card from its id (0-51).
    #[inline]
    pub fn from_id(id: u8) -> Self {
        debug_assert!(id < 52, "card id must be 0-51");
        Self { id }
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Rank 2-14.
    #[inline]
    pub fn rank(&self) -> u8 {
        self.id / 4 + RANK_2
    }

    #[inline]
    pub fn suit(&self) -> u8 {
        self.id % 4
    }

    pub fn rank_char(&self) -> char {
        RANK_CHARS[(self.rank() - RANK_2) as usize]
    }

    pub fn suit_char(&self) -> char {
        SUIT_CHARS[self.suit() as usize]
    }

    /// Rank character for a rank value, `'?'` when out of range.
    pub fn rank_to_char(rank: u8) -> char {
        rank.checked_sub(RANK_2)
            .and_then(|i| RANK_CHARS.get(i as usize))
            .copied()
            .unwrap_or('?')
    }
}

impl FromStr for Card {
    type Err = String;

    /// Parse "As", "Kh", "2c", "Td".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() != 2 {
            return Err(format!("invalid card '{}'", s));
        }
        let rank = RANK_CHARS
            .iter()
            .position(|&c| c == chars[0].to_ascii_uppercase())
            .ok_or_else(|| format!("invalid rank in '{}'", s))?;
        let suit = SUIT_CHARS
            .iter()
            .position(|&c| c == chars[1].to_ascii_lowercase())
            .ok_or_else(|| format!("invalid suit in '{}'", s))?;
        Ok(Self::new(rank as u8 + RANK_2, suit as u8))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_char(), self.suit_char())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Parse a run of cards like "AhKsQd" or "Ah Ks Qd".
pub fn parse_cards(s: &str) -> Result<Vec<Card>, String> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(format!("odd number of characters in '{}'", s));
    }
    compact
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            text.parse()
        })
        .collect()
}

/// A player's two hole cards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoleCards {
    /// First card (higher rank by convention).
    pub card1: Card,
    /// Second card.
    pub card2: Card,
}

impl HoleCards {
    /// Create hole cards, ordering by rank (higher first).
    pub fn new(card1: Card, card2: Card) -> Self {
        if card1.rank() >= card2.rank() {
            Self { card1, card2 }
        } else {
            Self {
                card1: card2,
                card2: card1,
            }
        }
    }

    pub fn is_suited(&self) -> bool {
        self.card1.suit() == self.card2.suit()
    }

    pub fn is_pair(&self) -> bool {
        self.card1.rank() == self.card2.rank()
    }

    pub fn cards(&self) -> [Card; 2] {
        [self.card1, self.card2]
    }

    pub fn contains(&self, card: Card) -> bool {
        self.card1 == card || self.card2 == card
    }
}

impl FromStr for HoleCards {
    type Err = String;

    /// Parse "AhKs" or "Ah Ks".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cards = parse_cards(s)?;
        match cards.as_slice() {
            [a, b] if a != b => Ok(Self::new(*a, *b)),
            _ => Err(format!("expected two distinct cards in '{}'", s)),
        }
    }
}

impl fmt::Display for HoleCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.card1, self.card2)
    }
}

impl fmt::Debug for HoleCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Community cards on the board (0-5), stored inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cards: [Card; 5],
    len: u8,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self {
            cards: [Card::from_id(0); 5],
            len: 0,
        }
    }

    /// Create a board from up to five cards.
    pub fn from_cards(cards: &[Card]) -> Self {
        debug_assert!(cards.len() <= 5);
        let mut board = Self::new();
        for &card in cards.iter().take(5) {
            board.add(card);
        }
        board
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_complete(&self) -> bool {
        self.len == 5
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards[..self.len as usize]
    }

    /// Add a card to the board.
    pub fn add(&mut self, card: Card) {
        debug_assert!(self.len < 5);
        self.cards[self.len as usize] = card;
        self.len += 1;
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards().contains(&card)
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cards = parse_cards(s)?;
        if cards.len() > 5 {
            return Err(format!("board has {} cards", cards.len()));
        }
        Ok(Self::from_cards(&cards))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for card in self.cards() {
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}

/// Betting round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    /// All streets in order.
    pub const ALL: [Street; 5] = [
        Street::Preflop,
        Street::Flop,
        Street::Turn,
        Street::River,
        Street::Showdown,
    ];

    /// Get the next street.
    pub fn next(&self) -> Option<Street> {
        match self {
            Street::Preflop => Some(Street::Flop),
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => Some(Street::Showdown),
            Street::Showdown => None,
        }
    }

    /// Street index (0-4), as stored in infoset keys.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Board size once this street has been dealt.
    pub fn num_board_cards(&self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River | Street::Showdown => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Street::Preflop => "PREFLOP",
            Street::Flop => "FLOP",
            Street::Turn => "TURN",
            Street::River => "RIVER",
            Street::Showdown => "SHOWDOWN",
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A deck of 52 playing cards.
///
/// `Copy`: the remaining deck is part of the hand state that the solver
/// copies before exploring each action.
#[derive(Clone, Copy)]
pub struct Deck {
    /// All cards in current order.
    cards: [Card; 52],
    /// Index of next card to deal.
    index: u8,
    /// Number of usable cards (52 minus dead cards).
    size: u8,
    /// Bitmask of dealt or dead cards.
    dealt_mask: u64,
}

impl Deck {
    /// Create a new deck in id order.
    pub fn new() -> Self {
        let mut cards = [Card::from_id(0); 52];
        for (i, card) in cards.iter_mut().enumerate() {
            *card = Card::from_id(i as u8);
        }
        Self {
            cards,
            index: 0,
            size: 52,
            dealt_mask: 0,
        }
    }

    /// Create a deck with specific cards removed.
    pub fn without(dead_cards: &[Card]) -> Self {
        let mut deck = Self::new();
        let mut write_idx = 0;
        for id in 0..52u8 {
            let card = Card::from_id(id);
            if dead_cards.contains(&card) {
                deck.dealt_mask |= 1u64 << id;
            } else {
                deck.cards[write_idx] = card;
                write_idx += 1;
            }
        }
        deck.size = write_idx as u8;
        deck
    }

    /// Create a deck whose first cards are `top` (in order), followed by every
    /// other card not in `dead`, shuffled.
    pub fn stacked<R: Rng + ?Sized>(top: &[Card], dead: &[Card], rng: &mut R) -> Self {
        let mut excluded = dead.to_vec();
        excluded.extend_from_slice(top);
        let mut rest = Self::without(&excluded);
        rest.shuffle(rng);

        let mut deck = rest;
        let n = top.len();
        let rest_len = rest.remaining();
        deck.cards[..n].copy_from_slice(top);
        deck.cards[n..n + rest_len].copy_from_slice(rest.remaining_cards());
        deck.size = (n + rest_len) as u8;
        deck.dealt_mask = dead.iter().fold(0u64, |m, c| m | (1u64 << c.id()));
        deck
    }

    /// Shuffle the undealt cards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards[self.index as usize..self.size as usize].shuffle(rng);
    }

    /// Deal the next card from the deck.
    pub fn deal(&mut self) -> Option<Card> {
        if self.index >= self.size {
            return None;
        }
        let card = self.cards[self.index as usize];
        self.index += 1;
        self.dealt_mask |= 1u64 << card.id();
        Some(card)
    }

    /// Number of cards left to deal.
    pub fn remaining(&self) -> usize {
        (self.size - self.index) as usize
    }

    /// True if the card was dealt or removed.
    pub fn is_dealt(&self, card: Card) -> bool {
        self.dealt_mask & (1u64 << card.id()) != 0
    }

    pub fn remaining_cards(&self) -> &[Card] {
        &self.cards[self.index as usize..self.size as usize]
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deck({} remaining)", self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_card_id_round_trip() {
        for id in 0..52u8 {
            let card = Card::from_id(id);
            assert_eq!(Card::new(card.rank(), card.suit()), card);
            assert_eq!(card.to_string().parse::<Card>().unwrap(), card);
        }
        let ace_spades = Card::new(RANK_A, SUIT_SPADES);
        assert_eq!(ace_spades.id(), 51);
        assert_eq!(ace_spades.to_string(), "As");
        assert_eq!(Card::new(RANK_2, SUIT_CLUBS).id(), 0);
    }

    #[test]
    fn test_card_parsing() {
        assert_eq!("Kh".parse::<Card>().unwrap().rank(), RANK_K);
        assert_eq!("td".parse::<Card>().unwrap().to_string(), "Td");
        assert!("XX".parse::<Card>().is_err());
        assert!("A".parse::<Card>().is_err());
    }

    #[test]
    fn test_hole_cards() {
        let hc: HoleCards = "KsAh".parse().unwrap();
        assert_eq!(hc.card1.rank(), RANK_A);
        assert_eq!(hc.card2.rank(), RANK_K);
        assert!(!hc.is_suited());
        assert!(!hc.is_pair());
        assert!("AsKs".parse::<HoleCards>().unwrap().is_suited());
        assert!("AhAs".parse::<HoleCards>().unwrap().is_pair());
        assert!("AhAh".parse::<HoleCards>().is_err());
    }

    #[test]
    fn test_board() {
        let mut board: Board = "AhKsQd".parse().unwrap();
        assert_eq!(board.len(), 3);
        board.add("Jc".parse().unwrap());
        board.add("Tc".parse().unwrap());
        assert!(board.is_complete());
        assert_eq!(board.to_string(), "AhKsQdJcTc");
        assert!("AhKsQdJcTc9c".parse::<Board>().is_err());
    }

    #[test]
    fn test_deck_deals_every_card_once() {
        let mut deck = Deck::new();
        deck.shuffle(&mut StdRng::seed_from_u64(9));
        let mut seen = 0u64;
        while let Some(card) = deck.deal() {
            assert_eq!(seen & (1 << card.id()), 0);
            seen |= 1 << card.id();
        }
        assert_eq!(seen.count_ones(), 52);
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_deck_without() {
        let dead = parse_cards("As Ah").unwrap();
        let mut deck = Deck::without(&dead);
        assert_eq!(deck.remaining(), 50);
        assert!(deck.is_dealt(dead[0]));
        while let Some(card) = deck.deal() {
            assert!(!dead.contains(&card));
        }
    }

    #[test]
    fn test_deck_stacked() {
        let top = parse_cards("Qs Jc 7d").unwrap();
        let dead = parse_cards("Ah Ad").unwrap();
        let mut deck = Deck::stacked(&top, &dead, &mut StdRng::seed_from_u64(1));
        assert_eq!(deck.remaining(), 50);
        for &card in &top {
            assert_eq!(deck.deal(), Some(card));
        }
        while let Some(card) = deck.deal() {
            assert!(!dead.contains(&card) && !top.contains(&card));
        }
    }

    #[test]
    fn test_street_progression() {
        assert_eq!(Street::Preflop.next(), Some(Street::Flop));
        assert_eq!(Street::River.next(), Some(Street::Showdown));
        assert_eq!(Street::Showdown.next(), None);
        assert_eq!(Street::from_index(3), Some(Street::River));
    }
}
