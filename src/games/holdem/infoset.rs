//! Information set keys.
//!
//! The key is a 64-bit integer built from disjoint bit fields, defined once in
//! [`FIELDS`]:
//!
//! ```text
//!  bit 45..43   42..41  40..33   32..28   27..20  19..12  11..4   3..0
//!  +--------+--------+--------+---------+-------+-------+-------+-------+
//!  | street |  role  | hand169| texture |  pot  | ratio |  spr  | hero  |
//!  +--------+--------+--------+---------+-------+-------+-------+-------+
//! ```
//!
//! Encoding is a pure function of what the acting seat can observe, and
//! [`InfosetFields::decode`] is its exact inverse.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::abstraction::{
    board_texture, hand_index, hand_label, hero_board_class, pot_bucket, ratio_bucket,
    spr_bucket, texture_name, HeroBoardClass,
};
use super::card::Street;
use super::hand_eval::{evaluate, evaluate_hand};
use super::state::{HandState, Seat};
use crate::error::EngineError;

/// One packed field: name, width in bits and shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub width: u32,
    pub shift: u32,
}

impl FieldSpec {
    const fn new(name: &'static str, width: u32, shift: u32) -> Self {
        Self { name, width, shift }
    }

    #[inline]
    pub const fn mask(&self) -> u64 {
        (1u64 << self.width) - 1
    }

    #[inline]
    fn pack(&self, value: u8) -> u64 {
        (value as u64 & self.mask()) << self.shift
    }

    #[inline]
    fn unpack(&self, key: u64) -> u8 {
        ((key >> self.shift) & self.mask()) as u8
    }
}

const HERO_BOARD: FieldSpec = FieldSpec::new("hero_board", 4, 0);
const SPR: FieldSpec = FieldSpec::new("spr", 8, 4);
const RATIO: FieldSpec = FieldSpec::new("ratio", 8, 12);
const POT: FieldSpec = FieldSpec::new("pot", 8, 20);
const BOARD: FieldSpec = FieldSpec::new("board", 5, 28);
const HAND: FieldSpec = FieldSpec::new("hand", 8, 33);
const ROLE: FieldSpec = FieldSpec::new("role", 2, 41);
const STREET: FieldSpec = FieldSpec::new("street", 3, 43);

/// The key layout, lowest bits first.
pub const FIELDS: [FieldSpec; 8] = [HERO_BOARD, SPR, RATIO, POT, BOARD, HAND, ROLE, STREET];

/// Bits used by a key.
pub const KEY_BITS: u32 = STREET.shift + STREET.width;

/// Which abstraction feeds the key fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbstractionMode {
    /// All buckets at full resolution.
    #[default]
    Full,
    /// Two buckets per scalar and no board texture, for quick runs.
    Coarse,
}

/// Unpacked infoset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InfosetFields {
    pub street: u8,
    pub role: u8,
    pub hand: u8,
    pub board: u8,
    pub pot: u8,
    pub ratio: u8,
    pub spr: u8,
    pub hero_board: u8,
}

impl InfosetFields {
    /// Pack into a key.
    pub fn encode(&self) -> u64 {
        STREET.pack(self.street)
            | ROLE.pack(self.role)
            | HAND.pack(self.hand)
            | BOARD.pack(self.board)
            | POT.pack(self.pot)
            | RATIO.pack(self.ratio)
            | SPR.pack(self.spr)
            | HERO_BOARD.pack(self.hero_board)
    }

    /// Unpack a key.
    pub fn decode(key: u64) -> Self {
        Self {
            street: STREET.unpack(key),
            role: ROLE.unpack(key),
            hand: HAND.unpack(key),
            board: BOARD.unpack(key),
            pot: POT.unpack(key),
            ratio: RATIO.unpack(key),
            spr: SPR.unpack(key),
            hero_board: HERO_BOARD.unpack(key),
        }
    }

    pub fn street(&self) -> Option<Street> {
        Street::from_index(self.street as usize)
    }

    pub fn seat(&self) -> Option<Seat> {
        (self.role < 3).then(|| Seat::from_index(self.role as usize))
    }
}

impl fmt::Display for InfosetFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let street = self.street().map(|s| s.name()).unwrap_or("?");
        let seat = self.seat().map(|s| s.name()).unwrap_or("?");
        let hero = HeroBoardClass::from_id(self.hero_board)
            .map(|c| c.name())
            .unwrap_or("?");
        write!(
            f,
            "{} {} {} board={} pot={} ratio={} spr={} hero={}",
            street,
            seat,
            hand_label(self.hand),
            texture_name(self.board),
            self.pot,
            self.ratio,
            self.spr,
            hero
        )
    }
}

/// Readable form of a key.
pub fn describe_key(key: u64) -> String {
    InfosetFields::decode(key).to_string()
}

/// Builds infoset keys from hand states.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfosetEncoder {
    mode: AbstractionMode,
}

impl InfosetEncoder {
    pub fn new(mode: AbstractionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AbstractionMode {
        self.mode
    }

    /// Key fields for `seat` in `state`.
    pub fn fields(&self, state: &HandState, seat: Seat) -> Result<InfosetFields, EngineError> {
        let hero = state.player(seat);
        let hole = hero
            .hole
            .ok_or_else(|| EngineError::MissingHoleCards(state.diagnostics(seat)))?;

        let big_blind = state.config.big_blind;
        let pot_bb = state.pot / big_blind;
        let to_call_bb = state.to_call(seat) / big_blind;
        let effective_bb = effective_stack(state, seat) / big_blind;

        let mut fields = InfosetFields {
            street: state.street.index() as u8,
            role: seat.index() as u8,
            hand: hand_index(&hole),
            ..InfosetFields::default()
        };

        match self.mode {
            AbstractionMode::Full => {
                fields.board = board_texture(&state.board);
                fields.pot = pot_bucket(pot_bb);
                fields.ratio = ratio_bucket(to_call_bb, pot_bb);
                fields.spr = spr_bucket(effective_bb, pot_bb);
                fields.hero_board = hero_board_class(&hole, &state.board).id();
            }
            AbstractionMode::Coarse => {
                let denom = pot_bb.max(1.0);
                fields.board = 0;
                fields.pot = u8::from(pot_bb > 6.0);
                fields.ratio = u8::from(to_call_bb / denom > 0.5);
                fields.spr = u8::from(effective_bb / denom > 3.5);
                fields.hero_board = u8::from(
                    !state.board.is_empty()
                        && evaluate_hand(&hole, &state.board).category()
                            > evaluate(state.board.cards()).category(),
                );
            }
        }
        Ok(fields)
    }

    /// Packed key for `seat` in `state`.
    pub fn key(&self, state: &HandState, seat: Seat) -> Result<u64, EngineError> {
        Ok(self.fields(state, seat)?.encode())
    }
}

/// Smallest of min(hero, opponent) over opponents still in the hand, or the
/// hero's stack when none are.
pub fn effective_stack(state: &HandState, seat: Seat) -> f64 {
    let hero = state.player(seat).stack;
    Seat::ALL
        .into_iter()
        .filter(|s| *s != seat && state.player(*s).in_hand())
        .map(|s| hero.min(state.player(s).stack))
        .reduce(f64::min)
        .unwrap_or(hero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::action::Action;
    use crate::games::holdem::card::{parse_cards, HoleCards};
    use crate::games::holdem::config::TableConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_layout_is_disjoint() {
        let mut used = 0u64;
        for field in FIELDS {
            let bits = field.mask() << field.shift;
            assert_eq!(used & bits, 0, "{} overlaps", field.name);
            used |= bits;
        }
        assert_eq!(KEY_BITS, 46);
        assert_eq!(used, (1u64 << KEY_BITS) - 1);
    }

    #[test]
    fn test_round_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let fields = InfosetFields {
                street: rng.gen_range(0..5),
                role: rng.gen_range(0..3),
                hand: rng.gen_range(0..169),
                board: rng.gen_range(0..18),
                pot: rng.gen_range(0..24),
                ratio: rng.gen_range(0..7),
                spr: rng.gen_range(0..7),
                hero_board: rng.gen_range(0..12),
            };
            assert_eq!(InfosetFields::decode(fields.encode()), fields);
        }
    }

    #[test]
    fn test_button_opening_key() {
        let holes = [None, None, Some("AsAh".parse::<HoleCards>().unwrap())];
        let state = HandState::with_cards(
            TableConfig::default(),
            holes,
            &[],
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();
        let fields = InfosetEncoder::default().fields(&state, Seat::BTN).unwrap();
        assert_eq!(fields.street, 0);
        assert_eq!(fields.role, 2);
        assert_eq!(fields.hand, 0);
        assert_eq!(fields.board, 0);
        // pot 1.5 in (1, 2]; to call 1 / 1.5 in (0.5, 1]; effective 99 / 1.5
        assert_eq!(fields.pot, 1);
        assert_eq!(fields.ratio, 4);
        assert_eq!(fields.spr, 6);
        assert_eq!(fields.hero_board, 0);
        assert_eq!(
            describe_key(fields.encode()),
            "PREFLOP BTN AA board=RB_NP_LO pot=1 ratio=4 spr=6 hero=air"
        );
    }

    #[test]
    fn test_coarse_key() {
        let holes = [None, None, Some("7h2c".parse::<HoleCards>().unwrap())];
        let mut state = HandState::with_cards(
            TableConfig::default(),
            holes,
            &parse_cards("7d Kc 4s").unwrap(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        let coarse = InfosetEncoder::new(AbstractionMode::Coarse);
        let pre = coarse.fields(&state, Seat::BTN).unwrap();
        assert_eq!((pre.pot, pre.ratio, pre.spr, pre.hero_board), (0, 1, 1, 0));

        state.apply_action(Seat::BTN, Action::Call).unwrap();
        state.apply_action(Seat::SB, Action::Call).unwrap();
        state.apply_action(Seat::BB, Action::Check).unwrap();
        state.apply_action(Seat::SB, Action::Check).unwrap();
        state.apply_action(Seat::BB, Action::Check).unwrap();
        assert_eq!(state.to_act, Seat::BTN);
        let flop = coarse.fields(&state, Seat::BTN).unwrap();
        assert_eq!(flop.street, 1);
        assert_eq!(flop.board, 0);
        assert_eq!(flop.hero_board, 1);
        assert_eq!(flop.ratio, 0);
    }

    #[test]
    fn test_effective_stack_ignores_folded() {
        let config = TableConfig {
            stacks: [10.0, 40.0, 100.0],
            ..TableConfig::default()
        };
        let mut state = HandState::new(config, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(effective_stack(&state, Seat::BTN), 9.5);
        state.apply_action(Seat::BTN, Action::Call).unwrap();
        state.apply_action(Seat::SB, Action::Fold).unwrap();
        assert_eq!(effective_stack(&state, Seat::BB), 39.0);
    }

    #[test]
    fn test_missing_hole_cards() {
        let config = TableConfig {
            stacks: [100.0, 100.0, 0.0],
            ..TableConfig::default()
        };
        let state = HandState::new(config, &mut StdRng::seed_from_u64(5)).unwrap();
        let err = InfosetEncoder::default().key(&state, Seat::BTN).unwrap_err();
        assert!(matches!(err, EngineError::MissingHoleCards(_)));
    }
}
