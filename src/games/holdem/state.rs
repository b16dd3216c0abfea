//! Hand state and the betting state machine.
//!
//! One `HandState` owns everything about a single 3-handed hand: stacks,
//! bets, cards, whose turn it is and, once the hand is over, each seat's net
//! chip change. It is a flat `Copy` value: the solver branches on an action
//! by copying the state and applying the action to the copy.
//!
//! ```text
//! PREFLOP -> FLOP -> TURN -> RIVER -> SHOWDOWN
//!    |         |       |                 ^
//!    +---------+-------+-- one left / all-in runout
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::betting::{legal_actions, min_raise_to};
use super::card::{Board, Card, Deck, HoleCards, Street};
use super::config::TableConfig;
use super::hand_eval::{evaluate_hand, HandRank};
use crate::cfr::action::{Action, ActionSet};
use crate::error::{Diagnostics, EngineError};

/// Seats at the table.
pub const NUM_SEATS: usize = 3;

/// Entries kept per seat in the action history ring.
pub const HISTORY_LEN: usize = 5;

/// Chip amounts below this are treated as zero.
const CHIP_EPS: f64 = 1e-9;

/// A seat, fixed for the whole hand. Seat order is also clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    /// Small blind, first to act postflop.
    SB = 0,
    /// Big blind.
    BB = 1,
    /// Button, first to act preflop.
    BTN = 2,
}

impl Seat {
    /// All seats in clockwise order.
    pub const ALL: [Seat; NUM_SEATS] = [Seat::SB, Seat::BB, Seat::BTN];

    /// Seat index (0-2).
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Seat from index, wrapping around the table.
    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx % NUM_SEATS]
    }

    /// Next seat clockwise.
    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Seat::SB => "SB",
            Seat::BB => "BB",
            Seat::BTN => "BTN",
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-seat chips, cards and flags.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerState {
    /// Chips behind.
    pub stack: f64,
    /// Chips put in on the current street.
    pub bet: f64,
    /// Chips put in over the whole hand.
    pub total_bet: f64,
    /// Private cards, if dealt.
    pub hole: Option<HoleCards>,
    /// Seated with chips at the start of the hand.
    pub active: bool,
    pub folded: bool,
    pub all_in: bool,
    /// Acted since the street started.
    pub has_acted: bool,
}

impl PlayerState {
    /// Still contesting the pot.
    #[inline]
    pub fn in_hand(&self) -> bool {
        self.active && !self.folded
    }

    /// Still able to make decisions.
    #[inline]
    pub fn can_act(&self) -> bool {
        self.in_hand() && !self.all_in
    }

    /// Move chips from the stack into the pot-facing bets.
    fn commit(&mut self, amount: f64) {
        self.stack -= amount;
        if self.stack < CHIP_EPS {
            self.stack = 0.0;
        }
        self.bet += amount;
        self.total_bet += amount;
    }
}

/// One entry of the per-seat action history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggedAction {
    pub street: Street,
    pub action: Action,
    /// Chips moved by the action.
    pub amount: f64,
}

impl fmt::Display for LoggedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount > 0.0 {
            write!(f, "{} {:.1}BB", self.action, self.amount)
        } else {
            write!(f, "{}", self.action)
        }
    }
}

/// Ring buffer of the last few actions of one seat.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActionLog {
    entries: [Option<LoggedAction>; HISTORY_LEN],
    next: u8,
    len: u8,
}

impl ActionLog {
    /// Record an action, evicting the oldest when full.
    pub fn push(&mut self, entry: LoggedAction) {
        self.entries[self.next as usize] = Some(entry);
        self.next = (self.next + 1) % HISTORY_LEN as u8;
        self.len = (self.len + 1).min(HISTORY_LEN as u8);
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = LoggedAction> + '_ {
        let start = (self.next as usize + HISTORY_LEN - self.len as usize) % HISTORY_LEN;
        (0..self.len as usize).filter_map(move |i| self.entries[(start + i) % HISTORY_LEN])
    }
}

/// Complete state of one hand.
#[derive(Debug, Clone, Copy)]
pub struct HandState {
    /// Table rules for this hand.
    pub config: TableConfig,
    pub street: Street,
    /// All chips committed so far, current-street bets included.
    pub pot: f64,
    pub board: Board,
    /// Highest bet on the current street.
    pub table_max: f64,
    /// Raises made on the current street.
    pub raises: u8,
    pub last_raiser: Option<Seat>,
    /// Size of the last legal raise increment on this street.
    pub last_raise_size: f64,
    /// Seat whose turn it is (meaningless at showdown).
    pub to_act: Seat,
    pub players: [PlayerState; NUM_SEATS],
    /// Stacks before blinds, for net change.
    pub initial_stacks: [f64; NUM_SEATS],
    /// Undealt cards.
    pub deck: Deck,
    /// Last actions per seat (diagnostic only).
    pub history: [ActionLog; NUM_SEATS],
    /// Net chip change per seat, set at showdown.
    pub net_change: Option<[f64; NUM_SEATS]>,
}

impl HandState {
    /// Deal a fresh hand: shuffle, deal two cards to every active seat, post
    /// blinds and hand the turn to the first seat after the big blind.
    pub fn new<R: Rng + ?Sized>(config: TableConfig, rng: &mut R) -> Result<Self, EngineError> {
        Self::with_cards(config, [None; NUM_SEATS], &[], rng)
    }

    /// Deal a hand with some cards fixed.
    ///
    /// Seats given `Some` hole cards keep them, other active seats are dealt
    /// from the deck. `board` fixes the first community cards in order; the
    /// rest of the runout is random.
    pub fn with_cards<R: Rng + ?Sized>(
        config: TableConfig,
        holes: [Option<HoleCards>; NUM_SEATS],
        board: &[Card],
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let mut fixed: Vec<Card> = holes.iter().flatten().flat_map(|h| h.cards()).collect();
        fixed.extend_from_slice(board);
        for (i, card) in fixed.iter().enumerate() {
            if fixed[..i].contains(card) {
                return Err(EngineError::DuplicateCard(*card));
            }
        }

        let mut deck = Deck::without(&fixed);
        deck.shuffle(rng);

        let mut players = [PlayerState::default(); NUM_SEATS];
        for (player, &stack) in players.iter_mut().zip(config.stacks.iter()) {
            player.stack = stack.max(0.0);
            player.active = stack > 0.0;
        }

        let mut state = Self {
            config,
            street: Street::Preflop,
            pot: 0.0,
            board: Board::new(),
            table_max: 0.0,
            raises: 0,
            last_raiser: None,
            last_raise_size: config.big_blind,
            to_act: Seat::BB,
            players,
            initial_stacks: config.stacks,
            deck,
            history: [ActionLog::default(); NUM_SEATS],
            net_change: None,
        };

        for (i, fixed_hole) in holes.iter().enumerate() {
            if !state.players[i].active {
                continue;
            }
            let hole = match fixed_hole {
                Some(hole) => *hole,
                None => state.deal_hole()?,
            };
            state.players[i].hole = Some(hole);
        }
        if !board.is_empty() {
            // Fixed runout goes on top of what is left of the deck.
            state.deck = Deck::stacked(board, &state.dead_cards(), rng);
        }

        state.post_blind(Seat::SB, config.small_blind);
        state.post_blind(Seat::BB, config.big_blind);
        state.table_max = state.players.iter().map(|p| p.bet).fold(0.0, f64::max);

        state.to_act = Seat::BB;
        state.check_phase_completion()?;
        Ok(state)
    }

    fn post_blind(&mut self, seat: Seat, amount: f64) {
        let player = &mut self.players[seat.index()];
        if !player.active {
            return;
        }
        let posted = amount.min(player.stack);
        player.commit(posted);
        if player.stack <= 0.0 {
            player.all_in = true;
        }
        self.pot += posted;
    }

    /// Hole cards plus board: every card that must not come out of the deck.
    fn dead_cards(&self) -> Vec<Card> {
        let mut dead: Vec<Card> = self
            .players
            .iter()
            .filter_map(|p| p.hole)
            .flat_map(|h| h.cards())
            .collect();
        dead.extend_from_slice(self.board.cards());
        dead
    }

    fn deal_card(&mut self, street: Street) -> Result<Card, EngineError> {
        match self.deck.deal() {
            Some(card) => Ok(card),
            None => Err(EngineError::DeckExhausted {
                street,
                diag: self.diagnostics(self.to_act),
            }),
        }
    }

    fn deal_hole(&mut self) -> Result<HoleCards, EngineError> {
        let first = self.deal_card(self.street)?;
        let second = self.deal_card(self.street)?;
        Ok(HoleCards::new(first, second))
    }

    /// Table state for error reports.
    pub fn diagnostics(&self, seat: Seat) -> Box<Diagnostics> {
        let mut stacks = [0.0; NUM_SEATS];
        let mut bets = [0.0; NUM_SEATS];
        let mut flags = [(false, false, false, false); NUM_SEATS];
        for (i, p) in self.players.iter().enumerate() {
            stacks[i] = p.stack;
            bets[i] = p.bet;
            flags[i] = (p.active, p.folded, p.all_in, p.has_acted);
        }
        Box::new(Diagnostics {
            seat,
            street: self.street,
            pot: self.pot,
            table_max: self.table_max,
            raises: self.raises,
            stacks,
            bets,
            flags,
        })
    }

    pub fn player(&self, seat: Seat) -> &PlayerState {
        &self.players[seat.index()]
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.street == Street::Showdown
    }

    /// Legal actions for the seat to act.
    pub fn legal_actions(&self) -> ActionSet {
        legal_actions(self)
    }

    /// Legal actions, failing if the set is empty while the hand is live.
    pub fn require_legal_actions(&self) -> Result<ActionSet, EngineError> {
        if self.is_terminal() {
            return Err(EngineError::HandComplete(self.diagnostics(self.to_act)));
        }
        let legal = legal_actions(self);
        if legal.is_empty() {
            return Err(EngineError::NoLegalActions(self.diagnostics(self.to_act)));
        }
        Ok(legal)
    }

    /// Chips still needed by `seat` to match the table maximum.
    pub fn to_call(&self, seat: Seat) -> f64 {
        (self.table_max - self.player(seat).bet).max(0.0)
    }

    /// Stacks plus pot. Constant from the deal to the payout.
    pub fn chips_in_play(&self) -> f64 {
        self.players.iter().map(|p| p.stack).sum::<f64>() + self.pot
    }

    /// Apply an action for `seat`, then advance the hand.
    pub fn apply_action(&mut self, seat: Seat, action: Action) -> Result<(), EngineError> {
        if self.is_terminal() {
            return Err(EngineError::HandComplete(self.diagnostics(seat)));
        }
        if seat != self.to_act {
            return Err(EngineError::OutOfTurn {
                seat,
                diag: self.diagnostics(seat),
            });
        }
        let legal = self.require_legal_actions()?;
        if !legal.contains(action) {
            return Err(EngineError::IllegalAction {
                action,
                legal,
                diag: self.diagnostics(seat),
            });
        }

        let i = seat.index();
        let amount = match action {
            Action::Fold => {
                self.players[i].folded = true;
                0.0
            }
            Action::Check => 0.0,
            Action::Call => {
                let call = self.table_max - self.players[i].bet;
                self.require_stack(seat, call)?;
                self.players[i].commit(call);
                if self.players[i].stack <= 0.0 {
                    self.players[i].all_in = true;
                }
                self.pot += call;
                call
            }
            Action::Raise => {
                let target = min_raise_to(self);
                let delta = target - self.players[i].bet;
                self.require_stack(seat, delta)?;
                self.players[i].commit(delta);
                if self.players[i].stack <= 0.0 {
                    self.players[i].all_in = true;
                }
                self.pot += delta;
                self.last_raise_size = target - self.table_max;
                self.table_max = target;
                self.raises += 1;
                self.last_raiser = Some(seat);
                delta
            }
            Action::AllIn => {
                let shove = self.players[i].stack;
                let new_bet = self.players[i].bet + shove;
                if new_bet > self.table_max {
                    self.table_max = new_bet;
                    self.raises += 1;
                    self.last_raiser = Some(seat);
                }
                self.players[i].commit(shove);
                self.players[i].all_in = true;
                self.pot += shove;
                shove
            }
        };

        self.players[i].has_acted = true;
        self.history[i].push(LoggedAction {
            street: self.street,
            action,
            amount,
        });
        self.check_phase_completion()
    }

    fn require_stack(&self, seat: Seat, needed: f64) -> Result<(), EngineError> {
        let stack = self.player(seat).stack;
        if stack + CHIP_EPS < needed {
            return Err(EngineError::InsufficientStack {
                needed,
                stack,
                diag: self.diagnostics(seat),
            });
        }
        Ok(())
    }

    /// Decide what happens after an action: showdown, next turn or next street.
    fn check_phase_completion(&mut self) -> Result<(), EngineError> {
        let in_hand = self.players.iter().filter(|p| p.in_hand()).count();
        if in_hand <= 1 {
            return self.settle();
        }

        let all_in = self.players.iter().filter(|p| p.in_hand() && p.all_in).count();
        let live = self.players.iter().filter(|p| p.can_act()).count();
        let behind = self
            .players
            .iter()
            .filter(|p| p.can_act() && p.bet < self.table_max)
            .count();
        if all_in >= 1 && live <= 1 && behind == 0 {
            return self.settle();
        }

        if let Some(seat) = self.next_to_act() {
            self.to_act = seat;
            return Ok(());
        }

        if self.street == Street::River {
            self.settle()
        } else {
            self.advance_street()
        }
    }

    /// First seat clockwise after the current one that still owes a decision.
    fn next_to_act(&self) -> Option<Seat> {
        (1..=NUM_SEATS)
            .map(|step| self.to_act.index() + step)
            .map(Seat::from_index)
            .find(|seat| {
                let p = self.player(*seat);
                p.can_act() && (!p.has_acted || p.bet < self.table_max)
            })
    }

    fn advance_street(&mut self) -> Result<(), EngineError> {
        let next = match self.street.next() {
            Some(street) => street,
            None => return Err(EngineError::HandComplete(self.diagnostics(self.to_act))),
        };
        self.street = next;
        self.table_max = 0.0;
        self.raises = 0;
        self.last_raiser = None;
        self.last_raise_size = self.config.big_blind;
        for player in self.players.iter_mut() {
            player.bet = 0.0;
            player.has_acted = false;
        }

        while self.board.len() < next.num_board_cards() {
            let card = self.deal_card(next)?;
            self.board.add(card);
        }

        match Seat::ALL.into_iter().find(|s| self.player(*s).can_act()) {
            Some(seat) => {
                self.to_act = seat;
                Ok(())
            }
            None => Err(EngineError::NoEligibleSeat(self.diagnostics(self.to_act))),
        }
    }

    /// Complete the board, pay the pot and record net changes.
    fn settle(&mut self) -> Result<(), EngineError> {
        self.street = Street::Showdown;
        while !self.board.is_complete() {
            let card = self.deal_card(Street::Showdown)?;
            self.board.add(card);
        }
        for seat in Seat::ALL {
            let i = seat.index();
            if self.players[i].in_hand() && self.players[i].hole.is_none() {
                self.players[i].hole = Some(self.deal_hole()?);
            }
        }

        let contenders: Vec<Seat> = Seat::ALL
            .into_iter()
            .filter(|s| self.player(*s).in_hand())
            .collect();

        let winners: Vec<Seat> = match contenders.as_slice() {
            [] => return Err(EngineError::NoWinner(self.diagnostics(self.to_act))),
            [single] => vec![*single],
            _ => {
                let mut ranked: Vec<(Seat, HandRank)> = Vec::with_capacity(contenders.len());
                for &seat in &contenders {
                    let hole = self.player(seat).hole.ok_or_else(|| {
                        EngineError::MissingHoleCards(self.diagnostics(seat))
                    })?;
                    ranked.push((seat, evaluate_hand(&hole, &self.board)));
                }
                let best = ranked.iter().map(|(_, r)| *r).max();
                ranked
                    .into_iter()
                    .filter(|(_, r)| Some(*r) == best)
                    .map(|(s, _)| s)
                    .collect()
            }
        };

        let share = self.pot / winners.len() as f64;
        for seat in &winners {
            self.players[seat.index()].stack += share;
        }
        self.pot = 0.0;

        let mut net = [0.0; NUM_SEATS];
        for (i, p) in self.players.iter().enumerate() {
            net[i] = p.stack - self.initial_stacks[i];
        }
        self.net_change = Some(net);
        Ok(())
    }

    /// Net chip change per seat name, available once the hand is settled.
    pub fn net_change_by_name(&self) -> Option<BTreeMap<&'static str, f64>> {
        self.net_change.map(|net| {
            Seat::ALL
                .into_iter()
                .map(|seat| (seat.name(), net[seat.index()]))
                .collect()
        })
    }
}

impl fmt::Display for HandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} board=[{}] pot={:.1} max={:.1} to_act={}",
            self.street, self.board, self.pot, self.table_max, self.to_act
        )?;
        for seat in Seat::ALL {
            let p = self.player(seat);
            let hole = p.hole.map(|h| h.to_string()).unwrap_or_else(|| "----".into());
            let log: Vec<String> = self.history[seat.index()].iter().map(|e| e.to_string()).collect();
            writeln!(
                f,
                "  {:<3} {} stack={:.1} bet={:.1}{}{} [{}]",
                seat,
                hole,
                p.stack,
                p.bet,
                if p.folded { " folded" } else { "" },
                if p.all_in { " all-in" } else { "" },
                log.join(", ")
            )?;
        }
        Ok(())
    }
}
