//! Error types.
//!
//! Engine errors are invariant violations: they mean the state machine or the
//! infoset logic has a bug, so they carry a full snapshot of the table and are
//! propagated out of training instead of being coerced.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::cfr::action::{Action, ActionSet};
use crate::cfr::config::ConfigError;
use crate::games::holdem::card::{Card, Street};
use crate::games::holdem::state::{Seat, NUM_SEATS};

/// Table state captured when an engine invariant breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    /// Seat the error is about.
    pub seat: Seat,
    /// Street at the time of the error.
    pub street: Street,
    /// Main pot.
    pub pot: f64,
    /// Table maximum bet for the street.
    pub table_max: f64,
    /// Raises made this street.
    pub raises: u8,
    /// Remaining stacks per seat.
    pub stacks: [f64; NUM_SEATS],
    /// Current-street bets per seat.
    pub bets: [f64; NUM_SEATS],
    /// Per-seat (active, folded, all-in, has-acted) flags.
    pub flags: [(bool, bool, bool, bool); NUM_SEATS],
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seat={} street={} pot={:.2} max={:.2} raises={}",
            self.seat, self.street, self.pot, self.table_max, self.raises
        )?;
        for seat in Seat::ALL {
            let i = seat.index();
            let (active, folded, all_in, acted) = self.flags[i];
            write!(
                f,
                " | {} stack={:.2} bet={:.2} active={} folded={} all_in={} acted={}",
                seat, self.stacks[i], self.bets[i], active, folded, all_in, acted
            )?;
        }
        Ok(())
    }
}

/// Fatal betting-engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A seat tried to act while another seat holds the turn.
    #[error("{seat} acted out of turn ({diag})")]
    OutOfTurn {
        /// Seat that tried to act.
        seat: Seat,
        /// Table state.
        diag: Box<Diagnostics>,
    },

    /// The action is not in the computed legal set.
    #[error("illegal action {action}, legal set is {legal} ({diag})")]
    IllegalAction {
        /// Requested action.
        action: Action,
        /// Legal set at that moment.
        legal: ActionSet,
        /// Table state.
        diag: Box<Diagnostics>,
    },

    /// The seat to act has no legal action.
    #[error("no legal action for the seat to act ({0})")]
    NoLegalActions(Box<Diagnostics>),

    /// An action was applied after the hand reached showdown.
    #[error("hand is already settled ({0})")]
    HandComplete(Box<Diagnostics>),

    /// The seat cannot afford the chips the action requires.
    #[error("insufficient stack: needs {needed:.2}, has {stack:.2} ({diag})")]
    InsufficientStack {
        /// Chips the action needs.
        needed: f64,
        /// Chips the seat has.
        stack: f64,
        /// Table state.
        diag: Box<Diagnostics>,
    },

    /// Not enough cards left to complete a deal.
    #[error("deck exhausted dealing {street} ({diag})")]
    DeckExhausted {
        /// Street being dealt.
        street: Street,
        /// Table state.
        diag: Box<Diagnostics>,
    },

    /// Turn order found nobody able to act.
    #[error("no seat is eligible to act ({0})")]
    NoEligibleSeat(Box<Diagnostics>),

    /// Showdown reached with no player left to pay.
    #[error("showdown without a winner ({0})")]
    NoWinner(Box<Diagnostics>),

    /// A seat that must be evaluated or encoded holds no cards.
    #[error("missing hole cards ({0})")]
    MissingHoleCards(Box<Diagnostics>),

    /// A card was requested twice while setting up a hand.
    #[error("card {0} is already in use")]
    DuplicateCard(Card),
}

/// Top-level error for training, checkpoints and policy files.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Betting engine invariant violation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File system failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A policy file key is not a valid infoset key.
    #[error("invalid infoset key '{0}'")]
    InvalidKey(String),

    /// A policy entry could not be interpreted.
    #[error("invalid policy entry for key {key}: {reason}")]
    InvalidPolicyEntry {
        /// Infoset key.
        key: u64,
        /// What was wrong.
        reason: String,
    },

    /// A compressed file was found but compression support is not compiled in.
    #[error("{0} is zstd-compressed; rebuild with the `zstd` feature")]
    CompressionUnavailable(PathBuf),

    /// Playback was asked to choose from an empty legal set.
    #[error("no legal actions to choose from")]
    EmptyLegalSet,

    /// The thread pool could not be built.
    #[error("thread pool: {0}")]
    ThreadPool(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SolverError> = std::result::Result<T, E>;
