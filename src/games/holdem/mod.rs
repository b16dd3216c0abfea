//! 3-handed no-limit hold'em.
//!
//! ## Modules
//!
//! - `card`: Card, hole cards, board, street and deck representations
//! - `hand_eval`: Poker hand evaluation
//! - `config`: Table and run configuration
//! - `state`: Hand state and the betting state machine
//! - `betting`: Legal action generation
//! - `abstraction`: Hand, board and sizing buckets
//! - `infoset`: Packed infoset keys
//! - `stats`: Policy summaries
//!
//! [`ThreeMaxGame`] plugs the engine and the infoset encoder into the solver.

pub mod abstraction;
pub mod betting;
pub mod card;
pub mod config;
pub mod hand_eval;
pub mod infoset;
pub mod state;
pub mod stats;

use rand::rngs::StdRng;

use crate::cfr::action::{Action, ActionSet};
use crate::cfr::game::Game;
use crate::error::EngineError;

// Re-export commonly used types
pub use card::{Board, Card, Deck, HoleCards, Street};
pub use config::{RaiseLegality, RunConfig, TableConfig};
pub use hand_eval::{evaluate_hand, HandCategory, HandRank};
pub use infoset::{describe_key, AbstractionMode, InfosetEncoder, InfosetFields};
pub use state::{HandState, PlayerState, Seat, NUM_SEATS};
pub use stats::PolicyStats;

/// The 3-max game: table rules plus the infoset abstraction.
#[derive(Debug, Clone, Copy)]
pub struct ThreeMaxGame {
    table: TableConfig,
    encoder: InfosetEncoder,
}

impl ThreeMaxGame {
    pub fn new(table: TableConfig, mode: AbstractionMode) -> Self {
        Self {
            table,
            encoder: InfosetEncoder::new(mode),
        }
    }

    /// Game described by a run config.
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self::new(config.table, config.abstraction)
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    pub fn encoder(&self) -> &InfosetEncoder {
        &self.encoder
    }
}

impl Default for ThreeMaxGame {
    fn default() -> Self {
        Self::new(TableConfig::default(), AbstractionMode::Full)
    }
}

impl Game for ThreeMaxGame {
    type State = HandState;

    fn num_players(&self) -> usize {
        NUM_SEATS
    }

    fn new_hand(&self, rng: &mut StdRng) -> Result<HandState, EngineError> {
        HandState::new(self.table, rng)
    }

    fn is_terminal(&self, state: &HandState) -> bool {
        state.is_terminal()
    }

    fn payoff(&self, state: &HandState, player: usize) -> f64 {
        state.net_change.map_or(0.0, |net| net[player])
    }

    fn current_player(&self, state: &HandState) -> usize {
        state.to_act.index()
    }

    fn legal_actions(&self, state: &HandState) -> Result<ActionSet, EngineError> {
        state.require_legal_actions()
    }

    fn info_key(&self, state: &HandState, player: usize) -> Result<u64, EngineError> {
        self.encoder.key(state, Seat::from_index(player))
    }

    fn apply_action(&self, state: &mut HandState, action: Action) -> Result<(), EngineError> {
        state.apply_action(state.to_act, action)
    }

    fn state_description(&self, state: &HandState) -> String {
        state.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::{CfrPlusSolver, Distribution, SolverConfig};
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_game_plays_to_terminal() {
        let game = ThreeMaxGame::new(TableConfig::with_stacks(20.0), AbstractionMode::Full);
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = game.new_hand(&mut rng).unwrap();
        let mut keys = Vec::new();
        while !game.is_terminal(&state) {
            let player = game.current_player(&state);
            keys.push(game.info_key(&state, player).unwrap());
            let legal = game.legal_actions(&state).unwrap();
            // Always the most passive continuation
            let action = [Action::Check, Action::Call, Action::AllIn, Action::Fold]
                .into_iter()
                .find(|a| legal.contains(*a))
                .unwrap();
            game.apply_action(&mut state, action).unwrap();
        }
        assert!(!keys.is_empty());
        let total: f64 = (0..3).map(|p| game.payoff(&state, p)).sum();
        assert!(total.abs() < 1e-9);
    }

    /// Same game, but the button is dealt one of two fixed hands with equal
    /// probability.
    struct TwoHandButton {
        inner: ThreeMaxGame,
        hands: [HoleCards; 2],
    }

    impl Game for TwoHandButton {
        type State = HandState;

        fn num_players(&self) -> usize {
            self.inner.num_players()
        }

        fn new_hand(&self, rng: &mut StdRng) -> Result<HandState, EngineError> {
            let btn = self.hands[usize::from(rng.gen_bool(0.5))];
            HandState::with_cards(*self.inner.table(), [None, None, Some(btn)], &[], rng)
        }

        fn is_terminal(&self, state: &HandState) -> bool {
            self.inner.is_terminal(state)
        }

        fn payoff(&self, state: &HandState, player: usize) -> f64 {
            self.inner.payoff(state, player)
        }

        fn current_player(&self, state: &HandState) -> usize {
            self.inner.current_player(state)
        }

        fn legal_actions(&self, state: &HandState) -> Result<ActionSet, EngineError> {
            self.inner.legal_actions(state)
        }

        fn info_key(&self, state: &HandState, player: usize) -> Result<u64, EngineError> {
            self.inner.info_key(state, player)
        }

        fn apply_action(&self, state: &mut HandState, action: Action) -> Result<(), EngineError> {
            self.inner.apply_action(state, action)
        }
    }

    /// The button's first decision holding `btn`.
    fn opening_key(game: &ThreeMaxGame, btn: HoleCards) -> u64 {
        let mut rng = StdRng::seed_from_u64(0);
        let opening = HandState::with_cards(*game.table(), [None, None, Some(btn)], &[], &mut rng).unwrap();
        assert_eq!(opening.to_act, Seat::BTN);
        game.info_key(&opening, Seat::BTN.index()).unwrap()
    }

    fn aggression(avg: &Distribution) -> f64 {
        avg[Action::Raise.index()] + avg[Action::AllIn.index()]
    }

    #[test]
    fn test_aces_open_more_aggressively_than_seven_deuce() {
        let aces: HoleCards = "AhAd".parse().unwrap();
        let trash: HoleCards = "7c2d".parse().unwrap();
        let inner = ThreeMaxGame::new(TableConfig::with_stacks(20.0), AbstractionMode::Coarse);
        let aces_key = opening_key(&inner, aces);
        let trash_key = opening_key(&inner, trash);
        assert_ne!(aces_key, trash_key);

        let game = TwoHandButton {
            inner,
            hands: [aces, trash],
        };
        let mut solver = CfrPlusSolver::new(game, SolverConfig::default().with_seed(17));
        solver.train(1000).unwrap();

        let aces_avg = solver.average_strategy(aces_key).unwrap();
        let trash_avg = solver.average_strategy(trash_key).unwrap();
        assert!(
            aggression(&aces_avg) > aggression(&trash_avg) + 0.1,
            "AA aggression {:.3} vs 72o {:.3}",
            aggression(&aces_avg),
            aggression(&trash_avg)
        );
    }
}
