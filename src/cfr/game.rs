//! Game trait definition for the CFR+ solver.
//!
//! Any game that implements the `Game` trait can be trained by the solver.
//! This provides a clean abstraction between the algorithm and the betting
//! engine: the solver only sees states, acting players, legal action sets,
//! infoset keys and terminal payoffs.

use rand::rngs::StdRng;

use super::action::{Action, ActionSet};
use crate::error::EngineError;

/// The main Game trait that defines the interface for any game.
///
/// States are `Copy`: the solver saves a state by copying it before it tries
/// an action and puts the copy back afterwards, so transitions mutate in place.
///
/// # Example
/// ```ignore
/// struct MyGame;
///
/// impl Game for MyGame {
///     type State = MyState;
///
///     // ... implement required methods
/// }
/// ```
pub trait Game: Send + Sync {
    /// The type representing a complete game state.
    type State: Copy + Send;

    /// Get the total number of players in the game.
    fn num_players(&self) -> usize;

    /// Deal a fresh hand.
    ///
    /// This is called at the start of each traversal.
    fn new_hand(&self, rng: &mut StdRng) -> Result<Self::State, EngineError>;

    /// Check if the given state is terminal (hand over).
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Get the payoff for a player at a terminal state.
    ///
    /// # Returns
    /// The player's net chip change over the hand. Non-terminal states pay 0.
    fn payoff(&self, state: &Self::State, player: usize) -> f64;

    /// Get the index of the player who should act at the current state.
    fn current_player(&self, state: &Self::State) -> usize;

    /// Legal actions for the player to act. Never empty for a live state.
    fn legal_actions(&self, state: &Self::State) -> Result<ActionSet, EngineError>;

    /// Infoset key for `player` at the current state.
    ///
    /// Two states that look identical to the player must produce the same key.
    fn info_key(&self, state: &Self::State, player: usize) -> Result<u64, EngineError>;

    /// Apply an action for the player to act, in place.
    fn apply_action(&self, state: &mut Self::State, action: Action) -> Result<(), EngineError>;

    /// Get a human-readable description of a state.
    ///
    /// Used for debugging and visualization.
    fn state_description(&self, _state: &Self::State) -> String {
        String::new()
    }
}
