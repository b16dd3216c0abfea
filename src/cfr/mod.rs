//! CFR+ (Counterfactual Regret Minimization) solver module.
//!
//! This module provides an external-sampling CFR+ implementation for
//! computing approximate equilibrium strategies in multi-player games.
//!
//! # Overview
//!
//! CFR is an iterative algorithm that converges by:
//! 1. Computing counterfactual regret for each action at each decision point
//! 2. Updating strategies to minimize regret over time
//! 3. Averaging strategies across iterations
//!
//! # Usage
//!
//! 1. Implement the `Game` trait for your game
//! 2. Create a `CfrPlusSolver` with your game and configuration
//! 3. Call `train()` to run iterations
//! 4. Extract the average policy with `extract_average_policy()`
//!
//! # Example
//!
//! ```ignore
//! use rust_solver_3max::cfr::{CfrPlusSolver, SolverConfig};
//! use rust_solver_3max::games::holdem::ThreeMaxGame;
//!
//! let config = SolverConfig::default().with_seed(1);
//! let mut solver = CfrPlusSolver::new(ThreeMaxGame::default(), config);
//!
//! let stats = solver.train(10_000)?;
//! println!("Trained {} info sets in {:.2}s", stats.info_sets, stats.elapsed_seconds);
//!
//! solver.extract_average_policy().save_compact("avg_policy.json", false)?;
//! ```
//!
//! # Theory
//!
//! **Regret**: The difference between the value of an action and the value of the current strategy.
//! ```text
//! Regret(a) = Value(a) - Value(current_strategy)
//! ```
//!
//! **Regret Matching+**: Cumulative regret is floored at zero after every
//! update, and the strategy is proportional to it.
//! ```text
//! R(a) = max(0, R(a) + reach * Regret(a))
//! Strategy(a) = R(a) / sum(R(a'))
//! ```
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in Extensive Games" (2009)
//! - Tammelin, O. "Solving Large Imperfect Information Games Using CFR+" (2014)

pub mod action;
pub mod config;
pub mod game;
pub mod policy;
pub mod solver;
pub mod storage;

// Re-export main types for convenient access
pub use action::{Action, ActionSet, Distribution, NUM_ACTIONS};
pub use config::{ConfigError, SolverConfig, TrainStats};
pub use game::Game;
pub use policy::{CompactEntry, PolicyEntry, PolicyTable};
pub use solver::{CfrPlusSolver, SolverState};
pub use storage::{regret_matching, NodeEntry, RegretStorage, StorageExport};
