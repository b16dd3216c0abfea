//! # Rust Solver 3-Max
//!
//! An external-sampling CFR+ solver for 3-handed no-limit hold'em
//! (SB, BB, BTN) with a five-action vocabulary.
//!
//! ## Features
//!
//! - **Betting Engine**: Flat `Copy` hand state with chip conservation and typed invariant errors
//! - **Infoset Keys**: 46-bit packed keys from hand, board, pot, sizing and made-hand buckets
//! - **CFR+ Training**: Sequential or rayon-parallel, reproducible from a seed
//! - **Policies**: Compact 8-bit policy files, optional zstd, warm start and playback
//!
//! ## Quick Start
//!
//! ```ignore
//! use rust_solver_3max::cfr::{CfrPlusSolver, SolverConfig};
//! use rust_solver_3max::games::holdem::ThreeMaxGame;
//!
//! let mut solver = CfrPlusSolver::new(ThreeMaxGame::default(), SolverConfig::default());
//! solver.train(10_000)?;
//! let policy = solver.extract_average_policy();
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: Actions, regret storage, the solver and policy files
//! - [`games`]: The 3-max hold'em engine and abstraction
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CfrPlusSolver                            │
//! │  - External-sampling traversal  - Sharded regret storage        │
//! │  - Checkpoints / warm start     - Average policy extraction     │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ implements Game trait
//!                               ▼
//!                       ┌───────────────┐
//!                       │ ThreeMaxGame  │
//!                       └───────────────┘
//!                          │         │
//!                          ▼         ▼
//!                ┌────────────┐  ┌────────────────┐
//!                │ HandState  │  │ InfosetEncoder │
//!                │ (betting)  │  │ (abstraction)  │
//!                └────────────┘  └────────────────┘
//! ```

/// CFR+ solver module.
///
/// Generic over the `Game` trait; holds the action vocabulary shared with
/// the engine.
pub mod cfr;

/// Error types.
pub mod error;

/// Game implementations module.
pub mod games;

pub use error::{EngineError, Result, SolverError};
