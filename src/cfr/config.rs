//! Configuration options for the CFR+ solver.
//!
//! This module provides the training knobs (seeding, batch size, threads,
//! checkpoint cadence) and the statistics reported back after training.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration for the CFR+ solver.
///
/// Regret updates always use the CFR+ clamp and the strategy sum is weighted
/// by the opponents' reach; what is configurable is how training is driven:
/// - Seeding for reproducible runs
/// - Number of simulated hands per iteration
/// - Parallelism
/// - Checkpoint cadence, location and compression
///
/// # Example
/// ```
/// use rust_solver_3max::cfr::SolverConfig;
///
/// let config = SolverConfig::default().with_seed(7);
/// assert_eq!(config.checkpoint_every, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Base random seed.
    ///
    /// Iteration `t` reseeds its RNG from `seed + 7919 * t`, so two runs with
    /// the same seed visit the same hands. If `None`, a random base seed is
    /// drawn once when the solver is created.
    pub seed: Option<u64>,

    /// How many times each iteration sweeps the three hero seats.
    pub hands_per_iteration: usize,

    /// Number of threads for parallel training.
    ///
    /// Set to `None` to use all available cores.
    pub num_threads: Option<usize>,

    /// Extract and write the average policy every this many iterations.
    pub checkpoint_every: u64,

    /// Directory for checkpoints. No files are written when `None`.
    pub checkpoint_dir: Option<PathBuf>,

    /// Write checkpoints as `.json.zst` (requires the `zstd` feature).
    pub compress_checkpoints: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed: None,
            hands_per_iteration: 1,
            num_threads: None,
            checkpoint_every: 100,
            checkpoint_dir: None,
            compress_checkpoints: false,
        }
    }
}

impl SolverConfig {
    /// Create a new SolverConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set hands per iteration.
    pub fn with_hands_per_iteration(mut self, hands: usize) -> Self {
        self.hands_per_iteration = hands;
        self
    }

    /// Builder method: set number of threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Builder method: set checkpoint cadence and directory.
    pub fn with_checkpoints(mut self, every: u64, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_every = every;
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Builder method: compress checkpoint files.
    pub fn with_compression(mut self, enable: bool) -> Self {
        self.compress_checkpoints = enable;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hands_per_iteration == 0 {
            return Err(ConfigError::ZeroHandsPerIteration);
        }
        if self.checkpoint_every == 0 {
            return Err(ConfigError::ZeroCheckpointInterval);
        }
        if self.num_threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        if self.compress_checkpoints && !cfg!(feature = "zstd") {
            return Err(ConfigError::CompressionDisabled);
        }
        Ok(())
    }
}

/// Errors that can occur when validating configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `hands_per_iteration` must be at least 1.
    #[error("hands_per_iteration must be at least 1")]
    ZeroHandsPerIteration,
    /// `checkpoint_every` must be at least 1.
    #[error("checkpoint_every must be at least 1")]
    ZeroCheckpointInterval,
    /// A thread pool needs at least one thread.
    #[error("num_threads must be at least 1")]
    ZeroThreads,
    /// Compressed checkpoints were requested without the `zstd` feature.
    #[error("compressed checkpoints require the `zstd` feature")]
    CompressionDisabled,
    /// Blinds must be positive with the small blind not above the big blind.
    #[error("invalid blinds: small {small}, big {big}")]
    InvalidBlinds {
        /// Small blind.
        small: f64,
        /// Big blind.
        big: f64,
    },
    /// Stacks must be finite and non-negative.
    #[error("invalid stack {stack} for seat {seat}")]
    InvalidStack {
        /// Seat index.
        seat: usize,
        /// Offending stack.
        stack: f64,
    },
    /// At least two seats need chips to play a hand.
    #[error("at least two seats need a positive stack")]
    TooFewPlayers,
    /// The raise cap must allow at least one raise.
    #[error("raise cap must be at least 1")]
    ZeroRaiseCap,
}

/// Statistics tracked during CFR+ training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Simulated hands (one per hero seat per sweep).
    pub hands_played: u64,

    /// Number of unique information sets discovered.
    pub info_sets: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Mean L1 change of the average strategy at the last checkpoint, in percent.
    pub last_policy_change: Option<f64>,
}

impl TrainStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }
}
