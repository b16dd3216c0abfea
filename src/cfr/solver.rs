//! External-sampling CFR+ solver.
//!
//! Each iteration deals fresh hands and, for every hero seat, walks one
//! sampled trajectory from the deal to showdown:
//! - **Opponent nodes**: sample one action from the current strategy and
//!   multiply the opponents' reach by its probability
//! - **Hero nodes**: try every legal action on a copy of the state, roll each
//!   copy out to showdown under current strategies, update regrets and the
//!   strategy sum, then sample one action to continue
//!
//! The solver is generic over any game that implements the `Game` trait.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::action::{sample_action, Action, ActionSet, Distribution, NUM_ACTIONS};
use super::config::{SolverConfig, TrainStats};
use super::game::Game;
use super::policy::PolicyTable;
use super::storage::{RegretStorage, StorageExport, StrategySnapshot};
use crate::error::{Result, SolverError};

/// Multiplier applied to the iteration number when reseeding.
pub const SEED_STRIDE: u64 = 7919;

/// RNG seed for iteration `iteration` (1-based) of a run seeded with `base`.
pub fn iteration_seed(base: u64, iteration: u64) -> u64 {
    base.wrapping_add(SEED_STRIDE.wrapping_mul(iteration))
}

/// The main CFR+ solver.
///
/// # Example
/// ```ignore
/// use rust_solver_3max::cfr::{CfrPlusSolver, SolverConfig};
/// use rust_solver_3max::games::holdem::ThreeMaxGame;
///
/// let mut solver = CfrPlusSolver::new(ThreeMaxGame::default(), SolverConfig::default().with_seed(1));
/// solver.train(1_000)?;
/// let policy = solver.extract_average_policy();
/// ```
pub struct CfrPlusSolver<G: Game> {
    /// The game being solved.
    game: G,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Storage for regrets and strategy sums.
    storage: RegretStorage,

    /// Completed iterations.
    iteration: u64,

    /// Seed the per-iteration streams derive from.
    base_seed: u64,

    /// Statistics tracking.
    stats: TrainStats,

    /// Average strategies at the previous checkpoint.
    last_snapshot: Option<StrategySnapshot>,
}

impl<G: Game> CfrPlusSolver<G> {
    /// Create a new solver for the given game.
    pub fn new(game: G, config: SolverConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            game,
            config,
            storage: RegretStorage::new(),
            iteration: 0,
            base_seed,
            stats: TrainStats::new(),
            last_snapshot: None,
        }
    }

    /// Run a single iteration: `hands_per_iteration` sweeps over every seat.
    pub fn run_iteration(&mut self) -> Result<()> {
        let iteration = self.iteration + 1;
        let mut rng = StdRng::seed_from_u64(iteration_seed(self.base_seed, iteration));
        run_sweeps(&self.game, &self.storage, self.config.hands_per_iteration, &mut rng)?;
        self.iteration = iteration;
        self.stats.hands_played += self.hands_per_iteration();
        Ok(())
    }

    fn hands_per_iteration(&self) -> u64 {
        (self.config.hands_per_iteration * self.game.num_players()) as u64
    }

    /// Train the solver for a specified number of iterations.
    pub fn train(&mut self, iterations: u64) -> Result<&TrainStats> {
        self.train_with_callback(iterations, iterations.max(1), |_| {})
    }

    /// Train with a callback for progress tracking.
    ///
    /// # Arguments
    /// * `iterations` - Number of iterations to run
    /// * `callback_interval` - How often to call the callback
    /// * `callback` - Function called every `callback_interval` iterations
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&TrainStats>
    where
        F: FnMut(&TrainStats),
    {
        self.config.validate()?;
        let start = Instant::now();
        let elapsed_before = self.stats.elapsed_seconds;
        let interval = callback_interval.max(1);

        for i in 0..iterations {
            self.run_iteration()?;
            self.maybe_checkpoint()?;

            if (i + 1) % interval == 0 {
                self.refresh_stats(start, elapsed_before);
                callback(&self.stats);
            }
        }

        self.finish(start, elapsed_before)?;
        Ok(&self.stats)
    }

    /// Train on a rayon thread pool.
    pub fn train_parallel(&mut self, iterations: u64) -> Result<&TrainStats> {
        self.train_parallel_with_callback(iterations, |_| {})
    }

    /// Train on a rayon thread pool, calling `callback` after every batch.
    ///
    /// Iterations between two checkpoints form one batch and run
    /// concurrently; each iteration still draws its own seeded RNG stream.
    /// Workers update the shared tables under shard locks, so unlike
    /// [`train`](Self::train) the result depends on scheduling.
    pub fn train_parallel_with_callback<F>(&mut self, iterations: u64, mut callback: F) -> Result<&TrainStats>
    where
        F: FnMut(&TrainStats),
    {
        self.config.validate()?;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.num_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| SolverError::ThreadPool(e.to_string()))?;
        info!(
            "training {} iterations on {} threads",
            iterations,
            pool.current_num_threads()
        );

        let start = Instant::now();
        let elapsed_before = self.stats.elapsed_seconds;
        let target = self.iteration + iterations;
        let every = self.config.checkpoint_every;

        while self.iteration < target {
            let first = self.iteration + 1;
            let batch_end = ((self.iteration / every + 1) * every).min(target);

            let game = &self.game;
            let storage = &self.storage;
            let hands = self.config.hands_per_iteration;
            let base_seed = self.base_seed;
            pool.install(|| {
                (first..batch_end + 1).into_par_iter().try_for_each(|it| {
                    let mut rng = StdRng::seed_from_u64(iteration_seed(base_seed, it));
                    run_sweeps(game, storage, hands, &mut rng)
                })
            })?;

            self.stats.hands_played += (batch_end + 1 - first) * self.hands_per_iteration();
            self.iteration = batch_end;
            self.maybe_checkpoint()?;
            self.refresh_stats(start, elapsed_before);
            callback(&self.stats);
        }

        self.finish(start, elapsed_before)?;
        Ok(&self.stats)
    }

    fn refresh_stats(&mut self, start: Instant, elapsed_before: f64) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.storage.num_info_sets();
        self.stats.elapsed_seconds = elapsed_before + start.elapsed().as_secs_f64();
        self.stats.update_rate();
    }

    fn maybe_checkpoint(&mut self) -> Result<()> {
        if self.iteration % self.config.checkpoint_every != 0 {
            return Ok(());
        }

        let snapshot = self.storage.snapshot_strategies();
        if let Some(previous) = &self.last_snapshot {
            let change = self.storage.calculate_ci(previous);
            self.stats.last_policy_change = Some(change);
            debug!(
                "iteration {}: {} infosets, policy change {:.3}",
                self.iteration,
                snapshot.strategies.len(),
                change
            );
        }
        self.last_snapshot = Some(snapshot);

        if let Some(path) = self.checkpoint_path(&format!("avg_policy_iter_{}", self.iteration)) {
            self.write_policy(&path)?;
            info!("checkpoint {} -> {}", self.iteration, path.display());
        }
        Ok(())
    }

    fn finish(&mut self, start: Instant, elapsed_before: f64) -> Result<()> {
        self.refresh_stats(start, elapsed_before);
        if let Some(path) = self.checkpoint_path("avg_policy") {
            self.write_policy(&path)?;
            info!("final policy -> {}", path.display());
        }
        info!(
            "trained {} iterations ({} hands) in {:.2}s, {} infosets",
            self.stats.iterations, self.stats.hands_played, self.stats.elapsed_seconds, self.stats.info_sets
        );
        Ok(())
    }

    fn checkpoint_path(&self, stem: &str) -> Option<PathBuf> {
        let dir = self.config.checkpoint_dir.as_ref()?;
        let ext = if self.config.compress_checkpoints {
            "json.zst"
        } else {
            "json"
        };
        Some(dir.join(format!("{}.{}", stem, ext)))
    }

    fn write_policy(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.extract_average_policy()
            .save_compact(path, self.config.compress_checkpoints)
    }

    /// Average policy of everything trained so far.
    pub fn extract_average_policy(&self) -> PolicyTable {
        PolicyTable::from_storage(&self.storage)
    }

    /// Seed strategy sums from a saved policy.
    ///
    /// Each entry adds `probability × visits` (visits default to 1), so a
    /// warm-started run starts from the saved average instead of uniform.
    /// Returns the number of entries applied.
    pub fn warm_start(&mut self, policy: &PolicyTable) -> usize {
        let mut applied = 0;
        for (key, entry) in policy.iter() {
            let legal = entry.support();
            if legal.is_empty() {
                continue;
            }
            let weight = entry.visits.unwrap_or(1).max(1) as f64;
            self.storage.seed_strategy_sums(key, legal, &entry.probs, weight);
            applied += 1;
        }
        info!("warm start: seeded {} infosets", applied);
        applied
    }

    /// Get the current strategy for an information set.
    pub fn current_strategy(&self, key: u64, legal: ActionSet) -> Distribution {
        self.storage.current_strategy(key, legal)
    }

    /// Get the average strategy for an information set.
    pub fn average_strategy(&self, key: u64) -> Option<Distribution> {
        self.storage.average_strategy(key)
    }

    /// Get the current iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get the number of information sets discovered.
    pub fn num_info_sets(&self) -> usize {
        self.storage.num_info_sets()
    }

    pub fn stats(&self) -> &TrainStats {
        &self.stats
    }

    /// Get reference to the storage for analysis.
    pub fn storage(&self) -> &RegretStorage {
        &self.storage
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Export solver state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        SolverState {
            iteration: self.iteration,
            base_seed: self.base_seed,
            storage: self.storage.export(),
            stats: self.stats.clone(),
        }
    }

    /// Import solver state from checkpoint.
    pub fn import_state(&mut self, state: SolverState) {
        self.iteration = state.iteration;
        self.base_seed = state.base_seed;
        self.storage.import(state.storage);
        self.stats = state.stats;
        self.last_snapshot = None;
    }

    /// Write the full solver state as JSON.
    pub fn save_state<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &self.export_state())?;
        Ok(())
    }

    /// Resume from a state written by [`save_state`](Self::save_state).
    pub fn load_state<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = fs::File::open(path)?;
        let state: SolverState = serde_json::from_reader(std::io::BufReader::new(file))?;
        self.import_state(state);
        Ok(())
    }

    /// Reset the solver to initial state.
    pub fn reset(&mut self) {
        self.storage.clear();
        self.iteration = 0;
        self.stats = TrainStats::new();
        self.last_snapshot = None;
    }
}

/// Serializable solver state for checkpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverState {
    /// Completed iterations.
    pub iteration: u64,
    /// Seed the per-iteration streams derive from.
    pub base_seed: u64,
    /// Storage export.
    pub storage: StorageExport,
    /// Statistics.
    pub stats: TrainStats,
}

/// `hands` sweeps of one traversal per hero seat.
fn run_sweeps<G: Game>(game: &G, storage: &RegretStorage, hands: usize, rng: &mut StdRng) -> Result<()> {
    for _ in 0..hands {
        for hero in 0..game.num_players() {
            traverse(game, storage, hero, rng)?;
        }
    }
    Ok(())
}

/// Sample a legal action from the current strategy.
fn pick(strategy: &Distribution, legal: ActionSet, rng: &mut StdRng) -> Result<Action> {
    sample_action(strategy, legal, rng).ok_or(SolverError::EmptyLegalSet)
}

/// Apply `action`, logging the state the engine rejected it in.
fn step<G: Game>(game: &G, state: &mut G::State, action: Action) -> Result<()> {
    if let Err(e) = game.apply_action(state, action) {
        debug!("{} rejected at {}", action, game.state_description(state));
        return Err(e.into());
    }
    Ok(())
}

/// One external-sampling traversal for `hero` on a freshly dealt hand.
///
/// Returns the hero's net chips on the sampled trajectory.
pub fn traverse<G: Game>(game: &G, storage: &RegretStorage, hero: usize, rng: &mut StdRng) -> Result<f64> {
    let mut state = game.new_hand(rng)?;
    let mut reach = 1.0;

    while !game.is_terminal(&state) {
        let player = game.current_player(&state);
        let legal = game.legal_actions(&state)?;
        let key = game.info_key(&state, player)?;
        let strategy = storage.current_strategy(key, legal);

        if player == hero {
            let mut values = [0.0; NUM_ACTIONS];
            for action in legal.iter() {
                let mut branch = state;
                step(game, &mut branch, action)?;
                values[action.index()] = rollout(game, storage, branch, hero, rng)?;
            }
            let node_value: f64 = legal
                .iter()
                .map(|a| strategy[a.index()] * values[a.index()])
                .sum();
            storage.accumulate(key, legal, &values, node_value, reach, &strategy);

            let action = pick(&strategy, legal, rng)?;
            step(game, &mut state, action)?;
        } else {
            let action = pick(&strategy, legal, rng)?;
            reach *= strategy[action.index()];
            step(game, &mut state, action)?;
        }
    }

    Ok(game.payoff(&state, hero))
}

/// Play `state` to the end with every seat on its current strategy.
fn rollout<G: Game>(
    game: &G,
    storage: &RegretStorage,
    mut state: G::State,
    hero: usize,
    rng: &mut StdRng,
) -> Result<f64> {
    while !game.is_terminal(&state) {
        let player = game.current_player(&state);
        let legal = game.legal_actions(&state)?;
        let key = game.info_key(&state, player)?;
        let strategy = storage.current_strategy(key, legal);
        let action = pick(&strategy, legal, rng)?;
        step(game, &mut state, action)?;
    }
    Ok(game.payoff(&state, hero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::holdem::{AbstractionMode, TableConfig, ThreeMaxGame};

    fn short_game() -> ThreeMaxGame {
        ThreeMaxGame::new(TableConfig::with_stacks(10.0), AbstractionMode::Coarse)
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("solver3max_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_step_rejects_illegal_action() {
        let game = short_game();
        let mut state = game.new_hand(&mut StdRng::seed_from_u64(3)).unwrap();
        // BTN faces the big blind, so checking is not allowed
        let err = step(&game, &mut state, Action::Check).unwrap_err();
        assert!(matches!(err, SolverError::Engine(_)));
        assert!(game.state_description(&state).contains("to_act=BTN"));
        step(&game, &mut state, Action::Call).unwrap();
    }

    #[test]
    fn test_train_counts_hands() {
        let mut solver = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(1));
        let stats = solver.train(20).unwrap();
        assert_eq!(stats.iterations, 20);
        assert_eq!(stats.hands_played, 60);
        assert!(stats.info_sets > 0);
        assert_eq!(solver.iteration(), 20);
    }

    #[test]
    fn test_same_seed_same_tables() {
        let config = SolverConfig::default().with_seed(11).with_hands_per_iteration(2);
        let mut a = CfrPlusSolver::new(short_game(), config.clone());
        let mut b = CfrPlusSolver::new(short_game(), config);
        a.train(15).unwrap();
        b.train(15).unwrap();
        assert_eq!(a.storage().export().nodes, b.storage().export().nodes);
    }

    #[test]
    fn test_regrets_stay_non_negative() {
        let mut solver = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(3));
        solver.train(50).unwrap();
        for (_, node) in solver.storage().snapshot() {
            assert!(node.regret.iter().all(|r| *r >= 0.0));
            for action in Action::ALL {
                if !node.legal.contains(action) {
                    assert_eq!(node.regret[action.index()], 0.0);
                    assert_eq!(node.strategy_sum[action.index()], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_parallel_training() {
        let config = SolverConfig::default()
            .with_seed(5)
            .with_threads(2)
            .with_checkpoints(7, temp_dir("parallel"));
        let mut solver = CfrPlusSolver::new(short_game(), config);
        let mut batches = 0;
        let stats = solver.train_parallel_with_callback(20, |_| batches += 1).unwrap();
        assert_eq!(stats.iterations, 20);
        assert_eq!(stats.hands_played, 60);
        assert!(stats.info_sets > 0);
        // 1-7, 8-14, 15-20
        assert_eq!(batches, 3);
        let _ = fs::remove_dir_all(temp_dir("parallel"));
    }

    #[test]
    fn test_checkpoints_written() {
        let dir = temp_dir("checkpoints");
        let config = SolverConfig::default().with_seed(2).with_checkpoints(5, &dir);
        let mut solver = CfrPlusSolver::new(short_game(), config);
        solver.train(10).unwrap();

        assert!(dir.join("avg_policy_iter_5.json").exists());
        assert!(dir.join("avg_policy_iter_10.json").exists());
        let policy = PolicyTable::load(dir.join("avg_policy.json")).unwrap();
        assert_eq!(policy.len(), solver.extract_average_policy().len());
        assert!(solver.stats().last_policy_change.is_some());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_state_round_trip() {
        let mut solver = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(8));
        solver.train(10).unwrap();
        let path = temp_dir("state.json");
        solver.save_state(&path).unwrap();

        let mut resumed = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(99));
        resumed.load_state(&path).unwrap();
        assert_eq!(resumed.iteration(), 10);
        assert_eq!(resumed.num_info_sets(), solver.num_info_sets());

        // Same seed and iteration: both continue identically
        solver.train(5).unwrap();
        resumed.train(5).unwrap();
        assert_eq!(solver.storage().export().nodes, resumed.storage().export().nodes);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_warm_start_seeds_average() {
        let mut trained = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(4));
        trained.train(30).unwrap();
        let policy = trained.extract_average_policy();

        let mut fresh = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(4));
        let applied = fresh.warm_start(&policy);
        assert_eq!(applied, policy.len());
        for (key, entry) in policy.iter().take(20) {
            let avg = fresh.average_strategy(key).unwrap();
            for i in 0..NUM_ACTIONS {
                approx::assert_abs_diff_eq!(avg[i], entry.probs[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut solver = CfrPlusSolver::new(short_game(), SolverConfig::default().with_seed(6));
        solver.train(5).unwrap();
        solver.reset();
        assert_eq!(solver.iteration(), 0);
        assert_eq!(solver.num_info_sets(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SolverConfig::default().with_hands_per_iteration(0);
        let mut solver = CfrPlusSolver::new(short_game(), config);
        assert!(matches!(solver.train(1), Err(SolverError::Config(_))));
    }
}
