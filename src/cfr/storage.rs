//! Storage for CFR regrets and strategies.
//!
//! This module provides thread-safe storage for cumulative regrets and
//! strategy sums, keyed by packed infoset keys.
//!
//! The table is split into [`NUM_SHARDS`] shards, each behind its own
//! `RwLock`, so parallel workers only contend when they touch the same shard.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::action::{ActionSet, Distribution, NUM_ACTIONS};

/// Number of lock shards.
pub const NUM_SHARDS: usize = 64;

type Shard = FxHashMap<u64, NodeEntry>;

/// Everything the solver remembers about one infoset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Cumulative CFR+ regret per action (never negative).
    pub regret: Distribution,
    /// Cumulative reach-weighted strategy per action.
    pub strategy_sum: Distribution,
    /// Union of the legal sets seen at this infoset.
    pub legal: ActionSet,
    /// Number of hero updates.
    pub visits: u64,
}

impl NodeEntry {
    /// Normalized strategy sum, or uniform over `legal` when nothing was
    /// accumulated yet.
    pub fn average(&self) -> Distribution {
        let total: f64 = self.strategy_sum.iter().sum();
        if total > 0.0 {
            let mut avg = self.strategy_sum;
            for p in avg.iter_mut() {
                *p /= total;
            }
            avg
        } else {
            self.legal.uniform()
        }
    }
}

/// Regret-matching+ over a legal set.
///
/// Strategy is proportional to positive regret on legal actions; illegal
/// actions always get 0, and a zero sum gives uniform over `legal`.
pub fn regret_matching(regret: &Distribution, legal: ActionSet) -> Distribution {
    let mut strategy = [0.0; NUM_ACTIONS];
    let mut sum = 0.0;
    for action in legal.iter() {
        let r = regret[action.index()].max(0.0);
        strategy[action.index()] = r;
        sum += r;
    }
    if sum > 0.0 {
        for p in strategy.iter_mut() {
            *p /= sum;
        }
        strategy
    } else {
        legal.uniform()
    }
}

/// Thread-safe storage for regrets and strategy sums.
///
/// This struct manages the core data structures used by CFR+:
/// - **Regrets**: Cumulative counterfactual regret for each action at each info set
/// - **Strategy sums**: Cumulative strategy weights for computing average strategy
///
/// Entries are created lazily at zero the first time an infoset is updated.
/// A poisoned shard lock is recovered rather than propagated, since every
/// write leaves the entry in a valid state.
#[derive(Debug)]
pub struct RegretStorage {
    shards: Box<[RwLock<Shard>]>,
}

impl Default for RegretStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RegretStorage {
    /// Create new empty storage.
    pub fn new() -> Self {
        let shards: Vec<RwLock<Shard>> = (0..NUM_SHARDS)
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
        }
    }

    #[inline]
    fn shard_index(key: u64) -> usize {
        (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 58) as usize
    }

    fn read_shard(&self, key: u64) -> RwLockReadGuard<'_, Shard> {
        self.shards[Self::shard_index(key)]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, key: u64) -> RwLockWriteGuard<'_, Shard> {
        self.shards[Self::shard_index(key)]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_all(&self) -> Vec<RwLockReadGuard<'_, Shard>> {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    /// Get current strategy for an info set using regret matching.
    ///
    /// Unseen info sets play uniformly over `legal`.
    pub fn current_strategy(&self, key: u64, legal: ActionSet) -> Distribution {
        match self.read_shard(key).get(&key) {
            Some(entry) => regret_matching(&entry.regret, legal),
            None => legal.uniform(),
        }
    }

    /// Apply one hero update at an info set.
    ///
    /// # Arguments
    /// * `key` - The information set key
    /// * `legal` - Legal actions at the node
    /// * `action_values` - Sampled value of each legal action
    /// * `node_value` - Strategy-weighted value of the node
    /// * `reach` - Opponents' reach probability
    /// * `strategy` - The strategy the values were computed under
    pub fn accumulate(
        &self,
        key: u64,
        legal: ActionSet,
        action_values: &Distribution,
        node_value: f64,
        reach: f64,
        strategy: &Distribution,
    ) {
        let mut shard = self.write_shard(key);
        let entry = shard.entry(key).or_default();
        for action in legal.iter() {
            let i = action.index();
            entry.regret[i] = (entry.regret[i] + reach * (action_values[i] - node_value)).max(0.0);
            entry.strategy_sum[i] += reach * strategy[i];
        }
        entry.legal = entry.legal.union(legal);
        entry.visits += 1;
    }

    /// Add `weight × probs` to the strategy sums of an info set.
    ///
    /// Used to warm-start from a saved policy.
    pub fn seed_strategy_sums(&self, key: u64, legal: ActionSet, probs: &Distribution, weight: f64) {
        let mut shard = self.write_shard(key);
        let entry = shard.entry(key).or_default();
        for action in legal.iter() {
            entry.strategy_sum[action.index()] += probs[action.index()] * weight;
        }
        entry.legal = entry.legal.union(legal);
    }

    /// Get average strategy for an info set.
    ///
    /// Returns `None` for unseen info sets.
    pub fn average_strategy(&self, key: u64) -> Option<Distribution> {
        self.read_shard(key).get(&key).map(NodeEntry::average)
    }

    /// Copy of the entry for an info set.
    pub fn entry(&self, key: u64) -> Option<NodeEntry> {
        self.read_shard(key).get(&key).copied()
    }

    /// Get the number of information sets stored.
    pub fn num_info_sets(&self) -> usize {
        self.read_all().iter().map(|s| s.len()).sum()
    }

    /// Check if an info set exists in storage.
    pub fn contains(&self, key: u64) -> bool {
        self.read_shard(key).contains_key(&key)
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Point-in-time copy of every entry.
    ///
    /// All shard read locks are held together, so no update lands halfway
    /// through the copy.
    pub fn snapshot(&self) -> Vec<(u64, NodeEntry)> {
        let guards = self.read_all();
        let mut nodes = Vec::with_capacity(guards.iter().map(|g| g.len()).sum());
        for guard in &guards {
            nodes.extend(guard.iter().map(|(k, v)| (*k, *v)));
        }
        nodes
    }

    /// Export storage to serializable format.
    pub fn export(&self) -> StorageExport {
        StorageExport {
            nodes: self.snapshot().into_iter().collect(),
        }
    }

    /// Import storage from serialized format, replacing the current contents.
    pub fn import(&self, data: StorageExport) {
        self.clear();
        for (key, entry) in data.nodes {
            self.write_shard(key).insert(key, entry);
        }
    }
}

/// Serializable export format for storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageExport {
    /// Every entry, by infoset key.
    pub nodes: FxHashMap<u64, NodeEntry>,
}

/// Snapshot of average strategies for CI calculation.
#[derive(Debug, Clone, Default)]
pub struct StrategySnapshot {
    /// Average strategies: info_key -> probability per action
    pub strategies: FxHashMap<u64, Distribution>,
    /// Strategy sum totals, used to tell visited info sets apart
    pub totals: FxHashMap<u64, f64>,
}

impl RegretStorage {
    /// Create a snapshot of all current average strategies.
    ///
    /// Used for calculating Convergence Indicator (CI).
    pub fn snapshot_strategies(&self) -> StrategySnapshot {
        let mut snap = StrategySnapshot::default();
        for (key, entry) in self.snapshot() {
            snap.strategies.insert(key, entry.average());
            snap.totals.insert(key, entry.strategy_sum.iter().sum());
        }
        snap
    }

    /// Calculate Convergence Indicator (CI) by comparing current strategies to a snapshot.
    ///
    /// CI = 100 × mean L1 distance between the current and the snapshot
    /// average strategies. Info sets discovered since the snapshot are
    /// compared against uniform; info sets never visited in either are skipped.
    ///
    /// Lower is more stable. Returns infinity when nothing can be compared.
    pub fn calculate_ci(&self, snapshot: &StrategySnapshot) -> f64 {
        let mut total_change = 0.0;
        let mut num_info_sets = 0usize;

        for (key, entry) in self.snapshot() {
            let current_total: f64 = entry.strategy_sum.iter().sum();
            let old_total = snapshot.totals.get(&key).copied().unwrap_or(0.0);
            if current_total == 0.0 && old_total == 0.0 {
                continue;
            }

            let new_strategy = entry.average();
            let old_strategy = snapshot
                .strategies
                .get(&key)
                .copied()
                .unwrap_or_else(|| entry.legal.uniform());
            total_change += new_strategy
                .iter()
                .zip(old_strategy.iter())
                .map(|(new, old)| (new - old).abs())
                .sum::<f64>();
            num_info_sets += 1;
        }

        if num_info_sets == 0 {
            return f64::INFINITY;
        }
        100.0 * total_change / num_info_sets as f64
    }
}

impl Clone for RegretStorage {
    fn clone(&self) -> Self {
        let copy = Self::new();
        copy.import(self.export());
        copy
    }
}
