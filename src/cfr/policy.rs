//! Average-policy tables: extraction, compact serialization and playback.
//!
//! A policy file is a JSON object from infoset key to entry. Three entry
//! shapes are understood:
//!
//! ```text
//! legacy   {"FOLD": 0.1, "CALL": 0.6, "RAISE": 0.3}
//! compact  {"mask": 22, "codes": [26, 153, 76], "visits": 40}
//! packed   {"policy": [22, 26, 153, 76], "visits": 40}
//! ```
//!
//! Compact entries keep at most three actions, quantized to 8-bit codes that
//! sum to 255, listed in action-index order of the set mask bits. Keys are
//! decimal strings; `0x`-prefixed hex is accepted on read. The whole file may
//! be zstd-compressed.

use log::warn;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::action::{sample_action, Action, ActionSet, Distribution, NUM_ACTIONS};
use super::storage::RegretStorage;
use crate::error::{Result, SolverError};

/// Actions kept per compact entry.
pub const COMPACT_TOP_K: usize = 3;

/// Sum of the codes of every non-empty compact entry.
pub const CODE_SCALE: u32 = 255;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Restricted mass below which playback falls back to uniform.
const MIN_MASS: f64 = 1e-12;

/// One infoset of an average policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyEntry {
    /// Probability per action; sums to 1 over the actions present.
    pub probs: Distribution,
    /// Hero updates behind this entry, when known.
    pub visits: Option<u64>,
}

impl PolicyEntry {
    /// Actions with positive probability.
    pub fn support(&self) -> ActionSet {
        Action::ALL
            .into_iter()
            .filter(|a| self.probs[a.index()] > 0.0)
            .collect()
    }
}

/// Quantized entry as written to compact policy files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactEntry {
    /// Action bits, one per code.
    pub mask: u8,
    /// Codes in action-index order.
    pub codes: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visits: Option<u64>,
}

impl CompactEntry {
    /// Quantize a distribution.
    ///
    /// Keeps the three most likely actions (ties go to the lower action
    /// index), renormalizes them, rounds to codes and puts the rounding
    /// remainder on the largest code. Actions whose code rounds to zero are
    /// left out of the mask.
    pub fn encode(probs: &Distribution, visits: Option<u64>) -> Self {
        let mut ranked: Vec<(usize, f64)> = probs
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite() && *p > 0.0)
            .collect();
        // Stable sort keeps index order among equal probabilities
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(COMPACT_TOP_K);

        let total: f64 = ranked.iter().map(|(_, p)| p).sum();
        if ranked.is_empty() || total <= 0.0 {
            return Self {
                mask: 0,
                codes: Vec::new(),
                visits,
            };
        }

        let mut quantized: Vec<(usize, i64)> = ranked
            .iter()
            .map(|&(i, p)| (i, (p / total * CODE_SCALE as f64).round() as i64))
            .collect();
        let remainder = CODE_SCALE as i64 - quantized.iter().map(|(_, c)| c).sum::<i64>();
        quantized[0].1 += remainder;

        quantized.sort_by_key(|(i, _)| *i);
        let mut mask = 0u8;
        let mut codes = Vec::with_capacity(quantized.len());
        for (i, code) in quantized {
            let code = code.clamp(0, CODE_SCALE as i64) as u8;
            if code > 0 {
                mask |= 1 << i;
                codes.push(code);
            }
        }
        Self { mask, codes, visits }
    }

    /// Expand back to a distribution (`code / Σcodes` per mask bit).
    pub fn decode(&self) -> std::result::Result<Distribution, String> {
        if self.mask >> NUM_ACTIONS != 0 {
            return Err(format!("mask {:#x} has bits beyond the action set", self.mask));
        }
        if self.mask.count_ones() as usize != self.codes.len() {
            return Err(format!(
                "mask {:#07b} has {} bits but {} codes",
                self.mask,
                self.mask.count_ones(),
                self.codes.len()
            ));
        }
        let total: u32 = self.codes.iter().map(|&c| c as u32).sum();
        if total == 0 {
            return Err("all codes are zero".to_string());
        }

        let mut probs = [0.0; NUM_ACTIONS];
        let legal = ActionSet::from_bits(self.mask);
        for (action, &code) in legal.iter().zip(self.codes.iter()) {
            probs[action.index()] = code as f64 / total as f64;
        }
        Ok(probs)
    }
}

/// Any entry shape found in a policy file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Compact {
        mask: u8,
        codes: Vec<u8>,
        #[serde(default)]
        visits: Option<u64>,
    },
    Packed {
        policy: Vec<u8>,
        #[serde(default)]
        visits: Option<u64>,
    },
    Legacy(BTreeMap<Action, f64>),
}

impl StoredEntry {
    fn into_entry(self, key: u64) -> Result<PolicyEntry> {
        let invalid = |reason: String| SolverError::InvalidPolicyEntry { key, reason };
        match self {
            StoredEntry::Compact { mask, codes, visits } => {
                let probs = CompactEntry { mask, codes, visits }.decode().map_err(invalid)?;
                Ok(PolicyEntry { probs, visits })
            }
            StoredEntry::Packed { policy, visits } => {
                let (&mask, codes) = policy
                    .split_first()
                    .ok_or_else(|| invalid("empty policy array".to_string()))?;
                let compact = CompactEntry {
                    mask,
                    codes: codes.to_vec(),
                    visits,
                };
                let probs = compact.decode().map_err(invalid)?;
                Ok(PolicyEntry { probs, visits })
            }
            StoredEntry::Legacy(map) => {
                let mut probs = [0.0; NUM_ACTIONS];
                for (action, p) in map {
                    if !p.is_finite() || p < 0.0 {
                        return Err(invalid(format!("{} has probability {}", action, p)));
                    }
                    probs[action.index()] = p;
                }
                let total: f64 = probs.iter().sum();
                if total <= 0.0 {
                    return Err(invalid("no probability mass".to_string()));
                }
                for p in probs.iter_mut() {
                    *p /= total;
                }
                Ok(PolicyEntry { probs, visits: None })
            }
        }
    }
}

/// Parse a policy-file key: decimal, or hex with a `0x` prefix.
pub fn parse_key(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| SolverError::InvalidKey(raw.to_string()))
}

/// An average policy: infoset key to action distribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyTable {
    entries: FxHashMap<u64, PolicyEntry>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the average policy from solver storage.
    ///
    /// Each strategy sum is normalized. A node whose sum is not positive
    /// plays uniformly over the legal actions recorded for it; nodes with no
    /// recorded legal action are skipped.
    pub fn from_storage(storage: &RegretStorage) -> Self {
        let mut table = Self::new();
        for (key, node) in storage.snapshot() {
            let total: f64 = node.strategy_sum.iter().sum();
            let probs = if total > 0.0 {
                node.average()
            } else if !node.legal.is_empty() {
                node.legal.uniform()
            } else {
                continue;
            };
            table.insert(
                key,
                PolicyEntry {
                    probs,
                    visits: Some(node.visits),
                },
            );
        }
        table
    }

    pub fn insert(&mut self, key: u64, entry: PolicyEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: u64) -> Option<&PolicyEntry> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &PolicyEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Keys in ascending order.
    pub fn sorted_keys(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Stored distribution restricted to `legal` and renormalized.
    ///
    /// Unknown keys, or a restricted mass of about zero, give uniform over
    /// `legal`.
    pub fn distribution(&self, key: u64, legal: ActionSet) -> Distribution {
        let Some(entry) = self.entries.get(&key) else {
            return legal.uniform();
        };
        let mut dist = [0.0; NUM_ACTIONS];
        let mut mass = 0.0;
        for action in legal.iter() {
            let p = entry.probs[action.index()].max(0.0);
            dist[action.index()] = p;
            mass += p;
        }
        if mass <= MIN_MASS {
            return legal.uniform();
        }
        for p in dist.iter_mut() {
            *p /= mass;
        }
        dist
    }

    /// Sample a legal action for an infoset.
    pub fn act<R: Rng + ?Sized>(&self, key: u64, legal: ActionSet, rng: &mut R) -> Result<Action> {
        if legal.is_empty() {
            return Err(SolverError::EmptyLegalSet);
        }
        let dist = self.distribution(key, legal);
        sample_action(&dist, legal, rng).ok_or(SolverError::EmptyLegalSet)
    }

    /// Write the legacy form: a probability map per key.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let out: BTreeMap<String, BTreeMap<Action, f64>> = self
            .sorted_keys()
            .into_iter()
            .filter_map(|key| {
                let entry = self.entries.get(&key)?;
                let probs = Action::ALL
                    .into_iter()
                    .filter(|a| entry.probs[a.index()] > 0.0)
                    .map(|a| (a, entry.probs[a.index()]))
                    .collect();
                Some((key.to_string(), probs))
            })
            .collect();
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, &out)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the compact form, zstd-compressed when `compress` is set.
    pub fn save_compact<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<()> {
        let path = path.as_ref();
        let out: BTreeMap<String, CompactEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.to_string(), CompactEntry::encode(&entry.probs, entry.visits)))
            .collect();
        let json = serde_json::to_vec(&out)?;
        let bytes = if compress { compress_bytes(&json, path)? } else { json };
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Read any supported policy file.
    ///
    /// Entries that do not parse are logged and skipped; a malformed key
    /// fails the whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut bytes = fs::read(path)?;
        if bytes.starts_with(&ZSTD_MAGIC) {
            bytes = decompress_bytes(&bytes, path)?;
        }
        Self::from_json_slice(&bytes)
    }

    /// Parse a policy from JSON text.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        let mut table = Self::new();
        for (raw_key, value) in raw {
            let key = parse_key(&raw_key)?;
            let parsed = serde_json::from_value::<StoredEntry>(value)
                .map_err(|e| SolverError::InvalidPolicyEntry {
                    key,
                    reason: e.to_string(),
                })
                .and_then(|stored| stored.into_entry(key));
            match parsed {
                Ok(entry) => table.insert(key, entry),
                Err(e) => warn!("skipping policy entry: {}", e),
            }
        }
        Ok(table)
    }
}

#[cfg(feature = "zstd")]
fn compress_bytes(json: &[u8], _path: &Path) -> Result<Vec<u8>> {
    Ok(zstd::stream::encode_all(json, 3)?)
}

#[cfg(not(feature = "zstd"))]
fn compress_bytes(_json: &[u8], path: &Path) -> Result<Vec<u8>> {
    Err(SolverError::CompressionUnavailable(path.to_path_buf()))
}

#[cfg(feature = "zstd")]
fn decompress_bytes(bytes: &[u8], _path: &Path) -> Result<Vec<u8>> {
    Ok(zstd::stream::decode_all(bytes)?)
}

#[cfg(not(feature = "zstd"))]
fn decompress_bytes(_bytes: &[u8], path: &Path) -> Result<Vec<u8>> {
    Err(SolverError::CompressionUnavailable(path.to_path_buf()))
}
