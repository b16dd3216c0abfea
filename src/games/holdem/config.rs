//! Table and run configuration loaded from JSON.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "table": { "stacks": [20, 20, 20] },
//!   "solver": { "seed": 7, "checkpoint_every": 500, "checkpoint_dir": "out" },
//!   "abstraction": "coarse"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::infoset::AbstractionMode;
use super::state::NUM_SEATS;
use crate::cfr::config::{ConfigError, SolverConfig};
use crate::error::Result;

/// How RAISE legality is decided.
///
/// The applied raise always targets `table_max + max(last_increment, big_blind)`.
/// The two modes differ in the stack threshold used to offer the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaiseLegality {
    /// RAISE is legal iff the stack covers the chips the raise will actually
    /// move. No legal RAISE can fail with insufficient stack.
    #[default]
    MatchApplied,
    /// Threshold `2 * (table_max - bet)` (or one big blind when nothing is bet).
    /// A RAISE offered under this rule can still be unaffordable when applied,
    /// which surfaces as an insufficient-stack error.
    Reference,
}

/// Blinds, stacks and betting limits for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Opening stacks for SB, BB, BTN. A seat with 0 chips sits out.
    pub stacks: [f64; NUM_SEATS],
    /// Small blind posted by seat 0.
    pub small_blind: f64,
    /// Big blind posted by seat 1.
    pub big_blind: f64,
    /// Maximum raises per street.
    pub raise_cap: u8,
    /// RAISE legality rule.
    pub raise_legality: RaiseLegality,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            stacks: [100.0; NUM_SEATS],
            small_blind: 0.5,
            big_blind: 1.0,
            raise_cap: 4,
            raise_legality: RaiseLegality::MatchApplied,
        }
    }
}

impl TableConfig {
    /// Equal stacks for every seat, other settings at their defaults.
    pub fn with_stacks(stack: f64) -> Self {
        Self {
            stacks: [stack; NUM_SEATS],
            ..Self::default()
        }
    }

    /// Builder method: set the RAISE legality rule.
    pub fn with_raise_legality(mut self, legality: RaiseLegality) -> Self {
        self.raise_legality = legality;
        self
    }

    /// Builder method: set the raise cap.
    pub fn with_raise_cap(mut self, cap: u8) -> Self {
        self.raise_cap = cap;
        self
    }

    /// Validate blinds, stacks and cap.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.small_blind > 0.0 && self.big_blind > 0.0 && self.small_blind <= self.big_blind)
        {
            return Err(ConfigError::InvalidBlinds {
                small: self.small_blind,
                big: self.big_blind,
            });
        }
        for (seat, &stack) in self.stacks.iter().enumerate() {
            if !stack.is_finite() || stack < 0.0 {
                return Err(ConfigError::InvalidStack { seat, stack });
            }
        }
        if self.stacks.iter().filter(|&&s| s > 0.0).count() < 2 {
            return Err(ConfigError::TooFewPlayers);
        }
        if self.raise_cap == 0 {
            return Err(ConfigError::ZeroRaiseCap);
        }
        Ok(())
    }
}

/// Everything a training run needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Table settings.
    pub table: TableConfig,
    /// Solver settings.
    pub solver: SolverConfig,
    /// Infoset abstraction.
    pub abstraction: AbstractionMode,
}

impl RunConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate both table and solver sections.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.table.validate()?;
        self.solver.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;

    #[test]
    fn test_table_defaults() {
        let table = TableConfig::default();
        assert_eq!(table.stacks, [100.0; 3]);
        assert_eq!(table.small_blind, 0.5);
        assert_eq!(table.big_blind, 1.0);
        assert_eq!(table.raise_cap, 4);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_run_config_from_json() {
        let json = r#"{
            "table": { "stacks": [20, 20, 20], "raise_legality": "reference" },
            "solver": { "seed": 7, "checkpoint_every": 500 },
            "abstraction": "coarse"
        }"#;
        let config = RunConfig::from_json_str(json).unwrap();
        assert_eq!(config.table.stacks, [20.0; 3]);
        assert_eq!(config.table.raise_legality, RaiseLegality::Reference);
        assert_eq!(config.table.big_blind, 1.0);
        assert_eq!(config.solver.seed, Some(7));
        assert_eq!(config.solver.checkpoint_every, 500);
        assert_eq!(config.abstraction, AbstractionMode::Coarse);
    }

    #[test]
    fn test_invalid_table_rejected() {
        let json = r#"{ "table": { "small_blind": 2, "big_blind": 1 } }"#;
        assert!(matches!(
            RunConfig::from_json_str(json),
            Err(SolverError::Config(ConfigError::InvalidBlinds { .. }))
        ));

        let lonely = TableConfig {
            stacks: [100.0, 0.0, 0.0],
            ..TableConfig::default()
        };
        assert_eq!(lonely.validate(), Err(ConfigError::TooFewPlayers));
    }
}
