//! Summaries of a trained policy.

use std::fmt;

use super::card::Street;
use super::infoset::InfosetFields;
use super::state::{Seat, NUM_SEATS};
use crate::cfr::action::{Action, Distribution, NUM_ACTIONS};
use crate::cfr::policy::PolicyTable;

/// Betting streets (everything but showdown).
const NUM_STREETS: usize = 4;

/// Infoset counts and action mix of a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStats {
    /// Number of infosets.
    pub total: usize,
    /// Percentage of infosets per street, PREFLOP to RIVER.
    pub street_share: [f64; NUM_STREETS],
    /// Percentage of infosets per seat, SB, BB, BTN.
    pub role_share: [f64; NUM_SEATS],
    /// Mean distribution over the infosets of each street, if any.
    pub action_mix: [Option<Distribution>; NUM_STREETS],
}

impl PolicyStats {
    /// Tally a policy.
    ///
    /// The action mix is a macro average: every infoset counts once,
    /// whatever its visit count.
    pub fn from_policy(policy: &PolicyTable) -> Self {
        let mut street_counts = [0usize; NUM_STREETS];
        let mut role_counts = [0usize; NUM_SEATS];
        let mut mix_sums = [[0.0; NUM_ACTIONS]; NUM_STREETS];

        for (key, entry) in policy.iter() {
            let fields = InfosetFields::decode(key);
            if let Some(seat) = fields.seat() {
                role_counts[seat.index()] += 1;
            }
            let street = fields.street as usize;
            if street >= NUM_STREETS {
                continue;
            }
            street_counts[street] += 1;
            let total: f64 = entry.probs.iter().sum();
            if total > 0.0 {
                for (sum, p) in mix_sums[street].iter_mut().zip(entry.probs.iter()) {
                    *sum += p / total;
                }
            }
        }

        let total = policy.len();
        let share = |count: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * count as f64 / total as f64
            }
        };

        let mut action_mix = [None; NUM_STREETS];
        for (street, mix) in action_mix.iter_mut().enumerate() {
            let n = street_counts[street];
            if n > 0 {
                *mix = Some(mix_sums[street].map(|s| s / n as f64));
            }
        }

        Self {
            total,
            street_share: street_counts.map(share),
            role_share: role_counts.map(share),
            action_mix,
        }
    }
}

impl fmt::Display for PolicyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total_infosets: {}", self.total)?;
        for (i, share) in self.street_share.iter().enumerate() {
            let name = Street::from_index(i).map(|s| s.name()).unwrap_or("?");
            writeln!(f, "{} infosets: {:.2}%", name, share)?;
        }
        for seat in Seat::ALL {
            writeln!(f, "{} infosets: {:.2}%", seat, self.role_share[seat.index()])?;
        }
        for (i, mix) in self.action_mix.iter().enumerate() {
            let name = Street::from_index(i).map(|s| s.name()).unwrap_or("?");
            writeln!(f, "\n== {} ==", name)?;
            match mix {
                Some(mix) => {
                    for action in Action::ALL {
                        writeln!(f, "{}: {:.2}%", action, 100.0 * mix[action.index()])?;
                    }
                }
                None => writeln!(f, "(no data)")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::policy::PolicyEntry;
    use approx::assert_abs_diff_eq;

    fn key(street: u8, role: u8, hand: u8) -> u64 {
        InfosetFields {
            street,
            role,
            hand,
            ..InfosetFields::default()
        }
        .encode()
    }

    #[test]
    fn test_shares_and_mix() {
        let mut policy = PolicyTable::new();
        let fold = PolicyEntry {
            probs: [1.0, 0.0, 0.0, 0.0, 0.0],
            visits: None,
        };
        let raise = PolicyEntry {
            probs: [0.0, 0.0, 0.0, 1.0, 0.0],
            visits: Some(3),
        };
        policy.insert(key(0, 2, 0), fold);
        policy.insert(key(0, 2, 1), raise);
        policy.insert(key(1, 0, 0), raise);
        policy.insert(key(3, 1, 0), fold);

        let stats = PolicyStats::from_policy(&policy);
        assert_eq!(stats.total, 4);
        assert_abs_diff_eq!(stats.street_share[0], 50.0);
        assert_abs_diff_eq!(stats.street_share[2], 0.0);
        assert_abs_diff_eq!(stats.role_share[Seat::BTN.index()], 50.0);

        let preflop = stats.action_mix[0].unwrap();
        assert_abs_diff_eq!(preflop[Action::Fold.index()], 0.5);
        assert_abs_diff_eq!(preflop[Action::Raise.index()], 0.5);
        assert!(stats.action_mix[2].is_none());

        let text = stats.to_string();
        assert!(text.contains("total_infosets: 4"));
        assert!(text.contains("(no data)"));
    }

    #[test]
    fn test_empty_policy() {
        let stats = PolicyStats::from_policy(&PolicyTable::new());
        assert_eq!(stats.total, 0);
        assert!(stats.street_share.iter().all(|s| *s == 0.0));
    }
}
