//! The closed action vocabulary shared by the betting engine and the solver.
//!
//! Every regret and strategy vector is indexed by [`Action::index`], and legal
//! action sets are 5-bit masks over the same order:
//!
//! ```text
//! bit:    0     1      2     3      4
//!       FOLD  CHECK  CALL  RAISE  ALL-IN
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of actions in the vocabulary.
pub const NUM_ACTIONS: usize = 5;

/// A probability (or weight) per action, indexed by [`Action::index`].
pub type Distribution = [f64; NUM_ACTIONS];

/// A betting action.
///
/// RAISE is always the minimum legal raise; there are no pot-fraction sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    /// Give up the hand.
    #[serde(rename = "FOLD")]
    Fold = 0,
    /// Pass when nothing is owed.
    #[serde(rename = "CHECK")]
    Check = 1,
    /// Match the table maximum.
    #[serde(rename = "CALL")]
    Call = 2,
    /// Minimum raise.
    #[serde(rename = "RAISE")]
    Raise = 3,
    /// Commit the whole remaining stack.
    #[serde(rename = "ALL-IN")]
    AllIn = 4,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::Fold,
        Action::Check,
        Action::Call,
        Action::Raise,
        Action::AllIn,
    ];

    /// Position of this action in regret/strategy vectors.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Action for a vector index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Canonical upper-case name, as used in policy files.
    pub fn name(self) -> &'static str {
        match self {
            Action::Fold => "FOLD",
            Action::Check => "CHECK",
            Action::Call => "CALL",
            Action::Raise => "RAISE",
            Action::AllIn => "ALL-IN",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOLD" | "F" => Ok(Action::Fold),
            "CHECK" | "X" => Ok(Action::Check),
            "CALL" | "C" => Ok(Action::Call),
            "RAISE" | "R" => Ok(Action::Raise),
            "ALL-IN" | "ALLIN" | "ALL_IN" | "A" => Ok(Action::AllIn),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// A set of actions stored as a 5-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet(u8);

impl ActionSet {
    const MASK: u8 = (1 << NUM_ACTIONS) - 1;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All five actions.
    pub const fn full() -> Self {
        Self(Self::MASK)
    }

    /// Build from raw bits; bits above the vocabulary are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Raw mask.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, action: Action) -> bool {
        self.0 & (1 << action.index()) != 0
    }

    #[inline]
    pub fn insert(&mut self, action: Action) {
        self.0 |= 1 << action.index();
    }

    #[inline]
    pub fn remove(&mut self, action: Action) {
        self.0 &= !(1 << action.index());
    }

    /// Union of two sets.
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in index order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    /// Uniform distribution over the members (all zeros for the empty set).
    pub fn uniform(self) -> Distribution {
        let mut dist = [0.0; NUM_ACTIONS];
        let n = self.len();
        if n == 0 {
            return dist;
        }
        for action in self.iter() {
            dist[action.index()] = 1.0 / n as f64;
        }
        dist
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = Self::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Action::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Sample a legal action from `dist` by cumulative sum.
///
/// Only members of `legal` are considered. Rounding drift falls through to the
/// last legal action with positive weight. Returns `None` if `legal` is empty.
pub fn sample_action<R: Rng + ?Sized>(
    dist: &Distribution,
    legal: ActionSet,
    rng: &mut R,
) -> Option<Action> {
    let total: f64 = legal.iter().map(|a| dist[a.index()].max(0.0)).sum();
    if total <= 0.0 {
        let n = legal.len();
        if n == 0 {
            return None;
        }
        return legal.iter().nth(rng.gen_range(0..n));
    }

    let r = rng.gen::<f64>() * total;
    let mut cumsum = 0.0;
    let mut last = None;
    for action in legal.iter() {
        let p = dist[action.index()].max(0.0);
        if p <= 0.0 {
            continue;
        }
        cumsum += p;
        last = Some(action);
        if r < cumsum {
            return Some(action);
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_action_order_and_names() {
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(Action::from_index(i), Some(*action));
        }
        assert_eq!(Action::AllIn.name(), "ALL-IN");
        assert_eq!("all-in".parse::<Action>().unwrap(), Action::AllIn);
        assert!("bet".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_set_ops() {
        let mut set = ActionSet::empty();
        assert!(set.is_empty());
        set.insert(Action::Call);
        set.insert(Action::AllIn);
        assert_eq!(set.len(), 2);
        assert_eq!(set.bits(), 0b10100);
        assert!(set.contains(Action::Call));
        set.remove(Action::Call);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Action::AllIn]);
        assert_eq!(ActionSet::from_bits(0xFF), ActionSet::full());
    }

    #[test]
    fn test_sample_respects_legal_set() {
        let mut rng = StdRng::seed_from_u64(3);
        let legal: ActionSet = [Action::Check, Action::Raise].into_iter().collect();
        // Weight on an illegal action must never be sampled.
        let dist = [0.9, 0.05, 0.0, 0.05, 0.0];
        for _ in 0..200 {
            let a = sample_action(&dist, legal, &mut rng).unwrap();
            assert!(legal.contains(a));
        }
        assert!(sample_action(&dist, ActionSet::empty(), &mut rng).is_none());
    }

    #[test]
    fn test_json_names() {
        let json = serde_json::to_string(&Action::AllIn).unwrap();
        assert_eq!(json, "\"ALL-IN\"");
        let back: Action = serde_json::from_str("\"FOLD\"").unwrap();
        assert_eq!(back, Action::Fold);
    }
}
