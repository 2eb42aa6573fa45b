//! This module implements the two ways of exploring a model for leakage:
//! exact trace exploration, and exploration of a back-bisimulation
//! quotient.
//!
//! Both produce a set of terminal groups (the observations an attacker
//! can make, each with its probability and the secret distribution it
//! leaves the attacker with), which is all the leakage measures need.
pub mod bisimulation;
pub mod paths;
pub mod quotient;
pub mod trace;

pub use self::bisimulation::{BisimulationQuotientBuilder, Quotient, QuotientState};
pub use self::paths::{explore_paths, Depth};
pub use self::quotient::{QuotientExplorer, QuotientReachability};
pub use self::trace::{TraceExplorer, TraceTable};

use crate::prior::PriorKnowledge;
use crate::security_measures::{entropy, EntropyKind, SecretDistribution};

/// One observation class: a trace, or a final quotient state.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalGroup {
    /// Probability of making this observation.
    pub weight: f64,
    /// Distribution of the secret after making it.
    pub distribution: SecretDistribution,
}

impl TerminalGroup {
    pub fn entropy(&self, kind: EntropyKind) -> f64 {
        entropy(self.distribution.values(), kind)
    }
}

/// The outcome of exploring a model: observations and their probabilities.
pub trait Observations {
    /// Returns one terminal group per observation.
    fn terminal_groups(&self, prior: &PriorKnowledge) -> Vec<TerminalGroup>;
    /// Number of distinct observations.
    fn len(&self) -> usize;
    /// Total probability mass of all observations.
    fn total_probability(&self) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
