//! Exact leakage by trace exploration.
//!
//! Every path from an initial state to a terminal state is enumerated
//! (or, in bounded mode, every path of at most `k` steps). Paths are
//! grouped by their trace, the sequence of public labels they show to an
//! observer; for each trace we keep:
//!     - its probability, accumulated over all the paths producing it
//!       (each weighted by the prior mass of its initial state);
//!     - the group of final states reached by those paths.
//!
//! # Examples
//!
//! ```
//! use dtleak::explorers::{Depth, Observations, TraceExplorer};
//! use dtleak::model::ExplicitModelBuilder;
//! use dtleak::PriorKnowledge;
//!
//! let mut builder = ExplicitModelBuilder::new();
//! let s0 = builder.add_state("init", "0");
//! let s1 = builder.add_state("init", "1");
//! let t = builder.add_state("A", "0");
//! let u = builder.add_state("A", "1");
//! builder.add_initial(s0);
//! builder.add_initial(s1);
//! builder.add_transition(s0, t, 1.);
//! builder.add_transition(s1, u, 1.);
//! let model = builder.build().unwrap();
//!
//! let prior = PriorKnowledge::uniform(&model);
//! let table = TraceExplorer::new(&model, &prior).explore(Depth::Unbounded);
//!
//! let trace = vec!["init".to_string(), "A".to_string()];
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.probability(&trace), Some(1.));
//! ```
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::explorers::paths::{explore_paths, Depth};
use crate::explorers::{Observations, TerminalGroup};
use crate::model::StateModel;
use crate::prior::PriorKnowledge;
use crate::security_measures::{most_probable, secret_distribution, SecretDistribution};
use crate::{StateId, Trace};

/// Trace probabilities and final-state groups.
#[derive(Debug, Clone, Default)]
pub struct TraceTable {
    probabilities: BTreeMap<Trace, f64>,
    // Terminal states reached by the paths of each trace.
    final_states: BTreeMap<Trace, BTreeSet<StateId>>,
    // Secret label of every state appearing in `final_states`.
    final_secrets: HashMap<StateId, String>,
    npaths: usize,
}

impl TraceTable {
    pub fn new() -> TraceTable {
        TraceTable::default()
    }

    /// Folds a path into the table.
    ///
    /// `initial_weight` is the prior mass of the path's first state; the
    /// path contributes it times the product of its transition
    /// probabilities to the probability of its trace.
    pub fn add_path<M: StateModel>(&mut self, model: &M, path: &[StateId],
                                   initial_weight: f64) {
        let last = match path.last() {
            Some(&last) => last,
            None => return,
        };
        let trace: Trace = path.iter()
                               .map(|&s| model.state(s).public.clone())
                               .collect();
        let probability = path.windows(2)
                              .map(|w| model.transition_probability(w[0], w[1]))
                              .fold(initial_weight, |acc, p| acc * p);

        *self.probabilities.entry(trace.clone()).or_insert(0.) += probability;
        self.final_states.entry(trace)
                         .or_insert_with(BTreeSet::new)
                         .insert(last);
        self.final_secrets.entry(last)
                          .or_insert_with(|| model.state(last).secret.clone());
        self.npaths += 1;
    }

    /// Probability of observing `trace`, if it was observed at all.
    pub fn probability(&self, trace: &[String]) -> Option<f64> {
        self.probabilities.get(trace).cloned()
    }

    /// Final states reached by the paths producing `trace`.
    pub fn final_states(&self, trace: &[String]) -> Option<&BTreeSet<StateId>> {
        self.final_states.get(trace)
    }

    /// Traces and their probabilities, in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&Trace, f64)> {
        self.probabilities.iter().map(|(t, &p)| (t, p))
    }

    /// Number of paths folded into the table.
    pub fn num_paths(&self) -> usize {
        self.npaths
    }

    /// Distribution of the secret within the final states of `trace`.
    pub fn secret_distribution(&self, trace: &[String], prior: &PriorKnowledge)
            -> SecretDistribution {
        match self.final_states.get(trace) {
            Some(states) => secret_distribution(
                states.iter().map(|s| self.final_secrets[s].as_str()), prior),
            None => SecretDistribution::new(),
        }
    }

    /// All the traces whose probability is the largest.
    pub fn most_probable_traces(&self) -> Vec<Trace> {
        most_probable(&self.probabilities)
    }
}

impl Observations for TraceTable {
    fn terminal_groups(&self, prior: &PriorKnowledge) -> Vec<TerminalGroup> {
        self.probabilities.iter()
            .map(|(trace, &weight)| TerminalGroup {
                weight,
                distribution: self.secret_distribution(trace, prior),
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.probabilities.len()
    }

    fn total_probability(&self) -> f64 {
        self.probabilities.values().sum()
    }
}

/// Enumerates the paths of a model and builds its `TraceTable`.
pub struct TraceExplorer<'a, M: StateModel> {
    model: &'a M,
    prior: &'a PriorKnowledge,
}

impl<'a, M: StateModel> TraceExplorer<'a, M> {
    pub fn new(model: &'a M, prior: &'a PriorKnowledge) -> TraceExplorer<'a, M> {
        TraceExplorer { model, prior }
    }

    /// Explores all the paths starting from each initial state.
    ///
    /// With `Depth::Unbounded`, paths end at terminal states and never
    /// revisit a state; with `Depth::Bounded(k)`, they end at a terminal
    /// state or after `k` transitions, whichever comes first.
    pub fn explore(&self, depth: Depth) -> TraceTable {
        let model = self.model;
        let mut table = TraceTable::new();

        for &(initial, weight) in self.prior.initial_state_weights() {
            let npaths = explore_paths(initial, depth,
                                       |s| model.successors(s).iter().cloned(),
                                       |s| model.is_terminal(s),
                                       |path| table.add_path(model, path, weight));
            debug!("{} paths from initial state {}", npaths, initial);
        }

        table
    }
}
