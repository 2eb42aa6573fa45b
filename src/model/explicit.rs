//! Explicit, in-memory DTMC backed by a dense transition matrix.
//!
//! # Examples
//!
//! ```
//! use dtleak::model::{ExplicitModelBuilder, StateModel};
//!
//! let mut builder = ExplicitModelBuilder::new();
//! let s0 = builder.add_state("init", "0");
//! let s1 = builder.add_state("init", "1");
//! let t0 = builder.add_state("A", "0");
//! let t1 = builder.add_state("B", "1");
//! builder.add_initial(s0);
//! builder.add_initial(s1);
//! builder.add_transition(s0, t0, 1.);
//! builder.add_transition(s1, t1, 1.);
//!
//! let model = builder.build().unwrap();
//! assert_eq!(model.successors(s0), &[t0]);
//! assert!(model.is_terminal(t1));
//! ```
use ndarray::Array2;
use std::collections::VecDeque;

use crate::error::{LeakageError, Result};
use crate::model::{State, StateModel};
use crate::StateId;

/// Largest transition matrix (in cells) we are willing to allocate.
pub const MAX_DENSE_ENTRIES: usize = 1 << 28;

// Outgoing probabilities of a non-terminal state must sum to 1 within this.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Collects states and transitions, and validates them into an
/// `ExplicitModel`.
#[derive(Debug, Default)]
pub struct ExplicitModelBuilder {
    states: Vec<State>,
    initial: Vec<StateId>,
    transitions: Vec<(StateId, StateId, f64)>,
}

impl ExplicitModelBuilder {
    pub fn new() -> ExplicitModelBuilder {
        ExplicitModelBuilder::default()
    }

    /// Adds a state and returns its id. Ids are assigned sequentially
    /// from 0.
    pub fn add_state(&mut self, public: &str, secret: &str) -> StateId {
        let id = self.states.len();
        self.states.push(State::new(id, public, secret));
        id
    }

    /// Marks a state as initial; initial states keep the order in which
    /// they were marked.
    pub fn add_initial(&mut self, s: StateId) {
        if !self.initial.contains(&s) {
            self.initial.push(s);
        }
    }

    /// Adds a transition. Repeated transitions between the same pair of
    /// states accumulate their probability.
    pub fn add_transition(&mut self, from: StateId, to: StateId, prob: f64) {
        self.transitions.push((from, to, prob));
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Validates the collected data and materializes the transition
    /// matrix.
    pub fn build(self) -> Result<ExplicitModel> {
        let n = self.states.len();
        if self.initial.is_empty() {
            return Err(LeakageError::Model("the model has no initial state".into()));
        }
        if let Some(s) = self.initial.iter().find(|&&s| s >= n) {
            return Err(LeakageError::Model(format!("unknown initial state {}", s)));
        }

        let cells = n.checked_mul(n).ok_or_else(|| {
            LeakageError::ResourceExhausted(format!(
                "transition matrix for {} states overflows", n))
        })?;
        if cells > MAX_DENSE_ENTRIES {
            return Err(LeakageError::ResourceExhausted(format!(
                "building a {}x{} transition matrix ({} cells, limit {})",
                n, n, cells, MAX_DENSE_ENTRIES)));
        }

        let mut matrix = Array2::<f64>::zeros((n, n));
        for &(from, to, prob) in &self.transitions {
            if from >= n || to >= n {
                return Err(LeakageError::Model(format!(
                    "transition {} -> {} refers to an unknown state", from, to)));
            }
            if !(0. ..=1.).contains(&prob) {
                return Err(LeakageError::Model(format!(
                    "transition {} -> {} has probability {} outside [0, 1]",
                    from, to, prob)));
            }
            matrix[[from, to]] += prob;
        }

        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];
        for ((from, to), &prob) in matrix.indexed_iter() {
            if prob > 0. {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }

        for (s, row) in matrix.outer_iter().enumerate() {
            let total = row.sum();
            if !successors[s].is_empty() && (total - 1.).abs() > ROW_SUM_TOLERANCE {
                return Err(LeakageError::Validation(format!(
                    "outgoing probabilities of state {} sum to {}, not 1", s, total)));
            }
        }

        let reachable = reachable_from(&self.initial, &successors, n);

        Ok(ExplicitModel {
            states: self.states,
            initial: self.initial,
            reachable,
            matrix,
            successors,
            predecessors,
        })
    }
}

/// Breadth-first reachability from the initial states.
fn reachable_from(initial: &[StateId], successors: &[Vec<StateId>], n: usize)
        -> Vec<StateId> {
    let mut seen = vec![false; n];
    let mut queue: VecDeque<StateId> = initial.iter().cloned().collect();
    for &s in initial {
        seen[s] = true;
    }

    let mut reachable = Vec::new();
    while let Some(s) = queue.pop_front() {
        reachable.push(s);
        for &t in &successors[s] {
            if !seen[t] {
                seen[t] = true;
                queue.push_back(t);
            }
        }
    }
    reachable.sort_unstable();
    reachable
}

/// A DTMC held entirely in memory.
#[derive(Debug)]
pub struct ExplicitModel {
    states: Vec<State>,
    initial: Vec<StateId>,
    reachable: Vec<StateId>,
    matrix: Array2<f64>,
    successors: Vec<Vec<StateId>>,
    predecessors: Vec<Vec<StateId>>,
}

impl ExplicitModel {
    /// Total number of states, reachable or not.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }
}

impl StateModel for ExplicitModel {
    fn initial_states(&self) -> &[StateId] {
        &self.initial
    }

    fn reachable_states(&self) -> Vec<StateId> {
        self.reachable.clone()
    }

    fn state(&self, s: StateId) -> &State {
        &self.states[s]
    }

    fn successors(&self, s: StateId) -> &[StateId] {
        &self.successors[s]
    }

    fn predecessors(&self, s: StateId) -> &[StateId] {
        &self.predecessors[s]
    }

    fn transition_probability(&self, from: StateId, to: StateId) -> f64 {
        self.matrix[[from, to]]
    }
}
