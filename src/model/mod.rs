//! The state/transition oracle leakage is computed against.
//!
//! The leakage engine never looks inside the model representation: it only
//! asks for initial states, successors, predecessors and transition
//! probabilities through the `StateModel` trait. `ExplicitModel` is the
//! in-memory implementation shipped with this crate.
pub mod explicit;
#[cfg(test)]
pub(crate) mod fixtures;

pub use self::explicit::{ExplicitModel, ExplicitModelBuilder, MAX_DENSE_ENTRIES};

use crate::StateId;

/// A state of a DTMC, carrying an observable and a confidential label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub id: StateId,
    pub public: String,
    pub secret: String,
}

impl State {
    pub fn new(id: StateId, public: &str, secret: &str) -> State {
        State {
            id,
            public: public.to_owned(),
            secret: secret.to_owned(),
        }
    }
}

/// Oracle over a discrete-time Markov chain.
pub trait StateModel {
    /// Initial states, in enumeration order.
    fn initial_states(&self) -> &[StateId];
    /// All reachable states.
    fn reachable_states(&self) -> Vec<StateId>;
    /// Looks up the labels of a state.
    fn state(&self, s: StateId) -> &State;
    /// Successors of `s`; a self-loop is included if present.
    fn successors(&self, s: StateId) -> &[StateId];
    /// Predecessors of `s`; a self-loop is included if present.
    fn predecessors(&self, s: StateId) -> &[StateId];
    /// Probability of moving from `from` to `to` in one step.
    fn transition_probability(&self, from: StateId, to: StateId) -> f64;

    /// A state is terminal if it has no successor, or its only successor
    /// is itself.
    fn is_terminal(&self, s: StateId) -> bool {
        match self.successors(s) {
            [] => true,
            [only] => *only == s,
            _ => false,
        }
    }
}
