//! Reachability probabilities of the final states of a quotient.
use std::collections::BTreeMap;
use tracing::debug;

use crate::explorers::bisimulation::{Quotient, QuotientState};
use crate::explorers::paths::{explore_paths, Depth};
use crate::explorers::{Observations, TerminalGroup};
use crate::prior::PriorKnowledge;

/// Probability of reaching each final quotient state from state 0.
#[derive(Debug, Clone)]
pub struct QuotientReachability<'a> {
    quotient: &'a Quotient,
    probabilities: BTreeMap<usize, f64>,
    npaths: usize,
}

impl<'a> QuotientReachability<'a> {
    /// Reach probability of final quotient state `id`.
    pub fn probability(&self, id: usize) -> Option<f64> {
        self.probabilities.get(&id).cloned()
    }

    /// Final quotient states and their reach probabilities, by id.
    pub fn iter(&self) -> impl Iterator<Item = (&'a QuotientState, f64)> + '_ {
        let quotient = self.quotient;
        self.probabilities.iter().map(move |(&id, &p)| (quotient.state(id), p))
    }

    pub fn num_paths(&self) -> usize {
        self.npaths
    }
}

impl<'a> Observations for QuotientReachability<'a> {
    fn terminal_groups(&self, prior: &PriorKnowledge) -> Vec<TerminalGroup> {
        self.iter()
            .map(|(state, weight)| TerminalGroup {
                weight,
                distribution: state.secret_distribution(prior),
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

/// Enumerates the paths of a quotient from its initial state.
pub struct QuotientExplorer<'a> {
    quotient: &'a Quotient,
}

impl<'a> QuotientExplorer<'a> {
    pub fn new(quotient: &'a Quotient) -> QuotientExplorer<'a> {
        QuotientExplorer { quotient }
    }

    /// Sums, for each final quotient state, the products of the edge
    /// probabilities along every path reaching it.
    pub fn explore(&self) -> QuotientReachability<'a> {
        let quotient = self.quotient;
        let mut probabilities = BTreeMap::new();

        let npaths = if quotient.num_states() == 0 {
            0
        } else {
            explore_paths(0, Depth::Unbounded,
                          |q| quotient.transitions_from(q).keys().cloned(),
                          |q| quotient.is_final(q),
                          |path| {
                              // Paths stuck in a non-final state are never
                              // visited.
                              let last = path[path.len() - 1];
                              let p = path.windows(2)
                                          .map(|w| quotient.transition_probability(w[0], w[1]))
                                          .product::<f64>();
                              *probabilities.entry(last).or_insert(0.) += p;
                          })
        };
        debug!("{} quotient paths reach {} final states", npaths, probabilities.len());

        QuotientReachability { quotient, probabilities, npaths }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorers::BisimulationQuotientBuilder;
    use crate::model::{fixtures, ExplicitModelBuilder};
    use float_cmp::approx_eq;

    #[test]
    fn layered_reachability() {
        let model = fixtures::layered();
        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let reach = QuotientExplorer::new(&quotient).explore();

        assert_eq!(reach.len(), 3);
        assert_eq!(reach.num_paths(), 3);
        let by_label = reach.iter()
                            .map(|(q, p)| (q.public.as_str(), p))
                            .collect::<BTreeMap<_, _>>();
        assert_eq!(by_label["done"], 0.5);
        assert_eq!(by_label["p0"], 0.25);
        assert_eq!(by_label["p1"], 0.25);
    }

    #[test]
    fn initial_state_alone() {
        // All initial states are terminal: the quotient is a single final
        // state, reached with probability 1.
        let mut b = ExplicitModelBuilder::new();
        let s0 = b.add_state("init", "0");
        let s1 = b.add_state("init", "1");
        b.add_initial(s0);
        b.add_initial(s1);
        let model = b.build().unwrap();

        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let reach = QuotientExplorer::new(&quotient).explore();
        assert_eq!(reach.probability(0), Some(1.));

        let prior = PriorKnowledge::uniform(&model);
        let groups = reach.terminal_groups(&prior);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].distribution.len(), 2);
    }

    #[test]
    fn dead_ends_carry_no_mass() {
        // A non-final quotient state without lumped successors: its paths
        // are dropped.
        let mut b = ExplicitModelBuilder::new();
        let i = b.add_state("i", "s");
        let loop0 = b.add_state("l", "s");
        let loop1 = b.add_state("l", "s");
        let f = b.add_state("f", "s");
        b.add_initial(i);
        b.add_transition(i, loop0, 0.5);
        b.add_transition(i, f, 0.5);
        b.add_transition(loop0, loop1, 1.);
        b.add_transition(loop1, loop0, 1.);
        let model = b.build().unwrap();

        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let reach = QuotientExplorer::new(&quotient).explore();

        assert_eq!(reach.len(), 1);
        assert!(approx_eq!(f64, reach.total_probability(), 0.5, epsilon = 1e-12));
    }

    #[test]
    fn noisy_channel_groups() {
        let model = fixtures::noisy_channel();
        let prior = PriorKnowledge::uniform(&model);
        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let reach = QuotientExplorer::new(&quotient).explore();

        let groups = reach.terminal_groups(&prior);
        assert_eq!(groups.len(), 2);
        for g in groups {
            assert_eq!(g.weight, 0.5);
            assert_eq!(g.distribution["0"], 0.5);
            assert_eq!(g.distribution["1"], 0.5);
        }
    }
}
