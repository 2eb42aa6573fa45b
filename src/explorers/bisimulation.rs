//! Back-bisimulation quotient of a model.
//!
//! States are partitioned level by level: level 0 is the set of initial
//! states, and level L contains the successors of level L-1 that were not
//! seen at an earlier level. Within a level, two states are placed in the
//! same block iff they have the same back-signature:
//!     - the same public label;
//!     - the same set of blocks of level L-1 containing a predecessor;
//!     - both terminal, or both non-terminal.
//!
//! Each block becomes a quotient state, and quotient states of consecutive
//! levels are connected by their lumped transition probability: for blocks
//! A (level L-1) and B (level L),
//!
//! ```text
//! P(A, B) = Σ_{s ∈ A, t ∈ B} P(s, t) / |A|.
//! ```
//!
//! The lumped probability is exact only when the states merged into A are
//! equally likely; the signature does not check this.
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Range;
use tracing::{debug, info};

use crate::model::StateModel;
use crate::prior::PriorKnowledge;
use crate::security_measures::{secret_distribution, SecretDistribution};
use crate::StateId;

/// Fingerprint deciding block membership within a level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BackSignature {
    public: String,
    // Indexes (within the previous level) of the blocks containing at
    // least one predecessor.
    predecessor_blocks: BTreeSet<usize>,
    terminal: bool,
}

/// A block of states of one level.
#[derive(Debug, Clone)]
struct Block {
    members: Vec<StateId>,
    terminal: bool,
}

/// A state of the quotient: a block of back-bisimilar states.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotientState {
    /// Sequential id; 0 is the initial quotient state.
    pub id: usize,
    pub level: usize,
    /// Public label shared by all members.
    pub public: String,
    /// Secret label of each member (one entry per member).
    pub secrets: Vec<String>,
    pub members: BTreeSet<StateId>,
    pub is_final: bool,
}

impl QuotientState {
    pub fn num_states(&self) -> usize {
        self.members.len()
    }

    /// Distribution of the secret among the members, given the prior.
    pub fn secret_distribution(&self, prior: &PriorKnowledge) -> SecretDistribution {
        secret_distribution(self.secrets.iter().map(String::as_str), prior)
    }
}

/// Quotient states and the lumped transitions between them.
#[derive(Debug, Clone, Default)]
pub struct Quotient {
    states: Vec<QuotientState>,
    // transitions[src][dst] = lumped probability.
    transitions: Vec<BTreeMap<usize, f64>>,
    // Range of quotient ids of each level.
    levels: Vec<Range<usize>>,
}

impl Quotient {
    pub fn states(&self) -> &[QuotientState] {
        &self.states
    }

    pub fn state(&self, id: usize) -> &QuotientState {
        &self.states[id]
    }

    /// Outgoing transitions of quotient state `id`.
    pub fn transitions_from(&self, id: usize) -> &BTreeMap<usize, f64> {
        &self.transitions[id]
    }

    /// Lumped probability of the transition `src -> dst` (0 if absent).
    pub fn transition_probability(&self, src: usize, dst: usize) -> f64 {
        self.transitions.get(src)
                        .and_then(|t| t.get(&dst))
                        .cloned()
                        .unwrap_or(0.)
    }

    /// All transitions as (src, dst, probability).
    pub fn transitions(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.transitions.iter()
                        .enumerate()
                        .flat_map(|(src, t)| t.iter().map(move |(&dst, &p)| (src, dst, p)))
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.iter().map(BTreeMap::len).sum()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Quotient ids of level `level`.
    pub fn level(&self, level: usize) -> Range<usize> {
        self.levels[level].clone()
    }

    pub fn final_states(&self) -> impl Iterator<Item = &QuotientState> {
        self.states.iter().filter(|q| q.is_final)
    }

    pub fn is_final(&self, id: usize) -> bool {
        self.states[id].is_final
    }
}

/// Builds the back-bisimulation quotient of a model.
pub struct BisimulationQuotientBuilder<'a, M: StateModel> {
    model: &'a M,
    verbose: bool,
}

impl<'a, M: StateModel> BisimulationQuotientBuilder<'a, M> {
    pub fn new(model: &'a M) -> BisimulationQuotientBuilder<'a, M> {
        BisimulationQuotientBuilder { model, verbose: false }
    }

    /// Logs level and block counts at `info` level instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> BisimulationQuotientBuilder<'a, M> {
        self.verbose = verbose;
        self
    }

    /// Computes the blocks of every level, then the quotient.
    pub fn build(&self) -> Quotient {
        let levels = self.level_blocks();
        let quotient = self.construct_quotient(&levels);

        let nfinal = quotient.final_states().count();
        if self.verbose {
            info!("quotient: {} levels, {} states ({} final), {} transitions",
                  quotient.num_levels(), quotient.num_states(), nfinal,
                  quotient.num_transitions());
        } else {
            debug!("quotient: {} levels, {} states ({} final), {} transitions",
                   quotient.num_levels(), quotient.num_states(), nfinal,
                   quotient.num_transitions());
        }
        quotient
    }

    /// Level-synchronized partition refinement.
    fn level_blocks(&self) -> Vec<Vec<Block>> {
        let model = self.model;
        let initial = model.initial_states();

        let mut seen: HashSet<StateId> = initial.iter().cloned().collect();
        let mut levels = vec![vec![Block {
            members: initial.to_vec(),
            terminal: initial.iter().all(|&s| model.is_terminal(s)),
        }]];

        loop {
            let previous = &levels[levels.len() - 1];
            let frontier: BTreeSet<StateId> =
                previous.iter()
                        .flat_map(|b| b.members.iter())
                        .flat_map(|&s| model.successors(s).iter().cloned())
                        .filter(|t| !seen.contains(t))
                        .collect();
            if frontier.is_empty() {
                break;
            }

            // Block (within the previous level) of each of its states.
            let block_of: HashMap<StateId, usize> =
                previous.iter()
                        .enumerate()
                        .flat_map(|(i, b)| b.members.iter().map(move |&s| (s, i)))
                        .collect();

            let mut blocks: BTreeMap<BackSignature, Vec<StateId>> = BTreeMap::new();
            for &s in &frontier {
                blocks.entry(self.signature(s, &block_of))
                      .or_insert_with(Vec::new)
                      .push(s);
            }

            let level = blocks.into_iter()
                              .map(|(sig, members)| Block { members, terminal: sig.terminal })
                              .collect::<Vec<_>>();
            if self.verbose {
                info!("level {}: {} states in {} blocks", levels.len(), frontier.len(),
                      level.len());
            } else {
                debug!("level {}: {} states in {} blocks", levels.len(), frontier.len(),
                       level.len());
            }

            seen.extend(frontier);
            levels.push(level);
        }

        levels
    }

    /// Back-signature of state `s`, given the blocks of the previous level.
    fn signature(&self, s: StateId, block_of: &HashMap<StateId, usize>) -> BackSignature {
        BackSignature {
            public: self.model.state(s).public.clone(),
            predecessor_blocks: self.model.predecessors(s)
                                          .iter()
                                          .filter_map(|p| block_of.get(p).cloned())
                                          .collect(),
            terminal: self.model.is_terminal(s),
        }
    }

    /// Turns level blocks into quotient states and lumped transitions.
    fn construct_quotient(&self, levels: &[Vec<Block>]) -> Quotient {
        let model = self.model;
        let mut quotient = Quotient::default();

        for (level, blocks) in levels.iter().enumerate() {
            let start = quotient.states.len();
            let previous = if level > 0 { quotient.levels[level - 1].clone() } else { 0..0 };

            // Quotient id of each state of the previous level.
            let previous_id: HashMap<StateId, usize> =
                previous.clone()
                        .flat_map(|id| quotient.states[id].members.iter().map(move |&s| (s, id)))
                        .collect();

            for block in blocks {
                let id = quotient.states.len();
                let first = block.members[0];

                // Σ P(s, t) for s in each predecessor block, t in this block.
                let mut lumped: BTreeMap<usize, f64> = BTreeMap::new();
                for &t in &block.members {
                    for &s in model.predecessors(t) {
                        if let Some(&src) = previous_id.get(&s) {
                            *lumped.entry(src).or_insert(0.) +=
                                model.transition_probability(s, t);
                        }
                    }
                }

                quotient.transitions.push(BTreeMap::new());
                for (src, total) in lumped {
                    let prob = total / quotient.states[src].num_states() as f64;
                    if prob > 0. {
                        quotient.transitions[src].insert(id, prob);
                    }
                }

                quotient.states.push(QuotientState {
                    id,
                    level,
                    public: model.state(first).public.clone(),
                    secrets: block.members.iter()
                                          .map(|&s| model.state(s).secret.clone())
                                          .collect(),
                    members: block.members.iter().cloned().collect(),
                    is_final: block.terminal,
                });
            }
            debug!("level {} -> quotient states {}", level,
                   (start..quotient.states.len()).join(", "));
            quotient.levels.push(start..quotient.states.len());
        }

        quotient
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, ExplicitModelBuilder};

    #[test]
    fn distinct_outputs_quotient() {
        let model = fixtures::distinct_outputs();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        assert_eq!(quotient.num_levels(), 2);
        assert_eq!(quotient.num_states(), 3);
        assert_eq!(quotient.level(0), 0..1);
        assert_eq!(quotient.level(1), 1..3);

        let initial = quotient.state(0);
        assert_eq!(initial.members, vec![0, 1].into_iter().collect());
        assert!(!initial.is_final);

        // Blocks are ordered by signature: "A" before "B".
        assert_eq!(quotient.state(1).public, "A");
        assert_eq!(quotient.state(1).secrets, vec!["0"]);
        assert_eq!(quotient.state(2).public, "B");
        assert!(quotient.state(1).is_final && quotient.state(2).is_final);

        assert_eq!(quotient.transition_probability(0, 1), 0.5);
        assert_eq!(quotient.transition_probability(0, 2), 0.5);
        assert_eq!(quotient.num_transitions(), 2);
    }

    #[test]
    fn same_output_collapses() {
        let model = fixtures::same_output();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        assert_eq!(quotient.num_states(), 2);
        assert_eq!(quotient.state(1).num_states(), 2);
        assert_eq!(quotient.state(1).secrets, vec!["0", "1"]);
        assert_eq!(quotient.transition_probability(0, 1), 1.);
    }

    #[test]
    fn layered_quotient() {
        let model = fixtures::layered();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        // {start}, {hi}, {lo}, {done}, {p0}, {p1}.
        assert_eq!(quotient.num_levels(), 3);
        assert_eq!(quotient.num_states(), 6);
        assert_eq!(quotient.num_transitions(), 5);

        let by_label = |label: &str| {
            quotient.states().iter().find(|q| q.public == label).unwrap().id
        };
        let (hi, lo) = (by_label("hi"), by_label("lo"));
        let (done, p0, p1) = (by_label("done"), by_label("p0"), by_label("p1"));

        assert_eq!(quotient.transition_probability(0, hi), 0.5);
        assert_eq!(quotient.transition_probability(0, lo), 0.5);
        assert_eq!(quotient.transition_probability(hi, done), 1.);
        assert_eq!(quotient.transition_probability(lo, p0), 0.5);
        assert_eq!(quotient.transition_probability(lo, p1), 0.5);
        assert_eq!(quotient.transition_probability(hi, p0), 0.);

        assert_eq!(quotient.final_states().count(), 3);
        assert_eq!(quotient.state(p1).secrets, vec!["1", "3"]);
    }

    #[test]
    fn ids_are_contiguous_per_level() {
        let model = fixtures::layered();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        let mut next = 0;
        for level in 0..quotient.num_levels() {
            let range = quotient.level(level);
            assert_eq!(range.start, next);
            for id in range.clone() {
                assert_eq!(quotient.state(id).level, level);
            }
            next = range.end;
        }
        assert_eq!(next, quotient.num_states());

        // Nothing ever enters the initial quotient state, and every edge
        // goes one level down.
        for (src, dst, _) in quotient.transitions() {
            assert_ne!(dst, 0);
            assert_eq!(quotient.state(dst).level, quotient.state(src).level + 1);
        }
    }

    #[test]
    fn signature_splits_on_predecessors() {
        // Two states with the same public label, but reached from blocks
        // with different labels, are not merged.
        //
        //     i0 -> a (x) -> f0 (z)
        //     i1 -> b (y) -> f1 (z)
        let mut b = ExplicitModelBuilder::new();
        let i0 = b.add_state("i", "0");
        let i1 = b.add_state("i", "1");
        let a = b.add_state("x", "0");
        let c = b.add_state("y", "1");
        let f0 = b.add_state("z", "0");
        let f1 = b.add_state("z", "1");
        b.add_initial(i0);
        b.add_initial(i1);
        b.add_transition(i0, a, 1.);
        b.add_transition(i1, c, 1.);
        b.add_transition(a, f0, 1.);
        b.add_transition(c, f1, 1.);
        let model = b.build().unwrap();

        let quotient = BisimulationQuotientBuilder::new(&model).build();
        assert_eq!(quotient.num_states(), 5);
        let finals = quotient.final_states().collect::<Vec<_>>();
        assert_eq!(finals.len(), 2);
        assert!(finals.iter().all(|q| q.public == "z" && q.num_states() == 1));
    }

    #[test]
    fn signature_splits_on_terminal_flag() {
        // Same label and predecessors, but only one of them is terminal.
        let mut b = ExplicitModelBuilder::new();
        let i = b.add_state("i", "s");
        let t = b.add_state("m", "s");
        let u = b.add_state("m", "s");
        let f = b.add_state("f", "s");
        b.add_initial(i);
        b.add_transition(i, t, 0.5);
        b.add_transition(i, u, 0.5);
        b.add_transition(u, f, 1.);
        let model = b.build().unwrap();

        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let level1 = quotient.level(1);
        assert_eq!(level1.len(), 2);
        assert_eq!(level1.filter(|&id| quotient.is_final(id)).count(), 1);
    }

    #[test]
    fn absorbing_states_end_level_generation() {
        let model = fixtures::noisy_channel();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        assert_eq!(quotient.num_levels(), 2);
        assert!(quotient.transitions_from(1).is_empty());
        assert!(quotient.transitions_from(2).is_empty());
    }
}
