//! Definitions of uncertainty and leakage measures.
//!
//! In the documentation, we write H for the chosen entropy (Shannon or
//! min-entropy), π for the prior over secrets, and g for a terminal group:
//! either a trace (with the group of final states it reaches) or a final
//! quotient state. Every group has a weight P(g), the probability of
//! observing it, and a posterior secret distribution μ_g.
//!
//! # References
//! [1] G. Smith. "On the Foundations of Quantitative Information Flow."
//!     FoSSaCS, 2009.
//! [2] A. A. Noroozi et al. "Information leakage of multi-threaded
//!     programs." Computers & Electrical Engineering, 2019.
use float_cmp::approx_eq;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::explorers::TerminalGroup;
use crate::prior::PriorKnowledge;

/// Entropies or probabilities closer than this are considered equal when
/// looking for extremal groups or the most probable observations.
pub const COMPARISON_TOLERANCE: f64 = 1e-12;

/// Posterior distribution over secret labels.
pub type SecretDistribution = BTreeMap<String, f64>;

/// The uncertainty measure used for every computation of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EntropyKind {
    Shannon,
    MinEntropy,
}

impl Default for EntropyKind {
    fn default() -> EntropyKind {
        EntropyKind::Shannon
    }
}

impl FromStr for EntropyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<EntropyKind, String> {
        match s.to_lowercase().as_str() {
            "shannon" => Ok(EntropyKind::Shannon),
            "min" | "min-entropy" | "minentropy" => Ok(EntropyKind::MinEntropy),
            other => Err(format!("unknown entropy \"{}\" (use shannon or min-entropy)",
                                 other)),
        }
    }
}

impl fmt::Display for EntropyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntropyKind::Shannon => write!(f, "Shannon entropy"),
            EntropyKind::MinEntropy => write!(f, "min-entropy"),
        }
    }
}

/// Distribution of the secret within a group of states, conditioned on
/// the prior.
///
/// `secrets` contains the secret label of each state in the group (one
/// entry per state, repetitions allowed). The probability of secret v is
/// proportional to π(v) times the multiplicity of v in the group.
/// If every secret in the group has prior 0, the distribution is empty.
pub fn secret_distribution<'a, I>(secrets: I, prior: &PriorKnowledge) -> SecretDistribution
where I: IntoIterator<Item = &'a str> {
    let mut frequencies: BTreeMap<&str, usize> = BTreeMap::new();
    for secret in secrets {
        *frequencies.entry(secret).or_insert(0) += 1;
    }

    let weighted = frequencies.into_iter()
                              .map(|(s, f)| (s, prior.get(s) * f as f64))
                              .collect::<Vec<_>>();
    let denom: f64 = weighted.iter().map(|(_, w)| w).sum();
    if denom == 0. {
        return SecretDistribution::new();
    }

    weighted.into_iter()
            .map(|(s, w)| (s.to_owned(), w / denom))
            .collect()
}

/// Computes the Shannon entropy: -Σ p log2(p).
pub fn shannon_entropy<'a, I>(probabilities: I) -> f64
where I: IntoIterator<Item = &'a f64> {
    -probabilities.into_iter()
                  .filter(|&&p| p > 0.)
                  .map(|&p| p * p.log2())
                  .sum::<f64>()
}

/// Computes the min-entropy: -log2(max p).
///
/// The min-entropy of an empty distribution is taken to be 0.
pub fn min_entropy<'a, I>(probabilities: I) -> f64
where I: IntoIterator<Item = &'a f64> {
    match probabilities.into_iter().map(|&p| OrderedFloat(p)).max() {
        Some(OrderedFloat(max)) if max > 0. => -max.log2(),
        _ => 0.,
    }
}

/// Computes the entropy of the chosen kind.
pub fn entropy<'a, I>(probabilities: I, kind: EntropyKind) -> f64
where I: IntoIterator<Item = &'a f64> {
    match kind {
        EntropyKind::Shannon => shannon_entropy(probabilities),
        EntropyKind::MinEntropy => min_entropy(probabilities),
    }
}

/// Computes the initial uncertainty H(π).
pub fn initial_uncertainty(prior: &PriorKnowledge, kind: EntropyKind) -> f64 {
    entropy(prior.probabilities().values(), kind)
}

/// Computes the remaining uncertainty Σ_g P(g) H(μ_g).
pub fn remaining_uncertainty(groups: &[TerminalGroup], kind: EntropyKind) -> f64 {
    groups.iter()
          .map(|g| g.weight * g.entropy(kind))
          .sum()
}

/// Computes the expected leakage: initial minus remaining uncertainty.
pub fn expected_leakage(prior: &PriorKnowledge, groups: &[TerminalGroup],
                        kind: EntropyKind) -> f64 {
    initial_uncertainty(prior, kind) - remaining_uncertainty(groups, kind)
}

/// Smallest H(μ_g) over all groups.
pub fn minimum_entropy(groups: &[TerminalGroup], kind: EntropyKind) -> Option<f64> {
    groups.iter()
          .map(|g| OrderedFloat(g.entropy(kind)))
          .min()
          .map(|e| e.into_inner())
}

/// Largest H(μ_g) over all groups.
pub fn maximum_entropy(groups: &[TerminalGroup], kind: EntropyKind) -> Option<f64> {
    groups.iter()
          .map(|g| OrderedFloat(g.entropy(kind)))
          .max()
          .map(|e| e.into_inner())
}

/// Computes the maximum leakage: H(π) - min_g H(μ_g).
///
/// Without any group, nothing is observed and the leakage is 0.
pub fn max_leakage(prior: &PriorKnowledge, groups: &[TerminalGroup],
                   kind: EntropyKind) -> f64 {
    let initial = initial_uncertainty(prior, kind);
    initial - minimum_entropy(groups, kind).unwrap_or(initial)
}

/// Computes the minimum leakage: H(π) - max_g H(μ_g).
pub fn min_leakage(prior: &PriorKnowledge, groups: &[TerminalGroup],
                   kind: EntropyKind) -> f64 {
    let initial = initial_uncertainty(prior, kind);
    initial - maximum_entropy(groups, kind).unwrap_or(initial)
}

/// Returns true if `a` and `b` are equal up to `COMPARISON_TOLERANCE`.
pub fn approx_equal(a: f64, b: f64) -> bool {
    approx_eq!(f64, a, b, epsilon = COMPARISON_TOLERANCE, ulps = 4)
}

/// Total weight of the groups whose entropy is `target`.
fn weight_at_entropy(groups: &[TerminalGroup], kind: EntropyKind, target: f64) -> f64 {
    groups.iter()
          .filter(|g| approx_equal(g.entropy(kind), target))
          .map(|g| g.weight)
          .sum()
}

/// Probability of observing a group that attains the maximum leakage.
pub fn prob_max_leakage(groups: &[TerminalGroup], kind: EntropyKind) -> f64 {
    match minimum_entropy(groups, kind) {
        Some(min) => weight_at_entropy(groups, kind, min),
        None => 0.,
    }
}

/// Probability of observing a group that attains the minimum leakage.
pub fn prob_min_leakage(groups: &[TerminalGroup], kind: EntropyKind) -> f64 {
    match maximum_entropy(groups, kind) {
        Some(max) => weight_at_entropy(groups, kind, max),
        None => 0.,
    }
}

/// Probability of complete leakage, i.e., of observing a group after
/// which the secret is known with certainty (entropy 0).
pub fn prob_complete_leakage(groups: &[TerminalGroup], kind: EntropyKind) -> f64 {
    weight_at_entropy(groups, kind, 0.)
}

/// Returns the keys whose probability is (up to `COMPARISON_TOLERANCE`) the
/// largest in `table`.
pub fn most_probable<'a, K, I>(table: I) -> Vec<K>
where K: Clone + 'a, I: IntoIterator<Item = (&'a K, &'a f64)> + Clone {
    let max = match table.clone().into_iter().map(|(_, &p)| OrderedFloat(p)).max() {
        Some(OrderedFloat(max)) => max,
        None => return vec![],
    };
    table.into_iter()
         .filter(|(_, p)| approx_equal(**p, max))
         .map(|(k, _)| k.clone())
         .collect()
}

/// All the measures of a run, computed at once.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakageMeasures {
    pub initial_uncertainty: f64,
    pub remaining_uncertainty: f64,
    pub expected_leakage: f64,
    pub max_leakage: f64,
    pub min_leakage: f64,
    pub prob_max_leakage: f64,
    pub prob_min_leakage: f64,
    pub prob_complete_leakage: f64,
}

impl LeakageMeasures {
    pub fn compute(prior: &PriorKnowledge, groups: &[TerminalGroup],
                   kind: EntropyKind) -> LeakageMeasures {
        let initial_uncertainty = initial_uncertainty(prior, kind);
        let remaining_uncertainty = remaining_uncertainty(groups, kind);

        LeakageMeasures {
            initial_uncertainty,
            remaining_uncertainty,
            expected_leakage: initial_uncertainty - remaining_uncertainty,
            max_leakage: max_leakage(prior, groups, kind),
            min_leakage: min_leakage(prior, groups, kind),
            prob_max_leakage: prob_max_leakage(groups, kind),
            prob_min_leakage: prob_min_leakage(groups, kind),
            prob_complete_leakage: prob_complete_leakage(groups, kind),
        }
    }
}
