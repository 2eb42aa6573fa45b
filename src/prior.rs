//! Prior knowledge: the distribution of the secret before any observation.
//!
//! The prior is either uniform over the initial states, or read from a
//! file containing one probability per initial state, e.g.:
//!
//! ```text
//! 0.25
//! 0.5
//! 0.25
//! ```
//!
//! where the i-th value is assigned to the secret label of the i-th
//! initial state (in the model's enumeration order).
use csv::{ReaderBuilder, Trim};
use float_cmp::approx_eq;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{LeakageError, Result};
use crate::model::StateModel;
use crate::StateId;

/// Tolerance on the sum of a prior distribution.
pub const PRIOR_SUM_TOLERANCE: f64 = 0.001;

/// Probability distribution over secret labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorKnowledge {
    probabilities: BTreeMap<String, f64>,
    // Mass of each initial state, in enumeration order.
    initial_weights: Vec<(StateId, f64)>,
}

impl PriorKnowledge {
    /// Assigns 1/N to the secret of each of the N initial states.
    ///
    /// Initial states sharing a secret label add up their mass.
    pub fn uniform<M: StateModel>(model: &M) -> PriorKnowledge {
        let initial = model.initial_states();
        let mass = 1. / initial.len() as f64;
        let initial_weights = initial.iter().map(|&s| (s, mass)).collect();
        PriorKnowledge::from_weights(initial_weights, model)
    }

    /// Assigns `values` positionally to the secrets of the initial states.
    ///
    /// Fails if there isn't exactly one value per initial state, or if
    /// the values don't sum to 1 (within `PRIOR_SUM_TOLERANCE`).
    pub fn from_values<M: StateModel>(values: &[f64], model: &M)
            -> Result<PriorKnowledge> {
        let initial = model.initial_states();
        if values.len() != initial.len() {
            return Err(LeakageError::Validation(format!(
                "the prior should contain {} probabilities (one per initial state), found {}",
                initial.len(), values.len())));
        }
        if let Some(p) = values.iter().find(|p| !(0. ..=1.).contains(*p)) {
            return Err(LeakageError::Validation(format!(
                "prior probability {} is outside [0, 1]", p)));
        }

        let sum: f64 = values.iter().sum();
        if !approx_eq!(f64, sum, 1., epsilon = PRIOR_SUM_TOLERANCE) {
            return Err(LeakageError::Validation(format!(
                "prior probabilities sum to {}, should be equal to 1.0", sum)));
        }

        let initial_weights = initial.iter().cloned().zip(values.iter().cloned()).collect();
        Ok(PriorKnowledge::from_weights(initial_weights, model))
    }

    /// Sums the mass of initial states sharing a secret.
    fn from_weights<M: StateModel>(initial_weights: Vec<(StateId, f64)>, model: &M)
            -> PriorKnowledge {
        let mut probabilities = BTreeMap::new();
        for &(s, p) in &initial_weights {
            *probabilities.entry(model.state(s).secret.clone())
                          .or_insert(0.) += p;
        }
        PriorKnowledge { probabilities, initial_weights }
    }

    /// Reads one probability per non-blank line of `path`.
    pub fn from_file<M: StateModel, P: AsRef<Path>>(path: P, model: &M)
            -> Result<PriorKnowledge> {
        let path = path.as_ref();
        let values = read_probabilities(path)?;
        PriorKnowledge::from_values(&values, model)
    }

    /// Probability mass carried by each initial state: 1/N each for a
    /// uniform prior, or the value given for that state.
    pub fn initial_state_weights(&self) -> &[(StateId, f64)] {
        &self.initial_weights
    }

    /// Prior probability of a secret label (0 if the label is unknown).
    pub fn get(&self, secret: &str) -> f64 {
        self.probabilities.get(secret).cloned().unwrap_or(0.)
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Secret labels and their probabilities, ordered by label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probabilities.iter().map(|(s, &p)| (s.as_str(), p))
    }

    pub fn probabilities(&self) -> &BTreeMap<String, f64> {
        &self.probabilities
    }
}

/// Parses a file containing one floating point value per line.
fn read_probabilities(path: &Path) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
                                   .has_headers(false)
                                   .flexible(true)
                                   .trim(Trim::All)
                                   .from_path(path)
                                   .map_err(|e| LeakageError::from_csv(path, e))?;

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LeakageError::from_csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Blank lines are skipped.
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != 1 {
            return Err(LeakageError::Format {
                path: path.to_owned(),
                line,
                message: format!("expected one probability, found {} fields",
                                 record.len()),
            });
        }
        let value = record[0].parse::<f64>().map_err(|e| LeakageError::Format {
            path: path.to_owned(),
            line,
            message: format!("could not parse \"{}\" as a probability: {}", &record[0], e),
        })?;
        values.push(value);
    }
    Ok(values)
}
