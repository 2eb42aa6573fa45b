//! Leakage computation routines.
//!
//! Given a model and a configuration, `compute_leakage` loads the prior,
//! runs the chosen exploration and returns a `LeakageReport` containing:
//!     - the initial and remaining uncertainty
//!     - the expected, maximum and minimum leakage
//!     - the probabilities of maximum, minimum and complete leakage
//!     - (trace exploration only) the most probable traces.
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::Result;
use crate::explorers::{BisimulationQuotientBuilder, Depth, Observations, Quotient,
                       QuotientExplorer, TraceExplorer, TraceTable};
use crate::model::StateModel;
use crate::prior::PriorKnowledge;
use crate::security_measures::{EntropyKind, LeakageMeasures};
use crate::Trace;

/// Largest difference in expected leakage for which two reports agree.
pub const AGREEMENT_TOLERANCE: f64 = 1e-9;

/// How the observations of a model are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Enumerate every path, and group paths by trace.
    TraceExploration,
    /// Build the back-bisimulation quotient, and explore it instead.
    BackBisimulation,
}

impl Default for Method {
    fn default() -> Method {
        Method::TraceExploration
    }
}

/// Where the prior over secrets comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorSource {
    Uniform,
    File(PathBuf),
}

impl Default for PriorSource {
    fn default() -> PriorSource {
        PriorSource::Uniform
    }
}

impl PriorSource {
    pub fn load<M: StateModel>(&self, model: &M) -> Result<PriorKnowledge> {
        match self {
            PriorSource::Uniform => Ok(PriorKnowledge::uniform(model)),
            PriorSource::File(path) => PriorKnowledge::from_file(path, model),
        }
    }
}

/// Options of a leakage computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeakageConfig {
    pub method: Method,
    /// Maximum number of transitions of an explored path. Only applies to
    /// trace exploration.
    pub bounded: Option<usize>,
    pub entropy: EntropyKind,
    pub prior: PriorSource,
    /// Log level, block and quotient counts at `info` level.
    pub verbose_diagnostics: bool,
}

impl LeakageConfig {
    fn depth(&self) -> Depth {
        match self.bounded {
            Some(k) => Depth::Bounded(k),
            None => Depth::Unbounded,
        }
    }
}

/// Outcome of a leakage computation.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakageReport {
    pub method: Method,
    pub entropy: EntropyKind,
    pub initial_uncertainty: f64,
    pub remaining_uncertainty: f64,
    pub expected_leakage: f64,
    pub max_leakage: f64,
    pub min_leakage: f64,
    pub prob_max_leakage: f64,
    pub prob_min_leakage: f64,
    pub prob_complete_leakage: f64,
    /// Number of observations (traces, or final quotient states).
    pub num_groups: usize,
    /// Probability mass of all observations; less than 1 if some paths
    /// never reach a terminal state.
    pub observed_probability: f64,
    pub most_probable_traces: Option<Vec<Trace>>,
}

impl LeakageReport {
    /// Computes every measure over the observations of a run.
    pub fn from_observations<O: Observations>(observations: &O, prior: &PriorKnowledge,
                                              method: Method, entropy: EntropyKind)
            -> LeakageReport {
        let groups = observations.terminal_groups(prior);
        let m = LeakageMeasures::compute(prior, &groups, entropy);

        LeakageReport {
            method,
            entropy,
            initial_uncertainty: m.initial_uncertainty,
            remaining_uncertainty: m.remaining_uncertainty,
            expected_leakage: m.expected_leakage,
            max_leakage: m.max_leakage,
            min_leakage: m.min_leakage,
            prob_max_leakage: m.prob_max_leakage,
            prob_min_leakage: m.prob_min_leakage,
            prob_complete_leakage: m.prob_complete_leakage,
            num_groups: groups.len(),
            observed_probability: observations.total_probability(),
            most_probable_traces: None,
        }
    }

    /// Report for a trace table, including its most probable traces.
    pub fn from_traces(table: &TraceTable, prior: &PriorKnowledge, entropy: EntropyKind)
            -> LeakageReport {
        let mut report = LeakageReport::from_observations(table, prior,
                                                          Method::TraceExploration,
                                                          entropy);
        report.most_probable_traces = Some(table.most_probable_traces());
        report
    }

    /// Returns true if both reports have the same expected leakage, up to
    /// `AGREEMENT_TOLERANCE`.
    ///
    /// Trace exploration and back-bisimulation only agree when the states
    /// merged into each quotient block are equally likely.
    pub fn agrees_with(&self, other: &LeakageReport) -> bool {
        (self.expected_leakage - other.expected_leakage).abs() <= AGREEMENT_TOLERANCE
    }
}

/// Main leakage computation.
///
/// Fails if the prior cannot be loaded; nothing is explored in that case.
pub fn compute_leakage<M: StateModel>(model: &M, config: &LeakageConfig)
        -> Result<LeakageReport> {
    let prior = config.prior.load(model)?;
    info!("prior over {} secrets, {}", prior.len(), config.entropy);

    let report = match config.method {
        Method::TraceExploration => {
            let table = explore_traces(model, &prior, config);
            LeakageReport::from_traces(&table, &prior, config.entropy)
        },
        Method::BackBisimulation => {
            let quotient = build_quotient(model, config);
            let reachability = QuotientExplorer::new(&quotient).explore();
            info!("{} final quotient states reached", reachability.len());
            LeakageReport::from_observations(&reachability, &prior,
                                             Method::BackBisimulation, config.entropy)
        },
    };
    Ok(report)
}

/// Runs trace exploration with the depth set in `config`.
pub fn explore_traces<M: StateModel>(model: &M, prior: &PriorKnowledge,
                                     config: &LeakageConfig) -> TraceTable {
    let table = TraceExplorer::new(model, prior).explore(config.depth());
    info!("{} traces from {} paths", table.len(), table.num_paths());
    table
}

/// Builds the back-bisimulation quotient of `model`. The quotient is
/// always explored in full, so a bound in `config` is ignored.
pub fn build_quotient<M: StateModel>(model: &M, config: &LeakageConfig) -> Quotient {
    if config.bounded.is_some() {
        warn!("bounded exploration only applies to trace exploration; ignoring it");
    }
    BisimulationQuotientBuilder::new(model)
                               .verbose(config.verbose_diagnostics)
                               .build()
}
