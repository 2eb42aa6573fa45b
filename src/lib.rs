//! dtleak is a tool for quantifying how much a probabilistic program leaks
//! about its secrets to an observer that only sees its public outputs.
//!
//! Programs are modeled as discrete-time Markov chains (DTMCs) whose states
//! carry a public (observable) label and a secret (confidential) label.
//! Given a prior distribution over the secret at the initial states, dtleak
//! computes what an observer learns by watching the sequence of public
//! labels of an execution, expressed as an entropy-based leakage measure
//! (Shannon entropy or min-entropy).
//!
//! Two computations are available:
//!
//! - **trace exploration** enumerates every path to a terminal state,
//!   groups paths by their trace, and derives the secret distribution
//!   behind each trace;
//! - **back-bisimulation** collapses the model into a quotient whose
//!   states are blocks of backward-bisimilar states, and explores that
//!   smaller machine instead. Both give the same result when the states
//!   merged into each block are equally likely.
//!
//! # Getting started
//!
//! dtleak is mainly used via the binary it provides, `dtleak`, which reads
//! an explicit model from two CSV files (states and transitions).
//! For usage instructions run `dtleak -h`.
//!
//! From the library:
//!
//! ```
//! use dtleak::model::ExplicitModelBuilder;
//! use dtleak::{compute_leakage, LeakageConfig};
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
//! let model = builder.build().unwrap();
//!
//! let report = compute_leakage(&model, &LeakageConfig::default()).unwrap();
//! assert_eq!(report.expected_leakage, 1.);
//! ```
//!
//! # References
//!
//! [1] 2009, "On the Foundations of Quantitative Information Flow". _Geoffrey Smith_
//!
//! [2] 2020, "Information leakage of multi-threaded programs". _Ali A. Noroozi, Jaber Karimpour, Ayaz Isazadeh_
pub mod error;
pub mod explorers;
pub mod leakage_computation;
pub mod model;
pub mod prior;
pub mod security_measures;
pub mod utils;

pub use crate::error::{LeakageError, Result};
pub use crate::leakage_computation::{compute_leakage, LeakageConfig, LeakageReport, Method,
                                     PriorSource};
pub use crate::prior::PriorKnowledge;
pub use crate::security_measures::EntropyKind;

/// Identifier of a state of the model.
pub type StateId = usize;

/// Sequence of public labels along one execution.
pub type Trace = Vec<String>;
