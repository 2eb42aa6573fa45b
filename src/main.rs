//! dtleak quantifies how much a probabilistic program, modeled as a DTMC,
//! leaks about its secrets to an observer of its public outputs.
//!
//! # Getting started
//!
//! dtleak takes as input an explicit model, given as two CSV files.
//! A _states_ file, such as:
//!
//!     0, init, 0, 1
//!     1, init, 1, 1
//!     2, A, 0, 0
//!     3, B, 1, 0
//!
//! where the columns are the state id, its public label, its secret label,
//! and whether it is initial (0/1); and a _transitions_ file:
//!
//!     0, 2, 1.0
//!     1, 3, 1.0
//!
//! where the columns are source, destination and probability.
//!
//! The general syntax is:
//!
//!     dtleak <command> [options] <states> <transitions>
//!
//! ## Commands
//!
//! **traces** Enumerates every path to a terminal state, and groups them by
//! trace (the sequence of public labels an observer sees).
//!
//! **bisim** Builds the back-bisimulation quotient of the model, and
//! explores it instead. It gives the same result as **traces** when the
//! states merged into each quotient block are equally likely; otherwise
//! the results differ.
//!
//! **compare** Runs both, and reports whether they agree.
//!
//! ## Further options
//!
//! By default, leakage is measured with Shannon entropy under a uniform
//! prior over the initial states. `--entropy=min-entropy` switches to
//! min-entropy, and `--prior` reads one prior probability per initial state
//! from a file.
//!
//! `--bound=<k>` stops trace exploration after `k` transitions.
use docopt::Docopt;
use serde::Deserialize;
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dtleak::explorers::QuotientExplorer;
use dtleak::leakage_computation::{build_quotient, explore_traces};
use dtleak::model::StateModel;
use dtleak::utils::{load_model, store_quotient_dot, write_trace_table};
use dtleak::{EntropyKind, LeakageConfig, LeakageError, LeakageReport, Method, PriorSource, Result};

const USAGE: &str = "
Quantify the information leakage of a DTMC.

Usage: dtleak traces [options] <states> <transitions>
       dtleak bisim [options] <states> <transitions>
       dtleak compare [options] <states> <transitions>
       dtleak (--help | --version)

Options:
    --entropy=<kind>            Entropy used to measure uncertainty:
                                shannon or min-entropy [default: shannon].
    --prior=<file>              File containing one prior probability per
                                initial state. Default is uniform.
    --bound=<k>                 Only explore paths of up to k transitions
                                (traces only).
    --dot=<file>                Store the quotient in DOT format (bisim
                                and compare).
    --traces-csv=<file>         Store the trace table as CSV (traces and
                                compare).
    --verbose                   Log quotient statistics.
    -h, --help                  Show help.
    --version                   Show the version.
";

#[derive(Deserialize)]
struct Args {
    cmd_traces: bool,
    cmd_bisim: bool,
    cmd_compare: bool,
    flag_entropy: String,
    flag_prior: Option<String>,
    flag_bound: Option<usize>,
    flag_dot: Option<String>,
    flag_traces_csv: Option<String>,
    flag_verbose: bool,
    arg_states: String,
    arg_transitions: String,
}

/// Prints every measure of a report.
fn print_all_measures(report: &LeakageReport) {
    println!("Initial uncertainty: {}", report.initial_uncertainty);
    println!("Remaining uncertainty: {}", report.remaining_uncertainty);
    println!("Expected leakage: {}", report.expected_leakage);
    println!("Maximum leakage: {}", report.max_leakage);
    println!("Minimum leakage: {}", report.min_leakage);
    println!("Probability of maximum leakage: {}", report.prob_max_leakage);
    println!("Probability of minimum leakage: {}", report.prob_min_leakage);
    println!("Probability of complete leakage: {}", report.prob_complete_leakage);
    if let Some(ref traces) = report.most_probable_traces {
        for trace in traces {
            println!("Most probable trace: {}", trace.join(" -> "));
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let entropy = args.flag_entropy.parse::<EntropyKind>()
                                   .map_err(LeakageError::Validation)?;
    let config = LeakageConfig {
        method: if args.cmd_bisim { Method::BackBisimulation } else { Method::TraceExploration },
        bounded: args.flag_bound,
        entropy,
        prior: match args.flag_prior {
            Some(ref path) => PriorSource::File(PathBuf::from(path)),
            None => PriorSource::Uniform,
        },
        verbose_diagnostics: args.flag_verbose,
    };

    if args.flag_dot.is_some() && args.cmd_traces {
        warn!("--dot only applies to bisim and compare; ignoring it");
    }
    if args.flag_traces_csv.is_some() && args.cmd_bisim {
        warn!("--traces-csv only applies to traces and compare; ignoring it");
    }

    let model = load_model(&args.arg_states, &args.arg_transitions)?;
    println!("Model: {} states, {} transitions, {} reachable", model.num_states(),
             model.num_transitions(), model.reachable_states().len());
    let prior = config.prior.load(&model)?;
    println!("Measuring leakage with {}", config.entropy);

    let traces = if args.cmd_traces || args.cmd_compare {
        let table = explore_traces(&model, &prior, &config);
        if let Some(ref path) = args.flag_traces_csv {
            write_trace_table(&table, path)?;
        }
        let report = LeakageReport::from_traces(&table, &prior, config.entropy);

        println!();
        println!("[*] Trace exploration: {} traces", report.num_groups);
        print_all_measures(&report);
        Some(report)
    } else {
        None
    };

    let bisim = if args.cmd_bisim || args.cmd_compare {
        let quotient = build_quotient(&model, &config);
        if let Some(ref path) = args.flag_dot {
            store_quotient_dot(&quotient, path)?;
        }
        let reachability = QuotientExplorer::new(&quotient).explore();
        let report = LeakageReport::from_observations(&reachability, &prior,
                                                      Method::BackBisimulation,
                                                      config.entropy);

        println!();
        println!("[*] Back-bisimulation: {} quotient states, {} final",
                 quotient.num_states(), report.num_groups);
        print_all_measures(&report);
        Some(report)
    } else {
        None
    };

    if let (Some(traces), Some(bisim)) = (traces, bisim) {
        println!();
        if traces.agrees_with(&bisim) {
            println!("[*] Both methods agree on the expected leakage");
        } else {
            // Some quotient block merges states that are not equally likely.
            println!("[!] Methods disagree on the expected leakage (difference: {})",
                     (traces.expected_leakage - bisim.expected_leakage).abs());
            process::exit(2);
        }
    }

    Ok(())
}

fn main() {
    // Parse args from command line.
    let args: Args = Docopt::new(USAGE)
                            .and_then(|d| d.version(Some(env!("CARGO_PKG_VERSION").into()))
                                           .deserialize())
                            .unwrap_or_else(|e| e.exit());

    let default_level = if args.flag_verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
                                   .unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("[!] {}", e);
        process::exit(1);
    }
}
