//! Errors raised while loading models and priors or computing leakage.
//!
//! Every error aborts the current computation: there is no partial
//! leakage report.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeakageError {
    /// A file could not be opened or read.
    #[error("I/O error reading \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of an input file could not be parsed.
    #[error("error detected at line {line} of file \"{}\": {message}", path.display())]
    Format {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// The input parsed, but violates a constraint (counts, sums).
    #[error("validation error: {0}")]
    Validation(String),

    /// The model representation could not be materialized.
    #[error("out of memory: {0}")]
    ResourceExhausted(String),

    /// The model refers to states or probabilities that make no sense.
    #[error("invalid model: {0}")]
    Model(String),
}

impl LeakageError {
    /// Wraps a `csv` error, keeping the offending line when there is one.
    pub(crate) fn from_csv(path: &std::path::Path, err: csv::Error) -> LeakageError {
        let line = err.position().map(|p| p.line());
        match err.into_kind() {
            csv::ErrorKind::Io(source) => LeakageError::Io {
                path: path.to_owned(),
                source,
            },
            kind => LeakageError::Format {
                path: path.to_owned(),
                line: line.unwrap_or(0),
                message: format!("{:?}", kind),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LeakageError>;
