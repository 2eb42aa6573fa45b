//! Utility routines for loading models from files, and storing
//! quotients and trace tables into files.
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{LeakageError, Result};
use crate::explorers::{Quotient, TraceTable};
use crate::model::{ExplicitModel, ExplicitModelBuilder};

/// A row of the states file.
#[derive(Debug, Deserialize)]
struct StateRecord {
    id: usize,
    public: String,
    secret: String,
    initial: String,
}

/// A row of the transitions file.
#[derive(Debug, Deserialize)]
struct TransitionRecord {
    src: usize,
    dst: usize,
    probability: f64,
}

/// Reads every non-blank record of a headerless CSV file, along with its
/// line number.
fn read_records(path: &Path) -> Result<Vec<(u64, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
                                   .has_headers(false)
                                   .flexible(true)
                                   .trim(Trim::All)
                                   .from_path(path)
                                   .map_err(|e| LeakageError::from_csv(path, e))?;

    let mut records = vec![];
    for result in reader.records() {
        let record = result.map_err(|e| LeakageError::from_csv(path, e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push((line, record));
    }
    Ok(records)
}

fn parse_record<'de, T: Deserialize<'de>>(path: &Path, line: u64, record: &'de StringRecord)
        -> Result<T> {
    record.deserialize(None).map_err(|e| LeakageError::Format {
        path: path.to_owned(),
        line,
        message: match e.kind() {
            csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
            kind => format!("{:?}", kind),
        },
    })
}

fn parse_flag(path: &Path, line: u64, flag: &str) -> Result<bool> {
    match flag.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(LeakageError::Format {
            path: path.to_owned(),
            line,
            message: format!("\"{}\" is not a valid initial flag (use 0/1 or true/false)",
                             other),
        }),
    }
}

/// Loads an explicit model from a states file and a transitions file.
///
/// The states file should contain, for each row:
///     id, public, secret, initial
/// where `initial` is 0/1 (or false/true). The transitions file should
/// contain, for each row:
///     src, dst, probability
/// where `src` and `dst` are ids from the states file.
pub fn load_model<P: AsRef<Path>, Q: AsRef<Path>>(states_path: P, transitions_path: Q)
        -> Result<ExplicitModel> {
    let (states_path, transitions_path) = (states_path.as_ref(), transitions_path.as_ref());
    let mut builder = ExplicitModelBuilder::new();
    // File id -> model id.
    let mut ids = HashMap::new();

    for (line, record) in read_records(states_path)? {
        let state: StateRecord = parse_record(states_path, line, &record)?;
        let initial = parse_flag(states_path, line, &state.initial)?;
        if ids.contains_key(&state.id) {
            return Err(LeakageError::Format {
                path: states_path.to_owned(),
                line,
                message: format!("state {} is defined twice", state.id),
            });
        }

        let s = builder.add_state(&state.public, &state.secret);
        ids.insert(state.id, s);
        if initial {
            builder.add_initial(s);
        }
    }

    for (line, record) in read_records(transitions_path)? {
        let t: TransitionRecord = parse_record(transitions_path, line, &record)?;
        let lookup = |id: usize| ids.get(&id).cloned().ok_or_else(|| LeakageError::Format {
            path: transitions_path.to_owned(),
            line,
            message: format!("unknown state {}", id),
        });
        builder.add_transition(lookup(t.src)?, lookup(t.dst)?, t.probability);
    }

    builder.build()
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new)
                      .map_err(|source| LeakageError::Io { path: path.to_owned(), source })
}

/// Writes a quotient in DOT format.
pub fn write_quotient_dot<W: Write>(quotient: &Quotient, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "digraph P {{")?;
    writeln!(out, "size=\"8,5\"")?;
    writeln!(out, "node [shape=box];")?;
    for (src, dst, p) in quotient.transitions() {
        writeln!(out, "{} -> {} [ label=\"{}\" ];", src, dst, p)?;
    }
    for q in quotient.states() {
        writeln!(out, "{} [ label=\"{}\\n{{{}}}\" ];", q.id, q.id, q.members.iter().join(", "))?;
    }
    writeln!(out, "}}")
}

/// Stores a quotient into a DOT file.
pub fn store_quotient_dot<P: AsRef<Path>>(quotient: &Quotient, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut out = create(path)?;
    write_quotient_dot(quotient, &mut out)
        .and_then(|_| out.flush())
        .map_err(|source| LeakageError::Io { path: path.to_owned(), source })
}

/// Stores a trace table into a CSV file, one row per trace:
///     trace,probability,final_states
pub fn write_trace_table<P: AsRef<Path>>(table: &TraceTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new().from_writer(create(path)?);

    let rows = std::iter::once(["trace".to_owned(), "probability".to_owned(),
                                "final_states".to_owned()])
        .chain(table.iter().map(|(trace, p)| {
            let finals = table.final_states(trace)
                              .map(|s| s.iter().join(" "))
                              .unwrap_or_default();
            [trace.join(" -> "), p.to_string(), finals]
        }));
    for row in rows {
        writer.write_record(&row).map_err(|e| LeakageError::from_csv(path, e))?;
    }
    writer.flush().map_err(|source| LeakageError::Io { path: path.to_owned(), source })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorers::{BisimulationQuotientBuilder, Depth, TraceExplorer};
    use crate::model::{fixtures, StateModel};
    use crate::prior::PriorKnowledge;
    use std::fs;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_model() {
        let states = file("10, init, 0, 1\n11, init, 1, true\n\n20, A, 0, 0\n21, B, 1, false\n");
        let transitions = file("10, 20, 1.0\n11, 21, 1\n20, 20, 1\n21, 21, 1.0\n");
        let model = load_model(states.path(), transitions.path()).unwrap();

        assert_eq!(model.num_states(), 4);
        assert_eq!(model.initial_states(), &[0, 1]);
        assert_eq!(model.state(2).public, "A");
        assert_eq!(model.state(3).secret, "1");
        assert_eq!(model.successors(0), &[2]);
        assert!(model.is_terminal(3));
    }

    #[test]
    fn load_model_reports_bad_lines() {
        let states = file("0, init, 0, 1\n1, init, 1, maybe\n");
        let transitions = file("");
        match load_model(states.path(), transitions.path()) {
            Err(LeakageError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other.map(|m| m.num_states())),
        }

        let states = file("0, init, 0, 1\n1, A, 0, 0\n");
        let transitions = file("0, 1, 1.0\n0, 7, 0.0\n");
        match load_model(states.path(), transitions.path()) {
            Err(LeakageError::Format { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("unknown state 7"));
            },
            other => panic!("unexpected result: {:?}", other.map(|m| m.num_states())),
        }

        let transitions = file("0, 1, one\n");
        assert!(matches!(load_model(states.path(), transitions.path()),
                         Err(LeakageError::Format { line: 1, .. })));
    }

    #[test]
    fn load_model_validates_probabilities() {
        let states = file("0, init, 0, 1\n1, A, 0, 0\n2, B, 0, 0\n");
        let transitions = file("0, 1, 0.5\n0, 2, 0.4\n");
        assert!(matches!(load_model(states.path(), transitions.path()),
                         Err(LeakageError::Validation(_))));
    }

    #[test]
    fn test_write_quotient_dot() {
        let model = fixtures::distinct_outputs();
        let quotient = BisimulationQuotientBuilder::new(&model).build();

        let mut out = vec![];
        write_quotient_dot(&quotient, &mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert_eq!(dot, "digraph P {\n\
                         size=\"8,5\"\n\
                         node [shape=box];\n\
                         0 -> 1 [ label=\"0.5\" ];\n\
                         0 -> 2 [ label=\"0.5\" ];\n\
                         0 [ label=\"0\\n{0, 1}\" ];\n\
                         1 [ label=\"1\\n{2}\" ];\n\
                         2 [ label=\"2\\n{3}\" ];\n\
                         }\n");
    }

    #[test]
    fn test_write_trace_table() {
        let model = fixtures::layered();
        let prior = PriorKnowledge::uniform(&model);
        let table = TraceExplorer::new(&model, &prior).explore(Depth::Unbounded);

        let out = NamedTempFile::new().unwrap();
        write_trace_table(&table, out.path()).unwrap();
        let content = fs::read_to_string(out.path()).unwrap();
        let lines = content.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "trace,probability,final_states");
        assert_eq!(lines[1], "start -> hi -> done,0.5,7 11 15 19");
        assert_eq!(lines[2], "start -> lo -> p0,0.25,6 14");
    }

    #[test]
    fn store_into_missing_directory() {
        let model = fixtures::same_output();
        let quotient = BisimulationQuotientBuilder::new(&model).build();
        assert!(matches!(store_quotient_dot(&quotient, "/nonexistent/dir/q.dot"),
                         Err(LeakageError::Io { .. })));
    }
}
