//! Line-oriented result logging.
//!
//! One experiment run owns two append-only files under
//! `<output_dir>/<experiment_id>/`:
//!
//! - `results.txt`: one line per δ with its pairs and verdict, followed by
//!   the indented input/output assignment when SAT.
//! - `timing.txt`: one line per δ with wall time and solver statistics.
//!
//! Both are flushed after every record so a crash mid-sweep keeps every
//! completed δ.

use crate::solver::{SolveOutcome, SolverStatistics};
use crate::Result;
use delta_core::float::format_real;
use delta_core::VariableId;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// What became of one δ.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Solved(SolveOutcome),
    /// The solver failed; the message is its own error text.
    Error(String),
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Solved(outcome) => outcome.label(),
            RecordOutcome::Error(_) => "ERROR",
        }
    }
}

/// Everything logged for one δ.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRecord {
    pub delta: f64,
    pub pairs: Vec<(usize, usize)>,
    pub input_vars: Vec<VariableId>,
    pub output_vars: Vec<VariableId>,
    pub outcome: RecordOutcome,
    pub statistics: SolverStatistics,
}

/// Destination for sweep records.
pub trait RecordSink {
    /// Persist one record. Returning means it is durable.
    fn record(&mut self, record: &SweepRecord) -> Result<()>;
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<SweepRecord>,
}

impl RecordSink for MemorySink {
    fn record(&mut self, record: &SweepRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Result and timing files of one experiment run.
#[derive(Debug)]
pub struct ExperimentLog {
    dir: PathBuf,
    results: BufWriter<File>,
    timing: BufWriter<File>,
}

impl ExperimentLog {
    /// Open (creating if needed) `<output_dir>/<experiment_id>/`. Existing
    /// files are appended to.
    pub fn open(output_dir: &Path, experiment_id: &str) -> Result<Self> {
        let dir = output_dir.join(experiment_id);
        std::fs::create_dir_all(&dir)?;
        let open = |name: &str| -> Result<BufWriter<File>> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))?;
            Ok(BufWriter::new(file))
        };
        let results = open("results.txt")?;
        let timing = open("timing.txt")?;
        tracing::info!("Logging experiment results to {}", dir.display());
        Ok(Self {
            dir,
            results,
            timing,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join("results.txt")
    }

    pub fn timing_path(&self) -> PathBuf {
        self.dir.join("timing.txt")
    }

    /// Where raw solver output for this run is appended.
    pub fn solver_log_path(&self) -> PathBuf {
        self.dir.join("solver.log")
    }
}

impl RecordSink for ExperimentLog {
    fn record(&mut self, record: &SweepRecord) -> Result<()> {
        self.results.write_all(results_lines(record).as_bytes())?;
        self.results.flush()?;
        self.timing.write_all(timing_line(record).as_bytes())?;
        self.timing.flush()?;
        Ok(())
    }
}

fn format_pairs(pairs: &[(usize, usize)]) -> String {
    let inner: Vec<String> = pairs.iter().map(|(i, j)| format!("y{i}<=y{j}")).collect();
    format!("[{}]", inner.join(","))
}

/// The `results.txt` text for one record, newline-terminated.
pub fn results_lines(record: &SweepRecord) -> String {
    let mut out = format!(
        "delta={} pairs={} result={}",
        record.delta,
        format_pairs(&record.pairs),
        record.outcome.label()
    );
    match &record.outcome {
        RecordOutcome::Solved(SolveOutcome::Sat(assignment)) => {
            out.push('\n');
            for (prefix, vars) in [("x", &record.input_vars), ("y", &record.output_vars)] {
                for (k, var) in vars.iter().enumerate() {
                    let value = assignment
                        .get(var)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    out.push_str(&format!("  {prefix}{k} = {value}\n"));
                }
            }
            return out;
        }
        RecordOutcome::Solved(SolveOutcome::Unknown { reason }) => {
            out.push_str(&format!(" reason={reason}"));
        }
        RecordOutcome::Error(message) => {
            out.push_str(&format!(" message={}", message.trim_end().replace('\n', " | ")));
        }
        RecordOutcome::Solved(_) => {}
    }
    out.push('\n');
    out
}

/// The `timing.txt` line for one record, newline-terminated.
pub fn timing_line(record: &SweepRecord) -> String {
    let stats = &record.statistics;
    format!(
        "delta={} result={} time_secs={} splits={} active_pl={}/{} abstracted={}\n",
        record.delta,
        record.outcome.label(),
        format_real(stats.total_time.as_secs_f64(), 3),
        stats.num_splits,
        stats.num_active_pl_constraints,
        stats.num_pl_constraints,
        stats.num_abstracted_equations
    )
}
