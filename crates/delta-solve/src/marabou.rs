//! Marabou process backend.
//!
//! Each solve writes the rendered VNN-LIB property into a private temp
//! directory and runs
//!
//! ```text
//! <binary> <model> <property> --summary-file=<tmp> [--timeout=N] [--verbosity=N] <extra_args>
//! ```
//!
//! The verdict comes from the first token of the summary file, falling back
//! to a bare `sat`/`unsat` line on stdout. Counterexamples are printed by
//! Marabou as `x<k> = <value>` (input position `k`) and `y<k> = <value>`
//! (output position `k`).

use crate::solver::{SolveOutcome, SolveReport, Solver, SolverStatistics};
use crate::{Result, SolveError};
use delta_core::{Assignment, NetworkHandle, Query};
use delta_query::vnnlib;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Configuration for the Marabou backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarabouConfig {
    /// Solver executable, looked up on `PATH` when not a path.
    pub binary: PathBuf,
    /// Passed as `--timeout`; `None` leaves the solver's default.
    pub timeout_secs: Option<u64>,
    /// Passed as `--verbosity`.
    pub verbosity: Option<u32>,
    /// Appended verbatim after the generated arguments.
    pub extra_args: Vec<String>,
}

impl Default for MarabouConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("Marabou"),
            timeout_secs: None,
            verbosity: None,
            extra_args: Vec::new(),
        }
    }
}

/// Runs the Marabou executable once per query.
#[derive(Debug, Clone, Default)]
pub struct MarabouSolver {
    config: MarabouConfig,
}

impl MarabouSolver {
    pub fn new(config: MarabouConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarabouConfig {
        &self.config
    }

    /// Full argument list for one invocation.
    pub fn command_args(&self, model: &Path, property: &Path, summary: &Path) -> Vec<OsString> {
        let mut args = vec![model.as_os_str().to_owned(), property.as_os_str().to_owned()];
        let mut summary_arg = OsString::from("--summary-file=");
        summary_arg.push(summary.as_os_str());
        args.push(summary_arg);
        if let Some(timeout) = self.config.timeout_secs {
            args.push(format!("--timeout={timeout}").into());
        }
        if let Some(verbosity) = self.config.verbosity {
            args.push(format!("--verbosity={verbosity}").into());
        }
        args.extend(self.config.extra_args.iter().map(OsString::from));
        args
    }
}

impl Solver for MarabouSolver {
    fn name(&self) -> &str {
        "marabou"
    }

    fn solve(&self, query: &Query, network: &dyn NetworkHandle, log: &Path) -> Result<SolveReport> {
        let model = network.model_path().ok_or_else(|| {
            SolveError::Config(format!(
                "network '{}' has no model_path for the solver",
                network.name()
            ))
        })?;

        let temp_dir = TempDir::new()?;
        let property = temp_dir.path().join("property.vnnlib");
        let summary = temp_dir.path().join("summary.txt");
        std::fs::write(&property, vnnlib::render(query))?;

        let args = self.command_args(model, &property, &summary);
        debug!("Running {} {:?}", self.config.binary.display(), args);

        let start = Instant::now();
        let output = Command::new(&self.config.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SolveError::SolverUnavailable(format!(
                    "{} not found",
                    self.config.binary.display()
                )),
                _ => SolveError::SolverUnavailable(format!(
                    "failed to execute {}: {e}",
                    self.config.binary.display()
                )),
            })?;
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        append_solver_log(log, query, &stdout, &stderr)?;

        let summary_text = std::fs::read_to_string(&summary).ok();
        let verdict = summary_text
            .as_deref()
            .and_then(parse_summary_verdict)
            .or_else(|| parse_stdout_verdict(&stdout));

        let outcome = match verdict {
            Some(Verdict::Sat) => SolveOutcome::Sat(parse_assignment(&stdout, network)),
            Some(Verdict::Unsat) => SolveOutcome::Unsat,
            Some(Verdict::Timeout) => SolveOutcome::Timeout,
            Some(Verdict::Unknown(_)) | None if !output.status.success() => {
                return Err(SolveError::SolverFailed(stderr.into_owned()));
            }
            Some(Verdict::Unknown(reason)) => SolveOutcome::Unknown { reason },
            None => SolveOutcome::Unknown {
                reason: "no verdict in solver output".to_string(),
            },
        };

        let mut statistics = parse_statistics(&stdout);
        statistics.total_time = elapsed;
        debug!(
            "{} finished with {} in {:?}",
            self.name(),
            outcome.label(),
            elapsed
        );
        Ok(SolveReport {
            outcome,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Verdict {
    Sat,
    Unsat,
    Timeout,
    Unknown(String),
}

fn verdict_from_token(token: &str) -> Option<Verdict> {
    match token.to_ascii_lowercase().as_str() {
        "sat" => Some(Verdict::Sat),
        "unsat" => Some(Verdict::Unsat),
        "timeout" => Some(Verdict::Timeout),
        "unknown" | "error" => Some(Verdict::Unknown(format!("solver reported {token}"))),
        _ => None,
    }
}

/// First whitespace-separated token of the summary file.
fn parse_summary_verdict(text: &str) -> Option<Verdict> {
    text.split_whitespace().next().and_then(verdict_from_token)
}

/// Last line of stdout that is exactly a verdict word.
fn parse_stdout_verdict(stdout: &str) -> Option<Verdict> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find_map(|line| match verdict_from_token(line) {
            Some(Verdict::Unknown(_)) => None,
            other => other,
        })
}

/// Collect `x<k> = v` / `y<k> = v` lines into an assignment keyed by
/// variable id.
fn parse_assignment(stdout: &str, network: &dyn NetworkHandle) -> Assignment {
    let mut assignment = Assignment::new();
    for line in stdout.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let ids = match name.chars().next() {
            Some('x') => network.input_variable_ids(),
            Some('y') => network.output_variable_ids(),
            _ => continue,
        };
        let (Ok(position), Ok(value)) = (name[1..].parse::<usize>(), value.trim().parse::<f64>())
        else {
            continue;
        };
        match ids.get(position) {
            Some(&var) => {
                assignment.insert(var, value);
            }
            None => warn!("Ignoring counterexample entry {name} = {value}"),
        }
    }
    assignment
}

fn labelled_count(line: &str, label: &str) -> Option<u64> {
    let (_, rest) = line.split_once(label)?;
    rest.split_whitespace().next()?.parse().ok()
}

/// Search statistics from labelled stdout lines; absent labels stay zero.
fn parse_statistics(stdout: &str) -> SolverStatistics {
    let mut stats = SolverStatistics::default();
    for line in stdout.lines() {
        let lower = line.to_ascii_lowercase();
        if let Some(n) = labelled_count(&lower, "splits:") {
            stats.num_splits = n;
        } else if let Some((_, rest)) = lower.split_once("active piecewise-linear constraints:") {
            let mut parts = rest.split('/').map(str::trim);
            if let (Some(active), Some(total)) = (parts.next(), parts.next()) {
                stats.num_active_pl_constraints = active.parse().unwrap_or(0);
                stats.num_pl_constraints = total.parse().unwrap_or(0);
            }
        } else if let Some(n) = labelled_count(&lower, "abstracted equations:") {
            stats.num_abstracted_equations = n;
        }
    }
    stats
}

fn append_solver_log(log: &Path, query: &Query, stdout: &str, stderr: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(log)?;
    let delta = query
        .delta()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(file, "==> {} delta={delta}", query.network_name())?;
    file.write_all(stdout.as_bytes())?;
    if !stderr.is_empty() {
        writeln!(file, "--- stderr")?;
        file.write_all(stderr.as_bytes())?;
    }
    file.flush()?;
    Ok(())
}
