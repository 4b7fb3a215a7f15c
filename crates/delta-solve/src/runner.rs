//! Sweep orchestration: build every δ query, solve them in order, log each
//! result before moving on.

use crate::experiment::ExperimentConfig;
use crate::marabou::MarabouSolver;
use crate::sink::{ExperimentLog, RecordOutcome, RecordSink, SweepRecord};
use crate::solver::{SolveOutcome, Solver, SolverStatistics};
use crate::{Result, SolveError};
use delta_core::NetworkHandle;
use delta_query::DeltaSweep;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Slack allowed when re-checking a solver's counterexample.
pub const COUNTEREXAMPLE_TOLERANCE: f64 = 1e-5;

/// Result of one δ.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub delta: f64,
    pub outcome: RecordOutcome,
    /// Constraint violations found when re-checking a SAT assignment.
    pub violations: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    pub entries: Vec<SweepEntry>,
}

impl SweepSummary {
    fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.label() == label)
            .count()
    }

    pub fn num_sat(&self) -> usize {
        self.count("SAT")
    }

    pub fn num_unsat(&self) -> usize {
        self.count("UNSAT")
    }

    pub fn num_errors(&self) -> usize {
        self.count("ERROR")
    }

    /// Largest δ proven robust, if any.
    pub fn max_unsat_delta(&self) -> Option<f64> {
        self.entries
            .iter()
            .filter(|e| e.outcome.label() == "UNSAT")
            .map(|e| e.delta)
            .reduce(f64::max)
    }
}

/// Solve every δ of `sweep` against `network`.
///
/// All queries are built before the solver runs, so construction errors
/// abort with nothing solved. A [`SolveError::SolverFailed`] is logged as
/// an `ERROR` record and the sweep moves on; any other error aborts.
pub fn run_sweep<N: NetworkHandle + Sync>(
    sweep: &DeltaSweep,
    network: &N,
    base_input: &[f64],
    parallel: bool,
    solver: &dyn Solver,
    sink: &mut dyn RecordSink,
    solver_log: &Path,
) -> Result<SweepSummary> {
    let queries = if parallel {
        sweep.build_parallel(network, base_input)?
    } else {
        sweep.build(network, base_input)?
    };

    let mut summary = SweepSummary::default();
    for (&delta, query) in sweep.deltas.iter().zip(&queries) {
        info!("Solving '{}' at delta={} with {}", network.name(), delta, solver.name());
        let start = Instant::now();
        let (outcome, statistics) = match solver.solve(query, network, solver_log) {
            Ok(report) => (RecordOutcome::Solved(report.outcome), report.statistics),
            Err(SolveError::SolverFailed(message)) => {
                error!("Solver failed at delta={}: {}", delta, message.trim_end());
                let statistics = SolverStatistics {
                    total_time: start.elapsed(),
                    ..Default::default()
                };
                (RecordOutcome::Error(message), statistics)
            }
            Err(e) => return Err(e),
        };

        let mut violations = 0;
        if let RecordOutcome::Solved(SolveOutcome::Sat(assignment)) = &outcome {
            let found = query.check_assignment(assignment, COUNTEREXAMPLE_TOLERANCE);
            for violation in &found {
                warn!("Counterexample at delta={} violates {}", delta, violation);
            }
            violations = found.len();
        }

        sink.record(&SweepRecord {
            delta,
            pairs: sweep.pairs.clone(),
            input_vars: network.input_variable_ids().to_vec(),
            output_vars: network.output_variable_ids().to_vec(),
            outcome: outcome.clone(),
            statistics,
        })?;
        info!("delta={} -> {}", delta, outcome.label());
        summary.entries.push(SweepEntry {
            delta,
            outcome,
            violations,
        });
    }
    Ok(summary)
}

/// Load everything an experiment names and run it with Marabou, logging to
/// `<output_dir>/<experiment_id>/`.
pub fn run_experiment(config: &ExperimentConfig) -> Result<SweepSummary> {
    let network = config.load_network()?;
    let base_input = config.load_base_input()?;
    let solver = MarabouSolver::new(config.solver.clone());
    let mut log = ExperimentLog::open(&config.output_dir, &config.experiment_id)?;
    let solver_log = log.solver_log_path();
    run_sweep(
        &config.sweep(),
        &network,
        &base_input,
        config.parallel,
        &solver,
        &mut log,
        &solver_log,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::solver::SolveReport;
    use delta_core::{Assignment, NetworkDescriptor, Query};
    use std::sync::Mutex;

    /// UNSAT below 0.3, solver crash at exactly 0.4, SAT otherwise.
    struct ThresholdSolver {
        calls: Mutex<Vec<f64>>,
    }

    impl ThresholdSolver {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl Solver for ThresholdSolver {
        fn name(&self) -> &str {
            "threshold"
        }

        fn solve(
            &self,
            query: &Query,
            _network: &dyn NetworkHandle,
            _log: &Path,
        ) -> Result<SolveReport> {
            let delta = query.delta().unwrap();
            self.calls.lock().unwrap().push(delta);
            let outcome = if delta < 0.3 {
                SolveOutcome::Unsat
            } else if delta == 0.4 {
                return Err(SolveError::SolverFailed("segfault\n".into()));
            } else {
                // Inputs at the box corner, y0 <= y1.
                let mut a = Assignment::new();
                for (&var, bound) in query.input_vars().iter().zip(query.input_bounds()) {
                    a.insert(var, bound.upper);
                }
                a.insert(query.output_vars()[0], 1.0);
                a.insert(query.output_vars()[1], 2.0);
                SolveOutcome::Sat(a)
            };
            Ok(SolveReport {
                outcome,
                statistics: SolverStatistics::default(),
            })
        }
    }

    struct UnavailableSolver;

    impl Solver for UnavailableSolver {
        fn name(&self) -> &str {
            "missing"
        }

        fn solve(&self, _: &Query, _: &dyn NetworkHandle, _: &Path) -> Result<SolveReport> {
            Err(SolveError::SolverUnavailable("Marabou not found".into()))
        }
    }

    fn setup() -> (NetworkDescriptor, DeltaSweep) {
        let net = NetworkDescriptor::contiguous("tiny", 2, 2).unwrap();
        let sweep = DeltaSweep::new(vec![0.01, 0.2, 0.4, 0.7], 100.0).with_pair(0, 1);
        (net, sweep)
    }

    #[test]
    fn test_solver_failure_is_logged_and_sweep_continues() {
        let (net, sweep) = setup();
        let solver = ThresholdSolver::new();
        let mut sink = MemorySink::default();
        let summary = run_sweep(
            &sweep,
            &net,
            &[0.5, 0.5],
            false,
            &solver,
            &mut sink,
            Path::new("unused.log"),
        )
        .unwrap();

        assert_eq!(*solver.calls.lock().unwrap(), vec![0.01, 0.2, 0.4, 0.7]);
        let labels: Vec<&str> = sink.records.iter().map(|r| r.outcome.label()).collect();
        assert_eq!(labels, vec!["UNSAT", "UNSAT", "ERROR", "SAT"]);
        assert_eq!(summary.num_unsat(), 2);
        assert_eq!(summary.num_errors(), 1);
        assert_eq!(summary.num_sat(), 1);
        assert_eq!(summary.max_unsat_delta(), Some(0.2));
        assert_eq!(summary.entries[3].violations, 0);
    }

    #[test]
    fn test_construction_error_aborts_before_solving() {
        let (net, sweep) = setup();
        let solver = ThresholdSolver::new();
        let mut sink = MemorySink::default();
        let err = run_sweep(
            &sweep,
            &net,
            &[0.5],
            true,
            &solver,
            &mut sink,
            Path::new("unused.log"),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::Query(_)));
        assert!(solver.calls.lock().unwrap().is_empty());
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_unavailable_solver_aborts() {
        let (net, sweep) = setup();
        let mut sink = MemorySink::default();
        let err = run_sweep(
            &sweep,
            &net,
            &[0.5, 0.5],
            false,
            &UnavailableSolver,
            &mut sink,
            Path::new("unused.log"),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::SolverUnavailable(_)));
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_bad_counterexample_is_counted() {
        let net = NetworkDescriptor::contiguous("tiny", 2, 2).unwrap();
        // Assert y1 <= y0; the solver's point has y0 = 1 < y1 = 2.
        let sweep = DeltaSweep::new(vec![0.5], 100.0).with_pair(1, 0);
        let mut sink = MemorySink::default();
        let summary = run_sweep(
            &sweep,
            &net,
            &[0.5, 0.5],
            false,
            &ThresholdSolver::new(),
            &mut sink,
            Path::new("unused.log"),
        )
        .unwrap();
        assert_eq!(summary.entries[0].violations, 1);
    }

    #[test]
    fn test_records_flow_into_experiment_log() {
        let (net, sweep) = setup();
        let dir = tempfile::tempdir().unwrap();
        let mut log = ExperimentLog::open(dir.path(), "exp").unwrap();
        let solver_log = log.solver_log_path();
        run_sweep(
            &sweep,
            &net,
            &[0.5, 0.5],
            true,
            &ThresholdSolver::new(),
            &mut log,
            &solver_log,
        )
        .unwrap();

        let results = std::fs::read_to_string(log.results_path()).unwrap();
        let headers: Vec<&str> = results.lines().filter(|l| l.starts_with("delta=")).collect();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[2], "delta=0.4 pairs=[y0<=y1] result=ERROR message=segfault");
        let timing = std::fs::read_to_string(log.timing_path()).unwrap();
        assert_eq!(timing.lines().count(), 4);
    }
}
