//! Solving and logging δ-robustness sweeps.
//!
//! - [`Solver`]: the blocking solver boundary, with [`MarabouSolver`] as the
//!   process-backed implementation
//! - [`ExperimentLog`]: per-run `results.txt` / `timing.txt`, flushed per δ
//! - [`ExperimentConfig`]: the JSON experiment description
//! - [`run_sweep`] / [`run_experiment`]: build every query, then solve and
//!   record each δ in order

pub mod error;
pub mod experiment;
pub mod marabou;
pub mod runner;
pub mod sink;
pub mod solver;

pub use error::{Result, SolveError};
pub use experiment::{BaseInput, ExperimentConfig, DEFAULT_LARGE};
pub use marabou::{MarabouConfig, MarabouSolver};
pub use runner::{run_experiment, run_sweep, SweepEntry, SweepSummary, COUNTEREXAMPLE_TOLERANCE};
pub use sink::{ExperimentLog, MemorySink, RecordOutcome, RecordSink, SweepRecord};
pub use solver::{SolveOutcome, SolveReport, Solver, SolverStatistics};
