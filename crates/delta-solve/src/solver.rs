//! The external solver boundary.

use crate::Result;
use delta_core::{Assignment, NetworkHandle, Query};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Verdict of one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolveOutcome {
    /// A point satisfying every bound and assertion exists.
    Sat(Assignment),
    /// No such point: the robustness property holds.
    Unsat,
    /// The solver stopped without a verdict.
    Unknown { reason: String },
    /// The solver's own time limit was hit.
    Timeout,
}

impl SolveOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SolveOutcome::Sat(_) => "SAT",
            SolveOutcome::Unsat => "UNSAT",
            SolveOutcome::Unknown { .. } => "UNKNOWN",
            SolveOutcome::Timeout => "TIMEOUT",
        }
    }

    pub fn is_sat(&self) -> bool {
        matches!(self, SolveOutcome::Sat(_))
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            SolveOutcome::Sat(assignment) => Some(assignment),
            _ => None,
        }
    }
}

/// Search statistics reported by the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverStatistics {
    /// Number of case splits performed.
    pub num_splits: u64,
    /// Piecewise-linear constraints still active at the end of search.
    pub num_active_pl_constraints: u64,
    /// Piecewise-linear constraints in the query.
    pub num_pl_constraints: u64,
    /// Equations introduced by abstraction refinement.
    pub num_abstracted_equations: u64,
    /// Wall-clock time of the run.
    pub total_time: Duration,
}

/// Outcome plus statistics of one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub statistics: SolverStatistics,
}

/// A satisfiability solver for built queries.
///
/// Calls are blocking and may run for a long time. Cancellation and time
/// limits are the implementation's concern.
pub trait Solver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Decide `query` on `network`, appending solver output to `log`.
    fn solve(&self, query: &Query, network: &dyn NetworkHandle, log: &Path) -> Result<SolveReport>;
}
