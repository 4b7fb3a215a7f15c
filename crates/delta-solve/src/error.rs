//! Error types for solving and experiment orchestration.

use delta_core::DeltaError;
use thiserror::Error;

/// Result type alias for solver-side operations.
pub type Result<T> = std::result::Result<T, SolveError>;

/// Errors raised while running a solver or persisting its results.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Query construction or network loading failed.
    #[error(transparent)]
    Query(#[from] DeltaError),

    /// The solver binary could not be started.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),

    /// The solver ran but reported a failure; the message is its own output.
    #[error("solver failed: {0}")]
    SolverFailed(String),

    /// Invalid experiment or solver configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_is_transparent() {
        let err: SolveError = DeltaError::DimensionMismatch {
            expected: 2,
            got: 1,
        }
        .into();
        assert_eq!(err.to_string(), "dimension mismatch: expected 2 values, got 1");
    }

    #[test]
    fn test_solver_failed_keeps_message_verbatim() {
        let err = SolveError::SolverFailed("std::bad_alloc\n".to_string());
        assert_eq!(err.to_string(), "solver failed: std::bad_alloc\n");
    }
}
