//! Error types for query construction.

use crate::VariableId;
use thiserror::Error;

/// Result type alias for δ-verify operations.
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Errors raised while loading networks or constructing queries.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// Base input length does not match the network's input variable count.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A scalar parameter (δ, `large`, tolerance, ...) is outside its domain.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// `build()` was called while some variables still lack a lower or upper bound.
    #[error("incomplete query: {} variable(s) without both bounds: {missing:?}", missing.len())]
    IncompleteQuery { missing: Vec<VariableId> },

    /// A bound with lower > upper (or a NaN endpoint).
    #[error("invalid bound for x{variable}: [{lower}, {upper}]")]
    InvalidBound {
        variable: VariableId,
        lower: f64,
        upper: f64,
    },

    /// An output index outside the network's output vector.
    #[error("index {index} out of range for {len} output variable(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A constraint referenced a variable with no assigned value.
    #[error("variable x{0} has no value in the assignment")]
    UnknownVariable(VariableId),

    /// Malformed serialized constraint or descriptor content.
    #[error("parse error: {0}")]
    Parse(String),

    /// Network descriptor could not be turned into a usable handle.
    #[error("network loading failed: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeltaError {
    /// Shorthand for [`DeltaError::InvalidParameter`].
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        DeltaError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = DeltaError::DimensionMismatch {
            expected: 785,
            got: 784,
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected 785 values, got 784"
        );
    }

    #[test]
    fn test_incomplete_query_display_lists_variables() {
        let err = DeltaError::IncompleteQuery {
            missing: vec![3, 7],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 variable(s)"));
        assert!(msg.contains("[3, 7]"));
    }

    #[test]
    fn test_invalid_parameter_helper() {
        let err = DeltaError::invalid_parameter("delta", "must be >= 0, got -0.1");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'delta': must be >= 0, got -0.1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DeltaError = io.into();
        assert!(matches!(err, DeltaError::Io(_)));
    }
}
