//! Core types for δ-robustness verification queries.
//!
//! A verification query pairs a network's input and output variables with
//! interval bounds and linear assertions. The input region is a box of
//! half-width δ around a base input; the output region is a wide search
//! envelope; the assertions encode the (negated) robustness property whose
//! satisfiability an external solver decides.
//!
//! This crate holds the shared data model. Construction lives in
//! `delta-query`, solving and logging in `delta-solve`.

pub mod assertion;
pub mod bounds;
pub mod error;
pub mod float;
pub mod network;
pub mod query;
pub mod sigmoid;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use assertion::{LinearAssertion, Relation};
pub use bounds::{BoundTable, PartialBound};
pub use error::{DeltaError, Result};
pub use network::{NetworkDescriptor, NetworkHandle};
pub use query::{ConstraintViolation, Query, QueryDiagnostic, QueryParts};
pub use sigmoid::SigmoidConstraint;

/// Solver-level identifier of a network neuron's value.
pub type VariableId = usize;

/// Variable id → value map, as returned by a SAT solver run.
///
/// Ordered so that every rendering of an assignment is deterministic.
pub type Assignment = BTreeMap<VariableId, f64>;

/// A closed interval `[lower, upper]` on a real-valued variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    /// Create a new bound.
    #[inline]
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower <= upper, "Invalid bound: {lower} > {upper}");
        Self { lower, upper }
    }

    /// Create a bound for `variable`, rejecting `lower > upper` and NaN endpoints.
    pub fn checked(variable: VariableId, lower: f64, upper: f64) -> Result<Self> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(DeltaError::InvalidBound {
                variable,
                lower,
                upper,
            });
        }
        Ok(Self { lower, upper })
    }

    /// `[center - radius, center + radius]`.
    #[inline]
    pub fn symmetric(center: f64, radius: f64) -> Self {
        Self::new(center - radius, center + radius)
    }

    /// Create a concrete (point) bound.
    #[inline]
    pub fn concrete(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Width of the bound interval.
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Midpoint of the interval.
    #[inline]
    pub fn center(&self) -> f64 {
        self.lower + self.width() / 2.0
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}]",
            float::format_real(self.lower, float::DEFAULT_PRECISION),
            float::format_real(self.upper, float::DEFAULT_PRECISION)
        )
    }
}
