//! Built verification queries.

use crate::float::{format_real, DEFAULT_PRECISION};
use crate::{
    Assignment, Bound, BoundTable, LinearAssertion, Result, SigmoidConstraint, VariableId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-fatal observation recorded while a query was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryDiagnostic {
    /// A previously observed output magnitude lies outside the search envelope.
    OutputEnvelopeExceeded {
        variable: VariableId,
        observed: f64,
        large: f64,
    },
}

impl std::fmt::Display for QueryDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryDiagnostic::OutputEnvelopeExceeded {
                variable,
                observed,
                large,
            } => write!(
                f,
                "output x{variable} observed at {} exceeds search envelope +/-{}",
                format_real(*observed, DEFAULT_PRECISION),
                format_real(*large, DEFAULT_PRECISION)
            ),
        }
    }
}

/// A constraint of a query broken by a candidate assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    /// An input or output variable has no value.
    MissingValue { variable: VariableId },
    /// A value lies outside its bound.
    OutOfBounds {
        variable: VariableId,
        value: f64,
        bound: Bound,
    },
    /// Assertion at `index` does not hold; `lhs` is its linear combination.
    Assertion { index: usize, lhs: f64 },
    /// `f != sigmoid(b)`.
    Sigmoid { constraint: SigmoidConstraint },
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintViolation::MissingValue { variable } => {
                write!(f, "x{variable} has no value")
            }
            ConstraintViolation::OutOfBounds {
                variable,
                value,
                bound,
            } => write!(
                f,
                "x{variable} = {} outside {bound}",
                format_real(*value, DEFAULT_PRECISION)
            ),
            ConstraintViolation::Assertion { index, lhs } => write!(
                f,
                "assertion #{index} violated (lhs = {})",
                format_real(*lhs, DEFAULT_PRECISION)
            ),
            ConstraintViolation::Sigmoid { constraint } => {
                write!(f, "{constraint} violated")
            }
        }
    }
}

/// Everything needed to assemble a [`Query`].
#[derive(Debug, Clone)]
pub struct QueryParts {
    pub network_name: String,
    pub input_vars: Vec<VariableId>,
    pub output_vars: Vec<VariableId>,
    pub bounds: BoundTable,
    pub assertions: Vec<LinearAssertion>,
    pub sigmoids: Vec<SigmoidConstraint>,
    pub delta: Option<f64>,
    pub large: Option<f64>,
    pub diagnostics: Vec<QueryDiagnostic>,
}

/// A fully bounded constraint system, ready for an external solver.
///
/// Immutable once built. Bounds are ordered by variable id and assertions
/// keep insertion order, so equal inputs produce equal queries.
/// Only [`Query::from_parts`] constructs one; there is no `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    network_name: String,
    input_vars: Vec<VariableId>,
    output_vars: Vec<VariableId>,
    bounds: BTreeMap<VariableId, Bound>,
    assertions: Vec<LinearAssertion>,
    sigmoids: Vec<SigmoidConstraint>,
    delta: Option<f64>,
    large: Option<f64>,
    diagnostics: Vec<QueryDiagnostic>,
}

impl Query {
    /// Freeze `parts` into a query.
    ///
    /// Every input and output variable must carry both bounds, otherwise
    /// this fails with [`crate::DeltaError::IncompleteQuery`].
    pub fn from_parts(parts: QueryParts) -> Result<Self> {
        let bounds = parts
            .bounds
            .finalize(parts.input_vars.iter().chain(&parts.output_vars))?;
        Ok(Self {
            network_name: parts.network_name,
            input_vars: parts.input_vars,
            output_vars: parts.output_vars,
            bounds,
            assertions: parts.assertions,
            sigmoids: parts.sigmoids,
            delta: parts.delta,
            large: parts.large,
            diagnostics: parts.diagnostics,
        })
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn input_vars(&self) -> &[VariableId] {
        &self.input_vars
    }

    pub fn output_vars(&self) -> &[VariableId] {
        &self.output_vars
    }

    /// Perturbation radius the input box was built with, if any.
    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    /// Output search envelope half-width, if set through the builder.
    pub fn large(&self) -> Option<f64> {
        self.large
    }

    pub fn bound(&self, variable: VariableId) -> Option<Bound> {
        self.bounds.get(&variable).copied()
    }

    /// All bounds, ordered by variable id.
    pub fn bounds(&self) -> impl Iterator<Item = (VariableId, Bound)> + '_ {
        self.bounds.iter().map(|(&v, &b)| (v, b))
    }

    pub fn num_bounded_variables(&self) -> usize {
        self.bounds.len()
    }

    /// Input bounds, in input-vector order.
    pub fn input_bounds(&self) -> Vec<Bound> {
        self.collect_bounds(&self.input_vars)
    }

    /// Output bounds, in output-vector order.
    pub fn output_bounds(&self) -> Vec<Bound> {
        self.collect_bounds(&self.output_vars)
    }

    fn collect_bounds(&self, vars: &[VariableId]) -> Vec<Bound> {
        // Input/output bounds always exist after `from_parts`.
        vars.iter().filter_map(|v| self.bound(*v)).collect()
    }

    pub fn assertions(&self) -> &[LinearAssertion] {
        &self.assertions
    }

    pub fn sigmoids(&self) -> &[SigmoidConstraint] {
        &self.sigmoids
    }

    pub fn diagnostics(&self) -> &[QueryDiagnostic] {
        &self.diagnostics
    }

    /// Every constraint of this query that `assignment` breaks.
    ///
    /// Input and output variables must be present. Other bounded variables
    /// and sigmoid constraints are only checked when the assignment covers
    /// them, since solvers commonly report inputs and outputs alone.
    pub fn check_assignment(
        &self,
        assignment: &Assignment,
        tolerance: f64,
    ) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for &variable in self.input_vars.iter().chain(&self.output_vars) {
            if !assignment.contains_key(&variable) {
                violations.push(ConstraintViolation::MissingValue { variable });
            }
        }

        for (&variable, &bound) in &self.bounds {
            if let Some(&value) = assignment.get(&variable) {
                if value < bound.lower - tolerance || value > bound.upper + tolerance {
                    violations.push(ConstraintViolation::OutOfBounds {
                        variable,
                        value,
                        bound,
                    });
                }
            }
        }

        for (index, assertion) in self.assertions.iter().enumerate() {
            // Missing variables were already reported above.
            if let (Ok(lhs), Ok(false)) = (
                assertion.evaluate(assignment),
                assertion.holds(assignment, tolerance),
            ) {
                violations.push(ConstraintViolation::Assertion { index, lhs });
            }
        }

        for constraint in &self.sigmoids {
            if let Ok(false) = constraint.satisfied(assignment, tolerance) {
                violations.push(ConstraintViolation::Sigmoid {
                    constraint: *constraint,
                });
            }
        }

        violations
    }
}
