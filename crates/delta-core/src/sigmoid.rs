//! Sigmoid activation constraints `f = sigmoid(b)`.
//!
//! The solver treats these as non-linear constraints between a neuron's
//! pre-activation variable `b` and its post-activation variable `f`. A query
//! only records them; how the solver abstracts or splits on them is its
//! own business.

use crate::float::{are_equal, sigmoid};
use crate::{Assignment, DeltaError, Result, VariableId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const TAG: &str = "sigmoid";

/// `f = sigmoid(b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigmoidConstraint {
    /// Pre-activation (input) variable.
    pub b: VariableId,
    /// Post-activation (output) variable.
    pub f: VariableId,
}

impl SigmoidConstraint {
    pub fn new(b: VariableId, f: VariableId) -> Self {
        Self { b, f }
    }

    /// Whether `assignment[f]` equals `sigmoid(assignment[b])` within `tolerance`.
    pub fn satisfied(&self, assignment: &Assignment, tolerance: f64) -> Result<bool> {
        let b = assignment
            .get(&self.b)
            .ok_or(DeltaError::UnknownVariable(self.b))?;
        let f = assignment
            .get(&self.f)
            .ok_or(DeltaError::UnknownVariable(self.f))?;
        Ok(are_equal(sigmoid(*b), *f, tolerance))
    }

    /// Wire form `sigmoid,<f>,<b>`.
    pub fn serialize(&self) -> String {
        format!("{TAG},{},{}", self.f, self.b)
    }
}

impl FromStr for SigmoidConstraint {
    type Err = DeltaError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .trim()
            .strip_prefix(TAG)
            .and_then(|r| r.strip_prefix(','))
            .ok_or_else(|| DeltaError::Parse(format!("not a sigmoid constraint: '{s}'")))?;
        let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(DeltaError::Parse(format!(
                "sigmoid constraint needs 2 variables, got {} in '{s}'",
                fields.len()
            )));
        }
        let parse = |field: &str| {
            field
                .parse::<VariableId>()
                .map_err(|e| DeltaError::Parse(format!("bad variable '{field}' in '{s}': {e}")))
        };
        Ok(Self {
            f: parse(fields[0])?,
            b: parse(fields[1])?,
        })
    }
}

impl std::fmt::Display for SigmoidConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{} = sigmoid( x{} )", self.f, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_order_is_f_then_b() {
        let c = SigmoidConstraint::new(1, 2);
        assert_eq!(c.serialize(), "sigmoid,2,1");
    }

    #[test]
    fn test_parse_serialized_form() {
        let c: SigmoidConstraint = "sigmoid,2,1".parse().unwrap();
        assert_eq!(c, SigmoidConstraint::new(1, 2));
        let spaced: SigmoidConstraint = " sigmoid, 10 , 4 ".parse().unwrap();
        assert_eq!(spaced, SigmoidConstraint { b: 4, f: 10 });
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("relu,1,2".parse::<SigmoidConstraint>().is_err());
        assert!("sigmoid,1".parse::<SigmoidConstraint>().is_err());
        assert!("sigmoid,1,2,3".parse::<SigmoidConstraint>().is_err());
        assert!("sigmoid,a,2".parse::<SigmoidConstraint>().is_err());
        assert!("sigmoid12".parse::<SigmoidConstraint>().is_err());
    }

    #[test]
    fn test_satisfied() {
        let c = SigmoidConstraint::new(1, 2);
        let mut a = Assignment::new();
        a.insert(1, 0.5);
        a.insert(2, 0.622_459_331);
        assert!(c.satisfied(&a, 1e-5).unwrap());
        a.insert(2, 0.7);
        assert!(!c.satisfied(&a, 1e-5).unwrap());
    }

    #[test]
    fn test_satisfied_requires_both_variables() {
        let c = SigmoidConstraint::new(1, 2);
        let mut a = Assignment::new();
        a.insert(1, 0.0);
        assert!(matches!(
            c.satisfied(&a, 1e-5),
            Err(DeltaError::UnknownVariable(2))
        ));
    }
}
