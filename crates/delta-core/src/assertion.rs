//! Linear assertions over solver variables.

use crate::float::{format_real, DEFAULT_PRECISION};
use crate::{Assignment, DeltaError, Result, VariableId};
use serde::{Deserialize, Serialize};

/// Comparison between the linear combination and the scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// `Σ cᵢ·xᵢ <= scalar`
    Le,
    /// `Σ cᵢ·xᵢ >= scalar`
    Ge,
    /// `Σ cᵢ·xᵢ = scalar`
    Eq,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Eq => "=",
        }
    }
}

/// One `coefficient * variable` term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Addend {
    pub coefficient: f64,
    pub variable: VariableId,
}

/// A linear constraint `Σ cᵢ·xᵢ ⋈ scalar` asserted on a query.
///
/// Assertions on one query are conjunctive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearAssertion {
    pub addends: Vec<Addend>,
    pub relation: Relation,
    pub scalar: f64,
}

impl LinearAssertion {
    pub fn new(addends: Vec<(f64, VariableId)>, relation: Relation, scalar: f64) -> Self {
        Self {
            addends: addends
                .into_iter()
                .map(|(coefficient, variable)| Addend {
                    coefficient,
                    variable,
                })
                .collect(),
            relation,
            scalar,
        }
    }

    /// `lhs - rhs <= 0`: the value of `lhs` does not exceed the value of `rhs`.
    pub fn pairwise(lhs: VariableId, rhs: VariableId) -> Self {
        Self::new(vec![(1.0, lhs), (-1.0, rhs)], Relation::Le, 0.0)
    }

    /// Variables referenced by this assertion, in addend order.
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.addends.iter().map(|a| a.variable)
    }

    /// Value of the linear combination under `assignment`.
    pub fn evaluate(&self, assignment: &Assignment) -> Result<f64> {
        self.addends.iter().try_fold(0.0, |acc, a| {
            let value = assignment
                .get(&a.variable)
                .ok_or(DeltaError::UnknownVariable(a.variable))?;
            Ok(acc + a.coefficient * value)
        })
    }

    /// Whether the assertion holds under `assignment`, up to `tolerance`.
    pub fn holds(&self, assignment: &Assignment, tolerance: f64) -> Result<bool> {
        let lhs = self.evaluate(assignment)?;
        Ok(match self.relation {
            Relation::Le => lhs <= self.scalar + tolerance,
            Relation::Ge => lhs >= self.scalar - tolerance,
            Relation::Eq => (lhs - self.scalar).abs() <= tolerance,
        })
    }

    /// SMT-LIB 2 term, with variable names supplied by `name`.
    pub fn to_smt(&self, name: impl Fn(VariableId) -> String) -> String {
        let terms: Vec<String> = self
            .addends
            .iter()
            .map(|a| {
                if a.coefficient == 1.0 {
                    name(a.variable)
                } else {
                    format!("(* {} {})", smt_real(a.coefficient), name(a.variable))
                }
            })
            .collect();
        let lhs = match terms.len() {
            0 => "0.0".to_string(),
            1 => terms[0].clone(),
            _ => format!("(+ {})", terms.join(" ")),
        };
        format!(
            "({} {} {})",
            self.relation.as_str(),
            lhs,
            smt_real(self.scalar)
        )
    }
}

/// SMT-LIB real literal; negatives are written as `(- v)`.
///
/// Uses the shortest decimal that parses back to the same `f64`, so bounds
/// survive rendering exactly.
pub fn smt_real(value: f64) -> String {
    let mut text = format!("{}", value.abs());
    if !text.contains('.') && !text.contains("inf") {
        text.push_str(".0");
    }
    if value < 0.0 {
        format!("(- {text})")
    } else {
        text
    }
}

impl std::fmt::Display for LinearAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, a) in self.addends.iter().enumerate() {
            let magnitude = a.coefficient.abs();
            let sign = if a.coefficient < 0.0 { "-" } else { "+" };
            match (i, sign) {
                (0, "-") => write!(f, "-")?,
                (0, _) => {}
                _ => write!(f, " {sign} ")?,
            }
            if magnitude != 1.0 {
                write!(f, "{}*", format_real(magnitude, DEFAULT_PRECISION))?;
            }
            write!(f, "x{}", a.variable)?;
        }
        write!(
            f,
            " {} {}",
            self.relation.as_str(),
            format_real(self.scalar, DEFAULT_PRECISION)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(VariableId, f64)]) -> Assignment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_pairwise_shape() {
        let a = LinearAssertion::pairwise(7, 9);
        assert_eq!(a.relation, Relation::Le);
        assert_eq!(a.scalar, 0.0);
        assert_eq!(a.variables().collect::<Vec<_>>(), vec![7, 9]);
        assert_eq!(a.addends[0].coefficient, 1.0);
        assert_eq!(a.addends[1].coefficient, -1.0);
    }

    #[test]
    fn test_pairwise_holds() {
        let a = LinearAssertion::pairwise(0, 1);
        assert!(a.holds(&assignment(&[(0, 0.2), (1, 0.8)]), 0.0).unwrap());
        assert!(a.holds(&assignment(&[(0, 0.5), (1, 0.5)]), 0.0).unwrap());
        assert!(!a.holds(&assignment(&[(0, 0.9), (1, 0.1)]), 0.0).unwrap());
    }

    #[test]
    fn test_relations_with_tolerance() {
        let ge = LinearAssertion::new(vec![(2.0, 0)], Relation::Ge, 1.0);
        assert!(ge.holds(&assignment(&[(0, 0.5)]), 0.0).unwrap());
        assert!(ge.holds(&assignment(&[(0, 0.4999)]), 1e-3).unwrap());
        assert!(!ge.holds(&assignment(&[(0, 0.4)]), 1e-3).unwrap());

        let eq = LinearAssertion::new(vec![(1.0, 0), (1.0, 1)], Relation::Eq, 1.0);
        assert!(eq.holds(&assignment(&[(0, 0.25), (1, 0.75)]), 1e-9).unwrap());
        assert!(!eq.holds(&assignment(&[(0, 0.25), (1, 0.7)]), 1e-9).unwrap());
    }

    #[test]
    fn test_missing_variable_is_error() {
        let a = LinearAssertion::pairwise(0, 1);
        assert!(matches!(
            a.evaluate(&assignment(&[(0, 1.0)])),
            Err(DeltaError::UnknownVariable(1))
        ));
    }

    #[test]
    fn test_to_smt() {
        let a = LinearAssertion::pairwise(3, 4);
        assert_eq!(
            a.to_smt(|v| format!("Y_{v}")),
            "(<= (+ Y_3 (* (- 1.0) Y_4)) 0.0)"
        );
        let b = LinearAssertion::new(vec![(0.5, 1)], Relation::Ge, -2.0);
        assert_eq!(b.to_smt(|v| format!("X_{v}")), "(>= (* 0.5 X_1) (- 2.0))");
    }

    #[test]
    fn test_display() {
        assert_eq!(LinearAssertion::pairwise(3, 4).to_string(), "x3 - x4 <= 0");
        let a = LinearAssertion::new(vec![(-2.0, 0), (0.5, 1)], Relation::Eq, 1.5);
        assert_eq!(a.to_string(), "-2*x0 + 0.5*x1 = 1.5");
    }

    #[test]
    fn test_smt_real() {
        assert_eq!(smt_real(0.0), "0.0");
        assert_eq!(smt_real(3.0), "3.0");
        assert_eq!(smt_real(0.25), "0.25");
        assert_eq!(smt_real(-100.0), "(- 100.0)");
        assert_eq!(smt_real(1e-11), "0.00000000001");
        assert_eq!(smt_real(1e21), "1000000000000000000000.0");
    }

    #[test]
    fn test_smt_real_is_lossless() {
        for value in [1.0 / 255.0, 1.0 / 3.0, 0.1 + 0.2, -2.0 / 7.0, 0.5 - 1e-11] {
            let text = smt_real(value);
            let parsed = match text.strip_prefix("(- ") {
                Some(rest) => -rest.trim_end_matches(')').parse::<f64>().unwrap(),
                None => text.parse::<f64>().unwrap(),
            };
            assert_eq!(parsed, value, "{text}");
        }
    }
}
