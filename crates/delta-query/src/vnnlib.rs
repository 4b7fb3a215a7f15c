//! VNN-LIB rendering of a built query.
//!
//! VNN-LIB is SMT-LIB 2 restricted to the shape neural network verifiers
//! consume: real-valued `X_k` inputs, `Y_k` outputs, and asserted bounds.
//! The solver searches for a point satisfying every assertion, so a
//! satisfying point is a counterexample to the robustness property.

use delta_core::assertion::smt_real;
use delta_core::{Query, VariableId};
use std::collections::{BTreeSet, HashMap};

/// Maps solver variable ids to VNN-LIB identifiers.
#[derive(Debug, Clone)]
pub struct VariableNames {
    positions: HashMap<VariableId, String>,
}

impl VariableNames {
    /// `X_k` for the k-th input, `Y_k` for the k-th output, `V_<id>` otherwise.
    pub fn for_query(query: &Query) -> Self {
        let mut positions = HashMap::new();
        for (k, &v) in query.input_vars().iter().enumerate() {
            positions.insert(v, format!("X_{k}"));
        }
        for (k, &v) in query.output_vars().iter().enumerate() {
            positions.insert(v, format!("Y_{k}"));
        }
        Self { positions }
    }

    pub fn name(&self, variable: VariableId) -> String {
        self.positions
            .get(&variable)
            .cloned()
            .unwrap_or_else(|| format!("V_{variable}"))
    }
}

/// Render `query` as a VNN-LIB property.
pub fn render(query: &Query) -> String {
    let names = VariableNames::for_query(query);
    let mut out = String::new();

    out.push_str("; Generated by delta-verify\n");
    out.push_str(&format!("; Network: {}\n", query.network_name()));
    if let Some(delta) = query.delta() {
        out.push_str(&format!("; delta: {}\n", smt_real(delta)));
    }
    for diagnostic in query.diagnostics() {
        out.push_str(&format!("; warning: {diagnostic}\n"));
    }
    out.push('\n');

    out.push_str("; Input variables\n");
    for k in 0..query.input_vars().len() {
        out.push_str(&format!("(declare-const X_{k} Real)\n"));
    }
    out.push('\n');

    out.push_str("; Output variables\n");
    for k in 0..query.output_vars().len() {
        out.push_str(&format!("(declare-const Y_{k} Real)\n"));
    }
    out.push('\n');

    let io: BTreeSet<VariableId> = query
        .input_vars()
        .iter()
        .chain(query.output_vars())
        .copied()
        .collect();
    let hidden: BTreeSet<VariableId> = query
        .bounds()
        .map(|(v, _)| v)
        .chain(query.assertions().iter().flat_map(|a| a.variables()))
        .filter(|v| !io.contains(v))
        .collect();
    if !hidden.is_empty() {
        out.push_str("; Hidden variables\n");
        for v in &hidden {
            out.push_str(&format!("(declare-const V_{v} Real)\n"));
        }
        out.push('\n');
    }

    out.push_str("; Input constraints\n");
    push_bounds(&mut out, &names, query, query.input_vars());
    out.push('\n');

    out.push_str("; Output search envelope\n");
    push_bounds(&mut out, &names, query, query.output_vars());
    out.push('\n');

    let hidden_bounded: Vec<VariableId> = hidden
        .iter()
        .copied()
        .filter(|v| query.bound(*v).is_some())
        .collect();
    if !hidden_bounded.is_empty() {
        out.push_str("; Hidden variable bounds\n");
        push_bounds(&mut out, &names, query, &hidden_bounded);
        out.push('\n');
    }

    if !query.sigmoids().is_empty() {
        out.push_str("; Sigmoid constraints (solver-native)\n");
        for s in query.sigmoids() {
            out.push_str(&format!(
                "; {} : {} = sigmoid({})\n",
                s.serialize(),
                names.name(s.f),
                names.name(s.b)
            ));
        }
        out.push('\n');
    }

    out.push_str("; Output assertions\n");
    for assertion in query.assertions() {
        out.push_str(&format!(
            "(assert {})\n",
            assertion.to_smt(|v| names.name(v))
        ));
    }

    out
}

fn push_bounds(out: &mut String, names: &VariableNames, query: &Query, vars: &[VariableId]) {
    for &v in vars {
        if let Some(bound) = query.bound(v) {
            let name = names.name(v);
            out.push_str(&format!("(assert (>= {name} {}))\n", smt_real(bound.lower)));
            out.push_str(&format!("(assert (<= {name} {}))\n", smt_real(bound.upper)));
        }
    }
}
