//! Single-pass construction of a verification query.
//!
//! The builder owns its bound table and only reads the network handle, so
//! several builders may share one network across threads.

use delta_core::{
    Bound, BoundTable, DeltaError, LinearAssertion, NetworkHandle, Query, QueryDiagnostic,
    QueryParts, Result, SigmoidConstraint, VariableId,
};
use tracing::{debug, warn};

/// Builds a [`Query`] from a network, a base input, δ and output assertions.
///
/// ```ignore
/// let mut builder = QueryBuilder::new(&network);
/// builder
///     .set_input_bounds(&image, 0.01)?
///     .set_output_search_bounds(100.0)?
///     .add_pairwise_assertion(label, target)?;
/// let query = builder.build()?;
/// ```
#[derive(Debug)]
pub struct QueryBuilder<'n, N: NetworkHandle + ?Sized> {
    network: &'n N,
    bounds: BoundTable,
    assertions: Vec<LinearAssertion>,
    sigmoids: Vec<SigmoidConstraint>,
    delta: Option<f64>,
    large: Option<f64>,
    reference_outputs: Option<Vec<f64>>,
    diagnostics: Vec<QueryDiagnostic>,
}

impl<'n, N: NetworkHandle + ?Sized> QueryBuilder<'n, N> {
    /// Start an empty query over `network`. The network's sigmoid
    /// constraints are carried over as-is.
    pub fn new(network: &'n N) -> Self {
        Self {
            network,
            bounds: BoundTable::new(),
            assertions: Vec::new(),
            sigmoids: network.sigmoid_constraints().to_vec(),
            delta: None,
            large: None,
            reference_outputs: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn network(&self) -> &N {
        self.network
    }

    /// Bound every input `v` to `[base_input[v] - delta, base_input[v] + delta]`.
    pub fn set_input_bounds(&mut self, base_input: &[f64], delta: f64) -> Result<&mut Self> {
        validate_delta(delta)?;
        let network = self.network;
        let input_vars = network.input_variable_ids();
        if base_input.len() != input_vars.len() {
            return Err(DeltaError::DimensionMismatch {
                expected: input_vars.len(),
                got: base_input.len(),
            });
        }
        if let Some(idx) = base_input.iter().position(|x| !x.is_finite()) {
            return Err(DeltaError::invalid_parameter(
                "base_input",
                format!("value at index {idx} is {}", base_input[idx]),
            ));
        }

        for (&var, &center) in input_vars.iter().zip(base_input) {
            self.bounds.set(var, Bound::symmetric(center, delta))?;
        }
        self.delta = Some(delta);
        debug!(
            "Input bounds set for {} variables (delta = {delta})",
            input_vars.len()
        );
        Ok(self)
    }

    /// Bound every output to `[-large, large]`.
    ///
    /// If output values from a previous evaluation were supplied with
    /// [`Self::observe_outputs`], magnitudes beyond `large` are reported as
    /// warnings and recorded on the query; they do not fail the call.
    pub fn set_output_search_bounds(&mut self, large: f64) -> Result<&mut Self> {
        validate_large(large)?;
        let network = self.network;
        for &var in network.output_variable_ids() {
            self.bounds.set(var, Bound::new(-large, large))?;
        }
        self.large = Some(large);
        self.refresh_envelope_diagnostics();
        Ok(self)
    }

    /// Record output values from a prior concrete evaluation of the network.
    pub fn observe_outputs(&mut self, outputs: &[f64]) -> Result<&mut Self> {
        let expected = self.network.output_variable_ids().len();
        if outputs.len() != expected {
            return Err(DeltaError::DimensionMismatch {
                expected,
                got: outputs.len(),
            });
        }
        self.reference_outputs = Some(outputs.to_vec());
        self.refresh_envelope_diagnostics();
        Ok(self)
    }

    fn refresh_envelope_diagnostics(&mut self) {
        self.diagnostics
            .retain(|d| !matches!(d, QueryDiagnostic::OutputEnvelopeExceeded { .. }));
        let network = self.network;
        let (Some(large), Some(observed)) = (self.large, &self.reference_outputs) else {
            return;
        };
        for (&variable, &value) in network.output_variable_ids().iter().zip(observed) {
            if value.abs() > large {
                let diagnostic = QueryDiagnostic::OutputEnvelopeExceeded {
                    variable,
                    observed: value,
                    large,
                };
                warn!("{diagnostic}; the search envelope may cut off real outputs");
                self.diagnostics.push(diagnostic);
            }
        }
    }

    /// Assert `output[i] - output[j] <= 0`.
    ///
    /// `i` and `j` index the network's output vector. Adding the same pair
    /// twice leaves a single conjunct.
    pub fn add_pairwise_assertion(&mut self, i: usize, j: usize) -> Result<&mut Self> {
        let network = self.network;
        let outputs = network.output_variable_ids();
        for index in [i, j] {
            if index >= outputs.len() {
                return Err(DeltaError::IndexOutOfRange {
                    index,
                    len: outputs.len(),
                });
            }
        }
        if i == j {
            return Err(DeltaError::invalid_parameter(
                "pair",
                format!("output {i} compared with itself"),
            ));
        }
        self.add_assertion(LinearAssertion::pairwise(outputs[i], outputs[j]))
    }

    /// Append a general linear assertion. Exact duplicates are dropped.
    pub fn add_assertion(&mut self, assertion: LinearAssertion) -> Result<&mut Self> {
        if assertion.addends.is_empty() {
            return Err(DeltaError::invalid_parameter(
                "assertion",
                "linear assertion without addends",
            ));
        }
        if assertion.scalar.is_nan() || assertion.addends.iter().any(|a| a.coefficient.is_nan()) {
            return Err(DeltaError::invalid_parameter(
                "assertion",
                format!("NaN in '{assertion}'"),
            ));
        }
        if self.assertions.contains(&assertion) {
            debug!("Skipping duplicate assertion: {assertion}");
        } else {
            self.assertions.push(assertion);
        }
        Ok(self)
    }

    /// Bound an arbitrary variable, e.g. a hidden neuron.
    pub fn set_bound(&mut self, variable: VariableId, lower: f64, upper: f64) -> Result<&mut Self> {
        self.bounds.set(variable, Bound::checked(variable, lower, upper)?)?;
        Ok(self)
    }

    /// Set only the lower endpoint of `variable`. The query will not build
    /// until the upper endpoint is set too.
    pub fn set_lower_bound(&mut self, variable: VariableId, value: f64) -> Result<&mut Self> {
        self.bounds.set_lower(variable, value)?;
        Ok(self)
    }

    /// Set only the upper endpoint of `variable`.
    pub fn set_upper_bound(&mut self, variable: VariableId, value: f64) -> Result<&mut Self> {
        self.bounds.set_upper(variable, value)?;
        Ok(self)
    }

    pub fn add_sigmoid_constraint(&mut self, constraint: SigmoidConstraint) -> &mut Self {
        if !self.sigmoids.contains(&constraint) {
            self.sigmoids.push(constraint);
        }
        self
    }

    pub fn bounds(&self) -> &BoundTable {
        &self.bounds
    }

    pub fn assertions(&self) -> &[LinearAssertion] {
        &self.assertions
    }

    /// Produce the query. Does not consume or modify the builder.
    pub fn build(&self) -> Result<Query> {
        let query = Query::from_parts(QueryParts {
            network_name: self.network.name().to_string(),
            input_vars: self.network.input_variable_ids().to_vec(),
            output_vars: self.network.output_variable_ids().to_vec(),
            bounds: self.bounds.clone(),
            assertions: self.assertions.clone(),
            sigmoids: self.sigmoids.clone(),
            delta: self.delta,
            large: self.large,
            diagnostics: self.diagnostics.clone(),
        })?;
        debug!(
            "Built query for '{}': {} bounded variables, {} assertions, {} sigmoids",
            query.network_name(),
            query.num_bounded_variables(),
            query.assertions().len(),
            query.sigmoids().len()
        );
        Ok(query)
    }
}

/// δ must be a finite, non-negative number.
pub fn validate_delta(delta: f64) -> Result<()> {
    if delta.is_finite() && delta >= 0.0 {
        Ok(())
    } else {
        Err(DeltaError::invalid_parameter(
            "delta",
            format!("must be finite and >= 0, got {delta}"),
        ))
    }
}

/// The output envelope half-width must be finite and positive.
pub fn validate_large(large: f64) -> Result<()> {
    if large.is_finite() && large > 0.0 {
        Ok(())
    } else {
        Err(DeltaError::invalid_parameter(
            "large",
            format!("must be finite and > 0, got {large}"),
        ))
    }
}
