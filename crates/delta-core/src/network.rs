//! Network handles: the variable-id view of a loaded model.
//!
//! Query construction only needs to know which solver variables carry the
//! network's inputs and outputs. Layer structure and weights stay with the
//! external loader and solver.
//!
//! A [`NetworkDescriptor`] is the serialized form of that view:
//!
//! ```json
//! {
//!   "name": "mnist-sigmoid",
//!   "model_path": "mnist.pb",
//!   "input_vars": [[0, 1, 2]],
//!   "output_vars": [10, 11],
//!   "sigmoids": ["sigmoid,6,3"]
//! }
//! ```
//!
//! `input_vars` and `output_vars` may be flat or batch-nested; for nested
//! layouts the first batch entry is used.

use crate::{DeltaError, Result, SigmoidConstraint, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read-only view of a network's solver variables.
pub trait NetworkHandle {
    /// Human-readable network name used in logs.
    fn name(&self) -> &str;

    /// Input variable ids, in input-vector order.
    fn input_variable_ids(&self) -> &[VariableId];

    /// Output variable ids, in output-vector order.
    fn output_variable_ids(&self) -> &[VariableId];

    /// Sigmoid activation constraints the model contributes to every query.
    fn sigmoid_constraints(&self) -> &[SigmoidConstraint] {
        &[]
    }

    /// Serialized model the solver should load, if the handle knows it.
    fn model_path(&self) -> Option<&Path> {
        None
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum VariableLayout {
    Flat(Vec<VariableId>),
    Batched(Vec<Vec<VariableId>>),
}

impl VariableLayout {
    fn into_first_batch(self, what: &str) -> Result<Vec<VariableId>> {
        match self {
            VariableLayout::Flat(ids) => Ok(ids),
            VariableLayout::Batched(batches) => batches
                .into_iter()
                .next()
                .ok_or_else(|| DeltaError::ModelLoad(format!("{what} has an empty batch list"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    model_path: Option<PathBuf>,
    input_vars: VariableLayout,
    output_vars: VariableLayout,
    #[serde(default)]
    sigmoids: Vec<String>,
}

/// Serializable network handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkDescriptor {
    pub name: String,
    /// Serialized model handed to the solver, if any.
    pub model_path: Option<PathBuf>,
    pub input_vars: Vec<VariableId>,
    pub output_vars: Vec<VariableId>,
    #[serde(serialize_with = "serialize_sigmoids")]
    pub sigmoids: Vec<SigmoidConstraint>,
}

fn serialize_sigmoids<S: serde::Serializer>(
    sigmoids: &[SigmoidConstraint],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(sigmoids.iter().map(SigmoidConstraint::serialize))
}

impl NetworkDescriptor {
    /// Build a descriptor, checking that ids are present and distinct.
    pub fn new(
        name: impl Into<String>,
        input_vars: Vec<VariableId>,
        output_vars: Vec<VariableId>,
    ) -> Result<Self> {
        let descriptor = Self {
            name: name.into(),
            model_path: None,
            input_vars,
            output_vars,
            sigmoids: Vec::new(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Inputs get ids `0..num_inputs`, outputs the next `num_outputs` ids.
    pub fn contiguous(name: impl Into<String>, num_inputs: usize, num_outputs: usize) -> Result<Self> {
        Self::new(
            name,
            (0..num_inputs).collect(),
            (num_inputs..num_inputs + num_outputs).collect(),
        )
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn with_sigmoids(mut self, sigmoids: Vec<SigmoidConstraint>) -> Result<Self> {
        self.sigmoids = sigmoids;
        self.validate()?;
        Ok(self)
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawDescriptor = serde_json::from_str(json)?;
        let sigmoids = raw
            .sigmoids
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<SigmoidConstraint>>>()?;
        let descriptor = Self {
            name: raw.name.unwrap_or_else(|| "network".to_string()),
            model_path: raw.model_path,
            input_vars: raw.input_vars.into_first_batch("input_vars")?,
            output_vars: raw.output_vars.into_first_batch("output_vars")?,
            sigmoids,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load a descriptor file. A relative `model_path` is resolved against
    /// the descriptor's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DeltaError::ModelLoad(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut descriptor = Self::from_json_str(&text)?;
        let resolved = match (&descriptor.model_path, path.parent()) {
            (Some(model), Some(dir)) if model.is_relative() => Some(dir.join(model)),
            _ => None,
        };
        if resolved.is_some() {
            descriptor.model_path = resolved;
        }
        tracing::debug!(
            "Loaded network '{}' from {}: {} inputs, {} outputs, {} sigmoids",
            descriptor.name,
            path.display(),
            descriptor.input_vars.len(),
            descriptor.output_vars.len(),
            descriptor.sigmoids.len()
        );
        Ok(descriptor)
    }

    fn validate(&self) -> Result<()> {
        if self.input_vars.is_empty() {
            return Err(DeltaError::ModelLoad(format!(
                "network '{}' has no input variables",
                self.name
            )));
        }
        if self.output_vars.is_empty() {
            return Err(DeltaError::ModelLoad(format!(
                "network '{}' has no output variables",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for &v in self.input_vars.iter().chain(&self.output_vars) {
            if !seen.insert(v) {
                return Err(DeltaError::ModelLoad(format!(
                    "network '{}' uses variable x{v} more than once",
                    self.name
                )));
            }
        }
        for sigmoid in &self.sigmoids {
            if sigmoid.b == sigmoid.f {
                return Err(DeltaError::ModelLoad(format!(
                    "sigmoid constraint '{}' uses one variable for both sides",
                    sigmoid.serialize()
                )));
            }
        }
        Ok(())
    }
}

impl NetworkHandle for NetworkDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_variable_ids(&self) -> &[VariableId] {
        &self.input_vars
    }

    fn output_variable_ids(&self) -> &[VariableId] {
        &self.output_vars
    }

    fn sigmoid_constraints(&self) -> &[SigmoidConstraint] {
        &self.sigmoids
    }

    fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}
