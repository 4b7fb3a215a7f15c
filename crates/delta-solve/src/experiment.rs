//! Experiment configuration.
//!
//! An experiment is one JSON document naming the network, the base input,
//! the δ values to sweep and where results go:
//!
//! ```json
//! {
//!   "experiment_id": "mnist-3v7",
//!   "output_dir": "results",
//!   "network": "mnist.net.json",
//!   "base_input": "image0.json",
//!   "deltas": [0.01, 0.4, 0.7],
//!   "large": 1000.0,
//!   "pairs": [[3, 7]],
//!   "solver": { "binary": "Marabou", "timeout_secs": 600 }
//! }
//! ```
//!
//! Relative paths are resolved against the config file's directory.

use crate::marabou::MarabouConfig;
use crate::{Result, SolveError};
use delta_core::NetworkDescriptor;
use delta_query::DeltaSweep;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default output search envelope half-width.
pub const DEFAULT_LARGE: f64 = 1000.0;

fn default_large() -> f64 {
    DEFAULT_LARGE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

/// The unperturbed input, inline or as a path to a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseInput {
    Inline(Vec<f64>),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Names the result directory under `output_dir`.
    pub experiment_id: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Network descriptor JSON.
    pub network: PathBuf,
    pub base_input: BaseInput,
    pub deltas: Vec<f64>,
    #[serde(default = "default_large")]
    pub large: f64,
    /// Output index pairs `(i, j)` asserted as `y_i - y_j <= 0`.
    #[serde(default)]
    pub pairs: Vec<(usize, usize)>,
    #[serde(default)]
    pub reference_outputs: Option<Vec<f64>>,
    /// Build the sweep's queries with rayon.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub solver: MarabouConfig,
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, resolving relative paths against its directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SolveError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        tracing::debug!(
            "Loaded experiment '{}' from {}: {} deltas, {} pairs",
            config.experiment_id,
            path.display(),
            config.deltas.len(),
            config.pairs.len()
        );
        Ok(config)
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.network);
        resolve(&mut self.output_dir);
        if let BaseInput::Path(p) = &mut self.base_input {
            resolve(p);
        }
    }

    /// Checks that need no filesystem access.
    pub fn validate(&self) -> Result<()> {
        let id = self.experiment_id.as_str();
        if id.is_empty() || id == "." || id == ".." || id.contains(&['/', '\\'][..]) {
            return Err(SolveError::Config(format!(
                "experiment_id '{id}' must be a non-empty single path component"
            )));
        }
        self.sweep().validate()?;
        Ok(())
    }

    pub fn load_network(&self) -> Result<NetworkDescriptor> {
        Ok(NetworkDescriptor::from_path(&self.network)?)
    }

    pub fn load_base_input(&self) -> Result<Vec<f64>> {
        match &self.base_input {
            BaseInput::Inline(values) => Ok(values.clone()),
            BaseInput::Path(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SolveError::Config(format!("cannot read base input {}: {e}", path.display()))
                })?;
                Ok(serde_json::from_str(&text)?)
            }
        }
    }

    /// The sweep this experiment runs.
    pub fn sweep(&self) -> DeltaSweep {
        DeltaSweep {
            deltas: self.deltas.clone(),
            large: self.large,
            pairs: self.pairs.clone(),
            reference_outputs: self.reference_outputs.clone(),
        }
    }
}
