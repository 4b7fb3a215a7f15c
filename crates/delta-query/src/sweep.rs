//! δ sweeps: one independent query per perturbation radius.
//!
//! Each query is built by its own [`QueryBuilder`], so sweeps parallelize
//! without synchronization; the shared network is only read.

use crate::builder::{validate_delta, validate_large, QueryBuilder};
use delta_core::{DeltaError, NetworkHandle, Query, Result};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters shared by every query of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSweep {
    /// Perturbation radii, in the order queries are produced.
    pub deltas: Vec<f64>,
    /// Output search envelope half-width.
    pub large: f64,
    /// Output index pairs `(i, j)` asserted as `output[i] - output[j] <= 0`.
    pub pairs: Vec<(usize, usize)>,
    /// Output values from a prior evaluation, for envelope warnings.
    pub reference_outputs: Option<Vec<f64>>,
}

impl DeltaSweep {
    pub fn new(deltas: Vec<f64>, large: f64) -> Self {
        Self {
            deltas,
            large,
            pairs: Vec::new(),
            reference_outputs: None,
        }
    }

    pub fn with_pair(mut self, i: usize, j: usize) -> Self {
        self.pairs.push((i, j));
        self
    }

    pub fn with_reference_outputs(mut self, outputs: Vec<f64>) -> Self {
        self.reference_outputs = Some(outputs);
        self
    }

    /// Check sweep-level parameters without building anything.
    pub fn validate(&self) -> Result<()> {
        if self.deltas.is_empty() {
            return Err(DeltaError::invalid_parameter(
                "deltas",
                "sweep needs at least one delta",
            ));
        }
        for &delta in &self.deltas {
            validate_delta(delta)?;
        }
        validate_large(self.large)
    }

    /// Build the query for a single `delta`.
    pub fn query_for<N: NetworkHandle + ?Sized>(
        &self,
        network: &N,
        base_input: &[f64],
        delta: f64,
    ) -> Result<Query> {
        let mut builder = QueryBuilder::new(network);
        builder
            .set_input_bounds(base_input, delta)?
            .set_output_search_bounds(self.large)?;
        if let Some(outputs) = &self.reference_outputs {
            builder.observe_outputs(outputs)?;
        }
        for &(i, j) in &self.pairs {
            builder.add_pairwise_assertion(i, j)?;
        }
        builder.build()
    }

    /// Build every query in order on the current thread.
    pub fn build<N: NetworkHandle + ?Sized>(
        &self,
        network: &N,
        base_input: &[f64],
    ) -> Result<Vec<Query>> {
        self.validate()?;
        let start = Instant::now();
        let queries = self
            .deltas
            .iter()
            .map(|&delta| self.query_for(network, base_input, delta))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Built {} sweep queries for '{}' in {:?}",
            queries.len(),
            network.name(),
            start.elapsed()
        );
        Ok(queries)
    }

    /// Build every query with rayon. Output order matches `deltas`.
    pub fn build_parallel<N: NetworkHandle + Sync + ?Sized>(
        &self,
        network: &N,
        base_input: &[f64],
    ) -> Result<Vec<Query>> {
        self.validate()?;
        let start = Instant::now();
        let queries = self
            .deltas
            .par_iter()
            .map(|&delta| self.query_for(network, base_input, delta))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Built {} sweep queries for '{}' in parallel ({} threads) in {:?}",
            queries.len(),
            network.name(),
            rayon::current_num_threads(),
            start.elapsed()
        );
        Ok(queries)
    }
}
