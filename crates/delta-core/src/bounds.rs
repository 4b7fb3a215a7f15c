//! Per-variable bound table owned by a query under construction.

use crate::{Bound, DeltaError, Result, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bound whose endpoints may not have been assigned yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialBound {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl PartialBound {
    /// Both endpoints set.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// The complete bound, if both endpoints are present.
    pub fn to_bound(&self) -> Option<Bound> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => Some(Bound { lower, upper }),
            _ => None,
        }
    }
}

/// Mapping from variable id to its (possibly partial) bound.
///
/// Setting a bound again overwrites the previous value. Entries are kept
/// ordered by variable id so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundTable {
    entries: BTreeMap<VariableId, PartialBound>,
}

impl BoundTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_lower(&mut self, variable: VariableId, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(DeltaError::invalid_parameter(
                "lower bound",
                format!("NaN lower bound for x{variable}"),
            ));
        }
        self.entries.entry(variable).or_default().lower = Some(value);
        Ok(())
    }

    pub fn set_upper(&mut self, variable: VariableId, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(DeltaError::invalid_parameter(
                "upper bound",
                format!("NaN upper bound for x{variable}"),
            ));
        }
        self.entries.entry(variable).or_default().upper = Some(value);
        Ok(())
    }

    /// Set both endpoints at once.
    pub fn set(&mut self, variable: VariableId, bound: Bound) -> Result<()> {
        let bound = Bound::checked(variable, bound.lower, bound.upper)?;
        self.entries.insert(
            variable,
            PartialBound {
                lower: Some(bound.lower),
                upper: Some(bound.upper),
            },
        );
        Ok(())
    }

    pub fn get(&self, variable: VariableId) -> Option<&PartialBound> {
        self.entries.get(&variable)
    }

    /// Complete bound for `variable`, if both endpoints are set.
    pub fn bound(&self, variable: VariableId) -> Option<Bound> {
        self.entries.get(&variable).and_then(PartialBound::to_bound)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &PartialBound)> {
        self.entries.iter().map(|(&v, b)| (v, b))
    }

    /// Variables among `required` (plus any partially bounded entry) that
    /// lack a lower or an upper bound, sorted and deduplicated.
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a VariableId>) -> Vec<VariableId> {
        let mut missing: Vec<VariableId> = required
            .into_iter()
            .copied()
            .filter(|v| !self.get(*v).is_some_and(PartialBound::is_complete))
            .chain(
                self.entries
                    .iter()
                    .filter(|(_, b)| !b.is_complete())
                    .map(|(&v, _)| v),
            )
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Freeze into a complete table.
    ///
    /// Fails with [`DeltaError::IncompleteQuery`] if any required or stored
    /// variable lacks an endpoint, and with [`DeltaError::InvalidBound`] if
    /// separately set endpoints ended up inverted.
    pub fn finalize<'a>(
        &self,
        required: impl IntoIterator<Item = &'a VariableId>,
    ) -> Result<BTreeMap<VariableId, Bound>> {
        let missing = self.missing(required);
        if !missing.is_empty() {
            return Err(DeltaError::IncompleteQuery { missing });
        }
        self.entries
            .iter()
            .map(|(&v, b)| {
                // Every entry is complete once `missing` is empty.
                let lower = b.lower.unwrap_or(f64::NEG_INFINITY);
                let upper = b.upper.unwrap_or(f64::INFINITY);
                Bound::checked(v, lower, upper).map(|bound| (v, bound))
            })
            .collect()
    }
}
