//! KPI series table: (entity, kpi) → binned series, aligned on demand

use crate::timeindex::TimeIndex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KpiError {
    #[error("No series for entity {entity:?}, kpi {kpi:?}")]
    MissingSeries { entity: String, kpi: String },

    #[error("Cannot align onto an empty time index")]
    EmptyTimeIndex,
}

/// Read-only table of raw KPI series keyed by (entity id, kpi name)
///
/// Raw points are keyed by bin timestamp (unix seconds); alignment onto the
/// shared [`TimeIndex`] fills missing bins with zero. Built by a loader,
/// consumed read-only by the scorer.
#[derive(Debug, Clone, Default)]
pub struct KpiTable {
    series: HashMap<(String, String), BTreeMap<i64, f32>>,
}

impl KpiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of one bin of one (entity, kpi) series
    pub fn insert(&mut self, entity: &str, kpi: &str, bin_ts: i64, value: f32) {
        self.series
            .entry((entity.to_string(), kpi.to_string()))
            .or_default()
            .insert(bin_ts, value);
    }

    pub fn contains(&self, entity: &str, kpi: &str) -> bool {
        self.series
            .contains_key(&(entity.to_string(), kpi.to_string()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Reindex one series onto the shared time index, zero-filling gaps
    ///
    /// Every entity referenced by a surviving edge must resolve here;
    /// a missing (entity, kpi) pair fails the whole evaluation.
    pub fn aligned_series(
        &self,
        entity: &str,
        kpi: &str,
        index: &TimeIndex,
    ) -> Result<Vec<f32>, KpiError> {
        if index.is_empty() {
            return Err(KpiError::EmptyTimeIndex);
        }
        let raw = self
            .series
            .get(&(entity.to_string(), kpi.to_string()))
            .ok_or_else(|| KpiError::MissingSeries {
                entity: entity.to_string(),
                kpi: kpi.to_string(),
            })?;

        Ok(index
            .unix_bins()
            .map(|ts| raw.get(&ts).copied().unwrap_or(0.0))
            .collect())
    }
}
