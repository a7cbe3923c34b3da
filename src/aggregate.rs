//! Named reductions over per-KPI distance vectors

use clap::ValueEnum;
use trueno::Vector;

/// How a surviving edge's normalized per-KPI distances collapse to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Aggregation {
    /// Arithmetic mean across KPIs (default)
    #[default]
    Mean,
    /// Most similar KPI wins
    Min,
    /// Least similar KPI wins
    Max,
}

impl Aggregation {
    /// Reduce a non-empty slice of values to a single scalar
    pub fn apply(&self, values: &[f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        let v = Vector::from_slice(values);
        match self {
            Aggregation::Mean => v.mean().unwrap_or(0.0),
            Aggregation::Min => v.min().unwrap_or(0.0),
            Aggregation::Max => v.max().unwrap_or(0.0),
        }
    }
}
