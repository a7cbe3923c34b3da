//! Offline model-evaluation helpers
//!
//! Descriptive error measures for comparing ranked intensities against
//! labeled ground truth. Not part of the scoring path.

use thiserror::Error;
use trueno::Vector;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetricError {
    #[error("Label and prediction lengths differ: {labels} vs {preds}")]
    LengthMismatch { labels: usize, preds: usize },

    #[error("Cannot evaluate empty inputs")]
    Empty,
}

fn check_inputs(labels: &[f32], preds: &[f32]) -> Result<(), MetricError> {
    if labels.len() != preds.len() {
        return Err(MetricError::LengthMismatch {
            labels: labels.len(),
            preds: preds.len(),
        });
    }
    if labels.is_empty() {
        return Err(MetricError::Empty);
    }
    Ok(())
}

/// Binary cross-entropy between labels in {0, 1} and predictions in (0, 1)
pub fn cross_entropy(labels: &[f32], preds: &[f32]) -> Result<f32, MetricError> {
    check_inputs(labels, preds)?;
    let sum: f32 = labels
        .iter()
        .zip(preds)
        .map(|(y, p)| (1.0 - y) * (1.0 - p).ln() + y * p.ln())
        .sum();
    Ok(-sum / labels.len() as f32)
}

/// Mean absolute error
pub fn mean_absolute_error(labels: &[f32], preds: &[f32]) -> Result<f32, MetricError> {
    check_inputs(labels, preds)?;
    let abs_diff: Vec<f32> = labels.iter().zip(preds).map(|(y, p)| (p - y).abs()).collect();
    Ok(Vector::from_slice(&abs_diff).mean().unwrap_or(0.0))
}

/// Root mean squared error
pub fn root_mean_squared_error(labels: &[f32], preds: &[f32]) -> Result<f32, MetricError> {
    check_inputs(labels, preds)?;
    let sq_diff: Vec<f32> = labels
        .iter()
        .zip(preds)
        .map(|(y, p)| (p - y) * (p - y))
        .collect();
    Ok(Vector::from_slice(&sq_diff).mean().unwrap_or(0.0).sqrt())
}
