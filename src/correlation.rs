//! Correlation coefficients between two KPI series
//!
//! Alternatives to the warping distance for edge similarity. Not on the
//! default scoring path; a zero-variance input yields a coefficient of 0
//! rather than NaN, consistent with how the transforms treat constant
//! series as carrying no signal.

use thiserror::Error;
use trueno::Vector;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("Series lengths differ: {a} vs {b}")]
    LengthMismatch { a: usize, b: usize },

    #[error("Need at least two points, got {0}")]
    InsufficientData(usize),
}

fn check_inputs(a: &[f32], b: &[f32]) -> Result<(), CorrelationError> {
    if a.len() != b.len() {
        return Err(CorrelationError::LengthMismatch {
            a: a.len(),
            b: b.len(),
        });
    }
    if a.len() < 2 {
        return Err(CorrelationError::InsufficientData(a.len()));
    }
    Ok(())
}

/// Pearson product-moment correlation coefficient
pub fn pearson(ts_a: &[f32], ts_b: &[f32]) -> Result<f32, CorrelationError> {
    check_inputs(ts_a, ts_b)?;
    let mean_a = Vector::from_slice(ts_a).mean().unwrap_or(0.0);
    let mean_b = Vector::from_slice(ts_b).mean().unwrap_or(0.0);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in ts_a.iter().zip(ts_b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Spearman rank correlation: Pearson over average ranks
pub fn spearman(ts_a: &[f32], ts_b: &[f32]) -> Result<f32, CorrelationError> {
    check_inputs(ts_a, ts_b)?;
    let ranks_a = average_ranks(ts_a);
    let ranks_b = average_ranks(ts_b);
    pearson(&ranks_a, &ranks_b)
}

/// Kendall rank correlation (tau-b, tie-corrected)
pub fn kendall(ts_a: &[f32], ts_b: &[f32]) -> Result<f32, CorrelationError> {
    check_inputs(ts_a, ts_b)?;
    let n = ts_a.len();
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_a = 0i64;
    let mut ties_b = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let da = ts_a[i] - ts_a[j];
            let db = ts_b[i] - ts_b[j];
            if da == 0.0 && db == 0.0 {
                continue;
            } else if da == 0.0 {
                ties_a += 1;
            } else if db == 0.0 {
                ties_b += 1;
            } else if (da > 0.0) == (db > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let n0 = concordant + discordant;
    let denom = (((n0 + ties_a) as f64) * ((n0 + ties_b) as f64)).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok(((concordant - discordant) as f64 / denom) as f32)
}

/// Ranks with ties sharing their average position (1-based)
fn average_ranks(values: &[f32]) -> Vec<f32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut pos = 0;
    while pos < order.len() {
        let mut end = pos;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[pos]] {
            end += 1;
        }
        // Average 1-based rank over the tie group
        let avg = (pos + end) as f32 / 2.0 + 1.0;
        for &idx in &order[pos..=end] {
            ranks[idx] = avg;
        }
        pos = end + 1;
    }
    ranks
}
