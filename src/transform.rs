//! Elementary time-series transforms and the pipeline that chains them
//!
//! Each transform maps a 1-D series to a series of the same length. The
//! pipeline is a parsed, closed enum: unknown transform names are rejected
//! at configuration-parse time, never during scoring.

use thiserror::Error;
use trueno::Vector;

/// Default trailing window for the moving-average transforms
pub const DEFAULT_WINDOW: usize = 15;

/// Errors raised while parsing a transform specification
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unknown transform name: {0}")]
    UnknownTransform(String),

    #[error("Invalid parameter for {transform}: {value}")]
    InvalidParameter { transform: String, value: String },

    #[error("Empty transform specification")]
    EmptySpec,
}

/// A single named transform with its typed parameters
///
/// The text form accepted by [`TransformPipeline::parse`] uses the short
/// names `diff`, `ot`, `zn`, `mm`, `ma[:w]`, `ema[:w]` (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// First difference; element 0 keeps the original first value
    Diff,
    /// Subtract the series mean
    OffsetTranslation,
    /// Subtract mean, divide by stddev (skipped when stddev is zero)
    ZNormalize,
    /// Map to [0, 1] (division skipped when max equals min)
    MinMax,
    /// Simple trailing-window mean; first `window - 1` points keep
    /// their original values
    MovingAverage { window: usize },
    /// Exponentially weighted trailing-window mean, same warm-up policy
    /// as `MovingAverage`
    Ema { window: usize },
}

impl Transform {
    /// Parse a single `NAME` or `NAME:param` stage
    fn parse_stage(stage: &str) -> Result<Self, TransformError> {
        let stage = stage.trim();
        let (name, param) = match stage.split_once(':') {
            Some((n, p)) => (n, Some(p)),
            None => (stage, None),
        };

        let window = |param: Option<&str>| -> Result<usize, TransformError> {
            match param {
                None => Ok(DEFAULT_WINDOW),
                Some(p) => {
                    let w: usize =
                        p.trim()
                            .parse()
                            .map_err(|_| TransformError::InvalidParameter {
                                transform: name.to_uppercase(),
                                value: p.to_string(),
                            })?;
                    if w == 0 {
                        return Err(TransformError::InvalidParameter {
                            transform: name.to_uppercase(),
                            value: p.to_string(),
                        });
                    }
                    Ok(w)
                }
            }
        };

        match name.to_ascii_uppercase().as_str() {
            "DIFF" => Ok(Transform::Diff),
            "OT" => Ok(Transform::OffsetTranslation),
            "ZN" => Ok(Transform::ZNormalize),
            "MM" => Ok(Transform::MinMax),
            "MA" => Ok(Transform::MovingAverage { window: window(param)? }),
            "EMA" => Ok(Transform::Ema { window: window(param)? }),
            _ => Err(TransformError::UnknownTransform(name.to_string())),
        }
    }

    /// Apply this transform to a series, returning a series of equal length
    pub fn apply(&self, series: &[f32]) -> Vec<f32> {
        match self {
            Transform::Diff => diff(series),
            Transform::OffsetTranslation => offset_translation(series),
            Transform::ZNormalize => z_normalize(series),
            Transform::MinMax => min_max(series),
            Transform::MovingAverage { window } => moving_average(series, *window),
            Transform::Ema { window } => ema(series, *window),
        }
    }
}

/// An ordered sequence of transforms applied left-to-right
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPipeline {
    stages: Vec<Transform>,
}

impl TransformPipeline {
    /// Build a pipeline from already-parsed stages
    pub fn new(stages: Vec<Transform>) -> Self {
        Self { stages }
    }

    /// Parse a comma-separated spec such as `"zn,ma:15"`
    pub fn parse(spec: &str) -> Result<Self, TransformError> {
        if spec.trim().is_empty() {
            return Err(TransformError::EmptySpec);
        }
        let stages = spec
            .split(',')
            .map(Transform::parse_stage)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    /// Apply every stage in order, each consuming the previous output
    pub fn apply(&self, series: &[f32]) -> Vec<f32> {
        let mut current = series.to_vec();
        for stage in &self.stages {
            current = stage.apply(&current);
        }
        current
    }

    pub fn stages(&self) -> &[Transform] {
        &self.stages
    }
}

fn diff(series: &[f32]) -> Vec<f32> {
    if series.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(series.len());
    out.push(series[0]);
    for w in series.windows(2) {
        out.push(w[1] - w[0]);
    }
    out
}

fn offset_translation(series: &[f32]) -> Vec<f32> {
    if series.is_empty() {
        return Vec::new();
    }
    let mean = Vector::from_slice(series).mean().unwrap_or(0.0);
    series.iter().map(|x| x - mean).collect()
}

fn z_normalize(series: &[f32]) -> Vec<f32> {
    if series.is_empty() {
        return Vec::new();
    }
    let v = Vector::from_slice(series);
    let mean = v.mean().unwrap_or(0.0);
    let stddev = v.stddev().unwrap_or(0.0);
    // Constant series: divide skipped, output is the mean-centered zeros
    if stddev == 0.0 {
        series.iter().map(|x| x - mean).collect()
    } else {
        series.iter().map(|x| (x - mean) / stddev).collect()
    }
}

fn min_max(series: &[f32]) -> Vec<f32> {
    if series.is_empty() {
        return Vec::new();
    }
    let v = Vector::from_slice(series);
    let min = v.min().unwrap_or(0.0);
    let max = v.max().unwrap_or(0.0);
    let range = max - min;
    if range == 0.0 {
        series.iter().map(|x| x - min).collect()
    } else {
        series.iter().map(|x| (x - min) / range).collect()
    }
}

fn moving_average(series: &[f32], window: usize) -> Vec<f32> {
    let mut out = series.to_vec();
    if window <= 1 || series.len() < window {
        return out;
    }
    // First window-1 points keep original values (no NaN warm-up region)
    for i in (window - 1)..series.len() {
        let sum: f32 = series[i + 1 - window..=i].iter().sum();
        out[i] = sum / window as f32;
    }
    out
}

fn ema(series: &[f32], window: usize) -> Vec<f32> {
    let mut out = series.to_vec();
    if window <= 1 || series.len() < window {
        return out;
    }
    // Exponential weights over the trailing window, newest point heaviest
    let alpha = 2.0 / (window as f32 + 1.0);
    let weights: Vec<f32> = (0..window).map(|k| alpha * (1.0 - alpha).powi(k as i32)).collect();
    let weight_sum: f32 = weights.iter().sum();
    for i in (window - 1)..series.len() {
        let mut acc = 0.0;
        for (k, w) in weights.iter().enumerate() {
            acc += w * series[i - k];
        }
        out[i] = acc / weight_sum;
    }
    out
}
