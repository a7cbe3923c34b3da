//! Three-phase dependency-intensity scoring over filtered candidate edges
//!
//! Phase 1 computes a raw DSW distance per (edge, KPI) pair, fanned out
//! with rayon into immutable per-edge results. Phase 2
//! is the cross-edge normalization barrier: per KPI, raw distances across
//! all edges are rescaled together, so no normalized value exists until
//! every edge of that KPI has reported. Phase 3 collapses each edge's
//! normalized per-KPI vector to one intensity and ranks descending.
//!
//! Failures are whole-run: one missing series or bad configuration aborts
//! the batch. The computation is deterministic, so nothing is retried.

use crate::aggregate::Aggregation;
use crate::candidate::CandidateEdge;
use crate::kpi::{KpiError, KpiTable};
use crate::loader::{LoaderError, TraceLoader};
use crate::output::IntensityRecord;
use crate::timeindex::{TimeIndex, TimeIndexError};
use crate::transform::{TransformError, TransformPipeline};
use crate::warping::{dsw_distance, WarpingError};
use clap::ValueEnum;
use rayon::prelude::*;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use trueno::Vector;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Unsupported normalization mode: {0}")]
    UnsupportedNormalization(String),

    #[error("No candidate edges to score")]
    NoCandidates,

    #[error("Loader reported no KPI names")]
    NoKpis,

    #[error("Time index is empty")]
    EmptyTimeIndex,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Kpi(#[from] KpiError),

    #[error(transparent)]
    Warping(#[from] WarpingError),

    #[error(transparent)]
    TimeIndex(#[from] TimeIndexError),

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Cross-edge normalization applied per KPI in phase 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum NormalizationMode {
    /// Rescale raw distances to the observed cross-edge range
    #[default]
    MinMax,
    /// Softmax over the cross-edge raw-distance vector
    Softmax,
}

impl FromStr for NormalizationMode {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minmax" => Ok(NormalizationMode::MinMax),
            "softmax" => Ok(NormalizationMode::Softmax),
            other => Err(ScoreError::UnsupportedNormalization(other.to_string())),
        }
    }
}

/// What to do when an aligned series carries no signal at all
///
/// A constant series (typically: no errors observed anywhere in the window)
/// z-normalizes to all zeros, and two all-zero series warp at distance 0,
/// i.e. maximal apparent dependency from no evidence. The right treatment
/// is unresolved upstream, so the policy is configurable rather than baked
/// in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ConstantSeriesPolicy {
    /// Emit a warning per degenerate (edge, KPI) pair and keep scoring
    #[default]
    Warn,
    /// Score silently
    Silent,
}

/// Scoring configuration shared by every edge of one evaluation run
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Transform pipeline applied to child and parent series independently
    pub transforms: TransformPipeline,
    /// Max propagation window for the DSW distance
    pub mpw: usize,
    /// Phase-3 reduction across per-KPI normalized distances
    pub aggregation: Aggregation,
    /// Phase-2 cross-edge normalization
    pub normalization: NormalizationMode,
    /// Treatment of no-signal input series
    pub constant_policy: ConstantSeriesPolicy,
}

impl ScorerConfig {
    pub fn new(transforms: TransformPipeline, mpw: usize) -> Self {
        Self {
            transforms,
            mpw,
            aggregation: Aggregation::default(),
            normalization: NormalizationMode::default(),
            constant_policy: ConstantSeriesPolicy::default(),
        }
    }
}

/// Scores filtered candidate edges against a KPI table
pub struct IntensityScorer {
    config: ScorerConfig,
}

impl IntensityScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Run all three phases and return the ranked intensity list
    ///
    /// `edges` must already be filtered (every parent present in the child
    /// set); `kpi_names` is whatever list the loader reports, the scorer
    /// is agnostic to the concrete KPI set.
    pub fn score(
        &self,
        edges: &[CandidateEdge],
        kpis: &KpiTable,
        kpi_names: &[String],
        index: &TimeIndex,
    ) -> Result<Vec<IntensityRecord>, ScoreError> {
        if edges.is_empty() {
            return Err(ScoreError::NoCandidates);
        }
        if kpi_names.is_empty() {
            return Err(ScoreError::NoKpis);
        }
        if index.is_empty() {
            return Err(ScoreError::EmptyTimeIndex);
        }

        tracing::info!("Applied transformations: {:?}", self.config.transforms.stages());
        tracing::info!("DSW max propagation window: {}", self.config.mpw);

        // Phase 1: per-edge, per-KPI raw distances. No cross-edge
        // dependency, so edges fan out across the rayon pool and each task
        // produces an immutable distance vector merged by collect().
        let raw: Vec<Vec<f32>> = edges
            .par_iter()
            .map(|edge| self.edge_distances(edge, kpis, kpi_names, index))
            .collect::<Result<Vec<_>, ScoreError>>()?;

        // Phase 2 (barrier): cross-edge normalization, one KPI at a time.
        // normalized[e][k] for edge e, KPI k.
        let mut normalized = vec![vec![0.0f32; kpi_names.len()]; edges.len()];
        for k in 0..kpi_names.len() {
            let column: Vec<f32> = raw.iter().map(|dists| dists[k]).collect();
            let scaled = match self.config.normalization {
                NormalizationMode::MinMax => normalize_minmax(&column),
                NormalizationMode::Softmax => softmax(&column),
            };
            for (e, value) in scaled.into_iter().enumerate() {
                normalized[e][k] = value;
            }
        }

        // Phase 3: aggregate per edge; distance 0 is most similar, so the
        // published score is 1 - aggregate.
        let mut records: Vec<IntensityRecord> = edges
            .iter()
            .zip(&normalized)
            .map(|(edge, dists)| IntensityRecord {
                c: edge.c.clone(),
                p: edge.p.clone(),
                intensity: 1.0 - self.config.aggregation.apply(dists),
            })
            .collect();

        records.sort_by(|a, b| {
            b.intensity
                .partial_cmp(&a.intensity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::info!("Finish calculating intensity for {} edges", records.len());
        Ok(records)
    }

    /// Phase-1 work item: raw DSW distance for every KPI of one edge
    fn edge_distances(
        &self,
        edge: &CandidateEdge,
        kpis: &KpiTable,
        kpi_names: &[String],
        index: &TimeIndex,
    ) -> Result<Vec<f32>, ScoreError> {
        let mut distances = Vec::with_capacity(kpi_names.len());
        for kpi in kpi_names {
            let child = kpis.aligned_series(&edge.c, kpi, index)?;
            let parent = kpis.aligned_series(&edge.p, kpi, index)?;

            if self.config.constant_policy == ConstantSeriesPolicy::Warn {
                if is_constant(&child) {
                    tracing::warn!(
                        "Constant {kpi} series for child {}: no signal to warp against",
                        edge.c
                    );
                }
                if is_constant(&parent) {
                    tracing::warn!(
                        "Constant {kpi} series for parent {}: no signal to warp against",
                        edge.p
                    );
                }
            }

            let child = self.config.transforms.apply(&child);
            let parent = self.config.transforms.apply(&parent);
            distances.push(dsw_distance(&child, &parent, self.config.mpw)?);
        }
        Ok(distances)
    }
}

/// Evaluation options for the top-level scoring entry point
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Eight-digit start date, YYYYMMDD
    pub start: String,
    /// Eight-digit end date, YYYYMMDD
    pub end: String,
    /// Aggregation interval in minutes
    pub interval_min: u32,
    pub transforms: TransformPipeline,
    pub mpw: usize,
    pub aggregation: Aggregation,
    pub normalization: NormalizationMode,
    pub constant_policy: ConstantSeriesPolicy,
}

/// Scoring entry point: load, filter, score, rank
///
/// Given a data source and a time window, produces the ranked intensity
/// list. All failures (configuration, data) abort the whole evaluation.
pub fn evaluate(
    loader: &dyn TraceLoader,
    path: &Path,
    opts: &EvalOptions,
) -> Result<Vec<IntensityRecord>, ScoreError> {
    tracing::info!("Data source: {}", path.display());
    let trace = loader.load(path, opts.interval_min)?;
    tracing::info!(
        "Finished loading: {} candidates, {} entities, {} KPIs",
        trace.candidates.len(),
        trace.entities.len(),
        trace.kpi_names.len()
    );

    tracing::info!("No. of candidates before filter: {}", trace.candidates.len());
    let filtered = crate::candidate::filter_candidates(trace.candidates);
    tracing::info!("No. of candidates after filter: {}", filtered.len());

    let index = TimeIndex::from_dates(&opts.start, &opts.end, opts.interval_min)?;
    tracing::info!(
        "Time index: {} bins at {} min",
        index.len(),
        index.interval_min()
    );

    let config = ScorerConfig {
        transforms: opts.transforms.clone(),
        mpw: opts.mpw,
        aggregation: opts.aggregation,
        normalization: opts.normalization,
        constant_policy: opts.constant_policy,
    };
    IntensityScorer::new(config).score(&filtered, &trace.kpis, &trace.kpi_names, &index)
}

/// Subtract the minimum always; rescale only when the range is nonzero
///
/// The order matters when max == min but min != 0: every edge still gets
/// raw - min = 0, not its raw value. "Compare then pick one path" would
/// silently diverge here.
pub fn normalize_minmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let v = Vector::from_slice(raw);
    let min = v.min().unwrap_or(0.0);
    let max = v.max().unwrap_or(0.0);
    let range = max - min;
    raw.iter()
        .map(|x| {
            let shifted = x - min;
            if range > 0.0 {
                shifted / range
            } else {
                shifted
            }
        })
        .collect()
}

/// Numerically stable softmax over the raw-distance vector
pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = Vector::from_slice(raw).max().unwrap_or(0.0);
    let exps: Vec<f32> = raw.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn is_constant(series: &[f32]) -> bool {
    series.windows(2).all(|w| w[0] == w[1])
}
