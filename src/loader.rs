//! Trace loaders: turn raw telemetry files into candidates + KPI series
//!
//! Two concrete sources are supported behind one contract. The span loader
//! consumes generic span records (JSON) and derives per-service KPIs by
//! joining child spans to their parents. The aggregated loader consumes
//! vendor exports that already carry per-interval aggregates per
//! parent/child service pair and re-bins them onto the evaluation interval.
//! The scorer is agnostic to which one produced the table.

use crate::candidate::CandidateEdge;
use crate::kpi::KpiTable;
use crate::timeindex::floor_to_interval;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use trueno::Vector;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("I/O error reading trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed span JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed aggregate CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unparseable timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Everything a loader hands to the scoring pipeline
#[derive(Debug, Clone)]
pub struct LoadedTrace {
    /// Raw candidate edges (pre-filter), self-edges already dropped
    pub candidates: Vec<CandidateEdge>,
    /// (entity, kpi) → binned series
    pub kpis: KpiTable,
    /// All known entity ids, sorted
    pub entities: Vec<String>,
    /// KPI names present in the table, in reporting order
    pub kpi_names: Vec<String>,
}

/// Contract between a telemetry source and the scoring pipeline
pub trait TraceLoader {
    fn load(&self, path: &Path, interval_min: u32) -> Result<LoadedTrace, LoaderError>;
}

// ---------------------------------------------------------------------------
// Span-trace loader
// ---------------------------------------------------------------------------

/// Timestamp as emitted by span producers: unix seconds or a time string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TimestampValue {
    Unix(f64),
    Text(String),
}

impl TimestampValue {
    fn unix_seconds(&self) -> Result<i64, LoaderError> {
        match self {
            TimestampValue::Unix(secs) => Ok(*secs as i64),
            TimestampValue::Text(s) => parse_time_text(s),
        }
    }
}

fn parse_time_text(s: &str) -> Result<i64, LoaderError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| LoaderError::InvalidTimestamp(s.to_string()))
}

/// One span record from a generic trace export
#[derive(Debug, Clone, Deserialize)]
struct SpanRow {
    timestamp: TimestampValue,
    span_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    cmdb_id: String,
    duration: f32,
    #[serde(rename = "httpCode")]
    http_code: u16,
}

/// Loads a JSON array of span records
///
/// Candidate edges come from joining each span's `parent_id` to the owning
/// span; KPIs are derived per service per bin: duration max/avg/std, call
/// count, and HTTP error rate (`code != 200`).
#[derive(Debug, Default)]
pub struct SpanTraceLoader;

impl SpanTraceLoader {
    pub fn new() -> Self {
        Self
    }

    fn candidates(rows: &[SpanRow]) -> Vec<CandidateEdge> {
        let span_owner: HashMap<&str, &str> = rows
            .iter()
            .map(|r| (r.span_id.as_str(), r.cmdb_id.as_str()))
            .collect();

        let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
        for row in rows {
            let Some(parent_id) = row.parent_id.as_deref() else {
                continue;
            };
            let Some(parent_cmdb) = span_owner.get(parent_id) else {
                continue; // orphan: parent span not in this export
            };
            if *parent_cmdb == row.cmdb_id {
                continue; // self-edge
            }
            *counts
                .entry((row.cmdb_id.clone(), parent_cmdb.to_string()))
                .or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|((c, p), cnt)| CandidateEdge::new(c, p, cnt))
            .collect()
    }

    fn kpi_table(rows: &[SpanRow], interval_min: u32) -> Result<(KpiTable, Vec<String>), LoaderError> {
        struct BinAcc {
            durations: Vec<f32>,
            err_cnt: u32,
        }

        let mut bins: HashMap<(String, i64), BinAcc> = HashMap::new();
        for row in rows {
            let ts = floor_to_interval(row.timestamp.unix_seconds()?, interval_min);
            let acc = bins
                .entry((row.cmdb_id.clone(), ts))
                .or_insert_with(|| BinAcc {
                    durations: Vec::new(),
                    err_cnt: 0,
                });
            acc.durations.push(row.duration);
            if row.http_code != 200 {
                acc.err_cnt += 1;
            }
        }

        let mut table = KpiTable::new();
        for ((entity, ts), acc) in &bins {
            let v = Vector::from_slice(&acc.durations);
            let call_cnt = acc.durations.len() as f32;
            // Spread of a single observation is zero, not undefined
            let stddev = if acc.durations.len() >= 2 {
                v.stddev().unwrap_or(0.0)
            } else {
                0.0
            };
            table.insert(entity, "duration_max", *ts, v.max().unwrap_or(0.0));
            table.insert(entity, "duration_avg", *ts, v.mean().unwrap_or(0.0));
            table.insert(entity, "duration_std", *ts, stddev);
            table.insert(entity, "call_cnt", *ts, call_cnt);
            table.insert(entity, "http_err_rate", *ts, acc.err_cnt as f32 / call_cnt);
        }

        let kpi_names = vec![
            "duration_max".to_string(),
            "duration_avg".to_string(),
            "duration_std".to_string(),
            "call_cnt".to_string(),
            "http_err_rate".to_string(),
        ];
        Ok((table, kpi_names))
    }

    fn build(rows: Vec<SpanRow>, interval_min: u32) -> Result<LoadedTrace, LoaderError> {
        let candidates = Self::candidates(&rows);
        let (kpis, kpi_names) = Self::kpi_table(&rows, interval_min)?;
        let mut entities: Vec<String> = rows
            .iter()
            .map(|r| r.cmdb_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        entities.sort();

        Ok(LoadedTrace {
            candidates,
            kpis,
            entities,
            kpi_names,
        })
    }
}

impl TraceLoader for SpanTraceLoader {
    fn load(&self, path: &Path, interval_min: u32) -> Result<LoadedTrace, LoaderError> {
        let file = File::open(path)?;
        let rows: Vec<SpanRow> = serde_json::from_reader(std::io::BufReader::new(file))?;
        Self::build(rows, interval_min)
    }
}

// ---------------------------------------------------------------------------
// Pre-aggregated vendor-trace loader
// ---------------------------------------------------------------------------

/// Sentinel for rows whose parent service name is absent (trace roots)
const SOURCE_SENTINEL: &str = "Source";

/// One pre-aggregated CSV row: per-interval aggregates for one
/// parent→child service pair
#[derive(Debug, Clone, Deserialize)]
struct AggregatedRow {
    ts: i64,
    #[serde(default)]
    parent_csvc_name: Option<String>,
    #[serde(default)]
    parent_cmpt_name: Option<String>,
    child_csvc_name: String,
    child_cmpt_name: String,
    call_num_sum: f64,
    from_duration_avg: f64,
    from_duration_max: f64,
    to_duration_avg: f64,
    to_duration_max: f64,
    from_err_num_avg: f64,
    from_err_num_max: f64,
    to_err_num_avg: f64,
    to_err_num_max: f64,
}

impl AggregatedRow {
    fn parent_id(&self) -> String {
        let csvc = self.parent_csvc_name.as_deref().unwrap_or(SOURCE_SENTINEL);
        let cmpt = self.parent_cmpt_name.as_deref().unwrap_or(SOURCE_SENTINEL);
        format!("{csvc}::{cmpt}")
    }

    fn child_id(&self) -> String {
        format!("{}::{}", self.child_csvc_name, self.child_cmpt_name)
    }
}

/// Loads pre-aggregated vendor trace CSV
///
/// Per-pair averages are widened back to volume-weighted sums before
/// re-binning so that a bin's average is weighted by call count, not by
/// row count.
#[derive(Debug, Default)]
pub struct AggregatedTraceLoader;

/// Per-(entity, bin) accumulator for the aggregated loader
#[derive(Debug, Default)]
struct AggBin {
    call_num_sum: f64,
    from_duration_sum: f64,
    from_duration_max: f64,
    to_duration_sum: f64,
    to_duration_max: f64,
    from_err_num_sum: f64,
    from_err_num_max: f64,
    to_err_num_sum: f64,
    to_err_num_max: f64,
}

impl AggregatedTraceLoader {
    pub fn new() -> Self {
        Self
    }

    fn build(rows: Vec<AggregatedRow>, interval_min: u32) -> LoadedTrace {
        let mut counts: BTreeMap<(String, String), f64> = BTreeMap::new();
        let mut bins: HashMap<(String, i64), AggBin> = HashMap::new();

        for row in &rows {
            let parent = row.parent_id();
            let child = row.child_id();
            if parent == child {
                continue;
            }

            *counts.entry((child.clone(), parent)).or_insert(0.0) += row.call_num_sum;

            let ts = floor_to_interval(row.ts, interval_min);
            let bin = bins.entry((child, ts)).or_default();
            bin.call_num_sum += row.call_num_sum;
            bin.from_duration_sum += row.from_duration_avg * row.call_num_sum;
            bin.from_duration_max = bin.from_duration_max.max(row.from_duration_max);
            bin.to_duration_sum += row.to_duration_avg * row.call_num_sum;
            bin.to_duration_max = bin.to_duration_max.max(row.to_duration_max);
            bin.from_err_num_sum += row.from_err_num_avg * row.call_num_sum;
            bin.from_err_num_max = bin.from_err_num_max.max(row.from_err_num_max);
            bin.to_err_num_sum += row.to_err_num_avg * row.call_num_sum;
            bin.to_err_num_max = bin.to_err_num_max.max(row.to_err_num_max);
        }

        let candidates = counts
            .into_iter()
            .map(|((c, p), cnt)| CandidateEdge::new(c, p, cnt.round() as u64))
            .collect();

        let mut table = KpiTable::new();
        let mut entities: HashSet<String> = HashSet::new();
        for ((entity, ts), bin) in &bins {
            entities.insert(entity.clone());
            let calls = bin.call_num_sum;
            let weighted = |sum: f64| if calls > 0.0 { sum / calls } else { 0.0 };
            table.insert(entity, "call_num_sum", *ts, calls as f32);
            table.insert(entity, "from_duration_avg", *ts, weighted(bin.from_duration_sum) as f32);
            table.insert(entity, "from_duration_max", *ts, bin.from_duration_max as f32);
            table.insert(entity, "to_duration_avg", *ts, weighted(bin.to_duration_sum) as f32);
            table.insert(entity, "to_duration_max", *ts, bin.to_duration_max as f32);
            table.insert(entity, "from_err_num_max", *ts, bin.from_err_num_max as f32);
            table.insert(entity, "to_err_num_max", *ts, bin.to_err_num_max as f32);
            table.insert(entity, "from_err_rate", *ts, weighted(bin.from_err_num_sum) as f32);
            table.insert(entity, "to_err_rate", *ts, weighted(bin.to_err_num_sum) as f32);
        }

        let kpi_names = vec![
            "call_num_sum".to_string(),
            "from_duration_avg".to_string(),
            "from_duration_max".to_string(),
            "to_duration_avg".to_string(),
            "to_duration_max".to_string(),
            "from_err_num_max".to_string(),
            "to_err_num_max".to_string(),
            "from_err_rate".to_string(),
            "to_err_rate".to_string(),
        ];

        let mut entities: Vec<String> = entities.into_iter().collect();
        entities.sort();

        LoadedTrace {
            candidates,
            kpis: table,
            entities,
            kpi_names,
        }
    }
}

impl TraceLoader for AggregatedTraceLoader {
    fn load(&self, path: &Path, interval_min: u32) -> Result<LoadedTrace, LoaderError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows: Vec<AggregatedRow> = reader.deserialize().collect::<Result<_, _>>()?;
        Ok(Self::build(rows, interval_min))
    }
}
