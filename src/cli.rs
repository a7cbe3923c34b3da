//! CLI argument parsing for Intensidad

use crate::aggregate::Aggregation;
use crate::scorer::{ConstantSeriesPolicy, NormalizationMode};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which loader parses the input file
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LoaderKind {
    /// JSON array of span records (generic trace export)
    Spans,
    /// Pre-aggregated vendor trace CSV
    Aggregated,
}

/// Output format for the ranked intensity list
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Flat JSON array of {c, p, intensity} records
    Json,
    /// CSV with a c,p,intensity header
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "intensidad")]
#[command(version)]
#[command(about = "Dependency-intensity scoring for distributed traces", long_about = None)]
pub struct Cli {
    /// Trace file to score
    pub input: PathBuf,

    /// Input format / loader variant
    #[arg(long = "loader", value_enum, default_value = "spans")]
    pub loader: LoaderKind,

    /// Evaluation window start date (YYYYMMDD)
    #[arg(long, value_name = "YYYYMMDD")]
    pub start: String,

    /// Evaluation window end date (YYYYMMDD), inclusive
    #[arg(long, value_name = "YYYYMMDD")]
    pub end: String,

    /// Aggregation interval in minutes (1 minute is recommended)
    #[arg(long, value_name = "MINUTES", default_value = "1")]
    pub interval: u32,

    /// Transform pipeline applied to each series, e.g. zn,ma:15
    #[arg(long, value_name = "SPEC", default_value = "zn,ma:15")]
    pub transforms: String,

    /// Max propagation window in time bins
    #[arg(long, value_name = "BINS", default_value = "5")]
    pub mpw: usize,

    /// Cross-edge normalization of per-KPI distances
    #[arg(long, value_enum, default_value = "min-max")]
    pub normalization: NormalizationMode,

    /// Aggregation of normalized per-KPI distances per edge
    #[arg(long, value_enum, default_value = "mean")]
    pub aggregation: Aggregation,

    /// Treatment of constant (no-signal) input series
    #[arg(long = "constant-series", value_enum, default_value = "warn")]
    pub constant_policy: ConstantSeriesPolicy,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}
