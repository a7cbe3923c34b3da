//! Shared evaluation time index: evenly spaced minute bins
//!
//! Built once per run from eight-digit dates, spanning `start 00:00:00`
//! through `end 23:59:00` UTC at the configured interval. Strictly
//! increasing, no gaps. Loaders use the same binning rule
//! ([`floor_to_interval`]) so raw timestamps land on index bins exactly.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeIndexError {
    #[error("Invalid date (expected YYYYMMDD): {0}")]
    InvalidDate(String),

    #[error("Aggregation interval must be at least one minute")]
    InvalidInterval,

    #[error("Start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
}

/// Floor a unix timestamp (seconds) to its interval bin
pub fn floor_to_interval(ts_secs: i64, interval_min: u32) -> i64 {
    let bin = i64::from(interval_min) * 60;
    ts_secs.div_euclid(bin) * bin
}

/// The ordered, evenly spaced bin timestamps of one evaluation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeIndex {
    bins: Vec<DateTime<Utc>>,
    interval_min: u32,
}

impl TimeIndex {
    /// Build the index from eight-digit dates at `interval_min` spacing
    pub fn from_dates(start: &str, end: &str, interval_min: u32) -> Result<Self, TimeIndexError> {
        if interval_min == 0 {
            return Err(TimeIndexError::InvalidInterval);
        }
        let start_day = parse_yyyymmdd(start)?;
        let end_day = parse_yyyymmdd(end)?;
        if start_day > end_day {
            return Err(TimeIndexError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let first = Utc.from_utc_datetime(&start_day.and_hms_opt(0, 0, 0).unwrap());
        let last = Utc.from_utc_datetime(&end_day.and_hms_opt(23, 59, 0).unwrap());

        let step = chrono::Duration::minutes(i64::from(interval_min));
        let mut bins = Vec::new();
        let mut t = first;
        while t <= last {
            bins.push(t);
            t = t + step;
        }

        Ok(Self { bins, interval_min })
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn interval_min(&self) -> u32 {
        self.interval_min
    }

    pub fn bins(&self) -> &[DateTime<Utc>] {
        &self.bins
    }

    /// Bin timestamps as unix seconds, in index order
    pub fn unix_bins(&self) -> impl Iterator<Item = i64> + '_ {
        self.bins.iter().map(|t| t.timestamp())
    }
}

fn parse_yyyymmdd(s: &str) -> Result<NaiveDate, TimeIndexError> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
        .map_err(|_| TimeIndexError::InvalidDate(s.to_string()))
}
