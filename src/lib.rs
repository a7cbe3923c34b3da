//! Intensidad - Dependency-intensity scoring for distributed traces
//!
//! This library estimates the strength of causal dependencies between
//! services from trace telemetry: candidate call edges are pruned, each
//! surviving edge's child and parent KPI series are transformed and
//! compared with an asymmetric time-warping distance tolerant of
//! propagation delay, and cross-edge normalization turns the per-KPI
//! distances into a single ranked intensity score.

pub mod aggregate;
pub mod candidate;
pub mod cli;
pub mod correlation;
pub mod kpi;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod scorer;
pub mod timeindex;
pub mod transform;
pub mod warping;
