//! Candidate call edges and the upstream-presence filter

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An observed parent→child call relationship considered for scoring
///
/// Direction matters: `(c, p)` and `(p, c)` are distinct edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEdge {
    /// Child entity id (the callee)
    pub c: String,
    /// Parent entity id (the caller)
    pub p: String,
    /// Observed call count over the evaluation window
    pub cnt: u64,
}

impl CandidateEdge {
    pub fn new(c: impl Into<String>, p: impl Into<String>, cnt: u64) -> Self {
        Self {
            c: c.into(),
            p: p.into(),
            cnt,
        }
    }
}

/// Keep only edges whose parent also appears as someone's child
///
/// An edge whose parent never shows up as a child is a pure root: no
/// observed upstream traffic exists for it to be the downstream effect of,
/// so it cannot be scored against anything. Surviving edges are returned
/// sorted descending by call count; `cnt` is never mutated.
pub fn filter_candidates(candidates: Vec<CandidateEdge>) -> Vec<CandidateEdge> {
    let child_set: HashSet<&str> = candidates.iter().map(|e| e.c.as_str()).collect();
    let parent_set: HashSet<&str> = candidates.iter().map(|e| e.p.as_str()).collect();

    tracing::info!("No. of child services: {}", child_set.len());
    tracing::info!("No. of parent services: {}", parent_set.len());
    tracing::info!(
        "No. of services in both child and parent: {}",
        child_set.intersection(&parent_set).count()
    );
    tracing::info!(
        "No. of parent not in child: {}",
        parent_set.difference(&child_set).count()
    );
    tracing::info!(
        "No. of child not in parent: {}",
        child_set.difference(&parent_set).count()
    );

    let child_set: HashSet<String> = child_set.into_iter().map(str::to_owned).collect();
    let mut filtered: Vec<CandidateEdge> = candidates
        .into_iter()
        .filter(|e| child_set.contains(&e.p))
        .collect();
    filtered.sort_by(|a, b| b.cnt.cmp(&a.cnt));
    filtered
}
