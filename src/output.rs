//! Result emission: JSON and CSV renderings of the ranked intensity list
//!
//! The serialized shape is a flat list of 3-field records; field names and
//! order (`c`, `p`, `intensity`) are load-bearing for downstream consumers.

use serde::{Deserialize, Serialize};

/// One scored edge: the only fields surfaced externally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityRecord {
    /// Child entity id
    pub c: String,
    /// Parent entity id
    pub p: String,
    /// Inferred dependency intensity, higher = stronger
    pub intensity: f32,
}

/// Serialize the ranked list as a pretty-printed JSON array
pub fn to_json(records: &[IntensityRecord]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Render the ranked list as CSV with a `c,p,intensity` header
pub fn to_csv(records: &[IntensityRecord]) -> String {
    let mut out = String::from("c,p,intensity\n");
    for record in records {
        out.push_str(&escape_field(&record.c));
        out.push(',');
        out.push_str(&escape_field(&record.p));
        out.push(',');
        out.push_str(&record.intensity.to_string());
        out.push('\n');
    }
    out
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
