//! Integration tests for the trace loaders and the evaluation entry point

use intensidad::aggregate::Aggregation;
use intensidad::loader::{AggregatedTraceLoader, SpanTraceLoader, TraceLoader};
use intensidad::scorer::{evaluate, ConstantSeriesPolicy, EvalOptions, NormalizationMode};
use intensidad::transform::TransformPipeline;
use serde_json::json;
use std::io::Write;

/// 2021-04-11 00:00:00 UTC
const DAY_START: i64 = 1_618_099_200;

fn span(
    ts: i64,
    span_id: &str,
    parent_id: Option<&str>,
    cmdb: &str,
    duration: f64,
    code: u16,
) -> serde_json::Value {
    let mut record = json!({
        "timestamp": ts,
        "span_id": span_id,
        "cmdb_id": cmdb,
        "duration": duration,
        "httpCode": code,
    });
    if let Some(parent) = parent_id {
        record["parent_id"] = json!(parent);
    }
    record
}

fn write_span_file(spans: &[serde_json::Value]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&spans).unwrap().as_bytes())
        .unwrap();
    file.flush().unwrap();
    file
}

fn default_options() -> EvalOptions {
    EvalOptions {
        start: "20210411".to_string(),
        end: "20210411".to_string(),
        interval_min: 60,
        transforms: TransformPipeline::parse("zn").unwrap(),
        mpw: 2,
        aggregation: Aggregation::Mean,
        normalization: NormalizationMode::MinMax,
        constant_policy: ConstantSeriesPolicy::Silent,
    }
}

#[test]
fn test_span_loader_builds_candidates_and_kpis() {
    let spans = vec![
        span(DAY_START, "s1", None, "gateway", 12.0, 200),
        span(DAY_START + 10, "s2", Some("s1"), "api", 5.0, 200),
        span(DAY_START + 3_600, "s3", Some("s1"), "api", 7.0, 500),
        span(DAY_START + 20, "s4", Some("s2"), "db", 2.0, 200),
    ];
    let file = write_span_file(&spans);

    let trace = SpanTraceLoader::new().load(file.path(), 60).unwrap();

    assert_eq!(trace.entities, vec!["api", "db", "gateway"]);
    assert_eq!(trace.kpi_names.len(), 5);
    assert_eq!(trace.candidates.len(), 2);
    assert!(trace
        .candidates
        .iter()
        .any(|e| e.c == "api" && e.p == "gateway" && e.cnt == 2));
    assert!(trace
        .candidates
        .iter()
        .any(|e| e.c == "db" && e.p == "api" && e.cnt == 1));
    assert!(trace.kpis.contains("api", "http_err_rate"));
    assert!(trace.kpis.contains("db", "duration_avg"));
}

#[test]
fn test_span_loader_rejects_malformed_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{not json").unwrap();
    file.flush().unwrap();
    assert!(SpanTraceLoader::new().load(file.path(), 1).is_err());
}

#[test]
fn test_evaluate_span_trace_end_to_end() {
    // gateway -> api -> {db, cache}: only api survives as a parent, so
    // the ranked output contains the db and cache edges.
    let mut spans = vec![span(DAY_START, "root", None, "gateway", 10.0, 200)];
    for hour in 0..24i64 {
        let ts = DAY_START + hour * 3_600;
        let api_span = format!("api-{hour}");
        spans.push(span(ts, &api_span, Some("root"), "api", 5.0 + hour as f64, 200));
        spans.push(span(
            ts + 5,
            &format!("db-{hour}"),
            Some(&api_span),
            "db",
            2.0 + hour as f64,
            200,
        ));
        spans.push(span(
            ts + 9,
            &format!("cache-{hour}"),
            Some(&api_span),
            "cache",
            1.0,
            if hour % 2 == 0 { 200 } else { 500 },
        ));
    }
    let file = write_span_file(&spans);

    let records = evaluate(&SpanTraceLoader::new(), file.path(), &default_options()).unwrap();

    assert_eq!(records.len(), 2);
    let children: Vec<&str> = records.iter().map(|r| r.c.as_str()).collect();
    assert!(children.contains(&"db"));
    assert!(children.contains(&"cache"));
    for record in &records {
        assert_eq!(record.p, "api");
        assert!(record.intensity.is_finite());
    }
    // db tracks api's hour-over-hour drift; cache is flat with noise on
    // the error-rate KPI, so db ranks at least as high
    assert_eq!(records[0].c, "db");
}

#[test]
fn test_evaluate_missing_kpi_series_fails_the_run() {
    // api's only appearance is as a parent id; no span row carries it as
    // cmdb_id, so its KPI series are absent and scoring must abort.
    let spans = vec![
        span(DAY_START, "s1", None, "db", 1.0, 200),
        span(DAY_START + 1, "s2", Some("s9"), "db", 1.0, 200),
    ];
    let file = write_span_file(&spans);
    // db -> (parent of s9 unknown): no candidates at all survive here,
    // which also fails the run
    assert!(evaluate(&SpanTraceLoader::new(), file.path(), &default_options()).is_err());
}

fn aggregated_csv() -> String {
    let header = "ts,parent_csvc_name,parent_cmpt_name,child_csvc_name,child_cmpt_name,\
call_num_sum,from_duration_avg,from_duration_max,to_duration_avg,to_duration_max,\
from_err_num_avg,from_err_num_max,to_err_num_avg,to_err_num_max";
    let mut rows = vec![header.to_string()];
    for hour in 0..24i64 {
        let ts = DAY_START + hour * 3_600;
        // gateway calls frontend, frontend calls backend
        rows.push(format!(
            "{ts},gw,lb,front,web,{},10.0,20.0,5.0,8.0,0.0,0.0,0.0,0.0",
            4 + hour
        ));
        rows.push(format!(
            "{ts},front,web,back,srv,{},8.0,15.0,{},9.0,1.0,2.0,0.5,1.0",
            2 + hour,
            4.0 + hour as f64
        ));
    }
    rows.join("\n")
}

#[test]
fn test_aggregated_loader_parses_csv() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(aggregated_csv().as_bytes()).unwrap();
    file.flush().unwrap();

    let trace = AggregatedTraceLoader::new().load(file.path(), 60).unwrap();

    assert_eq!(trace.kpi_names.len(), 9);
    assert_eq!(trace.candidates.len(), 2);
    assert!(trace
        .candidates
        .iter()
        .any(|e| e.c == "front::web" && e.p == "gw::lb"));
    assert!(trace
        .candidates
        .iter()
        .any(|e| e.c == "back::srv" && e.p == "front::web"));
    assert!(trace.kpis.contains("back::srv", "to_err_rate"));
}

#[test]
fn test_evaluate_aggregated_trace_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(aggregated_csv().as_bytes()).unwrap();
    file.flush().unwrap();

    let records = evaluate(&AggregatedTraceLoader::new(), file.path(), &default_options()).unwrap();

    // gw::lb never appears as a child: only the back::srv edge survives
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].c, "back::srv");
    assert_eq!(records[0].p, "front::web");
    assert!(records[0].intensity.is_finite());
}

#[test]
fn test_evaluate_rejects_inverted_date_range() {
    let file = write_span_file(&[span(DAY_START, "s1", None, "a", 1.0, 200)]);
    let mut opts = default_options();
    opts.start = "20210412".to_string();
    opts.end = "20210411".to_string();
    assert!(evaluate(&SpanTraceLoader::new(), file.path(), &opts).is_err());
}
