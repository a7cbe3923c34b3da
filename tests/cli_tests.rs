//! CLI end-to-end tests: argument validation and output formats

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;

/// 2021-04-11 00:00:00 UTC
const DAY_START: i64 = 1_618_099_200;

fn span_fixture() -> tempfile::NamedTempFile {
    let mut spans = vec![json!({
        "timestamp": DAY_START,
        "span_id": "root",
        "cmdb_id": "gateway",
        "duration": 10.0,
        "httpCode": 200,
    })];
    for hour in 0..24i64 {
        let ts = DAY_START + hour * 3_600;
        spans.push(json!({
            "timestamp": ts,
            "span_id": format!("api-{hour}"),
            "parent_id": "root",
            "cmdb_id": "api",
            "duration": 5.0 + hour as f64,
            "httpCode": 200,
        }));
        spans.push(json!({
            "timestamp": ts + 5,
            "span_id": format!("db-{hour}"),
            "parent_id": format!("api-{hour}"),
            "cmdb_id": "db",
            "duration": 2.0 + hour as f64,
            "httpCode": 200,
        }));
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&spans).unwrap().as_bytes())
        .unwrap();
    file.flush().unwrap();
    file
}

fn base_cmd(file: &tempfile::NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("intensidad").unwrap();
    cmd.arg(file.path())
        .args(["--start", "20210411", "--end", "20210411", "--interval", "60"]);
    cmd
}

#[test]
fn test_cli_scores_span_trace_to_json() {
    let file = span_fixture();
    base_cmd(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"c\": \"db\""))
        .stdout(predicate::str::contains("\"p\": \"api\""))
        .stdout(predicate::str::contains("intensity"));
}

#[test]
fn test_cli_json_output_is_parseable_and_ranked() {
    let file = span_fixture();
    let output = base_cmd(&file).output().unwrap();
    assert!(output.status.success());

    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["c"], "db");
    assert_eq!(records[0]["p"], "api");
    assert!(records[0]["intensity"].is_number());
}

#[test]
fn test_cli_csv_format() {
    let file = span_fixture();
    base_cmd(&file)
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("c,p,intensity\n"))
        .stdout(predicate::str::contains("db,api,"));
}

#[test]
fn test_cli_writes_output_file() {
    let file = span_fixture();
    let out = tempfile::NamedTempFile::new().unwrap();
    base_cmd(&file)
        .args(["-o"])
        .arg(out.path())
        .assert()
        .success();

    let contents = std::fs::read_to_string(out.path()).unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&contents).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_cli_unknown_transform_is_configuration_error() {
    let file = span_fixture();
    base_cmd(&file)
        .args(["--transforms", "zn,bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown transform"));
}

#[test]
fn test_cli_unknown_normalization_rejected_at_parse() {
    let file = span_fixture();
    base_cmd(&file)
        .args(["--normalization", "median"])
        .assert()
        .failure();
}

#[test]
fn test_cli_invalid_date_fails() {
    let file = span_fixture();
    let mut cmd = Command::cargo_bin("intensidad").unwrap();
    cmd.arg(file.path())
        .args(["--start", "April 11", "--end", "20210411", "--interval", "60"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_cli_missing_input_file_fails() {
    let mut cmd = Command::cargo_bin("intensidad").unwrap();
    cmd.arg("/nonexistent/trace.json")
        .args(["--start", "20210411", "--end", "20210411"])
        .assert()
        .failure();
}

#[test]
fn test_cli_softmax_mode_runs() {
    let file = span_fixture();
    base_cmd(&file)
        .args(["--normalization", "softmax", "--aggregation", "max"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"c\": \"db\""));
}
