//! `parse` and `expr` subcommand tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("alloy-validate").unwrap()
}

fn payload(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_parse_prints_envelope() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.alloy");
    fs::write(&path, "logging {\n  level = \"debug\"\n}\n").unwrap();

    let output = cmd().arg("parse").arg(&path).output().unwrap();
    assert!(output.status.success());

    let json = payload(&output);
    assert_eq!(json["schemaVersion"], 1);
    assert_eq!(json["resultKind"], "file");
    assert_eq!(json["status"], 0);
    let block = &json["file"]["body"][0]["block"];
    assert_eq!(block["name"][0], "logging");
    assert_eq!(block["body"][0]["attribute"]["name"]["name"], "level");
}

#[test]
fn test_parse_error_exit_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.alloy");
    fs::write(&path, "foo =\n").unwrap();

    let output = cmd().arg("parse").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json = payload(&output);
    assert_eq!(json["status"], 2);
    assert!(json.get("file").is_none());
}

#[test]
fn test_parse_missing_file() {
    cmd()
        .arg("parse")
        .arg("/definitely/not/here.alloy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_parse_non_utf8_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bin.alloy");
    fs::write(&path, b"a = \"\xff\"\n").unwrap();

    let output = cmd().arg("parse").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let json = payload(&output);
    assert_eq!(json["diagnostics"][0]["start"]["offset"], 5);
}

#[test]
fn test_expr() {
    let output = cmd().arg("expr").arg("env(\"HOME\") + \"/x\"").output().unwrap();
    assert!(output.status.success());

    let json = payload(&output);
    let expr = &json["expression"];
    assert_eq!(expr["kind"], "binary");
    assert_eq!(expr["binary"]["left"]["kind"], "call");
    assert_eq!(expr["secret"], false);
    assert!(json.get("file").is_none());
}

#[test]
fn test_expr_pretty() {
    cmd()
        .arg("expr")
        .arg("[1, 2]")
        .arg("--pretty")
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"schemaVersion\": 1"));
}

#[test]
fn test_expr_error() {
    let output = cmd().arg("expr").arg("foo(").output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json = payload(&output);
    assert_eq!(json["status"], 2);
    assert!(json.get("expression").is_none());
    assert_eq!(json["diagnostics"][0]["severity"], "error");
}
