use std::path::PathBuf;
use std::time::Duration;

use alloy_ffi::Status;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::Value;

use crate::bridge::ParseResult;

/// Outcome of validating one file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: ParseResult,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.result.status == Status::Ok
    }
}

/// JSON output for `validate --format json`
#[derive(Serialize)]
pub struct ValidationOutput<'a> {
    pub ok: bool,
    pub files: Vec<FileOutput<'a>>,
}

#[derive(Serialize)]
pub struct FileOutput<'a> {
    pub path: String,
    pub status: &'static str,
    pub elapsed: String,
    pub diagnostics: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<&'a Value>,
}

impl<'a> ValidationOutput<'a> {
    pub fn new(reports: &'a [FileReport], show_payload: bool) -> Self {
        let files = reports
            .iter()
            .map(|report| FileOutput {
                path: report.path.display().to_string(),
                status: status_name(report.result.status),
                elapsed: humantime::format_duration(truncate(report.elapsed)).to_string(),
                diagnostics: report.result.diagnostics(),
                payload: show_payload.then_some(&report.result.payload),
            })
            .collect();
        Self {
            ok: reports.iter().all(FileReport::is_ok),
            files,
        }
    }
}

pub fn status_name(status: Status) -> &'static str {
    match status {
        Status::Ok => "OK",
        Status::Warnings => "WARNINGS",
        Status::Error => "ERROR",
        Status::InternalError => "INTERNAL_ERROR",
    }
}

fn status_label(status: Status) -> ColoredString {
    let name = status_name(status);
    match status {
        Status::Ok => name.green(),
        Status::Warnings => name.yellow(),
        Status::Error | Status::InternalError => name.red().bold(),
    }
}

fn severity_label(severity: &str) -> ColoredString {
    match severity {
        "error" => severity.red(),
        "warning" => severity.yellow(),
        _ => severity.dimmed(),
    }
}

/// One diagnostic as ` - error (line 1, column 6): message`
pub fn format_diagnostic(diag: &Value) -> String {
    let severity = diag["severity"].as_str().unwrap_or("unknown");
    let message = diag["message"].as_str().unwrap_or("");
    let start = &diag["start"];
    let location = match (start["valid"].as_bool(), start["line"].as_u64()) {
        (Some(true), Some(line)) => format!(
            " (line {}, column {})",
            line,
            start["column"].as_u64().unwrap_or(0)
        ),
        _ => String::new(),
    };
    format!("  - {}{}: {}", severity_label(severity), location, message)
}

pub fn print_text(report: &FileReport, show_payload: bool) {
    println!("\n=== {} ===", report.path.display());
    println!(
        "status: {} {}",
        status_label(report.result.status),
        format!("({})", humantime::format_duration(truncate(report.elapsed))).dimmed()
    );

    let diagnostics = report.result.diagnostics();
    if diagnostics.is_empty() {
        println!("diagnostics: none");
    } else {
        println!("diagnostics:");
        for diag in diagnostics {
            println!("{}", format_diagnostic(diag));
        }
    }

    if show_payload {
        println!("payload:");
        println!("{}", pretty(&report.result.payload));
    }
}

pub fn print_summary(reports: &[FileReport]) {
    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    let line = format!("{} files checked, {} not ok", reports.len(), failed);
    if failed == 0 {
        println!("\n{} {}", "✓".green(), line);
    } else {
        println!("\n{} {}", "✗".red(), line);
    }
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Drop sub-microsecond noise from timings
fn truncate(elapsed: Duration) -> Duration {
    Duration::from_micros(elapsed.as_micros() as u64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn diagnostic_with_location() {
        colored::control::set_override(false);
        let diag = json!({
            "severity": "error",
            "message": "expected expression, got EOF",
            "start": {"filename": "a", "offset": 5, "line": 2, "column": 1, "valid": true},
        });
        assert_eq!(
            format_diagnostic(&diag),
            "  - error (line 2, column 1): expected expression, got EOF"
        );
    }

    #[test]
    fn diagnostic_without_location() {
        colored::control::set_override(false);
        let diag = json!({
            "severity": "error",
            "message": "internal error: boom",
            "start": {"filename": "", "offset": 0, "line": 0, "column": 0, "valid": false},
        });
        assert_eq!(format_diagnostic(&diag), "  - error: internal error: boom");
    }

    #[test]
    fn json_output_shape() {
        let reports = vec![FileReport {
            path: PathBuf::from("a.alloy"),
            result: ParseResult {
                status: Status::Warnings,
                payload: json!({"schemaVersion": 1, "diagnostics": [{"severity": "warning"}], "status": 1}),
            },
            elapsed: Duration::from_millis(3),
        }];
        let value = serde_json::to_value(ValidationOutput::new(&reports, false)).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["files"][0]["status"], "WARNINGS");
        assert_eq!(value["files"][0]["elapsed"], "3ms");
        assert_eq!(value["files"][0]["diagnostics"][0]["severity"], "warning");
        assert!(value["files"][0].get("payload").is_none());
    }
}
