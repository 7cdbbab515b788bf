use std::ffi::c_int;
use std::fmt;

use alloy_syntax::{Diagnostic, Diagnostics, Position, Severity};
use serde::{Serialize, Serializer};

use crate::position::PositionRecord;

/// Prefix that marks a diagnostic as coming from the boundary itself rather
/// than from the input
pub const INTERNAL_PREFIX: &str = "internal error: ";

/// Coarse outcome of a call, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Ok = 0,
    Warnings = 1,
    Error = 2,
    InternalError = 3,
}

impl Status {
    pub fn code(self) -> c_int {
        self as c_int
    }

    pub fn from_code(code: c_int) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Warnings),
            2 => Some(Self::Error),
            3 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Empty is OK, any error is Error, anything else is Warnings
    pub fn classify(diags: &Diagnostics) -> Self {
        if diags.is_empty() {
            Self::Ok
        } else if diags.has_errors() {
            Self::Error
        } else {
            Self::Warnings
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Warnings => "warnings",
            Self::Error => "error",
            Self::InternalError => "internal error",
        };
        f.write_str(text)
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub severity: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub start: PositionRecord,
    pub end: PositionRecord,
}

impl DiagnosticRecord {
    /// Error diagnostic for a fault in the parser or the boundary
    pub fn internal(message: impl fmt::Display) -> Self {
        Self {
            severity: "error",
            message: format!("{INTERNAL_PREFIX}{message}"),
            value: None,
            start: PositionRecord::from(&Position::default()),
            end: PositionRecord::from(&Position::default()),
        }
    }
}

impl From<&Diagnostic> for DiagnosticRecord {
    fn from(diag: &Diagnostic) -> Self {
        Self {
            severity: severity_tag(diag.severity),
            message: diag.message.clone(),
            value: diag.value.clone(),
            start: PositionRecord::from(&diag.start),
            end: PositionRecord::from(&diag.end),
        }
    }
}

pub fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Warn => "warning",
        Severity::Error => "error",
        _ => "unknown",
    }
}

/// Encode a diagnostics list in order
pub fn encode_diagnostics(diags: &Diagnostics) -> Vec<DiagnosticRecord> {
    diags.iter().map(DiagnosticRecord::from).collect()
}
