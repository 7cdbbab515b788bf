use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use alloy_syntax::{Diagnostics, Expr, File, Parsed};
use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{AstEncoder, ExprRecord, FileRecord};
use crate::diagnostics::{DiagnosticRecord, Status, encode_diagnostics};

/// Version of the JSON layout produced by this crate
pub const SCHEMA_VERSION: u32 = 1;

/// The parser behind the boundary.
///
/// Warnings for a usable tree travel in [`Parsed::warnings`]. A structured
/// failure is reported by returning [`Diagnostics`] as the error; any other
/// error is treated as a fault in the parser itself.
pub trait Frontend {
    fn parse_file(&self, filename: &str, data: &[u8]) -> anyhow::Result<Parsed<File>>;
    fn parse_expression(&self, text: &str) -> anyhow::Result<Parsed<Expr>>;
}

/// The Alloy syntax parser
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyFrontend;

impl Frontend for AlloyFrontend {
    fn parse_file(&self, filename: &str, data: &[u8]) -> anyhow::Result<Parsed<File>> {
        Ok(alloy_syntax::parse_file(filename, data)?)
    }

    fn parse_expression(&self, text: &str) -> anyhow::Result<Parsed<Expr>> {
        Ok(alloy_syntax::parse_expression(text)?)
    }
}

/// Which parse call produced an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    File,
    Expression,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub schema_version: u32,
    pub result_kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<ExprRecord>,
    pub diagnostics: Vec<DiagnosticRecord>,
    pub status: Status,
}

impl Envelope {
    fn empty(kind: ResultKind, status: Status, diagnostics: Vec<DiagnosticRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            result_kind: kind,
            file: None,
            expression: None,
            diagnostics,
            status,
        }
    }

    /// Envelope carrying `diags` and the status they imply, without a tree
    fn with_diagnostics(kind: ResultKind, diags: &Diagnostics) -> Self {
        Self::empty(kind, Status::classify(diags), encode_diagnostics(diags))
    }

    fn failed(kind: ResultKind, err: anyhow::Error) -> Self {
        match err.downcast::<Diagnostics>() {
            Ok(diags) => Self::with_diagnostics(kind, &diags),
            Err(other) => {
                warn!(error = %other, "parser failed without diagnostics");
                Self::empty(
                    kind,
                    Status::Error,
                    vec![DiagnosticRecord::internal(format!("{other:#}"))],
                )
            }
        }
    }

    /// Minimal envelope describing a failure to produce the real one
    pub fn internal_error(kind: ResultKind, message: impl std::fmt::Display) -> Self {
        Self::empty(
            kind,
            Status::InternalError,
            vec![DiagnosticRecord::internal(message)],
        )
    }

    /// Serialize, falling back to [`Envelope::internal_error`] on failure
    pub fn encode(&self) -> Encoded {
        encode_or_fallback(self, self.result_kind, self.status)
    }
}

/// A serialized envelope and the status it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub json: String,
    pub kind: ResultKind,
    pub status: Status,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("serialized envelope contains a NUL byte at offset {0}")]
    InteriorNul(usize),
}

pub(crate) fn encode_or_fallback<S: Serialize>(
    value: &S,
    kind: ResultKind,
    status: Status,
) -> Encoded {
    match serde_json::to_string(value) {
        Ok(json) => Encoded { json, kind, status },
        Err(err) => fallback(kind, &EncodeError::from(err)),
    }
}

/// Encode the minimal error envelope for `err`
pub(crate) fn fallback(kind: ResultKind, err: &EncodeError) -> Encoded {
    warn!(error = %err, "replacing envelope with internal error");
    let envelope = Envelope::internal_error(kind, err);
    let json = serde_json::to_string(&envelope).unwrap_or_else(|_| {
        let kind = match kind {
            ResultKind::File => "file",
            ResultKind::Expression => "expression",
        };
        format!(
            r#"{{"schemaVersion":{SCHEMA_VERSION},"resultKind":"{kind}","diagnostics":[{{"severity":"error","message":"internal error: envelope encoding failed"}}],"status":{}}}"#,
            Status::InternalError.code()
        )
    });
    Encoded {
        json,
        kind,
        status: Status::InternalError,
    }
}

/// Runs the frontend and turns every outcome into an [`Envelope`]
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder<F = AlloyFrontend> {
    frontend: F,
}

impl<F: Frontend> EnvelopeBuilder<F> {
    pub fn new(frontend: F) -> Self {
        Self { frontend }
    }

    pub fn parse_file(&self, filename: &str, data: &[u8]) -> Envelope {
        let envelope = match guarded(|| self.frontend.parse_file(filename, data)) {
            Ok(parsed) if parsed.warnings.has_errors() => {
                Envelope::with_diagnostics(ResultKind::File, &parsed.warnings)
            }
            Ok(parsed) => Envelope {
                file: Some(AstEncoder::new(&parsed.source).file(&parsed.node)),
                ..Envelope::with_diagnostics(ResultKind::File, &parsed.warnings)
            },
            Err(err) => Envelope::failed(ResultKind::File, err),
        };
        debug!(
            kind = "file",
            filename,
            bytes = data.len(),
            status = %envelope.status,
            diagnostics = envelope.diagnostics.len(),
            "parsed"
        );
        envelope
    }

    /// Parse an expression. Invalid UTF-8 is replaced so the parser can
    /// report it as an illegal character.
    pub fn parse_expression(&self, data: &[u8]) -> Envelope {
        let text = String::from_utf8_lossy(data);
        let envelope = match guarded(|| self.frontend.parse_expression(&text)) {
            Ok(parsed) if parsed.warnings.has_errors() => {
                Envelope::with_diagnostics(ResultKind::Expression, &parsed.warnings)
            }
            Ok(parsed) => Envelope {
                expression: Some(AstEncoder::new(&parsed.source).expr(&parsed.node)),
                ..Envelope::with_diagnostics(ResultKind::Expression, &parsed.warnings)
            },
            Err(err) => Envelope::failed(ResultKind::Expression, err),
        };
        debug!(
            kind = "expression",
            bytes = data.len(),
            status = %envelope.status,
            diagnostics = envelope.diagnostics.len(),
            "parsed"
        );
        envelope
    }
}

/// Run `f`, converting a panic into an error
fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("parser panicked: {}", panic_message(&*payload))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use alloy_syntax::{Diagnostic, Position};
    use serde::Serializer;
    use serde_json::Value;

    use super::*;

    fn to_json(envelope: &Envelope) -> Value {
        serde_json::from_str(&envelope.encode().json).unwrap()
    }

    struct Broken;

    impl Frontend for Broken {
        fn parse_file(&self, _: &str, _: &[u8]) -> anyhow::Result<Parsed<File>> {
            Err(anyhow!("disk on fire"))
        }

        fn parse_expression(&self, _: &str) -> anyhow::Result<Parsed<Expr>> {
            Err(std::io::Error::other("pipe closed").into())
        }
    }

    struct Panicking;

    impl Frontend for Panicking {
        fn parse_file(&self, _: &str, _: &[u8]) -> anyhow::Result<Parsed<File>> {
            panic!("index out of bounds");
        }

        fn parse_expression(&self, text: &str) -> anyhow::Result<Parsed<Expr>> {
            panic!("cannot parse {text}");
        }
    }

    fn first_line(filename: &str) -> Position {
        Position {
            filename: filename.to_string(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Parses normally, then attaches one warning to the tree
    struct Warning;

    impl Frontend for Warning {
        fn parse_file(&self, filename: &str, data: &[u8]) -> anyhow::Result<Parsed<File>> {
            let at = first_line(filename);
            let warning = Diagnostic::warning(at.clone(), at, "deprecated block");
            Ok(AlloyFrontend
                .parse_file(filename, data)?
                .with_warnings(Diagnostics::from(vec![warning])))
        }

        fn parse_expression(&self, text: &str) -> anyhow::Result<Parsed<Expr>> {
            let at = first_line("");
            let warning = Diagnostic::warning(at.clone(), at, "deprecated function");
            Ok(AlloyFrontend
                .parse_expression(text)?
                .with_warnings(Diagnostics::from(vec![warning])))
        }
    }

    /// Fails with warnings only, and hands back a tree alongside an error
    struct Inconsistent;

    impl Frontend for Inconsistent {
        fn parse_file(&self, filename: &str, _: &[u8]) -> anyhow::Result<Parsed<File>> {
            let at = first_line(filename);
            let diags = Diagnostics::from(vec![Diagnostic::warning(at.clone(), at, "odd")]);
            Err(diags.into())
        }

        fn parse_expression(&self, text: &str) -> anyhow::Result<Parsed<Expr>> {
            let at = first_line("");
            let error = Diagnostic::error(at.clone(), at, "bad");
            Ok(AlloyFrontend
                .parse_expression(text)?
                .with_warnings(Diagnostics::from(vec![error])))
        }
    }

    #[test]
    fn success_has_tree_and_no_diagnostics() {
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_file("a.alloy", b"foo = \"bar\"");
        assert_eq!(env.status, Status::Ok);
        assert!(env.diagnostics.is_empty());
        assert!(env.file.is_some());
        assert!(env.expression.is_none());

        let json = to_json(&env);
        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["resultKind"], "file");
        assert_eq!(json["status"], 0);
        assert_eq!(json["diagnostics"], serde_json::json!([]));
        assert!(json.get("expression").is_none());
    }

    #[test]
    fn structured_failure_drops_tree() {
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_file("a.alloy", b"foo =\n");
        assert_eq!(env.status, Status::Error);
        assert!(env.file.is_none());
        assert_eq!(env.diagnostics[0].severity, "error");
        assert!(!env.diagnostics[0].message.starts_with("internal error"));

        let json = to_json(&env);
        assert!(json.get("file").is_none());
        assert_eq!(json["resultKind"], "file");
        assert_eq!(json["status"], 2);
    }

    #[test]
    fn expression_failure() {
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_expression(b"foo(");
        assert_eq!(env.status, Status::Error);
        assert!(env.expression.is_none());
        assert!(env.file.is_none());
        assert!(env.diagnostics.iter().any(|d| d.severity == "error"));
        assert_eq!(to_json(&env)["resultKind"], "expression");
    }

    #[test]
    fn warnings_keep_the_tree() {
        let env = EnvelopeBuilder::new(Warning).parse_file("w.alloy", b"a = 1");
        assert_eq!(env.status, Status::Warnings);
        assert!(env.file.is_some());
        assert_eq!(env.diagnostics.len(), 1);
        assert_eq!(env.diagnostics[0].severity, "warning");
        assert_eq!(env.diagnostics[0].start.filename, "w.alloy");

        let json = to_json(&env);
        assert_eq!(json["status"], 1);
        assert_eq!(json["file"]["body"][0]["kind"], "attribute");

        let env = EnvelopeBuilder::new(Warning).parse_expression(b"a + 1");
        assert_eq!(env.status, Status::Warnings);
        assert!(env.expression.is_some());
        assert!(env.file.is_none());
    }

    #[test]
    fn warnings_do_not_rescue_a_broken_parse() {
        let env = EnvelopeBuilder::new(Warning).parse_file("w.alloy", b"a =");
        assert_eq!(env.status, Status::Error);
        assert!(env.file.is_none());
    }

    #[test]
    fn tree_is_dropped_whenever_errors_are_reported() {
        let env = EnvelopeBuilder::new(Inconsistent).parse_file("w.alloy", b"a = 1");
        assert_eq!(env.status, Status::Warnings);
        assert!(env.file.is_none());

        let env = EnvelopeBuilder::new(Inconsistent).parse_expression(b"1");
        assert_eq!(env.status, Status::Error);
        assert!(env.expression.is_none());
        assert_eq!(env.diagnostics[0].message, "bad");
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let source = "(".repeat(100_000);
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_expression(source.as_bytes());
        assert_eq!(env.status, Status::Error);
        assert_eq!(env.diagnostics[0].message, "expression nested too deeply");
    }

    #[test]
    fn unstructured_failure_is_marked_internal() {
        let env = EnvelopeBuilder::new(Broken).parse_file("a.alloy", b"x = 1");
        assert_eq!(env.status, Status::Error);
        assert!(env.file.is_none());
        assert_eq!(env.diagnostics.len(), 1);
        assert_eq!(env.diagnostics[0].message, "internal error: disk on fire");

        let env = EnvelopeBuilder::new(Broken).parse_expression(b"x");
        assert_eq!(env.diagnostics[0].message, "internal error: pipe closed");
    }

    #[test]
    fn panics_are_contained() {
        let env = EnvelopeBuilder::new(Panicking).parse_file("a.alloy", b"x = 1");
        assert_eq!(env.status, Status::Error);
        assert_eq!(
            env.diagnostics[0].message,
            "internal error: parser panicked: index out of bounds"
        );

        let env = EnvelopeBuilder::new(Panicking).parse_expression(b"1 + 1");
        assert_eq!(
            env.diagnostics[0].message,
            "internal error: parser panicked: cannot parse 1 + 1"
        );
    }

    #[test]
    fn non_utf8_expression_is_reported() {
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_expression(b"a + \xff");
        assert_eq!(env.status, Status::Error);
        assert!(env.expression.is_none());
    }

    #[test]
    fn non_utf8_file_is_reported() {
        let env = EnvelopeBuilder::new(AlloyFrontend).parse_file("bin", &[0x66, 0x20, 0xc3, 0x28]);
        assert_eq!(env.status, Status::Error);
        assert_eq!(env.diagnostics[0].start.offset, 2);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("value refused to serialize"))
        }
    }

    #[test]
    fn encoding_failure_falls_back() {
        let encoded = encode_or_fallback(&Unserializable, ResultKind::Expression, Status::Ok);
        assert_eq!(encoded.status, Status::InternalError);
        assert_eq!(encoded.kind, ResultKind::Expression);

        let json: Value = serde_json::from_str(&encoded.json).unwrap();
        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["resultKind"], "expression");
        assert_eq!(json["status"], 3);
        assert!(json.get("file").is_none());
        let diags = json["diagnostics"].as_array().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0]["severity"], "error");
        let message = diags[0]["message"].as_str().unwrap();
        assert!(message.starts_with("internal error: failed to serialize envelope"));
        assert!(message.contains("value refused to serialize"));
    }

    #[test]
    fn status_matches_diagnostics() {
        for source in ["", "a = 1", "a =", "b { c = [1,", "x = \"\\q\""] {
            let env = EnvelopeBuilder::new(AlloyFrontend).parse_file("p.alloy", source.as_bytes());
            let has_error = env.diagnostics.iter().any(|d| d.severity == "error");
            assert_eq!(env.status == Status::Ok, env.diagnostics.is_empty(), "{source:?}");
            assert_eq!(env.status == Status::Error, has_error, "{source:?}");
            assert_eq!(env.file.is_some(), env.status != Status::Error, "{source:?}");
        }
    }
}
