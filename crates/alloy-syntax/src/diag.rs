use std::fmt;

use crate::pos::Position;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Severity {
    Warn,
    Error,
    /// Informational note. Not part of the v1 wire schema.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single reported issue with a source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Offending value, when the message refers to one
    pub value: Option<String>,
    pub start: Position,
    pub end: Position,
}

impl Diagnostic {
    pub fn error(start: Position, end: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            value: None,
            start,
            end,
        }
    }

    pub fn warning(start: Position, end: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            ..Self::error(start, end, message)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.start, self.severity, self.message)?;
        if let Some(value) = &self.value {
            write!(f, " ({value})")?;
        }
        Ok(())
    }
}

/// Ordered list of diagnostics.
///
/// This is the structured error type returned by the parser. It implements
/// [`std::error::Error`] so it can travel inside `anyhow::Error` and be
/// recovered with `downcast`.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.0))]
pub struct Diagnostics(pub Vec<Diagnostic>);

fn render(diags: &[Diagnostic]) -> String {
    match diags {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more diagnostics)", rest.len()),
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32, column: u32) -> Position {
        Position {
            filename: "t.alloy".into(),
            offset: 0,
            line,
            column,
        }
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(at(1, 1), at(1, 2), "careful"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error(at(2, 1), at(2, 2), "broken"));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn error_message_mentions_first_diagnostic() {
        let diags = Diagnostics::from(vec![
            Diagnostic::error(at(3, 7), at(3, 8), "expected expression").with_value("\\n"),
            Diagnostic::error(at(4, 1), at(4, 2), "other"),
        ]);
        let text = diags.to_string();
        assert!(text.starts_with("t.alloy:3:7: error: expected expression"));
        assert!(text.contains("and 1 more"));
    }
}
