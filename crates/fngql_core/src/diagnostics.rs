//! Parse and type diagnostics.
//!
//! Diagnostics are plain data. They are rendered through miette only at the
//! edge, when a caller has the source text at hand (see [`Diagnostic::to_report`]).

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// The file cannot be analysed further.
    Error,
    /// Analysis continues with a degraded result.
    Warning,
}

/// A message pinned to a source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    /// Stable code from [`codes`].
    pub code: &'static str,
    pub title: String,
    pub help: Option<String>,
    /// The first label is the primary location.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, code: &'static str, title: String) -> Self {
        Self {
            severity,
            code,
            title,
            help: None,
            labels: Vec::new(),
        }
    }

    pub fn error(code: &'static str, title: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, code, title.into())
    }

    pub fn warning(code: &'static str, title: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, code, title.into())
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    #[must_use]
    pub fn primary_span(&self) -> Option<Span> {
        self.labels.first().map(|label| label.span)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.severity, DiagnosticSeverity::Error)
    }

    /// Builds a miette report that renders the labels against `source`.
    #[must_use]
    pub fn to_report(&self, file_name: &str, source: &str) -> miette::Report {
        let severity = match self.severity {
            DiagnosticSeverity::Error => miette::Severity::Error,
            DiagnosticSeverity::Warning => miette::Severity::Warning,
        };
        let labels = self
            .labels
            .iter()
            .map(|label| miette::LabeledSpan::at(label.span, label.message.clone()));
        let mut diagnostic = miette::MietteDiagnostic::new(self.title.clone())
            .with_code(self.code)
            .with_severity(severity)
            .with_labels(labels);
        if let Some(help) = &self.help {
            diagnostic = diagnostic.with_help(help.clone());
        }
        miette::Report::new(diagnostic)
            .with_source_code(miette::NamedSource::new(file_name, source.to_string()))
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.title)?;
        if let Some(label) = self.labels.first().filter(|label| !label.message.is_empty()) {
            write!(f, ": {}", label.message)?;
        }
        Ok(())
    }
}

/// Diagnostics accumulated while parsing one file.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(
        &mut self,
        code: &'static str,
        title: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::error(code, title).with_span(span, message));
    }

    pub fn warning(
        &mut self,
        code: &'static str,
        title: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(code, title).with_span(span, message));
    }

    /// Drops everything reported after the first `len` diagnostics.
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| !d.is_error())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl<'a> IntoIterator for &'a DiagnosticBag {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Diagnostic codes. `E` codes are errors, `W` codes warnings.
pub mod codes {
    // syntax
    pub const UNEXPECTED_TOKEN: &str = "E0001";
    pub const UNEXPECTED_EOF: &str = "E0002";
    pub const INVALID_SYNTAX: &str = "E0003";
    pub const UNTERMINATED_LITERAL: &str = "E0004";
    pub const UNSUPPORTED_SYNTAX: &str = "W0005";

    // modules
    pub const UNRESOLVED_MODULE: &str = "W0010";
    pub const EXTERNAL_MODULE: &str = "W0011";

    // types
    pub const UNRESOLVED_TYPE: &str = "E0012";
    pub const UNRESOLVED_VALUE: &str = "E0013";
    pub const UNRESOLVED_EXPORT: &str = "E0014";
    pub const CIRCULAR_ALIAS: &str = "E0015";
    pub const UNINFERABLE_TYPE: &str = "E0016";

    pub const UNREADABLE_FILE: &str = "E0020";
}
