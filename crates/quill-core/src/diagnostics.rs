//! Diagnostics sink.
//!
//! Every fatal [`CompilationError`] and every warning produced by the semantic
//! core is pushed into a [`Diagnostics`] collection that is returned to the
//! caller. The core never prints or terminates the process on its own.

use std::collections::VecDeque;
use std::fmt;

use crate::{CompilationError, Span};

/// A single diagnostic message.
///
/// # Examples
///
/// ```
/// use quill_core::{Diagnostic, DiagnosticKind, Span};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::Error,
///     message: "unresolved name 'foo'".to_string(),
///     module: Some("app.main".to_string()),
///     span: Span::new(10, 5, 3),
/// };
///
/// assert_eq!(diagnostic.to_string(), "app.main:10:5: error: unresolved name 'foo'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity level of this diagnostic
    pub kind: DiagnosticKind,
    /// The diagnostic message text
    pub message: String,
    /// Dotted path of the module the diagnostic belongs to, if known
    pub module: Option<String>,
    /// Where the diagnostic occurred
    pub span: Span,
}

/// The severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A fatal condition; the compilation unit produced no IR.
    Error,
    /// A condition worth reporting that did not stop compilation.
    Warning,
}

impl Diagnostic {
    /// Build an error diagnostic from a compilation error.
    pub fn from_error(error: &CompilationError, module: Option<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            message: error_message(error),
            module,
            span: error.span(),
        }
    }

    /// Build a warning diagnostic.
    pub fn warning(message: impl Into<String>, module: Option<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            module,
            span,
        }
    }
}

/// Strip the `at line:col: ` prefix the error display carries; the
/// diagnostic prints its own location.
fn error_message(error: &CompilationError) -> String {
    let text = error.to_string();
    let prefix = format!("at {}: ", error.span());
    match text.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        };
        match &self.module {
            Some(module) => write!(f, "{}:{}: {}: {}", module, self.span, kind, self.message),
            None => write!(f, "{}: {}: {}", self.span, kind, self.message),
        }
    }
}

/// A collection of diagnostic messages from one compilation.
///
/// # Examples
///
/// ```
/// use quill_core::{CompilationError, Diagnostics, Span};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.push_error(
///     &CompilationError::UnresolvedName { name: "x".into(), span: Span::new(1, 1, 1) },
///     None,
/// );
///
/// assert!(diagnostics.has_errors());
/// assert_eq!(diagnostics.error_count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    /// Creates a new, empty diagnostics collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic to the collection.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    /// Records a fatal compilation error.
    pub fn push_error(&mut self, error: &CompilationError, module: Option<String>) {
        self.add_diagnostic(Diagnostic::from_error(error, module));
    }

    /// Records a warning.
    pub fn push_warning(&mut self, message: impl Into<String>, module: Option<String>, span: Span) {
        self.add_diagnostic(Diagnostic::warning(message, module, span));
    }

    /// Returns `true` if the collection contains any error diagnostics.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Returns `true` if the collection contains any warning diagnostics.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Iterate over error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Error)
    }

    /// Iterate over warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Iterate over all diagnostics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether no diagnostics were recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Removes all diagnostics.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::collections::vec_deque::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}
