//! Structured configuration diagnostics.
//!
//! Decoding and validation never stop at the first problem. Each rule returns
//! zero or more [`Diagnostic`]s and the caller concatenates them into a
//! [`Diagnostics`] list, so a single run reports everything that is wrong.

use std::fmt;
use std::path::PathBuf;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding produced while decoding or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// One-line summary
    pub summary: String,
    /// Longer explanation
    pub detail: Option<String>,
    /// Attribute path the finding refers to (e.g. `worker_pool[1].name`)
    pub subject: Option<String>,
    /// Document the finding came from
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            subject: None,
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
            subject: None,
            location: None,
        }
    }

    /// Add a detail line.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the attribute path this diagnostic is about.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.summary));

        match (&self.location, &self.subject) {
            (Some(path), Some(subject)) => {
                output.push_str(&format!("  --> {} ({})\n", path.display(), subject))
            }
            (Some(path), None) => output.push_str(&format!("  --> {}\n", path.display())),
            (None, Some(subject)) => output.push_str(&format!("  --> {}\n", subject)),
            (None, None) => {}
        }

        if let Some(ref detail) = self.detail {
            output.push_str(&format!("  = {}\n", detail));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// An ordered list of diagnostics.
///
/// Order is insertion order: rule outputs are appended in a fixed sequence,
/// so the same input always yields the same list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append every diagnostic from `other`, keeping its order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stamp every diagnostic that has no location yet with `path`.
    pub fn with_location(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Diagnostics(
            self.0
                .into_iter()
                .map(|d| {
                    if d.location.is_some() {
                        d
                    } else {
                        d.with_location(path.clone())
                    }
                })
                .collect(),
        )
    }

    /// Prefix every subject with `prefix.` (or set it to `prefix` when empty).
    pub fn with_subject_prefix(self, prefix: &str) -> Self {
        Diagnostics(
            self.0
                .into_iter()
                .map(|mut d| {
                    d.subject = Some(match d.subject.take() {
                        Some(subject) if subject.starts_with('[') => {
                            format!("{}{}", prefix, subject)
                        }
                        Some(subject) => format!("{}.{}", prefix, subject),
                        None => prefix.to_string(),
                    });
                    d
                })
                .collect(),
        )
    }

    /// Format every diagnostic, followed by a one-line tally.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();
        for diagnostic in &self.0 {
            output.push_str(&diagnostic.format(color));
        }
        let errors = self.error_count();
        let warnings = self.len() - errors;
        if !self.is_empty() {
            output.push_str(&format!(
                "{} error(s), {} warning(s)\n",
                errors, warnings
            ));
        }
        output
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Diagnostics(diagnostics)
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Diagnostics(iter.into_iter().collect())
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

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print diagnostics to stderr.
pub fn emit(diagnostics: &Diagnostics, color: bool) {
    eprint!("{}", diagnostics.format(color));
}
