//! Diagnostics collection for transformation passes.
//!
//! This module provides the sink every component reports to. Transformation is lenient: a
//! method that cannot be rewritten, a descriptor that names no supplied body or a listener that
//! does not fit its dispatch routine are reported here while processing continues.
//!
//! # Architecture
//!
//! The diagnostics container is shared across the engine:
//! - **Locators**: Report site counts per event when the engine runs verbose
//! - **Transformer**: Reports injected sites, resolution misses and synthesis failures
//! - **Proxy generator**: Reports listeners skipped at generation time
//! - **Emulator runtime**: Reports listeners that were missing when a routine ran
//!
//! The [`Diagnostics`] container uses `boxcar::Vec` for thread-safe, lock-free append
//! operations, so concurrent passes can report without synchronization.
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Thread-safe container for diagnostic entries
//! - [`Diagnostic`] - Individual diagnostic entry with severity and context
//! - [`DiagnosticSeverity`] - Severity level (Info, Warning, Error)
//! - [`DiagnosticCategory`] - Category of the diagnostic source
//!
//! # Usage Examples
//!
//! ```rust
//! use eventscope::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//!
//! diagnostics.warning(
//!     DiagnosticCategory::Resolution,
//!     "No body matched descriptor bao.aj()V",
//! );
//! diagnostics.push(
//!     Diagnostic::new(
//!         DiagnosticSeverity::Info,
//!         DiagnosticCategory::Injection,
//!         "Event injected",
//!     )
//!     .with_event("onTick")
//!     .with_site(3),
//! );
//!
//! assert!(diagnostics.has_warnings());
//! assert_eq!(diagnostics.by_category(DiagnosticCategory::Injection).len(), 1);
//! ```

use std::fmt::{self, Write};

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Informational message, not indicating a problem.
    Info,

    /// A registration could not be honoured in full.
    ///
    /// The affected event, listener or descriptor is skipped, everything else proceeds.
    Warning,

    /// A method or listener could not be processed.
    ///
    /// The affected method is left as it was supplied.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "INFO"),
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Category indicating the component that reported a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Injection-point search results.
    Locator,

    /// Matching descriptors against supplied method bodies.
    ///
    /// Examples: a descriptor names no supplied body under any epoch.
    Resolution,

    /// Code synthesis at injection sites.
    ///
    /// Examples: events injected, bookkeeping failures.
    Injection,

    /// Dispatch routine generation.
    ///
    /// Examples: listener signature does not fit its routine.
    Dispatch,

    /// Registration input.
    Configuration,

    /// Simple callback redirection.
    Redirect,

    /// Reports raised while rewritten code executes.
    ///
    /// Examples: a listener type or method was missing.
    Runtime,

    /// Anything not fitting the other categories.
    General,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Locator => write!(f, "Locator"),
            DiagnosticCategory::Resolution => write!(f, "Resolution"),
            DiagnosticCategory::Injection => write!(f, "Injection"),
            DiagnosticCategory::Dispatch => write!(f, "Dispatch"),
            DiagnosticCategory::Configuration => write!(f, "Configuration"),
            DiagnosticCategory::Redirect => write!(f, "Redirect"),
            DiagnosticCategory::Runtime => write!(f, "Runtime"),
            DiagnosticCategory::General => write!(f, "General"),
        }
    }
}

/// A single diagnostic entry with context information.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Category indicating the source of this diagnostic.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Optional method the diagnostic refers to (`owner.name(desc)`).
    pub method: Option<String>,

    /// Optional event name the diagnostic refers to.
    pub event: Option<String>,

    /// Optional instruction index of an injection site.
    pub site: Option<usize>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry.
    ///
    /// # Arguments
    ///
    /// * `severity` - Severity level of the diagnostic
    /// * `category` - Category of the diagnostic source
    /// * `message` - Human-readable description
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            method: None,
            event: None,
            site: None,
        }
    }

    /// Adds the method the diagnostic refers to.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Adds the event the diagnostic refers to.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Adds the instruction index of the site the diagnostic refers to.
    #[must_use]
    pub fn with_site(mut self, site: usize) -> Self {
        self.site = Some(site);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        if let Some(method) = &self.method {
            write!(f, " (method: {method})")?;
        }

        if let Some(event) = &self.event {
            write!(f, " (event: {event})")?;
        }

        if let Some(site) = self.site {
            write!(f, " (site: {site})")?;
        }

        Ok(())
    }
}

/// Thread-safe container for collecting diagnostic entries.
///
/// Uses `boxcar::Vec` internally for lock-free concurrent append operations.
///
/// # Example
///
/// ```rust
/// use eventscope::diagnostics::{DiagnosticCategory, Diagnostics};
/// use std::sync::Arc;
///
/// let diagnostics = Arc::new(Diagnostics::new());
///
/// let shared = Arc::clone(&diagnostics);
/// std::thread::spawn(move || {
///     shared.warning(DiagnosticCategory::Dispatch, "Listener skipped");
/// })
/// .join()
/// .unwrap();
///
/// diagnostics.error(DiagnosticCategory::Injection, "Synthesis failed");
/// assert_eq!(diagnostics.count(), 2);
/// ```
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates a new empty diagnostics container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Adds an informational diagnostic.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Adds a warning diagnostic.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Adds an error diagnostic.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Error,
            category,
            message,
        ));
    }

    /// Adds a diagnostic entry directly.
    ///
    /// Use this for diagnostics that carry method, event or site context.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns true if any diagnostics have been collected.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns true if any error-level diagnostics have been collected.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns true if any warning-level diagnostics have been collected.
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns the total number of diagnostics.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns the number of diagnostics of `severity`.
    pub fn count_of(&self, severity: DiagnosticSeverity) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.severity == severity)
            .count()
    }

    /// Returns the number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Error)
    }

    /// Returns the number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Warning)
    }

    /// Returns the number of info-level diagnostics.
    pub fn info_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Info)
    }

    /// Returns an iterator over all diagnostics, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Returns all errors as a vector.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .collect()
    }

    /// Returns all warnings as a vector.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .collect()
    }

    /// Returns diagnostics filtered by category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Returns diagnostics that refer to the event `name` (case-insensitive).
    pub fn by_event(&self, name: &str) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| {
                d.event
                    .as_deref()
                    .is_some_and(|event| event.eq_ignore_ascii_case(name))
            })
            .collect()
    }

    /// Formats a summary of all diagnostics for display.
    ///
    /// Errors are listed before warnings; info entries are only counted.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let error_count = self.error_count();
        let warning_count = self.warning_count();
        let info_count = self.info_count();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s), {} info(s)",
            error_count, warning_count, info_count
        );

        if error_count > 0 {
            output.push_str("\nErrors:\n");
            for diag in self.errors() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        if warning_count > 0 {
            output.push_str("\nWarnings:\n");
            for diag in self.warnings() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Resolution,
            "Test message",
        );

        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.category, DiagnosticCategory::Resolution);
        assert_eq!(diag.message, "Test message");
        assert!(diag.method.is_none());
        assert!(diag.event.is_none());
        assert!(diag.site.is_none());
    }

    #[test]
    fn test_diagnostic_with_context() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            DiagnosticCategory::Injection,
            "Stack underflow",
        )
        .with_method("a/B.m()V")
        .with_event("onTick")
        .with_site(4);

        assert_eq!(diag.method.as_deref(), Some("a/B.m()V"));
        assert_eq!(diag.event.as_deref(), Some("onTick"));
        assert_eq!(diag.site, Some(4));
    }

    #[test]
    fn test_diagnostics_container() {
        let diagnostics = Diagnostics::new();

        diagnostics.info(DiagnosticCategory::General, "Info message");
        diagnostics.warning(DiagnosticCategory::Dispatch, "Warning message");
        diagnostics.error(DiagnosticCategory::Injection, "Error message");

        assert_eq!(diagnostics.count(), 3);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.info_count(), 1);
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert!(diagnostics.has_any());
    }

    #[test]
    fn test_diagnostics_thread_safety() {
        let diagnostics = Arc::new(Diagnostics::new());
        let mut handles = vec![];

        for i in 0..10 {
            let diag_clone = Arc::clone(&diagnostics);
            handles.push(thread::spawn(move || {
                diag_clone.warning(DiagnosticCategory::General, format!("Thread {} warning", i));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(diagnostics.count(), 10);
    }

    #[test]
    fn test_diagnostics_by_event() {
        let diagnostics = Diagnostics::new();

        diagnostics.push(
            Diagnostic::new(DiagnosticSeverity::Info, DiagnosticCategory::Injection, "a")
                .with_event("onLoad"),
        );
        diagnostics.push(
            Diagnostic::new(DiagnosticSeverity::Info, DiagnosticCategory::Injection, "b")
                .with_event("onTick"),
        );

        assert_eq!(diagnostics.by_event("ONLOAD").len(), 1);
        assert_eq!(diagnostics.by_event("missing").len(), 0);
    }

    #[test]
    fn test_summary_lists_errors_and_warnings() {
        let diagnostics = Diagnostics::new();
        diagnostics.error(DiagnosticCategory::Injection, "broken");
        diagnostics.warning(DiagnosticCategory::Resolution, "missed");
        diagnostics.info(DiagnosticCategory::Locator, "found");

        let summary = diagnostics.summary();
        assert!(summary.starts_with("Diagnostics: 1 error(s), 1 warning(s), 1 info(s)"));
        assert!(summary.contains("[ERROR] Injection: broken"));
        assert!(summary.contains("[WARN] Resolution: missed"));
        assert!(!summary.contains("found"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Dispatch,
            "Listener skipped",
        )
        .with_method("a/B.m()V")
        .with_site(2);

        let display = format!("{}", diag);
        assert!(display.contains("WARN"));
        assert!(display.contains("Dispatch"));
        assert!(display.contains("Listener skipped"));
        assert!(display.contains("(method: a/B.m()V)"));
        assert!(display.contains("(site: 2)"));
    }
}
