//! Core logging types: component entries, status, and the [`Log`] trait.

/// Per-component result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentEntry {
    /// Component id (or a short operation label).
    pub name: String,
    /// Final status of the component.
    pub status: ComponentStatus,
    /// Optional detail message (e.g., counts or an error description).
    pub message: Option<String>,
}

/// Status of a processed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Every artifact was captured or restored.
    Ok,
    /// Some files failed but the component produced output.
    Partial,
    /// Nothing to do (no artifacts, filtered out, or not selected).
    Skipped,
    /// Dry-run mode; nothing was written.
    DryRun,
    /// The component could not be processed.
    Failed,
}

impl ComponentStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 5] = [
        Self::Ok,
        Self::Partial,
        Self::Skipped,
        Self::DryRun,
        Self::Failed,
    ];

    /// Summary icon and its ANSI colour.
    #[must_use]
    pub const fn glyph(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::Partial => ("!", "\x1b[33m"),
            Self::Skipped => ("○", "\x1b[2m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }

    /// Label used in the totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }
}

/// Abstraction over logging backends.
///
/// Engine code logs through this trait so tests can use an isolated
/// [`Logger`](super::logger::Logger) without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a component result for the summary.
    fn record(&self, name: &str, status: ComponentStatus, message: Option<&str>);
}
