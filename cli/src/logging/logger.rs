//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{ComponentEntry, ComponentStatus, Log};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are also written to a persistent log file at
/// `$XDG_CACHE_HOME/myconfig/<command>.log` (default
/// `~/.cache/myconfig/<command>.log`) with timestamps and ANSI codes stripped,
/// regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<ComponentEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`.
    ///
    /// The file itself is created by
    /// [`init_subscriber`](super::subscriber::init_subscriber); the path is
    /// kept here for the summary footer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger that reports `log_file` in its summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<ComponentEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "myconfig::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "myconfig::dry_run", "{msg}");
    }

    /// Record a component result for the summary.
    pub fn record(&self, name: &str, status: ComponentStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(ComponentEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed components.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == ComponentStatus::Failed)
                .count()
        })
    }

    /// Print one line per recorded component, then totals by status.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        let mut counts = [0usize; ComponentStatus::ALL.len()];
        for entry in &entries {
            if let Some(slot) = ComponentStatus::ALL
                .iter()
                .position(|s| *s == entry.status)
                .and_then(|i| counts.get_mut(i))
            {
                *slot += 1;
            }
            let (icon, color) = entry.status.glyph();
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        println!();
        let parts: Vec<String> = ComponentStatus::ALL
            .iter()
            .zip(counts)
            .map(|(status, n)| format!("{}{n} {}\x1b[0m", status.glyph().1, status.label()))
            .collect();
        self.info(&format!("{} components: {}", entries.len(), parts.join(", ")));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    #[cfg(test)]
    pub(crate) const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record(&self, name: &str, status: ComponentStatus, message: Option<&str>) {
        self.record(name, status, message);
    }
}
