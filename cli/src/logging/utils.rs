//! Log file location, ANSI stripping, and timestamp helpers.
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Timestamp written in the log file header.
pub(super) const HEADER_TIME: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp prefixed to each log file line.
pub(super) const LINE_TIME: &str = "%H:%M:%S";

/// CSI sequences (`ESC [ params final`) and two-byte escapes such as `ESC M`.
#[allow(clippy::expect_used)]
static ANSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|[0-9@-_])").expect("static ANSI pattern")
});

/// Remove terminal escape sequences so the log file stays plain text.
pub(super) fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// `$XDG_CACHE_HOME/myconfig`, falling back to `~/.cache/myconfig`.
///
/// Created on first use; `None` if that fails.
pub(super) fn log_dir() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CACHE_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(".cache"),
    };
    let dir = base.join("myconfig");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Per-command log file, e.g. `~/.cache/myconfig/export.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    log_dir().map(|dir| dir.join(format!("{command}.log")))
}

/// Current UTC time rendered with `format`.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}
