//! Domain-specific error types for the configuration engine.
//!
//! Internal modules return typed errors (e.g., [`BackupError`],
//! [`ManifestError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! MyconfigError
//! ├── Config(ConfigError)         TOML read/parse, invalid settings
//! ├── Detection(DetectionError)   signal timeouts, unresolvable patterns (soft)
//! ├── Filter(FilterError)         invalid sensitivity rules (fail-closed)
//! ├── Backup(BackupError)         destination creation (fatal), copy and capture failures (soft)
//! ├── Manifest(ManifestError)     missing or unparseable manifest
//! ├── Restore(RestoreError)       blocked by verification, copy/preserve/replay failures
//! └── Exec(ExecError)             external command spawn/timeout
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum MyconfigError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Detection signal error.
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Sensitivity rule error.
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Backup error.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Manifest error.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Restore error.
    #[error("Restore error: {0}")]
    Restore(#[from] RestoreError),

    /// External command error.
    #[error("Command error: {0}")]
    Exec(#[from] ExecError),
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML file contains a syntax or type error.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Path of the offending file.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("cannot determine home directory: {0}")]
    NoHome(String),
}

/// Soft errors raised by individual detection signals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// A signal did not answer within its timeout; treated as inconclusive.
    #[error("{signal} signal for '{component}' timed out after {seconds}s")]
    Timeout {
        /// Component being evaluated.
        component: String,
        /// Signal name (e.g., `executable`, `package`).
        signal: String,
        /// Configured timeout.
        seconds: u64,
    },

    /// A signal's data source failed; treated as inconclusive.
    #[error("{signal} signal for '{component}' is inconclusive: {reason}")]
    Unavailable {
        /// Component being evaluated.
        component: String,
        /// Signal name.
        signal: String,
        /// What failed.
        reason: String,
    },

    /// A candidate pattern could not be turned into a concrete path.
    #[error("cannot resolve pattern '{pattern}': {reason}")]
    PathResolution {
        /// The pattern as written in the catalog.
        pattern: String,
        /// Why it failed.
        reason: String,
    },
}

/// Errors from compiling user-supplied sensitivity rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The rule's pattern does not compile.
    #[error("invalid {kind} rule '{pattern}': {message}")]
    InvalidRule {
        /// Pattern kind (`glob` or `regex`).
        kind: String,
        /// The pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

/// Errors that arise during backup.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The destination root could not be created. Fatal, raised before any
    /// component work starts.
    #[error("cannot create backup destination {path}: {source}")]
    DestinationCreate {
        /// Destination root.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A single file or link could not be copied. Soft.
    #[error("[{component}] failed to copy {path}: {reason}")]
    Copy {
        /// Owning component.
        component: String,
        /// Source path on the live system.
        path: PathBuf,
        /// Failure description.
        reason: String,
    },

    /// A command whose output is saved with the component failed or its
    /// output could not be written. Soft.
    #[error("[{component}] cannot save output of `{command}`: {reason}")]
    Capture {
        /// Owning component.
        component: String,
        /// Command line that was run.
        command: String,
        /// Failure description.
        reason: String,
    },

    /// Writing the manifest failed after components were copied.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Errors that arise from reading or writing manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest file exists in the backup directory.
    #[error("manifest not found: {0}")]
    Missing(PathBuf),

    /// The manifest exists but is not valid.
    #[error("cannot parse manifest {path}: {message}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The manifest could not be serialized or written.
    #[error("cannot write manifest {path}: {message}")]
    Write {
        /// Manifest path.
        path: PathBuf,
        /// Failure description.
        message: String,
    },
}

/// Errors that abort or degrade a restore.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// The backup directory does not exist.
    #[error("backup directory does not exist: {0}")]
    MissingBackup(PathBuf),

    /// Verification found problems and `--force` was not given.
    #[error("backup verification failed with {count} issue(s); use --force to restore anyway")]
    VerificationFailed {
        /// Number of issues found.
        count: usize,
    },

    /// The manifest could not be read and `--force` was not given.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Moving existing content aside failed; nothing was overwritten.
    #[error("cannot preserve {path}: {reason}")]
    Preserve {
        /// Live path that should have been preserved.
        path: PathBuf,
        /// Failure description.
        reason: String,
    },

    /// Placing the backup's copy failed.
    #[error("cannot restore {path}: {reason}")]
    Copy {
        /// Live destination path.
        path: PathBuf,
        /// Failure description.
        reason: String,
    },

    /// Feeding saved command output back to its tool failed.
    #[error("`{command}` failed: {reason}")]
    Replay {
        /// Command line that was run.
        command: String,
        /// Failure description.
        reason: String,
    },
}

/// Errors from running external commands.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program did not finish within the allowed time and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Program name.
        program: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// Waiting on the child process failed.
    #[error("failed waiting for {program}: {source}")]
    Wait {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ExecError {
    /// Whether this error is a timeout (an inconclusive, non-fatal outcome).
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn detection_timeout_display() {
        let e = DetectionError::Timeout {
            component: "git".to_string(),
            signal: "package".to_string(),
            seconds: 5,
        };
        assert_eq!(e.to_string(), "package signal for 'git' timed out after 5s");
    }

    #[test]
    fn filter_invalid_rule_display() {
        let e = FilterError::InvalidRule {
            kind: "regex".to_string(),
            pattern: "(".to_string(),
            message: "unclosed group".to_string(),
        };
        assert_eq!(e.to_string(), "invalid regex rule '(': unclosed group");
    }

    #[test]
    fn destination_create_has_source() {
        use std::error::Error as StdError;
        let e = BackupError::DestinationCreate {
            path: PathBuf::from("/readonly/backup"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/readonly/backup"));
    }

    #[test]
    fn capture_failure_names_command() {
        let e = BackupError::Capture {
            component: "homebrew".to_string(),
            command: "brew bundle dump --file=-".to_string(),
            reason: "exit status 1".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "[homebrew] cannot save output of `brew bundle dump --file=-`: exit status 1"
        );
    }

    #[test]
    fn verification_failed_mentions_force() {
        let e = RestoreError::VerificationFailed { count: 2 };
        assert!(e.to_string().contains("--force"));
        assert!(e.to_string().contains('2'));
    }

    #[test]
    fn exec_timeout_is_timeout() {
        let e = ExecError::Timeout {
            program: "brew".to_string(),
            timeout: Duration::from_secs(3),
        };
        assert!(e.is_timeout());
        assert_eq!(e.to_string(), "brew timed out after 3s");
    }

    #[test]
    fn myconfig_error_from_manifest_error() {
        let e: MyconfigError = ManifestError::Missing(PathBuf::from("/b/manifest.json")).into();
        assert!(e.to_string().contains("Manifest error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<MyconfigError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<DetectionError>();
        assert_send_sync::<FilterError>();
        assert_send_sync::<BackupError>();
        assert_send_sync::<ManifestError>();
        assert_send_sync::<RestoreError>();
        assert_send_sync::<ExecError>();
    }

    #[test]
    fn backup_error_converts_to_anyhow() {
        let e = BackupError::Copy {
            component: "git".to_string(),
            path: PathBuf::from("/home/u/.gitconfig"),
            reason: "vanished".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
