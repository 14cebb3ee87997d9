//! Sensitivity rule definitions and the default rule set.
use serde::{Deserialize, Serialize};

/// How a rule's pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Case-insensitive substring (exact match for the `extension` scope).
    #[default]
    Literal,
    /// Shell glob, case-insensitive.
    Glob,
    /// Regular expression, case-insensitive.
    Regex,
}

/// Which part of a path a rule is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// The full path string.
    #[default]
    Path,
    /// The last path component.
    Filename,
    /// The extension, without the dot.
    Extension,
}

/// A pattern that excludes matching files from capture and restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityRule {
    /// Pattern text.
    pub pattern: String,
    /// Pattern interpretation.
    #[serde(default)]
    pub kind: PatternKind,
    /// Part of the path the pattern applies to.
    #[serde(default)]
    pub scope: MatchScope,
    /// Short tag explaining why matches are excluded.
    #[serde(default = "default_rationale")]
    pub rationale: String,
}

fn default_rationale() -> String {
    "user rule".to_string()
}

impl SensitivityRule {
    /// Create a rule.
    #[must_use]
    pub fn new(
        pattern: impl Into<String>,
        kind: PatternKind,
        scope: MatchScope,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            scope,
            rationale: rationale.into(),
        }
    }
}

/// `(pattern, kind, scope, rationale)` rows for [`default_rules`].
const DEFAULTS: &[(&str, PatternKind, MatchScope, &str)] = &[
    // SSH private keys and host lists
    ("id_rsa", PatternKind::Literal, MatchScope::Filename, "ssh-key"),
    ("id_dsa", PatternKind::Literal, MatchScope::Filename, "ssh-key"),
    ("id_ecdsa", PatternKind::Literal, MatchScope::Filename, "ssh-key"),
    ("id_ed25519", PatternKind::Literal, MatchScope::Filename, "ssh-key"),
    ("known_hosts", PatternKind::Literal, MatchScope::Filename, "ssh-hosts"),
    ("authorized_keys", PatternKind::Literal, MatchScope::Filename, "ssh-hosts"),
    // Certificates and key stores
    ("pem", PatternKind::Literal, MatchScope::Extension, "certificate"),
    ("key", PatternKind::Literal, MatchScope::Extension, "certificate"),
    ("p12", PatternKind::Literal, MatchScope::Extension, "certificate"),
    ("pfx", PatternKind::Literal, MatchScope::Extension, "certificate"),
    // GPG
    (".gnupg", PatternKind::Literal, MatchScope::Filename, "gpg"),
    ("secring.gpg", PatternKind::Literal, MatchScope::Filename, "gpg"),
    ("pubring.gpg", PatternKind::Literal, MatchScope::Filename, "gpg"),
    // Credentials by name
    ("password", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("passwd", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("secret", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("token", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("api_key", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("private_key", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("credential", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("keychain", PatternKind::Literal, MatchScope::Filename, "credential"),
    ("/.aws/credentials", PatternKind::Literal, MatchScope::Path, "credential"),
    ("/.docker/config.json", PatternKind::Literal, MatchScope::Path, "credential"),
    // Databases
    ("db", PatternKind::Literal, MatchScope::Extension, "database"),
    ("sqlite", PatternKind::Literal, MatchScope::Extension, "database"),
    ("sqlite3", PatternKind::Literal, MatchScope::Extension, "database"),
    // Shell histories
    ("*history", PatternKind::Glob, MatchScope::Filename, "history"),
    ("history", PatternKind::Literal, MatchScope::Extension, "history"),
    // Caches and scratch directories
    ("cache", PatternKind::Glob, MatchScope::Filename, "cache"),
    (".cache", PatternKind::Glob, MatchScope::Filename, "cache"),
    ("caches", PatternKind::Glob, MatchScope::Filename, "cache"),
    ("tmp", PatternKind::Glob, MatchScope::Filename, "temporary"),
    (".tmp", PatternKind::Glob, MatchScope::Filename, "temporary"),
    ("tmp", PatternKind::Literal, MatchScope::Extension, "temporary"),
];

/// The built-in rule set: keys, credentials, databases, histories, caches.
///
/// Rules are scoped to file names and extensions wherever possible so that
/// the directory a home tree lives in never triggers a match.
#[must_use]
pub fn default_rules() -> Vec<SensitivityRule> {
    DEFAULTS
        .iter()
        .map(|&(pattern, kind, scope, rationale)| {
            SensitivityRule::new(pattern, kind, scope, rationale)
        })
        .collect()
}
