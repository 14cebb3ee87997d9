//! Sensitive-file filter.
//!
//! Every path is checked here before it can enter a copy queue or a
//! manifest. Evaluation is pure and case-insensitive. A rule that fails to
//! compile does not disappear: it matches every path, so a broken user rule
//! can only exclude more, never less.
use std::path::Path;

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::config::rules::{MatchScope, PatternKind, SensitivityRule};
use crate::error::FilterError;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled rule pattern.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Lowercased substring (exact for extensions).
    Literal(String),
    /// Glob pattern.
    Glob(Pattern),
    /// Case-insensitive regular expression.
    Regex(Regex),
}

/// Compile a single rule.
///
/// # Errors
///
/// Returns [`FilterError::InvalidRule`] if a glob or regex pattern does not
/// compile.
pub fn compile_rule(rule: &SensitivityRule) -> Result<Matcher, FilterError> {
    match rule.kind {
        PatternKind::Literal => Ok(Matcher::Literal(
            rule.pattern
                .trim_start_matches(if rule.scope == MatchScope::Extension {
                    "."
                } else {
                    ""
                })
                .to_lowercase(),
        )),
        PatternKind::Glob => Pattern::new(&rule.pattern)
            .map(Matcher::Glob)
            .map_err(|e| FilterError::InvalidRule {
                kind: "glob".to_string(),
                pattern: rule.pattern.clone(),
                message: e.msg.to_string(),
            }),
        PatternKind::Regex => Regex::new(&format!("(?i){}", rule.pattern))
            .map(Matcher::Regex)
            .map_err(|e| FilterError::InvalidRule {
                kind: "regex".to_string(),
                pattern: rule.pattern.clone(),
                message: e.to_string(),
            }),
    }
}

/// Outcome of classifying one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No rule matched.
    Allowed,
    /// A rule matched.
    Excluded {
        /// The matching rule's pattern.
        pattern: String,
        /// The matching rule's rationale tag.
        rationale: String,
    },
    /// A rule could not be compiled, so the path is excluded.
    FailClosed {
        /// The broken rule's pattern.
        pattern: String,
    },
}

impl Verdict {
    /// Whether the path must be excluded.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        !matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: SensitivityRule,
    matcher: Result<Matcher, FilterError>,
}

impl CompiledRule {
    fn matches(matcher: &Matcher, scope: MatchScope, path: &Path) -> bool {
        let subject = match scope {
            MatchScope::Path => Some(path.to_string_lossy().replace('\\', "/")),
            MatchScope::Filename => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            MatchScope::Extension => path.extension().map(|e| e.to_string_lossy().into_owned()),
        };
        let Some(subject) = subject else {
            return false;
        };
        match matcher {
            Matcher::Literal(needle) => {
                let hay = subject.to_lowercase();
                if scope == MatchScope::Extension {
                    hay == *needle
                } else {
                    hay.contains(needle.as_str())
                }
            }
            Matcher::Glob(pattern) => pattern.matches_with(&subject, GLOB_OPTIONS),
            Matcher::Regex(re) => re.is_match(&subject),
        }
    }
}

/// The compiled rule set.
#[derive(Debug, Clone)]
pub struct SensitiveFilter {
    rules: Vec<CompiledRule>,
}

impl SensitiveFilter {
    /// Compile `rules`. Compilation failures are kept and reported through
    /// [`broken_rules`](Self::broken_rules).
    #[must_use]
    pub fn new(rules: &[SensitivityRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                rule: rule.clone(),
                matcher: compile_rule(rule),
            })
            .collect();
        Self { rules }
    }

    /// Errors from rules that did not compile.
    pub fn broken_rules(&self) -> impl Iterator<Item = &FilterError> {
        self.rules.iter().filter_map(|r| r.matcher.as_ref().err())
    }

    /// Classify `path` against the rules, first match wins.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Verdict {
        for compiled in &self.rules {
            match &compiled.matcher {
                Ok(matcher) => {
                    if CompiledRule::matches(matcher, compiled.rule.scope, path) {
                        return Verdict::Excluded {
                            pattern: compiled.rule.pattern.clone(),
                            rationale: compiled.rule.rationale.clone(),
                        };
                    }
                }
                Err(_) => {
                    return Verdict::FailClosed {
                        pattern: compiled.rule.pattern.clone(),
                    };
                }
            }
        }
        Verdict::Allowed
    }

    /// Whether `path` must be excluded.
    #[must_use]
    pub fn is_sensitive(&self, path: &Path) -> bool {
        self.classify(path).is_sensitive()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::rules::default_rules;

    fn rule(pattern: &str, kind: PatternKind, scope: MatchScope) -> SensitivityRule {
        SensitivityRule::new(pattern, kind, scope, "test")
    }

    fn defaults() -> SensitiveFilter {
        SensitiveFilter::new(&default_rules())
    }

    // ------------------------------------------------------------------
    // Default rule set
    // ------------------------------------------------------------------

    #[test]
    fn defaults_exclude_ssh_keys() {
        let f = defaults();
        assert!(f.is_sensitive(Path::new("/home/u/.ssh/id_rsa")));
        assert!(f.is_sensitive(Path::new("/home/u/.ssh/id_ed25519.pub")));
        assert!(f.is_sensitive(Path::new("/home/u/.ssh/known_hosts")));
        assert!(!f.is_sensitive(Path::new("/home/u/.ssh/config")));
    }

    #[test]
    fn defaults_exclude_by_extension() {
        let f = defaults();
        assert!(f.is_sensitive(Path::new("/home/u/certs/server.PEM")));
        assert!(f.is_sensitive(Path::new("/home/u/app/state.sqlite3")));
        assert!(!f.is_sensitive(Path::new("/home/u/.config/app/keybindings.json")));
    }

    #[test]
    fn defaults_exclude_histories_and_caches() {
        let f = defaults();
        assert!(f.is_sensitive(Path::new("/home/u/.zsh_history")));
        assert!(f.is_sensitive(Path::new("/home/u/.bash_history")));
        assert!(f.is_sensitive(Path::new("/home/u/.config/nvim/cache")));
        assert!(f.is_sensitive(Path::new("/home/u/Library/Caches")));
        assert!(!f.is_sensitive(Path::new("/home/u/.config/nvim/init.lua")));
    }

    #[test]
    fn defaults_exclude_cloud_credentials() {
        let f = defaults();
        assert!(f.is_sensitive(Path::new("/home/u/.aws/credentials")));
        assert!(f.is_sensitive(Path::new("/home/u/.docker/config.json")));
        assert!(!f.is_sensitive(Path::new("/home/u/.aws/config")));
        assert!(!f.is_sensitive(Path::new("/home/u/.docker/daemon.json")));
    }

    #[test]
    fn defaults_ignore_tempdir_ancestors() {
        let f = defaults();
        assert!(!f.is_sensitive(Path::new("/tmp/.tmpAbC123/home/.gitconfig")));
    }

    // ------------------------------------------------------------------
    // Pattern kinds and scopes
    // ------------------------------------------------------------------

    #[test]
    fn glob_on_full_path_is_case_insensitive() {
        let f = SensitiveFilter::new(&[rule("*password*", PatternKind::Glob, MatchScope::Path)]);
        assert!(f.is_sensitive(Path::new("/home/u/.custom/password.txt")));
        assert!(f.is_sensitive(Path::new("/home/u/.custom/MyPassword")));
        assert!(!f.is_sensitive(Path::new("/home/u/.custom/settings")));
    }

    #[test]
    fn regex_on_filename() {
        let f = SensitiveFilter::new(&[rule(r"^vault\.", PatternKind::Regex, MatchScope::Filename)]);
        assert!(f.is_sensitive(Path::new("/x/VAULT.json")));
        assert!(!f.is_sensitive(Path::new("/vault.d/settings.json")));
    }

    #[test]
    fn extension_literal_is_exact() {
        let f = SensitiveFilter::new(&[rule(".key", PatternKind::Literal, MatchScope::Extension)]);
        assert!(f.is_sensitive(Path::new("/a/server.key")));
        assert!(!f.is_sensitive(Path::new("/a/server.keys")));
        assert!(!f.is_sensitive(Path::new("/a/key")));
    }

    #[test]
    fn classify_reports_matching_rule() {
        let f = SensitiveFilter::new(&[
            rule("nomatch", PatternKind::Literal, MatchScope::Path),
            SensitivityRule::new("secret", PatternKind::Literal, MatchScope::Filename, "vault"),
        ]);
        assert_eq!(
            f.classify(Path::new("/a/my-secret.txt")),
            Verdict::Excluded {
                pattern: "secret".to_string(),
                rationale: "vault".to_string()
            }
        );
        assert_eq!(f.classify(Path::new("/a/plain.txt")), Verdict::Allowed);
    }

    // ------------------------------------------------------------------
    // Fail-closed
    // ------------------------------------------------------------------

    #[test]
    fn broken_rule_fails_closed() {
        let f = SensitiveFilter::new(&[rule("(", PatternKind::Regex, MatchScope::Path)]);
        assert_eq!(f.broken_rules().count(), 1);
        assert_eq!(
            f.classify(Path::new("/home/u/.gitconfig")),
            Verdict::FailClosed {
                pattern: "(".to_string()
            }
        );
    }

    #[test]
    fn broken_glob_is_reported() {
        let err = compile_rule(&rule("[", PatternKind::Glob, MatchScope::Path)).unwrap_err();
        assert!(err.to_string().contains("invalid glob rule"));
    }

    #[test]
    fn empty_rule_set_allows_everything() {
        let f = SensitiveFilter::new(&[]);
        assert!(!f.is_sensitive(Path::new("/home/u/.ssh/id_rsa")));
    }
}
