//! Candidate path expansion: environment substitution, home-relative
//! resolution, and depth-bounded globbing.
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use glob::MatchOptions;

use crate::context::Environment;
use crate::error::DetectionError;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// XDG variables and their fallbacks relative to the home directory.
const XDG_DEFAULTS: &[(&str, &str)] = &[
    ("XDG_CONFIG_HOME", ".config"),
    ("XDG_DATA_HOME", ".local/share"),
    ("XDG_STATE_HOME", ".local/state"),
    ("XDG_CACHE_HOME", ".cache"),
];

/// Substitute `~`, `$VAR`, `${VAR}` and `${VAR:-default}` in `pattern`.
///
/// A variable resolves to, in order: its value in `env`, the inline
/// default, the XDG base-directory default, the home directory for `HOME`.
/// Anything else is a [`DetectionError::PathResolution`].
///
/// # Errors
///
/// Returns [`DetectionError::PathResolution`] for unset variables without a
/// default and for unterminated `${`.
pub fn expand(pattern: &str, env: &Environment) -> Result<String, DetectionError> {
    expand_inner(pattern, env, pattern)
}

fn expand_inner(input: &str, env: &Environment, pattern: &str) -> Result<String, DetectionError> {
    let fail = |reason: String| DetectionError::PathResolution {
        pattern: pattern.to_string(),
        reason,
    };

    let mut out = String::with_capacity(input.len());
    let rest = if input == "~" {
        out.push_str(&env.home().to_string_lossy());
        ""
    } else if let Some(r) = input.strip_prefix("~/") {
        out.push_str(&env.home().to_string_lossy());
        out.push('/');
        r
    } else {
        input
    };

    let mut i = 0;
    while let Some(offset) = rest[i..].find('$') {
        let dollar = i + offset;
        out.push_str(&rest[i..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = closing_brace(braced).ok_or_else(|| fail("unterminated ${".to_string()))?;
            let body = &braced[..end];
            let (name, default) = body
                .split_once(":-")
                .map_or((body, None), |(n, d)| (n, Some(d)));
            out.push_str(&lookup(name, default, env, pattern)?);
            // `$` + `{` + body + `}`
            i = dollar + 2 + end + 1;
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
                i = dollar + 1;
                continue;
            }
            out.push_str(&lookup(&after[..len], None, env, pattern)?);
            i = dollar + 1 + len;
        }
    }
    out.push_str(&rest[i..]);
    Ok(out)
}

/// Index of the `}` closing an already-opened `${`, honouring nesting.
fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn lookup(
    name: &str,
    default: Option<&str>,
    env: &Environment,
    pattern: &str,
) -> Result<String, DetectionError> {
    if let Some(value) = env.var(name) {
        return Ok(value.to_string());
    }
    if let Some(default) = default {
        return expand_inner(default, env, pattern);
    }
    if let Some((_, fallback)) = XDG_DEFAULTS.iter().find(|(var, _)| *var == name) {
        return Ok(env.xdg_dir(name, fallback).to_string_lossy().into_owned());
    }
    if name == "HOME" {
        return Ok(env.home().to_string_lossy().into_owned());
    }
    Err(DetectionError::PathResolution {
        pattern: pattern.to_string(),
        reason: format!("${name} is not set"),
    })
}

/// Whether `s` contains glob metacharacters.
fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Lexically normalize a path: drop `.` and fold `..` where possible.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Expand `pattern` and return the existing paths it denotes.
///
/// Relative results are taken relative to the home directory. Glob matches
/// more than `max_depth` components below the pattern's literal prefix are
/// dropped.
///
/// # Errors
///
/// Returns [`DetectionError::PathResolution`] if the pattern cannot be
/// expanded or is not a valid glob.
pub fn resolve_pattern(
    pattern: &str,
    env: &Environment,
    max_depth: usize,
) -> Result<BTreeSet<PathBuf>, DetectionError> {
    let expanded = expand(pattern, env)?;
    let candidate = Path::new(&expanded);
    let full = normalize(&if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        env.home().join(candidate)
    });

    let mut found = BTreeSet::new();
    let full_str = full.to_string_lossy();
    if !has_glob_meta(&full_str) {
        if full.symlink_metadata().is_ok() {
            found.insert(full);
        }
        return Ok(found);
    }

    let prefix_depth = full
        .components()
        .take_while(|c| !has_glob_meta(&c.as_os_str().to_string_lossy()))
        .count();
    let matches =
        glob::glob_with(&full_str, GLOB_OPTIONS).map_err(|e| DetectionError::PathResolution {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;
    for path in matches.flatten() {
        if path.components().count().saturating_sub(prefix_depth) <= max_depth {
            found.insert(normalize(&path));
        }
    }
    Ok(found)
}
