//! Backup verification against its manifest.
use std::fmt;
use std::fs;
use std::path::Path;

use super::{BackupManifest, FORMAT_VERSION, ManifestEntry, TOOL_VERSION};
use crate::backup::layout::{backup_path, capture_path, is_plain_file_name, is_safe_relative};
use crate::error::ManifestError;

/// Category of a verification issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// A declared path is not present in the backup.
    MissingPath,
    /// Declared file count exceeds what is on disk.
    CountMismatch,
    /// Declared byte total differs from the files on disk.
    SizeMismatch,
    /// The manifest was written with a newer format.
    IncompatibleFormat,
    /// A declared path escapes its component directory.
    UnsafePath,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingPath => "missing path",
            Self::CountMismatch => "count mismatch",
            Self::SizeMismatch => "size mismatch",
            Self::IncompatibleFormat => "incompatible format",
            Self::UnsafePath => "unsafe path",
        })
    }
}

/// A problem that blocks restore unless forced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIssue {
    /// Affected component, if any.
    pub component: Option<String>,
    /// Issue category.
    pub kind: IssueKind,
    /// Human-readable detail.
    pub detail: String,
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(c) => write!(f, "[{c}] {}: {}", self.kind, self.detail),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}

/// Result of verifying a backup directory.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// The parsed manifest.
    pub manifest: BackupManifest,
    /// Blocking problems.
    pub issues: Vec<VerificationIssue>,
    /// Non-blocking notes (e.g. written by a newer tool).
    pub warnings: Vec<String>,
}

impl VerificationReport {
    /// Whether the backup can be restored without `--force`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Verify the backup at `dir`.
///
/// # Errors
///
/// Returns [`ManifestError`] if the manifest is missing or unparseable.
pub fn verify(dir: &Path) -> Result<VerificationReport, ManifestError> {
    let manifest = BackupManifest::read(dir)?;
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    if manifest.format_version > FORMAT_VERSION {
        issues.push(VerificationIssue {
            component: None,
            kind: IssueKind::IncompatibleFormat,
            detail: format!(
                "format version {} is newer than supported version {FORMAT_VERSION}",
                manifest.format_version
            ),
        });
    } else if is_newer_version(&manifest.tool_version, TOOL_VERSION) {
        warnings.push(format!(
            "backup was written by myconfig {} (this is {TOOL_VERSION})",
            manifest.tool_version
        ));
    }

    for entry in &manifest.components {
        verify_entry(dir, entry, &mut issues);
    }

    Ok(VerificationReport {
        manifest,
        issues,
        warnings,
    })
}

fn verify_entry(dir: &Path, entry: &ManifestEntry, issues: &mut Vec<VerificationIssue>) {
    let issue = |kind, detail: String| VerificationIssue {
        component: Some(entry.id.clone()),
        kind,
        detail,
    };

    if !is_safe_relative(&entry.id) || entry.id.contains('/') {
        issues.push(issue(IssueKind::UnsafePath, format!("component id '{}'", entry.id)));
        return;
    }

    let mut found = 0usize;
    let mut bytes = 0u64;
    for rel in &entry.paths {
        if !is_safe_relative(rel) {
            issues.push(issue(IssueKind::UnsafePath, rel.clone()));
            continue;
        }
        match fs::symlink_metadata(backup_path(dir, &entry.id, rel)) {
            Ok(meta) if meta.is_file() => {
                found += 1;
                bytes += meta.len();
            }
            _ => issues.push(issue(IssueKind::MissingPath, rel.clone())),
        }
    }

    for rel in entry.symlinks.keys() {
        if !is_safe_relative(rel) {
            issues.push(issue(IssueKind::UnsafePath, rel.clone()));
            continue;
        }
        let is_link = fs::symlink_metadata(backup_path(dir, &entry.id, rel))
            .is_ok_and(|m| m.file_type().is_symlink());
        if !is_link {
            issues.push(issue(IssueKind::MissingPath, format!("{rel} (symlink)")));
        }
    }

    for saved in &entry.captures {
        if !is_plain_file_name(&saved.file) {
            issues.push(issue(IssueKind::UnsafePath, saved.rel_path()));
            continue;
        }
        match fs::symlink_metadata(capture_path(dir, &entry.id, &saved.file)) {
            Ok(meta) if meta.is_file() && meta.len() == saved.bytes => {}
            Ok(meta) if meta.is_file() => issues.push(issue(
                IssueKind::SizeMismatch,
                format!(
                    "{} declares {} bytes, {} on disk",
                    saved.rel_path(),
                    saved.bytes,
                    meta.len()
                ),
            )),
            _ => issues.push(issue(IssueKind::MissingPath, saved.rel_path())),
        }
    }

    if entry.file_count > found || entry.file_count != entry.paths.len() {
        issues.push(issue(
            IssueKind::CountMismatch,
            format!(
                "declares {} file(s), {} path(s) listed, {found} on disk",
                entry.file_count,
                entry.paths.len()
            ),
        ));
    } else if entry.total_bytes != bytes {
        issues.push(issue(
            IssueKind::SizeMismatch,
            format!("declares {} bytes, {bytes} on disk", entry.total_bytes),
        ));
    }
}

/// Whether dotted version `a` is strictly newer than `b`. Unparseable
/// components compare as zero.
fn is_newer_version(a: &str, b: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split(['.', '-', '+'])
            .take(3)
            .map(|p| p.parse().unwrap_or(0))
            .collect()
    };
    parse(a) > parse(b)
}
