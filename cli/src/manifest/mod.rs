//! Backup manifest model, persistence, and verification.
//!
//! A manifest lives at `<backup>/manifest.json` and describes, per
//! component, exactly the files that were copied successfully and the
//! command output that was saved.
pub mod verify;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::backup::layout::CAPTURE_DIR;
use crate::error::ManifestError;

/// File name of the manifest inside a backup directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const FORMAT_VERSION: u32 = 1;

/// Version of this tool, stamped into every manifest.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One component's captured content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Component id; also the name of its subdirectory.
    pub id: String,
    /// Number of regular files copied.
    pub file_count: usize,
    /// Sum of the copied files' sizes in bytes.
    pub total_bytes: u64,
    /// Sorted `/`-separated paths of the copied files.
    pub paths: Vec<String>,
    /// Entries withheld by sensitivity rules.
    pub excluded_count: usize,
    /// Recreated symlinks: relative link path to recorded target.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub symlinks: BTreeMap<String, String>,
    /// Saved command output, sorted by file name. Not counted in
    /// `file_count` or `total_bytes`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<CapturedOutput>,
}

/// Command output saved under `<component>/@capture/<file>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// File name inside the component's capture directory.
    pub file: String,
    /// Size of the saved output in bytes.
    pub bytes: u64,
    /// Program that produced the output; empty when rebuilt from a layout.
    #[serde(default)]
    pub program: String,
    /// Arguments it was run with.
    #[serde(default)]
    pub args: Vec<String>,
    /// Arguments that feed the file back to `program`; `{file}` stands for
    /// the saved file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replay: Vec<String>,
}

impl CapturedOutput {
    /// Backup-relative path, e.g. `@capture/Brewfile`.
    #[must_use]
    pub fn rel_path(&self) -> String {
        format!("{CAPTURE_DIR}/{}", self.file)
    }

    /// Whether restore can feed the file back.
    #[must_use]
    pub fn is_replayable(&self) -> bool {
        !self.program.is_empty() && !self.replay.is_empty()
    }
}

impl ManifestEntry {
    /// An empty entry for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Record a successfully copied file.
    pub fn add_file(&mut self, rel: String, bytes: u64) {
        self.paths.push(rel);
        self.file_count += 1;
        self.total_bytes += bytes;
    }

    /// Record saved command output.
    pub fn add_capture(&mut self, capture: CapturedOutput) {
        self.captures.push(capture);
    }

    fn normalize(&mut self) {
        self.paths.sort();
        self.paths.dedup();
        self.captures.sort_by(|a, b| a.file.cmp(&b.file));
    }
}

/// Aggregate counts across all components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Number of components.
    pub components: usize,
    /// Number of files.
    pub files: usize,
    /// Number of bytes.
    pub bytes: u64,
    /// Number of excluded entries.
    pub excluded: usize,
    /// Number of saved command outputs.
    #[serde(default)]
    pub captures: usize,
}

/// The persisted description of one backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    /// Manifest format version.
    pub format_version: u32,
    /// Creation time, RFC 3339 UTC.
    pub created_at: String,
    /// Host the backup was taken on.
    pub host: String,
    /// Tool version that wrote the manifest.
    pub tool_version: String,
    /// Entries sorted by component id.
    pub components: Vec<ManifestEntry>,
    /// Aggregate totals.
    pub totals: Totals,
}

impl BackupManifest {
    /// Assemble a manifest with entries sorted by id and paths sorted.
    #[must_use]
    pub fn build(mut components: Vec<ManifestEntry>, host: &str, created_at: DateTime<Utc>) -> Self {
        for entry in &mut components {
            entry.normalize();
        }
        components.sort_by(|a, b| a.id.cmp(&b.id));
        let totals = Totals {
            components: components.len(),
            files: components.iter().map(|c| c.file_count).sum(),
            bytes: components.iter().map(|c| c.total_bytes).sum(),
            excluded: components.iter().map(|c| c.excluded_count).sum(),
            captures: components.iter().map(|c| c.captures.len()).sum(),
        };
        Self {
            format_version: FORMAT_VERSION,
            created_at: created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            host: host.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            components,
            totals,
        }
    }

    /// Reconstruct a manifest from a backup's directory layout, for restores
    /// forced past an unreadable manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Missing`] if `dir` cannot be listed.
    pub fn from_layout(dir: &Path) -> Result<Self, ManifestError> {
        let listing = fs::read_dir(dir).map_err(|_| ManifestError::Missing(dir.to_path_buf()))?;
        let mut ids: BTreeSet<String> = BTreeSet::new();
        for entry in listing.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                ids.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }

        let mut entries = Vec::new();
        for id in ids {
            let root = dir.join(&id);
            let mut entry = ManifestEntry::new(&id);
            for item in WalkDir::new(&root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .flatten()
            {
                let Ok(rel) = item.path().strip_prefix(&root) else {
                    continue;
                };
                let rel = rel_string(rel);
                let file_type = item.file_type();
                if let Some(file) = rel.strip_prefix(&format!("{CAPTURE_DIR}/")) {
                    if file_type.is_file() && !file.contains('/') {
                        entry.add_capture(CapturedOutput {
                            file: file.to_string(),
                            bytes: item.metadata().map_or(0, |m| m.len()),
                            ..CapturedOutput::default()
                        });
                    }
                } else if file_type.is_symlink() {
                    if let Ok(target) = fs::read_link(item.path()) {
                        entry
                            .symlinks
                            .insert(rel, target.to_string_lossy().into_owned());
                    }
                } else if file_type.is_file() {
                    let bytes = item.metadata().map_or(0, |m| m.len());
                    entry.add_file(rel, bytes);
                }
            }
            entries.push(entry);
        }
        Ok(Self::build(entries, "unknown-host", Utc::now()))
    }

    /// Pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns a serialization error (not expected for this type).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self).map(|mut s| {
            s.push('\n');
            s
        })
    }

    /// Write `<dir>/manifest.json` atomically and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] if serialization or I/O fails.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let fail = |message: String| ManifestError::Write {
            path: path.clone(),
            message,
        };
        let json = self.to_json().map_err(|e| fail(e.to_string()))?;
        let tmp = dir.join(format!(".{MANIFEST_FILE}.tmp"));
        fs::write(&tmp, json).map_err(|e| fail(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            fail(e.to_string())
        })?;
        Ok(path)
    }

    /// Read `<dir>/manifest.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Missing`] if the file does not exist and
    /// [`ManifestError::Parse`] if it cannot be read or parsed.
    pub fn read(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::Missing(path));
            }
            Err(e) => {
                return Err(ManifestError::Parse {
                    path,
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&content).map_err(|e| ManifestError::Parse {
            path,
            message: e.to_string(),
        })
    }

    /// Look up a component entry.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&ManifestEntry> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// `/`-joined form of a relative path.
fn rel_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// This machine's host name, or `unknown-host`.
#[must_use]
pub fn host_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}
