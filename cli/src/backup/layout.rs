//! Mapping between live paths and their place inside a backup.
//!
//! Paths under the home directory keep their home-relative form; any other
//! absolute path is stored under [`ABSOLUTE_PREFIX`]. Relative paths are
//! always `/`-separated so manifests are identical across platforms.
use std::path::{Component, Path, PathBuf};

/// Top-level directory (inside a component's subtree) for paths outside home.
pub const ABSOLUTE_PREFIX: &str = "@root";

/// Top-level directory (inside a component's subtree) for saved command output.
pub const CAPTURE_DIR: &str = "@capture";

/// Where restored paths land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTarget {
    /// Destination for home-relative entries.
    pub home: PathBuf,
    /// Destination for `@root/` entries.
    pub fs_root: PathBuf,
}

impl RestoreTarget {
    /// The live system: `home` plus the filesystem root.
    #[must_use]
    pub fn system(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            fs_root: PathBuf::from(std::path::MAIN_SEPARATOR_STR),
        }
    }
}

/// The `/`-separated backup-relative form of a live path.
#[must_use]
pub fn relative_for(path: &Path, home: &Path) -> String {
    if let Ok(rest) = path.strip_prefix(home) {
        return join_normal(rest);
    }
    let mut parts = vec![ABSOLUTE_PREFIX.to_string()];
    for component in path.components() {
        match component {
            Component::Prefix(p) => parts.push(
                p.as_os_str()
                    .to_string_lossy()
                    .trim_end_matches(':')
                    .to_string(),
            ),
            Component::Normal(n) => parts.push(n.to_string_lossy().into_owned()),
            _ => {}
        }
    }
    parts.join("/")
}

fn join_normal(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `rel` is a plain relative path without `..`, roots or prefixes.
#[must_use]
pub fn is_safe_relative(rel: &str) -> bool {
    !rel.is_empty()
        && !rel.starts_with('/')
        && !rel.contains('\\')
        && rel
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains(':'))
}

/// Whether `name` is a single safe path component.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    is_safe_relative(name) && !name.contains('/')
}

/// Location of saved command output inside `<backup>/<component>/`.
#[must_use]
pub fn capture_path(backup_dir: &Path, component: &str, file: &str) -> PathBuf {
    backup_dir.join(component).join(CAPTURE_DIR).join(file)
}

/// Location of `rel` inside `<backup>/<component>/`.
#[must_use]
pub fn backup_path(backup_dir: &Path, component: &str, rel: &str) -> PathBuf {
    rel.split('/')
        .fold(backup_dir.join(component), |acc, part| acc.join(part))
}

/// Live destination for a backup-relative path, or `None` if `rel` is unsafe.
#[must_use]
pub fn live_path_for(rel: &str, target: &RestoreTarget) -> Option<PathBuf> {
    if !is_safe_relative(rel) {
        return None;
    }
    let mut parts = rel.split('/');
    let base = match parts.clone().next() {
        Some(ABSOLUTE_PREFIX) => {
            parts.next();
            target.fs_root.clone()
        }
        _ => target.home.clone(),
    };
    let path = parts.fold(base, |acc, part| acc.join(part));
    // `@root` alone names no file.
    if path == target.fs_root {
        return None;
    }
    Some(path)
}
