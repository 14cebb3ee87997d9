//! On-disk detection cache.
//!
//! Entries are keyed by a SHA-256 fingerprint of everything that shapes
//! detection (catalog, overrides, package managers, platform, home) and
//! expire after the configured TTL. Cached paths are re-checked on load so
//! a served result never names a path that no longer exists.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{DetectedComponent, DetectionMethod, Presence};
use crate::config::{APP_DIR, Config};
use crate::context::Environment;
use crate::platform::Platform;

const CACHE_FILE: &str = "detection.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    fingerprint: String,
    created_at: i64,
    components: Vec<DetectedComponent>,
}

/// `$XDG_CACHE_HOME/myconfig/detection.json`.
#[must_use]
pub fn cache_path(env: &Environment) -> PathBuf {
    env.xdg_dir("XDG_CACHE_HOME", ".cache")
        .join(APP_DIR)
        .join(CACHE_FILE)
}

/// Hex SHA-256 over the inputs that determine a detection result.
#[must_use]
pub fn fingerprint(config: &Config, platform: &Platform, home: &Path) -> String {
    let mut hasher = Sha256::new();
    for part in [
        serde_json::to_string(&config.catalog).unwrap_or_default(),
        serde_json::to_string(&config.detection).unwrap_or_default(),
        serde_json::to_string(&config.package_managers).unwrap_or_default(),
        config.settings.max_depth.to_string(),
        platform.os.to_string(),
        home.to_string_lossy().into_owned(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Load cached components if the file matches `fingerprint` and is younger
/// than `ttl` at `now`.
#[must_use]
pub fn load(
    path: &Path,
    fingerprint: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Option<Vec<DetectedComponent>> {
    let content = fs::read_to_string(path).ok()?;
    let cache: CacheFile = serde_json::from_str(&content).ok()?;
    if cache.version != CACHE_VERSION || cache.fingerprint != fingerprint {
        return None;
    }
    let age = now.timestamp().checked_sub(cache.created_at)?;
    if age < 0 || u64::try_from(age).ok()? > ttl.as_secs() {
        return None;
    }
    Some(revalidate(cache.components))
}

/// Write the cache atomically.
///
/// # Errors
///
/// Returns an I/O error if the cache directory or file cannot be written.
pub fn store(
    path: &Path,
    fingerprint: &str,
    components: &[DetectedComponent],
    now: DateTime<Utc>,
) -> io::Result<()> {
    let cache = CacheFile {
        version: CACHE_VERSION,
        fingerprint: fingerprint.to_string(),
        created_at: now.timestamp(),
        components: components.to_vec(),
    };
    let json = serde_json::to_string(&cache).map_err(io::Error::other)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

/// Drop paths that vanished since the cache was written.
fn revalidate(components: Vec<DetectedComponent>) -> Vec<DetectedComponent> {
    components
        .into_iter()
        .filter_map(|mut c| {
            c.resolved_paths.retain(|p| p.symlink_metadata().is_ok());
            if !c.resolved_paths.is_empty() {
                return Some(c);
            }
            c.methods.retain(|m| *m != DetectionMethod::ConfigPath);
            if c.methods.is_empty() {
                None
            } else {
                if c.captures.is_empty() {
                    c.presence = Presence::PresentButEmpty;
                }
                Some(c)
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::catalog::CaptureSpec;
    use crate::platform::Os;
    use std::collections::BTreeSet;

    fn component(id: &str, paths: &[PathBuf], methods: &[DetectionMethod]) -> DetectedComponent {
        DetectedComponent {
            id: id.to_string(),
            name: id.to_string(),
            resolved_paths: paths.iter().cloned().collect::<BTreeSet<_>>(),
            methods: methods.to_vec(),
            presence: if paths.is_empty() {
                Presence::PresentButEmpty
            } else {
                Presence::WithArtifacts
            },
            captures: Vec::new(),
        }
    }

    #[test]
    fn store_then_load_within_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".gitconfig");
        fs::write(&file, "x").unwrap();
        let path = tmp.path().join("cache/detection.json");
        let now = Utc::now();
        let comps = vec![component(
            "git",
            std::slice::from_ref(&file),
            &[DetectionMethod::ConfigPath],
        )];

        store(&path, "fp", &comps, now).unwrap();
        let loaded = load(&path, "fp", Duration::from_secs(60), now).unwrap();
        assert_eq!(loaded, comps);
    }

    #[test]
    fn fingerprint_mismatch_misses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("detection.json");
        store(&path, "a", &[], Utc::now()).unwrap();
        assert!(load(&path, "b", Duration::from_secs(60), Utc::now()).is_none());
    }

    #[test]
    fn expired_entry_misses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("detection.json");
        let then = Utc::now() - chrono::Duration::seconds(120);
        store(&path, "fp", &[], then).unwrap();
        assert!(load(&path, "fp", Duration::from_secs(60), Utc::now()).is_none());
    }

    #[test]
    fn vanished_paths_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("gone");
        let comps = vec![
            component("a", std::slice::from_ref(&gone), &[DetectionMethod::ConfigPath]),
            component(
                "b",
                std::slice::from_ref(&gone),
                &[DetectionMethod::ConfigPath, DetectionMethod::Executable],
            ),
        ];
        let revalidated = revalidate(comps);
        assert_eq!(revalidated.len(), 1);
        assert_eq!(revalidated[0].id, "b");
        assert_eq!(revalidated[0].presence, Presence::PresentButEmpty);
        assert_eq!(revalidated[0].methods, vec![DetectionMethod::Executable]);
    }

    #[test]
    fn command_output_keeps_artifacts_after_paths_vanish() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vscode = component(
            "vscode",
            &[tmp.path().join("gone")],
            &[DetectionMethod::Executable, DetectionMethod::ConfigPath],
        );
        vscode.captures = vec![CaptureSpec::new(
            "code",
            ["--list-extensions"],
            "extensions.txt",
        )];
        let revalidated = revalidate(vec![vscode]);
        assert!(revalidated[0].resolved_paths.is_empty());
        assert_eq!(revalidated[0].presence, Presence::WithArtifacts);
    }

    #[test]
    fn fingerprint_changes_with_catalog() {
        let platform = Platform::new(Os::Linux);
        let a = fingerprint(&Config::builtin(), &platform, Path::new("/h"));
        let b = fingerprint(
            &Config::from_toml_str("[components.extra]\npaths = \"~/.extra\"\n").unwrap(),
            &platform,
            Path::new("/h"),
        );
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, fingerprint(&Config::builtin(), &platform, Path::new("/h")));
    }

    #[test]
    fn cache_path_under_xdg_cache() {
        let env = Environment::new("/h");
        assert_eq!(cache_path(&env), PathBuf::from("/h/.cache/myconfig/detection.json"));
    }
}
