//! Tunables from the `[settings]`, `[detection]` and `[[package_managers]]`
//! tables.
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Maximum directory depth a `**` glob descends while resolving paths.
    /// Backups copy everything below a resolved path regardless.
    pub max_depth: usize,
    /// Timeout for a single executable lookup.
    pub lookup_timeout_secs: u64,
    /// Timeout for a single package-manager listing.
    pub package_timeout_secs: u64,
    /// Worker threads; 0 picks the available parallelism.
    pub jobs: usize,
    /// Lifetime of the detection cache; 0 disables it.
    pub cache_ttl_secs: u64,
    /// Parent directory for exports without an explicit destination.
    pub backup_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            lookup_timeout_secs: 5,
            package_timeout_secs: 20,
            jobs: 0,
            cache_ttl_secs: 0,
            backup_root: PathBuf::from("backups"),
        }
    }
}

impl Settings {
    /// Executable lookup timeout.
    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Package listing timeout.
    #[must_use]
    pub const fn package_timeout(&self) -> Duration {
        Duration::from_secs(self.package_timeout_secs)
    }

    /// Detection cache lifetime, if enabled.
    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cache_ttl_secs))
        }
    }

    /// Effective worker count: the configured value, or the machine's
    /// available parallelism when 0.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}

/// Explicit detection overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionSettings {
    /// Component ids forced present.
    pub include: Vec<String>,
    /// Component ids never evaluated.
    pub exclude: Vec<String>,
}

impl DetectionSettings {
    /// Whether `id` is forced present.
    #[must_use]
    pub fn is_included(&self, id: &str) -> bool {
        self.include.iter().any(|i| i == id)
    }

    /// Whether `id` is excluded from detection.
    #[must_use]
    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|i| i == id)
    }
}

/// A package manager queried for an installed-package inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManagerSpec {
    /// Display name used in warnings (e.g. `brew-cask`).
    pub name: String,
    /// Program to run.
    pub program: String,
    /// Arguments; the output lists one package per line, name first.
    #[serde(default)]
    pub args: Vec<String>,
}

impl PackageManagerSpec {
    /// Create a spec.
    #[must_use]
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// Managers queried when the config file does not list any.
#[must_use]
pub fn default_package_managers() -> Vec<PackageManagerSpec> {
    vec![
        PackageManagerSpec::new("brew", "brew", &["list", "--formula", "-1"]),
        PackageManagerSpec::new("brew-cask", "brew", &["list", "--cask", "-1"]),
        PackageManagerSpec::new("pacman", "pacman", &["-Qq"]),
        PackageManagerSpec::new("dpkg", "dpkg-query", &["-W", "-f=${Package}\\n"]),
    ]
}
