//! The four independent detection signals.
//!
//! Each signal looks at one kind of evidence and knows nothing about the
//! others; the engine combines them.
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::expand::resolve_pattern;
use super::packages::PackageInventory;
use crate::config::catalog::ComponentSpec;
use crate::config::settings::DetectionSettings;
use crate::context::Environment;
use crate::error::DetectionError;
use crate::exec::{self, Executor};

/// Which signal contributed to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// A configured executable is on the search path.
    Executable,
    /// A package manager lists the component.
    PackageManager,
    /// A candidate path exists.
    ConfigPath,
    /// The user forced the component present.
    Override,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Executable => "executable",
            Self::PackageManager => "package",
            Self::ConfigPath => "path",
            Self::Override => "override",
        })
    }
}

/// Result of one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The evidence confirms the component.
    Confirmed,
    /// The evidence is conclusive and negative.
    Absent,
    /// The evidence could not be gathered (e.g. a timeout).
    Inconclusive(DetectionError),
}

impl SignalOutcome {
    /// Whether the signal confirmed presence.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Search the path for any of the component's executables.
#[must_use]
pub fn executable_signal(
    spec: &ComponentSpec,
    executor: &Arc<dyn Executor>,
    timeout: Duration,
) -> SignalOutcome {
    let mut inconclusive = None;
    for name in &spec.executables {
        let lookup = Arc::clone(executor);
        let program = name.clone();
        match exec::with_timeout(name, timeout, move || lookup.which(&program)) {
            Ok(Some(_)) => return SignalOutcome::Confirmed,
            Ok(None) => {}
            Err(_) => {
                inconclusive = Some(DetectionError::Timeout {
                    component: spec.id.clone(),
                    signal: format!("executable '{name}'"),
                    seconds: timeout.as_secs(),
                });
            }
        }
    }
    inconclusive.map_or(SignalOutcome::Absent, SignalOutcome::Inconclusive)
}

/// Match the component's package names against the inventory.
#[must_use]
pub fn package_signal(spec: &ComponentSpec, inventory: &PackageInventory) -> SignalOutcome {
    if spec.package_names().iter().any(|n| inventory.contains(n)) {
        return SignalOutcome::Confirmed;
    }
    match inventory.failed_managers().first() {
        Some(manager) => SignalOutcome::Inconclusive(DetectionError::Unavailable {
            component: spec.id.clone(),
            signal: "package".to_string(),
            reason: format!("{manager} did not answer"),
        }),
        None => SignalOutcome::Absent,
    }
}

/// Existing paths for a component, plus the patterns that failed to expand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathScan {
    /// Union of existing paths across all patterns.
    pub paths: BTreeSet<PathBuf>,
    /// Patterns that could not be resolved.
    pub failures: Vec<DetectionError>,
}

impl PathScan {
    /// Signal view of the scan.
    #[must_use]
    pub fn outcome(&self) -> SignalOutcome {
        if self.paths.is_empty() {
            SignalOutcome::Absent
        } else {
            SignalOutcome::Confirmed
        }
    }
}

/// Resolve every candidate pattern and union the existing paths.
#[must_use]
pub fn path_signal(spec: &ComponentSpec, env: &Environment, max_depth: usize) -> PathScan {
    let mut scan = PathScan::default();
    for pattern in &spec.paths {
        match resolve_pattern(pattern, env, max_depth) {
            Ok(paths) => scan.paths.extend(paths),
            Err(e) => scan.failures.push(e),
        }
    }
    scan
}

/// The user's explicit include list.
#[must_use]
pub fn override_signal(spec: &ComponentSpec, detection: &DetectionSettings) -> SignalOutcome {
    if detection.is_included(&spec.id) {
        SignalOutcome::Confirmed
    } else {
        SignalOutcome::Absent
    }
}
