//! Detection engine: decides which catalog components are present and
//! where their configuration lives.
//!
//! Four independent signals are evaluated per component (see [`signals`]).
//! A component is kept when any signal confirms it; it is queued for backup
//! only when at least one candidate path exists or it saves command output.
pub mod cache;
pub mod expand;
pub mod packages;
pub mod signals;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::catalog::{CaptureSpec, ComponentSpec};
use crate::context::Context;
use packages::PackageInventory;
pub use signals::DetectionMethod;
use signals::SignalOutcome;

/// Whether a detected component has anything to back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    /// At least one candidate path exists, or command output is saved.
    WithArtifacts,
    /// Installed, but there is nothing to back up.
    PresentButEmpty,
}

/// A component found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedComponent {
    /// Component id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Existing absolute paths, unioned across patterns.
    pub resolved_paths: BTreeSet<PathBuf>,
    /// Signals that confirmed the component, in evaluation order.
    pub methods: Vec<DetectionMethod>,
    /// Whether there is anything to back up.
    pub presence: Presence,
    /// Commands whose output the backup saves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<CaptureSpec>,
}

impl DetectedComponent {
    /// Whether the component has paths to back up.
    #[must_use]
    pub fn has_artifacts(&self) -> bool {
        self.presence == Presence::WithArtifacts
    }
}

/// Result of a detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// Detected components, sorted by id.
    pub components: Vec<DetectedComponent>,
    /// Inconclusive signals and unresolvable patterns.
    pub warnings: Vec<String>,
    /// Whether the result was served from the detection cache.
    pub from_cache: bool,
}

impl DetectionReport {
    /// Components with at least one existing path.
    pub fn with_artifacts(&self) -> impl Iterator<Item = &DetectedComponent> {
        self.components.iter().filter(|c| c.has_artifacts())
    }

    /// Components installed without any existing path.
    pub fn present_but_empty(&self) -> impl Iterator<Item = &DetectedComponent> {
        self.components.iter().filter(|c| !c.has_artifacts())
    }

    /// Look up a detected component.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DetectedComponent> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// Run detection for every applicable catalog component.
///
/// Serves from the detection cache when enabled and fresh; otherwise
/// queries package managers once, evaluates components on the worker pool,
/// and refreshes the cache.
#[must_use]
pub fn detect(ctx: &Context) -> DetectionReport {
    let settings = &ctx.config.settings;
    let cache_file = cache::cache_path(&ctx.env);
    let fingerprint = cache::fingerprint(&ctx.config, &ctx.platform, ctx.home());

    if let Some(ttl) = settings.cache_ttl()
        && let Some(components) = cache::load(&cache_file, &fingerprint, ttl, Utc::now())
    {
        ctx.log.debug(&format!(
            "detection served from cache {}",
            cache_file.display()
        ));
        return DetectionReport {
            components,
            warnings: Vec::new(),
            from_cache: true,
        };
    }

    let inventory = PackageInventory::query(
        &ctx.config.package_managers,
        ctx.executor.as_ref(),
        settings.package_timeout(),
        ctx.log.as_ref(),
    );
    let report = detect_with_inventory(ctx, &inventory);

    if settings.cache_ttl().is_some() && !ctx.dry_run {
        if let Err(e) = cache::store(&cache_file, &fingerprint, &report.components, Utc::now()) {
            ctx.log
                .debug(&format!("cannot write detection cache {}: {e}", cache_file.display()));
        }
    }
    report
}

/// Run detection against a pre-fetched package inventory.
#[must_use]
pub fn detect_with_inventory(ctx: &Context, inventory: &PackageInventory) -> DetectionReport {
    let config = &ctx.config;
    let specs: Vec<&ComponentSpec> = config
        .catalog
        .components()
        .iter()
        .filter(|s| {
            if config.detection.is_excluded(&s.id) {
                ctx.log.debug(&format!("{}: excluded by configuration", s.id));
                return false;
            }
            ctx.platform.supports(&s.platforms)
        })
        .collect();

    let results = ctx.run_parallel(specs, |spec| evaluate(spec, ctx, inventory));

    let mut report = DetectionReport::default();
    for (component, warnings) in results {
        for w in &warnings {
            ctx.log.warn(w);
        }
        report.warnings.extend(warnings);
        if let Some(c) = component {
            report.components.push(c);
        }
    }
    report
}

/// Evaluate all four signals for one component.
fn evaluate(
    spec: &ComponentSpec,
    ctx: &Context,
    inventory: &PackageInventory,
) -> (Option<DetectedComponent>, Vec<String>) {
    let settings = &ctx.config.settings;
    let mut warnings = Vec::new();
    let mut methods = Vec::new();

    let scan = signals::path_signal(spec, &ctx.env, settings.max_depth);
    for failure in &scan.failures {
        warnings.push(format!("{}: {failure}", spec.id));
    }

    let outcomes = [
        (
            DetectionMethod::Executable,
            signals::executable_signal(spec, &ctx.executor, settings.lookup_timeout()),
        ),
        (
            DetectionMethod::PackageManager,
            signals::package_signal(spec, inventory),
        ),
        (DetectionMethod::ConfigPath, scan.outcome()),
        (
            DetectionMethod::Override,
            signals::override_signal(spec, &ctx.config.detection),
        ),
    ];
    for (method, outcome) in outcomes {
        match outcome {
            SignalOutcome::Confirmed => methods.push(method),
            SignalOutcome::Absent => {}
            SignalOutcome::Inconclusive(e) => warnings.push(e.to_string()),
        }
    }

    if methods.is_empty() {
        return (None, warnings);
    }

    let presence = if scan.paths.is_empty() && !spec.has_captures() {
        Presence::PresentButEmpty
    } else {
        Presence::WithArtifacts
    };
    ctx.log.debug(&format!(
        "{}: detected via {} ({} path(s))",
        spec.id,
        methods
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        scan.paths.len()
    ));

    (
        Some(DetectedComponent {
            id: spec.id.clone(),
            name: spec.name.clone(),
            resolved_paths: scan.paths,
            methods,
            presence,
            captures: spec.captures.clone(),
        }),
        warnings,
    )
}
