//! Restore orchestration with preserve-before-overwrite semantics.
//!
//! Each component goes through [`RestoreStage`]s in order. Existing content
//! at a destination is renamed aside to `<name>.bak.<YYYYmmddHHMMSS>` and
//! never deleted; a failure in one component does not stop the others.
//!
//! Saved command output is never copied into the home directory. With
//! [`RestoreOptions::replay`] it is fed back to the tool that produced it,
//! after the tool's current output has been saved under the state directory.
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::backup::copy;
use crate::backup::layout::{self, RestoreTarget};
use crate::config::APP_DIR;
use crate::context::Context;
use crate::error::RestoreError;
use crate::filter::SensitiveFilter;
use crate::logging::ComponentStatus;
use crate::manifest::verify::{self, VerificationReport};
use crate::manifest::{BackupManifest, CapturedOutput, ManifestEntry};

/// Per-component restore stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RestoreStage {
    /// Check the backup against its manifest.
    Verify,
    /// Move existing content aside.
    PreserveExisting,
    /// Place the backup's copy.
    Copy,
    /// Apply mode bits and modification time.
    RestorePermissions,
    /// Feed saved command output back to its tool.
    Replay,
    /// Add the path to the component report.
    Record,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verify => "verify",
            Self::PreserveExisting => "preserve",
            Self::Copy => "copy",
            Self::RestorePermissions => "permissions",
            Self::Replay => "replay",
            Self::Record => "record",
        })
    }
}

/// Caller-selected restore behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Restore even if verification fails or the manifest is unreadable.
    pub force: bool,
    /// Restrict to these component ids (empty = all).
    pub only: Vec<String>,
    /// Run the replay command of every saved command output.
    pub replay: bool,
}

/// A path moved aside before being overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preserved {
    /// Live path that held the previous content.
    pub original: PathBuf,
    /// Where the previous content now lives.
    pub saved_as: PathBuf,
}

/// A failed path with the stage it failed in.
#[derive(Debug)]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: RestoreStage,
    /// What went wrong.
    pub error: RestoreError,
}

/// Outcome for one component.
#[derive(Debug, Default)]
pub struct ComponentRestore {
    /// Component id.
    pub id: String,
    /// Live paths that now hold the backup's content (planned, in dry-run).
    pub restored: Vec<PathBuf>,
    /// Existing content moved aside.
    pub preserved: Vec<Preserved>,
    /// Paths withheld by sensitivity rules.
    pub skipped: Vec<PathBuf>,
    /// Replay commands that ran (planned, in dry-run).
    pub replayed: Vec<String>,
    /// Output saved from each tool before its replay.
    pub snapshots: Vec<PathBuf>,
    /// Failed paths and replays.
    pub failures: Vec<StageFailure>,
}

impl ComponentRestore {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    fn fail(&mut self, stage: RestoreStage, error: RestoreError) {
        self.failures.push(StageFailure { stage, error });
    }

    /// Whether any path failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Result of a restore run.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Per-component outcomes, in manifest order.
    pub components: Vec<ComponentRestore>,
    /// Verification issues and notes that did not block the run.
    pub warnings: Vec<String>,
    /// Nothing was written.
    pub dry_run: bool,
}

impl RestoreReport {
    /// Whether any component failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.components.iter().any(ComponentRestore::has_failures)
    }

    /// Look up a component outcome.
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&ComponentRestore> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// Restore the backup at `backup_dir` onto `target`.
///
/// # Errors
///
/// Returns [`RestoreError::MissingBackup`] if `backup_dir` does not exist.
/// Without `force`, returns [`RestoreError::Manifest`] for an unreadable
/// manifest and [`RestoreError::VerificationFailed`] if verification finds
/// issues. Nothing is touched in those cases.
pub fn restore(
    backup_dir: &Path,
    target: &RestoreTarget,
    options: &RestoreOptions,
    ctx: &Context,
) -> Result<RestoreReport, RestoreError> {
    if !backup_dir.is_dir() {
        return Err(RestoreError::MissingBackup(backup_dir.to_path_buf()));
    }

    let mut report = RestoreReport {
        dry_run: ctx.dry_run,
        ..RestoreReport::default()
    };
    ctx.log.stage(&format!("Verifying {}", backup_dir.display()));
    let manifest = verified_manifest(backup_dir, options.force, &mut report.warnings, ctx)?;

    let entries: Vec<&ManifestEntry> = manifest
        .components
        .iter()
        .filter(|e| options.only.is_empty() || options.only.contains(&e.id))
        .collect();
    for id in &options.only {
        if manifest.entry(id).is_none() {
            let msg = format!("component '{id}' is not in this backup");
            ctx.log.warn(&msg);
            report.warnings.push(msg);
        }
    }

    let filter = SensitiveFilter::new(&ctx.config.rules);
    let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
    ctx.log.stage(&format!(
        "Restoring {} component(s) from {}",
        entries.len(),
        backup_dir.display()
    ));

    report.components = ctx.run_parallel(entries, |entry| {
        let mut out = restore_component(entry, backup_dir, target, &filter, &stamp, ctx);
        if options.replay {
            replay_outputs(entry, backup_dir, &stamp, ctx, &mut out);
        }
        out
    });
    for component in &report.components {
        record(ctx, component);
    }
    Ok(report)
}

/// Run the Verify stage, falling back to the directory layout when forced.
fn verified_manifest(
    backup_dir: &Path,
    force: bool,
    warnings: &mut Vec<String>,
    ctx: &Context,
) -> Result<BackupManifest, RestoreError> {
    match verify::verify(backup_dir) {
        Ok(VerificationReport {
            manifest,
            issues,
            warnings: notes,
        }) => {
            for note in notes {
                ctx.log.warn(&note);
                warnings.push(note);
            }
            if !issues.is_empty() {
                for issue in &issues {
                    ctx.log.warn(&issue.to_string());
                }
                if !force {
                    return Err(RestoreError::VerificationFailed {
                        count: issues.len(),
                    });
                }
                warnings.extend(issues.iter().map(ToString::to_string));
            }
            Ok(manifest)
        }
        Err(e) if force => {
            let msg = format!("{e}; rebuilding component list from backup layout");
            ctx.log.warn(&msg);
            warnings.push(msg);
            Ok(BackupManifest::from_layout(backup_dir)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn record(ctx: &Context, component: &ComponentRestore) {
    let mut summary = format!(
        "{} restored, {} preserved",
        component.restored.len(),
        component.preserved.len()
    );
    if !component.replayed.is_empty() {
        summary.push_str(&format!(", {} replayed", component.replayed.len()));
    }
    summary.push_str(&format!(", {} failed", component.failures.len()));
    let done = component.restored.len() + component.replayed.len();
    let status = if ctx.dry_run {
        ComponentStatus::DryRun
    } else if !component.has_failures() {
        if done == 0 {
            ComponentStatus::Skipped
        } else {
            ComponentStatus::Ok
        }
    } else if done == 0 {
        ComponentStatus::Failed
    } else {
        ComponentStatus::Partial
    };
    ctx.log.record(&component.id, status, Some(&summary));
}

/// What a manifest path holds.
enum Item<'a> {
    File,
    Link(&'a str),
}

fn restore_component(
    entry: &ManifestEntry,
    backup_dir: &Path,
    target: &RestoreTarget,
    filter: &SensitiveFilter,
    stamp: &str,
    ctx: &Context,
) -> ComponentRestore {
    let mut out = ComponentRestore::new(&entry.id);
    let items = entry
        .paths
        .iter()
        .map(|p| (p.as_str(), Item::File))
        .chain(
            entry
                .symlinks
                .iter()
                .map(|(p, t)| (p.as_str(), Item::Link(t.as_str()))),
        );

    for (rel, item) in items {
        if ctx.is_cancelled() {
            ctx.log.warn(&format!("[{}] restore interrupted", entry.id));
            break;
        }
        let Some(live) = layout::live_path_for(rel, target) else {
            out.fail(
                RestoreStage::Verify,
                RestoreError::Copy {
                    path: PathBuf::from(rel),
                    reason: "path escapes the restore target".to_string(),
                },
            );
            continue;
        };
        if filter.is_sensitive(&live) {
            ctx.log
                .debug(&format!("[{}] withheld sensitive {}", entry.id, live.display()));
            out.skipped.push(live);
            continue;
        }
        let src = layout::backup_path(backup_dir, &entry.id, rel);

        if ctx.dry_run {
            let verb = if live.symlink_metadata().is_ok() {
                "preserve and replace"
            } else {
                "create"
            };
            ctx.log.dry_run(&format!("would {verb} {}", live.display()));
            out.restored.push(live);
            continue;
        }

        if let Err((stage, error)) = restore_path(&src, &live, &item, stamp, &mut out) {
            ctx.log.warn(&format!("[{}] {stage}: {error}", entry.id));
            out.fail(stage, error);
            continue;
        }
        out.restored.push(live);
    }
    out
}

/// PreserveExisting, Copy and RestorePermissions for one path.
fn restore_path(
    src: &Path,
    live: &Path,
    item: &Item<'_>,
    stamp: &str,
    out: &mut ComponentRestore,
) -> Result<(), (RestoreStage, RestoreError)> {
    let copy_err = |reason: String| {
        (
            RestoreStage::Copy,
            RestoreError::Copy {
                path: live.to_path_buf(),
                reason,
            },
        )
    };

    let src_meta = fs::symlink_metadata(src)
        .map_err(|e| copy_err(format!("backup copy {} unavailable: {e}", src.display())))?;

    if live.symlink_metadata().is_ok() {
        let saved_as = preserve(live, stamp).map_err(|e| {
            (
                RestoreStage::PreserveExisting,
                RestoreError::Preserve {
                    path: live.to_path_buf(),
                    reason: e.to_string(),
                },
            )
        })?;
        out.preserved.push(Preserved {
            original: live.to_path_buf(),
            saved_as,
        });
    }

    match item {
        Item::Link(target) => {
            copy::place_symlink(Path::new(target), live).map_err(|e| copy_err(e.to_string()))?;
        }
        Item::File => {
            copy::copy_file_atomic(src, live).map_err(|e| copy_err(e.to_string()))?;
            copy::apply_metadata(&src_meta, live).map_err(|e| {
                (
                    RestoreStage::RestorePermissions,
                    RestoreError::Copy {
                        path: live.to_path_buf(),
                        reason: e.to_string(),
                    },
                )
            })?;
        }
    }
    Ok(())
}

/// Move `live` to a free `<name>.bak.<stamp>[-N]` sibling.
fn preserve(live: &Path, stamp: &str) -> std::io::Result<PathBuf> {
    let is_dir = fs::symlink_metadata(live)?.is_dir();
    let candidate = claim_free_name(live, stamp, is_dir)?;
    if let Err(e) = fs::rename(live, &candidate) {
        release(&candidate, is_dir);
        return Err(e);
    }
    Ok(candidate)
}

/// Claim the first free `<name>.bak.<stamp>[-N]` sibling of `path` with an
/// empty placeholder.
///
/// The claim is an exclusive create, so a concurrent caller can never be
/// handed the same name and nothing already there is ever replaced. The
/// caller renames onto the placeholder.
fn claim_free_name(path: &Path, stamp: &str, is_dir: bool) -> std::io::Result<PathBuf> {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let base = format!("{name}.bak.{stamp}");
    let mut candidate = path.with_file_name(&base);
    let mut n = 1u32;
    loop {
        match claim(&candidate, is_dir) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                candidate = path.with_file_name(format!("{base}-{n}"));
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Create an empty placeholder at `path`, failing if anything is there.
fn claim(path: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        fs::create_dir(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path).map(drop)
    }
}

fn release(placeholder: &Path, is_dir: bool) {
    let _ = if is_dir {
        fs::remove_dir(placeholder)
    } else {
        fs::remove_file(placeholder)
    };
}

// ----------------------------------------------------------------------
// Replay of saved command output
// ----------------------------------------------------------------------

/// Directory that receives each tool's output before a replay changes it.
fn snapshot_dir(ctx: &Context, component: &str) -> PathBuf {
    ctx.env
        .xdg_dir("XDG_STATE_HOME", ".local/state")
        .join(APP_DIR)
        .join("replaced")
        .join(component)
}

/// `template` with every `{file}` replaced by `file`.
fn replay_args(template: &[String], file: &Path) -> Vec<String> {
    let file = file.to_string_lossy();
    template.iter().map(|a| a.replace("{file}", &file)).collect()
}

/// Replay stage for every replayable output of `entry`.
fn replay_outputs(
    entry: &ManifestEntry,
    backup_dir: &Path,
    stamp: &str,
    ctx: &Context,
    out: &mut ComponentRestore,
) {
    for saved in entry.captures.iter().filter(|c| c.is_replayable()) {
        if ctx.is_cancelled() {
            ctx.log.warn(&format!("[{}] replay interrupted", entry.id));
            break;
        }
        if !layout::is_plain_file_name(&saved.file) {
            out.fail(
                RestoreStage::Verify,
                RestoreError::Copy {
                    path: PathBuf::from(saved.rel_path()),
                    reason: "path escapes the backup".to_string(),
                },
            );
            continue;
        }
        if let Err((stage, error)) = replay_one(entry, saved, backup_dir, stamp, ctx, out) {
            ctx.log.warn(&format!("[{}] {stage}: {error}", entry.id));
            out.fail(stage, error);
        }
    }
}

/// Save the tool's current output, then run its replay command.
fn replay_one(
    entry: &ManifestEntry,
    saved: &CapturedOutput,
    backup_dir: &Path,
    stamp: &str,
    ctx: &Context,
    out: &mut ComponentRestore,
) -> Result<(), (RestoreStage, RestoreError)> {
    let file = layout::capture_path(backup_dir, &entry.id, &saved.file);
    let args = replay_args(&saved.replay, &file);
    let command = std::iter::once(saved.program.as_str())
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let replay_err = |stage, reason: String| {
        (
            stage,
            RestoreError::Replay {
                command: command.clone(),
                reason,
            },
        )
    };

    if ctx.dry_run {
        ctx.log.dry_run(&format!("would run `{command}`"));
        out.replayed.push(command);
        return Ok(());
    }
    if ctx.executor.which(&saved.program).is_none() {
        return Err(replay_err(
            RestoreStage::Replay,
            format!("{} is not installed", saved.program),
        ));
    }

    let timeout = ctx.config.settings.package_timeout();
    let current: Vec<&str> = saved.args.iter().map(String::as_str).collect();
    let snapshot = match ctx.executor.run(&saved.program, &current, timeout) {
        Ok(result) if result.success => result.stdout,
        Ok(result) => {
            return Err(replay_err(
                RestoreStage::PreserveExisting,
                format!("cannot save current state: {}", result.failure_reason()),
            ));
        }
        Err(e) => {
            return Err(replay_err(
                RestoreStage::PreserveExisting,
                format!("cannot save current state: {e}"),
            ));
        }
    };
    let saved_as = save_snapshot(&snapshot_dir(ctx, &entry.id), &saved.file, stamp, &snapshot)
        .map_err(|e| {
            replay_err(
                RestoreStage::PreserveExisting,
                format!("cannot save current state: {e}"),
            )
        })?;
    out.snapshots.push(saved_as);

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    match ctx.executor.run(&saved.program, &arg_refs, timeout) {
        Ok(result) if result.success => {
            ctx.log.debug(&format!("[{}] ran `{command}`", entry.id));
            out.replayed.push(command);
            Ok(())
        }
        Ok(result) => Err(replay_err(RestoreStage::Replay, result.failure_reason())),
        Err(e) => Err(replay_err(RestoreStage::Replay, e.to_string())),
    }
}

/// Write `content` to a fresh `<dir>/<file>.bak.<stamp>[-N]`.
fn save_snapshot(dir: &Path, file: &str, stamp: &str, content: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let dst = claim_free_name(&dir.join(file), stamp, false)?;
    if let Err(e) = copy::write_file_atomic(&dst, content.as_bytes()) {
        release(&dst, false);
        return Err(e);
    }
    Ok(dst)
}
