//! Backup orchestration: copies detected artifacts into a backup directory
//! and writes its manifest.
//!
//! Layout: `<destination>/<component id>/<relative path>`, saved command
//! output under `<destination>/<component id>/@capture/`, and
//! `<destination>/manifest.json`. Components are processed on the worker
//! pool; each writes a disjoint subtree. The manifest is written once, by
//! the calling thread, after all component work.
pub mod copy;
pub mod layout;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use walkdir::WalkDir;

use crate::config::catalog::CaptureSpec;
use crate::context::Context;
use crate::detect::DetectedComponent;
use crate::detect::expand::normalize;
use crate::error::BackupError;
use crate::filter::SensitiveFilter;
use crate::logging::ComponentStatus;
use crate::manifest::{self, BackupManifest, CapturedOutput, ManifestEntry};

/// Result of a backup run.
#[derive(Debug)]
pub struct BackupOutcome {
    /// The manifest describing what was captured (or would be, in dry-run).
    pub manifest: BackupManifest,
    /// Per-file failures; none of them aborted the run.
    pub failures: Vec<BackupError>,
    /// The run was interrupted; the manifest covers completed files only.
    pub cancelled: bool,
    /// Nothing was written.
    pub dry_run: bool,
}

impl BackupOutcome {
    /// Whether any file failed to copy.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Captured output of one component.
struct ComponentCapture {
    entry: ManifestEntry,
    failures: Vec<BackupError>,
    cancelled: bool,
}

/// Back up every detected component that has artifacts into `destination`.
///
/// # Errors
///
/// Returns [`BackupError::DestinationCreate`] before any component work if
/// the destination cannot be created, and [`BackupError::Manifest`] if the
/// manifest cannot be written afterwards. Per-file failures are collected in
/// [`BackupOutcome::failures`].
pub fn backup(
    detected: &[DetectedComponent],
    destination: &Path,
    ctx: &Context,
) -> Result<BackupOutcome, BackupError> {
    if !ctx.dry_run {
        fs::create_dir_all(destination).map_err(|source| BackupError::DestinationCreate {
            path: destination.to_path_buf(),
            source,
        })?;
    }

    let filter = SensitiveFilter::new(&ctx.config.rules);
    for broken in filter.broken_rules() {
        ctx.log
            .warn(&format!("{broken}; matching paths will be excluded"));
    }

    let roots: Vec<(String, PathBuf)> = detected
        .iter()
        .flat_map(|c| c.resolved_paths.iter().map(|p| (c.id.clone(), p.clone())))
        .collect();

    let queued: Vec<&DetectedComponent> = detected.iter().filter(|c| c.has_artifacts()).collect();
    ctx.log.stage(&format!(
        "Backing up {} component(s) to {}",
        queued.len(),
        destination.display()
    ));

    let captures = ctx.run_parallel(queued, |component| {
        capture_component(component, destination, &filter, &roots, ctx)
    });

    let mut entries = Vec::with_capacity(captures.len());
    let mut failures = Vec::new();
    let mut cancelled = false;
    for capture in captures {
        record(ctx, &capture);
        cancelled |= capture.cancelled;
        entries.push(capture.entry);
        failures.extend(capture.failures);
    }

    let manifest = BackupManifest::build(entries, &manifest::host_id(), Utc::now());
    if ctx.dry_run {
        ctx.log.dry_run(&format!(
            "would write manifest for {} file(s) to {}",
            manifest.totals.files,
            destination.join(manifest::MANIFEST_FILE).display()
        ));
    } else {
        let path = manifest.write(destination)?;
        ctx.log.debug(&format!("manifest written to {}", path.display()));
    }
    if cancelled {
        ctx.log
            .warn("backup interrupted; manifest describes completed files only");
    }

    Ok(BackupOutcome {
        manifest,
        failures,
        cancelled,
        dry_run: ctx.dry_run,
    })
}

fn record(ctx: &Context, capture: &ComponentCapture) {
    let entry = &capture.entry;
    let mut summary = format!("{} file(s)", entry.file_count);
    if !entry.captures.is_empty() {
        summary.push_str(&format!(", {} command output(s)", entry.captures.len()));
    }
    summary.push_str(&format!(", {} excluded", entry.excluded_count));
    let status = if ctx.dry_run {
        ComponentStatus::DryRun
    } else if capture.failures.is_empty() && !capture.cancelled {
        ComponentStatus::Ok
    } else if entry.file_count > 0 || !entry.captures.is_empty() {
        ComponentStatus::Partial
    } else if capture.failures.is_empty() {
        ComponentStatus::Skipped
    } else {
        ComponentStatus::Failed
    };
    ctx.log.record(&entry.id, status, Some(&summary));
}

fn capture_component(
    component: &DetectedComponent,
    destination: &Path,
    filter: &SensitiveFilter,
    roots: &[(String, PathBuf)],
    ctx: &Context,
) -> ComponentCapture {
    let mut capture = ComponentCapture {
        entry: ManifestEntry::new(&component.id),
        failures: Vec::new(),
        cancelled: false,
    };
    let home = ctx.home();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut dirs: Vec<(PathBuf, PathBuf)> = Vec::new();
    let copy_failure = |path: &Path, reason: String| BackupError::Copy {
        component: component.id.clone(),
        path: path.to_path_buf(),
        reason,
    };

    for root in &component.resolved_paths {
        let mut excluded = 0usize;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let verdict = filter.classify(e.path());
                if verdict.is_sensitive() {
                    ctx.log.debug(&format!(
                        "[{}] excluded {} ({verdict:?})",
                        component.id,
                        e.path().display()
                    ));
                    excluded += 1;
                    return false;
                }
                true
            });

        for item in walker {
            if ctx.is_cancelled() {
                capture.cancelled = true;
                break;
            }
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    capture.failures.push(copy_failure(&path, e.to_string()));
                    continue;
                }
            };
            let src = item.path();
            let rel = layout::relative_for(src, home);
            if !seen.insert(rel.clone()) {
                continue;
            }
            let dst = layout::backup_path(destination, &component.id, &rel);
            let file_type = item.file_type();

            if file_type.is_symlink() {
                match fs::read_link(src) {
                    Ok(target) => {
                        note_foreign_link(ctx, component, src, &target, roots);
                        if ctx.dry_run {
                            ctx.log.dry_run(&format!("would link {rel} -> {}", target.display()));
                        } else if let Err(e) = copy::place_symlink(&target, &dst) {
                            capture.failures.push(copy_failure(src, e.to_string()));
                            continue;
                        }
                        capture
                            .entry
                            .symlinks
                            .insert(rel, target.to_string_lossy().into_owned());
                    }
                    Err(e) => capture.failures.push(copy_failure(src, e.to_string())),
                }
            } else if file_type.is_dir() {
                if !ctx.dry_run {
                    if let Err(e) = fs::create_dir_all(&dst) {
                        capture.failures.push(copy_failure(src, e.to_string()));
                        continue;
                    }
                    dirs.push((src.to_path_buf(), dst));
                }
            } else if file_type.is_file() {
                let size = item.metadata().map_or(0, |m| m.len());
                if ctx.dry_run {
                    ctx.log.dry_run(&format!("would copy {rel} ({size} bytes)"));
                    capture.entry.add_file(rel, size);
                    continue;
                }
                match copy_one(src, &dst) {
                    Ok(bytes) => capture.entry.add_file(rel, bytes),
                    Err(e) => capture.failures.push(copy_failure(src, e.to_string())),
                }
            } else {
                ctx.log
                    .debug(&format!("[{}] skipping special file {}", component.id, src.display()));
            }
        }
        capture.entry.excluded_count += excluded;
        if capture.cancelled {
            break;
        }
    }

    for spec in &component.captures {
        if ctx.is_cancelled() {
            capture.cancelled = true;
            break;
        }
        save_output(component, spec, destination, filter, ctx, &mut capture);
    }

    // Directory modes last so a read-only directory does not block its
    // own content.
    for (src, dst) in dirs.iter().rev() {
        if let Ok(meta) = fs::metadata(src)
            && let Err(e) = copy::apply_permissions(&meta, dst)
        {
            ctx.log
                .debug(&format!("[{}] cannot set mode on {}: {e}", component.id, dst.display()));
        }
    }

    for failure in &capture.failures {
        ctx.log.warn(&failure.to_string());
    }
    capture
}

/// Run one capture command and save its standard output.
///
/// Skipped quietly when the program is not installed; a failing command is
/// a soft failure like a file that cannot be copied.
fn save_output(
    component: &DetectedComponent,
    spec: &CaptureSpec,
    destination: &Path,
    filter: &SensitiveFilter,
    ctx: &Context,
    capture: &mut ComponentCapture,
) {
    let command = spec.command_line();
    let fail = |reason: String| BackupError::Capture {
        component: component.id.clone(),
        command: command.clone(),
        reason,
    };

    if !layout::is_plain_file_name(&spec.file) {
        capture
            .failures
            .push(fail(format!("'{}' is not a plain file name", spec.file)));
        return;
    }
    if filter.is_sensitive(Path::new(&spec.file)) {
        ctx.log
            .debug(&format!("[{}] excluded output of `{command}`", component.id));
        capture.entry.excluded_count += 1;
        return;
    }
    if ctx.executor.which(&spec.program).is_none() {
        ctx.log.debug(&format!(
            "[{}] {} not installed; skipping `{command}`",
            component.id, spec.program
        ));
        return;
    }

    let mut saved = CapturedOutput {
        file: spec.file.clone(),
        bytes: 0,
        program: spec.program.clone(),
        args: spec.args.clone(),
        replay: spec.replay.clone(),
    };
    if ctx.dry_run {
        ctx.log.dry_run(&format!(
            "would save output of `{command}` as {}",
            saved.rel_path()
        ));
        capture.entry.add_capture(saved);
        return;
    }

    let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
    let output = match ctx
        .executor
        .run(&spec.program, &args, ctx.config.settings.package_timeout())
    {
        Ok(result) if result.success => result.stdout,
        Ok(result) => {
            capture.failures.push(fail(result.failure_reason()));
            return;
        }
        Err(e) => {
            capture.failures.push(fail(e.to_string()));
            return;
        }
    };
    let dst = layout::capture_path(destination, &component.id, &spec.file);
    match copy::write_file_atomic(&dst, output.as_bytes()) {
        Ok(bytes) => {
            saved.bytes = bytes;
            capture.entry.add_capture(saved);
        }
        Err(e) => capture.failures.push(fail(e.to_string())),
    }
}

fn copy_one(src: &Path, dst: &Path) -> std::io::Result<u64> {
    let meta = fs::metadata(src)?;
    let bytes = copy::copy_file_atomic(src, dst)?;
    copy::apply_metadata(&meta, dst)?;
    Ok(bytes)
}

/// Debug-log links whose target falls inside another component's tree.
fn note_foreign_link(
    ctx: &Context,
    component: &DetectedComponent,
    link: &Path,
    target: &Path,
    roots: &[(String, PathBuf)],
) {
    let absolute = match link.parent() {
        Some(parent) if target.is_relative() => normalize(&parent.join(target)),
        _ => normalize(target),
    };
    if let Some((owner, _)) = roots
        .iter()
        .find(|(id, root)| *id != component.id && absolute.starts_with(root))
    {
        ctx.log.debug(&format!(
            "[{}] {} links into {owner}'s tree; kept as a link",
            component.id,
            link.display()
        ));
    }
}

/// Per-component counts of paths and command outputs for `--preview`.
#[must_use]
pub fn preview(detected: &[DetectedComponent]) -> BTreeMap<String, usize> {
    detected
        .iter()
        .map(|c| (c.id.clone(), c.resolved_paths.len() + c.captures.len()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::Environment;
    use crate::context::test_helpers::{default_context, make_context};
    use crate::detect::{DetectionMethod, Presence};
    use crate::exec::ExecResult;
    use crate::exec::test_helpers::{Canned, MockExecutor};
    use crate::logging::Log;
    use crate::platform::{Os, Platform};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn detected(id: &str, paths: &[PathBuf]) -> DetectedComponent {
        DetectedComponent {
            id: id.to_string(),
            name: id.to_string(),
            resolved_paths: paths.iter().cloned().collect(),
            methods: vec![DetectionMethod::ConfigPath],
            presence: Presence::WithArtifacts,
            captures: Vec::new(),
        }
    }

    fn brewfile() -> CaptureSpec {
        CaptureSpec::new("brew", ["bundle", "dump", "--file=-"], "Brewfile")
            .with_replay(["bundle", "install", "--file={file}"])
    }

    fn homebrew(home: &Path) -> DetectedComponent {
        let mut c = detected("homebrew", &[home.join(".Brewfile")]);
        c.captures = vec![brewfile()];
        c
    }

    #[test]
    fn copies_file_into_component_subtree() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".gitconfig"), "X").unwrap();
        let (ctx, log) = default_context(home.path());

        let outcome = backup(
            &[detected("git", &[home.path().join(".gitconfig")])],
            out.path(),
            &ctx,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(out.path().join("git/.gitconfig")).unwrap(), "X");
        let git = outcome.manifest.entry("git").unwrap();
        assert_eq!(git.file_count, 1);
        assert_eq!(git.paths, vec![".gitconfig"]);
        assert!(out.path().join(manifest::MANIFEST_FILE).exists());
        assert_eq!(log.entries()[0].status, ComponentStatus::Ok);
    }

    #[test]
    fn directories_are_walked_recursively() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let nvim = home.path().join(".config/nvim");
        fs::create_dir_all(nvim.join("lua/plugins")).unwrap();
        fs::write(nvim.join("init.lua"), "a").unwrap();
        fs::write(nvim.join("lua/plugins/x.lua"), "bb").unwrap();
        let (ctx, _log) = default_context(home.path());

        let outcome = backup(&[detected("neovim", &[nvim])], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("neovim").unwrap();
        assert_eq!(
            entry.paths,
            vec![".config/nvim/init.lua", ".config/nvim/lua/plugins/x.lua"]
        );
        assert_eq!(entry.total_bytes, 3);
    }

    #[test]
    fn deeply_nested_files_are_not_dropped() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let nvim = home.path().join(".config/nvim");
        let deep = nvim.join("a/b/c/d/e/f/g/h");
        fs::create_dir_all(&deep).unwrap();
        fs::write(nvim.join("init.lua"), "a").unwrap();
        fs::write(deep.join("deep.lua"), "bb").unwrap();
        let cfg = Config::from_toml_str("[settings]\nmax_depth = 2\n").unwrap();
        let (ctx, _log) = make_context(home.path(), cfg, Arc::new(MockExecutor::new()));

        let outcome = backup(&[detected("neovim", &[nvim])], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("neovim").unwrap();
        assert_eq!(
            entry.paths,
            vec![
                ".config/nvim/a/b/c/d/e/f/g/h/deep.lua",
                ".config/nvim/init.lua"
            ]
        );
        assert_eq!(
            fs::read_to_string(out.path().join("neovim/.config/nvim/a/b/c/d/e/f/g/h/deep.lua"))
                .unwrap(),
            "bb"
        );
    }

    #[test]
    fn sensitive_files_are_excluded_and_counted() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        fs::create_dir_all(&ssh).unwrap();
        fs::write(ssh.join("config"), "Host *").unwrap();
        fs::write(ssh.join("id_ed25519"), "PRIVATE").unwrap();
        let (ctx, _log) = default_context(home.path());

        let outcome = backup(&[detected("ssh", &[ssh])], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("ssh").unwrap();
        assert_eq!(entry.paths, vec![".ssh/config"]);
        assert_eq!(entry.excluded_count, 1);
        assert!(!out.path().join("ssh/.ssh/id_ed25519").exists());
    }

    #[test]
    fn user_password_rule_excludes_file() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let custom = home.path().join(".custom");
        fs::create_dir_all(&custom).unwrap();
        fs::write(custom.join("password.txt"), "hunter2").unwrap();
        fs::write(custom.join("settings"), "ok").unwrap();
        let cfg = Config::from_toml_str(
            "[[filter.rules]]\npattern = \"*password*\"\nkind = \"glob\"\nscope = \"filename\"\n",
        )
        .unwrap();
        let (ctx, _log) = make_context(home.path(), cfg, Arc::new(MockExecutor::new()));

        let outcome = backup(&[detected("custom", &[custom])], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("custom").unwrap();
        assert_eq!(entry.excluded_count, 1);
        assert!(entry.paths.iter().all(|p| !p.contains("password")));
        assert!(!out.path().join("custom/.custom/password.txt").exists());
    }

    #[test]
    fn destination_failure_is_fatal() {
        let home = tempfile::tempdir().unwrap();
        let blocker = home.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let (ctx, _log) = default_context(home.path());

        let err = backup(&[], &blocker.join("sub"), &ctx).unwrap_err();
        assert!(matches!(err, BackupError::DestinationCreate { .. }));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".zshrc"), "abc").unwrap();
        let (ctx, log) = default_context(home.path());
        let ctx = ctx.with_dry_run(true);
        let dest = out.path().join("b");

        let outcome = backup(&[detected("zsh", &[home.path().join(".zshrc")])], &dest, &ctx).unwrap();
        assert!(outcome.dry_run);
        assert_eq!(outcome.manifest.totals.files, 1);
        assert!(!dest.exists());
        assert_eq!(log.entries()[0].status, ComponentStatus::DryRun);
    }

    #[test]
    fn cancelled_run_still_writes_manifest() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".zshrc"), "abc").unwrap();
        let (ctx, _log) = default_context(home.path());
        ctx.cancel.store(true, Ordering::Relaxed);

        let outcome = backup(&[detected("zsh", &[home.path().join(".zshrc")])], out.path(), &ctx).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.manifest.totals.files, 0);
        assert!(out.path().join(manifest::MANIFEST_FILE).exists());
    }

    /// Discards output and raises the cancel flag on the first exclusion.
    struct CancelOnExclusion(Arc<AtomicBool>);

    impl Log for CancelOnExclusion {
        fn stage(&self, _msg: &str) {}
        fn info(&self, _msg: &str) {}
        fn debug(&self, msg: &str) {
            if msg.contains("excluded") {
                self.0.store(true, Ordering::Relaxed);
            }
        }
        fn warn(&self, _msg: &str) {}
        fn error(&self, _msg: &str) {}
        fn dry_run(&self, _msg: &str) {}
        fn record(&self, _name: &str, _status: ComponentStatus, _message: Option<&str>) {}
    }

    #[test]
    fn exclusions_before_cancel_are_counted() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let custom = home.path().join(".custom");
        fs::create_dir_all(&custom).unwrap();
        fs::write(custom.join("password.txt"), "hunter2").unwrap();
        fs::write(custom.join("settings"), "ok").unwrap();
        let cfg = Config::from_toml_str(
            "[[filter.rules]]\npattern = \"*password*\"\nkind = \"glob\"\nscope = \"filename\"\n",
        )
        .unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let ctx = Context::new(
            Arc::new(cfg),
            Arc::new(Environment::new(home.path())),
            Platform::new(Os::Linux),
            Arc::new(CancelOnExclusion(Arc::clone(&cancel))),
            Arc::new(MockExecutor::new()),
        )
        .with_cancel(cancel);

        let outcome = backup(&[detected("custom", &[custom])], out.path(), &ctx).unwrap();
        assert!(outcome.cancelled);
        let entry = outcome.manifest.entry("custom").unwrap();
        assert_eq!(entry.excluded_count, 1);
        assert!(entry.paths.is_empty());
        assert_eq!(outcome.manifest.totals.excluded, 1);
    }

    #[test]
    fn present_but_empty_components_are_not_copied() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let (ctx, _log) = default_context(home.path());
        let mut tmux = detected("tmux", &[]);
        tmux.presence = Presence::PresentButEmpty;

        let outcome = backup(&[tmux], out.path(), &ctx).unwrap();
        assert!(outcome.manifest.components.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recorded_not_followed() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let cfg = home.path().join(".config/kitty");
        fs::create_dir_all(&cfg).unwrap();
        fs::write(cfg.join("kitty.conf"), "x").unwrap();
        std::os::unix::fs::symlink("kitty.conf", cfg.join("current.conf")).unwrap();
        let (ctx, _log) = default_context(home.path());

        let outcome = backup(&[detected("kitty", &[cfg])], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("kitty").unwrap();
        assert_eq!(entry.file_count, 1);
        assert_eq!(
            entry.symlinks.get(".config/kitty/current.conf").map(String::as_str),
            Some("kitty.conf")
        );
        let copied = out.path().join("kitty/.config/kitty/current.conf");
        assert!(copied.symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[test]
    fn overlapping_paths_are_copied_once() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let git = home.path().join(".config/git");
        fs::create_dir_all(&git).unwrap();
        fs::write(git.join("config"), "x").unwrap();
        let (ctx, _log) = default_context(home.path());

        let outcome = backup(
            &[detected("git", &[git.clone(), git.join("config")])],
            out.path(),
            &ctx,
        )
        .unwrap();
        assert_eq!(outcome.manifest.entry("git").unwrap().file_count, 1);
    }

    #[test]
    fn unchanged_tree_gives_identical_manifest() {
        let home = tempfile::tempdir().unwrap();
        let out1 = tempfile::tempdir().unwrap();
        let out2 = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".vimrc"), "set nu").unwrap();
        let (ctx, _log) = default_context(home.path());
        let comps = [detected("vim", &[home.path().join(".vimrc")])];

        let mut a = backup(&comps, out1.path(), &ctx).unwrap().manifest;
        let mut b = backup(&comps, out2.path(), &ctx).unwrap().manifest;
        a.created_at.clear();
        b.created_at.clear();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn command_output_is_saved_and_recorded() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".Brewfile"), "tap").unwrap();
        let exec = Arc::new(MockExecutor::new().with_output("brew", "brew \"git\"\n"));
        let (ctx, log) = make_context(home.path(), Config::builtin(), exec.clone());

        let outcome = backup(&[homebrew(home.path())], out.path(), &ctx).unwrap();
        assert!(!outcome.has_failures());
        assert_eq!(
            fs::read_to_string(out.path().join("homebrew/@capture/Brewfile")).unwrap(),
            "brew \"git\"\n"
        );
        let entry = outcome.manifest.entry("homebrew").unwrap();
        assert_eq!(entry.paths, vec![".Brewfile"]);
        assert_eq!(entry.captures.len(), 1);
        assert_eq!(entry.captures[0].bytes, 11);
        assert_eq!(entry.captures[0].program, "brew");
        assert_eq!(entry.captures[0].replay, vec!["bundle", "install", "--file={file}"]);
        assert_eq!(exec.calls(), vec!["brew bundle dump --file=-"]);
        assert_eq!(log.entries()[0].status, ComponentStatus::Ok);
    }

    #[test]
    fn capture_only_component_is_backed_up() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new().with_output("mas", "497799835 Xcode (15.0)\n"));
        let (ctx, _log) = make_context(home.path(), Config::builtin(), exec);
        let mut mas = detected("mas", &[]);
        mas.captures = vec![CaptureSpec::new("mas", ["list"], "mas.list")];

        let outcome = backup(&[mas], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("mas").unwrap();
        assert_eq!(entry.file_count, 0);
        assert_eq!(entry.captures[0].file, "mas.list");
        assert_eq!(outcome.manifest.totals.captures, 1);
        assert!(out.path().join("mas/@capture/mas.list").is_file());
    }

    #[test]
    fn failing_command_is_a_soft_failure() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".Brewfile"), "tap").unwrap();
        let exec = MockExecutor::new().with_response(
            "brew",
            Canned::Output(ExecResult::failed(1, "Error: No such command\n")),
        );
        let (ctx, log) = make_context(home.path(), Config::builtin(), Arc::new(exec));

        let outcome = backup(&[homebrew(home.path())], out.path(), &ctx).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            &outcome.failures[0],
            BackupError::Capture { reason, .. } if reason == "exit status 1: Error: No such command"
        ));
        let entry = outcome.manifest.entry("homebrew").unwrap();
        assert_eq!(entry.file_count, 1);
        assert!(entry.captures.is_empty());
        assert!(!out.path().join("homebrew/@capture/Brewfile").exists());
        assert_eq!(log.entries()[0].status, ComponentStatus::Partial);
    }

    #[test]
    fn timed_out_command_is_a_soft_failure() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let exec = MockExecutor::new().with_response("mas", Canned::Timeout);
        let (ctx, log) = make_context(home.path(), Config::builtin(), Arc::new(exec));
        let mut mas = detected("mas", &[]);
        mas.captures = vec![CaptureSpec::new("mas", ["list"], "mas.list")];

        let outcome = backup(&[mas], out.path(), &ctx).unwrap();
        assert!(matches!(&outcome.failures[0], BackupError::Capture { .. }));
        assert_eq!(log.entries()[0].status, ComponentStatus::Failed);
    }

    #[test]
    fn missing_program_is_skipped_without_failure() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".Brewfile"), "tap").unwrap();
        let exec = Arc::new(MockExecutor::new());
        let (ctx, _log) = make_context(home.path(), Config::builtin(), exec.clone());

        let outcome = backup(&[homebrew(home.path())], out.path(), &ctx).unwrap();
        assert!(!outcome.has_failures());
        assert!(outcome.manifest.entry("homebrew").unwrap().captures.is_empty());
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn sensitive_capture_name_is_withheld() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new().with_output("gh", "ghp_x"));
        let (ctx, _log) = make_context(home.path(), Config::builtin(), exec.clone());
        let mut gh = detected("github-cli", &[]);
        gh.captures = vec![
            CaptureSpec::new("gh", ["auth", "token"], "token.txt"),
            CaptureSpec::new("gh", ["extension", "list"], "../escape.txt"),
        ];

        let outcome = backup(&[gh], out.path(), &ctx).unwrap();
        let entry = outcome.manifest.entry("github-cli").unwrap();
        assert_eq!(entry.excluded_count, 1);
        assert!(entry.captures.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn dry_run_lists_command_output_without_running() {
        let home = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".Brewfile"), "tap").unwrap();
        let exec = Arc::new(MockExecutor::new().with_output("brew", "x"));
        let (ctx, _log) = make_context(home.path(), Config::builtin(), exec.clone());
        let ctx = ctx.with_dry_run(true);

        let outcome = backup(&[homebrew(home.path())], &out.path().join("b"), &ctx).unwrap();
        assert_eq!(outcome.manifest.totals.captures, 1);
        assert_eq!(exec.call_count(), 0);
        assert!(!out.path().join("b").exists());
    }

    #[test]
    fn preview_counts_paths_and_outputs() {
        let home = tempfile::tempdir().unwrap();
        let counts = preview(&[homebrew(home.path())]);
        assert_eq!(counts.get("homebrew"), Some(&2));
    }
}
