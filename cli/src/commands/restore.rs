//! Command: restore a backup with preserve-before-overwrite.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use super::{CommandSetup, finish};
use crate::backup::layout::RestoreTarget;
use crate::cli::{GlobalOpts, RestoreOpts};
use crate::logging::Logger;
use crate::manifest::BackupManifest;
use crate::restore::{self, RestoreOptions};

/// Run the restore command.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the backup is
/// missing or fails verification without `--force`, or any component
/// failed to restore.
pub fn run(
    global: &GlobalOpts,
    opts: &RestoreOpts,
    log: &Arc<Logger>,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    if global.preview {
        return preview(opts, log);
    }

    let setup = CommandSetup::init(global, log, cancel)?;
    let ctx = &setup.ctx;
    let options = RestoreOptions {
        force: global.force,
        only: opts.only.clone(),
        replay: opts.replay,
    };

    let report = restore::restore(&opts.backup, &RestoreTarget::system(ctx.home()), &options, ctx)?;

    for component in &report.components {
        for saved in &component.preserved {
            log.info(&format!(
                "preserved {} as {}",
                saved.original.display(),
                saved.saved_as.display()
            ));
        }
        for path in &component.snapshots {
            log.info(&format!("[{}] kept current output as {}", component.id, path.display()));
        }
        for command in &component.replayed {
            log.debug(&format!("[{}] replayed `{command}`", component.id));
        }
        for path in &component.skipped {
            log.warn(&format!("[{}] withheld sensitive {}", component.id, path.display()));
        }
    }

    finish(log)?;
    if report.has_failures() {
        let failed = report
            .components
            .iter()
            .filter(|c| c.has_failures())
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>();
        anyhow::bail!("restore failed for: {}", failed.join(", "));
    }
    Ok(())
}

/// List per-component counts from the manifest.
fn preview(opts: &RestoreOpts, log: &Logger) -> Result<()> {
    let manifest = BackupManifest::read(&opts.backup)?;
    log.stage("Preview");
    for entry in &manifest.components {
        if opts.only.is_empty() || opts.only.contains(&entry.id) {
            let mut line = format!(
                "{}: {} file(s), {} bytes",
                entry.id, entry.file_count, entry.total_bytes
            );
            if !entry.captures.is_empty() {
                let replayable = entry.captures.iter().filter(|c| c.is_replayable()).count();
                line.push_str(&format!(
                    ", {} command output(s) ({replayable} replayable)",
                    entry.captures.len()
                ));
            }
            log.info(&line);
        }
    }
    Ok(())
}
