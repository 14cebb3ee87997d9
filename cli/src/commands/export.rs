//! Command: detect components and back up their configuration.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{CommandSetup, finish, scan};
use crate::backup;
use crate::cli::{ExportOpts, GlobalOpts};
use crate::detect;
use crate::logging::Logger;
use crate::manifest;

/// Run the export command.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the destination
/// cannot be created, the manifest cannot be written, or any component
/// failed outright.
pub fn run(
    global: &GlobalOpts,
    opts: &ExportOpts,
    log: &Arc<Logger>,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log, cancel)?;
    let ctx = &setup.ctx;

    log.stage("Detecting components");
    let report = detect::detect(ctx);
    scan::print_report(log.as_ref(), &report, true);

    if global.preview {
        log.stage("Preview");
        for (id, count) in backup::preview(&report.components) {
            if count > 0 {
                log.info(&format!("{id}: {count} path(s)"));
            }
        }
        return Ok(());
    }

    let destination = opts.outdir.clone().unwrap_or_else(|| {
        default_destination(
            &ctx.config.settings.backup_root,
            &manifest::host_id(),
            Utc::now(),
        )
    });
    let outcome = backup::backup(&report.components, &destination, ctx)?;

    let totals = outcome.manifest.totals;
    log.info(&format!(
        "{} file(s), {} bytes from {} component(s); {} sensitive path(s) excluded",
        totals.files, totals.bytes, totals.components, totals.excluded
    ));
    if outcome.has_failures() {
        log.warn(&format!("{} path(s) could not be copied:", outcome.failures.len()));
        for failure in &outcome.failures {
            log.warn(&format!("  {failure}"));
        }
    }
    if !outcome.dry_run {
        let written = dunce::canonicalize(&destination).unwrap_or(destination);
        log.info(&format!("backup written to {}", written.display()));
    }

    finish(log)
}

/// `<root>/<host>-<YYYYmmdd-HHMMSS>`.
#[must_use]
pub fn default_destination(root: &Path, host: &str, now: DateTime<Utc>) -> PathBuf {
    root.join(format!("{host}-{}", now.format("%Y%m%d-%H%M%S")))
}
