//! Command: check a backup against its manifest.
use anyhow::Result;

use crate::cli::VerifyOpts;
use crate::logging::Logger;
use crate::manifest::verify;

/// Verify the backup and report issues.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or any issue is found.
pub fn run(opts: &VerifyOpts, log: &Logger) -> Result<()> {
    log.stage(&format!("Verifying {}", opts.backup.display()));
    let report = verify::verify(&opts.backup)?;

    let manifest = &report.manifest;
    log.info(&format!(
        "manifest v{} from {} at {} (myconfig {})",
        manifest.format_version, manifest.host, manifest.created_at, manifest.tool_version
    ));
    for entry in &manifest.components {
        log.debug(&format!(
            "{}: {} file(s), {} bytes, {} excluded",
            entry.id, entry.file_count, entry.total_bytes, entry.excluded_count
        ));
    }
    for warning in &report.warnings {
        log.warn(warning);
    }

    if report.is_ok() {
        log.info(&format!(
            "backup OK: {} component(s), {} file(s)",
            manifest.totals.components, manifest.totals.files
        ));
        return Ok(());
    }
    for issue in &report.issues {
        log.error(&issue.to_string());
    }
    anyhow::bail!(
        "backup verification failed with {} issue(s)",
        report.issues.len()
    )
}
