//! Command: detect components and report what was found.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::detect::{self, DetectionReport};
use crate::logging::{Log, Logger};

/// Run detection and print one line per detected component.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>, cancel: Arc<AtomicBool>) -> Result<()> {
    let setup = CommandSetup::init(global, log, cancel)?;

    log.stage("Detecting components");
    let report = detect::detect(&setup.ctx);
    print_report(log.as_ref(), &report, global.preview);
    Ok(())
}

/// Log the detection result: components with artifacts, components that
/// are installed without any, and the warning count.
pub fn print_report(log: &dyn Log, report: &DetectionReport, counts_only: bool) {
    if report.from_cache {
        log.debug("using cached detection result");
    }
    for component in report.with_artifacts() {
        let methods = component
            .methods
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        log.info(&format!(
            "{} ({}): {} path(s) via {methods}",
            component.id,
            component.name,
            component.resolved_paths.len()
        ));
        if !counts_only {
            for path in &component.resolved_paths {
                log.debug(&format!("  {}", path.display()));
            }
        }
    }

    let empty: Vec<&str> = report.present_but_empty().map(|c| c.id.as_str()).collect();
    if !empty.is_empty() {
        log.info(&format!(
            "installed without configuration: {}",
            empty.join(", ")
        ));
    }
    log.info(&format!(
        "{} component(s) detected, {} with artifacts",
        report.components.len(),
        report.with_artifacts().count()
    ));
    if !report.warnings.is_empty() {
        log.warn(&format!(
            "{} detection signal(s) were inconclusive",
            report.warnings.len()
        ));
    }
}
