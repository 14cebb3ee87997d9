//! Subcommand orchestration: each module builds a context, runs the engine
//! and reports the outcome.
pub mod export;
pub mod restore;
pub mod scan;
pub mod verify;
pub mod version;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::context::{Context, Environment};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::platform::Platform;

/// Shared state produced by the common command setup sequence.
///
/// Loads the environment and configuration, prints validation warnings and
/// builds the [`Context`] every command runs against.
#[derive(Debug)]
pub struct CommandSetup {
    /// Context the command runs against.
    pub ctx: Context,
}

impl CommandSetup {
    /// Capture the environment, load configuration and build the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// configuration file fails to parse.
    pub fn init(global: &GlobalOpts, log: &Arc<Logger>, cancel: Arc<AtomicBool>) -> Result<Self> {
        let env = Environment::from_process()?;
        Self::with_parts(global, log, cancel, env, Arc::new(SystemExecutor))
    }

    /// [`init`](Self::init) with an explicit environment and executor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file fails to parse.
    pub fn with_parts(
        global: &GlobalOpts,
        log: &Arc<Logger>,
        cancel: Arc<AtomicBool>,
        env: Environment,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let platform = Platform::detect();

        log.stage("Loading configuration");
        let path = global
            .config
            .clone()
            .unwrap_or_else(|| Config::default_path(&env));
        let config = Config::load(&path)?;
        log.debug(&format!("config: {}", path.display()));
        log.debug(&format!("{} components in catalog", config.catalog.len()));
        log.debug(&format!("{} sensitivity rules", config.rules.len()));
        log.debug(&format!(
            "{} package managers",
            config.package_managers.len()
        ));
        log.info(&format!(
            "platform {}, {} components",
            platform.os,
            config.catalog.len()
        ));

        // Validate configuration and display warnings
        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        let mut ctx = Context::new(
            Arc::new(config),
            Arc::new(env),
            platform,
            Arc::clone(log) as Arc<dyn Log>,
            executor,
        )
        .with_dry_run(global.dry_run)
        .with_cancel(cancel);
        if let Some(jobs) = global.jobs {
            ctx = ctx.with_jobs(jobs);
        }
        if !global.parallel {
            ctx = ctx.with_jobs(1);
        }
        log.debug(&format!("{} worker thread(s)", ctx.jobs));

        Ok(Self { ctx })
    }
}

/// Print the summary and bail if any component recorded a failure.
///
/// # Errors
///
/// Returns an error if one or more components failed.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} component(s) failed");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::test_helpers::write_temp_toml;
    use crate::exec::test_helpers::MockExecutor;
    use clap::Parser;

    fn setup(args: &[&str], toml: &str) -> Context {
        let (_dir, path) = write_temp_toml(toml);
        let mut argv = vec!["myconfig", "--config", path.to_str().unwrap()];
        argv.extend_from_slice(args);
        argv.push("scan");
        let cli = Cli::parse_from(argv);
        let log = Arc::new(Logger::new("test"));
        CommandSetup::with_parts(
            &cli.global,
            &log,
            Arc::new(AtomicBool::new(false)),
            Environment::new("/home/u"),
            Arc::new(MockExecutor::new()),
        )
        .unwrap()
        .ctx
    }

    #[test]
    fn jobs_flag_overrides_config() {
        let ctx = setup(&["--jobs", "3"], "[settings]\njobs = 7\n");
        assert_eq!(ctx.jobs, 3);
    }

    #[test]
    fn config_jobs_used_by_default() {
        let ctx = setup(&[], "[settings]\njobs = 7\n");
        assert_eq!(ctx.jobs, 7);
    }

    #[test]
    fn no_parallel_forces_single_job() {
        let ctx = setup(&["--no-parallel", "--jobs", "4"], "");
        assert_eq!(ctx.jobs, 1);
    }

    #[test]
    fn dry_run_flag_reaches_context() {
        let ctx = setup(&["-d"], "");
        assert!(ctx.dry_run);
    }

    #[test]
    fn invalid_config_is_error() {
        let (_dir, path) = write_temp_toml("[settings\n");
        let cli = Cli::parse_from(["myconfig", "--config", path.to_str().unwrap(), "scan"]);
        let log = Arc::new(Logger::new("test"));
        let result = CommandSetup::with_parts(
            &cli.global,
            &log,
            Arc::new(AtomicBool::new(false)),
            Environment::new("/home/u"),
            Arc::new(MockExecutor::new()),
        );
        assert!(result.is_err());
    }
}
