//! Per-invocation snapshot shared by detection, backup and restore.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::error::ConfigError;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;

/// Immutable view of the process environment: the home directory and the
/// variables available to path expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    home: PathBuf,
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if neither `HOME` nor `USERPROFILE`
    /// is set.
    pub fn from_process() -> Result<Self, ConfigError> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        let home = if cfg!(target_os = "windows") {
            vars.get("USERPROFILE").or_else(|| vars.get("HOME"))
        } else {
            vars.get("HOME")
        }
        .filter(|h| !h.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::NoHome("HOME environment variable is not set".to_string()))?;

        Ok(Self {
            home: PathBuf::from(home),
            vars,
        })
    }

    /// An environment with only a home directory.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            vars: BTreeMap::new(),
        }
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// The user's home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Value of `name`, treating an empty value as unset.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// An XDG base directory: the variable's value when set and absolute,
    /// otherwise `~/<fallback>`.
    #[must_use]
    pub fn xdg_dir(&self, var: &str, fallback: &str) -> PathBuf {
        self.var(var)
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .unwrap_or_else(|| self.home.join(fallback))
    }
}

/// Shared context for one engine run.
///
/// Cheap to clone; everything heavy is behind an `Arc`.
#[derive(Clone)]
pub struct Context {
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
    /// Immutable environment snapshot.
    pub env: Arc<Environment>,
    /// Detected platform.
    pub platform: Platform,
    /// Logger for output and component recording.
    pub log: Arc<dyn Log>,
    /// Command executor (real or canned).
    pub executor: Arc<dyn Executor>,
    /// Report actions without writing anything.
    pub dry_run: bool,
    /// Worker threads for per-component work.
    pub jobs: usize,
    /// Set by the Ctrl-C handler; workers stop picking new files.
    pub cancel: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("env", &self.env)
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("dry_run", &self.dry_run)
            .field("jobs", &self.jobs)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Context {
    /// Create a context. Worker count comes from the config's `jobs`
    /// setting; dry-run is off.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        env: Arc<Environment>,
        platform: Platform,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let jobs = config.settings.effective_jobs();
        Self {
            config,
            env,
            platform,
            log,
            executor,
            dry_run: false,
            jobs,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Override the worker count (minimum 1).
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Share an externally owned cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// The user's home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        self.env.home()
    }

    /// Whether a cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Map `work` over `items` on a bounded rayon pool of `jobs` threads,
    /// preserving input order in the result.
    ///
    /// With one job, or if the pool cannot be built, items run sequentially
    /// on the calling thread.
    pub fn run_parallel<T, R, F>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        use rayon::prelude::*;

        if self.jobs <= 1 || items.len() <= 1 {
            return items.into_iter().map(work).collect();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("myconfig-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| items.into_par_iter().map(&work).collect()),
            Err(e) => {
                self.log
                    .warn(&format!("cannot start worker pool, running sequentially: {e}"));
                items.into_iter().map(work).collect()
            }
        }
    }
}
