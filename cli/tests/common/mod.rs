// Shared helpers for integration tests.
//
// Provides a temporary home directory, a canned command executor and a
// context builder so each integration test can run the engine against an
// isolated machine without touching the real one.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use myconfig_cli::config::Config;
use myconfig_cli::context::{Context, Environment};
use myconfig_cli::error::ExecError;
use myconfig_cli::exec::{ExecResult, Executor};
use myconfig_cli::logging::{ComponentEntry, ComponentStatus, Log};
use myconfig_cli::platform::{Os, Platform};

/// Canned reply for one program.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit 0 with this standard output.
    Stdout(String),
    /// Time out.
    Timeout,
}

/// Executor with a fixed search path and canned replies.
#[derive(Debug, Default)]
pub struct StubExecutor {
    on_path: BTreeSet<String>,
    replies: BTreeMap<String, Reply>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `program` on the search path.
    pub fn on_path(mut self, program: &str) -> Self {
        self.on_path.insert(program.to_string());
        self
    }

    /// Put `program` on the search path with a canned reply.
    pub fn reply(mut self, program: &str, reply: Reply) -> Self {
        self.on_path.insert(program.to_string());
        self.replies.insert(program.to_string(), reply);
        self
    }
}

impl Executor for StubExecutor {
    fn run(
        &self,
        program: &str,
        _args: &[&str],
        timeout: Duration,
    ) -> Result<ExecResult, ExecError> {
        match self.replies.get(program) {
            Some(Reply::Stdout(out)) => Ok(ExecResult::ok(out.clone())),
            Some(Reply::Timeout) => Err(ExecError::Timeout {
                program: program.to_string(),
                timeout,
            }),
            None => Err(ExecError::Spawn {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.on_path
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// Log that keeps warnings and component records in memory.
#[derive(Debug, Default)]
pub struct RecordingLog {
    pub warnings: Mutex<Vec<String>>,
    pub entries: Mutex<Vec<ComponentEntry>>,
}

impl RecordingLog {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("lock").clone()
    }

    pub fn entries(&self) -> Vec<ComponentEntry> {
        self.entries.lock().expect("lock").clone()
    }
}

impl Log for RecordingLog {
    fn stage(&self, _msg: &str) {}
    fn info(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn warn(&self, msg: &str) {
        self.warnings.lock().expect("lock").push(msg.to_string());
    }
    fn error(&self, msg: &str) {
        self.warn(msg);
    }
    fn dry_run(&self, _msg: &str) {}
    fn record(&self, name: &str, status: ComponentStatus, message: Option<&str>) {
        self.entries.lock().expect("lock").push(ComponentEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        });
    }
}

/// A fake home directory backed by a [`tempfile::TempDir`].
pub struct FakeHome {
    pub home: tempfile::TempDir,
}

impl FakeHome {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create temp home"),
        }
    }

    pub fn path(&self) -> &Path {
        self.home.path()
    }

    /// Write `content` to `rel` under the home, creating parents.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.home.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home.path().join(rel)).expect("read file")
    }

    /// A Linux context rooted at this home.
    pub fn context(&self, config: Config, executor: StubExecutor) -> (Context, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let ctx = Context::new(
            Arc::new(config),
            Arc::new(Environment::new(self.home.path())),
            Platform::new(Os::Linux),
            Arc::clone(&log) as Arc<dyn Log>,
            Arc::new(executor),
        )
        .with_jobs(2);
        (ctx, log)
    }
}

/// Parse an inline TOML configuration.
pub fn config(toml: &str) -> Config {
    Config::from_toml_str(toml).expect("valid config")
}
