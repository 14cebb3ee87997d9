//! Logging: console and file output through `tracing`, plus the per-component
//! summary collected by [`Logger`].

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{ComponentEntry, ComponentStatus, Log};

/// A [`Logger`] whose events land in a log file inside a fresh temp dir.
///
/// Installs a thread-local dispatcher with only the file layer; keep the
/// guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("test.log");
    let layer = subscriber::FileLayer::create(&path, "test").expect("file layer");
    let log = Logger::with_log_file(Some(path));
    let dispatch = tracing::Dispatch::new(
        tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG)),
    );
    let guard = tracing::dispatcher::set_default(&dispatch);
    (log, tmp, guard)
}
