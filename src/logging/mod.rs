//! Console, file, and diagnostic logging.

mod buffered;
mod diagnostic;
mod logger;
mod subscriber;
mod types;
mod utils;

pub use buffered::BufferedLog;
pub use diagnostic::{diag_thread_name, set_diag_thread_name, DiagEvent, DiagnosticLog};
pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, TaskEntry, TaskStatus};

/// Serializes `XDG_CACHE_HOME` manipulation across parallel test threads.
#[cfg(test)]
pub(crate) static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// A [`Logger`] writing into a temp cache dir, with a thread-local tracing
/// dispatcher feeding a [`FileLayer`](subscriber::FileLayer) so logger
/// methods reach a real file during tests.
///
/// The returned guard must stay alive for the duration of the test;
/// dropping it restores the previous dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt as _, Layer as _};
    let tmp = tempfile::tempdir().expect("create temp dir");
    let env_lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    std::env::set_var("XDG_CACHE_HOME", tmp.path());
    let file_layer = subscriber::FileLayer::new("test").expect("create file layer");
    let log = Logger::new("test");
    std::env::remove_var("XDG_CACHE_HOME");
    drop(env_lock);
    let registry =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(registry));
    (log, tmp, guard)
}
