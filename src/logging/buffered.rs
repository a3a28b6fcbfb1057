//! Per-task buffered logger for parallel execution.

use std::sync::{Arc, Mutex};

use super::diagnostic::{DiagEvent, DiagnosticLog};
use super::logger::Logger;
use super::types::{Log, TaskStatus};

/// One buffered display entry, replayed through tracing on flush.
#[derive(Debug, Clone)]
enum Entry {
    Stage(String),
    Info(String),
    Debug(String),
    Warn(String),
    Error(String),
    DryRun(String),
}

impl Entry {
    // Replays skip the diagnostic stream: the event was already written
    // there in real time when it was buffered.
    fn replay(&self) {
        match self {
            Self::Stage(msg) => tracing::info!(target: "converge::stage", "{msg}"),
            Self::Info(msg) => tracing::info!("{msg}"),
            Self::Debug(msg) => tracing::debug!("{msg}"),
            Self::Warn(msg) => tracing::warn!("{msg}"),
            Self::Error(msg) => tracing::error!("{msg}"),
            Self::DryRun(msg) => tracing::info!(target: "converge::dry_run", "{msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by pushing the matching [`Entry`]
/// variant, after forwarding the message to the diagnostic stream so the
/// true chronological order survives buffering.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident => $diag:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Some(d) = &self.inner.diagnostic {
                    d.emit(DiagEvent::$diag, msg);
                }
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(Entry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Captures one task's display output in memory so parallel tasks never
/// interleave on the console, then replays it atomically on completion.
///
/// `record_task` forwards straight to the backing [`Logger`]; the summary
/// collection is already thread-safe and order there is by completion.
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    entries: Mutex<Vec<Entry>>,
}

impl BufferedLog {
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Replay buffered entries without touching the active-task display.
    #[cfg(test)]
    pub fn flush(&self) {
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
    }

    /// Replay all buffered entries as one console block and drop the task
    /// from the in-flight display.
    ///
    /// Takes the backing logger's flush lock for the whole replay, so two
    /// completing tasks can never interleave their blocks.
    pub fn flush_and_complete(&self, task_name: &str) {
        let _guard = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.inner.clear_progress();
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
        let remaining = self.inner.active_tasks.lock().ok().and_then(|mut active| {
            active.retain(|n| n != task_name);
            (!active.is_empty()).then(|| active.join(", "))
        });
        if let Some(names) = remaining {
            self.inner.draw_progress(&names);
        }
    }
}

impl Log for BufferedLog {
    buffer_log_methods! {
        stage   => Stage   => Stage,
        info    => Info    => Info,
        debug   => Debug   => Debug,
        warn    => Warn    => Warn,
        error   => Error   => Error,
        dry_run => DryRun  => DryRun,
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.inner.record_task(name, status, message);
    }

    fn diagnostic(&self) -> Option<&DiagnosticLog> {
        self.inner.diagnostic.as_ref()
    }
}
