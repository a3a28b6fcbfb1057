//! The [`Log`] trait and the summary types it records.

use super::diagnostic::DiagnosticLog;

/// Final status of one task, tallied in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task ran and succeeded.
    Ok,
    /// The task does not apply to this platform or profile.
    NotApplicable,
    /// The task chose to skip itself (tool missing, nothing configured).
    Skipped,
    /// The task previewed its changes without applying them.
    DryRun,
    /// The task ran and failed.
    Failed,
    /// The task never started because a prerequisite failed.
    NeverRun,
}

/// One recorded task outcome.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub name: String,
    pub status: TaskStatus,
    /// Skip reason or error description, when there is one.
    pub message: Option<String>,
}

/// Destination-agnostic logging used by tasks and resources.
///
/// [`Logger`](super::logger::Logger) writes immediately;
/// [`BufferedLog`](super::buffered::BufferedLog) captures output so
/// parallel tasks never interleave on the console. Task code holds a
/// `dyn Log` and does not know which it has.
pub trait Log: Send + Sync {
    /// A stage header opening a major section.
    fn stage(&self, msg: &str);
    fn info(&self, msg: &str);
    /// Suppressed on console unless verbose; always in the run log.
    fn debug(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    /// A would-apply preview line.
    fn dry_run(&self, msg: &str);
    /// Record a task outcome for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
    /// The microsecond diagnostic stream, when one is open.
    fn diagnostic(&self) -> Option<&DiagnosticLog> {
        None
    }
}
