//! Microsecond-precision diagnostic stream.
//!
//! The run log replays buffered task output in completion order, which hides
//! the true interleaving of parallel work. The diagnostic stream writes every
//! event immediately with elapsed microseconds since program start, so the
//! real timeline can be reconstructed afterwards. It lives next to the run
//! log as `$XDG_CACHE_HOME/converge/<command>.diag.log`.

use std::cell::RefCell;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use super::utils::{diag_file_path, strip_ansi, utc_now_us};

thread_local! {
    // Worker threads from thread::scope are unnamed, so the scheduler
    // records the current task name here for event attribution.
    static DIAG_TASK: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Tag the current thread with a task name for diagnostic attribution.
pub fn set_diag_thread_name(name: &str) {
    DIAG_TASK.with(|cell| {
        *cell.borrow_mut() = Some(name.to_string());
    });
}

/// The diagnostic name for the current thread: the OS thread name when set,
/// otherwise the task name from [`set_diag_thread_name`].
#[must_use]
pub fn diag_thread_name() -> String {
    let thread = std::thread::current();
    if let Some(name) = thread.name() {
        return name.to_string();
    }
    DIAG_TASK.with(|cell| cell.borrow().as_deref().unwrap_or("?").to_string())
}

/// Kinds of diagnostic event, written as short uppercase tags.
#[derive(Debug, Clone, Copy)]
pub enum DiagEvent {
    Info,
    Debug,
    Warn,
    Error,
    Stage,
    DryRun,
    /// A worker found nothing runnable and is waiting for a completion.
    TaskWait,
    /// A task's prerequisites are satisfied and it begins executing.
    TaskStart,
    TaskDone,
    TaskSkip,
    /// A resource's observed state was probed.
    ResourceCheck,
    /// A resource mutation is about to happen.
    ResourceApply,
    /// The outcome of a resource reconciliation.
    ResourceResult,
    /// A resource is being removed.
    ResourceRemove,
}

impl DiagEvent {
    const fn tag(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Stage => "STAGE",
            Self::DryRun => "DRYRUN",
            Self::TaskWait => "TASK_WAIT",
            Self::TaskStart => "TASK_START",
            Self::TaskDone => "TASK_DONE",
            Self::TaskSkip => "TASK_SKIP",
            Self::ResourceCheck => "RES_CHECK",
            Self::ResourceApply => "RES_APPLY",
            Self::ResourceResult => "RES_RESULT",
            Self::ResourceRemove => "RES_REMOVE",
        }
    }
}

/// Append-only diagnostic log shared across task threads.
#[derive(Debug)]
pub struct DiagnosticLog {
    file: Mutex<fs::File>,
    path: PathBuf,
    start: Instant,
}

impl DiagnosticLog {
    /// Open the diagnostic file for a command, truncating any previous run.
    ///
    /// Returns `None` when the cache directory is unavailable; diagnostics
    /// are then silently disabled for the run.
    pub(super) fn open(command: &str, start: Instant) -> Option<Self> {
        let path = diag_file_path(command)?;
        let header = format!(
            "# converge {} diagnostic {}\n# columns: elapsed_us | wall_utc | thread | event | message\n",
            env!("CARGO_PKG_VERSION"),
            utc_now_us(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
            path,
            start,
        })
    }

    /// Write one event line immediately.
    ///
    /// Line shape: `+<elapsed_us> <wall_utc> [<thread>] <TAG> <message>`.
    /// ANSI sequences are stripped from the message.
    pub fn emit(&self, event: DiagEvent, message: &str) {
        let elapsed_us = self.start.elapsed().as_micros();
        let line = format!(
            "+{elapsed_us:>12} {} [{}] {:<12} {}\n",
            utc_now_us(),
            diag_thread_name(),
            event.tag(),
            strip_ansi(message),
        );
        if let Ok(mut f) = self.file.lock() {
            f.write_all(line.as_bytes()).ok();
        }
    }

    /// Emit an event attributed to a named task.
    pub fn emit_task(&self, event: DiagEvent, task: &str, message: &str) {
        if message.is_empty() {
            self.emit(event, &format!("[{task}]"));
        } else {
            self.emit(event, &format!("[{task}] {message}"));
        }
    }

    /// Where the stream is being written.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn isolated_diag() -> (DiagnosticLog, tempfile::TempDir) {
        let _lock = crate::logging::TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let tmp = tempfile::tempdir().expect("tempdir");
        std::env::set_var("XDG_CACHE_HOME", tmp.path());
        let diag = DiagnosticLog::open("test", Instant::now()).expect("diag log");
        std::env::remove_var("XDG_CACHE_HOME");
        (diag, tmp)
    }

    #[test]
    fn open_writes_header() {
        let (diag, _tmp) = isolated_diag();
        let contents = fs::read_to_string(diag.path()).unwrap();
        assert!(contents.starts_with("# converge"));
        assert!(contents.contains("elapsed_us"));
    }

    #[test]
    fn emit_writes_tagged_line() {
        let (diag, _tmp) = isolated_diag();
        diag.emit(DiagEvent::ResourceCheck, "~/.bashrc state=Missing");
        let contents = fs::read_to_string(diag.path()).unwrap();
        assert!(contents.contains("RES_CHECK"));
        assert!(contents.contains("~/.bashrc state=Missing"));
    }

    #[test]
    fn emit_strips_ansi() {
        let (diag, _tmp) = isolated_diag();
        diag.emit(DiagEvent::Error, "\x1b[31mboom\x1b[0m");
        let contents = fs::read_to_string(diag.path()).unwrap();
        assert!(contents.contains("boom"));
        assert!(!contents.contains('\x1b'));
    }

    #[test]
    fn emit_task_brackets_name() {
        let (diag, _tmp) = isolated_diag();
        diag.emit_task(DiagEvent::TaskStart, "apply links", "prerequisites met");
        diag.emit_task(DiagEvent::TaskDone, "apply links", "");
        let contents = fs::read_to_string(diag.path()).unwrap();
        assert!(contents.contains("[apply links] prerequisites met"));
        assert!(contents.contains("TASK_DONE"));
        assert!(!contents.contains("[apply links] \n"));
    }

    #[test]
    fn events_keep_emission_order() {
        let (diag, _tmp) = isolated_diag();
        diag.emit(DiagEvent::Stage, "one");
        diag.emit(DiagEvent::Info, "two");
        let contents = fs::read_to_string(diag.path()).unwrap();
        assert!(contents.find("one").unwrap() < contents.find("two").unwrap());
    }

    #[test]
    fn thread_name_prefers_os_name_then_task_tag() {
        let from_worker = std::thread::spawn(|| {
            set_diag_thread_name("worker-task");
            diag_thread_name()
        })
        .join()
        .expect("no panic");
        assert_eq!(from_worker, "worker-task");
        assert!(!diag_thread_name().is_empty());
    }

    #[test]
    fn scheduler_tags_cover_lifecycle() {
        assert_eq!(DiagEvent::TaskWait.tag(), "TASK_WAIT");
        assert_eq!(DiagEvent::TaskStart.tag(), "TASK_START");
        assert_eq!(DiagEvent::TaskDone.tag(), "TASK_DONE");
        assert_eq!(DiagEvent::TaskSkip.tag(), "TASK_SKIP");
        assert_eq!(DiagEvent::ResourceRemove.tag(), "RES_REMOVE");
    }
}
