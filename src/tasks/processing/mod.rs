//! Generic reconciliation loop: classify each resource, apply or remove it,
//! and accumulate counters for the task summary line.

mod apply;
mod parallel;

use anyhow::Result;

use crate::resources::{Applicable, Resource, ResourceState};

use super::Context;

/// Result of a single task execution.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// The task ran and finished.
    Ok,
    /// The task decided not to do its work, with a reason.
    Skipped(String),
    /// The task previewed its changes without applying them.
    DryRun,
}

/// Counters accumulated while a task walks its resource batch.
///
/// Every batch task ends with the same one-line summary, so the format
/// lives here rather than in each task.
#[derive(Debug, Default)]
pub struct TaskStats {
    /// Resources changed (or that would change, in dry-run).
    pub changed: u32,
    /// Resources already in the desired state.
    pub already_ok: u32,
    /// Resources left alone, whether invalid, filtered, or errored leniently.
    pub skipped: u32,
}

impl TaskStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line summary, e.g. `"3 changed, 10 already ok, 1 skipped"`.
    ///
    /// The skipped count only appears when non-zero.
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }

    /// Log the summary and convert to the matching [`TaskResult`].
    #[must_use]
    pub fn finish(self, ctx: &Context) -> TaskResult {
        ctx.log.info(&self.summary(ctx.dry_run));
        if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        }
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
    }
}

/// Policy knobs for the reconciliation loop.
///
/// Constructed through [`apply_all`](Self::apply_all) or
/// [`install_missing`](Self::install_missing), then adjusted with
/// [`no_bail`](Self::no_bail) and [`skip_missing`](Self::skip_missing).
#[derive(Debug)]
pub struct ProcessOpts<'a> {
    /// Verb for log messages ("link", "install", "chmod", ...).
    pub verb: &'a str,
    /// Repair `Incorrect` resources; when `false` they count as skipped.
    pub fix_incorrect: bool,
    /// Create `Missing` resources; when `false` they count as skipped.
    pub fix_missing: bool,
    /// Propagate apply errors. When `false`, warn and count as skipped.
    pub bail_on_error: bool,
}

impl<'a> ProcessOpts<'a> {
    /// Strict preset: fix everything, surface every failure.
    #[must_use]
    pub const fn apply_all(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: true,
            fix_missing: true,
            bail_on_error: true,
        }
    }

    /// Lenient preset for resources that must not be overwritten when
    /// already present: create what is missing, warn on failures.
    #[must_use]
    pub const fn install_missing(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: false,
            fix_missing: true,
            bail_on_error: false,
        }
    }

    /// Warn on apply errors instead of bailing.
    #[must_use]
    pub const fn no_bail(mut self) -> Self {
        self.bail_on_error = false;
        self
    }

    /// Leave missing resources alone (only repair incorrect ones).
    #[must_use]
    pub const fn skip_missing(mut self) -> Self {
        self.fix_missing = false;
        self
    }
}

/// Reconcile self-probing resources: check each one's state, apply as the
/// policy dictates.
///
/// Dispatches to a Rayon batch when the context allows parallelism and
/// there is more than one resource.
///
/// # Errors
///
/// Propagates state-probe failures always, and apply failures when
/// `opts.bail_on_error` is set.
pub fn process_resources<R: Resource + Send>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    let resources: Vec<R> = resources.into_iter().collect();
    if ctx.parallel && resources.len() > 1 {
        ctx.log
            .debug(&format!("reconciling {} resources in parallel", resources.len()));
        parallel::process_resources_parallel(ctx, resources, opts)
    } else {
        let mut stats = TaskStats::new();
        for resource in resources {
            let observed = resource.current_state()?;
            stats += apply::process_single(ctx, &resource, observed, opts)?;
        }
        Ok(stats.finish(ctx))
    }
}

/// Reconcile resources whose states were pre-classified by one bulk query
/// (packages, registry values).
///
/// # Errors
///
/// Propagates apply failures when `opts.bail_on_error` is set.
pub fn process_resource_states<R: Applicable + Send>(
    ctx: &Context,
    resource_states: impl IntoIterator<Item = (R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    let resource_states: Vec<(R, ResourceState)> = resource_states.into_iter().collect();
    if ctx.parallel && resource_states.len() > 1 {
        ctx.log.debug(&format!(
            "reconciling {} resources in parallel",
            resource_states.len()
        ));
        parallel::process_resource_states_parallel(ctx, resource_states, opts)
    } else {
        let mut stats = TaskStats::new();
        for (resource, observed) in resource_states {
            stats += apply::process_single(ctx, &resource, observed, opts)?;
        }
        Ok(stats.finish(ctx))
    }
}

/// Remove resources. Only resources observed `Correct` are removal
/// candidates; anything else is not ours (or already gone) and is left
/// untouched.
///
/// # Errors
///
/// Propagates state-probe and removal failures.
pub fn process_resources_remove<R: Resource + Send>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    verb: &str,
) -> Result<TaskResult> {
    let resources: Vec<R> = resources.into_iter().collect();
    if ctx.parallel && resources.len() > 1 {
        ctx.log
            .debug(&format!("removing {} resources in parallel", resources.len()));
        parallel::process_remove_parallel(ctx, resources, verb)
    } else {
        let mut stats = TaskStats::new();
        for resource in resources {
            let observed = resource.current_state()?;
            stats += apply::remove_single(ctx, &resource, &observed, verb)?;
        }
        Ok(stats.finish(ctx))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::{Log, TaskStatus};
    use crate::resources::{ResourceChange, ResourceState};
    use crate::tasks::test_helpers::{empty_config, make_static_context};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Scripted resource for driving the loop through every branch.
    struct MockResource {
        state_result: Result<ResourceState, String>,
        apply_result: Result<ResourceChange, String>,
        remove_result: Result<ResourceChange, String>,
    }

    impl MockResource {
        fn new(state: ResourceState) -> Self {
            Self {
                state_result: Ok(state),
                apply_result: Ok(ResourceChange::Applied),
                remove_result: Ok(ResourceChange::Applied),
            }
        }

        fn with_state_error(mut self, err: &str) -> Self {
            self.state_result = Err(err.to_string());
            self
        }

        fn with_apply(mut self, result: Result<ResourceChange, String>) -> Self {
            self.apply_result = result;
            self
        }

        fn with_remove(mut self, result: Result<ResourceChange, String>) -> Self {
            self.remove_result = result;
            self
        }
    }

    impl Applicable for MockResource {
        fn description(&self) -> String {
            "mock resource".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            self.apply_result.clone().map_err(|s| anyhow::anyhow!("{s}"))
        }

        fn remove(&self) -> Result<ResourceChange> {
            self.remove_result
                .clone()
                .map_err(|s| anyhow::anyhow!("{s}"))
        }
    }

    impl Resource for MockResource {
        fn current_state(&self) -> Result<ResourceState> {
            self.state_result.clone().map_err(|s| anyhow::anyhow!("{s}"))
        }
    }

    /// Log capturing warnings and debug lines so tests can assert on them.
    #[derive(Default)]
    struct RecordingLog {
        warns: Mutex<Vec<String>>,
        debugs: Mutex<Vec<String>>,
    }

    impl Log for RecordingLog {
        fn stage(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn debug(&self, msg: &str) {
            self.debugs.lock().unwrap().push(msg.to_string());
        }
        fn warn(&self, msg: &str) {
            self.warns.lock().unwrap().push(msg.to_string());
        }
        fn error(&self, _: &str) {}
        fn dry_run(&self, _: &str) {}
        fn record_task(&self, _: &str, _: TaskStatus, _: Option<&str>) {}
    }

    fn test_context() -> (Context, Arc<crate::logging::Logger>) {
        make_static_context(empty_config(PathBuf::from("/tmp")))
    }

    fn recording_context() -> (Context, Arc<RecordingLog>) {
        let (ctx, _log) = test_context();
        let rec = Arc::new(RecordingLog::default());
        let ctx = ctx.with_log(Arc::clone(&rec) as Arc<dyn Log>);
        (ctx, rec)
    }

    fn dry_run_context() -> (Context, Arc<crate::logging::Logger>) {
        let (mut ctx, log) = test_context();
        ctx.dry_run = true;
        (ctx, log)
    }

    fn parallel_context() -> (Context, Arc<crate::logging::Logger>) {
        let (mut ctx, log) = test_context();
        ctx.parallel = true;
        (ctx, log)
    }

    fn lenient() -> ProcessOpts<'static> {
        ProcessOpts::apply_all("install").no_bail()
    }

    fn strict() -> ProcessOpts<'static> {
        ProcessOpts::apply_all("install")
    }

    fn incorrect() -> ResourceState {
        ResourceState::Incorrect {
            observed: "wrong".to_string(),
        }
    }

    fn invalid() -> ResourceState {
        ResourceState::Invalid {
            reason: "bad".to_string(),
        }
    }

    #[test]
    fn summary_without_skips() {
        let stats = TaskStats {
            changed: 3,
            already_ok: 10,
            skipped: 0,
        };
        assert_eq!(stats.summary(false), "3 changed, 10 already ok");
        assert_eq!(stats.summary(true), "3 would change, 10 already ok");
    }

    #[test]
    fn summary_with_skips() {
        let stats = TaskStats {
            changed: 1,
            already_ok: 2,
            skipped: 3,
        };
        assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped");
    }

    #[test]
    fn finish_maps_dry_run_flag_to_result() {
        let (ctx, _log) = dry_run_context();
        assert!(matches!(TaskStats::new().finish(&ctx), TaskResult::DryRun));
        let (ctx, _log) = test_context();
        assert!(matches!(TaskStats::new().finish(&ctx), TaskResult::Ok));
    }

    #[test]
    fn preset_flags() {
        let opts = ProcessOpts::apply_all("link");
        assert!(opts.fix_incorrect && opts.fix_missing && opts.bail_on_error);

        let opts = ProcessOpts::install_missing("enable");
        assert!(!opts.fix_incorrect && opts.fix_missing && !opts.bail_on_error);

        let opts = ProcessOpts::apply_all("chmod").skip_missing().no_bail();
        assert!(opts.fix_incorrect && !opts.fix_missing && !opts.bail_on_error);
    }

    #[test]
    fn correct_counts_already_ok() {
        let (ctx, _log) = test_context();
        let stats = apply::process_single(
            &ctx,
            &MockResource::new(ResourceState::Correct),
            ResourceState::Correct,
            &lenient(),
        )
        .unwrap();
        assert_eq!((stats.already_ok, stats.changed, stats.skipped), (1, 0, 0));
    }

    #[test]
    fn invalid_counts_skipped() {
        let (ctx, _log) = test_context();
        let stats =
            apply::process_single(&ctx, &MockResource::new(invalid()), invalid(), &lenient())
                .unwrap();
        assert_eq!((stats.skipped, stats.changed), (1, 0));
    }

    #[test]
    fn invalid_resources_warn_with_reason() {
        let (ctx, rec) = recording_context();
        let stats =
            apply::process_single(&ctx, &MockResource::new(invalid()), invalid(), &lenient())
                .unwrap();
        assert_eq!((stats.skipped, stats.changed), (1, 0));
        let warns = rec.warns.lock().unwrap();
        assert!(warns.iter().any(|w| w.contains("bad")));
    }

    #[test]
    fn missing_respects_fix_missing() {
        let (ctx, _log) = test_context();
        let opts = ProcessOpts {
            fix_missing: false,
            ..lenient()
        };
        let stats = apply::process_single(
            &ctx,
            &MockResource::new(ResourceState::Missing),
            ResourceState::Missing,
            &opts,
        )
        .unwrap();
        assert_eq!((stats.skipped, stats.changed), (1, 0));
    }

    #[test]
    fn incorrect_respects_fix_incorrect() {
        let (ctx, _log) = test_context();
        let opts = ProcessOpts {
            fix_incorrect: false,
            ..lenient()
        };
        let stats =
            apply::process_single(&ctx, &MockResource::new(incorrect()), incorrect(), &opts)
                .unwrap();
        assert_eq!((stats.skipped, stats.changed), (1, 0));
    }

    #[test]
    fn missing_and_incorrect_apply() {
        let (ctx, _log) = test_context();
        let stats = apply::process_single(
            &ctx,
            &MockResource::new(ResourceState::Missing),
            ResourceState::Missing,
            &lenient(),
        )
        .unwrap();
        assert_eq!(stats.changed, 1);

        let stats =
            apply::process_single(&ctx, &MockResource::new(incorrect()), incorrect(), &lenient())
                .unwrap();
        assert_eq!(stats.changed, 1);
    }

    #[test]
    fn dry_run_counts_without_mutating() {
        let (ctx, _log) = dry_run_context();
        // apply() is scripted to fail, proving it is never reached.
        let resource = MockResource::new(ResourceState::Missing)
            .with_apply(Err("must not be called".to_string()));
        let stats =
            apply::process_single(&ctx, &resource, ResourceState::Missing, &lenient()).unwrap();
        assert_eq!(stats.changed, 1);
    }

    #[test]
    fn apply_outcomes_map_to_counters() {
        let (ctx, _log) = test_context();

        let stats = apply::apply_resource(
            &ctx,
            &MockResource::new(ResourceState::Missing),
            &lenient(),
        )
        .unwrap();
        assert_eq!(stats.changed, 1);

        let resource = MockResource::new(ResourceState::Missing)
            .with_apply(Ok(ResourceChange::AlreadyCorrect));
        let stats = apply::apply_resource(&ctx, &resource, &lenient()).unwrap();
        assert_eq!(stats.already_ok, 1);

        let resource =
            MockResource::new(ResourceState::Missing).with_apply(Ok(ResourceChange::Skipped {
                reason: "tool missing".to_string(),
            }));
        let stats = apply::apply_resource(&ctx, &resource, &lenient()).unwrap();
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn lenient_apply_error_counts_skipped() {
        let (ctx, _log) = test_context();
        let resource =
            MockResource::new(ResourceState::Missing).with_apply(Err("boom".to_string()));
        let stats = apply::apply_resource(&ctx, &resource, &lenient()).unwrap();
        assert_eq!((stats.skipped, stats.changed), (1, 0));
    }

    #[test]
    fn strict_apply_error_propagates() {
        let (ctx, _log) = test_context();
        let resource =
            MockResource::new(ResourceState::Missing).with_apply(Err("critical".to_string()));
        let err = apply::apply_resource(&ctx, &resource, &strict()).unwrap_err();
        assert!(err.to_string().contains("critical"));
    }

    #[test]
    fn strict_skip_outcome_becomes_error() {
        let (ctx, _log) = test_context();
        let resource =
            MockResource::new(ResourceState::Missing).with_apply(Ok(ResourceChange::Skipped {
                reason: "denied".to_string(),
            }));
        let err = apply::apply_resource(&ctx, &resource, &strict()).unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn process_resources_walks_mixed_states() {
        let (ctx, _log) = test_context();
        let resources = vec![
            MockResource::new(ResourceState::Correct),
            MockResource::new(ResourceState::Missing),
            MockResource::new(invalid()),
        ];
        let result = process_resources(&ctx, resources, &lenient()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn empty_batch_is_ok() {
        let (ctx, _log) = test_context();
        let result = process_resources(&ctx, Vec::<MockResource>::new(), &lenient()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn state_probe_error_propagates() {
        let (ctx, _log) = test_context();
        let resources =
            vec![MockResource::new(ResourceState::Missing).with_state_error("probe failed")];
        let err = process_resources(&ctx, resources, &lenient()).unwrap_err();
        assert!(err.to_string().contains("probe failed"));
    }

    #[test]
    fn precomputed_states_are_respected() {
        let (ctx, _log) = test_context();
        let pairs = vec![
            (MockResource::new(ResourceState::Missing), ResourceState::Missing),
            (MockResource::new(ResourceState::Correct), ResourceState::Correct),
        ];
        let result = process_resource_states(&ctx, pairs, &lenient()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn remove_only_touches_correct_resources() {
        let (ctx, _log) = test_context();
        let resources = vec![
            MockResource::new(ResourceState::Correct),
            // Missing: would error if remove() were called.
            MockResource::new(ResourceState::Missing)
                .with_remove(Err("must not be called".to_string())),
        ];
        let result = process_resources_remove(&ctx, resources, "unlink").unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn remove_counts_non_candidates_skipped_with_reason() {
        let (ctx, rec) = recording_context();
        let resource = MockResource::new(ResourceState::Missing)
            .with_remove(Err("must not be called".to_string()));
        let stats =
            apply::remove_single(&ctx, &resource, &ResourceState::Missing, "unlink").unwrap();
        assert_eq!((stats.skipped, stats.already_ok, stats.changed), (1, 0, 0));
        let debugs = rec.debugs.lock().unwrap();
        assert!(debugs.iter().any(|d| d.contains("not ours or already gone")));
    }

    #[test]
    fn remove_dry_run_never_mutates() {
        let (ctx, _log) = dry_run_context();
        let resources = vec![MockResource::new(ResourceState::Correct)
            .with_remove(Err("must not be called".to_string()))];
        let result = process_resources_remove(&ctx, resources, "unlink").unwrap();
        assert!(matches!(result, TaskResult::DryRun));
    }

    #[test]
    fn parallel_batch_accumulates() {
        let (ctx, _log) = parallel_context();
        let resources = vec![
            MockResource::new(ResourceState::Correct),
            MockResource::new(ResourceState::Missing),
            MockResource::new(invalid()),
        ];
        let result = process_resources(&ctx, resources, &lenient()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn parallel_single_resource_stays_sequential() {
        let (ctx, _log) = parallel_context();
        let resources = vec![MockResource::new(ResourceState::Missing)];
        let result = process_resources(&ctx, resources, &lenient()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn parallel_strict_error_propagates() {
        let (ctx, _log) = parallel_context();
        let resources = vec![
            MockResource::new(ResourceState::Missing).with_apply(Err("fatal".to_string())),
            MockResource::new(ResourceState::Missing).with_apply(Err("fatal".to_string())),
        ];
        assert!(process_resources(&ctx, resources, &strict()).is_err());
    }

    #[test]
    fn parallel_remove_dispatch() {
        let (ctx, _log) = parallel_context();
        let resources = vec![
            MockResource::new(ResourceState::Correct),
            MockResource::new(ResourceState::Missing),
        ];
        let result = process_resources_remove(&ctx, resources, "unlink").unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }
}
