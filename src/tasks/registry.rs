//! Windows registry task.

use std::any::TypeId;

use anyhow::Result;

use super::{process_resource_states, Context, ProcessOpts, Task, TaskResult};
use crate::resources::registry::{batch_check_values, RegistryValueResource};
use crate::resources::ResourceState;

/// Set every declared registry value to its configured data.
///
/// The whole batch is probed with one `PowerShell` invocation; only values
/// that are absent or differ are written.
pub struct ApplyRegistry;

impl Task for ApplyRegistry {
    fn name(&self) -> &'static str {
        "Apply registry values"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![TypeId::of::<super::reload::ReloadConfig>()]
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.has_registry && !ctx.config_read().registry.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let values = ctx.config_read().registry.clone();
        let executor = ctx.executor.as_ref();

        let resources: Vec<RegistryValueResource> = values
            .iter()
            .map(|v| {
                RegistryValueResource::new(
                    v.key.clone(),
                    v.name.clone(),
                    v.data.clone(),
                    v.kind,
                    executor,
                )
            })
            .collect();

        // One broken probe poisons the whole batch: every value is reported
        // invalid with the same reason and nothing is written.
        let pairs: Vec<(RegistryValueResource, ResourceState)> =
            match batch_check_values(&resources, executor) {
                Ok(observed) => {
                    ctx.log
                        .debug(&format!("probed {} registry values", resources.len()));
                    resources
                        .into_iter()
                        .map(|r| {
                            let state = r.state_from_observed(
                                observed.get(&r.map_key()).and_then(|v| v.as_deref()),
                            );
                            (r, state)
                        })
                        .collect()
                }
                Err(e) => {
                    let reason = format!("cannot query registry: {e:#}");
                    ctx.log.warn(&reason);
                    resources
                        .into_iter()
                        .map(|r| (r, ResourceState::Invalid { reason: reason.clone() }))
                        .collect()
                }
            };

        // A failed write on one value must not hide the remaining ones.
        process_resource_states(ctx, pairs, &ProcessOpts::apply_all("set").no_bail())
    }
}
