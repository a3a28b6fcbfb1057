//! Package installation task.

use std::any::TypeId;

use anyhow::Result;

use super::{process_resource_states, Context, ProcessOpts, Task, TaskResult};
use crate::config::packages::PackageManager;
use crate::resources::package::{installed_packages, PackageResource};
use crate::resources::ResourceState;

/// Install every declared package that is not yet present.
///
/// One bulk "list installed" query per manager classifies the whole batch;
/// already-present packages are never touched or reinstalled.
pub struct InstallPackages;

const MANAGERS: [PackageManager; 3] = [
    PackageManager::Pacman,
    PackageManager::Aur,
    PackageManager::Winget,
];

/// Whether this host can drive the given manager at all.
fn manager_available(ctx: &Context, manager: PackageManager) -> bool {
    match manager {
        PackageManager::Pacman | PackageManager::Aur => {
            ctx.platform.is_arch && ctx.executor.which("pacman")
        }
        PackageManager::Winget => {
            ctx.platform.os == crate::platform::Os::Windows && ctx.executor.which("winget")
        }
    }
}

impl Task for InstallPackages {
    fn name(&self) -> &'static str {
        "Install packages"
    }

    fn dependencies(&self) -> Vec<TypeId> {
        vec![TypeId::of::<super::reload::ReloadConfig>()]
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config_read().packages.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let packages = ctx.config_read().packages.clone();
        let executor = ctx.executor.as_ref();

        let mut pairs: Vec<(PackageResource, ResourceState)> = Vec::new();
        for manager in MANAGERS {
            let group: Vec<_> = packages.iter().filter(|p| p.manager == manager).collect();
            if group.is_empty() {
                continue;
            }
            if !manager_available(ctx, manager) {
                ctx.log.debug(&format!(
                    "{} {manager} packages not installable on this host",
                    group.len()
                ));
                continue;
            }

            match installed_packages(manager, executor) {
                Ok(installed) => {
                    ctx.log.debug(&format!(
                        "{manager}: {} installed, {} declared",
                        installed.len(),
                        group.len()
                    ));
                    for package in group {
                        let resource =
                            PackageResource::new(package.name.clone(), package.manager, executor);
                        let state = resource.state_from_installed(&installed);
                        pairs.push((resource, state));
                    }
                }
                // One broken listing poisons this manager's whole group:
                // every package is reported invalid, none installed.
                Err(e) => {
                    let reason = format!("cannot query {manager}: {e:#}");
                    ctx.log.warn(&reason);
                    for package in group {
                        let resource =
                            PackageResource::new(package.name.clone(), package.manager, executor);
                        pairs.push((
                            resource,
                            ResourceState::Invalid {
                                reason: reason.clone(),
                            },
                        ));
                    }
                }
            }
        }

        if pairs.is_empty() {
            return Ok(TaskResult::Skipped(
                "no package manager available".to_string(),
            ));
        }

        process_resource_states(ctx, pairs, &ProcessOpts::install_missing("install"))
    }
}
