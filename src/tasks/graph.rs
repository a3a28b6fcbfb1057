//! Dependency-graph analysis for the scheduler.
//!
//! Prerequisites that reference tasks outside the list (filtered away by
//! `--skip`/`--only`, or belonging to another command) are treated as
//! satisfied throughout.

use std::any::TypeId;
use std::collections::HashMap;

use super::Task;

/// Prerequisite edges resolved to indices within one task list.
pub(crate) fn resolved_deps(tasks: &[&dyn Task]) -> Vec<Vec<usize>> {
    let id_to_idx: HashMap<TypeId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.task_id(), i))
        .collect();
    tasks
        .iter()
        .map(|t| {
            t.dependencies()
                .iter()
                .filter_map(|d| id_to_idx.get(d).copied())
                .collect()
        })
        .collect()
}

/// Find one task participating in a dependency cycle, if any.
///
/// Depth-first search with an explicit recursion stack: a back edge to a
/// task currently on the stack is a cycle, and that task's index is
/// returned so the caller can name it.
pub(crate) fn find_cycle(tasks: &[&dyn Task]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let deps = resolved_deps(tasks);
    let mut marks = vec![Mark::Unvisited; tasks.len()];

    for start in 0..tasks.len() {
        if marks.get(start) != Some(&Mark::Unvisited) {
            continue;
        }
        // (index, next dep position) pairs form the explicit stack.
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::OnStack;

        while let Some(&mut (idx, ref mut pos)) = stack.last_mut() {
            let Some(node_deps) = deps.get(idx) else {
                break;
            };
            if let Some(&dep) = node_deps.get(*pos) {
                *pos += 1;
                match marks.get(dep).copied() {
                    Some(Mark::OnStack) => return Some(dep),
                    Some(Mark::Unvisited) => {
                        marks[dep] = Mark::OnStack;
                        stack.push((dep, 0));
                    }
                    _ => {}
                }
            } else {
                marks[idx] = Mark::Done;
                stack.pop();
            }
        }
    }
    None
}

/// Topological order of the task list, lowest registration index first
/// among simultaneously-ready tasks.
///
/// Callers must rule out cycles with [`find_cycle`] first; tasks trapped
/// on a cycle would be silently dropped from the returned order.
pub(crate) fn topological_order(tasks: &[&dyn Task]) -> Vec<usize> {
    let deps = resolved_deps(tasks);
    let mut remaining: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (i, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            if let Some(d) = dependents.get_mut(dep) {
                d.push(i);
            }
        }
    }

    let mut order = Vec::with_capacity(tasks.len());
    let mut ready: Vec<usize> = remaining
        .iter()
        .enumerate()
        .filter_map(|(i, &n)| (n == 0).then_some(i))
        .collect();

    while !ready.is_empty() {
        // Registration-order tie break.
        let next_pos = ready
            .iter()
            .enumerate()
            .min_by_key(|&(_, &idx)| idx)
            .map_or(0, |(pos, _)| pos);
        let idx = ready.swap_remove(next_pos);
        order.push(idx);
        if let Some(deps_of) = dependents.get(idx) {
            for &dependent in deps_of {
                if let Some(n) = remaining.get_mut(dependent) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }
    }
    order
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tasks::{Context, TaskResult};

    use anyhow::Result;

    macro_rules! stub_task {
        ($name:ident, $display:expr) => {
            stub_task!($name, $display, vec![]);
        };
        ($name:ident, $display:expr, $deps:expr) => {
            struct $name;
            impl Task for $name {
                fn name(&self) -> &str {
                    $display
                }
                fn dependencies(&self) -> Vec<TypeId> {
                    $deps
                }
                fn should_run(&self, _ctx: &Context) -> bool {
                    true
                }
                fn run(&self, _ctx: &Context) -> Result<TaskResult> {
                    Ok(TaskResult::Ok)
                }
            }
        };
    }

    stub_task!(Alone, "alone");
    stub_task!(AlsoAlone, "also-alone");

    stub_task!(ChainA, "chain-a");
    stub_task!(ChainB, "chain-b", vec![TypeId::of::<ChainA>()]);
    stub_task!(ChainC, "chain-c", vec![TypeId::of::<ChainB>()]);

    stub_task!(DiamondTop, "top");
    stub_task!(DiamondLeft, "left", vec![TypeId::of::<DiamondTop>()]);
    stub_task!(DiamondRight, "right", vec![TypeId::of::<DiamondTop>()]);
    stub_task!(
        DiamondBottom,
        "bottom",
        vec![TypeId::of::<DiamondLeft>(), TypeId::of::<DiamondRight>()]
    );

    stub_task!(LoopA, "loop-a", vec![TypeId::of::<LoopB>()]);
    stub_task!(LoopB, "loop-b", vec![TypeId::of::<LoopA>()]);
    stub_task!(SelfLoop, "self-loop", vec![TypeId::of::<SelfLoop>()]);

    stub_task!(DanglingDep, "dangling", vec![TypeId::of::<ChainC>()]);

    #[test]
    fn independent_tasks_have_no_cycle() {
        let tasks: Vec<&dyn Task> = vec![&Alone, &AlsoAlone];
        assert!(find_cycle(&tasks).is_none());
    }

    #[test]
    fn chain_and_diamond_have_no_cycle() {
        let tasks: Vec<&dyn Task> = vec![&ChainA, &ChainB, &ChainC];
        assert!(find_cycle(&tasks).is_none());

        let tasks: Vec<&dyn Task> =
            vec![&DiamondTop, &DiamondLeft, &DiamondRight, &DiamondBottom];
        assert!(find_cycle(&tasks).is_none());
    }

    #[test]
    fn two_task_cycle_is_found() {
        let tasks: Vec<&dyn Task> = vec![&LoopA, &LoopB];
        assert!(find_cycle(&tasks).is_some());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks: Vec<&dyn Task> = vec![&SelfLoop];
        assert_eq!(find_cycle(&tasks), Some(0));
    }

    #[test]
    fn dep_on_absent_task_is_satisfied() {
        let tasks: Vec<&dyn Task> = vec![&DanglingDep, &Alone];
        assert!(find_cycle(&tasks).is_none());
        assert_eq!(topological_order(&tasks).len(), 2);
    }

    #[test]
    fn order_respects_dependencies() {
        // Registered backwards on purpose.
        let tasks: Vec<&dyn Task> = vec![&ChainC, &ChainB, &ChainA];
        let order = topological_order(&tasks);
        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert!(pos(2) < pos(1), "chain-a before chain-b");
        assert!(pos(1) < pos(0), "chain-b before chain-c");
    }

    #[test]
    fn order_breaks_ties_by_registration_index() {
        let tasks: Vec<&dyn Task> =
            vec![&DiamondTop, &DiamondLeft, &DiamondRight, &DiamondBottom];
        let order = topological_order(&tasks);
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn apply_task_graph_is_acyclic_and_resolvable() {
        use std::collections::HashSet;
        let profile = crate::config::profiles::Profile {
            name: "test".to_string(),
            active_categories: vec!["base".to_string()],
            excluded_categories: vec![],
        };
        let tasks = crate::tasks::all_apply_tasks(&profile);
        let refs: Vec<&dyn Task> = tasks.iter().map(Box::as_ref).collect();
        assert!(find_cycle(&refs).is_none());

        let present: HashSet<TypeId> = refs.iter().map(|t| t.task_id()).collect();
        for task in &refs {
            for dep in task.dependencies() {
                assert!(
                    present.contains(&dep),
                    "task '{}' depends on a type not in the apply list",
                    task.name()
                );
            }
        }
    }
}
