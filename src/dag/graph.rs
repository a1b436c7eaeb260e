// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::engine::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// This is intentionally lightweight; acyclicity and dependency existence are
/// checked in [`crate::dag::plan`], so here we just keep adjacency information
/// for scheduling and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build a DAG from `(task, dependencies)` pairs.
    ///
    /// Dependencies that are not themselves listed as tasks are dropped from
    /// the dependents index; callers are expected to have validated them.
    pub fn from_deps<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (TaskName, Vec<TaskName>)>,
    {
        let mut nodes: BTreeMap<TaskName, DagNode> = tasks
            .into_iter()
            .map(|(name, deps)| {
                (
                    name,
                    DagNode {
                        deps,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // Second pass: populate dependents based on deps.
        let edges: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| {
                node.deps
                    .iter()
                    .map(move |dep| (dep.clone(), name.clone()))
            })
            .collect();

        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                if !dep_node.dependents.contains(&dependent) {
                    dep_node.dependents.push(dependent);
                }
            }
        }

        Self { nodes }
    }

    /// Return all task names, in sorted order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one as a dependency).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
