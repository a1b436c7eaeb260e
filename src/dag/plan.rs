// src/dag/plan.rs

//! Pre-execution validation of the subgraph reachable from a target.
//!
//! A [`Plan`] can only be constructed for a graph in which:
//! - the target exists,
//! - every dependency of every reachable task exists,
//! - there are no cycles.
//!
//! Nothing is executed while planning, so every error here is reported before
//! a single task starts.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::graph::DagGraph;
use crate::engine::TaskName;
use crate::errors::{Result, SitedagError};

/// Validated dependency subgraph for one target.
#[derive(Debug, Clone)]
pub struct Plan {
    target: TaskName,
    graph: DagGraph,
}

impl Plan {
    /// Collect and validate everything `target` transitively depends on.
    ///
    /// `deps_of` returns the declared dependencies of a registered task, or
    /// `None` if no such task exists.
    pub fn build<'a, F>(target: &str, deps_of: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<&'a [TaskName]>,
    {
        if deps_of(target).is_none() {
            return Err(SitedagError::TaskNotFound(target.to_string()));
        }

        let mut reachable: BTreeMap<TaskName, Vec<TaskName>> = BTreeMap::new();
        let mut stack = vec![target.to_string()];

        while let Some(name) = stack.pop() {
            if reachable.contains_key(&name) {
                continue;
            }
            let mut unique: Vec<TaskName> = Vec::new();
            for dep in deps_of(name.as_str()).unwrap_or(&[]) {
                if unique.contains(dep) {
                    continue;
                }
                if deps_of(dep.as_str()).is_none() {
                    return Err(SitedagError::UnknownDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
                stack.push(dep.clone());
                unique.push(dep.clone());
            }
            reachable.insert(name, unique);
        }

        if let Some(cycle) = find_cycle(&reachable) {
            return Err(SitedagError::CyclicDependency { cycle });
        }

        debug!(
            target = %target,
            tasks = reachable.len(),
            "plan validated"
        );

        Ok(Self {
            target: target.to_string(),
            graph: DagGraph::from_deps(reachable),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Group the plan's tasks into waves: wave `n` holds every task whose
    /// longest dependency chain has length `n`.
    ///
    /// Waves are purely descriptive (dry-run output, diagnostics). The
    /// scheduler never waits for a whole wave; it launches each task as soon
    /// as its own dependencies succeeded.
    pub fn waves(&self) -> Vec<Vec<TaskName>> {
        let mut levels: HashMap<&str, usize> = HashMap::new();
        for name in self.graph.tasks() {
            level_of(&self.graph, name, &mut levels);
        }

        let depth = levels.values().copied().max().map_or(0, |m| m + 1);
        let mut waves = vec![Vec::new(); depth];
        for name in self.graph.tasks() {
            waves[levels[name]].push(name.to_string());
        }
        waves
    }
}

fn level_of<'g>(graph: &'g DagGraph, name: &'g str, levels: &mut HashMap<&'g str, usize>) -> usize {
    if let Some(level) = levels.get(name) {
        return *level;
    }
    let level = graph
        .dependencies_of(name)
        .iter()
        .map(|dep| level_of(graph, dep, levels) + 1)
        .max()
        .unwrap_or(0);
    levels.insert(name, level);
    level
}

/// Find one cycle in the graph, if any.
///
/// Edge direction is `task -> dependency`, so the returned path reads as
/// "a depends on b depends on ... depends on a". The first name is repeated
/// at the end.
fn find_cycle(tasks: &BTreeMap<TaskName, Vec<TaskName>>) -> Option<Vec<TaskName>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }
    for (name, deps) in tasks {
        for dep in deps {
            graph.add_edge(name.as_str(), dep.as_str(), ());
        }
    }

    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|node| graph.contains_edge(*node, *node));
        if !is_cycle {
            continue;
        }

        let members: BTreeSet<&str> = component.iter().copied().collect();
        let start = *members.first()?;
        return Some(cycle_through(&graph, &members, start));
    }

    None
}

/// Breadth-first search inside one strongly connected component for the
/// shortest path leading from `start` back to itself.
fn cycle_through(
    graph: &DiGraphMap<&str, ()>,
    members: &BTreeSet<&str>,
    start: &str,
) -> Vec<TaskName> {
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let mut next: Vec<&str> = graph
            .neighbors(node)
            .filter(|n| members.contains(n))
            .collect();
        next.sort_unstable();

        for succ in next {
            if succ == start {
                let mut path = vec![start.to_string()];
                let mut cur = node;
                let mut back = Vec::new();
                while cur != start {
                    back.push(cur.to_string());
                    cur = parent[cur];
                }
                back.reverse();
                path.extend(back);
                path.push(start.to_string());
                return path;
            }
            if !parent.contains_key(succ) {
                parent.insert(succ, node);
                queue.push_back(succ);
            }
        }
    }

    // Unreachable for a genuine strongly connected component.
    vec![start.to_string(), start.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, Vec<&str>)]) -> BTreeMap<TaskName, Vec<TaskName>> {
        pairs
            .iter()
            .map(|(n, d)| (n.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn plan(tasks: &BTreeMap<TaskName, Vec<TaskName>>, target: &str) -> Result<Plan> {
        Plan::build(target, |name| tasks.get(name).map(|d| d.as_slice()))
    }

    #[test]
    fn plan_only_contains_reachable_tasks() {
        let tasks = deps(&[
            ("clean", vec![]),
            ("markdown", vec!["clean"]),
            ("css", vec![]),
        ]);
        let p = plan(&tasks, "markdown").unwrap();
        let names: Vec<&str> = p.graph().tasks().collect();
        assert_eq!(names, vec!["clean", "markdown"]);
    }

    #[test]
    fn unknown_target_is_reported() {
        let tasks = deps(&[("clean", vec![])]);
        match plan(&tasks, "deploy") {
            Err(SitedagError::TaskNotFound(name)) => assert_eq!(name, "deploy"),
            other => panic!("expected TaskNotFound, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let tasks = deps(&[("markdown", vec!["clean"])]);
        match plan(&tasks, "markdown") {
            Err(SitedagError::UnknownDependency { task, dependency }) => {
                assert_eq!(task, "markdown");
                assert_eq!(dependency, "clean");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }

    #[test]
    fn repeated_dependency_is_a_single_edge() {
        let tasks = deps(&[("clean", vec![]), ("deploy", vec!["clean", "clean"])]);
        let p = plan(&tasks, "deploy").unwrap();
        assert_eq!(p.graph().dependencies_of("deploy"), ["clean".to_string()]);
    }

    #[test]
    fn two_task_cycle_is_named() {
        let tasks = deps(&[("a", vec!["b"]), ("b", vec!["a"])]);
        match plan(&tasks, "a") {
            Err(SitedagError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = deps(&[("a", vec!["a"])]);
        match plan(&tasks, "a") {
            Err(SitedagError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "a"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn longer_cycle_behind_acyclic_prefix_is_found() {
        let tasks = deps(&[
            ("top", vec!["x"]),
            ("x", vec!["y"]),
            ("y", vec!["z"]),
            ("z", vec!["x"]),
        ]);
        match plan(&tasks, "top") {
            Err(SitedagError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["x", "y", "z", "x"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn waves_follow_longest_dependency_chain() {
        let tasks = deps(&[
            ("clean", vec![]),
            ("css", vec![]),
            ("scripts", vec![]),
            ("graphics", vec![]),
            ("markdown", vec!["clean"]),
            ("default", vec!["clean", "css", "scripts", "graphics", "markdown"]),
        ]);
        let waves = plan(&tasks, "default").unwrap().waves();
        assert_eq!(
            waves,
            vec![
                vec!["clean", "css", "graphics", "scripts"],
                vec!["markdown"],
                vec!["default"],
            ]
        );
    }
}
