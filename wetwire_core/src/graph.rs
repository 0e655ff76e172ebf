//! Component D — the dependency graph engine.
//!
//! Validates that every dependency named by a `Resource` resolves to
//! another discovered resource, detects reference cycles with a
//! human-readable path, and produces a deterministic topological
//! ordering.
//!
//! The core algorithms are hand-rolled rather than delegated to
//! `petgraph::algo`: exact FIFO tie-breaking among independent roots
//! and an exact arrow-separated cycle path are both required, neither
//! of which petgraph's generic `toposort`/`is_cyclic_directed` expose.
//! `petgraph` is kept in the dependency stack for the formatter
//! (`format_graph`) instead, used there for visualization rather than
//! for core algorithms.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::discover::Resource;

#[derive(Debug, Fail)]
pub enum GraphErrorKind {
    #[fail(
        display = "{} ({}:{}) depends on undeclared resource {:?}",
        _0, _1, _2, _3
    )]
    UnresolvedDependency(String, String, usize, String),
    #[fail(display = "{} ({}:{}) references itself", _0, _1, _2)]
    SelfReference(String, String, usize),
    #[fail(display = "dependency cycle: {}", _0)]
    Cycle(String),
}

pub type GraphError = GraphErrorKind;

/// Every dependency name resolves to another resource in `resources`,
/// and no resource depends on itself. Errors are collected across all
/// resources and joined, rather than failing on the first one found.
pub fn validate_references(resources: &[Resource]) -> crate::Result<()> {
    let names: HashSet<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    let mut errors: Vec<String> = Vec::new();
    for r in resources {
        for dep in &r.dependencies {
            if dep == &r.name {
                errors.push(
                    GraphErrorKind::SelfReference(
                        r.name.clone(),
                        r.file.display().to_string(),
                        r.line,
                    )
                    .to_string(),
                );
            } else if !names.contains(dep.as_str()) {
                errors.push(
                    GraphErrorKind::UnresolvedDependency(
                        r.name.clone(),
                        r.file.display().to_string(),
                        r.line,
                        dep.clone(),
                    )
                    .to_string(),
                );
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        bail!(errors.join("; "))
    }
}

/// A deterministic topological order: Kahn's algorithm over the
/// dependency edges (`resource -> dependency`), processing the
/// zero-in-degree frontier in the FIFO order resources were first seen
/// in `resources`, so that the same input always yields the same
/// output order.
///
/// `resources` must already have passed `validate_references`.
pub fn topological_sort(resources: &[Resource]) -> crate::Result<Vec<String>> {
    let index: HashMap<&str, usize> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.as_str(), i))
        .collect();

    // Edge direction for emission order: a resource must be emitted
    // after everything it depends on, so we sort dependencies-first by
    // running Kahn's algorithm over the reverse graph (dependents of
    // each node), seeded with nodes that have no unresolved dependency.
    let mut remaining_deps: Vec<usize> = resources.iter().map(|r| r.dependencies.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); resources.len()];
    for (i, r) in resources.iter().enumerate() {
        for dep in &r.dependencies {
            let dep_idx = index[dep.as_str()];
            dependents[dep_idx].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..resources.len())
        .filter(|&i| remaining_deps[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(resources.len());
    let mut visited = vec![false; resources.len()];

    while let Some(i) = queue.pop_front() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        order.push(resources[i].name.clone());
        for &dependent in &dependents[i] {
            remaining_deps[dependent] -= 1;
            if remaining_deps[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() != resources.len() {
        let cycle = find_cycle(resources, &index).unwrap_or_else(|| "<unknown>".to_string());
        bail!(GraphErrorKind::Cycle(cycle));
    }

    Ok(order)
}

/// DFS-based cycle detection producing an arrow-separated path, e.g.
/// `"A -> B -> C -> A"`. Returns `None` if no cycle exists (callers
/// only invoke this once Kahn's algorithm has already proven one does).
fn find_cycle(resources: &[Resource], index: &HashMap<&str, usize>) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }

    let n = resources.len();
    let mut state = vec![State::Unvisited; n];
    let mut stack_path: Vec<usize> = Vec::new();

    fn visit(
        i: usize,
        resources: &[Resource],
        index: &HashMap<&str, usize>,
        state: &mut [State],
        stack_path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        state[i] = State::OnStack;
        stack_path.push(i);
        for dep in &resources[i].dependencies {
            let j = index[dep.as_str()];
            match state[j] {
                State::Unvisited => {
                    if let Some(cycle) = visit(j, resources, index, state, stack_path) {
                        return Some(cycle);
                    }
                }
                State::OnStack => {
                    let start = stack_path.iter().position(|&x| x == j).unwrap();
                    let mut cycle: Vec<usize> = stack_path[start..].to_vec();
                    cycle.push(j);
                    return Some(cycle);
                }
                State::Done => {}
            }
        }
        stack_path.pop();
        state[i] = State::Done;
        None
    }

    for i in 0..n {
        if state[i] == State::Unvisited {
            if let Some(cycle) = visit(i, resources, index, &mut state, &mut stack_path) {
                let names: Vec<&str> = cycle.iter().map(|&idx| resources[idx].name.as_str()).collect();
                return Some(names.join(" -> "));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use std::path::PathBuf;

    fn res(name: &str, deps: &[&str]) -> Resource {
        Resource {
            name: name.to_string(),
            kind: "ConfigMap".to_string(),
            api_version: "v1".to_string(),
            package_alias: Some("corev1".to_string()),
            file: PathBuf::from("test.go"),
            line: 1,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            literal: Expr::CompositeLit { typ: None, elts: vec![] },
        }
    }

    #[test]
    fn detects_unresolved_dependency() {
        let resources = vec![res("A", &["B"])];
        assert!(validate_references(&resources).is_err());
    }

    #[test]
    fn detects_self_reference() {
        let resources = vec![res("A", &["A"])];
        let err = validate_references(&resources).unwrap_err();
        assert!(err.to_string().contains("references itself"));
    }

    #[test]
    fn self_reference_also_surfaces_as_a_cycle() {
        let resources = vec![res("A", &["A"])];
        assert!(topological_sort(&resources).is_err());
    }

    #[test]
    fn topological_order_respects_dependency_edges() {
        let resources = vec![res("A", &["B"]), res("B", &[])];
        let order = topological_sort(&resources).unwrap();
        let pos_a = order.iter().position(|n| n == "A").unwrap();
        let pos_b = order.iter().position(|n| n == "B").unwrap();
        assert!(pos_b < pos_a);
    }

    #[test]
    fn fifo_tie_break_among_independent_roots() {
        let resources = vec![res("A", &[]), res("B", &[]), res("C", &[])];
        let order = topological_sort(&resources).unwrap();
        assert_eq!(order, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    }

    #[test]
    fn cycle_is_reported_with_a_readable_path() {
        let resources = vec![res("A", &["B"]), res("B", &["A"])];
        let err = topological_sort(&resources).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("A"));
        assert!(msg.contains("B"));
        assert!(msg.contains("->"));
    }
}
