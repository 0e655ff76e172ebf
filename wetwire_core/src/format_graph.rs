//! Component K — the graph formatter.
//!
//! Renders the dependency graph discovered resources form, either as a
//! human-readable ASCII tree or as Graphviz DOT text.
//! DOT rendering is the one place `petgraph` earns its keep in this
//! crate — for visualization rather than for graph algorithms
//! themselves (see `graph.rs`'s module doc).

use std::collections::{HashMap, HashSet};

use petgraph::dot::Dot;
use petgraph::graph::DiGraph;

use crate::discover::Resource;

/// One line per resource, each dependent nested beneath the resource
/// it depends on, with increasing indentation. Roots are the resources
/// with no dependencies of their own (in source order); a node's
/// children are the resources that depend on it, sorted lexically.
/// Each node is printed at most once — a resource reachable from more
/// than one root prints under whichever root reaches it first. When no
/// root exists (the discovered set is purely cyclic), falls back to a
/// flat listing annotated with each node's own dependency list.
pub fn format_ascii_tree(resources: &[Resource]) -> String {
    let by_name: HashMap<&str, &Resource> = resources.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for r in resources {
        for dep in &r.dependencies {
            dependents.entry(dep.as_str()).or_default().push(r.name.as_str());
        }
    }
    for children in dependents.values_mut() {
        children.sort();
    }

    // Source order is preserved naturally: `resources` is iterated in
    // the order discovery produced it.
    let roots: Vec<&Resource> = resources.iter().filter(|r| r.dependencies.is_empty()).collect();

    if roots.is_empty() && !resources.is_empty() {
        return format_flat_fallback(resources);
    }

    let mut out = String::new();
    let mut printed: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();
    for root in roots {
        render_node(root, &by_name, &dependents, 0, &mut path, &mut printed, &mut out);
    }
    out
}

fn render_node<'a>(
    r: &'a Resource,
    by_name: &HashMap<&str, &'a Resource>,
    dependents: &HashMap<&str, Vec<&str>>,
    depth: usize,
    path: &mut Vec<&'a str>,
    printed: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if printed.contains(r.name.as_str()) {
        return;
    }
    printed.insert(r.name.as_str());
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{} ({})\n", r.name, r.kind));

    if path.contains(&r.name.as_str()) {
        // Defensive only: the graph is validated acyclic before this
        // is ever called, but a formatter should never infinite-loop.
        return;
    }
    path.push(r.name.as_str());
    if let Some(children) = dependents.get(r.name.as_str()) {
        for child_name in children {
            if let Some(child) = by_name.get(child_name) {
                render_node(child, by_name, dependents, depth + 1, path, printed, out);
            }
        }
    }
    path.pop();
}

/// Flat listing used when the discovered set has no root (every
/// resource depends on something, i.e. pure cycles).
fn format_flat_fallback(resources: &[Resource]) -> String {
    let mut out = String::new();
    for r in resources {
        out.push_str(&format!(
            "{} ({}): depends on [{}]\n",
            r.name,
            r.kind,
            r.dependencies.join(", ")
        ));
    }
    out
}

/// Graphviz DOT text with one node per resource and one edge per
/// dependency, directed from dependent to dependency ("A depends on B"
/// draws as `A -> B`).
pub fn format_dot(resources: &[Resource]) -> String {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index = HashMap::new();
    for r in resources {
        let idx = graph.add_node(r.name.as_str());
        index.insert(r.name.as_str(), idx);
    }
    for r in resources {
        let from = index[r.name.as_str()];
        for dep in &r.dependencies {
            if let Some(&to) = index.get(dep.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }
    format!("{}", Dot::new(&graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::ast::Expr;

    fn res(name: &str, kind: &str, deps: &[&str]) -> Resource {
        Resource {
            name: name.to_string(),
            kind: kind.to_string(),
            api_version: "v1".to_string(),
            package_alias: Some("corev1".to_string()),
            file: PathBuf::from("t.go"),
            line: 1,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            literal: Expr::CompositeLit { typ: None, elts: vec![] },
        }
    }

    #[test]
    fn ascii_tree_roots_on_the_dependency_and_nests_its_dependent() {
        let resources = vec![res("Deployment", "Deployment", &["Config"]), res("Config", "ConfigMap", &[])];
        let tree = format_ascii_tree(&resources);
        let deploy_idx = tree.find("Deployment").unwrap();
        let config_idx = tree.find("Config").unwrap();
        assert!(config_idx < deploy_idx, "Config (no deps) must be the root:\n{}", tree);
        assert!(tree.lines().nth(1).unwrap().starts_with("  "));
    }

    #[test]
    fn ascii_tree_falls_back_to_a_flat_listing_when_purely_cyclic() {
        let resources = vec![res("A", "ConfigMap", &["B"]), res("B", "ConfigMap", &["A"])];
        let tree = format_ascii_tree(&resources);
        assert!(tree.contains("A (ConfigMap): depends on [B]"));
        assert!(tree.contains("B (ConfigMap): depends on [A]"));
    }

    #[test]
    fn dot_output_contains_nodes_and_edges() {
        let resources = vec![res("Deployment", "Deployment", &["Config"]), res("Config", "ConfigMap", &[])];
        let dot = format_dot(&resources);
        assert!(dot.contains("Deployment"));
        assert!(dot.contains("Config"));
        assert!(dot.contains("->"));
    }
}
