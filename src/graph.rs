//! Dependency graph: parses `uses`, detects cycles, and computes
//! topological levels. Informational only — launch stays fully parallel
//! regardless of level — so this module is a pure function over the
//! manifest: no I/O, no mutable state, just a `Manifest` in and a
//! validated graph out.

use std::collections::{HashMap, HashSet};

use crate::error::{PolyrunError, Result};
use crate::manifest::Manifest;

#[derive(Debug, Clone)]
struct Node {
    is_resource: bool,
    dependencies: Vec<String>,
}

/// Nodes for every service and resource, edges from `uses`, and a
/// computed level per node (leaves at level 0). Built once per command
/// invocation and retained for inspection only.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: HashMap<String, Node>,
    levels: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Builds and validates the graph from a manifest's services and
    /// resources. Fails with `UnknownDependency` if a `uses` entry names
    /// something not declared, or `DependencyCycle` if the `uses` edges
    /// form a cycle.
    pub fn build(manifest: &Manifest) -> Result<Self> {
        let mut nodes = HashMap::new();

        for (name, service) in &manifest.services {
            nodes.insert(
                name.clone(),
                Node {
                    is_resource: false,
                    dependencies: service.uses.clone(),
                },
            );
        }
        for (name, resource) in &manifest.resources {
            nodes.insert(
                name.clone(),
                Node {
                    is_resource: true,
                    dependencies: resource.uses.clone(),
                },
            );
        }

        for (name, node) in &nodes {
            for dep in &node.dependencies {
                if !nodes.contains_key(dep) {
                    return Err(PolyrunError::UnknownDependency {
                        from: name.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }

        let mut graph = Self {
            nodes,
            levels: HashMap::new(),
        };
        graph.detect_cycles()?;
        graph.compute_levels();
        Ok(graph)
    }

    fn detect_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = self
            .nodes
            .keys()
            .map(|k| (k.as_str(), Mark::Unvisited))
            .collect();

        fn visit<'a>(
            name: &'a str,
            nodes: &'a HashMap<String, Node>,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<String>,
        ) -> Result<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    stack.push(name.to_string());
                    return Err(PolyrunError::DependencyCycle(stack.clone()));
                }
                _ => {}
            }

            marks.insert(name, Mark::InProgress);
            stack.push(name.to_string());

            if let Some(node) = nodes.get(name) {
                for dep in &node.dependencies {
                    visit(dep, nodes, marks, stack)?;
                }
            }

            stack.pop();
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort();
        for name in names {
            let mut stack = Vec::new();
            visit(name, &self.nodes, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    /// Leaves (no dependencies) sit at level 0; every other node's level
    /// is one more than the maximum level among its dependencies.
    fn compute_levels(&mut self) {
        fn level_of(
            name: &str,
            nodes: &HashMap<String, Node>,
            levels: &mut HashMap<String, usize>,
            in_progress: &mut HashSet<String>,
        ) -> usize {
            if let Some(l) = levels.get(name) {
                return *l;
            }
            if !in_progress.insert(name.to_string()) {
                // Cycles are rejected before this runs; this is unreachable
                // in practice but keeps the recursion total.
                return 0;
            }

            let node = match nodes.get(name) {
                Some(n) => n,
                None => return 0,
            };

            let level = node
                .dependencies
                .iter()
                .map(|dep| level_of(dep, nodes, levels, in_progress) + 1)
                .max()
                .unwrap_or(0);

            levels.insert(name.to_string(), level);
            level
        }

        let mut in_progress = HashSet::new();
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        for name in names {
            level_of(&name, &self.nodes, &mut self.levels, &mut in_progress);
        }
    }

    pub fn level(&self, name: &str) -> Option<usize> {
        self.levels.get(name).copied()
    }

    pub fn is_resource(&self, name: &str) -> bool {
        self.nodes.get(name).map(|n| n.is_resource).unwrap_or(false)
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Resource, Service};

    fn service(uses: &[&str]) -> Service {
        Service {
            project: ".".to_string(),
            language: None,
            host: None,
            entrypoint: None,
            ports: vec![],
            uses: uses.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn leaves_sit_at_level_zero() {
        let mut manifest = Manifest::default();
        manifest.services.insert("db_client".to_string(), service(&["db"]));
        manifest.resources.insert(
            "db".to_string(),
            Resource {
                kind: "postgres".to_string(),
                uses: vec![],
            },
        );
        let graph = DependencyGraph::build(&manifest).unwrap();
        assert_eq!(graph.level("db"), Some(0));
        assert_eq!(graph.level("db_client"), Some(1));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut manifest = Manifest::default();
        manifest.services.insert("web".to_string(), service(&["nope"]));
        let result = DependencyGraph::build(&manifest);
        assert!(matches!(result, Err(PolyrunError::UnknownDependency { .. })));
    }

    #[test]
    fn cycle_is_rejected() {
        let mut manifest = Manifest::default();
        manifest.services.insert("a".to_string(), service(&["b"]));
        manifest.services.insert("b".to_string(), service(&["a"]));
        let result = DependencyGraph::build(&manifest);
        assert!(matches!(result, Err(PolyrunError::DependencyCycle(_))));
    }

    #[test]
    fn diamond_dependency_levels_resolve() {
        let mut manifest = Manifest::default();
        manifest.services.insert("api".to_string(), service(&["auth", "db"]));
        manifest.services.insert("auth".to_string(), service(&["db"]));
        manifest.resources.insert(
            "db".to_string(),
            Resource {
                kind: "postgres".to_string(),
                uses: vec![],
            },
        );
        let graph = DependencyGraph::build(&manifest).unwrap();
        assert_eq!(graph.level("db"), Some(0));
        assert_eq!(graph.level("auth"), Some(1));
        assert_eq!(graph.level("api"), Some(2));
    }
}
