// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

/// In-memory dependency graph keyed by entity name.
///
/// Dependencies naming something that is not a node are external and are
/// dropped. Self-dependencies are dropped as well.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Direct dependencies per node, restricted to names that are nodes.
    deps: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn from_deps(deps: &BTreeMap<String, Vec<String>>) -> Self {
        let deps = deps
            .iter()
            .map(|(name, list)| {
                let mut internal: Vec<String> = Vec::new();
                for dep in list {
                    if dep != name && deps.contains_key(dep) && !internal.contains(dep) {
                        internal.push(dep.clone());
                    }
                }
                (name.clone(), internal)
            })
            .collect();

        Self { deps }
    }

    /// Immediate (internal) dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find one cycle, returning its members sorted by name.
    ///
    /// Uses the strongly connected components of the graph; any component
    /// with more than one member is a cycle.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.deps.keys() {
            graph.add_node(name.as_str());
        }
        for (name, list) in &self.deps {
            for dep in list {
                graph.add_edge(name.as_str(), dep.as_str(), ());
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<String> = scc.into_iter().map(str::to_string).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn external_and_self_dependencies_are_dropped() {
        let graph = DependencyGraph::from_deps(&deps(&[("a", &["a", "uvm"]), ("b", &["a"])]));
        assert!(graph.dependencies_of("a").is_empty());
        assert_eq!(graph.dependencies_of("b"), ["a".to_string()]);
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn three_cycle_is_found() {
        let graph = DependencyGraph::from_deps(&deps(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("d", &["a"]),
        ]));
        assert_eq!(
            graph.find_cycle(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }
}
