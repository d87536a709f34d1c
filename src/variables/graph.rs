// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency graph between formula variables.
//!
//! The graph stores forward edges (dependency → [dependents]) in store order, so
//! every traversal below is deterministic.
//!
//! # Algorithms
//!
//! * **Topological levels** use Kahn's algorithm: level 0 holds variables with no
//!   formula dependencies, level *n* holds variables whose dependencies all sit in
//!   earlier levels. Variables left over after the queue drains are stuck behind a
//!   cycle.
//! * **Cycle extraction** uses DFS with a recursion stack ("three colors"), returning
//!   the exact cycle path, e.g. `[a, b, a]`.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};

/// Newtype wrapper for the variable dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph(pub IndexMap<String, Vec<String>>);

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Register a variable with no edges yet
    pub fn add_node(&mut self, name: &str) {
        self.0.entry(name.to_string()).or_default();
    }

    /// Record that `dependent`'s formula references `dependency`
    pub fn add_dependency(&mut self, dependency: &str, dependent: &str) {
        let dependents = self.0.entry(dependency.to_string()).or_default();
        if !dependents.iter().any(|d| d == dependent) {
            dependents.push(dependent.to_string());
        }
        self.add_node(dependent);
    }

    /// Get dependents for a variable
    pub fn get_dependents(&self, name: &str) -> Option<&Vec<String>> {
        self.0.get(name)
    }

    /// Get all variable names in the graph
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Invert the graph: variable → [variables its formula references].
    pub fn build_reverse_dependencies(&self) -> IndexMap<String, Vec<String>> {
        let mut reverse: IndexMap<String, Vec<String>> =
            self.0.keys().map(|k| (k.clone(), Vec::new())).collect();
        for (dependency, dependents) in &self.0 {
            for dependent in dependents {
                reverse
                    .entry(dependent.clone())
                    .or_default()
                    .push(dependency.clone());
            }
        }
        reverse
    }

    /// Split the graph into topological levels.
    ///
    /// # Returns
    ///
    /// `(levels, stuck)` where `levels[n]` can be evaluated once all earlier levels
    /// are, and `stuck` lists (in graph order) every variable that sits on or behind
    /// a cycle.
    ///
    /// # Examples
    ///
    /// ```
    /// use the_sequencer::variables::DependencyGraph;
    ///
    /// let mut graph = DependencyGraph::new();
    /// graph.add_dependency("a", "b");
    /// graph.add_dependency("b", "c");
    /// graph.add_node("d");
    ///
    /// let (levels, stuck) = graph.topological_levels();
    /// assert_eq!(levels, vec![vec!["a", "d"], vec!["b"], vec!["c"]]);
    /// assert!(stuck.is_empty());
    /// ```
    pub fn topological_levels(&self) -> (Vec<Vec<String>>, Vec<String>) {
        let reverse_deps = self.build_reverse_dependencies();

        let mut in_degree: HashMap<&str, usize> = reverse_deps
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let mut levels = Vec::new();
        let mut processed: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        let current_level: Vec<&str> = reverse_deps
            .keys()
            .map(String::as_str)
            .filter(|name| in_degree.get(name).copied().unwrap_or(0) == 0)
            .collect();
        for name in &current_level {
            processed.insert(*name);
            queue.push_back(*name);
        }
        if !current_level.is_empty() {
            levels.push(current_level.iter().map(|s| s.to_string()).collect());
        }

        while !queue.is_empty() {
            let mut next_level = Vec::new();
            for _ in 0..queue.len() {
                let Some(current) = queue.pop_front() else {
                    break;
                };
                if let Some(dependents) = self.0.get(current) {
                    for dependent in dependents {
                        if processed.contains(dependent.as_str()) {
                            continue;
                        }
                        if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                            *degree = degree.saturating_sub(1);
                            if *degree == 0 {
                                next_level.push(dependent.as_str());
                                processed.insert(dependent.as_str());
                            }
                        }
                    }
                }
            }

            if !next_level.is_empty() {
                // Keep graph order inside a level rather than discovery order.
                next_level.sort_by_key(|name| self.0.get_index_of(*name));
                for name in &next_level {
                    queue.push_back(*name);
                }
                levels.push(next_level.iter().map(|s| s.to_string()).collect());
            }
        }

        let stuck = self
            .0
            .keys()
            .filter(|name| !processed.contains(name.as_str()))
            .cloned()
            .collect();

        (levels, stuck)
    }

    /// Every distinct cycle reachable in the graph, each as a closed path.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut on_cycle: IndexSet<String> = IndexSet::new();

        for name in self.0.keys() {
            if visited.contains(name) || on_cycle.contains(name) {
                continue;
            }
            let mut rec_stack = HashSet::new();
            let mut path = Vec::new();
            if let Some(cycle) =
                dfs_cycle_detection(name, &self.0, &mut visited, &mut rec_stack, &mut path)
            {
                if cycle.iter().any(|member| !on_cycle.contains(member)) {
                    on_cycle.extend(cycle.iter().cloned());
                    cycles.push(cycle);
                }
            }
        }

        cycles
    }
}

impl From<IndexMap<String, Vec<String>>> for DependencyGraph {
    fn from(graph: IndexMap<String, Vec<String>>) -> Self {
        Self(graph)
    }
}

impl From<DependencyGraph> for IndexMap<String, Vec<String>> {
    fn from(graph: DependencyGraph) -> Self {
        graph.0
    }
}

/// Depth-first search with recursion-stack tracking.
///
/// When a back edge reaches a node on the current path, the path segment from that
/// node to the current one, plus the back edge, is the cycle.
fn dfs_cycle_detection(
    node: &str,
    graph: &IndexMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(neighbors) = graph.get(node) {
        for neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                if let Some(cycle_start) = path.iter().position(|x| x == neighbor) {
                    let mut cycle = path[cycle_start..].to_vec();
                    cycle.push(neighbor.clone());
                    return Some(cycle);
                }
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}
