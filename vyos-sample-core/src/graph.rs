//! Graph - Reference graph between the resources of a stack
//!
//! Creation order is never scheduled here: the engine derives it from the
//! same references. The graph exists to reject dangling references and to
//! display a stack as a tree.

use std::collections::{HashMap, HashSet};

use crate::resource::Resource;

/// Dependency between resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Target resource logical ID
    pub target: String,
    /// Referenced attribute (e.g., "Ref", "GroupId")
    pub attribute: String,
    /// Where this reference is used (e.g., "vpc_id")
    pub used_in: String,
}

/// Dependency graph for the resources of one stack
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Logical ID -> list of dependencies
    pub edges: HashMap<String, Vec<Dependency>>,
    /// Reverse edges: target -> list of resources that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,
    /// Every declared logical ID, in declaration order
    nodes: Vec<String>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from declared resources
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut graph = Self::new();
        for resource in resources {
            graph.add_node(resource.logical_id());
            for (used_in, target, attribute) in resource.references() {
                graph.add_edge(
                    resource.logical_id().to_string(),
                    Dependency {
                        target,
                        attribute,
                        used_in,
                    },
                );
            }
        }
        graph
    }

    pub fn add_node(&mut self, name: &str) {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
    }

    /// Add a dependency edge
    pub fn add_edge(&mut self, from: String, dependency: Dependency) {
        let target = dependency.target.clone();
        let dependents = self.reverse_edges.entry(target).or_default();
        if !dependents.contains(&from) {
            dependents.push(from.clone());
        }
        self.edges.entry(from).or_default().push(dependency);
    }

    /// Declared nodes, in declaration order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Get direct dependencies of a resource
    pub fn dependencies_of(&self, resource: &str) -> &[Dependency] {
        self.edges.get(resource).map_or(&[], |v| v.as_slice())
    }

    /// Get resources that depend on this resource
    pub fn dependents_of(&self, resource: &str) -> &[String] {
        self.reverse_edges
            .get(resource)
            .map_or(&[], |v| v.as_slice())
    }

    /// Declared resources that reference nothing, in declaration order
    pub fn root_resources(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| self.dependencies_of(n).is_empty())
            .cloned()
            .collect()
    }

    /// References whose target is not a declared resource, as (from, dependency)
    pub fn dangling(&self) -> Vec<(String, Dependency)> {
        let declared: HashSet<&String> = self.nodes.iter().collect();
        let mut out = Vec::new();
        for node in &self.nodes {
            for dep in self.dependencies_of(node) {
                if !declared.contains(&dep.target) {
                    out.push((node.clone(), dep.clone()));
                }
            }
        }
        out
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.edges.keys() {
            if self.has_cycle_util(node, &mut visited, &mut rec_stack) {
                return true;
            }
        }
        false
    }

    fn has_cycle_util(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
    ) -> bool {
        if rec_stack.contains(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if self.has_cycle_util(&dep.target, visited, rec_stack) {
                    return true;
                }
            }
        }

        rec_stack.remove(node);
        false
    }
}
