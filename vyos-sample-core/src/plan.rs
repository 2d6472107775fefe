//! Plan - What a stack will ask the engine to create
//!
//! A Plan lists the resources of one stack in reference order (a resource
//! appears after everything it refers to). Nothing is executed: the order is
//! for display, and the engine computes its own from the template.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::graph::DependencyGraph;
use crate::resource::Resource;
use crate::stack::Stack;

/// Resources of a stack in reference order
#[derive(Debug, Clone, Default)]
pub struct Plan {
    stack: String,
    resources: Vec<Resource>,
    output_count: usize,
}

impl Plan {
    /// Order the resources of a stack so that referenced resources come first.
    /// Ties keep declaration order. Resources caught in a cycle are appended last.
    pub fn from_stack(stack: &Stack) -> Self {
        let graph = stack.dependency_graph();
        let order = reference_order(&graph);

        let by_id: HashMap<&str, &Resource> = stack
            .resources()
            .iter()
            .map(|r| (r.logical_id(), r))
            .collect();

        Self {
            stack: stack.name().to_string(),
            resources: order
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
                .collect(),
            output_count: stack.outputs().len(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            outputs: self.output_count,
            ..Default::default()
        };
        for resource in &self.resources {
            summary.create += 1;
            *summary
                .by_type
                .entry(resource.id.resource_type.clone())
                .or_insert(0) += 1;
        }
        summary
    }
}

fn reference_order(graph: &DependencyGraph) -> Vec<String> {
    let declared = graph.nodes();
    let mut remaining: HashMap<&str, usize> = declared
        .iter()
        .map(|n| {
            let pending = graph
                .dependencies_of(n)
                .iter()
                .filter(|d| declared.contains(&d.target))
                .map(|d| d.target.as_str())
                .collect::<HashSet<_>>()
                .len();
            (n.as_str(), pending)
        })
        .collect();

    let mut order = Vec::with_capacity(declared.len());
    loop {
        let ready: Vec<&String> = declared
            .iter()
            .filter(|n| remaining.get(n.as_str()) == Some(&0))
            .collect();
        if ready.is_empty() {
            break;
        }
        for node in ready {
            remaining.remove(node.as_str());
            order.push(node.clone());
            for dependent in graph.dependents_of(node) {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    // cycles are rejected by validation; keep them visible anyway
    for node in declared {
        if remaining.contains_key(node.as_str()) {
            order.push(node.clone());
        }
    }
    order
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlanSummary {
    pub create: usize,
    pub outputs: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} outputs",
            self.create, self.outputs
        )
    }
}
