//! The dependency graph: orders a script's declarations so every statement
//! executes after the declarations its operands reference.
//!
//! Kahn's algorithm over an adjacency map keyed by declaration name, with a
//! textual tie-break (ready nodes are drained in declaration order each
//! round) so the same script always schedules identically.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Operand, Script};
use crate::error::SpockError;

/// A scheduled declaration order: statements grouped by declaration name,
/// topologically sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub order: Vec<String>,
}

/// Builds the dependency graph for a script's declarations and returns a
/// topological order. `Cycle` is returned with the name of one declaration
/// on the cycle (the first one Kahn's algorithm cannot retire).
pub fn schedule(script: &Script) -> Result<Schedule, SpockError> {
    let mut edges: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut indegree: IndexMap<String, usize> = IndexMap::new();

    for stmt in script.statements() {
        edges.entry(stmt.declaration.clone()).or_default();
        indegree.entry(stmt.declaration.clone()).or_insert(0);

        for operand in [&stmt.subject, &stmt.object] {
            if let Operand::Reference(name) = operand {
                edges.entry(name.clone()).or_default();
                indegree.entry(name.clone()).or_insert(0);
                if edges[name].insert(stmt.declaration.clone()) {
                    *indegree.entry(stmt.declaration.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    let declaration_order: Vec<String> = script.statements().into_iter().map(|s| s.declaration.clone()).collect();

    let mut ready: Vec<String> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| name.clone())
        .collect();
    ready.sort_by_key(|name| declaration_order.iter().position(|d| d == name).unwrap_or(usize::MAX));

    let mut order = Vec::with_capacity(indegree.len());
    let mut remaining = indegree.clone();

    while !ready.is_empty() {
        ready.sort_by_key(|name| declaration_order.iter().position(|d| d == name).unwrap_or(usize::MAX));
        let next = ready.remove(0);
        order.push(next.clone());

        if let Some(dependents) = edges.get(&next) {
            for dependent in dependents {
                let deg = remaining.get_mut(dependent).expect("dependent tracked in indegree");
                *deg -= 1;
                if *deg == 0 {
                    ready.push(dependent.clone());
                }
            }
        }
    }

    if order.len() != indegree.len() {
        let stuck = indegree
            .keys()
            .find(|name| !order.contains(name))
            .cloned()
            .unwrap_or_default();
        return Err(SpockError::Cycle { declaration: stuck });
    }

    Ok(Schedule { order })
}
