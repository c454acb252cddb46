//! Dependency-ordered load via Kahn's topological sort.

use forge_core::error::{ForgeError, Result};
use forge_core::id::ModuleId;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::warn;

/// One node submitted for topological ordering: an id plus its required
/// and optional dependency ids.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// This node's module id.
    pub id: ModuleId,
    /// Dependencies that must be present in the batch or discovery raises.
    pub required: Vec<ModuleId>,
    /// Dependencies that may be silently skipped if absent.
    pub optional: Vec<ModuleId>,
}

/// Resolve a load order over `nodes` using Kahn's algorithm with
/// alphabetical tie-breaking among nodes whose in-degree reaches zero
/// simultaneously.
///
/// Missing optional dependencies are warned and dropped from the graph.
/// Missing required dependencies raise [`ForgeError::ModuleLoadError`].
/// A cycle raises [`ForgeError::CircularDependency`] with a reconstructed
/// (not necessarily shortest) cycle path.
pub fn topological_order(nodes: Vec<DependencyNode>) -> Result<Vec<ModuleId>> {
    let known: BTreeSet<ModuleId> = nodes.iter().map(|n| n.id.clone()).collect();

    // edges: dependency -> dependents (what unblocks when `dependency` loads)
    let mut edges: HashMap<ModuleId, Vec<ModuleId>> = HashMap::new();
    let mut in_degree: HashMap<ModuleId, usize> = HashMap::new();

    for node in &nodes {
        in_degree.entry(node.id.clone()).or_insert(0);

        for dep in &node.required {
            if !known.contains(dep) {
                return Err(ForgeError::ModuleLoadError {
                    module_id: node.id.to_string(),
                    reason: format!("missing required dependency '{dep}'"),
                });
            }
            edges.entry(dep.clone()).or_default().push(node.id.clone());
            *in_degree.entry(node.id.clone()).or_insert(0) += 1;
        }

        for dep in &node.optional {
            if !known.contains(dep) {
                warn!(module_id = %node.id, dependency = %dep, "optional dependency missing, skipping edge");
                continue;
            }
            edges.entry(dep.clone()).or_default().push(node.id.clone());
            *in_degree.entry(node.id.clone()).or_insert(0) += 1;
        }
    }

    // BTreeSet of (id) with in_degree 0 gives alphabetical tie-breaking for free.
    let mut ready: BTreeSet<ModuleId> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut remaining_in_degree = in_degree.clone();

    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        order.push(next.clone());

        if let Some(dependents) = edges.get(&next) {
            let mut newly_ready: Vec<ModuleId> = Vec::new();
            for dependent in dependents {
                let deg = remaining_in_degree.get_mut(dependent).expect("dependent must be tracked");
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(dependent.clone());
                }
            }
            for id in newly_ready {
                ready.insert(id);
            }
        }
    }

    if order.len() != nodes.len() {
        let processed: BTreeSet<ModuleId> = order.iter().cloned().collect();
        let cycle = reconstruct_cycle(&nodes, &processed);
        return Err(ForgeError::CircularDependency { cycle_path: cycle });
    }

    Ok(order)
}

/// Pick an arbitrary unprocessed node and follow its first remaining
/// required-dependency edge repeatedly until a previously-visited node
/// recurs. Not guaranteed to be the shortest cycle, only a real one.
fn reconstruct_cycle(nodes: &[DependencyNode], processed: &BTreeSet<ModuleId>) -> Vec<ModuleId> {
    let by_id: BTreeMap<&ModuleId, &DependencyNode> = nodes.iter().map(|n| (&n.id, n)).collect();
    let unprocessed: Vec<&ModuleId> = nodes
        .iter()
        .map(|n| &n.id)
        .filter(|id| !processed.contains(*id))
        .collect();

    let Some(&start) = unprocessed.first() else {
        return Vec::new();
    };

    let mut path = vec![start.clone()];
    let mut seen: BTreeSet<ModuleId> = BTreeSet::new();
    seen.insert(start.clone());
    let mut current = start;

    loop {
        let Some(node) = by_id.get(current) else {
            break;
        };
        let Some(next) = node
            .required
            .iter()
            .chain(node.optional.iter())
            .find(|dep| !processed.contains(*dep))
        else {
            break;
        };

        path.push(next.clone());
        if seen.contains(next) {
            break;
        }
        seen.insert(next.clone());
        current = next;
    }

    path
}
