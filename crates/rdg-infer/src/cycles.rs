//! Circular dependency detection over dependency-kind edges.
//!
//! Strongly connected components with more than one member (or a self
//! loop) are circular dependency groups. The graph is stored as-is; cycles
//! are tolerated everywhere and merely reported here.

use rdg_core::model::NodeId;
use rdg_store::StoreSnapshot;
use serde::Serialize;
use std::collections::HashMap;

/// One circular dependency group.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    /// Addresses of the members, in discovery order.
    pub members: Vec<String>,
    /// Human-readable representation: `a → b → a`.
    pub representation: String,
    pub length: usize,
}

/// Report of all circular dependencies found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle_count: usize,
    pub entities_in_cycles: usize,
    pub cycles: Vec<Cycle>,
}

/// Detect circular dependencies among edges of the given types.
pub fn detect(snapshot: &StoreSnapshot, edge_types: &[String]) -> CycleReport {
    let image = snapshot.image();

    // Adjacency restricted to the requested edge kinds.
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut self_loops: Vec<NodeId> = Vec::new();
    for edge in image.all_edges() {
        if !edge_types.iter().any(|t| t == &edge.edge_type) {
            continue;
        }
        if edge.from == edge.to {
            self_loops.push(edge.from);
            continue;
        }
        adjacency.entry(edge.from).or_default().push(edge.to);
    }

    let mut report = CycleReport::default();
    for component in strongly_connected(&adjacency) {
        if component.len() < 2 {
            continue;
        }
        push_cycle(&mut report, snapshot, component);
    }
    for node in self_loops {
        push_cycle(&mut report, snapshot, vec![node]);
    }
    report.cycle_count = report.cycles.len();
    report
}

fn push_cycle(report: &mut CycleReport, snapshot: &StoreSnapshot, members: Vec<NodeId>) {
    let addresses: Vec<String> = members
        .iter()
        .filter_map(|&id| snapshot.node(id).map(|n| n.address.to_string()))
        .collect();
    if addresses.is_empty() {
        return;
    }
    let mut representation = addresses.join(" → ");
    representation.push_str(" → ");
    representation.push_str(&addresses[0]);
    report.entities_in_cycles += addresses.len();
    report.cycles.push(Cycle {
        length: addresses.len(),
        members: addresses,
        representation,
    });
}

/// Iterative Tarjan strongly-connected components.
fn strongly_connected(adjacency: &HashMap<NodeId, Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    #[derive(Default, Clone)]
    struct NodeState {
        index: Option<usize>,
        lowlink: usize,
        on_stack: bool,
    }

    let mut states: HashMap<NodeId, NodeState> = HashMap::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut components: Vec<Vec<NodeId>> = Vec::new();
    let mut next_index = 0usize;

    let mut roots: Vec<NodeId> = adjacency.keys().copied().collect();
    roots.sort_unstable();

    for root in roots {
        if states.get(&root).and_then(|s| s.index).is_some() {
            continue;
        }
        // Explicit work stack: (node, next child offset).
        let mut work: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some(&mut (node, ref mut child_offset)) = work.last_mut() {
            if *child_offset == 0 {
                let state = states.entry(node).or_default();
                state.index = Some(next_index);
                state.lowlink = next_index;
                state.on_stack = true;
                next_index += 1;
                stack.push(node);
            }
            let neighbors = adjacency.get(&node).map_or(&[] as &[NodeId], |v| v.as_slice());
            if *child_offset < neighbors.len() {
                let next = neighbors[*child_offset];
                *child_offset += 1;
                match states.get(&next).and_then(|s| s.index) {
                    None => work.push((next, 0)),
                    Some(next_index_value) => {
                        let on_stack = states.get(&next).is_some_and(|s| s.on_stack);
                        if on_stack {
                            let state = states.entry(node).or_default();
                            state.lowlink = state.lowlink.min(next_index_value);
                        }
                    }
                }
                continue;
            }

            // Node finished: pop, propagate lowlink, emit component roots.
            work.pop();
            let (node_lowlink, node_index) = {
                let state = &states[&node];
                (state.lowlink, state.index.expect("visited"))
            };
            if let Some(&(parent, _)) = work.last() {
                let parent_state = states.entry(parent).or_default();
                parent_state.lowlink = parent_state.lowlink.min(node_lowlink);
            }
            if node_lowlink == node_index {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    states.entry(member).or_default().on_stack = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.reverse();
                components.push(component);
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdg_core::address::{NodeType, RdfAddress};
    use rdg_core::edge_types::EdgeTypeRegistry;
    use rdg_core::model::{EdgeDraft, NodeDraft};
    use rdg_store::GraphStore;
    use std::sync::Arc;

    fn store_with_edges(edges: &[(&str, &str)]) -> GraphStore {
        let store = GraphStore::new(Arc::new(EdgeTypeRegistry::standard()));
        store
            .transaction(|tx| {
                for (from, to) in edges {
                    for path in [from, to] {
                        tx.upsert_node(
                            &NodeDraft::new(
                                RdfAddress::file("proj", path).unwrap(),
                                NodeType::File,
                                *path,
                            )
                            .with_source_file(*path),
                        )?;
                    }
                    tx.upsert_edge(&EdgeDraft::new(
                        RdfAddress::file("proj", from).unwrap(),
                        RdfAddress::file("proj", to).unwrap(),
                        "imports_file",
                    ))?;
                }
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let store = store_with_edges(&[("a.ts", "b.ts"), ("b.ts", "c.ts")]);
        let report = detect(&store.snapshot(), &["imports_file".to_string()]);
        assert_eq!(report.cycle_count, 0);
    }

    #[test]
    fn two_node_cycle_is_reported_once() {
        let store = store_with_edges(&[("a.ts", "b.ts"), ("b.ts", "a.ts")]);
        let report = detect(&store.snapshot(), &["imports_file".to_string()]);
        assert_eq!(report.cycle_count, 1);
        assert_eq!(report.cycles[0].length, 2);
        assert_eq!(report.entities_in_cycles, 2);
    }

    #[test]
    fn disjoint_cycles_are_separate() {
        let store = store_with_edges(&[
            ("a.ts", "b.ts"),
            ("b.ts", "a.ts"),
            ("x.ts", "y.ts"),
            ("y.ts", "z.ts"),
            ("z.ts", "x.ts"),
            ("z.ts", "a.ts"),
        ]);
        let report = detect(&store.snapshot(), &["imports_file".to_string()]);
        assert_eq!(report.cycle_count, 2);
        let lengths: Vec<usize> = report.cycles.iter().map(|c| c.length).collect();
        assert!(lengths.contains(&2));
        assert!(lengths.contains(&3));
    }

    #[test]
    fn edge_kind_filter_applies() {
        let store = store_with_edges(&[("a.ts", "b.ts"), ("b.ts", "a.ts")]);
        let report = detect(&store.snapshot(), &["calls".to_string()]);
        assert_eq!(report.cycle_count, 0);
    }
}
