//! Neighborhood exploration: a bounded BFS from a node, returned as a
//! tree for display and API consumers.

use rdg_core::address::NodeType;
use rdg_core::model::NodeId;
use rdg_store::{Direction, StoreSnapshot};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// A node in the exploration result tree.
#[derive(Debug, Clone, Serialize)]
pub struct ExploreNode {
    pub address: String,
    pub name: String,
    pub node_type: String,
    /// The edge that led here; absent on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    /// "out" when the parent points at this node, "in" when this node
    /// points at the parent; absent on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExploreNode>,
}

/// Explore the graph from a starting node, following edges in the given
/// direction up to `max_depth`. A node appears at most once, at its first
/// (shallowest) discovery.
pub fn explore(
    snapshot: &StoreSnapshot,
    start: NodeId,
    direction: Direction,
    max_depth: usize,
    edge_types: Option<&[String]>,
    node_types: Option<&[NodeType]>,
) -> Option<ExploreNode> {
    let start_node = snapshot.node(start)?;
    let mut root = ExploreNode {
        address: start_node.address.to_string(),
        name: start_node.name.clone(),
        node_type: start_node.node_type.as_str().to_string(),
        edge_type: None,
        direction: None,
        depth: 0,
        children: Vec::new(),
    };

    let mut visited: HashSet<NodeId> = HashSet::from([start]);
    // (node, depth, index path into the tree)
    let mut queue: VecDeque<(NodeId, usize, Vec<usize>)> = VecDeque::from([(start, 0, Vec::new())]);

    while let Some((current, depth, path)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let outgoing = matches!(direction, Direction::Out | Direction::Both);
        let incoming = matches!(direction, Direction::In | Direction::Both);
        let mut steps: Vec<(NodeId, String, &'static str)> = Vec::new();
        if outgoing {
            for edge in snapshot.neighbors(current, Direction::Out, edge_types) {
                steps.push((edge.to, edge.edge_type.clone(), "out"));
            }
        }
        if incoming {
            for edge in snapshot.neighbors(current, Direction::In, edge_types) {
                steps.push((edge.from, edge.edge_type.clone(), "in"));
            }
        }

        for (next, edge_type, dir) in steps {
            if !visited.insert(next) {
                continue;
            }
            let Some(node) = snapshot.node(next) else {
                continue;
            };
            if let Some(kinds) = node_types
                && !kinds.contains(&node.node_type)
            {
                continue;
            }
            let child = ExploreNode {
                address: node.address.to_string(),
                name: node.name.clone(),
                node_type: node.node_type.as_str().to_string(),
                edge_type: Some(edge_type),
                direction: Some(dir),
                depth: depth + 1,
                children: Vec::new(),
            };
            let parent = node_at_path(&mut root, &path);
            parent.children.push(child);
            let mut child_path = path.clone();
            child_path.push(parent.children.len() - 1);
            queue.push_back((next, depth + 1, child_path));
        }
    }

    Some(root)
}

fn node_at_path<'a>(root: &'a mut ExploreNode, path: &[usize]) -> &'a mut ExploreNode {
    let mut current = root;
    for &index in path {
        current = &mut current.children[index];
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdg_core::address::RdfAddress;
    use rdg_core::edge_types::EdgeTypeRegistry;
    use rdg_core::model::{EdgeDraft, NodeDraft};
    use rdg_store::GraphStore;
    use std::sync::Arc;

    fn chain_store() -> (GraphStore, NodeId) {
        let store = GraphStore::new(Arc::new(EdgeTypeRegistry::standard()));
        let root = store
            .transaction(|tx| {
                let mut first = None;
                for path in ["a.ts", "b.ts", "c.ts"] {
                    let id = tx.upsert_node(
                        &NodeDraft::new(
                            RdfAddress::file("proj", path).unwrap(),
                            NodeType::File,
                            path,
                        )
                        .with_source_file(path),
                    )?;
                    if first.is_none() {
                        first = Some(id);
                    }
                }
                for (from, to) in [("a.ts", "b.ts"), ("b.ts", "c.ts")] {
                    tx.upsert_edge(&EdgeDraft::new(
                        RdfAddress::file("proj", from).unwrap(),
                        RdfAddress::file("proj", to).unwrap(),
                        "imports_file",
                    ))?;
                }
                Ok(first.expect("nodes inserted"))
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn downstream_chain_builds_nested_tree() {
        let (store, root_id) = chain_store();
        let tree = explore(
            &store.snapshot(),
            root_id,
            Direction::Out,
            5,
            None,
            None,
        )
        .unwrap();
        assert_eq!(tree.address, "proj/a.ts");
        assert_eq!(tree.children.len(), 1);
        let b = &tree.children[0];
        assert_eq!(b.address, "proj/b.ts");
        assert_eq!(b.direction, Some("out"));
        assert_eq!(b.depth, 1);
        assert_eq!(b.children[0].address, "proj/c.ts");
        assert_eq!(b.children[0].depth, 2);
    }

    #[test]
    fn depth_limit_cuts_the_tree() {
        let (store, root_id) = chain_store();
        let tree = explore(&store.snapshot(), root_id, Direction::Out, 1, None, None).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn upstream_walks_incoming_edges() {
        let (store, _) = chain_store();
        let c = store
            .node_by_address(&RdfAddress::parse("proj/c.ts").unwrap())
            .unwrap();
        let tree = explore(&store.snapshot(), c.id, Direction::In, 5, None, None).unwrap();
        assert_eq!(tree.children[0].address, "proj/b.ts");
        assert_eq!(tree.children[0].direction, Some("in"));
        assert_eq!(tree.children[0].children[0].address, "proj/a.ts");
    }

    #[test]
    fn edge_type_filter_applies() {
        let (store, root_id) = chain_store();
        let tree = explore(
            &store.snapshot(),
            root_id,
            Direction::Out,
            5,
            Some(&["calls".to_string()]),
            None,
        )
        .unwrap();
        assert!(tree.children.is_empty());
    }

    #[test]
    fn unknown_start_is_none() {
        let (store, _) = chain_store();
        assert!(explore(
            &store.snapshot(),
            NodeId(9999),
            Direction::Both,
            2,
            None,
            None
        )
        .is_none());
    }
}
