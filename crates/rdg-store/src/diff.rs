//! Graph diff computation between two store images.
//!
//! Identity follows the external contract: nodes compare by address, edges
//! by their `(from, to, edge_type)` address triple, so images from
//! different store instances (different surrogate ids) diff correctly.

use crate::store::StoreImage;
use serde::Serialize;
use std::collections::BTreeMap;

/// An edge identified by its endpoint addresses and type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
    pub edge_type: String,
}

/// Changes between two graph states.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphDiff {
    /// Addresses present only in the new image.
    pub added_nodes: Vec<String>,
    /// Addresses present only in the old image.
    pub removed_nodes: Vec<String>,
    /// Addresses present in both whose name, properties, or tags changed.
    pub modified_nodes: Vec<String>,
    pub added_edges: Vec<EdgeKey>,
    pub removed_edges: Vec<EdgeKey>,
}

impl GraphDiff {
    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.modified_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

fn edge_keys(image: &StoreImage) -> Vec<EdgeKey> {
    let by_id: BTreeMap<u64, String> = image
        .all_nodes()
        .map(|n| (n.id.0, n.address.to_string()))
        .collect();
    let mut keys: Vec<EdgeKey> = image
        .all_edges()
        .filter_map(|e| {
            Some(EdgeKey {
                from: by_id.get(&e.from.0)?.clone(),
                to: by_id.get(&e.to.0)?.clone(),
                edge_type: e.edge_type.clone(),
            })
        })
        .collect();
    keys.sort();
    keys
}

/// Compute the difference between two graph states.
///
/// Timestamps are not compared; a node counts as modified only when its
/// name, properties, or semantic tags differ.
pub fn compute(old: &StoreImage, new: &StoreImage) -> GraphDiff {
    let mut diff = GraphDiff::default();

    let old_nodes: BTreeMap<String, _> = old
        .all_nodes()
        .map(|n| (n.address.to_string(), n))
        .collect();
    let new_nodes: BTreeMap<String, _> = new
        .all_nodes()
        .map(|n| (n.address.to_string(), n))
        .collect();

    for (address, node) in &new_nodes {
        match old_nodes.get(address) {
            None => diff.added_nodes.push(address.clone()),
            Some(previous) => {
                if previous.name != node.name
                    || previous.properties != node.properties
                    || previous.semantic_tags != node.semantic_tags
                {
                    diff.modified_nodes.push(address.clone());
                }
            }
        }
    }
    for address in old_nodes.keys() {
        if !new_nodes.contains_key(address) {
            diff.removed_nodes.push(address.clone());
        }
    }

    let old_edges = edge_keys(old);
    let new_edges = edge_keys(new);
    for key in &new_edges {
        if old_edges.binary_search(key).is_err() {
            diff.added_edges.push(key.clone());
        }
    }
    for key in &old_edges {
        if new_edges.binary_search(key).is_err() {
            diff.removed_edges.push(key.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphStore;
    use rdg_core::address::{NodeType, RdfAddress};
    use rdg_core::edge_types::EdgeTypeRegistry;
    use rdg_core::model::{EdgeDraft, NodeDraft};
    use std::sync::Arc;

    fn store() -> GraphStore {
        GraphStore::new(Arc::new(EdgeTypeRegistry::standard()))
    }

    fn file_draft(path: &str) -> NodeDraft {
        NodeDraft::new(
            RdfAddress::file("proj", path).unwrap(),
            NodeType::File,
            path,
        )
        .with_source_file(path)
    }

    #[test]
    fn identical_images_diff_empty() {
        let a = store();
        a.transaction(|tx| tx.upsert_node(&file_draft("a.ts"))).unwrap();
        let diff = compute(&a.image(), &a.image());
        assert!(diff.is_empty());
    }

    #[test]
    fn added_and_removed_nodes() {
        let old = store();
        old.transaction(|tx| tx.upsert_node(&file_draft("a.ts"))).unwrap();
        let new = store();
        new.transaction(|tx| tx.upsert_node(&file_draft("b.ts"))).unwrap();

        let diff = compute(&old.image(), &new.image());
        assert_eq!(diff.added_nodes, vec!["proj/b.ts"]);
        assert_eq!(diff.removed_nodes, vec!["proj/a.ts"]);
    }

    #[test]
    fn property_change_is_modification() {
        let old = store();
        old.transaction(|tx| tx.upsert_node(&file_draft("a.ts"))).unwrap();
        let new = store();
        new.transaction(|tx| {
            tx.upsert_node(&file_draft("a.ts").with_property("loc", serde_json::json!(9)))
        })
        .unwrap();

        let diff = compute(&old.image(), &new.image());
        assert_eq!(diff.modified_nodes, vec!["proj/a.ts"]);
        assert!(diff.added_nodes.is_empty());
    }

    #[test]
    fn edges_diff_by_address_triple_not_surrogate_id() {
        let old = store();
        old.transaction(|tx| {
            tx.upsert_node(&file_draft("a.ts"))?;
            tx.upsert_node(&file_draft("b.ts"))?;
            tx.upsert_edge(&EdgeDraft::new(
                RdfAddress::file("proj", "a.ts").unwrap(),
                RdfAddress::file("proj", "b.ts").unwrap(),
                "imports_file",
            ))
        })
        .unwrap();

        // Same logical content, different insertion order (different ids).
        let new = store();
        new.transaction(|tx| {
            tx.upsert_node(&file_draft("b.ts"))?;
            tx.upsert_node(&file_draft("a.ts"))?;
            tx.upsert_edge(&EdgeDraft::new(
                RdfAddress::file("proj", "a.ts").unwrap(),
                RdfAddress::file("proj", "b.ts").unwrap(),
                "imports_file",
            ))
        })
        .unwrap();

        let diff = compute(&old.image(), &new.image());
        assert!(diff.added_edges.is_empty());
        assert!(diff.removed_edges.is_empty());
    }
}
