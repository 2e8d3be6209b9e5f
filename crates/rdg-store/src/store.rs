//! In-memory indexed graph store with merge-on-upsert semantics.
//!
//! All mutation goes through [`GraphStore::transaction`]: one transaction per
//! analyzed file, serialized on the store's write lock. On error the
//! pre-transaction image is restored, so a failed file leaves no partial
//! writes. Readers take snapshots and never block behind a transaction's
//! intermediate state.

use chrono::{DateTime, Utc};
use rdg_core::address::{NodeType, RdfAddress};
use rdg_core::edge_types::EdgeTypeRegistry;
use rdg_core::error::MergeError;
use rdg_core::model::{EdgeDraft, EdgeId, GraphEdge, GraphNode, NodeDraft, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Traversal direction for [`GraphStore::neighbors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Criteria for node lookup. All present criteria are ANDed.
#[derive(Debug, Clone, Default)]
pub struct NodeCriteria {
    pub addresses: Option<Vec<RdfAddress>>,
    pub node_types: Option<Vec<NodeType>>,
    /// Every listed tag must be present on the node.
    pub semantic_tags: Option<Vec<String>>,
    pub source_files: Option<Vec<String>>,
    /// Namespace filter: matches the project segment of the address.
    pub projects: Option<Vec<String>>,
}

/// Criteria for edge lookup. All present criteria are ANDed.
#[derive(Debug, Clone, Default)]
pub struct EdgeCriteria {
    pub from: Option<Vec<NodeId>>,
    pub to: Option<Vec<NodeId>>,
    pub edge_types: Option<Vec<String>>,
}

/// The serializable store image. Performance indexes are skipped during
/// (de)serialization and rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreImage {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    next_node_id: u64,
    next_edge_id: u64,
    nodes: BTreeMap<u64, GraphNode>,
    edges: BTreeMap<u64, GraphEdge>,
    #[serde(skip)]
    address_index: HashMap<String, u64>,
    #[serde(skip)]
    node_type_index: HashMap<String, Vec<u64>>,
    #[serde(skip)]
    source_file_index: HashMap<String, Vec<u64>>,
    #[serde(skip)]
    edge_type_index: HashMap<String, Vec<u64>>,
    #[serde(skip)]
    out_index: HashMap<u64, Vec<u64>>,
    #[serde(skip)]
    in_index: HashMap<u64, Vec<u64>>,
    #[serde(skip)]
    from_type_index: HashMap<(u64, String), Vec<u64>>,
    #[serde(skip)]
    to_type_index: HashMap<(u64, String), Vec<u64>>,
    #[serde(skip)]
    edge_key_index: HashMap<(u64, u64, String), u64>,
}

impl Default for StoreImage {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: crate::storage::FORMAT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            next_node_id: 1,
            next_edge_id: 1,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            address_index: HashMap::new(),
            node_type_index: HashMap::new(),
            source_file_index: HashMap::new(),
            edge_type_index: HashMap::new(),
            out_index: HashMap::new(),
            in_index: HashMap::new(),
            from_type_index: HashMap::new(),
            to_type_index: HashMap::new(),
            edge_key_index: HashMap::new(),
        }
    }
}

impl StoreImage {
    /// Rebuild all performance indexes from the node and edge maps.
    /// Call after deserialization.
    pub fn rebuild_indexes(&mut self) {
        self.address_index.clear();
        self.node_type_index.clear();
        self.source_file_index.clear();
        self.edge_type_index.clear();
        self.out_index.clear();
        self.in_index.clear();
        self.from_type_index.clear();
        self.to_type_index.clear();
        self.edge_key_index.clear();
        for (&id, node) in &self.nodes {
            self.address_index.insert(node.address.to_string(), id);
            self.node_type_index
                .entry(node.node_type.as_str().to_string())
                .or_default()
                .push(id);
            if let Some(file) = &node.source_file {
                self.source_file_index
                    .entry(file.clone())
                    .or_default()
                    .push(id);
            }
        }
        for (&id, edge) in &self.edges {
            Self::index_edge(
                &mut self.edge_type_index,
                &mut self.out_index,
                &mut self.in_index,
                &mut self.from_type_index,
                &mut self.to_type_index,
                &mut self.edge_key_index,
                id,
                edge,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn index_edge(
        edge_type_index: &mut HashMap<String, Vec<u64>>,
        out_index: &mut HashMap<u64, Vec<u64>>,
        in_index: &mut HashMap<u64, Vec<u64>>,
        from_type_index: &mut HashMap<(u64, String), Vec<u64>>,
        to_type_index: &mut HashMap<(u64, String), Vec<u64>>,
        edge_key_index: &mut HashMap<(u64, u64, String), u64>,
        id: u64,
        edge: &GraphEdge,
    ) {
        edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .push(id);
        out_index.entry(edge.from.0).or_default().push(id);
        in_index.entry(edge.to.0).or_default().push(id);
        from_type_index
            .entry((edge.from.0, edge.edge_type.clone()))
            .or_default()
            .push(id);
        to_type_index
            .entry((edge.to.0, edge.edge_type.clone()))
            .or_default()
            .push(id);
        edge_key_index.insert((edge.from.0, edge.to.0, edge.edge_type.clone()), id);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(&id.0)
    }

    pub fn node_by_address(&self, address: &RdfAddress) -> Option<&GraphNode> {
        let id = self.address_index.get(&address.to_string())?;
        self.nodes.get(id)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    pub fn find_nodes(&self, criteria: &NodeCriteria) -> Vec<&GraphNode> {
        // Seed candidates from the most selective available index.
        let candidates: Vec<u64> = if let Some(addresses) = &criteria.addresses {
            addresses
                .iter()
                .filter_map(|a| self.address_index.get(&a.to_string()).copied())
                .collect()
        } else if let Some(files) = &criteria.source_files {
            files
                .iter()
                .flat_map(|f| self.source_file_index.get(f).cloned().unwrap_or_default())
                .collect()
        } else if let Some(types) = &criteria.node_types {
            types
                .iter()
                .flat_map(|t| {
                    self.node_type_index
                        .get(t.as_str())
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        } else {
            self.nodes.keys().copied().collect()
        };

        let mut result: Vec<&GraphNode> = candidates
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .filter(|node| {
                if let Some(types) = &criteria.node_types
                    && !types.contains(&node.node_type)
                {
                    return false;
                }
                if let Some(files) = &criteria.source_files
                    && node.source_file.as_ref().is_none_or(|f| !files.contains(f))
                {
                    return false;
                }
                if let Some(tags) = &criteria.semantic_tags
                    && !tags.iter().all(|t| node.semantic_tags.contains(t))
                {
                    return false;
                }
                if let Some(projects) = &criteria.projects
                    && node
                        .address
                        .project()
                        .is_none_or(|p| !projects.iter().any(|q| q == p))
                {
                    return false;
                }
                true
            })
            .collect();
        result.sort_by_key(|n| n.id);
        result.dedup_by_key(|n| n.id);
        result
    }

    pub fn find_edges(&self, criteria: &EdgeCriteria) -> Vec<&GraphEdge> {
        let candidates: Vec<u64> = match (&criteria.from, &criteria.edge_types) {
            (Some(from), Some(types)) => from
                .iter()
                .flat_map(|f| {
                    types.iter().flat_map(|t| {
                        self.from_type_index
                            .get(&(f.0, t.clone()))
                            .cloned()
                            .unwrap_or_default()
                    })
                })
                .collect(),
            (Some(from), None) => from
                .iter()
                .flat_map(|f| self.out_index.get(&f.0).cloned().unwrap_or_default())
                .collect(),
            (None, Some(types)) => types
                .iter()
                .flat_map(|t| self.edge_type_index.get(t).cloned().unwrap_or_default())
                .collect(),
            (None, None) => match &criteria.to {
                Some(to) => to
                    .iter()
                    .flat_map(|t| self.in_index.get(&t.0).cloned().unwrap_or_default())
                    .collect(),
                None => self.edges.keys().copied().collect(),
            },
        };

        let mut result: Vec<&GraphEdge> = candidates
            .into_iter()
            .filter_map(|id| self.edges.get(&id))
            .filter(|edge| {
                if let Some(from) = &criteria.from
                    && !from.contains(&edge.from)
                {
                    return false;
                }
                if let Some(to) = &criteria.to
                    && !to.contains(&edge.to)
                {
                    return false;
                }
                if let Some(types) = &criteria.edge_types
                    && !types.contains(&edge.edge_type)
                {
                    return false;
                }
                true
            })
            .collect();
        result.sort_by_key(|e| e.id);
        result.dedup_by_key(|e| e.id);
        result
    }

    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
        edge_types: Option<&[String]>,
    ) -> Vec<&GraphEdge> {
        let mut ids: Vec<u64> = Vec::new();
        let outgoing = matches!(direction, Direction::Out | Direction::Both);
        let incoming = matches!(direction, Direction::In | Direction::Both);
        match edge_types {
            Some(types) => {
                for ty in types {
                    if outgoing && let Some(v) = self.from_type_index.get(&(node.0, ty.clone())) {
                        ids.extend(v);
                    }
                    if incoming && let Some(v) = self.to_type_index.get(&(node.0, ty.clone())) {
                        ids.extend(v);
                    }
                }
            }
            None => {
                if outgoing && let Some(v) = self.out_index.get(&node.0) {
                    ids.extend(v);
                }
                if incoming && let Some(v) = self.in_index.get(&node.0) {
                    ids.extend(v);
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().filter_map(|id| self.edges.get(&id)).collect()
    }

    /// Remove a node and its edges without touching the secondary indexes;
    /// the caller rebuilds them once after a batch of removals.
    fn remove_node_unindexed(&mut self, id: u64) -> Option<GraphNode> {
        let node = self.nodes.remove(&id)?;
        let edge_ids: Vec<u64> = self
            .edges
            .iter()
            .filter(|(_, e)| e.from.0 == id || e.to.0 == id)
            .map(|(&eid, _)| eid)
            .collect();
        for eid in edge_ids {
            self.edges.remove(&eid);
        }
        Some(node)
    }
}

/// A read-only consistent view of the store at a point in time.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    image: StoreImage,
}

impl StoreSnapshot {
    pub fn image(&self) -> &StoreImage {
        &self.image
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.image.node(id)
    }

    pub fn node_by_address(&self, address: &RdfAddress) -> Option<&GraphNode> {
        self.image.node_by_address(address)
    }

    pub fn find_nodes(&self, criteria: &NodeCriteria) -> Vec<&GraphNode> {
        self.image.find_nodes(criteria)
    }

    pub fn find_edges(&self, criteria: &EdgeCriteria) -> Vec<&GraphEdge> {
        self.image.find_edges(criteria)
    }

    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
        edge_types: Option<&[String]>,
    ) -> Vec<&GraphEdge> {
        self.image.neighbors(node, direction, edge_types)
    }

    pub fn node_count(&self) -> usize {
        self.image.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.image.edge_count()
    }
}

/// A mutation scope over the store. Created by [`GraphStore::transaction`];
/// all writes inside one transaction commit or roll back together.
pub struct Transaction<'a> {
    image: &'a mut StoreImage,
    registry: &'a EdgeTypeRegistry,
    now: DateTime<Utc>,
}

impl Transaction<'_> {
    /// Idempotent on address. Existing nodes are shallow-merged: new
    /// property keys overwrite, semantic tags union, `updated_at` bumps.
    /// The node type is locked at creation; a mismatch fails the transaction.
    pub fn upsert_node(&mut self, draft: &NodeDraft) -> Result<NodeId, MergeError> {
        let key = draft.address.to_string();
        if let Some(&id) = self.image.address_index.get(&key) {
            let node = self
                .image
                .nodes
                .get_mut(&id)
                .expect("address index points at a live node");
            if node.node_type != draft.node_type {
                return Err(MergeError::NodeTypeLock {
                    address: key,
                    existing: node.node_type.as_str().to_string(),
                    incoming: draft.node_type.as_str().to_string(),
                });
            }
            for (k, v) in &draft.properties {
                node.properties.insert(k.clone(), v.clone());
            }
            node.semantic_tags
                .extend(draft.semantic_tags.iter().cloned());
            node.name.clone_from(&draft.name);
            if draft.language.is_some() {
                node.language.clone_from(&draft.language);
            }
            if draft.source_file != node.source_file {
                if let Some(old) = &node.source_file
                    && let Some(ids) = self.image.source_file_index.get_mut(old)
                {
                    ids.retain(|&i| i != id);
                }
                node.source_file.clone_from(&draft.source_file);
                if let Some(new) = &node.source_file {
                    self.image
                        .source_file_index
                        .entry(new.clone())
                        .or_default()
                        .push(id);
                }
            }
            node.updated_at = self.now;
            return Ok(NodeId(id));
        }

        let id = self.image.next_node_id;
        self.image.next_node_id += 1;
        let node = GraphNode {
            id: NodeId(id),
            address: draft.address.clone(),
            node_type: draft.node_type.clone(),
            name: draft.name.clone(),
            source_file: draft.source_file.clone(),
            language: draft.language.clone(),
            semantic_tags: draft.semantic_tags.clone(),
            properties: draft.properties.clone(),
            created_at: self.now,
            updated_at: self.now,
        };
        self.image.address_index.insert(key, id);
        self.image
            .node_type_index
            .entry(node.node_type.as_str().to_string())
            .or_default()
            .push(id);
        if let Some(file) = &node.source_file {
            self.image
                .source_file_index
                .entry(file.clone())
                .or_default()
                .push(id);
        }
        self.image.nodes.insert(id, node);
        Ok(NodeId(id))
    }

    /// Idempotent on `(from, to, edge_type)`; existing edges merge
    /// properties and keep everything else. Both endpoints must exist (in
    /// the store or earlier in this transaction) and the edge type must be
    /// registered.
    pub fn upsert_edge(&mut self, draft: &EdgeDraft) -> Result<EdgeId, MergeError> {
        if !self.registry.contains(&draft.edge_type) {
            return Err(MergeError::UnregisteredEdgeType(draft.edge_type.clone()));
        }
        let from = self.resolve(&draft.from)?;
        let to = self.resolve(&draft.to)?;
        let key = (from.0, to.0, draft.edge_type.clone());
        if let Some(&id) = self.image.edge_key_index.get(&key) {
            let edge = self
                .image
                .edges
                .get_mut(&id)
                .expect("edge key index points at a live edge");
            for (k, v) in &draft.properties {
                edge.properties.insert(k.clone(), v.clone());
            }
            return Ok(EdgeId(id));
        }

        let id = self.image.next_edge_id;
        self.image.next_edge_id += 1;
        let edge = GraphEdge {
            id: EdgeId(id),
            from,
            to,
            edge_type: draft.edge_type.clone(),
            properties: draft.properties.clone(),
            source_file: draft.source_file.clone(),
        };
        StoreImage::index_edge(
            &mut self.image.edge_type_index,
            &mut self.image.out_index,
            &mut self.image.in_index,
            &mut self.image.from_type_index,
            &mut self.image.to_type_index,
            &mut self.image.edge_key_index,
            id,
            &edge,
        );
        self.image.edges.insert(id, edge);
        Ok(EdgeId(id))
    }

    /// Attach a semantic tag to an existing node.
    pub fn tag_node(&mut self, address: &RdfAddress, tag: &str) -> Result<NodeId, MergeError> {
        let id = self.resolve(address)?;
        let node = self
            .image
            .nodes
            .get_mut(&id.0)
            .expect("address index points at a live node");
        if node.semantic_tags.insert(tag.to_string()) {
            node.updated_at = self.now;
        }
        Ok(id)
    }

    fn resolve(&self, address: &RdfAddress) -> Result<NodeId, MergeError> {
        self.image
            .address_index
            .get(&address.to_string())
            .map(|&id| NodeId(id))
            .ok_or_else(|| MergeError::MissingEndpoint(address.to_string()))
    }
}

/// The graph store handle. Cheap to share (`Arc<GraphStore>`); owns all
/// mutable persistent state.
#[derive(Debug)]
pub struct GraphStore {
    registry: Arc<EdgeTypeRegistry>,
    inner: RwLock<StoreImage>,
}

impl GraphStore {
    pub fn new(registry: Arc<EdgeTypeRegistry>) -> Self {
        Self {
            registry,
            inner: RwLock::new(StoreImage::default()),
        }
    }

    /// Wrap a deserialized image (indexes are rebuilt here).
    pub fn from_image(mut image: StoreImage, registry: Arc<EdgeTypeRegistry>) -> Self {
        image.rebuild_indexes();
        Self {
            registry,
            inner: RwLock::new(image),
        }
    }

    pub fn registry(&self) -> &Arc<EdgeTypeRegistry> {
        &self.registry
    }

    /// Run `f` inside a write transaction. Serializable: the write lock is
    /// held for the duration. On error the pre-transaction image is
    /// restored and the error is returned.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, MergeError>,
    ) -> Result<T, MergeError> {
        let mut guard = self.inner.write().expect("store lock poisoned");
        let backup = guard.clone();
        let mut tx = Transaction {
            image: &mut guard,
            registry: &self.registry,
            now: Utc::now(),
        };
        match f(&mut tx) {
            Ok(value) => {
                guard.updated_at = Utc::now();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "transaction rolled back");
                *guard = backup;
                Err(err)
            }
        }
    }

    /// A consistent point-in-time copy for side-effect-free queries.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            image: self.inner.read().expect("store lock poisoned").clone(),
        }
    }

    /// Clone of the current image, for persistence.
    pub fn image(&self) -> StoreImage {
        self.inner.read().expect("store lock poisoned").clone()
    }

    pub fn node(&self, id: NodeId) -> Option<GraphNode> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .node(id)
            .cloned()
    }

    pub fn node_by_address(&self, address: &RdfAddress) -> Option<GraphNode> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .node_by_address(address)
            .cloned()
    }

    pub fn find_nodes(&self, criteria: &NodeCriteria) -> Vec<GraphNode> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .find_nodes(criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_edges(&self, criteria: &EdgeCriteria) -> Vec<GraphEdge> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .find_edges(criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
        edge_types: Option<&[String]>,
    ) -> Vec<GraphEdge> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .neighbors(node, direction, edge_types)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").edge_count()
    }

    /// Remove nodes that a full re-analysis no longer emits: any node whose
    /// `source_file` is in `analyzed_files` but whose address is absent from
    /// `live_addresses`. Adjoining edges are removed with the node. Returns
    /// the number of nodes pruned.
    pub fn prune_stale(
        &self,
        analyzed_files: &BTreeSet<String>,
        live_addresses: &BTreeSet<String>,
    ) -> usize {
        let mut guard = self.inner.write().expect("store lock poisoned");
        let stale: Vec<u64> = guard
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.source_file
                    .as_ref()
                    .is_some_and(|f| analyzed_files.contains(f))
                    && !live_addresses.contains(&node.address.to_string())
            })
            .map(|(&id, _)| id)
            .collect();
        let count = stale.len();
        for id in stale {
            guard.remove_node_unindexed(id);
        }
        if count > 0 {
            guard.rebuild_indexes();
            tracing::debug!(pruned = count, "removed stale nodes after re-analysis");
            guard.updated_at = Utc::now();
        }
        count
    }
}
