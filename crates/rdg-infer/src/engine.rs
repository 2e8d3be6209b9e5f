//! The three query families: hierarchical expansion, transitive closure,
//! and inheritable propagation.

use rdg_core::edge_types::EdgeTypeRegistry;
use rdg_core::error::QueryError;
use rdg_core::model::{GraphEdge, NodeId};
use rdg_store::{Direction, EdgeCriteria, GraphStore, StoreSnapshot};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hard ceiling for transitive closure depth.
pub const TRANSITIVE_DEPTH_CEILING: usize = 64;
/// Hard ceiling for inheritable propagation depth.
pub const INHERITABLE_DEPTH_CEILING: usize = 16;

const DEFAULT_TRANSITIVE_DEPTH: usize = 10;
const DEFAULT_INHERITABLE_DEPTH: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for a hierarchical query.
#[derive(Debug, Clone)]
pub struct HierarchicalOptions {
    pub include_children: bool,
    pub include_parents: bool,
    pub timeout: Duration,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        Self {
            include_children: true,
            include_parents: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Options for transitive and inheritable traversals.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Traversal depth. `None` uses the family default (10 transitive,
    /// 5 inheritable). A value of 0 is treated as 1: only the source's
    /// direct edges of the requested type.
    pub max_depth: Option<usize>,
    pub timeout: Duration,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A query result plus its completeness flag. `partial` is set when the
/// timeout expired before the traversal finished.
#[derive(Debug, Clone)]
pub struct QueryOutcome<T> {
    pub items: Vec<T>,
    pub partial: bool,
    /// The edge-type expansion the query ran over, in deterministic order.
    pub expansion: Vec<String>,
}

/// A node reached by the transitive closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitivePath {
    pub node: NodeId,
    /// 1 for a direct edge from the source.
    pub depth: usize,
    /// Nodes along the discovery path, source first, reached node last.
    pub path: Vec<NodeId>,
}

/// Which side of the containment chain carried a propagated relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationDirection {
    FromAncestor,
    FromDescendant,
}

/// A relation propagated to the queried node through containment.
#[derive(Debug, Clone)]
pub struct InheritedRelation {
    /// The ancestor or descendant the relation is attached to.
    pub via: NodeId,
    /// Containment distance between the queried node and `via`.
    pub distance: usize,
    pub direction: PropagationDirection,
    pub edge: GraphEdge,
}

/// Read-only query engine over a point-in-time snapshot.
pub struct InferenceEngine {
    snapshot: StoreSnapshot,
    registry: Arc<EdgeTypeRegistry>,
}

impl InferenceEngine {
    /// Snapshot the store now; later writes are not observed.
    pub fn new(store: &GraphStore) -> Self {
        Self {
            snapshot: store.snapshot(),
            registry: store.registry().clone(),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot, registry: Arc<EdgeTypeRegistry>) -> Self {
        Self { snapshot, registry }
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    fn require_edge_type(&self, edge_type: &str) -> Result<(), QueryError> {
        if self.registry.contains(edge_type) {
            Ok(())
        } else {
            Err(QueryError::UnknownEdgeType(edge_type.to_string()))
        }
    }

    /// Expand the requested type over the registry tree and return the union
    /// of edges whose type is in the expansion. Expansion order is
    /// deterministic: self first, descendants in BFS order by
    /// `(priority, name)`, parents ascending.
    pub fn hierarchical(
        &self,
        edge_type: &str,
        options: &HierarchicalOptions,
    ) -> Result<QueryOutcome<GraphEdge>, QueryError> {
        self.require_edge_type(edge_type)?;
        let started = Instant::now();
        let expansion =
            self.registry
                .expand(edge_type, options.include_children, options.include_parents);

        let mut items = Vec::new();
        let mut partial = false;
        for ty in &expansion {
            if started.elapsed() > options.timeout {
                partial = true;
                tracing::warn!(edge_type, "hierarchical query timed out; returning partial");
                break;
            }
            let criteria = EdgeCriteria {
                edge_types: Some(vec![ty.clone()]),
                ..Default::default()
            };
            items.extend(self.snapshot.find_edges(&criteria).into_iter().cloned());
        }
        Ok(QueryOutcome {
            items,
            partial,
            expansion,
        })
    }

    /// Reflexive-transitive closure from `source`, restricted to the
    /// requested type and its descendants. A node is visited at most once;
    /// the source itself is only reported when a true cycle reaches it.
    pub fn transitive(
        &self,
        source: NodeId,
        edge_type: &str,
        options: &TraversalOptions,
    ) -> Result<QueryOutcome<TransitivePath>, QueryError> {
        self.require_edge_type(edge_type)?;
        if self.snapshot.node(source).is_none() {
            return Err(QueryError::UnknownNode(format!("{}", source.0)));
        }
        let max_depth = options.max_depth.unwrap_or(DEFAULT_TRANSITIVE_DEPTH);
        if max_depth > TRANSITIVE_DEPTH_CEILING {
            return Err(QueryError::DepthExceeded {
                requested: max_depth,
                ceiling: TRANSITIVE_DEPTH_CEILING,
            });
        }
        // Depth 0 would be an empty query; the documented convention is
        // "direct edges only".
        let max_depth = max_depth.max(1);

        let mut expansion = vec![edge_type.to_string()];
        expansion.extend(self.registry.descendants(edge_type));

        let started = Instant::now();
        let mut items = Vec::new();
        let mut partial = false;
        let mut visited: HashSet<NodeId> = HashSet::from([source]);
        let mut source_reported = false;
        let mut frontier: VecDeque<(NodeId, usize, Vec<NodeId>)> =
            VecDeque::from([(source, 0, vec![source])]);

        while let Some((current, depth, path)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if started.elapsed() > options.timeout {
                partial = true;
                tracing::warn!(edge_type, "transitive query timed out; returning partial");
                break;
            }
            for edge in self
                .snapshot
                .neighbors(current, Direction::Out, Some(&expansion))
            {
                let target = edge.to;
                let mut next_path = path.clone();
                next_path.push(target);
                if target == source {
                    // A true cycle back to the source: report once, do not
                    // re-expand.
                    if !source_reported {
                        source_reported = true;
                        items.push(TransitivePath {
                            node: target,
                            depth: depth + 1,
                            path: next_path,
                        });
                    }
                    continue;
                }
                if visited.insert(target) {
                    items.push(TransitivePath {
                        node: target,
                        depth: depth + 1,
                        path: next_path.clone(),
                    });
                    frontier.push_back((target, depth + 1, next_path));
                }
            }
        }

        Ok(QueryOutcome {
            items,
            partial,
            expansion,
        })
    }

    /// Propagate relations of `relation_type` through containment edges
    /// whose type is marked inheritable: relations attached to ancestors or
    /// descendants along the chain are reported against the queried node.
    pub fn inheritable(
        &self,
        node: NodeId,
        relation_type: &str,
        options: &TraversalOptions,
    ) -> Result<QueryOutcome<InheritedRelation>, QueryError> {
        self.require_edge_type(relation_type)?;
        if self.snapshot.node(node).is_none() {
            return Err(QueryError::UnknownNode(format!("{}", node.0)));
        }
        let max_depth = options.max_depth.unwrap_or(DEFAULT_INHERITABLE_DEPTH);
        if max_depth > INHERITABLE_DEPTH_CEILING {
            return Err(QueryError::DepthExceeded {
                requested: max_depth,
                ceiling: INHERITABLE_DEPTH_CEILING,
            });
        }
        let max_depth = max_depth.max(1);

        let carriers = self.registry.inheritable_types();
        let relation_expansion: Vec<String> = {
            let mut expansion = vec![relation_type.to_string()];
            expansion.extend(self.registry.descendants(relation_type));
            expansion
        };

        let started = Instant::now();
        let mut items = Vec::new();
        let mut partial = false;

        for (containment_direction, propagation) in [
            (Direction::In, PropagationDirection::FromAncestor),
            (Direction::Out, PropagationDirection::FromDescendant),
        ] {
            let mut visited: HashSet<NodeId> = HashSet::from([node]);
            let mut frontier: VecDeque<(NodeId, usize)> = VecDeque::from([(node, 0)]);
            while let Some((current, distance)) = frontier.pop_front() {
                if distance >= max_depth {
                    continue;
                }
                if started.elapsed() > options.timeout {
                    partial = true;
                    tracing::warn!(
                        relation_type,
                        "inheritable query timed out; returning partial"
                    );
                    break;
                }
                for containment in
                    self.snapshot
                        .neighbors(current, containment_direction, Some(&carriers))
                {
                    let next = match containment_direction {
                        Direction::In => containment.from,
                        _ => containment.to,
                    };
                    if !visited.insert(next) {
                        continue;
                    }
                    for edge in
                        self.snapshot
                            .neighbors(next, Direction::Both, Some(&relation_expansion))
                    {
                        items.push(InheritedRelation {
                            via: next,
                            distance: distance + 1,
                            direction: propagation,
                            edge: edge.clone(),
                        });
                    }
                    frontier.push_back((next, distance + 1));
                }
            }
        }

        Ok(QueryOutcome {
            items,
            partial,
            expansion: relation_expansion,
        })
    }
}
