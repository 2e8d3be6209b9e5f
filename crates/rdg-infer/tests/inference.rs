use rdg_core::address::{NodeType, RdfAddress};
use rdg_core::edge_types::EdgeTypeRegistry;
use rdg_core::error::QueryError;
use rdg_core::model::{EdgeDraft, NodeDraft, NodeId};
use rdg_infer::{InferenceEngine, TraversalOptions};
use rdg_store::GraphStore;
use std::sync::Arc;
use std::time::Duration;

fn file_draft(path: &str) -> NodeDraft {
    NodeDraft::new(
        RdfAddress::file("proj", path).unwrap(),
        NodeType::File,
        path.rsplit('/').next().unwrap_or(path),
    )
    .with_source_file(path)
}

fn store_with(edges: &[(&str, &str, &str)]) -> (GraphStore, Vec<NodeId>) {
    let store = GraphStore::new(Arc::new(EdgeTypeRegistry::standard()));
    let mut paths: Vec<&str> = Vec::new();
    for (from, to, _) in edges {
        for path in [*from, *to] {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    let ids = store
        .transaction(|tx| {
            let mut ids = Vec::new();
            for path in &paths {
                ids.push(tx.upsert_node(&file_draft(path))?);
            }
            for (from, to, edge_type) in edges {
                tx.upsert_edge(&EdgeDraft::new(
                    RdfAddress::file("proj", from).unwrap(),
                    RdfAddress::file("proj", to).unwrap(),
                    *edge_type,
                ))?;
            }
            Ok(ids)
        })
        .unwrap();
    (store, ids)
}

#[test]
fn transitive_reaches_along_chain() {
    // A -> B -> C under depends_on.
    let (store, ids) = store_with(&[
        ("a.ts", "b.ts", "depends_on"),
        ("b.ts", "c.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);

    let outcome = engine
        .transitive(ids[0], "depends_on", &TraversalOptions::default())
        .unwrap();
    assert!(!outcome.partial);
    let reached: Vec<u64> = outcome.items.iter().map(|p| p.node.0).collect();
    assert_eq!(reached, vec![ids[1].0, ids[2].0]);
    assert_eq!(outcome.items[0].depth, 1);
    assert_eq!(outcome.items[1].depth, 2);
    assert_eq!(
        outcome.items[1].path,
        vec![ids[0], ids[1], ids[2]]
    );
}

#[test]
fn transitive_depth_limits() {
    let (store, ids) = store_with(&[
        ("a.ts", "b.ts", "depends_on"),
        ("b.ts", "c.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);

    let shallow = engine
        .transitive(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(shallow.items.len(), 1);
    assert_eq!(shallow.items[0].node, ids[1]);

    // Depth 0 follows the documented convention: direct edges only.
    let zero = engine
        .transitive(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(zero.items.len(), 1);
}

#[test]
fn transitive_monotone_in_depth() {
    let (store, ids) = store_with(&[
        ("a.ts", "b.ts", "depends_on"),
        ("b.ts", "c.ts", "depends_on"),
        ("c.ts", "d.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);
    let mut previous = 0;
    for depth in 1..=4 {
        let outcome = engine
            .transitive(
                ids[0],
                "depends_on",
                &TraversalOptions {
                    max_depth: Some(depth),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(outcome.items.len() >= previous);
        previous = outcome.items.len();
    }
}

#[test]
fn transitive_includes_descendant_edge_types() {
    // imports_file sits under imports under depends_on.
    let (store, ids) = store_with(&[
        ("a.ts", "b.ts", "imports_file"),
        ("b.ts", "c.ts", "imports_library"),
    ]);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .transitive(ids[0], "depends_on", &TraversalOptions::default())
        .unwrap();
    assert_eq!(outcome.items.len(), 2);
    assert!(outcome.expansion.contains(&"imports_file".to_string()));
}

#[test]
fn cycle_terminates_and_reports_source_once() {
    let (store, ids) = store_with(&[
        ("a.ts", "b.ts", "depends_on"),
        ("b.ts", "a.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .transitive(ids[0], "depends_on", &TraversalOptions::default())
        .unwrap();
    // B at depth 1, then A itself via the true cycle.
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.items[0].node, ids[1]);
    assert_eq!(outcome.items[1].node, ids[0]);
    assert_eq!(outcome.items[1].depth, 2);
}

#[test]
fn depth_ceiling_is_enforced() {
    let (store, ids) = store_with(&[("a.ts", "b.ts", "depends_on")]);
    let engine = InferenceEngine::new(&store);
    let err = engine
        .transitive(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(1000),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::DepthExceeded { .. }));
}

#[test]
fn unknown_edge_type_is_an_error() {
    let (store, ids) = store_with(&[("a.ts", "b.ts", "depends_on")]);
    let engine = InferenceEngine::new(&store);
    let err = engine
        .transitive(ids[0], "bogus", &TraversalOptions::default())
        .unwrap_err();
    assert!(matches!(err, QueryError::UnknownEdgeType(_)));
}

#[test]
fn hierarchical_children_expansion_is_exact() {
    let (store, _) = store_with(&[
        ("a.ts", "b.ts", "imports_file"),
        ("b.ts", "c.ts", "imports_library"),
        ("c.ts", "d.ts", "calls"),
    ]);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .hierarchical("imports", &rdg_infer::HierarchicalOptions::default())
        .unwrap();
    assert_eq!(
        outcome.expansion,
        vec!["imports", "imports_file", "imports_library"]
    );
    assert_eq!(outcome.items.len(), 2);
    assert!(outcome
        .items
        .iter()
        .all(|e| outcome.expansion.contains(&e.edge_type)));
}

#[test]
fn hierarchical_parent_expansion() {
    let (store, _) = store_with(&[("a.ts", "b.ts", "imports_file")]);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .hierarchical(
            "imports_file",
            &rdg_infer::HierarchicalOptions {
                include_children: false,
                include_parents: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(
        outcome.expansion,
        vec!["imports_file", "imports", "depends_on"]
    );
}

#[test]
fn inheritable_propagates_through_containment() {
    // dir contains file; file depends_on lib.ts. Querying the directory for
    // depends_on surfaces the file's relation.
    let (store, ids) = store_with(&[
        ("src", "src/a.ts", "contains"),
        ("src/a.ts", "src/lib.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .inheritable(ids[0], "depends_on", &TraversalOptions::default())
        .unwrap();
    assert_eq!(outcome.items.len(), 1);
    let relation = &outcome.items[0];
    assert_eq!(relation.via, ids[1]);
    assert_eq!(relation.distance, 1);
    assert_eq!(relation.edge.edge_type, "depends_on");
}

#[test]
fn inheritable_respects_depth() {
    let (store, ids) = store_with(&[
        ("root", "root/mid", "contains"),
        ("root/mid", "root/mid/leaf.ts", "contains"),
        ("root/mid/leaf.ts", "other.ts", "depends_on"),
    ]);
    let engine = InferenceEngine::new(&store);

    let shallow = engine
        .inheritable(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(shallow.items.is_empty());

    let deep = engine
        .inheritable(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(deep.items.len(), 1);
    assert_eq!(deep.items[0].distance, 2);
}

#[test]
fn queries_run_against_snapshot() {
    let (store, ids) = store_with(&[("a.ts", "b.ts", "depends_on")]);
    let engine = InferenceEngine::new(&store);
    // A write after the engine snapshot is invisible to it.
    store
        .transaction(|tx| {
            tx.upsert_node(&file_draft("c.ts"))?;
            tx.upsert_edge(&EdgeDraft::new(
                RdfAddress::file("proj", "b.ts").unwrap(),
                RdfAddress::file("proj", "c.ts").unwrap(),
                "depends_on",
            ))
        })
        .unwrap();
    let outcome = engine
        .transitive(ids[0], "depends_on", &TraversalOptions::default())
        .unwrap();
    assert_eq!(outcome.items.len(), 1);
}

#[test]
fn tiny_timeout_flags_partial_results() {
    // A long chain with a zero timeout must flag partiality, not hang.
    let mut edges = Vec::new();
    let names: Vec<String> = (0..64).map(|i| format!("n{i}.ts")).collect();
    for window in names.windows(2) {
        edges.push((window[0].as_str(), window[1].as_str(), "depends_on"));
    }
    let (store, ids) = store_with(&edges);
    let engine = InferenceEngine::new(&store);
    let outcome = engine
        .transitive(
            ids[0],
            "depends_on",
            &TraversalOptions {
                max_depth: Some(64),
                timeout: Duration::ZERO,
            },
        )
        .unwrap();
    assert!(outcome.partial);
}
