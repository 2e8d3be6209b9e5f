//! Transitive closure benchmarks over synthetic dependency chains.

use criterion::{criterion_group, criterion_main, Criterion};
use rdg_core::address::{NodeType, RdfAddress};
use rdg_core::edge_types::EdgeTypeRegistry;
use rdg_core::model::{EdgeDraft, NodeDraft, NodeId};
use rdg_infer::{InferenceEngine, TraversalOptions};
use rdg_store::GraphStore;
use std::sync::Arc;

/// A layered graph: `layers` levels of `width` files, each file depending
/// on every file in the next layer.
fn layered_store(layers: usize, width: usize) -> (GraphStore, NodeId) {
    let store = GraphStore::new(Arc::new(EdgeTypeRegistry::standard()));
    let path = |layer: usize, i: usize| format!("l{layer}/f{i}.ts");
    let root = store
        .transaction(|tx| {
            let mut root = None;
            for layer in 0..layers {
                for i in 0..width {
                    let p = path(layer, i);
                    let id = tx.upsert_node(
                        &NodeDraft::new(
                            RdfAddress::file("bench", &p).unwrap(),
                            NodeType::File,
                            &p,
                        )
                        .with_source_file(&p),
                    )?;
                    if root.is_none() {
                        root = Some(id);
                    }
                }
            }
            for layer in 0..layers - 1 {
                for i in 0..width {
                    for j in 0..width {
                        tx.upsert_edge(&EdgeDraft::new(
                            RdfAddress::file("bench", &path(layer, i)).unwrap(),
                            RdfAddress::file("bench", &path(layer + 1, j)).unwrap(),
                            "depends_on",
                        ))?;
                    }
                }
            }
            Ok(root.expect("at least one node"))
        })
        .unwrap();
    (store, root)
}

fn bench_transitive(c: &mut Criterion) {
    let (store, root) = layered_store(10, 20);
    let engine = InferenceEngine::new(&store);
    c.bench_function("transitive_10x20", |b| {
        b.iter(|| {
            let outcome = engine
                .transitive(
                    root,
                    "depends_on",
                    &TraversalOptions {
                        max_depth: Some(10),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert!(!outcome.items.is_empty());
        });
    });
}

criterion_group!(benches, bench_transitive);
criterion_main!(benches);
