//! CLI binary for RDG: run namespace analysis and query the graph.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rdg_core::address::RdfAddress;
use rdg_core::config::RdgConfig;
use rdg_infer::{HierarchicalOptions, InferenceEngine, TraversalOptions};
use rdg_runner::{bootstrap_registries, NamespaceFile, NamespaceRunner, RunOptions};
use rdg_store::{GraphStorage, GraphStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rdg", about = "Repository dependency graph analyzer")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a namespace's scenario composition and persist the graph
    Analyze {
        /// Namespace config file (defaults to rdg.namespaces.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Namespace to run (defaults to the config's `default`)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Worker pool size override
        #[arg(long)]
        max_concurrency: Option<usize>,
    },

    /// Transitive reachability from a node
    Transitive {
        /// Source node address
        address: String,

        /// Edge type to traverse
        #[arg(short, long, default_value = "depends_on")]
        edge_type: String,

        /// Maximum traversal depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Edges of a type expanded over the edge-type tree
    Hierarchical {
        /// Edge type to expand
        edge_type: String,

        /// Leave descendant types out of the expansion
        #[arg(long)]
        no_children: bool,

        /// Include ancestor types
        #[arg(long)]
        parents: bool,
    },

    /// Relations propagated through containment chains
    Inheritable {
        /// Node address
        address: String,

        /// Relation type to propagate
        edge_type: String,

        /// Maximum containment depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Explore the graph neighborhood from a node
    Explore {
        /// Starting node address
        address: String,

        /// Direction: out, in, both
        #[arg(short, long, default_value = "out")]
        direction: String,

        /// Maximum traversal depth
        #[arg(long, default_value = "2")]
        depth: usize,

        /// Restrict traversal to one edge type
        #[arg(long)]
        edge_type: Option<String>,
    },

    /// Show graph statistics
    Info,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Analyze {
            config,
            namespace,
            max_concurrency,
        } => cmd_analyze(&project_root, config, namespace, max_concurrency),
        Commands::Transitive {
            address,
            edge_type,
            depth,
        } => cmd_transitive(&project_root, &address, &edge_type, depth),
        Commands::Hierarchical {
            edge_type,
            no_children,
            parents,
        } => cmd_hierarchical(&project_root, &edge_type, !no_children, parents),
        Commands::Inheritable {
            address,
            edge_type,
            depth,
        } => cmd_inheritable(&project_root, &address, &edge_type, depth),
        Commands::Explore {
            address,
            direction,
            depth,
            edge_type,
        } => cmd_explore(&project_root, &address, &direction, depth, edge_type),
        Commands::Info => cmd_info(&project_root),
    }
}

fn load_store(project_root: &Path) -> Result<GraphStore> {
    let (_, edge_types) = bootstrap_registries()?;
    let storage = GraphStorage::open(project_root);
    if storage.exists() {
        Ok(GraphStore::from_image(storage.load()?, edge_types))
    } else {
        Ok(GraphStore::new(edge_types))
    }
}

fn cmd_analyze(
    project_root: &Path,
    config_path: Option<PathBuf>,
    namespace: Option<String>,
    max_concurrency: Option<usize>,
) -> Result<()> {
    let config_path =
        config_path.unwrap_or_else(|| project_root.join("rdg.namespaces.json"));
    let file = NamespaceFile::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let namespace = namespace
        .or_else(|| file.default_namespace().map(String::from))
        .context("no namespace named and the config declares none")?;

    let runtime = RdgConfig::load(project_root)?;
    let (scenarios, edge_types) = bootstrap_registries()?;
    let storage = GraphStorage::with_config(project_root, runtime.storage.clone());
    let store = if storage.exists() {
        Arc::new(GraphStore::from_image(storage.load()?, edge_types))
    } else {
        Arc::new(GraphStore::new(edge_types))
    };

    let before = store.image();
    let runner = NamespaceRunner::new(scenarios, store.clone());
    let summary = runner.run(
        project_root,
        &namespace,
        &file,
        &RunOptions {
            max_concurrency: max_concurrency.or(Some(runtime.runner.max_concurrency)),
            ..Default::default()
        },
    )?;

    let after = store.image();
    let changes = rdg_store::diff::compute(&before, &after);
    storage.store(&after)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "summary": summary,
            "changes": {
                "addedNodes": changes.added_nodes.len(),
                "removedNodes": changes.removed_nodes.len(),
                "modifiedNodes": changes.modified_nodes.len(),
                "addedEdges": changes.added_edges.len(),
                "removedEdges": changes.removed_edges.len(),
            },
        }))?
    );
    Ok(())
}

fn query_options(project_root: &Path, depth: Option<usize>) -> Result<TraversalOptions> {
    let runtime = RdgConfig::load(project_root)?;
    Ok(TraversalOptions {
        max_depth: depth,
        timeout: Duration::from_millis(runtime.query.timeout_ms),
    })
}

fn resolve_address(store: &GraphStore, raw: &str) -> Result<rdg_core::model::NodeId> {
    let address = RdfAddress::parse(raw)?;
    store
        .node_by_address(&address)
        .map(|n| n.id)
        .with_context(|| format!("no node in the graph for `{raw}`"))
}

fn cmd_transitive(
    project_root: &Path,
    address: &str,
    edge_type: &str,
    depth: Option<usize>,
) -> Result<()> {
    let store = load_store(project_root)?;
    let source = resolve_address(&store, address)?;
    let engine = InferenceEngine::new(&store);
    let outcome = engine.transitive(source, edge_type, &query_options(project_root, depth)?)?;

    let items: Vec<serde_json::Value> = outcome
        .items
        .iter()
        .map(|path| {
            serde_json::json!({
                "address": store.node(path.node).map(|n| n.address.to_string()),
                "depth": path.depth,
                "path": path
                    .path
                    .iter()
                    .filter_map(|&id| store.node(id).map(|n| n.address.to_string()))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "partial": outcome.partial,
            "reached": items,
        }))?
    );
    Ok(())
}

fn cmd_hierarchical(
    project_root: &Path,
    edge_type: &str,
    children: bool,
    parents: bool,
) -> Result<()> {
    let store = load_store(project_root)?;
    let engine = InferenceEngine::new(&store);
    let outcome = engine.hierarchical(
        edge_type,
        &HierarchicalOptions {
            include_children: children,
            include_parents: parents,
            ..Default::default()
        },
    )?;

    let edges: Vec<serde_json::Value> = outcome
        .items
        .iter()
        .map(|edge| {
            serde_json::json!({
                "from": store.node(edge.from).map(|n| n.address.to_string()),
                "to": store.node(edge.to).map(|n| n.address.to_string()),
                "edgeType": edge.edge_type,
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "expansion": outcome.expansion,
            "partial": outcome.partial,
            "edges": edges,
        }))?
    );
    Ok(())
}

fn cmd_inheritable(
    project_root: &Path,
    address: &str,
    edge_type: &str,
    depth: Option<usize>,
) -> Result<()> {
    let store = load_store(project_root)?;
    let node = resolve_address(&store, address)?;
    let engine = InferenceEngine::new(&store);
    let outcome = engine.inheritable(node, edge_type, &query_options(project_root, depth)?)?;

    let items: Vec<serde_json::Value> = outcome
        .items
        .iter()
        .map(|relation| {
            serde_json::json!({
                "via": store.node(relation.via).map(|n| n.address.to_string()),
                "distance": relation.distance,
                "edgeType": relation.edge.edge_type,
                "from": store.node(relation.edge.from).map(|n| n.address.to_string()),
                "to": store.node(relation.edge.to).map(|n| n.address.to_string()),
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "partial": outcome.partial,
            "relations": items,
        }))?
    );
    Ok(())
}

fn cmd_explore(
    project_root: &Path,
    address: &str,
    direction: &str,
    depth: usize,
    edge_type: Option<String>,
) -> Result<()> {
    let store = load_store(project_root)?;
    let start = resolve_address(&store, address)?;
    let direction = match direction {
        "out" => rdg_store::Direction::Out,
        "in" => rdg_store::Direction::In,
        "both" => rdg_store::Direction::Both,
        other => anyhow::bail!("unknown direction `{other}` (expected out, in, both)"),
    };
    let edge_types: Option<Vec<String>> = edge_type.map(|t| vec![t]);
    let tree = rdg_infer::explore::explore(
        &store.snapshot(),
        start,
        direction,
        depth,
        edge_types.as_deref(),
        None,
    )
    .with_context(|| format!("no node in the graph for `{address}`"))?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}

fn cmd_info(project_root: &Path) -> Result<()> {
    let store = load_store(project_root)?;
    let snapshot = store.snapshot();
    let dependency_kinds = store.registry().expand("depends_on", true, false);
    let cycles = rdg_infer::cycles::detect(&snapshot, &dependency_kinds);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "nodes": snapshot.node_count(),
            "edges": snapshot.edge_count(),
            "circularDependencies": cycles.cycle_count,
            "cycles": cycles.cycles,
        }))?
    );
    Ok(())
}
