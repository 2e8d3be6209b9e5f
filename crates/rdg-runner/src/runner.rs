//! Per-namespace execution: strict topological order across scenarios,
//! bounded parallelism across files within a scenario, one store
//! transaction per file.

use crate::config::{NamespaceConfig, NamespaceFile};
use crate::files;
use rdg_core::address::NodeType;
use rdg_core::edge_types::EdgeTypeRegistry;
use rdg_core::error::{ConfigError, MergeError, RdgError, RegistryError};
use rdg_core::uniqueness::SymbolConflict;
use rdg_parser::Language;
use rdg_scenarios::{AnalysisContext, AnalysisResult, ScenarioAnalyzer, ScenarioRegistry};
use rdg_store::GraphStore;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Build the shared registries: the standard edge catalogue plus every
/// scenario-declared edge type, and the built-in scenario set.
pub fn bootstrap_registries()
-> Result<(Arc<ScenarioRegistry>, Arc<EdgeTypeRegistry>), RegistryError> {
    let scenarios = ScenarioRegistry::with_builtins();
    let mut edge_types = EdgeTypeRegistry::standard();
    scenarios.register_edge_types(&mut edge_types)?;
    Ok((Arc::new(scenarios), Arc::new(edge_types)))
}

/// Cooperative cancellation for a namespace run. Queued work is dropped;
/// in-flight transactions finish or roll back on their own.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for one namespace run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the namespace's `maxConcurrency` (which defaults to 4).
    pub max_concurrency: Option<usize>,
    pub cancellation: CancellationToken,
}

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// One recorded per-file failure.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub circular_dependencies: usize,
}

/// The per-namespace analysis result summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub namespace: String,
    pub total_files: usize,
    pub analyzed_files: usize,
    pub failed_files: Vec<String>,
    pub errors: Vec<FileError>,
    pub graph_stats: GraphStats,
    pub scenarios_executed: Vec<String>,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbol_conflicts: Vec<SymbolConflict>,
}

/// Shared mutable state for one run, guarded per-field.
#[derive(Default)]
struct RunState {
    errors: Mutex<Vec<FileError>>,
    failed: Mutex<BTreeSet<String>>,
    analyzed: Mutex<BTreeSet<String>>,
    live_addresses: Mutex<BTreeSet<String>>,
    conflicts: Mutex<Vec<SymbolConflict>>,
    /// file -> scenario id -> result, for `AnalysisContext::prior`.
    prior: Mutex<HashMap<String, BTreeMap<String, AnalysisResult>>>,
}

impl RunState {
    fn record_failure(&self, file: &str, error: String) {
        tracing::warn!(file, error = %error, "file task failed");
        self.errors.lock().expect("lock poisoned").push(FileError {
            file: file.to_string(),
            error,
        });
        self.failed
            .lock()
            .expect("lock poisoned")
            .insert(file.to_string());
    }
}

/// Drives scenario analyzers over a namespace's files and merges results
/// into the graph store.
pub struct NamespaceRunner {
    scenarios: Arc<ScenarioRegistry>,
    store: Arc<GraphStore>,
}

impl NamespaceRunner {
    pub fn new(scenarios: Arc<ScenarioRegistry>, store: Arc<GraphStore>) -> Self {
        Self { scenarios, store }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Run one namespace. Fatal classes (config, registry) return `Err`
    /// before any store mutation; per-file failures accumulate on the
    /// summary.
    pub fn run(
        &self,
        project_root: &Path,
        namespace: &str,
        file: &NamespaceFile,
        options: &RunOptions,
    ) -> Result<RunSummary, RdgError> {
        let config = file.get(namespace)?;
        // Only the requested namespace gates this run; other namespaces in
        // the file may be broken without affecting it.
        config.validate(namespace, &self.scenarios)?;

        let resolved = files::resolve_files(project_root, config)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        let order = self.scenarios.execution_order(&config.scenarios)?;
        tracing::info!(
            namespace,
            files = resolved.len(),
            scenarios = ?order,
            "starting namespace analysis"
        );

        let concurrency = options
            .max_concurrency
            .or(config.max_concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let state = RunState::default();
        let mut scenarios_executed: Vec<String> = Vec::new();
        let mut cancelled = false;

        for scenario_id in &order {
            if options.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            let analyzer = self
                .scenarios
                .analyzer(scenario_id)
                .expect("ordered scenarios are registered");
            let scenario_config = config
                .scenario_config
                .get(scenario_id)
                .cloned()
                .unwrap_or_default();

            pool.install(|| {
                resolved.par_iter().for_each(|file_path| {
                    if options.cancellation.is_cancelled() {
                        return;
                    }
                    self.run_file_task(
                        project_root,
                        config,
                        scenario_id,
                        analyzer.as_ref(),
                        &scenario_config,
                        file_path,
                        &state,
                    );
                });
            });

            if options.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            scenarios_executed.push(scenario_id.clone());
        }

        let analyzed = state.analyzed.into_inner().expect("lock poisoned");
        let failed = state.failed.into_inner().expect("lock poisoned");
        let live_addresses = state.live_addresses.into_inner().expect("lock poisoned");

        // Node lifecycle: after a complete re-analysis, nodes a file no
        // longer emits are removed. Skipped when the run was cut short.
        if !cancelled {
            let prune_scope: BTreeSet<String> =
                analyzed.difference(&failed).cloned().collect();
            self.store.prune_stale(&prune_scope, &live_addresses);
        }

        let snapshot = self.store.snapshot();
        let dependency_kinds = self.store.registry().expand("depends_on", true, false);
        let cycle_report = rdg_infer::cycles::detect(&snapshot, &dependency_kinds);

        Ok(RunSummary {
            namespace: namespace.to_string(),
            total_files: resolved.len(),
            analyzed_files: analyzed.len(),
            failed_files: failed.into_iter().collect(),
            errors: state.errors.into_inner().expect("lock poisoned"),
            graph_stats: GraphStats {
                nodes: snapshot.node_count(),
                edges: snapshot.edge_count(),
                circular_dependencies: cycle_report.cycle_count,
            },
            scenarios_executed,
            cancelled,
            symbol_conflicts: state.conflicts.into_inner().expect("lock poisoned"),
        })
    }

    /// One self-contained file task: parse AST, run one analyzer, merge the
    /// result in a single transaction.
    #[allow(clippy::too_many_arguments)]
    fn run_file_task(
        &self,
        project_root: &Path,
        config: &NamespaceConfig,
        scenario_id: &str,
        analyzer: &dyn ScenarioAnalyzer,
        scenario_config: &serde_json::Map<String, serde_json::Value>,
        file_path: &str,
        state: &RunState,
    ) {
        let Some(language) = Language::from_path(Path::new(file_path)) else {
            tracing::debug!(file = file_path, "no recognized language, skipping");
            return;
        };

        let unit = match rdg_parser::load_file(&project_root.join(file_path)) {
            Ok(unit) => unit,
            Err(err) => {
                state.record_failure(file_path, format!("parse error: {err:#}"));
                return;
            }
        };

        let prior = state
            .prior
            .lock()
            .expect("lock poisoned")
            .get(file_path)
            .cloned()
            .unwrap_or_default();
        let ctx = AnalysisContext {
            file_path,
            project_name: &config.project_name,
            language,
            unit: &unit,
            config: scenario_config,
            prior: &prior,
        };

        let mut result = match analyzer.analyze(&ctx) {
            Ok(result) => result,
            Err(err) => {
                state.record_failure(
                    file_path,
                    format!("analyzer `{scenario_id}` failed: {err:#}"),
                );
                return;
            }
        };
        if let Err(err) = self.scenarios.validate_result(scenario_id, &result) {
            state.record_failure(file_path, err.to_string());
            return;
        }

        // Namespace-level semantic tags ride on the file nodes.
        if !config.semantic_tags.is_empty() {
            for node in &mut result.nodes {
                if node.node_type == NodeType::File {
                    node.semantic_tags
                        .extend(config.semantic_tags.iter().cloned());
                }
            }
        }

        let merge = self.store.transaction(|tx| {
            for node in &result.nodes {
                tx.upsert_node(node)?;
            }
            for edge in &result.edges {
                tx.upsert_edge(edge)?;
            }
            for tag in &result.semantic_tags {
                match tx.tag_node(&tag.address, &tag.tag) {
                    // Tags are not identity-bearing; a tag for a node another
                    // scenario has not produced yet is dropped, not fatal.
                    Ok(_) | Err(MergeError::MissingEndpoint(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        });
        if let Err(err) = merge {
            state.record_failure(file_path, format!("merge error: {err}"));
            return;
        }

        state
            .analyzed
            .lock()
            .expect("lock poisoned")
            .insert(file_path.to_string());
        {
            let mut live = state.live_addresses.lock().expect("lock poisoned");
            for node in &result.nodes {
                live.insert(node.address.to_string());
            }
        }
        if !result.symbol_conflicts.is_empty() {
            state
                .conflicts
                .lock()
                .expect("lock poisoned")
                .extend(result.symbol_conflicts.iter().cloned());
        }
        state
            .prior
            .lock()
            .expect("lock poisoned")
            .entry(file_path.to_string())
            .or_default()
            .insert(scenario_id.to_string(), result);
    }
}
