//! The analyzer contract: pure functions from an analysis context to an
//! analysis result. Analyzers never touch the graph store; all mutation
//! flows through the returned result, merged by the namespace runner.

use rdg_core::address::{AddressError, NodeType, RdfAddress};
use rdg_core::model::{EdgeDraft, NodeDraft, TagAssignment};
use rdg_core::uniqueness::SymbolConflict;
use rdg_parser::{Language, SourceUnit};
use std::collections::BTreeMap;

/// Everything an analyzer sees for one file.
pub struct AnalysisContext<'a> {
    /// Project-root-relative path, forward-slash normalized.
    pub file_path: &'a str,
    pub project_name: &'a str,
    pub language: Language,
    pub unit: &'a SourceUnit,
    /// This scenario's entry from the namespace `scenarioConfig`.
    pub config: &'a serde_json::Map<String, serde_json::Value>,
    /// Results of scenarios already executed on this file, keyed by id.
    pub prior: &'a BTreeMap<String, AnalysisResult>,
}

impl AnalysisContext<'_> {
    /// The address of the file under analysis.
    pub fn file_address(&self) -> Result<RdfAddress, AddressError> {
        RdfAddress::file(self.project_name, self.file_path)
    }

    /// The address of a symbol in the file under analysis.
    pub fn symbol_address(
        &self,
        node_type: NodeType,
        symbol: &str,
    ) -> Result<RdfAddress, AddressError> {
        RdfAddress::symbol(self.project_name, self.file_path, node_type, symbol)
    }

    /// A config value for this scenario, if present.
    pub fn config_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }
}

/// What one analyzer produced for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    pub nodes: Vec<NodeDraft>,
    pub edges: Vec<EdgeDraft>,
    pub semantic_tags: Vec<TagAssignment>,
    /// Same-file symbol-name collisions found by the uniqueness validator.
    /// Reported upward; never auto-resolved.
    pub symbol_conflicts: Vec<SymbolConflict>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.semantic_tags.is_empty()
    }

    /// Fold another result into this one.
    pub fn extend(&mut self, other: AnalysisResult) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.semantic_tags.extend(other.semantic_tags);
        self.symbol_conflicts.extend(other.symbol_conflicts);
    }
}

/// A per-scenario AST visitor. Implementations are CPU-bound, side-effect
/// free, and safe to run concurrently across files.
pub trait ScenarioAnalyzer: Send + Sync {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult>;
}
