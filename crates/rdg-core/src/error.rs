//! Error taxonomy for graph extraction and querying.
//!
//! Fatal classes ([`ConfigError`], [`RegistryError`]) abort the namespace run;
//! file-scoped classes accumulate on the result summary and processing
//! continues. Nothing is silently swallowed at any layer.

use thiserror::Error;

/// Address parse or validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("malformed address `{0}`")]
    Malformed(String),
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("illegal character `{ch}` in `{segment}`")]
    IllegalChar { segment: String, ch: char },
    #[error("path `{0}` escapes the project root")]
    PathEscapesRoot(String),
}

/// Namespace configuration failure. Fatal for the namespace run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read namespace config: {0}")]
    Io(String),
    #[error("malformed namespace config: {0}")]
    Json(String),
    #[error("namespace `{0}` not found in config")]
    MissingNamespace(String),
    #[error("namespace `{namespace}` references unknown scenario `{scenario}`")]
    UnknownScenario { namespace: String, scenario: String },
    #[error("namespace `{namespace}` has unknown key `{key}`")]
    UnknownKey { namespace: String, key: String },
    #[error("scenario `{scenario}` rejects config key `{key}`")]
    UnknownScenarioConfigKey { scenario: String, key: String },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Edge-type or scenario registration conflict. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("edge type `{0}` is already registered")]
    DuplicateEdgeType(String),
    #[error("edge type `{name}` names unknown parent `{parent}`")]
    UnknownParent { name: String, parent: String },
    #[error("edge type parent chain contains a cycle through `{0}`")]
    ParentCycle(String),
    #[error("edge type `{name}` has inconsistent flags: {reason}")]
    InconsistentFlags { name: String, reason: String },
    #[error("scenario `{0}` is already registered")]
    DuplicateScenario(String),
    #[error("scenario `{scenario}` depends on unknown scenario `{dependency}`")]
    UnknownDependency { scenario: String, dependency: String },
    #[error("scenario dependency cycle among: {}", .0.join(", "))]
    ScenarioCycle(Vec<String>),
    #[error("scenario `{scenario}` emits undeclared {kind} type `{type_name}`")]
    UndeclaredType {
        scenario: String,
        kind: String,
        type_name: String,
    },
}

/// Node or edge merge failure. Rolls back the per-file transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("node type for `{address}` is locked to {existing}, got {incoming}")]
    NodeTypeLock {
        address: String,
        existing: String,
        incoming: String,
    },
    #[error("edge type `{0}` is not registered")]
    UnregisteredEdgeType(String),
    #[error("edge endpoint `{0}` does not exist in the store")]
    MissingEndpoint(String),
}

/// Inference query failure. Non-fatal: partial results carry a flag instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("requested depth {requested} exceeds ceiling {ceiling}")]
    DepthExceeded { requested: usize, ceiling: usize },
    #[error("query timed out after {0} ms")]
    Timeout(u64),
    #[error("unknown edge type `{0}`")]
    UnknownEdgeType(String),
    #[error("unknown node `{0}`")]
    UnknownNode(String),
}

/// Unifying error for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RdgError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("failed to parse {file}: {reason}")]
    Parse { file: String, reason: String },
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("analyzer `{scenario}` failed on {file}: {reason}")]
    Analyzer {
        scenario: String,
        file: String,
        reason: String,
    },
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl RdgError {
    /// Whether this error class aborts the whole namespace run.
    /// Per-file classes (address, parse, merge, analyzer) are recorded on the
    /// summary instead; query errors surface as flagged partial results.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RdgError::Config(_) | RdgError::Registry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classes() {
        assert!(RdgError::Config(ConfigError::MissingNamespace("x".into())).is_fatal());
        assert!(RdgError::Registry(RegistryError::DuplicateEdgeType("imports".into())).is_fatal());
        assert!(
            !RdgError::Parse {
                file: "a.ts".into(),
                reason: "bad".into()
            }
            .is_fatal()
        );
        assert!(!RdgError::Query(QueryError::Timeout(30_000)).is_fatal());
    }
}
