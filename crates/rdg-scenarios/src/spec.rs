//! Declarative scenario specifications.
//!
//! A scenario declares the node/edge/tag types its analyzer may emit plus
//! its composition edges: `extends` implies type inheritance and ordering,
//! `requires` implies ordering only.

use rdg_core::edge_types::EdgeTypeDef;
use serde::{Deserialize, Serialize};

/// Specification of one analysis scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: String,
    pub version: String,
    /// Parent scenarios whose declarations this scenario inherits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    /// Scenarios that must execute before this one (no inheritance).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Extension node type names this scenario may emit (standard types
    /// never need declaring).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_types: Vec<String>,
    /// New edge types to pre-register before execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_types: Vec<EdgeTypeDef>,
    /// Semantic tag categories this scenario assigns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub semantic_tags: Vec<String>,
    /// Accepted keys in a namespace's `scenarioConfig` for this scenario.
    /// Unknown keys are a validation error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_keys: Vec<String>,
}

impl ScenarioSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: "1.0.0".to_string(),
            extends: Vec::new(),
            requires: Vec::new(),
            node_types: Vec::new(),
            edge_types: Vec::new(),
            semantic_tags: Vec::new(),
            config_keys: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.requires.push(dependency.into());
        self
    }

    pub fn node_type(mut self, name: impl Into<String>) -> Self {
        self.node_types.push(name.into());
        self
    }

    pub fn edge_type(mut self, def: EdgeTypeDef) -> Self {
        self.edge_types.push(def);
        self
    }

    pub fn semantic_tag(mut self, name: impl Into<String>) -> Self {
        self.semantic_tags.push(name.into());
        self
    }

    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_keys.push(key.into());
        self
    }

    /// All ordering dependencies: `extends ∪ requires`.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.extends
            .iter()
            .chain(self.requires.iter())
            .map(String::as_str)
    }
}
