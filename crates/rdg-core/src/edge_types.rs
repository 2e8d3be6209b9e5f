//! Typed edge catalogue: parent links, transitivity/inheritability flags,
//! and deterministic hierarchy expansion.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Declaration of a single edge type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_transitive: bool,
    #[serde(default)]
    pub is_inheritable: bool,
    #[serde(default)]
    pub is_hierarchical: bool,
    #[serde(default = "default_directed")]
    pub is_directed: bool,
    #[serde(default)]
    pub priority: i32,
}

fn default_directed() -> bool {
    true
}

/// Names in the pre-seeded standard catalogue. Analyzers may emit these
/// without declaring them in their scenario spec.
pub const STANDARD_EDGE_TYPES: &[&str] = &[
    "contains",
    "declares",
    "defines",
    "depends_on",
    "imports",
    "imports_file",
    "imports_library",
    "exports",
    "extends",
    "implements",
    "references",
    "uses",
    "calls",
    "aliasOf",
];

impl EdgeTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_transitive: false,
            is_inheritable: false,
            is_hierarchical: false,
            is_directed: true,
            priority: 0,
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn transitive(mut self) -> Self {
        self.is_transitive = true;
        self
    }

    pub fn inheritable(mut self) -> Self {
        self.is_inheritable = true;
        self
    }

    pub fn hierarchical(mut self) -> Self {
        self.is_hierarchical = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// The authoritative edge type catalogue. Read-mostly: populated at
/// bootstrap (standard catalogue plus scenario declarations), then shared
/// immutably behind an `Arc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeTypeRegistry {
    defs: BTreeMap<String, EdgeTypeDef>,
}

impl EdgeTypeRegistry {
    /// An empty registry, for tests and incremental bootstrap.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with the standard catalogue.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        let catalogue = [
            EdgeTypeDef::new("contains")
                .transitive()
                .inheritable()
                .hierarchical(),
            EdgeTypeDef::new("declares").inheritable().hierarchical(),
            EdgeTypeDef::new("defines"),
            EdgeTypeDef::new("depends_on").transitive().priority(1),
            EdgeTypeDef::new("imports").parent("depends_on").priority(1),
            EdgeTypeDef::new("imports_file").parent("imports").priority(1),
            EdgeTypeDef::new("imports_library")
                .parent("imports")
                .priority(1),
            EdgeTypeDef::new("exports").priority(1),
            EdgeTypeDef::new("extends")
                .transitive()
                .inheritable()
                .priority(2),
            EdgeTypeDef::new("implements").priority(2),
            EdgeTypeDef::new("references").priority(3),
            EdgeTypeDef::new("uses").priority(3),
            EdgeTypeDef::new("calls").parent("uses").priority(3),
            EdgeTypeDef::new("aliasOf").parent("references").priority(5),
        ];
        for def in catalogue {
            registry
                .register(def)
                .expect("standard catalogue is internally consistent");
        }
        registry
    }

    /// Register a new edge type. Fails on duplicate names, unknown or cyclic
    /// parents, and inconsistent traversal flags.
    pub fn register(&mut self, def: EdgeTypeDef) -> Result<(), RegistryError> {
        if self.defs.contains_key(&def.name) {
            return Err(RegistryError::DuplicateEdgeType(def.name));
        }
        if let Some(parent) = &def.parent {
            if parent == &def.name {
                return Err(RegistryError::ParentCycle(def.name));
            }
            if !self.defs.contains_key(parent) {
                return Err(RegistryError::UnknownParent {
                    name: def.name,
                    parent: parent.clone(),
                });
            }
            // Parents must already exist, so chains can only grow at the
            // leaves; still walk the chain to guard against future mutation.
            let mut seen = BTreeSet::new();
            let mut cursor = Some(parent.clone());
            while let Some(name) = cursor {
                if !seen.insert(name.clone()) {
                    return Err(RegistryError::ParentCycle(name));
                }
                cursor = self.defs.get(&name).and_then(|d| d.parent.clone());
            }
            // Flag monotonicity: a transitive child must agree on direction
            // with every transitive ancestor, or closure traversal over the
            // expanded type set would be ill-defined.
            if def.is_transitive {
                for ancestor in self.chain_from(parent) {
                    if ancestor.is_transitive && ancestor.is_directed != def.is_directed {
                        return Err(RegistryError::InconsistentFlags {
                            name: def.name,
                            reason: format!(
                                "transitive ancestor `{}` differs in directedness",
                                ancestor.name
                            ),
                        });
                    }
                }
            }
        }
        self.defs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EdgeTypeDef> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The parent chain for a type: self first, then ascending ancestors.
    pub fn parent_chain(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cursor = Some(name.to_string());
        while let Some(current) = cursor {
            let Some(def) = self.defs.get(&current) else {
                break;
            };
            chain.push(current);
            cursor = def.parent.clone();
        }
        chain
    }

    /// All strict descendants of a type.
    pub fn descendants(&self, name: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut frontier = VecDeque::from([name.to_string()]);
        while let Some(current) = frontier.pop_front() {
            for def in self.defs.values() {
                if def.parent.as_deref() == Some(current.as_str()) && result.insert(def.name.clone())
                {
                    frontier.push_back(def.name.clone());
                }
            }
        }
        result
    }

    /// Whether the type itself, or any ancestor in its parent chain, is
    /// transitive. Lets `imports_file` participate in `depends_on` closures.
    pub fn is_transitive(&self, name: &str) -> bool {
        self.parent_chain(name)
            .iter()
            .any(|n| self.defs.get(n).is_some_and(|d| d.is_transitive))
    }

    pub fn is_inheritable(&self, name: &str) -> bool {
        self.defs.get(name).is_some_and(|d| d.is_inheritable)
    }

    /// Edge types flagged hierarchical (structural containment).
    pub fn hierarchical_types(&self) -> Vec<String> {
        self.defs
            .values()
            .filter(|d| d.is_hierarchical)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Edge types flagged inheritable (relation propagation carriers).
    pub fn inheritable_types(&self) -> Vec<String> {
        self.defs
            .values()
            .filter(|d| d.is_inheritable)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Deterministic expansion of a type over the registry tree: self first,
    /// then descendants in BFS order sorted by `(priority, name)`, then
    /// parents ascending.
    pub fn expand(&self, name: &str, include_children: bool, include_parents: bool) -> Vec<String> {
        let mut expansion = vec![name.to_string()];
        if include_children {
            let mut frontier = vec![name.to_string()];
            while !frontier.is_empty() {
                let mut level: Vec<&EdgeTypeDef> = self
                    .defs
                    .values()
                    .filter(|d| {
                        d.parent
                            .as_deref()
                            .is_some_and(|p| frontier.iter().any(|f| f == p))
                    })
                    .collect();
                level.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));
                frontier = level.iter().map(|d| d.name.clone()).collect();
                for def in level {
                    if !expansion.contains(&def.name) {
                        expansion.push(def.name.clone());
                    }
                }
            }
        }
        if include_parents {
            for ancestor in self.parent_chain(name).into_iter().skip(1) {
                if !expansion.contains(&ancestor) {
                    expansion.push(ancestor);
                }
            }
        }
        expansion
    }

    fn chain_from(&self, name: &str) -> Vec<&EdgeTypeDef> {
        let mut chain = Vec::new();
        let mut cursor = Some(name.to_string());
        while let Some(current) = cursor {
            let Some(def) = self.defs.get(&current) else {
                break;
            };
            chain.push(def);
            cursor = def.parent.clone();
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_seeded() {
        let registry = EdgeTypeRegistry::standard();
        assert_eq!(registry.len(), 14);
        assert!(registry.is_transitive("depends_on"));
        assert!(registry.is_transitive("imports_file")); // via depends_on
        assert!(!registry.is_transitive("defines"));
        assert!(registry.is_inheritable("contains"));
        assert!(!registry.is_inheritable("imports"));
    }

    #[test]
    fn parent_chain_self_first() {
        let registry = EdgeTypeRegistry::standard();
        assert_eq!(
            registry.parent_chain("imports_file"),
            vec!["imports_file", "imports", "depends_on"]
        );
        assert_eq!(registry.parent_chain("contains"), vec!["contains"]);
    }

    #[test]
    fn descendants_are_strict() {
        let registry = EdgeTypeRegistry::standard();
        let descendants = registry.descendants("depends_on");
        assert_eq!(
            descendants.into_iter().collect::<Vec<_>>(),
            vec!["imports", "imports_file", "imports_library"]
        );
        assert!(registry.descendants("aliasOf").is_empty());
    }

    #[test]
    fn expansion_is_deterministic() {
        let registry = EdgeTypeRegistry::standard();
        let expansion = registry.expand("imports", true, false);
        assert_eq!(expansion, vec!["imports", "imports_file", "imports_library"]);
        let with_parents = registry.expand("imports_file", false, true);
        assert_eq!(with_parents, vec!["imports_file", "imports", "depends_on"]);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = EdgeTypeRegistry::standard();
        let err = registry.register(EdgeTypeDef::new("imports")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEdgeType(_)));
    }

    #[test]
    fn unknown_parent_fails() {
        let mut registry = EdgeTypeRegistry::empty();
        let err = registry
            .register(EdgeTypeDef::new("md-links-to").parent("references"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownParent { .. }));
    }

    #[test]
    fn self_parent_fails() {
        let mut registry = EdgeTypeRegistry::empty();
        let err = registry
            .register(EdgeTypeDef::new("loops").parent("loops"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ParentCycle(_)));
    }

    #[test]
    fn transitive_child_must_match_ancestor_direction() {
        let mut registry = EdgeTypeRegistry::empty();
        registry
            .register(EdgeTypeDef::new("flows").transitive())
            .unwrap();
        let mut undirected = EdgeTypeDef::new("flows_both").parent("flows").transitive();
        undirected.is_directed = false;
        let err = registry.register(undirected).unwrap_err();
        assert!(matches!(err, RegistryError::InconsistentFlags { .. }));
        // A non-transitive child under a transitive parent is fine.
        registry
            .register(EdgeTypeDef::new("flows_once").parent("flows"))
            .unwrap();
    }

    #[test]
    fn scenario_extension_types_register() {
        let mut registry = EdgeTypeRegistry::standard();
        registry
            .register(EdgeTypeDef::new("md-links-to").parent("references").priority(3))
            .unwrap();
        assert!(registry.contains("md-links-to"));
        assert_eq!(
            registry.expand("references", true, false),
            vec!["references", "md-links-to", "aliasOf"]
        );
    }
}
