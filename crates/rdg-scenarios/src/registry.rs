//! Scenario registry: spec validation, type inheritance flattening, and
//! deterministic topological execution order.

use crate::analyzer::{AnalysisResult, ScenarioAnalyzer};
use crate::spec::ScenarioSpec;
use rdg_core::edge_types::{EdgeTypeRegistry, STANDARD_EDGE_TYPES};
use rdg_core::error::RegistryError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Holds scenario specs and their analyzers. Read-mostly: populated at
/// bootstrap, then shared immutably behind an `Arc`.
#[derive(Default)]
pub struct ScenarioRegistry {
    specs: BTreeMap<String, ScenarioSpec>,
    analyzers: BTreeMap<String, Arc<dyn ScenarioAnalyzer>>,
}

impl std::fmt::Debug for ScenarioRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRegistry")
            .field("scenarios", &self.specs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ScenarioRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the five built-in scenarios registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (spec, analyzer) in crate::analyzers::builtins() {
            registry
                .register(spec, analyzer)
                .expect("built-in scenarios are internally consistent");
        }
        registry
    }

    /// Register a scenario. Its `extends`/`requires` targets must already be
    /// registered, which keeps the dependency graph acyclic by construction.
    pub fn register(
        &mut self,
        spec: ScenarioSpec,
        analyzer: Arc<dyn ScenarioAnalyzer>,
    ) -> Result<(), RegistryError> {
        if self.specs.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateScenario(spec.id));
        }
        for dependency in spec.dependencies() {
            if dependency == spec.id {
                return Err(RegistryError::ScenarioCycle(vec![spec.id.clone()]));
            }
            if !self.specs.contains_key(dependency) {
                return Err(RegistryError::UnknownDependency {
                    scenario: spec.id.clone(),
                    dependency: dependency.to_string(),
                });
            }
        }
        self.analyzers.insert(spec.id.clone(), analyzer);
        self.specs.insert(spec.id.clone(), spec);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioSpec> {
        self.specs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    pub fn analyzer(&self, id: &str) -> Option<Arc<dyn ScenarioAnalyzer>> {
        self.analyzers.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Register every scenario-declared edge type into the edge registry.
    /// Duplicate declarations fail, per the registry contract.
    pub fn register_edge_types(
        &self,
        edge_registry: &mut EdgeTypeRegistry,
    ) -> Result<(), RegistryError> {
        // Deterministic: scenarios in id order, declarations in spec order.
        for spec in self.specs.values() {
            for def in &spec.edge_types {
                edge_registry.register(def.clone())?;
            }
        }
        Ok(())
    }

    /// Compute the execution order for the requested scenarios plus all of
    /// their transitive dependencies: Kahn's algorithm over
    /// `extends ∪ requires`, ties broken by id (lexicographic ascending).
    pub fn execution_order(&self, requested: &[String]) -> Result<Vec<String>, RegistryError> {
        // Close over dependencies first.
        let mut members: BTreeSet<String> = BTreeSet::new();
        let mut frontier: Vec<String> = Vec::new();
        for id in requested {
            let spec = self
                .specs
                .get(id)
                .ok_or_else(|| RegistryError::UnknownDependency {
                    scenario: id.clone(),
                    dependency: id.clone(),
                })?;
            if members.insert(spec.id.clone()) {
                frontier.push(spec.id.clone());
            }
        }
        while let Some(id) = frontier.pop() {
            let spec = &self.specs[&id];
            for dependency in spec.dependencies() {
                if members.insert(dependency.to_string()) {
                    frontier.push(dependency.to_string());
                }
            }
        }

        // Kahn over the member set. A dependency named by both `extends`
        // and `requires` counts once.
        let dependency_sets: BTreeMap<&str, BTreeSet<&str>> = members
            .iter()
            .map(|id| {
                let deps: BTreeSet<&str> = self.specs[id]
                    .dependencies()
                    .filter(|d| members.contains(*d))
                    .collect();
                (id.as_str(), deps)
            })
            .collect();
        let mut in_degree: BTreeMap<&str, usize> = dependency_sets
            .iter()
            .map(|(&id, deps)| (id, deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(members.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(next);
            order.push(next.to_string());
            for (&id, deps) in &dependency_sets {
                if deps.contains(next) {
                    let degree = in_degree.get_mut(id).expect("member");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(id);
                    }
                }
            }
        }

        if order.len() != members.len() {
            let stuck: Vec<String> = in_degree
                .iter()
                .filter(|&(_, &d)| d > 0)
                .map(|(&id, _)| id.to_string())
                .collect();
            return Err(RegistryError::ScenarioCycle(stuck));
        }
        Ok(order)
    }

    /// Extension node types a scenario may emit, including those inherited
    /// through its `extends` chain.
    pub fn flattened_node_types(&self, id: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.walk_extends(id, &mut |spec| {
            result.extend(spec.node_types.iter().cloned());
        });
        result
    }

    /// Edge types a scenario may emit beyond the standard catalogue,
    /// including inherited declarations.
    pub fn flattened_edge_types(&self, id: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.walk_extends(id, &mut |spec| {
            result.extend(spec.edge_types.iter().map(|d| d.name.clone()));
        });
        result
    }

    /// Semantic tag categories, including inherited declarations.
    pub fn flattened_semantic_tags(&self, id: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.walk_extends(id, &mut |spec| {
            result.extend(spec.semantic_tags.iter().cloned());
        });
        result
    }

    /// Accepted `scenarioConfig` keys, including inherited declarations.
    pub fn flattened_config_keys(&self, id: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.walk_extends(id, &mut |spec| {
            result.extend(spec.config_keys.iter().cloned());
        });
        result
    }

    fn walk_extends(&self, id: &str, visit: &mut impl FnMut(&ScenarioSpec)) {
        let mut seen = BTreeSet::new();
        let mut frontier = vec![id.to_string()];
        while let Some(current) = frontier.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(spec) = self.specs.get(&current) {
                visit(spec);
                frontier.extend(spec.extends.iter().cloned());
            }
        }
    }

    /// Check that every custom type in a result is declared by the emitting
    /// scenario (standard types always pass).
    pub fn validate_result(
        &self,
        scenario_id: &str,
        result: &AnalysisResult,
    ) -> Result<(), RegistryError> {
        let node_types = self.flattened_node_types(scenario_id);
        for node in &result.nodes {
            if !node.node_type.is_standard()
                && !node_types.contains(node.node_type.as_str())
            {
                return Err(RegistryError::UndeclaredType {
                    scenario: scenario_id.to_string(),
                    kind: "node".to_string(),
                    type_name: node.node_type.as_str().to_string(),
                });
            }
        }
        let edge_types = self.flattened_edge_types(scenario_id);
        for edge in &result.edges {
            if !STANDARD_EDGE_TYPES.contains(&edge.edge_type.as_str())
                && !edge_types.contains(&edge.edge_type)
            {
                return Err(RegistryError::UndeclaredType {
                    scenario: scenario_id.to_string(),
                    kind: "edge".to_string(),
                    type_name: edge.edge_type.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisContext;

    struct NoopAnalyzer;
    impl ScenarioAnalyzer for NoopAnalyzer {
        fn analyze(&self, _ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
            Ok(AnalysisResult::default())
        }
    }

    fn noop() -> Arc<dyn ScenarioAnalyzer> {
        Arc::new(NoopAnalyzer)
    }

    #[test]
    fn builtin_registry_has_five_scenarios() {
        let registry = ScenarioRegistry::with_builtins();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(
            ids,
            vec![
                "basic-structure",
                "file-dependency",
                "markdown-linking",
                "method-analysis",
                "symbol-dependency",
            ]
        );
    }

    #[test]
    fn execution_order_is_topological_and_deterministic() {
        let registry = ScenarioRegistry::with_builtins();
        let order = registry
            .execution_order(&["method-analysis".to_string(), "file-dependency".to_string()])
            .unwrap();
        assert_eq!(
            order,
            vec![
                "basic-structure",
                "file-dependency",
                "symbol-dependency",
                "method-analysis",
            ]
        );
        // Stable across repeated computation.
        let again = registry
            .execution_order(&["file-dependency".to_string(), "method-analysis".to_string()])
            .unwrap();
        assert_eq!(order, again);
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let registry = ScenarioRegistry::with_builtins();
        let err = registry
            .execution_order(&["nonexistent".to_string()])
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDependency { .. }));
    }

    #[test]
    fn registration_requires_known_dependencies() {
        let mut registry = ScenarioRegistry::empty();
        let err = registry
            .register(ScenarioSpec::new("late").extends("missing"), noop())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDependency { .. }));
    }

    #[test]
    fn self_extension_is_a_cycle() {
        let mut registry = ScenarioRegistry::empty();
        let err = registry
            .register(ScenarioSpec::new("selfish").extends("selfish"), noop())
            .unwrap_err();
        assert!(matches!(err, RegistryError::ScenarioCycle(_)));
    }

    #[test]
    fn extends_flattens_declarations() {
        let mut registry = ScenarioRegistry::empty();
        registry
            .register(ScenarioSpec::new("base").node_type("Widget"), noop())
            .unwrap();
        registry
            .register(
                ScenarioSpec::new("derived")
                    .extends("base")
                    .node_type("Gadget"),
                noop(),
            )
            .unwrap();
        let flattened = registry.flattened_node_types("derived");
        assert!(flattened.contains("Widget"));
        assert!(flattened.contains("Gadget"));
        // `requires` does not inherit declarations.
        registry
            .register(ScenarioSpec::new("ordered").requires("base"), noop())
            .unwrap();
        assert!(registry.flattened_node_types("ordered").is_empty());
    }

    #[test]
    fn extends_and_requires_naming_one_parent_count_once() {
        let mut registry = ScenarioRegistry::empty();
        registry.register(ScenarioSpec::new("base"), noop()).unwrap();
        registry
            .register(
                ScenarioSpec::new("derived").extends("base").requires("base"),
                noop(),
            )
            .unwrap();
        let order = registry
            .execution_order(&["derived".to_string()])
            .unwrap();
        assert_eq!(order, vec!["base", "derived"]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let mut registry = ScenarioRegistry::empty();
        registry.register(ScenarioSpec::new("zeta"), noop()).unwrap();
        registry
            .register(ScenarioSpec::new("alpha"), noop())
            .unwrap();
        registry
            .register(ScenarioSpec::new("omega"), noop())
            .unwrap();
        let order = registry
            .execution_order(&[
                "zeta".to_string(),
                "alpha".to_string(),
                "omega".to_string(),
            ])
            .unwrap();
        assert_eq!(order, vec!["alpha", "omega", "zeta"]);
    }
}
