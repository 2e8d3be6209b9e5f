//! Namespace configuration: the JSON file mapping namespace names to
//! file-pattern views and scenario compositions.
//!
//! Unknown top-level keys are preserved verbatim; unknown namespace keys
//! are rejected. Referenced scenario ids must exist in the registry.

use rdg_core::error::ConfigError;
use rdg_scenarios::ScenarioRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The whole namespace configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceFile {
    /// Namespace used when none is named on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceConfig>,
    /// Unknown top-level keys, preserved verbatim across round trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One namespace: a file-pattern view bound to a scenario composition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NamespaceConfig {
    pub project_name: String,
    #[serde(default)]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<String>,
    #[serde(default)]
    pub scenario_config: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub semantic_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdf: Option<RdfOptions>,
    /// Bounded worker pool size for this namespace's file tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

/// Persistence options for the namespace's graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdfOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NamespaceFile {
    pub fn from_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_str(&content)
    }

    pub fn get(&self, namespace: &str) -> Result<&NamespaceConfig, ConfigError> {
        self.namespaces
            .get(namespace)
            .ok_or_else(|| ConfigError::MissingNamespace(namespace.to_string()))
    }

    /// The namespace to run when none is named.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.namespaces.keys().next().map(String::as_str))
    }

    /// Validate every namespace in the file. A broken namespace fails the
    /// whole-file check even when it is never run; the runner validates
    /// only the namespace it was asked for.
    pub fn validate(&self, registry: &ScenarioRegistry) -> Result<(), ConfigError> {
        for (name, namespace) in &self.namespaces {
            namespace.validate(name, registry)?;
        }
        Ok(())
    }
}

impl NamespaceConfig {
    /// Validate this namespace against the scenario registry: referenced
    /// scenarios must exist, and per-scenario config keys must be declared.
    pub fn validate(&self, name: &str, registry: &ScenarioRegistry) -> Result<(), ConfigError> {
        for scenario in &self.scenarios {
            if !registry.contains(scenario) {
                return Err(ConfigError::UnknownScenario {
                    namespace: name.to_string(),
                    scenario: scenario.clone(),
                });
            }
        }
        for (scenario, config) in &self.scenario_config {
            if !registry.contains(scenario) {
                return Err(ConfigError::UnknownScenario {
                    namespace: name.to_string(),
                    scenario: scenario.clone(),
                });
            }
            let accepted = registry.flattened_config_keys(scenario);
            for key in config.keys() {
                if !accepted.contains(key) {
                    return Err(ConfigError::UnknownScenarioConfigKey {
                        scenario: scenario.clone(),
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
{
  "default": "src",
  "namespaces": {
    "src": {
      "projectName": "proj",
      "filePatterns": ["src/**/*.ts"],
      "excludePatterns": ["**/*.test.ts"],
      "scenarios": ["basic-structure", "file-dependency"],
      "scenarioConfig": {
        "method-analysis": { "complexityThreshold": 5 }
      }
    }
  },
  "customTool": { "keep": true }
}
"#;

    #[test]
    fn parses_and_preserves_unknown_top_level_keys() {
        let file = NamespaceFile::from_str(SAMPLE).unwrap();
        assert_eq!(file.default.as_deref(), Some("src"));
        let ns = file.get("src").unwrap();
        assert_eq!(ns.project_name, "proj");
        assert_eq!(ns.scenarios.len(), 2);
        assert_eq!(
            file.extra["customTool"],
            serde_json::json!({ "keep": true })
        );
        // Round trip keeps the unknown key verbatim.
        let rendered = serde_json::to_string(&file).unwrap();
        let reparsed = NamespaceFile::from_str(&rendered).unwrap();
        assert_eq!(reparsed.extra["customTool"], file.extra["customTool"]);
    }

    #[test]
    fn rejects_unknown_namespace_keys() {
        let bad = r#"
{ "namespaces": { "src": { "projectName": "p", "watchMode": true } } }
"#;
        let err = NamespaceFile::from_str(bad).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_namespace_is_reported() {
        let file = NamespaceFile::from_str(SAMPLE).unwrap();
        let err = file.get("nope").unwrap_err();
        assert!(matches!(err, ConfigError::MissingNamespace(_)));
    }

    #[test]
    fn validation_rejects_unknown_scenarios() {
        let registry = ScenarioRegistry::with_builtins();
        let mut file = NamespaceFile::from_str(SAMPLE).unwrap();
        file.namespaces
            .get_mut("src")
            .unwrap()
            .scenarios
            .push("nonexistent".to_string());
        let err = file.validate(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScenario { .. }));
    }

    #[test]
    fn validation_rejects_undeclared_config_keys() {
        let registry = ScenarioRegistry::with_builtins();
        let mut file = NamespaceFile::from_str(SAMPLE).unwrap();
        file.namespaces
            .get_mut("src")
            .unwrap()
            .scenario_config
            .get_mut("method-analysis")
            .unwrap()
            .insert("mystery".to_string(), serde_json::json!(1));
        let err = file.validate(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScenarioConfigKey { .. }));
    }

    #[test]
    fn valid_config_passes() {
        let registry = ScenarioRegistry::with_builtins();
        let file = NamespaceFile::from_str(SAMPLE).unwrap();
        file.validate(&registry).unwrap();
    }

    #[test]
    fn namespace_validation_is_scoped() {
        let registry = ScenarioRegistry::with_builtins();
        let mut file = NamespaceFile::from_str(SAMPLE).unwrap();
        file.namespaces.insert(
            "broken".to_string(),
            NamespaceConfig {
                project_name: "p".to_string(),
                scenarios: vec!["nonexistent".to_string()],
                ..Default::default()
            },
        );
        // The good namespace validates on its own even though the file as
        // a whole does not.
        file.get("src").unwrap().validate("src", &registry).unwrap();
        assert!(file.validate(&registry).is_err());
        let err = file
            .get("broken")
            .unwrap()
            .validate("broken", &registry)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScenario { .. }));
    }
}
