//! Runtime configuration for storage, the runner, and inference queries.
//!
//! Load order: `.rdg/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RdgConfig {
    pub storage: StorageConfig,
    pub runner: RunnerConfig,
    pub query: QueryConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Compress graph.json with zstd before writing.
    /// Decompression on load is automatic (detected by magic bytes).
    pub compress: bool,
}

/// Namespace runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Bounded worker pool size for file-level analysis tasks.
    /// Overridden per namespace by `maxConcurrency`.
    pub max_concurrency: usize,
}

/// Inference query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Per-call timeout in milliseconds; expired queries return partial
    /// results with a flag.
    pub timeout_ms: u64,
    /// Default transitive closure depth.
    pub max_transitive_depth: usize,
    /// Default inheritable propagation depth.
    pub max_inheritable_depth: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_transitive_depth: 10,
            max_inheritable_depth: 5,
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl RdgConfig {
    /// Load config from `.rdg/config.toml` in the project root, with env var
    /// overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".rdg").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("RDG_MAX_CONCURRENCY", &mut config.runner.max_concurrency);
        env_override("RDG_QUERY_TIMEOUT_MS", &mut config.query.timeout_ms);
        env_override(
            "RDG_MAX_TRANSITIVE_DEPTH",
            &mut config.query.max_transitive_depth,
        );
        env_override(
            "RDG_MAX_INHERITABLE_DEPTH",
            &mut config.query.max_inheritable_depth,
        );

        if config.runner.max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be at least 1");
        }
        if config.query.timeout_ms == 0 {
            anyhow::bail!("query timeout_ms must be non-zero");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RdgConfig::default();
        assert!(!config.storage.compress);
        assert_eq!(config.runner.max_concurrency, 4);
        assert_eq!(config.query.timeout_ms, 30_000);
        assert_eq!(config.query.max_transitive_depth, 10);
        assert_eq!(config.query.max_inheritable_depth, 5);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[storage]
compress = true

[runner]
max_concurrency = 8

[query]
timeout_ms = 5000
"#;
        let config: RdgConfig = toml::from_str(toml_str).unwrap();
        assert!(config.storage.compress);
        assert_eq!(config.runner.max_concurrency, 8);
        assert_eq!(config.query.timeout_ms, 5000);
        // Defaults for unspecified fields
        assert_eq!(config.query.max_transitive_depth, 10);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = RdgConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.runner.max_concurrency, 4);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let tmp = tempfile::tempdir().unwrap();
        let rdg_dir = tmp.path().join(".rdg");
        std::fs::create_dir_all(&rdg_dir).unwrap();
        std::fs::write(
            rdg_dir.join("config.toml"),
            "[runner]\nmax_concurrency = 0\n",
        )
        .unwrap();
        assert!(RdgConfig::load(tmp.path()).is_err());
    }
}
