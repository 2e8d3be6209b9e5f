//! Resolve a namespace's file list from its include/exclude glob patterns.

use crate::config::NamespaceConfig;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob `{pattern}`"))?);
    }
    builder.build().context("failed to build glob set")
}

/// Walk the project root and return the namespace's matching files as
/// sorted, project-relative, forward-slash paths. Respects `.gitignore`
/// and a custom `.rdgignore`.
pub fn resolve_files(project_root: &Path, config: &NamespaceConfig) -> Result<Vec<String>> {
    let include = if config.file_patterns.is_empty() {
        build_globset(&["**/*".to_string()])?
    } else {
        build_globset(&config.file_patterns)?
    };
    let exclude = build_globset(&config.exclude_patterns)?;

    let walker = ignore::WalkBuilder::new(project_root)
        .hidden(true)
        .git_ignore(true)
        .add_custom_ignore_filename(".rdgignore")
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(project_root) else {
            continue;
        };
        let path = relative.to_string_lossy().replace('\\', "/");
        if include.is_match(&path) && !exclude.is_match(&path) {
            files.push(path);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(patterns: &[&str], excludes: &[&str]) -> NamespaceConfig {
        NamespaceConfig {
            project_name: "proj".to_string(),
            file_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: excludes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn patterns_and_excludes_apply() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "export const A = 1;").unwrap();
        std::fs::write(tmp.path().join("src/a.test.ts"), "test").unwrap();
        std::fs::write(tmp.path().join("README.md"), "# hi").unwrap();

        let files = resolve_files(
            tmp.path(),
            &config(&["src/**/*.ts"], &["**/*.test.ts"]),
        )
        .unwrap();
        assert_eq!(files, vec!["src/a.ts"]);
    }

    #[test]
    fn rdgignore_is_respected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "1").unwrap();
        std::fs::write(tmp.path().join("src/generated.ts"), "2").unwrap();
        std::fs::write(tmp.path().join(".rdgignore"), "generated.ts\n").unwrap();

        let files = resolve_files(tmp.path(), &config(&["src/**/*.ts"], &[])).unwrap();
        assert_eq!(files, vec!["src/a.ts"]);
    }

    #[test]
    fn output_is_sorted_and_relative() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("b")).unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::write(tmp.path().join("b/z.ts"), "1").unwrap();
        std::fs::write(tmp.path().join("a/y.ts"), "1").unwrap();

        let files = resolve_files(tmp.path(), &config(&["**/*.ts"], &[])).unwrap();
        assert_eq!(files, vec!["a/y.ts", "b/z.ts"]);
    }
}
