//! Built-in scenario analyzers.

pub mod basic_structure;
pub mod file_dependency;
pub mod markdown_linking;
pub mod method_analysis;
pub mod symbol_dependency;

use crate::analyzer::ScenarioAnalyzer;
use crate::spec::ScenarioSpec;
use std::sync::Arc;

/// The built-in scenarios in registration order (dependencies first).
pub fn builtins() -> Vec<(ScenarioSpec, Arc<dyn ScenarioAnalyzer>)> {
    vec![
        (
            basic_structure::spec(),
            Arc::new(basic_structure::BasicStructure) as Arc<dyn ScenarioAnalyzer>,
        ),
        (
            file_dependency::spec(),
            Arc::new(file_dependency::FileDependency),
        ),
        (
            symbol_dependency::spec(),
            Arc::new(symbol_dependency::SymbolDependency),
        ),
        (
            markdown_linking::spec(),
            Arc::new(markdown_linking::MarkdownLinking),
        ),
        (
            method_analysis::spec(),
            Arc::new(method_analysis::MethodAnalysis),
        ),
    ]
}

/// Resolve a relative specifier against the directory of the importing
/// file. Returns a project-relative forward-slash path, or `None` when the
/// specifier escapes the project root.
pub(crate) fn resolve_relative(importer: &str, specifier: &str) -> Option<String> {
    let dir = match importer.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let mut segments: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for seg in specifier.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return None;
                }
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Append the importing file's extension when the resolved target has none
/// (`./b` from `src/a.ts` resolves to `src/b.ts`).
pub(crate) fn with_importer_extension(target: String, importer: &str) -> String {
    let has_extension = target
        .rsplit('/')
        .next()
        .is_some_and(|basename| basename.contains('.'));
    if has_extension {
        return target;
    }
    match importer.rsplit_once('.') {
        Some((_, ext)) => format!("{target}.{ext}"),
        None => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_sibling_and_parent_paths() {
        assert_eq!(
            resolve_relative("src/a.ts", "./b").as_deref(),
            Some("src/b")
        );
        assert_eq!(
            resolve_relative("src/deep/a.ts", "../b.ts").as_deref(),
            Some("src/b.ts")
        );
        assert_eq!(resolve_relative("a.ts", "../escape"), None);
    }

    #[test]
    fn extension_is_borrowed_from_importer() {
        assert_eq!(
            with_importer_extension("src/b".to_string(), "src/a.ts"),
            "src/b.ts"
        );
        assert_eq!(
            with_importer_extension("src/b.js".to_string(), "src/a.ts"),
            "src/b.js"
        );
    }
}
