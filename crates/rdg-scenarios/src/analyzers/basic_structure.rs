//! `basic-structure`: file and directory nodes, containment edges, and
//! path-pattern semantic tags.

use crate::analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
use crate::spec::ScenarioSpec;
use rdg_core::address::{NodeType, RdfAddress};
use rdg_core::model::{EdgeDraft, NodeDraft};

pub const ID: &str = "basic-structure";

pub fn spec() -> ScenarioSpec {
    ScenarioSpec::new(ID)
        .semantic_tag("source")
        .semantic_tag("test")
        .semantic_tag("config")
}

/// Classify a file path into one of the structural tags.
fn classify(path: &str) -> &'static str {
    let lowered = path.to_lowercase();
    let basename = lowered.rsplit('/').next().unwrap_or(&lowered);
    if lowered.contains("__tests__")
        || lowered.contains("/test/")
        || lowered.starts_with("test/")
        || lowered.contains("/tests/")
        || lowered.starts_with("tests/")
        || basename.contains(".test.")
        || basename.contains(".spec.")
        || basename.starts_with("test_")
    {
        return "test";
    }
    if basename.contains("config") || basename.starts_with('.') {
        return "config";
    }
    "source"
}

pub struct BasicStructure;

impl ScenarioAnalyzer for BasicStructure {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
        let mut result = AnalysisResult::default();
        let file_address = ctx.file_address()?;
        let basename = ctx
            .file_path
            .rsplit('/')
            .next()
            .unwrap_or(ctx.file_path)
            .to_string();

        // Directory chain: emit each ancestor with a containment edge.
        let segments: Vec<&str> = ctx.file_path.split('/').collect();
        let mut previous: Option<RdfAddress> = None;
        for depth in 1..segments.len() {
            let dir_path = segments[..depth].join("/");
            let dir_address = RdfAddress::file(ctx.project_name, &dir_path)?;
            result.nodes.push(
                NodeDraft::new(
                    dir_address.clone(),
                    NodeType::Directory,
                    segments[depth - 1],
                )
                .with_source_file(&dir_path),
            );
            if let Some(parent) = previous {
                result
                    .edges
                    .push(EdgeDraft::new(parent, dir_address.clone(), "contains"));
            }
            previous = Some(dir_address);
        }

        result.nodes.push(
            NodeDraft::new(file_address.clone(), NodeType::File, basename)
                .with_source_file(ctx.file_path)
                .with_language(ctx.language.name())
                .with_tag(classify(ctx.file_path))
                .with_property(
                    "lineCount",
                    serde_json::json!(ctx.unit.source.lines().count()),
                ),
        );
        if let Some(parent) = previous {
            result.edges.push(
                EdgeDraft::new(parent, file_address, "contains").with_source_file(ctx.file_path),
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_paths() {
        assert_eq!(classify("src/a.ts"), "source");
        assert_eq!(classify("src/a.test.ts"), "test");
        assert_eq!(classify("tests/helpers.py"), "test");
        assert_eq!(classify("src/__tests__/a.ts"), "test");
        assert_eq!(classify("jest.config.js"), "config");
        assert_eq!(classify(".eslintrc.js"), "config");
    }
}
