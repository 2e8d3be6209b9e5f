//! `markdown-linking`: heading symbols and document link edges
//! (`md-links-to`, `md-embeds-image`, `md-wiki-links`,
//! `md-references-symbol`, `md-includes`, `md-links-anchor`).

use crate::analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
use crate::analyzers::resolve_relative;
use crate::spec::ScenarioSpec;
use rdg_core::address::{AddressError, NodeType, RdfAddress};
use rdg_core::edge_types::EdgeTypeDef;
use rdg_core::model::{EdgeDraft, NodeDraft};
use regex::Regex;
use std::sync::OnceLock;

pub const ID: &str = "markdown-linking";

pub fn spec() -> ScenarioSpec {
    ScenarioSpec::new(ID)
        .extends(super::basic_structure::ID)
        .edge_type(EdgeTypeDef::new("md-links-to").parent("references").priority(3))
        .edge_type(
            EdgeTypeDef::new("md-embeds-image")
                .parent("references")
                .priority(3),
        )
        .edge_type(
            EdgeTypeDef::new("md-wiki-links")
                .parent("references")
                .priority(3),
        )
        .edge_type(
            EdgeTypeDef::new("md-references-symbol")
                .parent("references")
                .priority(3),
        )
        .edge_type(EdgeTypeDef::new("md-includes").parent("imports").priority(1))
        .edge_type(
            EdgeTypeDef::new("md-links-anchor")
                .parent("references")
                .priority(3),
        )
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,6})\s+(.+?)\s*$").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Optional leading `!` distinguishes image embeds from links.
    RE.get_or_init(|| Regex::new(r"(!)?\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"))
}

fn wiki_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Optional leading `!` distinguishes transclusion from wiki links.
    RE.get_or_init(|| Regex::new(r"(!)?\[\[([^\]\|#]+)(#[^\]\|]+)?(\|[^\]]+)?\]\]").expect("valid regex"))
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs"];

/// Slugify a heading: GitHub-style anchors (lowercase, hyphens, alphanumerics
/// only). The slug is an anchor identity, not an address normalization.
fn slugify(heading: &str) -> String {
    let mut slug = String::with_capacity(heading.len());
    for c in heading.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            slug.push('-');
        }
    }
    let collapsed: String = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if collapsed.is_empty() {
        "section".to_string()
    } else {
        collapsed
    }
}

fn extension_of(path: &str) -> Option<&str> {
    path.rsplit('/').next()?.rsplit_once('.').map(|(_, ext)| ext)
}

pub struct MarkdownLinking;

impl ScenarioAnalyzer for MarkdownLinking {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
        let mut result = AnalysisResult::default();
        let source = ctx.unit.source.as_str();
        let file_address = ctx.file_address()?;

        // Headings become symbol nodes declared by the document.
        for capture in heading_re().captures_iter(source) {
            let text = capture[2].trim();
            let slug = slugify(text);
            let line = source[..capture.get(0).expect("match").start()]
                .lines()
                .count()
                + 1;
            let address = ctx.symbol_address(NodeType::Heading, &slug)?;
            result.nodes.push(
                NodeDraft::new(address.clone(), NodeType::Heading, text)
                    .with_source_file(ctx.file_path)
                    .with_property("level", serde_json::json!(capture[1].len()))
                    .with_property("line", serde_json::json!(line)),
            );
            result.edges.push(
                EdgeDraft::new(file_address.clone(), address, "declares")
                    .with_source_file(ctx.file_path),
            );
        }

        for capture in link_re().captures_iter(source) {
            let embed = capture.get(1).is_some();
            let text = capture[2].to_string();
            let target = capture[3].to_string();
            if let Err(err) = self.emit_link(ctx, &file_address, &text, &target, embed, &mut result)
            {
                tracing::debug!(
                    file = ctx.file_path,
                    target = %target,
                    error = %err,
                    "skipping unresolvable markdown link"
                );
            }
        }

        for capture in wiki_re().captures_iter(source) {
            let include = capture.get(1).is_some();
            let page = capture[2].trim();
            let edge_type = if include { "md-includes" } else { "md-wiki-links" };
            // Wiki links resolve as sibling documents.
            let target = format!("./{page}.md");
            if let Some(resolved) = resolve_relative(ctx.file_path, &target)
                && let Ok(address) = RdfAddress::file(ctx.project_name, &resolved)
            {
                let basename = resolved.rsplit('/').next().unwrap_or(&resolved).to_string();
                result.nodes.push(
                    NodeDraft::new(address.clone(), NodeType::File, basename)
                        .with_source_file(&resolved),
                );
                result.edges.push(
                    EdgeDraft::new(file_address.clone(), address, edge_type)
                        .with_source_file(ctx.file_path)
                        .with_property("page", serde_json::json!(page)),
                );
            }
        }

        Ok(result)
    }
}

impl MarkdownLinking {
    fn emit_link(
        &self,
        ctx: &AnalysisContext<'_>,
        file_address: &RdfAddress,
        text: &str,
        target: &str,
        embed: bool,
        result: &mut AnalysisResult,
    ) -> Result<(), AddressError> {
        // External links are out of scope for the repository graph.
        if target.starts_with("http://")
            || target.starts_with("https://")
            || target.starts_with("mailto:")
        {
            return Ok(());
        }

        // Anchor within the same document.
        if let Some(anchor) = target.strip_prefix('#') {
            let address = ctx.symbol_address(NodeType::Heading, &slugify(anchor))?;
            result.nodes.push(
                NodeDraft::new(address.clone(), NodeType::Heading, anchor)
                    .with_source_file(ctx.file_path),
            );
            result.edges.push(
                EdgeDraft::new(file_address.clone(), address, "md-links-anchor")
                    .with_source_file(ctx.file_path),
            );
            return Ok(());
        }

        let (path_part, anchor) = match target.split_once('#') {
            Some((path, anchor)) => (path, Some(anchor)),
            None => (target, None),
        };
        let resolved = if path_part.starts_with('.') {
            resolve_relative(ctx.file_path, path_part)
        } else {
            Some(path_part.trim_start_matches('/').to_string())
        };
        let Some(resolved) = resolved else {
            return Err(AddressError::PathEscapesRoot(target.to_string()));
        };
        let target_file = RdfAddress::file(ctx.project_name, &resolved)?;
        let basename = resolved.rsplit('/').next().unwrap_or(&resolved).to_string();
        result.nodes.push(
            NodeDraft::new(target_file.clone(), NodeType::File, basename)
                .with_source_file(&resolved),
        );

        let extension = extension_of(&resolved).unwrap_or("");
        if embed || IMAGE_EXTENSIONS.contains(&extension) {
            result.edges.push(
                EdgeDraft::new(file_address.clone(), target_file, "md-embeds-image")
                    .with_source_file(ctx.file_path),
            );
            return Ok(());
        }

        // Anchored link into another document's heading.
        if let Some(anchor) = anchor {
            let (Some(project), Some(path)) = (target_file.project(), target_file.file_path())
            else {
                return Err(AddressError::Malformed(target_file.to_string()));
            };
            let heading =
                RdfAddress::symbol(project, path, NodeType::Heading, &slugify(anchor))?;
            result.nodes.push(
                NodeDraft::new(heading.clone(), NodeType::Heading, anchor)
                    .with_source_file(&resolved),
            );
            result.edges.push(
                EdgeDraft::new(file_address.clone(), heading, "md-links-anchor")
                    .with_source_file(ctx.file_path),
            );
            return Ok(());
        }

        // A backticked identifier linking into a source file references the
        // named symbol rather than the file.
        let code_text = text.trim();
        if SOURCE_EXTENSIONS.contains(&extension)
            && code_text.starts_with('`')
            && code_text.ends_with('`')
            && code_text.len() > 2
        {
            let symbol = code_text.trim_matches('`');
            let (Some(project), Some(path)) = (target_file.project(), target_file.file_path())
            else {
                return Err(AddressError::Malformed(target_file.to_string()));
            };
            if let Ok(symbol_address) =
                RdfAddress::symbol(project, path, NodeType::Unknown, symbol)
            {
                result.nodes.push(
                    NodeDraft::new(symbol_address.clone(), NodeType::Unknown, symbol)
                        .with_source_file(&resolved),
                );
                result.edges.push(
                    EdgeDraft::new(file_address.clone(), symbol_address, "md-references-symbol")
                        .with_source_file(ctx.file_path),
                );
                return Ok(());
            }
        }

        result.edges.push(
            EdgeDraft::new(file_address.clone(), target_file, "md-links-to")
                .with_source_file(ctx.file_path),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdg_parser::{parse_source, Language};
    use std::collections::BTreeMap;
    use std::path::Path;

    fn analyze(path: &str, source: &str) -> AnalysisResult {
        let unit =
            parse_source(Path::new(path), source.to_string(), Language::Markdown).unwrap();
        let config = serde_json::Map::new();
        let prior = BTreeMap::new();
        let ctx = AnalysisContext {
            file_path: path,
            project_name: "proj",
            language: Language::Markdown,
            unit: &unit,
            config: &config,
            prior: &prior,
        };
        MarkdownLinking.analyze(&ctx).unwrap()
    }

    #[test]
    fn headings_become_symbols() {
        let result = analyze("docs/guide.md", "# Getting Started\n\n## Install Steps\n");
        let headings: Vec<String> = result
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Heading)
            .map(|n| n.address.to_string())
            .collect();
        assert_eq!(
            headings,
            vec![
                "proj/docs/guide.md#Heading:getting-started",
                "proj/docs/guide.md#Heading:install-steps",
            ]
        );
    }

    #[test]
    fn document_links_and_images() {
        let result = analyze(
            "docs/a.md",
            "See [the guide](./guide.md) and ![logo](../assets/logo.png).\n",
        );
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-links-to" && e.to.to_string() == "proj/docs/guide.md"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-embeds-image" && e.to.to_string() == "proj/assets/logo.png"
        }));
    }

    #[test]
    fn anchors_link_to_headings() {
        let result = analyze(
            "docs/a.md",
            "# Intro\n\nJump to [usage](#usage-notes) or [ref](./b.md#setup).\n",
        );
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-links-anchor"
                && e.to.to_string() == "proj/docs/a.md#Heading:usage-notes"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-links-anchor"
                && e.to.to_string() == "proj/docs/b.md#Heading:setup"
        }));
    }

    #[test]
    fn wiki_links_and_includes() {
        let result = analyze("docs/a.md", "See [[Sibling]] and ![[Embedded]].\n");
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-wiki-links" && e.to.to_string() == "proj/docs/Sibling.md"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-includes" && e.to.to_string() == "proj/docs/Embedded.md"
        }));
    }

    #[test]
    fn backticked_source_links_reference_symbols() {
        let result = analyze("docs/api.md", "The [`UserService`](../src/service.ts) class.\n");
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "md-references-symbol"
                && e.to.to_string() == "proj/src/service.ts#Unknown:UserService"
        }));
    }

    #[test]
    fn slugs_are_stable() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("API  &  Tools!"), "api-tools");
        assert_eq!(slugify("---"), "section");
    }
}
