//! `file-dependency`: import/require/dynamic-import extraction into
//! `imports_file` / `imports_library` edges, plus the dual-node alias
//! pattern (`aliasOf`) for aliased named imports.

use crate::analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
use crate::analyzers::{resolve_relative, with_importer_extension};
use crate::spec::ScenarioSpec;
use rdg_core::address::{AddressError, NodeType, RdfAddress};
use rdg_core::model::{EdgeDraft, NodeDraft};
use rdg_parser::Language;
use tree_sitter::Node;

pub const ID: &str = "file-dependency";

pub fn spec() -> ScenarioSpec {
    ScenarioSpec::new(ID)
        .extends(super::basic_structure::ID)
        .node_type("Library")
}

/// One import site found in a file.
#[derive(Debug, Clone, Default)]
struct ImportSite {
    specifier: String,
    /// Default-import binding (`import React from "react"`).
    default_name: Option<String>,
    /// Namespace binding (`import * as fs from "fs"`).
    namespace_alias: Option<String>,
    /// Named bindings as `(exported_name, local_alias)`.
    named: Vec<(String, Option<String>)>,
    dynamic: bool,
    line: usize,
}

pub struct FileDependency;

impl ScenarioAnalyzer for FileDependency {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
        let sites = match ctx.language {
            Language::TypeScript | Language::JavaScript => {
                let Some(tree) = &ctx.unit.tree else {
                    return Ok(AnalysisResult::default());
                };
                collect_js_imports(&tree.root_node(), &ctx.unit.source)
            }
            Language::Python => {
                let Some(tree) = &ctx.unit.tree else {
                    return Ok(AnalysisResult::default());
                };
                collect_python_imports(&tree.root_node(), &ctx.unit.source)
            }
            Language::Rust => {
                let Some(tree) = &ctx.unit.tree else {
                    return Ok(AnalysisResult::default());
                };
                collect_rust_imports(&tree.root_node(), &ctx.unit.source)
            }
            Language::Markdown => Vec::new(),
        };

        let mut result = AnalysisResult::default();
        let file_address = ctx.file_address()?;
        for site in sites {
            if let Err(err) = emit_site(ctx, &file_address, &site, &mut result) {
                tracing::debug!(
                    file = ctx.file_path,
                    specifier = %site.specifier,
                    error = %err,
                    "skipping unresolvable import site"
                );
            }
        }
        Ok(result)
    }
}

/// The address of an import target. Relative specifiers resolve against the
/// importing file; everything else is an external library. Scoped package
/// names contain `/` and therefore live in the path form of the grammar.
enum Target {
    File(RdfAddress, String),
    Library(RdfAddress, String),
}

fn target_for(
    ctx: &AnalysisContext<'_>,
    site: &ImportSite,
) -> Result<Option<Target>, AddressError> {
    let specifier = site.specifier.as_str();
    if specifier.starts_with('.') {
        let Some(resolved) = resolve_relative(ctx.file_path, specifier) else {
            return Err(AddressError::PathEscapesRoot(specifier.to_string()));
        };
        let resolved = with_importer_extension(resolved, ctx.file_path);
        let address = RdfAddress::file(ctx.project_name, &resolved)?;
        return Ok(Some(Target::File(address, resolved)));
    }
    if specifier.is_empty() {
        return Ok(None);
    }
    let address = if specifier.contains('/') {
        RdfAddress::parse(specifier)?
    } else {
        RdfAddress::library(specifier)?
    };
    Ok(Some(Target::Library(address, specifier.to_string())))
}

/// The address of a symbol exported by an import target.
fn target_symbol(target: &Target, name: &str) -> Result<RdfAddress, AddressError> {
    match target {
        Target::File(address, _) => {
            let (Some(project), Some(path)) = (address.project(), address.file_path()) else {
                return Err(AddressError::Malformed(address.to_string()));
            };
            RdfAddress::symbol(project, path, NodeType::Unknown, name)
        }
        Target::Library(address, lib) => match address {
            RdfAddress::Library { .. } => {
                RdfAddress::library_symbol(lib, NodeType::Unknown, name)
            }
            _ => RdfAddress::parse(&format!("{lib}#Unknown:{name}")),
        },
    }
}

fn emit_site(
    ctx: &AnalysisContext<'_>,
    file_address: &RdfAddress,
    site: &ImportSite,
    result: &mut AnalysisResult,
) -> Result<(), AddressError> {
    let Some(target) = target_for(ctx, site)? else {
        return Ok(());
    };

    let (target_address, edge_type) = match &target {
        Target::File(address, path) => {
            let basename = path.rsplit('/').next().unwrap_or(path);
            result.nodes.push(
                NodeDraft::new(address.clone(), NodeType::File, basename).with_source_file(path),
            );
            (address.clone(), "imports_file")
        }
        Target::Library(address, name) => {
            result.nodes.push(NodeDraft::new(
                address.clone(),
                NodeType::Extension("Library".to_string()),
                name,
            ));
            (address.clone(), "imports_library")
        }
    };

    let mut edge = EdgeDraft::new(file_address.clone(), target_address, edge_type)
        .with_source_file(ctx.file_path)
        .with_property("specifier", serde_json::json!(site.specifier))
        .with_property("line", serde_json::json!(site.line));
    if site.dynamic {
        edge = edge.with_property("dynamic", serde_json::json!(true));
    }
    if let Some(default_name) = &site.default_name {
        edge = edge.with_property("defaultBinding", serde_json::json!(default_name));
    }
    if let Some(namespace_alias) = &site.namespace_alias {
        edge = edge.with_property("namespaceBinding", serde_json::json!(namespace_alias));
    }
    result.edges.push(edge);

    // Dual-node alias pattern: an aliased named import materializes the
    // original symbol on the target plus a per-file alias node.
    for (name, alias) in &site.named {
        let Some(alias) = alias else { continue };
        let original = target_symbol(&target, name)?;
        let alias_address =
            ctx.symbol_address(NodeType::Unknown, alias)?;
        result.nodes.push(
            NodeDraft::new(original.clone(), NodeType::Unknown, name).with_source_file(
                match &target {
                    Target::File(_, path) => path.clone(),
                    Target::Library(_, name) => name.clone(),
                },
            ),
        );
        result.nodes.push(
            NodeDraft::new(alias_address.clone(), NodeType::Unknown, alias)
                .with_source_file(ctx.file_path)
                .with_property("aliasTarget", serde_json::json!(name)),
        );
        result.edges.push(
            EdgeDraft::new(alias_address, original, "aliasOf").with_source_file(ctx.file_path),
        );
    }
    Ok(())
}

fn string_text(node: &Node<'_>, source: &str) -> String {
    source[node.byte_range()]
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

fn collect_js_imports(root: &Node<'_>, source: &str) -> Vec<ImportSite> {
    let mut sites = Vec::new();
    collect_js_node(root, source, &mut sites);
    sites
}

fn collect_js_node(node: &Node<'_>, source: &str, sites: &mut Vec<ImportSite>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" => {
                if let Some(source_node) = child.child_by_field_name("source") {
                    let mut site = ImportSite {
                        specifier: string_text(&source_node, source),
                        line: child.start_position().row + 1,
                        ..Default::default()
                    };
                    collect_js_import_clause(&child, source, &mut site);
                    sites.push(site);
                }
            }
            // Re-exports (`export { X } from "./m"`) are import sites too.
            "export_statement" => {
                if let Some(source_node) = child.child_by_field_name("source") {
                    sites.push(ImportSite {
                        specifier: string_text(&source_node, source),
                        line: child.start_position().row + 1,
                        ..Default::default()
                    });
                }
            }
            "call_expression" => {
                if let Some(site) = js_call_import(&child, source) {
                    sites.push(site);
                }
                collect_js_node(&child, source, sites);
            }
            _ => collect_js_node(&child, source, sites),
        }
    }
}

fn collect_js_import_clause(statement: &Node<'_>, source: &str, site: &mut ImportSite) {
    let mut cursor = statement.walk();
    for child in statement.children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => {
                    site.default_name = Some(source[part.byte_range()].to_string());
                }
                "namespace_import" => {
                    let mut ns_cursor = part.walk();
                    for ns_child in part.children(&mut ns_cursor) {
                        if ns_child.kind() == "identifier" {
                            site.namespace_alias =
                                Some(source[ns_child.byte_range()].to_string());
                        }
                    }
                }
                "named_imports" => {
                    let mut named_cursor = part.walk();
                    for specifier in part.children(&mut named_cursor) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let name = specifier
                            .child_by_field_name("name")
                            .map(|n| source[n.byte_range()].to_string());
                        let alias = specifier
                            .child_by_field_name("alias")
                            .map(|n| source[n.byte_range()].to_string());
                        if let Some(name) = name {
                            site.named.push((name, alias));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// `require("m")` and dynamic `import("m")` call sites.
fn js_call_import(call: &Node<'_>, source: &str) -> Option<ImportSite> {
    let function = call.child_by_field_name("function")?;
    let function_text = &source[function.byte_range()];
    let dynamic = match function.kind() {
        "import" => true,
        "identifier" if function_text == "require" => false,
        _ => return None,
    };
    let arguments = call.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first_string = arguments
        .children(&mut cursor)
        .find(|n| n.kind() == "string")?;
    Some(ImportSite {
        specifier: string_text(&first_string, source),
        dynamic,
        line: call.start_position().row + 1,
        ..Default::default()
    })
}

fn collect_python_imports(root: &Node<'_>, source: &str) -> Vec<ImportSite> {
    let mut sites = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "import_statement" | "import_from_statement" => {
                let text = &source[child.byte_range()];
                if let Some(site) = parse_python_import(text, child.start_position().row + 1) {
                    sites.push(site);
                }
            }
            _ => {}
        }
    }
    sites
}

/// Parse a Python import statement's text. Relative modules keep their
/// leading dots so target resolution treats them as file imports.
fn parse_python_import(text: &str, line: usize) -> Option<ImportSite> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("from ") {
        let (module, imports) = rest.split_once(" import ")?;
        let module = module.trim();
        let mut site = ImportSite {
            specifier: python_module_specifier(module),
            line,
            ..Default::default()
        };
        for item in imports.split(',') {
            let item = item.trim().trim_matches(|c| c == '(' || c == ')');
            if item.is_empty() || item == "*" {
                continue;
            }
            match item.split_once(" as ") {
                Some((name, alias)) => site
                    .named
                    .push((name.trim().to_string(), Some(alias.trim().to_string()))),
                None => site.named.push((item.to_string(), None)),
            }
        }
        return Some(site);
    }
    let rest = text.strip_prefix("import ")?;
    let first = rest.split(',').next()?.trim();
    let module = first.split(" as ").next()?.trim();
    Some(ImportSite {
        specifier: python_module_specifier(module),
        line,
        ..Default::default()
    })
}

/// Map a dotted Python module to an import specifier: relative modules
/// become relative paths, absolute modules stay library names.
fn python_module_specifier(module: &str) -> String {
    if let Some(stripped) = module.strip_prefix('.') {
        let ups = stripped.chars().take_while(|&c| c == '.').count();
        let tail = &stripped[ups..];
        let mut path = String::from("./");
        for _ in 0..ups {
            path.push_str("../");
        }
        path.push_str(&tail.replace('.', "/"));
        return path;
    }
    module.to_string()
}

fn collect_rust_imports(root: &Node<'_>, source: &str) -> Vec<ImportSite> {
    let mut sites = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "use_declaration" {
            continue;
        }
        let text = &source[child.byte_range()];
        let path = text
            .trim_start_matches("pub ")
            .trim_start_matches("use ")
            .trim_end_matches(';')
            .trim();
        let first = path.split("::").next().unwrap_or(path).trim();
        // Crate-internal paths need module layout to resolve; only external
        // crates become library edges.
        if matches!(first, "crate" | "self" | "super" | "") {
            continue;
        }
        sites.push(ImportSite {
            specifier: first.to_string(),
            line: child.start_position().row + 1,
            ..Default::default()
        });
    }
    sites
}
