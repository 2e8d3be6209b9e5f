//! `symbol-dependency`: class/function/interface/type extraction with
//! `calls`, `instantiates`, `type-references`, `extends-class`, and
//! `implements-interface` edges resolved within the file.

use crate::analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
use crate::spec::ScenarioSpec;
use rdg_core::address::NodeType;
use rdg_core::edge_types::EdgeTypeDef;
use rdg_core::model::{EdgeDraft, NodeDraft};
use rdg_core::uniqueness::{self, SymbolExtraction};
use rdg_parser::Language;
use std::collections::BTreeMap;
use tree_sitter::Node;

pub const ID: &str = "symbol-dependency";

pub fn spec() -> ScenarioSpec {
    ScenarioSpec::new(ID)
        .extends(super::basic_structure::ID)
        .edge_type(EdgeTypeDef::new("instantiates").parent("uses").priority(3))
        .edge_type(
            EdgeTypeDef::new("type-references")
                .parent("references")
                .priority(3),
        )
        .edge_type(
            EdgeTypeDef::new("extends-class")
                .parent("extends")
                .priority(2),
        )
        .edge_type(
            EdgeTypeDef::new("implements-interface")
                .parent("implements")
                .priority(2),
        )
}

/// A symbol declared in the analyzed file.
#[derive(Debug, Clone)]
struct Declared {
    name: String,
    node_type: NodeType,
    line_start: usize,
    line_end: usize,
    exported: bool,
}

/// A scope that call sites are attributed to. Method bodies attribute to
/// their class so edges always originate from an emitted node.
#[derive(Debug, Clone)]
struct Scope {
    symbol: String,
    start_row: usize,
    end_row: usize,
}

/// An unresolved in-file relation, resolved against the declaration table
/// after the walk.
#[derive(Debug, Clone)]
struct Relation {
    from_symbol: Option<String>,
    to_name: String,
    edge_type: &'static str,
    line: usize,
}

#[derive(Debug, Default)]
struct FileSymbols {
    declared: Vec<Declared>,
    scopes: Vec<Scope>,
    relations: Vec<Relation>,
}

impl FileSymbols {
    fn declare(&mut self, name: &str, node_type: NodeType, node: &Node<'_>, exported: bool) {
        self.declared.push(Declared {
            name: name.to_string(),
            node_type,
            line_start: node.start_position().row + 1,
            line_end: node.end_position().row + 1,
            exported,
        });
    }

    fn scope(&mut self, symbol: &str, node: &Node<'_>) {
        self.scopes.push(Scope {
            symbol: symbol.to_string(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
        });
    }

    /// The innermost scope containing a row, if any.
    fn enclosing(&self, row: usize) -> Option<String> {
        self.scopes
            .iter()
            .filter(|s| s.start_row <= row && row <= s.end_row)
            .min_by_key(|s| s.end_row - s.start_row)
            .map(|s| s.symbol.clone())
    }
}

pub struct SymbolDependency;

impl ScenarioAnalyzer for SymbolDependency {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
        let Some(tree) = &ctx.unit.tree else {
            return Ok(AnalysisResult::default());
        };
        let source = ctx.unit.source.as_str();
        let mut symbols = FileSymbols::default();
        match ctx.language {
            Language::TypeScript | Language::JavaScript => {
                walk_js(&tree.root_node(), source, &mut symbols, false);
                collect_js_relations(&tree.root_node(), source, &mut symbols);
            }
            Language::Python => {
                walk_python(&tree.root_node(), source, &mut symbols);
                collect_python_calls(&tree.root_node(), source, &mut symbols);
            }
            Language::Rust => {
                walk_rust(&tree.root_node(), source, &mut symbols);
                collect_rust_calls(&tree.root_node(), source, &mut symbols);
            }
            Language::Markdown => return Ok(AnalysisResult::default()),
        }

        self.emit(ctx, symbols)
    }
}

impl SymbolDependency {
    fn emit(
        &self,
        ctx: &AnalysisContext<'_>,
        symbols: FileSymbols,
    ) -> anyhow::Result<AnalysisResult> {
        let mut result = AnalysisResult::default();
        let file_address = ctx.file_address()?;

        // Uniqueness validation: drop exact duplicates, report cross-type
        // collisions upward without rewriting any address.
        let pairs = symbols
            .declared
            .iter()
            .map(|d| {
                Ok((
                    SymbolExtraction {
                        address: ctx.symbol_address(d.node_type.clone(), &d.name)?,
                        node_type: d.node_type.clone(),
                        name: d.name.clone(),
                        line: Some(d.line_start),
                    },
                    d,
                ))
            })
            .collect::<Result<Vec<_>, rdg_core::error::AddressError>>()?;
        let report =
            uniqueness::validate_batch(pairs.iter().map(|(e, _)| e.clone()).collect());
        result.symbol_conflicts = report.conflicts;

        let mut declared_by_address: BTreeMap<String, &Declared> = BTreeMap::new();
        for (extraction, declared) in &pairs {
            declared_by_address
                .entry(extraction.address.to_string())
                .or_insert(*declared);
        }

        // name -> (node_type, address) for relation resolution
        let mut by_name = BTreeMap::new();
        for extraction in &report.unique {
            let declared = declared_by_address[&extraction.address.to_string()];
            by_name
                .entry(extraction.name.clone())
                .or_insert_with(|| (extraction.node_type.clone(), extraction.address.clone()));
            let node = NodeDraft::new(
                extraction.address.clone(),
                extraction.node_type.clone(),
                extraction.name.clone(),
            )
            .with_source_file(ctx.file_path)
            .with_language(ctx.language.name())
            .with_property("startLine", serde_json::json!(declared.line_start))
            .with_property("endLine", serde_json::json!(declared.line_end));
            result.nodes.push(node);
            result.edges.push(
                EdgeDraft::new(file_address.clone(), extraction.address.clone(), "declares")
                    .with_source_file(ctx.file_path),
            );
            if declared.exported {
                result.edges.push(
                    EdgeDraft::new(file_address.clone(), extraction.address.clone(), "exports")
                        .with_source_file(ctx.file_path),
                );
            }
        }

        for relation in &symbols.relations {
            let Some((_, to_address)) = by_name.get(&relation.to_name) else {
                continue; // cross-file targets are out of scope here
            };
            let from_address = match &relation.from_symbol {
                Some(symbol) => match by_name.get(symbol) {
                    Some((_, address)) => address.clone(),
                    None => file_address.clone(),
                },
                None => file_address.clone(),
            };
            if from_address == *to_address && relation.edge_type != "calls" {
                continue; // self-references carry no information
            }
            result.edges.push(
                EdgeDraft::new(from_address, to_address.clone(), relation.edge_type)
                    .with_source_file(ctx.file_path)
                    .with_property("line", serde_json::json!(relation.line)),
            );
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// TypeScript / JavaScript
// ---------------------------------------------------------------------------

fn walk_js(node: &Node<'_>, source: &str, symbols: &mut FileSymbols, exported: bool) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "export_statement" => walk_js(&child, source, symbols, true),
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Class, &child, exported);
                    symbols.scope(name, &child);
                    collect_js_heritage(&child, source, name, symbols);
                }
            }
            "interface_declaration" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Interface, &child, exported);
                }
            }
            "function_declaration" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Function, &child, exported);
                    symbols.scope(name, &child);
                }
            }
            "type_alias_declaration" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Type, &child, exported);
                }
            }
            "enum_declaration" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Enum, &child, exported);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut declarator_cursor = child.walk();
                for declarator in child.children(&mut declarator_cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name_node) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    if name_node.kind() != "identifier" {
                        continue; // destructuring patterns
                    }
                    let name = &source[name_node.byte_range()];
                    let is_function = declarator
                        .child_by_field_name("value")
                        .map(|v| matches!(v.kind(), "arrow_function" | "function_expression"))
                        .unwrap_or(false);
                    if is_function {
                        symbols.declare(name, NodeType::Function, &declarator, exported);
                        symbols.scope(name, &declarator);
                    } else {
                        symbols.declare(name, NodeType::Variable, &declarator, exported);
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_js_heritage(class: &Node<'_>, source: &str, class_name: &str, symbols: &mut FileSymbols) {
    let mut cursor = class.walk();
    for child in class.children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut heritage_cursor = child.walk();
        for clause in child.children(&mut heritage_cursor) {
            let edge_type = match clause.kind() {
                "extends_clause" => "extends-class",
                "implements_clause" => "implements-interface",
                _ => continue,
            };
            let mut clause_cursor = clause.walk();
            for target in clause.children(&mut clause_cursor) {
                if matches!(target.kind(), "identifier" | "type_identifier") {
                    symbols.relations.push(Relation {
                        from_symbol: Some(class_name.to_string()),
                        to_name: source[target.byte_range()].to_string(),
                        edge_type,
                        line: clause.start_position().row + 1,
                    });
                }
            }
        }
    }
}

fn collect_js_relations(node: &Node<'_>, source: &str, symbols: &mut FileSymbols) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "call_expression" => {
                if let Some(function) = child.child_by_field_name("function")
                    && function.kind() == "identifier"
                {
                    let row = child.start_position().row;
                    symbols.relations.push(Relation {
                        from_symbol: symbols.enclosing(row),
                        to_name: source[function.byte_range()].to_string(),
                        edge_type: "calls",
                        line: row + 1,
                    });
                }
            }
            "new_expression" => {
                if let Some(constructor) = child.child_by_field_name("constructor")
                    && constructor.kind() == "identifier"
                {
                    let row = child.start_position().row;
                    symbols.relations.push(Relation {
                        from_symbol: symbols.enclosing(row),
                        to_name: source[constructor.byte_range()].to_string(),
                        edge_type: "instantiates",
                        line: row + 1,
                    });
                }
            }
            "type_identifier" => {
                if !is_declaration_name(&child) {
                    let row = child.start_position().row;
                    symbols.relations.push(Relation {
                        from_symbol: symbols.enclosing(row),
                        to_name: source[child.byte_range()].to_string(),
                        edge_type: "type-references",
                        line: row + 1,
                    });
                }
            }
            _ => {}
        }
        collect_js_relations(&child, source, symbols);
    }
}

/// Whether a type identifier is the name of its own declaration (those are
/// declarations, not references).
fn is_declaration_name(node: &Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    matches!(
        parent.kind(),
        "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration"
    ) && parent
        .child_by_field_name("name")
        .is_some_and(|name| name.id() == node.id())
}

// ---------------------------------------------------------------------------
// Python
// ---------------------------------------------------------------------------

fn walk_python(node: &Node<'_>, source: &str, symbols: &mut FileSymbols) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Function, &child, false);
                    symbols.scope(name, &child);
                }
            }
            "decorated_definition" => walk_python(&child, source, symbols),
            "class_definition" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let class_name = source[name_node.byte_range()].to_string();
                    symbols.declare(&class_name, NodeType::Class, &child, false);
                    symbols.scope(&class_name, &child);
                    if let Some(bases) = child.child_by_field_name("superclasses") {
                        let mut bases_cursor = bases.walk();
                        for base in bases.children(&mut bases_cursor) {
                            if base.kind() == "identifier" {
                                symbols.relations.push(Relation {
                                    from_symbol: Some(class_name.clone()),
                                    to_name: source[base.byte_range()].to_string(),
                                    edge_type: "extends-class",
                                    line: child.start_position().row + 1,
                                });
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_python_calls(node: &Node<'_>, source: &str, symbols: &mut FileSymbols) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "call"
            && let Some(function) = child.child_by_field_name("function")
            && function.kind() == "identifier"
        {
            let row = child.start_position().row;
            symbols.relations.push(Relation {
                from_symbol: symbols.enclosing(row),
                to_name: source[function.byte_range()].to_string(),
                edge_type: "calls",
                line: row + 1,
            });
        }
        collect_python_calls(&child, source, symbols);
    }
}

// ---------------------------------------------------------------------------
// Rust
// ---------------------------------------------------------------------------

fn walk_rust(node: &Node<'_>, source: &str, symbols: &mut FileSymbols) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_item" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = &source[name_node.byte_range()];
                    symbols.declare(name, NodeType::Function, &child, false);
                    symbols.scope(name, &child);
                }
            }
            "struct_item" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    symbols.declare(
                        &source[name_node.byte_range()],
                        NodeType::Class,
                        &child,
                        false,
                    );
                }
            }
            "enum_item" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    symbols.declare(
                        &source[name_node.byte_range()],
                        NodeType::Enum,
                        &child,
                        false,
                    );
                }
            }
            "trait_item" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    symbols.declare(
                        &source[name_node.byte_range()],
                        NodeType::Interface,
                        &child,
                        false,
                    );
                }
            }
            "type_item" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    symbols.declare(
                        &source[name_node.byte_range()],
                        NodeType::Type,
                        &child,
                        false,
                    );
                }
            }
            "impl_item" => {
                // `impl Trait for Type` is an implements relation.
                if let Some(trait_node) = child.child_by_field_name("trait")
                    && let Some(type_node) = child.child_by_field_name("type")
                {
                    symbols.relations.push(Relation {
                        from_symbol: Some(source[type_node.byte_range()].to_string()),
                        to_name: source[trait_node.byte_range()].to_string(),
                        edge_type: "implements-interface",
                        line: child.start_position().row + 1,
                    });
                }
                if let Some(type_node) = child.child_by_field_name("type") {
                    // Method bodies attribute to the implemented type.
                    symbols.scope(&source[type_node.byte_range()], &child);
                }
            }
            "mod_item" => {
                if let Some(body) = child.child_by_field_name("body") {
                    walk_rust(&body, source, symbols);
                }
            }
            _ => {}
        }
    }
}

fn collect_rust_calls(node: &Node<'_>, source: &str, symbols: &mut FileSymbols) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "call_expression"
            && let Some(function) = child.child_by_field_name("function")
            && function.kind() == "identifier"
        {
            let row = child.start_position().row;
            symbols.relations.push(Relation {
                from_symbol: symbols.enclosing(row),
                to_name: source[function.byte_range()].to_string(),
                edge_type: "calls",
                line: row + 1,
            });
        }
        collect_rust_calls(&child, source, symbols);
    }
}
