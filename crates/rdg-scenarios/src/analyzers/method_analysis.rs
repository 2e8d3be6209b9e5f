//! `method-analysis`: per-method and per-field extraction with complexity
//! metrics, containment/call/field-access edges, and method auto-tagging.

use crate::analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
use crate::metrics;
use crate::spec::ScenarioSpec;
use rdg_core::address::{NodeType, RdfAddress};
use rdg_core::edge_types::EdgeTypeDef;
use rdg_core::model::{EdgeDraft, NodeDraft};
use rdg_parser::Language;
use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

pub const ID: &str = "method-analysis";

const DEFAULT_COMPLEXITY_THRESHOLD: u64 = 10;

pub fn spec() -> ScenarioSpec {
    ScenarioSpec::new(ID)
        .extends(super::symbol_dependency::ID)
        .edge_type(
            EdgeTypeDef::new("contains-method")
                .parent("contains")
                .priority(0),
        )
        .edge_type(EdgeTypeDef::new("calls-method").parent("calls").priority(3))
        .edge_type(
            EdgeTypeDef::new("accesses-field")
                .parent("uses")
                .priority(3),
        )
        .edge_type(EdgeTypeDef::new("uses-type").parent("uses").priority(3))
        .edge_type(
            EdgeTypeDef::new("overrides-method")
                .parent("references")
                .priority(3),
        )
        .semantic_tag("constructor")
        .semantic_tag("accessor")
        .semantic_tag("async-method")
        .semantic_tag("static-method")
        .semantic_tag("high-complexity")
        .config_key("complexityThreshold")
}

/// One method found in a class body.
#[derive(Debug)]
struct MethodInfo<'t> {
    name: String,
    body: Option<Node<'t>>,
    node: Node<'t>,
    is_constructor: bool,
    is_accessor: bool,
    is_async: bool,
    is_static: bool,
    parameter_count: usize,
}

/// One class with its methods and fields.
#[derive(Debug)]
struct ClassInfo<'t> {
    name: String,
    extends: Option<String>,
    fields: Vec<(String, usize)>,
    methods: Vec<MethodInfo<'t>>,
}

pub struct MethodAnalysis;

impl ScenarioAnalyzer for MethodAnalysis {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<AnalysisResult> {
        let Some(tree) = &ctx.unit.tree else {
            return Ok(AnalysisResult::default());
        };
        let source = ctx.unit.source.as_str();
        let classes = match ctx.language {
            Language::TypeScript | Language::JavaScript => {
                collect_js_classes(&tree.root_node(), source)
            }
            Language::Python => collect_python_classes(&tree.root_node(), source),
            Language::Rust => collect_rust_classes(&tree.root_node(), source),
            Language::Markdown => Vec::new(),
        };

        let threshold = ctx
            .config_value("complexityThreshold")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(DEFAULT_COMPLEXITY_THRESHOLD);

        // Same-file type declarations from the scenario this one extends,
        // for `uses-type` resolution.
        let declared_types = declared_type_addresses(ctx);
        // Method tables for override detection.
        let methods_by_class: BTreeMap<String, BTreeSet<String>> = classes
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    c.methods.iter().map(|m| m.name.clone()).collect(),
                )
            })
            .collect();

        let mut result = AnalysisResult::default();
        for class in &classes {
            self.emit_class(
                ctx,
                source,
                class,
                threshold,
                &declared_types,
                &methods_by_class,
                &mut result,
            )?;
        }
        Ok(result)
    }
}

impl MethodAnalysis {
    #[allow(clippy::too_many_arguments)]
    fn emit_class(
        &self,
        ctx: &AnalysisContext<'_>,
        source: &str,
        class: &ClassInfo<'_>,
        threshold: u64,
        declared_types: &BTreeMap<String, RdfAddress>,
        methods_by_class: &BTreeMap<String, BTreeSet<String>>,
        result: &mut AnalysisResult,
    ) -> anyhow::Result<()> {
        let class_address = ctx.symbol_address(NodeType::Class, &class.name)?;
        let field_names: BTreeSet<&str> =
            class.fields.iter().map(|(name, _)| name.as_str()).collect();

        for (field, line) in &class.fields {
            let address =
                ctx.symbol_address(NodeType::Property, &format!("{}.{}", class.name, field))?;
            result.nodes.push(
                NodeDraft::new(address, NodeType::Property, field)
                    .with_source_file(ctx.file_path)
                    .with_language(ctx.language.name())
                    .with_property("line", serde_json::json!(line)),
            );
        }

        for method in &class.methods {
            let qualified = format!("{}.{}", class.name, method.name);
            let address = ctx.symbol_address(NodeType::Method, &qualified)?;
            let body_metrics = method
                .body
                .as_ref()
                .map(|body| metrics::compute(body, source, ctx.language))
                .unwrap_or_default();

            let mut draft = NodeDraft::new(address.clone(), NodeType::Method, &method.name)
                .with_source_file(ctx.file_path)
                .with_language(ctx.language.name())
                .with_property(
                    "cyclomaticComplexity",
                    serde_json::json!(body_metrics.cyclomatic_complexity),
                )
                .with_property("nestingDepth", serde_json::json!(body_metrics.nesting_depth))
                .with_property(
                    "linesOfCode",
                    serde_json::json!(body_metrics.lines_of_code),
                )
                .with_property(
                    "numberOfStatements",
                    serde_json::json!(body_metrics.statement_count),
                )
                .with_property(
                    "parameterCount",
                    serde_json::json!(method.parameter_count),
                )
                .with_property(
                    "startLine",
                    serde_json::json!(method.node.start_position().row + 1),
                )
                .with_property(
                    "endLine",
                    serde_json::json!(method.node.end_position().row + 1),
                );
            if method.is_constructor {
                draft = draft.with_tag("constructor");
            }
            if method.is_accessor {
                draft = draft.with_tag("accessor");
            }
            if method.is_async {
                draft = draft.with_tag("async-method");
            }
            if method.is_static {
                draft = draft.with_tag("static-method");
            }
            if u64::from(body_metrics.cyclomatic_complexity) >= threshold {
                draft = draft.with_tag("high-complexity");
            }
            result.nodes.push(draft);

            result.edges.push(
                EdgeDraft::new(class_address.clone(), address.clone(), "contains-method")
                    .with_source_file(ctx.file_path),
            );

            if let Some(body) = &method.body {
                let mut accessed = BTreeSet::new();
                let mut called = BTreeSet::new();
                let mut used_types = BTreeSet::new();
                collect_member_uses(
                    body,
                    source,
                    ctx.language,
                    &mut accessed,
                    &mut called,
                    &mut used_types,
                );
                collect_signature_types(&method.node, source, &mut used_types);

                for field in accessed {
                    if !field_names.contains(field.as_str()) {
                        continue;
                    }
                    let field_address = ctx.symbol_address(
                        NodeType::Property,
                        &format!("{}.{}", class.name, field),
                    )?;
                    result.edges.push(
                        EdgeDraft::new(address.clone(), field_address, "accesses-field")
                            .with_source_file(ctx.file_path),
                    );
                }
                for callee in called {
                    if !class.methods.iter().any(|m| m.name == callee) {
                        continue;
                    }
                    let callee_address = ctx.symbol_address(
                        NodeType::Method,
                        &format!("{}.{}", class.name, callee),
                    )?;
                    result.edges.push(
                        EdgeDraft::new(address.clone(), callee_address, "calls-method")
                            .with_source_file(ctx.file_path),
                    );
                }
                for type_name in used_types {
                    let Some(type_address) = declared_types.get(&type_name) else {
                        continue;
                    };
                    if type_name == class.name {
                        continue;
                    }
                    result.edges.push(
                        EdgeDraft::new(address.clone(), type_address.clone(), "uses-type")
                            .with_source_file(ctx.file_path),
                    );
                }
            }

            // Override detection: the superclass (same file) declares a
            // method with the same name.
            if let Some(parent) = &class.extends
                && !method.is_constructor
                && methods_by_class
                    .get(parent)
                    .is_some_and(|methods| methods.contains(&method.name))
            {
                let parent_method = ctx.symbol_address(
                    NodeType::Method,
                    &format!("{}.{}", parent, method.name),
                )?;
                result.edges.push(
                    EdgeDraft::new(address, parent_method, "overrides-method")
                        .with_source_file(ctx.file_path),
                );
            }
        }
        Ok(())
    }
}

/// Type addresses declared in this file by the symbol scenario.
fn declared_type_addresses(ctx: &AnalysisContext<'_>) -> BTreeMap<String, RdfAddress> {
    let mut result = BTreeMap::new();
    if let Some(prior) = ctx.prior.get(super::symbol_dependency::ID) {
        for node in &prior.nodes {
            if matches!(
                node.node_type,
                NodeType::Class | NodeType::Interface | NodeType::Type | NodeType::Enum
            ) {
                result.insert(node.name.clone(), node.address.clone());
            }
        }
    }
    result
}

/// Collect `this.x` field reads, `this.m()` calls, and type identifiers in a
/// method body.
fn collect_member_uses(
    node: &Node<'_>,
    source: &str,
    language: Language,
    accessed: &mut BTreeSet<String>,
    called: &mut BTreeSet<String>,
    used_types: &mut BTreeSet<String>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match (language, child.kind()) {
            (Language::TypeScript | Language::JavaScript, "member_expression") => {
                let object = child.child_by_field_name("object");
                let property = child.child_by_field_name("property");
                if let (Some(object), Some(property)) = (object, property)
                    && child.kind() == "member_expression"
                    && &source[object.byte_range()] == "this"
                {
                    let name = source[property.byte_range()].to_string();
                    let is_call = child
                        .parent()
                        .is_some_and(|p| {
                            p.kind() == "call_expression"
                                && p.child_by_field_name("function")
                                    .is_some_and(|f| f.id() == child.id())
                        });
                    if is_call {
                        called.insert(name);
                    } else {
                        accessed.insert(name);
                    }
                }
            }
            (Language::Python, "attribute") => {
                let object = child.child_by_field_name("object");
                let attribute = child.child_by_field_name("attribute");
                if let (Some(object), Some(attribute)) = (object, attribute)
                    && &source[object.byte_range()] == "self"
                {
                    let name = source[attribute.byte_range()].to_string();
                    let is_call = child
                        .parent()
                        .is_some_and(|p| {
                            p.kind() == "call"
                                && p.child_by_field_name("function")
                                    .is_some_and(|f| f.id() == child.id())
                        });
                    if is_call {
                        called.insert(name);
                    } else {
                        accessed.insert(name);
                    }
                }
            }
            (Language::Rust, "field_expression") => {
                let value = child.child_by_field_name("value");
                let field = child.child_by_field_name("field");
                if let (Some(value), Some(field)) = (value, field)
                    && &source[value.byte_range()] == "self"
                {
                    let name = source[field.byte_range()].to_string();
                    let is_call = child
                        .parent()
                        .is_some_and(|p| {
                            p.kind() == "call_expression"
                                && p.child_by_field_name("function")
                                    .is_some_and(|f| f.id() == child.id())
                        });
                    if is_call {
                        called.insert(name);
                    } else {
                        accessed.insert(name);
                    }
                }
            }
            (Language::TypeScript | Language::JavaScript, "type_identifier") => {
                used_types.insert(source[child.byte_range()].to_string());
            }
            (Language::Rust, "type_identifier") => {
                used_types.insert(source[child.byte_range()].to_string());
            }
            _ => {}
        }
        collect_member_uses(&child, source, language, accessed, called, used_types);
    }
}

/// Type identifiers in a method signature (parameters and return type).
fn collect_signature_types(method: &Node<'_>, source: &str, used_types: &mut BTreeSet<String>) {
    for field in ["parameters", "return_type", "type"] {
        if let Some(node) = method.child_by_field_name(field) {
            collect_type_identifiers(&node, source, used_types);
        }
    }
}

fn collect_type_identifiers(node: &Node<'_>, source: &str, used_types: &mut BTreeSet<String>) {
    if node.kind() == "type_identifier" {
        used_types.insert(source[node.byte_range()].to_string());
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        collect_type_identifiers(&child, source, used_types);
    }
}

// ---------------------------------------------------------------------------
// Class collection
// ---------------------------------------------------------------------------

fn collect_js_classes<'t>(root: &Node<'t>, source: &str) -> Vec<ClassInfo<'t>> {
    let mut classes = Vec::new();
    collect_js_classes_into(root, source, &mut classes);
    classes
}

fn collect_js_classes_into<'t>(node: &Node<'t>, source: &str, classes: &mut Vec<ClassInfo<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(class) = js_class_info(&child, source) {
                    classes.push(class);
                }
            }
            "export_statement" => collect_js_classes_into(&child, source, classes),
            _ => {}
        }
    }
}

fn js_class_info<'t>(class: &Node<'t>, source: &str) -> Option<ClassInfo<'t>> {
    let name = source[class.child_by_field_name("name")?.byte_range()].to_string();
    let mut info = ClassInfo {
        name,
        extends: None,
        fields: Vec::new(),
        methods: Vec::new(),
    };

    let mut cursor = class.walk();
    for child in class.children(&mut cursor) {
        if child.kind() == "class_heritage" {
            let mut heritage_cursor = child.walk();
            for clause in child.children(&mut heritage_cursor) {
                if clause.kind() == "extends_clause" {
                    let mut clause_cursor = clause.walk();
                    for target in clause.children(&mut clause_cursor) {
                        if matches!(target.kind(), "identifier" | "type_identifier") {
                            info.extends = Some(source[target.byte_range()].to_string());
                        }
                    }
                }
            }
        }
    }

    let body = class.child_by_field_name("body")?;
    let mut body_cursor = body.walk();
    for member in body.children(&mut body_cursor) {
        match member.kind() {
            "public_field_definition" | "field_definition" => {
                if let Some(name_node) = member.child_by_field_name("name") {
                    info.fields.push((
                        source[name_node.byte_range()].to_string(),
                        member.start_position().row + 1,
                    ));
                }
            }
            "method_definition" => {
                let Some(name_node) = member.child_by_field_name("name") else {
                    continue;
                };
                let name = source[name_node.byte_range()].to_string();
                let mut method = MethodInfo {
                    is_constructor: name == "constructor",
                    name,
                    body: member.child_by_field_name("body"),
                    node: member,
                    is_accessor: false,
                    is_async: false,
                    is_static: false,
                    parameter_count: 0,
                };
                let mut member_cursor = member.walk();
                for token in member.children(&mut member_cursor) {
                    match token.kind() {
                        "async" => method.is_async = true,
                        "static" => method.is_static = true,
                        "get" | "set" => method.is_accessor = true,
                        _ => {}
                    }
                }
                if let Some(parameters) = member.child_by_field_name("parameters") {
                    let mut params_cursor = parameters.walk();
                    method.parameter_count = parameters
                        .children(&mut params_cursor)
                        .filter(|p| {
                            matches!(p.kind(), "required_parameter" | "optional_parameter")
                                || p.kind() == "identifier"
                        })
                        .count();
                }
                info.methods.push(method);
            }
            _ => {}
        }
    }
    Some(info)
}

fn collect_python_classes<'t>(root: &Node<'t>, source: &str) -> Vec<ClassInfo<'t>> {
    let mut classes = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let class_node = match child.kind() {
            "class_definition" => child,
            "decorated_definition" => {
                let mut inner_cursor = child.walk();
                match child
                    .children(&mut inner_cursor)
                    .find(|n| n.kind() == "class_definition")
                {
                    Some(inner) => inner,
                    None => continue,
                }
            }
            _ => continue,
        };
        let Some(name_node) = class_node.child_by_field_name("name") else {
            continue;
        };
        let mut info = ClassInfo {
            name: source[name_node.byte_range()].to_string(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
        };
        if let Some(bases) = class_node.child_by_field_name("superclasses") {
            let mut bases_cursor = bases.walk();
            if let Some(base) = bases
                .children(&mut bases_cursor)
                .find(|n| n.kind() == "identifier")
            {
                info.extends = Some(source[base.byte_range()].to_string());
            }
        }
        if let Some(body) = class_node.child_by_field_name("body") {
            collect_python_members(&body, source, &mut info);
        }
        classes.push(info);
    }
    classes
}

fn collect_python_members<'t>(body: &Node<'t>, source: &str, info: &mut ClassInfo<'t>) {
    let mut cursor = body.walk();
    for member in body.children(&mut cursor) {
        let (function, decorators) = match member.kind() {
            "function_definition" => (member, Vec::new()),
            "decorated_definition" => {
                let mut names = Vec::new();
                let mut inner_cursor = member.walk();
                let mut function = None;
                for part in member.children(&mut inner_cursor) {
                    match part.kind() {
                        "decorator" => {
                            names.push(source[part.byte_range()].trim_start_matches('@').to_string());
                        }
                        "function_definition" => function = Some(part),
                        _ => {}
                    }
                }
                match function {
                    Some(f) => (f, names),
                    None => continue,
                }
            }
            _ => continue,
        };
        let Some(name_node) = function.child_by_field_name("name") else {
            continue;
        };
        let name = source[name_node.byte_range()].to_string();
        let is_async = {
            let mut fn_cursor = function.walk();
            function.children(&mut fn_cursor).any(|n| n.kind() == "async")
        };
        let parameter_count = function
            .child_by_field_name("parameters")
            .map(|params| {
                let mut params_cursor = params.walk();
                params
                    .children(&mut params_cursor)
                    .filter(|p| {
                        matches!(
                            p.kind(),
                            "identifier" | "typed_parameter" | "default_parameter"
                        )
                    })
                    .filter(|p| &source[p.byte_range()] != "self")
                    .count()
            })
            .unwrap_or(0);
        // `self.x = ...` assignments in __init__ declare instance fields.
        if name == "__init__"
            && let Some(fn_body) = function.child_by_field_name("body")
        {
            collect_python_fields(&fn_body, source, &mut info.fields);
        }
        info.methods.push(MethodInfo {
            is_constructor: name == "__init__",
            is_accessor: decorators.iter().any(|d| d == "property" || d.ends_with(".setter")),
            is_static: decorators.iter().any(|d| d == "staticmethod" || d == "classmethod"),
            is_async,
            name,
            body: function.child_by_field_name("body"),
            node: function,
            parameter_count,
        });
    }
}

fn collect_python_fields(node: &Node<'_>, source: &str, fields: &mut Vec<(String, usize)>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "assignment"
            && let Some(left) = child.child_by_field_name("left")
            && left.kind() == "attribute"
            && let Some(object) = left.child_by_field_name("object")
            && &source[object.byte_range()] == "self"
            && let Some(attribute) = left.child_by_field_name("attribute")
        {
            let name = source[attribute.byte_range()].to_string();
            if !fields.iter().any(|(f, _)| f == &name) {
                fields.push((name, child.start_position().row + 1));
            }
        }
        collect_python_fields(&child, source, fields);
    }
}

fn collect_rust_classes<'t>(root: &Node<'t>, source: &str) -> Vec<ClassInfo<'t>> {
    // Structs carry the fields; impl blocks carry the methods.
    let mut classes: BTreeMap<String, ClassInfo<'t>> = BTreeMap::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "struct_item" => {
                let Some(name_node) = child.child_by_field_name("name") else {
                    continue;
                };
                let name = source[name_node.byte_range()].to_string();
                let info = classes.entry(name.clone()).or_insert_with(|| ClassInfo {
                    name,
                    extends: None,
                    fields: Vec::new(),
                    methods: Vec::new(),
                });
                if let Some(body) = child.child_by_field_name("body") {
                    let mut body_cursor = body.walk();
                    for field in body.children(&mut body_cursor) {
                        if field.kind() == "field_declaration"
                            && let Some(field_name) = field.child_by_field_name("name")
                        {
                            info.fields.push((
                                source[field_name.byte_range()].to_string(),
                                field.start_position().row + 1,
                            ));
                        }
                    }
                }
            }
            "impl_item" => {
                let Some(type_node) = child.child_by_field_name("type") else {
                    continue;
                };
                let name = source[type_node.byte_range()].to_string();
                let info = classes.entry(name.clone()).or_insert_with(|| ClassInfo {
                    name,
                    extends: None,
                    fields: Vec::new(),
                    methods: Vec::new(),
                });
                let Some(body) = child.child_by_field_name("body") else {
                    continue;
                };
                let mut body_cursor = body.walk();
                for member in body.children(&mut body_cursor) {
                    if member.kind() != "function_item" {
                        continue;
                    }
                    let Some(fn_name) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let name = source[fn_name.byte_range()].to_string();
                    let parameter_count = member
                        .child_by_field_name("parameters")
                        .map(|params| {
                            let mut params_cursor = params.walk();
                            params
                                .children(&mut params_cursor)
                                .filter(|p| p.kind() == "parameter")
                                .count()
                        })
                        .unwrap_or(0);
                    let is_async = {
                        let mut fn_cursor = member.walk();
                        member.children(&mut fn_cursor).any(|n| n.kind() == "async")
                    };
                    info.methods.push(MethodInfo {
                        is_constructor: name == "new",
                        name,
                        body: member.child_by_field_name("body"),
                        node: member,
                        is_accessor: false,
                        is_async,
                        is_static: false,
                        parameter_count,
                    });
                }
            }
            _ => {}
        }
    }
    classes.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdg_parser::parse_source;
    use std::path::Path;

    fn analyze_with_threshold(
        path: &str,
        source: &str,
        language: Language,
        threshold: Option<u64>,
    ) -> AnalysisResult {
        let unit = parse_source(Path::new(path), source.to_string(), language).unwrap();
        let mut config = serde_json::Map::new();
        if let Some(threshold) = threshold {
            config.insert(
                "complexityThreshold".to_string(),
                serde_json::json!(threshold),
            );
        }
        let prior = BTreeMap::new();
        let ctx = AnalysisContext {
            file_path: path,
            project_name: "proj",
            language,
            unit: &unit,
            config: &config,
            prior: &prior,
        };
        MethodAnalysis.analyze(&ctx).unwrap()
    }

    fn analyze(path: &str, source: &str, language: Language) -> AnalysisResult {
        analyze_with_threshold(path, source, language, None)
    }

    #[test]
    fn method_metrics_match_branching() {
        let result = analyze(
            "src/s.ts",
            r#"
class S {
  m(a: boolean, b: boolean): number {
    let x = 0;
    if (a) { if (b) { x = 1; } }
    return x;
  }
}
"#,
            Language::TypeScript,
        );
        let method = result
            .nodes
            .iter()
            .find(|n| n.address.to_string() == "proj/src/s.ts#Method:S.m")
            .expect("method node");
        assert_eq!(
            method.properties["cyclomaticComplexity"],
            serde_json::json!(3)
        );
        assert_eq!(method.properties["nestingDepth"], serde_json::json!(2));
        assert!(method.properties["numberOfStatements"].as_u64().unwrap() >= 3);
    }

    #[test]
    fn high_complexity_tagging_follows_threshold() {
        let source = r#"
class S {
  m(a: boolean, b: boolean): number {
    let x = 0;
    if (a) { if (b) { x = 1; } }
    return x;
  }
}
"#;
        let tagged = analyze_with_threshold("src/s.ts", source, Language::TypeScript, Some(3));
        let method = tagged
            .nodes
            .iter()
            .find(|n| n.name == "m")
            .expect("method node");
        assert!(method.semantic_tags.contains("high-complexity"));

        let untagged = analyze_with_threshold("src/s.ts", source, Language::TypeScript, Some(4));
        let method = untagged.nodes.iter().find(|n| n.name == "m").unwrap();
        assert!(!method.semantic_tags.contains("high-complexity"));
    }

    #[test]
    fn constructors_accessors_and_modifiers_are_tagged() {
        let result = analyze(
            "src/s.ts",
            r#"
class S {
  private count = 0;
  constructor() {}
  get value(): number { return this.count; }
  static async fetchAll(): Promise<void> {}
}
"#,
            Language::TypeScript,
        );
        let tags_of = |name: &str| {
            result
                .nodes
                .iter()
                .find(|n| n.name == name && n.node_type == NodeType::Method)
                .map(|n| n.semantic_tags.clone())
                .unwrap_or_default()
        };
        assert!(tags_of("constructor").contains("constructor"));
        assert!(tags_of("value").contains("accessor"));
        assert!(tags_of("fetchAll").contains("static-method"));
        assert!(tags_of("fetchAll").contains("async-method"));
    }

    #[test]
    fn fields_and_accesses_are_linked() {
        let result = analyze(
            "src/s.ts",
            r#"
class Counter {
  count = 0;
  increment() { this.count = this.count + 1; this.log(); }
  log() {}
}
"#,
            Language::TypeScript,
        );
        assert!(result.nodes.iter().any(|n| {
            n.node_type == NodeType::Property
                && n.address.to_string() == "proj/src/s.ts#Property:Counter.count"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "accesses-field"
                && e.from.to_string() == "proj/src/s.ts#Method:Counter.increment"
                && e.to.to_string() == "proj/src/s.ts#Property:Counter.count"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "calls-method"
                && e.from.to_string() == "proj/src/s.ts#Method:Counter.increment"
                && e.to.to_string() == "proj/src/s.ts#Method:Counter.log"
        }));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "contains-method"
                && e.from.to_string() == "proj/src/s.ts#Class:Counter"
        }));
    }

    #[test]
    fn overrides_are_detected_within_file() {
        let result = analyze(
            "src/s.ts",
            r#"
class Base {
  render() {}
}
class Child extends Base {
  render() {}
}
"#,
            Language::TypeScript,
        );
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "overrides-method"
                && e.from.to_string() == "proj/src/s.ts#Method:Child.render"
                && e.to.to_string() == "proj/src/s.ts#Method:Base.render"
        }));
    }

    #[test]
    fn python_fields_from_init() {
        let result = analyze(
            "pkg/counter.py",
            r#"
class Counter:
    def __init__(self):
        self.count = 0

    def increment(self):
        self.count += 1
"#,
            Language::Python,
        );
        assert!(result.nodes.iter().any(|n| {
            n.node_type == NodeType::Property
                && n.address.to_string() == "proj/pkg/counter.py#Property:Counter.count"
        }));
        let init = result
            .nodes
            .iter()
            .find(|n| n.name == "__init__")
            .expect("constructor");
        assert!(init.semantic_tags.contains("constructor"));
    }

    #[test]
    fn rust_impl_methods_with_fields() {
        let result = analyze(
            "src/counter.rs",
            r#"
struct Counter {
    count: u32,
}

impl Counter {
    fn new() -> Self {
        Counter { count: 0 }
    }

    fn increment(&mut self) {
        self.count += 1;
    }
}
"#,
            Language::Rust,
        );
        assert!(result.nodes.iter().any(|n| {
            n.address.to_string() == "proj/src/counter.rs#Method:Counter.increment"
        }));
        let new_method = result
            .nodes
            .iter()
            .find(|n| n.name == "new")
            .expect("constructor");
        assert!(new_method.semantic_tags.contains("constructor"));
        assert!(result.edges.iter().any(|e| {
            e.edge_type == "accesses-field"
                && e.to.to_string() == "proj/src/counter.rs#Property:Counter.count"
        }));
    }
}
