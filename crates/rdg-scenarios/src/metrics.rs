//! Method body metrics: cyclomatic complexity, nesting depth, LOC, and
//! statement count, computed over a tree-sitter subtree.

use rdg_parser::Language;
use tree_sitter::Node;

/// Metrics for one method or function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyMetrics {
    pub cyclomatic_complexity: u32,
    pub nesting_depth: u32,
    pub lines_of_code: u32,
    pub statement_count: u32,
}

/// Node kinds that add a decision point, per language.
fn decision_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::TypeScript | Language::JavaScript => &[
            "if_statement",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "switch_case",
            "catch_clause",
            "ternary_expression",
        ],
        Language::Python => &[
            "if_statement",
            "elif_clause",
            "for_statement",
            "while_statement",
            "case_clause",
            "except_clause",
            "conditional_expression",
        ],
        Language::Rust => &[
            "if_expression",
            "for_expression",
            "while_expression",
            "loop_expression",
            "match_arm",
        ],
        Language::Markdown => &[],
    }
}

/// Node kinds that increase nesting depth, per language.
fn nesting_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::TypeScript | Language::JavaScript => &[
            "if_statement",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "switch_statement",
        ],
        Language::Python => &["if_statement", "for_statement", "while_statement", "match_statement"],
        Language::Rust => &[
            "if_expression",
            "for_expression",
            "while_expression",
            "loop_expression",
            "match_expression",
        ],
        Language::Markdown => &[],
    }
}

/// Whether a binary/boolean node uses a short-circuit operator.
fn is_short_circuit(node: &Node<'_>, source: &str, language: Language) -> bool {
    match language {
        Language::TypeScript | Language::JavaScript | Language::Rust => {
            if node.kind() != "binary_expression" {
                return false;
            }
            node.child_by_field_name("operator")
                .map(|op| {
                    let text = &source[op.byte_range()];
                    text == "&&" || text == "||"
                })
                .unwrap_or(false)
        }
        Language::Python => node.kind() == "boolean_operator",
        Language::Markdown => false,
    }
}

/// Compute all body metrics for the subtree rooted at `body`.
///
/// Cyclomatic complexity = 1 + decision points (branches, cases, catch
/// clauses, ternaries, and short-circuit operators). Nesting depth is the
/// maximum control-structure depth. LOC spans the body's line range.
/// Statement count counts nodes whose kind ends in `_statement`.
pub fn compute(body: &Node<'_>, source: &str, language: Language) -> BodyMetrics {
    let mut metrics = BodyMetrics {
        cyclomatic_complexity: 1,
        nesting_depth: 0,
        lines_of_code: (body.end_position().row - body.start_position().row + 1) as u32,
        statement_count: 0,
    };
    walk(body, source, language, 0, &mut metrics);
    metrics
}

fn walk(node: &Node<'_>, source: &str, language: Language, depth: u32, metrics: &mut BodyMetrics) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if decision_kinds(language).contains(&kind) || is_short_circuit(&child, source, language) {
            metrics.cyclomatic_complexity += 1;
        }
        if kind.ends_with("_statement") {
            metrics.statement_count += 1;
        }
        let next_depth = if nesting_kinds(language).contains(&kind) {
            let entered = depth + 1;
            metrics.nesting_depth = metrics.nesting_depth.max(entered);
            entered
        } else {
            depth
        };
        walk(&child, source, language, next_depth, metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdg_parser::parse_source;
    use std::path::Path;

    fn method_body_metrics(source: &str) -> BodyMetrics {
        let unit = parse_source(Path::new("s.ts"), source.to_string(), Language::TypeScript)
            .unwrap();
        let tree = unit.tree.as_ref().unwrap();
        // program → class_declaration → class_body → method_definition → body
        let body = find_first(&tree.root_node(), "statement_block").expect("method body");
        compute(&body, &unit.source, Language::TypeScript)
    }

    fn find_first<'t>(node: &tree_sitter::Node<'t>, kind: &str) -> Option<tree_sitter::Node<'t>> {
        if node.kind() == kind {
            return Some(*node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            if let Some(found) = find_first(&child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn nested_ifs_count_decisions_and_depth() {
        let metrics = method_body_metrics(
            "class S { m(a: boolean, b: boolean) { if (a) { if (b) { let x = 1; } } return 1; } }",
        );
        assert_eq!(metrics.cyclomatic_complexity, 3);
        assert_eq!(metrics.nesting_depth, 2);
        assert!(metrics.statement_count >= 3);
    }

    #[test]
    fn short_circuit_operators_add_decisions() {
        let metrics = method_body_metrics("class S { m(a: boolean, b: boolean) { return a && b; } }");
        assert_eq!(metrics.cyclomatic_complexity, 2);
        assert_eq!(metrics.nesting_depth, 0);
    }

    #[test]
    fn straight_line_code_is_complexity_one() {
        let metrics = method_body_metrics("class S { m() { const x = 1; return x; } }");
        assert_eq!(metrics.cyclomatic_complexity, 1);
        assert_eq!(metrics.nesting_depth, 0);
    }
}
