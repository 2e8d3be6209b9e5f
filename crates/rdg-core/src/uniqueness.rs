//! Batch uniqueness validation for per-file symbol extractions.
//!
//! Exact duplicates are dropped; same-file symbol-name collisions across
//! node types are reported with proposed disambiguations (never
//! auto-applied); cross-file collisions are allowed by construction since
//! the file path segment distinguishes the addresses.

use crate::address::{NodeType, RdfAddress};
use serde::Serialize;
use std::collections::BTreeMap;

/// One symbol extraction produced by an analyzer for a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolExtraction {
    pub address: RdfAddress,
    pub node_type: NodeType,
    pub name: String,
    /// 1-based start line, used only for positional disambiguation proposals.
    pub line: Option<usize>,
}

/// A same-file collision: one symbol name extracted under multiple node types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolConflict {
    pub file_path: String,
    pub name: String,
    pub node_types: Vec<String>,
    /// Proposed replacement symbol names, in preference order. The caller
    /// decides whether to apply one; the validator never rewrites addresses.
    pub proposals: Vec<String>,
}

/// Result of validating one file's extraction batch.
#[derive(Debug, Clone, Default)]
pub struct UniquenessReport {
    /// Surviving extractions, deduplicated, in first-seen order.
    pub unique: Vec<SymbolExtraction>,
    /// Number of exact duplicates dropped.
    pub exact_duplicates: usize,
    pub conflicts: Vec<SymbolConflict>,
}

impl UniquenessReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Validate a batch of symbol extractions from one file.
pub fn validate_batch(extractions: Vec<SymbolExtraction>) -> UniquenessReport {
    let mut report = UniquenessReport::default();
    let mut seen_addresses: BTreeMap<String, usize> = BTreeMap::new();
    // (file_path, name) -> indices into report.unique
    let mut by_name: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();

    for extraction in extractions {
        let key = extraction.address.to_string();
        if seen_addresses.contains_key(&key) {
            report.exact_duplicates += 1;
            continue;
        }
        seen_addresses.insert(key, report.unique.len());
        if let Some(file_path) = extraction.address.file_path() {
            by_name
                .entry((file_path.to_string(), extraction.name.clone()))
                .or_default()
                .push(report.unique.len());
        }
        report.unique.push(extraction);
    }

    for ((file_path, name), indices) in by_name {
        if indices.len() < 2 {
            continue;
        }
        let mut node_types: Vec<String> = indices
            .iter()
            .map(|&i| report.unique[i].node_type.as_str().to_string())
            .collect();
        node_types.dedup();
        if node_types.len() < 2 {
            continue;
        }
        let mut proposals = Vec::new();
        for &i in &indices {
            let extraction = &report.unique[i];
            // Type-prefixed form keeps the name readable in queries.
            proposals.push(format!("{}.{}", extraction.node_type.as_str(), name));
            if let Some(line) = extraction.line {
                proposals.push(format!("{name}@L{line}"));
            }
        }
        proposals.dedup();
        report.conflicts.push(SymbolConflict {
            file_path,
            name,
            node_types,
            proposals,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(ty: NodeType, name: &str, line: usize) -> SymbolExtraction {
        SymbolExtraction {
            address: RdfAddress::symbol("proj", "src/a.ts", ty.clone(), name).unwrap(),
            node_type: ty,
            name: name.to_string(),
            line: Some(line),
        }
    }

    #[test]
    fn exact_duplicates_are_dropped() {
        let report = validate_batch(vec![
            extraction(NodeType::Function, "handle", 3),
            extraction(NodeType::Function, "handle", 3),
        ]);
        assert_eq!(report.unique.len(), 1);
        assert_eq!(report.exact_duplicates, 1);
        assert!(!report.has_conflicts());
    }

    #[test]
    fn cross_type_collision_reported_not_rewritten() {
        let report = validate_batch(vec![
            extraction(NodeType::Class, "User", 1),
            extraction(NodeType::Function, "User", 20),
        ]);
        assert_eq!(report.unique.len(), 2);
        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.name, "User");
        assert_eq!(conflict.node_types, vec!["Class", "Function"]);
        assert!(conflict.proposals.contains(&"Class.User".to_string()));
        assert!(conflict.proposals.contains(&"User@L20".to_string()));
        // Addresses are untouched.
        assert_eq!(
            report.unique[0].address.to_string(),
            "proj/src/a.ts#Class:User"
        );
    }

    #[test]
    fn cross_file_collisions_allowed() {
        let a = SymbolExtraction {
            address: RdfAddress::symbol("proj", "src/a.ts", NodeType::Class, "User").unwrap(),
            node_type: NodeType::Class,
            name: "User".into(),
            line: None,
        };
        let b = SymbolExtraction {
            address: RdfAddress::symbol("proj", "src/b.ts", NodeType::Function, "User").unwrap(),
            node_type: NodeType::Function,
            name: "User".into(),
            line: None,
        };
        let report = validate_batch(vec![a, b]);
        assert_eq!(report.unique.len(), 2);
        assert!(!report.has_conflicts());
    }
}
