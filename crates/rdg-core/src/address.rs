//! RDF-style node addresses: the global identifier scheme for graph nodes.
//!
//! Grammar:
//! ```text
//! <project>/<filePath>                          file or directory node
//! <project>/<filePath>#<NodeType>:<SymbolName>  symbol node
//! <libraryName>[#<NodeType>:<SymbolName>]       external library / package
//! ```
//!
//! An address identifies at most one entity within a repository. Positions
//! (line/column) are never part of the address; they live in node properties.

pub use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Characters allowed in project names, file paths, and library names.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '@')
}

/// Characters allowed in symbol names (dot-separated nesting, `$` for
/// generated JS symbols).
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '$')
}

/// The kind of entity a node represents. Standard types are closed;
/// scenarios may declare [`NodeType::Extension`] types (capitalized,
/// case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NodeType {
    File,
    Directory,
    Class,
    Interface,
    Function,
    Method,
    Property,
    Variable,
    Type,
    Enum,
    Namespace,
    Heading,
    Section,
    Paragraph,
    Unknown,
    /// Scenario-declared extension type.
    Extension(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::File => "File",
            NodeType::Directory => "Directory",
            NodeType::Class => "Class",
            NodeType::Interface => "Interface",
            NodeType::Function => "Function",
            NodeType::Method => "Method",
            NodeType::Property => "Property",
            NodeType::Variable => "Variable",
            NodeType::Type => "Type",
            NodeType::Enum => "Enum",
            NodeType::Namespace => "Namespace",
            NodeType::Heading => "Heading",
            NodeType::Section => "Section",
            NodeType::Paragraph => "Paragraph",
            NodeType::Unknown => "Unknown",
            NodeType::Extension(name) => name,
        }
    }

    /// Whether this is one of the standard (non-extension) types.
    pub fn is_standard(&self) -> bool {
        !matches!(self, NodeType::Extension(_))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known = match s {
            "File" => Some(NodeType::File),
            "Directory" => Some(NodeType::Directory),
            "Class" => Some(NodeType::Class),
            "Interface" => Some(NodeType::Interface),
            "Function" => Some(NodeType::Function),
            "Method" => Some(NodeType::Method),
            "Property" => Some(NodeType::Property),
            "Variable" => Some(NodeType::Variable),
            "Type" => Some(NodeType::Type),
            "Enum" => Some(NodeType::Enum),
            "Namespace" => Some(NodeType::Namespace),
            "Heading" => Some(NodeType::Heading),
            "Section" => Some(NodeType::Section),
            "Paragraph" => Some(NodeType::Paragraph),
            "Unknown" => Some(NodeType::Unknown),
            _ => None,
        };
        if let Some(ty) = known {
            return Ok(ty);
        }
        // Extension types: capitalized, alphanumeric/underscore tail.
        let mut chars = s.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(NodeType::Extension(s.to_string()))
        } else {
            Err(AddressError::UnknownNodeType(s.to_string()))
        }
    }
}

impl From<NodeType> for String {
    fn from(ty: NodeType) -> Self {
        ty.as_str().to_string()
    }
}

impl TryFrom<String> for NodeType {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl PartialOrd for NodeType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// A parsed RDF address. Serialized as its canonical string form so persisted
/// graphs round-trip through [`RdfAddress::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RdfAddress {
    /// `<project>/<filePath>` — a file or directory node.
    Path { project: String, file_path: String },
    /// `<project>/<filePath>#<NodeType>:<SymbolName>` — a symbol node.
    Symbol {
        project: String,
        file_path: String,
        node_type: NodeType,
        symbol: String,
    },
    /// `<libraryName>` — an external library or package.
    Library { name: String },
    /// `<libraryName>#<NodeType>:<SymbolName>` — a symbol inside a library.
    LibrarySymbol {
        name: String,
        node_type: NodeType,
        symbol: String,
    },
}

/// Collapse `.` segments and resolve non-escaping `..` segments.
/// Escaping `..` segments are kept so validation can reject them.
fn normalize_path_str(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if out.last().is_none_or(|&s| s == "..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

fn check_chars(segment: &str, allowed: fn(char) -> bool) -> Result<(), AddressError> {
    if let Some(ch) = segment.chars().find(|&c| !allowed(c)) {
        return Err(AddressError::IllegalChar {
            segment: segment.to_string(),
            ch,
        });
    }
    Ok(())
}

fn check_file_path(project: &str, file_path: &str) -> Result<(), AddressError> {
    if file_path.is_empty() {
        return Err(AddressError::Malformed(format!("{project}/")));
    }
    check_chars(file_path, is_path_char)?;
    if file_path.split('/').any(|seg| seg == "..") {
        return Err(AddressError::PathEscapesRoot(format!(
            "{project}/{file_path}"
        )));
    }
    Ok(())
}

fn check_name_segment(name: &str) -> Result<(), AddressError> {
    if name.is_empty() {
        return Err(AddressError::Malformed(String::new()));
    }
    check_chars(name, is_path_char)?;
    if name.contains('/') {
        return Err(AddressError::IllegalChar {
            segment: name.to_string(),
            ch: '/',
        });
    }
    Ok(())
}

fn check_symbol(symbol: &str) -> Result<(), AddressError> {
    if symbol.is_empty() || symbol.starts_with('.') || symbol.ends_with('.') {
        return Err(AddressError::Malformed(symbol.to_string()));
    }
    check_chars(symbol, is_symbol_char)
}

impl RdfAddress {
    /// Build a file or directory address. The path is normalized (collapsed
    /// `./`, POSIX separators); `..` escaping the project root is rejected.
    pub fn file(project: &str, file_path: &str) -> Result<Self, AddressError> {
        check_name_segment(project)?;
        let file_path = normalize_path_str(&file_path.replace('\\', "/"));
        check_file_path(project, &file_path)?;
        Ok(RdfAddress::Path {
            project: project.to_string(),
            file_path,
        })
    }

    /// Build a symbol address inside a project file.
    pub fn symbol(
        project: &str,
        file_path: &str,
        node_type: NodeType,
        symbol: &str,
    ) -> Result<Self, AddressError> {
        let base = Self::file(project, file_path)?;
        check_symbol(symbol)?;
        let RdfAddress::Path { project, file_path } = base else {
            unreachable!("file() only returns Path");
        };
        Ok(RdfAddress::Symbol {
            project,
            file_path,
            node_type,
            symbol: symbol.to_string(),
        })
    }

    /// Build an external library address.
    pub fn library(name: &str) -> Result<Self, AddressError> {
        check_name_segment(name)?;
        Ok(RdfAddress::Library {
            name: name.to_string(),
        })
    }

    /// Build a symbol address inside an external library.
    pub fn library_symbol(
        name: &str,
        node_type: NodeType,
        symbol: &str,
    ) -> Result<Self, AddressError> {
        check_name_segment(name)?;
        check_symbol(symbol)?;
        Ok(RdfAddress::LibrarySymbol {
            name: name.to_string(),
            node_type,
            symbol: symbol.to_string(),
        })
    }

    /// Parse a raw address string. Deterministic: for any well-formed `x`,
    /// `parse(build(parse(x))) == parse(x)`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AddressError::Malformed(raw.to_string()));
        }

        let (base, fragment) = match raw.split_once('#') {
            Some((base, frag)) => (base, Some(frag)),
            None => (raw, None),
        };
        if base.is_empty() {
            return Err(AddressError::Malformed(raw.to_string()));
        }

        let fragment = fragment
            .map(|frag| -> Result<(NodeType, String), AddressError> {
                let (ty, symbol) = frag
                    .split_once(':')
                    .ok_or_else(|| AddressError::Malformed(raw.to_string()))?;
                let node_type: NodeType = ty.parse()?;
                check_symbol(symbol)?;
                Ok((node_type, symbol.to_string()))
            })
            .transpose()?;

        let base = base.replace('\\', "/");
        match base.split_once('/') {
            Some((project, rest)) => {
                check_name_segment(project)?;
                let file_path = normalize_path_str(rest);
                check_file_path(project, &file_path)?;
                match fragment {
                    Some((node_type, symbol)) => Ok(RdfAddress::Symbol {
                        project: project.to_string(),
                        file_path,
                        node_type,
                        symbol,
                    }),
                    None => Ok(RdfAddress::Path {
                        project: project.to_string(),
                        file_path,
                    }),
                }
            }
            None => {
                check_name_segment(&base)?;
                match fragment {
                    Some((node_type, symbol)) => Ok(RdfAddress::LibrarySymbol {
                        name: base,
                        node_type,
                        symbol,
                    }),
                    None => Ok(RdfAddress::Library { name: base }),
                }
            }
        }
    }

    /// Normalize a raw address string. Idempotent; the sole transforms are
    /// whitespace trimming and path normalization. Never lowercases.
    pub fn normalize(raw: &str) -> String {
        let raw = raw.trim();
        let (base, fragment) = match raw.split_once('#') {
            Some((base, frag)) => (base, Some(frag)),
            None => (raw, None),
        };
        let base = base.replace('\\', "/");
        let normalized = match base.split_once('/') {
            Some((project, rest)) => {
                let rest = normalize_path_str(rest);
                if rest.is_empty() {
                    project.to_string()
                } else {
                    format!("{project}/{rest}")
                }
            }
            None => base,
        };
        match fragment {
            Some(frag) => format!("{normalized}#{frag}"),
            None => normalized,
        }
    }

    /// Validate a raw address string without keeping the parse.
    pub fn validate(raw: &str) -> Result<(), AddressError> {
        Self::parse(raw).map(|_| ())
    }

    pub fn project(&self) -> Option<&str> {
        match self {
            RdfAddress::Path { project, .. } | RdfAddress::Symbol { project, .. } => Some(project),
            _ => None,
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            RdfAddress::Path { file_path, .. } | RdfAddress::Symbol { file_path, .. } => {
                Some(file_path)
            }
            _ => None,
        }
    }

    pub fn node_type(&self) -> Option<&NodeType> {
        match self {
            RdfAddress::Symbol { node_type, .. } | RdfAddress::LibrarySymbol { node_type, .. } => {
                Some(node_type)
            }
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            RdfAddress::Symbol { symbol, .. } | RdfAddress::LibrarySymbol { symbol, .. } => {
                Some(symbol)
            }
            _ => None,
        }
    }

    pub fn is_library(&self) -> bool {
        matches!(
            self,
            RdfAddress::Library { .. } | RdfAddress::LibrarySymbol { .. }
        )
    }

    /// Sort key: project-qualified addresses before libraries, then
    /// lexicographic over `(project, file_path, node_type, symbol)`.
    fn sort_key(&self) -> (u8, &str, &str, &str, &str) {
        match self {
            RdfAddress::Path { project, file_path } => (0, project, file_path, "", ""),
            RdfAddress::Symbol {
                project,
                file_path,
                node_type,
                symbol,
            } => (0, project, file_path, node_type.as_str(), symbol),
            RdfAddress::Library { name } => (1, name, "", "", ""),
            RdfAddress::LibrarySymbol {
                name,
                node_type,
                symbol,
            } => (1, name, "", node_type.as_str(), symbol),
        }
    }
}

impl fmt::Display for RdfAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfAddress::Path { project, file_path } => write!(f, "{project}/{file_path}"),
            RdfAddress::Symbol {
                project,
                file_path,
                node_type,
                symbol,
            } => write!(f, "{project}/{file_path}#{node_type}:{symbol}"),
            RdfAddress::Library { name } => f.write_str(name),
            RdfAddress::LibrarySymbol {
                name,
                node_type,
                symbol,
            } => write!(f, "{name}#{node_type}:{symbol}"),
        }
    }
}

impl FromStr for RdfAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<RdfAddress> for String {
    fn from(addr: RdfAddress) -> Self {
        addr.to_string()
    }
}

impl TryFrom<String> for RdfAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl PartialOrd for RdfAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RdfAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_address() {
        let addr = RdfAddress::parse("proj/src/a.ts").unwrap();
        assert_eq!(addr.project(), Some("proj"));
        assert_eq!(addr.file_path(), Some("src/a.ts"));
        assert_eq!(addr.to_string(), "proj/src/a.ts");
    }

    #[test]
    fn parse_symbol_address() {
        let addr = RdfAddress::parse("proj/src/a.ts#Method:User.login").unwrap();
        assert_eq!(addr.node_type(), Some(&NodeType::Method));
        assert_eq!(addr.symbol_name(), Some("User.login"));
        assert_eq!(addr.to_string(), "proj/src/a.ts#Method:User.login");
    }

    #[test]
    fn parse_library_addresses() {
        let lib = RdfAddress::parse("react").unwrap();
        assert!(lib.is_library());
        let sym = RdfAddress::parse("react#Unknown:React").unwrap();
        assert_eq!(sym.node_type(), Some(&NodeType::Unknown));
        let scoped = RdfAddress::parse("@types/node").unwrap();
        // Scoped package names contain `/` and therefore parse as paths.
        assert_eq!(scoped.project(), Some("@types"));
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "  proj/./src//a.ts ",
            "proj/src/util/../a.ts",
            "react",
            "proj/src/a.ts#Class:Foo",
        ] {
            let once = RdfAddress::normalize(raw);
            assert_eq!(once, RdfAddress::normalize(&once));
        }
    }

    #[test]
    fn normalize_then_parse_matches_parse() {
        let raw = " proj/./src/a.ts#Function:main ";
        assert_eq!(
            RdfAddress::parse(&RdfAddress::normalize(raw)).unwrap(),
            RdfAddress::parse(raw).unwrap()
        );
    }

    #[test]
    fn build_parse_roundtrip() {
        let built = RdfAddress::symbol("proj", "src/./b.ts", NodeType::Class, "Foo").unwrap();
        let reparsed = RdfAddress::parse(&built.to_string()).unwrap();
        assert_eq!(built, reparsed);
        assert_eq!(built.file_path(), Some("src/b.ts"));
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(matches!(
            RdfAddress::file("proj", "../outside.ts"),
            Err(AddressError::PathEscapesRoot(_))
        ));
        assert!(matches!(
            RdfAddress::parse("proj/src/../../etc/passwd"),
            Err(AddressError::PathEscapesRoot(_))
        ));
        // Inner `..` that stays under the root is resolved, not rejected.
        let addr = RdfAddress::parse("proj/src/util/../a.ts").unwrap();
        assert_eq!(addr.file_path(), Some("src/a.ts"));
    }

    #[test]
    fn rejects_illegal_characters() {
        assert!(matches!(
            RdfAddress::parse("proj/src/a b.ts"),
            Err(AddressError::IllegalChar { ch: ' ', .. })
        ));
    }

    #[test]
    fn rejects_bad_node_types() {
        assert!(matches!(
            RdfAddress::parse("proj/a.ts#method:foo"),
            Err(AddressError::UnknownNodeType(_))
        ));
        // Capitalized unknown types are scenario extensions.
        let addr = RdfAddress::parse("proj/a.ts#Widget:foo").unwrap();
        assert_eq!(
            addr.node_type(),
            Some(&NodeType::Extension("Widget".into()))
        );
    }

    #[test]
    fn rejects_fragment_without_colon() {
        assert!(matches!(
            RdfAddress::parse("proj/a.ts#Class"),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn ordering_puts_libraries_last() {
        let mut addrs = vec![
            RdfAddress::parse("react").unwrap(),
            RdfAddress::parse("proj/src/b.ts").unwrap(),
            RdfAddress::parse("proj/src/a.ts#Class:Foo").unwrap(),
            RdfAddress::parse("proj/src/a.ts").unwrap(),
        ];
        addrs.sort();
        let rendered: Vec<String> = addrs.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "proj/src/a.ts",
                "proj/src/a.ts#Class:Foo",
                "proj/src/b.ts",
                "react"
            ]
        );
    }

    #[test]
    fn serde_uses_canonical_string() {
        let addr = RdfAddress::parse("proj/src/a.ts#Class:Foo").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"proj/src/a.ts#Class:Foo\"");
        let back: RdfAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
