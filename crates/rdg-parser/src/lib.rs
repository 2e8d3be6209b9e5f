//! Language detection and tree-sitter AST acquisition.
//!
//! Analyzers consume a [`SourceUnit`]: the raw source text, the language
//! tag, and (for tree-sitter backed languages) the parsed syntax tree.
//! Markdown has no grammar here; its analyzer works on the text directly.

use anyhow::{Context, Result};
use std::path::Path;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Markdown,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "tsx" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" | "pyi" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "md" | "mdx" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect language from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse language from name string (as returned by `name()`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "typescript" => Some(Self::TypeScript),
            "javascript" => Some(Self::JavaScript),
            "python" => Some(Self::Python),
            "rust" => Some(Self::Rust),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Markdown => "markdown",
        }
    }

    /// The tree-sitter grammar for this language, if one is wired in.
    pub fn ts_language(&self) -> Option<tree_sitter::Language> {
        match self {
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Self::Markdown => None,
        }
    }
}

/// One parsed source file, ready for analysis.
pub struct SourceUnit {
    pub language: Language,
    pub source: String,
    /// Absent for languages without a wired grammar (markdown).
    pub tree: Option<tree_sitter::Tree>,
}

/// Parse source text into a [`SourceUnit`] for the given language.
pub fn parse_source(path: &Path, source: String, language: Language) -> Result<SourceUnit> {
    let tree = match language.ts_language() {
        Some(grammar) => {
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&grammar)
                .context("failed to set tree-sitter language")?;
            let tree = parser
                .parse(source.as_bytes(), None)
                .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))?;
            Some(tree)
        }
        None => None,
    };
    Ok(SourceUnit {
        language,
        source,
        tree,
    })
}

/// Read a file from disk, detect its language, and parse it.
/// Fails for files with no recognized language.
pub fn load_file(path: &Path) -> Result<SourceUnit> {
    let language = Language::from_path(path)
        .ok_or_else(|| anyhow::anyhow!("no recognized language for {}", path.display()))?;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_source(path, source, language)
}
