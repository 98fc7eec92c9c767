use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    #[default]
    Unknown,
}

/// Comment and string syntax the line lexer needs to skip over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalRules {
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    /// `'''` / `"""` strings spanning lines
    pub triple_quotes: bool,
    /// Backtick template strings spanning lines
    pub backtick_strings: bool,
    /// `"` strings may continue past the end of a line
    pub multiline_double_quotes: bool,
    /// `'` is a char literal only in the `'x'` / `'\n'` shape, otherwise a lifetime
    pub char_literals_only: bool,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }

    /// Nesting is expressed by leading whitespace rather than delimiters
    pub fn is_indentation_significant(self) -> bool {
        matches!(self, Language::Python)
    }

    /// A leading string literal in a body is documentation
    pub fn has_docstrings(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Blocks are closed by an `end` keyword rather than a brace
    pub fn closes_with_end_keyword(self) -> bool {
        matches!(self, Language::Ruby)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => None,
        }
    }

    /// Get comment and string syntax for the line lexer
    pub fn lexical_rules(self) -> LexicalRules {
        match self {
            Language::Python => LexicalRules {
                line_comment: Some("#"),
                block_comment: None,
                triple_quotes: true,
                backtick_strings: false,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
            Language::Ruby => LexicalRules {
                line_comment: Some("#"),
                block_comment: None,
                triple_quotes: false,
                backtick_strings: false,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
            Language::Rust => LexicalRules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                triple_quotes: false,
                backtick_strings: false,
                multiline_double_quotes: true,
                char_literals_only: true,
            },
            Language::JavaScript | Language::TypeScript => LexicalRules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                triple_quotes: false,
                backtick_strings: true,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
            Language::Go => LexicalRules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                triple_quotes: false,
                backtick_strings: true,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
            Language::Swift | Language::Kotlin => LexicalRules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                triple_quotes: true,
                backtick_strings: false,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
            Language::Java
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Unknown => LexicalRules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                triple_quotes: false,
                backtick_strings: false,
                multiline_double_quotes: false,
                char_literals_only: false,
            },
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
