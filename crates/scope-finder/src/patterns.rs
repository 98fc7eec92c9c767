use crate::config::ScopeType;
use crate::error::Result;
use crate::language::Language;
use crate::types::EntityKind;
use regex::Regex;
use std::collections::HashMap;

/// A header (start) pattern; `name` captures the entity name when present
#[derive(Debug, Clone)]
pub struct StartPattern {
    pub name: &'static str,
    pub kind: EntityKind,
    pub regex: Regex,
}

/// How an end pattern closes a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPatternKind {
    /// Closing delimiter; only counts at or above the scope's base indentation
    Closer,
    /// `return` / `break` / `continue`; may fire mid-scope
    Exit,
}

#[derive(Debug, Clone)]
pub struct EndPattern {
    pub name: &'static str,
    pub kind: EndPatternKind,
    pub regex: Regex,
}

/// Start and end patterns for one scope type
#[derive(Debug, Clone, Default)]
pub struct ScopePatterns {
    pub start: Vec<StartPattern>,
    pub end: Vec<EndPattern>,
}

/// Header that matched a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub pattern: &'static str,
    pub kind: EntityKind,
    pub name: Option<String>,
}

/// Read-only pattern tables keyed by scope type, built once per language
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    language: Language,
    scopes: HashMap<ScopeType, ScopePatterns>,
    decorators: Vec<Regex>,
}

const PYTHON_FUNCTIONS: &[(&str, &str)] =
    &[("def", r"^\s*(?:async\s+)?def\s+(?P<name>\w+)")];

const PYTHON_CLASSES: &[(&str, &str)] = &[("class", r"^\s*class\s+(?P<name>\w+)")];

const PYTHON_BLOCKS: &[(&str, &str)] = &[(
    "block",
    r"^\s*(?:if|elif|else|for|while|with|try|except|finally|match|case|async\s+for|async\s+with)\b.*:\s*(?:#.*)?$",
)];

const BRACE_FUNCTIONS: &[(&str, &str)] = &[
    (
        "rust_fn",
        r#"^\s*(?:pub(?:\([\w:\s]+\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(?P<name>\w+)"#,
    ),
    (
        "js_function",
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>\w+)?\s*[(<]",
    ),
    (
        "js_arrow",
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>\w+)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*(?::[^=]+)?=>",
    ),
    ("go_func", r"^\s*func\s+(?:\([^)]*\)\s*)?(?P<name>\w+)\s*[(\[]"),
    (
        "c_like_method",
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|override|virtual|async|synchronized|inline|extern|const)\s+)*[\w<>\[\],.?*&:]+\s+\*?&?(?P<name>\w+)\s*\([^;]*$",
    ),
    (
        "js_method",
        r"^\s*(?:static\s+)?(?:async\s+)?(?:get\s+|set\s+)?\*?(?P<name>\w+)\s*\([^)]*\)\s*(?::[^{]+)?\{\s*$",
    ),
    (
        "kotlin_swift_fun",
        r"^\s*(?:(?:public|private|internal|open|override|static|suspend|inline)\s+)*(?:fun|func)\s+(?:<[^>]*>\s*)?(?P<name>\w+)",
    ),
];

const BRACE_CLASSES: &[(&str, &str)] = &[
    (
        "rust_type",
        r"^\s*(?:pub(?:\([\w:\s]+\))?\s+)?(?:unsafe\s+)?(?:struct|enum|trait|union)\s+(?P<name>\w+)",
    ),
    (
        "rust_impl",
        r"^\s*(?:unsafe\s+)?impl\b(?:\s*<[^>]*>)?\s+(?:[\w:<>,\s]+\s+for\s+)?(?P<name>\w+)",
    ),
    (
        "class",
        r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|protected|internal|static|final|abstract|sealed|open|data|partial)\s+)*(?:class|interface|struct|enum|record|object)\s+(?P<name>\w+)",
    ),
    ("go_type", r"^\s*type\s+(?P<name>\w+)\s+(?:struct|interface)\b"),
];

const BRACE_BLOCKS: &[(&str, &str)] = &[(
    "block",
    r"^\s*(?:\}\s*)?(?:if|else|for|while|do|loop|match|switch|try|catch|finally|unsafe)\b.*\{\s*$",
)];

const RUBY_FUNCTIONS: &[(&str, &str)] =
    &[("ruby_def", r"^\s*def\s+(?:self\.)?(?P<name>\w+[?!=]?)")];

const RUBY_CLASSES: &[(&str, &str)] = &[(
    "ruby_class",
    r"^\s*(?:class|module)\s+(?P<name>[A-Z]\w*(?:::\w+)*)",
)];

const RUBY_BLOCKS: &[(&str, &str)] = &[
    (
        "block",
        r"^\s*(?:if|unless|while|until|for|case|begin)\b",
    ),
    ("do_block", r"\bdo\s*(?:\|[^|]*\|)?\s*(?:#.*)?$"),
];

const EXIT_PATTERN: &str = r"^\s*(?:return|break|continue)\b";
const RUBY_EXIT_PATTERN: &str = r"^\s*(?:return|break|next)\b";
const BRACE_CLOSER: (&str, &str) = ("closing_brace", r"^\s*\}\s*[;,)]*\s*(?://.*)?$");
const END_CLOSER: (&str, &str) = ("end_keyword", r"^\s*end\b");

/// Header patterns loose enough to also match calls and control flow
const LOOSE_PATTERNS: &[&str] = &["c_like_method", "js_method"];

/// Words that never name a function and never start a declaration
const KEYWORDS: &[&str] = &[
    "if", "else", "elif", "while", "for", "foreach", "switch", "match", "case", "catch", "try",
    "do", "loop", "when", "return", "throw", "new", "delete", "await", "yield", "let", "var",
    "typeof", "sizeof", "using", "lock", "goto", "in", "unsafe",
];

const AT_DECORATOR: &str = r"^\s*@[\w.]+";
const RUST_ATTRIBUTE: &str = r"^\s*#!?\[";

/// Pattern tables for one language family
struct Tables {
    functions: &'static [(&'static str, &'static str)],
    classes: &'static [(&'static str, &'static str)],
    blocks: &'static [(&'static str, &'static str)],
    /// `None` when scopes close on dedent
    closer: Option<(&'static str, &'static str)>,
    exit: &'static str,
    decorators: &'static [&'static str],
}

impl Tables {
    fn for_language(language: Language) -> Self {
        if language.is_indentation_significant() {
            return Self {
                functions: PYTHON_FUNCTIONS,
                classes: PYTHON_CLASSES,
                blocks: PYTHON_BLOCKS,
                closer: None,
                exit: EXIT_PATTERN,
                decorators: &[AT_DECORATOR],
            };
        }
        if language.closes_with_end_keyword() {
            return Self {
                functions: RUBY_FUNCTIONS,
                classes: RUBY_CLASSES,
                blocks: RUBY_BLOCKS,
                closer: Some(END_CLOSER),
                exit: RUBY_EXIT_PATTERN,
                decorators: &[],
            };
        }

        let decorators: &'static [&'static str] = match language {
            Language::Rust => &[RUST_ATTRIBUTE],
            Language::JavaScript
            | Language::TypeScript
            | Language::Java
            | Language::Kotlin
            | Language::Swift => &[AT_DECORATOR],
            _ => &[],
        };
        Self {
            functions: BRACE_FUNCTIONS,
            classes: BRACE_CLASSES,
            blocks: BRACE_BLOCKS,
            closer: Some(BRACE_CLOSER),
            exit: EXIT_PATTERN,
            decorators,
        }
    }
}

impl PatternCatalog {
    /// Build the catalog for one language
    pub fn new(language: Language) -> Result<Self> {
        let tables = Tables::for_language(language);

        let function_start = compile_start(tables.functions, EntityKind::Function)?;
        let class_start = compile_start(tables.classes, EntityKind::Class)?;
        let block_start = compile_start(tables.blocks, EntityKind::Unknown)?;

        let exit = EndPattern {
            name: "exit_statement",
            kind: EndPatternKind::Exit,
            regex: Regex::new(tables.exit)?,
        };

        // Without a closer, entities close on dedent only; an inner `return`
        // or `except` must never end them.
        let (entity_end, block_end) = match tables.closer {
            Some((name, pattern)) => {
                let closer = EndPattern {
                    name,
                    kind: EndPatternKind::Closer,
                    regex: Regex::new(pattern)?,
                };
                (vec![closer.clone()], vec![closer, exit])
            }
            None => (Vec::new(), vec![exit]),
        };

        let mut entity_start = function_start.clone();
        entity_start.extend(class_start.iter().cloned());

        let mut scopes = HashMap::new();
        scopes.insert(
            ScopeType::Function,
            ScopePatterns {
                start: function_start,
                end: entity_end.clone(),
            },
        );
        scopes.insert(
            ScopeType::Class,
            ScopePatterns {
                start: class_start,
                end: entity_end,
            },
        );
        scopes.insert(
            ScopeType::Block,
            ScopePatterns {
                start: block_start,
                end: block_end.clone(),
            },
        );
        scopes.insert(
            ScopeType::Auto,
            ScopePatterns {
                start: entity_start,
                end: block_end,
            },
        );

        let decorators = tables
            .decorators
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            language,
            scopes,
            decorators,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Patterns for a scope type
    pub fn patterns(&self, scope_type: ScopeType) -> &ScopePatterns {
        // Every ScopeType is inserted in `new`.
        &self.scopes[&scope_type]
    }

    /// First header pattern of `scope_type` matching `line`
    pub fn match_header(&self, scope_type: ScopeType, line: &str) -> Option<HeaderMatch> {
        self.patterns(scope_type).start.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(line)?;
            let name = caps.name("name").map(|m| m.as_str());
            if name.is_some_and(is_keyword) {
                return None;
            }
            if LOOSE_PATTERNS.contains(&pattern.name) && leading_word(line).is_some_and(is_keyword)
            {
                return None;
            }
            Some(HeaderMatch {
                pattern: pattern.name,
                kind: pattern.kind,
                name: name.map(str::to_string),
            })
        })
    }

    /// Function or class header, whatever the requested scope type
    pub fn match_entity(&self, line: &str) -> Option<HeaderMatch> {
        self.match_header(ScopeType::Auto, line)
    }

    /// First end pattern of `scope_type` matching `line`
    pub fn match_end(&self, scope_type: ScopeType, line: &str) -> Option<&EndPattern> {
        self.patterns(scope_type)
            .end
            .iter()
            .find(|pattern| pattern.regex.is_match(line))
    }

    pub fn is_decorator(&self, line: &str) -> bool {
        self.decorators.iter().any(|re| re.is_match(line))
    }
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn leading_word(line: &str) -> Option<&str> {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|word| !word.is_empty())
}

fn compile_start(table: &[(&'static str, &str)], kind: EntityKind) -> Result<Vec<StartPattern>> {
    table
        .iter()
        .map(|(name, pattern)| {
            Ok(StartPattern {
                name,
                kind,
                regex: Regex::new(pattern)?,
            })
        })
        .collect()
}
