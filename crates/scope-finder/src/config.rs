use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Lines scanned per unit of `max_chunks`
pub const LINES_PER_CHUNK: usize = 50;

/// Upper bound on `max_chunks`
pub const MAX_CHUNKS_LIMIT: usize = 10_000;

/// Upper bound on `ResolverConfig::excerpt_lines`
pub const MAX_EXCERPT_LINES: usize = 10_000;

/// Kind of scope to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    /// Nearest function or class, whichever header is found first
    #[default]
    Auto,
    Function,
    Class,
    /// Generic control-flow block (`if`, `for`, `try`, ...)
    Block,
}

impl ScopeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Function => "function",
            Self::Class => "class",
            Self::Block => "block",
        }
    }
}

/// Configuration for one boundary scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Language of the scanned file
    #[serde(default)]
    pub language: Language,

    /// Scope kind to look for
    #[serde(default)]
    pub scope_type: ScopeType,

    /// Scan window in units of 50 lines
    pub max_chunks: usize,

    /// Ignore mid-scope `return`/`break`/`continue` closes when starting mid-body.
    /// Defaults from the language when unset.
    #[serde(default)]
    pub prefer_balanced_end: Option<bool>,

    /// Minimum window before a pattern or balance close is accepted mid-body.
    /// Defaults from the language when unset.
    #[serde(default)]
    pub min_scanned_lines: Option<usize>,

    /// Record a per-line trace on the boundary
    #[serde(default)]
    pub debug: bool,

    /// Also parse the whole file and note when it does not parse
    #[serde(default)]
    pub check_file: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            language: Language::Unknown,
            scope_type: ScopeType::Auto,
            max_chunks: 4,
            prefer_balanced_end: None,
            min_scanned_lines: None,
            debug: false,
            check_file: false,
        }
    }
}

impl ScanOptions {
    /// Create options for a language, other fields at their defaults
    pub fn for_language(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }

    /// Builder: set scope type
    #[must_use]
    pub const fn scope_type(mut self, scope_type: ScopeType) -> Self {
        self.scope_type = scope_type;
        self
    }

    /// Builder: set scan window
    #[must_use]
    pub const fn max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Builder: enable per-line trace
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builder: also parse the whole file during validation
    #[must_use]
    pub const fn check_file(mut self, check_file: bool) -> Self {
        self.check_file = check_file;
        self
    }

    pub fn effective_prefer_balanced_end(&self) -> bool {
        self.prefer_balanced_end
            .unwrap_or_else(|| self.language.is_indentation_significant())
    }

    pub fn effective_min_scanned_lines(&self) -> usize {
        self.min_scanned_lines.unwrap_or_else(|| {
            if self.language.is_indentation_significant() {
                3
            } else {
                0
            }
        })
    }

    /// Maximum number of lines a single scan may cover
    pub fn scan_window(&self) -> usize {
        self.max_chunks.saturating_mul(LINES_PER_CHUNK)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunks == 0 {
            return Err("max_chunks must be > 0".to_string());
        }

        if self.max_chunks > MAX_CHUNKS_LIMIT {
            return Err(format!(
                "max_chunks ({}) cannot exceed {MAX_CHUNKS_LIMIT}",
                self.max_chunks
            ));
        }

        let min_lines = self.effective_min_scanned_lines();
        if min_lines > self.scan_window() {
            return Err(format!(
                "min_scanned_lines ({min_lines}) cannot exceed the scan window ({})",
                self.scan_window()
            ));
        }

        Ok(())
    }
}

/// Configuration for the completion fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Hard bound on the completion request
    pub timeout_ms: u64,

    /// Lines sent to the completion backend, counted from the scope start
    pub excerpt_lines: usize,

    /// Token budget for the answer
    pub max_tokens: usize,

    /// Longer lines are cut in the excerpt
    pub max_line_graphemes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            excerpt_lines: 80,
            max_tokens: 16,
            max_line_graphemes: 240,
        }
    }
}

impl ResolverConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".to_string());
        }

        if self.excerpt_lines == 0 {
            return Err("excerpt_lines must be > 0".to_string());
        }

        if self.excerpt_lines > MAX_EXCERPT_LINES {
            return Err(format!("excerpt_lines cannot exceed {MAX_EXCERPT_LINES}"));
        }

        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ScanOptions::default().validate().is_ok());
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_language_defaults() {
        let python = ScanOptions::for_language(Language::Python);
        assert!(python.effective_prefer_balanced_end());
        assert_eq!(python.effective_min_scanned_lines(), 3);

        let rust = ScanOptions::for_language(Language::Rust);
        assert!(!rust.effective_prefer_balanced_end());
        assert_eq!(rust.effective_min_scanned_lines(), 0);

        let explicit = ScanOptions {
            prefer_balanced_end: Some(false),
            min_scanned_lines: Some(7),
            ..ScanOptions::for_language(Language::Python)
        };
        assert!(!explicit.effective_prefer_balanced_end());
        assert_eq!(explicit.effective_min_scanned_lines(), 7);
    }

    #[test]
    fn test_options_validation() {
        let mut options = ScanOptions::default();

        // Invalid: empty window
        options.max_chunks = 0;
        assert!(options.validate().is_err());

        // Invalid: window above the cap
        options.max_chunks = MAX_CHUNKS_LIMIT + 1;
        assert!(options.validate().is_err());

        // Invalid: minimum larger than the window
        options.max_chunks = 1;
        options.min_scanned_lines = Some(LINES_PER_CHUNK + 1);
        assert!(options.validate().is_err());

        // Valid configuration
        options.min_scanned_lines = Some(5);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_negative_max_chunks_rejected_on_deserialize() {
        let parsed: Result<ScanOptions, _> = serde_json::from_str(r#"{"max_chunks": -1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let parsed: ScanOptions =
            serde_json::from_str(r#"{"max_chunks": 2, "language": "python", "scope_type": "class"}"#)
                .unwrap();
        assert_eq!(parsed.language, Language::Python);
        assert_eq!(parsed.scope_type, ScopeType::Class);
        assert_eq!(parsed.prefer_balanced_end, None);
        assert!(!parsed.debug);
    }

    #[test]
    fn test_resolver_validation() {
        let config = ResolverConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ResolverConfig {
            excerpt_lines: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ResolverConfig {
            excerpt_lines: MAX_EXCERPT_LINES + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ResolverConfig {
            excerpt_lines: MAX_EXCERPT_LINES,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
