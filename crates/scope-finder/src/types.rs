use crate::config::ScopeType;
use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Immutable, 1-indexed lines of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLines {
    lines: Arc<[String]>,
}

impl SourceLines {
    /// Wrap already loaded lines
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// Split text on line endings (`\n` or `\r\n`)
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_string).collect())
    }

    /// Load lines from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    /// Number of lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get a line by 1-indexed number
    #[must_use]
    pub fn get(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    /// Lines covered by a span, clipped to the file
    #[must_use]
    pub fn span(&self, span: LineSpan) -> &[String] {
        let start = span.start.max(1).min(self.len() + 1) - 1;
        let end = span.end.min(self.len()).max(start);
        &self.lines[start..end]
    }

    /// Clamp a line number into `1..=len`
    #[must_use]
    pub fn clamp(&self, line: usize) -> usize {
        line.clamp(1, self.len().max(1))
    }

    /// Iterate `(line_number, text)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.as_str()))
    }

    pub(crate) fn ensure_non_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ScopeError::EmptyInput);
        }
        Ok(())
    }
}

impl From<Vec<String>> for SourceLines {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl From<&[&str]> for SourceLines {
    fn from(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|line| (*line).to_string()).collect())
    }
}

/// Inclusive, 1-indexed line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    #[must_use]
    pub const fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

/// Net delimiter depth, counted outside strings and comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelimiterCounts {
    pub bracket_count: i32,
    pub brace_count: i32,
    pub paren_count: i32,
}

impl DelimiterCounts {
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.bracket_count == 0 && self.brace_count == 0 && self.paren_count == 0
    }

    pub fn add(&mut self, other: DelimiterCounts) {
        self.bracket_count += other.bracket_count;
        self.brace_count += other.brace_count;
        self.paren_count += other.paren_count;
    }
}

/// Non-fatal finding attached to a boundary or validation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnbalancedDelimiters,
    BelowMinScannedLines,
    UnterminatedScopeEof,
    EndedByPatternMidScope,
    ScanDeadlineExceeded,
    UnterminatedString,
    AstInvalidSnippet,
    FileAstInvalid,
}

impl IssueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnbalancedDelimiters => "unbalanced_delimiters",
            Self::BelowMinScannedLines => "below_min_scanned_lines",
            Self::UnterminatedScopeEof => "unterminated_scope_eof",
            Self::EndedByPatternMidScope => "ended_by_pattern_mid_scope",
            Self::ScanDeadlineExceeded => "scan_deadline_exceeded",
            Self::UnterminatedString => "unterminated_string",
            Self::AstInvalidSnippet => "ast_invalid_snippet",
            Self::FileAstInvalid => "file_ast_invalid",
        }
    }

    /// Found by the line scan, as opposed to the syntax check
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Self::UnbalancedDelimiters
                | Self::BelowMinScannedLines
                | Self::UnterminatedScopeEof
                | Self::EndedByPatternMidScope
                | Self::ScanDeadlineExceeded
        )
    }
}

/// Why the scan stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Pattern,
    IndentOut,
    BalancedRootNonempty,
    None,
}

impl EndReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::IndentOut => "indent_out",
            Self::BalancedRootNonempty => "balanced_root_nonempty",
            Self::None => "none",
        }
    }
}

/// Per-line scan snapshot, recorded when `ScanOptions::debug` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub line: usize,
    pub indent: usize,
    #[serde(flatten)]
    pub counts: DelimiterCounts,
    /// Rule that fired (or was suppressed) on this line
    pub matched: Option<String>,
}

/// Where a scope starts and ends, and how much the scan trusts that answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBoundary {
    pub start_line: usize,
    /// Inclusive
    pub end_line: usize,
    /// Header the scan was anchored on, if any
    pub header_line: Option<usize>,
    pub indent_level: usize,
    #[serde(flatten)]
    pub counts: DelimiterCounts,
    pub scope_type: ScopeType,
    pub end_reason: EndReason,
    pub end_pattern: Option<String>,
    pub started_on_start_pattern: bool,
    pub valid: bool,
    pub issues: BTreeSet<IssueKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_trace: Option<Vec<TraceEntry>>,
}

impl ScopeBoundary {
    #[must_use]
    pub const fn span(&self) -> LineSpan {
        LineSpan::new(self.start_line, self.end_line)
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.span().line_count()
    }

    #[must_use]
    pub fn has_issue(&self, issue: IssueKind) -> bool {
        self.issues.contains(&issue)
    }
}

/// Kind of named construct anchoring a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Class,
    #[default]
    Unknown,
}

/// Structural layout of an extracted scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub kind: EntityKind,
    pub name: Option<String>,
    pub decorators_span: Option<LineSpan>,
    pub header_line: Option<usize>,
    pub header_signature_span: Option<LineSpan>,
    pub body_span: Option<LineSpan>,
    pub body_docstring_span: Option<LineSpan>,
    pub body_code_span: Option<LineSpan>,
}

/// Result of the syntax check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub ast_valid: bool,
    pub issues: BTreeSet<IssueKind>,
    pub notes: Vec<String>,
}

impl Default for ValidationOutcome {
    fn default() -> Self {
        Self {
            ast_valid: true,
            issues: BTreeSet::new(),
            notes: Vec::new(),
        }
    }
}

/// Final output of a scope lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeResult {
    pub boundary: ScopeBoundary,
    pub content: String,
    pub meta: EntityMeta,
    pub validation: ValidationOutcome,
    pub fallback_used: Option<String>,
}

impl ScopeResult {
    /// Flat form handed to indexers and presentation layers
    #[must_use]
    pub fn report(&self) -> ScopeReport {
        let issues: BTreeSet<IssueKind> = self
            .boundary
            .issues
            .iter()
            .chain(self.validation.issues.iter())
            .copied()
            .collect();

        ScopeReport {
            start_line: self.boundary.start_line,
            end_line: self.boundary.end_line,
            valid: self.boundary.valid,
            issues: issues.into_iter().map(|i| i.as_str().to_string()).collect(),
            end_reason: self.boundary.end_reason,
            scope_type: self.boundary.scope_type,
            meta: self.meta.clone(),
            ast_valid: self.validation.ast_valid,
            ast_notes: self.validation.notes.clone(),
            fallback_used: self.fallback_used.clone(),
        }
    }
}

/// Serializable summary of a [`ScopeResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    pub start_line: usize,
    pub end_line: usize,
    pub valid: bool,
    pub issues: Vec<String>,
    pub end_reason: EndReason,
    pub scope_type: ScopeType,
    pub meta: EntityMeta,
    pub ast_valid: bool,
    pub ast_notes: Vec<String>,
    pub fallback_used: Option<String>,
}
