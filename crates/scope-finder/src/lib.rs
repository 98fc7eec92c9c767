//! # Context Scope Finder
//!
//! Finds where a syntactic scope (function, class or block) starts and ends,
//! given any line inside it, so that indexers can cut code at real boundaries.
//!
//! ## Philosophy
//!
//! The line scan is fast, deterministic and honest about doubt:
//! - Boundaries are settled by indentation, end patterns and delimiter balance
//! - Anything suspicious is reported as an issue, never as an error
//! - A tree-sitter parse confirms (or questions) the extracted snippet
//! - An optional completion backend may extend a boundary the scan flagged
//!
//! ## Architecture
//!
//! ```text
//! SourceLines + start_line
//!     │
//!     ├──> HeaderLocator (nearest header above, decorators included)
//!     │
//!     ├──> BoundaryScanner
//!     │    ├─> LineLexer (strings, comments, delimiter deltas)
//!     │    ├─> PatternCatalog end patterns
//!     │    └─> ScopeBoundary { start, end, issues, valid }
//!     │
//!     ├──> AmbiguityResolver (only when valid = false)
//!     │
//!     └──> ScopeExtractor + SyntaxValidator
//!          └─> ScopeResult / ScopeReport
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_scope_finder::{Language, ScanOptions, ScopeFinder, SourceLines};
//!
//! let finder = ScopeFinder::new(ScanOptions::for_language(Language::Python)).unwrap();
//! let lines = SourceLines::from_text("def hello(x):\n    y = x + 1\n    return y\n\nz = 2\n");
//!
//! let result = finder.find(&lines, 2).unwrap();
//! assert_eq!((result.boundary.start_line, result.boundary.end_line), (1, 3));
//! assert!(result.boundary.valid);
//! ```

mod config;
mod error;
mod extractor;
mod finder;
mod header;
mod language;
mod lexer;
mod patterns;
mod resolver;
mod scanner;
mod types;
mod validator;

pub use config::{
    ResolverConfig, ScanOptions, ScopeType, LINES_PER_CHUNK, MAX_CHUNKS_LIMIT, MAX_EXCERPT_LINES,
};
pub use error::{Result, ScopeError};
pub use extractor::ScopeExtractor;
pub use finder::ScopeFinder;
pub use header::{HeaderLocator, ScanAnchor};
pub use language::{Language, LexicalRules};
pub use lexer::{indent_width, LineFacts, LineLexer, TAB_WIDTH};
pub use patterns::{
    EndPattern, EndPatternKind, HeaderMatch, PatternCatalog, ScopePatterns, StartPattern,
};
pub use resolver::{AmbiguityResolver, CompletionBackend, Resolution};
pub use scanner::BoundaryScanner;
pub use types::{
    DelimiterCounts, EndReason, EntityKind, EntityMeta, IssueKind, LineSpan, ScopeBoundary,
    ScopeReport, ScopeResult, SourceLines, TraceEntry, ValidationOutcome,
};
pub use validator::SyntaxValidator;
