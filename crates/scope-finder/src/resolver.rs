//! Completion-backed fallback for boundaries the line scan could not settle.
//!
//! The resolver only ever extends a boundary. Any backend failure, timeout or
//! unusable answer leaves the scanner's result untouched.

use crate::config::ResolverConfig;
use crate::error::{self, ScopeError};
use crate::language::Language;
use crate::lexer::lex_lines;
use crate::types::{DelimiterCounts, EndReason, IssueKind, LineSpan, ScopeBoundary, SourceLines};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

static END_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"END_LINE:\s*(\d+)").expect("Invalid END_LINE regex pattern"));

/// Text completion service consulted for ambiguous scopes
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> anyhow::Result<String>;
}

/// Corrected boundary and the tag recorded in `fallback_used`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub boundary: ScopeBoundary,
    pub fallback_used: String,
}

#[derive(Error, Debug)]
enum ResolverError {
    #[error("completion timed out after {0} ms")]
    Timeout(u64),

    #[error("answer has no END_LINE marker")]
    MissingMarker,

    #[error("END_LINE {0} is not past the scanned end inside the excerpt")]
    OutOfExcerpt(usize),

    #[error("completion backend failed: {0}")]
    Backend(#[from] anyhow::Error),
}

pub struct AmbiguityResolver {
    backend: Arc<dyn CompletionBackend>,
    config: ResolverConfig,
}

impl AmbiguityResolver {
    /// Create a resolver; fails on invalid configuration
    pub fn new(backend: Arc<dyn CompletionBackend>, config: ResolverConfig) -> error::Result<Self> {
        config.validate().map_err(ScopeError::invalid_options)?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Ask the backend for a later end line; `None` keeps the scanned boundary
    pub async fn resolve(
        &self,
        lines: &SourceLines,
        boundary: &ScopeBoundary,
        language: Language,
    ) -> Option<Resolution> {
        match self.try_resolve(lines, boundary, language).await {
            Ok(resolution) => {
                log::debug!(
                    "completion extended scope {}-{} to line {}",
                    boundary.start_line,
                    boundary.end_line,
                    resolution.boundary.end_line
                );
                Some(resolution)
            }
            Err(e) => {
                log::debug!(
                    "keeping scanned scope {}-{}: {e}",
                    boundary.start_line,
                    boundary.end_line
                );
                None
            }
        }
    }

    async fn try_resolve(
        &self,
        lines: &SourceLines,
        boundary: &ScopeBoundary,
        language: Language,
    ) -> Result<Resolution, ResolverError> {
        let excerpt = self.excerpt(lines, boundary.start_line);
        let prompt = self.prompt(lines, boundary, language, excerpt);

        let request = self.backend.complete(&prompt, self.config.max_tokens);
        let answer = tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), request)
            .await
            .map_err(|_| ResolverError::Timeout(self.config.timeout_ms))??;

        let end_line = END_LINE_RE
            .captures(&answer)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .ok_or(ResolverError::MissingMarker)?;

        if end_line <= boundary.end_line || !excerpt.contains(end_line) {
            return Err(ResolverError::OutOfExcerpt(end_line));
        }

        Ok(Resolution {
            boundary: extend(lines, boundary, language, end_line),
            fallback_used: format!("completion:END_LINE={end_line}"),
        })
    }

    fn excerpt(&self, lines: &SourceLines, start_line: usize) -> LineSpan {
        let end = start_line
            .saturating_add(self.config.excerpt_lines.saturating_sub(1))
            .min(lines.len());
        LineSpan::new(start_line, end.max(start_line))
    }

    fn prompt(
        &self,
        lines: &SourceLines,
        boundary: &ScopeBoundary,
        language: Language,
        excerpt: LineSpan,
    ) -> String {
        let mut prompt = format!(
            "The {language} code below opens a {} scope at line {}. \
             A line scan stopped at line {} without a confident end.\n\
             Reply with the last line of that scope as `END_LINE: <n>`.\n\n",
            boundary.scope_type.as_str(),
            boundary.start_line,
            boundary.end_line,
        );

        for (offset, line) in lines.span(excerpt).iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{:>5} | {}",
                excerpt.start + offset,
                truncate_graphemes(line, self.config.max_line_graphemes)
            );
        }
        prompt
    }
}

/// Boundary covering `start_line..=end_line`, with counts and issues recomputed
fn extend(
    lines: &SourceLines,
    boundary: &ScopeBoundary,
    language: Language,
    end_line: usize,
) -> ScopeBoundary {
    let span = LineSpan::new(boundary.start_line, end_line);
    let (facts, _) = lex_lines(language, lines.span(span).iter().map(String::as_str));

    let mut counts = DelimiterCounts::default();
    for line in &facts {
        counts.add(line.delta);
    }

    let mut issues = BTreeSet::new();
    if !counts.is_balanced() {
        issues.insert(IssueKind::UnbalancedDelimiters);
    }

    ScopeBoundary {
        end_line,
        counts,
        end_reason: EndReason::None,
        end_pattern: None,
        valid: issues.is_empty(),
        issues,
        debug_trace: None,
        ..boundary.clone()
    }
}

fn truncate_graphemes(line: &str, max: usize) -> String {
    let mut graphemes = line.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
