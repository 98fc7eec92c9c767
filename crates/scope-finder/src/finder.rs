use crate::config::{ScanOptions, ScopeType};
use crate::error::{Result, ScopeError};
use crate::extractor::ScopeExtractor;
use crate::header::HeaderLocator;
use crate::patterns::PatternCatalog;
use crate::resolver::{AmbiguityResolver, Resolution};
use crate::scanner::BoundaryScanner;
use crate::types::{EntityKind, ScopeBoundary, ScopeResult, SourceLines};
use crate::validator::SyntaxValidator;
use std::time::Instant;

/// Main entry point: locate, scan, extract and validate one scope
pub struct ScopeFinder {
    options: ScanOptions,
    catalog: PatternCatalog,
}

impl ScopeFinder {
    /// Create a finder; fails on invalid options
    pub fn new(options: ScanOptions) -> Result<Self> {
        options.validate().map_err(ScopeError::invalid_options)?;
        let catalog = PatternCatalog::new(options.language)?;
        Ok(Self { options, catalog })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Scope around `start_line` (1-indexed, clamped into the file)
    pub fn find(&self, lines: &SourceLines, start_line: usize) -> Result<ScopeResult> {
        self.find_until(lines, start_line, None)
    }

    /// Like [`find`](Self::find), with a cooperative deadline on the line scan
    pub fn find_until(
        &self,
        lines: &SourceLines,
        start_line: usize,
        deadline: Option<Instant>,
    ) -> Result<ScopeResult> {
        lines.ensure_non_empty()?;
        let boundary = BoundaryScanner::new(&self.catalog, &self.options)
            .scan_until(lines, start_line, deadline);
        Ok(self.assemble(lines, boundary, None))
    }

    /// Like [`find`](Self::find), asking `resolver` for a later end when the
    /// scanned boundary is not valid
    pub async fn find_with_resolver(
        &self,
        lines: &SourceLines,
        start_line: usize,
        resolver: &AmbiguityResolver,
    ) -> Result<ScopeResult> {
        let result = self.find(lines, start_line)?;
        if result.boundary.valid {
            return Ok(result);
        }

        match resolver
            .resolve(lines, &result.boundary, self.options.language)
            .await
        {
            Some(Resolution {
                boundary,
                fallback_used,
            }) => Ok(self.assemble(lines, boundary, Some(fallback_used))),
            None => Ok(result),
        }
    }

    /// One lookup per start line, in input order
    pub fn find_all(&self, lines: &SourceLines, start_lines: &[usize]) -> Result<Vec<ScopeResult>> {
        start_lines
            .iter()
            .map(|&start_line| self.find(lines, start_line))
            .collect()
    }

    /// Split a file into its top-level functions and classes, at most
    /// `max_chunks` of them
    pub fn chunk_lines(&self, lines: &SourceLines) -> Result<Vec<ScopeResult>> {
        lines.ensure_non_empty()?;

        let locator = HeaderLocator::new(&self.catalog);
        let scanner = BoundaryScanner::new(&self.catalog, &self.options);
        let mut chunks: Vec<ScopeResult> = Vec::new();
        let mut covered = 0;

        for (line_no, text) in lines.iter() {
            if chunks.len() >= self.options.max_chunks {
                log::debug!("chunk limit {} reached at line {line_no}", self.options.max_chunks);
                break;
            }
            if line_no <= covered {
                continue;
            }
            let Some(header) = self.catalog.match_entity(text) else {
                continue;
            };

            let scope_type = match header.kind {
                EntityKind::Class => ScopeType::Class,
                EntityKind::Function | EntityKind::Unknown => ScopeType::Function,
            };
            let anchor = locator.anchor(lines, line_no, scope_type);
            let boundary = scanner.scan_from(lines, &anchor, None);
            covered = boundary.end_line;
            chunks.push(self.assemble(lines, boundary, None));
        }

        log::debug!("chunked {} lines into {} scopes", lines.len(), chunks.len());
        Ok(chunks)
    }

    fn assemble(
        &self,
        lines: &SourceLines,
        boundary: ScopeBoundary,
        fallback_used: Option<String>,
    ) -> ScopeResult {
        let extractor = ScopeExtractor::new(&self.catalog);
        let content = extractor.content(lines, &boundary);
        let meta = extractor.meta(lines, &boundary);

        let validation = SyntaxValidator::new(self.options.language).validate(
            lines.span(boundary.span()),
            boundary.start_line,
            self.options.check_file.then_some(lines),
        );

        if !boundary.valid {
            log::debug!(
                "scope {}-{} needs review: {:?}",
                boundary.start_line,
                boundary.end_line,
                boundary.issues
            );
        }

        ScopeResult {
            boundary,
            content,
            meta,
            validation,
            fallback_used,
        }
    }
}
