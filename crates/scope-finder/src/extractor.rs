use crate::header::HeaderLocator;
use crate::lexer::LineLexer;
use crate::patterns::PatternCatalog;
use crate::types::{EntityKind, EntityMeta, LineSpan, ScopeBoundary, SourceLines};
use once_cell::sync::Lazy;
use regex::Regex;

static DOCSTRING_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:[rRuUbBfF]{1,2})?("""|'''|"|')"#).expect("Invalid docstring regex pattern")
});

/// Pulls content and structural metadata out of a settled boundary
pub struct ScopeExtractor<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> ScopeExtractor<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Lines `start_line..=end_line` joined with `\n`
    pub fn content(&self, lines: &SourceLines, boundary: &ScopeBoundary) -> String {
        lines.span(boundary.span()).join("\n")
    }

    pub fn meta(&self, lines: &SourceLines, boundary: &ScopeBoundary) -> EntityMeta {
        let span = boundary.span();
        let end = span.end.min(lines.len());
        let mut meta = EntityMeta::default();

        let locator = HeaderLocator::new(self.catalog);
        let mut line = span.start;
        while line <= end && lines.get(line).is_some_and(|l| self.catalog.is_decorator(l)) {
            line = locator.decorator_end(lines, line) + 1;
        }
        if line > span.start {
            meta.decorators_span = Some(LineSpan::new(span.start, (line - 1).min(end)));
        }

        while line <= end && lines.get(line).is_some_and(|l| l.trim().is_empty()) {
            line += 1;
        }

        let entity = lines.get(line).and_then(|l| self.catalog.match_entity(l));
        let is_header = entity.is_some() || boundary.header_line == Some(line);
        if line > end || !is_header {
            meta.body_span = Some(span);
            meta.body_code_span = first_non_blank(lines, span.start, end).map(|l| LineSpan::new(l, end));
            return meta;
        }

        if let Some(found) = entity {
            meta.kind = found.kind;
            meta.name = found.name;
        }
        meta.header_line = Some(line);

        let signature_end = self.signature_end(lines, line, end);
        meta.header_signature_span = Some(LineSpan::new(line, signature_end));

        if signature_end >= end {
            return meta;
        }
        let body = LineSpan::new(signature_end + 1, end);
        meta.body_span = Some(body);

        let mut code_from = body.start;
        if self.catalog.language().has_docstrings() {
            if let Some(doc) = docstring(lines, body) {
                meta.body_docstring_span = Some(doc);
                code_from = doc.end + 1;
            }
        }
        meta.body_code_span = first_non_blank(lines, code_from, end).map(|l| LineSpan::new(l, end));

        if meta.kind == EntityKind::Unknown {
            log::trace!("scope at line {line} has a non-entity header");
        }
        meta
    }

    /// Last line of a header whose parameters may wrap over several lines
    fn signature_end(&self, lines: &SourceLines, header: usize, end: usize) -> usize {
        let language = self.catalog.language();
        let by_parens =
            language.is_indentation_significant() || language.closes_with_end_keyword();
        let mut lexer = LineLexer::new(language);
        let (mut parens, mut brackets) = (0, 0);

        for line in header..=end {
            let facts = lexer.feed(lines.get(line).unwrap_or_default());
            parens += facts.delta.paren_count;
            brackets += facts.delta.bracket_count;

            let closed = if by_parens {
                parens == 0 && brackets == 0
            } else {
                parens == 0 && (facts.opened_brace || facts.last_code == Some(';'))
            };
            if closed {
                return line;
            }
        }
        header
    }
}

fn first_non_blank(lines: &SourceLines, from: usize, end: usize) -> Option<usize> {
    (from..=end).find(|&l| lines.get(l).is_some_and(|text| !text.trim().is_empty()))
}

/// Leading string literal of a body, possibly triple-quoted over several
/// lines. The literal must be the whole statement: `"sep".join(parts)` is code.
fn docstring(lines: &SourceLines, body: LineSpan) -> Option<LineSpan> {
    let start = first_non_blank(lines, body.start, body.end)?;
    let text = lines.get(start)?;
    let caps = DOCSTRING_OPEN.captures(text)?;
    let quote = caps.get(1)?.as_str();
    let rest = &text[caps.get(1)?.end()..];

    if let Some(at) = closing_quote(rest, quote) {
        return ends_statement(&rest[at..]).then(|| LineSpan::single(start));
    }
    if quote.len() == 1 {
        return None;
    }

    let close = (start + 1..=body.end).find_map(|l| {
        let text = lines.get(l)?;
        closing_quote(text, quote).map(|at| (l, &text[at..]))
    });
    match close {
        Some((line, after)) => ends_statement(after).then(|| LineSpan::new(start, line)),
        None => Some(LineSpan::new(start, body.end)),
    }
}

/// Byte offset just past the first unescaped `quote` in `text`
fn closing_quote(text: &str, quote: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if text[i..].starts_with(quote) {
            return Some(i + quote.len());
        }
    }
    None
}

fn ends_statement(rest: &str) -> bool {
    let rest = rest.trim();
    rest.is_empty() || rest.starts_with('#')
}
