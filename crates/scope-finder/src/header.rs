use crate::config::ScopeType;
use crate::lexer::{indent_width, LineLexer};
use crate::patterns::{HeaderMatch, PatternCatalog};
use crate::types::{DelimiterCounts, EntityKind, SourceLines};

/// Longest decorator, in lines, that is followed across wrapped arguments
const MAX_DECORATOR_LINES: usize = 64;

/// Where a boundary scan starts after recentring on a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAnchor {
    /// First decorator line, the header itself, or the clamped start line
    pub start_line: usize,
    pub header_line: Option<usize>,
    pub header: Option<HeaderMatch>,
    /// Indentation of the anchor line
    pub indent: usize,
    /// Requested scope type, narrowed from `Auto` when a header was found
    pub scope_type: ScopeType,
}

impl ScanAnchor {
    pub fn started_on_start_pattern(&self) -> bool {
        self.header_line.is_some()
    }

    /// Last line of the decorators + header prefix
    pub fn start_block_end(&self) -> usize {
        self.header_line.unwrap_or(self.start_line)
    }
}

/// Backward search for the nearest header above a line.
///
/// This does not check that the header found lexically encloses the start
/// line: a shallower sibling header between the real parent and the start
/// line wins. Callers treat the result as "nearest header above".
pub struct HeaderLocator<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Anchor for a scan starting at `start_line`; falls back to a mid-scope
    /// anchor on the clamped start line when no header is found
    pub fn anchor(&self, lines: &SourceLines, start_line: usize, scope_type: ScopeType) -> ScanAnchor {
        let start_line = lines.clamp(start_line);

        let Some((header_line, header)) = self.find_header(lines, start_line, scope_type) else {
            log::debug!("no {} header above line {start_line}", scope_type.as_str());
            return ScanAnchor {
                start_line,
                header_line: None,
                header: None,
                indent: lines.get(start_line).map_or(0, indent_width),
                scope_type,
            };
        };

        let mut first = header_line;
        while let Some(decorator) = self.decorator_above(lines, first) {
            first = decorator;
        }

        let resolved = match (scope_type, header.kind) {
            (ScopeType::Auto, EntityKind::Function) => ScopeType::Function,
            (ScopeType::Auto, EntityKind::Class) => ScopeType::Class,
            (requested, _) => requested,
        };

        ScanAnchor {
            start_line: first,
            header_line: Some(header_line),
            indent: lines.get(header_line).map_or(0, indent_width),
            header: Some(header),
            scope_type: resolved,
        }
    }

    /// Last line of the decorator starting at `line`: where its parens,
    /// brackets and braces balance again. A decorator that never balances
    /// is a single line.
    pub fn decorator_end(&self, lines: &SourceLines, line: usize) -> usize {
        let mut lexer = LineLexer::new(self.catalog.language());
        let mut counts = DelimiterCounts::default();
        let last = lines.len().min(line + MAX_DECORATOR_LINES - 1);

        for current in line..=last {
            counts.add(lexer.feed(lines.get(current).unwrap_or_default()).delta);
            if counts.is_balanced() {
                return current;
            }
        }
        line
    }

    /// Start of the decorator that ends right above `line`
    fn decorator_above(&self, lines: &SourceLines, line: usize) -> Option<usize> {
        let lowest = line.saturating_sub(MAX_DECORATOR_LINES).max(1);
        (lowest..line)
            .rev()
            .take_while(|&k| lines.get(k).is_some_and(|t| !t.trim().is_empty()))
            .find(|&k| lines.get(k).is_some_and(|t| self.catalog.is_decorator(t)))
            .filter(|&k| self.decorator_end(lines, k) + 1 == line)
    }

    /// Start of the decorator whose lines include `line`
    fn enclosing_decorator(&self, lines: &SourceLines, line: usize) -> Option<usize> {
        let lowest = (line + 1).saturating_sub(MAX_DECORATOR_LINES).max(1);
        (lowest..=line)
            .rev()
            .take_while(|&k| lines.get(k).is_some_and(|t| !t.trim().is_empty()))
            .find(|&k| lines.get(k).is_some_and(|t| self.catalog.is_decorator(t)))
            .filter(|&k| self.decorator_end(lines, k) >= line)
    }

    fn find_header(
        &self,
        lines: &SourceLines,
        start_line: usize,
        scope_type: ScopeType,
    ) -> Option<(usize, HeaderMatch)> {
        // A decorator belongs to the header below it, not to anything above.
        if let Some(decorator) = self.enclosing_decorator(lines, start_line) {
            let mut line = decorator;
            while lines.get(line).is_some_and(|l| self.catalog.is_decorator(l)) {
                line = self.decorator_end(lines, line) + 1;
            }
            if let Some(found) = lines
                .get(line)
                .and_then(|l| self.catalog.match_header(scope_type, l))
            {
                return Some((line, found));
            }
        }

        (1..=start_line).rev().find_map(|line| {
            lines
                .get(line)
                .and_then(|text| self.catalog.match_header(scope_type, text))
                .map(|found| (line, found))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn python_lines() -> SourceLines {
        SourceLines::from(
            &[
                "import os",
                "",
                "class Service:",
                "    \"\"\"Doc.\"\"\"",
                "",
                "    @staticmethod",
                "    @cache",
                "    def compute(x):",
                "        return x * 2",
            ][..],
        )
    }

    #[test]
    fn recenters_on_enclosing_header_with_decorators() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let anchor = locator.anchor(&python_lines(), 9, ScopeType::Auto);

        assert_eq!(anchor.header_line, Some(8));
        assert_eq!(anchor.start_line, 6);
        assert_eq!(anchor.indent, 4);
        assert_eq!(anchor.scope_type, ScopeType::Function);
        assert!(anchor.started_on_start_pattern());
    }

    #[test]
    fn decorator_start_looks_forward() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let anchor = locator.anchor(&python_lines(), 7, ScopeType::Auto);

        assert_eq!(anchor.header_line, Some(8));
        assert_eq!(anchor.start_line, 6);
    }

    #[test]
    fn wrapped_decorator_arguments_belong_to_the_decorator() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let lines = SourceLines::from(
            &[
                "@app.route(",
                "    \"/x\",",
                ")",
                "def handler():",
                "    return 1",
                "",
                "x = 2",
            ][..],
        );

        assert_eq!(locator.decorator_end(&lines, 1), 3);
        for start in [5, 1, 2, 3] {
            let anchor = locator.anchor(&lines, start, ScopeType::Auto);
            assert_eq!(anchor.header_line, Some(4), "start {start}");
            assert_eq!(anchor.start_line, 1, "start {start}");
            assert_eq!(anchor.scope_type, ScopeType::Function);
        }
    }

    #[test]
    fn wrapped_rust_attribute_is_climbed() {
        let catalog = PatternCatalog::new(Language::Rust).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let lines = SourceLines::from(
            &[
                "fn before() {}",
                "",
                "#[cfg_attr(",
                "    test,",
                "    derive(Debug)",
                ")]",
                "#[inline]",
                "fn after() {",
                "    1",
                "}",
            ][..],
        );

        let anchor = locator.anchor(&lines, 9, ScopeType::Auto);
        assert_eq!(anchor.header_line, Some(8));
        assert_eq!(anchor.start_line, 3);
    }

    #[test]
    fn class_scope_skips_function_headers() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let anchor = locator.anchor(&python_lines(), 9, ScopeType::Class);

        assert_eq!(anchor.header_line, Some(3));
        assert_eq!(anchor.scope_type, ScopeType::Class);
    }

    #[test]
    fn no_header_keeps_mid_scope_anchor() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let lines = SourceLines::from_text("x = 1\n    y = 2\n");
        let anchor = locator.anchor(&lines, 2, ScopeType::Auto);

        assert_eq!(anchor.header_line, None);
        assert_eq!(anchor.start_line, 2);
        assert_eq!(anchor.indent, 4);
        assert_eq!(anchor.scope_type, ScopeType::Auto);
        assert!(!anchor.started_on_start_pattern());
    }

    #[test]
    fn out_of_range_start_is_clamped() {
        let catalog = PatternCatalog::new(Language::Python).unwrap();
        let locator = HeaderLocator::new(&catalog);
        let anchor = locator.anchor(&python_lines(), 500, ScopeType::Auto);
        assert_eq!(anchor.header_line, Some(8));

        let anchor = locator.anchor(&python_lines(), 0, ScopeType::Auto);
        assert_eq!(anchor.start_line, 1);
    }
}
