use crate::config::ScanOptions;
use crate::header::{HeaderLocator, ScanAnchor};
use crate::lexer::{LineFacts, LineLexer};
use crate::patterns::{EndPatternKind, PatternCatalog};
use crate::types::{
    DelimiterCounts, EndReason, IssueKind, ScopeBoundary, SourceLines, TraceEntry,
};
use std::collections::BTreeSet;
use std::time::Instant;

/// Scanner state; every state but `Scanning` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    ClosedByIndent,
    ClosedByPattern,
    ClosedByBalance,
    EofUnclosed,
}

impl ScanState {
    const fn end_reason(self) -> EndReason {
        match self {
            Self::ClosedByIndent => EndReason::IndentOut,
            Self::ClosedByPattern => EndReason::Pattern,
            Self::ClosedByBalance => EndReason::BalancedRootNonempty,
            Self::Scanning | Self::EofUnclosed => EndReason::None,
        }
    }
}

/// Running per-scan state, local to one `scan_from` call
struct ScanAccumulator {
    counts: DelimiterCounts,
    last_non_blank: usize,
    last_scanned: usize,
    seen_body: bool,
    opened_brace: bool,
    trace: Option<Vec<TraceEntry>>,
}

impl ScanAccumulator {
    fn new(start_line: usize, debug: bool) -> Self {
        Self {
            counts: DelimiterCounts::default(),
            last_non_blank: start_line,
            last_scanned: start_line,
            seen_body: false,
            opened_brace: false,
            trace: debug.then(Vec::new),
        }
    }

    fn record(&mut self, line: usize, facts: &LineFacts, matched: Option<String>) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                line,
                indent: facts.indent,
                counts: self.counts,
                matched,
            });
        }
    }
}

/// Forward scan that decides where a scope closes.
///
/// The scanner holds only shared, read-only configuration; all per-scan state
/// lives in a [`ScanAccumulator`], so one scanner can serve concurrent scans.
pub struct BoundaryScanner<'a> {
    catalog: &'a PatternCatalog,
    options: &'a ScanOptions,
}

impl<'a> BoundaryScanner<'a> {
    pub fn new(catalog: &'a PatternCatalog, options: &'a ScanOptions) -> Self {
        Self { catalog, options }
    }

    /// Recenter on the nearest header and scan to the end of its scope
    pub fn scan(&self, lines: &SourceLines, start_line: usize) -> ScopeBoundary {
        self.scan_until(lines, start_line, None)
    }

    /// Like [`scan`](Self::scan), giving up between lines once `deadline` passes
    pub fn scan_until(
        &self,
        lines: &SourceLines,
        start_line: usize,
        deadline: Option<Instant>,
    ) -> ScopeBoundary {
        let anchor =
            HeaderLocator::new(self.catalog).anchor(lines, start_line, self.options.scope_type);
        self.scan_from(lines, &anchor, deadline)
    }

    /// Scan from an already located anchor
    pub fn scan_from(
        &self,
        lines: &SourceLines,
        anchor: &ScanAnchor,
        deadline: Option<Instant>,
    ) -> ScopeBoundary {
        let language = self.catalog.language();
        let indented = language.is_indentation_significant();
        let prefer_balanced = self.options.effective_prefer_balanced_end();
        let min_lines = self.options.effective_min_scanned_lines();
        let started = anchor.started_on_start_pattern();
        let base = anchor.indent;
        let start = anchor.start_line;
        let block_end = anchor.start_block_end();
        let patterns_for = anchor.scope_type;

        let last_line = lines
            .len()
            .min(start + self.options.scan_window().saturating_sub(1))
            .max(block_end.min(lines.len()));

        let mut acc = ScanAccumulator::new(start, self.options.debug);
        let mut lexer = LineLexer::new(language);
        let mut state = ScanState::Scanning;
        let mut end_line = start;
        let mut end_pattern = None;
        let mut final_counts = None;
        let mut issues = BTreeSet::new();

        for line_no in start..=last_line {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                issues.insert(IssueKind::ScanDeadlineExceeded);
                break;
            }

            let text = lines.get(line_no).unwrap_or_default();
            let facts = lexer.feed(text);
            let before = acc.counts;
            acc.counts.add(facts.delta);
            acc.last_scanned = line_no;
            acc.opened_brace |= facts.opened_brace;

            let in_start_block = line_no <= block_end;
            let in_body = !facts.blank && (facts.indent > base || facts.continuation);
            if !facts.blank && (in_start_block || in_body) {
                acc.last_non_blank = line_no;
            }
            if in_body && !in_start_block {
                acc.seen_body = true;
            }

            let suppress = !started && line_no - start + 1 < min_lines;

            // a. dedent back to the header's level
            if indented
                && !in_start_block
                && acc.seen_body
                && facts.is_code()
                && facts.indent <= base
                && before.is_balanced()
            {
                state = ScanState::ClosedByIndent;
                end_line = acc.last_non_blank;
                final_counts = Some(before);
                acc.record(line_no, &facts, Some("indent_out".to_string()));
                break;
            }

            let mut matched = None;

            // b. configured end pattern
            if !in_start_block && !facts.blank && !facts.continuation {
                if let Some(pattern) = self.catalog.match_end(patterns_for, text) {
                    let applies = match pattern.kind {
                        EndPatternKind::Closer => {
                            facts.indent <= base && (started || acc.counts.brace_count < 0)
                        }
                        EndPatternKind::Exit => started || !prefer_balanced,
                    };

                    if !applies {
                        matched = Some(format!("{} (ignored)", pattern.name));
                    } else if suppress {
                        matched = Some(format!("{} (suppressed)", pattern.name));
                    } else {
                        if pattern.kind == EndPatternKind::Exit
                            && prefer_balanced
                            && continues_deeper(lines, line_no, base, &lexer)
                        {
                            issues.insert(IssueKind::EndedByPatternMidScope);
                        }
                        state = ScanState::ClosedByPattern;
                        end_line = line_no;
                        end_pattern = Some(pattern.name.to_string());
                        acc.record(line_no, &facts, Some(pattern.name.to_string()));
                        break;
                    }
                }
            }

            // c. back at root depth after a non-empty scope
            if facts.is_code() && facts.indent <= base && acc.counts.is_balanced() {
                let eligible = if indented {
                    !in_start_block && !acc.seen_body && before.is_balanced()
                } else {
                    (acc.opened_brace || facts.last_code == Some(';'))
                        && (!in_start_block || line_no == block_end)
                };

                if eligible && suppress {
                    matched = Some("balanced_root (suppressed)".to_string());
                } else if eligible {
                    state = ScanState::ClosedByBalance;
                    end_line = if indented { acc.last_non_blank } else { line_no };
                    acc.record(line_no, &facts, Some("balanced_root".to_string()));
                    break;
                }
            }

            acc.record(line_no, &facts, matched);
        }

        if state == ScanState::Scanning {
            state = ScanState::EofUnclosed;
            if issues.contains(&IssueKind::ScanDeadlineExceeded) {
                end_line = acc.last_non_blank;
            } else if acc.seen_body {
                end_line = acc.last_scanned;
                issues.insert(IssueKind::UnterminatedScopeEof);
            } else {
                end_line = acc.last_non_blank;
            }
        }

        let counts = final_counts.unwrap_or(acc.counts);
        if !counts.is_balanced() {
            issues.insert(IssueKind::UnbalancedDelimiters);
        }

        let window = end_line.saturating_sub(start) + 1;
        if !started && prefer_balanced && window <= min_lines {
            issues.insert(IssueKind::BelowMinScannedLines);
        }

        let end_reason = state.end_reason();
        log::debug!(
            "{} scope {start}-{end_line} ended by {} ({} issues)",
            anchor.scope_type.as_str(),
            end_reason.as_str(),
            issues.len()
        );

        ScopeBoundary {
            start_line: start,
            end_line,
            header_line: anchor.header_line,
            indent_level: base,
            counts,
            scope_type: anchor.scope_type,
            end_reason,
            end_pattern,
            started_on_start_pattern: started,
            valid: issues.is_empty(),
            issues,
            debug_trace: acc.trace,
        }
    }
}

/// Next code line after `line` sits deeper than `base`
fn continues_deeper(lines: &SourceLines, line: usize, base: usize, lexer: &LineLexer) -> bool {
    let mut peek = lexer.clone();
    for next in line + 1..=lines.len() {
        let facts = peek.feed(lines.get(next).unwrap_or_default());
        if facts.is_code() {
            return facts.indent > base;
        }
    }
    false
}
