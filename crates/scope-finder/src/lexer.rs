//! Line-at-a-time lexer that keeps string and comment state across lines.
//!
//! It is deliberately shallow: it only knows enough syntax to tell code apart
//! from strings and comments, so that delimiter counting and indentation
//! checks ignore what is quoted or commented out.

use crate::language::{Language, LexicalRules};
use crate::types::DelimiterCounts;

/// Columns a tab advances the indentation by
pub const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
    Backtick,
}

impl Quote {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Single => "'",
            Self::Double => "\"",
            Self::TripleSingle => "'''",
            Self::TripleDouble => "\"\"\"",
            Self::Backtick => "`",
        }
    }

    const fn spans_lines(self, rules: &LexicalRules) -> bool {
        match self {
            Self::TripleSingle | Self::TripleDouble | Self::Backtick => true,
            Self::Double => rules.multiline_double_quotes,
            Self::Single => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Carry {
    #[default]
    Code,
    BlockComment,
    String(Quote),
}

/// What the lexer learned about one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineFacts {
    pub indent: usize,
    pub blank: bool,
    /// Only comment text, no code or string content
    pub comment_only: bool,
    /// Began inside a multi-line string or block comment
    pub continuation: bool,
    pub delta: DelimiterCounts,
    /// At least one `{` opened on this line
    pub opened_brace: bool,
    /// Last code character outside strings and comments
    pub last_code: Option<char>,
    /// A single-line string was left open at end of line
    pub unterminated_string: bool,
}

impl LineFacts {
    /// Non-blank line carrying code that starts in code state
    pub fn is_code(&self) -> bool {
        !self.blank && !self.comment_only && !self.continuation
    }
}

/// Stateful lexer fed one line at a time
#[derive(Debug, Clone)]
pub struct LineLexer {
    rules: LexicalRules,
    carry: Carry,
}

impl LineLexer {
    pub fn new(language: Language) -> Self {
        Self {
            rules: language.lexical_rules(),
            carry: Carry::Code,
        }
    }

    /// Still inside a multi-line string
    pub fn inside_string(&self) -> bool {
        matches!(self.carry, Carry::String(_))
    }

    pub fn feed(&mut self, line: &str) -> LineFacts {
        let continuation = self.carry != Carry::Code;
        let blank = line.trim().is_empty();
        let chars: Vec<char> = line.chars().collect();

        let mut facts = LineFacts {
            indent: indent_width(line),
            blank,
            continuation,
            ..Default::default()
        };
        let mut saw_code = false;
        let mut i = 0;

        while i < chars.len() {
            match self.carry {
                Carry::BlockComment => {
                    let close = self.rules.block_comment.map(|(_, close)| close);
                    match close {
                        Some(close) if starts_with_at(&chars, i, close) => {
                            i += close.len();
                            self.carry = Carry::Code;
                        }
                        _ => i += 1,
                    }
                }
                Carry::String(quote) => {
                    saw_code = true;
                    if chars[i] == '\\' {
                        i += 2;
                    } else if starts_with_at(&chars, i, quote.delimiter()) {
                        i += quote.delimiter().len();
                        self.carry = Carry::Code;
                        facts.last_code = quote.delimiter().chars().last();
                    } else {
                        i += 1;
                    }
                }
                Carry::Code => {
                    let c = chars[i];
                    if c.is_whitespace() {
                        i += 1;
                        continue;
                    }
                    if let Some(prefix) = self.rules.line_comment {
                        if starts_with_at(&chars, i, prefix) {
                            break;
                        }
                    }
                    if let Some((open, _)) = self.rules.block_comment {
                        if starts_with_at(&chars, i, open) {
                            i += open.len();
                            self.carry = Carry::BlockComment;
                            continue;
                        }
                    }

                    saw_code = true;
                    if c == '\'' && self.rules.char_literals_only {
                        i += char_literal_len(&chars, i);
                        facts.last_code = Some('\'');
                        continue;
                    }
                    if let Some(quote) = self.opening_quote(&chars, i) {
                        i += quote.delimiter().len();
                        self.carry = Carry::String(quote);
                        continue;
                    }

                    match c {
                        '(' => facts.delta.paren_count += 1,
                        ')' => facts.delta.paren_count -= 1,
                        '[' => facts.delta.bracket_count += 1,
                        ']' => facts.delta.bracket_count -= 1,
                        '{' => {
                            facts.delta.brace_count += 1;
                            facts.opened_brace = true;
                        }
                        '}' => facts.delta.brace_count -= 1,
                        _ => {}
                    }
                    facts.last_code = Some(c);
                    i += 1;
                }
            }
        }

        if let Carry::String(quote) = self.carry {
            if !quote.spans_lines(&self.rules) && !line.trim_end().ends_with('\\') {
                facts.unterminated_string = true;
                self.carry = Carry::Code;
            }
        }

        facts.comment_only = !blank && !saw_code;
        facts
    }

    fn opening_quote(&self, chars: &[char], i: usize) -> Option<Quote> {
        if self.rules.triple_quotes {
            if starts_with_at(chars, i, "\"\"\"") {
                return Some(Quote::TripleDouble);
            }
            if starts_with_at(chars, i, "'''") {
                return Some(Quote::TripleSingle);
            }
        }
        match chars[i] {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            '`' if self.rules.backtick_strings => Some(Quote::Backtick),
            _ => None,
        }
    }
}

/// Leading whitespace width, tabs counted as [`TAB_WIDTH`]
pub fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// Run the lexer over a sequence of lines
pub fn lex_lines<'a>(
    language: Language,
    lines: impl IntoIterator<Item = &'a str>,
) -> (Vec<LineFacts>, LineLexer) {
    let mut lexer = LineLexer::new(language);
    let facts = lines.into_iter().map(|line| lexer.feed(line)).collect();
    (facts, lexer)
}

fn starts_with_at(chars: &[char], i: usize, pattern: &str) -> bool {
    pattern
        .chars()
        .enumerate()
        .all(|(k, p)| chars.get(i + k) == Some(&p))
}

/// Width of a `'x'` / `'\n'` literal at `i`, or 1 for a lifetime tick
fn char_literal_len(chars: &[char], i: usize) -> usize {
    if chars.get(i + 1) == Some(&'\\') {
        return chars[i + 2..]
            .iter()
            .position(|&c| c == '\'')
            .map_or(1, |pos| pos + 3);
    }
    if chars.get(i + 2) == Some(&'\'') {
        return 3;
    }
    1
}
