use crate::language::Language;
use crate::lexer::lex_lines;
use crate::types::{IssueKind, SourceLines, ValidationOutcome};
use tree_sitter::{Node, Parser};

/// Syntax check for an extracted scope.
///
/// Never fails: a missing grammar or parser setup error is reported as a note
/// and leaves `ast_valid` set.
pub struct SyntaxValidator {
    language: Language,
}

impl SyntaxValidator {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Check `snippet`, whose first line is line `first_line` of the file.
    ///
    /// When `file` is given the whole file is parsed as well; a failure there
    /// only adds [`IssueKind::FileAstInvalid`] and a note.
    pub fn validate(
        &self,
        snippet: &[String],
        first_line: usize,
        file: Option<&SourceLines>,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        self.check_strings(snippet, first_line, &mut outcome);

        let Some(mut parser) = self.parser(&mut outcome) else {
            return outcome;
        };

        let source = self.dedent(snippet);
        match parse_error(&mut parser, &source) {
            Ok(None) => {}
            Ok(Some(error)) => {
                outcome.ast_valid = false;
                outcome.issues.insert(IssueKind::AstInvalidSnippet);
                outcome.notes.push(format!(
                    "{} at line {}",
                    error.message,
                    first_line + error.row
                ));
            }
            Err(note) => outcome.notes.push(note),
        }

        if let Some(file) = file {
            let text: Vec<&str> = file.iter().map(|(_, line)| line).collect();
            match parse_error(&mut parser, &text.join("\n")) {
                Ok(None) => {}
                Ok(Some(error)) => {
                    outcome.issues.insert(IssueKind::FileAstInvalid);
                    outcome.notes.push(format!(
                        "file does not parse: {} at line {}",
                        error.message,
                        error.row + 1
                    ));
                }
                Err(note) => outcome.notes.push(note),
            }
        }

        outcome
    }

    fn check_strings(&self, snippet: &[String], first_line: usize, outcome: &mut ValidationOutcome) {
        let (facts, lexer) = lex_lines(self.language, snippet.iter().map(String::as_str));

        for (offset, line) in facts.iter().enumerate() {
            if line.unterminated_string {
                outcome.issues.insert(IssueKind::UnterminatedString);
                outcome
                    .notes
                    .push(format!("unterminated string literal at line {}", first_line + offset));
            }
        }

        if lexer.inside_string() {
            outcome.issues.insert(IssueKind::UnterminatedString);
            outcome
                .notes
                .push("string literal still open at end of scope".to_string());
        }
    }

    fn parser(&self, outcome: &mut ValidationOutcome) -> Option<Parser> {
        let Some(grammar) = self.language.tree_sitter_language() else {
            outcome
                .notes
                .push(format!("syntax check skipped: no grammar for {}", self.language));
            return None;
        };

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            log::warn!("Failed to set {} grammar: {e}", self.language);
            outcome.notes.push(format!("syntax check skipped: {e}"));
            return None;
        }
        Some(parser)
    }

    /// Strip the indentation shared by the snippet's code lines, so a nested
    /// method parses as a top-level definition
    fn dedent(&self, snippet: &[String]) -> String {
        let (facts, _) = lex_lines(self.language, snippet.iter().map(String::as_str));
        let common = facts
            .iter()
            .filter(|f| !f.blank && !f.continuation)
            .map(|f| f.indent)
            .min()
            .unwrap_or(0);

        snippet
            .iter()
            .map(|line| strip_columns(line, common))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct SyntaxError {
    message: String,
    /// 0-based row within the parsed text
    row: usize,
}

fn parse_error(parser: &mut Parser, source: &str) -> Result<Option<SyntaxError>, String> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "syntax check skipped: parser returned no tree".to_string())?;

    Ok(first_error(tree.root_node()).map(|node| SyntaxError {
        message: if node.is_missing() {
            format!("missing `{}`", node.kind())
        } else {
            "syntax error".to_string()
        },
        row: node.start_position().row,
    }))
}

/// Leftmost ERROR or MISSING node, or the innermost node flagged with an error
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    Some(node)
}

fn strip_columns(line: &str, columns: usize) -> &str {
    let mut width = 0;
    for (idx, c) in line.char_indices() {
        if width >= columns {
            return &line[idx..];
        }
        match c {
            ' ' => width += 1,
            '\t' => width += crate::lexer::TAB_WIDTH,
            _ => return &line[idx..],
        }
    }
    ""
}
