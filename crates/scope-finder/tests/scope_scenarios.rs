use context_scope_finder::{
    EndReason, EntityKind, IssueKind, Language, LineSpan, ScanOptions, ScopeFinder, ScopeType,
    SourceLines,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn finder(language: Language) -> ScopeFinder {
    ScopeFinder::new(ScanOptions::for_language(language)).expect("valid options")
}

const HELLO: &[&str] = &[
    "def hello(x):",
    "    y = x + 1",
    "    return y",
    "",
    "class Sample:",
    "    def m(self):",
    "        return 42",
];

const SERVICE: &[&str] = &[
    "class Service:",
    "    \"\"\"Service.\"\"\"",
    "",
    "    @staticmethod",
    "    @cache",
    "    def compute(x):",
    "        \"\"\"Double x.\"\"\"",
    "        return x * 2",
    "",
    "def other():",
    "    pass",
];

const HANDLER: &[&str] = &[
    "import os",
    "",
    "def handle(request):",
    "    if request.kind == \"a\":",
    "        return 1",
    "    elif request.kind == \"b\":",
    "        value = compute(request)",
    "        if value:",
    "            return value",
    "    try:",
    "        process(request)",
    "    except ValueError:",
    "        log(request)",
    "        pass",
    "    return None",
    "",
    "def other():",
    "    pass",
];

#[test]
fn function_found_from_any_line_inside_it() {
    init_logging();
    let lines = SourceLines::from(HELLO);
    let finder = finder(Language::Python);

    for start in 1..=3 {
        let result = finder.find(&lines, start).expect("find");
        assert_eq!((result.boundary.start_line, result.boundary.end_line), (1, 3));
        assert!(result.boundary.valid, "start {start}: {:?}", result.boundary.issues);
        assert_eq!(result.boundary.scope_type, ScopeType::Function);
        assert_eq!(result.meta.name.as_deref(), Some("hello"));
    }
}

#[test]
fn stacked_decorators_belong_to_the_method() {
    let lines = SourceLines::from(SERVICE);
    let result = finder(Language::Python).find(&lines, 7).expect("find");

    assert_eq!((result.boundary.start_line, result.boundary.end_line), (4, 8));
    assert!(result.boundary.valid);
    assert_eq!(result.meta.decorators_span, Some(LineSpan::new(4, 5)));
    assert_eq!(result.meta.header_line, Some(6));
    assert_eq!(result.meta.body_docstring_span, Some(LineSpan::single(7)));
    assert_eq!(result.meta.body_code_span, Some(LineSpan::single(8)));
    assert!(result.validation.ast_valid, "{:?}", result.validation.notes);
}

#[test]
fn wrapped_decorator_arguments_stay_with_the_function() {
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
    let finder = finder(Language::Python);

    for start in [5, 1, 2] {
        let result = finder.find(&lines, start).expect("find");
        assert_eq!(
            (result.boundary.start_line, result.boundary.end_line),
            (1, 5),
            "start {start}"
        );
        assert!(result.boundary.valid, "start {start}: {:?}", result.boundary.issues);
        assert_eq!(result.meta.decorators_span, Some(LineSpan::new(1, 3)));
        assert_eq!(result.meta.header_line, Some(4));
        assert_eq!(result.meta.name.as_deref(), Some("handler"));
        assert!(result.validation.ast_valid, "{:?}", result.validation.notes);
    }
}

#[test]
fn inner_returns_do_not_cut_the_function() {
    let lines = SourceLines::from(HANDLER);
    let finder = finder(Language::Python);

    for start in [7, 9, 13] {
        let result = finder.find(&lines, start).expect("find");
        assert_eq!(
            (result.boundary.start_line, result.boundary.end_line),
            (3, 15),
            "start {start}"
        );
        assert_eq!(result.boundary.end_reason, EndReason::IndentOut);
        assert!(result.boundary.valid);
    }
}

#[test]
fn function_running_to_eof_is_flagged() {
    let lines = SourceLines::from(&HANDLER[..15]);
    let result = finder(Language::Python).find(&lines, 9).expect("find");

    assert_eq!((result.boundary.start_line, result.boundary.end_line), (3, 15));
    assert!(!result.boundary.valid);
    assert!(result.boundary.has_issue(IssueKind::UnterminatedScopeEof));
}

#[test]
fn rescanning_from_the_header_is_idempotent() {
    let finder = finder(Language::Python);
    for (source, start) in [(HELLO, 2), (SERVICE, 8), (HANDLER, 11)] {
        let lines = SourceLines::from(source);
        let first = finder.find(&lines, start).expect("find");
        let header = first.boundary.header_line.expect("header");
        let again = finder.find(&lines, header).expect("find");
        assert_eq!(first.boundary, again.boundary);
    }
}

#[test]
fn content_covers_exactly_the_boundary() {
    let finder = finder(Language::Python);
    for source in [HELLO, SERVICE, HANDLER] {
        let lines = SourceLines::from(source);
        for start in 1..=lines.len() {
            let result = finder.find(&lines, start).expect("find");
            let boundary = &result.boundary;
            assert_eq!(
                result.content.split('\n').count(),
                boundary.end_line - boundary.start_line + 1
            );
            assert!(1 <= boundary.start_line && boundary.start_line <= boundary.end_line);
            assert!(boundary.end_line <= lines.len());
            assert_eq!(boundary.valid, boundary.issues.is_empty());
            if boundary.valid {
                assert!(boundary.counts.is_balanced(), "start {start}: {boundary:?}");
            }
        }
    }
}

#[test]
fn unterminated_string_is_reported() {
    let lines = SourceLines::from(
        &["def f():", "    s = \"open", "    return s", "", "x = 1"][..],
    );
    let report = finder(Language::Python).find(&lines, 2).expect("find").report();

    assert_eq!((report.start_line, report.end_line), (1, 3));
    assert!(
        report.issues.iter().any(|i| i == "unterminated_string" || i == "ast_invalid_snippet"),
        "{:?}",
        report.issues
    );
}

#[test]
fn brace_language_closes_on_matching_brace() {
    let lines = SourceLines::from_text(
        r#"use std::fmt;

/// Adds.
#[inline]
pub fn add(a: i32, b: i32) -> i32 {
    let s = "}";
    if a > b {
        return a;
    }
    a + b
}

pub struct Point {
    x: i32,
}
"#,
    );
    let finder = finder(Language::Rust);

    let result = finder.find(&lines, 8).expect("find");
    assert_eq!((result.boundary.start_line, result.boundary.end_line), (4, 11));
    assert_eq!(result.boundary.end_pattern.as_deref(), Some("closing_brace"));
    assert!(result.boundary.valid);
    assert!(result.validation.ast_valid, "{:?}", result.validation.notes);

    let result = finder.find(&lines, 14).expect("find");
    assert_eq!((result.boundary.start_line, result.boundary.end_line), (13, 15));
    assert_eq!(result.meta.kind, EntityKind::Class);
}

#[test]
fn javascript_method_in_class() {
    let lines = SourceLines::from_text(
        "class Store {\n  load(id) {\n    const item = this.items[id];\n    return item;\n  }\n}\n",
    );
    let result = finder(Language::JavaScript).find(&lines, 3).expect("find");

    assert_eq!((result.boundary.start_line, result.boundary.end_line), (2, 5));
    assert_eq!(result.meta.name.as_deref(), Some("load"));
    assert!(result.boundary.valid);
}

#[test]
fn ruby_methods_close_on_end() {
    let lines = SourceLines::from_text(
        "class Calc\n  def add(a, b)\n    if a > b\n      return a\n    end\n    a + b\n  end\n\n  def sub(a, b)\n    a - b\n  end\nend\n",
    );
    let finder = finder(Language::Ruby);

    let result = finder.find(&lines, 6).expect("find");
    assert_eq!((result.boundary.start_line, result.boundary.end_line), (2, 7));
    assert_eq!(result.boundary.end_reason, EndReason::Pattern);
    assert_eq!(result.boundary.end_pattern.as_deref(), Some("end_keyword"));
    assert!(result.boundary.valid, "{:?}", result.boundary.issues);
    assert_eq!(result.meta.name.as_deref(), Some("add"));

    let result = finder.find(&lines, 10).expect("find");
    assert_eq!((result.boundary.start_line, result.boundary.end_line), (9, 11));
    assert_eq!(result.meta.name.as_deref(), Some("sub"));

    let chunks = finder.chunk_lines(&lines).expect("chunk");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].meta.kind, EntityKind::Class);
    assert_eq!((chunks[0].boundary.start_line, chunks[0].boundary.end_line), (1, 12));
}

#[test]
fn out_of_range_start_is_clamped() {
    let lines = SourceLines::from(HELLO);
    let result = finder(Language::Python).find(&lines, 500).expect("find");
    assert_eq!(result.boundary.start_line, 6);
    assert_eq!(result.boundary.end_line, 7);
}

#[test]
fn chunk_lines_returns_top_level_entities() {
    let lines = SourceLines::from(SERVICE);
    let chunks = finder(Language::Python).chunk_lines(&lines).expect("chunk");

    let spans: Vec<(usize, usize)> = chunks
        .iter()
        .map(|c| (c.boundary.start_line, c.boundary.end_line))
        .collect();
    assert_eq!(spans, vec![(1, 8), (10, 11)]);
    assert_eq!(chunks[0].meta.kind, EntityKind::Class);
    assert_eq!(chunks[1].meta.name.as_deref(), Some("other"));

    let limited = ScopeFinder::new(ScanOptions::for_language(Language::Python).max_chunks(1))
        .expect("valid options")
        .chunk_lines(&lines)
        .expect("chunk");
    assert_eq!(limited.len(), 1);
}

#[test]
fn loads_lines_from_disk() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("handler.py");
    std::fs::write(&path, HANDLER.join("\n")).expect("write source");

    let language = Language::from_path(&path);
    assert_eq!(language, Language::Python);

    let lines = SourceLines::from_path(&path).expect("load");
    let report = finder(language).find(&lines, 12).expect("find").report();
    assert_eq!((report.start_line, report.end_line), (3, 15));

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["end_reason"], "indent_out");
    assert_eq!(json["meta"]["name"], "handle");
    assert_eq!(json["issues"], serde_json::json!([]));
}
