use crate::cst::{node, Cst, CstElement};
use crate::parse;
use diagnostics::{Diagnostic, Reporter};
use span::{FileName, LocalSpan, SourceMap};

fn parse_source(source: &str) -> (Cst, Vec<Diagnostic>) {
    let mut map = SourceMap::default();
    let index = map.add(FileName::from("test"), source.to_owned());
    let reporter = Reporter::new();
    let cst = parse(map.file_mut(index), &reporter);
    (cst, reporter.into_diagnostics())
}

fn parse_clean(source: &str) -> Cst {
    let (cst, diagnostics) = parse_source(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics:\n{}",
        diagnostics.iter().map(|d| d.message.clone()).collect::<Vec<_>>().join("\n"),
    );
    cst
}

/// The ids of an element's child nodes.
fn child_ids(element: &CstElement<'_>) -> Vec<u8> {
    let mut ids = Vec::new();
    let mut child = element.first_child_node();
    while !child.empty() {
        ids.push(child.id());
        child.next_sibling_node();
    }
    ids
}

fn nth_child<'a>(element: &CstElement<'a>, index: usize) -> CstElement<'a> {
    let mut child = element.first_child_node();
    for _ in 0..index {
        child.next_sibling_node();
    }
    child
}

/// Collect every leaf token span in document order.
fn leaf_spans(element: &CstElement<'_>, out: &mut Vec<LocalSpan>) {
    let mut child = element.first_child_element();
    while !child.empty() {
        if child.is_node() {
            leaf_spans(&child, out);
        } else {
            out.push(child.span());
        }
        child.next_sibling_element();
    }
}

/// Concatenating all token ranges in document order yields the file range.
fn assert_coverage(cst: &Cst, length: u32) {
    let root = cst.root();
    let mut spans = Vec::new();
    leaf_spans(&root, &mut spans);

    let mut cursor = 0;
    for span in spans {
        assert_eq!(span.start, cursor, "gap or overlap at byte {cursor}");
        cursor = span.end;
    }
    assert_eq!(cursor, length);
}

#[test]
fn simple_definition() {
    let source = "def x = 1\n";
    let cst = parse_clean(source);
    let root = cst.root();

    assert_eq!(root.id(), node::TOP);
    assert_eq!(child_ids(&root), vec![node::DEF]);

    let def = nth_child(&root, 0);
    assert_eq!(child_ids(&def), vec![node::ID, node::LITERAL]);

    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn curried_arguments_are_applications() {
    let cst = parse_clean("def f x y = x\n");
    let def = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&def), vec![node::APP, node::ID]);

    let app = nth_child(&def, 0);
    assert_eq!(child_ids(&app), vec![node::APP, node::ID]);
}

#[test]
fn operator_precedence_shapes_the_tree() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let cst = parse_clean("def x = 1 + 2 * 3\n");
    let def = nth_child(&cst.root(), 0);
    let binary = nth_child(&def, 1);

    assert_eq!(binary.id(), node::BINARY);
    assert_eq!(child_ids(&binary), vec![node::LITERAL, node::OP, node::BINARY]);
}

#[test]
fn ascription_is_a_colon_binary() {
    let cst = parse_clean("def x = y: Integer\n");
    let def = nth_child(&cst.root(), 0);
    let binary = nth_child(&def, 1);
    assert_eq!(child_ids(&binary), vec![node::ID, node::OP, node::ID]);
}

#[test]
fn indented_block_with_definitions() {
    let source = "def x =\n    def y = 1\n    y\n";
    let cst = parse_clean(source);
    let def = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&def), vec![node::ID, node::BLOCK]);

    let block = nth_child(&def, 1);
    assert_eq!(child_ids(&block), vec![node::DEF, node::ID]);

    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn package_and_import() {
    let cst = parse_clean("package foo\nfrom wake import def map\n");
    let root = cst.root();
    assert_eq!(child_ids(&root), vec![node::PACKAGE, node::IMPORT]);

    let import = nth_child(&root, 1);
    assert_eq!(child_ids(&import), vec![node::ID, node::KIND, node::IDEQ]);
}

#[test]
fn wildcard_import_has_no_names() {
    let cst = parse_clean("from other import\n");
    let import = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&import), vec![node::ID]);
}

#[test]
fn renamed_operator_import() {
    let cst = parse_clean("from ops import binary + = -\n");
    let import = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&import), vec![node::ID, node::ARITY, node::IDEQ]);

    let ideq = nth_child(&import, 2);
    assert_eq!(child_ids(&ideq), vec![node::OP, node::OP]);
}

#[test]
fn export_with_kind() {
    let cst = parse_clean("from paths export type Path\n");
    let export = nth_child(&cst.root(), 0);
    assert_eq!(export.id(), node::EXPORT);
    assert_eq!(child_ids(&export), vec![node::ID, node::KIND, node::IDEQ]);
}

#[test]
fn global_export_flags_precede_the_definition() {
    let cst = parse_clean("global export def x = 1\n");
    let def = nth_child(&cst.root(), 0);
    assert_eq!(
        child_ids(&def),
        vec![node::FLAG_GLOBAL, node::FLAG_EXPORT, node::ID, node::LITERAL],
    );
}

#[test]
fn topic_declaration() {
    let cst = parse_clean("topic jobs: List String\n");
    let topic = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&topic), vec![node::ID, node::APP]);
}

#[test]
fn inline_data_with_alternatives() {
    let cst = parse_clean("data Order = LT | EQ | GT\n");
    let data = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&data), vec![node::ID, node::ID, node::ID, node::ID]);
}

#[test]
fn block_data_constructors() {
    let source = "data Tree a =\n    Leaf\n    Node a a\n";
    let cst = parse_clean(source);
    let data = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&data), vec![node::APP, node::ID, node::APP]);
    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn inline_tuple_with_tagged_members() {
    let cst = parse_clean("tuple Pair = First: Integer, Second: String\n");
    let tuple = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&tuple), vec![node::ID, node::TUPLE_ELT, node::TUPLE_ELT]);

    let elt = nth_child(&tuple, 1);
    assert_eq!(child_ids(&elt), vec![node::BINARY]);
    let binary = nth_child(&elt, 0);
    assert_eq!(child_ids(&binary), vec![node::ID, node::OP, node::ID]);
}

#[test]
fn match_with_literal_and_hole_patterns() {
    let source = "def x = match y\n    1 = one\n    _ = other\n";
    let cst = parse_clean(source);
    let def = nth_child(&cst.root(), 0);
    let match_ = nth_child(&def, 1);

    assert_eq!(match_.id(), node::MATCH);
    assert_eq!(child_ids(&match_), vec![node::ID, node::CASE, node::CASE]);

    assert_eq!(child_ids(&nth_child(&match_, 1)), vec![node::LITERAL, node::ID]);
    assert_eq!(child_ids(&nth_child(&match_, 2)), vec![node::HOLE, node::ID]);
}

#[test]
fn match_arm_guards() {
    let source = "def x = match y\n    n if n = yes\n";
    let cst = parse_clean(source);
    let match_ = nth_child(&nth_child(&cst.root(), 0), 1);
    let case = nth_child(&match_, 1);
    assert_eq!(child_ids(&case), vec![node::ID, node::GUARD, node::ID]);
}

#[test]
fn if_then_else() {
    let cst = parse_clean("def x = if c then 1 else 2\n");
    let if_ = nth_child(&nth_child(&cst.root(), 0), 1);
    assert_eq!(if_.id(), node::IF);
    assert_eq!(child_ids(&if_), vec![node::ID, node::LITERAL, node::LITERAL]);
}

#[test]
fn lambda_with_pattern() {
    let cst = parse_clean("def f = \\x x\n");
    let lambda = nth_child(&nth_child(&cst.root(), 0), 1);
    assert_eq!(lambda.id(), node::LAMBDA);
    assert_eq!(child_ids(&lambda), vec![node::ID, node::ID]);
}

#[test]
fn string_interpolation_re_enters_the_parser() {
    let source = "def s = \"a{x}b{y}c\"\n";
    let cst = parse_clean(source);
    let interpolate = nth_child(&nth_child(&cst.root(), 0), 1);

    assert_eq!(interpolate.id(), node::INTERPOLATE);
    assert_eq!(
        child_ids(&interpolate),
        vec![node::LITERAL, node::ID, node::LITERAL, node::ID, node::LITERAL],
    );
    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn regex_interpolation() {
    let cst = parse_clean("def r = `a+${x}b`\n");
    let interpolate = nth_child(&nth_child(&cst.root(), 0), 1);
    assert_eq!(interpolate.id(), node::INTERPOLATE);
    assert_eq!(child_ids(&interpolate), vec![node::LITERAL, node::ID, node::LITERAL]);
}

#[test]
fn a_closing_brace_in_expression_position_is_not_a_string_resume() {
    let (_, diagnostics) = parse_source("def x = }\n");
    assert!(!diagnostics.is_empty());
}

#[test]
fn target_with_cache_arguments() {
    let cst = parse_clean("target build a \\ b = a\n");
    let target = nth_child(&cst.root(), 0);
    assert_eq!(child_ids(&target), vec![node::APP, node::ID, node::ID]);
}

#[test]
fn publish_and_subscribe() {
    let cst = parse_clean("publish info = x\ndef y = subscribe info\n");
    let root = cst.root();
    assert_eq!(child_ids(&root), vec![node::PUBLISH, node::DEF]);

    let subscribe = nth_child(&nth_child(&root, 1), 1);
    assert_eq!(subscribe.id(), node::SUBSCRIBE);
    assert_eq!(child_ids(&subscribe), vec![node::ID]);
}

#[test]
fn require_swallows_the_rest_of_the_block() {
    let source = "def x =\n    require a = b\n    c\n";
    let cst = parse_clean(source);
    let block = nth_child(&nth_child(&cst.root(), 0), 1);
    assert_eq!(child_ids(&block), vec![node::REQUIRE]);

    let require = nth_child(&block, 0);
    assert_eq!(child_ids(&require), vec![node::ID, node::ID, node::BLOCK]);
}

#[test]
fn require_with_else() {
    let source = "def x =\n    require a = b\n    else d\n    c\n";
    let cst = parse_clean(source);
    let require = nth_child(&nth_child(&nth_child(&cst.root(), 0), 1), 0);
    assert_eq!(child_ids(&require), vec![node::ID, node::ID, node::ID, node::BLOCK]);
}

#[test]
fn parenthesised_block_collapses_newlines() {
    // inside parentheses newlines are not significant as long as the
    // indentation does not change
    let source = "def x = (f\ny\n)\n";
    let cst = parse_clean(source);
    let paren = nth_child(&nth_child(&cst.root(), 0), 1);
    assert_eq!(paren.id(), node::PAREN);
    assert_eq!(child_ids(&paren), vec![node::APP]);
}

#[test]
fn blank_and_comment_lines_do_not_change_indentation() {
    let source = "def x =\n    def q = 1\n\n# note\n    q\n";
    let (cst, diagnostics) = parse_source(source);
    assert!(diagnostics.is_empty());
    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn mixing_tabs_and_spaces_is_reported() {
    let source = "def a =\n\tb\n c\n";
    let (_, diagnostics) = parse_source(source);
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains("inconsistent indentation")));
}

#[test]
fn nested_dedents_pop_multiple_scopes() {
    let source = "def x =\n    def y =\n        1\n    y\ndef z = 2\n";
    let cst = parse_clean(source);
    assert_eq!(child_ids(&cst.root()), vec![node::DEF, node::DEF]);
    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn error_recovery_produces_an_error_node_and_continues() {
    let source = "def x = )\ndef y = 2\n";
    let (cst, diagnostics) = parse_source(source);

    assert!(!diagnostics.is_empty());
    let ids = child_ids(&cst.root());
    assert!(ids.contains(&node::ERROR));
    assert_eq!(*ids.last().unwrap(), node::DEF);
    assert_coverage(&cst, source.len() as u32);
}

#[test]
fn unexpected_tokens_list_expectations() {
    let (_, diagnostics) = parse_source("def x 1\n");
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains("was expecting")));
}

#[test]
fn illegal_bytes_are_reported_and_skipped() {
    let (_, diagnostics) = parse_source("def x = \u{1}\n");
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains("illegal token")));
}

#[test]
fn files_without_trailing_newline_still_parse() {
    let cst = parse_clean("def x = 1");
    assert_eq!(child_ids(&cst.root()), vec![node::DEF]);
}

#[test]
fn layout_passes_trivia_free_streams_through() {
    use crate::{cst::CstBuilder, layout::TokenSource, ParserState};
    use lexer::TokenKind;

    // a stream already free of whitespace, comments, and newlines is
    // forwarded unchanged apart from the end-of-input newline
    struct AlwaysLines;
    impl ParserState for AlwaysLines {
        fn can_shift(&self, kind: TokenKind) -> bool {
            kind == TokenKind::Newline
        }
    }

    let mut map = SourceMap::default();
    let index = map.add(FileName::from("test"), "(x)".to_owned());
    let reporter = Reporter::new();

    let mut source = TokenSource::new(map.file_mut(index), &reporter);
    let mut builder = CstBuilder::new();
    let mut kinds = Vec::new();
    loop {
        let token = source.next(&AlwaysLines, &mut builder);
        kinds.push(token.kind);
        if token.kind == TokenKind::EndOfInput {
            break;
        }
    }

    assert_eq!(
        kinds,
        vec![
            TokenKind::OpeningRoundBracket,
            TokenKind::Id,
            TokenKind::ClosingRoundBracket,
            TokenKind::Newline,
            TokenKind::EndOfInput,
        ],
    );
    assert!(reporter.is_empty());
}

#[test]
fn coverage_holds_for_error_trees() {
    let source = "def x = \"a{ }b\"\ntuple = 1\n";
    let (cst, _) = parse_source(source);
    assert_coverage(&cst, source.len() as u32);
}
