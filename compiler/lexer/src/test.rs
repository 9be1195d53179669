use crate::{lex, lex_dstr, lex_printable, lex_rstr, relex_raw, relex_string, render_snippet};
use crate::{IdKind, Token, TokenKind, TokenKind::*};
use span::span;

fn lex_all(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    loop {
        let token = lex(source, cursor);
        cursor = token.span.end;
        tokens.push(token);
        if token.kind == EndOfInput {
            break;
        }
    }

    tokens
}

#[track_caller]
fn assert_tokens(source: &str, expected: Vec<Token>) {
    let actual = lex_all(source);
    if actual != expected {
        panic!(
            "the output of the lexer does not match the expected one:\n{}",
            utilities::difference(&format!("{expected:#?}"), &format!("{actual:#?}"), "\n"),
        );
    }
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex_all(source).iter().map(|token| token.kind).collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("def fine target tuples"),
        vec![Def, Whitespace, Id, Whitespace, Target, Whitespace, Id, EndOfInput],
    );
}

#[test]
fn a_lone_underscore_is_a_hole() {
    assert_eq!(kinds("_ _x x_"), vec![Hole, Whitespace, Id, Whitespace, Id, EndOfInput]);
}

#[test]
fn operator_kinds_follow_the_first_code_point() {
    assert_eq!(
        kinds("+ ++ <= == != . | & $ , ;"),
        vec![
            AddSub, Whitespace, AddSub, Whitespace, Compare, Whitespace, Inequal, Whitespace,
            Inequal, Whitespace, Dot, Whitespace, Or, Whitespace, And, Whitespace, Dollar,
            Whitespace, Comma, Whitespace, Comma, EndOfInput,
        ],
    );
}

#[test]
fn a_single_equals_is_punctuation_not_an_operator() {
    assert_eq!(kinds("= =="), vec![Equals, Whitespace, Inequal, EndOfInput]);
    assert_eq!(kinds(": ."), vec![Colon, Whitespace, Dot, EndOfInput]);
}

#[test]
fn numbers() {
    assert_eq!(
        kinds("42 4_200 0xFF 0b101 3.14 1e10 2.5e-3"),
        vec![
            Integer, Whitespace, Integer, Whitespace, Integer, Whitespace, Integer, Whitespace,
            Double, Whitespace, Double, Whitespace, Double, EndOfInput,
        ],
    );
}

#[test]
fn an_integer_followed_by_dot_stays_an_integer() {
    assert_eq!(kinds("1.foo"), vec![Integer, Dot, Id, EndOfInput]);
}

#[test]
fn a_bare_hex_prefix_is_illegal_but_scanned() {
    let tokens = lex_all("0x");
    assert_eq!(tokens[0].kind, Integer);
    assert!(!tokens[0].ok);
}

#[test]
fn comments_run_to_the_end_of_the_line() {
    assert_eq!(kinds("# note\nx"), vec![Comment, Newline, Id, EndOfInput]);
}

#[test]
fn crlf_is_one_newline() {
    assert_tokens(
        "a\r\nb",
        vec![
            Token::new(Id, span(0, 1)),
            Token::new(Newline, span(1, 3)),
            Token::new(Id, span(3, 4)),
            Token::new(EndOfInput, span(4, 4)),
        ],
    );
}

#[test]
fn raw_strings() {
    let tokens = lex_all("'it''s'");
    assert_eq!(tokens[0], Token::new(StrRaw, span(0, 4)));
    assert_eq!(relex_raw("'it\\'s'"), "it's");
}

#[test]
fn an_unterminated_string_stops_at_the_newline() {
    let tokens = lex_all("\"oops\nx");
    assert_eq!(tokens[0].kind, StrSingle);
    assert!(!tokens[0].ok);
    assert_eq!(tokens[0].span, span(0, 5));
    assert_eq!(tokens[1].kind, Newline);
}

#[test]
fn interpolated_string_re_entry() {
    let source = "\"a{x}b{y}c\"";

    let open = lex(source, 0);
    assert_eq!(open, Token::new(StrOpen, span(0, 3)));

    let x = lex(source, open.span.end);
    assert_eq!(x.kind, Id);

    let mid = lex_dstr(source, x.span.end);
    assert_eq!(mid, Token::new(StrMid, span(4, 7)));

    let y = lex(source, mid.span.end);
    let close = lex_dstr(source, y.span.end);
    assert_eq!(close, Token::new(StrClose, span(8, 11)));
}

#[test]
fn interpolated_regex_re_entry() {
    let source = "`a+${x}b*`";

    let open = lex(source, 0);
    assert_eq!(open, Token::new(RegOpen, span(0, 5)));

    let x = lex(source, open.span.end);
    let close = lex_rstr(source, x.span.end);
    assert_eq!(close, Token::new(RegClose, span(6, 10)));
}

#[test]
fn illegal_bytes_are_one_recovered_token() {
    let tokens = lex_all("\u{1}\u{2}x");
    assert_eq!(tokens[0], Token::new_illegal(Id, span(0, 2)));
    assert_eq!(tokens[1].kind, Id);
}

#[test]
fn printable_classification() {
    assert!(lex_printable("a", 0).ok);
    assert!(lex_printable("文", 0).ok);
    assert!(!lex_printable("\n", 0).ok);
}

#[test]
fn identifier_kind_classification() {
    assert_eq!(crate::lex_kind("map"), IdKind::Lower);
    assert_eq!(crate::lex_kind("Pair"), IdKind::Upper);
    assert_eq!(crate::lex_kind("++"), IdKind::Operator);
    assert_eq!(crate::lex_kind("Δ"), IdKind::Upper);
    // wildcards and synthesized names count as lower-case
    assert_eq!(crate::lex_kind("_"), IdKind::Lower);
    assert_eq!(crate::lex_kind("_ k0"), IdKind::Lower);
}

#[test]
fn string_value_escapes() {
    assert_eq!(relex_string(StrSingle, "\"a\\tb\\u0394\""), Ok("a\tbΔ".to_owned()));
    assert_eq!(relex_string(StrOpen, "\"pre{"), Ok("pre".to_owned()));
    assert_eq!(relex_string(StrMid, "}mid{"), Ok("mid".to_owned()));
    assert_eq!(relex_string(StrClose, "}post\""), Ok("post".to_owned()));
    assert_eq!(relex_string(StrSingle, "\"bad\\q\""), Err(3));
}

#[test]
fn snippet_rendering_elides_the_middle() {
    assert_eq!(render_snippet("short"), "'short'");
    assert_eq!(
        render_snippet("abcdefghijklmnopqrstuvwxyz"),
        "'abcdefghi..rstuvwxyz'",
    );
    assert_eq!(render_snippet("a\tb\n"), "'a\\tb\\n'");
    assert_eq!(render_snippet("\u{85}"), "'\\x85'");
}
