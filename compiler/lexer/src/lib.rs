//! The lexical analyzer (lexer).
//!
//! Every entry point is a pure function over a byte range: it scans one
//! token starting at `start` and reports how far it got. There is no shared
//! scanner state; re-entry into interpolated string and regex literals is
//! selected by the caller (the parse driver asks the parser whether a
//! [`TokenKind::StrClose`] or [`TokenKind::RegClose`] could be shifted when
//! the next byte is `}`).
//!
//! Illegal input never aborts a scan: the longest illegal run is consumed
//! and returned as a token with `ok = false` and a best-guess kind.

use span::{LocalByteIndex, LocalSpan};

pub use token::{Token, TokenKind};

pub mod token;

#[cfg(test)]
mod test;

/// Scan the next token of the surface syntax.
pub fn lex(source: &str, start: LocalByteIndex) -> Token {
    let mut cursor = Cursor::new(source, start);

    let Some(character) = cursor.peek() else {
        return cursor.token(TokenKind::EndOfInput);
    };

    match character {
        ' ' | '\t' => {
            cursor.take_while(|character| character == ' ' || character == '\t');
            cursor.token(TokenKind::Whitespace)
        }
        '\r' => {
            cursor.advance();
            if cursor.peek() == Some('\n') {
                cursor.advance();
                cursor.token(TokenKind::Newline)
            } else {
                // a stray carriage return is horizontal whitespace
                cursor.token(TokenKind::Whitespace)
            }
        }
        '\n' => {
            cursor.advance();
            cursor.token(TokenKind::Newline)
        }
        '#' => {
            cursor.take_while(|character| character != '\n');
            cursor.token(TokenKind::Comment)
        }
        '{' => cursor.single(TokenKind::OpeningCurlyBracket),
        '}' => cursor.single(TokenKind::ClosingCurlyBracket),
        '[' => cursor.single(TokenKind::OpeningSquareBracket),
        ']' => cursor.single(TokenKind::ClosingSquareBracket),
        '(' => cursor.single(TokenKind::OpeningRoundBracket),
        ')' => cursor.single(TokenKind::ClosingRoundBracket),
        ':' => cursor.single(TokenKind::Colon),
        '\\' => cursor.single(TokenKind::Backslash),
        '"' => {
            cursor.advance();
            lex_string_body(cursor, TokenKind::StrSingle, TokenKind::StrOpen)
        }
        '\'' => lex_raw_string(cursor),
        '`' => {
            cursor.advance();
            lex_regex_body(cursor, TokenKind::RegSingle, TokenKind::RegOpen)
        }
        character if character.is_ascii_digit() => lex_number(cursor),
        character if is_identifier_start(character) => lex_identifier(cursor),
        character if is_operator_char(character) => lex_operator(cursor),
        _ => {
            // consume the longest run of bytes no rule recognizes
            cursor.advance();
            cursor.take_while(|character| !is_recognized_start(character));
            cursor.illegal(TokenKind::Id)
        }
    }
}

/// Resume a `"…{expr}…"` string after the embedded expression's `}`.
pub fn lex_dstr(source: &str, start: LocalByteIndex) -> Token {
    let mut cursor = Cursor::new(source, start);
    debug_assert_eq!(cursor.peek(), Some('}'));
    cursor.advance();
    lex_string_body(cursor, TokenKind::StrClose, TokenKind::StrMid)
}

/// Resume a `` `…${expr}…` `` regex after the embedded expression's `}`.
pub fn lex_rstr(source: &str, start: LocalByteIndex) -> Token {
    let mut cursor = Cursor::new(source, start);
    debug_assert_eq!(cursor.peek(), Some('}'));
    cursor.advance();
    lex_regex_body(cursor, TokenKind::RegClose, TokenKind::RegMid)
}

/// Scan a single code point; `ok` indicates it is printable.
///
/// Used by diagnostic rendering to walk arbitrary source snippets.
pub fn lex_printable(source: &str, start: LocalByteIndex) -> Token {
    let mut cursor = Cursor::new(source, start);

    match cursor.peek() {
        None => cursor.token(TokenKind::EndOfInput),
        Some(character) => {
            cursor.advance();
            if character.is_control() {
                cursor.illegal(TokenKind::Id)
            } else {
                cursor.token(TokenKind::Id)
            }
        }
    }
}

fn lex_identifier(mut cursor: Cursor<'_>) -> Token {
    cursor.advance();
    cursor.take_while(is_identifier_middle);

    let name = cursor.source_slice();
    match token::keyword(name) {
        Some(keyword) => cursor.token(keyword),
        None if name == "_" => cursor.token(TokenKind::Hole),
        None => cursor.token(TokenKind::Id),
    }
}

fn lex_operator(mut cursor: Cursor<'_>) -> Token {
    let first = cursor.peek().unwrap();
    cursor.take_while(is_operator_char);

    match cursor.source_slice() {
        "=" => cursor.token(TokenKind::Equals),
        _ => cursor.token(operator_kind(first)),
    }
}

fn lex_number(mut cursor: Cursor<'_>) -> Token {
    let leading_zero = cursor.peek() == Some('0');
    cursor.advance();

    if leading_zero {
        let radix: Option<fn(char) -> bool> = match cursor.peek() {
            Some('x' | 'X') => Some(|character| character.is_ascii_hexdigit()),
            Some('b' | 'B') => Some(|character| matches!(character, '0' | '1')),
            Some('o' | 'O') => Some(|character| matches!(character, '0'..='7')),
            _ => None,
        };

        if let Some(digit) = radix {
            cursor.advance();
            let mut any = false;
            cursor.take_while_with(
                |character| digit(character) || character == '_',
                || any = true,
            );
            return if any {
                cursor.token(TokenKind::Integer)
            } else {
                cursor.illegal(TokenKind::Integer)
            };
        }
    }

    cursor.take_while(|character| character.is_ascii_digit() || character == '_');

    let mut kind = TokenKind::Integer;

    if cursor.peek() == Some('.') && cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
        cursor.advance();
        cursor.take_while(|character| character.is_ascii_digit() || character == '_');
        kind = TokenKind::Double;
    }

    if matches!(cursor.peek(), Some('e' | 'E')) {
        let offset = match cursor.peek_nth(1) {
            Some('+' | '-') => 2,
            _ => 1,
        };
        if cursor.peek_nth(offset).is_some_and(|c| c.is_ascii_digit()) {
            for _ in 0..offset {
                cursor.advance();
            }
            cursor.take_while(|character| character.is_ascii_digit());
            kind = TokenKind::Double;
        }
    }

    cursor.token(kind)
}

fn lex_raw_string(mut cursor: Cursor<'_>) -> Token {
    cursor.advance();

    loop {
        match cursor.peek() {
            None | Some('\n') => return cursor.illegal(TokenKind::StrRaw),
            Some('\'') => {
                cursor.advance();
                return cursor.token(TokenKind::StrRaw);
            }
            Some('\\') => {
                cursor.advance();
                if cursor.peek().is_some_and(|character| character != '\n') {
                    cursor.advance();
                }
            }
            Some(_) => cursor.advance(),
        }
    }
}

fn lex_string_body(mut cursor: Cursor<'_>, closed: TokenKind, open: TokenKind) -> Token {
    loop {
        match cursor.peek() {
            None | Some('\n') => return cursor.illegal(closed),
            Some('"') => {
                cursor.advance();
                return cursor.token(closed);
            }
            Some('{') => {
                cursor.advance();
                return cursor.token(open);
            }
            Some('\\') => {
                cursor.advance();
                if cursor.peek().is_some_and(|character| character != '\n') {
                    cursor.advance();
                }
            }
            Some(_) => cursor.advance(),
        }
    }
}

fn lex_regex_body(mut cursor: Cursor<'_>, closed: TokenKind, open: TokenKind) -> Token {
    loop {
        match cursor.peek() {
            None | Some('\n') => return cursor.illegal(closed),
            Some('`') => {
                cursor.advance();
                return cursor.token(closed);
            }
            Some('$') if cursor.peek_nth(1) == Some('{') => {
                cursor.advance();
                cursor.advance();
                return cursor.token(open);
            }
            Some('\\') => {
                cursor.advance();
                if cursor.peek().is_some_and(|character| character != '\n') {
                    cursor.advance();
                }
            }
            Some(_) => cursor.advance(),
        }
    }
}

/// The cursor of a single scan.
struct Cursor<'a> {
    source: &'a str,
    start: usize,
    index: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, start: LocalByteIndex) -> Self {
        let start = start as usize;
        Self { source, start, index: start }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.index..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(character) = self.peek() {
            self.index += character.len_utf8();
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) {
        self.take_while_with(predicate, || ());
    }

    fn take_while_with(&mut self, predicate: impl Fn(char) -> bool, mut action: impl FnMut()) {
        while let Some(character) = self.peek() {
            if !predicate(character) {
                break;
            }
            self.advance();
            action();
        }
    }

    fn source_slice(&self) -> &'a str {
        &self.source[self.start..self.index]
    }

    fn span(&self) -> LocalSpan {
        LocalSpan::new(self.start as u32, self.index as u32)
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }

    fn illegal(&self, kind: TokenKind) -> Token {
        Token::new_illegal(kind, self.span())
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.token(kind)
    }
}

fn is_identifier_start(character: char) -> bool {
    character.is_alphabetic() || character == '_'
}

fn is_identifier_middle(character: char) -> bool {
    character.is_alphanumeric() || character == '_'
}

fn is_recognized_start(character: char) -> bool {
    matches!(
        character,
        ' ' | '\t' | '\r' | '\n' | '#' | '{' | '}' | '[' | ']' | '(' | ')' | ':' | '\\' | '"'
            | '\'' | '`'
    ) || character.is_ascii_digit()
        || is_identifier_start(character)
        || is_operator_char(character)
}

#[rustfmt::skip]
fn is_operator_char(character: char) -> bool {
    matches!(
        character,
        '.' | '^' | '*' | '/' | '%' | '+' | '-' | '~' | '<' | '>' | '=' | '!' | '&' | '|'
            | '$' | ',' | ';' | '?'
            | '×' | '÷' | '⋅' | '¬' | '±' | '⊕' | '⊖' | '⊗' | '⊘'
            | '∧' | '∨' | '≤' | '≥' | '≠' | '≡' | '∈' | '∉' | '⊂' | '⊃' | '∩' | '∪'
            | '√' | '∛' | '∜' | '∑' | '∏' | '∐' | '⋀' | '⋁' | '⋂' | '⋃'
            | '←' | '→' | '↔' | '⇜' | '⇝' | '⇐' | '⇒' | '⇔'
    )
}

/// The precedence class of an operator is decided by its first code point.
fn operator_kind(first: char) -> TokenKind {
    use TokenKind::*;

    match first {
        '.' => Dot,
        '?' | '√' | '∛' | '∜' | '∑' | '∏' | '∐' | '⋀' | '⋁' | '⋂' | '⋃' => Quant,
        '^' => Exp,
        '*' | '/' | '%' | '×' | '÷' | '⋅' | '⊗' | '⊘' => MulDiv,
        '+' | '-' | '~' | '¬' | '±' | '⊕' | '⊖' => AddSub,
        '<' | '>' | '≤' | '≥' | '∈' | '∉' | '⊂' | '⊃' | '∩' | '∪' => Compare,
        '!' | '=' | '≠' | '≡' => Inequal,
        '&' | '∧' => And,
        '|' | '∨' => Or,
        '$' => Dollar,
        '←' | '→' | '↔' | '⇜' | '⇝' => LrArrow,
        '⇐' | '⇒' | '⇔' => EqArrow,
        _ => Comma,
    }
}

/// The identifier class of a name, decided by its first code point.
///
/// Wildcards and the names the lowerer synthesizes (they contain spaces and
/// start with `_`) count as lower-case.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdKind {
    Lower,
    Upper,
    Operator,
}

pub fn lex_kind(name: &str) -> IdKind {
    match name.chars().next() {
        Some(character) if character.is_lowercase() || character == '_' => IdKind::Lower,
        Some(character) if character.is_uppercase() => IdKind::Upper,
        _ => IdKind::Operator,
    }
}

pub fn is_lower(name: &str) -> bool {
    lex_kind(name) == IdKind::Lower
}

pub fn is_upper(name: &str) -> bool {
    lex_kind(name) == IdKind::Upper
}

pub fn is_operator(name: &str) -> bool {
    lex_kind(name) == IdKind::Operator
}

/// Recover the name of an identifier or operator token from its source text.
pub fn relex_id(text: &str) -> String {
    text.to_owned()
}

/// Recover the text value of a (piece of a) double-quoted string literal.
///
/// The delimiters implied by `kind` are stripped when present (they are
/// absent on tokens recovered from unterminated literals) and the escape
/// sequences are decoded. On an invalid escape the byte offset of its
/// backslash inside `text` is returned.
pub fn relex_string(kind: TokenKind, text: &str) -> Result<String, usize> {
    decode_escapes(strip_delimiters(kind, text))
}

/// Recover the value of a raw `'…'` string literal.
///
/// Only `\'` and `\\` are decoded; everything else is kept verbatim.
pub fn relex_raw(text: &str) -> String {
    let text = strip_delimiters(TokenKind::StrRaw, text);

    let mut value = String::with_capacity(text.len());
    let mut characters = text.chars();
    while let Some(character) = characters.next() {
        if character == '\\' {
            match characters.next() {
                Some(next @ ('\'' | '\\')) => value.push(next),
                Some(next) => {
                    value.push('\\');
                    value.push(next);
                }
                None => value.push('\\'),
            }
        } else {
            value.push(character);
        }
    }
    value
}

/// Recover the pattern of a (piece of a) regex literal.
///
/// Only `` \` `` is decoded; remaining escapes belong to the regex engine.
pub fn relex_regex(kind: TokenKind, text: &str) -> String {
    let text = strip_delimiters(kind, text);

    let mut value = String::with_capacity(text.len());
    let mut characters = text.chars();
    while let Some(character) = characters.next() {
        if character == '\\' {
            match characters.next() {
                Some('`') => value.push('`'),
                Some(next) => {
                    value.push('\\');
                    value.push(next);
                }
                None => value.push('\\'),
            }
        } else {
            value.push(character);
        }
    }
    value
}

fn strip_delimiters(kind: TokenKind, text: &str) -> &str {
    use TokenKind::*;

    let (leading, trailing) = match kind {
        StrRaw => ("'", "'"),
        StrSingle => ("\"", "\""),
        StrOpen => ("\"", "{"),
        StrMid => ("}", "{"),
        StrClose => ("}", "\""),
        RegSingle => ("`", "`"),
        RegOpen => ("`", "${"),
        RegMid => ("}", "${"),
        RegClose => ("}", "`"),
        _ => return text,
    };

    // the trailing delimiter is absent on unterminated literals
    let text = text.strip_prefix(leading).unwrap_or(text);
    text.strip_suffix(trailing).unwrap_or(text)
}

fn decode_escapes(text: &str) -> Result<String, usize> {
    let mut value = String::with_capacity(text.len());
    let mut characters = text.char_indices();

    while let Some((offset, character)) = characters.next() {
        if character != '\\' {
            value.push(character);
            continue;
        }

        let decoded = match characters.next() {
            Some((_, 'a')) => Some('\x07'),
            Some((_, 'b')) => Some('\x08'),
            Some((_, 'f')) => Some('\x0c'),
            Some((_, 'n')) => Some('\n'),
            Some((_, 'r')) => Some('\r'),
            Some((_, 't')) => Some('\t'),
            Some((_, 'v')) => Some('\x0b'),
            Some((_, next @ ('\\' | '\'' | '"' | '{' | '}' | '`'))) => Some(next),
            Some((_, 'x')) => decode_codepoint(&mut characters, 2),
            Some((_, 'u')) => decode_codepoint(&mut characters, 4),
            Some((_, 'U')) => decode_codepoint(&mut characters, 8),
            _ => None,
        };

        match decoded {
            Some(decoded) => value.push(decoded),
            None => return Err(offset),
        }
    }

    Ok(value)
}

fn decode_codepoint(characters: &mut std::str::CharIndices<'_>, digits: u32) -> Option<char> {
    let mut code = 0;
    for _ in 0..digits {
        let (_, digit) = characters.next()?;
        code = code * 16 + digit.to_digit(16)?;
    }
    char::from_u32(code)
}

/// Render a source snippet for inclusion in a diagnostic: at most the first
/// and last 10 code points with `..` eliding the middle, control characters
/// escaped. This rendering is stable; test suites compare it verbatim.
pub fn render_snippet(text: &str) -> String {
    use std::fmt::Write;

    let mut out = String::from("'");

    let codepoints = text.chars().count();
    let (skip_start, skip_end) = if codepoints > 20 {
        (9, codepoints - 9)
    } else {
        (codepoints, codepoints)
    };

    for (index, character) in text.chars().enumerate() {
        if index < skip_start || index >= skip_end {
            let code = character as u32;
            if !character.is_control() {
                out.push(character);
            } else if code > 0xffff {
                write!(out, "\\U{code:08x}").unwrap();
            } else if code > 0xff {
                write!(out, "\\u{code:04x}").unwrap();
            } else {
                match character {
                    '\x07' => out.push_str("\\a"),
                    '\x08' => out.push_str("\\b"),
                    '\x0c' => out.push_str("\\f"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    '\x0b' => out.push_str("\\v"),
                    _ => write!(out, "\\x{code:02x}").unwrap(),
                }
            }
        } else if index == skip_start {
            out.push_str("..");
        }
    }

    out.push('\'');
    out
}
