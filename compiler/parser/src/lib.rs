//! The parser.
//!
//! A pull parser over the layout-filtered token stream that builds the flat
//! [concrete syntax tree](cst). Expressions use precedence climbing over the
//! operator classes (the class, and thereby the precedence, of an operator
//! is decided by its first code point); everything else is predictive.
//!
//! The parser exposes its state to the scan driver through [`ParserState`]:
//! the layout filter asks whether a newline is significant at the current
//! position, and the `}` disambiguation asks whether a string or regex
//! continuation could be shifted. Both queries are answered from a small
//! stack of delimiter frames, not from global state.
//!
//! Errors never abort a parse. An unexpected token is reported together
//! with the expectations collected since the last shift, an `ERROR` node
//! is materialised over the skipped region, and parsing resumes at the next
//! statement boundary or at the closing of the current bracket.

use cst::{node, Cst, CstBuilder};
use diagnostics::Reporter;
use layout::TokenSource;
use lexer::{Token, TokenKind};
use span::{LocalSpan, SourceFile};
use std::fmt;
use utilities::{Conjunction, ListingExt};

pub mod cst;
mod layout;

#[cfg(test)]
mod test;

/// The precedence of juxtaposition (function application).
pub const APP_PRECEDENCE: i32 = 14;

/// The parser's answer to "could this token be shifted right now?".
///
/// Passed to the scan driver explicitly; the parser state is never global.
pub trait ParserState {
    fn can_shift(&self, kind: TokenKind) -> bool;
}

/// Parse one source file into a concrete syntax tree.
///
/// The file's newline table is rebuilt as a side effect. Problems are
/// reported and recovered from; the returned tree is complete but may
/// contain `ERROR` nodes.
pub fn parse(file: &mut SourceFile, reporter: &Reporter) -> Cst {
    Parser::new(file, reporter).parse()
}

/// `(precedence, rightward step)` of a binary operator class; the step is 1
/// for left-associative classes.
const fn operator_info(kind: TokenKind) -> Option<(i32, i32)> {
    use TokenKind::*;

    Some(match kind {
        Dot => (16, 1),
        Quant => (15, 1),
        Exp => (13, 0),
        MulDiv => (12, 1),
        AddSub => (11, 1),
        Compare => (10, 1),
        Inequal => (9, 1),
        And => (8, 1),
        Or => (7, 1),
        Dollar => (6, 1),
        LrArrow => (5, 0),
        EqArrow => (4, 0),
        Colon => (3, 0),
        Comma => (2, 0),
        _ => return None,
    })
}

fn starts_operand(kind: TokenKind) -> bool {
    use TokenKind::*;

    matches!(
        kind,
        Id | Hole
            | Integer
            | Double
            | StrRaw
            | StrSingle
            | StrOpen
            | RegSingle
            | RegOpen
            | Here
            | Backslash
            | Match
            | If
            | Prim
            | Subscribe
            | OpeningRoundBracket
    )
}

fn starts_pattern(kind: TokenKind) -> bool {
    use TokenKind::*;

    matches!(
        kind,
        Id | Hole | Integer | Double | StrRaw | StrSingle | RegSingle | OpeningRoundBracket
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Round,
    Square,
    StrInterp,
    RegInterp,
    Lines,
}

/// The delimiter frames and operand flag that answer shift queries.
#[derive(Default)]
struct Context {
    frames: Vec<Frame>,
    /// Whether the last shifted token can end an operand.
    operand: bool,
}

impl Context {
    fn track(&mut self, kind: TokenKind) {
        use TokenKind::*;

        match kind {
            OpeningRoundBracket => self.frames.push(Frame::Round),
            OpeningSquareBracket => self.frames.push(Frame::Square),
            StrOpen => self.frames.push(Frame::StrInterp),
            RegOpen => self.frames.push(Frame::RegInterp),
            Indent => self.frames.push(Frame::Lines),
            ClosingRoundBracket => self.pop(Frame::Round),
            ClosingSquareBracket => self.pop(Frame::Square),
            StrClose => self.pop(Frame::StrInterp),
            RegClose => self.pop(Frame::RegInterp),
            Dedent => self.pop(Frame::Lines),
            _ => {}
        }

        self.operand = matches!(
            kind,
            Id | Hole
                | Integer
                | Double
                | StrRaw
                | StrSingle
                | StrClose
                | RegSingle
                | RegClose
                | Here
                | ClosingRoundBracket
                | ClosingSquareBracket
                | Dedent
        );
    }

    fn pop(&mut self, frame: Frame) {
        // stay robust on unbalanced input
        if self.frames.last() == Some(&frame) {
            self.frames.pop();
        }
    }
}

impl ParserState for Context {
    fn can_shift(&self, kind: TokenKind) -> bool {
        use TokenKind::*;

        match kind {
            Newline => matches!(self.frames.last(), None | Some(Frame::Lines)),
            StrMid | StrClose => self.operand && self.frames.last() == Some(&Frame::StrInterp),
            RegMid | RegClose => self.operand && self.frames.last() == Some(&Frame::RegInterp),
            _ => false,
        }
    }
}

enum Expectation {
    Token(TokenKind),
    Declaration,
    Expression,
    Pattern,
}

impl From<TokenKind> for Expectation {
    fn from(kind: TokenKind) -> Self {
        Self::Token(kind)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(kind) => write!(f, "{kind}"),
            Self::Declaration => f.write_str("declaration"),
            Self::Expression => f.write_str("expression"),
            Self::Pattern => f.write_str("pattern"),
        }
    }
}

struct Parser<'a> {
    source: TokenSource<'a>,
    builder: CstBuilder,
    context: Context,
    reporter: &'a Reporter,
    ahead: Option<Token>,
    expectations: Vec<Expectation>,
}

impl<'a> Parser<'a> {
    fn new(file: &'a mut SourceFile, reporter: &'a Reporter) -> Self {
        Self {
            source: TokenSource::new(file, reporter),
            builder: CstBuilder::new(),
            context: Context::default(),
            reporter,
            ahead: None,
            expectations: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // token plumbing

    fn peek(&mut self) -> Token {
        if self.ahead.is_none() {
            self.ahead = Some(self.source.next(&self.context, &mut self.builder));
        }
        self.ahead.unwrap()
    }

    fn token(&mut self) -> TokenKind {
        self.peek().kind
    }

    /// Shift the current token.
    fn advance(&mut self) -> Token {
        let token = self.peek();
        self.ahead = None;
        self.expectations.clear();
        self.context.track(token.kind);
        token
    }

    /// Register an expectation for the error message of this position.
    fn expected(&mut self, expectation: impl Into<Expectation>) {
        self.expectations.push(expectation.into());
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        if self.token() == kind {
            true
        } else {
            self.expected(kind);
            false
        }
    }

    /// Shift the current token if it has the given kind.
    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Like [`Self::consume`] but reports an error when the token is absent.
    /// The token is not invented; parsing continues without it.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.token() == kind {
            Some(self.advance())
        } else {
            self.expected(kind);
            self.error();
            None
        }
    }

    /// Report the current token as unexpected, listing the expectations
    /// collected since the last shift.
    fn error(&mut self) {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::EndOfInput => "end of input".to_owned(),
            TokenKind::Indent => "increased indentation".to_owned(),
            TokenKind::Dedent => "decreased indentation".to_owned(),
            TokenKind::Newline => "end of line".to_owned(),
            _ => self.source.render(token.span),
        };

        let expectations = std::mem::take(&mut self.expectations);
        let listing = expectations.iter().list(Conjunction::Or);
        let message = if listing.is_empty() {
            format!("syntax error; found {found}")
        } else {
            format!("syntax error; found {found}, was expecting {listing}")
        };

        self.reporter.error(self.source.global(token.span), message);
    }

    /// Skip to the next resynchronization point (a newline at the statement
    /// level or the closing of the current bracket) and materialise an
    /// `ERROR` node over the skipped region.
    fn recover(&mut self) {
        use TokenKind::*;

        let start = self.peek().span.start;
        let mut end = start;
        let mut depth = 0i32;

        loop {
            let kind = self.token();
            let closes = matches!(
                kind,
                ClosingRoundBracket | ClosingSquareBracket | Dedent | StrMid | StrClose | RegMid
                    | RegClose
            );

            if kind == EndOfInput
                || (depth == 0 && (kind == Newline || closes))
            {
                break;
            }

            if matches!(kind, OpeningRoundBracket | OpeningSquareBracket | Indent) {
                depth += 1;
            } else if closes {
                depth -= 1;
            }

            end = self.advance().span.end;
        }

        self.builder.leaf(node::ERROR, LocalSpan::new(start, end));
    }

    // ------------------------------------------------------------------
    // top level

    fn parse(mut self) -> Cst {
        use TokenKind::*;

        let mut children = 0;

        loop {
            match self.token() {
                EndOfInput => break,
                Newline | Dedent => {
                    self.advance();
                }
                Package => {
                    self.parse_package();
                    children += 1 + self.end_top_form();
                }
                From => {
                    self.parse_from();
                    children += 1 + self.end_top_form();
                }
                Global | Export | Topic | Data | Tuple | Def | Target | Publish => {
                    self.parse_top_definition();
                    children += 1 + self.end_top_form();
                }
                _ => {
                    self.expected(Expectation::Declaration);
                    self.error();
                    self.recover();
                    children += 1 + self.end_top_form();
                }
            }
        }

        let length = self.source.file_length();
        self.builder.node(node::TOP, children, Some(0), Some(length));
        self.builder.freeze()
    }

    /// Consume the newline terminating a top-level form. Extra material on
    /// the line is skipped into an `ERROR` node (returned as a child count).
    fn end_top_form(&mut self) -> usize {
        match self.token() {
            TokenKind::Newline => {
                self.advance();
                0
            }
            TokenKind::EndOfInput => 0,
            _ => {
                self.expected(TokenKind::Newline);
                self.error();

                // skip the rest of the line unconditionally; unlike
                // `recover`, closing tokens must not stall progress here
                let start = self.peek().span.start;
                let mut end = start;
                while !matches!(self.token(), TokenKind::Newline | TokenKind::EndOfInput) {
                    end = self.advance().span.end;
                }
                self.builder.leaf(node::ERROR, LocalSpan::new(start, end));

                if self.token() == TokenKind::Newline {
                    self.advance();
                }
                1
            }
        }
    }

    fn parse_package(&mut self) {
        let keyword = self.advance();
        self.expect_identifier();
        self.builder.node(node::PACKAGE, 1, Some(keyword.span.start), None);
    }

    /// `from PKG import …` and `from PKG export …`.
    fn parse_from(&mut self) {
        use TokenKind::*;

        let keyword = self.advance();
        self.expect_identifier();
        let mut children = 1;

        let id = match self.token() {
            Import => {
                self.advance();
                node::IMPORT
            }
            Export => {
                self.advance();
                node::EXPORT
            }
            _ => {
                self.expected(Import);
                self.expected(Export);
                self.error();
                node::IMPORT
            }
        };

        if matches!(self.token(), Def | Type | Topic) {
            let token = self.advance();
            self.builder.leaf(node::KIND, token.span);
            children += 1;
        }

        if matches!(self.token(), Unary | Binary) {
            let token = self.advance();
            self.builder.leaf(node::ARITY, token.span);
            children += 1;
        }

        // name list; empty means a wildcard import
        loop {
            if !self.identifier_or_operator() {
                break;
            }

            if self.token() == Equals {
                self.advance();
                if self.identifier_or_operator() {
                    self.builder.node(node::IDEQ, 2, None, None);
                } else {
                    self.expected(Id);
                    self.error();
                    self.builder.node(node::IDEQ, 1, None, None);
                }
            } else {
                self.builder.node(node::IDEQ, 1, None, None);
            }
            children += 1;
        }

        self.builder.node(id, children, Some(keyword.span.start), None);
    }

    /// Shift an identifier or operator token into an `ID`/`OP` leaf node.
    fn identifier_or_operator(&mut self) -> bool {
        let token = self.peek();
        if token.kind == TokenKind::Id {
            self.advance();
            self.builder.leaf(node::ID, token.span);
            true
        } else if token.kind.is_operator() {
            self.advance();
            self.builder.leaf(node::OP, token.span);
            true
        } else {
            false
        }
    }

    /// An identifier in a position that requires one. Recovers into an
    /// `ERROR` node so that exactly one subtree is produced either way.
    fn expect_identifier(&mut self) {
        let token = self.peek();
        if token.kind == TokenKind::Id {
            self.advance();
            self.builder.leaf(node::ID, token.span);
        } else {
            self.expected(TokenKind::Id);
            self.error();
            self.recover();
        }
    }

    /// `global`/`export` flags and the definition they precede.
    fn parse_top_definition(&mut self) {
        use TokenKind::*;

        let flags = self.parse_flags();

        match self.token() {
            Topic => self.parse_topic(flags),
            Data => self.parse_data(flags),
            Tuple => self.parse_tuple(flags),
            Def => self.parse_def(flags),
            Target => self.parse_target(flags),
            Publish => self.parse_publish(flags),
            _ => {
                self.expected(Def);
                self.expected(Target);
                self.expected(Topic);
                self.expected(Data);
                self.expected(Tuple);
                self.error();
                self.recover();
                self.builder.node(node::ERROR, flags + 1, None, None);
            }
        }
    }

    fn parse_flags(&mut self) -> usize {
        let mut count = 0;

        if self.token() == TokenKind::Global {
            let token = self.advance();
            self.builder.leaf(node::FLAG_GLOBAL, token.span);
            count += 1;
        }
        if self.token() == TokenKind::Export {
            let token = self.advance();
            self.builder.leaf(node::FLAG_EXPORT, token.span);
            count += 1;
        }

        count
    }

    fn begin_unless(&self, flags: usize, keyword: Token) -> Option<u32> {
        (flags == 0).then_some(keyword.span.start)
    }

    fn parse_topic(&mut self, flags: usize) {
        let keyword = self.advance();
        self.expect_identifier();
        self.expect(TokenKind::Colon);
        self.parse_pattern(0);
        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::TOPIC, flags + 2, begin, None);
    }

    fn parse_data(&mut self, flags: usize) {
        let keyword = self.advance();
        self.parse_pattern(0);
        let mut children = flags + 1;
        self.expect(TokenKind::Equals);

        if self.token() == TokenKind::Indent {
            self.advance();
            self.consume(TokenKind::Newline);
            children += self.parse_line_list(Self::parse_constructor_line);
        } else {
            children += self.parse_constructor_line();
        }

        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::DATA, children, begin, None);
    }

    /// Constructors on one line, separated by `|`.
    fn parse_constructor_line(&mut self) -> usize {
        let mut count = 0;
        loop {
            self.parse_pattern(8);
            count += 1;
            if self.token() == TokenKind::Or {
                self.advance();
            } else {
                return count;
            }
        }
    }

    fn parse_tuple(&mut self, flags: usize) {
        let keyword = self.advance();
        self.parse_pattern(0);
        let mut children = flags + 1;
        self.expect(TokenKind::Equals);

        if self.token() == TokenKind::Indent {
            self.advance();
            self.consume(TokenKind::Newline);
            children += self.parse_line_list(Self::parse_tuple_element_line);
        } else {
            children += self.parse_tuple_element_line();
        }

        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::TUPLE, children, begin, None);
    }

    /// Tuple members on one line, separated by `,`.
    fn parse_tuple_element_line(&mut self) -> usize {
        let mut count = 0;
        loop {
            let flags = self.parse_flags();
            self.parse_pattern(3);
            self.builder.node(node::TUPLE_ELT, flags + 1, None, None);
            count += 1;
            if self.token() == TokenKind::Comma {
                self.advance();
            } else {
                return count;
            }
        }
    }

    /// One entry per line until the matching `DEDENT`.
    fn parse_line_list(&mut self, mut line: impl FnMut(&mut Self) -> usize) -> usize {
        use TokenKind::*;

        let mut children = 0;
        loop {
            children += line(self);

            match self.token() {
                Dedent => {
                    self.advance();
                    return children;
                }
                Newline => {
                    self.advance();
                    if self.token() == Dedent {
                        self.advance();
                        return children;
                    }
                }
                EndOfInput => return children,
                _ => {
                    self.expected(Newline);
                    self.expected(Dedent);
                    self.error();
                    self.recover();
                    children += 1;
                    if self.token() == Newline {
                        self.advance();
                    }
                }
            }
        }
    }

    fn parse_def(&mut self, flags: usize) {
        let keyword = self.advance();
        self.parse_pattern(0);
        self.expect(TokenKind::Equals);
        self.parse_block();
        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::DEF, flags + 2, begin, None);
    }

    fn parse_target(&mut self, flags: usize) {
        let keyword = self.advance();
        self.parse_pattern(0);
        let mut children = flags + 1;

        if self.token() == TokenKind::Backslash {
            self.advance();
            self.parse_pattern(APP_PRECEDENCE);
            children += 1;
        }

        self.expect(TokenKind::Equals);
        self.parse_block();
        children += 1;

        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::TARGET, children, begin, None);
    }

    fn parse_publish(&mut self, flags: usize) {
        let keyword = self.advance();
        self.parse_pattern(0);
        self.expect(TokenKind::Equals);
        self.parse_block();
        let begin = self.begin_unless(flags, keyword);
        self.builder.node(node::PUBLISH, flags + 2, begin, None);
    }

    // ------------------------------------------------------------------
    // blocks

    /// An indented block with leading definitions, or a plain expression.
    fn parse_block(&mut self) {
        if self.token() == TokenKind::Indent {
            let indent = self.advance();
            self.consume(TokenKind::Newline);
            let children = self.parse_block_body();
            let end = self
                .expect(TokenKind::Dedent)
                .map(|dedent| dedent.span.end);
            self.builder.node(node::BLOCK, children, Some(indent.span.start), end);
        } else {
            self.parse_expr(0);
        }
    }

    /// Leading `from`/`def`/`target` forms, then a `require` chain or the
    /// block's result expression.
    fn parse_block_body(&mut self) -> usize {
        use TokenKind::*;

        let mut children = 0;

        loop {
            match self.token() {
                From => {
                    self.parse_from();
                    children += 1;
                    self.end_statement();
                }
                Def => {
                    self.parse_def(0);
                    children += 1;
                    self.end_statement();
                }
                Target => {
                    self.parse_target(0);
                    children += 1;
                    self.end_statement();
                }
                Require => {
                    self.parse_require();
                    return children + 1;
                }
                Newline => {
                    self.advance();
                }
                _ => {
                    self.parse_expr(0);
                    return children + 1;
                }
            }
        }
    }

    fn end_statement(&mut self) {
        if self.token() == TokenKind::Newline {
            self.advance();
        }
    }

    /// `require pattern = rhs [else otherwise]` followed by the rest of the
    /// enclosing block, which becomes the require's body.
    fn parse_require(&mut self) {
        let keyword = self.advance();
        self.parse_pattern(0);
        self.expect(TokenKind::Equals);
        self.parse_block();
        let mut children = 2;

        self.end_statement();

        if self.token() == TokenKind::Else {
            self.advance();
            self.parse_block();
            children += 1;
            self.end_statement();
        }

        let body = self.parse_block_body();
        self.builder.node(node::BLOCK, body, None, None);
        children += 1;

        self.builder.node(node::REQUIRE, children, Some(keyword.span.start), None);
    }

    // ------------------------------------------------------------------
    // expressions

    fn parse_expr(&mut self, min: i32) {
        self.parse_unary(min);

        loop {
            let kind = self.token();

            if let Some((precedence, step)) = operator_info(kind) {
                if precedence < min {
                    return;
                }
                let op = self.advance();
                self.builder.leaf(node::OP, op.span);
                if kind == TokenKind::Colon {
                    // the right-hand side of an ascription is a type
                    self.parse_pattern(precedence + step);
                } else {
                    self.parse_expr(precedence + step);
                }
                self.builder.node(node::BINARY, 3, None, None);
            } else if starts_operand(kind) {
                if APP_PRECEDENCE < min {
                    return;
                }
                self.parse_expr(APP_PRECEDENCE + 1);
                self.builder.node(node::APP, 2, None, None);
            } else {
                return;
            }
        }
    }

    fn parse_unary(&mut self, min: i32) {
        use TokenKind::*;

        let token = self.peek();
        match token.kind {
            kind if operator_info(kind).is_some() => {
                let (precedence, step) = operator_info(kind).unwrap();
                if precedence < min {
                    self.precedence_error(token);
                }
                self.advance();
                self.builder.leaf(node::OP, token.span);
                self.parse_expr(precedence + step);
                self.builder.node(node::UNARY, 2, None, None);
            }
            Id => {
                self.advance();
                self.builder.leaf(node::ID, token.span);
            }
            Hole => {
                self.advance();
                self.builder.leaf(node::HOLE, token.span);
            }
            Integer | Double | StrRaw | StrSingle | RegSingle | Here => {
                self.advance();
                self.builder.leaf(node::LITERAL, token.span);
            }
            StrOpen => self.parse_interpolate(StrMid, StrClose),
            RegOpen => self.parse_interpolate(RegMid, RegClose),
            Backslash => self.parse_lambda(min),
            Match => self.parse_match(min),
            If => self.parse_if(min),
            Prim => self.parse_prim(min),
            Subscribe => self.parse_subscribe(min),
            OpeningRoundBracket => {
                let open = self.advance();
                self.parse_block();
                let end = self
                    .expect(ClosingRoundBracket)
                    .map(|close| close.span.end);
                self.builder.node(node::PAREN, 1, Some(open.span.start), end);
            }
            _ => {
                self.expected(Expectation::Expression);
                self.error();
                self.recover();
            }
        }
    }

    /// A prefix form (`match`, `\`, `if`, `prim`, `subscribe`) or a unary
    /// operator is only legal where the lowest precedence is acceptable.
    fn precedence_error(&mut self, token: Token) {
        self.reporter.error(
            self.source.global(token.span),
            format!(
                "lower precedence unary operator {} must use ()s",
                self.source.render(token.span),
            ),
        );
    }

    /// `"…{expr}…{expr}…"` and the regex analogue: pieces wrapped in
    /// `LITERAL` nodes interleaved with the embedded expressions.
    fn parse_interpolate(&mut self, mid: TokenKind, close: TokenKind) {
        let open = self.advance();
        self.builder.leaf(node::LITERAL, open.span);
        let mut children = 1;

        loop {
            self.parse_expr(0);
            children += 1;

            let kind = self.token();
            if kind == mid {
                let token = self.advance();
                self.builder.leaf(node::LITERAL, token.span);
                children += 1;
            } else if kind == close {
                let token = self.advance();
                self.builder.leaf(node::LITERAL, token.span);
                children += 1;
                break;
            } else {
                self.expected(close);
                self.error();
                self.recover();
                children += 1;
                break;
            }
        }

        self.builder.node(node::INTERPOLATE, children, Some(open.span.start), None);
    }

    fn parse_lambda(&mut self, min: i32) {
        let backslash = self.peek();
        if min > 0 {
            self.precedence_error(backslash);
        }
        self.advance();

        self.parse_pattern(APP_PRECEDENCE + 1);
        self.parse_expr(1);
        self.builder.node(node::LAMBDA, 2, Some(backslash.span.start), None);
    }

    fn parse_match(&mut self, min: i32) {
        use TokenKind::*;

        let keyword = self.peek();
        if min > 0 {
            self.precedence_error(keyword);
        }
        self.advance();

        // scrutinees are application arguments; parenthesise to match on
        // an application or operator expression
        let mut scrutinees = 0;
        loop {
            self.parse_expr(APP_PRECEDENCE + 1);
            scrutinees += 1;

            let kind = self.token();
            if kind == Indent {
                self.advance();
                break;
            }
            if starts_operand(kind) || operator_info(kind).is_some() {
                continue;
            }

            self.expected(Indent);
            self.error();
            self.recover();
            self.builder.node(node::MATCH, scrutinees + 1, Some(keyword.span.start), None);
            return;
        }

        self.consume(Newline);

        let mut children = scrutinees;
        loop {
            self.parse_case(scrutinees > 1);
            children += 1;

            match self.token() {
                Dedent => {
                    self.advance();
                    break;
                }
                Newline => {
                    self.advance();
                    if self.token() == Dedent {
                        self.advance();
                        break;
                    }
                }
                EndOfInput => break,
                _ => {
                    self.expected(Newline);
                    self.expected(Dedent);
                    self.error();
                    self.recover();
                    children += 1;
                    break;
                }
            }
        }

        self.builder.node(node::MATCH, children, Some(keyword.span.start), None);
    }

    /// One match arm: patterns, an optional `if` guard, `=`, the body.
    fn parse_case(&mut self, multiarg: bool) {
        let mut children = 0;

        if multiarg {
            loop {
                self.parse_pattern(APP_PRECEDENCE + 1);
                children += 1;
                if !starts_pattern(self.token()) {
                    break;
                }
            }
        } else {
            self.parse_pattern(0);
            children += 1;
        }

        if self.token() == TokenKind::If {
            self.advance();
            self.parse_block();
            self.builder.node(node::GUARD, 1, None, None);
            children += 1;
            self.end_statement();
        }

        self.expect(TokenKind::Equals);
        self.parse_block();
        children += 1;

        self.builder.node(node::CASE, children, None, None);
    }

    fn parse_if(&mut self, min: i32) {
        let keyword = self.peek();
        if min > 0 {
            self.precedence_error(keyword);
        }
        self.advance();

        self.parse_block();
        self.end_statement();
        self.expect(TokenKind::Then);
        self.parse_block();
        self.end_statement();
        self.expect(TokenKind::Else);
        self.parse_block();

        self.builder.node(node::IF, 3, Some(keyword.span.start), None);
    }

    fn parse_prim(&mut self, min: i32) {
        let keyword = self.peek();
        if min > 0 {
            self.precedence_error(keyword);
        }
        self.advance();

        let token = self.peek();
        if matches!(token.kind, TokenKind::StrSingle | TokenKind::StrRaw) {
            self.advance();
            self.builder.leaf(node::LITERAL, token.span);
        } else {
            self.expected(TokenKind::StrSingle);
            self.error();
            self.recover();
        }

        self.builder.node(node::PRIM, 1, Some(keyword.span.start), None);
    }

    fn parse_subscribe(&mut self, min: i32) {
        let keyword = self.peek();
        if min > 0 {
            self.precedence_error(keyword);
        }
        self.advance();

        self.expect_identifier();
        self.builder.node(node::SUBSCRIBE, 1, Some(keyword.span.start), None);
    }

    // ------------------------------------------------------------------
    // patterns and types

    /// The restricted expression grammar shared by definition left-hand
    /// sides, match patterns, and type signatures: identifiers, holes,
    /// literals, parentheses, operators and application. Semantic
    /// restrictions (where literals or holes are legal) are enforced by the
    /// lowering pass, which sees the same nodes.
    fn parse_pattern(&mut self, min: i32) {
        self.parse_pattern_unary(min);

        loop {
            let kind = self.token();

            if let Some((precedence, step)) = operator_info(kind) {
                if precedence < min {
                    return;
                }
                let op = self.advance();
                self.builder.leaf(node::OP, op.span);
                self.parse_pattern(precedence + step);
                self.builder.node(node::BINARY, 3, None, None);
            } else if starts_pattern(kind) {
                if APP_PRECEDENCE < min {
                    return;
                }
                self.parse_pattern(APP_PRECEDENCE + 1);
                self.builder.node(node::APP, 2, None, None);
            } else {
                return;
            }
        }
    }

    fn parse_pattern_unary(&mut self, min: i32) {
        use TokenKind::*;

        let token = self.peek();
        match token.kind {
            kind if operator_info(kind).is_some() => {
                let (precedence, step) = operator_info(kind).unwrap();
                if precedence < min {
                    self.precedence_error(token);
                }
                self.advance();
                self.builder.leaf(node::OP, token.span);
                self.parse_pattern(precedence + step);
                self.builder.node(node::UNARY, 2, None, None);
            }
            Id => {
                self.advance();
                self.builder.leaf(node::ID, token.span);
            }
            Hole => {
                self.advance();
                self.builder.leaf(node::HOLE, token.span);
            }
            Integer | Double | StrRaw | StrSingle | RegSingle => {
                self.advance();
                self.builder.leaf(node::LITERAL, token.span);
            }
            OpeningRoundBracket => {
                let open = self.advance();
                self.parse_pattern(0);
                let end = self
                    .expect(ClosingRoundBracket)
                    .map(|close| close.span.end);
                self.builder.node(node::PAREN, 1, Some(open.span.start), end);
            }
            _ => {
                self.expected(Expectation::Pattern);
                self.error();
                self.recover();
            }
        }
    }
}
