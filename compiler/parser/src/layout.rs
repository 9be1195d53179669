//! The scan driver and whitespace layout filter.
//!
//! Significant whitespace is not context-free, so it is handled here, between
//! the lexer and the grammar: `INDENT` and `DEDENT` tokens are injected at
//! the first non-blank, non-comment token of each line by comparing the
//! line's leading whitespace against a stack of indent prefixes. Indents are
//! compared *as strings*, not column counts: a line continues a block only if
//! the block's indent is a byte prefix of the line's, which rejects
//! inconsistent mixing of tabs and spaces while allowing either uniformly.
//!
//! A newline is only passed through when the parser reports it could shift
//! one; the same query (on [`TokenKind::StrClose`] / [`TokenKind::RegClose`])
//! selects the scanner used for a `}` byte, re-entering interpolated string
//! or regex literals.

use crate::{cst::CstBuilder, ParserState};
use diagnostics::Reporter;
use lexer::{Token, TokenKind};
use span::{LocalSpan, SourceFile, Span};
use std::collections::VecDeque;

pub(crate) struct TokenSource<'a> {
    file: &'a mut SourceFile,
    reporter: &'a Reporter,
    /// Scan position: the end of the last scanned token.
    cursor: u32,
    state: State,
    /// The last newline token.
    newline: LocalSpan,
    /// The whitespace that followed it.
    whitespace: LocalSpan,
    /// The current indent prefix (a span into an earlier line).
    indent: LocalSpan,
    /// Lengths of the enclosing indent prefixes.
    stack: Vec<u32>,
    pending: VecDeque<Pending>,
    finished: bool,
    eof: LocalSpan,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Newline,
    NewlineWs,
}

enum Pending {
    Token(Token),
    /// A newline that is only delivered if the parser can shift it at the
    /// moment it reaches the front of the queue.
    MaybeNewline(LocalSpan),
}

impl<'a> TokenSource<'a> {
    pub(crate) fn new(file: &'a mut SourceFile, reporter: &'a Reporter) -> Self {
        file.clear_newlines();

        Self {
            file,
            reporter,
            cursor: 0,
            state: State::Idle,
            newline: LocalSpan::empty(0),
            whitespace: LocalSpan::empty(0),
            indent: LocalSpan::empty(0),
            stack: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
            eof: LocalSpan::empty(0),
        }
    }

    pub(crate) fn file_length(&self) -> u32 {
        self.file.local_span().end
    }

    pub(crate) fn global(&self, span: LocalSpan) -> Span {
        span.global(self.file)
    }

    pub(crate) fn render(&self, span: LocalSpan) -> String {
        lexer::render_snippet(&self.file[span])
    }

    pub(crate) fn next(&mut self, state: &impl ParserState, builder: &mut CstBuilder) -> Token {
        loop {
            while let Some(front) = self.pending.pop_front() {
                match front {
                    Pending::Token(token) => return token,
                    Pending::MaybeNewline(span) => {
                        if state.can_shift(TokenKind::Newline) {
                            return Token::new(TokenKind::Newline, span);
                        }
                    }
                }
            }

            if self.finished {
                return Token::new(TokenKind::EndOfInput, self.eof);
            }

            let token = self.scan(state);
            self.cursor = token.span.end;
            builder.add_token(token);

            if !token.ok {
                self.reporter.error(
                    self.global(token.span),
                    format!(
                        "syntax error; found illegal token {}, but handling it like:\n    {}",
                        self.render(token.span),
                        token.kind.example(),
                    ),
                );
            }

            match self.state {
                State::Idle => match token.kind {
                    // do not attempt to parse whitespace or comments
                    TokenKind::Whitespace | TokenKind::Comment => continue,
                    TokenKind::Newline => {
                        self.file.add_newline(token.span.end);
                        self.newline = token.span;
                        self.state = State::Newline;
                        continue;
                    }
                    _ => {}
                },
                State::Newline if token.kind == TokenKind::Whitespace => {
                    self.whitespace = token.span;
                    self.state = State::NewlineWs;
                    continue;
                }
                State::NewlineWs if token.kind == TokenKind::Whitespace => {
                    // a stray carriage return splits the run in two
                    self.whitespace = LocalSpan::new(self.whitespace.start, token.span.end);
                    continue;
                }
                State::Newline | State::NewlineWs => {
                    if self.state == State::Newline {
                        // no leading whitespace: the line starts at column 1
                        self.whitespace = LocalSpan::empty(self.newline.end);
                    }

                    match token.kind {
                        TokenKind::Newline => {
                            // a completely blank line never changes indentation
                            self.file.add_newline(token.span.end);
                            self.newline = token.span;
                            self.state = State::Newline;
                            continue;
                        }
                        TokenKind::Comment => {
                            // neither does a comment-only line
                            self.state = State::Idle;
                            continue;
                        }
                        _ => {
                            self.state = State::Idle;
                            let newdent = LocalSpan::new(self.newline.end, self.whitespace.end);
                            self.layout(newdent);
                        }
                    }
                }
            }

            if token.kind == TokenKind::EndOfInput {
                self.finished = true;
                self.eof = token.span;

                for _ in 0..self.stack.len() {
                    self.pending.push_back(Pending::Token(Token::new(TokenKind::Dedent, token.span)));
                }
                self.stack.clear();
                self.indent = LocalSpan::empty(self.indent.start);
                self.pending.push_back(Pending::MaybeNewline(token.span));
            }

            self.pending.push_back(Pending::Token(token));
        }
    }

    /// Compare the new line's indent against the indent stack and queue the
    /// resulting `DEDENT` / `INDENT` / newline tokens.
    fn layout(&mut self, newdent: LocalSpan) {
        let tindent = self.newline;
        let mut reported = false;

        // pop scopes until the current indent is a prefix of newdent
        while !self.is_prefix(self.indent, newdent) {
            if !reported && !self.is_prefix(newdent, self.indent) {
                // neither extends the other: tabs and spaces are mixed
                self.reporter.error(
                    self.global(newdent),
                    "inconsistent indentation; this line matches no enclosing block",
                );
                reported = true;
            }

            let length = self.stack.pop().unwrap_or(0);
            self.indent = LocalSpan::new(self.indent.start, self.indent.start + length);
            self.pending.push_back(Pending::Token(Token::new(TokenKind::Dedent, tindent)));
        }

        // a strictly longer line opens a new scope
        if newdent.end - newdent.start > self.indent.end - self.indent.start {
            self.stack.push(self.indent.end - self.indent.start);
            self.indent = newdent;
            self.pending.push_back(Pending::Token(Token::new(TokenKind::Indent, tindent)));
        }

        self.pending.push_back(Pending::MaybeNewline(tindent));
    }

    fn is_prefix(&self, prefix: LocalSpan, of: LocalSpan) -> bool {
        let prefix = &self.file[prefix];
        let of = &self.file[of];
        of.as_bytes().starts_with(prefix.as_bytes())
    }

    /// Scan one raw token. A `}` byte resumes a string or regex literal when
    /// the parser could shift the corresponding closing token.
    fn scan(&mut self, state: &impl ParserState) -> Token {
        let content = self.file.content();

        if content.as_bytes().get(self.cursor as usize) == Some(&b'}') {
            if state.can_shift(TokenKind::StrClose) {
                return lexer::lex_dstr(content, self.cursor);
            }
            if state.can_shift(TokenKind::RegClose) {
                return lexer::lex_rstr(content, self.cursor);
            }
        }

        lexer::lex(content, self.cursor)
    }
}
