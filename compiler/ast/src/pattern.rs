//! The pattern syntax tree.
//!
//! Definition left-hand sides, match patterns, and type signatures all
//! share this shape. A pattern is "truthy" iff it has a name; nameless
//! patterns mark positions recovered from parse errors.

use span::Span;

#[derive(Clone, Debug, Default)]
pub struct Ast {
    /// The head's location.
    pub token: Span,
    /// The full span of the pattern.
    pub region: Span,
    pub name: String,
    /// Member name for tagged tuple elements; empty otherwise.
    pub tag: String,
    /// An attached `:`-ascription.
    pub signature: Option<Box<Ast>>,
    pub args: Vec<Ast>,
}

impl Ast {
    pub fn new(token: Span, name: impl Into<String>) -> Self {
        Self { token, region: token, name: name.into(), ..Self::default() }
    }

    pub fn with_args(token: Span, name: impl Into<String>, args: Vec<Ast>) -> Self {
        Self { token, region: token, name: name.into(), args, ..Self::default() }
    }

    /// A placeholder produced by error recovery.
    pub fn anonymous(token: Span) -> Self {
        Self { token, region: token, ..Self::default() }
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}
