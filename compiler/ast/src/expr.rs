//! Expressions.

use crate::{Ast, Sum, Symbols};
use indexmap::IndexMap;
use num_bigint::BigInt;
use span::Span;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Expr {
    pub span: Span,
    pub flags: u32,
    pub bare: BareExpr,
}

impl Expr {
    pub fn new(span: Span, bare: BareExpr) -> Self {
        Self { span, flags: 0, bare }
    }

    pub fn with_flags(span: Span, flags: u32, bare: BareExpr) -> Self {
        Self { span, flags, bare }
    }

    pub fn var_ref(span: Span, name: impl Into<String>) -> Self {
        Self::new(span, BareExpr::VarRef(name.into()))
    }

    pub fn app(span: Span, function: Expr, argument: Expr) -> Self {
        Self::new(span, BareExpr::App(Box::new(function), Box::new(argument)))
    }

    pub fn lambda(span: Span, name: impl Into<String>, body: Expr) -> Self {
        Self::new(
            span,
            BareExpr::Lambda { name: name.into(), token: span, body: Box::new(body) },
        )
    }

    pub fn prim(span: Span, name: impl Into<String>) -> Self {
        Self::new(span, BareExpr::Prim(name.into()))
    }
}

#[derive(Clone, Debug)]
pub enum BareExpr {
    VarRef(String),
    App(Box<Expr>, Box<Expr>),
    Lambda {
        name: String,
        /// The location of the binder itself.
        token: Span,
        body: Box<Expr>,
    },
    Match(MatchExpr),
    Ascribe {
        signature: Ast,
        body: Box<Expr>,
    },
    Literal(Literal),
    Prim(String),
    Construct {
        sum: Rc<Sum>,
        index: usize,
    },
    Get {
        sum: Rc<Sum>,
        index: usize,
        field: usize,
    },
    Subscribe(String),
    DefMap(DefMap),
}

#[derive(Clone, Debug)]
pub struct MatchExpr {
    pub args: Vec<Expr>,
    pub patterns: Vec<MatchArm>,
    pub otherwise: Option<Box<Expr>>,
    /// Set on matches lowered from `require`, so that later passes can
    /// phrase refutability errors differently.
    pub is_require: bool,
}

impl MatchExpr {
    pub fn new() -> Self {
        Self { args: Vec::new(), patterns: Vec::new(), otherwise: None, is_require: false }
    }
}

impl Default for MatchExpr {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct MatchArm {
    pub pattern: Ast,
    pub body: Expr,
    pub guard: Option<Expr>,
}

#[derive(Clone, Debug)]
pub enum Literal {
    Integer(BigInt),
    Double(f64),
    Str(String),
    RegExp(String),
}

/// A scope: definitions in declaration order, publishes, imports, and the
/// body they are in scope for.
#[derive(Clone, Debug, Default)]
pub struct DefMap {
    pub location: Span,
    pub defs: IndexMap<String, DefValue>,
    pub publishes: IndexMap<String, Vec<DefValue>>,
    pub imports: Symbols,
    pub body: Option<Box<Expr>>,
}

impl DefMap {
    pub fn new(location: Span) -> Self {
        Self { location, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.publishes.is_empty() && self.imports.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct DefValue {
    /// Where the definition's name was written.
    pub location: Span,
    pub body: Expr,
}

impl DefValue {
    pub fn new(location: Span, body: Expr) -> Self {
        Self { location, body }
    }
}
