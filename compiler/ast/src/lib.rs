//! The abstract syntax tree the lowering pass produces.
//!
//! Expressions own their sub-expressions uniquely; the only shared
//! structure is [`Sum`], which constructors and synthesized accessors refer
//! back to through reference counting.

pub use expr::{BareExpr, DefMap, DefValue, Expr, Literal, MatchArm, MatchExpr};
pub use pattern::Ast;
pub use package::{File, Package, Top, Topic};
pub use sums::{Constructor, Sum};
pub use symbols::{SymbolSource, Symbols, SYM_LEAF};

pub mod expr;
pub mod format;
pub mod package;
pub mod pattern;
pub mod sums;
pub mod symbols;

/// Expression flags.
///
/// `FLAG_AST` marks expressions whose syntax could also be read as a
/// pattern; `FLAG_TOUCHED` marks sub-expressions already visited by the
/// anonymous-hole lifter; `FLAG_SYNTHETIC` marks definitions the lowerer
/// invented (tuple accessors).
pub const FLAG_AST: u32 = 1 << 0;
pub const FLAG_TOUCHED: u32 = 1 << 1;
pub const FLAG_SYNTHETIC: u32 = 1 << 2;
