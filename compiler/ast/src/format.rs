//! Debug rendering of lowered expressions, one node per line.

use crate::{Ast, BareExpr, Expr, Literal};
use std::fmt;

impl Expr {
    /// An indented tree rendering, for `--dump-ast` style output.
    pub fn display(&self) -> impl fmt::Display + '_ {
        Rendered(self)
    }
}

struct Rendered<'a>(&'a Expr);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write(self.0, f, 0)
    }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    write!(f, "{:depth$}", "", depth = depth * 2)
}

fn write(expr: &Expr, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    indent(f, depth)?;

    match &expr.bare {
        BareExpr::VarRef(name) => writeln!(f, "VarRef {name}"),
        BareExpr::App(function, argument) => {
            writeln!(f, "App")?;
            write(function, f, depth + 1)?;
            write(argument, f, depth + 1)
        }
        BareExpr::Lambda { name, body, .. } => {
            writeln!(f, "Lambda {name}")?;
            write(body, f, depth + 1)
        }
        BareExpr::Match(match_) => {
            writeln!(f, "Match{}", if match_.is_require { " (require)" } else { "" })?;
            for arg in &match_.args {
                write(arg, f, depth + 1)?;
            }
            for arm in &match_.patterns {
                indent(f, depth + 1)?;
                writeln!(f, "case {}", pattern(&arm.pattern))?;
                if let Some(guard) = &arm.guard {
                    indent(f, depth + 2)?;
                    writeln!(f, "guard")?;
                    write(guard, f, depth + 3)?;
                }
                write(&arm.body, f, depth + 2)?;
            }
            if let Some(otherwise) = &match_.otherwise {
                indent(f, depth + 1)?;
                writeln!(f, "else")?;
                write(otherwise, f, depth + 2)?;
            }
            Ok(())
        }
        BareExpr::Ascribe { signature, body } => {
            writeln!(f, "Ascribe {}", pattern(signature))?;
            write(body, f, depth + 1)
        }
        BareExpr::Literal(literal) => match literal {
            Literal::Integer(value) => writeln!(f, "Integer {value}"),
            Literal::Double(value) => writeln!(f, "Double {value}"),
            Literal::Str(value) => writeln!(f, "String {value:?}"),
            Literal::RegExp(value) => writeln!(f, "RegExp {value:?}"),
        },
        BareExpr::Prim(name) => writeln!(f, "Prim {name}"),
        BareExpr::Construct { sum, index } => {
            writeln!(f, "Construct {}/{}", sum.name, sum.members[*index].ast.name)
        }
        BareExpr::Get { sum, index, field } => {
            writeln!(f, "Get {}/{} #{field}", sum.name, sum.members[*index].ast.name)
        }
        BareExpr::Subscribe(topic) => writeln!(f, "Subscribe {topic}"),
        BareExpr::DefMap(map) => {
            writeln!(f, "DefMap")?;
            for (name, value) in &map.defs {
                indent(f, depth + 1)?;
                writeln!(f, "def {name}")?;
                write(&value.body, f, depth + 2)?;
            }
            for (topic, values) in &map.publishes {
                for value in values {
                    indent(f, depth + 1)?;
                    writeln!(f, "publish {topic}")?;
                    write(&value.body, f, depth + 2)?;
                }
            }
            if let Some(body) = &map.body {
                write(body, f, depth + 1)?;
            }
            Ok(())
        }
    }
}

/// A single-line rendering of a pattern.
pub fn pattern(ast: &Ast) -> String {
    let mut out = String::new();
    pattern_into(ast, &mut out);
    out
}

fn pattern_into(ast: &Ast, out: &mut String) {
    if !ast.tag.is_empty() {
        out.push_str(&ast.tag);
        out.push_str(": ");
    }

    if ast.args.is_empty() {
        out.push_str(if ast.is_named() { &ast.name } else { "<error>" });
    } else {
        out.push('(');
        out.push_str(if ast.is_named() { &ast.name } else { "<error>" });
        for arg in &ast.args {
            out.push(' ');
            pattern_into(arg, out);
        }
        out.push(')');
    }

    if let Some(signature) = &ast.signature {
        out.push_str(": ");
        pattern_into(signature, out);
    }
}
