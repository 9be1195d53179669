//! Type signatures, read from the same restricted expression grammar as
//! patterns.

use crate::{children, Lowerer};
use ast::Ast;
use lexer::IdKind;
use parser::cst::{node, CstElement};

impl Lowerer<'_> {
    /// Read a type from the tree: identifiers, application, operators, and
    /// `tag: type` member names. Anything else is reported and becomes the
    /// `BadType` placeholder so later passes have something to walk.
    pub(crate) fn parse_type(&self, root: &CstElement<'_>) -> Ast {
        match root.id() {
            node::BINARY => {
                let kids = children(root);
                if kids.len() != 3 {
                    return Ast::new(self.span(root), "BadType");
                }

                let lhs = self.parse_type(&kids[0]);
                let op = format!("binary {}", self.identifier(&kids[1]));
                let location = self.span(&kids[1]);
                let mut rhs = self.parse_type(&kids[2]);

                if op == "binary :" {
                    if !lhs.args.is_empty() || lexer::is_operator(&lhs.name) {
                        self.error(
                            lhs.region,
                            format!(
                                "tag-name for a type must be a simple lower-case identifier, not {}",
                                self.render(&kids[0]),
                            ),
                        );
                        rhs
                    } else {
                        rhs.tag = lhs.name;
                        rhs.region = self.span(root);
                        rhs
                    }
                } else {
                    let mut out = Ast::with_args(location, op, vec![lhs, rhs]);
                    out.region = self.span(root);
                    out
                }
            }
            node::UNARY => {
                let kids = children(root);
                if kids.len() != 2 {
                    return Ast::new(self.span(root), "BadType");
                }

                // the operand may precede or follow the operator
                let (op, operand) = if kids[0].id() == node::OP {
                    (&kids[0], &kids[1])
                } else {
                    (&kids[1], &kids[0])
                };

                let name = format!("unary {}", self.identifier(op));
                let args = vec![self.parse_type(operand)];
                let mut out = Ast::with_args(self.span(op), name, args);
                out.region = self.span(root);
                out
            }
            node::ID => Ast::new(self.span(root), self.identifier(root)),
            node::PAREN => {
                let kids = children(root);
                let Some(inner) = kids.first() else {
                    return Ast::new(self.span(root), "BadType");
                };
                let mut out = self.parse_type(inner);
                out.region = self.span(root);
                out
            }
            node::APP => {
                let kids = children(root);
                if kids.len() != 2 {
                    return Ast::new(self.span(root), "BadType");
                }

                let mut lhs = self.parse_type(&kids[0]);
                let rhs = self.parse_type(&kids[1]);

                match lexer::lex_kind(&lhs.name) {
                    IdKind::Lower => self.error(
                        lhs.token,
                        format!(
                            "lower-case identifier '{}' cannot be used as a type constructor",
                            lhs.name,
                        ),
                    ),
                    IdKind::Operator => self.error(
                        rhs.region,
                        format!(
                            "excess type argument {} supplied to '{}'",
                            self.render(&kids[1]),
                            lhs.name,
                        ),
                    ),
                    IdKind::Upper => {}
                }

                lhs.args.push(rhs);
                lhs.region = self.span(root);
                lhs
            }
            node::ERROR => Ast::new(self.span(root), "BadType"),
            _ => {
                self.error(
                    self.span(root),
                    format!("type signatures forbid {}", self.render(root)),
                );
                Ast::new(self.span(root), "BadType")
            }
        }
    }
}

/// Whether a signature is structurally sound: every position is named and
/// none of it was recovered from errors.
pub(crate) fn signature_closes(ast: &Ast) -> bool {
    ast.is_named()
        && ast.name != "BadType"
        && ast.name != "_"
        && ast.args.iter().all(signature_closes)
}
