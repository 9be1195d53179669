//! Patterns: definition left-hand sides and match arms.

use crate::{children, Lowerer};
use ast::{Ast, BareExpr, Expr, Literal, MatchArm, MatchExpr};
use parser::cst::{node, CstElement};

/// State threaded through one pattern walk.
pub(crate) struct AstState {
    /// Inside a type position: `_` is forbidden and `:` assigns tags.
    pub(crate) type_mode: bool,
    /// Inside a match pattern: literals are allowed and become guards.
    pub(crate) match_mode: bool,
    /// Whether the outermost construct was parenthesised.
    pub(crate) top_paren: bool,
    /// Literal sub-patterns, in source order; `_ k<i>` refers to entry `i`.
    pub(crate) guards: Vec<Expr>,
}

impl AstState {
    pub(crate) fn new(type_mode: bool, match_mode: bool) -> Self {
        Self { type_mode, match_mode, top_paren: false, guards: Vec::new() }
    }
}

impl Lowerer<'_> {
    pub(crate) fn parse_ast(&self, root: &CstElement<'_>, state: &mut AstState) -> Ast {
        match root.id() {
            node::ID => Ast::new(self.span(root), self.identifier(root)),
            node::HOLE => {
                if state.type_mode {
                    self.error(self.span(root), "type signatures may not include _".to_owned());
                }
                Ast::new(self.span(root), "_")
            }
            node::BINARY => {
                let kids = children(root);
                if kids.len() != 3 {
                    return Ast::anonymous(self.span(root));
                }

                let op = self.identifier(&kids[1]);
                if op == ":" {
                    if state.type_mode {
                        // inside a type, `tag: type` names a member
                        let lhs = self.parse_ast(&kids[0], state);
                        let mut rhs = self.parse_ast(&kids[2], state);
                        if !lhs.args.is_empty() || lexer::is_operator(&lhs.name) {
                            self.error(
                                lhs.region,
                                format!(
                                    "left-hand-side of COLON must be a simple lower-case identifier, not {}",
                                    lhs.name,
                                ),
                            );
                            return rhs;
                        }
                        rhs.tag = lhs.name;
                        rhs.region = self.span(root);
                        rhs
                    } else {
                        let mut lhs = self.parse_ast(&kids[0], state);
                        state.type_mode = true;
                        let signature = self.parse_ast(&kids[2], state);
                        state.type_mode = false;
                        lhs.signature = Some(Box::new(signature));
                        lhs.region = self.span(root);
                        state.top_paren = false;
                        lhs
                    }
                } else {
                    let lhs = self.parse_ast(&kids[0], state);
                    let rhs = self.parse_ast(&kids[2], state);
                    let mut out = Ast::with_args(
                        self.span(&kids[1]),
                        format!("binary {op}"),
                        vec![lhs, rhs],
                    );
                    out.region = self.span(root);
                    state.top_paren = false;
                    out
                }
            }
            node::UNARY => {
                let kids = children(root);
                if kids.len() != 2 {
                    return Ast::anonymous(self.span(root));
                }

                let (op, operand) = if kids[0].id() == node::OP {
                    (&kids[0], &kids[1])
                } else {
                    (&kids[1], &kids[0])
                };

                let rhs = self.parse_ast(operand, state);
                let mut out = Ast::with_args(
                    self.span(op),
                    format!("unary {}", self.identifier(op)),
                    vec![rhs],
                );
                out.region = self.span(root);
                state.top_paren = false;
                out
            }
            node::APP => {
                let kids = children(root);
                if kids.len() != 2 {
                    return Ast::anonymous(self.span(root));
                }

                let mut lhs = self.parse_ast(&kids[0], state);
                let rhs = self.parse_ast(&kids[1], state);

                if lexer::is_operator(&lhs.name) {
                    self.error(
                        lhs.region,
                        format!("cannot supply additional constructor arguments to {}", lhs.name),
                    );
                }

                lhs.args.push(rhs);
                lhs.region = self.span(root);
                state.top_paren = false;
                lhs
            }
            node::PAREN => {
                let kids = children(root);
                let Some(inner) = kids.first() else {
                    return Ast::anonymous(self.span(root));
                };
                let mut out = self.parse_ast(inner, state);
                out.region = self.span(root);
                state.top_paren = true;
                out
            }
            node::LITERAL if state.match_mode => {
                let out = Ast::new(self.span(root), format!("_ k{}", state.guards.len()));
                state.guards.push(self.lower_expr(root));
                out
            }
            node::ERROR => Ast::anonymous(self.span(root)),
            _ => {
                self.error(
                    self.span(root),
                    format!("was expecting an (OPERATOR/ID/POPEN), got {}", self.render(root)),
                );
                Ast::anonymous(self.span(root))
            }
        }
    }

    /// Arguments of a pattern may only destructure constructors: a
    /// lower-case head with arguments is rejected (the head of the whole
    /// pattern is exempt, it names the definition).
    pub(crate) fn check_constructors(&self, ast: &Ast) -> bool {
        let mut fail = false;
        for arg in &ast.args {
            fail |= self.check_constructor_uses(arg);
        }
        fail
    }

    fn check_constructor_uses(&self, ast: &Ast) -> bool {
        let mut fail = false;

        if !ast.args.is_empty() && lexer::is_lower(&ast.name) {
            self.error(
                ast.token,
                format!("lower-case identifier '{}' cannot be used as a constructor pattern", ast.name),
            );
            fail = true;
        }

        for arg in &ast.args {
            fail |= self.check_constructor_uses(arg);
        }

        fail
    }

    /// Chain equality tests for the literal sub-patterns in front of the
    /// user-supplied guard. Each literal is compared with the type-matched
    /// primitive; `LT`/`GT` reject the arm, `EQ` falls through to the next
    /// test or the guard body.
    pub(crate) fn add_literal_guards(
        &self,
        mut guard: Option<Expr>,
        literals: Vec<Expr>,
    ) -> Option<Expr> {
        for (index, literal) in literals.into_iter().enumerate() {
            let comparison = match &literal.bare {
                BareExpr::Literal(Literal::Integer(_)) => "icmp",
                BareExpr::Literal(Literal::Double(_)) => "dcmp_nan_lt",
                BareExpr::Literal(Literal::RegExp(_)) => "rcmp",
                _ => "scmp",
            };
            let span = literal.span;

            let current = guard.take().unwrap_or_else(|| Expr::var_ref(span, "True@wake"));

            let compare = Expr::app(
                span,
                Expr::app(
                    span,
                    Expr::lambda(span, "_", Expr::lambda(span, "_", Expr::prim(span, comparison))),
                    literal,
                ),
                Expr::var_ref(span, format!("_ k{index}")),
            );

            let mut fallthrough = MatchExpr::new();
            fallthrough.args.push(compare);
            fallthrough.patterns.push(MatchArm {
                pattern: Ast::new(span, "LT@wake"),
                body: Expr::var_ref(span, "False@wake"),
                guard: None,
            });
            fallthrough.patterns.push(MatchArm {
                pattern: Ast::new(span, "GT@wake"),
                body: Expr::var_ref(span, "False@wake"),
                guard: None,
            });
            fallthrough.patterns.push(MatchArm {
                pattern: Ast::new(span, "EQ@wake"),
                body: current,
                guard: None,
            });

            guard = Some(Expr::new(span, BareExpr::Match(fallthrough)));
        }

        guard
    }
}
