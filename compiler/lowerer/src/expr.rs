//! Expression lowering.

use crate::{children, pattern::AstState, Lowerer};
use ast::{
    Ast, BareExpr, DefMap, DefValue, Expr, Literal, MatchArm, MatchExpr, FLAG_AST, FLAG_TOUCHED,
};
use num_bigint::BigInt;
use parser::cst::{node, CstElement};
use span::Span;

impl Lowerer<'_> {
    pub(crate) fn lower_expr(&self, element: &CstElement<'_>) -> Expr {
        let span = self.span(element);

        match element.id() {
            node::ID => {
                Expr::with_flags(span, FLAG_AST, BareExpr::VarRef(self.identifier(element)))
            }
            node::HOLE => Expr::with_flags(span, FLAG_AST, BareExpr::VarRef("_".to_owned())),
            node::LITERAL => self.lower_literal(element),
            node::INTERPOLATE => self.lower_interpolate(element),
            node::PRIM => self.lower_prim(element),
            node::SUBSCRIBE => {
                let kids = children(element);
                match kids.first() {
                    Some(id) => Expr::new(span, BareExpr::Subscribe(self.identifier(id))),
                    None => self.bad_expr(span),
                }
            }
            node::PAREN => {
                let kids = children(element);
                match kids.first() {
                    Some(inner) => {
                        let mut out = self.lower_block(inner);
                        out.span = span;
                        if matches!(out.bare, BareExpr::Lambda { .. }) {
                            out.flags |= FLAG_AST;
                        }
                        out
                    }
                    None => self.bad_expr(span),
                }
            }
            node::UNARY => {
                let kids = children(element);
                if kids.len() != 2 {
                    return self.bad_expr(span);
                }
                let (op, operand) = if kids[0].id() == node::OP {
                    (&kids[0], &kids[1])
                } else {
                    (&kids[1], &kids[0])
                };

                let name = format!("unary {}", self.identifier(op));
                let opp = Expr::with_flags(self.span(op), FLAG_AST, BareExpr::VarRef(name));
                let rhs = self.lower_expr(operand);
                Expr::with_flags(span, FLAG_AST, BareExpr::App(Box::new(opp), Box::new(rhs)))
            }
            node::BINARY => {
                let kids = children(element);
                if kids.len() != 3 {
                    return self.bad_expr(span);
                }

                let op = self.identifier(&kids[1]);
                if op == ":" {
                    let mut state = AstState::new(true, false);
                    let signature = self.parse_ast(&kids[2], &mut state);
                    self.check_constructors(&signature);
                    let body = self.lower_expr(&kids[0]);
                    return Expr::new(
                        span,
                        BareExpr::Ascribe { signature, body: Box::new(body) },
                    );
                }

                let lhs = self.lower_expr(&kids[0]);
                let rhs = self.lower_expr(&kids[2]);
                let opp = Expr::with_flags(
                    self.span(&kids[1]),
                    FLAG_AST,
                    BareExpr::VarRef(format!("binary {op}")),
                );

                let inner = Span::new(lhs.span.start, opp.span.end);
                let lhs = Expr::with_flags(
                    inner,
                    FLAG_AST,
                    BareExpr::App(Box::new(opp), Box::new(lhs)),
                );
                Expr::with_flags(span, FLAG_AST, BareExpr::App(Box::new(lhs), Box::new(rhs)))
            }
            node::APP => {
                let kids = children(element);
                if kids.len() != 2 {
                    return self.bad_expr(span);
                }
                let function = self.lower_expr(&kids[0]);
                let argument = self.lower_expr(&kids[1]);
                Expr::with_flags(
                    span,
                    FLAG_AST,
                    BareExpr::App(Box::new(function), Box::new(argument)),
                )
            }
            node::LAMBDA => self.lower_lambda(element),
            node::MATCH => self.lower_match(element),
            node::IF => self.lower_if(element),
            node::BLOCK => self.lower_block(element),
            node::REQUIRE => self.lower_require(element),
            node::ERROR => self.bad_expr(span),
            _ => {
                self.error(
                    span,
                    format!(
                        "was expecting an (OPERATOR/LAMBDA/ID/LITERAL/PRIM/POPEN), got {}",
                        self.render(element),
                    ),
                );
                self.bad_expr(span)
            }
        }
    }

    pub(crate) fn bad_expr(&self, span: Span) -> Expr {
        Expr::new(span, BareExpr::Literal(Literal::Str("bad unary".to_owned())))
    }

    // ------------------------------------------------------------------
    // literals

    fn lower_literal(&self, element: &CstElement<'_>) -> Expr {
        use lexer::TokenKind as T;

        let span = self.span(element);
        let token = element.first_child_element();
        let id = token.id();
        let kind = token_kind_of(id);
        let text = &self.file[token.content().span];

        let literal = if id == T::Integer.id() {
            Literal::Integer(parse_integer(text))
        } else if id == T::Double.id() {
            Literal::Double(text.replace('_', "").parse().unwrap_or(0.0))
        } else if id == T::StrRaw.id() {
            Literal::Str(lexer::relex_raw(text))
        } else if matches!(kind, Some(T::StrSingle | T::StrOpen | T::StrMid | T::StrClose)) {
            match lexer::relex_string(kind.unwrap(), text) {
                Ok(value) => Literal::Str(value),
                Err(_) => {
                    self.error(span, "invalid escape sequence in string literal".to_owned());
                    Literal::Str(String::new())
                }
            }
        } else if matches!(kind, Some(T::RegSingle | T::RegOpen | T::RegMid | T::RegClose)) {
            Literal::RegExp(lexer::relex_regex(kind.unwrap(), text))
        } else if id == T::Here.id() {
            // the directory of the current file
            let mut name = self.file.name().to_string();
            match name.rfind('/') {
                Some(cut) => name.truncate(cut),
                None => name = ".".to_owned(),
            }
            Literal::Str(name)
        } else {
            return self.bad_expr(span);
        };

        Expr::with_flags(span, FLAG_AST, BareExpr::Literal(literal))
    }

    /// `"a{x}b"` lowers to `binary ^` applications joining the pieces in
    /// source order; regex interpolation joins the same way.
    fn lower_interpolate(&self, element: &CstElement<'_>) -> Expr {
        let mut joined: Option<Expr> = None;

        for kid in children(element) {
            if kid.id() == node::ERROR {
                continue;
            }
            let piece = self.lower_expr(&kid);

            joined = Some(match joined {
                None => piece,
                Some(previous) => {
                    let cat = Expr::with_flags(
                        piece.span,
                        FLAG_AST,
                        BareExpr::VarRef("binary ^".to_owned()),
                    );
                    let inner = previous.span;
                    let span = Span::new(previous.span.start, piece.span.end);
                    let lhs = Expr::with_flags(
                        inner,
                        FLAG_AST,
                        BareExpr::App(Box::new(cat), Box::new(previous)),
                    );
                    Expr::with_flags(
                        span,
                        FLAG_AST,
                        BareExpr::App(Box::new(lhs), Box::new(piece)),
                    )
                }
            });
        }

        joined.unwrap_or_else(|| self.bad_expr(self.span(element)))
    }

    fn lower_prim(&self, element: &CstElement<'_>) -> Expr {
        let span = self.span(element);
        let kids = children(element);

        let name = match kids.first() {
            Some(literal) if literal.id() == node::LITERAL => {
                let expr = self.lower_literal(literal);
                match expr.bare {
                    BareExpr::Literal(Literal::Str(name)) => name,
                    _ => {
                        self.error(
                            self.span(literal),
                            "was expecting a String as the primitive name".to_owned(),
                        );
                        "bad_prim".to_owned()
                    }
                }
            }
            _ => "bad_prim".to_owned(),
        };

        Expr::with_flags(span, FLAG_AST, BareExpr::Prim(name))
    }

    // ------------------------------------------------------------------
    // structured forms

    fn lower_lambda(&self, element: &CstElement<'_>) -> Expr {
        let region = self.span(element);
        let kids = children(element);
        if kids.len() != 2 {
            return self.bad_expr(region);
        }

        let mut state = AstState::new(false, false);
        let ast = self.parse_ast(&kids[0], &mut state);
        self.check_constructors(&ast);
        let body = self.lower_expr(&kids[1]);

        let mut out = if lexer::is_upper(&ast.name) || lexer::is_operator(&ast.name) {
            // a constructor pattern: bind a scrutinee and match on it
            let mut lifted = MatchExpr::new();
            lifted.args.push(Expr::var_ref(ast.region, "_ xx"));
            lifted.patterns.push(MatchArm { pattern: ast, body, guard: None });
            Expr::new(
                region,
                BareExpr::Lambda {
                    name: "_ xx".to_owned(),
                    token: region,
                    body: Box::new(Expr::new(region, BareExpr::Match(lifted))),
                },
            )
        } else if let Some(signature) = ast.signature {
            // a typed parameter: re-bind it under an ascription
            let mut map = DefMap::new(region);
            map.defs.insert(
                ast.name.clone(),
                DefValue::new(
                    ast.region,
                    Expr::new(
                        ast.region,
                        BareExpr::Ascribe {
                            signature: *signature,
                            body: Box::new(Expr::var_ref(ast.region, "_ typed")),
                        },
                    ),
                ),
            );
            map.body = Some(Box::new(body));
            Expr::new(
                region,
                BareExpr::Lambda {
                    name: "_ typed".to_owned(),
                    token: region,
                    body: Box::new(Expr::new(region, BareExpr::DefMap(map))),
                },
            )
        } else {
            Expr::new(
                region,
                BareExpr::Lambda { name: ast.name, token: ast.token, body: Box::new(body) },
            )
        };

        out.flags |= FLAG_AST;
        out
    }

    pub(crate) fn lower_match(&self, element: &CstElement<'_>) -> Expr {
        let kids = children(element);
        let mut lowered = MatchExpr::new();

        let mut index = 0;
        while index < kids.len() && kids[index].id() != node::CASE {
            if kids[index].id() != node::ERROR {
                lowered.args.push(self.lower_expr(&kids[index]));
            }
            index += 1;
        }
        let multiarg = lowered.args.len() > 1;

        for case in &kids[index..] {
            if case.id() != node::CASE {
                continue;
            }
            let ckids = children(case);
            let Some(&body_element) = ckids.last() else { continue };

            let mut patterns_end = ckids.len() - 1;
            let mut guard_element = None;
            if patterns_end > 0 && ckids[patterns_end - 1].id() == node::GUARD {
                patterns_end -= 1;
                guard_element = Some(ckids[patterns_end]);
            }

            let mut state = AstState::new(false, true);
            let ast = if multiarg {
                let mut list = Ast::anonymous(self.span(case));
                for pattern in &ckids[..patterns_end] {
                    let arg = self.parse_ast(pattern, &mut state);
                    list.args.push(arg);
                }
                list
            } else {
                match ckids[..patterns_end].first() {
                    Some(pattern) => self.parse_ast(pattern, &mut state),
                    None => Ast::anonymous(self.span(case)),
                }
            };
            self.check_constructors(&ast);

            let user_guard = guard_element.map(|guard| match children(&guard).first() {
                Some(block) => self.lower_block(block),
                None => self.bad_expr(self.span(&guard)),
            });
            let guard = self.add_literal_guards(user_guard, std::mem::take(&mut state.guards));

            let body = self.lower_block(&body_element);
            lowered.patterns.push(MatchArm { pattern: ast, body, guard });
        }

        if lowered.args.is_empty() || lowered.patterns.is_empty() {
            return self.bad_expr(self.span(element));
        }

        Expr::new(self.span(element), BareExpr::Match(lowered))
    }

    fn lower_if(&self, element: &CstElement<'_>) -> Expr {
        let span = self.span(element);
        let kids = children(element);
        if kids.len() != 3 {
            return self.bad_expr(span);
        }

        let condition = self.lower_block(&kids[0]);
        let then = self.lower_block(&kids[1]);
        let otherwise = self.lower_block(&kids[2]);

        let mut lowered = MatchExpr::new();
        lowered.args.push(condition);
        lowered.patterns.push(MatchArm {
            pattern: Ast::new(span, "True@wake"),
            body: then,
            guard: None,
        });
        lowered.patterns.push(MatchArm {
            pattern: Ast::new(span, "False@wake"),
            body: otherwise,
            guard: None,
        });

        Expr::with_flags(span, FLAG_AST, BareExpr::Match(lowered))
    }

    pub(crate) fn lower_require(&self, element: &CstElement<'_>) -> Expr {
        let span = self.span(element);
        let kids = children(element);
        if kids.len() < 3 {
            return self.bad_expr(span);
        }

        let mut state = AstState::new(false, true);
        let ast = self.parse_ast(&kids[0], &mut state);
        self.check_constructors(&ast);
        let guard = self.add_literal_guards(None, std::mem::take(&mut state.guards));

        let rhs = self.lower_block(&kids[1]);
        let (otherwise, body_element) = if kids.len() >= 4 {
            (Some(self.lower_block(&kids[2])), kids[3])
        } else {
            (None, kids[2])
        };
        let body = self.lower_block(&body_element);

        let mut lowered = MatchExpr::new();
        lowered.is_require = true;
        lowered.args.push(rhs);
        lowered.patterns.push(MatchArm { pattern: ast, body, guard });
        lowered.otherwise = otherwise.map(Box::new);

        Expr::new(span, BareExpr::Match(lowered))
    }

    // ------------------------------------------------------------------
    // blocks

    /// An `INDENT … DEDENT` block with leading definitions becomes a scope;
    /// a block without any collapses to its expression. Anonymous-hole
    /// lifting happens at this boundary.
    pub(crate) fn lower_block(&self, element: &CstElement<'_>) -> Expr {
        match element.id() {
            node::BLOCK => {
                let kids = children(element);
                let mut map = DefMap::new(self.span(element));
                let mut body = None;

                for kid in &kids {
                    match kid.id() {
                        node::IMPORT => self.lower_import(kid, &mut map.imports),
                        node::DEF | node::TARGET => {
                            self.lower_def_into(kid, &mut map, None, None);
                        }
                        node::REQUIRE => body = Some(self.lower_require(kid)),
                        node::ERROR => {}
                        _ => body = Some(relabel_anon(self.lower_expr(kid))),
                    }
                }

                let body = body.unwrap_or_else(|| self.bad_expr(self.span(element)));

                if map.is_empty() {
                    body
                } else {
                    // the scope starts at column 1 of its first line
                    let local = element.span();
                    let from = kids.first().map_or(local.start, |kid| kid.span().start);
                    let line_start = self.file.line_start(from);
                    map.location =
                        self.global(span::LocalSpan::new(line_start.min(local.end), local.end));

                    let span = map.location;
                    map.body = Some(Box::new(body));
                    Expr::new(span, BareExpr::DefMap(map))
                }
            }
            node::REQUIRE => self.lower_require(element),
            _ => relabel_anon(self.lower_expr(element)),
        }
    }
}

fn token_kind_of(id: u8) -> Option<lexer::TokenKind> {
    use lexer::TokenKind as T;

    for kind in [
        T::Integer,
        T::Double,
        T::StrRaw,
        T::StrSingle,
        T::StrOpen,
        T::StrMid,
        T::StrClose,
        T::RegSingle,
        T::RegOpen,
        T::RegMid,
        T::RegClose,
        T::Here,
    ] {
        if kind.id() == id {
            return Some(kind);
        }
    }
    None
}

fn parse_integer(text: &str) -> BigInt {
    let cleaned: String = text.chars().filter(|&character| character != '_').collect();

    let (digits, radix) = if let Some(rest) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        (rest, 8)
    } else {
        (cleaned.as_str(), 10)
    };

    BigInt::parse_bytes(digits.as_bytes(), radix).unwrap_or_default()
}

/// Walk the expression left-to-right, renaming every unvisited `_` hole to
/// a fresh `_ <n>` and binding as many outer lambdas as holes were found.
pub(crate) fn relabel_anon(mut expr: Expr) -> Expr {
    let count = relabel_descend(&mut expr, 0);

    for index in (1..=count).rev() {
        let span = expr.span;
        expr = Expr::new(
            span,
            BareExpr::Lambda {
                name: format!("_ {index}"),
                token: span,
                body: Box::new(expr),
            },
        );
    }

    expr
}

fn relabel_descend(expr: &mut Expr, index: u32) -> u32 {
    if expr.flags & FLAG_TOUCHED != 0 {
        return index;
    }
    expr.flags |= FLAG_TOUCHED;

    match &mut expr.bare {
        BareExpr::VarRef(name) => {
            if name == "_" {
                let index = index + 1;
                *name = format!("_ {index}");
                index
            } else {
                index
            }
        }
        BareExpr::App(function, argument) => {
            let index = relabel_descend(function, index);
            relabel_descend(argument, index)
        }
        BareExpr::Lambda { body, .. } => relabel_descend(body, index),
        BareExpr::Match(lowered) => {
            let mut index = index;
            for arg in &mut lowered.args {
                index = relabel_descend(arg, index);
            }
            index
        }
        BareExpr::Ascribe { body, .. } => relabel_descend(body, index),
        // DefMap, Literal, Prim, Construct, Get, Subscribe
        _ => index,
    }
}
