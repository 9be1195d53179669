//! Definitions: `def`, `target`, and `publish`.

use crate::{children, parse_flags, pattern::AstState, Lowerer};
use ast::{
    Ast, BareExpr, DefMap, DefValue, Expr, Literal, MatchArm, MatchExpr, SymbolSource, Symbols,
};
use lexer::IdKind;
use parser::cst::{node, CstElement};
use span::Span;

pub(crate) struct Definition {
    pub(crate) name: String,
    pub(crate) location: Span,
    pub(crate) body: Expr,
}

struct LoweredDefs {
    /// The `table NAME` companion of a target.
    table: Option<Definition>,
    defs: Vec<Definition>,
}

impl Lowerer<'_> {
    /// Lower a `DEF`, `TARGET`, or `PUBLISH` node and bind the results into
    /// the given scope. `exports`/`globals` receive the names when the
    /// corresponding flag is present on the node.
    pub(crate) fn lower_def_into(
        &self,
        element: &CstElement<'_>,
        map: &mut DefMap,
        exports: Option<&mut Symbols>,
        globals: Option<&mut Symbols>,
    ) {
        let target = element.id() == node::TARGET;
        let publish = element.id() == node::PUBLISH;

        let kids = children(element);
        let (flags, index) = parse_flags(&kids);
        let mut exports = if flags.exportf { exports } else { None };
        let mut globals = if flags.globalf { globals } else { None };

        let rest = &kids[index..];
        if rest.len() < 2 {
            // recovery left nothing usable behind
            return;
        }

        let pattern_element = rest[0];
        let cache_element = (target && rest.len() >= 3).then(|| rest[1]);
        let body_element = *rest.last().unwrap();

        let lowered = self.lower_def(
            &pattern_element,
            cache_element.as_ref(),
            &body_element,
            target,
            publish,
            map.defs.len(),
        );

        if let Some(table) = lowered.table {
            self.bind_def(map, table, None, None);
        }
        for definition in lowered.defs {
            if publish {
                self.bind_publish(map, definition);
            } else {
                self.bind_def(map, definition, exports.as_deref_mut(), globals.as_deref_mut());
            }
        }
    }

    fn lower_def(
        &self,
        pattern_element: &CstElement<'_>,
        cache_element: Option<&CstElement<'_>>,
        body_element: &CstElement<'_>,
        target: bool,
        publish: bool,
        index_base: usize,
    ) -> LoweredDefs {
        let mut state = AstState::new(false, false);
        let mut ast = self.parse_ast(pattern_element, &mut state);
        if !ast.is_named() {
            ast.name = "undef".to_owned();
        }
        let name = std::mem::take(&mut ast.name);
        let head_token = ast.token;
        self.check_constructors(&ast);

        let mut extract =
            lexer::is_upper(&name) || (state.top_paren && lexer::is_operator(&name));
        if extract && (target || publish) {
            self.error(
                head_token,
                "upper-case identifier cannot be used as a target/publish name".to_owned(),
            );
            extract = false;
        }

        let tohash = ast.args.len();
        if let Some(cache) = cache_element {
            for sub in self.flatten_cache_args(cache, &mut state) {
                ast.region = Span::new(ast.region.start, ast.region.end.max(sub.region.end));
                ast.args.push(sub);
            }
        }

        let fn_region = ast.region;
        let mut body = self.lower_block(body_element);

        if extract {
            ast.name = name;
            let mut defs = Vec::new();
            let mut counter = index_base as i64;
            self.extract_def(&mut defs, &mut counter, ast, body);
            return LoweredDefs { table: None, defs };
        }

        // do we need a pattern match? lower / wildcard arguments are fine
        let mut pattern = false;
        let mut typed = false;
        for arg in &ast.args {
            pattern |= lexer::is_operator(&arg.name) || lexer::is_upper(&arg.name);
            typed |= arg.signature.is_some();
        }

        let type_signature = ast.signature.take();
        let mut args: Vec<(String, Span)> = Vec::new();

        if pattern {
            // bind the arguments to anonymous lambdas and push the whole
            // thing through a match
            let nargs = ast.args.len();
            let mut lifted = MatchExpr::new();
            let arm_pattern = if nargs > 1 {
                ast
            } else {
                ast.args.into_iter().next().unwrap()
            };
            lifted.patterns.push(MatchArm { pattern: arm_pattern, body, guard: None });
            for position in 0..nargs {
                args.push((format!("_ {position}"), fn_region));
                lifted.args.push(Expr::var_ref(fn_region, format!("_ {position}")));
            }
            body = Expr::new(fn_region, BareExpr::Match(lifted));
        } else if typed {
            let mut scope = DefMap::new(fn_region);
            for (position, arg) in ast.args.iter_mut().enumerate() {
                let arg_name = wildcard_renamed(&arg.name, position);
                args.push((arg_name.clone(), arg.token));
                if let Some(signature) = arg.signature.take() {
                    scope.defs.insert(
                        format!("_type {arg_name}"),
                        DefValue::new(
                            arg.region,
                            Expr::new(
                                arg.region,
                                BareExpr::Ascribe {
                                    signature: *signature,
                                    body: Box::new(Expr::var_ref(arg.token, arg_name.clone())),
                                },
                            ),
                        ),
                    );
                }
            }
            scope.body = Some(Box::new(body));
            body = Expr::new(fn_region, BareExpr::DefMap(scope));
        } else {
            // no pattern; simple lambdas for the arguments
            for (position, arg) in ast.args.iter().enumerate() {
                args.push((wildcard_renamed(&arg.name, position), arg.token));
            }
        }

        if let Some(signature) = type_signature {
            body = Expr::new(
                body.span,
                BareExpr::Ascribe { signature: *signature, body: Box::new(body) },
            );
        }

        let mut table = None;
        if target {
            if tohash == 0 {
                self.error(
                    fn_region,
                    "target definition must have at least one hashed argument".to_owned(),
                );
            }

            let bl = body.span;
            let table_name = format!("table {name}");

            // the memo table is keyed by the body's source text
            let text = self.map.snippet(bl).to_owned();
            table = Some(Definition {
                name: table_name.clone(),
                location: fn_region,
                body: Expr::app(
                    bl,
                    Expr::lambda(bl, "_", Expr::prim(bl, "tnew")),
                    Expr::new(bl, BareExpr::Literal(Literal::Str(text))),
                ),
            });

            let mut hash = Expr::prim(bl, "hash");
            for _ in 0..tohash {
                hash = Expr::lambda(bl, "_", hash);
            }
            for (arg_name, _) in &args[..tohash] {
                hash = Expr::app(bl, hash, Expr::var_ref(bl, arg_name.clone()));
            }

            let mut subhash = Expr::prim(bl, "hash");
            for _ in tohash..args.len() {
                subhash = Expr::lambda(bl, "_", subhash);
            }
            for (arg_name, _) in &args[tohash..] {
                subhash = Expr::app(bl, subhash, Expr::var_ref(bl, arg_name.clone()));
            }

            let generate = Expr::lambda(bl, "_", body);
            let tget = Expr::lambda(bl, "_fn", Expr::prim(bl, "tget"));
            body = Expr::app(
                bl,
                Expr::app(
                    bl,
                    Expr::app(
                        bl,
                        Expr::app(
                            bl,
                            Expr::lambda(
                                bl,
                                "_target",
                                Expr::lambda(bl, "_hash", Expr::lambda(bl, "_subhash", tget)),
                            ),
                            Expr::var_ref(bl, table_name),
                        ),
                        hash,
                    ),
                    subhash,
                ),
                generate,
            );
        }

        if publish && !args.is_empty() {
            self.error(fn_region, "publish definition may not be a function".to_owned());
        } else {
            for (arg_name, token) in args.into_iter().rev() {
                body = Expr::new(
                    fn_region,
                    BareExpr::Lambda { name: arg_name, token, body: Box::new(body) },
                );
            }
        }

        LoweredDefs {
            table,
            defs: vec![Definition { name, location: head_token, body }],
        }
    }

    /// `def Ctor(a, b) = rhs`: bind the whole body to a hidden name and
    /// synthesize one destructuring match per named sub-pattern, recursing
    /// into nested constructor patterns.
    fn extract_def(
        &self,
        out: &mut Vec<Definition>,
        counter: &mut i64,
        mut ast: Ast,
        body: Expr,
    ) {
        *counter += 1;
        let key = format!("_ extract {counter}");
        let body_span = body.span;
        out.push(Definition { name: key.clone(), location: ast.token, body });

        let mut signature = ast.signature.take();
        let members = std::mem::take(&mut ast.args);
        let count = members.len();

        for (position, mut member) in members.into_iter().enumerate() {
            let mut pattern = Ast::new(ast.region, ast.name.clone());
            pattern.region = ast.region;
            pattern.signature = signature.take();

            let hidden = format!("_{}", member.name);
            let member_signature = member.signature.take();

            for inner in 0..count {
                let mut hole = Ast::new(member.token, "_");
                if inner == position {
                    hole.name = hidden.clone();
                    hole.signature = member_signature.clone();
                }
                pattern.args.push(hole);
            }

            let mut destructure = MatchExpr::new();
            destructure.args.push(Expr::var_ref(body_span, key.clone()));
            destructure.patterns.push(MatchArm {
                pattern,
                body: Expr::var_ref(member.token, hidden),
                guard: None,
            });
            let destructure = Expr::new(member.token, BareExpr::Match(destructure));

            if lexer::is_upper(&member.name) || lexer::is_operator(&member.name) {
                self.extract_def(out, counter, member, destructure);
            } else {
                out.push(Definition {
                    name: member.name,
                    location: member.token,
                    body: destructure,
                });
            }
        }
    }

    fn flatten_cache_args(
        &self,
        element: &CstElement<'_>,
        state: &mut AstState,
    ) -> Vec<Ast> {
        let mut out = Vec::new();
        self.flatten_cache_into(element, state, &mut out);
        out
    }

    fn flatten_cache_into(
        &self,
        element: &CstElement<'_>,
        state: &mut AstState,
        out: &mut Vec<Ast>,
    ) {
        if element.id() == node::APP {
            let kids = children(element);
            if kids.len() == 2 {
                self.flatten_cache_into(&kids[0], state, out);
                out.push(self.parse_ast(&kids[1], state));
                return;
            }
        }
        out.push(self.parse_ast(element, state));
    }

    // ------------------------------------------------------------------
    // binding

    pub(crate) fn bind_def(
        &self,
        map: &mut DefMap,
        mut def: Definition,
        exports: Option<&mut Symbols>,
        globals: Option<&mut Symbols>,
    ) {
        if def.name != "_" {
            // duplicate globals and exports are detected as file-local
            // conflicts later
            if let Some(globals) = globals {
                globals
                    .defs
                    .entry(def.name.clone())
                    .or_insert_with(|| SymbolSource::leaf(def.location));
            }
            if let Some(exports) = exports {
                exports
                    .defs
                    .entry(def.name.clone())
                    .or_insert_with(|| SymbolSource::leaf(def.location));
            }
        }

        // wildcard definitions coexist under hidden names
        if def.name == "_" {
            def.name = format!("_{} _", map.defs.len());
        }

        match map.defs.get(&def.name) {
            Some(previous) => self.error(
                def.location,
                format!(
                    "definition '{}' was previously defined at {}",
                    def.name,
                    self.location(previous.location),
                ),
            ),
            None => {
                map.defs.insert(def.name, DefValue::new(def.location, def.body));
            }
        }
    }

    fn bind_publish(&self, map: &mut DefMap, def: Definition) {
        if lexer::lex_kind(&def.name) != IdKind::Lower {
            self.error(
                def.location,
                format!("publish identifier '{}' is not lower-case", def.name),
            );
        }

        map.publishes
            .entry(def.name)
            .or_default()
            .push(DefValue::new(def.location, def.body));
    }

    pub(crate) fn bind_type(
        &self,
        types: &mut ast::symbols::SymbolMap,
        name: &str,
        location: Span,
        exports: Option<&mut Symbols>,
        globals: Option<&mut Symbols>,
    ) {
        if let Some(globals) = globals {
            globals
                .types
                .entry(name.to_owned())
                .or_insert_with(|| SymbolSource::leaf(location));
        }
        if let Some(exports) = exports {
            exports
                .types
                .entry(name.to_owned())
                .or_insert_with(|| SymbolSource::leaf(location));
        }

        match types.get(name) {
            Some(previous) => self.error(
                location,
                format!(
                    "type '{name}' was previously defined at {}",
                    self.location(previous.location),
                ),
            ),
            None => {
                types.insert(name.to_owned(), SymbolSource::leaf(location));
            }
        }
    }
}

/// Plain wildcard parameters still need distinct binder names.
fn wildcard_renamed(name: &str, position: usize) -> String {
    if name == "_" {
        format!("_ {}", position + 1)
    } else {
        name.to_owned()
    }
}
