//! `data` and `tuple` declarations.

use crate::{children, def::Definition, parse_flags, Lowerer};
use ast::{
    Ast, BareExpr, DefMap, DefValue, Expr, Package, Sum, Symbols, FLAG_SYNTHETIC,
};
use lexer::IdKind;
use parser::cst::{node, CstElement};
use std::rc::Rc;
use utilities::HashSet;

impl Lowerer<'_> {
    pub(crate) fn lower_data(
        &self,
        topdef: &CstElement<'_>,
        package: &mut Package,
        globals: &mut Symbols,
    ) {
        let kids = children(topdef);
        let (flags, index) = parse_flags(&kids);
        let Some(head) = kids.get(index) else { return };

        let mut sum = Sum::from_ast(self.parse_type(head));
        if sum.args.is_empty() && lexer::lex_kind(&sum.name) == IdKind::Lower {
            self.error(
                self.span(head),
                format!("data type '{}' must be upper-case or operator", sum.name),
            );
        }
        self.check_type_args(&sum);

        for element in &kids[index + 1..] {
            if element.id() == node::ERROR {
                continue;
            }
            let cons = self.parse_type(element);
            if !cons.tag.is_empty() {
                self.error(
                    cons.region,
                    format!("constructor '{}' should not be tagged with {}", cons.name, cons.tag),
                );
            }
            match lexer::lex_kind(&cons.name) {
                IdKind::Lower if cons.args.is_empty() => self.error(
                    cons.token,
                    format!("constructor '{}' must be upper-case or operator", cons.name),
                ),
                IdKind::Operator if cons.args.is_empty() => self.error(
                    cons.token,
                    format!("operator constructor '{}' requires an argument", cons.name),
                ),
                _ => {}
            }
            sum.add_constructor(cons);
        }

        self.bind_type(
            &mut package.package.types,
            &sum.name.clone(),
            sum.token,
            if flags.exportf { Some(&mut package.exports) } else { None },
            if flags.globalf { Some(&mut *globals) } else { None },
        );

        let sum = Rc::new(sum);
        let file = package.files.last_mut().unwrap();

        for (index, member) in sum.members.iter().enumerate() {
            let mut construct =
                Expr::new(member.ast.token, BareExpr::Construct { sum: sum.clone(), index });
            for _ in &member.ast.args {
                construct = Expr::lambda(member.ast.token, "_", construct);
            }

            self.bind_def(
                &mut file.content,
                Definition {
                    name: member.ast.name.clone(),
                    location: member.ast.token,
                    body: construct,
                },
                if flags.exportf { Some(&mut package.exports) } else { None },
                if flags.globalf { Some(&mut *globals) } else { None },
            );
        }
    }

    pub(crate) fn lower_tuple(
        &self,
        topdef: &CstElement<'_>,
        package: &mut Package,
        globals: &mut Symbols,
    ) {
        let kids = children(topdef);
        let (flags, index) = parse_flags(&kids);
        let Some(head) = kids.get(index) else { return };

        let mut sum = Sum::from_ast(self.parse_type(head));
        if lexer::lex_kind(&sum.name) != IdKind::Upper {
            self.error(
                self.span(head),
                format!("tuple type '{}' must be upper-case", sum.name),
            );
        }
        self.check_type_args(&sum);

        let name = sum.name.clone();

        let mut tuple = Ast::new(sum.token, name.clone());
        tuple.region = sum.region;
        let mut member_flags = Vec::new();

        for element in &kids[index + 1..] {
            if element.id() != node::TUPLE_ELT {
                continue;
            }
            let ekids = children(element);
            let (mflags, eindex) = parse_flags(&ekids);
            let Some(signature) = ekids.get(eindex) else { continue };
            member_flags.push(mflags);
            tuple.args.push(self.parse_type(signature));
        }

        sum.add_constructor(tuple);
        let sum = Rc::new(sum);
        let ctor = &sum.members[0];

        // the constructor takes the members in declaration order
        let mut construct = Expr::new(ctor.ast.token, BareExpr::Construct { sum: sum.clone(), index: 0 });
        for arg in ctor.ast.args.iter().rev() {
            construct = Expr::lambda(ctor.ast.token, arg.tag.clone(), construct);
        }

        self.bind_type(
            &mut package.package.types,
            &name,
            sum.token,
            if flags.exportf { Some(&mut package.exports) } else { None },
            if flags.globalf { Some(&mut *globals) } else { None },
        );

        let file = package.files.last_mut().unwrap();
        self.bind_def(
            &mut file.content,
            Definition { name: ctor.ast.name.clone(), location: ctor.ast.token, body: construct },
            if flags.exportf { Some(&mut package.exports) } else { None },
            if flags.globalf { Some(&mut *globals) } else { None },
        );

        // get/set/edit helper methods for the upper-case members
        let member_count = ctor.ast.args.len();
        let mut outer = 0;

        for (position, member) in ctor.ast.args.iter().enumerate() {
            let mname = member.tag.clone();
            let member_token = member.region;
            let exportb = member_flags[position].exportf;
            let globalb = member_flags[position].globalf;

            if lexer::lex_kind(&mname) != IdKind::Upper {
                continue;
            }

            let get = Get { sum: &sum, member_token };

            // get
            let mut getfn = Expr::lambda(member_token, "_", get.field(position));
            getfn.flags |= FLAG_SYNTHETIC;
            self.bind_def(
                &mut file.content,
                Definition {
                    name: format!("get{name}{mname}"),
                    location: member_token,
                    body: getfn,
                },
                if exportb { Some(&mut package.exports) } else { None },
                if globalb { Some(&mut *globals) } else { None },
            );

            // edit
            let mut editmap = DefMap::new(member_token);
            editmap.body = Some(Box::new(Expr::new(
                member_token,
                BareExpr::Construct { sum: sum.clone(), index: 0 },
            )));
            for inner in 0..member_count {
                let mut select = get.field(inner);
                if inner == outer {
                    select = Expr::app(
                        member_token,
                        Expr::var_ref(member_token, format!("fn{mname}")),
                        Expr::app(
                            member_token,
                            Expr::lambda(member_token, "_", select),
                            Expr::var_ref(member_token, "_ x"),
                        ),
                    );
                }
                editmap.defs.insert(
                    slot_name(member_count - inner),
                    DefValue::new(member_token, select),
                );
            }

            let mut editfn = Expr::new(
                member_token,
                BareExpr::Lambda {
                    name: format!("fn{mname}"),
                    token: member_token,
                    body: Box::new(Expr::new(
                        member_token,
                        BareExpr::Lambda {
                            name: "_ x".to_owned(),
                            token: member_token,
                            body: Box::new(Expr::new(member_token, BareExpr::DefMap(editmap))),
                        },
                    )),
                },
            );
            editfn.flags |= FLAG_SYNTHETIC;
            self.bind_def(
                &mut file.content,
                Definition {
                    name: format!("edit{name}{mname}"),
                    location: member_token,
                    body: editfn,
                },
                if exportb { Some(&mut package.exports) } else { None },
                if globalb { Some(&mut *globals) } else { None },
            );

            // set
            let mut setmap = DefMap::new(member_token);
            setmap.body = Some(Box::new(Expr::new(
                member_token,
                BareExpr::Construct { sum: sum.clone(), index: 0 },
            )));
            for inner in 0..member_count {
                let select = if inner == outer {
                    Expr::var_ref(member_token, mname.clone())
                } else {
                    get.field(inner)
                };
                setmap.defs.insert(
                    slot_name(member_count - inner),
                    DefValue::new(member_token, select),
                );
            }

            let mut setfn = Expr::new(
                member_token,
                BareExpr::Lambda {
                    name: mname.clone(),
                    token: member_token,
                    body: Box::new(Expr::new(
                        member_token,
                        BareExpr::Lambda {
                            name: "_ x".to_owned(),
                            token: member_token,
                            body: Box::new(Expr::new(member_token, BareExpr::DefMap(setmap))),
                        },
                    )),
                },
            );
            setfn.flags |= FLAG_SYNTHETIC;
            self.bind_def(
                &mut file.content,
                Definition {
                    name: format!("set{name}{mname}"),
                    location: member_token,
                    body: setfn,
                },
                if exportb { Some(&mut package.exports) } else { None },
                if globalb { Some(&mut *globals) } else { None },
            );

            outer += 1;
        }
    }

    fn check_type_args(&self, sum: &Sum) {
        let mut seen = HashSet::default();
        for arg in &sum.args {
            if !lexer::is_lower(&arg.name) {
                self.error(
                    arg.token,
                    format!("type argument must be lower-case, not '{}'", arg.name),
                );
            }
            if !seen.insert(arg.name.clone()) {
                self.error(
                    arg.token,
                    format!("type argument '{}' occurs more than once", arg.name),
                );
            }
        }
    }
}

/// Internal member slot names count down so that the constructor's
/// arguments line up with the declaration order.
fn slot_name(position: usize) -> String {
    format!("_ a{position:04}")
}

/// Shorthand for building member projections out of a shared sum.
struct Get<'a> {
    sum: &'a Rc<Sum>,
    member_token: span::Span,
}

impl Get<'_> {
    fn field(&self, field: usize) -> Expr {
        Expr::new(
            self.member_token,
            BareExpr::Get { sum: self.sum.clone(), index: 0, field },
        )
    }
}
