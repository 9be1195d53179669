//! Lowering of the concrete syntax tree into packages of desugared
//! expressions.
//!
//! One call per file; files of the same package accumulate into the shared
//! [`Top`]. Lowering never fails: broken regions of the tree become
//! placeholder expressions carrying the offending location, and every
//! problem is reported to the shared sink.

use ast::{File, Package, SymbolSource, Symbols, Top, SYM_LEAF};
use diagnostics::Reporter;
use lexer::IdKind;
use parser::cst::{node, Cst, CstElement};
use span::{LocalSpan, Location, SourceFile, SourceMap, Span};

mod data;
mod def;
mod expr;
mod pattern;
mod types;

#[cfg(test)]
mod test;

/// Lower one parsed file into `top`, merging with any package of the same
/// name lowered earlier. Returns the package name the file ended up in.
pub fn lower(
    cst: &Cst,
    file: &SourceFile,
    map: &SourceMap,
    top: &mut Top,
    reporter: &Reporter,
) -> String {
    Lowerer { file, map, reporter }.lower_top(cst, top)
}

pub(crate) struct Lowerer<'a> {
    pub(crate) file: &'a SourceFile,
    pub(crate) map: &'a SourceMap,
    pub(crate) reporter: &'a Reporter,
}

/// Collect an element's child nodes.
pub(crate) fn children<'a>(element: &CstElement<'a>) -> Vec<CstElement<'a>> {
    let mut out = Vec::new();
    let mut child = element.first_child_node();
    while !child.empty() {
        out.push(child);
        child.next_sibling_node();
    }
    out
}

#[derive(Clone, Copy, Default)]
pub(crate) struct TopFlags {
    pub(crate) globalf: bool,
    pub(crate) exportf: bool,
}

/// Leading `FLAG_GLOBAL` / `FLAG_EXPORT` children; returns the flags and
/// the index of the first non-flag child.
pub(crate) fn parse_flags(kids: &[CstElement<'_>]) -> (TopFlags, usize) {
    let mut flags = TopFlags::default();
    let mut index = 0;

    for kid in kids {
        match kid.id() {
            node::FLAG_GLOBAL => flags.globalf = true,
            node::FLAG_EXPORT => flags.exportf = true,
            _ => break,
        }
        index += 1;
    }

    (flags, index)
}

impl<'a> Lowerer<'a> {
    // ------------------------------------------------------------------
    // small helpers

    pub(crate) fn span(&self, element: &CstElement<'_>) -> Span {
        element.span().global(self.file)
    }

    pub(crate) fn global(&self, span: LocalSpan) -> Span {
        span.global(self.file)
    }

    pub(crate) fn text(&self, element: &CstElement<'_>) -> &'a str {
        // reborrow through the file reference to keep the 'a lifetime
        let span = element.span();
        &self.file[span]
    }

    pub(crate) fn render(&self, element: &CstElement<'_>) -> String {
        lexer::render_snippet(self.text(element))
    }

    pub(crate) fn location(&self, span: Span) -> Location {
        self.map.location(span)
    }

    pub(crate) fn error(&self, span: Span, message: String) {
        self.reporter.error(span, message);
    }

    /// The name under an `ID` or `OP` node.
    pub(crate) fn identifier(&self, element: &CstElement<'_>) -> String {
        debug_assert!(matches!(element.id(), node::ID | node::OP | node::HOLE));
        let token = element.first_child_element();
        lexer::relex_id(&self.file[token.content().span])
    }

    // ------------------------------------------------------------------
    // the top level

    fn lower_top(&self, cst: &Cst, top: &mut Top) -> String {
        let root = cst.root();
        let mut package = Package::default();
        package.files.push(File::new(self.span(&root)));
        let mut globals = Symbols::default();

        let mut topdef = root.first_child_node();
        while !topdef.empty() {
            match topdef.id() {
                node::PACKAGE => self.lower_package_decl(&topdef, &mut package),
                node::IMPORT => {
                    let file = package.files.last_mut().unwrap();
                    self.lower_import(&topdef, &mut file.content.imports);
                }
                node::EXPORT => self.lower_export(&topdef, &mut package),
                node::TOPIC => self.lower_topic(&topdef, &mut package, &mut globals),
                node::DATA => self.lower_data(&topdef, &mut package, &mut globals),
                node::TUPLE => self.lower_tuple(&topdef, &mut package, &mut globals),
                node::DEF | node::TARGET | node::PUBLISH => {
                    let exports = &mut package.exports;
                    let file = package.files.last_mut().unwrap();
                    self.lower_def_into(
                        &topdef,
                        &mut file.content,
                        Some(exports),
                        Some(&mut globals),
                    );
                }
                node::ERROR => {}
                _ => {}
            }
            topdef.next_sibling_node();
        }

        // a file with no imports implicitly imports the standard package
        let file = package.files.last_mut().unwrap();
        if file.content.imports.is_empty() {
            file.content.imports.import_all.push("wake".to_owned());
        }

        // the file name doubles as the package name when none was declared
        if package.name.is_empty() {
            package.name = self.file.name().to_string();
        }

        let name = package.name.clone();
        package.exports.setpkg(&name);
        globals.setpkg(&name);

        top.globals.join(globals, |category, symbol, incoming, existing| {
            self.error(
                incoming.location,
                format!(
                    "global {category} '{symbol}' was previously defined at {}",
                    self.location(existing.location),
                ),
            );
        });

        self.localize(&mut package);

        match top.packages.get_mut(&name) {
            None => {
                let file = package.files.last().unwrap();
                package.package = file.local.clone();
                top.packages.insert(name.clone(), package);
            }
            Some(existing) => {
                let file = package.files.pop().unwrap();
                existing.package.join(file.local.clone(), |category, symbol, incoming, old| {
                    self.error(
                        incoming.location,
                        format!(
                            "package-local {category} '{symbol}' was previously defined at {}",
                            self.location(old.location),
                        ),
                    );
                });
                // duplicated exports were already reported as package-local
                existing.exports.join(package.exports, |_, _, _, _| {});
                existing.files.push(file);
            }
        }

        name
    }

    fn lower_package_decl(&self, topdef: &CstElement<'_>, package: &mut Package) {
        let kids = children(topdef);
        let Some(child) = kids.first() else { return };
        let id = self.identifier(child);

        if id == "builtin" {
            self.error(self.span(child), "package name 'builtin' is illegal.".to_owned());
        } else if package.name.is_empty() {
            package.name = id;
        } else {
            self.error(
                self.span(topdef),
                format!("package name redefined from '{}' to '{id}'", package.name),
            );
        }
    }

    // ------------------------------------------------------------------
    // imports and exports

    fn lower_import(&self, topdef: &CstElement<'_>, imports: &mut Symbols) {
        let kids = children(topdef);
        let Some(package) = kids.first() else { return };
        let pkgname = self.identifier(package);
        let mut index = 1;

        let mut kind = "symbol";
        let mut selector = Selector::Mixed;

        if index < kids.len() && kids[index].id() == node::KIND {
            (kind, selector) = self.parse_kind(&kids[index]);
            index += 1;
        }

        let arity = self.parse_arity(&kids, &mut index);

        // no names: a wildcard import of the whole package
        if index == kids.len() {
            imports.import_all.push(pkgname);
            return;
        }

        let target = selector.select(imports);

        for ideq in &kids[index..] {
            if ideq.id() != node::IDEQ {
                continue;
            }
            let parts = children(ideq);
            let Some(&first) = parts.first() else { continue };

            let mut op1 = first.id();
            let mut name = self.identifier(&first);

            let (op2, source) = match parts.get(1) {
                None => (op1, format!("{name}@{pkgname}")),
                Some(second) => {
                    let op2 = second.id();
                    if op2 == op1 || arity.unary || arity.binary {
                        (op2, format!("{}@{pkgname}", self.identifier(second)))
                    } else {
                        // a rename across symbol kinds needs the arity spelled out
                        self.error(
                            self.span(ideq),
                            format!(
                                "keyword 'binary' or 'unary' required when changing symbol type for {}",
                                self.render(ideq),
                            ),
                        );
                        op1 = op2;
                        name = self.identifier(second);
                        (op2, format!("{name}@{pkgname}"))
                    }
                }
            };

            let mut source = source;
            if op1 == node::OP {
                prefix_op(arity, &mut name);
            }
            if op2 == node::OP {
                prefix_op(arity, &mut source);
            }

            let location = self.span(ideq);
            match target.get(&name) {
                Some(previous) => {
                    self.error(
                        location,
                        format!(
                            "{kind} '{name}' was previously imported at {}",
                            self.location(previous.location),
                        ),
                    );
                }
                None => {
                    target.insert(name, SymbolSource::new(location, source));
                }
            }
        }
    }

    fn lower_export(&self, topdef: &CstElement<'_>, package: &mut Package) {
        let kids = children(topdef);
        let Some(pkg) = kids.first() else { return };
        let pkgname = self.identifier(pkg);
        let mut index = 1;

        let (kind, selector) = if index < kids.len() && kids[index].id() == node::KIND {
            let parsed = self.parse_kind(&kids[index]);
            index += 1;
            parsed
        } else {
            self.error(
                self.span(topdef),
                "from ... export must be followed by 'def', 'type', or 'topic'".to_owned(),
            );
            return;
        };

        let arity = self.parse_arity(&kids, &mut index);

        let exports = selector.select(&mut package.exports);
        let file = package.files.last_mut().unwrap();
        let local = selector.select(&mut file.local);

        for ideq in &kids[index..] {
            if ideq.id() != node::IDEQ {
                continue;
            }
            let parts = children(ideq);
            let Some(&first) = parts.first() else { continue };

            let op1 = first.id();
            let mut name = self.identifier(&first);

            let (op2, mut source) = match parts.get(1) {
                None => (op1, format!("{name}@{pkgname}")),
                Some(second) => {
                    (second.id(), format!("{}@{pkgname}", self.identifier(second)))
                }
            };

            if (op1 == node::OP || op2 == node::OP) && !(arity.unary || arity.binary) {
                self.error(
                    self.span(ideq),
                    format!("export of {} must specify 'unary' or 'binary'", self.render(ideq)),
                );
                continue;
            }

            if op1 == node::OP {
                prefix_op(arity, &mut name);
            }
            if op2 == node::OP {
                prefix_op(arity, &mut source);
            }

            let location = self.span(ideq);
            exports.insert(name.clone(), SymbolSource::new(location, source.clone()));
            // duplicates will be detected as file-local
            match local.get(&name) {
                Some(previous) => {
                    self.error(
                        location,
                        format!(
                            "{kind} '{name}' was previously defined at {}",
                            self.location(previous.location),
                        ),
                    );
                }
                None => {
                    local.insert(name, SymbolSource::new(location, source));
                }
            }
        }
    }

    fn parse_kind(&self, element: &CstElement<'_>) -> (&'static str, Selector) {
        let token = element.first_child_element();
        let id = token.id();

        if id == lexer::TokenKind::Def.id() {
            ("definition", Selector::Defs)
        } else if id == lexer::TokenKind::Type.id() {
            ("type", Selector::Types)
        } else if id == lexer::TokenKind::Topic.id() {
            ("topic", Selector::Topics)
        } else {
            ("symbol", Selector::Mixed)
        }
    }

    fn parse_arity(&self, kids: &[CstElement<'_>], index: &mut usize) -> ImportArity {
        let mut arity = ImportArity::default();

        if *index < kids.len() && kids[*index].id() == node::ARITY {
            let token = kids[*index].first_child_element();
            if token.id() == lexer::TokenKind::Unary.id() {
                arity.unary = true;
            } else {
                arity.binary = true;
            }
            *index += 1;
        }

        arity
    }

    // ------------------------------------------------------------------
    // topics

    fn lower_topic(&self, topdef: &CstElement<'_>, package: &mut Package, globals: &mut Symbols) {
        let kids = children(topdef);
        let (flags, index) = parse_flags(&kids);
        let Some(id_element) = kids.get(index) else { return };

        let id = self.identifier(id_element);
        let location = self.span(id_element);
        if lexer::lex_kind(&id) != IdKind::Lower {
            self.error(location, format!("topic identifier '{id}' is not lower-case"));
            return;
        }

        let Some(signature_element) = kids.get(index + 1) else { return };
        let signature = self.parse_type(signature_element);

        if !types::signature_closes(&signature) {
            self.error(
                signature.region,
                format!("topic '{id}' has an invalid type signature"),
            );
        }

        let file = package.files.last_mut().unwrap();
        match file.topics.get(&id) {
            Some(previous) => {
                self.error(
                    location,
                    format!(
                        "topic '{id}' was previously defined at {}",
                        self.location(previous.location),
                    ),
                );
                return;
            }
            None => {
                file.topics.insert(id.clone(), ast::Topic { location, signature });
            }
        }

        if flags.exportf {
            package.exports.topics.insert(id.clone(), SymbolSource::leaf(location));
        }
        if flags.globalf {
            globals.topics.insert(id, SymbolSource::leaf(location));
        }
    }

    // ------------------------------------------------------------------
    // localisation

    /// Rewrite every top-level name from `n` to `n@package` and record both
    /// spellings in the file-local table.
    fn localize(&self, package: &mut Package) {
        let pkg = package.name.clone();
        let file = package.files.last_mut().unwrap();

        let defs = std::mem::take(&mut file.content.defs);
        for (name, value) in defs {
            let qualified = format!("{name}@{pkg}");
            match file.local.defs.get_mut(&name) {
                None => {
                    let mut source = SymbolSource::new(value.location, qualified.clone());
                    source.flags |= SYM_LEAF;
                    file.local.defs.insert(name.clone(), source);
                }
                Some(existing) if existing.qualified == qualified => {
                    // a re-export of this very definition; keep both
                    existing.location = value.location;
                    existing.flags |= SYM_LEAF;
                    if let Some(export) = package.exports.defs.get_mut(&name) {
                        export.flags |= SYM_LEAF;
                    }
                }
                Some(existing) => {
                    self.error(
                        value.location,
                        format!(
                            "definition '{name}' was previously defined at {}",
                            self.location(existing.location),
                        ),
                    );
                }
            }
            file.content.defs.insert(qualified, value);
        }

        for (name, topic) in &file.topics {
            let qualified = format!("{name}@{pkg}");
            match file.local.topics.get_mut(name) {
                None => {
                    let mut source = SymbolSource::new(topic.location, qualified);
                    source.flags |= SYM_LEAF;
                    file.local.topics.insert(name.clone(), source);
                }
                Some(existing) if existing.qualified == qualified => {
                    existing.location = topic.location;
                    existing.flags |= SYM_LEAF;
                    if let Some(export) = package.exports.topics.get_mut(name) {
                        export.flags |= SYM_LEAF;
                    }
                }
                Some(existing) => {
                    self.error(
                        topic.location,
                        format!(
                            "topic '{name}' was previously defined at {}",
                            self.location(existing.location),
                        ),
                    );
                }
            }
        }

        for (name, source) in &package.package.types {
            let qualified = format!("{name}@{pkg}");
            match file.local.types.get_mut(name) {
                None => {
                    let mut local = SymbolSource::new(source.location, qualified);
                    local.flags |= SYM_LEAF;
                    file.local.types.insert(name.clone(), local);
                }
                Some(existing) if existing.qualified == qualified => {
                    existing.location = source.location;
                    existing.flags |= SYM_LEAF;
                    if let Some(export) = package.exports.types.get_mut(name) {
                        export.flags |= SYM_LEAF;
                    }
                }
                Some(existing) => {
                    self.error(
                        source.location,
                        format!(
                            "type '{name}' was previously defined at {}",
                            self.location(existing.location),
                        ),
                    );
                }
            }
        }
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct ImportArity {
    pub(crate) unary: bool,
    pub(crate) binary: bool,
}

/// Which of the four symbol namespaces an import/export targets.
#[derive(Clone, Copy)]
enum Selector {
    Defs,
    Types,
    Topics,
    Mixed,
}

impl Selector {
    fn select(self, symbols: &mut Symbols) -> &mut ast::symbols::SymbolMap {
        match self {
            Self::Defs => &mut symbols.defs,
            Self::Types => &mut symbols.types,
            Self::Topics => &mut symbols.topics,
            Self::Mixed => &mut symbols.mixed,
        }
    }
}

/// Operator symbols are stored with their arity spelled out; without one
/// the resolver disambiguates later.
pub(crate) fn prefix_op(arity: ImportArity, name: &mut String) {
    let prefix = if arity.unary {
        "unary "
    } else if arity.binary {
        "binary "
    } else {
        "op "
    };
    name.insert_str(0, prefix);
}
