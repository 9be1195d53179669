//! Name tables.

use indexmap::IndexMap;
use span::Span;

pub const SYM_LEAF: u32 = 1 << 0;

#[derive(Clone, Debug)]
pub struct SymbolSource {
    pub location: Span,
    /// The `name@package` the symbol resolves to; filled in by
    /// [`Symbols::setpkg`] when empty.
    pub qualified: String,
    pub flags: u32,
}

impl SymbolSource {
    pub fn new(location: Span, qualified: impl Into<String>) -> Self {
        Self { location, qualified: qualified.into(), flags: 0 }
    }

    pub fn leaf(location: Span) -> Self {
        Self { location, qualified: String::new(), flags: SYM_LEAF }
    }
}

pub type SymbolMap = IndexMap<String, SymbolSource>;

/// Four separate namespaces plus the wildcard-import list.
///
/// `mixed` holds imports that did not name a kind and may refer to any of
/// the other three.
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    pub defs: SymbolMap,
    pub types: SymbolMap,
    pub topics: SymbolMap,
    pub mixed: SymbolMap,
    /// Packages imported wholesale (`from p import`).
    pub import_all: Vec<String>,
}

impl Symbols {
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
            && self.types.is_empty()
            && self.topics.is_empty()
            && self.mixed.is_empty()
            && self.import_all.is_empty()
    }

    /// Qualify every entry that does not yet resolve anywhere.
    pub fn setpkg(&mut self, package: &str) {
        for map in [&mut self.defs, &mut self.types, &mut self.topics, &mut self.mixed] {
            for (name, source) in map.iter_mut() {
                if source.qualified.is_empty() {
                    source.qualified = format!("{name}@{package}");
                }
            }
        }
    }

    /// Merge `other` into `self`.
    ///
    /// A clash is passed to `duplicate` (category, name, incoming,
    /// existing): either the two entries resolve to different qualified
    /// targets, or both carry [`SYM_LEAF`] and therefore name two actual
    /// definitions rather than a definition and a re-export. Anything else
    /// merges silently, keeping the flag union.
    pub fn join(
        &mut self,
        other: Symbols,
        mut duplicate: impl FnMut(&'static str, &str, &SymbolSource, &SymbolSource),
    ) {
        let categories = [
            ("definition", &mut self.defs, other.defs),
            ("type", &mut self.types, other.types),
            ("topic", &mut self.topics, other.topics),
            ("symbol", &mut self.mixed, other.mixed),
        ];

        for (category, target, source) in categories {
            for (name, incoming) in source {
                match target.get_mut(&name) {
                    None => {
                        target.insert(name, incoming);
                    }
                    Some(existing)
                        if existing.qualified == incoming.qualified
                            && existing.flags & incoming.flags & SYM_LEAF == 0 =>
                    {
                        existing.flags |= incoming.flags;
                    }
                    Some(existing) => duplicate(category, &name, &incoming, existing),
                }
            }
        }

        for package in other.import_all {
            if !self.import_all.contains(&package) {
                self.import_all.push(package);
            }
        }
    }
}
