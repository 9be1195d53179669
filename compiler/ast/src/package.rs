//! Packages and the lowering result.

use crate::{Ast, DefMap, Symbols};
use indexmap::IndexMap;
use span::Span;

/// The only non-diagnostic output of the front-end.
#[derive(Debug, Default)]
pub struct Top {
    pub packages: IndexMap<String, Package>,
    pub globals: Symbols,
}

#[derive(Debug, Default)]
pub struct Package {
    pub name: String,
    pub files: Vec<File>,
    pub exports: Symbols,
    /// The package-local symbol table, joined across files.
    pub package: Symbols,
}

/// One source file's contribution to a package.
#[derive(Debug, Default)]
pub struct File {
    pub content: DefMap,
    /// Every name declared in this file, used to detect duplicates.
    pub local: Symbols,
    pub topics: IndexMap<String, Topic>,
}

impl File {
    pub fn new(location: Span) -> Self {
        Self { content: DefMap::new(location), ..Self::default() }
    }
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub location: Span,
    pub signature: Ast,
}
