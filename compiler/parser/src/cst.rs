//! The concrete syntax tree.
//!
//! The tree is a single flat vector of nodes in document (pre-)order plus a
//! parallel record of every scanned token. Each node stores the number of
//! entries its subtree occupies, so the next sibling of node `i` sits at
//! `i + size` and its first child at `i + 1`. Leaf tokens are not nodes;
//! they are recovered from the token record by byte offset, which keeps the
//! tree compact and lets a walk visit trivia and structure in one pass.

use lexer::Token;
use span::{LocalSpan, Location, SourceFile};

/// Node ids. Token kinds occupy the space below `TokenKind::LIMIT`.
pub mod node {
    pub const APP: u8 = 128;
    pub const ARITY: u8 = 129;
    pub const BINARY: u8 = 130;
    pub const BLOCK: u8 = 131;
    pub const CASE: u8 = 132;
    pub const DATA: u8 = 133;
    pub const DEF: u8 = 134;
    pub const EXPORT: u8 = 135;
    pub const FLAG_EXPORT: u8 = 136;
    pub const FLAG_GLOBAL: u8 = 137;
    pub const GUARD: u8 = 138;
    pub const HOLE: u8 = 139;
    pub const ID: u8 = 140;
    pub const IDEQ: u8 = 141;
    pub const IF: u8 = 142;
    pub const IMPORT: u8 = 143;
    pub const INTERPOLATE: u8 = 144;
    pub const KIND: u8 = 145;
    pub const LAMBDA: u8 = 146;
    pub const LITERAL: u8 = 147;
    pub const MATCH: u8 = 148;
    pub const OP: u8 = 149;
    pub const PACKAGE: u8 = 150;
    pub const PAREN: u8 = 151;
    pub const PRIM: u8 = 152;
    pub const PUBLISH: u8 = 153;
    pub const REQUIRE: u8 = 154;
    pub const SUBSCRIBE: u8 = 155;
    pub const TARGET: u8 = 156;
    pub const TOP: u8 = 157;
    pub const TOPIC: u8 = 158;
    pub const TUPLE: u8 = 159;
    pub const TUPLE_ELT: u8 = 160;
    pub const UNARY: u8 = 161;

    pub const ERROR: u8 = 255;

    /// The display name of a node id, for tree dumps.
    pub fn name(id: u8) -> &'static str {
        match id {
            APP => "APP",
            ARITY => "ARITY",
            BINARY => "BINARY",
            BLOCK => "BLOCK",
            CASE => "CASE",
            DATA => "DATA",
            DEF => "DEF",
            EXPORT => "EXPORT",
            FLAG_EXPORT => "FLAG_EXPORT",
            FLAG_GLOBAL => "FLAG_GLOBAL",
            GUARD => "GUARD",
            HOLE => "HOLE",
            ID => "ID",
            IDEQ => "IDEQ",
            IF => "IF",
            IMPORT => "IMPORT",
            INTERPOLATE => "INTERPOLATE",
            KIND => "KIND",
            LAMBDA => "LAMBDA",
            LITERAL => "LITERAL",
            MATCH => "MATCH",
            OP => "OP",
            PACKAGE => "PACKAGE",
            PAREN => "PAREN",
            PRIM => "PRIM",
            PUBLISH => "PUBLISH",
            REQUIRE => "REQUIRE",
            SUBSCRIBE => "SUBSCRIBE",
            TARGET => "TARGET",
            TOP => "TOP",
            TOPIC => "TOPIC",
            TUPLE => "TUPLE",
            TUPLE_ELT => "TUPLE_ELT",
            UNARY => "UNARY",
            ERROR => "ERROR",
            _ => "TOKEN",
        }
    }
}

/// A token descriptor recovered from the tree: id plus byte range.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TokenInfo {
    pub id: u8,
    pub span: LocalSpan,
}

impl TokenInfo {
    pub fn location(&self, file: &SourceFile) -> Location {
        file.location(self.span)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CstNode {
    /// Token id for leaves the builder wrapped, node id otherwise.
    pub id: u8,
    /// Number of entries to skip to reach the next sibling (always >= 1).
    pub size: u32,
    /// Byte range covered by this node.
    pub begin: u32,
    pub end: u32,
}

/// Append-only builder.
///
/// Tokens arrive in source order as they are scanned (trivia included);
/// nodes are added bottom-up, each one wrapping the most recently finished
/// subtrees. [`CstBuilder::freeze`] reorders the nodes into document order.
pub struct CstBuilder {
    token_ids: Vec<u8>,
    token_starts: Vec<u32>,
    /// Nodes in bottom-up (post-)order.
    nodes: Vec<CstNode>,
    /// Indices of the currently unattached subtree roots.
    roots: Vec<u32>,
}

impl CstBuilder {
    pub fn new() -> Self {
        Self {
            token_ids: Vec::new(),
            token_starts: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Record a scanned token. Tokens must arrive contiguously: each one
    /// starts where the previous one ended.
    pub fn add_token(&mut self, token: Token) {
        debug_assert!(
            self.token_starts.last().map_or(true, |&last| last <= token.span.start)
        );
        self.token_ids.push(token.kind.id());
        self.token_starts.push(token.span.start);
    }

    /// Add a childless node covering the given byte range (one token or a
    /// recovered error region).
    pub fn leaf(&mut self, id: u8, span: LocalSpan) {
        self.roots.push(self.nodes.len() as u32);
        self.nodes.push(CstNode { id, size: 1, begin: span.start, end: span.end });
    }

    /// Wrap the last `children` subtrees into a new node. The node's byte
    /// range is that of its children, optionally widened to `begin`/`end`
    /// (for delimiter tokens that are not nodes themselves).
    pub fn node(&mut self, id: u8, children: usize, begin: Option<u32>, end: Option<u32>) {
        assert!(children <= self.roots.len(), "malformed builder call");

        let first = self.roots.len() - children;
        let kept: Vec<u32> = self.roots.drain(first..).collect();

        let size = 1 + kept.iter().map(|&root| self.nodes[root as usize].size).sum::<u32>();
        let begin = begin
            .or_else(|| kept.first().map(|&root| self.nodes[root as usize].begin))
            .expect("childless node without an explicit span");
        let end = end
            .or_else(|| kept.last().map(|&root| self.nodes[root as usize].end))
            .expect("childless node without an explicit span");

        self.roots.push(self.nodes.len() as u32);
        self.nodes.push(CstNode { id, size, begin: begin.min(end), end: begin.max(end) });
    }

    /// The number of unattached subtree roots built so far.
    pub fn roots(&self) -> usize {
        self.roots.len()
    }

    /// Reorder into document order and freeze.
    pub fn freeze(self) -> Cst {
        assert_eq!(self.roots.len(), 1, "freeze requires a single root");

        let post = self.nodes;
        let mut nodes = Vec::with_capacity(post.len());
        let mut stack = vec![*self.roots.last().unwrap() as usize];

        while let Some(index) = stack.pop() {
            let node = post[index];
            nodes.push(node);

            // discover children right-to-left; pushing them in that order
            // makes the leftmost child pop first
            let first = index + 1 - node.size as usize;
            let mut cursor = index;
            while cursor > first {
                let child = cursor - 1;
                stack.push(child);
                cursor = child + 1 - post[child].size as usize;
            }
        }

        let end = nodes[0].end;
        Cst { token_ids: self.token_ids, token_starts: self.token_starts, nodes, end }
    }
}

impl Default for CstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The frozen tree.
pub struct Cst {
    token_ids: Vec<u8>,
    token_starts: Vec<u32>,
    /// Nodes in document order; `nodes[0]` is the root.
    nodes: Vec<CstNode>,
    end: u32,
}

impl Cst {
    pub fn root(&self) -> CstElement<'_> {
        CstElement {
            cst: self,
            node: 0,
            limit: self.nodes.len() as u32,
            token: self.nodes[0].begin,
            end: self.nodes[0].end,
        }
    }

    /// The index of the token starting at or covering the given byte offset.
    fn token_at(&self, byte: u32) -> usize {
        debug_assert!(!self.token_starts.is_empty());
        self.token_starts.partition_point(|&start| start <= byte) - 1
    }

    fn token_end(&self, index: usize) -> u32 {
        self.token_starts.get(index + 1).copied().unwrap_or(self.end)
    }
}

/// A cursor over the tree.
///
/// An element is either a node or a leaf token; sibling iteration yields
/// both in document order. The `*_node` variants skip leaf tokens, which is
/// what structural consumers want.
#[derive(Clone, Copy)]
pub struct CstElement<'a> {
    cst: &'a Cst,
    node: u32,
    limit: u32,
    /// Byte position of this element.
    token: u32,
    /// Byte position one past the last sibling.
    end: u32,
}

impl<'a> CstElement<'a> {
    pub fn empty(&self) -> bool {
        self.token >= self.end && !self.is_node()
    }

    pub fn is_node(&self) -> bool {
        self.node < self.limit && self.cst.nodes[self.node as usize].begin == self.token
    }

    pub fn id(&self) -> u8 {
        if self.is_node() {
            self.cst.nodes[self.node as usize].id
        } else {
            self.cst.token_ids[self.cst.token_at(self.token)]
        }
    }

    pub fn span(&self) -> LocalSpan {
        if self.is_node() {
            let node = self.cst.nodes[self.node as usize];
            LocalSpan::new(node.begin, node.end)
        } else {
            let index = self.cst.token_at(self.token);
            LocalSpan::new(self.token, self.cst.token_end(index))
        }
    }

    pub fn content(&self) -> TokenInfo {
        TokenInfo { id: self.id(), span: self.span() }
    }

    pub fn location(&self, file: &SourceFile) -> Location {
        file.location(self.span())
    }

    pub fn next_sibling_element(&mut self) {
        if self.is_node() {
            let node = self.cst.nodes[self.node as usize];
            self.token = node.end;
            self.node += node.size;
        } else {
            let index = self.cst.token_at(self.token);
            self.token = self.cst.token_end(index);
        }
    }

    pub fn next_sibling_node(&mut self) {
        self.next_sibling_element();
        self.skip_leaves();
    }

    pub fn first_child_element(&self) -> CstElement<'a> {
        if !self.is_node() {
            // leaves have no children
            return CstElement { cst: self.cst, node: self.limit, limit: self.limit, token: self.end, end: self.end };
        }

        let node = self.cst.nodes[self.node as usize];
        CstElement {
            cst: self.cst,
            node: self.node + 1,
            limit: self.node + node.size,
            token: node.begin,
            end: node.end,
        }
    }

    pub fn first_child_node(&self) -> CstElement<'a> {
        let mut child = self.first_child_element();
        child.skip_leaves();
        child
    }

    fn skip_leaves(&mut self) {
        while !self.empty() && !self.is_node() {
            self.next_sibling_element();
        }
    }
}
