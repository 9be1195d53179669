//! Data structures and procedures for handling source locations.

use std::{fmt, io, ops::Index, path::PathBuf};

pub use source_map::{FileName, SourceFile, SourceFileIndex, SourceMap};

pub mod source_map;

#[cfg(test)]
mod test;

/// A byte index relative to a [source map](SourceMap).
pub type ByteIndex = u32;

/// A byte index relative to the start of a single [source file](SourceFile).
pub type LocalByteIndex = u32;

/// A half-open byte span `[start, end)` relative to a [source map](SourceMap).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// The start of the span, inclusive.
    pub start: ByteIndex,
    /// The end of the span, exclusive.
    pub end: ByteIndex,
}

impl Span {
    pub fn new(start: ByteIndex, end: ByteIndex) -> Self {
        debug_assert!(start <= end, "span start ({start}) > span end ({end})");

        Self { start, end }
    }

    /// Create an empty span at the given index.
    pub fn empty(index: ByteIndex) -> Self {
        Self::new(index, index)
    }

    pub fn length(self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    #[must_use]
    pub fn fit_end(self, other: Self) -> Self {
        Self::new(self.start, other.end)
    }

    pub fn local(self, file: &SourceFile) -> LocalSpan {
        LocalSpan::new(self.start - file.span().start, self.end - file.span().start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A span inside a single source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocalSpan {
    pub start: LocalByteIndex,
    pub end: LocalByteIndex,
}

impl LocalSpan {
    pub fn new(start: LocalByteIndex, end: LocalByteIndex) -> Self {
        debug_assert!(start <= end, "span start ({start}) > span end ({end})");

        Self { start, end }
    }

    pub fn empty(index: LocalByteIndex) -> Self {
        Self::new(index, index)
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn global(self, file: &SourceFile) -> Span {
        Span::new(file.span().start + self.start, file.span().start + self.end)
    }
}

impl fmt::Debug for LocalSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<LocalSpan> for std::ops::Range<usize> {
    fn from(span: LocalSpan) -> Self {
        span.start as usize..span.end as usize
    }
}

impl Index<LocalSpan> for SourceFile {
    type Output = str;

    fn index(&self, span: LocalSpan) -> &str {
        &self.content()[std::ops::Range::from(span)]
    }
}

/// A 1-based row / column pair.
///
/// Columns count Unicode code points, not bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Coordinates {
    pub row: u32,
    pub column: u32,
}

/// A human-readable source region: file name plus start and end coordinates.
///
/// The end coordinate refers to the last byte included in the region,
/// not the one past it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Location {
    pub filename: String,
    pub start: Coordinates,
    pub end: Coordinates,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.start.row, self.start.column)?;

        if self.start != self.end {
            write!(f, "-{}:{}", self.end.row, self.end.column)?;
        }

        Ok(())
    }
}

/// Convenience function for constructing a local span in test code.
pub fn span(start: u32, end: u32) -> LocalSpan {
    LocalSpan::new(start, end)
}

/// Open a file, validate it as UTF-8 and add it to the map.
///
/// Invalid sequences are replaced so that scanning can proceed; the caller
/// is informed through the returned flag and is expected to report them.
pub fn load(map: &mut SourceMap, path: PathBuf) -> io::Result<(SourceFileIndex, bool)> {
    let bytes = std::fs::read(&path)?;
    let (content, lossy) = match String::from_utf8(bytes) {
        Ok(content) => (content, false),
        Err(error) => (String::from_utf8_lossy(error.as_bytes()).into_owned(), true),
    };

    Ok((map.add(FileName::Real(path), content), lossy))
}
