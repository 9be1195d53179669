use crate::{Coordinates, LocalByteIndex, LocalSpan, Location, Span};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// A mapping from [index](SourceFileIndex) to [source file](SourceFile).
///
/// The source files are laid out next to each other and padded on their left
/// by one byte to reserve space for _end of input_ pseudo tokens. This frees
/// up the byte index `0` and allows `Span::default()` to be interpreted as an
/// _unknown location_.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    fn next_offset(&self) -> u32 {
        const PADDING: u32 = 1;

        self.files.last().map_or(0, |file| file.span().end) + PADDING
    }

    /// Add text to the map creating a [`SourceFile`] in the process.
    pub fn add(&mut self, name: impl Into<FileName>, content: String) -> SourceFileIndex {
        let offset = self.next_offset();
        self.files.push(SourceFile::new(name.into(), content, offset));
        SourceFileIndex(self.files.len() as u32 - 1)
    }

    pub fn file(&self, index: SourceFileIndex) -> &SourceFile {
        &self.files[index.0 as usize]
    }

    pub fn file_mut(&mut self, index: SourceFileIndex) -> &mut SourceFile {
        &mut self.files[index.0 as usize]
    }

    pub fn file_by_span(&self, span: Span) -> &SourceFile {
        debug_assert!(span != Span::default());

        self.files
            .iter()
            .find(|file| file.span().start <= span.start && span.start <= file.span().end)
            .unwrap_or_else(|| panic!("span {span:?} outside of the source map"))
    }

    /// Resolve a span to the string content it points to.
    pub fn snippet(&self, span: Span) -> &str {
        let file = self.file_by_span(span);
        &file[span.local(file)]
    }

    /// Resolve a span to a human-readable location.
    pub fn location(&self, span: Span) -> Location {
        let file = self.file_by_span(span);
        file.location(span.local(file))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourceFileIndex(u32);

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FileName {
    Real(PathBuf),
    Virtual(String),
}

impl FileName {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Real(path) => Some(path),
            Self::Virtual(_) => None,
        }
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(path) => write!(f, "{}", path.display()),
            Self::Virtual(name) => f.write_str(name),
        }
    }
}

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        Self::Virtual(name.to_owned())
    }
}

impl From<PathBuf> for FileName {
    fn from(path: PathBuf) -> Self {
        Self::Real(path)
    }
}

/// An immutable UTF-8 buffer together with the byte offsets of its line starts.
///
/// The newline table is fed by the layout filter while the file is scanned;
/// [`Self::coordinates`] is only meaningful for positions the scanner has
/// already passed.
pub struct SourceFile {
    name: FileName,
    content: String,
    span: Span,
    newlines: Vec<LocalByteIndex>,
}

impl SourceFile {
    fn new(name: FileName, content: String, offset: u32) -> Self {
        let span = Span::new(offset, offset + content.len() as u32);
        Self { name, content, span, newlines: Vec::new() }
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The global byte range this file occupies inside its map.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn local_span(&self) -> LocalSpan {
        LocalSpan::new(0, self.span.length())
    }

    pub fn clear_newlines(&mut self) {
        self.newlines.clear();
    }

    /// Record a line start: the offset of the first byte after a newline.
    ///
    /// Offsets must be recorded in increasing order.
    pub fn add_newline(&mut self, line_start: LocalByteIndex) {
        debug_assert!(self.newlines.last().map_or(true, |&last| last < line_start));
        self.newlines.push(line_start);
    }

    /// The offset of the first byte of the line containing `position`.
    pub fn line_start(&self, position: LocalByteIndex) -> LocalByteIndex {
        let line = self.newlines.partition_point(|&start| start <= position);
        if line == 0 {
            0
        } else {
            self.newlines[line - 1]
        }
    }

    /// Map a byte offset to 1-based row and code-point column.
    pub fn coordinates(&self, position: LocalByteIndex) -> Coordinates {
        let line = self.newlines.partition_point(|&start| start <= position);
        let line_start = if line == 0 { 0 } else { self.newlines[line - 1] };

        let column = self.content[line_start as usize..position as usize]
            .chars()
            .count() as u32;

        Coordinates { row: line as u32 + 1, column: column + 1 }
    }

    /// The location of a local span, with the end coordinate referring to the
    /// last included byte.
    pub fn location(&self, span: LocalSpan) -> Location {
        let end = if span.is_empty() { span.end } else { last_char_start(&self.content, span) };

        Location {
            filename: self.name.to_string(),
            start: self.coordinates(span.start),
            end: self.coordinates(end),
        }
    }
}

/// The offset of the start of the last code point inside the span.
fn last_char_start(content: &str, span: LocalSpan) -> LocalByteIndex {
    let mut start = span.end - 1;
    // step over UTF-8 continuation bytes
    while start > span.start && content.as_bytes()[start as usize] & 0xc0 == 0x80 {
        start -= 1;
    }
    start
}
