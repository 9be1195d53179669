//! Conversion of diagnostics into the shapes the LSP collaborator serialises.
//!
//! The transport itself lives outside this repository; only the stable wire
//! shapes are defined here.

use crate::Diagnostic;
use serde::Serialize;
use span::SourceMap;

pub const DIAGNOSTIC_SOURCE: &str = "wake";

/// A 0-based line / character pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct PublishDiagnostic {
    pub range: Range,
    pub severity: u8,
    pub source: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn to_lsp(&self, map: &SourceMap) -> PublishDiagnostic {
        let location = map.location(self.span);

        PublishDiagnostic {
            range: Range {
                start: Position {
                    line: location.start.row.saturating_sub(1),
                    character: location.start.column.saturating_sub(1),
                },
                end: Position {
                    line: location.end.row.saturating_sub(1),
                    // may be -1 before flooring when the tail sits on a newline
                    character: location.end.column.saturating_sub(1),
                },
            },
            severity: self.severity.code(),
            source: DIAGNOSTIC_SOURCE,
            message: self.message.clone(),
        }
    }
}
