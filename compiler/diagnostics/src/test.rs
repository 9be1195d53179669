use crate::{Diagnostic, Reporter, Severity};
use span::{span, FileName, SourceMap};

fn map(content: &str) -> SourceMap {
    let mut map = SourceMap::default();
    let index = map.add(FileName::from("test"), content.to_owned());

    let file = map.file_mut(index);
    for (offset, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            file.add_newline(offset as u32 + 1);
        }
    }

    map
}

#[test]
fn severity_codes_are_the_lsp_protocol_values() {
    assert_eq!(Severity::Error.code(), 1);
    assert_eq!(Severity::Warning.code(), 2);
    assert_eq!(Severity::Info.code(), 3);
}

#[test]
fn lsp_conversion_subtracts_one_and_floors() {
    let map = map("def x = 1\ndef y = 2\n");
    let file_span = span(10, 13).global(map_file(&map));

    let lsp = Diagnostic::error(file_span, "broken").to_lsp(&map);
    assert_eq!((lsp.range.start.line, lsp.range.start.character), (1, 0));
    assert_eq!((lsp.range.end.line, lsp.range.end.character), (1, 2));
    assert_eq!(lsp.severity, 1);
    assert_eq!(lsp.source, "wake");
}

#[test]
fn reporter_keeps_discovery_order() {
    let map = map("x\n");
    let reporter = Reporter::new();
    let at = span(0, 1).global(map_file(&map));

    reporter.warning(at, "first");
    reporter.error(at, "second");

    let diagnostics = reporter.into_diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].message, "first");
    assert_eq!(diagnostics[1].severity, Severity::Error);
}

#[test]
fn console_format_contains_the_location() {
    colored::control::set_override(false);

    let map = map("def x = 1\n");
    let diagnostic = Diagnostic::error(span(4, 5).global(map_file(&map)), "unknown identifier 'x'");
    assert_eq!(diagnostic.format(&map), "test:1:5: error: unknown identifier 'x'");
}

fn map_file(map: &SourceMap) -> &span::SourceFile {
    map.file_by_span(span::Span::new(1, 1))
}
