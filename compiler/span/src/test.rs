use crate::{span, Coordinates, FileName, SourceFileIndex, SourceMap};

fn file(content: &str) -> (SourceMap, SourceFileIndex) {
    let mut map = SourceMap::default();
    let index = map.add(FileName::from("test"), content.to_owned());

    // feed the newline table the way the layout filter does
    let file = map.file_mut(index);
    for (offset, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            file.add_newline(offset as u32 + 1);
        }
    }

    (map, index)
}

#[test]
fn coordinates_of_offset_zero() {
    let (map, index) = file("def x = 1\n");
    assert_eq!(map.file(index).coordinates(0), Coordinates { row: 1, column: 1 });
}

#[test]
fn coordinates_mid_line() {
    let (map, index) = file("def x = 1\ndef y = 2\n");
    assert_eq!(map.file(index).coordinates(4), Coordinates { row: 1, column: 5 });
    assert_eq!(map.file(index).coordinates(14), Coordinates { row: 2, column: 5 });
}

#[test]
fn coordinates_of_a_newline_byte_belong_to_its_line() {
    let (map, index) = file("ab\ncd\n");
    assert_eq!(map.file(index).coordinates(2), Coordinates { row: 1, column: 3 });
    assert_eq!(map.file(index).coordinates(3), Coordinates { row: 2, column: 1 });
}

#[test]
fn columns_count_code_points_not_bytes() {
    // 'δ' is two bytes long
    let (map, index) = file("δδ x\n");
    assert_eq!(map.file(index).coordinates(4), Coordinates { row: 1, column: 3 });
}

#[test]
fn location_end_refers_to_the_last_included_byte() {
    let (map, index) = file("def x = 1\n");
    let location = map.file(index).location(span(0, 3));
    assert_eq!(location.start, Coordinates { row: 1, column: 1 });
    assert_eq!(location.end, Coordinates { row: 1, column: 3 });
    assert_eq!(location.to_string(), "test:1:1-1:3");
}

#[test]
fn location_of_a_single_code_point_collapses() {
    let (map, index) = file("x\n");
    assert_eq!(map.file(index).location(span(0, 1)).to_string(), "test:1:1");
}

#[test]
fn location_end_of_multi_byte_tail() {
    let (map, index) = file("aδ\n");
    // the span covers 'aδ'; its last code point starts at byte 1
    assert_eq!(map.file(index).location(span(0, 3)).to_string(), "test:1:1-1:2");
}

#[test]
fn global_and_local_spans_round_trip() {
    let mut map = SourceMap::default();
    let a = map.add(FileName::from("a"), "aaaa".to_owned());
    let b = map.add(FileName::from("b"), "bbbb".to_owned());

    let local = span(1, 3);
    let global = local.global(map.file(b));
    assert_eq!(global.local(map.file(b)), local);
    assert_eq!(map.snippet(global), "bb");
    assert_eq!(map.snippet(span(0, 4).global(map.file(a))), "aaaa");
}
