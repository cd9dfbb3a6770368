// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// A table that never emits color codes
fn plain(columns: Vec<Column>) -> Table {
    Table {
        columns,
        rows: Vec::new(),
        colorize: false,
    }
}

fn render_to_string(table: &Table) -> String {
    let mut buf = Vec::new();
    table.render(&mut buf);
    String::from_utf8(buf).unwrap()
}

#[test]
fn empty_table_prints_nothing() {
    let table = plain(vec![Column::left("ID"), Column::status("STATUS")]);
    assert_eq!(render_to_string(&table), "");
}

#[test]
fn multi_column_left_alignment() {
    let mut table = plain(vec![Column::left("ID"), Column::status("STATUS")]);
    table.row(vec!["term-1".into(), "running".into()]);
    table.row(vec!["t2".into(), "destroyed".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 3);
    // ID padded to the widest value; last column unpadded
    assert_eq!(lines[0], "ID      STATUS");
    assert_eq!(lines[1], "term-1  running");
    assert_eq!(lines[2], "t2      destroyed");
}

#[test]
fn right_alignment() {
    let mut table = plain(vec![Column::left("ID"), Column::right("LEFT")]);
    table.row(vec!["a".into(), "5m".into()]);
    table.row(vec!["b".into(), "3h 59m".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "ID    LEFT");
    assert_eq!(lines[1], "a       5m");
    assert_eq!(lines[2], "b   3h 59m");
}

#[test]
fn max_width_truncates_on_char_boundaries() {
    let mut table = plain(vec![Column::left("CMD").with_max(4), Column::left("X")]);
    table.row(vec!["héllo wörld".into(), "x".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[1], "héll  x");
}

#[test]
fn missing_cells_render_empty() {
    let mut table = plain(vec![Column::left("A"), Column::left("B")]);
    table.row(vec!["only".into()]);
    let out = render_to_string(&table);
    assert_eq!(out.lines().nth(1), Some("only  "));
}
