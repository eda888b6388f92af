use std::collections::HashSet;

use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use tabula_model::paste::{ParsedCell, ParsedTable};

/// Failures while extracting a table from a clipboard HTML fragment.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum HtmlTableError {
    #[error("clipboard fragment contains no <table>")]
    NoTable,
    #[error("table contains no rows")]
    NoRows,
}

/// Parse the first `<table>` of an HTML fragment into leading-cell records.
///
/// Clipboard HTML is rarely well-formed XML, so the reader runs with end-name
/// checking disabled and treats read errors as end of input. An occupancy set
/// tracks cells reserved by open rowspans: when a new cell is placed, the
/// column cursor advances past reserved positions, exactly like the browser's
/// table layout algorithm. Nested tables contribute only their text.
pub fn parse_html_table(html: &str) -> Result<ParsedTable, HtmlTableError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut seen_table = false;
    let mut table_depth = 0u32;
    // Row index is established by <tr>; -1 means "before the first row".
    let mut row: i64 = -1;
    let mut row_count: u32 = 0;
    let mut cursor: u32 = 0;
    let mut max_cols: u32 = 0;
    let mut occupied: HashSet<(u32, u32)> = HashSet::new();
    let mut open_cell: Option<OpenCell> = None;
    let mut cells: Vec<ParsedCell> = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_) => break,
        };
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name().as_ref().to_ascii_lowercase();
                let self_closing = matches!(event, Event::Empty(_));
                match name.as_slice() {
                    b"table" => {
                        if !self_closing {
                            table_depth += 1;
                            if table_depth == 1 {
                                seen_table = true;
                            }
                        }
                    }
                    b"tr" if table_depth == 1 && !self_closing => {
                        finalize(&mut open_cell, &mut cells, &mut occupied, &mut max_cols);
                        row += 1;
                        row_count += 1;
                        cursor = 0;
                    }
                    b"td" | b"th" if table_depth == 1 && row >= 0 => {
                        finalize(&mut open_cell, &mut cells, &mut occupied, &mut max_cols);
                        let r = row as u32;
                        while occupied.contains(&(r, cursor)) {
                            cursor += 1;
                        }
                        let cell = OpenCell {
                            r,
                            c: cursor,
                            row_span: span_attr(e, b"rowspan"),
                            col_span: span_attr(e, b"colspan"),
                            text: String::new(),
                        };
                        cursor += cell.col_span;
                        if self_closing {
                            place(cell, &mut cells, &mut occupied, &mut max_cols);
                        } else {
                            open_cell = Some(cell);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name().as_ref().to_ascii_lowercase();
                match name.as_slice() {
                    b"td" | b"th" if table_depth == 1 => {
                        finalize(&mut open_cell, &mut cells, &mut occupied, &mut max_cols);
                    }
                    b"table" => {
                        if table_depth > 0 {
                            table_depth -= 1;
                            if table_depth == 0 {
                                break;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(cell) = &mut open_cell {
                    let raw = String::from_utf8_lossy(t).into_owned();
                    let text = unescape_with(&raw, html_entity)
                        .map(|cow| cow.into_owned())
                        .unwrap_or(raw);
                    cell.text.push_str(&text);
                }
            }
            Event::CData(ref t) => {
                if let Some(cell) = &mut open_cell {
                    cell.text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    finalize(&mut open_cell, &mut cells, &mut occupied, &mut max_cols);

    if !seen_table {
        return Err(HtmlTableError::NoTable);
    }
    if row_count == 0 {
        return Err(HtmlTableError::NoRows);
    }

    // Rowspans extending past the last row are clipped, so that
    // `r + rowSpan <= rows` holds for every cell.
    for cell in &mut cells {
        cell.row_span = cell.row_span.min(row_count - cell.r);
    }

    Ok(ParsedTable {
        rows: row_count,
        cols: max_cols,
        cells,
    })
}

struct OpenCell {
    r: u32,
    c: u32,
    row_span: u32,
    col_span: u32,
    text: String,
}

fn finalize(
    open_cell: &mut Option<OpenCell>,
    cells: &mut Vec<ParsedCell>,
    occupied: &mut HashSet<(u32, u32)>,
    max_cols: &mut u32,
) {
    if let Some(cell) = open_cell.take() {
        place(cell, cells, occupied, max_cols);
    }
}

fn place(
    cell: OpenCell,
    cells: &mut Vec<ParsedCell>,
    occupied: &mut HashSet<(u32, u32)>,
    max_cols: &mut u32,
) {
    for r in cell.r..cell.r + cell.row_span {
        for c in cell.c..cell.c + cell.col_span {
            occupied.insert((r, c));
        }
    }
    *max_cols = (*max_cols).max(cell.c + cell.col_span);

    let value = cell.text.replace('\u{a0}', " ").trim().to_string();
    cells.push(ParsedCell {
        r: cell.r,
        c: cell.c,
        value,
        row_span: cell.row_span,
        col_span: cell.col_span,
    });
}

fn span_attr(e: &BytesStart<'_>, key: &[u8]) -> u32 {
    // Clipboard HTML routinely carries unquoted attribute values, so the
    // HTML-flavored attribute iterator is required here.
    for attr in e.html_attributes().flatten() {
        if attr.key.as_ref().eq_ignore_ascii_case(key) {
            let raw = String::from_utf8_lossy(&attr.value);
            return raw.trim().parse::<u32>().unwrap_or(1).max(1);
        }
    }
    1
}

/// Resolver for HTML entities that are not part of XML.
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        "laquo" => Some("«"),
        "raquo" => Some("»"),
        "mdash" => Some("—"),
        "ndash" => Some("–"),
        "hellip" => Some("…"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cell_at<'a>(parsed: &'a ParsedTable, r: u32, c: u32) -> &'a ParsedCell {
        parsed
            .cells
            .iter()
            .find(|cell| (cell.r, cell.c) == (r, c))
            .unwrap_or_else(|| panic!("no parsed cell at ({r}, {c})"))
    }

    #[test]
    fn plain_table_parses_row_major() {
        let parsed =
            parse_html_table("<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>")
                .unwrap();
        assert_eq!(parsed.rows, 2);
        assert_eq!(parsed.cols, 2);
        assert_eq!(cell_at(&parsed, 0, 1).value, "b");
        assert_eq!(cell_at(&parsed, 1, 0).value, "c");
    }

    #[test]
    fn rowspan_reserves_cells_in_following_rows() {
        let html = "<table>\
            <tr><td rowspan=\"2\" colspan=\"2\">X</td><td>R</td></tr>\
            <tr><td>S</td></tr>\
            <tr><td>Z</td><td>Q</td><td>W</td></tr>\
        </table>";
        let parsed = parse_html_table(html).unwrap();

        assert_eq!(parsed.rows, 3);
        assert_eq!(parsed.cols, 3);
        let lead = cell_at(&parsed, 0, 0);
        assert_eq!((lead.row_span, lead.col_span), (2, 2));
        assert_eq!(lead.value, "X");
        // The second row's only cell lands after the reserved block.
        assert_eq!(cell_at(&parsed, 1, 2).value, "S");
        assert_eq!(cell_at(&parsed, 2, 2).value, "W");
    }

    #[test]
    fn span_maxima_stay_within_table() {
        let html = "<table><tr><td rowspan=\"9\">a</td><td>b</td></tr><tr><td>c</td></tr></table>";
        let parsed = parse_html_table(html).unwrap();
        for cell in &parsed.cells {
            assert!(cell.r + cell.row_span <= parsed.rows);
            assert!(cell.c + cell.col_span <= parsed.cols);
        }
        assert_eq!(cell_at(&parsed, 0, 0).row_span, 2);
    }

    #[test]
    fn first_table_wins_and_nested_tables_contribute_text() {
        let html = "<p>intro</p>\
            <table><tr><td>outer <table><tr><td>inner</td></tr></table></td></tr></table>\
            <table><tr><td>second</td></tr></table>";
        let parsed = parse_html_table(html).unwrap();
        assert_eq!(parsed.rows, 1);
        assert_eq!(parsed.cells.len(), 1);
        assert_eq!(cell_at(&parsed, 0, 0).value, "outer inner");
    }

    #[test]
    fn entities_and_nbsp_are_decoded() {
        let html = "<table><tr><td>a&nbsp;&amp;&nbsp;b</td><th>&laquo;щит&raquo;</th></tr></table>";
        let parsed = parse_html_table(html).unwrap();
        assert_eq!(cell_at(&parsed, 0, 0).value, "a & b");
        assert_eq!(cell_at(&parsed, 0, 1).value, "«щит»");
    }

    #[test]
    fn markup_inside_cells_is_flattened_to_text() {
        let html = "<table><tr><td><b>bold</b> and <i>italic</i></td></tr></table>";
        let parsed = parse_html_table(html).unwrap();
        assert_eq!(cell_at(&parsed, 0, 0).value, "bold and italic");
    }

    #[test]
    fn missing_table_and_empty_table_are_errors() {
        assert_eq!(parse_html_table("<p>text</p>"), Err(HtmlTableError::NoTable));
        assert_eq!(parse_html_table("<table></table>"), Err(HtmlTableError::NoRows));
    }

    #[test]
    fn bad_span_attributes_fall_back_to_one() {
        let html = "<table><tr><td rowspan=\"zero\" colspan=\"0\">a</td></tr></table>";
        let parsed = parse_html_table(html).unwrap();
        let cell = cell_at(&parsed, 0, 0);
        assert_eq!((cell.row_span, cell.col_span), (1, 1));
    }

    #[test]
    fn unclosed_tags_do_not_derail_parsing() {
        // Word-style clipboard HTML frequently leaves <td> unclosed.
        let html = "<table><tr><td>a<td>b<tr><td>c<td>d</table>";
        let parsed = parse_html_table(html).unwrap();
        assert_eq!(parsed.rows, 2);
        assert_eq!(parsed.cols, 2);
        assert_eq!(cell_at(&parsed, 1, 1).value, "d");
    }
}
