//! Applying clipboard content to a [`TableModel`].
//!
//! The parsers themselves live in `tabula-clipboard`; this module defines
//! the normalized parse result ([`ParsedTable`]) and the two application
//! paths: plain-text matrices and HTML tables with merges.

use crate::events::TableEvent;
use crate::merge::{split_all_in_range, SplitMode};
use crate::{CellRect, EditError, TableModel};

/// One leading cell extracted from a pasted HTML table.
///
/// `r`/`c` are source-table coordinates; spans are ≥ 1 and stay within the
/// parsed table's `rows`/`cols`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCell {
    pub r: u32,
    pub c: u32,
    pub value: String,
    pub row_span: u32,
    pub col_span: u32,
}

/// Normalized result of parsing a clipboard `<table>` fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<ParsedCell>,
}

/// Apply a plain-text matrix at `(start_r, start_c)`.
///
/// The grid grows as needed; each value is trimmed. One `Paste` event is
/// emitted after the per-cell changes.
pub fn apply_matrix_paste(
    model: &mut TableModel,
    start_r: u32,
    start_c: u32,
    matrix: &[Vec<String>],
) -> Result<(), EditError> {
    let rows = matrix.len() as u32;
    let cols = matrix.iter().map(Vec::len).max().unwrap_or(0) as u32;
    if rows == 0 || cols == 0 {
        return Ok(());
    }
    model.ensure_size(start_r + rows, start_c + cols);
    for (i, row) in matrix.iter().enumerate() {
        for (j, text) in row.iter().enumerate() {
            model.set_cell_value(start_r + i as u32, start_c + j as u32, text.trim())?;
        }
    }
    model.emit(TableEvent::Paste {
        start_r,
        start_c,
        rows,
        cols,
        html: false,
    });
    Ok(())
}

/// Apply a parsed HTML table at `(start_r, start_c)`.
///
/// The target rectangle is first freed of prior merges and blanked; parsed
/// spans are then assigned directly and any cell swallowed by a new merge
/// rectangle is dropped.
pub fn apply_html_paste(
    model: &mut TableModel,
    start_r: u32,
    start_c: u32,
    parsed: &ParsedTable,
) -> Result<(), EditError> {
    if parsed.rows == 0 || parsed.cols == 0 {
        return Ok(());
    }
    model.ensure_size(start_r + parsed.rows, start_c + parsed.cols);
    let target = CellRect::from_corners(
        start_r,
        start_c,
        start_r + parsed.rows - 1,
        start_c + parsed.cols - 1,
    );

    split_all_in_range(model, target.r1, target.c1, target.r2, target.c2, SplitMode::Overlap);
    for coord in target.iter_coords() {
        model.set_cell_value(coord.r, coord.c, "")?;
    }

    let mut merge_rects: Vec<CellRect> = Vec::new();
    for parsed_cell in &parsed.cells {
        let r = start_r + parsed_cell.r;
        let c = start_c + parsed_cell.c;
        model.set_cell_value(r, c, parsed_cell.value.trim())?;

        // Defensive clamp; the parser already bounds spans by its own grid.
        let row_span = parsed_cell.row_span.max(1).min(model.rows() - r);
        let col_span = parsed_cell.col_span.max(1).min(model.cols() - c);
        if row_span > 1 || col_span > 1 {
            let idx = model.ensure_cell(r, c);
            let doc = model.doc_mut();
            doc.cells[idx].row_span = row_span;
            doc.cells[idx].col_span = col_span;
            merge_rects.push(doc.cells[idx].rect());
        }
    }

    if !merge_rects.is_empty() {
        let doc = model.doc_mut();
        doc.cells.retain(|cell| {
            merge_rects
                .iter()
                .all(|rect| (cell.r, cell.c) == (rect.r1, rect.c1) || !rect.contains(cell.coord()))
        });
    }
    model.rebuild_index();

    model.emit(TableEvent::Paste {
        start_r,
        start_c,
        rows: parsed.rows,
        cols: parsed.cols,
        html: true,
    });
    Ok(())
}
