//! Merge/split operations over a [`TableModel`].
//!
//! The functions here are the only code path that may change cell spans in
//! response to user merges. Geometry is validated before any mutation; the
//! legal overlap shapes with an existing merge are *absorption* (the new
//! rectangle fully contains it) and *containment* (it fully contains the new
//! rectangle, making the merge a no-op).

use thiserror::Error;

use crate::events::{CellField, TableEvent};
use crate::{Cell, CellRect, TableModel};

/// Geometric merge/split failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("merge range {rect} is outside the grid")]
    OutOfBounds { rect: CellRect },
    #[error("merge range {rect} partially overlaps the merge at {existing}")]
    PartialOverlap { rect: CellRect, existing: CellRect },
    #[error("no cell at ({r}, {c}) to split")]
    NothingToSplit { r: u32, c: u32 },
}

/// Which merges [`split_all_in_range`] collects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitMode {
    /// Any merge whose rectangle overlaps the range, border cells included.
    Overlap,
    /// Only merges fully contained in the range.
    Fully,
}

/// Check whether merging `rect` is geometrically legal.
pub fn validate_merge(model: &TableModel, rect: CellRect) -> Result<(), MergeError> {
    if rect.r2 >= model.rows() || rect.c2 >= model.cols() {
        return Err(MergeError::OutOfBounds { rect });
    }
    for cell in model.cells() {
        if !cell.is_merged() {
            continue;
        }
        let existing = cell.rect();
        if existing.intersects(&rect)
            && !rect.contains_rect(&existing)
            && !existing.contains_rect(&rect)
        {
            return Err(MergeError::PartialOverlap { rect, existing });
        }
    }
    Ok(())
}

/// Merge the rectangle spanned by the two corners.
///
/// Non-empty trimmed values inside the rectangle are concatenated (row-major,
/// single-space joined) into the leading cell, which reports exactly one
/// value change. Every other cell inside the rectangle is absorbed.
pub fn merge_range(model: &mut TableModel, r1: u32, c1: u32, r2: u32, c2: u32) -> Result<(), MergeError> {
    let rect = CellRect::from_corners(r1, c1, r2, c2);
    validate_merge(model, rect)?;
    if rect.is_single_cell() {
        return Ok(());
    }
    // Containment: an existing merge already covers the whole rectangle.
    if model
        .cells()
        .iter()
        .any(|cell| cell.is_merged() && cell.rect().contains_rect(&rect))
    {
        return Ok(());
    }

    let mut texts: Vec<String> = Vec::new();
    for coord in rect.iter_coords() {
        if let Some(cell) = model.get_cell(coord.r, coord.c) {
            let trimmed = cell.value.trim();
            if !trimmed.is_empty() {
                texts.push(trimmed.to_string());
            }
        }
    }

    let idx = model.ensure_cell(rect.r1, rect.c1);
    let doc = model.doc_mut();
    doc.cells[idx].row_span = rect.height();
    doc.cells[idx].col_span = rect.width();

    let mut value_change = None;
    if !texts.is_empty() {
        let joined = texts.join(" ");
        let old = std::mem::replace(&mut doc.cells[idx].value, joined.clone());
        value_change = Some(CellField::Value { old, new: joined });
    }

    doc.cells
        .retain(|cell| (cell.r, cell.c) == (rect.r1, rect.c1) || !rect.contains(cell.coord()));
    model.rebuild_index();

    if let Some(field) = value_change {
        model.emit(TableEvent::CellChange {
            r: rect.r1,
            c: rect.c1,
            field,
        });
    }
    model.emit(TableEvent::Merge {
        r1: rect.r1,
        c1: rect.c1,
        r2: rect.r2,
        c2: rect.c2,
        row_span: rect.height(),
        col_span: rect.width(),
    });
    Ok(())
}

/// Split the merge anchored at `(r, c)` back into 1×1 cells.
///
/// Covered coordinates become empty leading cells. Splitting an unmerged
/// cell is a no-op; splitting a coordinate with no leading cell fails.
pub fn split_cell(model: &mut TableModel, r: u32, c: u32) -> Result<(), MergeError> {
    let Some(cell) = model.get_cell(r, c) else {
        return Err(MergeError::NothingToSplit { r, c });
    };
    let rect = cell.rect();
    let row_span = cell.row_span;
    let col_span = cell.col_span;
    if row_span == 1 && col_span == 1 {
        return Ok(());
    }

    let idx = model.ensure_cell(r, c);
    let doc = model.doc_mut();
    doc.cells[idx].row_span = 1;
    doc.cells[idx].col_span = 1;
    for coord in rect.iter_coords() {
        if (coord.r, coord.c) != (r, c) {
            doc.cells.push(Cell::new(coord.r, coord.c));
        }
    }
    model.rebuild_index();

    model.emit(TableEvent::Split {
        r,
        c,
        row_span,
        col_span,
    });
    Ok(())
}

/// Split every merge the range touches (per `mode`), returning how many
/// merges were dissolved. The target set is snapshotted before the first
/// split so the mutation cannot affect iteration.
pub fn split_all_in_range(
    model: &mut TableModel,
    r1: u32,
    c1: u32,
    r2: u32,
    c2: u32,
    mode: SplitMode,
) -> usize {
    let rect = CellRect::from_corners(r1, c1, r2, c2);
    let targets: Vec<(u32, u32)> = model
        .cells()
        .iter()
        .filter(|cell| {
            cell.is_merged()
                && match mode {
                    SplitMode::Overlap => cell.rect().intersects(&rect),
                    SplitMode::Fully => rect.contains_rect(&cell.rect()),
                }
        })
        .map(|cell| (cell.r, cell.c))
        .collect();
    for &(r, c) in &targets {
        // The anchors were just collected from the model.
        let _ = split_cell(model, r, c);
    }
    targets.len()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::TableDocument;

    fn model(rows: u32, cols: u32) -> TableModel {
        TableModel::new(TableDocument::new("test", rows, cols)).unwrap()
    }

    fn events(model: &mut TableModel) -> Rc<RefCell<Vec<TableEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.bus_mut().on(move |event| sink.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn merge_concatenates_values_with_single_change_event() {
        let mut m = model(4, 4);
        m.set_cell_value(0, 0, "Привет").unwrap();
        m.set_cell_value(0, 1, " ").unwrap();
        m.set_cell_value(1, 0, "мир").unwrap();
        m.set_cell_value(1, 1, "!").unwrap();
        let seen = events(&mut m);

        merge_range(&mut m, 0, 0, 1, 1).unwrap();

        let lead = m.get_cell(0, 0).unwrap();
        assert_eq!(lead.value, "Привет мир !");
        assert_eq!((lead.row_span, lead.col_span), (2, 2));
        assert!(m.get_cell(1, 1).is_none());

        let events = seen.borrow();
        let value_changes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TableEvent::CellChange { field: CellField::Value { .. }, .. }))
            .collect();
        assert_eq!(value_changes.len(), 1);
        assert!(matches!(events.last(), Some(TableEvent::Merge { .. })));
    }

    #[test]
    fn merge_of_empty_cells_emits_no_value_change() {
        let mut m = model(3, 3);
        let seen = events(&mut m);

        merge_range(&mut m, 0, 0, 1, 2).unwrap();
        assert_eq!(seen.borrow().len(), 1); // only the merge event
        assert_eq!(m.get_cell(0, 0).unwrap().value, "");
    }

    #[test]
    fn single_cell_merge_is_a_noop() {
        let mut m = model(3, 3);
        let seen = events(&mut m);
        merge_range(&mut m, 1, 1, 1, 1).unwrap();
        assert!(seen.borrow().is_empty());
        assert!(m.get_cell(1, 1).is_none());
    }

    #[test]
    fn partial_overlap_is_rejected() {
        let mut m = model(5, 5);
        merge_range(&mut m, 0, 0, 2, 2).unwrap();
        let before = m.to_document();

        let err = validate_merge(&m, CellRect::from_corners(1, 1, 3, 3)).unwrap_err();
        assert!(matches!(err, MergeError::PartialOverlap { .. }));
        assert!(merge_range(&mut m, 1, 1, 3, 3).is_err());
        assert_eq!(m.to_document(), before);
    }

    #[test]
    fn absorption_swallows_inner_merge() {
        let mut m = model(5, 5);
        m.set_cell_value(1, 1, "inner").unwrap();
        merge_range(&mut m, 1, 1, 2, 2).unwrap();

        merge_range(&mut m, 0, 0, 3, 3).unwrap();
        let lead = m.get_cell(0, 0).unwrap();
        assert_eq!((lead.row_span, lead.col_span), (4, 4));
        assert_eq!(lead.value, "inner");
        assert!(m.get_cell(1, 1).is_none());
    }

    #[test]
    fn containment_is_a_noop() {
        let mut m = model(5, 5);
        merge_range(&mut m, 0, 0, 3, 3).unwrap();
        let before = m.to_document();

        merge_range(&mut m, 1, 1, 2, 2).unwrap();
        assert_eq!(m.to_document(), before);
    }

    #[test]
    fn out_of_bounds_merge_is_rejected() {
        let mut m = model(3, 3);
        assert!(matches!(
            merge_range(&mut m, 1, 1, 3, 2),
            Err(MergeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn split_restores_unit_cells() {
        let mut m = model(4, 4);
        m.set_cell_value(1, 1, "x").unwrap();
        merge_range(&mut m, 1, 1, 2, 3).unwrap();
        let seen = events(&mut m);

        split_cell(&mut m, 1, 1).unwrap();
        let lead = m.get_cell(1, 1).unwrap();
        assert_eq!((lead.row_span, lead.col_span), (1, 1));
        assert_eq!(lead.value, "x");
        for (r, c) in [(1, 2), (1, 3), (2, 1), (2, 2), (2, 3)] {
            let cell = m.get_cell(r, c).unwrap();
            assert_eq!(cell.value, "");
            assert!(!cell.is_merged());
        }
        assert_eq!(
            *seen.borrow(),
            vec![TableEvent::Split {
                r: 1,
                c: 1,
                row_span: 2,
                col_span: 3
            }]
        );
    }

    #[test]
    fn split_of_plain_cell_is_noop_and_missing_cell_fails() {
        let mut m = model(3, 3);
        m.set_cell_value(0, 0, "a").unwrap();
        assert_eq!(split_cell(&mut m, 0, 0), Ok(()));
        assert_eq!(
            split_cell(&mut m, 2, 2),
            Err(MergeError::NothingToSplit { r: 2, c: 2 })
        );
    }

    #[test]
    fn split_then_remerge_restores_shape() {
        let mut m = model(4, 4);
        merge_range(&mut m, 0, 1, 2, 2).unwrap();
        let before = m.to_document();

        split_cell(&mut m, 0, 1).unwrap();
        merge_range(&mut m, 0, 1, 2, 2).unwrap();
        assert_eq!(m.to_document(), before);
    }

    #[test]
    fn split_all_overlap_includes_border_touch() {
        let mut m = model(6, 6);
        merge_range(&mut m, 0, 0, 1, 1).unwrap();
        merge_range(&mut m, 4, 4, 5, 5).unwrap();
        merge_range(&mut m, 0, 4, 1, 5).unwrap();

        // Range touches the first merge at its border cell (1, 1) and fully
        // contains nothing.
        let n = split_all_in_range(&mut m, 1, 1, 3, 3, SplitMode::Overlap);
        assert_eq!(n, 1);
        assert!(!m.get_cell(0, 0).unwrap().is_merged());
        assert!(m.get_cell(4, 4).unwrap().is_merged());
    }

    #[test]
    fn split_all_fully_requires_containment() {
        let mut m = model(6, 6);
        merge_range(&mut m, 1, 1, 2, 2).unwrap();
        merge_range(&mut m, 3, 0, 4, 1).unwrap();

        let n = split_all_in_range(&mut m, 0, 0, 2, 5, SplitMode::Fully);
        assert_eq!(n, 1);
        assert!(!m.get_cell(1, 1).unwrap().is_merged());
        assert!(m.get_cell(3, 0).unwrap().is_merged());
    }
}
