use std::collections::HashMap;

use thiserror::Error;

use crate::events::{CellField, EventBus, StructureChange, TableEvent};
use crate::{Cell, CellCoord, CellRect, ColumnSize, DataMap, DocumentError, TableDocument};

/// Errors from model mutators and structural edits.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("coordinate ({r}, {c}) is outside the grid")]
    OutOfBounds { r: u32, c: u32 },
    #[error("column {index} is outside the grid")]
    ColumnOutOfRange { index: u32 },
    #[error("count must be at least 1")]
    InvalidCount,
    #[error("band [{start}, {start} + {count}) is outside the grid")]
    BandOutOfRange { start: u32, count: u32 },
    #[error("at least one row must remain")]
    NoRowsLeft,
    #[error("at least one column must remain")]
    NoColumnsLeft,
    #[error("deletion would cut through the merge anchored at ({r}, {c})")]
    InteriorMergeCut { r: u32, c: u32 },
}

impl EditError {
    /// Stable machine-readable reason code for UI consumption.
    pub const fn reason(&self) -> &'static str {
        match self {
            EditError::OutOfBounds { .. } => "out-of-bounds",
            EditError::ColumnOutOfRange { .. } => "column-out-of-range",
            EditError::InvalidCount => "invalid-count",
            EditError::BandOutOfRange { .. } => "band-out-of-range",
            EditError::NoRowsLeft => "no-rows-left",
            EditError::NoColumnsLeft => "no-columns-left",
            EditError::InteriorMergeCut { .. } => "interior-merge-cut",
        }
    }
}

/// The live table document: owned data, a coordinate index and the event bus.
///
/// Mutators validate before mutating, keep the `(r, c) → cell` index in sync,
/// and emit their event only after the mutation is observable. The index is
/// an invariant: no public method returns while list and index disagree.
pub struct TableModel {
    doc: TableDocument,
    index: HashMap<(u32, u32), usize>,
    bus: EventBus,
}

impl TableModel {
    /// Build a model from a validated document.
    pub fn new(doc: TableDocument) -> Result<Self, DocumentError> {
        doc.validate()?;
        let mut model = Self {
            doc,
            index: HashMap::new(),
            bus: EventBus::new(),
        };
        model.rebuild_index();
        Ok(model)
    }

    /// The current document state (live, unsorted; see [`TableModel::to_document`]).
    pub fn document(&self) -> &TableDocument {
        &self.doc
    }

    pub fn rows(&self) -> u32 {
        self.doc.grid.rows
    }

    pub fn cols(&self) -> u32 {
        self.doc.grid.cols
    }

    pub fn header_rows(&self) -> u32 {
        self.doc.grid.header_rows
    }

    pub fn name(&self) -> &str {
        &self.doc.meta.name
    }

    /// All stored leading cells, in storage order.
    pub fn cells(&self) -> &[Cell] {
        &self.doc.cells
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Leading cell at exactly `(r, c)`, if stored. O(1).
    pub fn get_cell(&self, r: u32, c: u32) -> Option<&Cell> {
        self.index.get(&(r, c)).map(|&i| &self.doc.cells[i])
    }

    /// The leading cell whose rectangle contains `(r, c)`: the cell itself,
    /// or the merge covering the coordinate.
    pub fn cell_covering(&self, r: u32, c: u32) -> Option<&Cell> {
        if let Some(cell) = self.get_cell(r, c) {
            return Some(cell);
        }
        let coord = CellCoord::new(r, c);
        self.doc
            .cells
            .iter()
            .find(|cell| cell.is_merged() && cell.rect().contains(coord))
    }

    /// True if `(r, c)` lies inside a merge rectangle but is not its anchor.
    pub fn is_covered(&self, r: u32, c: u32) -> bool {
        self.get_cell(r, c).is_none() && self.cell_covering(r, c).is_some()
    }

    /// The coordinate writes to `(r, c)` resolve to: the covering merge's
    /// anchor, or the coordinate itself.
    pub fn anchor_of(&self, r: u32, c: u32) -> CellCoord {
        self.cell_covering(r, c)
            .map(Cell::coord)
            .unwrap_or(CellCoord::new(r, c))
    }

    /// Set cell text, creating the leading cell lazily. Writes inside a
    /// merge resolve to its anchor.
    pub fn set_cell_value(&mut self, r: u32, c: u32, value: impl Into<String>) -> Result<(), EditError> {
        self.check_bounds(r, c)?;
        let value = value.into();
        let anchor = self.anchor_of(r, c);
        let idx = self.ensure_cell(anchor.r, anchor.c);
        let old = std::mem::replace(&mut self.doc.cells[idx].value, value.clone());
        self.bus.emit(TableEvent::CellChange {
            r: anchor.r,
            c: anchor.c,
            field: CellField::Value { old, new: value },
        });
        Ok(())
    }

    /// Replace the cell's class list.
    pub fn set_cell_classes(&mut self, r: u32, c: u32, classes: Vec<String>) -> Result<(), EditError> {
        self.check_bounds(r, c)?;
        let anchor = self.anchor_of(r, c);
        let idx = self.ensure_cell(anchor.r, anchor.c);
        let old = std::mem::replace(&mut self.doc.cells[idx].classes, classes.clone());
        self.bus.emit(TableEvent::CellChange {
            r: anchor.r,
            c: anchor.c,
            field: CellField::Classes { old, new: classes },
        });
        Ok(())
    }

    /// Replace the cell's `data-*` attribute map.
    pub fn set_cell_data(&mut self, r: u32, c: u32, data: DataMap) -> Result<(), EditError> {
        self.check_bounds(r, c)?;
        let anchor = self.anchor_of(r, c);
        let idx = self.ensure_cell(anchor.r, anchor.c);
        let old = std::mem::replace(&mut self.doc.cells[idx].data, data.clone());
        self.bus.emit(TableEvent::CellChange {
            r: anchor.r,
            c: anchor.c,
            field: CellField::Data { old, new: data },
        });
        Ok(())
    }

    /// Grow the grid to at least `rows × cols`. Never shrinks.
    pub fn ensure_size(&mut self, rows: u32, cols: u32) {
        let new_rows = self.doc.grid.rows.max(rows);
        let new_cols = self.doc.grid.cols.max(cols);
        if new_rows == self.doc.grid.rows && new_cols == self.doc.grid.cols {
            return;
        }
        self.doc.grid.rows = new_rows;
        self.doc.grid.cols = new_cols;
        if let Some(sizes) = &mut self.doc.grid.column_sizes {
            sizes.resize(new_cols as usize, ColumnSize::default());
        }
        self.bus.emit(
            StructureChange::Resize {
                rows: new_rows,
                cols: new_cols,
            }
            .into(),
        );
    }

    /// Set the header row count, clamped to `[0, rows]`. Emits only on change.
    pub fn set_header_rows(&mut self, n: u32) {
        let new = n.min(self.doc.grid.rows);
        let old = self.doc.grid.header_rows;
        if new == old {
            return;
        }
        self.doc.grid.header_rows = new;
        self.bus
            .emit(StructureChange::HeaderRows { old, new }.into());
    }

    /// Rename the table. Empty (after trimming) and unchanged names are ignored.
    pub fn set_table_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || name == self.doc.meta.name {
            return;
        }
        self.doc.meta.name = name.to_string();
        self.bus.emit(
            StructureChange::Meta {
                name: name.to_string(),
            }
            .into(),
        );
    }

    /// Set one column's track size from a raw user string (`"120px"`, `"2"`).
    /// Initializes the `columnSizes` array lazily.
    pub fn set_column_size(&mut self, index: u32, raw: &str) -> Result<(), EditError> {
        if index >= self.doc.grid.cols {
            return Err(EditError::ColumnOutOfRange { index });
        }
        let cols = self.doc.grid.cols as usize;
        let sizes = self
            .doc
            .grid
            .column_sizes
            .get_or_insert_with(|| vec![ColumnSize::default(); cols]);
        sizes[index as usize] = ColumnSize::parse(raw);
        let sizes = self.doc.grid.column_sizes.clone();
        self.bus.emit(StructureChange::ColumnSizes { sizes }.into());
        Ok(())
    }

    /// Replace the whole column-size array (`None` clears the setting).
    /// Returns false (without mutating) if the length does not match.
    pub fn set_column_sizes(&mut self, sizes: Option<Vec<ColumnSize>>) -> bool {
        if let Some(sizes) = &sizes {
            if sizes.len() != self.doc.grid.cols as usize {
                return false;
            }
        }
        self.doc.grid.column_sizes = sizes.clone();
        self.bus.emit(StructureChange::ColumnSizes { sizes }.into());
        true
    }

    /// Snapshot the document: trivially empty cells stripped, cells sorted
    /// row-major so serialization is deterministic.
    pub fn to_document(&self) -> TableDocument {
        let mut doc = self.doc.clone();
        doc.cells.retain(|cell| !cell.is_trivially_empty());
        doc.cells.sort_by_key(|cell| (cell.r, cell.c));
        doc
    }

    /// Replace the whole document in place, preserving the model's identity
    /// (and its subscribers). Malformed input is rejected without mutation.
    pub fn apply_document(&mut self, doc: TableDocument, emit_event: bool) -> Result<(), DocumentError> {
        doc.validate()?;
        self.doc = doc;
        self.rebuild_index();
        if emit_event {
            self.bus.emit(StructureChange::ApplyDocument.into());
        }
        Ok(())
    }

    /// Apply a document that arrived through the strict importer.
    pub fn apply_imported_document(&mut self, doc: TableDocument) -> Result<(), DocumentError> {
        self.apply_document(doc, false)?;
        self.bus.emit(StructureChange::Import.into());
        Ok(())
    }

    /// Insert `count` rows before `index` (clamped to `[0, rows]`).
    ///
    /// Merges whose vertical span contains the insertion point grow; cells
    /// at or below it shift down.
    pub fn insert_rows(&mut self, index: u32, count: u32) -> Result<(), EditError> {
        if count == 0 {
            return Err(EditError::InvalidCount);
        }
        let index = index.min(self.doc.grid.rows);
        for cell in &mut self.doc.cells {
            let top = cell.r;
            let bottom = cell.r + cell.row_span - 1;
            if top >= index {
                cell.r += count;
            } else if index <= bottom {
                cell.row_span += count;
            }
        }
        self.doc.grid.rows += count;
        self.rebuild_index();
        self.bus
            .emit(StructureChange::InsertRows { index, count }.into());
        Ok(())
    }

    /// Insert `count` columns before `index` (clamped to `[0, cols]`).
    pub fn insert_columns(&mut self, index: u32, count: u32) -> Result<(), EditError> {
        if count == 0 {
            return Err(EditError::InvalidCount);
        }
        let index = index.min(self.doc.grid.cols);
        for cell in &mut self.doc.cells {
            let left = cell.c;
            let right = cell.c + cell.col_span - 1;
            if left >= index {
                cell.c += count;
            } else if index <= right {
                cell.col_span += count;
            }
        }
        if let Some(sizes) = &mut self.doc.grid.column_sizes {
            let at = (index as usize).min(sizes.len());
            for _ in 0..count {
                sizes.insert(at, ColumnSize::default());
            }
        }
        self.doc.grid.cols += count;
        self.rebuild_index();
        self.bus
            .emit(StructureChange::InsertColumns { index, count }.into());
        Ok(())
    }

    /// Delete the row band `[start, start + count)`.
    ///
    /// Merges overhanging one side of the band shrink; merges strictly inside
    /// are dropped; a merge overhanging *both* sides would be cut through its
    /// interior, so the whole operation is rejected without mutation.
    pub fn delete_rows(&mut self, start: u32, count: u32) -> Result<(), EditError> {
        if count == 0 {
            return Err(EditError::InvalidCount);
        }
        let rows = self.doc.grid.rows;
        if start >= rows || count > rows - start {
            return Err(EditError::BandOutOfRange { start, count });
        }
        if rows - count < 1 {
            return Err(EditError::NoRowsLeft);
        }
        let r_from = start;
        let r_to = start + count - 1;

        for cell in &self.doc.cells {
            let top = cell.r;
            let bottom = cell.r + cell.row_span - 1;
            if top < r_from && bottom > r_to {
                return Err(EditError::InteriorMergeCut { r: top, c: cell.c });
            }
        }

        let mut kept = Vec::with_capacity(self.doc.cells.len());
        for mut cell in std::mem::take(&mut self.doc.cells) {
            let top = cell.r;
            let bottom = cell.r + cell.row_span - 1;
            if bottom < r_from {
                kept.push(cell);
            } else if top > r_to {
                cell.r -= count;
                kept.push(cell);
            } else if top >= r_from && bottom <= r_to {
                // Fully inside the band: dropped.
            } else if top < r_from {
                cell.row_span = r_from - top;
                kept.push(cell);
            } else {
                cell.row_span = bottom - r_to;
                cell.r = r_from;
                kept.push(cell);
            }
        }
        self.doc.cells = kept;
        self.doc.grid.rows -= count;
        self.doc.grid.header_rows = self.doc.grid.header_rows.min(self.doc.grid.rows);
        self.rebuild_index();
        self.bus
            .emit(StructureChange::DeleteRows { start, count }.into());
        Ok(())
    }

    /// Delete the column band `[start, start + count)`. Symmetric to
    /// [`TableModel::delete_rows`]; also splices the band out of `columnSizes`.
    pub fn delete_columns(&mut self, start: u32, count: u32) -> Result<(), EditError> {
        if count == 0 {
            return Err(EditError::InvalidCount);
        }
        let cols = self.doc.grid.cols;
        if start >= cols || count > cols - start {
            return Err(EditError::BandOutOfRange { start, count });
        }
        if cols - count < 1 {
            return Err(EditError::NoColumnsLeft);
        }
        let c_from = start;
        let c_to = start + count - 1;

        for cell in &self.doc.cells {
            let left = cell.c;
            let right = cell.c + cell.col_span - 1;
            if left < c_from && right > c_to {
                return Err(EditError::InteriorMergeCut { r: cell.r, c: left });
            }
        }

        let mut kept = Vec::with_capacity(self.doc.cells.len());
        for mut cell in std::mem::take(&mut self.doc.cells) {
            let left = cell.c;
            let right = cell.c + cell.col_span - 1;
            if right < c_from {
                kept.push(cell);
            } else if left > c_to {
                cell.c -= count;
                kept.push(cell);
            } else if left >= c_from && right <= c_to {
                // Fully inside the band: dropped.
            } else if left < c_from {
                cell.col_span = c_from - left;
                kept.push(cell);
            } else {
                cell.col_span = right - c_to;
                cell.c = c_from;
                kept.push(cell);
            }
        }
        self.doc.cells = kept;
        self.doc.grid.cols -= count;
        if let Some(sizes) = &mut self.doc.grid.column_sizes {
            let from = (start as usize).min(sizes.len());
            let to = ((start + count) as usize).min(sizes.len());
            sizes.drain(from..to);
            if sizes.is_empty() {
                self.doc.grid.column_sizes = None;
            }
        }
        self.rebuild_index();
        self.bus
            .emit(StructureChange::DeleteColumns { start, count }.into());
        Ok(())
    }

    /// Blank the values of every leading cell intersecting `rect`.
    pub fn clear_range(&mut self, rect: CellRect) {
        let targets: Vec<(u32, u32)> = self
            .doc
            .cells
            .iter()
            .filter(|cell| cell.rect().intersects(&rect) && !cell.value.is_empty())
            .map(|cell| (cell.r, cell.c))
            .collect();
        for (r, c) in targets {
            // Bounds hold: the cells came from the model.
            let _ = self.set_cell_value(r, c, "");
        }
    }

    /// Run `f` with the bus paused; buffered events flush on return and a
    /// single `BatchFlush` follows, even if `f` unwinds.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.bus.pause();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(self)));
        self.bus.resume();
        match result {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    fn check_bounds(&self, r: u32, c: u32) -> Result<(), EditError> {
        if r >= self.doc.grid.rows || c >= self.doc.grid.cols {
            return Err(EditError::OutOfBounds { r, c });
        }
        Ok(())
    }

    /// Index of the leading cell at `(r, c)`, creating an empty 1×1 cell
    /// lazily. Does not emit.
    pub(crate) fn ensure_cell(&mut self, r: u32, c: u32) -> usize {
        if let Some(&i) = self.index.get(&(r, c)) {
            return i;
        }
        self.doc.cells.push(Cell::new(r, c));
        let i = self.doc.cells.len() - 1;
        self.index.insert((r, c), i);
        i
    }

    pub(crate) fn doc_mut(&mut self) -> &mut TableDocument {
        &mut self.doc
    }

    pub(crate) fn emit(&mut self, event: TableEvent) {
        self.bus.emit(event);
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, cell) in self.doc.cells.iter().enumerate() {
            self.index.insert((cell.r, cell.c), i);
        }
    }
}
