//! `tabula-model` defines the in-memory table document and its mutators.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the editing engines (merge/split, selection, history)
//! - clipboard ingestion
//! - UI and persistence boundaries via `serde` (JSON-safe schema)
//!
//! Only *leading* cells are stored: the top-left cell of a merged rectangle,
//! or any unmerged cell. Coordinates inside a merge but not at its top-left
//! are *covered* and are derived from the leading cells' spans.

mod cell;
mod coords;
mod document;
pub mod events;
pub mod merge;
mod model;
pub mod paste;

pub use cell::{Cell, DataMap, DataValue};
pub use coords::{CellCoord, CellRect};
pub use document::{
    ColumnSize, DocumentError, GridShape, SizeUnit, TableDocument, TableMeta, SCHEMA_VERSION,
};
pub use events::{CellField, EventBus, HandlerId, StructureChange, TableEvent};
pub use model::{EditError, TableModel};
