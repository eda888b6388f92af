use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Cell, CellRect};

/// Current serialization schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Unit of one column track width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    Px,
    Ratio,
}

/// Width of one column track. An absent entry means `1 ratio`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSize {
    pub v: f64,
    pub u: SizeUnit,
}

impl Default for ColumnSize {
    fn default() -> Self {
        Self {
            v: 1.0,
            u: SizeUnit::Ratio,
        }
    }
}

impl ColumnSize {
    /// Parse a user-entered width: `"<digits>px"` for pixels, bare digits for
    /// a ratio track. Anything else resets to the default ratio track.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if let Some(px) = s.strip_suffix("px") {
            if let Ok(v) = px.trim().parse::<u32>() {
                return Self {
                    v: v as f64,
                    u: SizeUnit::Px,
                };
            }
        } else if let Ok(v) = s.parse::<u32>() {
            return Self {
                v: v as f64,
                u: SizeUnit::Ratio,
            };
        }
        Self::default()
    }
}

/// Document metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Grid dimensions and column sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridShape {
    /// Total row count (> 0).
    pub rows: u32,
    /// Total column count (> 0).
    pub cols: u32,
    /// Leading rows rendered as headers (≤ `rows`).
    #[serde(default)]
    pub header_rows: u32,
    /// Per-column track sizes; when present, its length equals `cols`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_sizes: Option<Vec<ColumnSize>>,
}

/// Structural problems that make a document unusable.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("unsupported document version {0}")]
    UnsupportedVersion(u32),
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("headerRows ({header_rows}) exceeds row count ({rows})")]
    HeaderRowsOutOfRange { header_rows: u32, rows: u32 },
    #[error("columnSizes length {len} does not match column count {cols}")]
    ColumnSizesMismatch { len: usize, cols: u32 },
    #[error("cell {0} has a zero row or column span")]
    ZeroSpan(CellRect),
    #[error("cell ({r}, {c}) lies outside the {rows}x{cols} grid")]
    CellOutOfBounds { r: u32, c: u32, rows: u32, cols: u32 },
    #[error("cell rectangle {0} exceeds the grid")]
    SpanOutOfBounds(CellRect),
    #[error("duplicate cell at ({r}, {c})")]
    DuplicateCell { r: u32, c: u32 },
    #[error("cell rectangles {a} and {b} overlap")]
    OverlappingCells { a: CellRect, b: CellRect },
}

/// The serialized table document (schema version 1).
///
/// Unknown fields on input are ignored rather than rejected. Validation is
/// explicit ([`TableDocument::validate`]) and runs wherever a document enters
/// a model, so importers can collect every finding instead of failing fast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    pub version: u32,
    pub meta: TableMeta,
    pub grid: GridShape,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl TableDocument {
    /// Create an empty document, stamping `createdUtc` with the current time.
    pub fn new(name: impl Into<String>, rows: u32, cols: u32) -> Self {
        Self {
            version: SCHEMA_VERSION,
            meta: TableMeta {
                name: name.into(),
                created_utc: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
                notes: None,
            },
            grid: GridShape {
                rows: rows.max(1),
                cols: cols.max(1),
                header_rows: 0,
                column_sizes: None,
            },
            cells: Vec::new(),
        }
    }

    /// Check every structural invariant, returning the first violation.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.version != SCHEMA_VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }
        let rows = self.grid.rows;
        let cols = self.grid.cols;
        if rows == 0 || cols == 0 {
            return Err(DocumentError::EmptyGrid);
        }
        if self.grid.header_rows > rows {
            return Err(DocumentError::HeaderRowsOutOfRange {
                header_rows: self.grid.header_rows,
                rows,
            });
        }
        if let Some(sizes) = &self.grid.column_sizes {
            if sizes.len() != cols as usize {
                return Err(DocumentError::ColumnSizesMismatch {
                    len: sizes.len(),
                    cols,
                });
            }
        }

        let mut seen = HashSet::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cell.row_span == 0 || cell.col_span == 0 {
                return Err(DocumentError::ZeroSpan(CellRect::single(cell.r, cell.c)));
            }
            if cell.r >= rows || cell.c >= cols {
                return Err(DocumentError::CellOutOfBounds {
                    r: cell.r,
                    c: cell.c,
                    rows,
                    cols,
                });
            }
            if cell.r + cell.row_span > rows || cell.c + cell.col_span > cols {
                return Err(DocumentError::SpanOutOfBounds(cell.rect()));
            }
            if !seen.insert((cell.r, cell.c)) {
                return Err(DocumentError::DuplicateCell {
                    r: cell.r,
                    c: cell.c,
                });
            }
        }

        // Merge non-overlap: pairwise over cells with extent. Documents are
        // small enough that the quadratic check stays cheap.
        for (i, a) in self.cells.iter().enumerate() {
            for b in &self.cells[i + 1..] {
                if a.rect().intersects(&b.rect()) {
                    return Err(DocumentError::OverlappingCells {
                        a: a.rect(),
                        b: b.rect(),
                    });
                }
            }
        }

        Ok(())
    }
}
