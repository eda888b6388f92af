use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CellCoord, CellRect};

/// Value of a `data-*` attribute on a cell.
///
/// The registry declares each attribute as `enum` (string), `number` or
/// `boolean`; the document stores the typed value, not its DOM string form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl DataValue {
    /// Human-readable name of the value's type.
    pub const fn type_name(&self) -> &'static str {
        match self {
            DataValue::Bool(_) => "boolean",
            DataValue::Number(_) => "number",
            DataValue::String(_) => "string",
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Bool(v) => write!(f, "{v}"),
            DataValue::Number(v) => write!(f, "{v}"),
            DataValue::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Number(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

/// `data-*` attributes of a cell, keyed by full attribute name.
///
/// A `BTreeMap` keeps serialization deterministic, which the history's
/// duplicate-suppression check relies on.
pub type DataMap = BTreeMap<String, DataValue>;

fn default_span() -> u32 {
    1
}

fn is_default_span(v: &u32) -> bool {
    *v == 1
}

/// A leading cell: the top-left of a merged rectangle, or any unmerged cell.
///
/// Covered coordinates are never stored; they are derived from the spans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// 0-indexed row of the leading coordinate.
    pub r: u32,
    /// 0-indexed column of the leading coordinate.
    pub c: u32,
    /// Cell text.
    #[serde(default)]
    pub value: String,
    /// Vertical extent of the merge rectangle (1 = unmerged).
    #[serde(default = "default_span", skip_serializing_if = "is_default_span")]
    pub row_span: u32,
    /// Horizontal extent of the merge rectangle (1 = unmerged).
    #[serde(default = "default_span", skip_serializing_if = "is_default_span")]
    pub col_span: u32,
    /// CSS classes, validated against the registry on import.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Typed `data-*` attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: DataMap,
}

impl Cell {
    /// Create an empty 1×1 cell at the given coordinate.
    pub fn new(r: u32, c: u32) -> Self {
        Self {
            r,
            c,
            value: String::new(),
            row_span: 1,
            col_span: 1,
            classes: Vec::new(),
            data: DataMap::new(),
        }
    }

    /// The leading coordinate.
    #[inline]
    pub const fn coord(&self) -> CellCoord {
        CellCoord::new(self.r, self.c)
    }

    /// The rectangle this cell occupies (1×1 for unmerged cells).
    #[inline]
    pub const fn rect(&self) -> CellRect {
        CellRect {
            r1: self.r,
            c1: self.c,
            r2: self.r + self.row_span - 1,
            c2: self.c + self.col_span - 1,
        }
    }

    /// Returns true if the cell spans more than one coordinate.
    #[inline]
    pub const fn is_merged(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    /// Returns true if this cell has no observable content.
    ///
    /// Such cells are dropped during serialization.
    pub fn is_trivially_empty(&self) -> bool {
        self.value.is_empty()
            && self.row_span == 1
            && self.col_span == 1
            && self.classes.is_empty()
            && self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivially_empty_cells() {
        let mut cell = Cell::new(2, 3);
        assert!(cell.is_trivially_empty());

        cell.value = "x".to_string();
        assert!(!cell.is_trivially_empty());

        let mut merged = Cell::new(0, 0);
        merged.row_span = 2;
        assert!(!merged.is_trivially_empty());
    }

    #[test]
    fn rect_covers_spans() {
        let mut cell = Cell::new(1, 1);
        cell.row_span = 2;
        cell.col_span = 3;
        assert_eq!(cell.rect(), CellRect::from_corners(1, 1, 2, 3));
        assert!(cell.is_merged());
        assert!(cell.rect().contains(CellCoord::new(2, 3)));
    }

    #[test]
    fn serde_omits_defaults() {
        let cell = Cell::new(0, 1);
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"r":0,"c":1,"value":""}"#);

        let back: Cell = serde_json::from_str(r#"{"r":0,"c":1}"#).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn data_values_deserialize_by_type() {
        let map: DataMap =
            serde_json::from_str(r#"{"data-locked":true,"data-priority":3,"data-status":"draft"}"#)
                .unwrap();
        assert_eq!(map["data-locked"], DataValue::Bool(true));
        assert_eq!(map["data-priority"], DataValue::Number(3.0));
        assert_eq!(map["data-status"], DataValue::String("draft".into()));
    }
}
