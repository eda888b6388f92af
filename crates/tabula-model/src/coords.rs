use core::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a single grid coordinate.
///
/// Rows and columns are **0-indexed**; `(0, 0)` is the top-left cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// 0-indexed row.
    pub r: u32,
    /// 0-indexed column.
    pub c: u32,
}

impl CellCoord {
    /// Construct a new [`CellCoord`].
    #[inline]
    pub const fn new(r: u32, c: u32) -> Self {
        Self { r, c }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.r, self.c)
    }
}

/// A rectangular region of the grid.
///
/// The rectangle is inclusive and always normalized such that:
/// - `r1 <= r2`
/// - `c1 <= c2`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub r1: u32,
    pub c1: u32,
    pub r2: u32,
    pub c2: u32,
}

impl CellRect {
    /// Construct a rectangle from two opposite corners, normalizing if needed.
    pub const fn from_corners(r1: u32, c1: u32, r2: u32, c2: u32) -> Self {
        let (top, bottom) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let (left, right) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
        Self {
            r1: top,
            c1: left,
            r2: bottom,
            c2: right,
        }
    }

    /// A 1×1 rectangle at one coordinate.
    pub const fn single(r: u32, c: u32) -> Self {
        Self {
            r1: r,
            c1: c,
            r2: r,
            c2: c,
        }
    }

    /// Returns true if `coord` lies within this rectangle.
    #[inline]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.r >= self.r1 && coord.r <= self.r2 && coord.c >= self.c1 && coord.c <= self.c2
    }

    /// Returns true if `other` lies entirely within this rectangle.
    #[inline]
    pub const fn contains_rect(&self, other: &CellRect) -> bool {
        other.r1 >= self.r1 && other.r2 <= self.r2 && other.c1 >= self.c1 && other.c2 <= self.c2
    }

    /// Returns true if the rectangles share at least one coordinate.
    #[inline]
    pub const fn intersects(&self, other: &CellRect) -> bool {
        self.r1 <= other.r2 && other.r1 <= self.r2 && self.c1 <= other.c2 && other.c1 <= self.c2
    }

    /// Number of rows in the rectangle.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.r2 - self.r1 + 1
    }

    /// Number of columns in the rectangle.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.c2 - self.c1 + 1
    }

    /// Returns true if the rectangle is exactly one cell.
    #[inline]
    pub const fn is_single_cell(&self) -> bool {
        self.r1 == self.r2 && self.c1 == self.c2
    }

    /// Iterate every coordinate of the rectangle in row-major order.
    pub fn iter_coords(&self) -> impl Iterator<Item = CellCoord> {
        let (c1, c2) = (self.c1, self.c2);
        (self.r1..=self.r2).flat_map(move |r| (c1..=c2).map(move |c| CellCoord::new(r, c)))
    }
}

impl fmt::Display for CellRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "({}, {})", self.r1, self.c1)
        } else {
            write!(f, "({}, {})-({}, {})", self.r1, self.c1, self.r2, self.c2)
        }
    }
}
