//! Cell and range selection with merge-aware keyboard navigation.
//!
//! The engine holds only selection state; the model is passed into each
//! operation, read for geometry, and used to emit `SelectionChange` /
//! `SelectionRange` events.

use tabula_model::events::TableEvent;
use tabula_model::{Cell, CellRect, TableModel};

/// Keyboard navigation direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Selection state: a single selected cell plus an optional rectangular
/// range spanned by an anchor and an active point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionEngine {
    selected: Option<(u32, u32)>,
    range_anchor: Option<(u32, u32)>,
    range_active: Option<(u32, u32)>,
    range_mode: bool,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected coordinate, if any.
    pub fn selected(&self) -> Option<(u32, u32)> {
        self.selected
    }

    /// Snapshot of the selected leading cell (absent for plain empty cells).
    pub fn selected_cell<'a>(&self, model: &'a TableModel) -> Option<&'a Cell> {
        let (r, c) = self.selected?;
        model.get_cell(r, c)
    }

    /// Select a single cell. Out-of-grid and covered coordinates are
    /// rejected; a merge is selected through its anchor.
    pub fn select(&mut self, model: &mut TableModel, r: u32, c: u32) -> bool {
        if r >= model.rows() || c >= model.cols() {
            return false;
        }
        if model.is_covered(r, c) {
            return false;
        }
        self.selected = Some((r, c));
        let cell = model.get_cell(r, c).cloned();
        model.bus_mut().emit(TableEvent::SelectionChange { r, c, cell });
        true
    }

    /// Begin a drag range at `(r, c)`.
    pub fn start_range(&mut self, r: u32, c: u32) {
        self.range_anchor = Some((r, c));
        self.range_active = Some((r, c));
        self.range_mode = true;
    }

    /// Move the active point of an in-progress range.
    pub fn update_range(&mut self, model: &mut TableModel, r: u32, c: u32) {
        if !self.range_mode {
            return;
        }
        self.range_active = Some((r, c));
        self.emit_range(model);
    }

    /// Finish the drag, announcing the final rectangle.
    pub fn commit_range(&mut self, model: &mut TableModel) {
        if self.range_mode {
            self.emit_range(model);
        }
    }

    /// Abandon an in-progress range without announcing it.
    pub fn cancel_range(&mut self) {
        self.clear_range();
    }

    /// Drop any range state.
    pub fn clear_range(&mut self) {
        self.range_anchor = None;
        self.range_active = None;
        self.range_mode = false;
    }

    /// The normalized anchor/active rectangle, if a range exists.
    pub fn get_range(&self) -> Option<CellRect> {
        let (ar, ac) = self.range_anchor?;
        let (br, bc) = self.range_active?;
        Some(CellRect::from_corners(ar, ac, br, bc))
    }

    /// True when a range is active and wider than a single cell.
    pub fn has_range(&self) -> bool {
        self.range_mode && self.range_anchor != self.range_active
    }

    /// Leading cells inside the current range, row-major.
    pub fn range_cells<'a>(&self, model: &'a TableModel) -> Vec<&'a Cell> {
        let Some(rect) = self.get_range() else {
            return Vec::new();
        };
        let mut cells: Vec<&Cell> = model
            .cells()
            .iter()
            .filter(|cell| rect.contains(cell.coord()))
            .collect();
        cells.sort_by_key(|cell| (cell.r, cell.c));
        cells
    }

    /// Select the whole row `r`.
    pub fn select_full_row(&mut self, model: &mut TableModel, r: u32) {
        if r >= model.rows() {
            return;
        }
        self.start_range(r, 0);
        self.update_range(model, r, model.cols() - 1);
    }

    /// Select the whole column `c`.
    pub fn select_full_column(&mut self, model: &mut TableModel, c: u32) {
        if c >= model.cols() {
            return;
        }
        self.start_range(0, c);
        self.update_range(model, model.rows() - 1, c);
    }

    /// Move the selection one step, clearing any range. Fails at grid edges.
    pub fn move_selection(&mut self, model: &mut TableModel, dir: Direction) -> bool {
        let Some((r, c)) = self.selected else {
            return false;
        };
        let Some((nr, nc)) = resolve_move(model, r, c, dir) else {
            return false;
        };
        self.selected = Some((nr, nc));
        self.clear_range();
        let cell = model.get_cell(nr, nc).cloned();
        model
            .bus_mut()
            .emit(TableEvent::SelectionChange { r: nr, c: nc, cell });
        true
    }

    /// Grow/shrink the range by moving its active point, keeping the anchor
    /// fixed. Initializes the range from the selection when absent.
    pub fn extend_range(&mut self, model: &mut TableModel, dir: Direction) -> bool {
        let Some((sr, sc)) = self.selected else {
            return false;
        };
        if !self.range_mode {
            self.start_range(sr, sc);
        }
        let (ar, ac) = self.range_active.expect("range_mode implies an active point");
        let Some((nr, nc)) = resolve_move(model, ar, ac, dir) else {
            return false;
        };
        self.range_active = Some((nr, nc));
        self.emit_range(model);
        true
    }

    fn emit_range(&self, model: &mut TableModel) {
        let Some(rect) = self.get_range() else {
            return;
        };
        let cells: Vec<Cell> = self.range_cells(model).into_iter().cloned().collect();
        model.bus_mut().emit(TableEvent::SelectionRange {
            r1: rect.r1,
            c1: rect.c1,
            r2: rect.r2,
            c2: rect.c2,
            cells,
        });
    }
}

/// Merge-aware neighbor resolution.
///
/// Starting from `(r, c)`, step once in `dir`, then iterate (bounded):
/// - a leading or plain coordinate is a landing spot;
/// - a coordinate covered by the merge anchored at `(r, c)` means we are
///   leaving our own merge inward, so jump past its rectangle;
/// - a coordinate covered by a foreign merge lands on that merge's anchor.
///
/// Returns `None` when the step (or a jump) leaves the grid.
fn resolve_move(model: &TableModel, r: u32, c: u32, dir: Direction) -> Option<(u32, u32)> {
    const MAX_HOPS: u32 = 5;

    let (mut nr, mut nc) = step(model, r, c, dir)?;
    for _ in 0..MAX_HOPS {
        if model.get_cell(nr, nc).is_some() || !model.is_covered(nr, nc) {
            return Some((nr, nc));
        }
        let covering = model.cell_covering(nr, nc)?;
        if (covering.r, covering.c) == (r, c) {
            let rect = covering.rect();
            let jumped = match dir {
                Direction::Up => rect.r1.checked_sub(1).map(|jr| (jr, nc)),
                Direction::Down => (rect.r2 + 1 < model.rows()).then(|| (rect.r2 + 1, nc)),
                Direction::Left => rect.c1.checked_sub(1).map(|jc| (nr, jc)),
                Direction::Right => (rect.c2 + 1 < model.cols()).then(|| (nr, rect.c2 + 1)),
            };
            let (jr, jc) = jumped?;
            nr = jr;
            nc = jc;
        } else {
            return Some((covering.r, covering.c));
        }
    }
    None
}

fn step(model: &TableModel, r: u32, c: u32, dir: Direction) -> Option<(u32, u32)> {
    match dir {
        Direction::Up => r.checked_sub(1).map(|nr| (nr, c)),
        Direction::Down => (r + 1 < model.rows()).then_some((r + 1, c)),
        Direction::Left => c.checked_sub(1).map(|nc| (r, nc)),
        Direction::Right => (c + 1 < model.cols()).then_some((r, c + 1)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use tabula_model::merge::merge_range;
    use tabula_model::TableDocument;

    use super::*;

    fn model(rows: u32, cols: u32) -> TableModel {
        TableModel::new(TableDocument::new("test", rows, cols)).unwrap()
    }

    #[test]
    fn select_rejects_covered_and_out_of_grid() {
        let mut m = model(4, 4);
        merge_range(&mut m, 1, 1, 2, 2).unwrap();
        let mut sel = SelectionEngine::new();

        assert!(!sel.select(&mut m, 4, 0));
        assert!(!sel.select(&mut m, 2, 2));
        assert!(sel.select(&mut m, 1, 1));
        assert!(sel.selected_cell(&m).is_some_and(|cell| cell.is_merged()));
        assert!(sel.select(&mut m, 0, 3));
        assert_eq!(sel.selected(), Some((0, 3)));
        // A plain coordinate with no stored cell is selectable but has no
        // leading-cell snapshot.
        assert!(sel.selected_cell(&m).is_none());
    }

    #[test]
    fn plain_move_walks_the_grid() {
        let mut m = model(3, 3);
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 0, 0);

        assert!(sel.move_selection(&mut m, Direction::Right));
        assert!(sel.move_selection(&mut m, Direction::Down));
        assert_eq!(sel.selected(), Some((1, 1)));

        sel.select(&mut m, 0, 0);
        assert!(!sel.move_selection(&mut m, Direction::Up));
        assert!(!sel.move_selection(&mut m, Direction::Left));
        assert_eq!(sel.selected(), Some((0, 0)));
    }

    #[test]
    fn moving_off_own_merge_jumps_past_it() {
        let mut m = model(5, 5);
        merge_range(&mut m, 1, 1, 2, 3).unwrap();
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 1, 1);

        assert!(sel.move_selection(&mut m, Direction::Down));
        assert_eq!(sel.selected(), Some((3, 1)));

        sel.select(&mut m, 1, 1);
        assert!(sel.move_selection(&mut m, Direction::Right));
        assert_eq!(sel.selected(), Some((1, 4)));
    }

    #[test]
    fn moving_off_merge_at_grid_edge_fails() {
        let mut m = model(3, 3);
        merge_range(&mut m, 1, 0, 2, 2).unwrap();
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 1, 0);

        // The merge reaches the bottom row; jumping past it leaves the grid.
        assert!(!sel.move_selection(&mut m, Direction::Down));
        assert_eq!(sel.selected(), Some((1, 0)));
    }

    #[test]
    fn moving_into_foreign_merge_lands_on_anchor() {
        let mut m = model(5, 5);
        merge_range(&mut m, 1, 1, 2, 2).unwrap();
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 3, 2);

        assert!(sel.move_selection(&mut m, Direction::Up));
        assert_eq!(sel.selected(), Some((1, 1)));
    }

    #[test]
    fn move_clears_range() {
        let mut m = model(3, 3);
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 0, 0);
        sel.start_range(0, 0);
        sel.update_range(&mut m, 1, 1);
        assert!(sel.has_range());

        sel.move_selection(&mut m, Direction::Down);
        assert!(!sel.has_range());
        assert_eq!(sel.get_range(), None);
    }

    #[test]
    fn extend_range_keeps_anchor_fixed() {
        let mut m = model(4, 4);
        let mut sel = SelectionEngine::new();
        sel.select(&mut m, 1, 1);

        assert!(sel.extend_range(&mut m, Direction::Down));
        assert!(sel.extend_range(&mut m, Direction::Right));
        assert_eq!(sel.get_range(), Some(CellRect::from_corners(1, 1, 2, 2)));
        assert!(sel.has_range());

        assert!(sel.extend_range(&mut m, Direction::Up));
        assert_eq!(sel.get_range(), Some(CellRect::from_corners(1, 1, 1, 2)));
    }

    #[test]
    fn range_is_normalized_for_backward_drags() {
        let mut m = model(4, 4);
        let mut sel = SelectionEngine::new();
        sel.start_range(3, 3);
        sel.update_range(&mut m, 1, 1);
        assert_eq!(sel.get_range(), Some(CellRect::from_corners(1, 1, 3, 3)));

        sel.commit_range(&mut m);
        assert!(sel.has_range());

        sel.cancel_range();
        assert!(!sel.has_range());
        assert_eq!(sel.get_range(), None);
    }

    #[test]
    fn full_row_and_column_selection() {
        let mut m = model(3, 4);
        let mut sel = SelectionEngine::new();

        sel.select_full_row(&mut m, 1);
        assert_eq!(sel.get_range(), Some(CellRect::from_corners(1, 0, 1, 3)));

        sel.select_full_column(&mut m, 2);
        assert_eq!(sel.get_range(), Some(CellRect::from_corners(0, 2, 2, 2)));
    }

    #[test]
    fn range_events_carry_leading_cells() {
        let mut m = model(3, 3);
        m.set_cell_value(0, 0, "a").unwrap();
        m.set_cell_value(1, 1, "b").unwrap();

        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        m.bus_mut().on(move |event| {
            if let TableEvent::SelectionRange { cells, .. } = event {
                sink.borrow_mut()
                    .push(cells.iter().map(|cell| cell.value.clone()).collect::<Vec<_>>());
            }
        });

        let mut sel = SelectionEngine::new();
        sel.start_range(0, 0);
        sel.update_range(&mut m, 1, 1);

        assert_eq!(*seen.borrow(), vec![vec!["a".to_string(), "b".to_string()]]);
    }
}
