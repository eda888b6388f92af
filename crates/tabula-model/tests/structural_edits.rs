//! Property tests: structural edits preserve every document invariant.

use proptest::prelude::*;

use tabula_model::merge::{merge_range, split_cell, validate_merge};
use tabula_model::{CellRect, TableDocument, TableModel};

#[derive(Clone, Debug)]
enum Op {
    SetValue { r: u32, c: u32, value: String },
    Merge { r1: u32, c1: u32, r2: u32, c2: u32 },
    Split { r: u32, c: u32 },
    InsertRows { index: u32, count: u32 },
    InsertColumns { index: u32, count: u32 },
    DeleteRows { start: u32, count: u32 },
    DeleteColumns { start: u32, count: u32 },
    SetHeaderRows { n: u32 },
    SetColumnSize { index: u32, raw: String },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..10, 0u32..10, "[a-c]{0,3}").prop_map(|(r, c, value)| Op::SetValue { r, c, value }),
        (0u32..10, 0u32..10, 0u32..10, 0u32..10)
            .prop_map(|(r1, c1, r2, c2)| Op::Merge { r1, c1, r2, c2 }),
        (0u32..10, 0u32..10).prop_map(|(r, c)| Op::Split { r, c }),
        (0u32..12, 1u32..3).prop_map(|(index, count)| Op::InsertRows { index, count }),
        (0u32..12, 1u32..3).prop_map(|(index, count)| Op::InsertColumns { index, count }),
        (0u32..12, 1u32..3).prop_map(|(start, count)| Op::DeleteRows { start, count }),
        (0u32..12, 1u32..3).prop_map(|(start, count)| Op::DeleteColumns { start, count }),
        (0u32..12).prop_map(|n| Op::SetHeaderRows { n }),
        (0u32..10, prop_oneof!["[0-9]{1,3}px", "[0-9]{1,2}", "junk"])
            .prop_map(|(index, raw)| Op::SetColumnSize { index, raw }),
    ]
}

fn apply(model: &mut TableModel, op: &Op) {
    // Out-of-range and geometrically illegal operations are expected to be
    // rejected; the property is that the model is *always* left valid.
    match op {
        Op::SetValue { r, c, value } => {
            let _ = model.set_cell_value(*r, *c, value.clone());
        }
        Op::Merge { r1, c1, r2, c2 } => {
            let _ = merge_range(model, *r1, *c1, *r2, *c2);
        }
        Op::Split { r, c } => {
            let _ = split_cell(model, *r, *c);
        }
        Op::InsertRows { index, count } => {
            let _ = model.insert_rows(*index, *count);
        }
        Op::InsertColumns { index, count } => {
            let _ = model.insert_columns(*index, *count);
        }
        Op::DeleteRows { start, count } => {
            let _ = model.delete_rows(*start, *count);
        }
        Op::DeleteColumns { start, count } => {
            let _ = model.delete_columns(*start, *count);
        }
        Op::SetHeaderRows { n } => model.set_header_rows(*n),
        Op::SetColumnSize { index, raw } => {
            let _ = model.set_column_size(*index, raw);
        }
    }
}

proptest! {
    #[test]
    fn random_edits_never_break_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut model = TableModel::new(TableDocument::new("prop", 6, 6)).unwrap();
        for op in &ops {
            apply(&mut model, op);
            // Both the live document and the serialized snapshot must
            // satisfy every structural invariant.
            prop_assert_eq!(model.document().validate(), Ok(()));
            prop_assert_eq!(model.to_document().validate(), Ok(()));
            // The index answers exactly like the list.
            for cell in model.cells() {
                let found = model.get_cell(cell.r, cell.c);
                prop_assert!(found.is_some_and(|hit| (hit.r, hit.c) == (cell.r, cell.c)));
            }
        }
    }

    #[test]
    fn validated_merges_always_apply(
        (r1, c1, r2, c2) in (0u32..6, 0u32..6, 0u32..6, 0u32..6)
    ) {
        let mut model = TableModel::new(TableDocument::new("prop", 6, 6)).unwrap();
        let rect = CellRect::from_corners(r1, c1, r2, c2);
        prop_assert_eq!(validate_merge(&model, rect), Ok(()));
        prop_assert_eq!(merge_range(&mut model, r1, c1, r2, c2), Ok(()));
        prop_assert_eq!(model.document().validate(), Ok(()));
    }

    #[test]
    fn delete_insert_roundtrip_keeps_row_count(
        start in 0u32..5, count in 1u32..2
    ) {
        let mut model = TableModel::new(TableDocument::new("prop", 6, 6)).unwrap();
        model.delete_rows(start, count).unwrap();
        model.insert_rows(start, count).unwrap();
        prop_assert_eq!(model.rows(), 6);
    }
}
