//! Geometry property tests.
//!
//! Shape processing and orientation arithmetic over arbitrary bitmaps.

use proptest::prelude::*;

use pixelgrid::core::{Coord, Orientation};
use pixelgrid::game::{Move, Position, ScratchCache, Shape, Shift, ROTATE_CCW, ROTATE_CW};

fn bitmap() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..3, 0..7), 1..7)
        .prop_filter("needs an active cell", |rows| rows.iter().flatten().any(|cell| *cell != 0))
}

fn placed(shape: &Shape) -> impl Strategy<Value = Position> {
    let offsets = shape.offsets().to_vec();
    (-20i32..20, -20i32..20, 0i32..4).prop_map(move |(x, y, turns)| {
        Position::new(Coord::new(x, y), &offsets, Orientation::from_quarter_turns(turns))
    })
}

fn sorted(cells: impl Iterator<Item = Coord>) -> Vec<Coord> {
    let mut cells: Vec<Coord> = cells.collect();
    cells.sort();
    cells
}

proptest! {
    #[test]
    fn shape_is_normalised(rows in bitmap()) {
        let shape = Shape::from_bitmap(&rows, 16, 16).unwrap();

        prop_assert!(shape.width() >= 1);
        prop_assert!(shape.height() >= 1);
        prop_assert_eq!(shape.offsets().iter().map(|c| c.x).min(), Some(0));
        prop_assert_eq!(shape.offsets().iter().map(|c| c.y).min(), Some(0));
        for offset in shape.offsets() {
            prop_assert!(offset.x < shape.width());
            prop_assert!(offset.y < shape.height());
        }
    }

    #[test]
    fn shape_keeps_every_active_cell(rows in bitmap()) {
        let shape = Shape::from_bitmap(&rows, 16, 16).unwrap();
        let active = rows.iter().flatten().filter(|cell| **cell != 0).count();
        prop_assert_eq!(shape.offsets().len(), active);
    }

    #[test]
    fn four_quarter_turns_restore_cells(
        (mut position, mv) in bitmap()
            .prop_flat_map(|rows| placed(&Shape::from_bitmap(&rows, 16, 16).unwrap()))
            .prop_flat_map(|position| (Just(position), prop_oneof![Just(ROTATE_CW), Just(ROTATE_CCW)]))
    ) {
        let before = sorted(position.cells());
        for _ in 0..4 {
            mv.apply(&mut position);
        }
        prop_assert_eq!(sorted(position.cells()), before);
    }

    #[test]
    fn rotation_reverts(
        mut position in bitmap().prop_flat_map(|rows| placed(&Shape::from_bitmap(&rows, 16, 16).unwrap()))
    ) {
        let before: Vec<Coord> = position.cells().collect();
        ROTATE_CW.apply(&mut position);
        ROTATE_CW.revert(&mut position);
        prop_assert_eq!(position.cells().collect::<Vec<_>>(), before);
    }

    #[test]
    fn to_offset_inverts_cells(
        position in bitmap().prop_flat_map(|rows| placed(&Shape::from_bitmap(&rows, 16, 16).unwrap()))
    ) {
        for (offset, cell) in position.offsets().iter().zip(position.cells()) {
            prop_assert_eq!(position.to_offset(cell), *offset);
        }
    }

    #[test]
    fn shifts_translate_every_cell(
        position in bitmap().prop_flat_map(|rows| placed(&Shape::from_bitmap(&rows, 16, 16).unwrap())),
        dx in -1i32..=1,
        dy in -1i32..=1,
    ) {
        let shift = Shift::new(dx, dy);
        let mut moved = position.clone();
        Move::from(shift).apply(&mut moved);

        let expected: Vec<Coord> = position.cells().map(|c| shift.simulate(c)).collect();
        prop_assert_eq!(moved.cells().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn scratch_handles_never_alias(values in prop::collection::vec(any::<u32>(), 1..16)) {
        let mut cache: ScratchCache<u32> = ScratchCache::new();
        let mut bracket = cache.bracket();

        let handles: Vec<_> = values.iter().map(|v| bracket.acquire(v)).collect();
        for (i, handle) in handles.iter().enumerate() {
            *bracket.get_mut(*handle) = i as u32;
        }
        for (i, handle) in handles.iter().enumerate() {
            prop_assert_eq!(*bracket.get(*handle), i as u32);
        }
    }
}
