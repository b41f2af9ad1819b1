//! Occupancy Grid
//!
//! The grid covers the field plus a margin on every side equal to the
//! largest entity dimension. Each slot lists its occupants in arrival order.
//! All coordinates here are in extended space unless a method says otherwise.

use std::fmt::Write as _;

use crate::core::coord::Coord;
use crate::game::entity::EntityId;
use crate::game::moves::Move;
use crate::game::position::Position;
use crate::game::scratch::ScratchCache;
use crate::game::wall::{WallBounds, WallCorners};
use crate::render::layer::{Layer, Rgb};

/// Occupants of one grid cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    occupants: Vec<EntityId>,
}

impl Slot {
    /// Occupants, oldest first.
    #[inline]
    pub fn occupants(&self) -> &[EntityId] {
        &self.occupants
    }

    /// Number of occupants.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    /// True if nobody is here.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Most recently added occupant.
    #[inline]
    pub fn top(&self) -> Option<EntityId> {
        self.occupants.last().copied()
    }

    /// True if `id` is here.
    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.occupants.contains(&id)
    }

    #[inline]
    fn add(&mut self, id: EntityId) {
        self.occupants.push(id);
    }

    fn remove(&mut self, id: EntityId) -> bool {
        match self.occupants.iter().position(|o| *o == id) {
            Some(i) => {
                self.occupants.remove(i);
                true
            }
            None => false,
        }
    }
}

/// Extended occupancy grid.
#[derive(Debug)]
pub struct Grid {
    field_width: i32,
    field_height: i32,
    margin: i32,
    width: i32,
    height: i32,
    slots: Vec<Slot>,
    dest_buf: Vec<usize>,
}

impl Grid {
    /// Create an empty grid for a `field_width × field_height` field.
    pub fn new(field_width: i32, field_height: i32, margin: i32) -> Self {
        let width = field_width + 2 * margin;
        let height = field_height + 2 * margin;

        Self {
            field_width,
            field_height,
            margin,
            width,
            height,
            slots: vec![Slot::default(); (width * height).max(0) as usize],
            dest_buf: Vec::new(),
        }
    }

    /// Border size.
    #[inline]
    pub fn margin(&self) -> i32 {
        self.margin
    }

    /// Visible width.
    #[inline]
    pub fn field_width(&self) -> i32 {
        self.field_width
    }

    /// Visible height.
    #[inline]
    pub fn field_height(&self) -> i32 {
        self.field_height
    }

    /// Field coordinate to extended coordinate.
    #[inline]
    pub fn to_extended(&self, field: Coord) -> Coord {
        field + Coord::new(self.margin, self.margin)
    }

    /// Extended coordinate to field coordinate.
    #[inline]
    pub fn to_field(&self, extended: Coord) -> Coord {
        extended - Coord::new(self.margin, self.margin)
    }

    /// True if an extended coordinate is on the visible field.
    #[inline]
    pub fn is_visible(&self, extended: Coord) -> bool {
        let c = self.to_field(extended);
        c.x >= 0 && c.y >= 0 && c.x < self.field_width && c.y < self.field_height
    }

    /// Slot index of an extended coordinate, if it is on the grid.
    #[inline]
    pub fn index(&self, c: Coord) -> Option<usize> {
        (c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height)
            .then(|| (c.y * self.width + c.x) as usize)
    }

    /// Slot at an extended coordinate.
    #[inline]
    pub fn slot(&self, c: Coord) -> Option<&Slot> {
        self.index(c).map(|i| &self.slots[i])
    }

    /// Slot by index.
    #[inline]
    pub fn slot_at(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    /// Check `c` against a type's thresholds.
    ///
    /// Returns the slot index, or the crossed walls.
    #[inline]
    pub fn classify(&self, c: Coord, bounds: &WallBounds) -> Result<usize, WallCorners> {
        let crossed = bounds.classify(c);
        if !crossed.is_empty() {
            return Err(crossed);
        }
        // Thresholds never exceed the extended grid
        self.index(c).ok_or(crossed)
    }

    /// Add `id` to the slot at `index`.
    #[inline]
    pub fn add_at(&mut self, index: usize, id: EntityId) {
        self.slots[index].add(id);
    }

    /// Remove `id` from the slot at `index`.
    #[inline]
    pub fn remove_at(&mut self, index: usize, id: EntityId) -> bool {
        self.slots[index].remove(id)
    }

    /// Remove and return every occupant of the slot at `index`.
    pub fn take_occupants(&mut self, index: usize) -> Vec<EntityId> {
        std::mem::take(&mut self.slots[index].occupants)
    }

    /// Move `id` from `position` to `position` after `mv`.
    ///
    /// Destinations are checked first; on any out-of-bounds cell nothing
    /// changes and the crossed walls are returned.
    pub fn apply_move(
        &mut self,
        id: EntityId,
        position: &mut Position,
        bounds: &WallBounds,
        mv: &Move,
        scratch: &mut ScratchCache<Position>,
    ) -> Result<(), WallCorners> {
        let mut bracket = scratch.bracket();
        let target = bracket.acquire(position);
        mv.apply(bracket.get_mut(target));

        let mut dest = std::mem::take(&mut self.dest_buf);
        dest.clear();
        let mut crossed = WallCorners::NONE;
        for cell in bracket.get(target).cells() {
            match self.classify(cell, bounds) {
                Ok(index) => dest.push(index),
                Err(walls) => crossed |= walls,
            }
        }

        let result = if crossed.is_empty() {
            self.transfer(id, position, &dest);
            position.clone_from(bracket.get(target));
            Ok(())
        } else {
            Err(crossed)
        };

        self.dest_buf = dest;
        result
    }

    /// Undo a successful [`Grid::apply_move`].
    pub fn revert_move(
        &mut self,
        id: EntityId,
        position: &mut Position,
        mv: &Move,
        scratch: &mut ScratchCache<Position>,
    ) {
        let mut bracket = scratch.bracket();
        let target = bracket.acquire(position);
        mv.revert(bracket.get_mut(target));

        let mut dest = std::mem::take(&mut self.dest_buf);
        dest.clear();
        dest.extend(bracket.get(target).cells().filter_map(|cell| self.index(cell)));

        self.transfer(id, position, &dest);
        position.clone_from(bracket.get(target));
        self.dest_buf = dest;
    }

    // All removals first, then all additions
    fn transfer(&mut self, id: EntityId, from: &Position, dest: &[usize]) {
        for cell in from.cells() {
            if let Some(index) = self.index(cell) {
                self.slots[index].remove(id);
            }
        }
        for index in dest {
            self.slots[*index].add(id);
        }
    }

    /// Remove `id` from every cell of `position`.
    pub fn erase(&mut self, id: EntityId, position: &Position) {
        for cell in position.cells() {
            if let Some(index) = self.index(cell) {
                self.slots[index].remove(id);
            }
        }
    }

    /// Paint the visible field into `layer`: the top occupant's colour, or
    /// transparent for empty cells.
    pub fn draw<F>(&self, layer: &mut Layer, color_of: F)
    where
        F: Fn(EntityId) -> Option<Rgb>,
    {
        for y in 0..self.field_height {
            for x in 0..self.field_width {
                let field = Coord::new(x, y);
                let pixel = self
                    .slot(self.to_extended(field))
                    .and_then(Slot::top)
                    .and_then(&color_of);
                layer.set(field, pixel);
            }
        }
    }

    /// Text dump of the whole extended grid, one row per line.
    pub fn dump<F>(&self, label_of: F) -> String
    where
        F: Fn(EntityId) -> String,
    {
        let mut out = String::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if x > 0 {
                    out.push(' ');
                }
                let slot = &self.slots[(y * self.width + x) as usize];
                out.push('[');
                for (i, id) in slot.occupants.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}", label_of(*id));
                }
                out.push(']');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Orientation;
    use crate::game::moves::{ROTATE_CW, SHIFT_LEFT, SHIFT_RIGHT};

    fn bar(grid: &mut Grid, id: EntityId, at: Coord) -> Position {
        let pos = Position::new(at, &[Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0)], Orientation::DEG_0);
        for cell in pos.cells() {
            let index = grid.index(cell).unwrap();
            grid.add_at(index, id);
        }
        pos
    }

    #[test]
    fn test_apply_and_revert_move() {
        let mut grid = Grid::new(8, 8, 3);
        let bounds = WallBounds::new(8, 8, 3, WallCorners::NONE);
        let mut scratch = ScratchCache::new();
        let id = EntityId(1);
        let mut pos = bar(&mut grid, id, Coord::new(4, 4));

        grid.apply_move(id, &mut pos, &bounds, &SHIFT_RIGHT, &mut scratch).unwrap();
        assert_eq!(pos.reference(), Coord::new(5, 4));
        assert!(grid.slot(Coord::new(4, 4)).unwrap().is_empty());
        assert!(grid.slot(Coord::new(7, 4)).unwrap().contains(id));

        grid.revert_move(id, &mut pos, &SHIFT_RIGHT, &mut scratch);
        assert_eq!(pos.reference(), Coord::new(4, 4));
        assert!(grid.slot(Coord::new(4, 4)).unwrap().contains(id));
        assert!(grid.slot(Coord::new(7, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_apply_move_is_atomic_out_of_bounds() {
        let mut grid = Grid::new(8, 8, 3);
        let bounds = WallBounds::new(8, 8, 3, WallCorners::NONE);
        let mut scratch = ScratchCache::new();
        let id = EntityId(1);
        let mut pos = bar(&mut grid, id, Coord::new(3, 4));

        let err = grid.apply_move(id, &mut pos, &bounds, &SHIFT_LEFT, &mut scratch).unwrap_err();
        assert_eq!(err, WallCorners::LEFT);
        assert_eq!(pos.reference(), Coord::new(3, 4));
        for x in 3..6 {
            assert!(grid.slot(Coord::new(x, 4)).unwrap().contains(id));
        }
    }

    #[test]
    fn test_rotation_overlapping_itself() {
        let mut grid = Grid::new(8, 8, 3);
        let bounds = WallBounds::new(8, 8, 3, WallCorners::NONE);
        let mut scratch = ScratchCache::new();
        let id = EntityId(2);
        let mut pos = bar(&mut grid, id, Coord::new(5, 5));

        grid.apply_move(id, &mut pos, &bounds, &ROTATE_CW, &mut scratch).unwrap();
        let occupied: Vec<Coord> = pos.cells().collect();
        assert_eq!(occupied, vec![Coord::new(5, 5), Coord::new(5, 6), Coord::new(5, 7)]);
        assert_eq!(grid.slot(Coord::new(5, 5)).unwrap().len(), 1);
        assert!(grid.slot(Coord::new(6, 5)).unwrap().is_empty());
    }

    #[test]
    fn test_draw_uses_top_occupant() {
        let mut grid = Grid::new(4, 4, 1);
        let mut layer = Layer::new(4, 4);
        let index = grid.index(grid.to_extended(Coord::new(2, 1))).unwrap();
        grid.add_at(index, EntityId(0));
        grid.add_at(index, EntityId(1));

        grid.draw(&mut layer, |id| Some(if id == EntityId(0) { Rgb::RED } else { Rgb::BLUE }));

        assert_eq!(layer.get(Coord::new(2, 1)), Some(Rgb::BLUE));
        assert_eq!(layer.get(Coord::new(0, 0)), None);
    }

    #[test]
    fn test_erase_and_take() {
        let mut grid = Grid::new(8, 8, 3);
        let id = EntityId(4);
        let pos = bar(&mut grid, id, Coord::new(3, 3));

        let index = grid.index(Coord::new(3, 3)).unwrap();
        assert_eq!(grid.take_occupants(index), vec![id]);
        assert!(grid.slot_at(index).is_empty());

        grid.erase(id, &pos);
        assert!(grid.slot(Coord::new(4, 3)).unwrap().is_empty());
    }

    #[test]
    fn test_dump() {
        let mut grid = Grid::new(1, 1, 0);
        grid.add_at(0, EntityId(3));
        assert_eq!(grid.dump(|id| format!("B{}", id.0)), "[B3]\n");
    }
}
