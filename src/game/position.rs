//! Entity Positions
//!
//! A position is a reference coordinate, an orientation and the offsets
//! still owned by the entity. Cells are `reference + orientation(offset)`.

use crate::core::coord::{Coord, Orientation};

/// Placement of one entity on the grid.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Position {
    reference: Coord,
    orientation: Orientation,
    offsets: Vec<Coord>,
}

impl Clone for Position {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference,
            orientation: self.orientation,
            offsets: self.offsets.clone(),
        }
    }

    // Reuses the offset buffer
    fn clone_from(&mut self, source: &Self) {
        self.reference = source.reference;
        self.orientation = source.orientation;
        self.offsets.clone_from(&source.offsets);
    }
}

impl Position {
    /// Create a position.
    pub fn new(reference: Coord, offsets: &[Coord], orientation: Orientation) -> Self {
        Self {
            reference,
            orientation,
            offsets: offsets.to_vec(),
        }
    }

    /// Overwrite in place, keeping the offset allocation.
    pub fn reset(&mut self, reference: Coord, offsets: &[Coord], orientation: Orientation) {
        self.reference = reference;
        self.orientation = orientation;
        self.offsets.clear();
        self.offsets.extend_from_slice(offsets);
    }

    /// Reference coordinate.
    #[inline]
    pub fn reference(&self) -> Coord {
        self.reference
    }

    /// Current orientation.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Remaining offsets.
    #[inline]
    pub fn offsets(&self) -> &[Coord] {
        &self.offsets
    }

    /// Move the reference.
    #[inline]
    pub fn set_reference(&mut self, reference: Coord) {
        self.reference = reference;
    }

    /// Change the orientation.
    #[inline]
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Absolute cell of one offset.
    #[inline]
    pub fn cell_of(&self, offset: Coord) -> Coord {
        self.reference + self.orientation.apply(offset)
    }

    /// Absolute cells, in offset order.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.offsets.iter().map(move |off| self.cell_of(*off))
    }

    /// Offset that would produce `cell`. Left-inverse of [`Position::cells`].
    #[inline]
    pub fn to_offset(&self, cell: Coord) -> Coord {
        self.orientation.invert(cell - self.reference)
    }

    /// Drop the offset that maps onto `cell`. Returns `false` if none did.
    pub fn remove(&mut self, cell: Coord) -> bool {
        let offset = self.to_offset(cell);
        let before = self.offsets.len();
        self.offsets.retain(|off| *off != offset);
        self.offsets.len() != before
    }

    /// Replace the offset at `index`.
    pub fn replace_offset(&mut self, index: usize, offset: Coord) {
        if let Some(slot) = self.offsets.get_mut(index) {
            *slot = offset;
        }
    }

    /// True while at least one offset remains.
    #[inline]
    pub fn has_cells(&self) -> bool {
        !self.offsets.is_empty()
    }

    /// Number of offsets.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True if there are no offsets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
