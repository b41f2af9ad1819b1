//! Move Algebra
//!
//! Moves are either shifts of the reference or quarter-turn rotations.
//! Both apply and revert symmetrically on a [`Position`].

use std::ops::{Mul, MulAssign};
use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;
use crate::game::position::Position;

/// Kind of move. Each entity holds at most one pending move per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoveKind {
    /// Translation
    Shift = 0,
    /// Rotation
    Rotate = 1,
}

impl MoveKind {
    /// All kinds, in slot order.
    pub const ALL: [MoveKind; 2] = [MoveKind::Shift, MoveKind::Rotate];

    /// Pending-move slot index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Translation by a vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shift(Coord);

impl Shift {
    /// One cell left
    pub const LEFT: Self = Self::new(-1, 0);
    /// One cell right
    pub const RIGHT: Self = Self::new(1, 0);
    /// One cell up
    pub const UP: Self = Self::new(0, -1);
    /// One cell down
    pub const DOWN: Self = Self::new(0, 1);
    /// Diagonal up-left
    pub const UP_LEFT: Self = Self::new(-1, -1);
    /// Diagonal up-right
    pub const UP_RIGHT: Self = Self::new(1, -1);
    /// Diagonal down-left
    pub const DOWN_LEFT: Self = Self::new(-1, 1);
    /// Diagonal down-right
    pub const DOWN_RIGHT: Self = Self::new(1, 1);

    /// Shift by `(dx, dy)`.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self(Coord::new(dx, dy))
    }

    /// Displacement vector.
    #[inline]
    pub fn vector(self) -> Coord {
        self.0
    }

    /// Where `cell` would land.
    #[inline]
    pub fn simulate(self, cell: Coord) -> Coord {
        cell + self.0
    }

    /// True when the two vectors cancel out.
    #[inline]
    pub fn is_opposite(self, other: Shift) -> bool {
        self.0 + other.0 == Coord::ZERO
    }
}

/// Element-wise product, used to reflect a direction.
impl Mul for Shift {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }
}

impl MulAssign for Shift {
    fn mul_assign(&mut self, other: Self) {
        self.0 = self.0 * other.0;
    }
}

/// Rotation by a number of quarter turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotate(i32);

impl Rotate {
    /// One quarter turn clockwise
    pub const CW: Self = Self(1);
    /// One quarter turn counter-clockwise
    pub const CCW: Self = Self(-1);

    /// Rotation by `turns` quarter turns.
    pub const fn new(turns: i32) -> Self {
        Self(turns)
    }

    /// Signed quarter turns.
    #[inline]
    pub fn quarter_turns(self) -> i32 {
        self.0
    }
}

/// A requested move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// Translate
    Shift(Shift),
    /// Rotate
    Rotate(Rotate),
}

impl Move {
    /// Kind of this move.
    #[inline]
    pub fn kind(&self) -> MoveKind {
        match self {
            Move::Shift(_) => MoveKind::Shift,
            Move::Rotate(_) => MoveKind::Rotate,
        }
    }

    /// The shift, if this is one.
    #[inline]
    pub fn as_shift(&self) -> Option<Shift> {
        match self {
            Move::Shift(shift) => Some(*shift),
            Move::Rotate(_) => None,
        }
    }

    /// Apply to a position.
    pub fn apply(&self, pos: &mut Position) {
        match self {
            Move::Shift(shift) => pos.set_reference(pos.reference() + shift.vector()),
            Move::Rotate(rotate) => pos.set_orientation(pos.orientation().rotated(rotate.quarter_turns())),
        }
    }

    /// Undo [`Move::apply`].
    pub fn revert(&self, pos: &mut Position) {
        match self {
            Move::Shift(shift) => pos.set_reference(pos.reference() - shift.vector()),
            Move::Rotate(rotate) => pos.set_orientation(pos.orientation().rotated(-rotate.quarter_turns())),
        }
    }
}

impl From<Shift> for Move {
    fn from(shift: Shift) -> Self {
        Move::Shift(shift)
    }
}

impl From<Rotate> for Move {
    fn from(rotate: Rotate) -> Self {
        Move::Rotate(rotate)
    }
}

// =============================================================================
// STANDARD MOVES
// =============================================================================

/// Shift one cell left
pub const SHIFT_LEFT: Move = Move::Shift(Shift::LEFT);
/// Shift one cell right
pub const SHIFT_RIGHT: Move = Move::Shift(Shift::RIGHT);
/// Shift one cell up
pub const SHIFT_UP: Move = Move::Shift(Shift::UP);
/// Shift one cell down
pub const SHIFT_DOWN: Move = Move::Shift(Shift::DOWN);
/// Shift diagonally up-left
pub const SHIFT_UP_LEFT: Move = Move::Shift(Shift::UP_LEFT);
/// Shift diagonally up-right
pub const SHIFT_UP_RIGHT: Move = Move::Shift(Shift::UP_RIGHT);
/// Shift diagonally down-left
pub const SHIFT_DOWN_LEFT: Move = Move::Shift(Shift::DOWN_LEFT);
/// Shift diagonally down-right
pub const SHIFT_DOWN_RIGHT: Move = Move::Shift(Shift::DOWN_RIGHT);
/// Rotate clockwise
pub const ROTATE_CW: Move = Move::Rotate(Rotate::CW);
/// Rotate counter-clockwise
pub const ROTATE_CCW: Move = Move::Rotate(Rotate::CCW);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Orientation;

    #[test]
    fn test_shift_apply_revert() {
        let mut pos = Position::new(Coord::new(3, 3), &[Coord::ZERO], Orientation::DEG_0);

        SHIFT_DOWN_LEFT.apply(&mut pos);
        assert_eq!(pos.reference(), Coord::new(2, 4));

        SHIFT_DOWN_LEFT.revert(&mut pos);
        assert_eq!(pos.reference(), Coord::new(3, 3));
    }

    #[test]
    fn test_rotate_apply_revert() {
        let mut pos = Position::new(Coord::ZERO, &[Coord::ZERO], Orientation::DEG_0);

        ROTATE_CCW.apply(&mut pos);
        assert_eq!(pos.orientation(), Orientation::DEG_270);

        ROTATE_CCW.revert(&mut pos);
        assert_eq!(pos.orientation(), Orientation::DEG_0);
    }

    #[test]
    fn test_shift_composition_reflects() {
        let mut ball = Shift::UP_RIGHT;
        ball *= Shift::DOWN_LEFT;
        assert_eq!(ball, Shift::new(-1, -1));
        assert_eq!(Shift::UP_LEFT * Shift::UP_RIGHT, Shift::new(-1, 1));
    }

    #[test]
    fn test_opposite_shifts() {
        assert!(Shift::LEFT.is_opposite(Shift::RIGHT));
        assert!(Shift::UP_LEFT.is_opposite(Shift::DOWN_RIGHT));
        assert!(!Shift::LEFT.is_opposite(Shift::UP));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(SHIFT_UP.kind(), MoveKind::Shift);
        assert_eq!(ROTATE_CW.kind().index(), 1);
        assert_eq!(ROTATE_CW.as_shift(), None);
    }
}
