//! Wall Corners and Bounds
//!
//! Every entity type carries four thresholds in extended grid space. A type
//! that may cross a wall gets its threshold pushed out by the margin on that
//! side, so its cells can live in the hidden border around the field.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;

/// Set of field walls.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallCorners(u8);

impl WallCorners {
    /// No walls
    pub const NONE: Self = Self(0);
    /// Top wall
    pub const TOP: Self = Self(1);
    /// Bottom wall
    pub const BOTTOM: Self = Self(2);
    /// Left wall
    pub const LEFT: Self = Self(4);
    /// Right wall
    pub const RIGHT: Self = Self(8);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::TOP, "TOP"),
        (Self::BOTTOM, "BOTTOM"),
        (Self::LEFT, "LEFT"),
        (Self::RIGHT, "RIGHT"),
    ];

    /// True if every wall in `other` is in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no wall is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Top or bottom wall present.
    #[inline]
    pub fn is_vertical(self) -> bool {
        self.0 & (Self::TOP.0 | Self::BOTTOM.0) != 0
    }

    /// Left or right wall present.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        self.0 & (Self::LEFT.0 | Self::RIGHT.0) != 0
    }

    /// Iterate the single walls in this set.
    pub fn iter(self) -> impl Iterator<Item = WallCorners> {
        Self::NAMED
            .into_iter()
            .map(|(wall, _)| wall)
            .filter(move |wall| self.contains(*wall))
    }
}

impl BitOr for WallCorners {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOrAssign for WallCorners {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl fmt::Debug for WallCorners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for WallCorners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (wall, name) in Self::NAMED {
            if self.contains(wall) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// =============================================================================
// BOUNDS
// =============================================================================

/// Per-type thresholds in extended grid space.
///
/// A coordinate is inside when `left <= x < right` and `top <= y < bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallBounds {
    /// Smallest allowed x
    pub left: i32,
    /// Smallest allowed y
    pub top: i32,
    /// First disallowed x
    pub right: i32,
    /// First disallowed y
    pub bottom: i32,
}

impl WallBounds {
    /// Compute thresholds for a field of `width × height` with `margin` cells
    /// of border on every side.
    pub fn new(width: i32, height: i32, margin: i32, cross: WallCorners) -> Self {
        let pushed = |wall: WallCorners| if cross.contains(wall) { 1 } else { 0 };

        Self {
            left: (1 - pushed(WallCorners::LEFT)) * margin,
            top: (1 - pushed(WallCorners::TOP)) * margin,
            right: width + margin + pushed(WallCorners::RIGHT) * margin,
            bottom: height + margin + pushed(WallCorners::BOTTOM) * margin,
        }
    }

    /// Walls crossed by `c`. Empty when inside.
    #[inline]
    pub fn classify(&self, c: Coord) -> WallCorners {
        let mut crossed = WallCorners::NONE;
        if c.x < self.left {
            crossed |= WallCorners::LEFT;
        }
        if c.y < self.top {
            crossed |= WallCorners::TOP;
        }
        if c.x >= self.right {
            crossed |= WallCorners::RIGHT;
        }
        if c.y >= self.bottom {
            crossed |= WallCorners::BOTTOM;
        }
        crossed
    }

    /// Offset added to resolved spawn coordinates.
    #[inline]
    pub fn origin(&self) -> Coord {
        Coord::new(self.left, self.top)
    }
}
