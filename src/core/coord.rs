//! Grid Coordinates and Orientation
//!
//! Integer cell coordinates plus the four quarter-turn transforms used to map
//! shape offsets onto the grid.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// Integer cell coordinate.
///
/// Ordered by `(y, x)` so sorted sets of cells read row by row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column
    pub x: i32,
    /// Row (grows downwards)
    pub y: i32,
}

impl Coord {
    /// Origin `(0, 0)`
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component on the given axis (0 = x, 1 = y).
    #[inline]
    pub fn axis(self, axis: usize) -> i32 {
        if axis == 0 { self.x } else { self.y }
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl Add for Coord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Coord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Element-wise product.
impl Mul for Coord {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }
}

impl Neg for Coord {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// ORIENTATION
// =============================================================================

/// Quarter-turn orientation (0 = 0°, 1 = 90°, 2 = 180°, 3 = 270°).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Orientation(u8);

impl Orientation {
    /// 0°
    pub const DEG_0: Self = Self(0);
    /// 90°
    pub const DEG_90: Self = Self(1);
    /// 180°
    pub const DEG_180: Self = Self(2);
    /// 270°
    pub const DEG_270: Self = Self(3);

    /// Orientation from any number of quarter turns (wraps mod 4).
    #[inline]
    pub fn from_quarter_turns(turns: i32) -> Self {
        Self(turns.rem_euclid(4) as u8)
    }

    /// Index in `0..4`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Rotate by `delta` quarter turns.
    #[inline]
    pub fn rotated(self, delta: i32) -> Self {
        Self::from_quarter_turns(self.0 as i32 + delta)
    }

    /// Map an unrotated offset to its rotated displacement.
    #[inline]
    pub fn apply(self, c: Coord) -> Coord {
        match self.0 {
            0 => c,
            1 => Coord::new(-c.y, c.x),
            2 => Coord::new(-c.x, -c.y),
            _ => Coord::new(c.y, -c.x),
        }
    }

    /// Exact inverse of [`Orientation::apply`].
    #[inline]
    pub fn invert(self, c: Coord) -> Coord {
        match self.0 {
            0 => c,
            1 => Coord::new(c.y, -c.x),
            2 => Coord::new(-c.x, -c.y),
            _ => Coord::new(-c.y, c.x),
        }
    }
}
