//! Entity Shapes
//!
//! A shape is the normalized offset set of a 0/1 bitmap. Leading blank rows
//! and columns are trimmed so the smallest offset is `(0, 0)`, and the bitmap
//! is clipped to the field size.

use crate::core::coord::Coord;
use crate::engine::error::EngineError;

/// Normalized cell offsets of an entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    offsets: Vec<Coord>,
    width: i32,
    height: i32,
}

impl Shape {
    /// Process a bitmap into a shape.
    ///
    /// Any non-zero cell is active. Rows are clipped to `max_height` and
    /// columns to `max_width`.
    pub fn from_bitmap<R: AsRef<[u8]>>(
        rows: &[R],
        max_width: usize,
        max_height: usize,
    ) -> Result<Self, EngineError> {
        if rows.iter().all(|row| row.as_ref().is_empty()) {
            return Err(EngineError::Config("shape bitmap is empty".into()));
        }

        let start_x = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .iter()
                    .position(|cell| *cell != 0)
                    .unwrap_or(max_width)
            })
            .min()
            .unwrap_or(max_width);

        let offsets: Vec<Coord> = rows
            .iter()
            .map(|row| -> &[u8] { row.as_ref() })
            .skip_while(|row| row.iter().all(|cell| *cell == 0))
            .take(max_height)
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .skip(start_x)
                    .take(max_width.saturating_sub(start_x))
                    .filter(|(_, cell)| **cell != 0)
                    .map(move |(x, _)| Coord::new((x - start_x) as i32, y as i32))
            })
            .collect();

        if offsets.is_empty() {
            return Err(EngineError::Config("shape bitmap has no active cells".into()));
        }

        let width = offsets.iter().map(|c| c.x).max().unwrap_or(0) + 1;
        let height = offsets.iter().map(|c| c.y).max().unwrap_or(0) + 1;

        Ok(Self { offsets, width, height })
    }

    /// Offsets in row order.
    pub fn offsets(&self) -> &[Coord] {
        &self.offsets
    }

    /// Bounding width.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Bounding height.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Larger of width and height.
    pub fn max_dimension(&self) -> i32 {
        self.width.max(self.height)
    }
}

/// Short tag for a type name, built from its capitals and digits.
///
/// Used when dumping the grid.
pub fn acronym(name: &str) -> String {
    let tag: String = name
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();
    if tag.is_empty() {
        name.chars().take(1).collect()
    } else {
        tag
    }
}
