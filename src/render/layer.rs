//! Pixel Layers
//!
//! A layer is a field-sized buffer of optional colours. `None` is
//! transparent and lets lower-priority layers show through.

use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;

/// 24-bit colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Create a colour.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    // Palette
    /// (255, 0, 0)
    pub const RED: Self = Self::new(255, 0, 0);
    /// (0, 255, 0)
    pub const GREEN: Self = Self::new(0, 255, 0);
    /// (0, 0, 255)
    pub const BLUE: Self = Self::new(0, 0, 255);
    /// (0, 255, 255)
    pub const CYAN: Self = Self::new(0, 255, 255);
    /// (255, 0, 255)
    pub const MAGENTA: Self = Self::new(255, 0, 255);
    /// (255, 255, 0)
    pub const YELLOW: Self = Self::new(255, 255, 0);
    /// (255, 128, 0)
    pub const ORANGE: Self = Self::new(255, 128, 0);
    /// (128, 0, 255)
    pub const PURPLE: Self = Self::new(128, 0, 255);
    /// (255, 64, 192)
    pub const PINK: Self = Self::new(255, 64, 192);
    /// (64, 200, 255)
    pub const LIGHT_BLUE: Self = Self::new(64, 200, 255);
    /// (180, 255, 0)
    pub const LIME: Self = Self::new(180, 255, 0);
    /// (0, 180, 180)
    pub const TEAL: Self = Self::new(0, 180, 180);
    /// (128, 128, 128)
    pub const GRAY: Self = Self::new(128, 128, 128);
    /// (255, 255, 255)
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Pixel off
    pub const OFF: Self = Self::new(0, 0, 0);
}

/// Field-sized buffer of optional pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    width: usize,
    height: usize,
    pixels: Vec<Option<Rgb>>,
}

impl Layer {
    /// Create a transparent layer.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; width * height],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, c: Coord) -> Option<usize> {
        let (x, y) = (usize::try_from(c.x).ok()?, usize::try_from(c.y).ok()?);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    /// Pixel at `c`, `None` if transparent or outside.
    pub fn get(&self, c: Coord) -> Option<Rgb> {
        self.index(c).and_then(|i| self.pixels[i])
    }

    /// Set the pixel at `c`. Writes outside the layer are ignored.
    pub fn set(&mut self, c: Coord, pixel: Option<Rgb>) {
        if let Some(i) = self.index(c) {
            self.pixels[i] = pixel;
        }
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(None);
    }

    /// Paint every pixel with `pixel`.
    pub fn fill(&mut self, pixel: Rgb) {
        self.pixels.fill(Some(pixel));
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[Option<Rgb>] {
        &self.pixels
    }

    /// True if no pixel is set.
    pub fn is_clear(&self) -> bool {
        self.pixels.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mut layer = Layer::new(4, 3);
        assert!(layer.is_clear());

        layer.set(Coord::new(3, 2), Some(Rgb::RED));
        assert_eq!(layer.get(Coord::new(3, 2)), Some(Rgb::RED));
        assert_eq!(layer.pixels()[11], Some(Rgb::RED));

        layer.clear();
        assert!(layer.is_clear());
    }

    #[test]
    fn test_out_of_range_writes_are_ignored() {
        let mut layer = Layer::new(2, 2);
        layer.set(Coord::new(-1, 0), Some(Rgb::BLUE));
        layer.set(Coord::new(2, 0), Some(Rgb::BLUE));
        assert!(layer.is_clear());
        assert_eq!(layer.get(Coord::new(5, 5)), None);
    }

    #[test]
    fn test_fill() {
        let mut layer = Layer::new(2, 2);
        layer.fill(Rgb::OFF);
        assert!(layer.pixels().iter().all(|p| *p == Some(Rgb::OFF)));
    }
}
