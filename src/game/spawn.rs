//! Spawn Directives
//!
//! A spawn coordinate is given per axis, either as a field coordinate or as
//! a directive resolved against the type's bounding box in the requested
//! orientation. The resolved value is where the reference cell goes; for a
//! rotated shape the reference is not the top-left cell.

use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::coord::{Coord, Orientation};
use crate::core::rng::DeterministicRng;
use crate::game::shape::Shape;

/// Placement relative to the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnDirective {
    /// Flush with the top or left edge
    Start,
    /// Flush with the bottom or right edge
    End,
    /// Centred
    Center,
    /// Anywhere between `Start` and `End`, inclusive
    Random,
}

/// One axis of a spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisPolicy {
    /// Explicit field coordinate of the reference cell
    At(i32),
    /// Resolved from the shape
    Directive(SpawnDirective),
}

impl From<i32> for AxisPolicy {
    fn from(value: i32) -> Self {
        AxisPolicy::At(value)
    }
}

impl From<SpawnDirective> for AxisPolicy {
    fn from(directive: SpawnDirective) -> Self {
        AxisPolicy::Directive(directive)
    }
}

/// Requested spawn location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Horizontal policy
    pub x: AxisPolicy,
    /// Vertical policy
    pub y: AxisPolicy,
}

impl<X: Into<AxisPolicy>, Y: Into<AxisPolicy>> From<(X, Y)> for SpawnPoint {
    fn from((x, y): (X, Y)) -> Self {
        Self { x: x.into(), y: y.into() }
    }
}

impl From<Coord> for SpawnPoint {
    fn from(c: Coord) -> Self {
        Self { x: AxisPolicy::At(c.x), y: AxisPolicy::At(c.y) }
    }
}

/// Requested spawn orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnglePolicy {
    /// Fixed number of quarter turns (wraps mod 4)
    Fixed(i32),
    /// Any of the four orientations
    Random,
}

impl From<i32> for AnglePolicy {
    fn from(turns: i32) -> Self {
        AnglePolicy::Fixed(turns)
    }
}

impl From<Orientation> for AnglePolicy {
    fn from(orientation: Orientation) -> Self {
        AnglePolicy::Fixed(orientation.index() as i32)
    }
}

impl AnglePolicy {
    /// Pick the orientation.
    pub fn resolve(self, rng: &mut DeterministicRng) -> Orientation {
        match self {
            AnglePolicy::Fixed(turns) => Orientation::from_quarter_turns(turns),
            AnglePolicy::Random => Orientation::from_quarter_turns(rng.next_int_range(0, 3)),
        }
    }
}

/// Field size used for directive resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSize {
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

fn start(shape: &Shape, slot: usize) -> i32 {
    let (w, h) = (shape.width(), shape.height());
    [0, 0, h - 1, 0, w - 1, h - 1, 0, w - 1][slot]
}

fn end(shape: &Shape, field: FieldSize, slot: usize) -> i32 {
    let (w, h) = (shape.width(), shape.height());
    let (fw, fh) = (field.width, field.height);
    [fw - w, fh - h, fw - 1, fh - w, fw - 1, fh - 1, fw - h, fh - 1][slot]
}

fn center(shape: &Shape, field: FieldSize, slot: usize) -> i32 {
    let (w, h) = (shape.width(), shape.height());
    let (cx, cy) = (field.width / 2, field.height / 2);
    [cx - w / 2, cy - h / 2, cx + h / 2, cy - w / 2, cx + w / 2, cy + h / 2, cx - h / 2, cy + w / 2][slot]
}

impl AxisPolicy {
    /// Field coordinate of the reference cell on `axis` (0 = x, 1 = y).
    pub fn resolve(
        self,
        axis: usize,
        orientation: Orientation,
        shape: &Shape,
        field: FieldSize,
        rng: &mut DeterministicRng,
    ) -> i32 {
        let slot = orientation.index() * 2 + axis.min(1);
        match self {
            AxisPolicy::At(value) => value,
            AxisPolicy::Directive(SpawnDirective::Start) => start(shape, slot),
            AxisPolicy::Directive(SpawnDirective::End) => end(shape, field, slot),
            AxisPolicy::Directive(SpawnDirective::Center) => center(shape, field, slot),
            AxisPolicy::Directive(SpawnDirective::Random) => {
                rng.next_int_range(start(shape, slot), end(shape, field, slot))
            }
        }
    }
}

impl SpawnPoint {
    /// Field coordinate of the reference cell.
    pub fn resolve(
        self,
        orientation: Orientation,
        shape: &Shape,
        field: FieldSize,
        rng: &mut DeterministicRng,
    ) -> Coord {
        let x = self.x.resolve(0, orientation, shape, field, rng);
        let y = self.y.resolve(1, orientation, shape, field, rng);
        Coord::new(x, y)
    }
}

// =============================================================================
// SPAWN ARGUMENTS
// =============================================================================

/// Named arguments handed to `on_spawn`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnArgs(Map<String, Value>);

impl SpawnArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Typed argument. `None` if absent or of another type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Raw argument.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: FieldSize = FieldSize { width: 16, height: 16 };

    fn shape(bitmap: &[&[u8]]) -> Shape {
        Shape::from_bitmap(bitmap, 16, 16).unwrap()
    }

    fn cells(shape: &Shape, at: Coord, orientation: Orientation) -> Vec<Coord> {
        shape.offsets().iter().map(|o| at + orientation.apply(*o)).collect()
    }

    #[test]
    fn test_start_keeps_every_orientation_in_field() {
        let s = shape(&[&[1, 0, 0], &[1, 1, 1]]);
        let mut rng = DeterministicRng::new(1);

        for turns in 0..4 {
            let o = Orientation::from_quarter_turns(turns);
            let start = SpawnPoint::from((SpawnDirective::Start, SpawnDirective::Start)).resolve(o, &s, FIELD, &mut rng);
            let end = SpawnPoint::from((SpawnDirective::End, SpawnDirective::End)).resolve(o, &s, FIELD, &mut rng);

            let start_cells = cells(&s, start, o);
            assert_eq!(start_cells.iter().map(|c| c.x).min(), Some(0), "turns {}", turns);
            assert_eq!(start_cells.iter().map(|c| c.y).min(), Some(0), "turns {}", turns);

            let end_cells = cells(&s, end, o);
            assert_eq!(end_cells.iter().map(|c| c.x).max(), Some(15), "turns {}", turns);
            assert_eq!(end_cells.iter().map(|c| c.y).max(), Some(15), "turns {}", turns);
        }
    }

    #[test]
    fn test_center() {
        let dot = shape(&[&[1]]);
        let mut rng = DeterministicRng::new(1);
        let at = SpawnPoint::from((SpawnDirective::Center, SpawnDirective::Center)).resolve(Orientation::DEG_0, &dot, FIELD, &mut rng);
        assert_eq!(at, Coord::new(8, 8));

        let platform = shape(&[&[1, 1, 1, 1, 1]]);
        let at = SpawnPoint::from((SpawnDirective::Center, 3)).resolve(Orientation::DEG_0, &platform, FIELD, &mut rng);
        assert_eq!(at, Coord::new(6, 3));
    }

    #[test]
    fn test_random_is_within_start_and_end() {
        let bar = shape(&[&[1, 1, 1, 1]]);
        let mut rng = DeterministicRng::new(99);

        for _ in 0..200 {
            let x = AxisPolicy::from(SpawnDirective::Random).resolve(0, Orientation::DEG_0, &bar, FIELD, &mut rng);
            assert!((0..=12).contains(&x));
        }
    }

    #[test]
    fn test_random_angle() {
        let mut rng = DeterministicRng::new(5);
        let mut seen = [false; 4];
        for _ in 0..100 {
            seen[AnglePolicy::Random.resolve(&mut rng).index()] = true;
        }
        assert_eq!(seen, [true; 4]);
        assert_eq!(AnglePolicy::from(6).resolve(&mut rng), Orientation::DEG_180);
    }

    #[test]
    fn test_spawn_args() {
        let args = SpawnArgs::new().with("speed", 3).with("label", "fast");

        assert_eq!(args.get::<i32>("speed"), Some(3));
        assert_eq!(args.get::<String>("label"), Some("fast".to_string()));
        assert_eq!(args.get::<i32>("label"), None);
        assert!(SpawnArgs::new().is_empty());
    }
}
