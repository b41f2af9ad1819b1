//! Grid Simulation Module
//!
//! Everything that mutates the occupancy grid. Iteration order is always by
//! ascending entity id and all randomness comes from the caller's
//! [`DeterministicRng`](crate::core::DeterministicRng).
//!
//! ## Module Structure
//!
//! - `wall`: Wall-corner sets and per-type bounds
//! - `shape`: Bitmap processing into normalized offsets
//! - `position`: Reference, orientation and offsets of one entity
//! - `moves`: Shift and rotate moves
//! - `scratch`: Reusable temporaries with a bracket guard
//! - `entity`: Entity ids, types and pooled instances
//! - `grid`: Extended occupancy grid
//! - `pool`: Per-type free lists and staged additions/removals
//! - `resolver`: Two-phase intention/resolution of pending moves
//! - `noclip`: Bulk relocation
//! - `spawn`: Spawn directives and arguments

pub mod wall;
pub mod shape;
pub mod position;
pub mod moves;
pub mod scratch;
pub mod entity;
pub mod grid;
pub mod pool;
pub mod resolver;
pub mod noclip;
pub mod spawn;

// Re-export key types
pub use wall::{WallBounds, WallCorners};
pub use shape::Shape;
pub use position::Position;
pub use moves::{
    Move, MoveKind, Rotate, Shift,
    SHIFT_LEFT, SHIFT_RIGHT, SHIFT_UP, SHIFT_DOWN,
    SHIFT_UP_LEFT, SHIFT_UP_RIGHT, SHIFT_DOWN_LEFT, SHIFT_DOWN_RIGHT,
    ROTATE_CW, ROTATE_CCW,
};
pub use scratch::{Bracket, ScratchCache, ScratchHandle};
pub use entity::{Entity, EntityId, EntityType, EntityTypeId};
pub use grid::{Grid, Slot};
pub use pool::EntityPool;
pub use resolver::{Collider, Collision, CollisionRecord, Resolver};
pub use noclip::NoclipBatch;
pub use spawn::{AnglePolicy, AxisPolicy, SpawnArgs, SpawnDirective, SpawnPoint};
