//! Core deterministic primitives.
//!
//! Grid coordinates, the four quarter-turn transforms, the seeded RNG and the
//! state hasher. Nothing in here knows about entities or the grid.

pub mod coord;
pub mod rng;
pub mod hash;

// Re-export core types
pub use coord::{Coord, Orientation};
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
