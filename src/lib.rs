//! # Pixelgrid
//!
//! Real-time grid game engine for pixel-matrix displays.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         PIXELGRID                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── coord.rs    - Grid coordinates and quarter turns        │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing                             │
//! │                                                              │
//! │  game/           - Grid simulation (deterministic)           │
//! │  ├── shape.rs    - Bitmaps to offsets                        │
//! │  ├── moves.rs    - Shift and rotate                          │
//! │  ├── grid.rs     - Extended occupancy grid                   │
//! │  ├── pool.rs     - Recycled entity storage                   │
//! │  ├── resolver.rs - Intention/resolution of moves             │
//! │  └── noclip.rs   - Bulk relocation                           │
//! │                                                              │
//! │  render/         - Layers, compositor, animations            │
//! │  input/          - Gamepads and controller registry          │
//! │                                                              │
//! │  engine/         - Facade and runtime (async)                │
//! │  ├── builder.rs  - Entity type registration                  │
//! │  ├── engine.rs   - Tick, spawn, destroy, queries             │
//! │  ├── frame_loop.rs - Fixed-rate tokio driver                 │
//! │  └── report.rs   - Background error reports                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given identical inputs and seed, [`Engine::state_hash`] matches tick for
//! tick.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod render;
pub mod input;
pub mod engine;

// Re-export commonly used types
pub use core::{Coord, DeterministicRng, Orientation};
pub use game::{
    AnglePolicy, Collider, EntityId, EntityTypeId, Move, SpawnArgs, SpawnDirective, WallCorners,
    NoclipBatch,
};
pub use render::{FrameCapture, NullSink, PixelOrder, PixelSink, Rgb};
pub use input::{Button, ButtonState, ControllerEvent, ControllerId, InputHandle};
pub use engine::{
    Engine, EngineBuilder, EngineConfig, EngineError, EngineTask, EntityBehavior,
    EntityDescriptor, ErrorReporter, FrameLoop, Game, GameResult,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
