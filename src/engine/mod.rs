//! Engine Module
//!
//! The public face of the crate: the engine itself, its builder and hooks,
//! the frame loop and error reporting.
//!
//! ## Module Structure
//!
//! - `config`: JSON configuration
//! - `error`: Engine error type
//! - `hooks`: Game and behavior traits
//! - `builder`: Entity type registration and engine construction
//! - `engine`: Tick, spawn, destroy, noclip and queries
//! - `frame_loop`: Fixed-rate async driver
//! - `report`: Background error report delivery

pub mod config;
pub mod error;
pub mod hooks;
pub mod builder;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod frame_loop;
pub mod report;

pub use config::{ConfigError, EngineConfig};
pub use error::EngineError;
pub use hooks::{AsAny, EntityBehavior, Game, GameResult, IdleGame, Inert};
pub use builder::{EngineBuilder, EntityDescriptor};
pub use engine::Engine;
pub use frame_loop::{EngineTask, FrameClock, FrameLoop, StopFlag};
pub use report::{ErrorReport, ErrorReporter, ReportSink, TracingSink};
